/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

use std::time::Duration;

use futures::future::join_all;

use cadence_proxy::engine::StartWorkflow;
use cadence_proxy::messages::{HeartbeatReply, HeartbeatRequest, WorkflowExecuteRequest};
use cadence_proxy::{HasRequestId, ProxyConfig, ProxyError};

use crate::setup::*;

mod setup;

#[tokio::test]
async fn test_concurrent_calls_are_matched_to_their_callers() -> anyhow::Result<()> {
    let harness = connect(&ProxyConfig::default());

    let calls = (0..32).map(|_| {
        let correlator = harness.correlator.clone();
        async move {
            let mut request = HeartbeatRequest::new();
            let pending = correlator.send(&mut request).await?;
            let reply = pending.wait().await?.downcast::<HeartbeatReply>()?;
            Ok::<_, ProxyError>((request.request_id(), reply.request_id()))
        }
    });

    for result in join_all(calls).await {
        let (sent, received) = result?;
        assert_eq!(sent, received);
    }
    assert_eq!(harness.correlator.in_flight(), 0);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_request_times_out_while_engine_is_busy() -> anyhow::Result<()> {
    let mut config = ProxyConfig::default();
    config.timeouts.request_timeout_ms = 10;
    let harness = connect(&config);

    let mut request = WorkflowExecuteRequest::try_from(&StartWorkflow {
        name: "block".to_string(),
        ..StartWorkflow::default()
    })?;
    let pending = harness.correlator.send(&mut request).await?;
    let request_id = pending.request_id();

    assert_eq!(pending.wait().await.unwrap_err(), ProxyError::Timeout);
    assert_eq!(harness.correlator.in_flight(), 0);

    // The remote call is still running; aborting it produces a late reply
    // that the correlator drops.
    assert!(harness.client.cancel(request_id).await?);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(harness.correlator.in_flight(), 0);
    harness.client.heartbeat().await?;
    Ok(())
}

#[tokio::test]
async fn test_closing_the_connection_fails_pending_requests() -> anyhow::Result<()> {
    let harness = connect(&ProxyConfig::default());

    let mut request = WorkflowExecuteRequest::try_from(&StartWorkflow {
        name: "block".to_string(),
        ..StartWorkflow::default()
    })?;
    let pending = harness.correlator.send(&mut request).await?;
    harness.engine.started.notified().await;

    harness.token.cancel();
    assert_eq!(pending.wait().await.unwrap_err(), ProxyError::ConnectionClosed);
    Ok(())
}
