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

use std::sync::Arc;

use tracing::debug;

use crate::common::correlator::Correlator;
use crate::common::engine::{
    Connect, DomainDescription, RegisterDomain, StartWorkflow, UpdateDomain, WorkflowExecution,
};
use crate::common::ProxyError;
use crate::messages::{
    CancelReply, CancelRequest, ConnectReply, ConnectRequest, DomainDescribeReply,
    DomainDescribeRequest, DomainRegisterReply, DomainRegisterRequest, DomainUpdateReply,
    DomainUpdateRequest, HeartbeatReply, HeartbeatRequest, InitializeReply, InitializeRequest,
    TerminateReply, TerminateRequest, WorkflowExecuteReply, WorkflowExecuteRequest,
    WorkflowRegisterReply, WorkflowRegisterRequest,
};
use crate::traits::{HasError, ProxyMessage};

/// Typed calls against a remote proxy.
///
/// Every call sends one request through the [`Correlator`] and waits for the
/// matching reply. A reply carrying an error fails the call with
/// [`ProxyError::Remote`].
#[derive(Debug, Clone)]
pub struct ProxyClient {
    correlator: Arc<Correlator>,
}

impl ProxyClient {
    #[must_use]
    pub const fn new(correlator: Arc<Correlator>) -> Self {
        Self { correlator }
    }

    #[must_use]
    pub const fn correlator(&self) -> &Arc<Correlator> {
        &self.correlator
    }

    /// Sends `request` and returns its reply once it proved error free.
    pub async fn call<Req, Rep>(&self, mut request: Req) -> Result<Rep, ProxyError>
    where
        Req: ProxyMessage,
        Rep: ProxyMessage + HasError,
    {
        let reply = self.correlator.call(&mut request).await?;
        let reply = reply.downcast::<Rep>()?;
        reply.check()?;
        Ok(*reply)
    }

    pub async fn initialize(&self, library_address: &str, library_port: i32) -> Result<(), ProxyError> {
        let mut request = InitializeRequest::new();
        request.set_library_address(Some(library_address));
        request.set_library_port(library_port);
        self.call::<_, InitializeReply>(request).await?;
        Ok(())
    }

    pub async fn connect(&self, params: &Connect) -> Result<(), ProxyError> {
        self.call::<_, ConnectReply>(ConnectRequest::from(params)).await?;
        debug!(endpoints = %params.endpoints, "Connected");
        Ok(())
    }

    pub async fn heartbeat(&self) -> Result<(), ProxyError> {
        self.call::<_, HeartbeatReply>(HeartbeatRequest::new()).await?;
        Ok(())
    }

    /// Asks the remote proxy to shut down.
    pub async fn terminate(&self) -> Result<(), ProxyError> {
        self.call::<_, TerminateReply>(TerminateRequest::new()).await?;
        Ok(())
    }

    /// Asks the remote proxy to abort the request `target_request_id`.
    /// Returns whether it was still running there.
    pub async fn cancel(&self, target_request_id: i64) -> Result<bool, ProxyError> {
        let mut request = CancelRequest::new();
        request.set_target_request_id(target_request_id);
        self.call::<_, CancelReply>(request).await?.was_cancelled()
    }

    pub async fn register_domain(&self, params: &RegisterDomain) -> Result<(), ProxyError> {
        self.call::<_, DomainRegisterReply>(DomainRegisterRequest::from(params))
            .await?;
        Ok(())
    }

    pub async fn describe_domain(&self, name: &str) -> Result<DomainDescription, ProxyError> {
        let mut request = DomainDescribeRequest::new();
        request.set_name(Some(name));
        let reply = self.call::<_, DomainDescribeReply>(request).await?;
        DomainDescription::try_from(&reply)
    }

    pub async fn update_domain(&self, params: &UpdateDomain) -> Result<(), ProxyError> {
        self.call::<_, DomainUpdateReply>(DomainUpdateRequest::from(params))
            .await?;
        Ok(())
    }

    pub async fn register_workflow(&self, name: &str) -> Result<(), ProxyError> {
        let mut request = WorkflowRegisterRequest::new();
        request.set_name(Some(name));
        self.call::<_, WorkflowRegisterReply>(request).await?;
        Ok(())
    }

    pub async fn execute_workflow(&self, params: &StartWorkflow) -> Result<WorkflowExecution, ProxyError> {
        let request = WorkflowExecuteRequest::try_from(params)?;
        let reply = self.call::<_, WorkflowExecuteReply>(request).await?;
        reply
            .execution()?
            .ok_or_else(|| ProxyError::Malformed("workflow execute reply without an execution".to_string()))
    }
}
