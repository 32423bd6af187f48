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
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Once};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use cadence_proxy::engine::{
    Connect, DomainDescription, DomainStatus, RegisterDomain, StartWorkflow, UpdateDomain,
    WorkflowExecution,
};
use cadence_proxy::{
    channel_pair, Codec, Correlator, Dispatcher, EngineClient, EngineError, EngineResult,
    ErrorType, MessageRegistry, ProxyClient, ProxyConfig,
};

// Ensures tracing initialization happens only once across all tests.
static INIT: Once = Once::new();

/// Initializes the global tracing subscriber for tests, writing to
/// `logs/proxy_tests.txt`.
pub fn initialize_tracing() {
    INIT.call_once(|| {
        std::fs::create_dir_all("logs").expect("could not create logs dir");

        let file_appender = RollingFileAppender::new(Rotation::NEVER, "logs", "proxy_tests.txt");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        // Leak the guard so the non-blocking writer is not dropped before process exit
        Box::leak(Box::new(guard));

        let filter = EnvFilter::new("trace")
            .add_directive("cadence_proxy::common::correlator=trace".parse().unwrap())
            .add_directive("cadence_proxy::common::dispatcher=trace".parse().unwrap())
            .add_directive("tokio=info".parse().unwrap())
            .add_directive(tracing_subscriber::filter::LevelFilter::TRACE.into());

        let subscriber = FmtSubscriber::builder()
            .with_span_events(FmtSpan::NONE)
            .with_max_level(Level::TRACE)
            .compact()
            .with_line_number(true)
            .without_time()
            .with_target(true)
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(non_blocking)
            .finish();

        tracing::subscriber::set_global_default(subscriber)
            .expect("setting default subscriber failed");
    });
}

/// In-memory engine client with scripted behaviour.
///
/// * registering a domain named `panic` panics
/// * registering an existing domain fails with `Generic`
/// * `fail_next` makes the next call fail with the given error
/// * executing a workflow named `block` never completes
#[derive(Default)]
pub struct FakeEngine {
    pub domains: Mutex<HashMap<String, DomainDescription>>,
    pub workflows: Mutex<Vec<String>>,
    pub connections: Mutex<Vec<Connect>>,
    pub fail_next: Mutex<Option<EngineError>>,
    pub started: Notify,
}

impl FakeEngine {
    fn take_failure(&self) -> EngineResult<()> {
        match self.fail_next.lock().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl EngineClient for FakeEngine {
    async fn connect(&self, params: Connect) -> EngineResult<()> {
        self.take_failure()?;
        self.connections.lock().push(params);
        Ok(())
    }

    async fn register_domain(&self, params: RegisterDomain) -> EngineResult<()> {
        self.take_failure()?;
        if params.name == "panic" {
            panic!("engine client crashed");
        }
        let mut domains = self.domains.lock();
        if domains.contains_key(&params.name) {
            return Err(EngineError::generic(format!("domain {} already exists", params.name)));
        }
        domains.insert(
            params.name.clone(),
            DomainDescription {
                name: params.name,
                description: params.description,
                status: DomainStatus::Registered,
                owner_email: params.owner_email,
                emit_metrics: params.emit_metrics,
                retention_days: params.retention_days,
            },
        );
        Ok(())
    }

    async fn describe_domain(&self, name: String) -> EngineResult<DomainDescription> {
        self.take_failure()?;
        self.domains
            .lock()
            .get(&name)
            .cloned()
            .ok_or_else(|| EngineError::new(ErrorType::Custom, "EntityNotExistsError").with_details(name))
    }

    async fn update_domain(&self, params: UpdateDomain) -> EngineResult<()> {
        self.take_failure()?;
        let mut domains = self.domains.lock();
        let domain = domains
            .get_mut(&params.name)
            .ok_or_else(|| EngineError::new(ErrorType::Custom, "EntityNotExistsError"))?;
        if let Some(description) = params.description {
            domain.description = description;
        }
        if let Some(owner_email) = params.owner_email {
            domain.owner_email = owner_email;
        }
        domain.emit_metrics = params.emit_metrics;
        domain.retention_days = params.retention_days;
        Ok(())
    }

    async fn register_workflow(&self, name: String) -> EngineResult<()> {
        self.take_failure()?;
        self.workflows.lock().push(name);
        Ok(())
    }

    async fn execute_workflow(&self, params: StartWorkflow) -> EngineResult<WorkflowExecution> {
        self.take_failure()?;
        if params.name == "block" {
            self.started.notify_one();
            std::future::pending::<()>().await;
        }
        Ok(WorkflowExecution {
            id: params.options.id.unwrap_or_else(|| format!("{}-1", params.name)),
            run_id: "run-1".to_string(),
        })
    }
}

/// Both ends of a proxy connection over an in-memory channel.
pub struct Harness {
    pub engine: Arc<FakeEngine>,
    pub dispatcher: Arc<Dispatcher>,
    pub correlator: Arc<Correlator>,
    pub client: ProxyClient,
    pub token: CancellationToken,
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

pub fn codec() -> Codec {
    Codec::new(Arc::new(MessageRegistry::with_all_messages().unwrap()))
}

/// Wires a client to a dispatcher backed by a fresh [`FakeEngine`].
pub fn connect(config: &ProxyConfig) -> Harness {
    initialize_tracing();

    let codec = codec();
    let engine = Arc::new(FakeEngine::default());
    let token = CancellationToken::new();
    let (local, remote) = channel_pair(config.limits.channel_capacity);

    let dispatcher = Dispatcher::new(codec.clone(), Arc::clone(&engine) as Arc<dyn EngineClient>);
    {
        let dispatcher = Arc::clone(&dispatcher);
        let token = token.clone();
        tokio::spawn(async move {
            dispatcher
                .serve(remote.source, Arc::new(remote.sink), token)
                .await
        });
    }

    let correlator = Correlator::new(codec, Arc::new(local.sink), config);
    correlator.spawn_receiver(local.source, token.clone());
    let client = ProxyClient::new(Arc::clone(&correlator));

    Harness {
        engine,
        dispatcher,
        correlator,
        client,
        token,
    }
}
