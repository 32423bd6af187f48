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

//! Remote side of the protocol: turns decoded requests into engine calls and
//! builds the replies.

use std::any::Any;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::common::engine::{
    Connect, EngineClient, EngineError, RegisterDomain, StartWorkflow, UpdateDomain,
};
use crate::common::transport::{FrameSink, FrameSource};
use crate::common::{Codec, ProxyError};
use crate::message::{ErrorEnvelope, ErrorType, MessageType};
use crate::messages::{
    CancelReply, CancelRequest, ConnectRequest, DomainDescribeReply, DomainDescribeRequest,
    DomainRegisterRequest, DomainUpdateRequest, InitializeRequest, WorkflowExecuteReply,
    WorkflowExecuteRequest, WorkflowRegisterRequest,
};
use crate::traits::{HasReplyType, ProxyMessage};

type DispatchResult = Result<Box<dyn ProxyMessage>, ErrorEnvelope>;

/// Routes requests to an [`EngineClient`].
///
/// Connection-level requests (`Initialize`, `Heartbeat`, `Cancel`,
/// `Terminate`) are answered here. Everything else runs on its own task so a
/// `CancelRequest` can abort it and a panicking engine call only fails its
/// own request.
pub struct Dispatcher {
    codec: Codec,
    engine: Arc<dyn EngineClient>,
    running: DashMap<i64, AbortHandle>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("running", &self.running.len())
            .field("shutdown", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(codec: Codec, engine: Arc<dyn EngineClient>) -> Arc<Self> {
        Arc::new(Self {
            codec,
            engine,
            running: DashMap::new(),
            shutdown: CancellationToken::new(),
        })
    }

    /// Cancelled once a `TerminateRequest` has been answered.
    #[must_use]
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Number of engine calls currently running.
    #[must_use]
    pub fn in_progress(&self) -> usize {
        self.running.len()
    }

    /// Handles one request and returns its reply.
    ///
    /// The reply always carries the request's ID. Engine failures, panics and
    /// cancellations are reported through the reply's error, never as `Err`.
    ///
    /// # Errors
    ///
    /// [`ProxyError::UnexpectedMessage`] if `request` is not a request, or
    /// [`ProxyError::UnknownMessageType`] if its reply type is not registered.
    pub async fn dispatch(
        self: &Arc<Self>,
        request: Box<dyn ProxyMessage>,
    ) -> Result<Box<dyn ProxyMessage>, ProxyError> {
        let message_type = request.message_type();
        let reply_type = request
            .as_reply_type()
            .map(HasReplyType::reply_type)
            .ok_or(ProxyError::UnexpectedMessage(message_type))?;
        let request_id = request.request_id().unwrap_or_default();
        let reply = self.codec.registry().create_message(reply_type)?;
        debug!(request_id, %message_type, "Dispatching request");

        let outcome = match message_type {
            MessageType::InitializeRequest => {
                if let Some(init) = request.downcast_ref::<InitializeRequest>() {
                    debug!(
                        address = init.library_address().unwrap_or_default(),
                        "Library initialized"
                    );
                }
                Ok(reply)
            }
            MessageType::HeartbeatRequest | MessageType::TerminateRequest => Ok(reply),
            MessageType::CancelRequest => self.cancel_running(request.as_ref(), reply),
            _ => self.forward(request_id, request, reply).await,
        };

        let mut reply = match outcome {
            Ok(reply) => reply,
            Err(error) => {
                debug!(request_id, %message_type, %error, "Request failed");
                let mut reply = self.codec.registry().create_message(reply_type)?;
                reply
                    .as_error_mut()
                    .ok_or(ProxyError::UnexpectedMessage(reply_type))?
                    .set_error(Some(&error));
                reply
            }
        };
        reply
            .as_request_id_mut()
            .ok_or(ProxyError::UnexpectedMessage(reply_type))?
            .set_request_id(request_id);
        Ok(reply)
    }

    /// Decodes a request frame, dispatches it and encodes the reply.
    ///
    /// Answering a `TerminateRequest` triggers the shutdown token.
    pub async fn handle_frame(self: &Arc<Self>, frame: &[u8]) -> Result<Vec<u8>, ProxyError> {
        let request = self.codec.decode(frame)?;
        let terminate = request.message_type() == MessageType::TerminateRequest;
        let reply = self.respond(request).await?;
        if terminate {
            self.shutdown.cancel();
        }
        Ok(reply)
    }

    /// Serves requests from `source` until the peer goes away, `token` is
    /// cancelled or a `TerminateRequest` has been answered.
    ///
    /// Each request runs on its own task; replies go out through `sink` in
    /// completion order. Bad frames are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns the transport error that ended the loop, if any.
    pub async fn serve<S>(
        self: &Arc<Self>,
        mut source: S,
        sink: Arc<dyn FrameSink>,
        token: CancellationToken,
    ) -> Result<(), ProxyError>
    where
        S: FrameSource,
    {
        loop {
            tokio::select! {
                biased;

                () = token.cancelled() => {
                    debug!("Dispatcher cancelled");
                    break;
                }

                () = self.shutdown.cancelled() => {
                    debug!("Dispatcher terminated by peer");
                    break;
                }

                next = source.next_frame() => match next {
                    Ok(Some(frame)) => match self.codec.decode(&frame) {
                        Ok(request) => self.spawn_request(request, Arc::clone(&sink)),
                        Err(e) => warn!(error = %e, "Dropped inbound frame"),
                    },
                    Ok(None) => {
                        debug!("Request connection closed");
                        break;
                    }
                    Err(e) if e.is_protocol_error() => {
                        warn!(error = %e, "Dropped inbound frame");
                    }
                    Err(e) => {
                        error!(error = %e, "Request source failed");
                        return Err(e);
                    }
                },
            }
        }
        Ok(())
    }

    fn spawn_request(self: &Arc<Self>, request: Box<dyn ProxyMessage>, sink: Arc<dyn FrameSink>) {
        let dispatcher = Arc::clone(self);
        tokio::spawn(async move {
            let terminate = request.message_type() == MessageType::TerminateRequest;
            match dispatcher.respond(request).await {
                Ok(frame) => {
                    if let Err(e) = sink.send_frame(frame).await {
                        error!(error = %e, "Failed to transmit reply");
                    }
                }
                Err(e) => warn!(error = %e, "Dropped request"),
            }
            if terminate {
                dispatcher.shutdown.cancel();
            }
        });
    }

    async fn respond(self: &Arc<Self>, request: Box<dyn ProxyMessage>) -> Result<Vec<u8>, ProxyError> {
        let reply = self.dispatch(request).await?;
        trace!(request_id = reply.request_id(), message_type = %reply.message_type(), "Reply built");
        self.codec.encode(reply.as_ref())
    }

    fn cancel_running(&self, request: &dyn ProxyMessage, mut reply: Box<dyn ProxyMessage>) -> DispatchResult {
        let target = request
            .downcast_ref::<CancelRequest>()
            .ok_or(ProxyError::UnexpectedMessage(request.message_type()))
            .and_then(CancelRequest::target_request_id)
            .map_err(|e| ErrorEnvelope::from(EngineError::from(e)))?;

        let was_cancelled = match self.running.remove(&target) {
            Some((_, handle)) => {
                handle.abort();
                true
            }
            None => false,
        };
        debug!(target_request_id = target, was_cancelled, "Cancel requested");

        if let Some(reply) = reply.downcast_mut::<CancelReply>() {
            reply.set_was_cancelled(was_cancelled);
        }
        Ok(reply)
    }

    async fn forward(
        self: &Arc<Self>,
        request_id: i64,
        request: Box<dyn ProxyMessage>,
        reply: Box<dyn ProxyMessage>,
    ) -> DispatchResult {
        let engine = Arc::clone(&self.engine);
        let handle = tokio::spawn(call_engine(engine, request, reply));
        let task_id = handle.id();
        let tracked = request_id != 0
            && match self.running.entry(request_id) {
                Entry::Vacant(slot) => {
                    slot.insert(handle.abort_handle());
                    true
                }
                Entry::Occupied(_) => {
                    warn!(request_id, "Request ID already running; duplicate is not cancellable");
                    false
                }
            };

        let joined = handle.await;
        if tracked {
            self.running.remove_if(&request_id, |_, running| running.id() == task_id);
        }

        match joined {
            Ok(Ok(reply)) => Ok(reply),
            Ok(Err(err)) => Err(err.into()),
            Err(join_err) if join_err.is_panic() => {
                let message = panic_message(join_err.into_panic());
                warn!(request_id, %message, "Engine call panicked");
                Err(ErrorEnvelope::new(ErrorType::Panic, message))
            }
            Err(_) => Err(ErrorEnvelope::new(ErrorType::Cancelled, "request was cancelled")),
        }
    }
}

async fn call_engine(
    engine: Arc<dyn EngineClient>,
    request: Box<dyn ProxyMessage>,
    mut reply: Box<dyn ProxyMessage>,
) -> Result<Box<dyn ProxyMessage>, EngineError> {
    match request.message_type() {
        MessageType::ConnectRequest => {
            let request = request.downcast::<ConnectRequest>()?;
            engine.connect(Connect::from(&*request)).await?;
        }
        MessageType::DomainRegisterRequest => {
            let request = request.downcast::<DomainRegisterRequest>()?;
            engine
                .register_domain(RegisterDomain::try_from(&*request)?)
                .await?;
        }
        MessageType::DomainDescribeRequest => {
            let request = request.downcast::<DomainDescribeRequest>()?;
            let name = request.name().unwrap_or_default().to_string();
            let description = engine.describe_domain(name).await?;
            description.write_to(reply_mut::<DomainDescribeReply>(&mut reply)?);
        }
        MessageType::DomainUpdateRequest => {
            let request = request.downcast::<DomainUpdateRequest>()?;
            engine.update_domain(UpdateDomain::try_from(&*request)?).await?;
        }
        MessageType::WorkflowRegisterRequest => {
            let request = request.downcast::<WorkflowRegisterRequest>()?;
            let name = request.name().unwrap_or_default().to_string();
            engine.register_workflow(name).await?;
        }
        MessageType::WorkflowExecuteRequest => {
            let request = request.downcast::<WorkflowExecuteRequest>()?;
            let params = StartWorkflow::try_from(&*request)?;
            let decision_timeout = params
                .options
                .decision_task_start_to_close_timeout
                .unwrap_or_default();
            let execution = engine.execute_workflow(params).await?;
            let reply = reply_mut::<WorkflowExecuteReply>(&mut reply)?;
            reply.set_execution(Some(&execution))?;
            reply.set_decision_timeout(decision_timeout);
        }
        other => {
            return Err(EngineError::generic(format!("unsupported request {other}")));
        }
    }
    Ok(reply)
}

fn reply_mut<T: ProxyMessage>(reply: &mut Box<dyn ProxyMessage>) -> Result<&mut T, ProxyError> {
    let message_type = reply.message_type();
    reply
        .downcast_mut::<T>()
        .ok_or(ProxyError::UnexpectedMessage(message_type))
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "engine call panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;
    use crate::common::engine::{DomainDescription, EngineResult, WorkflowExecution};
    use crate::common::transport::channel_pair;
    use crate::common::MessageRegistry;
    use crate::messages::{
        DomainRegisterReply, DomainStatus, HeartbeatReply, HeartbeatRequest, TerminateReply,
        TerminateRequest,
    };
    use crate::traits::{HasError, HasRequestId};

    #[derive(Default)]
    struct TestEngine {
        started: Notify,
    }

    #[async_trait]
    impl EngineClient for TestEngine {
        async fn connect(&self, _params: Connect) -> EngineResult<()> {
            Ok(())
        }

        async fn register_domain(&self, params: RegisterDomain) -> EngineResult<()> {
            match params.name.as_str() {
                "existing" => Err(EngineError::generic("domain already exists")),
                "explode" => panic!("engine exploded"),
                _ => Ok(()),
            }
        }

        async fn describe_domain(&self, name: String) -> EngineResult<DomainDescription> {
            Ok(DomainDescription {
                name,
                status: DomainStatus::Registered,
                retention_days: 7,
                ..DomainDescription::default()
            })
        }

        async fn update_domain(&self, _params: UpdateDomain) -> EngineResult<()> {
            Ok(())
        }

        async fn register_workflow(&self, _name: String) -> EngineResult<()> {
            Ok(())
        }

        async fn execute_workflow(&self, _params: StartWorkflow) -> EngineResult<WorkflowExecution> {
            self.started.notify_one();
            std::future::pending().await
        }
    }

    fn dispatcher() -> (Arc<Dispatcher>, Arc<TestEngine>) {
        let registry = Arc::new(MessageRegistry::with_all_messages().unwrap());
        let engine = Arc::new(TestEngine::default());
        let dispatcher = Dispatcher::new(Codec::new(registry), Arc::clone(&engine) as Arc<dyn EngineClient>);
        (dispatcher, engine)
    }

    fn register_request(request_id: i64, name: &str) -> Box<dyn ProxyMessage> {
        let mut request = DomainRegisterRequest::from(&RegisterDomain::new(name));
        request.set_request_id(request_id);
        Box::new(request)
    }

    #[tokio::test]
    async fn test_heartbeat_is_answered_locally() {
        let (dispatcher, _) = dispatcher();
        let mut request = HeartbeatRequest::new();
        request.set_request_id(555);

        let reply = dispatcher.dispatch(Box::new(request)).await.unwrap();
        let reply = reply.downcast::<HeartbeatReply>().unwrap();
        assert_eq!(reply.request_id(), 555);
        assert_eq!(reply.error().unwrap(), None);
    }

    #[tokio::test]
    async fn test_engine_failure_becomes_generic_error() {
        let (dispatcher, _) = dispatcher();

        let reply = dispatcher.dispatch(register_request(10, "orders")).await.unwrap();
        let reply = reply.downcast::<DomainRegisterReply>().unwrap();
        assert_eq!(reply.request_id(), 10);
        assert!(reply.into_result().is_ok());

        let reply = dispatcher.dispatch(register_request(11, "existing")).await.unwrap();
        let reply = reply.downcast::<DomainRegisterReply>().unwrap();
        assert_eq!(reply.request_id(), 11);
        let error = reply.error().unwrap().unwrap();
        assert_eq!(error.kind, ErrorType::Generic);
        assert_eq!(error.message, "domain already exists");
    }

    #[tokio::test]
    async fn test_engine_panic_becomes_panic_error() {
        let (dispatcher, _) = dispatcher();
        let reply = dispatcher.dispatch(register_request(12, "explode")).await.unwrap();
        assert_eq!(reply.request_id(), Some(12));

        let error = reply.as_error().unwrap().error().unwrap().unwrap();
        assert_eq!(error.kind, ErrorType::Panic);
        assert_eq!(error.message, "engine exploded");
        assert_eq!(dispatcher.in_progress(), 0);
    }

    #[tokio::test]
    async fn test_describe_fills_reply() {
        let (dispatcher, _) = dispatcher();
        let mut request = DomainDescribeRequest::new();
        request.set_request_id(13);
        request.set_name(Some("orders"));

        let reply = dispatcher.dispatch(Box::new(request)).await.unwrap();
        let reply = reply.downcast::<DomainDescribeReply>().unwrap();
        assert_eq!(reply.domain_info_name(), Some("orders"));
        assert_eq!(reply.domain_info_status().unwrap(), DomainStatus::Registered);
        assert_eq!(reply.configuration_retention_days().unwrap(), 7);
    }

    #[tokio::test]
    async fn test_cancel_aborts_running_request() {
        let (dispatcher, engine) = dispatcher();
        let mut execute = WorkflowExecuteRequest::new();
        execute.set_request_id(20);
        execute.set_name(Some("checkout"));

        let running = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.dispatch(Box::new(execute)).await })
        };
        engine.started.notified().await;
        assert_eq!(dispatcher.in_progress(), 1);

        let mut cancel = CancelRequest::new();
        cancel.set_request_id(21);
        cancel.set_target_request_id(20);
        let reply = dispatcher.dispatch(Box::new(cancel)).await.unwrap();
        let reply = reply.downcast::<CancelReply>().unwrap();
        assert_eq!(reply.request_id(), 21);
        assert!(reply.was_cancelled().unwrap());

        let reply = running.await.unwrap().unwrap();
        assert_eq!(reply.request_id(), Some(20));
        let error = reply.as_error().unwrap().error().unwrap().unwrap();
        assert_eq!(error.kind, ErrorType::Cancelled);
        assert_eq!(dispatcher.in_progress(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_request_id_keeps_first_cancellable() {
        let (dispatcher, engine) = dispatcher();
        let mut execute = WorkflowExecuteRequest::new();
        execute.set_request_id(40);
        execute.set_name(Some("checkout"));

        let running = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move { dispatcher.dispatch(Box::new(execute)).await })
        };
        engine.started.notified().await;

        let reply = dispatcher.dispatch(register_request(40, "orders")).await.unwrap();
        assert_eq!(reply.request_id(), Some(40));
        assert_eq!(dispatcher.in_progress(), 1);

        let mut cancel = CancelRequest::new();
        cancel.set_request_id(41);
        cancel.set_target_request_id(40);
        let reply = dispatcher.dispatch(Box::new(cancel)).await.unwrap();
        assert!(reply.downcast::<CancelReply>().unwrap().was_cancelled().unwrap());

        let reply = running.await.unwrap().unwrap();
        let error = reply.as_error().unwrap().error().unwrap().unwrap();
        assert_eq!(error.kind, ErrorType::Cancelled);
        assert_eq!(dispatcher.in_progress(), 0);
    }

    #[tokio::test]
    async fn test_cancel_unknown_request() {
        let (dispatcher, _) = dispatcher();
        let mut cancel = CancelRequest::new();
        cancel.set_request_id(30);
        cancel.set_target_request_id(999_999);

        let reply = dispatcher.dispatch(Box::new(cancel)).await.unwrap();
        let reply = reply.downcast::<CancelReply>().unwrap();
        assert!(!reply.was_cancelled().unwrap());
    }

    #[tokio::test]
    async fn test_reply_is_not_dispatched() {
        let (dispatcher, _) = dispatcher();
        let err = dispatcher
            .dispatch(Box::new(HeartbeatReply::new()))
            .await
            .unwrap_err();
        assert_eq!(err, ProxyError::UnexpectedMessage(MessageType::HeartbeatReply));
    }

    #[tokio::test]
    async fn test_terminate_triggers_shutdown() {
        let (dispatcher, _) = dispatcher();
        let mut request = TerminateRequest::new();
        request.set_request_id(40);
        let frame = dispatcher.codec.encode(&request).unwrap();

        let reply_frame = dispatcher.handle_frame(&frame).await.unwrap();
        let reply = dispatcher.codec.decode(&reply_frame).unwrap();
        assert!(reply.is::<TerminateReply>());
        assert_eq!(reply.request_id(), Some(40));
        assert!(dispatcher.shutdown_token().is_cancelled());
    }

    #[tokio::test]
    async fn test_serve_skips_bad_and_unknown_frames_and_stops_on_terminate() {
        let (dispatcher, _) = dispatcher();
        let codec = dispatcher.codec.clone();
        let (local, mut peer) = channel_pair(8);
        let server = {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                dispatcher
                    .serve(local.source, Arc::new(local.sink), CancellationToken::new())
                    .await
            })
        };

        peer.sink.send_frame(vec![0, 0, 0, 1, 7]).await.unwrap();
        let mut unknown = codec.encode(&HeartbeatRequest::new()).unwrap();
        unknown[4..8].copy_from_slice(&9999u32.to_be_bytes());
        assert_eq!(
            codec.decode(&unknown).unwrap_err(),
            ProxyError::UnknownMessageType(9999)
        );
        peer.sink.send_frame(unknown).await.unwrap();
        let mut heartbeat = HeartbeatRequest::new();
        heartbeat.set_request_id(50);
        peer.sink.send_frame(codec.encode(&heartbeat).unwrap()).await.unwrap();

        let frame = peer.source.next_frame().await.unwrap().unwrap();
        assert_eq!(codec.decode(&frame).unwrap().request_id(), Some(50));

        let mut terminate = TerminateRequest::new();
        terminate.set_request_id(51);
        peer.sink.send_frame(codec.encode(&terminate).unwrap()).await.unwrap();

        let frame = peer.source.next_frame().await.unwrap().unwrap();
        assert!(codec.decode(&frame).unwrap().is::<TerminateReply>());
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }
}
