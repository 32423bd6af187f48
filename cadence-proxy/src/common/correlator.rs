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

//! Request/reply correlation.
//!
//! Every outbound request gets a fresh request ID and an entry in the
//! in-flight table. The entry is resolved by exactly one of: the matching
//! reply, a cancellation, the deadline, or the connection closing. All of
//! them race by removing the entry under the same lock, so whichever removes
//! it first decides the outcome.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

use crate::common::config::ProxyConfig;
use crate::common::transport::{FrameSink, FrameSource};
use crate::common::{Codec, ProxyError};
use crate::message::MessageType;
use crate::traits::{HasReplyType, ProxyMessage};

static NEXT_REQUEST_ID: AtomicI64 = AtomicI64::new(1);

/// Allocates a process-wide unique request ID. IDs start at 1 and only grow.
pub fn next_request_id() -> i64 {
    NEXT_REQUEST_ID.fetch_add(1, Ordering::Relaxed)
}

type ReplyResult = Result<Box<dyn ProxyMessage>, ProxyError>;

struct Pending {
    reply_type: MessageType,
    tx: oneshot::Sender<ReplyResult>,
}

/// State guarded by the correlator lock.
#[derive(Default)]
struct InFlight {
    pending: HashMap<i64, Pending>,
    /// Cancelled or timed-out IDs whose late reply is dropped quietly.
    retired: HashMap<i64, Instant>,
}

impl InFlight {
    fn prune(&mut self, now: Instant, ttl: Duration) {
        self.retired
            .retain(|_, retired_at| now.saturating_duration_since(*retired_at) < ttl);
    }

    fn retire(&mut self, request_id: i64, ttl: Duration) -> Option<Pending> {
        let pending = self.pending.remove(&request_id)?;
        let now = Instant::now();
        self.prune(now, ttl);
        self.retired.insert(request_id, now);
        Some(pending)
    }
}

/// What happened to an inbound reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// Delivered to the waiting caller.
    Matched,
    /// Late reply for a cancelled or timed-out request; dropped.
    Discarded,
}

/// Matches inbound replies to the requests awaiting them.
pub struct Correlator {
    codec: Codec,
    sink: Arc<dyn FrameSink>,
    in_flight: Mutex<InFlight>,
    request_timeout: Option<Duration>,
    retired_reply_ttl: Duration,
}

impl std::fmt::Debug for Correlator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Correlator")
            .field("in_flight", &self.in_flight())
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Correlator {
    /// Creates a correlator transmitting through `sink`.
    ///
    /// A `request_timeout_ms` of zero disables the default deadline. The
    /// codec is held to `limits.max_frame_size`.
    #[must_use]
    pub fn new(codec: Codec, sink: Arc<dyn FrameSink>, config: &ProxyConfig) -> Arc<Self> {
        let request_timeout = Some(config.request_timeout()).filter(|timeout| !timeout.is_zero());
        Arc::new(Self {
            codec: codec.limited_to(config.limits.max_frame_size),
            sink,
            in_flight: Mutex::new(InFlight::default()),
            request_timeout,
            retired_reply_ttl: config.retired_reply_ttl(),
        })
    }

    #[must_use]
    pub const fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Number of requests awaiting a reply.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.lock().pending.len()
    }

    /// Sends a request with the default deadline.
    ///
    /// See [`send_with_timeout`](Self::send_with_timeout).
    pub async fn send(self: &Arc<Self>, request: &mut dyn ProxyMessage) -> Result<PendingReply, ProxyError> {
        self.send_with_timeout(request, self.request_timeout).await
    }

    /// Assigns a fresh request ID to `request`, records it as in flight and
    /// transmits it. `None` waits without a deadline.
    ///
    /// # Errors
    ///
    /// * [`ProxyError::UnexpectedMessage`] if `request` is not a request.
    /// * Encoding or transmit failures; the request is no longer in flight.
    pub async fn send_with_timeout(
        self: &Arc<Self>,
        request: &mut dyn ProxyMessage,
        timeout: Option<Duration>,
    ) -> Result<PendingReply, ProxyError> {
        let message_type = request.message_type();
        let reply_type = request
            .as_reply_type()
            .map(HasReplyType::reply_type)
            .ok_or(ProxyError::UnexpectedMessage(message_type))?;
        let request_id = next_request_id();
        request
            .as_request_id_mut()
            .ok_or(ProxyError::UnexpectedMessage(message_type))?
            .set_request_id(request_id);
        let frame = self.codec.encode(&*request)?;

        let (tx, rx) = oneshot::channel();
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        self.in_flight
            .lock()
            .pending
            .insert(request_id, Pending { reply_type, tx });

        if let Err(e) = self.sink.send_frame(frame).await {
            self.in_flight.lock().pending.remove(&request_id);
            warn!(request_id, %message_type, error = %e, "Failed to transmit request");
            return Err(e);
        }
        trace!(request_id, %message_type, "Request sent");

        Ok(PendingReply {
            request_id,
            rx: Some(rx),
            deadline,
            correlator: Arc::clone(self),
        })
    }

    /// Sends a request and waits for its reply.
    pub async fn call(self: &Arc<Self>, request: &mut dyn ProxyMessage) -> ReplyResult {
        self.send(request).await?.wait().await
    }

    /// Cancels an in-flight request; its waiter resolves with
    /// [`ProxyError::Cancelled`]. Returns `false` if the request was not in flight.
    pub fn cancel(&self, request_id: i64) -> bool {
        let pending = self.in_flight.lock().retire(request_id, self.retired_reply_ttl);
        match pending {
            Some(pending) => {
                let _ = pending.tx.send(Err(ProxyError::Cancelled));
                debug!(request_id, "Request cancelled");
                true
            }
            None => false,
        }
    }

    /// Routes an inbound reply to its waiter.
    ///
    /// # Errors
    ///
    /// * [`ProxyError::UnexpectedMessage`] if the message is not a reply.
    /// * [`ProxyError::Unmatched`] if the ID was never issued or already resolved.
    /// * [`ProxyError::ReplyTypeMismatch`] if the reply has the wrong type; the
    ///   waiter receives the same error.
    pub fn on_reply(&self, reply: Box<dyn ProxyMessage>) -> Result<ReplyOutcome, ProxyError> {
        if !reply.is_reply() {
            return Err(ProxyError::UnexpectedMessage(reply.message_type()));
        }
        let request_id = reply.request_id().unwrap_or_default();

        let pending = {
            let mut table = self.in_flight.lock();
            match table.pending.remove(&request_id) {
                Some(pending) => pending,
                None => {
                    table.prune(Instant::now(), self.retired_reply_ttl);
                    return if table.retired.remove(&request_id).is_some() {
                        debug!(request_id, "Discarded late reply");
                        Ok(ReplyOutcome::Discarded)
                    } else {
                        Err(ProxyError::Unmatched(request_id))
                    };
                }
            }
        };

        let actual = reply.message_type();
        if actual != pending.reply_type {
            let err = ProxyError::ReplyTypeMismatch {
                expected: pending.reply_type,
                actual,
            };
            let _ = pending.tx.send(Err(err.clone()));
            return Err(err);
        }

        if pending.tx.send(Ok(reply)).is_err() {
            trace!(request_id, "Waiter dropped before its reply arrived");
        }
        trace!(request_id, message_type = %actual, "Reply matched");
        Ok(ReplyOutcome::Matched)
    }

    /// Decodes a frame and routes it as a reply.
    pub fn on_frame(&self, frame: &[u8]) -> Result<ReplyOutcome, ProxyError> {
        let reply = self.codec.decode(frame)?;
        self.on_reply(reply)
    }

    /// Resolves every in-flight request with [`ProxyError::ConnectionClosed`].
    pub fn close(&self) {
        let drained: Vec<(i64, Pending)> = self.in_flight.lock().pending.drain().collect();
        for (request_id, pending) in drained {
            trace!(request_id, "Failing request on close");
            let _ = pending.tx.send(Err(ProxyError::ConnectionClosed));
        }
    }

    /// Removes a request whose deadline passed. Returns `false` if something
    /// else resolved it first.
    fn expire(&self, request_id: i64) -> bool {
        let expired = self
            .in_flight
            .lock()
            .retire(request_id, self.retired_reply_ttl)
            .is_some();
        if expired {
            debug!(request_id, "Request timed out");
        }
        expired
    }

    /// Feeds every frame from `source` through [`on_frame`](Self::on_frame)
    /// until the connection closes or `token` is cancelled.
    ///
    /// Protocol errors are logged and the loop carries on. When the loop
    /// ends, requests still in flight fail with
    /// [`ProxyError::ConnectionClosed`].
    pub fn spawn_receiver<S>(self: &Arc<Self>, mut source: S, token: CancellationToken) -> JoinHandle<()>
    where
        S: FrameSource,
    {
        let correlator = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    biased;

                    () = token.cancelled() => {
                        debug!("Reply receiver cancelled");
                        break;
                    }

                    next = source.next_frame() => match next {
                        Ok(Some(frame)) => match correlator.on_frame(&frame) {
                            Ok(outcome) => trace!(?outcome, "Reply processed"),
                            Err(e) => warn!(error = %e, "Dropped inbound frame"),
                        },
                        Ok(None) => {
                            debug!("Reply connection closed");
                            break;
                        }
                        Err(e) if e.is_protocol_error() => {
                            warn!(error = %e, "Dropped inbound frame");
                        }
                        Err(e) => {
                            error!(error = %e, "Reply receiver failed");
                            break;
                        }
                    },
                }
            }
            correlator.close();
        })
    }
}

/// Handle on a request awaiting its reply.
///
/// Dropping the handle without waiting abandons the request: it is retired
/// like a cancelled one.
#[derive(Debug)]
pub struct PendingReply {
    request_id: i64,
    rx: Option<oneshot::Receiver<ReplyResult>>,
    deadline: Option<Instant>,
    correlator: Arc<Correlator>,
}

impl PendingReply {
    #[must_use]
    pub const fn request_id(&self) -> i64 {
        self.request_id
    }

    /// Cancels the request. See [`Correlator::cancel`].
    pub fn cancel(&self) -> bool {
        self.correlator.cancel(self.request_id)
    }

    /// Waits for the reply, a cancellation or the deadline.
    ///
    /// Dropping the returned future before it resolves abandons the request
    /// the same way dropping the handle does.
    pub async fn wait(mut self) -> ReplyResult {
        let result = match (self.rx.as_mut(), self.deadline) {
            (None, _) => return Err(ProxyError::Cancelled),
            (Some(rx), None) => rx.await.unwrap_or(Err(ProxyError::ConnectionClosed)),
            (Some(rx), Some(deadline)) => tokio::select! {
                result = &mut *rx => result.unwrap_or(Err(ProxyError::ConnectionClosed)),
                () = tokio::time::sleep_until(deadline) => {
                    if self.correlator.expire(self.request_id) {
                        Err(ProxyError::Timeout)
                    } else {
                        // Resolved concurrently; the result is already on its way.
                        rx.await.unwrap_or(Err(ProxyError::ConnectionClosed))
                    }
                }
            },
        };
        self.rx = None;
        result
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        if self.rx.is_some() {
            self.correlator.cancel(self.request_id);
        }
    }
}
