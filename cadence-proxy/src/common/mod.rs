//! Runtime components of the proxy protocol.
//!
//! This module gathers everything that moves messages: the type registry and
//! codec, the framing and transport layer, the correlator on the calling side,
//! and the dispatcher and engine boundary on the serving side. Configuration,
//! logging setup and the crate error type live here too.
//!
//! # Key Re-exported Components:
//!
//! *   [`MessageRegistry`]: Maps wire tags to concrete message types.
//! *   [`Codec`]: Encodes messages into frames and decodes them back.
//! *   [`Correlator`]: Matches replies to the requests awaiting them.
//! *   [`Dispatcher`]: Answers requests by calling an [`EngineClient`].
//! *   [`ProxyClient`]: Typed calls against a remote proxy.
//! *   [`ProxyConfig`]: Timeouts, limits and logging settings.

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

// --- Public Re-exports ---
pub use client::ProxyClient;
pub use codec::{Codec, NULL_LENGTH};
pub use config::{LimitsConfig, LoggingConfig, ProxyConfig, TimeoutConfig};
pub use correlator::{next_request_id, Correlator, PendingReply, ReplyOutcome};
pub use dispatcher::Dispatcher;
pub use engine::{
    Connect, DomainDescription, DomainStatus, EngineClient, EngineError, EngineResult,
    RegisterDomain, StartWorkflow, StartWorkflowOptions, UpdateDomain, WorkflowExecution,
    DEFAULT_RETENTION_DAYS,
};
pub use logging::{build_filter, init_tracing};
pub use proxy_error::ProxyError;
pub use registry::{MessageFactory, MessageRegistry};
pub use transport::{
    channel_pair, split_stream, ChannelEndpoint, ChannelSink, ChannelSource, FrameSink,
    FrameSource, StreamSink, StreamSource,
};

// --- Submodules ---

/// Defines the crate error type.
mod proxy_error;
/// Defines the tag to factory registry.
mod registry;
/// Defines the length-prefixed async framing functions.
pub(crate) mod protocol;
/// Defines the binary frame codec.
mod codec;
/// Defines the frame sink and source abstractions.
mod transport;
/// Defines request ID allocation and reply correlation.
mod correlator;
/// Defines the engine client capability trait and its parameter types.
mod engine;
/// Defines the serving side of the protocol.
mod dispatcher;
/// Defines the typed calling side of the protocol.
mod client;
/// Defines the configuration system.
mod config;
/// Defines tracing subscriber setup.
mod logging;
