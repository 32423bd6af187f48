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

#![forbid(unsafe_code)]

//! # Cadence Proxy
//!
//! The message protocol of a bridge that lets one process drive a workflow
//! engine client living in another. Both sides exchange self-describing
//! envelopes: a numeric type tag, a string property bag and binary
//! attachments, framed with a length prefix.
//!
//! ## Key Concepts
//!
//! - **Envelopes (`MessageEnvelope`)**: the unit of exchange. Concrete
//!   requests and replies wrap a `ProxyRequest` or `ProxyReply` and expose
//!   typed accessors over its `PropertyBag`.
//! - **Registry (`MessageRegistry`)**: maps wire tags to concrete types, so a
//!   decoded frame comes back as the same type that was encoded.
//! - **Codec (`Codec`)**: the binary frame layout.
//! - **Correlation (`Correlator`)**: every request gets a fresh ID; replies
//!   are matched back to their waiter, with cancellation and deadlines.
//! - **Dispatch (`Dispatcher`)**: the serving side, forwarding requests to an
//!   `EngineClient` and reporting failures through `ErrorEnvelope`s.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//!
//! use cadence_proxy::engine::RegisterDomain;
//! use cadence_proxy::prelude::*;
//! use cadence_proxy::channel_pair;
//!
//! let config = ProxyConfig::load();
//! let codec = Codec::new(Arc::new(MessageRegistry::with_all_messages()?));
//! let (local, remote) = channel_pair(config.limits.channel_capacity);
//!
//! // Serving side: answer requests with an engine client.
//! let dispatcher = Dispatcher::new(codec.clone(), engine);
//! tokio::spawn(async move {
//!     dispatcher.serve(remote.source, Arc::new(remote.sink), token).await
//! });
//!
//! // Calling side: typed calls matched back through the correlator.
//! let correlator = Correlator::new(codec, Arc::new(local.sink), &config);
//! correlator.spawn_receiver(local.source, CancellationToken::new());
//! let client = ProxyClient::new(correlator);
//! client.register_domain(&RegisterDomain::new("orders")).await?;
//! ```

extern crate self as cadence_proxy;

/// Registry, codec, correlation, dispatch, transport and configuration.
pub(crate) mod common;

/// Envelopes, the property bag and the error taxonomy.
pub(crate) mod message;

/// Concrete request and reply types.
pub mod messages;

/// The message trait and its capabilities.
pub(crate) mod traits;

pub use common::{
    channel_pair, init_tracing, next_request_id, split_stream, ChannelEndpoint, ChannelSink,
    ChannelSource, Codec, Correlator, Dispatcher, EngineClient, EngineError, EngineResult,
    FrameSink, FrameSource, MessageFactory, MessageRegistry, PendingReply, ProxyClient,
    ProxyConfig, ProxyError, ReplyOutcome, StreamSink, StreamSource,
};
pub use message::{
    ErrorEnvelope, ErrorType, MessageEnvelope, MessageType, PropertyBag, ProxyReply,
    ProxyRequest, ERROR_KEY, REQUEST_ID_KEY, RESERVED_KEYS,
};
pub use traits::{HasError, HasReplyType, HasRequestId, ProxyMessage};

/// Parameter and result types of the engine boundary.
pub mod engine {
    pub use crate::common::{
        Connect, DomainDescription, DomainStatus, EngineClient, EngineError, EngineResult,
        RegisterDomain, StartWorkflow, StartWorkflowOptions, UpdateDomain, WorkflowExecution,
        DEFAULT_RETENTION_DAYS,
    };
}

/// Configuration sections and tracing setup.
pub mod config {
    pub use crate::common::{
        build_filter, init_tracing, LimitsConfig, LoggingConfig, ProxyConfig, TimeoutConfig,
    };
}

/// Length-prefixed framing over tokio byte streams.
pub mod protocol {
    pub use crate::common::protocol::{read_frame, write_frame, LENGTH_PREFIX_SIZE, MAX_FRAME_SIZE};
    pub use crate::common::NULL_LENGTH;
}

/// A prelude module for conveniently importing the most commonly used items.
///
/// # Re-exports
///
/// ## Macros (from `cadence-proxy-macro`)
/// *   [`cadence_proxy_macro::proxy_message`]: Attribute macro for defining message types.
///
/// ## External Crates
/// *   [`async_trait::async_trait`](https://docs.rs/async-trait/latest/async_trait/attr.async_trait.html):
///     needed to implement [`EngineClient`], [`FrameSink`] and [`FrameSource`].
pub mod prelude {
    pub use async_trait::async_trait;
    pub use cadence_proxy_macro::proxy_message;

    pub use crate::common::{
        Codec, Correlator, Dispatcher, EngineClient, EngineError, EngineResult, FrameSink,
        FrameSource, MessageRegistry, ProxyClient, ProxyConfig, ProxyError,
    };
    pub use crate::message::{
        ErrorEnvelope, ErrorType, MessageEnvelope, MessageType, PropertyBag, ProxyReply,
        ProxyRequest,
    };
    pub use crate::traits::{HasError, HasReplyType, HasRequestId, ProxyMessage};
}
