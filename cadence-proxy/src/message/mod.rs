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

//! Message envelopes, the typed property bag and the error taxonomy.
//!
//! # Key Components
//!
//! *   [`MessageEnvelope`]: type tag, property bag and attachments; the unit of exchange.
//! *   [`PropertyBag`]: string-keyed payload with typed accessors over a canonical
//!     string representation.
//! *   [`ProxyRequest`] / [`ProxyReply`]: the request and reply bases every concrete
//!     message is composed from.
//! *   [`ErrorEnvelope`] and [`ErrorType`]: the failure a reply can carry.
//! *   [`MessageType`]: the numeric tag selecting the wire schema.

pub use envelope::{MessageEnvelope, ERROR_KEY, REQUEST_ID_KEY, RESERVED_KEYS};
pub use error_envelope::{ErrorEnvelope, ErrorType};
pub use message_type::MessageType;
pub use property_bag::PropertyBag;
pub use proxy_reply::ProxyReply;
pub use proxy_request::ProxyRequest;

/// Defines [`MessageEnvelope`] and the reserved property keys.
mod envelope;
/// Defines [`ErrorEnvelope`] and [`ErrorType`].
mod error_envelope;
/// Defines [`MessageType`].
mod message_type;
/// Defines [`PropertyBag`].
mod property_bag;
/// Defines [`ProxyReply`].
mod proxy_reply;
/// Defines [`ProxyRequest`].
mod proxy_request;
