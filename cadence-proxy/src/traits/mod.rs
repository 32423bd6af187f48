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

//! The object-safe message trait and the capabilities layered on it.
//!
//! *   [`ProxyMessage`]: implemented by everything built on a
//!     [`MessageEnvelope`](crate::message::MessageEnvelope).
//! *   [`HasRequestId`], [`HasReplyType`], [`HasError`]: request and reply
//!     capabilities, reached from a `dyn ProxyMessage` through its probes.

pub use proxy_message::{HasError, HasReplyType, HasRequestId, ProxyMessage};

pub(crate) use proxy_message::concrete_type_id;

/// Defines [`ProxyMessage`] and the capability traits.
mod proxy_message;
