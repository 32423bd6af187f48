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

//! Error type shared by every layer of the proxy protocol.

use std::fmt;

use crate::message::{ErrorEnvelope, MessageType};

/// Errors produced while building, encoding, decoding, or correlating proxy messages.
///
/// The first group (`Malformed`, `UnknownMessageType`, `UnknownErrorKind`,
/// `Unmatched`) are protocol errors. They are always recoverable at the
/// decode/correlate boundary: a single bad frame is reported and the
/// connection keeps serving.
#[derive(Debug, Clone, PartialEq)]
pub enum ProxyError {
    /// The frame could not be decoded (truncated, oversized, bad UTF-8, trailing bytes).
    Malformed(String),

    /// The frame's type tag has no factory in the [`MessageRegistry`](crate::common::MessageRegistry).
    ///
    /// Peers running a newer or older protocol revision can legitimately send these.
    UnknownMessageType(u32),

    /// A reply carried an error type string outside the closed [`ErrorType`](crate::message::ErrorType) set.
    UnknownErrorKind(String),

    /// A reply arrived for a request ID that is not in flight.
    Unmatched(i64),

    /// The pending request was cancelled before its reply arrived.
    Cancelled,

    /// The pending request's deadline elapsed before its reply arrived.
    Timeout,

    /// A property holds a value that does not parse as the requested type.
    TypeMismatch {
        /// Property key.
        key: String,
        /// Name of the type the accessor expected.
        expected: &'static str,
    },

    /// The reply matched a pending request but has the wrong message type.
    ReplyTypeMismatch {
        /// Reply type registered for the request.
        expected: MessageType,
        /// Type that actually arrived.
        actual: MessageType,
    },

    /// A message of this type is not valid at this point of the exchange.
    UnexpectedMessage(MessageType),

    /// A registration would break the one-to-one tag/type mapping.
    RegistrationConflict(String),

    /// The remote side answered with an [`ErrorEnvelope`].
    Remote(ErrorEnvelope),

    /// The peer closed the connection.
    ConnectionClosed,

    /// Socket or channel failure.
    Io(String),

    /// JSON serialization failure of a structured property.
    Serialization(String),

    /// Configuration could not be parsed or applied.
    Config(String),
}

impl ProxyError {
    /// Returns `true` for decode/correlate errors that must never tear down a connection.
    #[must_use]
    pub const fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::Malformed(_)
                | Self::UnknownMessageType(_)
                | Self::UnknownErrorKind(_)
                | Self::Unmatched(_)
                | Self::ReplyTypeMismatch { .. }
                | Self::UnexpectedMessage(_)
        )
    }
}

impl fmt::Display for ProxyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed(reason) => write!(f, "Malformed frame: {reason}"),
            Self::UnknownMessageType(code) => write!(f, "Unknown message type: {code}"),
            Self::UnknownErrorKind(kind) => write!(f, "Unknown error kind: {kind}"),
            Self::Unmatched(id) => write!(f, "No pending request for reply with request ID {id}"),
            Self::Cancelled => write!(f, "Request cancelled"),
            Self::Timeout => write!(f, "Request timeout"),
            Self::TypeMismatch { key, expected } => {
                write!(f, "Property '{key}' is not a valid {expected}")
            }
            Self::ReplyTypeMismatch { expected, actual } => {
                write!(f, "Expected reply of type {expected}, got {actual}")
            }
            Self::UnexpectedMessage(message_type) => {
                write!(f, "Unexpected message type: {message_type}")
            }
            Self::RegistrationConflict(reason) => write!(f, "Registration conflict: {reason}"),
            Self::Remote(error) => write!(f, "Remote error ({}): {}", error.kind, error.message),
            Self::ConnectionClosed => write!(f, "Connection closed"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Serialization(e) => write!(f, "Serialization error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
        }
    }
}

impl std::error::Error for ProxyError {}

impl From<serde_json::Error> for ProxyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for ProxyError {
    fn from(err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            Self::ConnectionClosed
        } else {
            Self::Io(err.to_string())
        }
    }
}
