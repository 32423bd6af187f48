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

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::common::ProxyError;
use crate::message::envelope::ERROR_KEY;
use crate::message::PropertyBag;

/// Closed set of failure categories a reply can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ErrorType {
    /// No error; never written to the wire.
    #[default]
    None,
    /// The operation was cancelled.
    Cancelled,
    /// Application-defined failure.
    Custom,
    /// Any other failure.
    Generic,
    /// The remote side panicked while handling the request.
    Panic,
    /// The workflow or proxy was terminated.
    Terminated,
    /// The operation timed out.
    Timeout,
}

impl ErrorType {
    /// Wire string of this kind, `None` for [`ErrorType::None`].
    #[must_use]
    pub const fn as_wire_str(self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Cancelled => Some("cancelled"),
            Self::Custom => Some("custom"),
            Self::Generic => Some("generic"),
            Self::Panic => Some("panic"),
            Self::Terminated => Some("terminated"),
            Self::Timeout => Some("timeout"),
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str().unwrap_or("none"))
    }
}

impl FromStr for ErrorType {
    type Err = ProxyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cancelled" => Ok(Self::Cancelled),
            "custom" => Ok(Self::Custom),
            "generic" => Ok(Self::Generic),
            "panic" => Ok(Self::Panic),
            "terminated" => Ok(Self::Terminated),
            "timeout" => Ok(Self::Timeout),
            other => Err(ProxyError::UnknownErrorKind(other.to_string())),
        }
    }
}

/// Failure carried by a reply: a kind, a human readable message and
/// optional free-form details.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ErrorEnvelope {
    pub kind: ErrorType,
    pub message: String,
    pub details: Option<String>,
}

impl ErrorEnvelope {
    pub fn new(kind: ErrorType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Returns `true` unless the kind is [`ErrorType::None`].
    #[must_use]
    pub const fn is_error(&self) -> bool {
        !matches!(self.kind, ErrorType::None)
    }

    /// JSON text of the envelope as stored under the `Error` property.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::json!({
            "Type": self.kind.as_wire_str(),
            "String": self.message,
            "Details": self.details,
        })
        .to_string()
    }

    /// Parses the JSON text of an `Error` property.
    ///
    /// A `null` kind decodes as [`ErrorType::None`]; any string outside the
    /// closed set fails with [`ProxyError::UnknownErrorKind`].
    pub fn from_json(text: &str) -> Result<Self, ProxyError> {
        let wire: WireError = serde_json::from_str(text).map_err(|_| ProxyError::TypeMismatch {
            key: ERROR_KEY.to_string(),
            expected: "ErrorEnvelope",
        })?;

        let kind = match wire.kind.as_deref() {
            None => ErrorType::None,
            Some(kind) => kind.parse()?,
        };

        Ok(Self {
            kind,
            message: wire.message.unwrap_or_default(),
            details: wire.details,
        })
    }
}

impl fmt::Display for ErrorEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Some(details) => write!(f, "{}: {} ({details})", self.kind, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

#[derive(Deserialize)]
struct WireError {
    #[serde(rename = "Type", default)]
    kind: Option<String>,
    #[serde(rename = "String", default)]
    message: Option<String>,
    #[serde(rename = "Details", default)]
    details: Option<String>,
}

/// Reads the `Error` property of a bag. Absent, null, and kind-less entries
/// all read as `Ok(None)`.
pub(crate) fn read_error(properties: &PropertyBag) -> Result<Option<ErrorEnvelope>, ProxyError> {
    let Some(text) = properties.get_string(ERROR_KEY) else {
        return Ok(None);
    };
    let error = ErrorEnvelope::from_json(text)?;
    Ok(error.is_error().then_some(error))
}

/// Writes the `Error` property of a bag; `None` or a kind of
/// [`ErrorType::None`] removes it.
pub(crate) fn write_error(properties: &mut PropertyBag, error: Option<&ErrorEnvelope>) {
    match error.filter(|error| error.is_error()) {
        Some(error) => properties.insert_raw(ERROR_KEY, Some(error.to_json())),
        None => {
            properties.remove(ERROR_KEY);
        }
    }
}
