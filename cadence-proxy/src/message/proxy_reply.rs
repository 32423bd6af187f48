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

use std::any::Any;

use crate::common::ProxyError;
use crate::message::envelope::REQUEST_ID_KEY;
use crate::message::error_envelope::{read_error, write_error};
use crate::message::proxy_request::read_request_id;
use crate::message::{ErrorEnvelope, MessageEnvelope, MessageType};
use crate::traits::{HasError, HasRequestId, ProxyMessage};

/// Base of every reply: an envelope whose `Error` property reports failure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProxyReply {
    envelope: MessageEnvelope,
}

impl ProxyReply {
    #[must_use]
    pub fn new(message_type: MessageType) -> Self {
        Self {
            envelope: MessageEnvelope::new(message_type),
        }
    }

    /// Returns the reply, or [`ProxyError::Remote`] when it carries an error.
    pub fn into_result(self) -> Result<Self, ProxyError> {
        self.check()?;
        Ok(self)
    }
}

impl HasRequestId for ProxyReply {
    fn request_id(&self) -> i64 {
        read_request_id(&self.envelope)
    }

    fn set_request_id(&mut self, request_id: i64) {
        self.envelope
            .properties_mut()
            .set_i64(REQUEST_ID_KEY, request_id);
    }
}

impl HasError for ProxyReply {
    fn error(&self) -> Result<Option<ErrorEnvelope>, ProxyError> {
        read_error(self.envelope.properties())
    }

    fn set_error(&mut self, error: Option<&ErrorEnvelope>) {
        write_error(self.envelope.properties_mut(), error);
    }
}

impl ProxyMessage for ProxyReply {
    fn envelope(&self) -> &MessageEnvelope {
        &self.envelope
    }

    fn envelope_mut(&mut self) -> &mut MessageEnvelope {
        &mut self.envelope
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send> {
        self
    }

    fn as_request_id(&self) -> Option<&dyn HasRequestId> {
        Some(self)
    }

    fn as_request_id_mut(&mut self) -> Option<&mut dyn HasRequestId> {
        Some(self)
    }

    fn as_error(&self) -> Option<&dyn HasError> {
        Some(self)
    }

    fn as_error_mut(&mut self) -> Option<&mut dyn HasError> {
        Some(self)
    }
}
