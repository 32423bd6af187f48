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

use crate::message::envelope::REQUEST_ID_KEY;
use crate::message::{MessageEnvelope, MessageType};
use crate::traits::{HasReplyType, HasRequestId, ProxyMessage};

/// Base of every request: an envelope plus the reply type it expects.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyRequest {
    envelope: MessageEnvelope,
    reply_type: MessageType,
}

impl ProxyRequest {
    #[must_use]
    pub fn new(message_type: MessageType, reply_type: MessageType) -> Self {
        Self {
            envelope: MessageEnvelope::new(message_type),
            reply_type,
        }
    }
}

impl Default for ProxyRequest {
    fn default() -> Self {
        Self::new(MessageType::Unspecified, MessageType::Unspecified)
    }
}

impl HasRequestId for ProxyRequest {
    fn request_id(&self) -> i64 {
        read_request_id(&self.envelope)
    }

    fn set_request_id(&mut self, request_id: i64) {
        self.envelope
            .properties_mut()
            .set_i64(REQUEST_ID_KEY, request_id);
    }
}

impl HasReplyType for ProxyRequest {
    fn reply_type(&self) -> MessageType {
        self.reply_type
    }
}

impl ProxyMessage for ProxyRequest {
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

    fn as_reply_type(&self) -> Option<&dyn HasReplyType> {
        Some(self)
    }
}

pub(crate) fn read_request_id(envelope: &MessageEnvelope) -> i64 {
    envelope
        .properties()
        .get_i64(REQUEST_ID_KEY)
        .ok()
        .flatten()
        .unwrap_or(0)
}
