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

use crate::message::{MessageType, PropertyBag};

/// Property carrying the correlation ID of requests and replies.
pub const REQUEST_ID_KEY: &str = "RequestId";

/// Property carrying the JSON encoded [`ErrorEnvelope`](crate::message::ErrorEnvelope) of a reply.
pub const ERROR_KEY: &str = "Error";

/// Properties owned by the request/reply layers rather than the payload.
/// [`MessageEnvelope::copy_to`] leaves them alone.
pub const RESERVED_KEYS: &[&str] = &[REQUEST_ID_KEY, ERROR_KEY];

/// The unit of exchange between the library and the proxy: a type tag,
/// a property bag and an ordered list of binary attachments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageEnvelope {
    message_type: MessageType,
    properties: PropertyBag,
    attachments: Vec<Vec<u8>>,
}

impl MessageEnvelope {
    #[must_use]
    pub fn new(message_type: MessageType) -> Self {
        Self {
            message_type,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Retags the envelope. Concrete subtypes fix their tag at construction;
    /// this is the only way to change it afterwards.
    pub fn set_message_type(&mut self, message_type: MessageType) {
        self.message_type = message_type;
    }

    #[must_use]
    pub const fn properties(&self) -> &PropertyBag {
        &self.properties
    }

    pub fn properties_mut(&mut self) -> &mut PropertyBag {
        &mut self.properties
    }

    #[must_use]
    pub fn attachments(&self) -> &[Vec<u8>] {
        &self.attachments
    }

    pub fn push_attachment(&mut self, attachment: impl Into<Vec<u8>>) {
        self.attachments.push(attachment.into());
    }

    pub fn set_attachments(&mut self, attachments: Vec<Vec<u8>>) {
        self.attachments = attachments;
    }

    pub fn clear_attachments(&mut self) {
        self.attachments.clear();
    }

    /// Deep-copies every non-reserved property and the attachment list onto
    /// `target`. The target's type tag and reserved properties are kept.
    pub fn copy_to(&self, target: &mut MessageEnvelope) {
        for (key, value) in self.properties.iter() {
            if !RESERVED_KEYS.contains(&key) {
                target
                    .properties
                    .insert_raw(key, value.map(str::to_string));
            }
        }
        target.attachments = self.attachments.clone();
    }
}
