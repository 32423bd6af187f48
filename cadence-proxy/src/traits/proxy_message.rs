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

use std::any::{Any, TypeId};
use std::fmt::Debug;

use dyn_clone::DynClone;

use crate::common::ProxyError;
use crate::message::{ErrorEnvelope, ErrorType, MessageEnvelope, MessageType, PropertyBag};

/// Messages that take part in request/reply correlation.
pub trait HasRequestId {
    /// Correlation ID, `0` until one has been assigned or when the
    /// property does not hold an integer.
    fn request_id(&self) -> i64;

    fn set_request_id(&mut self, request_id: i64);
}

/// Requests, which know the type of the reply they expect.
pub trait HasReplyType {
    fn reply_type(&self) -> MessageType;
}

/// Replies, which may carry an [`ErrorEnvelope`].
pub trait HasError {
    /// The carried error, `Ok(None)` when the reply succeeded.
    fn error(&self) -> Result<Option<ErrorEnvelope>, ProxyError>;

    /// Sets or clears the carried error. An envelope of kind
    /// [`ErrorType::None`] clears it.
    fn set_error(&mut self, error: Option<&ErrorEnvelope>);

    fn error_type(&self) -> Result<ErrorType, ProxyError> {
        Ok(self.error()?.map_or(ErrorType::None, |error| error.kind))
    }

    /// Fails with [`ProxyError::Remote`] when the reply carries an error.
    fn check(&self) -> Result<(), ProxyError> {
        match self.error()? {
            Some(error) => Err(ProxyError::Remote(error)),
            None => Ok(()),
        }
    }
}

/// Anything built on a [`MessageEnvelope`].
///
/// The trait is object safe: the registry, codec and correlator only ever
/// handle `Box<dyn ProxyMessage>`. Request and reply behaviour is reached
/// through the capability probes, which return `None` for messages that do
/// not have the capability.
pub trait ProxyMessage: DynClone + Debug + Send + Sync + 'static {
    fn envelope(&self) -> &MessageEnvelope;

    fn envelope_mut(&mut self) -> &mut MessageEnvelope;

    fn message_type(&self) -> MessageType {
        self.envelope().message_type()
    }

    fn properties(&self) -> &PropertyBag {
        self.envelope().properties()
    }

    fn properties_mut(&mut self) -> &mut PropertyBag {
        self.envelope_mut().properties_mut()
    }

    fn attachments(&self) -> &[Vec<u8>] {
        self.envelope().attachments()
    }

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any + Send>;

    fn as_request_id(&self) -> Option<&dyn HasRequestId> {
        None
    }

    fn as_request_id_mut(&mut self) -> Option<&mut dyn HasRequestId> {
        None
    }

    fn as_reply_type(&self) -> Option<&dyn HasReplyType> {
        None
    }

    fn as_error(&self) -> Option<&dyn HasError> {
        None
    }

    fn as_error_mut(&mut self) -> Option<&mut dyn HasError> {
        None
    }
}

dyn_clone::clone_trait_object!(ProxyMessage);

impl dyn ProxyMessage {
    /// Copies this message onto `target`: the payload first, then the
    /// request ID when both sides carry one, then the error when both are
    /// replies.
    pub fn copy_to(&self, target: &mut dyn ProxyMessage) -> Result<(), ProxyError> {
        self.envelope().copy_to(target.envelope_mut());

        if let (Some(source), Some(target)) = (self.as_request_id(), target.as_request_id_mut()) {
            target.set_request_id(source.request_id());
        }

        if let Some(source) = self.as_error() {
            let error = source.error()?;
            if let Some(target) = target.as_error_mut() {
                target.set_error(error.as_ref());
            }
        }

        Ok(())
    }

    /// Correlation ID, `None` for messages outside the request/reply layers.
    #[must_use]
    pub fn request_id(&self) -> Option<i64> {
        self.as_request_id().map(HasRequestId::request_id)
    }

    #[must_use]
    pub fn is_reply(&self) -> bool {
        self.as_error().is_some()
    }

    /// Recovers the concrete message type.
    pub fn downcast<T: ProxyMessage>(self: Box<Self>) -> Result<Box<T>, ProxyError> {
        let message_type = self.message_type();
        self.into_any()
            .downcast::<T>()
            .map_err(|_| ProxyError::UnexpectedMessage(message_type))
    }

    #[must_use]
    pub fn downcast_ref<T: ProxyMessage>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: ProxyMessage>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    #[must_use]
    pub fn is<T: ProxyMessage>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

impl PartialEq for dyn ProxyMessage {
    fn eq(&self, other: &Self) -> bool {
        self.as_any().type_id() == other.as_any().type_id() && self.envelope() == other.envelope()
    }
}

impl ProxyMessage for MessageEnvelope {
    fn envelope(&self) -> &MessageEnvelope {
        self
    }

    fn envelope_mut(&mut self) -> &mut MessageEnvelope {
        self
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
}

/// [`TypeId`] of the concrete type behind a message.
pub(crate) fn concrete_type_id(message: &dyn ProxyMessage) -> TypeId {
    message.as_any().type_id()
}
