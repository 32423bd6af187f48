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

//! Type registry mapping wire tags to message factories.

use std::any::TypeId;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::common::ProxyError;
use crate::message::MessageType;
use crate::traits::{concrete_type_id, ProxyMessage};

/// Type alias for the factory function stored in the registry.
///
/// The function returns a default constructed instance of the concrete
/// message type bound to a tag.
pub type MessageFactory = Arc<dyn Fn() -> Box<dyn ProxyMessage> + Send + Sync>;

#[derive(Clone)]
struct Registration {
    type_id: TypeId,
    factory: MessageFactory,
}

/// Registry mapping [`MessageType`] tags to the concrete types that decode them.
///
/// The mapping is a bijection: a tag has at most one concrete type and a
/// concrete type answers to exactly one tag. Registrations that would break
/// that are rejected with [`ProxyError::RegistrationConflict`].
///
/// # Thread Safety
///
/// The registry uses [`DashMap`] internally and is safe to share through an
/// `Arc`. Lookups never block each other; registration normally happens once
/// at startup.
///
/// # Example
///
/// ```rust,ignore
/// let registry = MessageRegistry::new();
/// registry.register::<DomainRegisterRequest>()?;
///
/// let message = registry.create(MessageType::DomainRegisterRequest.code())?;
/// assert!(message.is::<DomainRegisterRequest>());
/// ```
#[derive(Default)]
pub struct MessageRegistry {
    /// Maps tags to their registration.
    factories: DashMap<MessageType, Registration>,
    /// Maps concrete types back to their tag.
    type_ids: DashMap<TypeId, MessageType>,
}

impl std::fmt::Debug for MessageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRegistry")
            .field("registered_types", &self.factories.len())
            .finish()
    }
}

impl MessageRegistry {
    /// Creates a new, empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding every message type the proxy speaks.
    pub fn with_all_messages() -> Result<Self, ProxyError> {
        let registry = Self::new();
        crate::messages::register_all(&registry)?;
        Ok(registry)
    }

    /// Registers `M` under the tag its default instance reports.
    ///
    /// Registering the same type twice is a no-op.
    ///
    /// # Errors
    ///
    /// [`ProxyError::RegistrationConflict`] if the tag is bound to another
    /// type or `M` is bound to another tag.
    pub fn register<M>(&self) -> Result<(), ProxyError>
    where
        M: ProxyMessage + Default,
    {
        let message_type = M::default().message_type();
        let factory: MessageFactory = Arc::new(|| Box::new(M::default()) as Box<dyn ProxyMessage>);
        self.register_factory(message_type, factory)
    }

    /// Registers an explicit factory for `message_type`.
    ///
    /// # Errors
    ///
    /// [`ProxyError::RegistrationConflict`] if the factory's product reports
    /// a different tag, or if the registration would break the one-to-one
    /// mapping between tags and concrete types.
    pub fn register_factory(
        &self,
        message_type: MessageType,
        factory: MessageFactory,
    ) -> Result<(), ProxyError> {
        let sample = factory();
        if sample.message_type() != message_type {
            return Err(ProxyError::RegistrationConflict(format!(
                "factory for {message_type} produces {}",
                sample.message_type()
            )));
        }
        let type_id = concrete_type_id(sample.as_ref());

        // Lock order is always factories, then type_ids.
        match self.factories.entry(message_type) {
            Entry::Occupied(existing) if existing.get().type_id == type_id => Ok(()),
            Entry::Occupied(_) => Err(ProxyError::RegistrationConflict(format!(
                "{message_type} is already bound to another type"
            ))),
            Entry::Vacant(vacant) => match self.type_ids.entry(type_id) {
                Entry::Occupied(existing) => Err(ProxyError::RegistrationConflict(format!(
                    "type registered for {message_type} is already bound to {}",
                    existing.get()
                ))),
                Entry::Vacant(type_slot) => {
                    type_slot.insert(message_type);
                    vacant.insert(Registration { type_id, factory });
                    tracing::trace!(%message_type, "Registered message type");
                    Ok(())
                }
            },
        }
    }

    /// Creates an empty message for a wire tag.
    ///
    /// # Errors
    ///
    /// [`ProxyError::UnknownMessageType`] if the code is not a known tag or
    /// no type is registered for it.
    pub fn create(&self, code: u32) -> Result<Box<dyn ProxyMessage>, ProxyError> {
        let message_type =
            MessageType::from_code(code).ok_or(ProxyError::UnknownMessageType(code))?;
        self.create_message(message_type)
    }

    /// Creates an empty message of `message_type`.
    pub fn create_message(&self, message_type: MessageType) -> Result<Box<dyn ProxyMessage>, ProxyError> {
        let factory = self
            .factories
            .get(&message_type)
            .map(|registration| Arc::clone(&registration.factory))
            .ok_or(ProxyError::UnknownMessageType(message_type.code()))?;
        Ok(factory())
    }

    #[must_use]
    pub fn is_registered(&self, message_type: MessageType) -> bool {
        self.factories.contains_key(&message_type)
    }

    /// Returns the number of registered message types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns `true` if no message types are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// Registered tags, ordered by wire code.
    #[must_use]
    pub fn message_types(&self) -> Vec<MessageType> {
        let mut types: Vec<MessageType> = self.factories.iter().map(|entry| *entry.key()).collect();
        types.sort_by_key(|message_type| message_type.code());
        types
    }
}
