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

//! Connection-level messages handled by the proxy itself.

use cadence_proxy_macro::proxy_message;

use crate::common::ProxyError;
use crate::traits::ProxyMessage;

/// Library announces where the proxy can reach it.
#[proxy_message(request = InitializeReply)]
pub struct InitializeRequest;

impl InitializeRequest {
    #[must_use]
    pub fn library_address(&self) -> Option<&str> {
        self.properties().get_string("LibraryAddress")
    }

    pub fn set_library_address(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("LibraryAddress", value);
    }

    pub fn library_port(&self) -> Result<i32, ProxyError> {
        Ok(self.properties().get_i32("LibraryPort")?.unwrap_or_default())
    }

    pub fn set_library_port(&mut self, value: i32) {
        self.properties_mut().set_i32("LibraryPort", value);
    }
}

#[proxy_message(reply)]
pub struct InitializeReply;

/// Connects the proxy to the engine cluster.
#[proxy_message(request = ConnectReply)]
pub struct ConnectRequest;

impl ConnectRequest {
    /// Comma separated `host:port` list of cluster frontends.
    #[must_use]
    pub fn endpoints(&self) -> Option<&str> {
        self.properties().get_string("Endpoints")
    }

    pub fn set_endpoints(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("Endpoints", value);
    }

    /// Default domain for operations that do not name one.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.properties().get_string("Domain")
    }

    pub fn set_domain(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("Domain", value);
    }

    #[must_use]
    pub fn identity(&self) -> Option<&str> {
        self.properties().get_string("Identity")
    }

    pub fn set_identity(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("Identity", value);
    }
}

#[proxy_message(reply)]
pub struct ConnectReply;

/// Asks the proxy to shut down once it has answered.
#[proxy_message(request = TerminateReply)]
pub struct TerminateRequest;

#[proxy_message(reply)]
pub struct TerminateReply;

#[proxy_message(request = HeartbeatReply)]
pub struct HeartbeatRequest;

#[proxy_message(reply)]
pub struct HeartbeatReply;

/// Cancels another in-flight request.
#[proxy_message(request = CancelReply)]
pub struct CancelRequest;

impl CancelRequest {
    pub fn target_request_id(&self) -> Result<i64, ProxyError> {
        Ok(self.properties().get_i64("TargetRequestId")?.unwrap_or_default())
    }

    pub fn set_target_request_id(&mut self, value: i64) {
        self.properties_mut().set_i64("TargetRequestId", value);
    }
}

#[proxy_message(reply)]
pub struct CancelReply;

impl CancelReply {
    /// `false` when the target had already completed or was never issued.
    pub fn was_cancelled(&self) -> Result<bool, ProxyError> {
        self.properties().get_bool("WasCancelled")
    }

    pub fn set_was_cancelled(&mut self, value: bool) {
        self.properties_mut().set_bool("WasCancelled", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;
    use crate::traits::{HasReplyType, HasRequestId};

    #[test]
    fn test_initialize_request() {
        let mut message = InitializeRequest::new();
        assert_eq!(message.message_type(), MessageType::InitializeRequest);
        assert_eq!(message.reply_type(), MessageType::InitializeReply);
        assert_eq!(message.request_id(), 0);
        assert_eq!(message.library_address(), None);
        assert_eq!(message.library_port().unwrap(), 0);

        message.set_library_address(Some("1.2.3.4"));
        message.set_library_port(666);
        assert_eq!(message.library_address(), Some("1.2.3.4"));
        assert_eq!(message.library_port().unwrap(), 666);
    }

    #[test]
    fn test_connect_request() {
        let mut message = ConnectRequest::new();
        assert_eq!(message.reply_type(), MessageType::ConnectReply);

        message.set_endpoints(Some("1.1.1.1:555,2.2.2.2:5555"));
        message.set_domain(Some("my-domain"));
        message.set_identity(Some("my-identity"));
        assert_eq!(message.endpoints(), Some("1.1.1.1:555,2.2.2.2:5555"));
        assert_eq!(message.domain(), Some("my-domain"));
        assert_eq!(message.identity(), Some("my-identity"));
    }

    #[test]
    fn test_cancel_messages() {
        let mut request = CancelRequest::new();
        request.set_target_request_id(42);
        assert_eq!(request.target_request_id().unwrap(), 42);

        let mut reply = CancelReply::new();
        assert!(!reply.was_cancelled().unwrap());
        reply.set_was_cancelled(true);
        assert!(reply.was_cancelled().unwrap());
    }
}
