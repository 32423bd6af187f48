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

macro_rules! message_types {
    ($($(#[$doc:meta])* $name:ident = $code:literal,)+) => {
        /// Stable tag identifying the wire schema of a message.
        ///
        /// Codes are grouped by operation family: `1..` cluster-level
        /// operations, `100..` domain operations, `200..` workflow operations.
        /// A reply code is always its request code plus one.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum MessageType {
            /// Placeholder type of an envelope that has not been specialised.
            #[default]
            Unspecified,
            $($(#[$doc])* $name,)+
        }

        impl MessageType {
            /// Every known message type, `Unspecified` first.
            pub const ALL: &'static [MessageType] = &[MessageType::Unspecified, $(MessageType::$name,)+];

            /// Numeric wire code of this type.
            #[must_use]
            pub const fn code(self) -> u32 {
                match self {
                    Self::Unspecified => 0,
                    $(Self::$name => $code,)+
                }
            }

            /// Symbolic name of this type.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    Self::Unspecified => "Unspecified",
                    $(Self::$name => stringify!($name),)+
                }
            }

            /// Maps a wire code back to its type, `None` when the code is not known.
            #[must_use]
            pub const fn from_code(code: u32) -> Option<Self> {
                match code {
                    0 => Some(Self::Unspecified),
                    $($code => Some(Self::$name),)+
                    _ => None,
                }
            }
        }
    };
}

message_types! {
    /// Library announces the address the proxy should call back on.
    InitializeRequest = 1,
    /// Answers [`MessageType::InitializeRequest`].
    InitializeReply = 2,
    /// Connect the proxy to the engine cluster.
    ConnectRequest = 3,
    /// Answers [`MessageType::ConnectRequest`].
    ConnectReply = 4,
    /// Ask the proxy to shut down.
    TerminateRequest = 5,
    /// Answers [`MessageType::TerminateRequest`].
    TerminateReply = 6,
    /// Liveness probe.
    HeartbeatRequest = 7,
    /// Answers [`MessageType::HeartbeatRequest`].
    HeartbeatReply = 8,
    /// Cancel another in-flight request.
    CancelRequest = 9,
    /// Answers [`MessageType::CancelRequest`].
    CancelReply = 10,
    /// Register a domain.
    DomainRegisterRequest = 100,
    /// Answers [`MessageType::DomainRegisterRequest`].
    DomainRegisterReply = 101,
    /// Describe a domain.
    DomainDescribeRequest = 102,
    /// Answers [`MessageType::DomainDescribeRequest`].
    DomainDescribeReply = 103,
    /// Update a domain.
    DomainUpdateRequest = 104,
    /// Answers [`MessageType::DomainUpdateRequest`].
    DomainUpdateReply = 105,
    /// Register a workflow implementation.
    WorkflowRegisterRequest = 200,
    /// Answers [`MessageType::WorkflowRegisterRequest`].
    WorkflowRegisterReply = 201,
    /// Start a workflow execution.
    WorkflowExecuteRequest = 202,
    /// Answers [`MessageType::WorkflowExecuteRequest`].
    WorkflowExecuteReply = 203,
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_codes_are_unique_and_reversible() {
        let mut seen = HashSet::new();
        for message_type in MessageType::ALL {
            assert!(seen.insert(message_type.code()), "duplicate code for {message_type}");
            assert_eq!(MessageType::from_code(message_type.code()), Some(*message_type));
        }
    }

    #[test]
    fn test_unknown_code() {
        assert_eq!(MessageType::from_code(9999), None);
    }

    #[test]
    fn test_name_and_display() {
        assert_eq!(MessageType::DomainRegisterRequest.name(), "DomainRegisterRequest");
        assert_eq!(MessageType::Unspecified.to_string(), "Unspecified");
        assert_eq!(MessageType::DomainRegisterReply.code(), 101);
    }
}
