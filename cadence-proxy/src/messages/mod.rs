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

//! Concrete request and reply types, grouped by operation family.
//!
//! Every type here is a unit struct expanded by
//! [`proxy_message`](cadence_proxy_macro::proxy_message) plus hand-written
//! property accessors.

pub use cluster::{
    CancelReply, CancelRequest, ConnectReply, ConnectRequest, HeartbeatReply, HeartbeatRequest,
    InitializeReply, InitializeRequest, TerminateReply, TerminateRequest,
};
pub use domain::{
    DomainDescribeReply, DomainDescribeRequest, DomainRegisterReply, DomainRegisterRequest,
    DomainStatus, DomainUpdateReply, DomainUpdateRequest,
};
pub use workflow::{
    StartWorkflowOptions, WorkflowArgs, WorkflowExecuteReply, WorkflowExecuteRequest,
    WorkflowExecution, WorkflowIdReusePolicy, WorkflowRegisterReply, WorkflowRegisterRequest,
};

use crate::common::{MessageRegistry, ProxyError};

/// Defines the connection-level messages.
mod cluster;
/// Defines the domain management messages.
mod domain;
/// Defines the workflow messages.
mod workflow;

/// Registers every concrete message type with `registry`.
pub fn register_all(registry: &MessageRegistry) -> Result<(), ProxyError> {
    registry.register::<InitializeRequest>()?;
    registry.register::<InitializeReply>()?;
    registry.register::<ConnectRequest>()?;
    registry.register::<ConnectReply>()?;
    registry.register::<TerminateRequest>()?;
    registry.register::<TerminateReply>()?;
    registry.register::<HeartbeatRequest>()?;
    registry.register::<HeartbeatReply>()?;
    registry.register::<CancelRequest>()?;
    registry.register::<CancelReply>()?;

    registry.register::<DomainRegisterRequest>()?;
    registry.register::<DomainRegisterReply>()?;
    registry.register::<DomainDescribeRequest>()?;
    registry.register::<DomainDescribeReply>()?;
    registry.register::<DomainUpdateRequest>()?;
    registry.register::<DomainUpdateReply>()?;

    registry.register::<WorkflowRegisterRequest>()?;
    registry.register::<WorkflowRegisterReply>()?;
    registry.register::<WorkflowExecuteRequest>()?;
    registry.register::<WorkflowExecuteReply>()?;

    Ok(())
}
