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

//! The boundary to the wrapped workflow engine client.
//!
//! The proxy never interprets workflow semantics. It decodes a request into
//! one of the parameter structs below, hands it to an [`EngineClient`] and
//! turns the result, or the [`EngineError`], back into a reply.

use std::fmt;

use async_trait::async_trait;

use crate::common::ProxyError;
use crate::message::{ErrorEnvelope, ErrorType};
use crate::messages::{
    ConnectRequest, DomainDescribeReply, DomainRegisterRequest, DomainUpdateRequest,
    WorkflowArgs, WorkflowExecuteRequest,
};
pub use crate::messages::{DomainStatus, StartWorkflowOptions, WorkflowExecution};

/// Domains keep closed workflow history this many days unless told otherwise.
pub const DEFAULT_RETENTION_DAYS: i32 = 7;

pub type EngineResult<T> = Result<T, EngineError>;

/// Operations the proxy forwards to the workflow engine.
#[async_trait]
pub trait EngineClient: Send + Sync + 'static {
    async fn connect(&self, params: Connect) -> EngineResult<()>;

    async fn register_domain(&self, params: RegisterDomain) -> EngineResult<()>;

    async fn describe_domain(&self, name: String) -> EngineResult<DomainDescription>;

    async fn update_domain(&self, params: UpdateDomain) -> EngineResult<()>;

    async fn register_workflow(&self, name: String) -> EngineResult<()>;

    async fn execute_workflow(&self, params: StartWorkflow) -> EngineResult<WorkflowExecution>;
}

/// Failure reported by the engine client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineError {
    pub kind: ErrorType,
    pub message: String,
    pub details: Option<String>,
}

impl EngineError {
    pub fn new(kind: ErrorType, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Generic, message)
    }

    pub fn custom(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Custom, message)
    }

    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Cancelled, message)
    }

    pub fn terminated(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Terminated, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorType::Timeout, message)
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for EngineError {}

impl From<EngineError> for ErrorEnvelope {
    /// A kind of [`ErrorType::None`] would read as success on the wire, so it
    /// is reported as [`ErrorType::Generic`].
    fn from(err: EngineError) -> Self {
        let kind = match err.kind {
            ErrorType::None => ErrorType::Generic,
            kind => kind,
        };
        Self {
            kind,
            message: err.message,
            details: err.details,
        }
    }
}

impl From<ProxyError> for EngineError {
    fn from(err: ProxyError) -> Self {
        match err {
            ProxyError::Remote(error) => Self {
                kind: error.kind,
                message: error.message,
                details: error.details,
            },
            ProxyError::Cancelled => Self::cancelled(err.to_string()),
            ProxyError::Timeout => Self::timeout(err.to_string()),
            other => Self::generic(other.to_string()),
        }
    }
}

/// Parameters of `connect`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Connect {
    /// Comma separated engine endpoints.
    pub endpoints: String,
    /// Default domain for later calls.
    pub domain: Option<String>,
    /// Identity reported to the engine.
    pub identity: Option<String>,
}

impl From<&ConnectRequest> for Connect {
    fn from(request: &ConnectRequest) -> Self {
        Self {
            endpoints: request.endpoints().unwrap_or_default().to_string(),
            domain: request.domain().map(str::to_string),
            identity: request.identity().map(str::to_string),
        }
    }
}

impl From<&Connect> for ConnectRequest {
    fn from(params: &Connect) -> Self {
        let mut request = Self::new();
        request.set_endpoints(Some(params.endpoints.as_str()));
        request.set_domain(params.domain.as_deref());
        request.set_identity(params.identity.as_deref());
        request
    }
}

/// Parameters of `register_domain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterDomain {
    pub name: String,
    pub description: String,
    pub owner_email: String,
    pub emit_metrics: bool,
    pub retention_days: i32,
}

impl RegisterDomain {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            owner_email: String::new(),
            emit_metrics: false,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl TryFrom<&DomainRegisterRequest> for RegisterDomain {
    type Error = ProxyError;

    fn try_from(request: &DomainRegisterRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: request.name().unwrap_or_default().to_string(),
            description: request.description().unwrap_or_default().to_string(),
            owner_email: request.owner_email().unwrap_or_default().to_string(),
            emit_metrics: request.emit_metrics()?,
            retention_days: request.retention_days()?,
        })
    }
}

impl From<&RegisterDomain> for DomainRegisterRequest {
    fn from(params: &RegisterDomain) -> Self {
        let mut request = Self::new();
        request.set_name(Some(params.name.as_str()));
        request.set_description(Some(params.description.as_str()));
        request.set_owner_email(Some(params.owner_email.as_str()));
        request.set_emit_metrics(params.emit_metrics);
        request.set_retention_days(params.retention_days);
        request
    }
}

/// Parameters of `update_domain`. Only the `Some` fields change.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateDomain {
    pub name: String,
    pub description: Option<String>,
    pub owner_email: Option<String>,
    pub emit_metrics: bool,
    pub retention_days: i32,
}

impl TryFrom<&DomainUpdateRequest> for UpdateDomain {
    type Error = ProxyError;

    fn try_from(request: &DomainUpdateRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            name: request.name().unwrap_or_default().to_string(),
            description: request.updated_info_description().map(str::to_string),
            owner_email: request.updated_info_owner_email().map(str::to_string),
            emit_metrics: request.configuration_emit_metrics()?,
            retention_days: request.configuration_retention_days()?,
        })
    }
}

impl From<&UpdateDomain> for DomainUpdateRequest {
    fn from(params: &UpdateDomain) -> Self {
        let mut request = Self::new();
        request.set_name(Some(params.name.as_str()));
        request.set_updated_info_description(params.description.as_deref());
        request.set_updated_info_owner_email(params.owner_email.as_deref());
        request.set_configuration_emit_metrics(params.emit_metrics);
        request.set_configuration_retention_days(params.retention_days);
        request
    }
}

/// Result of `describe_domain`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DomainDescription {
    pub name: String,
    pub description: String,
    pub status: DomainStatus,
    pub owner_email: String,
    pub emit_metrics: bool,
    pub retention_days: i32,
}

impl DomainDescription {
    /// Writes the description into a reply.
    pub fn write_to(&self, reply: &mut DomainDescribeReply) {
        reply.set_domain_info_name(Some(self.name.as_str()));
        reply.set_domain_info_description(Some(self.description.as_str()));
        reply.set_domain_info_status(self.status);
        reply.set_domain_info_owner_email(Some(self.owner_email.as_str()));
        reply.set_configuration_emit_metrics(self.emit_metrics);
        reply.set_configuration_retention_days(self.retention_days);
    }
}

impl TryFrom<&DomainDescribeReply> for DomainDescription {
    type Error = ProxyError;

    fn try_from(reply: &DomainDescribeReply) -> Result<Self, Self::Error> {
        Ok(Self {
            name: reply.domain_info_name().unwrap_or_default().to_string(),
            description: reply.domain_info_description().unwrap_or_default().to_string(),
            status: reply.domain_info_status()?,
            owner_email: reply.domain_info_owner_email().unwrap_or_default().to_string(),
            emit_metrics: reply.configuration_emit_metrics()?,
            retention_days: reply.configuration_retention_days()?,
        })
    }
}

/// Parameters of `execute_workflow`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StartWorkflow {
    /// Target domain; the connection default when `None`.
    pub domain: Option<String>,
    /// Registered workflow type name.
    pub name: String,
    pub args: WorkflowArgs,
    pub options: StartWorkflowOptions,
}

impl TryFrom<&WorkflowExecuteRequest> for StartWorkflow {
    type Error = ProxyError;

    fn try_from(request: &WorkflowExecuteRequest) -> Result<Self, Self::Error> {
        Ok(Self {
            domain: request.domain().map(str::to_string),
            name: request.name().unwrap_or_default().to_string(),
            args: request.args()?.unwrap_or_default(),
            options: request.options()?.unwrap_or_default(),
        })
    }
}

impl TryFrom<&StartWorkflow> for WorkflowExecuteRequest {
    type Error = ProxyError;

    fn try_from(params: &StartWorkflow) -> Result<Self, Self::Error> {
        let mut request = Self::new();
        request.set_domain(params.domain.as_deref());
        request.set_name(Some(params.name.as_str()));
        request.set_args(Some(&params.args))?;
        request.set_options(Some(&params.options))?;
        Ok(request)
    }
}
