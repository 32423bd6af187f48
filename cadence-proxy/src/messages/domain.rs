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

//! Domain management messages.

use std::fmt;
use std::str::FromStr;

use cadence_proxy_macro::proxy_message;

use crate::common::ProxyError;
use crate::traits::ProxyMessage;

/// Lifecycle state of a domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DomainStatus {
    /// Not reported; the property is absent.
    #[default]
    Unspecified,
    Registered,
    Deprecated,
    Deleted,
}

impl DomainStatus {
    #[must_use]
    pub const fn as_wire_str(self) -> Option<&'static str> {
        match self {
            Self::Unspecified => None,
            Self::Registered => Some("REGISTERED"),
            Self::Deprecated => Some("DEPRECATED"),
            Self::Deleted => Some("DELETED"),
        }
    }
}

impl fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_wire_str().unwrap_or("UNSPECIFIED"))
    }
}

impl FromStr for DomainStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REGISTERED" => Ok(Self::Registered),
            "DEPRECATED" => Ok(Self::Deprecated),
            "DELETED" => Ok(Self::Deleted),
            _ => Err(()),
        }
    }
}

/// Registers a new domain.
#[proxy_message(request = DomainRegisterReply)]
pub struct DomainRegisterRequest;

impl DomainRegisterRequest {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.properties().get_string("Name")
    }

    pub fn set_name(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("Name", value);
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.properties().get_string("Description")
    }

    pub fn set_description(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("Description", value);
    }

    #[must_use]
    pub fn owner_email(&self) -> Option<&str> {
        self.properties().get_string("OwnerEmail")
    }

    pub fn set_owner_email(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("OwnerEmail", value);
    }

    pub fn emit_metrics(&self) -> Result<bool, ProxyError> {
        self.properties().get_bool("EmitMetrics")
    }

    pub fn set_emit_metrics(&mut self, value: bool) {
        self.properties_mut().set_bool("EmitMetrics", value);
    }

    pub fn retention_days(&self) -> Result<i32, ProxyError> {
        Ok(self.properties().get_i32("RetentionDays")?.unwrap_or_default())
    }

    pub fn set_retention_days(&mut self, value: i32) {
        self.properties_mut().set_i32("RetentionDays", value);
    }
}

#[proxy_message(reply)]
pub struct DomainRegisterReply;

/// Looks up a domain by name.
#[proxy_message(request = DomainDescribeReply)]
pub struct DomainDescribeRequest;

impl DomainDescribeRequest {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.properties().get_string("Name")
    }

    pub fn set_name(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("Name", value);
    }
}

#[proxy_message(reply)]
pub struct DomainDescribeReply;

impl DomainDescribeReply {
    #[must_use]
    pub fn domain_info_name(&self) -> Option<&str> {
        self.properties().get_string("DomainInfoName")
    }

    pub fn set_domain_info_name(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("DomainInfoName", value);
    }

    #[must_use]
    pub fn domain_info_description(&self) -> Option<&str> {
        self.properties().get_string("DomainInfoDescription")
    }

    pub fn set_domain_info_description(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("DomainInfoDescription", value);
    }

    pub fn domain_info_status(&self) -> Result<DomainStatus, ProxyError> {
        match self.properties().get_string("DomainInfoStatus") {
            None => Ok(DomainStatus::Unspecified),
            Some(value) => value.parse().map_err(|()| ProxyError::TypeMismatch {
                key: "DomainInfoStatus".to_string(),
                expected: "DomainStatus",
            }),
        }
    }

    pub fn set_domain_info_status(&mut self, value: DomainStatus) {
        match value.as_wire_str() {
            Some(status) => self.properties_mut().set_string("DomainInfoStatus", Some(status)),
            None => {
                self.properties_mut().remove("DomainInfoStatus");
            }
        }
    }

    #[must_use]
    pub fn domain_info_owner_email(&self) -> Option<&str> {
        self.properties().get_string("DomainInfoOwnerEmail")
    }

    pub fn set_domain_info_owner_email(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("DomainInfoOwnerEmail", value);
    }

    pub fn configuration_emit_metrics(&self) -> Result<bool, ProxyError> {
        self.properties().get_bool("ConfigurationEmitMetrics")
    }

    pub fn set_configuration_emit_metrics(&mut self, value: bool) {
        self.properties_mut().set_bool("ConfigurationEmitMetrics", value);
    }

    pub fn configuration_retention_days(&self) -> Result<i32, ProxyError> {
        Ok(self
            .properties()
            .get_i32("ConfigurationRetentionDays")?
            .unwrap_or_default())
    }

    pub fn set_configuration_retention_days(&mut self, value: i32) {
        self.properties_mut().set_i32("ConfigurationRetentionDays", value);
    }
}

/// Replaces the mutable settings of an existing domain.
#[proxy_message(request = DomainUpdateReply)]
pub struct DomainUpdateRequest;

impl DomainUpdateRequest {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.properties().get_string("Name")
    }

    pub fn set_name(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("Name", value);
    }

    #[must_use]
    pub fn updated_info_description(&self) -> Option<&str> {
        self.properties().get_string("UpdatedInfoDescription")
    }

    pub fn set_updated_info_description(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("UpdatedInfoDescription", value);
    }

    #[must_use]
    pub fn updated_info_owner_email(&self) -> Option<&str> {
        self.properties().get_string("UpdatedInfoOwnerEmail")
    }

    pub fn set_updated_info_owner_email(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("UpdatedInfoOwnerEmail", value);
    }

    pub fn configuration_emit_metrics(&self) -> Result<bool, ProxyError> {
        self.properties().get_bool("ConfigurationEmitMetrics")
    }

    pub fn set_configuration_emit_metrics(&mut self, value: bool) {
        self.properties_mut().set_bool("ConfigurationEmitMetrics", value);
    }

    pub fn configuration_retention_days(&self) -> Result<i32, ProxyError> {
        Ok(self
            .properties()
            .get_i32("ConfigurationRetentionDays")?
            .unwrap_or_default())
    }

    pub fn set_configuration_retention_days(&mut self, value: i32) {
        self.properties_mut().set_i32("ConfigurationRetentionDays", value);
    }
}

#[proxy_message(reply)]
pub struct DomainUpdateReply;
