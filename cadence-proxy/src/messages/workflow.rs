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

//! Workflow registration and execution messages, with the JSON payloads
//! they carry.

use std::collections::HashMap;
use std::time::Duration;

use cadence_proxy_macro::proxy_message;
use serde::{Deserialize, Serialize};

use crate::common::ProxyError;
use crate::traits::ProxyMessage;

/// Workflow arguments, keyed by parameter name.
pub type WorkflowArgs = HashMap<String, serde_json::Value>;

/// What happens when a workflow is started with an ID that was used before.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum WorkflowIdReusePolicy {
    /// Allowed when the previous run was terminated, cancelled, timed out or failed.
    #[default]
    AllowDuplicateFailedOnly,
    /// Allowed whenever no run with the ID is active.
    AllowDuplicate,
    RejectDuplicate,
}

impl From<WorkflowIdReusePolicy> for i32 {
    fn from(policy: WorkflowIdReusePolicy) -> Self {
        match policy {
            WorkflowIdReusePolicy::AllowDuplicateFailedOnly => 0,
            WorkflowIdReusePolicy::AllowDuplicate => 1,
            WorkflowIdReusePolicy::RejectDuplicate => 2,
        }
    }
}

impl TryFrom<i32> for WorkflowIdReusePolicy {
    type Error = String;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::AllowDuplicateFailedOnly),
            1 => Ok(Self::AllowDuplicate),
            2 => Ok(Self::RejectDuplicate),
            other => Err(format!("unknown workflow ID reuse policy {other}")),
        }
    }
}

/// Options for starting a workflow execution.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct StartWorkflowOptions {
    /// Business ID of the execution; the engine generates one when absent.
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub task_list: String,
    #[serde(with = "nanos")]
    pub execution_start_to_close_timeout: Option<Duration>,
    #[serde(with = "nanos")]
    pub decision_task_start_to_close_timeout: Option<Duration>,
    #[serde(rename = "WorkflowIDReusePolicy")]
    pub workflow_id_reuse_policy: WorkflowIdReusePolicy,
}

/// Identifies one run of a workflow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct WorkflowExecution {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "RunID")]
    pub run_id: String,
}

/// Durations inside JSON payloads travel as integer nanoseconds.
mod nanos {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => {
                serializer.serialize_u64(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX))
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_nanos))
    }
}

/// Registers a workflow implementation with the proxy.
#[proxy_message(request = WorkflowRegisterReply)]
pub struct WorkflowRegisterRequest;

impl WorkflowRegisterRequest {
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.properties().get_string("Name")
    }

    pub fn set_name(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("Name", value);
    }
}

#[proxy_message(reply)]
pub struct WorkflowRegisterReply;

/// Starts a workflow execution.
#[proxy_message(request = WorkflowExecuteReply)]
pub struct WorkflowExecuteRequest;

impl WorkflowExecuteRequest {
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.properties().get_string("Domain")
    }

    pub fn set_domain(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("Domain", value);
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.properties().get_string("Name")
    }

    pub fn set_name(&mut self, value: Option<&str>) {
        self.properties_mut().set_string("Name", value);
    }

    pub fn args(&self) -> Result<Option<WorkflowArgs>, ProxyError> {
        self.properties().get_json("Args")
    }

    pub fn set_args(&mut self, value: Option<&WorkflowArgs>) -> Result<(), ProxyError> {
        self.properties_mut().set_json("Args", value)
    }

    pub fn options(&self) -> Result<Option<StartWorkflowOptions>, ProxyError> {
        self.properties().get_json("Options")
    }

    pub fn set_options(&mut self, value: Option<&StartWorkflowOptions>) -> Result<(), ProxyError> {
        self.properties_mut().set_json("Options", value)
    }
}

#[proxy_message(reply)]
pub struct WorkflowExecuteReply;

impl WorkflowExecuteReply {
    pub fn execution(&self) -> Result<Option<WorkflowExecution>, ProxyError> {
        self.properties().get_json("Execution")
    }

    pub fn set_execution(&mut self, value: Option<&WorkflowExecution>) -> Result<(), ProxyError> {
        self.properties_mut().set_json("Execution", value)
    }

    /// The workflow's decision task start-to-close timeout.
    pub fn decision_timeout(&self) -> Result<Duration, ProxyError> {
        Ok(self
            .properties()
            .get_duration("DecisionTimeout")?
            .unwrap_or_default())
    }

    pub fn set_decision_timeout(&mut self, value: Duration) {
        self.properties_mut().set_duration("DecisionTimeout", value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;
    use crate::traits::HasReplyType;

    #[test]
    fn test_execute_request_json_properties() {
        let mut message = WorkflowExecuteRequest::new();
        assert_eq!(message.reply_type(), MessageType::WorkflowExecuteReply);
        assert_eq!(message.args().unwrap(), None);
        assert_eq!(message.options().unwrap(), None);

        let mut args = WorkflowArgs::new();
        args.insert("arg1".into(), serde_json::json!(1));
        args.insert("arg2".into(), serde_json::json!("two"));
        let options = StartWorkflowOptions {
            task_list: "my-list".into(),
            execution_start_to_close_timeout: Some(Duration::from_secs(100)),
            ..StartWorkflowOptions::default()
        };

        message.set_domain(Some("my-domain"));
        message.set_name(Some("Foo"));
        message.set_args(Some(&args)).unwrap();
        message.set_options(Some(&options)).unwrap();

        assert_eq!(message.domain(), Some("my-domain"));
        assert_eq!(message.name(), Some("Foo"));
        assert_eq!(message.args().unwrap(), Some(args));
        assert_eq!(message.options().unwrap(), Some(options));
    }

    #[test]
    fn test_options_wire_layout() {
        let options = StartWorkflowOptions {
            task_list: "my-list".into(),
            execution_start_to_close_timeout: Some(Duration::from_secs(1)),
            workflow_id_reuse_policy: WorkflowIdReusePolicy::RejectDuplicate,
            ..StartWorkflowOptions::default()
        };
        let value = serde_json::to_value(&options).unwrap();
        assert_eq!(value["TaskList"], "my-list");
        assert_eq!(value["ExecutionStartToCloseTimeout"], 1_000_000_000u64);
        assert_eq!(value["WorkflowIDReusePolicy"], 2);
        assert!(value.get("ID").is_none());
    }

    #[test]
    fn test_execute_reply() {
        let mut message = WorkflowExecuteReply::new();
        assert_eq!(message.decision_timeout().unwrap(), Duration::ZERO);

        let execution = WorkflowExecution {
            id: "foo".into(),
            run_id: "bar".into(),
        };
        message.set_execution(Some(&execution)).unwrap();
        message.set_decision_timeout(Duration::from_secs(60));

        assert_eq!(message.execution().unwrap(), Some(execution));
        assert_eq!(message.decision_timeout().unwrap(), Duration::from_secs(60));
    }
}
