// Request and response shapes exchanged with the orchestrating process.
// Framing and transport belong to the host; these are the decoded payloads.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use stepkit_common::{ExecutionResult, StepPosition};
use stepkit_sdk::{ExecutionContext, HookType, LifecycleLevel};

/// File lifecycle notification carried by a `CacheFile` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    Changed,
    Opened,
    Closed,
    Created,
    Deleted,
}

impl FileStatus {
    /// Decode the wire value of a file status.
    pub fn from_i32(value: i32) -> Option<Self> {
        match value {
            0 => Some(FileStatus::Changed),
            1 => Some(FileStatus::Opened),
            2 => Some(FileStatus::Closed),
            3 => Some(FileStatus::Created),
            4 => Some(FileStatus::Deleted),
            _ => None,
        }
    }

    pub fn as_i32(self) -> i32 {
        match self {
            FileStatus::Changed => 0,
            FileStatus::Opened => 1,
            FileStatus::Closed => 2,
            FileStatus::Created => 3,
            FileStatus::Deleted => 4,
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Changed => write!(f, "Changed"),
            FileStatus::Opened => write!(f, "Opened"),
            FileStatus::Closed => write!(f, "Closed"),
            FileStatus::Created => write!(f, "Created"),
            FileStatus::Deleted => write!(f, "Deleted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheFileRequest {
    /// Current editor content; unused for statuses that read from disk.
    #[serde(default)]
    pub content: String,
    pub file_path: PathBuf,
    /// Wire value of a [`FileStatus`].
    pub status: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPositionsRequest {
    pub file_path: PathBuf,
}

/// Kind of a step parameter as resolved by the orchestrating process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterType {
    #[default]
    Static,
    Dynamic,
    SpecialString,
    SpecialTable,
    Table,
}

/// A table argument.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProtoTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    #[serde(default)]
    pub parameter_type: ParameterType,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub table: Option<ProtoTable>,
}

impl Parameter {
    pub fn value(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn table(table: ProtoTable) -> Self {
        Self {
            parameter_type: ParameterType::Table,
            table: Some(table),
            ..Default::default()
        }
    }

    pub fn is_table(&self) -> bool {
        matches!(
            self.parameter_type,
            ParameterType::Table | ParameterType::SpecialTable
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteStepRequest {
    /// Step text normalized by the orchestrating process, i.e. the step value.
    pub parsed_step_text: String,
    /// Step text as written in the spec.
    #[serde(default)]
    pub actual_step_text: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

/// Run the hooks of one type directly, outside the lifecycle processors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteHooksRequest {
    pub hook_type: HookType,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub context: ExecutionContext,
}

/// An inbound request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "messageType", content = "payload")]
pub enum Request {
    ExecutionStarting(ExecutionContext),
    SpecExecutionStarting(ExecutionContext),
    ScenarioExecutionStarting(ExecutionContext),
    StepExecutionStarting(ExecutionContext),
    StepExecutionEnding(ExecutionContext),
    ScenarioExecutionEnding(ExecutionContext),
    SpecExecutionEnding(ExecutionContext),
    ExecutionEnding(ExecutionContext),
    ExecuteStep(ExecuteStepRequest),
    ExecuteHooks(ExecuteHooksRequest),
    CacheFile(CacheFileRequest),
    StepPositions(StepPositionsRequest),
    CloseExecutionScope,
    ClearCache(LifecycleLevel),
}

impl Request {
    /// Message type name, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Request::ExecutionStarting(_) => "ExecutionStarting",
            Request::SpecExecutionStarting(_) => "SpecExecutionStarting",
            Request::ScenarioExecutionStarting(_) => "ScenarioExecutionStarting",
            Request::StepExecutionStarting(_) => "StepExecutionStarting",
            Request::StepExecutionEnding(_) => "StepExecutionEnding",
            Request::ScenarioExecutionEnding(_) => "ScenarioExecutionEnding",
            Request::SpecExecutionEnding(_) => "SpecExecutionEnding",
            Request::ExecutionEnding(_) => "ExecutionEnding",
            Request::ExecuteStep(_) => "ExecuteStep",
            Request::ExecuteHooks(_) => "ExecuteHooks",
            Request::CacheFile(_) => "CacheFile",
            Request::StepPositions(_) => "StepPositions",
            Request::CloseExecutionScope => "CloseExecutionScope",
            Request::ClearCache(_) => "ClearCache",
        }
    }
}

/// The reply to a [`Request`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "messageType", content = "payload")]
pub enum Response {
    ExecutionStatus(ExecutionResult),
    StepPositions(Vec<StepPosition>),
    Ack,
}

impl Response {
    pub fn execution_result(&self) -> Option<&ExecutionResult> {
        match self {
            Response::ExecutionStatus(result) => Some(result),
            _ => None,
        }
    }
}
