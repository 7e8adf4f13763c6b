// ExecutionResult: the outcome of one step or hook-set execution.

use serde::{Deserialize, Serialize};
use stepkit_sdk::{FailureInfo, Screenshot};

use crate::errors::ExecutionError;

/// Outcome reported for an execution request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub success: bool,
    pub execution_time_millis: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    /// The failing step continues on failure.
    #[serde(default)]
    pub recoverable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "base64_opt")]
    pub failure_screenshot: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_screenshot_file: Option<String>,
    /// Diagnostics user code wrote during the execution, in emission order.
    #[serde(default)]
    pub messages: Vec<String>,
    /// Screenshots user code captured during the execution.
    #[serde(default, with = "base64_list")]
    pub screenshots: Vec<Vec<u8>>,
}

impl ExecutionResult {
    pub fn passed() -> Self {
        Self {
            success: true,
            ..Default::default()
        }
    }

    pub fn failed(message: impl Into<String>, stack_trace: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            stack_trace: Some(stack_trace.into()),
            ..Default::default()
        }
    }

    /// A result for a request refused before anything was invoked.
    pub fn refused(error: &ExecutionError) -> Self {
        Self::failed(error.to_string(), String::new())
    }

    /// Mark this result failed with `failure`'s message and stack trace.
    pub fn record_failure(&mut self, failure: &FailureInfo) {
        self.success = false;
        self.error_message = Some(failure.message.clone());
        self.stack_trace = Some(failure.stack_trace.clone());
    }

    pub fn attach_screenshot(&mut self, screenshot: Screenshot) {
        match screenshot {
            Screenshot::Bytes(bytes) => self.failure_screenshot = Some(bytes),
            Screenshot::File(path) => {
                self.failure_screenshot_file = Some(path.display().to_string())
            }
        }
    }

    pub fn has_screenshot(&self) -> bool {
        self.failure_screenshot.is_some() || self.failure_screenshot_file.is_some()
    }
}

mod base64_opt {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(b) => serializer.serialize_str(&STANDARD.encode(b)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

mod base64_list {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq(items.iter().map(|b| STANDARD.encode(b)))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Vec::<String>::deserialize(deserializer)?
            .into_iter()
            .map(|s| STANDARD.decode(s).map_err(serde::de::Error::custom))
            .collect()
    }
}
