// ExecutionContext: what is running right now, as reported by the orchestrating process.
// Supplied per request; hooks that accept a context receive a copy.

use serde::{Deserialize, Serialize};

/// The spec currently executing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub file_name: String,
    #[serde(default)]
    pub is_failed: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The scenario currently executing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub is_failed: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// The step currently executing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepInfo {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub is_failed: bool,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub stack_trace: Option<String>,
}

/// Snapshot of the execution position at the moment of a request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    #[serde(default)]
    pub current_spec: Option<SpecInfo>,
    #[serde(default)]
    pub current_scenario: Option<ScenarioInfo>,
    #[serde(default)]
    pub current_step: Option<StepInfo>,
}

impl ExecutionContext {
    /// Tags of the current spec, or none.
    pub fn spec_tags(&self) -> Vec<String> {
        self.current_spec
            .as_ref()
            .map(|s| s.tags.clone())
            .unwrap_or_default()
    }

    /// Scenario tags followed by spec tags, without duplicates.
    pub fn scenario_and_spec_tags(&self) -> Vec<String> {
        let scenario = self.current_scenario.iter().flat_map(|s| s.tags.iter());
        let spec = self.current_spec.iter().flat_map(|s| s.tags.iter());

        let mut tags: Vec<String> = Vec::new();
        for tag in scenario.chain(spec) {
            if !tags.contains(tag) {
                tags.push(tag.clone());
            }
        }
        tags
    }
}
