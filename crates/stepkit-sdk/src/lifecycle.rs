// Lifecycle levels, hook phases and tag aggregation.
// These enums name where in the suite > spec > scenario > step nesting a hook
// or an instance scope belongs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A nesting level of test execution. Levels are strictly nested:
/// Suite contains Specs, a Spec contains Scenarios, a Scenario contains Steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleLevel {
    Suite,
    Spec,
    Scenario,
    Step,
}

impl LifecycleLevel {
    /// The lowercase name used in configuration values (`"suite"`, `"spec"`, ...).
    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleLevel::Suite => "suite",
            LifecycleLevel::Spec => "spec",
            LifecycleLevel::Scenario => "scenario",
            LifecycleLevel::Step => "step",
        }
    }
}

impl fmt::Display for LifecycleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LifecycleLevel::Suite => write!(f, "Suite"),
            LifecycleLevel::Spec => write!(f, "Spec"),
            LifecycleLevel::Scenario => write!(f, "Scenario"),
            LifecycleLevel::Step => write!(f, "Step"),
        }
    }
}

impl FromStr for LifecycleLevel {
    type Err = String;

    /// Parses a level name, ignoring case and surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suite" => Ok(LifecycleLevel::Suite),
            "spec" => Ok(LifecycleLevel::Spec),
            "scenario" => Ok(LifecycleLevel::Scenario),
            "step" => Ok(LifecycleLevel::Step),
            other => Err(format!("unknown lifecycle level '{other}'")),
        }
    }
}

/// Whether a hook runs before or after its level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HookPhase {
    Before,
    After,
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::Before => write!(f, "Before"),
            HookPhase::After => write!(f, "After"),
        }
    }
}

/// A hook kind such as `BeforeSuite` or `AfterStep`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HookType {
    pub phase: HookPhase,
    pub level: LifecycleLevel,
}

impl HookType {
    pub const BEFORE_SUITE: HookType = HookType::new(HookPhase::Before, LifecycleLevel::Suite);
    pub const AFTER_SUITE: HookType = HookType::new(HookPhase::After, LifecycleLevel::Suite);
    pub const BEFORE_SPEC: HookType = HookType::new(HookPhase::Before, LifecycleLevel::Spec);
    pub const AFTER_SPEC: HookType = HookType::new(HookPhase::After, LifecycleLevel::Spec);
    pub const BEFORE_SCENARIO: HookType =
        HookType::new(HookPhase::Before, LifecycleLevel::Scenario);
    pub const AFTER_SCENARIO: HookType = HookType::new(HookPhase::After, LifecycleLevel::Scenario);
    pub const BEFORE_STEP: HookType = HookType::new(HookPhase::Before, LifecycleLevel::Step);
    pub const AFTER_STEP: HookType = HookType::new(HookPhase::After, LifecycleLevel::Step);

    pub const fn new(phase: HookPhase, level: LifecycleLevel) -> Self {
        Self { phase, level }
    }
}

impl fmt::Display for HookType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.phase, self.level)
    }
}

impl FromStr for HookType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (phase, rest) = if let Some(rest) = s.strip_prefix("Before") {
            (HookPhase::Before, rest)
        } else if let Some(rest) = s.strip_prefix("After") {
            (HookPhase::After, rest)
        } else {
            return Err(format!("unknown hook type '{s}'"));
        };
        let level = rest
            .parse::<LifecycleLevel>()
            .map_err(|_| format!("unknown hook type '{s}'"))?;
        Ok(HookType::new(phase, level))
    }
}

/// How a hook's tag set is matched against the tags of the running context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TagAggregation {
    /// Every hook tag must be present.
    #[default]
    All,
    /// At least one hook tag must be present.
    Any,
}
