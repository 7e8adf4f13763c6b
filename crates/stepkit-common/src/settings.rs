// RunnerSettings: execution behavior configured through environment variables.

use std::path::PathBuf;
use stepkit_sdk::{LifecycleLevel, StringUtil};
use tracing::warn;

pub const SCREENSHOT_ON_FAILURE: &str = "SCREENSHOT_ON_FAILURE";
pub const SCREENSHOT_ON_RECOVERABLE_FAILURE: &str = "SCREENSHOT_ON_RECOVERABLE_FAILURE";
pub const CLEAR_STATE_LEVEL: &str = "gauge_clear_state_level";
pub const PROJECT_ROOT: &str = "GAUGE_PROJECT_ROOT";

/// Settings the worker reads once at start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    /// Capture a screenshot when a step or hook fails.
    pub screenshot_on_failure: bool,
    /// Also capture one when the failing step continues on failure.
    pub screenshot_on_recoverable_failure: bool,
    /// Level whose after-phase clears cached instances.
    pub clear_state_level: Option<LifecycleLevel>,
    /// Directory scanned for step implementations.
    pub project_root: Option<PathBuf>,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            screenshot_on_failure: true,
            screenshot_on_recoverable_failure: true,
            clear_state_level: None,
            project_root: None,
        }
    }
}

impl RunnerSettings {
    /// Read settings from the process environment.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::vars())
    }

    /// Read settings from `(name, value)` pairs. Unrecognized values fall
    /// back to the defaults.
    pub fn from_vars<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut settings = Self::default();
        for (key, value) in vars {
            let value = value.as_ref();
            match key.as_ref() {
                SCREENSHOT_ON_FAILURE => {
                    settings.screenshot_on_failure =
                        flag(SCREENSHOT_ON_FAILURE, value, settings.screenshot_on_failure);
                }
                SCREENSHOT_ON_RECOVERABLE_FAILURE => {
                    settings.screenshot_on_recoverable_failure = flag(
                        SCREENSHOT_ON_RECOVERABLE_FAILURE,
                        value,
                        settings.screenshot_on_recoverable_failure,
                    );
                }
                CLEAR_STATE_LEVEL => {
                    settings.clear_state_level = clear_state_level(value);
                }
                PROJECT_ROOT if !value.trim().is_empty() => {
                    settings.project_root = Some(PathBuf::from(value.trim()));
                }
                _ => {}
            }
        }
        settings
    }

    /// Whether cached instances are cleared when `level` ends.
    pub fn clears_state_at(&self, level: LifecycleLevel) -> bool {
        self.clear_state_level == Some(level)
    }
}

fn flag(name: &str, value: &str, default: bool) -> bool {
    StringUtil::convert_to_bool(value).unwrap_or_else(|| {
        warn!(target: "worker", name, value, "Ignoring non-boolean setting");
        default
    })
}

// Only suite, spec and scenario scopes hold cached instances.
fn clear_state_level(value: &str) -> Option<LifecycleLevel> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    match value.parse::<LifecycleLevel>() {
        Ok(level) if level != LifecycleLevel::Step => Some(level),
        _ => {
            warn!(target: "worker", value, "Ignoring unsupported clear state level");
            None
        }
    }
}
