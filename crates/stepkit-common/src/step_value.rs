// Step text normalization.

use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").expect("Invalid placeholder regex"));

/// Normalize a raw step text into its step value: every `<...>` placeholder
/// becomes `{}`. Applying it twice yields the same value.
pub fn to_step_value(step_text: &str) -> String {
    PLACEHOLDER.replace_all(step_text, "{}").into_owned()
}
