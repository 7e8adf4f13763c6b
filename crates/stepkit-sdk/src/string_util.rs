/// String utility functions shared by settings parsing and loaders.
pub struct StringUtil;

impl StringUtil {
    /// Convert a string to a boolean.
    ///
    /// Valid true values: `"1"`, `"true"`, `"$true"` (case-insensitive).
    /// Valid false values: `"0"`, `"false"`, `"$false"` (case-insensitive).
    /// Returns `None` for unrecognized values.
    pub fn convert_to_bool(value: &str) -> Option<bool> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match value.to_ascii_lowercase().as_str() {
            "1" | "true" | "$true" => Some(true),
            "0" | "false" | "$false" => Some(false),
            _ => None,
        }
    }

    /// Fully qualified method name: `Type.Method`, or just `Method` when the
    /// enclosing type is unknown.
    pub fn qualified_name(enclosing_type_name: &str, method_name: &str) -> String {
        if enclosing_type_name.is_empty() {
            method_name.to_string()
        } else {
            format!("{enclosing_type_name}.{method_name}")
        }
    }
}
