// Failures raised by invoked user code and their reportable form.

use thiserror::Error;

/// Message reported when a failure cannot be represented faithfully.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "The step implementation raised a failure that could not be reported";

/// A failure raised while invoking a user method.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvocationFailure {
    /// User code raised an error with a message and stack trace.
    #[error("{message}")]
    Raised { message: String, stack_trace: String },

    /// Parallel work started by the method failed in more than one place.
    #[error("{} failures were raised", .0.len())]
    Aggregate(Vec<InvocationFailure>),

    /// The raised value could not be marshaled back to the engine.
    #[error("a failure of type '{type_name}' could not be marshaled")]
    Unmarshalable { type_name: String },
}

impl InvocationFailure {
    pub fn raised(message: impl Into<String>, stack_trace: impl Into<String>) -> Self {
        InvocationFailure::Raised {
            message: message.into(),
            stack_trace: stack_trace.into(),
        }
    }

    /// Collapse this failure into a single reportable message and stack trace.
    ///
    /// Aggregates report their first leaf failure; unmarshalable failures
    /// degrade to [`GENERIC_FAILURE_MESSAGE`].
    pub fn flatten(&self) -> FailureInfo {
        match self {
            InvocationFailure::Raised {
                message,
                stack_trace,
            } => FailureInfo {
                message: message.clone(),
                stack_trace: stack_trace.clone(),
            },
            InvocationFailure::Aggregate(inner) => match inner.first() {
                Some(first) => first.flatten(),
                None => FailureInfo::generic(),
            },
            InvocationFailure::Unmarshalable { .. } => FailureInfo::generic(),
        }
    }

    /// Number of leaf failures this failure represents.
    pub fn leaf_count(&self) -> usize {
        match self {
            InvocationFailure::Aggregate(inner) => inner.iter().map(|f| f.leaf_count()).sum(),
            _ => 1,
        }
    }
}

/// A failure in the shape that crosses the process boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    pub message: String,
    pub stack_trace: String,
}

impl FailureInfo {
    pub fn new(message: impl Into<String>, stack_trace: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            stack_trace: stack_trace.into(),
        }
    }

    pub fn generic() -> Self {
        Self::new(GENERIC_FAILURE_MESSAGE, String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_raised() {
        let failure = InvocationFailure::raised("boom", "at Foo.Bar()");
        assert_eq!(failure.flatten(), FailureInfo::new("boom", "at Foo.Bar()"));
    }

    #[test]
    fn test_flatten_nested_aggregate_reports_first_leaf() {
        let failure = InvocationFailure::Aggregate(vec![
            InvocationFailure::Aggregate(vec![InvocationFailure::raised("first", "s1")]),
            InvocationFailure::raised("second", "s2"),
        ]);
        assert_eq!(failure.flatten().message, "first");
        assert_eq!(failure.leaf_count(), 2);
    }

    #[test]
    fn test_flatten_empty_aggregate_is_generic() {
        let failure = InvocationFailure::Aggregate(Vec::new());
        assert_eq!(failure.flatten(), FailureInfo::generic());
    }

    #[test]
    fn test_flatten_unmarshalable_is_generic() {
        let failure = InvocationFailure::Unmarshalable {
            type_name: "NativeHandleException".to_string(),
        };
        let info = failure.flatten();
        assert_eq!(info.message, GENERIC_FAILURE_MESSAGE);
        assert!(info.stack_trace.is_empty());
    }
}
