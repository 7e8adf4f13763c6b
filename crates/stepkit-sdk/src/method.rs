// Method metadata exchanged between a language loader and the engine.
// Loaders describe user code declaratively; the engine never inspects the
// user's type system itself.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::execution_context::ExecutionContext;
use crate::lifecycle::{HookType, TagAggregation};

/// A live object that step and hook methods are invoked against.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Opaque reference to an invocable user method, issued by the loader and
/// understood only by the matching [`MethodInvoker`](crate::MethodInvoker).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MethodHandle(String);

impl MethodHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MethodHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A line/column location in a source file. Both are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// The region of a source file occupied by a step method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpan {
    pub start: Position,
    pub end: Position,
}

impl SourceSpan {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Convenience for whole-line spans.
    pub fn lines(start_line: u32, end_line: u32) -> Self {
        Self {
            start: Position::new(start_line, 1),
            end: Position::new(end_line, 1),
        }
    }
}

/// A step method found by the source indexer in a file's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDeclaration {
    /// Step texts declared on the method; more than one means the texts are aliases.
    pub texts: Vec<String>,
    pub method_name: String,
    pub enclosing_type_name: String,
    pub parameter_count: usize,
    pub span: SourceSpan,
}

/// A step method discovered by the dynamic loader, ready to invoke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedStep {
    pub texts: Vec<String>,
    pub method_name: String,
    pub enclosing_type_name: String,
    pub parameter_count: usize,
    pub continue_on_failure: bool,
    pub handle: MethodHandle,
}

/// A hook method discovered by the dynamic loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedHook {
    pub hook_type: HookType,
    pub method_name: String,
    pub enclosing_type_name: String,
    /// Tag filter; empty means the hook applies unconditionally.
    pub tags: Vec<String>,
    pub aggregation: TagAggregation,
    /// Whether the method declares an execution-context parameter.
    pub takes_context: bool,
    pub handle: MethodHandle,
}

/// Everything a dynamic load pass yields.
#[derive(Debug, Clone, Default)]
pub struct LoadedMethods {
    pub steps: Vec<LoadedStep>,
    pub hooks: Vec<LoadedHook>,
}

/// Arguments marshaled into a method invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum InvocationArgs {
    /// Step parameters, in declaration order.
    Step(Vec<String>),
    /// A hook call, with the current context if the hook accepts one.
    Hook(Option<ExecutionContext>),
}

/// A captured screenshot: either raw image bytes or a file the writer saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screenshot {
    Bytes(Vec<u8>),
    File(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_order_by_start_line() {
        let mut spans = vec![SourceSpan::lines(20, 24), SourceSpan::lines(3, 8)];
        spans.sort();
        assert_eq!(spans[0].start.line, 3);
    }

    #[test]
    fn test_method_handle_display() {
        let handle = MethodHandle::new("Sample.StepImplementation.SayHello");
        assert_eq!(handle.to_string(), "Sample.StepImplementation.SayHello");
    }
}
