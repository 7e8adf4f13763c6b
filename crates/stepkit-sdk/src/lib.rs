// stepkit-sdk: Foundation layer for the stepkit language plugin.
// This crate has ZERO dependencies on other stepkit crates. It defines the
// capabilities a language loader must provide (indexing, loading, invoking,
// instantiating, screenshots, pending output) and the values they exchange.

pub mod capability;
pub mod collector;
pub mod execution_context;
pub mod failure;
pub mod lifecycle;
pub mod method;
pub mod string_util;

// Re-export commonly used items at crate root
pub use capability::{
    IndexError, InstanceFactory, MessageSink, MethodInvoker, MethodLoader, ScreenshotError,
    ScreenshotWriter, SourceIndexer,
};
pub use collector::MessageCollector;
pub use execution_context::{ExecutionContext, ScenarioInfo, SpecInfo, StepInfo};
pub use failure::{FailureInfo, InvocationFailure, GENERIC_FAILURE_MESSAGE};
pub use lifecycle::{HookPhase, HookType, LifecycleLevel, TagAggregation};
pub use method::{
    Instance, InvocationArgs, LoadedHook, LoadedMethods, LoadedStep, MethodHandle, Position,
    Screenshot, SourceSpan, StepDeclaration,
};
pub use string_util::StringUtil;
