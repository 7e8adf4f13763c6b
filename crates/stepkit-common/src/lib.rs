// stepkit-common: Registries and shared services for the stepkit worker.
// Depends only on `stepkit-sdk`.

pub mod errors;
pub mod execution_result;
pub mod hook_registry;
pub mod hook_strategy;
pub mod settings;
pub mod step_registry;
pub mod step_value;

// ---------------------------------------------------------------------------
// Re-exports for convenient access
// ---------------------------------------------------------------------------

pub use errors::{ExecutionError, RegistryError, RequestError, ScopeError};
pub use execution_result::ExecutionResult;
pub use hook_registry::{HookDefinition, HookRegistry, TagExpression};
pub use hook_strategy::HookStrategy;
pub use settings::RunnerSettings;
pub use step_registry::{StepDefinition, StepPosition, StepRegistry};
pub use step_value::to_step_value;
