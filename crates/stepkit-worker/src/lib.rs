// stepkit-worker: The execution core of a stepkit language plugin.
// Depends on `stepkit-sdk` and `stepkit-common`.
//
// Architecture:
//   Worker::start → StepLoader::load_implementations → MethodLoader::load
//     → Worker::handle(Request) → processors → ExecutionOrchestrator
//     → InstanceManager + MethodInvoker

pub mod execution_orchestrator;
pub mod instance_manager;
pub mod messages;
pub mod processors;
pub mod step_loader;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use execution_orchestrator::ExecutionOrchestrator;
pub use instance_manager::{InstanceManager, ScopeId, ScopeState};
pub use messages::{FileStatus, Request, Response};
pub use step_loader::StepLoader;
pub use worker::{Capabilities, Envelope, Worker};
