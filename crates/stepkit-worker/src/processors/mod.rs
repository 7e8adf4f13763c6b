// Request processors. Each maps one inbound request onto the loader,
// registry or orchestrator and shapes the reply.

pub mod cache_file;
pub mod execute_step;
pub mod hook_phase;
pub mod step_positions;

pub use hook_phase::{PhaseProcessor, ScopeAction};
