// Lifecycle phase processors: run the hooks for one execution phase with the
// tags that apply to it, and open or close execution scopes around them.

use stepkit_common::{ExecutionResult, HookStrategy};
use stepkit_sdk::{ExecutionContext, HookPhase, HookType, LifecycleLevel};
use tracing::{debug, warn};

use crate::execution_orchestrator::ExecutionOrchestrator;
use crate::messages::Request;

/// What a phase does to the execution scope stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeAction {
    None,
    /// Open a scope of the given level before running hooks.
    OpenBefore(LifecycleLevel),
    /// Close the current scope before running hooks. The hooks run in a
    /// scope of their own that closes with them.
    CloseBefore,
    /// Close the current scope after running hooks.
    CloseAfter,
}

/// Which context tags a phase's hooks are matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    None,
    Spec,
    ScenarioAndSpec,
}

impl TagSource {
    pub fn tags(self, context: &ExecutionContext) -> Vec<String> {
        match self {
            TagSource::None => Vec::new(),
            TagSource::Spec => context.spec_tags(),
            TagSource::ScenarioAndSpec => context.scenario_and_spec_tags(),
        }
    }
}

/// Processor for one lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseProcessor {
    pub hook_type: HookType,
    pub strategy: HookStrategy,
    pub tags: TagSource,
    pub scope: ScopeAction,
}

impl PhaseProcessor {
    pub const EXECUTION_STARTING: PhaseProcessor = PhaseProcessor {
        hook_type: HookType::BEFORE_SUITE,
        strategy: HookStrategy::UntaggedFirst,
        tags: TagSource::None,
        scope: ScopeAction::OpenBefore(LifecycleLevel::Suite),
    };
    pub const SPEC_EXECUTION_STARTING: PhaseProcessor = PhaseProcessor {
        hook_type: HookType::BEFORE_SPEC,
        strategy: HookStrategy::TaggedFirst,
        tags: TagSource::Spec,
        scope: ScopeAction::OpenBefore(LifecycleLevel::Spec),
    };
    pub const SCENARIO_EXECUTION_STARTING: PhaseProcessor = PhaseProcessor {
        hook_type: HookType::BEFORE_SCENARIO,
        strategy: HookStrategy::TaggedFirst,
        tags: TagSource::ScenarioAndSpec,
        scope: ScopeAction::OpenBefore(LifecycleLevel::Scenario),
    };
    pub const STEP_EXECUTION_STARTING: PhaseProcessor = PhaseProcessor {
        hook_type: HookType::BEFORE_STEP,
        strategy: HookStrategy::UntaggedFirst,
        tags: TagSource::ScenarioAndSpec,
        scope: ScopeAction::None,
    };
    pub const STEP_EXECUTION_ENDING: PhaseProcessor = PhaseProcessor {
        hook_type: HookType::AFTER_STEP,
        strategy: HookStrategy::UntaggedFirst,
        tags: TagSource::ScenarioAndSpec,
        scope: ScopeAction::None,
    };
    pub const SCENARIO_EXECUTION_ENDING: PhaseProcessor = PhaseProcessor {
        hook_type: HookType::AFTER_SCENARIO,
        strategy: HookStrategy::TaggedFirst,
        tags: TagSource::ScenarioAndSpec,
        scope: ScopeAction::CloseBefore,
    };
    pub const SPEC_EXECUTION_ENDING: PhaseProcessor = PhaseProcessor {
        hook_type: HookType::AFTER_SPEC,
        strategy: HookStrategy::TaggedFirst,
        tags: TagSource::Spec,
        scope: ScopeAction::CloseBefore,
    };
    pub const EXECUTION_ENDING: PhaseProcessor = PhaseProcessor {
        hook_type: HookType::AFTER_SUITE,
        strategy: HookStrategy::UntaggedFirst,
        tags: TagSource::Spec,
        scope: ScopeAction::CloseAfter,
    };

    /// The processor and context for a lifecycle request.
    pub fn for_request(request: &Request) -> Option<(PhaseProcessor, &ExecutionContext)> {
        let processor = match request {
            Request::ExecutionStarting(_) => Self::EXECUTION_STARTING,
            Request::SpecExecutionStarting(_) => Self::SPEC_EXECUTION_STARTING,
            Request::ScenarioExecutionStarting(_) => Self::SCENARIO_EXECUTION_STARTING,
            Request::StepExecutionStarting(_) => Self::STEP_EXECUTION_STARTING,
            Request::StepExecutionEnding(_) => Self::STEP_EXECUTION_ENDING,
            Request::ScenarioExecutionEnding(_) => Self::SCENARIO_EXECUTION_ENDING,
            Request::SpecExecutionEnding(_) => Self::SPEC_EXECUTION_ENDING,
            Request::ExecutionEnding(_) => Self::EXECUTION_ENDING,
            _ => return None,
        };
        match request {
            Request::ExecutionStarting(context)
            | Request::SpecExecutionStarting(context)
            | Request::ScenarioExecutionStarting(context)
            | Request::StepExecutionStarting(context)
            | Request::StepExecutionEnding(context)
            | Request::ScenarioExecutionEnding(context)
            | Request::SpecExecutionEnding(context)
            | Request::ExecutionEnding(context) => Some((processor, context)),
            _ => None,
        }
    }

    pub async fn process(
        &self,
        orchestrator: &mut ExecutionOrchestrator,
        context: &ExecutionContext,
    ) -> ExecutionResult {
        match self.scope {
            ScopeAction::OpenBefore(level) => {
                orchestrator.open_execution_scope(level);
            }
            ScopeAction::CloseBefore => {
                self.close_scope(orchestrator);
                orchestrator.open_execution_scope(self.hook_type.level);
            }
            ScopeAction::None | ScopeAction::CloseAfter => {}
        }

        let tags = self.tags.tags(context);
        let result = orchestrator
            .execute_hooks(self.hook_type, self.strategy, &tags, context)
            .await;
        debug!(
            target: "hooks",
            hook_type = %self.hook_type,
            success = result.success,
            elapsed_ms = result.execution_time_millis,
            "Ran phase hooks"
        );

        if matches!(self.scope, ScopeAction::CloseBefore | ScopeAction::CloseAfter) {
            self.close_scope(orchestrator);
        }
        if self.hook_type.phase == HookPhase::After
            && orchestrator.settings().clears_state_at(self.hook_type.level)
        {
            orchestrator.clear_cache(self.hook_type.level);
        }
        result
    }

    fn close_scope(&self, orchestrator: &mut ExecutionOrchestrator) {
        if let Err(e) = orchestrator.close_execution_scope() {
            warn!(target: "hooks", hook_type = %self.hook_type, error = %e, "Could not close execution scope");
        }
    }
}
