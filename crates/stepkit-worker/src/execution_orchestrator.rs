// ExecutionOrchestrator: runs steps and hook sets against scoped instances and
// turns every outcome, including panics in user code, into an ExecutionResult.

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use stepkit_common::{
    ExecutionError, ExecutionResult, HookRegistry, HookStrategy, RunnerSettings, ScopeError,
    StepDefinition,
};
use stepkit_sdk::{
    ExecutionContext, FailureInfo, HookType, InvocationArgs, InvocationFailure, LifecycleLevel,
    MessageSink, MethodHandle, MethodInvoker, ScreenshotWriter,
};
use tracing::{debug, warn};

use crate::instance_manager::{InstanceManager, ScopeId};
use crate::worker::Capabilities;

pub struct ExecutionOrchestrator {
    hooks: Arc<HookRegistry>,
    invoker: Arc<dyn MethodInvoker>,
    screenshot_writer: Arc<dyn ScreenshotWriter>,
    message_sink: Arc<dyn MessageSink>,
    instances: InstanceManager,
    settings: RunnerSettings,
}

impl ExecutionOrchestrator {
    pub fn new(hooks: HookRegistry, capabilities: &Capabilities, settings: RunnerSettings) -> Self {
        Self {
            hooks: Arc::new(hooks),
            invoker: Arc::clone(&capabilities.invoker),
            screenshot_writer: Arc::clone(&capabilities.screenshot_writer),
            message_sink: Arc::clone(&capabilities.message_sink),
            instances: InstanceManager::new(Arc::clone(&capabilities.instance_factory)),
            settings,
        }
    }

    pub fn settings(&self) -> &RunnerSettings {
        &self.settings
    }

    pub fn instances(&self) -> &InstanceManager {
        &self.instances
    }

    /// Run one step with already-marshaled arguments.
    pub async fn execute_step(&mut self, step: &StepDefinition, args: Vec<String>) -> ExecutionResult {
        let started = Instant::now();

        if args.len() != step.parameter_count {
            let error = ExecutionError::ArgumentMismatch {
                name: step.method_name.clone(),
                actual: args.len(),
                expected: step.parameter_count,
            };
            warn!(target: "step", step = %step.step_value, "{}", error);
            return self.finish(ExecutionResult::refused(&error), started);
        }

        let Some(handle) = step.method.clone() else {
            let error = ExecutionError::NotLoaded(step.qualified_name());
            warn!(target: "step", step = %step.step_value, "{}", error);
            return self.finish(ExecutionResult::refused(&error), started);
        };

        let mut result = ExecutionResult::passed();
        match self
            .invoke(&step.enclosing_type_name, &handle, InvocationArgs::Step(args))
            .await
        {
            Ok(()) => {
                debug!(target: "step", step = %step.step_value, method = %handle, "Step passed");
            }
            Err(failure) => {
                let info = self.report_failure(&failure);
                warn!(
                    target: "step",
                    step = %step.step_value,
                    method = %handle,
                    recoverable = step.continue_on_failure,
                    "Step failed: {}",
                    info.message
                );
                result.record_failure(&info);
                result.recoverable = step.continue_on_failure;
                if self.should_capture(step.continue_on_failure) {
                    self.capture_screenshot(&mut result);
                }
            }
        }
        self.finish(result, started)
    }

    /// Run every hook of `hook_type` that applies to `tags`, in `strategy`
    /// order. A failing hook does not stop the rest; the first failure is
    /// the one reported.
    pub async fn execute_hooks(
        &mut self,
        hook_type: HookType,
        strategy: HookStrategy,
        tags: &[String],
        context: &ExecutionContext,
    ) -> ExecutionResult {
        let started = Instant::now();
        let hooks = Arc::clone(&self.hooks);
        let selected = strategy.select(tags, hooks.hooks(hook_type));

        let mut first_failure: Option<FailureInfo> = None;
        for hook in selected {
            let args = InvocationArgs::Hook(hook.takes_context.then(|| context.clone()));
            match self.invoke(&hook.enclosing_type_name, &hook.method, args).await {
                Ok(()) => {
                    debug!(target: "hooks", %hook_type, hook = %hook.qualified_name, "Hook passed");
                }
                Err(failure) => {
                    let info = self.report_failure(&failure);
                    warn!(target: "hooks", %hook_type, hook = %hook.qualified_name, "Hook failed: {}", info.message);
                    if first_failure.is_none() {
                        first_failure = Some(info);
                    }
                }
            }
        }

        let mut result = ExecutionResult::passed();
        if let Some(info) = first_failure {
            result.record_failure(&info);
            if self.should_capture(false) {
                self.capture_screenshot(&mut result);
            }
        }
        self.finish(result, started)
    }

    pub fn open_execution_scope(&mut self, level: LifecycleLevel) -> ScopeId {
        self.instances.open_scope(level)
    }

    /// End the innermost scope; its instances are never reused.
    pub fn close_execution_scope(&mut self) -> Result<ScopeId, ScopeError> {
        self.instances.close_current()
    }

    /// Clear cached instances at the end of `level`.
    pub fn clear_cache(&mut self, level: LifecycleLevel) {
        let cleared = self.instances.clear_cache();
        debug!(target: "worker", %level, cleared, "Cleared instance cache");
    }

    /// A failed result for a request refused before anything ran. Pending
    /// messages are still drained into it.
    pub fn refuse(&self, error: &ExecutionError) -> ExecutionResult {
        self.finish(ExecutionResult::refused(error), Instant::now())
    }

    async fn invoke(
        &mut self,
        type_name: &str,
        method: &MethodHandle,
        args: InvocationArgs,
    ) -> Result<(), InvocationFailure> {
        let target = self.instances.get(type_name)?;
        AssertUnwindSafe(self.invoker.invoke(method, target, args))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| {
                let message = panic
                    .downcast_ref::<String>()
                    .cloned()
                    .or_else(|| panic.downcast_ref::<&str>().map(|s| s.to_string()))
                    .unwrap_or_else(|| "user code panicked".to_string());
                Err(InvocationFailure::raised(message, String::new()))
            })
    }

    fn report_failure(&self, failure: &InvocationFailure) -> FailureInfo {
        match failure {
            InvocationFailure::Aggregate(_) if failure.leaf_count() > 1 => {
                debug!(target: "step", failures = failure.leaf_count(), "Reporting first of several failures");
            }
            InvocationFailure::Unmarshalable { type_name } => {
                warn!(target: "step", type_name = %type_name, "Failure could not be marshaled");
            }
            _ => {}
        }
        failure.flatten()
    }

    fn should_capture(&self, recoverable: bool) -> bool {
        self.settings.screenshot_on_failure
            && (!recoverable || self.settings.screenshot_on_recoverable_failure)
    }

    fn capture_screenshot(&self, result: &mut ExecutionResult) {
        match self.screenshot_writer.capture() {
            Ok(screenshot) => result.attach_screenshot(screenshot),
            Err(e) => warn!(target: "step", error = %e, "Failed to capture screenshot"),
        }
    }

    fn finish(&self, mut result: ExecutionResult, started: Instant) -> ExecutionResult {
        result.messages = self.message_sink.drain_pending_messages();
        result.screenshots = self.message_sink.drain_pending_screenshots();
        result.execution_time_millis = started.elapsed().as_millis() as u64;
        result
    }
}
