// Worker: the long-lived request handler.
// Bootstraps the registries from the loader's capabilities, then serves one
// request at a time. No single request failure stops the worker.

use anyhow::{Context, Result};
use std::sync::Arc;
use stepkit_common::{ExecutionResult, HookStrategy, RequestError, RunnerSettings, StepRegistry};
use stepkit_sdk::{
    InstanceFactory, MessageSink, MethodInvoker, MethodLoader, ScreenshotWriter, SourceIndexer,
};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info};

use crate::execution_orchestrator::ExecutionOrchestrator;
use crate::messages::{ExecuteHooksRequest, Request, Response};
use crate::processors::{self, PhaseProcessor};
use crate::step_loader::StepLoader;

/// A request paired with the channel its response goes back on.
pub type Envelope = (Request, oneshot::Sender<Response>);

/// Everything a language loader plugs into the worker.
#[derive(Clone)]
pub struct Capabilities {
    pub indexer: Arc<dyn SourceIndexer>,
    pub loader: Arc<dyn MethodLoader>,
    pub instance_factory: Arc<dyn InstanceFactory>,
    pub invoker: Arc<dyn MethodInvoker>,
    pub screenshot_writer: Arc<dyn ScreenshotWriter>,
    pub message_sink: Arc<dyn MessageSink>,
}

pub struct Worker {
    step_loader: StepLoader,
    orchestrator: ExecutionOrchestrator,
}

impl Worker {
    /// Index the project, load methods and build the hook registry.
    pub fn start(capabilities: Capabilities, settings: RunnerSettings) -> Result<Self> {
        let step_loader = StepLoader::new(StepRegistry::new(), Arc::clone(&capabilities.indexer));

        if let Some(root) = settings.project_root.as_deref() {
            step_loader
                .load_implementations(root)
                .with_context(|| format!("Failed to index step implementations under {}", root.display()))?;
        }

        let methods = capabilities
            .loader
            .load()
            .context("Failed to load step and hook methods")?;
        let hooks = step_loader.register_loaded_methods(&methods);

        info!(
            target: "worker",
            steps = step_loader.registry().len(),
            hooks = hooks.len(),
            "Worker started"
        );
        let orchestrator = ExecutionOrchestrator::new(hooks, &capabilities, settings);
        Ok(Self {
            step_loader,
            orchestrator,
        })
    }

    pub fn registry(&self) -> &StepRegistry {
        self.step_loader.registry()
    }

    pub fn orchestrator(&self) -> &ExecutionOrchestrator {
        &self.orchestrator
    }

    /// Serve one request.
    pub async fn handle(&mut self, request: Request) -> Result<Response, RequestError> {
        debug!(target: "worker", kind = request.kind(), "Handling request");

        let response = match request {
            Request::ExecuteStep(step) => {
                let result = processors::execute_step::process(
                    self.step_loader.registry(),
                    &mut self.orchestrator,
                    &step,
                )
                .await;
                Response::ExecutionStatus(result)
            }
            Request::ExecuteHooks(ExecuteHooksRequest {
                hook_type,
                tags,
                context,
            }) => {
                let strategy = HookStrategy::default_for(hook_type.level);
                let result = self
                    .orchestrator
                    .execute_hooks(hook_type, strategy, &tags, &context)
                    .await;
                Response::ExecutionStatus(result)
            }
            Request::CacheFile(cache) => processors::cache_file::process(&self.step_loader, &cache)?,
            Request::StepPositions(positions) => {
                processors::step_positions::process(self.step_loader.registry(), &positions)
            }
            Request::CloseExecutionScope => {
                self.orchestrator.close_execution_scope()?;
                Response::Ack
            }
            Request::ClearCache(level) => {
                self.orchestrator.clear_cache(level);
                Response::Ack
            }
            lifecycle => {
                let (processor, context) = PhaseProcessor::for_request(&lifecycle)
                    .ok_or(RequestError::Unsupported(lifecycle.kind()))?;
                let result = processor.process(&mut self.orchestrator, context).await;
                Response::ExecutionStatus(result)
            }
        };
        Ok(response)
    }

    /// Serve one request, turning a refused request into a failed result
    /// where the caller expects an execution status.
    pub async fn handle_or_report(&mut self, request: Request) -> Response {
        let kind = request.kind();
        match self.handle(request).await {
            Ok(response) => response,
            Err(e) => {
                error!(target: "worker", kind, error = %e, "Request failed");
                Response::ExecutionStatus(ExecutionResult::failed(e.to_string(), String::new()))
            }
        }
    }

    /// Serve requests in arrival order until every sender is dropped.
    pub async fn serve(mut self, mut requests: mpsc::Receiver<Envelope>) {
        while let Some((request, reply)) = requests.recv().await {
            let response = self.handle_or_report(request).await;
            if reply.send(response).is_err() {
                debug!(target: "worker", "Requester went away before the response was sent");
            }
        }
        info!(target: "worker", "Request channel closed, worker stopping");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{
        CacheFileRequest, ExecuteStepRequest, FileStatus, Parameter, StepPositionsRequest,
    };
    use crate::test_support::{Behavior, TestRig};
    use stepkit_common::ScopeError;
    use stepkit_sdk::{
        ExecutionContext, HookType, InvocationFailure, LifecycleLevel, LoadedHook, LoadedMethods,
        LoadedStep, MethodHandle, SpecInfo, TagAggregation,
    };

    fn rig() -> TestRig {
        TestRig {
            methods: LoadedMethods {
                steps: vec![LoadedStep {
                    texts: vec!["Add <a> and <b>".to_string()],
                    method_name: "Add".to_string(),
                    enclosing_type_name: "Calc".to_string(),
                    parameter_count: 2,
                    continue_on_failure: false,
                    handle: MethodHandle::new("Calc.Add"),
                }],
                hooks: vec![LoadedHook {
                    hook_type: HookType::BEFORE_SPEC,
                    method_name: "Connect".to_string(),
                    enclosing_type_name: "Hooks".to_string(),
                    tags: vec!["db".to_string()],
                    aggregation: TagAggregation::All,
                    takes_context: true,
                    handle: MethodHandle::new("Hooks.Connect"),
                }],
            },
            ..Default::default()
        }
    }

    fn spec_context(tags: &[&str]) -> ExecutionContext {
        ExecutionContext {
            current_spec: Some(SpecInfo {
                name: "Calculator".to_string(),
                tags: tags.iter().map(|t| t.to_string()).collect(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn test_start_indexes_project_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("calc.steps"), "Calc.Add(2): Add <a> and <b>").unwrap();
        let rig = rig();
        let settings = RunnerSettings {
            project_root: Some(dir.path().to_path_buf()),
            ..Default::default()
        };

        let worker = Worker::start(rig.capabilities(), settings).unwrap();
        let definition = worker.registry().method_for("Add {} and {}").unwrap();
        assert_eq!(definition.method, Some(MethodHandle::new("Calc.Add")));
        assert!(definition.source_file.is_some());
        assert!(!worker.registry().has_duplicates("Add {} and {}"));
    }

    #[tokio::test]
    async fn test_indexed_step_runs_with_loaded_type_name() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.steps"), "Steps.Hello(0): Say hello").unwrap();
        let rig = TestRig {
            methods: LoadedMethods {
                steps: vec![LoadedStep {
                    texts: vec!["Say hello".to_string()],
                    method_name: "Hello".to_string(),
                    enclosing_type_name: "Sample.Steps".to_string(),
                    parameter_count: 0,
                    continue_on_failure: false,
                    handle: MethodHandle::new("Sample.Steps.Hello"),
                }],
                hooks: vec![],
            },
            ..Default::default()
        };
        let settings = RunnerSettings {
            project_root: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let mut worker = Worker::start(rig.capabilities(), settings).unwrap();
        assert_eq!(worker.registry().len(), 1);
        assert!(!worker.registry().has_duplicates("Say hello"));

        let response = worker
            .handle(Request::ExecuteStep(ExecuteStepRequest {
                parsed_step_text: "Say hello".to_string(),
                actual_step_text: "Say hello".to_string(),
                parameters: vec![],
            }))
            .await
            .unwrap();
        assert!(response.execution_result().unwrap().success);
        assert_eq!(rig.invoker.calls(), vec!["Sample.Steps.Hello"]);
        assert_eq!(rig.factory.created("Sample.Steps"), 1);
    }

    #[test]
    fn test_start_fails_on_missing_root() {
        let rig = rig();
        let settings = RunnerSettings {
            project_root: Some("/definitely/not/here".into()),
            ..Default::default()
        };
        assert!(Worker::start(rig.capabilities(), settings).is_err());
    }

    #[tokio::test]
    async fn test_full_lifecycle() {
        let rig = rig();
        rig.invoker.script("Calc.Add", Behavior::Message("3".to_string()));
        let mut worker = Worker::start(rig.capabilities(), RunnerSettings::default()).unwrap();
        let ctx = spec_context(&["db"]);

        let started = worker.handle(Request::ExecutionStarting(ctx.clone())).await.unwrap();
        assert!(started.execution_result().unwrap().success);

        let spec = worker
            .handle(Request::SpecExecutionStarting(ctx.clone()))
            .await
            .unwrap();
        assert!(spec.execution_result().unwrap().success);

        let step = worker
            .handle(Request::ExecuteStep(ExecuteStepRequest {
                parsed_step_text: "Add {} and {}".to_string(),
                actual_step_text: "Add 1 and 2".to_string(),
                parameters: vec![Parameter::value("1"), Parameter::value("2")],
            }))
            .await
            .unwrap();
        let result = step.execution_result().unwrap();
        assert!(result.success);
        assert_eq!(result.messages, vec!["3"]);

        worker.handle(Request::SpecExecutionEnding(ctx.clone())).await.unwrap();
        worker.handle(Request::ExecutionEnding(ctx)).await.unwrap();

        assert_eq!(rig.invoker.calls(), vec!["Hooks.Connect", "Calc.Add"]);
        assert_eq!(worker.orchestrator().instances().depth(), 0);
    }

    #[tokio::test]
    async fn test_execute_hooks_request() {
        let rig = rig();
        rig.invoker.script(
            "Hooks.Connect",
            Behavior::Fail(InvocationFailure::raised("no database", "")),
        );
        let mut worker = Worker::start(rig.capabilities(), RunnerSettings::default()).unwrap();

        let response = worker
            .handle(Request::ExecuteHooks(ExecuteHooksRequest {
                hook_type: HookType::BEFORE_SPEC,
                tags: vec!["db".to_string()],
                context: spec_context(&["db"]),
            }))
            .await
            .unwrap();
        let result = response.execution_result().unwrap();
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("no database"));
    }

    #[tokio::test]
    async fn test_cache_file_and_positions() {
        let rig = rig();
        let mut worker = Worker::start(rig.capabilities(), RunnerSettings::default()).unwrap();
        let file = std::path::PathBuf::from("/virtual/extra.steps");

        let ack = worker
            .handle(Request::CacheFile(CacheFileRequest {
                content: "Extra.Wait(1): Wait <seconds> seconds".to_string(),
                file_path: file.clone(),
                status: FileStatus::Opened.as_i32(),
            }))
            .await
            .unwrap();
        assert_eq!(ack, Response::Ack);

        let Response::StepPositions(positions) = worker
            .handle(Request::StepPositions(StepPositionsRequest { file_path: file }))
            .await
            .unwrap()
        else {
            panic!("expected StepPositions");
        };
        assert_eq!(positions[0].step_value, "Wait {} seconds");
    }

    #[tokio::test]
    async fn test_serve_answers_in_order() {
        let rig = rig();
        let worker = Worker::start(rig.capabilities(), RunnerSettings::default()).unwrap();
        let (tx, rx) = mpsc::channel(4);

        let (first_tx, first_rx) = oneshot::channel();
        tx.send((Request::ExecutionStarting(ExecutionContext::default()), first_tx))
            .await
            .unwrap();
        let (second_tx, second_rx) = oneshot::channel();
        tx.send((Request::CloseExecutionScope, second_tx)).await.unwrap();
        drop(tx);

        worker.serve(rx).await;

        assert!(first_rx.await.unwrap().execution_result().unwrap().success);
        assert_eq!(second_rx.await.unwrap(), Response::Ack);
    }

    #[tokio::test]
    async fn test_request_errors_do_not_stop_worker() {
        let rig = rig();
        let mut worker = Worker::start(rig.capabilities(), RunnerSettings::default()).unwrap();

        let err = worker.handle(Request::CloseExecutionScope).await.unwrap_err();
        assert!(matches!(err, RequestError::Scope(ScopeError::NoOpenScope)));

        let response = worker
            .handle_or_report(Request::CacheFile(CacheFileRequest {
                content: String::new(),
                file_path: "x.steps".into(),
                status: 99,
            }))
            .await;
        let result = response.execution_result().unwrap();
        assert!(!result.success);
        assert_eq!(result.error_message.as_deref(), Some("invalid file status: 99"));

        let ack = worker
            .handle(Request::ClearCache(LifecycleLevel::Scenario))
            .await
            .unwrap();
        assert_eq!(ack, Response::Ack);
    }
}
