// In-memory capabilities for unit tests.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use stepkit_sdk::{
    IndexError, Instance, InstanceFactory, InvocationArgs, InvocationFailure, LoadedMethods,
    MessageCollector, MethodHandle, MethodInvoker, MethodLoader, Screenshot, ScreenshotError,
    ScreenshotWriter, SourceIndexer, SourceSpan, StepDeclaration,
};

use crate::worker::Capabilities;

/// Creates a fresh unit instance per call and counts creations per type.
#[derive(Debug, Default)]
pub struct CountingFactory {
    created: Mutex<HashMap<String, usize>>,
}

impl CountingFactory {
    pub const FAILING_TYPE: &'static str = "Broken";

    pub fn created(&self, type_name: &str) -> usize {
        self.created.lock().get(type_name).copied().unwrap_or(0)
    }
}

impl InstanceFactory for CountingFactory {
    fn create(&self, type_name: &str) -> Result<Instance, InvocationFailure> {
        if type_name == Self::FAILING_TYPE {
            return Err(InvocationFailure::raised(
                format!("cannot construct {type_name}"),
                "",
            ));
        }
        *self.created.lock().entry(type_name.to_string()).or_default() += 1;
        Ok(Arc::new(type_name.to_string()))
    }
}

/// What a scripted method does when invoked.
#[derive(Debug, Clone)]
pub enum Behavior {
    Fail(InvocationFailure),
    Panic(String),
    /// Write a message to the shared collector, then succeed.
    Message(String),
}

/// Records every invocation; methods succeed unless scripted otherwise.
#[derive(Debug, Default)]
pub struct RecordingInvoker {
    calls: Mutex<Vec<(String, InvocationArgs)>>,
    behaviors: Mutex<HashMap<String, Vec<Behavior>>>,
    collector: MessageCollector,
}

impl RecordingInvoker {
    pub fn new(collector: MessageCollector) -> Self {
        Self {
            collector,
            ..Default::default()
        }
    }

    pub fn script(&self, method: &str, behavior: Behavior) {
        self.behaviors
            .lock()
            .entry(method.to_string())
            .or_default()
            .push(behavior);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(m, _)| m.clone()).collect()
    }

    pub fn args(&self) -> Vec<InvocationArgs> {
        self.calls.lock().iter().map(|(_, a)| a.clone()).collect()
    }
}

#[async_trait]
impl MethodInvoker for RecordingInvoker {
    async fn invoke(
        &self,
        method: &MethodHandle,
        _target: Instance,
        args: InvocationArgs,
    ) -> Result<(), InvocationFailure> {
        self.calls.lock().push((method.to_string(), args));
        let behaviors = self
            .behaviors
            .lock()
            .get(method.as_str())
            .cloned()
            .unwrap_or_default();
        for behavior in behaviors {
            match behavior {
                Behavior::Fail(failure) => return Err(failure),
                Behavior::Panic(message) => panic!("{message}"),
                Behavior::Message(message) => self.collector.write_message(message),
            }
        }
        Ok(())
    }
}

/// Screenshot writer that counts captures and can be made to fail.
#[derive(Debug, Default)]
pub struct CountingScreenshotWriter {
    captures: Mutex<usize>,
    fail: bool,
}

impl CountingScreenshotWriter {
    pub fn failing() -> Self {
        Self {
            captures: Mutex::new(0),
            fail: true,
        }
    }

    pub fn captures(&self) -> usize {
        *self.captures.lock()
    }
}

impl ScreenshotWriter for CountingScreenshotWriter {
    fn capture(&self) -> Result<Screenshot, ScreenshotError> {
        *self.captures.lock() += 1;
        if self.fail {
            return Err(ScreenshotError("display unavailable".to_string()));
        }
        Ok(Screenshot::Bytes(b"PNG".to_vec()))
    }
}

/// Indexes `.steps` files made of lines like
/// `Type.Method(2): Say <what> to <who> | Tell <what> to <who>`.
#[derive(Debug, Default)]
pub struct LineIndexer;

impl SourceIndexer for LineIndexer {
    fn accepts(&self, path: &Path) -> bool {
        path.extension().is_some_and(|ext| ext == "steps")
    }

    fn index_source(&self, content: &str, path: &Path) -> Result<Vec<StepDeclaration>, IndexError> {
        let mut declarations = Vec::new();
        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (signature, texts) = line
                .split_once(':')
                .ok_or_else(|| IndexError::new(path, format!("line {}: missing ':'", index + 1)))?;
            let (qualified, count) = signature
                .trim()
                .trim_end_matches(')')
                .split_once('(')
                .ok_or_else(|| IndexError::new(path, format!("line {}: missing '('", index + 1)))?;
            let parameter_count = count
                .parse()
                .map_err(|_| IndexError::new(path, format!("line {}: bad count", index + 1)))?;
            let (type_name, method_name) = qualified.rsplit_once('.').unwrap_or(("", qualified));
            let line_number = index as u32 + 1;
            declarations.push(StepDeclaration {
                texts: texts.split('|').map(|t| t.trim().to_string()).collect(),
                method_name: method_name.to_string(),
                enclosing_type_name: type_name.to_string(),
                parameter_count,
                span: SourceSpan::lines(line_number, line_number),
            });
        }
        Ok(declarations)
    }
}

/// Loader returning a fixed set of methods.
#[derive(Debug, Default)]
pub struct FixedLoader {
    pub methods: LoadedMethods,
}

impl MethodLoader for FixedLoader {
    fn load(&self) -> anyhow::Result<LoadedMethods> {
        Ok(self.methods.clone())
    }
}

/// A full set of fakes sharing one message collector.
pub struct TestRig {
    pub collector: MessageCollector,
    pub invoker: Arc<RecordingInvoker>,
    pub factory: Arc<CountingFactory>,
    pub screenshots: Arc<CountingScreenshotWriter>,
    pub methods: LoadedMethods,
}

impl Default for TestRig {
    fn default() -> Self {
        let collector = MessageCollector::new();
        Self {
            invoker: Arc::new(RecordingInvoker::new(collector.clone())),
            collector,
            factory: Arc::new(CountingFactory::default()),
            screenshots: Arc::new(CountingScreenshotWriter::default()),
            methods: LoadedMethods::default(),
        }
    }
}

impl TestRig {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            indexer: Arc::new(LineIndexer),
            loader: Arc::new(FixedLoader {
                methods: self.methods.clone(),
            }),
            instance_factory: self.factory.clone(),
            invoker: self.invoker.clone(),
            screenshot_writer: self.screenshots.clone(),
            message_sink: Arc::new(self.collector.clone()),
        }
    }
}
