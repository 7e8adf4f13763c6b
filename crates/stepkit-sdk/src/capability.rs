// Capabilities a language loader plugs into the engine.
// Each trait is one seam: the engine owns ordering, scoping and result
// composition, the loader owns everything that touches user code.

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::failure::InvocationFailure;
use crate::method::{Instance, InvocationArgs, LoadedMethods, MethodHandle, Screenshot, StepDeclaration};

/// Error raised by a [`SourceIndexer`] for text it cannot index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to index {file}: {reason}")]
pub struct IndexError {
    pub file: String,
    pub reason: String,
}

impl IndexError {
    pub fn new(file: &Path, reason: impl Into<String>) -> Self {
        Self {
            file: file.display().to_string(),
            reason: reason.into(),
        }
    }
}

/// Error raised by a [`ScreenshotWriter`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("screenshot capture failed: {0}")]
pub struct ScreenshotError(pub String);

/// Extracts step declarations from source text without loading it.
pub trait SourceIndexer: Send + Sync {
    /// Whether files at `path` contain step implementations this indexer understands.
    fn accepts(&self, path: &Path) -> bool;

    /// Index `content`, which is the current text of `path`.
    fn index_source(&self, content: &str, path: &Path) -> Result<Vec<StepDeclaration>, IndexError>;
}

/// Discovers invocable step and hook methods in compiled user code.
pub trait MethodLoader: Send + Sync {
    fn load(&self) -> anyhow::Result<LoadedMethods>;
}

/// Creates the object a method of `type_name` is invoked against.
pub trait InstanceFactory: Send + Sync {
    fn create(&self, type_name: &str) -> Result<Instance, InvocationFailure>;
}

/// Calls a user method.
///
/// The returned future completes only once every piece of work the method
/// started has finished or faulted.
#[async_trait]
pub trait MethodInvoker: Send + Sync {
    async fn invoke(
        &self,
        method: &MethodHandle,
        target: Instance,
        args: InvocationArgs,
    ) -> Result<(), InvocationFailure>;
}

/// Captures a screenshot after a failure.
pub trait ScreenshotWriter: Send + Sync {
    fn capture(&self) -> Result<Screenshot, ScreenshotError>;
}

/// Output user code emitted out-of-band while it ran.
///
/// Both drains return pending items in emission order and clear them.
pub trait MessageSink: Send + Sync {
    fn drain_pending_messages(&self) -> Vec<String>;

    fn drain_pending_screenshots(&self) -> Vec<Vec<u8>> {
        Vec::new()
    }
}
