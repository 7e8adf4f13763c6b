// MessageCollector: pending diagnostics and screenshots emitted by user code.

use parking_lot::Mutex;
use std::sync::Arc;

use crate::capability::MessageSink;

/// In-memory [`MessageSink`] that user-facing helpers write into.
///
/// Loaders that run user code in-process can hand a clone of this collector
/// to the code under test; the engine drains it after each execution.
#[derive(Debug, Clone, Default)]
pub struct MessageCollector {
    inner: Arc<Mutex<Pending>>,
}

#[derive(Debug, Default)]
struct Pending {
    messages: Vec<String>,
    screenshots: Vec<Vec<u8>>,
}

impl MessageCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic message.
    pub fn write_message(&self, message: impl Into<String>) {
        self.inner.lock().messages.push(message.into());
    }

    /// Record a screenshot taken by user code.
    pub fn capture_screenshot(&self, bytes: Vec<u8>) {
        self.inner.lock().screenshots.push(bytes);
    }

    /// Number of messages not yet drained.
    pub fn pending_count(&self) -> usize {
        self.inner.lock().messages.len()
    }
}

impl MessageSink for MessageCollector {
    fn drain_pending_messages(&self) -> Vec<String> {
        std::mem::take(&mut self.inner.lock().messages)
    }

    fn drain_pending_screenshots(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.inner.lock().screenshots)
    }
}
