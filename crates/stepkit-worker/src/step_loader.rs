// StepLoader: keeps the step registry in line with source files.
// Every (re)index of a file replaces that file's entries in one swap.

use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use stepkit_common::{HookRegistry, RequestError, StepDefinition, StepRegistry};
use stepkit_sdk::{LoadedMethods, SourceIndexer};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

pub struct StepLoader {
    registry: StepRegistry,
    indexer: Arc<dyn SourceIndexer>,
}

impl StepLoader {
    pub fn new(registry: StepRegistry, indexer: Arc<dyn SourceIndexer>) -> Self {
        Self { registry, indexer }
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    /// Index `content` as the current text of `file`.
    pub fn load_steps_from_text(&self, content: &str, file: &Path) -> Result<usize, RequestError> {
        let definitions: Vec<StepDefinition> = self
            .indexer
            .index_source(content, file)?
            .iter()
            .flat_map(|declaration| StepDefinition::from_declaration(declaration, file))
            .collect();
        let count = definitions.len();
        self.registry.replace_file_steps(file, definitions);
        debug!(target: "loader", file = %file.display(), count, "Indexed steps");
        Ok(count)
    }

    /// Index `file` from disk. A file that no longer exists is left alone.
    pub fn load_from_disk(&self, file: &Path) -> Result<usize, RequestError> {
        if !file.is_file() {
            debug!(target: "loader", file = %file.display(), "Skipping missing file");
            return Ok(0);
        }
        let content = std::fs::read_to_string(file).map_err(|source| RequestError::Io {
            path: file.display().to_string(),
            source,
        })?;
        self.load_steps_from_text(&content, file)
    }

    pub fn remove_steps(&self, file: &Path) {
        self.registry.remove_steps(file);
    }

    /// Index every file under `root` the indexer accepts. Files that fail to
    /// index are skipped with a warning.
    pub fn load_implementations(&self, root: &Path) -> anyhow::Result<usize> {
        let mut files = 0;
        for entry in WalkDir::new(root).follow_links(true) {
            let entry = entry.with_context(|| format!("Failed to walk {}", root.display()))?;
            if !entry.file_type().is_file() || !self.indexer.accepts(entry.path()) {
                continue;
            }
            match self.load_from_disk(entry.path()) {
                Ok(_) => files += 1,
                Err(e) => {
                    warn!(target: "loader", file = %entry.path().display(), error = %e, "Failed to index file")
                }
            }
        }
        info!(target: "loader", root = %root.display(), files, steps = self.registry.len(), "Loaded step implementations");
        Ok(files)
    }

    /// Merge dynamically loaded steps into the registry and build the hook registry.
    pub fn register_loaded_methods(&self, methods: &LoadedMethods) -> HookRegistry {
        for step in &methods.steps {
            self.registry.register_loaded(step);
        }
        let hooks = HookRegistry::from_loaded(&methods.hooks);
        info!(
            target: "loader",
            steps = methods.steps.len(),
            hooks = hooks.len(),
            "Registered loaded methods"
        );
        hooks
    }
}
