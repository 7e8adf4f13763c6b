// StepRegistry: step value -> step implementation(s).
// Entries come from two sources that converge on one definition per step value:
// the source indexer (file, span, aliases) and the dynamic loader (handle,
// continue-on-failure). A file's entries are always swapped under one write lock.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stepkit_sdk::{LoadedStep, MethodHandle, SourceSpan, StepDeclaration, StringUtil};
use tracing::debug;

use crate::errors::RegistryError;
use crate::step_value::to_step_value;

/// One step implementation bound to one step value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepDefinition {
    /// Raw text with placeholders, e.g. `Say <what> to <who>`.
    pub step_text: String,
    /// Normalized text, e.g. `Say {} to {}`.
    pub step_value: String,
    /// Every raw text the method declares; more than one means aliases.
    pub aliases: BTreeSet<String>,
    pub method_name: String,
    pub enclosing_type_name: String,
    pub parameter_count: usize,
    pub source_file: Option<PathBuf>,
    pub span: Option<SourceSpan>,
    pub continue_on_failure: bool,
    /// Set once the dynamic loader has found the method.
    pub method: Option<MethodHandle>,
}

impl StepDefinition {
    /// Definitions for an indexed declaration, one per distinct step value.
    pub fn from_declaration(declaration: &StepDeclaration, file: &Path) -> Vec<StepDefinition> {
        Self::expand(&declaration.texts, |text, aliases| StepDefinition {
            step_text: text.to_string(),
            step_value: to_step_value(text),
            aliases,
            method_name: declaration.method_name.clone(),
            enclosing_type_name: declaration.enclosing_type_name.clone(),
            parameter_count: declaration.parameter_count,
            source_file: Some(file.to_path_buf()),
            span: Some(declaration.span),
            continue_on_failure: false,
            method: None,
        })
    }

    /// Definitions for a dynamically loaded step, one per distinct step value.
    pub fn from_loaded(step: &LoadedStep) -> Vec<StepDefinition> {
        Self::expand(&step.texts, |text, aliases| StepDefinition {
            step_text: text.to_string(),
            step_value: to_step_value(text),
            aliases,
            method_name: step.method_name.clone(),
            enclosing_type_name: step.enclosing_type_name.clone(),
            parameter_count: step.parameter_count,
            source_file: None,
            span: None,
            continue_on_failure: step.continue_on_failure,
            method: Some(step.handle.clone()),
        })
    }

    fn expand(
        texts: &[String],
        build: impl Fn(&str, BTreeSet<String>) -> StepDefinition,
    ) -> Vec<StepDefinition> {
        let aliases: BTreeSet<String> = texts.iter().cloned().collect();
        let mut seen = BTreeSet::new();
        texts
            .iter()
            .filter(|text| seen.insert(to_step_value(text)))
            .map(|text| build(text, aliases.clone()))
            .collect()
    }

    /// `Type.Method`, as named by whichever source declared it.
    pub fn qualified_name(&self) -> String {
        StringUtil::qualified_name(&self.enclosing_type_name, &self.method_name)
    }

    pub fn has_alias(&self) -> bool {
        self.aliases.len() > 1
    }

    /// Take the runtime binding of a loaded definition. The loader's type
    /// name wins since instances are created from it.
    fn bind(&mut self, loaded: &StepDefinition) {
        self.method = loaded.method.clone();
        self.continue_on_failure = loaded.continue_on_failure;
        self.enclosing_type_name = loaded.enclosing_type_name.clone();
        self.method_name = loaded.method_name.clone();
    }
}

/// A step's location, as reported for a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepPosition {
    pub step_value: String,
    pub span: SourceSpan,
}

/// Thread-safe step registry. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    inner: Arc<RwLock<StepRegistryInner>>,
}

#[derive(Debug, Default)]
struct StepRegistryInner {
    /// First entry is the implementation lookups resolve to; others are duplicates.
    steps: HashMap<String, Vec<StepDefinition>>,
    /// Step value -> the loaded definition bound to it.
    loaded: HashMap<String, StepDefinition>,
}

impl StepRegistryInner {
    fn add(&mut self, mut definition: StepDefinition) {
        if definition.method.is_some() {
            self.loaded
                .insert(definition.step_value.clone(), definition.clone());
        } else if let Some(loaded) = self.loaded.get(&definition.step_value) {
            definition.bind(loaded);
        }

        let entries = self.steps.entry(definition.step_value.clone()).or_default();
        if definition.source_file.is_none() {
            // Loaded methods update the resolved entry in place.
            match entries.first_mut() {
                Some(first) => {
                    first.bind(&definition);
                    first.aliases.extend(definition.aliases);
                }
                None => entries.push(definition),
            }
            return;
        }

        match entries.iter_mut().find(|e| e.source_file.is_none()) {
            Some(unindexed) => {
                unindexed.step_text = definition.step_text;
                unindexed.parameter_count = definition.parameter_count;
                unindexed.source_file = definition.source_file;
                unindexed.span = definition.span;
                unindexed.aliases.extend(definition.aliases);
            }
            None => entries.push(definition),
        }
    }

    fn remove_file(&mut self, file: &Path) {
        self.steps.retain(|_, entries| {
            entries.retain(|e| e.source_file.as_deref() != Some(file));
            !entries.is_empty()
        });
    }
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition. A loaded definition updates the handle of the
    /// entry already stored under its step value.
    pub fn add_step(&self, definition: StepDefinition) {
        self.inner.write().add(definition);
    }

    /// Record a dynamically loaded step method and merge its definitions.
    pub fn register_loaded(&self, step: &LoadedStep) {
        let mut inner = self.inner.write();
        for definition in StepDefinition::from_loaded(step) {
            inner.add(definition);
        }
    }

    pub fn contains_step(&self, step_value: &str) -> bool {
        self.inner.read().steps.contains_key(step_value)
    }

    /// The implementation `step_value` resolves to.
    pub fn method_for(&self, step_value: &str) -> Result<StepDefinition, RegistryError> {
        self.inner
            .read()
            .steps
            .get(step_value)
            .and_then(|entries| entries.first().cloned())
            .ok_or_else(|| RegistryError::NotFound {
                step_value: step_value.to_string(),
            })
    }

    /// Whether more than one indexed declaration implements `step_value`.
    pub fn has_duplicates(&self, step_value: &str) -> bool {
        self.inner
            .read()
            .steps
            .get(step_value)
            .is_some_and(|entries| entries.len() > 1)
    }

    /// Drop every definition attributed to `file`.
    pub fn remove_steps(&self, file: &Path) {
        self.inner.write().remove_file(file);
        debug!(target: "registry", file = %file.display(), "Removed steps");
    }

    /// Replace the definitions attributed to `file` with `definitions`.
    ///
    /// Readers see either the old set or the new one, never neither.
    pub fn replace_file_steps(&self, file: &Path, definitions: Vec<StepDefinition>) {
        let count = definitions.len();
        let mut inner = self.inner.write();
        inner.remove_file(file);
        for definition in definitions {
            inner.add(definition);
        }
        drop(inner);
        debug!(target: "registry", file = %file.display(), count, "Replaced steps");
    }

    pub fn is_file_cached(&self, file: &Path) -> bool {
        self.inner
            .read()
            .steps
            .values()
            .flatten()
            .any(|e| e.source_file.as_deref() == Some(file))
    }

    /// Step values and spans defined in `file`, in source order.
    pub fn step_positions(&self, file: &Path) -> Vec<StepPosition> {
        let inner = self.inner.read();
        let mut positions: Vec<StepPosition> = inner
            .steps
            .values()
            .flatten()
            .filter(|e| e.source_file.as_deref() == Some(file))
            .filter_map(|e| {
                e.span.map(|span| StepPosition {
                    step_value: e.step_value.clone(),
                    span,
                })
            })
            .collect();
        positions.sort_by(|a, b| a.span.cmp(&b.span).then_with(|| a.step_value.cmp(&b.step_value)));
        positions
    }

    /// All registered step values, sorted.
    pub fn step_values(&self) -> Vec<String> {
        let mut values: Vec<String> = self.inner.read().steps.keys().cloned().collect();
        values.sort();
        values
    }

    pub fn len(&self) -> usize {
        self.inner.read().steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
