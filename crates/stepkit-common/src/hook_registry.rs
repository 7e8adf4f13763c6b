// HookRegistry: hook definitions grouped by hook type.
// Built once from the dynamic loader's output; never reloaded.

use std::collections::{BTreeSet, HashMap};
use stepkit_sdk::{HookType, LoadedHook, MethodHandle, StringUtil, TagAggregation};
use tracing::{debug, warn};

/// A hook's tag filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagExpression {
    pub tags: BTreeSet<String>,
    pub aggregation: TagAggregation,
}

impl TagExpression {
    pub fn new<I, S>(tags: I, aggregation: TagAggregation) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: tags.into_iter().map(Into::into).collect(),
            aggregation,
        }
    }

    /// A hook with no tags applies everywhere.
    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }

    /// Whether this filter admits a context carrying `context_tags`.
    pub fn matches(&self, context_tags: &[String]) -> bool {
        if self.tags.is_empty() {
            return true;
        }
        let present = |tag: &String| context_tags.iter().any(|t| t == tag);
        match self.aggregation {
            TagAggregation::All => self.tags.iter().all(present),
            TagAggregation::Any => self.tags.iter().any(present),
        }
    }
}

/// A lifecycle hook method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookDefinition {
    /// `Type.Method`; the ordering key within a selection group.
    pub qualified_name: String,
    pub enclosing_type_name: String,
    pub hook_type: HookType,
    pub tag_expression: TagExpression,
    pub takes_context: bool,
    pub method: MethodHandle,
}

impl HookDefinition {
    pub fn from_loaded(hook: &LoadedHook) -> Self {
        Self {
            qualified_name: StringUtil::qualified_name(&hook.enclosing_type_name, &hook.method_name),
            enclosing_type_name: hook.enclosing_type_name.clone(),
            hook_type: hook.hook_type,
            tag_expression: TagExpression::new(hook.tags.iter().cloned(), hook.aggregation),
            takes_context: hook.takes_context,
            method: hook.handle.clone(),
        }
    }
}

/// All known hooks, keyed by hook type.
#[derive(Debug, Clone, Default)]
pub struct HookRegistry {
    hooks: HashMap<HookType, Vec<HookDefinition>>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_loaded<'a>(hooks: impl IntoIterator<Item = &'a LoadedHook>) -> Self {
        let mut registry = Self::new();
        for hook in hooks {
            registry.add(HookDefinition::from_loaded(hook));
        }
        registry
    }

    /// Add a hook. A second hook with the same qualified name and type is ignored.
    pub fn add(&mut self, hook: HookDefinition) {
        let entries = self.hooks.entry(hook.hook_type).or_default();
        if entries.iter().any(|h| h.qualified_name == hook.qualified_name) {
            warn!(
                target: "hooks",
                hook = %hook.qualified_name,
                hook_type = %hook.hook_type,
                "Ignoring duplicate hook registration"
            );
            return;
        }
        debug!(target: "hooks", hook = %hook.qualified_name, hook_type = %hook.hook_type, "Registered hook");
        entries.push(hook);
    }

    /// Hooks of `hook_type`, in registration order.
    pub fn hooks(&self, hook_type: HookType) -> &[HookDefinition] {
        self.hooks.get(&hook_type).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.hooks.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
