// Hook selection: which hooks run for a context, and in what order.

use stepkit_sdk::LifecycleLevel;

use crate::hook_registry::HookDefinition;

/// Ordering policy between tagged and untagged hooks.
///
/// Within each group hooks are ordered by qualified name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookStrategy {
    /// Matching tagged hooks, then untagged hooks.
    TaggedFirst,
    /// Untagged hooks, then matching tagged hooks.
    UntaggedFirst,
}

impl HookStrategy {
    /// The strategy used for `level` when the caller has no preference.
    pub fn default_for(level: LifecycleLevel) -> Self {
        match level {
            LifecycleLevel::Suite | LifecycleLevel::Step => HookStrategy::UntaggedFirst,
            LifecycleLevel::Spec | LifecycleLevel::Scenario => HookStrategy::TaggedFirst,
        }
    }

    /// Select the hooks applicable to `context_tags` from `hooks`, ordered.
    pub fn select<'a>(
        &self,
        context_tags: &[String],
        hooks: &'a [HookDefinition],
    ) -> Vec<&'a HookDefinition> {
        let mut tagged: Vec<&HookDefinition> = hooks
            .iter()
            .filter(|h| !h.tag_expression.is_untagged() && h.tag_expression.matches(context_tags))
            .collect();
        let mut untagged: Vec<&HookDefinition> = hooks
            .iter()
            .filter(|h| h.tag_expression.is_untagged())
            .collect();
        tagged.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));
        untagged.sort_by(|a, b| a.qualified_name.cmp(&b.qualified_name));

        match self {
            HookStrategy::TaggedFirst => tagged.into_iter().chain(untagged).collect(),
            HookStrategy::UntaggedFirst => untagged.into_iter().chain(tagged).collect(),
        }
    }
}
