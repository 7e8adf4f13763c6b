// InstanceManager: the objects step and hook methods run against, cached per
// execution scope. Scopes nest suite > spec > scenario and form a stack;
// closing a scope releases every instance created inside it.

use std::collections::HashMap;
use std::sync::Arc;
use stepkit_common::ScopeError;
use stepkit_sdk::{Instance, InstanceFactory, InvocationFailure, LifecycleLevel};
use tracing::{debug, warn};

/// Identifier of one execution scope. Never reused.
pub type ScopeId = u64;

/// Lifecycle of an execution scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScopeState {
    /// Opened, nothing has run in it yet.
    Open,
    /// At least one instance has been handed out.
    Running,
    /// Releasing its instances.
    Closing,
    Closed,
}

#[derive(Debug)]
struct Scope {
    id: ScopeId,
    level: LifecycleLevel,
    state: ScopeState,
    instances: HashMap<String, Instance>,
}

/// Owns every scoped instance. Mutated only by the execution orchestrator.
pub struct InstanceManager {
    factory: Arc<dyn InstanceFactory>,
    scopes: Vec<Scope>,
    closed: HashMap<ScopeId, LifecycleLevel>,
    next_id: ScopeId,
}

impl InstanceManager {
    pub fn new(factory: Arc<dyn InstanceFactory>) -> Self {
        Self {
            factory,
            scopes: Vec::new(),
            closed: HashMap::new(),
            next_id: 1,
        }
    }

    /// Open a scope nested in the current one.
    pub fn open_scope(&mut self, level: LifecycleLevel) -> ScopeId {
        let id = self.next_id;
        self.next_id += 1;
        self.scopes.push(Scope {
            id,
            level,
            state: ScopeState::Open,
            instances: HashMap::new(),
        });
        debug!(target: "worker", scope = id, %level, "Opened execution scope");
        id
    }

    /// The innermost open scope.
    pub fn current_scope(&self) -> Option<(ScopeId, LifecycleLevel)> {
        self.scopes.last().map(|s| (s.id, s.level))
    }

    pub fn scope_state(&self, id: ScopeId) -> Option<ScopeState> {
        if self.closed.contains_key(&id) {
            return Some(ScopeState::Closed);
        }
        self.scopes.iter().find(|s| s.id == id).map(|s| s.state)
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// The instance of `type_name` for the current scope.
    ///
    /// An instance cached by an enclosing scope is shared; otherwise one is
    /// created and cached in the innermost scope. With no scope open, the
    /// instance is created for this call only and never cached.
    pub fn get(&mut self, type_name: &str) -> Result<Instance, InvocationFailure> {
        if self.scopes.is_empty() {
            debug!(target: "worker", type_name, "No open scope; creating an uncached instance");
            return self.factory.create(type_name);
        }

        if let Some(instance) = self
            .scopes
            .iter()
            .rev()
            .find_map(|s| s.instances.get(type_name))
        {
            let instance = Arc::clone(instance);
            self.mark_running();
            return Ok(instance);
        }

        let instance = self.factory.create(type_name)?;
        if let Some(scope) = self.scopes.last_mut() {
            scope.instances.insert(type_name.to_string(), Arc::clone(&instance));
            scope.state = ScopeState::Running;
            debug!(target: "worker", scope = scope.id, type_name, "Created instance");
        }
        Ok(instance)
    }

    fn mark_running(&mut self) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.state = ScopeState::Running;
        }
    }

    /// Close the innermost scope and release its instances.
    pub fn close_current(&mut self) -> Result<ScopeId, ScopeError> {
        let id = self
            .scopes
            .last()
            .map(|s| s.id)
            .ok_or(ScopeError::NoOpenScope)?;
        self.close(id)
    }

    /// Close scope `id` along with any scope still open inside it.
    pub fn close(&mut self, id: ScopeId) -> Result<ScopeId, ScopeError> {
        if let Some(level) = self.closed.get(&id) {
            return Err(ScopeError::AlreadyClosed { id, level: *level });
        }
        let position = self
            .scopes
            .iter()
            .position(|s| s.id == id)
            .ok_or(ScopeError::NoOpenScope)?;

        for mut scope in self.scopes.drain(position..).rev() {
            if scope.id != id {
                warn!(target: "worker", scope = scope.id, level = %scope.level, "Closing nested scope left open");
            }
            scope.state = ScopeState::Closing;
            let released = scope.instances.len();
            scope.instances.clear();
            scope.state = ScopeState::Closed;
            self.closed.insert(scope.id, scope.level);
            debug!(target: "worker", scope = scope.id, level = %scope.level, released, "Closed execution scope");
        }
        Ok(id)
    }

    /// Drop every cached instance in every open scope, the suite included,
    /// so whatever runs next starts from fresh objects. Open scopes stay open.
    pub fn clear_cache(&mut self) -> usize {
        let mut cleared = 0;
        for scope in self.scopes.iter_mut() {
            cleared += scope.instances.len();
            scope.instances.clear();
        }
        cleared
    }

    /// Number of cached instances across all open scopes.
    pub fn cached_count(&self) -> usize {
        self.scopes.iter().map(|s| s.instances.len()).sum()
    }
}
