//! Process identity and the memoising process registry
//!
//! A process is a zero-argument activation: a closure that receives the
//! simulation context and runs to completion. Its identity is a
//! `ProcessKey` derived from the owning cell's address plus a method tag
//! unique within that object; equality and hashing use the key alone.
//! Registered closures capture a strong `Rc` of their owner, so the
//! registry keeps process owners alive and key addresses stable.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::{SimError, SimResult};
use crate::module::ModuleId;
use crate::sim::Simulation;

/// The callable body of a process.
pub type ProcessFn = Rc<dyn Fn(&mut Simulation) -> SimResult<()>>;

/// Stable identity of a method-on-object activation.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ProcessKey {
    owner: usize,
    method: &'static str,
}

impl ProcessKey {
    pub fn new(owner: usize, method: &'static str) -> Self {
        Self { owner, method }
    }

    /// A key is valid when it names both an owner and a method.
    pub fn is_valid(&self) -> bool {
        self.owner != 0 && !self.method.is_empty()
    }
}

/// Diagnostic reference to the named object hosting a process.
#[derive(Clone, Debug)]
pub struct OwnerRef {
    pub(crate) module: Option<ModuleId>,
    pub(crate) path: Rc<str>,
}

impl OwnerRef {
    pub(crate) fn for_module(id: ModuleId, path: Rc<str>) -> Self {
        Self {
            module: Some(id),
            path,
        }
    }

    pub(crate) fn anonymous(path: Rc<str>) -> Self {
        Self { module: None, path }
    }

    /// Hierarchical name of the owning object.
    pub fn name(&self) -> &str {
        &self.path
    }
}

/// Information about a scheduled process: identity, diagnostics, body.
#[derive(Clone)]
pub struct ProcessInfo {
    key: ProcessKey,
    name: &'static str,
    owner: OwnerRef,
    callable: ProcessFn,
}

impl ProcessInfo {
    /// Assemble a process from raw parts. Prefer `Simulation::process`,
    /// which derives the key and memoises the result; this constructor
    /// exists for hand-rolled processes and does not validate the key.
    pub fn new(key: ProcessKey, owner_path: &str, name: &'static str, callable: ProcessFn) -> Self {
        Self {
            key,
            name,
            owner: OwnerRef::anonymous(Rc::from(owner_path)),
            callable,
        }
    }

    pub fn key(&self) -> ProcessKey {
        self.key
    }

    /// Short method label.
    pub fn name(&self) -> &str {
        self.name
    }

    pub fn owner(&self) -> &OwnerRef {
        &self.owner
    }

    pub(crate) fn owner_module(&self) -> Option<ModuleId> {
        self.owner.module
    }

    /// `owner.method` label used in logs and reports.
    pub fn label(&self) -> String {
        format!("{}.{}", self.owner.name(), self.name)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.key.is_valid() {
            Ok(())
        } else {
            Err(SimError::InvalidProcess(self.label()))
        }
    }

    pub(crate) fn call(&self, sim: &mut Simulation) -> SimResult<()> {
        (self.callable)(sim)
    }

    #[cfg(test)]
    pub(crate) fn callable_ptr(&self) -> *const () {
        Rc::as_ptr(&self.callable) as *const ()
    }
}

impl PartialEq for ProcessInfo {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ProcessInfo {}

impl Hash for ProcessInfo {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl fmt::Debug for ProcessInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProcessInfo({}, {:?})", self.label(), self.key)
    }
}

/// Memoising registry: repeated lookups for the same (owner, method)
/// return the same `ProcessInfo` instance.
#[derive(Default)]
pub struct ProcessRegistry {
    table: IndexMap<ProcessKey, ProcessInfo>,
}

impl ProcessRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn intern(
        &mut self,
        key: ProcessKey,
        owner: OwnerRef,
        name: &'static str,
        make: impl FnOnce() -> ProcessFn,
    ) -> ProcessInfo {
        if let Some(info) = self.table.get(&key) {
            return info.clone();
        }
        let info = ProcessInfo {
            key,
            name,
            owner,
            callable: make(),
        };
        self.table.insert(key, info.clone());
        info
    }

    pub fn get(&self, key: &ProcessKey) -> Option<&ProcessInfo> {
        self.table.get(key)
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
