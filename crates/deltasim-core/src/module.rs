//! Module handles
//!
//! A module is a named container of ports. The tree formed by parent
//! links exists for naming and diagnostics only; modules own no signals.
//! Handles are created through `Simulation::module`/`submodule` so every
//! instance gets a unique id registered with the dependency graph.

use std::rc::Rc;

/// Unique identifier of a module instance.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ModuleId(pub(crate) u64);

/// Cheaply-cloneable handle naming a module instance.
#[derive(Clone, Debug)]
pub struct Module {
    id: ModuleId,
    name: Rc<str>,
    path: Rc<str>,
    parent: Option<ModuleId>,
}

impl Module {
    pub(crate) fn root(id: ModuleId, name: &str) -> Self {
        Self {
            id,
            name: Rc::from(name),
            path: Rc::from(name),
            parent: None,
        }
    }

    pub(crate) fn child(id: ModuleId, name: &str, parent: &Module) -> Self {
        Self {
            id,
            name: Rc::from(name),
            path: Rc::from(format!("{}.{}", parent.path, name).as_str()),
            parent: Some(parent.id),
        }
    }

    pub fn id(&self) -> ModuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dot-separated path from the root module.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub(crate) fn path_rc(&self) -> Rc<str> {
        Rc::clone(&self.path)
    }

    pub fn parent(&self) -> Option<ModuleId> {
        self.parent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hierarchical_path() {
        let top = Module::root(ModuleId(0), "top");
        let cpu = Module::child(ModuleId(1), "cpu", &top);
        let alu = Module::child(ModuleId(2), "alu", &cpu);

        assert_eq!(top.path(), "top");
        assert_eq!(cpu.path(), "top.cpu");
        assert_eq!(alu.path(), "top.cpu.alu");
        assert_eq!(alu.name(), "alu");
        assert_eq!(alu.parent(), Some(ModuleId(1)));
        assert_eq!(top.parent(), None);
    }
}
