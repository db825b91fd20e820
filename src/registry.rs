use crate::builtin::{BuiltinCommand, Cd, CopyPath, Delete, Echo, Exit, MakeDir, MovePath, Return, Set};
use crate::command::{CommandFactory, Factory};
use crate::external::RunCommand;
use crate::open::OpenCommand;
use log::debug;
use std::collections::HashMap;
use std::sync::OnceLock;

/// Name of the command that receives instructions nobody else claims.
pub const FALLBACK_COMMAND: &str = "run";

static GLOBAL: OnceLock<CommandRegistry> = OnceLock::new();

/// Registry of command factories, keyed by command name.
pub struct CommandRegistry {
    factories: HashMap<String, Box<dyn CommandFactory>>,
}

impl CommandRegistry {
    /// A registry with no commands at all.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// A registry holding every command shipped with this crate.
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        registry.register_builtin::<Echo>();
        registry.register_builtin::<Set>();
        registry.register_builtin::<Cd>();
        registry.register_builtin::<CopyPath>();
        registry.register_builtin::<MovePath>();
        registry.register_builtin::<MakeDir>();
        registry.register_builtin::<Delete>();
        registry.register_builtin::<Return>();
        registry.register_builtin::<Exit>();
        registry.register_builtin::<OpenCommand>();
        registry.register(FALLBACK_COMMAND, Box::new(Factory::<RunCommand>::default()));
        registry
    }

    /// The process-wide registry, built on first use and never modified afterwards.
    pub fn global() -> &'static CommandRegistry {
        GLOBAL.get_or_init(|| {
            let registry = Self::builtin();
            debug!("command registry loaded ({} commands)", registry.len());
            registry
        })
    }

    /// Register (or replace) the factory for `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: Box<dyn CommandFactory>) {
        self.factories.insert(name.into(), factory);
    }

    pub(crate) fn register_builtin<T: BuiltinCommand + 'static>(&mut self) {
        self.register(T::name(), Box::new(Factory::<T>::default()));
    }

    /// Look up a factory by exact command name.
    pub fn resolve(&self, name: &str) -> Option<&dyn CommandFactory> {
        self.factories.get(name).map(|b| b.as_ref())
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_fallback_and_open() {
        let registry = CommandRegistry::builtin();
        for name in [
            "echo", "set", "cd", "copy", "move", "mkdir", "delete", "return", "exit", "open",
            FALLBACK_COMMAND,
        ] {
            assert!(registry.resolve(name).is_some(), "missing command {name}");
        }
        assert!(registry.resolve("copyy").is_none());
    }

    #[test]
    fn global_registry_is_built_once() {
        let first = CommandRegistry::global();
        let second = CommandRegistry::global();
        assert!(std::ptr::eq(first, second));
        assert!(!first.is_empty());
    }

    #[test]
    fn empty_registry_resolves_nothing() {
        let registry = CommandRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.resolve(FALLBACK_COMMAND).is_none());
    }
}
