//! Generator registry
//!
//! Maps operator signatures to their code generators. Dispatch is a single
//! lookup-and-invoke; registered flags classify operators for outer layers
//! (e.g. whether a compiled program may be memoized).

use std::collections::HashMap;

use bitflags::bitflags;
use lazy_static::lazy_static;

use crate::codegen::logical::{AndGenerator, NotGenerator, OrGenerator};
use crate::codegen::CodeGenerator;
use crate::expr::Signature;

bitflags! {
    /// Classification flags attached to a registered generator
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct GenFlags: u8 {
        /// Emitted code depends only on its operands; compiled programs
        /// may be cached and shared
        const DETERMINISTIC = 0x01;
        /// The operator may skip evaluating later operands
        const SHORT_CIRCUITS = 0x02;
    }
}

struct Entry {
    generator: Box<dyn CodeGenerator>,
    flags: GenFlags,
}

/// Signature-keyed collection of operator generators
#[derive(Default)]
pub struct GeneratorRegistry {
    entries: HashMap<Signature, Entry>,
}

impl GeneratorRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in logical operators
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(
            Signature::new("and", 2),
            Box::new(AndGenerator),
            GenFlags::DETERMINISTIC | GenFlags::SHORT_CIRCUITS,
        );
        registry.register(
            Signature::new("or", 2),
            Box::new(OrGenerator),
            GenFlags::DETERMINISTIC | GenFlags::SHORT_CIRCUITS,
        );
        registry.register(
            Signature::new("not", 1),
            Box::new(NotGenerator),
            GenFlags::DETERMINISTIC,
        );
        registry
    }

    /// Get the shared default registry
    pub fn global() -> &'static GeneratorRegistry {
        lazy_static! {
            static ref GLOBAL: GeneratorRegistry = GeneratorRegistry::with_builtins();
        }
        &GLOBAL
    }

    /// Register a generator under a signature, replacing any previous entry
    pub fn register(
        &mut self,
        signature: Signature,
        generator: Box<dyn CodeGenerator>,
        flags: GenFlags,
    ) {
        self.entries.insert(signature, Entry { generator, flags });
    }

    /// Look up the generator for a signature
    pub fn lookup(&self, signature: &Signature) -> Option<&dyn CodeGenerator> {
        self.entries.get(signature).map(|e| e.generator.as_ref())
    }

    /// Get the flags registered for a signature
    pub fn flags(&self, signature: &Signature) -> Option<GenFlags> {
        self.entries.get(signature).map(|e| e.flags)
    }

    /// Number of registered generators
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtins_registered() {
        let registry = GeneratorRegistry::with_builtins();
        assert_eq!(registry.len(), 3);
        assert!(registry.lookup(&Signature::new("and", 2)).is_some());
        assert!(registry.lookup(&Signature::new("or", 2)).is_some());
        assert!(registry.lookup(&Signature::new("not", 1)).is_some());
    }

    #[test]
    fn test_lookup_respects_arity() {
        let registry = GeneratorRegistry::with_builtins();
        assert!(registry.lookup(&Signature::new("and", 3)).is_none());
        assert!(registry.lookup(&Signature::new("not", 2)).is_none());
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let registry = GeneratorRegistry::with_builtins();
        assert!(registry.lookup(&Signature::new("AND", 2)).is_some());
    }

    #[test]
    fn test_flags() {
        let registry = GeneratorRegistry::with_builtins();
        let and_flags = registry.flags(&Signature::new("and", 2)).unwrap();
        assert!(and_flags.contains(GenFlags::SHORT_CIRCUITS));
        assert!(and_flags.contains(GenFlags::DETERMINISTIC));

        let not_flags = registry.flags(&Signature::new("not", 1)).unwrap();
        assert!(!not_flags.contains(GenFlags::SHORT_CIRCUITS));
    }

    #[test]
    fn test_global_registry() {
        let registry = GeneratorRegistry::global();
        assert!(registry.lookup(&Signature::new("and", 2)).is_some());
    }
}
