//! Override and interface-implementation resolution.
//!
//! Answers the question at the heart of virtual dispatch: given a concrete
//! lookup type and a method declared somewhere above it, which methods can
//! actually run. Results are sets; under generic erasure a single declared
//! method can legitimately resolve to several implementations.

use tracing::trace;

use crate::program::{MethodId, TypeId, WholeProgram};

/// Resolves declared methods to their implementations on concrete types
#[derive(Debug, Clone, Copy)]
pub struct OverrideResolver<'p> {
    program: &'p WholeProgram,
}

impl<'p> OverrideResolver<'p> {
    pub fn new(program: &'p WholeProgram) -> Self {
        Self { program }
    }

    /// Find the implementations of `declared` that run when the receiver's
    /// runtime type is `lookup`, searching the superclass chain from
    /// `lookup` up to and including `upper_bound`.
    ///
    /// Precedence:
    /// 1. An explicit implementation tag anywhere on the chain supersedes
    ///    implicit satisfaction, even one on a base class below a more
    ///    derived implicit match.
    /// 2. Otherwise methods matching `declared` by name and erased
    ///    signature, most derived first; a method lower in the chain hides
    ///    an identically-signed method above it, and a pre-existing method
    ///    higher in the chain satisfies an interface declared
    ///    retroactively on a subtype.
    ///
    /// Erasure keeps this a set: when a class implements one generic
    /// interface at two closed argument lists, the distinct concrete
    /// signatures do not hide each other and all of them are returned. An
    /// empty result is an ordinary outcome, not an error: nothing between
    /// `lookup` and `upper_bound` implements the method.
    pub fn implements(
        &self,
        lookup: TypeId,
        upper_bound: TypeId,
        declared: MethodId,
    ) -> Vec<MethodId> {
        let program = self.program;
        let lookup_def = program.type_def(lookup);

        // Dispatch lookup starts at a runtime type; interfaces have none.
        debug_assert!(!lookup_def.is_interface());
        if lookup_def.is_interface() {
            return Vec::new();
        }

        let declared_def = program.method(declared);
        let declared_on_interface = program.type_def(declared_def.owner).is_interface();

        let mut chain = vec![lookup];
        chain.extend(program.superclass_chain(lookup));

        if declared_on_interface {
            let explicit = self.collect_on_chain(&chain, upper_bound, |candidate| {
                program.method(candidate).explicit_impl_of == Some(declared)
            });
            if !explicit.is_empty() {
                trace!(
                    "explicit implementation(s) of {} below {}",
                    declared_def.name,
                    lookup_def.name
                );
                return explicit;
            }
        }

        self.collect_on_chain(&chain, upper_bound, |candidate| {
            let def = program.method(candidate);
            match def.explicit_impl_of {
                Some(target) => target == declared,
                None => def.is_virtual && !def.is_static && def.signature_matches(declared_def),
            }
        })
    }

    /// Walk the chain from most derived to `upper_bound`, collecting
    /// matching methods; a collected method hides identically-signed
    /// matches on classes above it
    fn collect_on_chain(
        &self,
        chain: &[TypeId],
        upper_bound: TypeId,
        matches: impl Fn(MethodId) -> bool,
    ) -> Vec<MethodId> {
        let program = self.program;
        let mut found: Vec<MethodId> = Vec::new();

        for &class in chain {
            for &candidate in &program.type_def(class).methods {
                if !matches(candidate) {
                    continue;
                }
                let definition = program.method(candidate);
                let hidden = found.iter().any(|&existing| {
                    let existing = program.method(existing);
                    existing.name == definition.name && existing.params == definition.params
                });
                if !hidden {
                    found.push(candidate);
                }
            }
            if class == upper_bound {
                break;
            }
        }

        found
    }
}
