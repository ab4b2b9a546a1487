//! Entry-point resolution from identifier strings.
//!
//! Drivers hand entry points over as identifier strings of the form
//! `M:Namespace.Type.Method(ParamType,ParamType)` or
//! `M:Namespace.Type.Method` for the zero-parameter overload, separated by
//! whitespace or newlines. Identifiers that fail to parse or resolve are
//! skipped with a warning so one bad line degrades the entry-point set
//! instead of aborting the analysis; the skipped strings are reported back
//! for drivers that want to be strict.

use tracing::{debug, warn};

use crate::program::{Definition, MethodId, SearchQuery, WholeProgram};

/// Outcome of resolving an entry-point list
#[derive(Debug, Clone, Default)]
pub struct ResolvedEntryPoints {
    /// Resolved methods, in input order, deduplicated
    pub methods: Vec<MethodId>,

    /// Identifiers that were malformed or matched nothing
    pub skipped: Vec<String>,
}

/// Resolves entry-point identifier strings against a loaded program
pub struct EntryPointResolver<'p> {
    program: &'p WholeProgram,
}

impl<'p> EntryPointResolver<'p> {
    pub fn new(program: &'p WholeProgram) -> Self {
        Self { program }
    }

    /// Resolve a whitespace- or newline-separated identifier list
    pub fn resolve_list(&self, input: &str) -> ResolvedEntryPoints {
        self.resolve_all(input.split_whitespace())
    }

    /// Resolve a sequence of individual identifiers
    pub fn resolve_all<'a>(
        &self,
        identifiers: impl IntoIterator<Item = &'a str>,
    ) -> ResolvedEntryPoints {
        let mut resolved = ResolvedEntryPoints::default();

        for identifier in identifiers {
            let methods = self.resolve(identifier);
            if methods.is_empty() {
                resolved.skipped.push(identifier.to_string());
                continue;
            }
            if methods.len() > 1 {
                warn!(
                    "found {} methods for entry point '{}', treating all as entry points",
                    methods.len(),
                    identifier
                );
            }
            for method in methods {
                if !resolved.methods.contains(&method) {
                    resolved.methods.push(method);
                }
            }
        }

        debug!(
            "Resolved {} entry point(s), skipped {}",
            resolved.methods.len(),
            resolved.skipped.len()
        );

        resolved
    }

    /// All methods matching one identifier; empty when it is malformed or
    /// matches nothing
    pub fn resolve(&self, identifier: &str) -> Vec<MethodId> {
        if !identifier.starts_with("M:") {
            warn!("skipping malformed entry point identifier '{}'", identifier);
            return Vec::new();
        }

        match self.program.search(&SearchQuery::identifier(identifier)) {
            Ok(found) => {
                let methods: Vec<MethodId> = found
                    .into_iter()
                    .filter_map(|definition| match definition {
                        Definition::Method(method) => Some(method),
                        _ => None,
                    })
                    .collect();
                if methods.is_empty() {
                    warn!("entry point '{}' matches no method", identifier);
                }
                methods
            }
            Err(error) => {
                warn!("skipping entry point '{}': {}", identifier, error);
                Vec::new()
            }
        }
    }
}
