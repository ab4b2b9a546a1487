//! Handle-indexed model of a loaded whole program.
//!
//! The out-of-tree metadata reader hands definitions to a [`ProgramBuilder`];
//! the resulting [`WholeProgram`] is immutable and is the single source the
//! hierarchy, resolver, and reachability engine index into. Every definition
//! is identified by a small integer handle assigned at construction, so
//! equality never depends on object identity.

mod body;
mod builder;
mod def;

pub use body::{CallTarget, DelegateDispatch, GenericScope, MethodBody, Op, TypeArg};
pub use builder::{BuildError, MethodSpec, ProgramBuilder};
pub use def::{
    FieldDef, FieldId, GenericParam, MethodDef, MethodId, ModuleDef, ModuleId, ParamType, TypeDef,
    TypeId, TypeKind,
};

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Platform surface the analyzed binaries target
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetProfile {
    #[default]
    Desktop,
    Phone,
}

/// A definition found by a whole-program search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Definition {
    Type(TypeId),
    Method(MethodId),
    Field(FieldId),
}

/// Search over identifier strings, optionally scoped to one module
///
/// The pattern must start with `T:`, `M:` or `F:`. With `regex` set the
/// remainder is matched as a regular expression over full identifier
/// strings instead of compared for equality.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub module: Option<String>,
    pub pattern: String,
    pub regex: bool,
}

impl SearchQuery {
    pub fn identifier(pattern: impl Into<String>) -> Self {
        Self {
            module: None,
            pattern: pattern.into(),
            regex: false,
        }
    }

    pub fn matching(pattern: impl Into<String>) -> Self {
        Self {
            module: None,
            pattern: pattern.into(),
            regex: true,
        }
    }

    pub fn in_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("search pattern '{0}' must start with 'T:', 'M:' or 'F:'")]
    InvalidSpecifier(String),

    #[error("invalid search pattern")]
    BadPattern(#[from] regex::Error),

    #[error("no module named '{0}'")]
    UnknownModule(String),
}

/// Immutable, deduplicated view of one or more loaded modules
///
/// Nested types arrive flattened and every generic definition appears
/// exactly once, in unbound form. Construction goes through
/// [`ProgramBuilder`], which validates the input instead of admitting
/// placeholder entries.
#[derive(Debug)]
pub struct WholeProgram {
    modules: Vec<ModuleDef>,
    types: Vec<TypeDef>,
    methods: Vec<MethodDef>,
    fields: Vec<FieldDef>,

    /// Qualified name to type handles; names are not unique program-wide
    type_name_index: HashMap<String, Vec<TypeId>>,
}

impl WholeProgram {
    pub(crate) fn from_parts(
        modules: Vec<ModuleDef>,
        types: Vec<TypeDef>,
        methods: Vec<MethodDef>,
        fields: Vec<FieldDef>,
    ) -> Self {
        let mut type_name_index: HashMap<String, Vec<TypeId>> = HashMap::new();
        for ty in &types {
            type_name_index
                .entry(ty.qualified_name())
                .or_default()
                .push(ty.id);
        }

        Self {
            modules,
            types,
            methods,
            fields,
            type_name_index,
        }
    }

    // ---- iteration surfaces ----

    pub fn modules(&self) -> impl Iterator<Item = &ModuleDef> {
        self.modules.iter()
    }

    pub fn types(&self) -> impl Iterator<Item = &TypeDef> {
        self.types.iter()
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDef> {
        self.methods.iter()
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    // ---- handle accessors ----

    pub fn module(&self, id: ModuleId) -> &ModuleDef {
        &self.modules[id.index()]
    }

    pub fn type_def(&self, id: TypeId) -> &TypeDef {
        &self.types[id.index()]
    }

    pub fn method(&self, id: MethodId) -> &MethodDef {
        &self.methods[id.index()]
    }

    pub fn field(&self, id: FieldId) -> &FieldDef {
        &self.fields[id.index()]
    }

    // ---- structural walks ----

    /// Direct supertypes: the declared superclass followed by declared interfaces
    pub fn direct_supertypes(&self, ty: TypeId) -> impl Iterator<Item = TypeId> + '_ {
        let def = self.type_def(ty);
        def.base.into_iter().chain(def.interfaces.iter().copied())
    }

    /// Superclasses only, ascending; does not include `ty` itself
    pub fn superclass_chain(&self, ty: TypeId) -> Vec<TypeId> {
        let mut chain = Vec::new();
        let mut current = self.type_def(ty).base;
        while let Some(base) = current {
            chain.push(base);
            current = self.type_def(base).base;
        }
        chain
    }

    /// All supertypes including interfaces, transitively; excludes `ty` itself
    pub fn all_supertypes(&self, ty: TypeId) -> Vec<TypeId> {
        let mut collected = Vec::new();
        let mut seen = vec![false; self.types.len()];
        let mut stack: Vec<TypeId> = self.direct_supertypes(ty).collect();

        while let Some(current) = stack.pop() {
            if seen[current.index()] {
                continue;
            }
            seen[current.index()] = true;
            collected.push(current);
            stack.extend(self.direct_supertypes(current));
        }

        collected
    }

    /// The type's static constructor, if it declares one
    pub fn static_constructor_of(&self, ty: TypeId) -> Option<MethodId> {
        self.type_def(ty)
            .methods
            .iter()
            .copied()
            .find(|&m| self.method(m).is_static_constructor())
    }

    /// The type's parameterless instance constructor, if it declares one
    pub fn default_constructor_of(&self, ty: TypeId) -> Option<MethodId> {
        self.type_def(ty).methods.iter().copied().find(|&m| {
            let def = self.method(m);
            def.is_instance_constructor() && def.params.is_empty()
        })
    }

    /// The finalizer declared directly on the type, if any
    pub fn declared_finalizer_of(&self, ty: TypeId) -> Option<MethodId> {
        self.type_def(ty)
            .methods
            .iter()
            .copied()
            .find(|&m| self.method(m).is_finalizer)
    }

    /// The finalizer that runs for instances of `ty`: the closest one on the
    /// superclass chain, starting at `ty` itself
    pub fn nearest_finalizer(&self, ty: TypeId) -> Option<MethodId> {
        if let Some(finalizer) = self.declared_finalizer_of(ty) {
            return Some(finalizer);
        }
        self.superclass_chain(ty)
            .into_iter()
            .find_map(|ancestor| self.declared_finalizer_of(ancestor))
    }

    // ---- platform surface ----

    /// Module carrying the base-library surface for the given profile
    pub fn core_module(&self, profile: TargetProfile) -> Option<ModuleId> {
        match profile {
            TargetProfile::Desktop | TargetProfile::Phone => {
                self.modules.iter().find(|m| m.is_core).map(|m| m.id)
            }
        }
    }

    /// Root type of the platform hierarchy, if a core module declares one
    pub fn object_root(&self) -> Option<TypeId> {
        self.modules
            .iter()
            .filter(|m| m.is_core)
            .find_map(|m| m.object_root)
    }

    /// Entry points designated in module headers, in module order
    pub fn designated_entry_points(&self) -> Vec<MethodId> {
        self.modules.iter().filter_map(|m| m.entry_point).collect()
    }

    // ---- name lookup ----

    /// First type with the given qualified name; names are not unique
    /// program-wide, so prefer module-scoped searches when that matters
    pub fn find_type(&self, qualified_name: &str) -> Option<TypeId> {
        self.find_types(qualified_name).first().copied()
    }

    /// All types with the given qualified name, across modules
    pub fn find_types(&self, qualified_name: &str) -> Vec<TypeId> {
        let bare = qualified_name
            .split_once('`')
            .map(|(name, _)| name)
            .unwrap_or(qualified_name);
        self.type_name_index.get(bare).cloned().unwrap_or_default()
    }

    /// First method with the given name on the first type with the given
    /// qualified name; a convenience for drivers and tests
    pub fn find_method(&self, type_name: &str, method_name: &str) -> Option<MethodId> {
        self.find_types(type_name).into_iter().find_map(|ty| {
            self.type_def(ty)
                .methods
                .iter()
                .copied()
                .find(|&m| self.method(m).name == method_name)
        })
    }

    // ---- identifier strings ----

    fn type_display_name(&self, ty: TypeId) -> String {
        let def = self.type_def(ty);
        let arity = def.generic_arity();
        if arity > 0 {
            format!("{}`{}", def.qualified_name(), arity)
        } else {
            def.qualified_name()
        }
    }

    fn param_type_name(&self, ty: &ParamType) -> String {
        match ty {
            ParamType::Concrete(t) => self.type_display_name(*t),
            ParamType::TypeParam(index) => format!("`{}", index),
        }
    }

    /// Identifier string for a type, e.g. `T:App.SuperClass`
    pub fn id_string_for_type(&self, ty: TypeId) -> String {
        format!("T:{}", self.type_display_name(ty))
    }

    /// Identifier string for a method, e.g. `M:App.Foo.Run(System.String)`.
    /// Constructors render as `#ctor`; zero-parameter methods omit the parens.
    pub fn id_string_for_method(&self, method: MethodId) -> String {
        let def = self.method(method);
        let name = def.name.replace('.', "#");
        let mut id = format!("M:{}.{}", self.type_display_name(def.owner), name);
        if !def.params.is_empty() {
            let params: Vec<String> = def.params.iter().map(|p| self.param_type_name(p)).collect();
            id.push('(');
            id.push_str(&params.join(","));
            id.push(')');
        }
        id
    }

    /// Identifier string for a field, e.g. `F:App.Foo.counter`
    pub fn id_string_for_field(&self, field: FieldId) -> String {
        let def = self.field(field);
        format!("F:{}.{}", self.type_display_name(def.owner), def.name)
    }

    // ---- whole-program search ----

    /// Find definitions whose identifier strings match the query
    pub fn search(&self, query: &SearchQuery) -> Result<Vec<Definition>, QueryError> {
        let kind = query
            .pattern
            .get(..2)
            .filter(|prefix| matches!(*prefix, "T:" | "M:" | "F:"))
            .ok_or_else(|| QueryError::InvalidSpecifier(query.pattern.clone()))?;

        let module = match &query.module {
            Some(name) => Some(
                self.modules
                    .iter()
                    .find(|m| &m.name == name)
                    .map(|m| m.id)
                    .ok_or_else(|| QueryError::UnknownModule(name.clone()))?,
            ),
            None => None,
        };

        let pattern = if query.regex {
            Some(Regex::new(&query.pattern)?)
        } else {
            None
        };
        let matches = |id_string: &str| match &pattern {
            Some(regex) => regex.is_match(id_string),
            None => id_string == query.pattern,
        };
        let in_module =
            |owner: TypeId| module.is_none() || Some(self.type_def(owner).module) == module;

        let mut found = Vec::new();
        match kind {
            "T:" => {
                for ty in &self.types {
                    if in_module(ty.id) && matches(&self.id_string_for_type(ty.id)) {
                        found.push(Definition::Type(ty.id));
                    }
                }
            }
            "M:" => {
                for method in &self.methods {
                    if in_module(method.owner) && matches(&self.id_string_for_method(method.id)) {
                        found.push(Definition::Method(method.id));
                    }
                }
            }
            _ => {
                for field in &self.fields {
                    if in_module(field.owner) && matches(&self.id_string_for_field(field.id)) {
                        found.push(Definition::Field(field.id));
                    }
                }
            }
        }

        Ok(found)
    }
}
