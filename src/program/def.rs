// Definition records - some predicates reserved for future use
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

use super::body::MethodBody;

/// Handle of a loaded module within a `WholeProgram`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModuleId(pub(crate) u32);

/// Handle of a type definition within a `WholeProgram`
///
/// Generic instantiations share the handle of their unbound definition,
/// so handle equality is the only identity the analysis ever compares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId(pub(crate) u32);

/// Handle of a method definition within a `WholeProgram`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MethodId(pub(crate) u32);

/// Handle of a field definition within a `WholeProgram`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FieldId(pub(crate) u32);

impl ModuleId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl TypeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl MethodId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FieldId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of type definition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Class,
    Interface,
    Struct,
    Delegate,
}

impl TypeKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::Interface => "interface",
            TypeKind::Struct => "struct",
            TypeKind::Delegate => "delegate",
        }
    }

    pub fn is_value_type(&self) -> bool {
        matches!(self, TypeKind::Struct)
    }
}

/// A generic parameter declared on a type or method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericParam {
    pub name: String,

    /// Whether the parameter carries a parameterless-constructor constraint
    pub requires_new: bool,
}

impl GenericParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires_new: false,
        }
    }

    pub fn with_new_constraint(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires_new: true,
        }
    }
}

/// A parameter, field, local, or return type in a signature
///
/// Signatures are kept in unbound form: a use of a generic parameter is
/// recorded by index, never substituted. Matching between a declared
/// generic method and its candidate implementations is therefore
/// erasure-style: a `TypeParam` position matches any concrete type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ParamType {
    Concrete(TypeId),
    TypeParam(u16),
}

impl ParamType {
    /// Erased compatibility between a declared signature position and a
    /// candidate implementation's position
    pub fn matches_erased(&self, other: &ParamType) -> bool {
        match (self, other) {
            (ParamType::Concrete(a), ParamType::Concrete(b)) => a == b,
            _ => true,
        }
    }
}

/// A type definition: class, interface, struct, or delegate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDef {
    pub id: TypeId,

    /// Module this type was loaded from
    pub module: ModuleId,

    /// Namespace portion of the qualified name, empty for the global namespace
    pub namespace: String,

    /// Simple name (e.g. "SuperClass")
    pub name: String,

    pub kind: TypeKind,

    /// Declared superclass, absent for interfaces and hierarchy roots
    pub base: Option<TypeId>,

    /// Directly declared interfaces, at unbound identity
    pub interfaces: Vec<TypeId>,

    /// Member methods, in declaration order
    pub methods: Vec<MethodId>,

    /// Member fields, in declaration order
    pub fields: Vec<FieldId>,

    pub is_abstract: bool,

    pub is_sealed: bool,

    /// Generic parameters of the unbound definition
    pub generic_params: Vec<GenericParam>,
}

impl TypeDef {
    /// "Namespace.Name", or just "Name" in the global namespace
    pub fn qualified_name(&self) -> String {
        if self.namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.namespace, self.name)
        }
    }

    pub fn generic_arity(&self) -> u16 {
        self.generic_params.len() as u16
    }

    pub fn is_interface(&self) -> bool {
        self.kind == TypeKind::Interface
    }

    pub fn is_struct(&self) -> bool {
        self.kind == TypeKind::Struct
    }

    /// Whether instances of this type can exist at runtime
    pub fn is_constructable(&self) -> bool {
        !self.is_abstract
            && matches!(
                self.kind,
                TypeKind::Class | TypeKind::Struct | TypeKind::Delegate
            )
    }

    /// Whether a value of this declared type always has this exact runtime type
    pub fn is_exact_by_declaration(&self) -> bool {
        self.is_sealed || self.kind.is_value_type()
    }
}

/// A method definition, owned by exactly one type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDef {
    pub id: MethodId,

    /// Declaring type
    pub owner: TypeId,

    pub name: String,

    /// Parameter signature in unbound form, excluding the receiver
    pub params: Vec<ParamType>,

    /// Declared return type, absent for void
    pub return_type: Option<ParamType>,

    pub is_static: bool,

    pub is_virtual: bool,

    pub is_abstract: bool,

    pub is_constructor: bool,

    pub is_finalizer: bool,

    /// Interface or base-class method this method explicitly implements,
    /// superseding implicit name-and-signature resolution
    pub explicit_impl_of: Option<MethodId>,

    /// Generic parameters of the unbound method definition
    pub generic_params: Vec<GenericParam>,

    /// Instruction stream; absent for abstract and external methods
    pub body: Option<MethodBody>,
}

impl MethodDef {
    pub fn is_static_constructor(&self) -> bool {
        self.is_static && self.is_constructor
    }

    pub fn is_instance_constructor(&self) -> bool {
        self.is_constructor && !self.is_static
    }

    /// External methods belong to a platform surface we cannot scan
    pub fn is_external(&self) -> bool {
        self.body.is_none() && !self.is_abstract
    }

    /// Name plus erased-signature compatibility with a declared method
    pub fn signature_matches(&self, declared: &MethodDef) -> bool {
        self.name == declared.name
            && self.params.len() == declared.params.len()
            && self
                .params
                .iter()
                .zip(declared.params.iter())
                .all(|(a, b)| a.matches_erased(b))
    }
}

/// A field definition, owned by exactly one type
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub id: FieldId,

    pub owner: TypeId,

    pub name: String,

    pub ty: ParamType,

    pub is_static: bool,
}

/// A loaded module (one binary as produced by the out-of-tree reader)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDef {
    pub id: ModuleId,

    pub name: String,

    /// Whether this module carries the platform base-library surface
    pub is_core: bool,

    /// Designated entry point recorded in the module header, if any
    pub entry_point: Option<MethodId>,

    /// Root type of the platform hierarchy (core modules only)
    pub object_root: Option<TypeId>,

    /// Types defined in this module, nested types flattened
    pub types: Vec<TypeId>,
}
