use thiserror::Error;
use tracing::debug;

use super::body::MethodBody;
use super::def::{
    FieldDef, FieldId, GenericParam, MethodDef, MethodId, ModuleDef, ModuleId, ParamType, TypeDef,
    TypeId, TypeKind,
};
use super::WholeProgram;

/// Validation failures raised when finishing a program
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("inheritance cycle involving type '{0}'")]
    InheritanceCycle(String),

    #[error("type '{0}' declares an interface as its superclass")]
    InterfaceAsBase(String),

    #[error("method '{0}' explicitly implements a non-overridable method")]
    InvalidExplicitImplementation(String),

    #[error("finalizer '{0}' must be a non-static instance method")]
    StaticFinalizer(String),
}

/// Declarative description of a method being added to the program
#[derive(Debug, Clone)]
pub struct MethodSpec {
    name: String,
    params: Vec<ParamType>,
    return_type: Option<ParamType>,
    is_static: bool,
    is_virtual: bool,
    is_abstract: bool,
    is_constructor: bool,
    is_finalizer: bool,
    explicit_impl_of: Option<MethodId>,
    generic_params: Vec<GenericParam>,
    body: Option<MethodBody>,
}

impl MethodSpec {
    /// A plain non-virtual instance method
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            return_type: None,
            is_static: false,
            is_virtual: false,
            is_abstract: false,
            is_constructor: false,
            is_finalizer: false,
            explicit_impl_of: None,
            generic_params: Vec::new(),
            body: None,
        }
    }

    pub fn static_method(name: impl Into<String>) -> Self {
        let mut spec = Self::new(name);
        spec.is_static = true;
        spec
    }

    pub fn virtual_method(name: impl Into<String>) -> Self {
        let mut spec = Self::new(name);
        spec.is_virtual = true;
        spec
    }

    pub fn abstract_method(name: impl Into<String>) -> Self {
        let mut spec = Self::new(name);
        spec.is_virtual = true;
        spec.is_abstract = true;
        spec
    }

    pub fn constructor() -> Self {
        let mut spec = Self::new(".ctor");
        spec.is_constructor = true;
        spec
    }

    pub fn static_constructor() -> Self {
        let mut spec = Self::new(".cctor");
        spec.is_static = true;
        spec.is_constructor = true;
        spec
    }

    pub fn finalizer() -> Self {
        let mut spec = Self::new("Finalize");
        spec.is_virtual = true;
        spec.is_finalizer = true;
        spec
    }

    pub fn params(mut self, params: Vec<ParamType>) -> Self {
        self.params = params;
        self
    }

    pub fn returns(mut self, ty: ParamType) -> Self {
        self.return_type = Some(ty);
        self
    }

    pub fn explicit_impl_of(mut self, declared: MethodId) -> Self {
        self.explicit_impl_of = Some(declared);
        self
    }

    pub fn generic_param(mut self, param: GenericParam) -> Self {
        self.generic_params.push(param);
        self
    }

    pub fn body(mut self, body: MethodBody) -> Self {
        self.body = Some(body);
        self
    }
}

/// Assembles validated modules into an immutable `WholeProgram`
///
/// Handles are assigned as definitions are added and never change, so
/// bodies built later can reference methods created in any order.
pub struct ProgramBuilder {
    modules: Vec<ModuleDef>,
    types: Vec<TypeDef>,
    methods: Vec<MethodDef>,
    fields: Vec<FieldDef>,
}

impl ProgramBuilder {
    pub fn new() -> Self {
        Self {
            modules: Vec::new(),
            types: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn add_module(&mut self, name: impl Into<String>) -> ModuleId {
        let id = ModuleId(self.modules.len() as u32);
        self.modules.push(ModuleDef {
            id,
            name: name.into(),
            is_core: false,
            entry_point: None,
            object_root: None,
            types: Vec::new(),
        });
        id
    }

    /// Add the module carrying the platform base-library surface
    pub fn add_core_module(&mut self, name: impl Into<String>) -> ModuleId {
        let id = self.add_module(name);
        self.modules[id.index()].is_core = true;
        id
    }

    pub fn set_entry_point(&mut self, module: ModuleId, method: MethodId) {
        self.modules[module.index()].entry_point = Some(method);
    }

    /// Mark the root type of the platform hierarchy on a core module
    pub fn set_object_root(&mut self, module: ModuleId, ty: TypeId) {
        self.modules[module.index()].object_root = Some(ty);
    }

    pub fn add_class(&mut self, module: ModuleId, qualified_name: &str) -> TypeId {
        self.add_type(module, qualified_name, TypeKind::Class)
    }

    pub fn add_interface(&mut self, module: ModuleId, qualified_name: &str) -> TypeId {
        self.add_type(module, qualified_name, TypeKind::Interface)
    }

    pub fn add_struct(&mut self, module: ModuleId, qualified_name: &str) -> TypeId {
        self.add_type(module, qualified_name, TypeKind::Struct)
    }

    pub fn add_delegate(&mut self, module: ModuleId, qualified_name: &str) -> TypeId {
        self.add_type(module, qualified_name, TypeKind::Delegate)
    }

    fn add_type(&mut self, module: ModuleId, qualified_name: &str, kind: TypeKind) -> TypeId {
        let (namespace, name) = match qualified_name.rsplit_once('.') {
            Some((ns, simple)) => (ns.to_string(), simple.to_string()),
            None => (String::new(), qualified_name.to_string()),
        };

        let id = TypeId(self.types.len() as u32);
        self.types.push(TypeDef {
            id,
            module,
            namespace,
            name,
            kind,
            base: None,
            interfaces: Vec::new(),
            methods: Vec::new(),
            fields: Vec::new(),
            is_abstract: false,
            is_sealed: false,
            generic_params: Vec::new(),
        });
        self.modules[module.index()].types.push(id);
        id
    }

    pub fn set_base(&mut self, ty: TypeId, base: TypeId) {
        self.types[ty.index()].base = Some(base);
    }

    pub fn add_interface_impl(&mut self, ty: TypeId, interface: TypeId) {
        self.types[ty.index()].interfaces.push(interface);
    }

    pub fn make_abstract(&mut self, ty: TypeId) {
        self.types[ty.index()].is_abstract = true;
    }

    pub fn make_sealed(&mut self, ty: TypeId) {
        self.types[ty.index()].is_sealed = true;
    }

    /// Declare a generic parameter on a type, returning its index
    pub fn add_type_param(&mut self, ty: TypeId, param: GenericParam) -> u16 {
        let def = &mut self.types[ty.index()];
        def.generic_params.push(param);
        (def.generic_params.len() - 1) as u16
    }

    pub fn add_method(&mut self, owner: TypeId, spec: MethodSpec) -> MethodId {
        let id = MethodId(self.methods.len() as u32);
        self.methods.push(MethodDef {
            id,
            owner,
            name: spec.name,
            params: spec.params,
            return_type: spec.return_type,
            is_static: spec.is_static,
            is_virtual: spec.is_virtual,
            is_abstract: spec.is_abstract,
            is_constructor: spec.is_constructor,
            is_finalizer: spec.is_finalizer,
            explicit_impl_of: spec.explicit_impl_of,
            generic_params: spec.generic_params,
            body: spec.body,
        });
        self.types[owner.index()].methods.push(id);
        id
    }

    pub fn add_field(&mut self, owner: TypeId, name: &str, ty: ParamType) -> FieldId {
        self.add_field_inner(owner, name, ty, false)
    }

    pub fn add_static_field(&mut self, owner: TypeId, name: &str, ty: ParamType) -> FieldId {
        self.add_field_inner(owner, name, ty, true)
    }

    fn add_field_inner(
        &mut self,
        owner: TypeId,
        name: &str,
        ty: ParamType,
        is_static: bool,
    ) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        self.fields.push(FieldDef {
            id,
            owner,
            name: name.to_string(),
            ty,
            is_static,
        });
        self.types[owner.index()].fields.push(id);
        id
    }

    /// Attach or replace a method body after creation
    pub fn set_body(&mut self, method: MethodId, body: MethodBody) {
        self.methods[method.index()].body = Some(body);
    }

    /// Validate and freeze the program
    pub fn finish(self) -> Result<WholeProgram, BuildError> {
        self.validate()?;

        debug!(
            "Finished program: {} modules, {} types, {} methods, {} fields",
            self.modules.len(),
            self.types.len(),
            self.methods.len(),
            self.fields.len()
        );

        Ok(WholeProgram::from_parts(
            self.modules,
            self.types,
            self.methods,
            self.fields,
        ))
    }

    fn validate(&self) -> Result<(), BuildError> {
        for ty in &self.types {
            if let Some(base) = ty.base {
                if self.types[base.index()].is_interface() {
                    return Err(BuildError::InterfaceAsBase(ty.qualified_name()));
                }
            }
            self.check_acyclic(ty.id)?;
        }

        for method in &self.methods {
            if method.is_finalizer && method.is_static {
                return Err(BuildError::StaticFinalizer(method.name.clone()));
            }
            if let Some(declared) = method.explicit_impl_of {
                let target = &self.methods[declared.index()];
                let target_on_interface = self.types[target.owner.index()].is_interface();
                if !target_on_interface && !target.is_virtual {
                    return Err(BuildError::InvalidExplicitImplementation(
                        method.name.clone(),
                    ));
                }
            }
        }

        Ok(())
    }

    /// Walk supertype edges from `start`, failing if `start` ever recurs
    fn check_acyclic(&self, start: TypeId) -> Result<(), BuildError> {
        let mut stack: Vec<TypeId> = Vec::new();
        let mut seen: Vec<bool> = vec![false; self.types.len()];

        let push_supers = |stack: &mut Vec<TypeId>, ty: &TypeDef| {
            if let Some(base) = ty.base {
                stack.push(base);
            }
            stack.extend(ty.interfaces.iter().copied());
        };

        push_supers(&mut stack, &self.types[start.index()]);

        while let Some(current) = stack.pop() {
            if current == start {
                return Err(BuildError::InheritanceCycle(
                    self.types[start.index()].qualified_name(),
                ));
            }
            if seen[current.index()] {
                continue;
            }
            seen[current.index()] = true;
            push_supers(&mut stack, &self.types[current.index()]);
        }

        Ok(())
    }
}

impl Default for ProgramBuilder {
    fn default() -> Self {
        Self::new()
    }
}
