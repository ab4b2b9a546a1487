use serde::{Deserialize, Serialize};

use super::def::{FieldId, MethodId, ParamType, TypeId};

/// Which declaration a generic argument position belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenericScope {
    /// A generic parameter of the enclosing type
    Type,
    /// A generic parameter of the enclosing method
    Method,
}

/// A generic argument at a call site: either a concrete type or a generic
/// parameter of the enclosing definition flowing through unchanged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeArg {
    Concrete(TypeId),
    Param { scope: GenericScope, index: u16 },
}

/// Target of a call instruction, together with the generic arguments the
/// call site supplies for the callee's owner type and for the callee itself
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallTarget {
    pub method: MethodId,

    /// Arguments for the owner type's generic parameters at this site
    pub owner_args: Vec<TypeArg>,

    /// Arguments for the method's own generic parameters at this site
    pub method_args: Vec<TypeArg>,
}

impl CallTarget {
    pub fn new(method: MethodId) -> Self {
        Self {
            method,
            owner_args: Vec::new(),
            method_args: Vec::new(),
        }
    }

    pub fn with_owner_args(mut self, args: Vec<TypeArg>) -> Self {
        self.owner_args = args;
        self
    }

    pub fn with_method_args(mut self, args: Vec<TypeArg>) -> Self {
        self.method_args = args;
        self
    }
}

/// Dispatch flavor of a delegate binding
///
/// The loader classifies each binding: a bind through a statically exact
/// receiver arrives as `NonVirtual` against the resolved override, while a
/// bind against an overridable receiver arrives as `Virtual` or
/// `Interface` and gets ordinary virtual-call treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DelegateDispatch {
    Static,
    NonVirtual,
    Virtual,
    Interface,
}

/// One operation of a compiled method body
///
/// This is the slice of the loader's instruction set the analysis cares
/// about: constructions, calls, field traffic, delegate bindings, and the
/// data movement needed to track values between them. Everything else
/// arrives as `Nop`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Nop,

    /// Push a constant of the given declared type (absent for null)
    Const(Option<TypeId>),

    LoadArg(u16),
    StoreArg(u16),
    LoadLocal(u16),
    StoreLocal(u16),

    /// Take the address of a local; its value escapes tracking
    LoadLocalAddr(u16),

    Dup,
    Pop,

    /// Allocate an instance and invoke the named constructor
    New(CallTarget),

    /// Allocate through a `new()`-constrained generic parameter of the
    /// enclosing definition
    NewGeneric { scope: GenericScope, index: u16 },

    /// Box a value of the given type
    Box(TypeId),

    CallStatic(CallTarget),

    /// Non-virtual instance call: struct methods, sealed targets, and
    /// explicitly non-virtual dispatch such as base calls
    CallInstance(CallTarget),

    /// Virtual or interface dispatch against the named declared method
    CallVirtual(CallTarget),

    /// Bind a delegate of `delegate_type` to `target`
    BindDelegate {
        delegate_type: TypeId,
        target: MethodId,
        dispatch: DelegateDispatch,
    },

    LoadField(FieldId),
    StoreField(FieldId),
    LoadStaticField(FieldId),
    StoreStaticField(FieldId),

    /// Unconditional jump to the op at the given index
    Branch(u32),

    /// Conditional jump, popping the condition
    BranchIf(u32),

    Return,
    Throw,
}

impl Op {
    /// Jump target, for block construction
    pub fn branch_target(&self) -> Option<u32> {
        match self {
            Op::Branch(target) | Op::BranchIf(target) => Some(*target),
            _ => None,
        }
    }

    /// Whether control never falls through to the next op
    pub fn is_terminator(&self) -> bool {
        matches!(self, Op::Branch(_) | Op::Return | Op::Throw)
    }
}

/// Instruction stream of a method, with the declared types of its locals
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodBody {
    /// Declared local slot types, in slot order
    pub locals: Vec<ParamType>,

    /// Whether the body carries exception-handler regions
    pub has_exception_handlers: bool,

    pub ops: Vec<Op>,
}

impl MethodBody {
    pub fn new(ops: Vec<Op>) -> Self {
        Self {
            locals: Vec::new(),
            has_exception_handlers: false,
            ops,
        }
    }

    pub fn with_locals(mut self, locals: Vec<ParamType>) -> Self {
        self.locals = locals;
        self
    }

    pub fn with_exception_handlers(mut self) -> Self {
        self.has_exception_handlers = true;
        self
    }
}
