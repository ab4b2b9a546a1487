//! Rapid-type-analysis reachability engine.
//!
//! A fixed-point worklist over method bodies. Virtual dispatch is resolved
//! only against types the analysis has seen constructed, and every
//! demanded dispatch stays indexed so a later construction re-resolves it
//! incrementally instead of rescanning any body.

use std::collections::{HashMap, HashSet, VecDeque};

use tracing::{debug, info, trace, warn};

use super::local_flow::LocalFlowSummarizer;
use super::summary::ReachabilitySummary;
use crate::hierarchy::ClassHierarchy;
use crate::program::{
    CallTarget, FieldId, GenericParam, GenericScope, MethodId, Op, TargetProfile, TypeArg, TypeId,
    WholeProgram,
};
use crate::resolve::OverrideResolver;

/// A generic parameter observed being constructed through `new T()`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructedTypeParam {
    Type { owner: TypeId, index: u16 },
    Method { owner: MethodId, index: u16 },
}

/// Index of demanded virtual dispatches
///
/// A declared method is "in demand" once some reachable body dispatches on
/// it. The target set remembers which implementations have already been
/// resolved, so a construction arriving later only adds the genuinely new
/// ones.
#[derive(Debug, Default)]
struct VirtualDispatchDemand {
    targets_by_declared: HashMap<MethodId, HashSet<MethodId>>,
}

impl VirtualDispatchDemand {
    fn is_in_demand(&self, declared: MethodId) -> bool {
        self.targets_by_declared.contains_key(&declared)
    }

    fn note_in_demand(&mut self, declared: MethodId) {
        self.targets_by_declared.entry(declared).or_default();
    }

    /// Returns true when the target is new for this dispatch
    fn note_target(&mut self, declared: MethodId, target: MethodId) -> bool {
        self.targets_by_declared
            .entry(declared)
            .or_default()
            .insert(target)
    }
}

/// Reachability engine for one run over fixed entry points
///
/// The program and hierarchy are shared immutable inputs; all mutable
/// state lives in the instance, so independent runs over the same program
/// need no synchronization. The view accessors are only meaningful after
/// [`RapidTypeAnalysis::run`] returns; partial state before the fixed
/// point is unsound and never surfaced.
pub struct RapidTypeAnalysis<'p> {
    program: &'p WholeProgram,
    hierarchy: &'p ClassHierarchy,
    profile: TargetProfile,
    resolver: OverrideResolver<'p>,
    summarizer: LocalFlowSummarizer<'p>,

    methods: HashSet<MethodId>,
    fields: HashSet<FieldId>,
    types: HashSet<TypeId>,
    constructed: HashSet<TypeId>,
    constructed_type_params: HashSet<ConstructedTypeParam>,

    demand: VirtualDispatchDemand,
    worklist: VecDeque<MethodId>,
    finished: bool,
}

impl<'p> RapidTypeAnalysis<'p> {
    pub fn new(
        program: &'p WholeProgram,
        hierarchy: &'p ClassHierarchy,
        profile: TargetProfile,
    ) -> Self {
        Self {
            program,
            hierarchy,
            profile,
            resolver: OverrideResolver::new(program),
            summarizer: LocalFlowSummarizer::new(program),
            methods: HashSet::new(),
            fields: HashSet::new(),
            types: HashSet::new(),
            constructed: HashSet::new(),
            constructed_type_params: HashSet::new(),
            demand: VirtualDispatchDemand::default(),
            worklist: VecDeque::new(),
            finished: false,
        }
    }

    /// Grow the reachable sets from the entry points to the fixed point
    ///
    /// Entry points are assumed reachable unconditionally; a constructor
    /// supplied directly also marks its type constructed.
    pub fn run(&mut self, entry_points: &[MethodId]) {
        debug_assert!(!self.finished);
        if entry_points.is_empty() {
            warn!("running reachability analysis with no entry points");
        }
        info!("Seeding analysis with {} entry point(s)", entry_points.len());

        let program = self.program;
        for &entry in entry_points {
            self.nonvirtual_method_reached(entry);

            let def = program.method(entry);
            if def.is_instance_constructor() {
                self.construction_found(def.owner);
            }
        }

        while let Some(method) = self.worklist.pop_front() {
            self.scan_method(method);
        }

        self.finished = true;
        info!(
            "Reachability fixed point: {} methods, {} fields, {} types ({} constructed)",
            self.methods.len(),
            self.fields.len(),
            self.types.len(),
            self.constructed.len()
        );
    }

    // ---- views, valid once `run` has returned ----

    pub fn finished(&self) -> bool {
        self.finished
    }

    pub fn reachable_methods(&self) -> &HashSet<MethodId> {
        &self.methods
    }

    pub fn reachable_fields(&self) -> &HashSet<FieldId> {
        &self.fields
    }

    pub fn reachable_types(&self) -> &HashSet<TypeId> {
        &self.types
    }

    pub fn constructed_types(&self) -> &HashSet<TypeId> {
        &self.constructed
    }

    pub fn constructed_type_params(&self) -> &HashSet<ConstructedTypeParam> {
        &self.constructed_type_params
    }

    pub fn method_is_reachable(&self, method: MethodId) -> bool {
        self.methods.contains(&method)
    }

    pub fn field_is_reachable(&self, field: FieldId) -> bool {
        self.fields.contains(&field)
    }

    pub fn type_is_reachable(&self, ty: TypeId) -> bool {
        self.types.contains(&ty)
    }

    // ---- worklist plumbing ----

    fn add_to_worklist(&mut self, method: MethodId) {
        if self.program.method(method).is_abstract {
            return;
        }
        if self.methods.insert(method) {
            self.worklist.push_back(method);
        }
    }

    /// A use of a type makes the type and its bases reachable and brings
    /// in its static constructor
    fn type_use_found(&mut self, ty: TypeId) {
        if self.types.contains(&ty) {
            return;
        }

        let program = self.program;
        let supertypes: Vec<TypeId> = program.direct_supertypes(ty).collect();
        for supertype in supertypes {
            self.type_use_found(supertype);
        }

        self.types.insert(ty);

        if let Some(cctor) = program.static_constructor_of(ty) {
            self.add_to_worklist(cctor);
        }
    }

    /// A construction of `ty` re-resolves every demanded dispatch the new
    /// type can now answer, and makes its finalizer chain live
    fn construction_found(&mut self, ty: TypeId) {
        let program = self.program;
        if !program.type_def(ty).is_constructable() {
            return;
        }

        self.type_use_found(ty);
        if !self.constructed.insert(ty) {
            return;
        }
        trace!("constructed {}", program.type_def(ty).qualified_name());

        // Only dispatches already in demand need re-resolution; the rest
        // will find this type in `constructed` when they first appear.
        let mut ancestors = vec![ty];
        ancestors.extend(program.all_supertypes(ty));
        for ancestor in ancestors {
            let declared_methods = program.type_def(ancestor).methods.clone();
            for declared in declared_methods {
                if !program.method(declared).is_virtual || !self.demand.is_in_demand(declared) {
                    continue;
                }
                for target in self.resolver.implements(ty, ancestor, declared) {
                    self.note_dispatch(declared, target);
                }
            }
        }

        if let Some(finalizer) = program.nearest_finalizer(ty) {
            self.add_to_worklist(finalizer);
        }
    }

    /// First dispatch against a declared method resolves it against every
    /// compatible constructed type; the demand index keeps it current
    fn note_virtual_dispatch(&mut self, declared: MethodId) {
        if self.demand.is_in_demand(declared) {
            return;
        }
        self.demand.note_in_demand(declared);

        let program = self.program;
        let owner = program.method(declared).owner;
        self.type_use_found(owner);

        let mut candidates = vec![owner];
        candidates.extend(self.hierarchy.all_subclasses(owner));
        for candidate in candidates {
            let def = program.type_def(candidate);
            // Struct receivers dispatch without an observed construction;
            // boxing is where they additionally become constructed.
            if !def.is_constructable() {
                continue;
            }
            if !def.is_struct() && !self.constructed.contains(&candidate) {
                continue;
            }
            for target in self.resolver.implements(candidate, owner, declared) {
                self.note_dispatch(declared, target);
            }
        }
    }

    fn note_dispatch(&mut self, declared: MethodId, target: MethodId) {
        if self.demand.note_target(declared, target) {
            self.add_to_worklist(target);
        }
    }

    fn nonvirtual_method_reached(&mut self, method: MethodId) {
        let owner = self.program.method(method).owner;
        self.type_use_found(owner);
        self.add_to_worklist(method);
    }

    // ---- generic argument flow ----

    /// Concrete types bound to `new()`-constrained parameters at a
    /// reachable call site are constructed exactly like an explicit `new`
    fn note_generic_args(&mut self, target: &CallTarget) {
        let program = self.program;
        let callee = program.method(target.method);

        if (callee.is_static || callee.is_constructor) && !target.owner_args.is_empty() {
            let formals = program.type_def(callee.owner).generic_params.clone();
            self.note_generic_param_flow(&formals, &target.owner_args);
        }
        if !target.method_args.is_empty() {
            let formals = callee.generic_params.clone();
            self.note_generic_param_flow(&formals, &target.method_args);
        }
    }

    fn note_generic_param_flow(&mut self, formals: &[GenericParam], actuals: &[TypeArg]) {
        if formals.len() != actuals.len() {
            warn!(
                "generic argument count mismatch: {} formals, {} actuals",
                formals.len(),
                actuals.len()
            );
        }

        for (formal, actual) in formals.iter().zip(actuals) {
            if !formal.requires_new {
                continue;
            }
            let TypeArg::Concrete(ty) = actual else {
                continue;
            };
            if !self.program.type_def(*ty).is_constructable() {
                continue;
            }

            self.construction_found(*ty);
            if let Some(ctor) = self.program.default_constructor_of(*ty) {
                self.nonvirtual_method_reached(ctor);
            }
        }
    }

    // ---- body scanning ----

    /// Classify every operation of one reachable method body
    fn scan_method(&mut self, method: MethodId) {
        let program = self.program;
        let def = program.method(method);

        let Some(body) = &def.body else {
            let module = program.type_def(def.owner).module;
            if program.core_module(self.profile) == Some(module) {
                trace!("platform method {} has no body to scan", def.name);
            } else {
                debug!("cannot scan external method {}", def.name);
            }
            return;
        };

        let summary: Option<ReachabilitySummary> = if self.summarizer.can_summarize(method) {
            Some(self.summarizer.summarize(method))
        } else {
            None
        };

        for (op_index, op) in body.ops.iter().enumerate() {
            match op {
                Op::New(target) => {
                    self.note_generic_args(target);
                    let owner = program.method(target.method).owner;
                    self.construction_found(owner);
                    self.nonvirtual_method_reached(target.method);
                }

                Op::NewGeneric { scope, index } => {
                    let key = match scope {
                        GenericScope::Type => ConstructedTypeParam::Type {
                            owner: def.owner,
                            index: *index,
                        },
                        GenericScope::Method => ConstructedTypeParam::Method {
                            owner: method,
                            index: *index,
                        },
                    };
                    self.constructed_type_params.insert(key);
                }

                Op::Box(ty) => {
                    // Boxing a struct puts it behind a dispatchable
                    // reference; boxing a reference type is a no-op.
                    if program.type_def(*ty).is_struct() {
                        self.construction_found(*ty);
                    }
                }

                Op::CallStatic(target) | Op::CallInstance(target) => {
                    self.note_generic_args(target);
                    self.nonvirtual_method_reached(target.method);
                }

                Op::CallVirtual(target) => {
                    self.note_generic_args(target);

                    let narrowed = summary
                        .as_ref()
                        .and_then(|s| s.narrowed_targets(op_index))
                        .map(|targets| targets.to_vec());

                    if let Some(targets) = narrowed {
                        // The receiver's exact types are known; the usual
                        // constructed-subtype resolution would only add
                        // impossible targets.
                        for narrowed_target in targets {
                            self.nonvirtual_method_reached(narrowed_target);
                        }
                    } else if program.method(target.method).is_virtual {
                        self.note_virtual_dispatch(target.method);
                    } else {
                        // Loaders occasionally emit virtual-call encodings
                        // against non-virtual targets.
                        self.nonvirtual_method_reached(target.method);
                    }
                }

                Op::BindDelegate {
                    delegate_type,
                    target,
                    dispatch,
                } => {
                    self.construction_found(*delegate_type);
                    match dispatch {
                        crate::program::DelegateDispatch::Static
                        | crate::program::DelegateDispatch::NonVirtual => {
                            self.nonvirtual_method_reached(*target);
                        }
                        crate::program::DelegateDispatch::Virtual
                        | crate::program::DelegateDispatch::Interface => {
                            self.note_virtual_dispatch(*target);
                        }
                    }
                }

                Op::LoadField(field)
                | Op::StoreField(field)
                | Op::LoadStaticField(field)
                | Op::StoreStaticField(field) => {
                    self.type_use_found(program.field(*field).owner);
                    self.fields.insert(*field);
                }

                Op::Nop
                | Op::Const(_)
                | Op::LoadArg(_)
                | Op::StoreArg(_)
                | Op::LoadLocal(_)
                | Op::StoreLocal(_)
                | Op::LoadLocalAddr(_)
                | Op::Dup
                | Op::Pop
                | Op::Branch(_)
                | Op::BranchIf(_)
                | Op::Return
                | Op::Throw => {}
            }
        }
    }
}
