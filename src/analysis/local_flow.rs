//! Intraprocedural type-flow summarization.
//!
//! Tracks, per argument, local, and operand-stack slot, the set of exact
//! runtime types a value can hold, and uses it to pin virtual call sites
//! to their real targets before the reachability engine falls back to
//! whole-hierarchy resolution.

use std::collections::{BTreeSet, HashMap, VecDeque};

use tracing::trace;

use super::summary::ReachabilitySummary;
use crate::program::{MethodDef, MethodId, Op, ParamType, TypeId, WholeProgram};
use crate::resolve::OverrideResolver;

/// Abstract value of one slot
///
/// `Exact` holds the set of runtime types the value can have; the join of
/// two exact values is the union of their sets. Any path on which the type
/// is not exactly known poisons the join to `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FlowValue {
    Unknown,
    Exact(BTreeSet<TypeId>),
}

impl FlowValue {
    fn exact(ty: TypeId) -> Self {
        let mut types = BTreeSet::new();
        types.insert(ty);
        FlowValue::Exact(types)
    }

    fn join(&self, other: &FlowValue) -> FlowValue {
        match (self, other) {
            (FlowValue::Exact(a), FlowValue::Exact(b)) => {
                FlowValue::Exact(a.union(b).copied().collect())
            }
            _ => FlowValue::Unknown,
        }
    }
}

/// Abstract machine state: arguments, locals, and the operand stack
#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    args: Vec<FlowValue>,
    locals: Vec<FlowValue>,
    stack: Vec<FlowValue>,
}

impl Frame {
    fn push(&mut self, value: FlowValue) {
        self.stack.push(value);
    }

    fn pop(&mut self) -> FlowValue {
        self.stack.pop().unwrap_or(FlowValue::Unknown)
    }

    fn pop_n(&mut self, count: usize) {
        for _ in 0..count {
            self.pop();
        }
    }

    fn join(&self, other: &Frame) -> Frame {
        let join_slots = |lhs: &[FlowValue], rhs: &[FlowValue]| -> Vec<FlowValue> {
            lhs.iter().zip(rhs).map(|(a, b)| a.join(b)).collect()
        };
        Frame {
            args: join_slots(&self.args, &other.args),
            locals: join_slots(&self.locals, &other.locals),
            stack: join_slots(&self.stack, &other.stack),
        }
    }
}

/// A run of ops with single entry, ending at a branch or terminator
#[derive(Debug)]
struct Block {
    start: usize,
    end: usize,
    successors: Vec<usize>,
}

/// Per-method flow summarizer producing narrowed virtual-dispatch targets
#[derive(Debug, Clone, Copy)]
pub struct LocalFlowSummarizer<'p> {
    program: &'p WholeProgram,
    resolver: OverrideResolver<'p>,
}

impl<'p> LocalFlowSummarizer<'p> {
    pub fn new(program: &'p WholeProgram) -> Self {
        Self {
            program,
            resolver: OverrideResolver::new(program),
        }
    }

    /// Cheap, conservative precheck. Declining is not an error; the engine
    /// keeps its sound fallback for every declined method.
    pub fn can_summarize(&self, method: MethodId) -> bool {
        let def = self.program.method(method);
        if def.is_abstract {
            return false;
        }
        let Some(body) = &def.body else {
            return false;
        };

        // Address-taken locals can be written through the alias, and
        // handler entry states are not modeled at all.
        if body.has_exception_handlers {
            return false;
        }
        if body.ops.iter().any(|op| matches!(op, Op::LoadLocalAddr(_))) {
            return false;
        }

        true
    }

    /// Run the flow analysis and narrow every virtual call site whose
    /// receiver has a known exact-type set
    pub fn summarize(&self, method: MethodId) -> ReachabilitySummary {
        let program = self.program;
        let def = program.method(method);
        let mut summary = ReachabilitySummary::new();

        let Some(body) = &def.body else {
            return summary;
        };
        if body.ops.is_empty() {
            return summary;
        }

        let blocks = build_blocks(&body.ops);
        let mut predecessors: Vec<Vec<usize>> = vec![Vec::new(); blocks.len()];
        for (index, block) in blocks.iter().enumerate() {
            for &successor in &block.successors {
                predecessors[successor].push(index);
            }
        }

        let mut post_states: Vec<Option<Frame>> = (0..blocks.len()).map(|_| None).collect();
        let mut receivers: HashMap<usize, FlowValue> = HashMap::new();

        let mut worklist: VecDeque<usize> = VecDeque::new();
        worklist.push_back(0);

        while let Some(index) = worklist.pop_front() {
            let pre_state = if index == 0 {
                Some(self.entry_frame(def))
            } else {
                predecessors[index]
                    .iter()
                    .filter_map(|&pred| post_states[pred].clone())
                    .reduce(|a, b| a.join(&b))
            };
            // Blocks with no reached predecessor yet come back once one is.
            let Some(mut frame) = pre_state else {
                continue;
            };

            let block = &blocks[index];
            for op_index in block.start..block.end {
                let op = &body.ops[op_index];
                if let Op::CallVirtual(target) = op {
                    let param_count = program.method(target.method).params.len();
                    let receiver_slot = frame.stack.len().checked_sub(param_count + 1);
                    let receiver = receiver_slot
                        .and_then(|slot| frame.stack.get(slot).cloned())
                        .unwrap_or(FlowValue::Unknown);
                    receivers.insert(op_index, receiver);
                }
                self.interpret(&mut frame, op, def);
            }

            if post_states[index].as_ref() != Some(&frame) {
                post_states[index] = Some(frame);
                for &successor in &block.successors {
                    worklist.push_back(successor);
                }
            }
        }

        // Resolve every exactly known receiver against its declared method.
        for (op_index, receiver) in receivers {
            let FlowValue::Exact(types) = receiver else {
                continue;
            };
            let Op::CallVirtual(target) = &body.ops[op_index] else {
                continue;
            };
            let declared = target.method;
            let upper_bound = program.method(declared).owner;

            let mut resolved: BTreeSet<MethodId> = BTreeSet::new();
            let mut complete = !types.is_empty();
            for &runtime_type in &types {
                if program.type_def(runtime_type).is_interface() {
                    complete = false;
                    break;
                }
                let targets = self.resolver.implements(runtime_type, upper_bound, declared);
                if targets.is_empty() {
                    complete = false;
                    break;
                }
                resolved.extend(targets);
            }

            if complete {
                trace!(
                    "narrowed call to {} at op {} to {} target(s)",
                    program.method(declared).name,
                    op_index,
                    resolved.len()
                );
                summary.record(op_index, resolved.into_iter().collect());
            }
        }

        summary
    }

    /// Entry state: arguments get their declared types (exact only when the
    /// declaration admits a single runtime type), locals start unknown
    fn entry_frame(&self, def: &MethodDef) -> Frame {
        let mut args = Vec::new();
        if !def.is_static {
            args.push(self.value_for_type(def.owner));
        }
        for param in &def.params {
            args.push(self.value_for_declared(param));
        }

        let locals = def
            .body
            .as_ref()
            .map(|body| body.locals.iter().map(|_| FlowValue::Unknown).collect())
            .unwrap_or_default();

        Frame {
            args,
            locals,
            stack: Vec::new(),
        }
    }

    fn value_for_declared(&self, ty: &ParamType) -> FlowValue {
        match ty {
            ParamType::Concrete(t) => self.value_for_type(*t),
            ParamType::TypeParam(_) => FlowValue::Unknown,
        }
    }

    fn value_for_type(&self, ty: TypeId) -> FlowValue {
        if self.program.type_def(ty).is_exact_by_declaration() {
            FlowValue::exact(ty)
        } else {
            FlowValue::Unknown
        }
    }

    fn value_for_return(&self, callee: MethodId) -> Option<FlowValue> {
        self.program
            .method(callee)
            .return_type
            .as_ref()
            .map(|ty| self.value_for_declared(ty))
    }

    fn interpret(&self, frame: &mut Frame, op: &Op, def: &MethodDef) {
        let program = self.program;

        match op {
            Op::Nop | Op::Branch(_) => {}

            Op::Const(ty) => {
                let value = ty.map(|t| self.value_for_type(t)).unwrap_or(FlowValue::Unknown);
                frame.push(value);
            }

            Op::LoadArg(index) => {
                let value = frame
                    .args
                    .get(*index as usize)
                    .cloned()
                    .unwrap_or(FlowValue::Unknown);
                frame.push(value);
            }
            Op::StoreArg(index) => {
                let value = frame.pop();
                if let Some(slot) = frame.args.get_mut(*index as usize) {
                    *slot = value;
                }
            }
            Op::LoadLocal(index) => {
                let value = frame
                    .locals
                    .get(*index as usize)
                    .cloned()
                    .unwrap_or(FlowValue::Unknown);
                frame.push(value);
            }
            Op::StoreLocal(index) => {
                let value = frame.pop();
                if let Some(slot) = frame.locals.get_mut(*index as usize) {
                    *slot = value;
                }
            }
            Op::LoadLocalAddr(_) => frame.push(FlowValue::Unknown),

            Op::Dup => {
                let value = frame.pop();
                frame.push(value.clone());
                frame.push(value);
            }
            Op::Pop => {
                frame.pop();
            }

            Op::New(target) => {
                let ctor = program.method(target.method);
                frame.pop_n(ctor.params.len());
                frame.push(FlowValue::exact(ctor.owner));
            }
            Op::NewGeneric { .. } => frame.push(FlowValue::Unknown),
            Op::Box(ty) => {
                frame.pop();
                frame.push(FlowValue::exact(*ty));
            }

            Op::CallStatic(target) => {
                frame.pop_n(program.method(target.method).params.len());
                if let Some(value) = self.value_for_return(target.method) {
                    frame.push(value);
                }
            }
            Op::CallInstance(target) | Op::CallVirtual(target) => {
                frame.pop_n(program.method(target.method).params.len() + 1);
                if let Some(value) = self.value_for_return(target.method) {
                    frame.push(value);
                }
            }

            Op::BindDelegate {
                delegate_type,
                dispatch,
                ..
            } => {
                if *dispatch != crate::program::DelegateDispatch::Static {
                    frame.pop();
                }
                frame.push(FlowValue::exact(*delegate_type));
            }

            Op::LoadField(field) => {
                frame.pop();
                frame.push(self.value_for_declared(&program.field(*field).ty));
            }
            Op::LoadStaticField(field) => {
                frame.push(self.value_for_declared(&program.field(*field).ty));
            }
            Op::StoreField(_) => frame.pop_n(2),
            Op::StoreStaticField(_) => {
                frame.pop();
            }

            Op::BranchIf(_) | Op::Throw => {
                frame.pop();
            }
            Op::Return => {
                if def.return_type.is_some() {
                    frame.pop();
                }
            }
        }
    }
}

/// Split an op stream into basic blocks with successor edges
fn build_blocks(ops: &[Op]) -> Vec<Block> {
    let mut leaders: BTreeSet<usize> = BTreeSet::new();
    leaders.insert(0);
    for (index, op) in ops.iter().enumerate() {
        if let Some(target) = op.branch_target() {
            leaders.insert(target as usize);
        }
        if (op.is_terminator() || matches!(op, Op::BranchIf(_))) && index + 1 < ops.len() {
            leaders.insert(index + 1);
        }
    }
    leaders.retain(|&start| start < ops.len());

    let starts: Vec<usize> = leaders.iter().copied().collect();
    let block_of: HashMap<usize, usize> = starts
        .iter()
        .enumerate()
        .map(|(block, &start)| (start, block))
        .collect();

    starts
        .iter()
        .enumerate()
        .map(|(index, &start)| {
            let end = starts.get(index + 1).copied().unwrap_or(ops.len());
            let last = &ops[end - 1];

            let mut successors = Vec::new();
            if let Some(target) = last.branch_target() {
                if let Some(&block) = block_of.get(&(target as usize)) {
                    successors.push(block);
                }
            }
            let falls_through = !last.is_terminator();
            if falls_through && end < ops.len() {
                if let Some(&block) = block_of.get(&end) {
                    successors.push(block);
                }
            }

            Block {
                start,
                end,
                successors,
            }
        })
        .collect()
}
