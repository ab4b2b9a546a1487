//! treeshake - Whole-program reachability analysis for compiled binaries
//!
//! This library computes the set of methods, fields, and types reachable
//! from a given set of entry points in a compiled object-oriented program,
//! as the basis for dead-code elimination (tree shaking) by a downstream
//! stripping tool.
//!
//! # Architecture
//!
//! The analysis pipeline consists of:
//! 1. **Program Model** - Handle-indexed types, methods, fields, and bodies
//! 2. **Class Hierarchy** - Subtype DAG over unbound type definitions
//! 3. **Override Resolution** - Declared method to implementation sets
//! 4. **Local Type Flow** - Per-method exact-type narrowing of call sites
//! 5. **Rapid Type Analysis** - Fixed-point reachability over entry points
//! 6. **Reporting** - Reachable/unreachable partition per module

pub mod analysis;
pub mod config;
pub mod hierarchy;
pub mod program;
pub mod report;
pub mod resolve;

pub use analysis::{
    EntryPointResolver, LocalFlowSummarizer, RapidTypeAnalysis, ReachabilitySummary,
    ResolvedEntryPoints,
};
pub use config::Config;
pub use hierarchy::ClassHierarchy;
pub use program::{
    FieldId, MethodId, MethodSpec, ModuleId, ProgramBuilder, TargetProfile, TypeId, WholeProgram,
};
pub use report::{ModuleReport, Reporter, ReportFormat};
pub use resolve::OverrideResolver;
