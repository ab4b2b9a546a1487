mod entry_points;
mod local_flow;
mod rta;
mod summary;

pub use entry_points::{EntryPointResolver, ResolvedEntryPoints};
pub use local_flow::LocalFlowSummarizer;
pub use rta::{ConstructedTypeParam, RapidTypeAnalysis};
pub use summary::ReachabilitySummary;
