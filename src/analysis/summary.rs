use std::collections::HashMap;

use crate::program::MethodId;

/// Narrowed dispatch information for one method body
///
/// Maps virtual call sites (by op index) to the exact target set the flow
/// analysis proved for them. A site that is absent simply falls back to
/// full conservative resolution; an empty summary is a valid summary.
#[derive(Debug, Clone, Default)]
pub struct ReachabilitySummary {
    narrowed: HashMap<usize, Vec<MethodId>>,
}

impl ReachabilitySummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, op_index: usize, targets: Vec<MethodId>) {
        self.narrowed.insert(op_index, targets);
    }

    /// Proven targets for the call at `op_index`, if the site was narrowed
    pub fn narrowed_targets(&self, op_index: usize) -> Option<&[MethodId]> {
        self.narrowed.get(&op_index).map(|targets| &targets[..])
    }

    pub fn narrowed_site_count(&self) -> usize {
        self.narrowed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.narrowed.is_empty()
    }
}
