//! Maintenance passes: prune the consolidated store, then consolidate the
//! recency window.

pub mod consolidation;
pub mod pruning;

pub use consolidation::{ConsolidationReport, Consolidator};
pub use pruning::{PruneReport, Pruner};

/// Outcome of one maintenance pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaintenanceReport {
    pub prune: PruneReport,
    /// `None` when L2 was below the consolidation threshold
    pub consolidation: Option<ConsolidationReport>,
}

impl MaintenanceReport {
    /// Whether the pass changed any tier membership
    pub fn changed(&self) -> bool {
        !self.prune.pruned.is_empty() || self.consolidation.is_some()
    }
}
