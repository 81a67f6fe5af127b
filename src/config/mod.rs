//! Configuration for the projection engine.

/// Where parent-chain results remain visible after resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainResults {
    /// Results are appended to the parent and also stay on the child order
    #[default]
    ParentAndChild,
    /// Results are moved to the parent; the child's collection is emptied
    ParentOnly,
}

/// Configuration for the `SubjectProjector`
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Run in verifying mode: undeclared column reads and manifest drift
    /// become errors instead of flagged diagnostics
    pub verification: bool,
    /// Visibility policy for results pulled up a parent-order chain
    pub chain_results: ChainResults,
    /// Upper bound on parent-chain depth before the walk is abandoned
    pub max_chain_depth: usize,
    /// Emit heuristic same-day/provider history links alongside the graph
    pub heuristic_history_links: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verification: false,
            chain_results: ChainResults::default(),
            max_chain_depth: 16,
            heuristic_history_links: true,
        }
    }
}

impl EngineConfig {
    /// Configuration for a verification run
    #[must_use]
    pub fn verifying() -> Self {
        Self {
            verification: true,
            ..Self::default()
        }
    }
}
