//! Tunable thresholds and retention caps

use serde::{Deserialize, Serialize};

/// Engine-level knobs that are not part of the ranking policy
///
/// The defaults are the values the ranking and batch behavior is
/// calibrated against.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    /// Minimum pairwise score for a directed edge to close a 3-way cycle
    pub edge_admission_threshold: f64,
    /// Strict pools smaller than this trigger the expanded search
    pub min_strict_pool: usize,
    /// Swipes older than this many days may be recycled by the expanded search
    pub recycle_window_days: i64,
    /// Two-way opportunities kept per batch run
    pub max_two_way: usize,
    /// Cycle search stops after this many distinct cycles
    pub cycle_search_cap: usize,
    /// Three-way cycles kept after sorting
    pub max_three_way: usize,
    /// Active items read by one batch run
    pub max_active_items: usize,
    /// Swipe rows read by one batch run
    pub max_swipes: usize,
    pub opportunity_ttl_days: i64,
    /// Limit applied when a recommendation request omits one
    pub default_limit: usize,
    pub expanded_reciprocal_delta: f64,
    pub expanded_reciprocal_cap: f64,
    pub expanded_behavior_delta: f64,
    pub expanded_behavior_cap: f64,
    pub expanded_exchange_delta: f64,
    pub expanded_exchange_floor: f64,
    /// Skip user pairs with no cross-category preference overlap
    pub prune_disjoint_pairs: bool,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            edge_admission_threshold: 0.3,
            min_strict_pool: 5,
            recycle_window_days: 7,
            max_two_way: 50,
            cycle_search_cap: 20,
            max_three_way: 10,
            max_active_items: 1000,
            max_swipes: 10_000,
            opportunity_ttl_days: 7,
            default_limit: 50,
            expanded_reciprocal_delta: 0.08,
            expanded_reciprocal_cap: 0.25,
            expanded_behavior_delta: 0.05,
            expanded_behavior_cap: 0.20,
            expanded_exchange_delta: 0.03,
            expanded_exchange_floor: 0.10,
            prune_disjoint_pairs: false,
        }
    }
}
