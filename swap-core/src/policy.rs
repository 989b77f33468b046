//! Ranking policy supplied by the policy-administration collaborator
//!
//! A policy is read-only to the engine. When no active policy can be read
//! the engine uses [`Policy::default`], tagged with [`DEFAULT_POLICY_VERSION`].

use serde::{Deserialize, Serialize};

/// Version tag reported when the built-in defaults are in use
pub const DEFAULT_POLICY_VERSION: &str = "default";

/// Longest boost lifetime a policy may request
pub const MAX_BOOST_TTL_DAYS: u32 = 3650;

/// Coefficients for the seven candidate sub-scores
///
/// The weights are not required to sum to 1.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyWeights {
    pub category_similarity: f64,
    pub geo_score: f64,
    pub exchange_compatibility: f64,
    pub behavior_affinity: f64,
    pub freshness: f64,
    pub condition_score: f64,
    pub reciprocal_boost: f64,
}

impl Default for PolicyWeights {
    fn default() -> Self {
        Self {
            category_similarity: 0.25,
            geo_score: 0.15,
            exchange_compatibility: 0.20,
            behavior_affinity: 0.15,
            freshness: 0.10,
            condition_score: 0.05,
            reciprocal_boost: 0.10,
        }
    }
}

impl PolicyWeights {
    fn values(&self) -> [f64; 7] {
        [
            self.category_similarity,
            self.geo_score,
            self.exchange_compatibility,
            self.behavior_affinity,
            self.freshness,
            self.condition_score,
            self.reciprocal_boost,
        ]
    }
}

/// Exploration and freshness adjustments
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExplorationPolicy {
    /// Magnitude of the uniform noise added to every score
    pub randomness: f64,
    /// Added to freshness for items with few swipes
    pub cold_start_boost: f64,
    /// Subtracted from freshness for old items
    pub stale_item_penalty: f64,
    pub cold_start_threshold_swipes: u32,
    pub stale_threshold_days: u32,
}

impl Default for ExplorationPolicy {
    fn default() -> Self {
        Self {
            randomness: 0.1,
            cold_start_boost: 0.15,
            stale_item_penalty: 0.1,
            cold_start_threshold_swipes: 5,
            stale_threshold_days: 14,
        }
    }
}

/// How strongly detected opportunities feed back into ranking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReciprocalPriority {
    Low,
    Normal,
    High,
}

impl Default for ReciprocalPriority {
    fn default() -> Self {
        ReciprocalPriority::Normal
    }
}

impl ReciprocalPriority {
    /// Scale applied to opportunity scores before the boost cap
    pub fn multiplier(&self) -> f64 {
        match self {
            ReciprocalPriority::Low => 0.5,
            ReciprocalPriority::Normal => 1.0,
            ReciprocalPriority::High => 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReciprocalPolicy {
    pub priority: ReciprocalPriority,
    /// Ceiling for any item's reciprocal boost
    pub boost_cap: f64,
    /// Lifetime of a boost written by the publisher
    pub boost_ttl_days: u32,
}

impl Default for ReciprocalPolicy {
    fn default() -> Self {
        Self {
            priority: ReciprocalPriority::Normal,
            boost_cap: 0.5,
            boost_ttl_days: 7,
        }
    }
}

/// Versioned ranking policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    pub policy_version: String,
    #[serde(default)]
    pub weights: PolicyWeights,
    #[serde(default)]
    pub exploration_policy: ExplorationPolicy,
    #[serde(default)]
    pub reciprocal_policy: ReciprocalPolicy,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            policy_version: DEFAULT_POLICY_VERSION.to_string(),
            weights: PolicyWeights::default(),
            exploration_policy: ExplorationPolicy::default(),
            reciprocal_policy: ReciprocalPolicy::default(),
        }
    }
}

impl Policy {
    /// Check the numeric invariants a usable policy must satisfy
    pub fn validate(&self) -> Result<(), String> {
        if self.policy_version.trim().is_empty() {
            return Err("policy version is empty".to_string());
        }
        if self
            .weights
            .values()
            .iter()
            .any(|w| !w.is_finite() || *w < 0.0)
        {
            return Err("weights must be finite and non-negative".to_string());
        }
        let exploration = &self.exploration_policy;
        for (name, value) in [
            ("randomness", exploration.randomness),
            ("coldStartBoost", exploration.cold_start_boost),
            ("staleItemPenalty", exploration.stale_item_penalty),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{} must be finite and non-negative", name));
            }
        }
        let cap = self.reciprocal_policy.boost_cap;
        if !cap.is_finite() || !(0.0..=1.0).contains(&cap) {
            return Err("boostCap must be within [0, 1]".to_string());
        }
        let ttl = self.reciprocal_policy.boost_ttl_days;
        if !(1..=MAX_BOOST_TTL_DAYS).contains(&ttl) {
            return Err(format!("boostTtlDays must be within [1, {}]", MAX_BOOST_TTL_DAYS));
        }
        Ok(())
    }

    pub fn is_default(&self) -> bool {
        self.policy_version == DEFAULT_POLICY_VERSION
    }
}
