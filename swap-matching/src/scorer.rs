//! Candidate scoring
//!
//! Score = Σ(weight_i × sub_score_i) + noise × randomness
//!
//! The seven sub-scores are category similarity, geo proximity, exchange
//! compatibility, behavior affinity, freshness, condition and the
//! reciprocal boost written by the opportunity publisher.

use chrono::{DateTime, Utc};
use serde::Serialize;
use swap_core::{Category, Coordinates, ExplorationPolicy, Item, Policy, PolicyWeights};

use crate::config::MatchingConfig;
use crate::embedding::{average_embedding, embedding, CategoryEmbedding};
use crate::noise::NoiseSource;
use crate::similarity::{cosine_similarity, geo_score_between};

/// Everything about the source side that stays fixed across candidates
#[derive(Debug, Clone)]
pub struct ScoringContext<'a> {
    pub source: &'a Item,
    /// Owner's location, falling back to the source item's own
    pub owner_coordinates: Option<Coordinates>,
    pub now: DateTime<Utc>,
    source_embedding: CategoryEmbedding,
    desired_embedding: Option<CategoryEmbedding>,
    liked_embedding: Option<CategoryEmbedding>,
}

impl<'a> ScoringContext<'a> {
    /// Build a context from the source item and the categories of the items
    /// its owner has liked
    pub fn new(
        source: &'a Item,
        owner_coordinates: Option<Coordinates>,
        liked_categories: &[Category],
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            source,
            owner_coordinates: owner_coordinates.or(source.coordinates),
            now,
            source_embedding: embedding(source.category),
            desired_embedding: average_embedding(source.desired_categories.iter().copied()),
            liked_embedding: average_embedding(liked_categories.iter().copied()),
        }
    }
}

/// Individual sub-scores for one candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub category_similarity: f64,
    pub geo_score: f64,
    pub exchange_compatibility: f64,
    pub behavior_affinity: f64,
    pub freshness: f64,
    pub condition_score: f64,
    pub reciprocal_boost: f64,
}

impl ScoreBreakdown {
    /// Weighted sum without exploration noise
    pub fn weighted(&self, w: &PolicyWeights) -> f64 {
        self.category_similarity * w.category_similarity
            + self.geo_score * w.geo_score
            + self.exchange_compatibility * w.exchange_compatibility
            + self.behavior_affinity * w.behavior_affinity
            + self.freshness * w.freshness
            + self.condition_score * w.condition_score
            + self.reciprocal_boost * w.reciprocal_boost
    }
}

/// Weights for the expanded-search pass
///
/// Shifts weight toward reciprocal boost and learned behavior and away from
/// declared exchange compatibility, within the configured caps.
pub fn expanded_weights(weights: &PolicyWeights, config: &MatchingConfig) -> PolicyWeights {
    PolicyWeights {
        reciprocal_boost: (weights.reciprocal_boost + config.expanded_reciprocal_delta)
            .min(config.expanded_reciprocal_cap),
        behavior_affinity: (weights.behavior_affinity + config.expanded_behavior_delta)
            .min(config.expanded_behavior_cap),
        exchange_compatibility: (weights.exchange_compatibility - config.expanded_exchange_delta)
            .max(config.expanded_exchange_floor),
        ..*weights
    }
}

/// Scores candidates for one source item under one policy
pub struct CandidateScorer<'a> {
    weights: PolicyWeights,
    exploration: ExplorationPolicy,
    noise: &'a dyn NoiseSource,
}

impl<'a> CandidateScorer<'a> {
    pub fn new(policy: &Policy, noise: &'a dyn NoiseSource) -> Self {
        Self {
            weights: policy.weights,
            exploration: policy.exploration_policy,
            noise,
        }
    }

    /// Replace the policy weights for this scorer only
    pub fn with_weights(mut self, weights: PolicyWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Final rank score including exploration noise
    pub fn score(&self, ctx: &ScoringContext<'_>, candidate: &Item, candidate_swipes: u32) -> f64 {
        let breakdown = self.breakdown(ctx, candidate, candidate_swipes);
        breakdown.weighted(&self.weights) + self.noise.sample() * self.exploration.randomness
    }

    pub fn breakdown(
        &self,
        ctx: &ScoringContext<'_>,
        candidate: &Item,
        candidate_swipes: u32,
    ) -> ScoreBreakdown {
        let candidate_embedding = embedding(candidate.category);

        ScoreBreakdown {
            category_similarity: ctx
                .desired_embedding
                .map(|d| cosine_similarity(&d, &candidate_embedding))
                .unwrap_or(0.5),
            geo_score: geo_score_between(
                ctx.owner_coordinates.as_ref(),
                candidate.coordinates.as_ref(),
            ),
            exchange_compatibility: exchange_compatibility(ctx, candidate),
            behavior_affinity: ctx
                .liked_embedding
                .map(|l| cosine_similarity(&l, &candidate_embedding))
                .unwrap_or(0.5),
            freshness: self.freshness(candidate, candidate_swipes, ctx.now),
            condition_score: candidate.condition.quality(),
            reciprocal_boost: candidate.effective_boost(ctx.now),
        }
    }

    fn freshness(&self, candidate: &Item, candidate_swipes: u32, now: DateTime<Utc>) -> f64 {
        let age_days = candidate.age_days(now);
        let mut freshness = 1.0 / (1.0 + age_days);
        if candidate_swipes < self.exploration.cold_start_threshold_swipes {
            freshness += self.exploration.cold_start_boost;
        }
        if age_days > f64::from(self.exploration.stale_threshold_days) {
            freshness -= self.exploration.stale_item_penalty;
        }
        freshness
    }
}

fn exchange_compatibility(ctx: &ScoringContext<'_>, candidate: &Item) -> f64 {
    let candidate_wants_source = if candidate.wants(ctx.source.category) { 1.0 } else { 0.0 };
    let source_wants_candidate = if ctx.source.wants(candidate.category) { 1.0 } else { 0.0 };
    let taste_overlap = average_embedding(candidate.desired_categories.iter().copied())
        .map(|d| cosine_similarity(&ctx.source_embedding, &d))
        .unwrap_or(0.5);

    0.4 * candidate_wants_source + 0.4 * source_wants_candidate + 0.2 * taste_overlap
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::{SeededNoise, ZeroNoise};
    use chrono::Duration;
    use swap_core::Condition;

    fn source() -> Item {
        Item::new("I", "U", Category::Books)
            .with_desired([Category::Games])
            .with_coordinates(40.7128, -74.0060)
    }

    fn candidate(id: &str, lat: f64, lon: f64) -> Item {
        Item::new(id, "V", Category::Games)
            .with_desired([Category::Books])
            .with_condition(Condition::New)
            .with_coordinates(lat, lon)
    }

    #[test]
    fn test_nearby_candidate_beats_distant_one() {
        let now = Utc::now();
        let src = source();
        let ctx = ScoringContext::new(&src, src.coordinates, &[], now);
        let scorer = CandidateScorer::new(&Policy::default(), &ZeroNoise);

        // ~10 km north vs ~500 km north
        let j = candidate("J", 40.7128 + 0.09, -74.0060).with_created_at(now);
        let k = candidate("K", 40.7128 + 4.5, -74.0060).with_created_at(now);

        let sj = scorer.score(&ctx, &j, 0);
        let sk = scorer.score(&ctx, &k, 0);
        assert!(sj > sk, "near {} should beat far {}", sj, sk);
    }

    #[test]
    fn test_deterministic_without_noise() {
        let now = Utc::now();
        let src = source();
        let ctx = ScoringContext::new(&src, None, &[Category::Games, Category::Toys], now);
        let scorer = CandidateScorer::new(&Policy::default(), &ZeroNoise);
        let c = candidate("J", 41.0, -73.0);

        assert_eq!(scorer.score(&ctx, &c, 3), scorer.score(&ctx, &c, 3));
        assert_eq!(scorer.breakdown(&ctx, &c, 3), scorer.breakdown(&ctx, &c, 3));
    }

    #[test]
    fn test_noise_bounded_by_randomness() {
        let now = Utc::now();
        let src = source();
        let ctx = ScoringContext::new(&src, None, &[], now);
        let policy = Policy::default();
        let noise = SeededNoise::new(7);
        let noisy = CandidateScorer::new(&policy, &noise);
        let exact = CandidateScorer::new(&policy, &ZeroNoise);
        let c = candidate("J", 41.0, -73.0);

        let base = exact.score(&ctx, &c, 10);
        for _ in 0..20 {
            let s = noisy.score(&ctx, &c, 10);
            assert!(s >= base && s < base + policy.exploration_policy.randomness);
        }
    }

    #[test]
    fn test_neutral_defaults_without_history_or_preferences() {
        let now = Utc::now();
        let src = Item::new("I", "U", Category::Books);
        let ctx = ScoringContext::new(&src, None, &[], now);
        let scorer = CandidateScorer::new(&Policy::default(), &ZeroNoise);
        let c = Item::new("C", "V", Category::Games);

        let b = scorer.breakdown(&ctx, &c, 10);
        assert_eq!(b.category_similarity, 0.5);
        assert_eq!(b.geo_score, 0.5);
        assert_eq!(b.behavior_affinity, 0.5);
        // no crisp wants, neutral taste overlap
        assert!((b.exchange_compatibility - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_exchange_compatibility_mutual_want() {
        let now = Utc::now();
        let src = source();
        let ctx = ScoringContext::new(&src, None, &[], now);
        let scorer = CandidateScorer::new(&Policy::default(), &ZeroNoise);
        let c = candidate("J", 0.0, 0.0);

        let b = scorer.breakdown(&ctx, &c, 10);
        // candidate desires books, and the source is books: full taste overlap
        assert!((b.exchange_compatibility - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_freshness_cold_start_and_stale() {
        let now = Utc::now();
        let src = source();
        let ctx = ScoringContext::new(&src, None, &[], now);
        let policy = Policy::default();
        let scorer = CandidateScorer::new(&policy, &ZeroNoise);
        let exploration = policy.exploration_policy;

        let fresh = candidate("A", 0.0, 0.0).with_created_at(now);
        let b_cold = scorer.breakdown(&ctx, &fresh, 0);
        let b_warm = scorer.breakdown(&ctx, &fresh, 5);
        assert!((b_cold.freshness - (1.0 + exploration.cold_start_boost)).abs() < 1e-6);
        assert!((b_warm.freshness - 1.0).abs() < 1e-6);

        let stale = candidate("B", 0.0, 0.0).with_created_at(now - Duration::days(20));
        let b_stale = scorer.breakdown(&ctx, &stale, 5);
        let expected = 1.0 / 21.0 - exploration.stale_item_penalty;
        assert!((b_stale.freshness - expected).abs() < 1e-6);
    }

    #[test]
    fn test_expired_boost_ignored() {
        let now = Utc::now();
        let src = source();
        let ctx = ScoringContext::new(&src, None, &[], now);
        let scorer = CandidateScorer::new(&Policy::default(), &ZeroNoise);

        let mut c = candidate("J", 0.0, 0.0);
        c.reciprocal_boost = 0.4;
        c.boost_expires_at = Some(now + Duration::days(3));
        assert_eq!(scorer.breakdown(&ctx, &c, 0).reciprocal_boost, 0.4);

        c.boost_expires_at = Some(now - Duration::days(1));
        assert_eq!(scorer.breakdown(&ctx, &c, 0).reciprocal_boost, 0.0);
    }

    #[test]
    fn test_expanded_weights_respect_caps() {
        let config = MatchingConfig::default();
        let base = PolicyWeights::default();
        let expanded = expanded_weights(&base, &config);
        assert!((expanded.reciprocal_boost - 0.18).abs() < 1e-9);
        assert!((expanded.behavior_affinity - 0.20).abs() < 1e-9);
        assert!((expanded.exchange_compatibility - 0.17).abs() < 1e-9);
        assert_eq!(expanded.geo_score, base.geo_score);

        let saturated = PolicyWeights {
            reciprocal_boost: 0.24,
            behavior_affinity: 0.19,
            exchange_compatibility: 0.11,
            ..base
        };
        let expanded = expanded_weights(&saturated, &config);
        assert_eq!(expanded.reciprocal_boost, 0.25);
        assert_eq!(expanded.behavior_affinity, 0.20);
        assert_eq!(expanded.exchange_compatibility, 0.10);
    }
}
