//! Recommendation Session
//!
//! Ranks candidate items for one source item. The strict pool excludes
//! everything the source has already swiped, matched or dealt with. When it
//! holds fewer than `min_strict_pool` candidates the session silently widens
//! it by recycling old swipes and re-weighting; the caller only sees the
//! `searchExpanded` flag.
//!
//! Failures on the strict path degrade to a plain category filter instead of
//! failing the request. Only an unknown source item is surfaced.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use swap_core::{Category, Coordinates, Item, Policy, SwapError, SwapResult};
use swap_matching::{
    expanded_weights, CandidateScorer, MatchingConfig, NoiseSource, ScoringContext, ThreadNoise,
};
use tracing::{debug, info, instrument, warn};

use crate::policy_provider::{resolve_policy, PolicyProvider};
use crate::store::SwapStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    pub source_item_id: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub expanded_search: bool,
}

impl RecommendationRequest {
    pub fn new(source_item_id: impl Into<String>) -> Self {
        Self {
            source_item_id: source_item_id.into(),
            limit: None,
            expanded_search: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedItem {
    pub id: String,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationResponse {
    pub ranked_items: Vec<RankedItem>,
    /// Size of the pool that was scored
    pub total: usize,
    pub search_expanded: bool,
    pub policy_version: String,
}

impl RecommendationResponse {
    fn exhausted(policy: &Policy) -> Self {
        Self {
            ranked_items: Vec::new(),
            total: 0,
            search_expanded: true,
            policy_version: policy.policy_version.clone(),
        }
    }
}

/// Everything read from the store for one request
struct SessionData {
    owner_coordinates: Option<Coordinates>,
    liked_categories: Vec<Category>,
    /// Targets the source item has swiped on
    swiped: HashSet<String>,
    /// Matched or deal-linked items; never re-admitted
    locked: HashSet<String>,
    /// Listed items of other users
    candidates: Vec<Item>,
    swipe_counts: HashMap<String, u32>,
}

impl SessionData {
    fn strict_pool(&self) -> Vec<&Item> {
        self.candidates
            .iter()
            .filter(|c| !self.swiped.contains(&c.id) && !self.locked.contains(&c.id))
            .collect()
    }

    fn expanded_pool(&self, recycled: &HashSet<String>) -> Vec<&Item> {
        self.candidates
            .iter()
            .filter(|c| !self.locked.contains(&c.id))
            .filter(|c| !self.swiped.contains(&c.id) || recycled.contains(&c.id))
            .collect()
    }
}

/// Per-request ranking over the shared store
pub struct RecommendationService {
    store: Arc<SwapStore>,
    policies: Arc<dyn PolicyProvider>,
    noise: Arc<dyn NoiseSource>,
    config: MatchingConfig,
}

impl RecommendationService {
    pub fn new(store: Arc<SwapStore>, policies: Arc<dyn PolicyProvider>) -> Self {
        Self {
            store,
            policies,
            noise: Arc::new(ThreadNoise),
            config: MatchingConfig::default(),
        }
    }

    /// Replace the exploration noise source
    pub fn with_noise(mut self, noise: Arc<dyn NoiseSource>) -> Self {
        self.noise = noise;
        self
    }

    pub fn with_config(mut self, config: MatchingConfig) -> Self {
        self.config = config;
        self
    }

    /// Rank candidates for the request's source item
    #[instrument(skip(self, request), fields(source_item_id = %request.source_item_id))]
    pub fn recommend(&self, request: &RecommendationRequest) -> SwapResult<RecommendationResponse> {
        let source = self
            .store
            .get_item(&request.source_item_id)?
            .ok_or_else(|| SwapError::not_found(format!("Item {}", request.source_item_id)))?;

        let policy = resolve_policy(self.policies.as_ref());
        let limit = request.limit.unwrap_or(self.config.default_limit);
        let now = Utc::now();

        if request.expanded_search {
            let expanded = self
                .load_session(&source)
                .and_then(|session| self.expanded(&source, &session, &policy, limit, now));
            return Ok(expanded.unwrap_or_else(|e| {
                warn!("Expanded search failed, treating pool as exhausted: {}", e);
                RecommendationResponse::exhausted(&policy)
            }));
        }

        match self.strict(&source, &policy, limit, now) {
            Ok(response) => Ok(response),
            Err(e) => {
                warn!("Strict recommendation path failed, using fallback filter: {}", e);
                self.fallback(&source, &policy, limit)
            }
        }
    }

    fn load_session(&self, source: &Item) -> SwapResult<SessionData> {
        let owner_coordinates = self
            .store
            .get_profile(&source.owner_id)?
            .and_then(|p| p.coordinates);

        let swiped = self
            .store
            .swipes_from_item(&source.id)?
            .into_iter()
            .map(|s| s.target_item_id)
            .collect();

        let mut locked: HashSet<String> = self.store.matched_item_ids(&source.id)?.into_iter().collect();
        locked.extend(self.store.accepted_deal_item_ids(&source.id)?);

        Ok(SessionData {
            owner_coordinates,
            liked_categories: self.store.liked_categories_for_user(&source.owner_id)?,
            swiped,
            locked,
            candidates: self.store.listed_items_excluding_owner(&source.owner_id)?,
            swipe_counts: self.store.received_swipe_counts()?,
        })
    }

    fn strict(
        &self,
        source: &Item,
        policy: &Policy,
        limit: usize,
        now: DateTime<Utc>,
    ) -> SwapResult<RecommendationResponse> {
        let session = self.load_session(source)?;
        let pool = session.strict_pool();

        if pool.len() < self.config.min_strict_pool {
            info!(
                "Strict pool has {} candidates (< {}), expanding search",
                pool.len(),
                self.config.min_strict_pool
            );
            match self.expanded(source, &session, policy, limit, now) {
                Ok(response) => return Ok(response),
                Err(e) if pool.is_empty() => {
                    warn!("Expanded search failed on an empty pool: {}", e);
                    return Ok(RecommendationResponse::exhausted(policy));
                }
                Err(e) => warn!("Expanded search failed, keeping strict results: {}", e),
            }
        }

        let scorer = CandidateScorer::new(policy, self.noise.as_ref());
        Ok(RecommendationResponse {
            total: pool.len(),
            ranked_items: self.rank(source, &session, &scorer, pool, limit, now),
            search_expanded: false,
            policy_version: policy.policy_version.clone(),
        })
    }

    fn expanded(
        &self,
        source: &Item,
        session: &SessionData,
        policy: &Policy,
        limit: usize,
        now: DateTime<Utc>,
    ) -> SwapResult<RecommendationResponse> {
        let cutoff = now - Duration::days(self.config.recycle_window_days);
        let recycled: HashSet<String> = self
            .store
            .targets_swiped_before(&source.id, cutoff)?
            .into_iter()
            .collect();
        let pool = session.expanded_pool(&recycled);
        debug!("Expanded pool: {} candidates, {} recycled", pool.len(), recycled.len());

        let scorer = CandidateScorer::new(policy, self.noise.as_ref())
            .with_weights(expanded_weights(&policy.weights, &self.config));

        Ok(RecommendationResponse {
            total: pool.len(),
            ranked_items: self.rank(source, session, &scorer, pool, limit, now),
            search_expanded: true,
            policy_version: policy.policy_version.clone(),
        })
    }

    fn rank(
        &self,
        source: &Item,
        session: &SessionData,
        scorer: &CandidateScorer<'_>,
        pool: Vec<&Item>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Vec<RankedItem> {
        let ctx = ScoringContext::new(
            source,
            session.owner_coordinates,
            &session.liked_categories,
            now,
        );

        let mut ranked: Vec<RankedItem> = pool
            .into_iter()
            .map(|candidate| {
                let swipes = session.swipe_counts.get(&candidate.id).copied().unwrap_or(0);
                RankedItem {
                    id: candidate.id.clone(),
                    score: scorer.score(&ctx, candidate, swipes),
                }
            })
            .collect();

        sort_descending(&mut ranked);
        ranked.truncate(limit);
        ranked
    }

    /// Degraded mode: declared-preference intersection only
    fn fallback(
        &self,
        source: &Item,
        policy: &Policy,
        limit: usize,
    ) -> SwapResult<RecommendationResponse> {
        let candidates = self.store.listed_items_excluding_owner(&source.owner_id)?;

        let mut ranked: Vec<RankedItem> = candidates
            .iter()
            .filter_map(|candidate| {
                let score = fallback_score(source, candidate);
                (score > 0.0).then(|| RankedItem {
                    id: candidate.id.clone(),
                    score,
                })
            })
            .collect();

        let total = ranked.len();
        sort_descending(&mut ranked);
        ranked.truncate(limit);

        Ok(RecommendationResponse {
            ranked_items: ranked,
            total,
            search_expanded: false,
            policy_version: policy.policy_version.clone(),
        })
    }
}

fn fallback_score(source: &Item, candidate: &Item) -> f64 {
    let mut score = 0.0;
    if source.wants(candidate.category) {
        score += 0.5;
    }
    if candidate.wants(source.category) {
        score += 0.5;
    }
    score
}

fn sort_descending(ranked: &mut [RankedItem]) {
    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
