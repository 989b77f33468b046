//! Batch exchange optimization
//!
//! Pipeline: load capped inputs, learn affinities, score every user pair,
//! keep the best 2-way swaps, search 3-way cycles, publish.
//!
//! Only one run may be in flight per optimizer. A second caller gets
//! `SwapError::BatchInProgress` rather than queueing behind the first.

use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use swap_core::{
    CycleType, Item, Participant, SwapError, SwapOpportunity, SwapResult, SwipeRecord,
};
use swap_matching::{
    detect_three_way, edges_from_pairs, learn_user_affinity, score_all_pairs, MatchingConfig,
    PairScore, ThreeWayCycle, Trader,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::policy_provider::{resolve_policy, PolicyProvider};
use crate::publisher::OpportunityPublisher;
use crate::store::SwapStore;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub users_processed: usize,
    pub two_way_opportunities: usize,
    pub three_way_cycles: usize,
    pub items_boosted: usize,
}

/// A completed run, kept for health reporting
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub stats: BatchStats,
    pub policy_version: String,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: i64,
}

pub struct BatchOptimizer {
    store: Arc<SwapStore>,
    policies: Arc<dyn PolicyProvider>,
    publisher: OpportunityPublisher,
    config: MatchingConfig,
    running: Mutex<()>,
    last_report: RwLock<Option<BatchReport>>,
}

impl BatchOptimizer {
    pub fn new(store: Arc<SwapStore>, policies: Arc<dyn PolicyProvider>) -> Self {
        Self {
            publisher: OpportunityPublisher::new(store.clone()),
            store,
            policies,
            config: MatchingConfig::default(),
            running: Mutex::new(()),
            last_report: RwLock::new(None),
        }
    }

    pub fn with_config(mut self, config: MatchingConfig) -> Self {
        self.config = config;
        self
    }

    /// Most recent successful run, if any
    pub fn last_report(&self) -> Option<BatchReport> {
        self.last_report.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_locked()
    }

    /// Run the full pipeline once
    #[instrument(skip(self))]
    pub fn run(&self) -> SwapResult<BatchStats> {
        let _guard = self.running.try_lock().ok_or(SwapError::BatchInProgress)?;

        let started = Utc::now();
        let policy = resolve_policy(self.policies.as_ref());
        let (items, swipes) = self.load_inputs()?;

        // Group by owner in first-seen order; this order is the arena index
        let mut by_owner: IndexMap<&str, Vec<&Item>> = IndexMap::new();
        for item in &items {
            by_owner.entry(item.owner_id.as_str()).or_default().push(item);
        }

        let mut by_user: HashMap<&str, Vec<&SwipeRecord>> = HashMap::new();
        for record in &swipes {
            by_user.entry(record.user_id.as_str()).or_default().push(record);
        }

        let traders: Vec<Trader<'_>> = by_owner
            .into_iter()
            .map(|(user_id, owned)| {
                let history = by_user.get(user_id).into_iter().flatten().copied();
                let affinity = learn_user_affinity(user_id, history, started);
                if let Err(e) = self.store.save_affinity(&affinity) {
                    warn!("Failed to save affinities for {}: {}", user_id, e);
                }
                Trader::new(user_id, owned, affinity)
            })
            .collect();

        let mut pairs = score_all_pairs(&traders, &self.config);
        let edges = edges_from_pairs(&pairs);
        let cycles = detect_three_way(traders.len(), &edges, &self.config);

        sort_pairs(&mut pairs);
        pairs.truncate(self.config.max_two_way);

        let ttl = Duration::days(self.config.opportunity_ttl_days);
        let mut opportunities: Vec<SwapOpportunity> = pairs
            .iter()
            .map(|pair| two_way_opportunity(&traders, pair, started, ttl))
            .collect();
        opportunities.extend(
            cycles
                .iter()
                .map(|cycle| three_way_opportunity(&traders, cycle, started, ttl)),
        );

        let published = self
            .publisher
            .publish(&opportunities, &policy.reciprocal_policy, started)?;

        let stats = BatchStats {
            users_processed: traders.len(),
            two_way_opportunities: pairs.len(),
            three_way_cycles: cycles.len(),
            items_boosted: published.items_boosted,
        };

        let completed_at = Utc::now();
        info!(
            users = stats.users_processed,
            two_way = stats.two_way_opportunities,
            three_way = stats.three_way_cycles,
            boosted = stats.items_boosted,
            "Batch optimization complete"
        );

        *self.last_report.write() = Some(BatchReport {
            stats: stats.clone(),
            policy_version: policy.policy_version,
            completed_at,
            duration_ms: (completed_at - started).num_milliseconds(),
        });

        Ok(stats)
    }

    /// Listed items and swipe history, truncated to the configured caps
    fn load_inputs(&self) -> SwapResult<(Vec<Item>, Vec<SwipeRecord>)> {
        let item_total = self.store.count_listed_items()?;
        if item_total > self.config.max_active_items {
            warn!(
                "{} active items exceed the cap of {}, truncating to newest",
                item_total, self.config.max_active_items
            );
        }
        let items = self.store.load_listed_items(self.config.max_active_items)?;

        let swipe_total = self.store.count_swipes()?;
        if swipe_total > self.config.max_swipes {
            warn!(
                "{} swipes exceed the cap of {}, truncating to newest",
                swipe_total, self.config.max_swipes
            );
        }
        let swipes = self.store.load_swipe_records(self.config.max_swipes)?;

        Ok((items, swipes))
    }
}

fn sort_pairs(pairs: &mut [PairScore<'_>]) {
    pairs.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

fn two_way_opportunity(
    traders: &[Trader<'_>],
    pair: &PairScore<'_>,
    now: DateTime<Utc>,
    ttl: Duration,
) -> SwapOpportunity {
    SwapOpportunity::new(
        Uuid::new_v4().to_string(),
        CycleType::TwoWay,
        vec![
            Participant::new(traders[pair.user_a].user_id, pair.item_a.id.as_str()),
            Participant::new(traders[pair.user_b].user_id, pair.item_b.id.as_str()),
        ],
        pair.score,
        now,
        ttl,
    )
}

fn three_way_opportunity(
    traders: &[Trader<'_>],
    cycle: &ThreeWayCycle<'_>,
    now: DateTime<Utc>,
    ttl: Duration,
) -> SwapOpportunity {
    let participants = cycle
        .users
        .iter()
        .zip(cycle.offered.iter())
        .map(|(&user, item)| Participant::new(traders[user].user_id, item.id.as_str()))
        .collect();

    SwapOpportunity::new(
        Uuid::new_v4().to_string(),
        CycleType::ThreeWay,
        participants,
        cycle.score,
        now,
        ttl,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy_provider::StaticPolicy;
    use swap_core::{Category, Swipe};

    fn optimizer(store: &Arc<SwapStore>) -> BatchOptimizer {
        BatchOptimizer::new(store.clone(), Arc::new(StaticPolicy(None)))
    }

    #[test]
    fn test_empty_store_runs_cleanly() {
        let store = Arc::new(SwapStore::new_in_memory().unwrap());
        let optimizer = optimizer(&store);
        assert!(optimizer.last_report().is_none());

        let stats = optimizer.run().unwrap();
        assert_eq!(stats, BatchStats::default());
        assert!(optimizer.last_report().is_some());
        assert!(!optimizer.is_running());
    }

    #[test]
    fn test_concurrent_run_rejected() {
        let store = Arc::new(SwapStore::new_in_memory().unwrap());
        let optimizer = optimizer(&store);

        let _held = optimizer.running.lock();
        assert!(matches!(optimizer.run(), Err(SwapError::BatchInProgress)));
    }

    #[test]
    fn test_affinities_saved_for_each_owner() {
        let store = Arc::new(SwapStore::new_in_memory().unwrap());
        store
            .upsert_item(&Item::new("a1", "alice", Category::Books).with_desired([Category::Games]))
            .unwrap();
        store
            .upsert_item(&Item::new("b1", "bob", Category::Games).with_desired([Category::Books]))
            .unwrap();
        store.record_swipe(&Swipe::new("a1", "b1", true)).unwrap();

        optimizer(&store).run().unwrap();

        let alice = store.get_affinity("alice").unwrap().unwrap();
        assert_eq!(alice.weight(Category::Games), 1.0);
        let bob = store.get_affinity("bob").unwrap().unwrap();
        assert!(bob.affinities.is_empty());
    }

    #[test]
    fn test_item_cap_truncates_instead_of_failing() {
        let store = Arc::new(SwapStore::new_in_memory().unwrap());
        for i in 0..6 {
            store
                .upsert_item(&Item::new(format!("i{}", i), format!("u{}", i), Category::Other))
                .unwrap();
        }
        let config = MatchingConfig {
            max_active_items: 3,
            ..MatchingConfig::default()
        };

        let stats = optimizer(&store).with_config(config).run().unwrap();
        assert_eq!(stats.users_processed, 3);
        // undeclared floor only: 0.1 * 0.1 per pair
        assert_eq!(stats.two_way_opportunities, 3);
        assert_eq!(stats.three_way_cycles, 0);
    }

    #[test]
    fn test_swipe_cap_keeps_newest_history() {
        let store = Arc::new(SwapStore::new_in_memory().unwrap());
        for (id, owner, category) in [
            ("a1", "alice", Category::Books),
            ("b1", "bob", Category::Games),
            ("c1", "carol", Category::Music),
            ("d1", "dave", Category::Toys),
        ] {
            store.upsert_item(&Item::new(id, owner, category)).unwrap();
        }
        let now = Utc::now();
        store
            .record_swipe(&Swipe::new("a1", "b1", true).at(now - Duration::days(30)))
            .unwrap();
        store
            .record_swipe(&Swipe::new("a1", "c1", true).at(now - Duration::days(1)))
            .unwrap();
        store.record_swipe(&Swipe::new("a1", "d1", false).at(now)).unwrap();

        let config = MatchingConfig {
            max_swipes: 2,
            ..MatchingConfig::default()
        };
        let stats = optimizer(&store).with_config(config).run().unwrap();
        assert_eq!(stats.users_processed, 4);

        let alice = store.get_affinity("alice").unwrap().unwrap();
        assert_eq!(alice.affinities.len(), 2);
        assert!(!alice.affinities.contains_key(&Category::Games));
        assert_eq!(alice.weight(Category::Music), 1.0);
        assert_eq!(alice.weight(Category::Toys), 0.25);
    }

    #[test]
    fn test_unbounded_boost_ttl_falls_back_to_defaults() {
        let store = Arc::new(SwapStore::new_in_memory().unwrap());
        store
            .upsert_item(&Item::new("a1", "alice", Category::Books).with_desired([Category::Games]))
            .unwrap();
        store
            .upsert_item(&Item::new("b1", "bob", Category::Games).with_desired([Category::Books]))
            .unwrap();
        store.upsert_item(&Item::new("s1", "sam", Category::Other)).unwrap();
        store
            .set_item_boost("s1", 0.4, Some(Utc::now() + Duration::days(2)))
            .unwrap();

        let mut policy = swap_core::Policy::default();
        policy.policy_version = "long-ttl".to_string();
        policy.reciprocal_policy.boost_ttl_days = 200_000_000;
        let optimizer = BatchOptimizer::new(store.clone(), Arc::new(StaticPolicy(Some(policy))));

        let stats = optimizer.run().unwrap();
        assert!(stats.items_boosted >= 2);
        assert_eq!(optimizer.last_report().unwrap().policy_version, "default");

        let a1 = store.get_item("a1").unwrap().unwrap();
        let expires_at = a1.boost_expires_at.unwrap();
        assert!(expires_at <= Utc::now() + Duration::days(8));
    }
}
