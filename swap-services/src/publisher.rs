//! Opportunity Publisher
//!
//! Replaces the pending opportunity set and re-derives every item boost in
//! one pass. Boosts never carry over between runs: an item boosted last run
//! but absent from this run's opportunities is reset.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use swap_core::{ReciprocalPolicy, SwapOpportunity, SwapResult};
use tracing::{debug, info, instrument, warn};

use crate::store::SwapStore;

/// Outcome of one publish pass
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishStats {
    pub expired_purged: usize,
    pub pending_replaced: usize,
    pub opportunities_written: usize,
    pub write_failures: usize,
    pub items_boosted: usize,
    pub boosts_reset: usize,
}

pub struct OpportunityPublisher {
    store: Arc<SwapStore>,
}

impl OpportunityPublisher {
    pub fn new(store: Arc<SwapStore>) -> Self {
        Self { store }
    }

    /// Write `opportunities` and derive item boosts from them
    ///
    /// Individual row and boost write failures are logged and skipped.
    #[instrument(skip_all, fields(count = opportunities.len()))]
    pub fn publish(
        &self,
        opportunities: &[SwapOpportunity],
        reciprocal: &ReciprocalPolicy,
        now: DateTime<Utc>,
    ) -> SwapResult<PublishStats> {
        let mut stats = PublishStats {
            expired_purged: self.store.purge_expired_opportunities(now)?,
            pending_replaced: self.store.delete_pending_opportunities()?,
            ..PublishStats::default()
        };

        let mut max_scores: HashMap<&str, f64> = HashMap::new();
        for opportunity in opportunities {
            if let Err(e) = self.store.insert_opportunity(opportunity) {
                warn!("Failed to write opportunity {}: {}", opportunity.id, e);
                stats.write_failures += 1;
                continue;
            }
            stats.opportunities_written += 1;

            for item_id in opportunity.item_ids() {
                let best = max_scores.entry(item_id).or_insert(f64::MIN);
                *best = best.max(opportunity.score);
            }
        }

        let boost_expires_at = boost_expiry(now, reciprocal.boost_ttl_days);
        let multiplier = reciprocal.priority.multiplier();

        for (&item_id, &score) in &max_scores {
            let boost = (score * multiplier).clamp(0.0, reciprocal.boost_cap);
            match self.store.set_item_boost(item_id, boost, Some(boost_expires_at)) {
                Ok(true) => stats.items_boosted += 1,
                Ok(false) => debug!("Boost target {} no longer exists", item_id),
                Err(e) => warn!("Failed to boost item {}: {}", item_id, e),
            }
        }

        match self.store.boosted_item_ids() {
            Ok(previously_boosted) => {
                for item_id in previously_boosted {
                    if max_scores.contains_key(item_id.as_str()) {
                        continue;
                    }
                    match self.store.set_item_boost(&item_id, 0.0, None) {
                        Ok(_) => stats.boosts_reset += 1,
                        Err(e) => warn!("Failed to reset boost on {}: {}", item_id, e),
                    }
                }
            }
            Err(e) => warn!("Could not list boosted items, stale boosts kept: {}", e),
        }

        info!(
            "Published {} opportunities ({} failed), boosted {} items, reset {}",
            stats.opportunities_written, stats.write_failures, stats.items_boosted, stats.boosts_reset
        );
        Ok(stats)
    }
}

/// `now` plus the boost lifetime, saturating at the latest representable time
fn boost_expiry(now: DateTime<Utc>, ttl_days: u32) -> DateTime<Utc> {
    Duration::try_days(i64::from(ttl_days))
        .and_then(|ttl| now.checked_add_signed(ttl))
        .unwrap_or_else(|| {
            warn!("Boost TTL of {} days overflows, clamping expiry", ttl_days);
            DateTime::<Utc>::MAX_UTC
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use swap_core::{Category, CycleType, Item, Participant, ReciprocalPriority};

    fn seed(store: &SwapStore, ids: &[&str]) {
        for id in ids {
            store
                .upsert_item(&Item::new(*id, format!("owner-{}", id), Category::Other))
                .unwrap();
        }
    }

    fn two_way(id: &str, a: &str, b: &str, score: f64, now: DateTime<Utc>) -> SwapOpportunity {
        SwapOpportunity::new(
            id,
            CycleType::TwoWay,
            vec![
                Participant::new(format!("owner-{}", a), a),
                Participant::new(format!("owner-{}", b), b),
            ],
            score,
            now,
            Duration::days(7),
        )
    }

    fn boost_of(store: &SwapStore, id: &str) -> (f64, Option<DateTime<Utc>>) {
        let item = store.get_item(id).unwrap().unwrap();
        (item.reciprocal_boost, item.boost_expires_at)
    }

    #[test]
    fn test_boost_is_max_score_capped() {
        let store = Arc::new(SwapStore::new_in_memory().unwrap());
        seed(&store, &["a", "b", "c"]);
        let now = Utc::now();
        let opportunities = vec![
            two_way("o1", "a", "b", 0.3, now),
            two_way("o2", "a", "c", 0.45, now),
        ];

        let publisher = OpportunityPublisher::new(store.clone());
        let stats = publisher
            .publish(&opportunities, &ReciprocalPolicy::default(), now)
            .unwrap();
        assert_eq!(stats.opportunities_written, 2);
        assert_eq!(stats.items_boosted, 3);
        assert_eq!(boost_of(&store, "a").0, 0.45);
        assert_eq!(boost_of(&store, "b").0, 0.3);
        assert!(boost_of(&store, "a").1.is_some());

        let high = ReciprocalPolicy {
            priority: ReciprocalPriority::High,
            ..ReciprocalPolicy::default()
        };
        publisher.publish(&opportunities, &high, now).unwrap();
        // 0.45 * 1.5 exceeds the 0.5 cap
        assert_eq!(boost_of(&store, "a").0, 0.5);
        assert!((boost_of(&store, "b").0 - 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_republish_is_idempotent() {
        let store = Arc::new(SwapStore::new_in_memory().unwrap());
        seed(&store, &["a", "b", "c", "d"]);
        let now = Utc::now();
        let opportunities = vec![
            two_way("o1", "a", "b", 0.4, now),
            two_way("o2", "c", "d", 0.2, now),
        ];
        let publisher = OpportunityPublisher::new(store.clone());
        let policy = ReciprocalPolicy::default();

        publisher.publish(&opportunities, &policy, now).unwrap();
        let first: Vec<f64> = ["a", "b", "c", "d"].iter().map(|id| boost_of(&store, id).0).collect();

        let stats = publisher.publish(&opportunities, &policy, now).unwrap();
        let second: Vec<f64> = ["a", "b", "c", "d"].iter().map(|id| boost_of(&store, id).0).collect();

        assert_eq!(first, second);
        assert_eq!(stats.pending_replaced, 2);
        assert_eq!(stats.boosts_reset, 0);
        assert_eq!(store.active_opportunities(now).unwrap().len(), 2);
    }

    #[test]
    fn test_items_missing_from_run_are_reset() {
        let store = Arc::new(SwapStore::new_in_memory().unwrap());
        seed(&store, &["a", "b", "stale"]);
        let now = Utc::now();
        store
            .set_item_boost("stale", 0.4, Some(now + Duration::days(2)))
            .unwrap();

        let publisher = OpportunityPublisher::new(store.clone());
        let stats = publisher
            .publish(&[two_way("o1", "a", "b", 0.3, now)], &ReciprocalPolicy::default(), now)
            .unwrap();

        assert_eq!(stats.boosts_reset, 1);
        assert_eq!(boost_of(&store, "stale"), (0.0, None));

        // an empty run clears everything
        publisher.publish(&[], &ReciprocalPolicy::default(), now).unwrap();
        assert_eq!(boost_of(&store, "a"), (0.0, None));
        assert!(store.active_opportunities(now).unwrap().is_empty());
    }

    #[test]
    fn test_bad_row_does_not_abort_run() {
        let store = Arc::new(SwapStore::new_in_memory().unwrap());
        seed(&store, &["a", "b"]);
        let now = Utc::now();
        let mut broken = two_way("o1", "a", "b", 0.9, now);
        broken.cycle_type = CycleType::ThreeWay;
        let opportunities = vec![broken, two_way("o2", "a", "b", 0.35, now)];

        let stats = OpportunityPublisher::new(store.clone())
            .publish(&opportunities, &ReciprocalPolicy::default(), now)
            .unwrap();
        assert_eq!(stats.write_failures, 1);
        assert_eq!(stats.opportunities_written, 1);
        assert_eq!(boost_of(&store, "a").0, 0.35);
    }

    #[test]
    fn test_failed_boost_write_does_not_abort_run() {
        let store = Arc::new(SwapStore::new_in_memory().unwrap());
        seed(&store, &["a", "b", "c", "d", "stale"]);
        let now = Utc::now();
        store
            .set_item_boost("stale", 0.4, Some(now + Duration::days(2)))
            .unwrap();
        store
            .execute_raw(
                "CREATE TRIGGER reject_boost BEFORE UPDATE OF reciprocal_boost ON items
                 WHEN NEW.id = 'a'
                 BEGIN SELECT RAISE(ABORT, 'boost rejected'); END;",
            )
            .unwrap();

        let opportunities = vec![
            two_way("o1", "a", "b", 0.4, now),
            two_way("o2", "c", "d", 0.3, now),
        ];
        let stats = OpportunityPublisher::new(store.clone())
            .publish(&opportunities, &ReciprocalPolicy::default(), now)
            .unwrap();

        assert_eq!(stats.opportunities_written, 2);
        assert_eq!(stats.items_boosted, 3);
        assert_eq!(boost_of(&store, "a").0, 0.0);
        assert_eq!(boost_of(&store, "b").0, 0.4);
        assert_eq!(boost_of(&store, "d").0, 0.3);
        assert_eq!(stats.boosts_reset, 1);
        assert_eq!(boost_of(&store, "stale"), (0.0, None));
    }

    #[test]
    fn test_oversized_ttl_saturates_instead_of_panicking() {
        let store = Arc::new(SwapStore::new_in_memory().unwrap());
        seed(&store, &["a", "b", "stale"]);
        let now = Utc::now();
        store
            .set_item_boost("stale", 0.4, Some(now + Duration::days(2)))
            .unwrap();

        let reciprocal = ReciprocalPolicy {
            boost_ttl_days: 200_000_000,
            ..ReciprocalPolicy::default()
        };
        let stats = OpportunityPublisher::new(store.clone())
            .publish(&[two_way("o1", "a", "b", 0.3, now)], &reciprocal, now)
            .unwrap();

        assert_eq!(stats.items_boosted, 2);
        assert_eq!(stats.boosts_reset, 1);
        let (boost, expires_at) = boost_of(&store, "a");
        assert_eq!(boost, 0.3);
        assert!(expires_at.unwrap() > now + Duration::days(3650));
        assert_eq!(boost_of(&store, "stale"), (0.0, None));
    }
}
