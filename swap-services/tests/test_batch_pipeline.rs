//! End-to-end batch optimization against an in-memory store
//!
//! Run with: cargo test -p swap-services --test test_batch_pipeline

use chrono::Utc;
use std::sync::Arc;
use swap_core::{Category, CycleType, Item, Policy, ReciprocalPriority, Swipe};
use swap_services::{BatchOptimizer, StaticPolicy, SwapStore};

/// Three users at the same spot, each wanting both other users' categories
fn seed_triangle(store: &SwapStore) {
    let listings = [
        ("book", "alice", Category::Books, [Category::Games, Category::Toys]),
        ("game", "bob", Category::Games, [Category::Books, Category::Toys]),
        ("toy", "carol", Category::Toys, [Category::Books, Category::Games]),
    ];
    for (id, owner, category, desired) in listings {
        let item = Item::new(id, owner, category)
            .with_desired(desired)
            .with_coordinates(48.8566, 2.3522);
        store.upsert_item(&item).unwrap();
    }
}

fn optimizer(store: &Arc<SwapStore>) -> BatchOptimizer {
    BatchOptimizer::new(store.clone(), Arc::new(StaticPolicy(None)))
}

#[test]
fn test_triangle_produces_cycle_and_boosts() {
    let store = Arc::new(SwapStore::new_in_memory().unwrap());
    seed_triangle(&store);

    let stats = optimizer(&store).run().unwrap();
    assert_eq!(stats.users_processed, 3);
    assert_eq!(stats.two_way_opportunities, 3);
    assert_eq!(stats.three_way_cycles, 1);
    assert_eq!(stats.items_boosted, 3);

    let now = Utc::now();
    let opportunities = store.active_opportunities(now).unwrap();
    assert_eq!(opportunities.len(), 4);

    let cycle = opportunities
        .iter()
        .find(|o| o.cycle_type == CycleType::ThreeWay)
        .unwrap();
    assert_eq!(cycle.participants.len(), 3);
    // 0.5 * 0.5 mutual prediction + full 0.2 distance bonus on every edge
    assert!((cycle.score - 0.45).abs() < 1e-9);

    for user in ["alice", "bob", "carol"] {
        // two pairs and the cycle
        assert_eq!(store.opportunities_for_user(user, now).unwrap().len(), 3);
    }

    let book = store.get_item("book").unwrap().unwrap();
    assert!((book.reciprocal_boost - 0.45).abs() < 1e-9);
    assert!(book.boost_expires_at.unwrap() > now);
}

#[test]
fn test_rerun_keeps_boosts_stable() {
    let store = Arc::new(SwapStore::new_in_memory().unwrap());
    seed_triangle(&store);
    let optimizer = optimizer(&store);

    optimizer.run().unwrap();
    let first: Vec<f64> = ["book", "game", "toy"]
        .iter()
        .map(|id| store.get_item(id).unwrap().unwrap().reciprocal_boost)
        .collect();

    let stats = optimizer.run().unwrap();
    let second: Vec<f64> = ["book", "game", "toy"]
        .iter()
        .map(|id| store.get_item(id).unwrap().unwrap().reciprocal_boost)
        .collect();

    assert_eq!(first, second);
    assert_eq!(stats.items_boosted, 3);
    // pending rows were replaced, not accumulated
    assert_eq!(store.active_opportunities(Utc::now()).unwrap().len(), 4);
}

#[test]
fn test_archived_listing_loses_boost() {
    let store = Arc::new(SwapStore::new_in_memory().unwrap());
    seed_triangle(&store);
    let optimizer = optimizer(&store);
    optimizer.run().unwrap();

    let mut toy = store.get_item("toy").unwrap().unwrap();
    toy.is_archived = true;
    store.upsert_item(&toy).unwrap();

    let stats = optimizer.run().unwrap();
    assert_eq!(stats.users_processed, 2);
    assert_eq!(stats.three_way_cycles, 0);

    let toy = store.get_item("toy").unwrap().unwrap();
    assert_eq!(toy.reciprocal_boost, 0.0);
    assert!(toy.boost_expires_at.is_none());
}

#[test]
fn test_active_policy_priority_scales_boosts() {
    let store = Arc::new(SwapStore::new_in_memory().unwrap());
    seed_triangle(&store);
    let mut policy = Policy::default();
    policy.policy_version = "low-priority".to_string();
    policy.reciprocal_policy.priority = ReciprocalPriority::Low;
    store.save_policy(&policy, true).unwrap();

    let optimizer = BatchOptimizer::new(store.clone(), store.clone());
    optimizer.run().unwrap();

    let book = store.get_item("book").unwrap().unwrap();
    assert!((book.reciprocal_boost - 0.225).abs() < 1e-9);
    assert_eq!(optimizer.last_report().unwrap().policy_version, "low-priority");
}

#[test]
fn test_learned_affinities_persisted() {
    let store = Arc::new(SwapStore::new_in_memory().unwrap());
    seed_triangle(&store);
    store.record_swipe(&Swipe::new("book", "game", true)).unwrap();
    store.record_swipe(&Swipe::new("book", "toy", false)).unwrap();

    optimizer(&store).run().unwrap();

    let alice = store.get_affinity("alice").unwrap().unwrap();
    assert_eq!(alice.weight(Category::Games), 1.0);
    assert_eq!(alice.weight(Category::Toys), 0.25);
    // never swiped: neutral default
    assert_eq!(alice.weight(Category::Music), 0.5);
}
