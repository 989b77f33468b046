//! Recommendation sessions against an in-memory store
//!
//! Run with: cargo test -p swap-services --test test_recommendation_flow

use chrono::{Duration, Utc};
use std::sync::Arc;
use swap_core::{Category, Condition, Coordinates, Item, Swipe, UserProfile};
use swap_matching::ZeroNoise;
use swap_services::{
    BatchOptimizer, RecommendationRequest, RecommendationService, StaticPolicy, SwapStore,
};

const NYC: (f64, f64) = (40.7128, -74.0060);

fn service(store: &Arc<SwapStore>) -> RecommendationService {
    RecommendationService::new(store.clone(), Arc::new(StaticPolicy(None)))
        .with_noise(Arc::new(ZeroNoise))
}

fn seed_user(store: &SwapStore) {
    store
        .upsert_profile(&UserProfile {
            user_id: "U".to_string(),
            coordinates: Some(Coordinates::new(NYC.0, NYC.1)),
        })
        .unwrap();
    store
        .upsert_item(
            &Item::new("I", "U", Category::Books)
                .with_desired([Category::Games])
                .with_coordinates(NYC.0, NYC.1),
        )
        .unwrap();
}

fn game(id: &str, owner: &str, lat: f64) -> Item {
    Item::new(id, owner, Category::Games)
        .with_desired([Category::Books])
        .with_condition(Condition::New)
        .with_coordinates(lat, NYC.1)
}

#[test]
fn test_nearby_candidate_outranks_distant_twin() {
    let store = Arc::new(SwapStore::new_in_memory().unwrap());
    seed_user(&store);
    // roughly 10 km and 500 km due north
    store.upsert_item(&game("J", "V", NYC.0 + 0.09)).unwrap();
    store.upsert_item(&game("K", "W", NYC.0 + 4.5)).unwrap();

    let response = service(&store)
        .recommend(&RecommendationRequest::new("I"))
        .unwrap();

    // two candidates is below the strict threshold
    assert!(response.search_expanded);
    assert_eq!(response.ranked_items.len(), 2);
    assert_eq!(response.ranked_items[0].id, "J");
    assert_eq!(response.ranked_items[1].id, "K");
    assert!(response.ranked_items[0].score > response.ranked_items[1].score);
}

#[test]
fn test_client_retry_contract_on_exhausted_pool() {
    let store = Arc::new(SwapStore::new_in_memory().unwrap());
    seed_user(&store);
    store.upsert_item(&game("J", "V", NYC.0)).unwrap();
    store
        .record_swipe(&Swipe::new("I", "J", false).at(Utc::now() - Duration::days(2)))
        .unwrap();

    let service = service(&store);
    let strict = service.recommend(&RecommendationRequest::new("I")).unwrap();
    assert!(strict.ranked_items.is_empty());

    let retry = RecommendationRequest {
        expanded_search: true,
        ..RecommendationRequest::new("I")
    };
    let expanded = service.recommend(&retry).unwrap();
    assert!(expanded.search_expanded);
    assert!(expanded.ranked_items.is_empty());
}

#[test]
fn test_batch_boost_feeds_ranking() {
    let store = Arc::new(SwapStore::new_in_memory().unwrap());
    seed_user(&store);
    // two identical candidates, only one of which forms a mutual swap
    for i in 0..5 {
        store
            .upsert_item(
                &Item::new(format!("filler{}", i), format!("f{}", i), Category::Furniture),
            )
            .unwrap();
    }
    store.upsert_item(&game("mutual", "V", NYC.0)).unwrap();
    store
        .upsert_item(
            &Item::new("oneway", "W", Category::Games)
                .with_condition(Condition::New)
                .with_coordinates(NYC.0, NYC.1),
        )
        .unwrap();

    BatchOptimizer::new(store.clone(), Arc::new(StaticPolicy(None)))
        .run()
        .unwrap();
    let mutual = store.get_item("mutual").unwrap().unwrap();
    assert!(mutual.reciprocal_boost > 0.0);

    let response = service(&store)
        .recommend(&RecommendationRequest::new("I"))
        .unwrap();
    assert!(!response.search_expanded);
    assert_eq!(response.ranked_items[0].id, "mutual");
}
