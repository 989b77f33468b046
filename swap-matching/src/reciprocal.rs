//! Pairwise reciprocal scoring between users
//!
//! For every pair of users, find the single item pair both sides are most
//! likely to want, using declared preferences blended with learned affinity.

use itertools::Itertools;
use std::collections::BTreeSet;
use swap_core::{Category, Item, UserAffinity};
use tracing::debug;

use crate::config::MatchingConfig;
use crate::similarity::{exp_decay, haversine_km};

/// Prediction used when the viewer never declared the item's category
const UNDECLARED_FLOOR: f64 = 0.1;
const DIRECT_MATCH: f64 = 0.5;
const NO_DIRECT_MATCH: f64 = 0.2;
const DISTANCE_BONUS_SCALE_KM: f64 = 100.0;
const DISTANCE_BONUS_WEIGHT: f64 = 0.2;

/// A user with their active items, arena-indexed by the batch job
#[derive(Debug, Clone)]
pub struct Trader<'a> {
    pub user_id: &'a str,
    pub items: Vec<&'a Item>,
    /// Union of desired categories across the user's items
    pub desired: BTreeSet<Category>,
    pub affinity: UserAffinity,
}

impl<'a> Trader<'a> {
    pub fn new(user_id: &'a str, items: Vec<&'a Item>, affinity: UserAffinity) -> Self {
        let desired = items
            .iter()
            .flat_map(|item| item.desired_categories.iter().copied())
            .collect();
        Self {
            user_id,
            items,
            desired,
            affinity,
        }
    }

    /// Whether either side declares interest in a category the other lists
    pub fn overlaps(&self, other: &Trader<'_>) -> bool {
        other.items.iter().any(|i| self.desired.contains(&i.category))
            || self.items.iter().any(|i| other.desired.contains(&i.category))
    }
}

/// Best item pair between two traders (indices into the trader arena)
#[derive(Debug, Clone, Copy)]
pub struct PairScore<'a> {
    pub user_a: usize,
    pub user_b: usize,
    /// A's item that B would receive
    pub item_a: &'a Item,
    /// B's item that A would receive
    pub item_b: &'a Item,
    pub score: f64,
}

/// `0.4 × direct match + 0.6 × learned affinity`
pub fn predict_preference(affinity: &UserAffinity, item: &Item, desired: &BTreeSet<Category>) -> f64 {
    let direct = if desired.contains(&item.category) {
        DIRECT_MATCH
    } else {
        NO_DIRECT_MATCH
    };
    0.4 * direct + 0.6 * affinity.weight(item.category)
}

fn viewer_prediction(viewer: &Trader<'_>, item: &Item) -> f64 {
    if viewer.desired.contains(&item.category) {
        predict_preference(&viewer.affinity, item, &viewer.desired)
    } else {
        UNDECLARED_FLOOR
    }
}

/// Reciprocal score for one concrete item pair
pub fn item_pair_score(a: &Trader<'_>, item_a: &Item, b: &Trader<'_>, item_b: &Item) -> f64 {
    let b_prediction = viewer_prediction(b, item_a);
    let a_prediction = viewer_prediction(a, item_b);

    let distance_bonus = match (&item_a.coordinates, &item_b.coordinates) {
        (Some(ca), Some(cb)) => {
            exp_decay(haversine_km(ca, cb), DISTANCE_BONUS_SCALE_KM) * DISTANCE_BONUS_WEIGHT
        }
        _ => 0.0,
    };

    b_prediction * a_prediction + distance_bonus
}

/// Best-scoring item pair between traders `a` and `b`, if any scores above 0
pub fn score_pair<'a>(
    traders: &[Trader<'a>],
    a: usize,
    b: usize,
) -> Option<PairScore<'a>> {
    let (ta, tb) = (&traders[a], &traders[b]);
    let mut best: Option<PairScore<'a>> = None;

    for (&item_a, &item_b) in ta.items.iter().cartesian_product(tb.items.iter()) {
        let score = item_pair_score(ta, item_a, tb, item_b);
        if score > best.map_or(0.0, |p| p.score) {
            best = Some(PairScore {
                user_a: a,
                user_b: b,
                item_a,
                item_b,
                score,
            });
        }
    }

    best
}

/// Best pair for every unordered user pair, in arena order
pub fn score_all_pairs<'a>(traders: &[Trader<'a>], config: &MatchingConfig) -> Vec<PairScore<'a>> {
    let mut skipped = 0usize;
    let pairs: Vec<PairScore<'a>> = (0..traders.len())
        .tuple_combinations()
        .filter(|&(a, b)| {
            let keep = !config.prune_disjoint_pairs || traders[a].overlaps(&traders[b]);
            if !keep {
                skipped += 1;
            }
            keep
        })
        .filter_map(|(a, b)| score_pair(traders, a, b))
        .collect();

    debug!(
        "Scored {} user pairs ({} pruned) across {} traders",
        pairs.len(),
        skipped,
        traders.len()
    );
    pairs
}
