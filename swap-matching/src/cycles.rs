//! Three-party exchange cycle search
//!
//! A cycle A → B → C → A closes when B wants something from A, C wants
//! something from B and A wants something from C, each edge at or above the
//! admission threshold. The search is bounded: it stops as soon as
//! `cycle_search_cap` distinct cycles are found, then keeps the best
//! `max_three_way` by mean edge score. Which cycles are found therefore
//! depends on traversal order (ascending arena index), not on a global
//! ranking.

use std::collections::{BTreeSet, HashMap, HashSet};
use swap_core::Item;
use tracing::debug;

use crate::config::MatchingConfig;
use crate::reciprocal::PairScore;

/// Directed edge `from → to`: `offered` is the item `from` gives to `to`
#[derive(Debug, Clone, Copy)]
pub struct DirectedEdge<'a> {
    pub score: f64,
    pub offered: &'a Item,
}

pub type EdgeMap<'a> = HashMap<(usize, usize), DirectedEdge<'a>>;

/// A closed 3-party loop; `offered[i]` is what `users[i]` gives to the next user
#[derive(Debug, Clone)]
pub struct ThreeWayCycle<'a> {
    pub users: [usize; 3],
    pub offered: [&'a Item; 3],
    pub score: f64,
}

/// Record each pair score under both orientations with item roles swapped
pub fn edges_from_pairs<'a>(pairs: &[PairScore<'a>]) -> EdgeMap<'a> {
    let mut edges = HashMap::with_capacity(pairs.len() * 2);
    for pair in pairs {
        edges.insert(
            (pair.user_a, pair.user_b),
            DirectedEdge {
                score: pair.score,
                offered: pair.item_a,
            },
        );
        edges.insert(
            (pair.user_b, pair.user_a),
            DirectedEdge {
                score: pair.score,
                offered: pair.item_b,
            },
        );
    }
    edges
}

/// Search for 3-way cycles among `user_count` arena-indexed users
pub fn detect_three_way<'a>(
    user_count: usize,
    edges: &EdgeMap<'a>,
    config: &MatchingConfig,
) -> Vec<ThreeWayCycle<'a>> {
    let threshold = config.edge_admission_threshold;

    // Admitted out-neighbours per user, ascending so the walk matches a
    // plain nested loop over (a, b, c)
    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); user_count];
    for (&(from, to), edge) in edges {
        if edge.score >= threshold && from < user_count && to < user_count {
            outgoing[from].push(to);
        }
    }
    for neighbours in outgoing.iter_mut() {
        neighbours.sort_unstable();
    }

    let admitted = |from: usize, to: usize| edges.get(&(from, to)).filter(|e| e.score >= threshold);

    let mut seen: HashSet<BTreeSet<usize>> = HashSet::new();
    let mut cycles: Vec<ThreeWayCycle<'a>> = Vec::new();

    'search: for a in 0..user_count {
        for &b in &outgoing[a] {
            if b == a {
                continue;
            }
            for &c in &outgoing[b] {
                if c == a || c == b {
                    continue;
                }
                let Some(closing) = admitted(c, a) else {
                    continue;
                };
                let members: BTreeSet<usize> = [a, b, c].into_iter().collect();
                if !seen.insert(members) {
                    continue;
                }

                let ab = edges[&(a, b)];
                let bc = edges[&(b, c)];
                cycles.push(ThreeWayCycle {
                    users: [a, b, c],
                    offered: [ab.offered, bc.offered, closing.offered],
                    score: (ab.score + bc.score + closing.score) / 3.0,
                });

                if cycles.len() >= config.cycle_search_cap {
                    debug!("Cycle search cap of {} reached", config.cycle_search_cap);
                    break 'search;
                }
            }
        }
    }

    cycles.sort_by(|x, y| {
        y.score
            .partial_cmp(&x.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    cycles.truncate(config.max_three_way);

    debug!("Found {} three-way cycles", cycles.len());
    cycles
}
