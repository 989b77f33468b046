//! Per-user category affinity learned from swipe history

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use swap_core::{Category, SwipeRecord, UserAffinity};

const LIKE_REWARD: f64 = 1.0;
const DISLIKE_PENALTY: f64 = -0.5;

/// Normalized affinity per swiped category
///
/// Each like contributes +1 and each dislike -0.5 to a per-category sum;
/// the mean is mapped from [-1, 1] into [0, 1] and clamped. Categories
/// with no swipes get no entry.
pub fn learn_affinities<I>(swipes: I) -> BTreeMap<Category, f64>
where
    I: IntoIterator<Item = (Category, bool)>,
{
    let mut totals: BTreeMap<Category, (f64, u32)> = BTreeMap::new();
    for (category, liked) in swipes {
        let entry = totals.entry(category).or_insert((0.0, 0));
        entry.0 += if liked { LIKE_REWARD } else { DISLIKE_PENALTY };
        entry.1 += 1;
    }

    totals
        .into_iter()
        .map(|(category, (sum, count))| {
            let mean = sum / f64::from(count);
            (category, ((mean + 1.0) / 2.0).clamp(0.0, 1.0))
        })
        .collect()
}

/// Full-replace affinity snapshot for one user
pub fn learn_user_affinity<'a, I>(user_id: &str, records: I, now: DateTime<Utc>) -> UserAffinity
where
    I: IntoIterator<Item = &'a SwipeRecord>,
{
    UserAffinity {
        user_id: user_id.to_string(),
        affinities: learn_affinities(records.into_iter().map(|r| (r.target_category, r.liked))),
        computed_at: now,
    }
}
