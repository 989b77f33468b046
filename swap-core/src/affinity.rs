//! Learned per-user category affinities

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::item::Category;

/// Affinity assumed for a category the user never swiped on
pub const NEUTRAL_AFFINITY: f64 = 0.5;

/// Snapshot of a user's learned category preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAffinity {
    pub user_id: String,
    /// Category weight in [0, 1]; absent categories are neutral
    pub affinities: BTreeMap<Category, f64>,
    pub computed_at: DateTime<Utc>,
}

impl UserAffinity {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            affinities: BTreeMap::new(),
            computed_at: Utc::now(),
        }
    }

    /// Weight for `category`, defaulting to neutral when never observed
    pub fn weight(&self, category: Category) -> f64 {
        self.affinities
            .get(&category)
            .copied()
            .unwrap_or(NEUTRAL_AFFINITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_category_is_neutral() {
        let mut affinity = UserAffinity::empty("u1");
        affinity.affinities.insert(Category::Books, 0.9);
        assert_eq!(affinity.weight(Category::Books), 0.9);
        assert_eq!(affinity.weight(Category::Games), NEUTRAL_AFFINITY);
    }
}
