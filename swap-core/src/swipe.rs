//! Swipe, match and deal records read by the engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::item::Category;

/// One directional decision from a source item on a target item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swipe {
    pub source_item_id: String,
    pub target_item_id: String,
    pub liked: bool,
    pub created_at: DateTime<Utc>,
}

impl Swipe {
    pub fn new(source: impl Into<String>, target: impl Into<String>, liked: bool) -> Self {
        Self {
            source_item_id: source.into(),
            target_item_id: target.into(),
            liked,
            created_at: Utc::now(),
        }
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// A swipe joined with the swiping user and the target's category
///
/// This is the shape the affinity learner consumes during a batch run.
#[derive(Debug, Clone)]
pub struct SwipeRecord {
    pub user_id: String,
    pub target_item_id: String,
    pub target_category: Category,
    pub liked: bool,
    pub created_at: DateTime<Utc>,
}

/// Mutual-like record created by the external match trigger
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchRecord {
    pub id: String,
    pub item_a_id: String,
    pub item_b_id: String,
    pub created_at: DateTime<Utc>,
}

/// Status of a direct-deal invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Pending,
    Accepted,
    Declined,
}

impl DealStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DealStatus::Pending => "pending",
            DealStatus::Accepted => "accepted",
            DealStatus::Declined => "declined",
        }
    }
}

/// Direct-deal invitation linking two items outside the swipe flow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DealLink {
    pub id: String,
    pub from_item_id: String,
    pub to_item_id: String,
    pub status: DealStatus,
}
