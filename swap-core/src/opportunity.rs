//! Exchange opportunities discovered by the batch optimizer

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of parties in an exchange loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CycleType {
    #[serde(rename = "2-way")]
    TwoWay,
    #[serde(rename = "3-way")]
    ThreeWay,
}

impl CycleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleType::TwoWay => "2-way",
            CycleType::ThreeWay => "3-way",
        }
    }

    pub fn participant_count(&self) -> usize {
        match self {
            CycleType::TwoWay => 2,
            CycleType::ThreeWay => 3,
        }
    }
}

impl fmt::Display for CycleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for CycleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "2-way" => Ok(CycleType::TwoWay),
            "3-way" => Ok(CycleType::ThreeWay),
            _ => Err(format!("Unknown cycle type: {}", s)),
        }
    }
}

/// Lifecycle of a persisted opportunity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
    Pending,
    Accepted,
    Declined,
    Expired,
}

impl Default for OpportunityStatus {
    fn default() -> Self {
        OpportunityStatus::Pending
    }
}

impl OpportunityStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityStatus::Pending => "pending",
            OpportunityStatus::Accepted => "accepted",
            OpportunityStatus::Declined => "declined",
            OpportunityStatus::Expired => "expired",
        }
    }
}

impl std::str::FromStr for OpportunityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OpportunityStatus::Pending),
            "accepted" => Ok(OpportunityStatus::Accepted),
            "declined" => Ok(OpportunityStatus::Declined),
            "expired" => Ok(OpportunityStatus::Expired),
            _ => Err(format!("Unknown opportunity status: {}", s)),
        }
    }
}

/// One (user, item) slot in an opportunity; the item is what the user gives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    pub user_id: String,
    pub item_id: String,
}

impl Participant {
    pub fn new(user_id: impl Into<String>, item_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            item_id: item_id.into(),
        }
    }
}

/// A ranked 2-way or 3-way exchange opportunity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapOpportunity {
    pub id: String,
    pub cycle_type: CycleType,
    pub participants: Vec<Participant>,
    /// Confidence score in [0, 1]
    pub score: f64,
    pub status: OpportunityStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SwapOpportunity {
    /// Create a pending opportunity expiring `ttl` from `now`
    pub fn new(
        id: impl Into<String>,
        cycle_type: CycleType,
        participants: Vec<Participant>,
        score: f64,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            id: id.into(),
            cycle_type,
            participants,
            score,
            status: OpportunityStatus::Pending,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn item_ids(&self) -> impl Iterator<Item = &str> {
        self.participants.iter().map(|p| p.item_id.as_str())
    }
}
