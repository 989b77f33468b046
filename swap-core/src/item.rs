//! Item listings and the enumerations they are built from

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Listing category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Electronics,
    Books,
    Clothing,
    Furniture,
    Sports,
    Toys,
    Games,
    Music,
    Home,
    Collectibles,
    Other,
}

impl Category {
    /// Every category, in table order
    pub const ALL: [Category; 11] = [
        Category::Electronics,
        Category::Books,
        Category::Clothing,
        Category::Furniture,
        Category::Sports,
        Category::Toys,
        Category::Games,
        Category::Music,
        Category::Home,
        Category::Collectibles,
        Category::Other,
    ];

    /// Stable label used in storage and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Electronics => "electronics",
            Category::Books => "books",
            Category::Clothing => "clothing",
            Category::Furniture => "furniture",
            Category::Sports => "sports",
            Category::Toys => "toys",
            Category::Games => "games",
            Category::Music => "music",
            Category::Home => "home",
            Category::Collectibles => "collectibles",
            Category::Other => "other",
        }
    }

    /// Parse a stored label, mapping anything unrecognised to `Other`
    pub fn from_label(label: &str) -> Self {
        label.parse().unwrap_or(Category::Other)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "electronics" => Ok(Category::Electronics),
            "books" => Ok(Category::Books),
            "clothing" => Ok(Category::Clothing),
            "furniture" => Ok(Category::Furniture),
            "sports" => Ok(Category::Sports),
            "toys" => Ok(Category::Toys),
            "games" => Ok(Category::Games),
            "music" => Ok(Category::Music),
            "home" => Ok(Category::Home),
            "collectibles" => Ok(Category::Collectibles),
            "other" => Ok(Category::Other),
            _ => Err(format!("Unknown category: {}", s)),
        }
    }
}

/// Physical condition of a listed item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    New,
    LikeNew,
    Good,
    Fair,
    Poor,
}

impl Default for Condition {
    fn default() -> Self {
        Condition::Good
    }
}

impl Condition {
    /// Quality scalar used by the condition sub-score
    pub fn quality(&self) -> f64 {
        match self {
            Condition::New => 1.0,
            Condition::LikeNew => 0.85,
            Condition::Good => 0.7,
            Condition::Fair => 0.5,
            Condition::Poor => 0.3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::New => "new",
            Condition::LikeNew => "like_new",
            Condition::Good => "good",
            Condition::Fair => "fair",
            Condition::Poor => "poor",
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Condition {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "new" => Ok(Condition::New),
            "like_new" | "like-new" | "likenew" => Ok(Condition::LikeNew),
            "good" => Ok(Condition::Good),
            "fair" => Ok(Condition::Fair),
            "poor" => Ok(Condition::Poor),
            _ => Err(format!("Unknown condition: {}", s)),
        }
    }
}

/// A latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Owner-declared value range for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: Decimal,
    pub max: Decimal,
}

/// A listed item
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    /// Unique item identifier
    pub id: String,

    /// Owning user
    pub owner_id: String,

    pub category: Category,

    pub condition: Condition,

    /// Categories the owner would accept in exchange
    #[serde(default)]
    pub desired_categories: Vec<Category>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_range: Option<ValueRange>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    pub created_at: DateTime<Utc>,

    pub is_active: bool,

    pub is_archived: bool,

    /// Boost derived from exchange opportunities (written only by the publisher)
    #[serde(default)]
    pub reciprocal_boost: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub boost_expires_at: Option<DateTime<Utc>>,
}

impl Item {
    /// Create an active item with no preferences, location or boost
    pub fn new(id: impl Into<String>, owner_id: impl Into<String>, category: Category) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            category,
            condition: Condition::default(),
            desired_categories: Vec::new(),
            value_range: None,
            coordinates: None,
            created_at: Utc::now(),
            is_active: true,
            is_archived: false,
            reciprocal_boost: 0.0,
            boost_expires_at: None,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn with_desired(mut self, categories: impl IntoIterator<Item = Category>) -> Self {
        self.desired_categories = categories.into_iter().collect();
        self
    }

    pub fn with_coordinates(mut self, latitude: f64, longitude: f64) -> Self {
        self.coordinates = Some(Coordinates::new(latitude, longitude));
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn with_value_range(mut self, min: Decimal, max: Decimal) -> Self {
        self.value_range = Some(ValueRange { min, max });
        self
    }

    pub fn wants(&self, category: Category) -> bool {
        self.desired_categories.contains(&category)
    }

    /// Boost value as seen at `now`; expired boosts read as zero
    pub fn effective_boost(&self, now: DateTime<Utc>) -> f64 {
        match self.boost_expires_at {
            Some(expires_at) if expires_at <= now => 0.0,
            _ => self.reciprocal_boost,
        }
    }

    /// Age in fractional days, never negative
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        let secs = now.signed_duration_since(self.created_at).num_seconds();
        (secs as f64 / 86_400.0).max(0.0)
    }
}

/// Location data owned by the profile collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,
}
