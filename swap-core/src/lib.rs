//! Core types for the item swap matching engine
//!
//! This crate defines the shared data structures used across the engine,
//! including item listings, swipe history, learned affinities, exchange
//! opportunities and the ranking policy.

pub mod affinity;
pub mod error;
pub mod item;
pub mod opportunity;
pub mod policy;
pub mod swipe;

pub use affinity::{UserAffinity, NEUTRAL_AFFINITY};
pub use error::{SwapError, SwapResult};
pub use item::{Category, Condition, Coordinates, Item, UserProfile, ValueRange};
pub use opportunity::{CycleType, OpportunityStatus, Participant, SwapOpportunity};
pub use policy::{
    ExplorationPolicy, Policy, PolicyWeights, ReciprocalPolicy, ReciprocalPriority,
    DEFAULT_POLICY_VERSION,
};
pub use swipe::{DealLink, DealStatus, MatchRecord, Swipe, SwipeRecord};
