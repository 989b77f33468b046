//! Stateful services for the swap engine
//!
//! - `store`: SQLite persistence for listings, swipes, affinities,
//!   opportunities, boosts and policies
//! - `recommendation`: per-request candidate ranking with pool expansion
//! - `batch`: the periodic affinity / pairwise / cycle pipeline
//! - `publisher`: opportunity replacement and item boost derivation

pub mod batch;
pub mod policy_provider;
pub mod publisher;
pub mod recommendation;
pub mod store;

pub use batch::{BatchOptimizer, BatchReport, BatchStats};
pub use policy_provider::{resolve_policy, PolicyProvider, StaticPolicy};
pub use publisher::{OpportunityPublisher, PublishStats};
pub use recommendation::{
    RankedItem, RecommendationRequest, RecommendationResponse, RecommendationService,
};
pub use store::{StoreError, SwapStore};
