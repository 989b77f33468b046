//! Matching algorithms for the item swap engine
//!
//! This crate is pure computation: it never touches storage.
//!
//! ## Features
//! - Great-circle distance, cosine similarity and decay primitives
//! - Fixed category embedding table
//! - Multi-factor candidate scoring with injectable exploration noise
//! - Per-user category affinity learning from swipe history
//! - Pairwise reciprocal scoring and bounded 3-way cycle search

pub mod affinity;
pub mod config;
pub mod cycles;
pub mod embedding;
pub mod noise;
pub mod reciprocal;
pub mod scorer;
pub mod similarity;

pub use affinity::{learn_affinities, learn_user_affinity};
pub use config::MatchingConfig;
pub use cycles::{detect_three_way, edges_from_pairs, DirectedEdge, EdgeMap, ThreeWayCycle};
pub use embedding::{average_embedding, embedding, CategoryEmbedding, EMBEDDING_DIM};
pub use noise::{NoiseSource, SeededNoise, ThreadNoise, ZeroNoise};
pub use reciprocal::{predict_preference, score_all_pairs, score_pair, PairScore, Trader};
pub use scorer::{expanded_weights, CandidateScorer, ScoreBreakdown, ScoringContext};
pub use similarity::{cosine_similarity, exp_decay, geo_score, geo_score_between, haversine_km};
