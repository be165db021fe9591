//! Records
//!
//! Best-time cache and classification of finished runs.
//!
//! ## Module Structure
//!
//! - `model`: run records, bucket keys, classification, profiles
//! - `cache`: sorted per-bucket best times and personal bests
//! - `evaluator`: finish snapshot and reconciliation with the store

pub mod cache;
pub mod evaluator;
pub mod model;

pub use cache::RecordCache;
pub use evaluator::{validate_key, RecordError, RecordEvaluator, Submission, Verdict};
pub use model::{BucketKey, PlayerProfile, RecordClass, RunRecord};
