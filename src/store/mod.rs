//! Results Store
//!
//! Durable storage of runs and profiles. This is the engine's only
//! asynchronous boundary: calls are made from tokio tasks and their results
//! come back to the tick thread through the engine's completion queue.
//!
//! ## Ordering contract
//!
//! Listings are ascending by time. Among equal times the run submitted
//! first comes first.
//!
//! ## Classification
//!
//! A submitted run is classified by the store, atomically with the write,
//! against the runs already saved in its bucket. Two runs saved while both
//! are in flight therefore never both claim the server record.

pub mod memory;

use futures_util::future::BoxFuture;

use crate::record::{BucketKey, PlayerProfile, RecordClass, RunRecord};
use crate::slots::PlayerId;

pub use memory::MemoryStore;

/// Store errors. Never retried by the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// Backend could not be reached.
    #[error("Results store unavailable: {0}")]
    Unavailable(String),

    /// Backend refused the request.
    #[error("Results store rejected request: {0}")]
    Rejected(String),
}

/// Results store backend.
pub trait ResultsStore: Send + Sync {
    /// Every run on a map, fastest first.
    fn map_records<'a>(&'a self, map: &'a str) -> BoxFuture<'a, Result<Vec<RunRecord>, StoreError>>;

    /// Runs of one bucket on a map, fastest first.
    fn bucket_records<'a>(
        &'a self,
        map: &'a str,
        key: BucketKey,
    ) -> BoxFuture<'a, Result<Vec<RunRecord>, StoreError>>;

    /// Save a run. Returns its classification against the bucket's runs
    /// saved before it (strictly faster wins) and the canonical record with
    /// id and date assigned.
    fn submit_run<'a>(
        &'a self,
        map: &'a str,
        record: RunRecord,
    ) -> BoxFuture<'a, Result<(RecordClass, RunRecord), StoreError>>;

    /// A player's runs on a map.
    fn player_records<'a>(
        &'a self,
        player: PlayerId,
        map: &'a str,
    ) -> BoxFuture<'a, Result<Vec<RunRecord>, StoreError>>;

    /// Look up or create a player's profile, updating the stored name.
    fn player_profile<'a>(
        &'a self,
        player: PlayerId,
        name: &'a str,
    ) -> BoxFuture<'a, Result<PlayerProfile, StoreError>>;
}
