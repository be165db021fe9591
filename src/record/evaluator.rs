//! Record Evaluator
//!
//! Synchronous half of record keeping. On finish the bests are snapshotted
//! here before the run is handed to the store. The store classifies the run
//! as it writes it; the snapshots only travel along to the notification.

use tracing::{debug, info};

use crate::record::cache::RecordCache;
use crate::record::model::{BucketKey, RecordClass, RunRecord};
use crate::slots::PlayerId;
use crate::{MAX_STAGE, MAX_STYLE, MAX_TRACK};

/// Leaderboard query errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// Track or stage outside the supported range.
    #[error("Invalid track {track} or stage {stage}")]
    InvalidTrackOrStage {
        /// Requested track
        track: u32,
        /// Requested stage
        stage: u32,
    },

    /// Style outside the supported range.
    #[error("Invalid style {0}")]
    InvalidStyle(u32),
}

/// Validate a bucket key against the compile-time limits.
pub fn validate_key(key: BucketKey) -> Result<BucketKey, RecordError> {
    if key.style as usize >= MAX_STYLE {
        return Err(RecordError::InvalidStyle(key.style));
    }
    if key.track as usize >= MAX_TRACK || key.stage as usize >= MAX_STAGE {
        return Err(RecordError::InvalidTrackOrStage {
            track: key.track,
            stage: key.stage,
        });
    }
    Ok(key)
}

/// A finished run waiting for the store, with the bests known at finish.
#[derive(Clone, Debug, PartialEq)]
pub struct Submission {
    /// Run to save
    pub record: RunRecord,
    /// Server best time at finish
    pub server_best: Option<f32>,
    /// Player's best time at finish
    pub personal_best: Option<f32>,
}

/// Outcome of a saved run.
#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    /// Classification
    pub result: RecordClass,
    /// Rank of the saved time in the cache before reconciliation
    pub rank: usize,
}

/// Best-time bookkeeping for the active map.
#[derive(Debug, Default)]
pub struct RecordEvaluator {
    cache: RecordCache,
    map: Option<String>,
}

impl RecordEvaluator {
    /// Evaluator with no active map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Switch to a new map. Forgets everything cached for the previous one.
    pub fn activate(&mut self, map: &str) {
        self.cache.clear();
        self.map = Some(map.to_string());
    }

    /// Drop the active map.
    pub fn deactivate(&mut self) {
        self.cache.clear();
        self.map = None;
    }

    /// Active map.
    pub fn map(&self) -> Option<&str> {
        self.map.as_deref()
    }

    /// Snapshot the bests a finished run competes against.
    pub fn prepare(&self, mut record: RunRecord) -> Submission {
        let key = record.key();
        if let Some(map) = &self.map {
            record.map = map.clone();
        }

        let server_best = self.cache.best(key).map(|r| r.time);
        let personal_best = self.cache.personal_best(record.player, key).map(|r| r.time);

        debug!(player = %record.player, ?key, time = record.time, ?server_best, ?personal_best, "run finished");

        Submission {
            record,
            server_best,
            personal_best,
        }
    }

    /// Apply the store's classification of a saved run, taking it as the
    /// player's new best when it is one.
    ///
    /// `still_connected` is false when the player left before the store
    /// answered; their bests are then not touched.
    pub fn reconcile(&mut self, saved: &RunRecord, result: RecordClass, still_connected: bool) -> Verdict {
        let rank = self.cache.rank(saved.key(), saved.time);

        if still_connected && result >= RecordClass::NewPersonalRecord {
            self.cache.set_personal_best(saved.clone());
        }

        if result == RecordClass::NewServerRecord {
            info!(player = %saved.player, name = %saved.player_name, key = ?saved.key(), time = saved.time, "new server record");
        }

        Verdict { result, rank }
    }

    /// Replace one bucket with the store's listing.
    pub fn replace_bucket(&mut self, key: BucketKey, records: Vec<RunRecord>) {
        self.cache.replace_bucket(key, records);
    }

    /// Replace every bucket with the store's full map listing.
    pub fn replace_all(&mut self, records: Vec<RunRecord>) {
        self.cache.replace_all(records);
        debug!(buckets = self.cache.bucket_count(), "record cache loaded");
    }

    /// Load a connecting player's bests.
    pub fn load_personal(&mut self, player: PlayerId, records: Vec<RunRecord>) {
        self.cache.load_personal(player, records);
    }

    /// Forget a disconnecting player's bests.
    pub fn clear_player(&mut self, player: PlayerId) {
        self.cache.clear_player(player);
    }

    /// 1-based rank `time` would take.
    pub fn rank(&self, key: BucketKey, time: f32) -> Result<usize, RecordError> {
        let key = validate_key(key)?;
        Ok(self.cache.rank(key, time))
    }

    /// Fastest run of a bucket.
    pub fn wr(&self, style: u32, track: u32, stage: u32) -> Result<Option<&RunRecord>, RecordError> {
        let key = validate_key(BucketKey::stage(style, track, stage))?;
        Ok(self.cache.best(key))
    }

    /// Fastest whole-track time.
    pub fn wr_time(&self, style: u32, track: u32) -> Result<Option<f32>, RecordError> {
        Ok(self.wr(style, track, 0)?.map(|r| r.time))
    }

    /// A player's best run of a bucket.
    pub fn personal_best(
        &self,
        player: PlayerId,
        style: u32,
        track: u32,
        stage: u32,
    ) -> Result<Option<&RunRecord>, RecordError> {
        let key = validate_key(BucketKey::stage(style, track, stage))?;
        Ok(self.cache.personal_best(player, key))
    }

    /// Runs of a bucket, fastest first.
    pub fn bucket(&self, key: BucketKey) -> Result<&[RunRecord], RecordError> {
        let key = validate_key(key)?;
        Ok(self.cache.bucket(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::run::{TimerKind, TimerRun};

    fn record(player: u64, key: BucketKey, time: f32) -> RunRecord {
        let mut record = RunRecord::from_run(PlayerId(player), &TimerRun::new(TimerKind::Main), key.stage);
        record.style = key.style;
        record.track = key.track;
        record.time = time;
        record
    }

    const MAIN: BucketKey = BucketKey::track(0, 0);

    #[test]
    fn test_validate_key() {
        assert!(validate_key(BucketKey::stage(0, 31, 63)).is_ok());
        assert_eq!(
            validate_key(BucketKey::stage(0, 32, 0)),
            Err(RecordError::InvalidTrackOrStage { track: 32, stage: 0 })
        );
        assert_eq!(
            validate_key(BucketKey::stage(0, 0, 64)),
            Err(RecordError::InvalidTrackOrStage { track: 0, stage: 64 })
        );
        assert_eq!(validate_key(BucketKey::track(16, 0)), Err(RecordError::InvalidStyle(16)));
    }

    #[test]
    fn test_first_run_is_server_record() {
        let mut evaluator = RecordEvaluator::new();
        evaluator.activate("surf_mesa");

        let submission = evaluator.prepare(record(1, MAIN, 60.0));
        assert_eq!(submission.record.map, "surf_mesa");
        assert_eq!(submission.server_best, None);

        let verdict = evaluator.reconcile(&submission.record, RecordClass::NewServerRecord, true);
        assert_eq!(verdict.result, RecordClass::NewServerRecord);
        assert_eq!(verdict.rank, 1);
        assert_eq!(evaluator.personal_best(PlayerId(1), 0, 0, 0).unwrap().unwrap().time, 60.0);
    }

    #[test]
    fn test_store_class_wins_over_snapshot() {
        let mut evaluator = RecordEvaluator::new();
        evaluator.activate("m");
        evaluator.replace_bucket(MAIN, vec![record(2, MAIN, 50.0)]);

        let submission = evaluator.prepare(record(1, MAIN, 45.0));
        assert_eq!(submission.server_best, Some(50.0));

        // Another player's faster run was saved first; the store says so
        evaluator.replace_bucket(MAIN, vec![record(3, MAIN, 40.0), record(2, MAIN, 50.0)]);

        let verdict = evaluator.reconcile(&submission.record, RecordClass::NewPersonalRecord, true);
        assert_eq!(verdict.result, RecordClass::NewPersonalRecord);
        assert_eq!(verdict.rank, 2);
        assert_eq!(evaluator.personal_best(PlayerId(1), 0, 0, 0).unwrap().unwrap().time, 45.0);
    }

    #[test]
    fn test_slower_than_personal_best() {
        let mut evaluator = RecordEvaluator::new();
        evaluator.activate("m");
        evaluator.replace_bucket(MAIN, vec![record(1, MAIN, 30.0)]);
        evaluator.load_personal(PlayerId(1), vec![record(1, MAIN, 30.0)]);

        let submission = evaluator.prepare(record(1, MAIN, 31.0));
        assert_eq!(submission.personal_best, Some(30.0));
        let verdict = evaluator.reconcile(&submission.record, RecordClass::NoNewRecord, true);

        assert_eq!(verdict.result, RecordClass::NoNewRecord);
        assert_eq!(verdict.rank, 2);
        assert_eq!(evaluator.personal_best(PlayerId(1), 0, 0, 0).unwrap().unwrap().time, 30.0);
    }

    #[test]
    fn test_disconnected_player_bests_untouched() {
        let mut evaluator = RecordEvaluator::new();
        evaluator.activate("m");

        let submission = evaluator.prepare(record(1, MAIN, 10.0));
        let verdict = evaluator.reconcile(&submission.record, RecordClass::NewServerRecord, false);

        assert_eq!(verdict.result, RecordClass::NewServerRecord);
        assert_eq!(evaluator.personal_best(PlayerId(1), 0, 0, 0).unwrap(), None);
    }

    #[test]
    fn test_queries_reject_bad_indices() {
        let evaluator = RecordEvaluator::new();
        assert!(evaluator.wr(0, 0, 64).is_err());
        assert!(evaluator.wr_time(0, 40).is_err());
        assert!(evaluator.rank(BucketKey::track(0, 99), 1.0).is_err());
        assert_eq!(evaluator.wr_time(0, 0), Ok(None));
    }

    #[test]
    fn test_activate_clears_previous_map() {
        let mut evaluator = RecordEvaluator::new();
        evaluator.activate("a");
        evaluator.replace_all(vec![record(1, MAIN, 10.0)]);
        assert_eq!(evaluator.wr_time(0, 0), Ok(Some(10.0)));

        evaluator.activate("b");
        assert_eq!(evaluator.wr_time(0, 0), Ok(None));
        assert_eq!(evaluator.map(), Some("b"));

        evaluator.deactivate();
        assert_eq!(evaluator.map(), None);
    }
}
