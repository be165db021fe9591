//! In-Memory Results Store
//!
//! Reference backend used by the demo binary and the tests. Runs are kept in
//! submission order and sorted stably on read, which gives the documented
//! tie-break for equal times.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use super::{ResultsStore, StoreError};
use crate::record::{BucketKey, PlayerProfile, RecordClass, RunRecord};
use crate::slots::PlayerId;

#[derive(Debug, Default)]
struct MemoryState {
    runs: Vec<RunRecord>,
    profiles: BTreeMap<PlayerId, PlayerProfile>,
}

/// Results store backed by process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    offline: AtomicBool,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with [`StoreError::Unavailable`] while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of saved runs.
    pub async fn run_count(&self) -> usize {
        self.state.read().await.runs.len()
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StoreError::Unavailable("memory store is offline".to_string()))
        } else {
            Ok(())
        }
    }

    async fn list<F>(&self, filter: F) -> Result<Vec<RunRecord>, StoreError>
    where
        F: Fn(&RunRecord) -> bool,
    {
        self.check_online()?;
        let state = self.state.read().await;
        let mut runs: Vec<RunRecord> = state.runs.iter().filter(|r| filter(r)).cloned().collect();
        runs.sort_by(|a, b| a.time.total_cmp(&b.time));
        Ok(runs)
    }
}

impl ResultsStore for MemoryStore {
    fn map_records<'a>(&'a self, map: &'a str) -> BoxFuture<'a, Result<Vec<RunRecord>, StoreError>> {
        self.list(move |r| r.map == map).boxed()
    }

    fn bucket_records<'a>(
        &'a self,
        map: &'a str,
        key: BucketKey,
    ) -> BoxFuture<'a, Result<Vec<RunRecord>, StoreError>> {
        self.list(move |r| r.map == map && r.key() == key).boxed()
    }

    fn submit_run<'a>(
        &'a self,
        map: &'a str,
        mut record: RunRecord,
    ) -> BoxFuture<'a, Result<(RecordClass, RunRecord), StoreError>> {
        async move {
            self.check_online()?;

            record.id = Some(Uuid::new_v4());
            record.run_date = Some(Utc::now());
            record.map = map.to_string();

            let mut state = self.state.write().await;

            // Bests as they stand under the write lock, before this run
            let key = record.key();
            let mut server_best: Option<f32> = None;
            let mut personal_best: Option<f32> = None;
            for run in state.runs.iter().filter(|r| r.map == map && r.key() == key) {
                server_best = Some(server_best.map_or(run.time, |b| b.min(run.time)));
                if run.player == record.player {
                    personal_best = Some(personal_best.map_or(run.time, |b| b.min(run.time)));
                }
            }
            let result = RecordClass::classify(record.time, server_best, personal_best);

            state.runs.push(record.clone());
            debug!(map, player = %record.player, time = record.time, ?result, "run saved");

            Ok((result, record))
        }
        .boxed()
    }

    fn player_records<'a>(
        &'a self,
        player: PlayerId,
        map: &'a str,
    ) -> BoxFuture<'a, Result<Vec<RunRecord>, StoreError>> {
        self.list(move |r| r.player == player && r.map == map).boxed()
    }

    fn player_profile<'a>(
        &'a self,
        player: PlayerId,
        name: &'a str,
    ) -> BoxFuture<'a, Result<PlayerProfile, StoreError>> {
        async move {
            self.check_online()?;

            let mut state = self.state.write().await;
            let profile = state.profiles.entry(player).or_insert_with(|| PlayerProfile {
                id: Uuid::new_v4(),
                player,
                name: name.to_string(),
                joined_at: Utc::now(),
            });
            profile.name = name.to_string();

            Ok(profile.clone())
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vec3::Vec3;
    use crate::timer::run::{CheckpointSnapshot, TimerKind, TimerRun};

    fn run(player: u64, key: BucketKey, time: f32) -> RunRecord {
        let mut record = RunRecord::from_run(PlayerId(player), &TimerRun::new(TimerKind::Main), key.stage);
        record.style = key.style;
        record.track = key.track;
        record.time = time;
        record.player_name = format!("player{}", player);
        record
    }

    const MAIN: BucketKey = BucketKey::track(0, 0);

    #[tokio::test]
    async fn test_submit_assigns_identity() {
        let store = MemoryStore::new();
        let mut record = run(1, MAIN, 12.5);
        record.jumps = 9;
        record.sync = 0.8;
        record.start_velocity = Vec3::new(290.0, 0.0, 0.0);
        record.checkpoints = vec![CheckpointSnapshot {
            index: 1,
            tick: 320,
            start_velocity: Vec3::new(290.0, 0.0, 0.0),
            avg_velocity: Vec3::new(500.0, 0.0, 0.0),
            end_velocity: Vec3::new(700.0, 0.0, 0.0),
            sync: 0.75,
        }];

        let (result, saved) = store.submit_run("surf_utopia", record.clone()).await.unwrap();
        assert_eq!(result, RecordClass::NewServerRecord);
        assert!(saved.id.is_some());
        assert!(saved.run_date.is_some());
        assert_eq!(saved.map, "surf_utopia");

        // Everything but the store-assigned fields survives the round trip
        let listed = store.bucket_records("surf_utopia", MAIN).await.unwrap();
        assert_eq!(listed, vec![saved.clone()]);
        let mut expected = record;
        expected.id = saved.id;
        expected.run_date = saved.run_date;
        expected.map = saved.map.clone();
        assert_eq!(saved, expected);
    }

    #[tokio::test]
    async fn test_equal_times_in_submission_order() {
        let store = MemoryStore::new();
        store.submit_run("m", run(2, MAIN, 10.0)).await.unwrap();
        store.submit_run("m", run(1, MAIN, 10.0)).await.unwrap();
        store.submit_run("m", run(3, MAIN, 9.0)).await.unwrap();

        let order: Vec<u64> = store
            .bucket_records("m", MAIN)
            .await
            .unwrap()
            .iter()
            .map(|r| r.player.0)
            .collect();
        assert_eq!(order, vec![3, 2, 1]);
    }

    #[tokio::test]
    async fn test_submit_classifies_against_saved_runs() {
        let store = MemoryStore::new();
        let class = |r: Result<(RecordClass, RunRecord), StoreError>| r.unwrap().0;

        assert_eq!(class(store.submit_run("m", run(1, MAIN, 10.0)).await), RecordClass::NewServerRecord);
        // Equal time is not a record for anyone
        assert_eq!(class(store.submit_run("m", run(2, MAIN, 10.0)).await), RecordClass::NewPersonalRecord);
        assert_eq!(class(store.submit_run("m", run(2, MAIN, 10.0)).await), RecordClass::NoNewRecord);
        assert_eq!(class(store.submit_run("m", run(1, MAIN, 11.0)).await), RecordClass::NoNewRecord);
        assert_eq!(class(store.submit_run("m", run(2, MAIN, 9.5)).await), RecordClass::NewServerRecord);

        // Other maps and buckets do not count
        assert_eq!(class(store.submit_run("other", run(1, MAIN, 20.0)).await), RecordClass::NewServerRecord);
        assert_eq!(
            class(store.submit_run("m", run(1, BucketKey::stage(0, 0, 2), 20.0)).await),
            RecordClass::NewServerRecord
        );
    }

    #[tokio::test]
    async fn test_concurrent_submits_one_server_record() {
        let store = MemoryStore::new();
        let (a, b) = tokio::join!(
            store.submit_run("m", run(1, MAIN, 10.0)),
            store.submit_run("m", run(2, MAIN, 10.0)),
        );

        let mut classes = vec![a.unwrap().0, b.unwrap().0];
        classes.sort();
        assert_eq!(classes, vec![RecordClass::NewPersonalRecord, RecordClass::NewServerRecord]);
    }

    #[tokio::test]
    async fn test_listings_filter_by_map_and_bucket() {
        let store = MemoryStore::new();
        store.submit_run("a", run(1, MAIN, 10.0)).await.unwrap();
        store.submit_run("a", run(1, BucketKey::stage(0, 0, 2), 3.0)).await.unwrap();
        store.submit_run("b", run(1, MAIN, 8.0)).await.unwrap();
        store.submit_run("a", run(2, MAIN, 11.0)).await.unwrap();

        assert_eq!(store.map_records("a").await.unwrap().len(), 3);
        assert_eq!(store.bucket_records("a", MAIN).await.unwrap().len(), 2);
        assert_eq!(store.player_records(PlayerId(1), "a").await.unwrap().len(), 2);
        assert_eq!(store.run_count().await, 4);
    }

    #[tokio::test]
    async fn test_profile_created_once_and_renamed() {
        let store = MemoryStore::new();
        let first = store.player_profile(PlayerId(9), "old").await.unwrap();
        let second = store.player_profile(PlayerId(9), "new").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "new");
        assert_eq!(first.joined_at, second.joined_at);
    }

    #[tokio::test]
    async fn test_offline_fails() {
        let store = MemoryStore::new();
        store.set_offline(true);
        assert!(matches!(
            store.submit_run("m", run(1, MAIN, 1.0)).await,
            Err(StoreError::Unavailable(_))
        ));
        store.set_offline(false);
        assert!(store.map_records("m").await.unwrap().is_empty());
    }
}
