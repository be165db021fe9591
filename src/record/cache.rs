//! Best-Time Cache
//!
//! Per-bucket lists of known runs for the current map, ascending by time,
//! plus each connected player's personal bests. Buckets are only ever
//! replaced wholesale from the store's answer, never patched locally.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use crate::record::model::{BucketKey, RunRecord};
use crate::slots::PlayerId;

/// Sorted best-time cache.
#[derive(Clone, Debug, Default)]
pub struct RecordCache {
    buckets: BTreeMap<BucketKey, Vec<RunRecord>>,
    personal: BTreeMap<(PlayerId, BucketKey), RunRecord>,
}

/// Stable sort ascending by time. Equal times keep the store's order.
fn sort_by_time(records: &mut [RunRecord]) {
    records.sort_by(|a, b| a.time.total_cmp(&b.time));
}

impl RecordCache {
    /// Empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every bucket with a full map listing.
    pub fn replace_all(&mut self, records: Vec<RunRecord>) {
        self.buckets.clear();
        for record in records {
            self.buckets.entry(record.key()).or_default().push(record);
        }
        for bucket in self.buckets.values_mut() {
            sort_by_time(bucket);
        }
    }

    /// Replace one bucket with the store's listing.
    pub fn replace_bucket(&mut self, key: BucketKey, mut records: Vec<RunRecord>) {
        records.retain(|r| r.key() == key);
        sort_by_time(&mut records);
        if records.is_empty() {
            self.buckets.remove(&key);
        } else {
            self.buckets.insert(key, records);
        }
    }

    /// All known runs of a bucket, fastest first.
    pub fn bucket(&self, key: BucketKey) -> &[RunRecord] {
        self.buckets.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Fastest run of a bucket.
    pub fn best(&self, key: BucketKey) -> Option<&RunRecord> {
        self.bucket(key).first()
    }

    /// 1-based position `time` would take in a bucket. Ties rank with the
    /// existing run.
    pub fn rank(&self, key: BucketKey, time: f32) -> usize {
        self.bucket(key).partition_point(|r| r.time < time) + 1
    }

    /// Number of runs in a bucket.
    pub fn total(&self, key: BucketKey) -> usize {
        self.bucket(key).len()
    }

    /// A player's best run in a bucket.
    pub fn personal_best(&self, player: PlayerId, key: BucketKey) -> Option<&RunRecord> {
        self.personal.get(&(player, key))
    }

    /// Record a player's new best.
    pub fn set_personal_best(&mut self, record: RunRecord) {
        self.personal.insert((record.player, record.key()), record);
    }

    /// Rebuild a player's bests from their stored runs.
    pub fn load_personal(&mut self, player: PlayerId, records: Vec<RunRecord>) {
        self.clear_player(player);
        for record in records.into_iter().filter(|r| r.player == player) {
            match self.personal.entry((player, record.key())) {
                Entry::Vacant(e) => {
                    e.insert(record);
                }
                Entry::Occupied(mut e) => {
                    if record.time < e.get().time {
                        e.insert(record);
                    }
                }
            }
        }
    }

    /// Forget a player's bests.
    pub fn clear_player(&mut self, player: PlayerId) {
        self.personal.retain(|(p, _), _| *p != player);
    }

    /// Forget everything (map change).
    pub fn clear(&mut self) {
        self.buckets.clear();
        self.personal.clear();
    }

    /// Number of non-empty buckets.
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}
