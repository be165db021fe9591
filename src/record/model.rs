//! Record Model
//!
//! Values exchanged with the results store.

use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

use crate::core::vec3::Vec3;
use crate::slots::PlayerId;
use crate::timer::run::{CheckpointSnapshot, TimerRun};

/// Leaderboard a run competes on. Stage 0 is the whole track.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BucketKey {
    /// Style
    pub style: u32,
    /// Track
    pub track: u32,
    /// Stage, 0 for the whole track
    pub stage: u32,
}

impl BucketKey {
    /// Whole-track bucket.
    pub const fn track(style: u32, track: u32) -> Self {
        Self { style, track, stage: 0 }
    }

    /// Stage bucket.
    pub const fn stage(style: u32, track: u32, stage: u32) -> Self {
        Self { style, track, stage }
    }
}

/// A completed run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Store id, assigned on save
    pub id: Option<Uuid>,
    /// Player identity
    pub player: PlayerId,
    /// Player name at the time of the run
    pub player_name: String,
    /// Map
    pub map: String,
    /// Style
    pub style: u32,
    /// Track
    pub track: u32,
    /// Stage, 0 for the whole track
    pub stage: u32,
    /// Elapsed time in seconds
    pub time: f32,
    /// Elapsed ticks
    pub ticks: u32,
    /// Jumps
    pub jumps: u32,
    /// Strafes
    pub strafes: u32,
    /// Strafe sync in `[0, 1]`
    pub sync: f32,
    /// Velocity at start
    pub start_velocity: Vec3,
    /// Average velocity
    pub avg_velocity: Vec3,
    /// Velocity at finish
    pub end_velocity: Vec3,
    /// Peak velocity
    pub max_velocity: Vec3,
    /// Checkpoint segments in order
    pub checkpoints: Vec<CheckpointSnapshot>,
    /// Save time, assigned on save
    pub run_date: Option<DateTime<Utc>>,
}

impl RunRecord {
    /// Capture a finished timer. Map and player name are filled in by the
    /// caller that knows them.
    pub fn from_run(player: PlayerId, run: &TimerRun, stage: u32) -> Self {
        Self {
            id: None,
            player,
            player_name: String::new(),
            map: String::new(),
            style: run.style,
            track: run.track,
            stage,
            time: run.time(),
            ticks: run.ticks,
            jumps: run.jumps,
            strafes: run.strafes,
            sync: run.sync(),
            start_velocity: run.start_velocity,
            avg_velocity: run.avg_velocity,
            end_velocity: run.end_velocity,
            max_velocity: run.max_velocity,
            checkpoints: run.checkpoints.clone(),
            run_date: None,
        }
    }

    /// Bucket this run belongs to.
    pub fn key(&self) -> BucketKey {
        BucketKey::stage(self.style, self.track, self.stage)
    }
}

/// Outcome of a run against the bests saved before it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RecordClass {
    /// Slower than or equal to the personal best
    NoNewRecord,
    /// Beat the player's own best
    NewPersonalRecord,
    /// Beat the server best
    NewServerRecord,
}

impl RecordClass {
    /// Classify `time`. Strictly faster wins; a missing best is always beaten.
    pub fn classify(time: f32, server_best: Option<f32>, personal_best: Option<f32>) -> Self {
        let beats = |best: Option<f32>| best.map_or(true, |b| time < b);

        if beats(server_best) {
            RecordClass::NewServerRecord
        } else if beats(personal_best) {
            RecordClass::NewPersonalRecord
        } else {
            RecordClass::NoNewRecord
        }
    }
}

/// Player profile held by the store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    /// Store id
    pub id: Uuid,
    /// Player identity
    pub player: PlayerId,
    /// Last seen name
    pub name: String,
    /// First connection
    pub joined_at: DateTime<Utc>,
}
