//! Timer Run State
//!
//! One [`TimerRun`] exists per timer per connected player. Runs are reset
//! in place, never reallocated, while the player stays connected.

use serde::{Serialize, Deserialize};

use crate::core::time::ticks_to_seconds;
use crate::core::vec3::Vec3;
use crate::zone::ZoneKind;

/// Timer status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerStatus {
    /// Not timing
    #[default]
    Stopped,
    /// Timing an attempt
    Running,
}

/// Which of a player's two timers a run belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerKind {
    /// Whole track
    Main,
    /// Current stage segment
    Stage,
}

impl TimerKind {
    /// Sequence index a freshly reset timer sits at.
    pub const fn initial_index(self) -> u32 {
        match self {
            TimerKind::Main => 0,
            TimerKind::Stage => 1,
        }
    }
}

// =============================================================================
// CHECKPOINTS
// =============================================================================

/// Statistics of a closed checkpoint segment.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CheckpointSnapshot {
    /// 1-based segment number
    pub index: u32,
    /// Run tick at closure
    pub tick: u32,
    /// Velocity when the segment was entered
    pub start_velocity: Vec3,
    /// Average velocity over the segment
    pub avg_velocity: Vec3,
    /// Velocity at closure
    pub end_velocity: Vec3,
    /// Run sync at closure
    pub sync: f32,
}

impl CheckpointSnapshot {
    /// Run time at closure in seconds.
    pub fn time(&self) -> f32 {
        ticks_to_seconds(self.tick)
    }
}

/// Segment being accumulated between two checkpoint touches.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OpenCheckpoint {
    /// Segment number
    pub index: u32,
    /// Run tick the segment opened at
    pub opened_at_tick: u32,
    /// Velocity when the segment opened
    pub start_velocity: Vec3,
    /// Running average velocity
    pub avg_velocity: Vec3,
}

impl OpenCheckpoint {
    /// Open a segment at `tick`.
    pub fn new(index: u32, tick: u32, start_velocity: Vec3) -> Self {
        Self {
            index,
            opened_at_tick: tick,
            start_velocity,
            avg_velocity: Vec3::ZERO,
        }
    }

    /// Fold one velocity sample into the average. `tick` is the run tick the
    /// sample belongs to and is always past `opened_at_tick`.
    #[inline]
    pub fn sample(&mut self, tick: u32, velocity: Vec3) {
        let n = tick.saturating_sub(self.opened_at_tick).max(1) as f32;
        self.avg_velocity = self.avg_velocity + (velocity - self.avg_velocity) / n;
    }

    fn close(self, tick: u32, end_velocity: Vec3, sync: f32) -> CheckpointSnapshot {
        CheckpointSnapshot {
            index: self.index,
            tick,
            start_velocity: self.start_velocity,
            avg_velocity: self.avg_velocity,
            end_velocity,
            sync,
        }
    }
}

// =============================================================================
// TIMER RUN
// =============================================================================

/// State of one timer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimerRun {
    /// Main or stage timer
    pub kind: TimerKind,
    /// Stopped or running
    pub status: TimerStatus,
    /// Ticks elapsed while running
    pub ticks: u32,
    /// Track being timed
    pub track: u32,
    /// Active style
    pub style: u32,
    /// Last checkpoint reached (main) or current stage (stage)
    pub current: u32,

    /// Jumps counted
    pub jumps: u32,
    /// Strafes counted
    pub strafes: u32,
    /// Airborne ticks where sync was measured
    pub sync_measures: u32,
    /// Measured ticks where turn direction matched the strafe key
    pub good_sync: u32,

    /// Running average velocity
    pub avg_velocity: Vec3,
    /// Fastest velocity seen
    pub max_velocity: Vec3,
    /// Velocity at start (after the prespeed clamp)
    pub start_velocity: Vec3,
    /// Velocity at finish
    pub end_velocity: Vec3,

    /// Closed checkpoint segments, in order
    pub checkpoints: Vec<CheckpointSnapshot>,
    /// Segment currently accumulating
    pub open_checkpoint: Option<OpenCheckpoint>,

    /// Yaw seen on the previous sampled tick
    pub last_yaw: f32,
    /// Lateral input seen on the previous sampled tick
    pub last_side_move: f32,
    /// Forward input seen on the previous tick
    pub last_forward_move: f32,
    /// Consecutive ticks on the ground
    pub ground_ticks: u32,
    /// Ground flag of the previous tick
    pub was_on_ground: bool,
    /// Kind of zone the player is currently inside
    pub current_zone: Option<ZoneKind>,
}

impl TimerRun {
    /// Create a stopped timer on the main track.
    pub fn new(kind: TimerKind) -> Self {
        Self {
            kind,
            status: TimerStatus::Stopped,
            ticks: 0,
            track: 0,
            style: 0,
            current: kind.initial_index(),
            jumps: 0,
            strafes: 0,
            sync_measures: 0,
            good_sync: 0,
            avg_velocity: Vec3::ZERO,
            max_velocity: Vec3::ZERO,
            start_velocity: Vec3::ZERO,
            end_velocity: Vec3::ZERO,
            checkpoints: Vec::new(),
            open_checkpoint: None,
            last_yaw: 0.0,
            last_side_move: 0.0,
            last_forward_move: 0.0,
            ground_ticks: 0,
            was_on_ground: false,
            current_zone: None,
        }
    }

    /// Whether the timer is running.
    #[inline]
    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Elapsed time in seconds. Always exactly `ticks * TICK_INTERVAL`.
    #[inline]
    pub fn time(&self) -> f32 {
        ticks_to_seconds(self.ticks)
    }

    /// Strafe sync in `[0, 1]`; 1 when nothing was measured.
    pub fn sync(&self) -> f32 {
        if self.sync_measures == 0 {
            1.0
        } else {
            self.good_sync as f32 / self.sync_measures as f32
        }
    }

    fn clear_stats(&mut self, clear_jumps: bool) {
        self.ticks = 0;
        if clear_jumps {
            self.jumps = 0;
        }
        self.strafes = 0;
        self.sync_measures = 0;
        self.good_sync = 0;
        self.avg_velocity = Vec3::ZERO;
        self.max_velocity = Vec3::ZERO;
        self.start_velocity = Vec3::ZERO;
        self.end_velocity = Vec3::ZERO;
        self.checkpoints.clear();
        self.open_checkpoint = None;
    }

    /// Begin timing at sequence index `index`.
    ///
    /// A single prejump survives into the run when the player leaves
    /// airborne; anything else starts the jump count from zero.
    pub fn start(&mut self, track: u32, velocity: Vec3, index: u32) {
        let airborne = velocity.z.abs() >= f32::EPSILON;
        self.clear_stats(!airborne || self.jumps > 1);

        self.status = TimerStatus::Running;
        self.track = track;
        self.current = index;
        self.start_velocity = velocity;
    }

    /// Stop timing and discard the attempt. The sequence index is kept so a
    /// stage timer can be restarted from the next stage.
    pub fn stop(&mut self) {
        self.clear_stats(true);
        self.status = TimerStatus::Stopped;
    }

    /// Stop and rewind to the beginning of the track.
    pub fn reset(&mut self) {
        self.stop();
        self.current = self.kind.initial_index();
    }

    /// Switch track. Stops and rewinds first.
    pub fn change_track(&mut self, track: u32) {
        self.reset();
        self.track = track;
    }

    /// Switch style. Stops and rewinds first.
    pub fn change_style(&mut self, style: u32) {
        self.reset();
        self.style = style;
    }

    /// Start accumulating a checkpoint segment at the current tick.
    pub fn open_checkpoint(&mut self, index: u32, velocity: Vec3) {
        self.open_checkpoint = Some(OpenCheckpoint::new(index, self.ticks, velocity));
    }

    /// Close the open segment at the current tick. Returns the snapshot.
    pub fn close_checkpoint(&mut self, end_velocity: Vec3) -> Option<CheckpointSnapshot> {
        let open = self.open_checkpoint.take()?;
        let snapshot = open.close(self.ticks, end_velocity, self.sync());
        self.checkpoints.push(snapshot);
        Some(snapshot)
    }

    /// Track one tick of ground contact for the prejump window.
    pub fn update_ground(&mut self, on_ground: bool, forward_move: f32) {
        if on_ground {
            self.ground_ticks = self.ground_ticks.saturating_add(1);
        } else {
            self.ground_ticks = 0;
        }
        self.was_on_ground = on_ground;
        self.last_forward_move = forward_move;
    }
}
