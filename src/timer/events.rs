//! Timer Events
//!
//! Lifecycle notifications broadcast to subscribers (HUD, chat, replay
//! recorder). Delivery never feeds back into timer state.

use serde::{Serialize, Deserialize};

use crate::core::vec3::Vec3;
use crate::record::{RecordClass, RunRecord};
use crate::slots::{PlayerId, PlayerSlot};

/// Why a run was aborted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViolationKind {
    /// A checkpoint was touched before the one preceding it
    MissingCheckpoint {
        /// Checkpoint the run expected next
        expected: u32,
        /// Checkpoint that was touched
        touched: u32,
    },
    /// A stage was entered out of order
    MissingStage {
        /// Stage the run expected next
        expected: u32,
        /// Stage that was entered
        entered: u32,
    },
}

/// Timer lifecycle event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TimerEvent {
    /// Main timer started
    TimerStart {
        /// Player slot
        slot: PlayerSlot,
        /// Player identity
        player: PlayerId,
        /// Track
        track: u32,
        /// Velocity after the prespeed clamp
        start_velocity: Vec3,
    },

    /// Main timer reached the end zone
    Finish {
        /// Player slot
        slot: PlayerSlot,
        /// Finished run (not yet saved)
        record: RunRecord,
    },

    /// Stage timer started
    StageTimerStart {
        /// Player slot
        slot: PlayerSlot,
        /// Player identity
        player: PlayerId,
        /// Track
        track: u32,
        /// Stage being timed
        stage: u32,
    },

    /// Stage timer completed its stage
    StageFinish {
        /// Player slot
        slot: PlayerSlot,
        /// Finished stage run (not yet saved)
        record: RunRecord,
    },

    /// Checkpoint touched in order
    CheckpointReached {
        /// Player slot
        slot: PlayerSlot,
        /// Player identity
        player: PlayerId,
        /// Checkpoint number
        index: u32,
        /// Run time at the checkpoint in seconds
        time: f32,
        /// Run time as `mm:ss.mmm`
        formatted: String,
    },

    /// Run aborted for skipping part of the track
    SequenceViolation {
        /// Player slot
        slot: PlayerSlot,
        /// Player identity
        player: PlayerId,
        /// What was skipped
        kind: ViolationKind,
    },

    /// Results store confirmed a run
    RecordSaved {
        /// Player slot at the time of saving
        slot: PlayerSlot,
        /// Classification by the store against the runs saved before it
        result: RecordClass,
        /// Canonical saved record
        record: RunRecord,
        /// Server best time when the run finished
        server_best: Option<f32>,
        /// Player's best time when the run finished
        personal_best: Option<f32>,
    },
}

impl TimerEvent {
    /// Slot the event concerns.
    pub fn slot(&self) -> PlayerSlot {
        match self {
            TimerEvent::TimerStart { slot, .. }
            | TimerEvent::Finish { slot, .. }
            | TimerEvent::StageTimerStart { slot, .. }
            | TimerEvent::StageFinish { slot, .. }
            | TimerEvent::CheckpointReached { slot, .. }
            | TimerEvent::SequenceViolation { slot, .. }
            | TimerEvent::RecordSaved { slot, .. } => *slot,
        }
    }

    /// Player the event concerns.
    pub fn player(&self) -> PlayerId {
        match self {
            TimerEvent::TimerStart { player, .. }
            | TimerEvent::StageTimerStart { player, .. }
            | TimerEvent::CheckpointReached { player, .. }
            | TimerEvent::SequenceViolation { player, .. } => *player,
            TimerEvent::Finish { record, .. }
            | TimerEvent::StageFinish { record, .. }
            | TimerEvent::RecordSaved { record, .. } => record.player,
        }
    }

    /// Chat line for the event, when players should see one.
    pub fn chat_message(&self) -> Option<String> {
        match self {
            TimerEvent::CheckpointReached { index, formatted, .. } => {
                Some(format!("Reached CP{} with time {}", index, formatted))
            }
            TimerEvent::SequenceViolation { kind: ViolationKind::MissingCheckpoint { .. }, .. } => {
                Some("Timer stopped: missing checkpoints".to_string())
            }
            TimerEvent::SequenceViolation { kind: ViolationKind::MissingStage { .. }, .. } => {
                Some("Missing stages, stopping timer".to_string())
            }
            _ => None,
        }
    }
}
