//! Timer State Machine
//!
//! Drives a player's main and stage timers from zone transitions. All
//! reactions are synchronous; lifecycle events are collected into a
//! [`TransitionResult`] for the caller to publish.
//!
//! | Zone        | Enter                              | Exit                         |
//! |-------------|------------------------------------|------------------------------|
//! | Start       | reset both                         | clamp, start main (+ stage 1)|
//! | End         | finish both                        |                              |
//! | Stage N     | finish stage N-1, or abort on skip | start stage N                |
//! | Checkpoint N| close segment, or abort on skip    |                              |
//! | StopTimer   | stop both                          |                              |

use crate::core::time::format_time;
use crate::core::vec3::Vec3;
use crate::record::RunRecord;
use crate::slots::{PlayerId, PlayerSlot};
use crate::timer::events::{TimerEvent, ViolationKind};
use crate::timer::gate::{self, clamp_prespeed, GateOutcome, PrejumpRule, PrespeedLimits};
use crate::timer::input::{MoveInput, TickSnapshot};
use crate::timer::run::{TimerKind, TimerRun};
use crate::timer::sampler::{self, SampleContext};
use crate::zone::{Zone, ZoneKind, ZoneRegistry};

/// Player a transition belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Runner {
    /// Current slot
    pub slot: PlayerSlot,
    /// Identity
    pub player: PlayerId,
}

/// Result of a zone transition.
#[derive(Debug, Default)]
pub struct TransitionResult {
    /// Events generated, in order
    pub events: Vec<TimerEvent>,
}

/// A player's main and stage timers.
#[derive(Clone, Debug, PartialEq)]
pub struct TimerPair {
    /// Whole-track timer
    pub main: TimerRun,
    /// Current-stage timer
    pub stage: TimerRun,
}

impl TimerPair {
    /// Two stopped timers on the main track.
    pub fn new() -> Self {
        Self {
            main: TimerRun::new(TimerKind::Main),
            stage: TimerRun::new(TimerKind::Stage),
        }
    }

    /// Track the player is on.
    pub fn track(&self) -> u32 {
        self.main.track
    }

    /// Style the player uses.
    pub fn style(&self) -> u32 {
        self.main.style
    }

    fn set_zone(&mut self, kind: Option<ZoneKind>) {
        self.main.current_zone = kind;
        self.stage.current_zone = kind;
    }

    // =========================================================================
    // Zone transitions
    // =========================================================================

    /// Player started touching a zone.
    pub fn enter_zone(&mut self, who: Runner, zone: &Zone, velocity: Vec3, zones: &ZoneRegistry) -> TransitionResult {
        let mut result = TransitionResult::default();

        if zone.track != self.track() {
            return result;
        }

        self.set_zone(Some(zone.kind));

        match zone.kind {
            ZoneKind::Start => {
                self.main.reset();
                self.stage.reset();
            }
            ZoneKind::End => self.enter_end(who, velocity, zones, &mut result),
            ZoneKind::Stage => self.enter_stage(who, zone.index, velocity, &mut result),
            ZoneKind::Checkpoint => self.enter_checkpoint(who, zone.index, velocity, &mut result),
            ZoneKind::StopTimer => self.stop(),
        }

        result
    }

    fn enter_end(&mut self, who: Runner, velocity: Vec3, zones: &ZoneRegistry, result: &mut TransitionResult) {
        if self.stage.is_running() {
            self.stage.end_velocity = velocity;
            let record = RunRecord::from_run(who.player, &self.stage, self.stage.current);
            result.events.push(TimerEvent::StageFinish { slot: who.slot, record });
            self.stage.stop();
        }

        if self.main.is_running() {
            self.main.end_velocity = velocity;
            if zones.has_checkpoints(self.main.track) {
                self.main.close_checkpoint(velocity);
            }
            let record = RunRecord::from_run(who.player, &self.main, 0);
            result.events.push(TimerEvent::Finish { slot: who.slot, record });
            self.main.stop();
        }
    }

    fn enter_stage(&mut self, who: Runner, entered: u32, velocity: Vec3, result: &mut TransitionResult) {
        if !self.stage.is_running() {
            return;
        }

        let expected = self.stage.current + 1;
        if entered != expected {
            self.stop();
            result.events.push(TimerEvent::SequenceViolation {
                slot: who.slot,
                player: who.player,
                kind: ViolationKind::MissingStage { expected, entered },
            });
            return;
        }

        self.stage.end_velocity = velocity;
        let record = RunRecord::from_run(who.player, &self.stage, self.stage.current);
        result.events.push(TimerEvent::StageFinish { slot: who.slot, record });
        self.stage.stop();
    }

    fn enter_checkpoint(&mut self, who: Runner, touched: u32, velocity: Vec3, result: &mut TransitionResult) {
        if !self.main.is_running() || touched <= self.main.current {
            return;
        }

        let expected = self.main.current + 1;
        if touched != expected {
            self.main.stop();
            result.events.push(TimerEvent::SequenceViolation {
                slot: who.slot,
                player: who.player,
                kind: ViolationKind::MissingCheckpoint { expected, touched },
            });
            return;
        }

        self.main.close_checkpoint(velocity);
        self.main.open_checkpoint(touched + 1, velocity);
        self.main.current = touched;

        let time = self.main.time();
        result.events.push(TimerEvent::CheckpointReached {
            slot: who.slot,
            player: who.player,
            index: touched,
            time,
            formatted: format_time(time, true),
        });
    }

    /// Player stopped touching a zone. Returns the velocity the host should
    /// write back to the player.
    pub fn exit_zone(
        &mut self,
        who: Runner,
        zone: &Zone,
        velocity: Vec3,
        zones: &ZoneRegistry,
        limits: PrespeedLimits,
    ) -> (Vec3, TransitionResult) {
        let mut result = TransitionResult::default();

        if zone.track != self.track() {
            return (velocity, result);
        }

        self.set_zone(None);

        let track = zone.track;
        match zone.kind {
            ZoneKind::Start => {
                if !zones.has_zone(track, ZoneKind::End) {
                    return (velocity, result);
                }

                let (clamped, _) = clamp_prespeed(velocity, limits);

                self.main.start(track, clamped, 0);
                if zones.has_checkpoints(track) {
                    self.main.open_checkpoint(1, clamped);
                }
                result.events.push(TimerEvent::TimerStart {
                    slot: who.slot,
                    player: who.player,
                    track,
                    start_velocity: clamped,
                });

                if !zones.is_linear(track) {
                    self.stage.start(track, clamped, 1);
                    result.events.push(TimerEvent::StageTimerStart {
                        slot: who.slot,
                        player: who.player,
                        track,
                        stage: 1,
                    });
                }

                (clamped, result)
            }
            ZoneKind::Stage => {
                if !zones.is_linear(track) && self.stage.current + 1 == zone.index {
                    self.stage.start(track, velocity, zone.index);
                    result.events.push(TimerEvent::StageTimerStart {
                        slot: who.slot,
                        player: who.player,
                        track,
                        stage: zone.index,
                    });
                }
                (velocity, result)
            }
            _ => (velocity, result),
        }
    }

    /// Player is still touching a zone (fires continuously).
    pub fn trigger_zone(&mut self, zone: &Zone) {
        if zone.track != self.track() {
            return;
        }

        if zone.kind == ZoneKind::StopTimer {
            self.stop();
        }
        self.set_zone(Some(zone.kind));
    }

    // =========================================================================
    // Per-tick input
    // =========================================================================

    /// Pre-move gate. See [`gate::process_move`].
    pub fn process_move(&mut self, input: &mut MoveInput, rule: PrejumpRule) -> GateOutcome {
        gate::process_move(&mut self.main, &mut self.stage, input, rule)
    }

    /// Sample a post-command tick into both running timers.
    pub fn sample(&mut self, tick: &TickSnapshot, ctx: SampleContext) {
        sampler::sample(&mut self.main, tick, ctx);
        sampler::sample(&mut self.stage, tick, ctx);
    }

    /// Player jumped.
    pub fn jump(&mut self) {
        self.main.jumps = self.main.jumps.saturating_add(1);
        self.stage.jumps = self.stage.jumps.saturating_add(1);
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Stop both timers, discarding the attempt.
    pub fn stop(&mut self) {
        self.main.stop();
        self.stage.stop();
    }

    /// Change style. Both timers stop and rewind.
    pub fn change_style(&mut self, style: u32) {
        self.main.change_style(style);
        self.stage.change_style(style);
    }

    /// Change track. Both timers stop and rewind.
    pub fn change_track(&mut self, track: u32) {
        self.main.change_track(track);
        self.stage.change_track(track);
    }
}

impl Default for TimerPair {
    fn default() -> Self {
        Self::new()
    }
}
