//! Anti-Exploit Gate
//!
//! Two limits keep starts fair:
//! - leaving a start zone clamps horizontal and vertical speed
//! - jumping out of a start zone after too many prejumps kills the jump

use crate::core::vec3::Vec3;
use crate::timer::input::{MoveInput, MoveType};
use crate::timer::run::TimerRun;
use crate::zone::ZoneKind;

/// Speed caps applied when leaving a start zone.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrespeedLimits {
    /// Horizontal speed cap
    pub max_2d: f32,
    /// Upward speed cap
    pub max_z: f32,
}

/// Jump cap applied while taking off inside a start zone.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrejumpRule {
    /// Jumps allowed before the take-off is cancelled
    pub max_jumps: u32,
    /// Ground ticks after landing that still count as a bunnyhop
    pub ground_window: u32,
}

/// What the pre-move gate did on a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateOutcome {
    /// Input passed through
    Pass,
    /// Take-off cancelled by the prejump cap
    PrejumpCapped,
    /// Player is flying through geometry; both timers stopped
    NoClip,
}

/// Clamp a start-zone exit velocity.
///
/// Returns the velocity to write back and whether it changed.
pub fn clamp_prespeed(velocity: Vec3, limits: PrespeedLimits) -> (Vec3, bool) {
    let mut clamped = velocity;
    let mut changed = false;

    let scale = limits.max_2d / velocity.length_2d().max(1.0);
    if scale < 1.0 {
        clamped.x *= scale;
        clamped.y *= scale;
        changed = true;
    }

    if clamped.z > limits.max_z {
        clamped.z = limits.max_z;
        changed = true;
    }

    (clamped, changed)
}

/// Whether either timer places the player in a start zone.
fn in_start_zone(main: &TimerRun, stage: &TimerRun) -> bool {
    main.current_zone == Some(ZoneKind::Start) || stage.current_zone == Some(ZoneKind::Stage)
}

/// Run the pre-move gate for one tick and update ground tracking.
///
/// May zero `input.velocity`, `input.forward_move` and `input.side_move`.
pub fn process_move(
    main: &mut TimerRun,
    stage: &mut TimerRun,
    input: &mut MoveInput,
    rule: PrejumpRule,
) -> GateOutcome {
    if input.move_type == MoveType::NoClip {
        main.stop();
        stage.stop();
        main.ground_ticks = 0;
        stage.ground_ticks = 0;
        return GateOutcome::NoClip;
    }

    let mut outcome = GateOutcome::Pass;

    let just_left_ground = !input.on_ground && (main.was_on_ground || stage.was_on_ground);
    let within_window = main.ground_ticks <= rule.ground_window || stage.ground_ticks <= rule.ground_window;

    if in_start_zone(main, stage) && just_left_ground && within_window {
        let max = rule.max_jumps;
        if main.jumps >= max || stage.jumps >= max {
            input.velocity = Vec3::ZERO;
            input.forward_move = 0.0;
            input.side_move = 0.0;
            main.jumps = 0;
            stage.jumps = 0;
            outcome = GateOutcome::PrejumpCapped;
        }
    }

    main.update_ground(input.on_ground, input.forward_move);
    stage.update_ground(input.on_ground, input.forward_move);

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::input::Buttons;
    use crate::timer::run::TimerKind;

    const LIMITS: PrespeedLimits = PrespeedLimits { max_2d: 290.0, max_z: 500.0 };
    const RULE: PrejumpRule = PrejumpRule { max_jumps: 1, ground_window: 10 };

    fn timers() -> (TimerRun, TimerRun) {
        (TimerRun::new(TimerKind::Main), TimerRun::new(TimerKind::Stage))
    }

    fn grounded() -> MoveInput {
        MoveInput {
            velocity: Vec3::new(250.0, 0.0, 0.0),
            forward_move: 450.0,
            side_move: 0.0,
            buttons: Buttons::FORWARD,
            on_ground: true,
            move_type: MoveType::Walk,
        }
    }

    fn take_off() -> MoveInput {
        MoveInput {
            velocity: Vec3::new(250.0, 0.0, 290.0),
            on_ground: false,
            ..grounded()
        }
    }

    #[test]
    fn test_prespeed_under_cap_unchanged() {
        let v = Vec3::new(250.0, 0.0, 100.0);
        assert_eq!(clamp_prespeed(v, LIMITS), (v, false));
    }

    #[test]
    fn test_prespeed_scaled_to_cap() {
        let (v, changed) = clamp_prespeed(Vec3::new(400.0, 0.0, 100.0), LIMITS);
        assert!(changed);
        assert!((v.length_2d() - 290.0).abs() < 1e-3);
        assert_eq!(v.z, 100.0);

        let (v, _) = clamp_prespeed(Vec3::new(240.0, -320.0, 0.0), LIMITS);
        assert!((v.length_2d() - 290.0).abs() < 1e-3);
        assert!((v.x / v.y + 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_prespeed_vertical_clamp() {
        let (v, changed) = clamp_prespeed(Vec3::new(0.0, 0.0, 900.0), LIMITS);
        assert!(changed);
        assert_eq!(v, Vec3::new(0.0, 0.0, 500.0));

        // Falling speed is never clamped
        let (v, changed) = clamp_prespeed(Vec3::new(0.0, 0.0, -900.0), LIMITS);
        assert!(!changed);
        assert_eq!(v.z, -900.0);
    }

    #[test]
    fn test_prejump_capped_in_start_zone() {
        let (mut main, mut stage) = timers();
        main.current_zone = Some(ZoneKind::Start);

        let mut input = grounded();
        assert_eq!(process_move(&mut main, &mut stage, &mut input, RULE), GateOutcome::Pass);

        main.jumps = 1;
        stage.jumps = 1;
        let mut input = take_off();
        assert_eq!(process_move(&mut main, &mut stage, &mut input, RULE), GateOutcome::PrejumpCapped);
        assert_eq!(input.velocity, Vec3::ZERO);
        assert_eq!(input.forward_move, 0.0);
        assert_eq!(main.jumps, 0);
        assert_eq!(stage.jumps, 0);
    }

    #[test]
    fn test_prejump_allowed_under_cap_or_outside_zone() {
        let (mut main, mut stage) = timers();
        main.current_zone = Some(ZoneKind::Start);
        process_move(&mut main, &mut stage, &mut grounded(), RULE);

        // First jump is under the cap
        let mut input = take_off();
        assert_eq!(process_move(&mut main, &mut stage, &mut input, RULE), GateOutcome::Pass);
        assert_eq!(input.velocity, take_off().velocity);

        // Outside a start zone any number of jumps is fine
        let (mut main, mut stage) = timers();
        main.jumps = 5;
        process_move(&mut main, &mut stage, &mut grounded(), RULE);
        assert_eq!(process_move(&mut main, &mut stage, &mut take_off(), RULE), GateOutcome::Pass);
    }

    #[test]
    fn test_prejump_window_expires() {
        let (mut main, mut stage) = timers();
        stage.current_zone = Some(ZoneKind::Stage);
        main.jumps = 3;

        for _ in 0..11 {
            process_move(&mut main, &mut stage, &mut grounded(), RULE);
        }
        assert_eq!(main.ground_ticks, 11);

        // Standing still long enough is a fresh jump
        assert_eq!(process_move(&mut main, &mut stage, &mut take_off(), RULE), GateOutcome::Pass);
        assert_eq!(main.ground_ticks, 0);
    }

    #[test]
    fn test_noclip_stops_timers() {
        let (mut main, mut stage) = timers();
        main.start(0, Vec3::ZERO, 0);
        stage.start(0, Vec3::ZERO, 1);
        main.ground_ticks = 4;

        let mut input = MoveInput { move_type: MoveType::NoClip, ..grounded() };
        assert_eq!(process_move(&mut main, &mut stage, &mut input, RULE), GateOutcome::NoClip);
        assert!(!main.is_running());
        assert!(!stage.is_running());
        assert_eq!(main.ground_ticks, 0);
    }
}
