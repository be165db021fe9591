//! Movement Sampler
//!
//! Folds one post-command tick into a running timer's statistics.
//!
//! Order per tick:
//! 1. Advance the tick counter
//! 2. Running-average velocity over the whole run
//! 3. Peak velocity (by squared length)
//! 4. Airborne only: strafes and sync (skipped while surfing)
//! 5. Running-average velocity of the open checkpoint segment

use crate::core::vec3::Vec3;
use crate::timer::input::{Buttons, TickSnapshot};
use crate::timer::run::TimerRun;

/// Per-tick facts the sampler needs from outside the snapshot.
#[derive(Clone, Copy, Debug)]
pub struct SampleContext {
    /// Player is sliding on a ramp too steep to stand on
    pub surfing: bool,
    /// Smallest yaw change (degrees) that counts as turning
    pub yaw_epsilon: f32,
}

/// Whether a ground trace result means the player is surfing.
///
/// `normal` is the plane normal of the trace hit, `None` on a miss.
#[inline]
pub fn is_surfing(normal: Option<Vec3>, standable_normal: f32) -> bool {
    normal.is_some_and(|n| n.z.abs() < standable_normal)
}

/// Signed yaw change in `(-180, 180]` degrees.
#[inline]
pub fn yaw_delta(yaw: f32, last_yaw: f32) -> f32 {
    let mut delta = (yaw - last_yaw) % 360.0;
    if delta > 180.0 {
        delta -= 360.0;
    } else if delta <= -180.0 {
        delta += 360.0;
    }
    delta
}

/// Sample one tick into a running timer. Stopped timers only follow the
/// player's yaw and lateral input, so a run's first tick compares against
/// the tick before it.
pub fn sample(run: &mut TimerRun, tick: &TickSnapshot, ctx: SampleContext) {
    if !run.is_running() {
        track_input(run, tick);
        return;
    }

    // 1. Advance
    run.ticks += 1;
    let n = run.ticks as f32;
    let velocity = tick.velocity;

    // 2. Average
    run.avg_velocity = run.avg_velocity + (velocity - run.avg_velocity) / n;

    // 3. Peak
    if velocity.length_squared() > run.max_velocity.length_squared() {
        run.max_velocity = velocity;
    }

    // 4. Strafes and sync
    if !tick.on_ground {
        sample_strafe(run, tick, ctx);
    }

    // 5. Checkpoint segment
    let ticks = run.ticks;
    if let Some(cp) = run.open_checkpoint.as_mut() {
        cp.sample(ticks, velocity);
    }

    track_input(run, tick);
}

#[inline]
fn track_input(run: &mut TimerRun, tick: &TickSnapshot) {
    run.last_yaw = tick.yaw();
    run.last_side_move = tick.side_move;
}

fn sample_strafe(run: &mut TimerRun, tick: &TickSnapshot, ctx: SampleContext) {
    let side = tick.side_move;
    let last = run.last_side_move;
    if side != 0.0 && (last == 0.0 || side.signum() != last.signum()) {
        run.strafes += 1;
    }

    if ctx.surfing {
        return;
    }

    let left = tick.buttons.contains(Buttons::MOVE_LEFT);
    let right = tick.buttons.contains(Buttons::MOVE_RIGHT);
    let delta = yaw_delta(tick.yaw(), run.last_yaw);

    if (left || right) && delta.abs() > ctx.yaw_epsilon {
        run.sync_measures += 1;

        if (delta > 0.0 && left && !right) || (delta < 0.0 && right && !left) {
            run.good_sync += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timer::run::TimerKind;
    use proptest::prelude::*;
    use rand::{Rng, SeedableRng};
    use rand::rngs::StdRng;

    const CTX: SampleContext = SampleContext { surfing: false, yaw_epsilon: 0.01 };

    fn running() -> TimerRun {
        let mut run = TimerRun::new(TimerKind::Main);
        run.start(0, Vec3::ZERO, 0);
        run
    }

    fn air(yaw: f32, side_move: f32, buttons: Buttons) -> TickSnapshot {
        TickSnapshot {
            angles: Vec3::new(0.0, yaw, 0.0),
            side_move,
            buttons,
            ..TickSnapshot::default()
        }
    }

    #[test]
    fn test_yaw_delta_wraps() {
        assert_eq!(yaw_delta(10.0, 0.0), 10.0);
        assert_eq!(yaw_delta(-179.0, 179.0), 2.0);
        assert_eq!(yaw_delta(179.0, -179.0), -2.0);
        assert_eq!(yaw_delta(180.0, 0.0), 180.0);
        assert_eq!(yaw_delta(0.0, 180.0), 180.0);
    }

    #[test]
    fn test_is_surfing() {
        assert!(is_surfing(Some(Vec3::new(0.8, 0.0, 0.6)), 0.7));
        assert!(!is_surfing(Some(Vec3::UP), 0.7));
        assert!(!is_surfing(None, 0.7));
    }

    #[test]
    fn test_stopped_timer_untouched() {
        let mut run = TimerRun::new(TimerKind::Main);
        sample(&mut run, &air(10.0, 1.0, Buttons::MOVE_LEFT), CTX);
        assert_eq!(run.ticks, 0);
        assert_eq!(run.strafes, 0);
    }

    #[test]
    fn test_average_and_peak() {
        let mut run = running();
        for speed in [100.0, 200.0, 300.0, 200.0] {
            let tick = TickSnapshot {
                velocity: Vec3::new(speed, 0.0, 0.0),
                on_ground: true,
                ..TickSnapshot::default()
            };
            sample(&mut run, &tick, CTX);
        }

        assert_eq!(run.ticks, 4);
        assert_eq!(run.avg_velocity, Vec3::new(200.0, 0.0, 0.0));
        assert_eq!(run.max_velocity, Vec3::new(300.0, 0.0, 0.0));
        assert_eq!(run.time(), 4.0 / 64.0);
    }

    #[test]
    fn test_sync_left_strafe_turning_left() {
        let mut run = running();
        // Left strafe with yaw increasing is good sync
        sample(&mut run, &air(5.0, 250.0, Buttons::MOVE_LEFT), CTX);
        sample(&mut run, &air(10.0, 250.0, Buttons::MOVE_LEFT), CTX);
        // Left strafe while turning right is bad sync
        sample(&mut run, &air(4.0, 250.0, Buttons::MOVE_LEFT), CTX);

        assert_eq!(run.sync_measures, 3);
        assert_eq!(run.good_sync, 2);
        assert!((run.sync() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_sync_ignores_both_keys_and_small_turns() {
        let mut run = running();
        let both = Buttons::MOVE_LEFT.with(Buttons::MOVE_RIGHT);
        sample(&mut run, &air(5.0, 0.0, both), CTX);
        sample(&mut run, &air(5.001, 0.0, Buttons::MOVE_RIGHT), CTX);
        sample(&mut run, &air(10.0, 0.0, Buttons::NONE), CTX);

        assert_eq!(run.sync_measures, 1);
        assert_eq!(run.good_sync, 0);
    }

    #[test]
    fn test_surfing_excluded_from_sync() {
        let mut run = running();
        let surf = SampleContext { surfing: true, ..CTX };
        sample(&mut run, &air(5.0, 250.0, Buttons::MOVE_LEFT), surf);

        assert_eq!(run.sync_measures, 0);
        assert_eq!(run.strafes, 1);
    }

    #[test]
    fn test_strafe_counted_on_sign_change() {
        let mut run = running();
        for side in [-250.0, -250.0, 250.0, 0.0, 250.0, -250.0] {
            sample(&mut run, &air(0.0, side, Buttons::NONE), CTX);
        }
        // -250 (from neutral), 250, 250 (from neutral), -250
        assert_eq!(run.strafes, 4);
    }

    #[test]
    fn test_ground_ticks_skip_strafes() {
        let mut run = running();
        let tick = TickSnapshot {
            side_move: -250.0,
            on_ground: true,
            buttons: Buttons::MOVE_RIGHT,
            angles: Vec3::new(0.0, 30.0, 0.0),
            ..TickSnapshot::default()
        };
        sample(&mut run, &tick, CTX);
        assert_eq!(run.strafes, 0);
        assert_eq!(run.sync_measures, 0);
        assert_eq!(run.last_side_move, -250.0);
    }

    #[test]
    fn test_first_tick_compares_against_previous_tick() {
        let mut run = running();
        // Previous attempt ends holding right
        sample(&mut run, &air(0.0, -250.0, Buttons::MOVE_RIGHT), CTX);
        assert_eq!(run.strafes, 1);
        run.stop();

        // Turning left while holding left before the next start
        for i in 1..=20 {
            sample(&mut run, &air(i as f32 * 4.0, 250.0, Buttons::MOVE_LEFT), CTX);
        }
        assert_eq!(run.ticks, 0);
        assert_eq!(run.last_side_move, 250.0);
        assert_eq!(run.last_yaw, 80.0);

        run.start(0, Vec3::ZERO, 0);
        sample(&mut run, &air(84.0, 250.0, Buttons::MOVE_LEFT), CTX);

        // Same strafe as the tick before, and a small left turn
        assert_eq!(run.strafes, 0);
        assert_eq!(run.sync_measures, 1);
        assert_eq!(run.good_sync, 1);
    }

    #[test]
    fn test_random_stream_keeps_invariants() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut run = running();
        run.open_checkpoint(1, Vec3::ZERO);

        for _ in 0..5_000 {
            let buttons = match rng.gen_range(0..4) {
                0 => Buttons::NONE,
                1 => Buttons::MOVE_LEFT,
                2 => Buttons::MOVE_RIGHT,
                _ => Buttons::MOVE_LEFT.with(Buttons::MOVE_RIGHT),
            };
            let tick = TickSnapshot {
                velocity: Vec3::new(rng.gen_range(-800.0..800.0), rng.gen_range(-800.0..800.0), rng.gen_range(-300.0..300.0)),
                angles: Vec3::new(0.0, rng.gen_range(-180.0..180.0), 0.0),
                side_move: [-250.0, 0.0, 250.0][rng.gen_range(0..3)],
                buttons,
                on_ground: rng.gen_bool(0.2),
                ..TickSnapshot::default()
            };
            let ctx = SampleContext { surfing: rng.gen_bool(0.3), ..CTX };
            sample(&mut run, &tick, ctx);

            assert!(run.good_sync <= run.sync_measures);
            assert!((0.0..=1.0).contains(&run.sync()));
        }

        assert_eq!(run.ticks, 5_000);
        assert_eq!(run.time(), 5_000.0 / 64.0);
        assert!(run.avg_velocity.length_2d() <= 800.0 * std::f32::consts::SQRT_2);
    }

    proptest! {
        #[test]
        fn prop_sync_in_unit_range(
            ticks in prop::collection::vec((-360.0f32..360.0, -1i8..=1, 0u8..4, any::<bool>()), 1..200)
        ) {
            let mut run = running();
            for (yaw, side, keys, surfing) in ticks {
                let buttons = Buttons((keys as u64 & 1) * Buttons::MOVE_LEFT.0 | (keys as u64 >> 1) * Buttons::MOVE_RIGHT.0);
                let tick = air(yaw, side as f32 * 250.0, buttons);
                sample(&mut run, &tick, SampleContext { surfing, ..CTX });
            }
            let sync = run.sync();
            prop_assert!((0.0..=1.0).contains(&sync));
            prop_assert!(run.good_sync <= run.sync_measures);
        }

        #[test]
        fn prop_time_is_ticks_times_interval(n in 0u32..20_000) {
            let mut run = running();
            let tick = TickSnapshot { on_ground: true, ..TickSnapshot::default() };
            for _ in 0..n {
                sample(&mut run, &tick, CTX);
            }
            prop_assert_eq!(run.time(), n as f32 * crate::TICK_INTERVAL);
        }
    }
}
