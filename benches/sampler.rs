//! Criterion micro-benchmarks for the per-tick hot path.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use surf_timer::timer::{
    Buttons, MoveInput, PrejumpRule, SampleContext, TickSnapshot, TimerPair,
};
use surf_timer::zone::classify;
use surf_timer::Vec3;

const CTX: SampleContext = SampleContext { surfing: false, yaw_epsilon: 0.01 };
const RULE: PrejumpRule = PrejumpRule { max_jumps: 1, ground_window: 10 };

/// Airborne strafe ticks with a sweeping yaw.
fn strafe_ticks(n: usize) -> Vec<TickSnapshot> {
    (0..n)
        .map(|i| {
            let yaw = 30.0 * (i as f32 * 0.1).sin();
            let left = (i / 16) % 2 == 0;
            TickSnapshot {
                position: Vec3::new(i as f32 * 16.0, 0.0, 150.0),
                velocity: Vec3::new(900.0 + i as f32, 40.0, -20.0),
                angles: Vec3::new(0.0, yaw, 0.0),
                buttons: if left { Buttons::MOVE_LEFT } else { Buttons::MOVE_RIGHT },
                side_move: if left { 450.0 } else { -450.0 },
                ..TickSnapshot::default()
            }
        })
        .collect()
}

fn running_pair() -> TimerPair {
    let mut timers = TimerPair::new();
    timers.main.start(0, Vec3::new(290.0, 0.0, 0.0), 0);
    timers.main.open_checkpoint(1, Vec3::new(290.0, 0.0, 0.0));
    timers.stage.start(0, Vec3::new(290.0, 0.0, 0.0), 1);
    timers
}

fn bench_sample_64_ticks(c: &mut Criterion) {
    let ticks = strafe_ticks(64);

    c.bench_function("sample_64_ticks", |b| {
        b.iter(|| {
            let mut timers = running_pair();
            for tick in &ticks {
                timers.sample(black_box(tick), CTX);
            }
            black_box(timers.main.sync())
        });
    });
}

fn bench_process_move(c: &mut Criterion) {
    let mut timers = running_pair();

    c.bench_function("process_move", |b| {
        b.iter(|| {
            let mut input = MoveInput {
                velocity: Vec3::new(900.0, 0.0, 0.0),
                forward_move: 450.0,
                on_ground: false,
                ..MoveInput::default()
            };
            black_box(timers.process_move(black_box(&mut input), RULE))
        });
    });
}

fn bench_classify(c: &mut Criterion) {
    let names = ["map_start", "bonus12_end", "stage7_start", "b3_checkpoint14", "func_door", "timer_bonus2_startzone"];

    c.bench_function("classify_trigger_names", |b| {
        b.iter(|| {
            for name in &names {
                black_box(classify(black_box(name)));
            }
        });
    });
}

criterion_group!(benches, bench_sample_64_ticks, bench_process_move, bench_classify);
criterion_main!(benches);
