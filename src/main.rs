//! Surf Timer Demo
//!
//! Drives a scripted map through the timing engine: two bots run a staged
//! track with checkpoints and a surf ramp against an in-memory results store.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use surf_timer::{
    core::time::format_time,
    timer::{Buttons, MoveType},
    zone::{BoundingBox, VolumeHandle},
    EngineConfig, MapTrigger, MemoryStore, MoveInput, PlayerId, PlayerSlot, ScriptedWorld, TickSnapshot,
    TimerEvent, TimingEngine, Vec3, TICK_INTERVAL, TICK_RATE, VERSION,
};

const MAP: &str = "surf_demo";

/// Start zone depth along X; bots stand on the ground inside it.
const START_DEPTH: f32 = 256.0;

/// X of the end zone's near face.
const END_X: f32 = 4800.0;

/// Give up after a minute of simulated time.
const MAX_DEMO_TICKS: u32 = TICK_RATE * 60;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("Surf Timer v{}", VERSION);
    info!("Tick Rate: {} Hz", TICK_RATE);

    let config = load_config()?;
    demo_map(config).await
}

/// Config from the first argument or `SURF_TIMER_CONFIG`, defaults otherwise.
fn load_config() -> Result<EngineConfig> {
    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("SURF_TIMER_CONFIG").map(PathBuf::from));

    let Some(path) = path else {
        info!("No config given, using defaults");
        return Ok(EngineConfig::default());
    };

    let config = EngineConfig::from_file(&path).with_context(|| format!("loading config {}", path.display()))?;
    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

fn gate(x: f32, depth: f32) -> BoundingBox {
    BoundingBox::new(Vec3::new(x, -128.0, 0.0), Vec3::new(x + depth, 128.0, 256.0))
}

fn map_triggers() -> Vec<MapTrigger> {
    [
        (1, "map_start", 0.0, START_DEPTH),
        (2, "map_cp1", 1800.0, 64.0),
        (3, "s2_start", 2400.0, 64.0),
        (4, "map_cp2", 3200.0, 64.0),
        (5, "map_end", END_X, 64.0),
        (6, "func_door_03", 4000.0, 64.0),
    ]
    .into_iter()
    .map(|(handle, name, x, depth)| MapTrigger {
        handle: VolumeHandle(handle),
        name: name.to_string(),
        bounds: gate(x, depth),
    })
    .collect()
}

fn log_event(event: &TimerEvent) {
    if let Some(message) = event.chat_message() {
        info!(slot = %event.slot(), "{}", message);
    }

    match event {
        TimerEvent::TimerStart { player, start_velocity, .. } => {
            info!(%player, speed = start_velocity.length_2d(), "Timer started");
        }
        TimerEvent::StageFinish { record, .. } => {
            info!(player = %record.player, stage = record.stage, time = %format_time(record.time, true), "Stage finished");
        }
        TimerEvent::Finish { record, .. } => {
            info!(
                player = %record.player,
                time = %format_time(record.time, true),
                jumps = record.jumps,
                strafes = record.strafes,
                sync = record.sync,
                "Finished"
            );
        }
        TimerEvent::RecordSaved { result, record, server_best, .. } => {
            info!(
                name = %record.player_name,
                ?result,
                time = %format_time(record.time, true),
                previous_best = ?server_best,
                "Record saved"
            );
        }
        _ => {}
    }
}

/// Scripted player.
struct Bot {
    slot: PlayerSlot,
    player: PlayerId,
    name: &'static str,
    top_speed: f32,
    /// Every Nth tick presses the wrong strafe key (0 = never)
    sync_miss: u32,
    position: Vec3,
    velocity: Vec3,
    yaw: f32,
    airborne: bool,
    touching: BTreeSet<VolumeHandle>,
    done: bool,
}

impl Bot {
    fn new(slot: usize, player: u64, name: &'static str, top_speed: f32, sync_miss: u32) -> Self {
        Self {
            slot: PlayerSlot(slot),
            player: PlayerId(player),
            name,
            top_speed,
            sync_miss,
            position: Vec3::new(64.0, 0.0, 0.0),
            velocity: Vec3::ZERO,
            yaw: 0.0,
            airborne: false,
            touching: BTreeSet::new(),
            done: false,
        }
    }

    fn tick(&mut self, engine: &mut TimingEngine, t: u32) -> Result<()> {
        // Pre-move
        let mut input = MoveInput {
            velocity: self.velocity,
            forward_move: 450.0,
            side_move: 0.0,
            buttons: Buttons::FORWARD,
            on_ground: !self.airborne,
            move_type: MoveType::Walk,
        };
        engine.process_move(self.slot, &mut input)?;

        // Movement
        let speed = if self.airborne {
            (input.velocity.x + 10.0).min(self.top_speed)
        } else {
            self.top_speed
        };
        self.velocity = Vec3::new(speed, 0.0, 0.0);
        self.position = self.position + self.velocity.scale(TICK_INTERVAL);

        let airborne = self.position.x >= START_DEPTH;
        if airborne && !self.airborne {
            engine.player_jump(self.slot)?;
        }
        self.airborne = airborne;
        self.position.z = if airborne { 150.0 } else { 0.0 };

        // Trigger overlaps
        let now: BTreeSet<VolumeHandle> = engine
            .zones()
            .iter()
            .filter(|(_, zone)| zone.bounds.contains(self.position))
            .map(|(handle, _)| handle)
            .collect();
        for handle in self.touching.difference(&now) {
            self.velocity = engine.zone_end_touch(self.slot, *handle, self.velocity)?;
        }
        for handle in now.difference(&self.touching) {
            engine.zone_start_touch(self.slot, *handle, self.velocity)?;
        }
        for handle in now.intersection(&self.touching) {
            engine.zone_trigger(self.slot, *handle)?;
        }
        self.touching = now;

        // Strafe with the turn
        let last_yaw = self.yaw;
        self.yaw = 30.0 * (t as f32 * 0.1).sin();
        let missed = self.sync_miss > 0 && t % self.sync_miss == 0;
        let left = (self.yaw > last_yaw) != missed;
        let (buttons, side_move) = if left {
            (Buttons::MOVE_LEFT, 450.0)
        } else {
            (Buttons::MOVE_RIGHT, -450.0)
        };

        let tick = TickSnapshot {
            position: self.position,
            velocity: self.velocity,
            angles: Vec3::new(0.0, self.yaw, 0.0),
            buttons,
            side_move,
            forward_move: 0.0,
            on_ground: !airborne,
            ducked: false,
            move_type: MoveType::Walk,
        };
        engine.run_command(self.slot, &tick)?;

        if self.position.x > END_X + 128.0 {
            self.done = true;
        }
        Ok(())
    }
}

/// Run two bots through a scripted map.
async fn demo_map(config: EngineConfig) -> Result<()> {
    info!("=== Starting Demo Map ===");

    let store = Arc::new(MemoryStore::new());
    let mut world = ScriptedWorld::new(0.0, 10_000);
    world.add_ramp(
        BoundingBox::new(Vec3::new(600.0, -256.0, 0.0), Vec3::new(1600.0, 256.0, 140.0)),
        Vec3::new(0.0, 0.8, 0.6),
    );

    let mut engine = TimingEngine::new(config, store.clone(), Box::new(world))?;

    let mut events = engine.subscribe_events();
    let listener = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event listener lagged"),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let issues = engine.activate_map(MAP, &map_triggers());
    info!(
        map = MAP,
        zones = engine.zones().len(),
        stages = engine.zones().total_stages(0),
        checkpoints = engine.zones().checkpoint_count(0),
        issues = issues.len(),
        "Map ready"
    );

    let mut bots = vec![
        Bot::new(0, 76561198000000001, "alpha", 1200.0, 0),
        Bot::new(1, 76561198000000002, "beta", 1100.0, 5),
    ];
    for bot in &bots {
        engine.client_put_in_server(bot.slot, bot.player, bot.name)?;
    }

    let mut ticker = interval(Duration::from_secs_f32(TICK_INTERVAL));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

    let mut t = 0;
    while bots.iter().any(|b| !b.done) || engine.pending_jobs() > 0 {
        ticker.tick().await;
        engine.frame();

        for bot in bots.iter_mut().filter(|b| !b.done) {
            bot.tick(&mut engine, t)?;
        }

        t += 1;
        if t > MAX_DEMO_TICKS {
            warn!(ticks = t, "Demo did not finish in time");
            break;
        }
    }

    info!("=== Results ===");
    for bot in &bots {
        if let Some(best) = engine.player_record(bot.slot, 0, 0, 0)? {
            let rank = engine.rank(0, 0, 0, best.time)?;
            info!(name = bot.name, time = %format_time(best.time, true), rank, "Personal best");
        }
        for stage in 1..=engine.zones().total_stages(0) {
            if let Some(best) = engine.player_record(bot.slot, 0, 0, stage)? {
                info!(name = bot.name, stage, time = %format_time(best.time, true), "Stage best");
            }
        }
    }
    if let Some(wr) = engine.wr(0, 0, 0)? {
        info!(name = %wr.player_name, time = %format_time(wr.time, true), "Server record");
    }
    info!(runs = store.run_count().await, ticks = t, "=== Demo Complete ===");

    drop(engine);
    listener.await?;
    Ok(())
}
