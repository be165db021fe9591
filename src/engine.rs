//! Timing Engine
//!
//! Host-facing façade. Owns the zone registry, the player slots, the record
//! evaluator and the style table for one server, and is driven entirely from
//! the host's simulation thread.
//!
//! Results store calls run as tokio tasks. Each task sends exactly one
//! completion back, and [`TimingEngine::frame`] applies them once per
//! tick. A completion names the player it belongs to, never just a slot, and
//! is dropped when that player has left.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::{broadcast, mpsc, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::core::time::format_time;
use crate::core::vec3::Vec3;
use crate::host::HostWorld;
use crate::record::{BucketKey, PlayerProfile, RecordClass, RecordError, RecordEvaluator, RunRecord, Submission};
use crate::slots::{PlayerEntry, PlayerId, PlayerSlot, PlayerSlotTable, SlotError};
use crate::store::{ResultsStore, StoreError};
use crate::style::StyleTable;
use crate::timer::{
    is_surfing, GateOutcome, MoveInput, Runner, SampleContext, TickSnapshot, TimerEvent, TimerRun,
};
use crate::zone::file::{self, ZoneFileError};
use crate::zone::{BoundingBox, Pose, VolumeHandle, Zone, ZoneError, ZoneIssue, ZoneKind, ZoneRegistry};
use crate::MAX_TRACK;

/// Event bus capacity. Slow subscribers lag and skip.
const EVENT_CAPACITY: usize = 256;

// =============================================================================
// ERRORS
// =============================================================================

/// Engine errors.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Slot index invalid, empty or occupied.
    #[error(transparent)]
    Slot(#[from] SlotError),

    /// Track, stage or style out of range.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// Zone rejected by the registry.
    #[error(transparent)]
    Zone(#[from] ZoneError),

    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Operation needs an active map.
    #[error("No map is active")]
    NoActiveMap,

    /// Host refused to create a trigger volume.
    #[error("Host could not create a trigger volume")]
    TriggerUnavailable,

    /// Engine was created outside a tokio runtime.
    #[error("No tokio runtime available")]
    NoRuntime,
}

// =============================================================================
// HOST INPUT TYPES
// =============================================================================

/// A named trigger volume placed by the map author.
#[derive(Clone, Debug, PartialEq)]
pub struct MapTrigger {
    /// Host handle
    pub handle: VolumeHandle,
    /// Entity name
    pub name: String,
    /// Volume
    pub bounds: BoundingBox,
}

// =============================================================================
// COMPLETIONS
// =============================================================================

/// Result of a background job, applied on the next frame.
#[derive(Debug)]
enum Completion {
    /// Full record listing of a map.
    MapLoaded {
        map: String,
        result: Result<Vec<RunRecord>, StoreError>,
    },

    /// Profile lookup of a connecting player, with their runs on the map.
    PlayerLoaded {
        map: Option<String>,
        player: PlayerId,
        result: Result<(PlayerProfile, Vec<RunRecord>), StoreError>,
    },

    /// A finished run was submitted. `bucket` is the re-read listing of its
    /// bucket, present when the save succeeded.
    RunSaved {
        map: String,
        submission: Submission,
        saved: Result<(RecordClass, RunRecord), StoreError>,
        bucket: Option<Result<Vec<RunRecord>, StoreError>>,
    },

    /// Zone file written.
    ZoneFileSaved {
        path: PathBuf,
        result: Result<(), ZoneFileError>,
    },
}

// =============================================================================
// ENGINE
// =============================================================================

/// The timing engine.
pub struct TimingEngine {
    config: EngineConfig,
    zones: ZoneRegistry,
    slots: PlayerSlotTable,
    records: RecordEvaluator,
    styles: StyleTable,
    store: Arc<dyn ResultsStore>,
    world: Box<dyn HostWorld>,
    runtime: Handle,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    event_tx: broadcast::Sender<TimerEvent>,
    pending: usize,
    /// Generation of the last zone file written; older writes are skipped
    zone_file_written: Arc<Mutex<u64>>,
    zone_file_generation: u64,
}

impl TimingEngine {
    /// Create an engine. Must be called from within a tokio runtime; store
    /// calls are spawned onto it.
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn ResultsStore>,
        world: Box<dyn HostWorld>,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|_| EngineError::NoRuntime)?;

        let styles = StyleTable::load_or_default(config.styles_path.as_deref());
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);

        info!(
            max_players = config.max_players,
            styles = styles.len(),
            tick_rate = config.tick_rate,
            "timing engine created"
        );

        Ok(Self {
            slots: PlayerSlotTable::new(config.max_players),
            config,
            zones: ZoneRegistry::new(),
            records: RecordEvaluator::new(),
            styles,
            store,
            world,
            runtime,
            completion_tx,
            completion_rx,
            event_tx,
            pending: 0,
            zone_file_written: Arc::new(Mutex::new(0)),
            zone_file_generation: 0,
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Zones of the active map.
    pub fn zones(&self) -> &ZoneRegistry {
        &self.zones
    }

    /// Loaded styles.
    pub fn styles(&self) -> &StyleTable {
        &self.styles
    }

    /// Player in a slot.
    pub fn player(&self, slot: PlayerSlot) -> Result<&PlayerEntry, EngineError> {
        Ok(self.slots.get(slot)?)
    }

    /// Active map.
    pub fn map(&self) -> Option<&str> {
        self.records.map()
    }

    /// Subscribe to timer events. Dropping the receiver unsubscribes.
    pub fn subscribe_events(&self) -> broadcast::Receiver<TimerEvent> {
        self.event_tx.subscribe()
    }

    /// Background jobs whose results have not been applied yet.
    pub fn pending_jobs(&self) -> usize {
        self.pending
    }

    // =========================================================================
    // Map lifecycle
    // =========================================================================

    /// Start a map: classify its triggers, spawn the zones from its zone
    /// file and begin loading its records. Returns the zone problems found.
    #[instrument(skip(self, triggers), fields(triggers = triggers.len()))]
    pub fn activate_map(&mut self, map: &str, triggers: &[MapTrigger]) -> Vec<ZoneIssue> {
        if self.records.map().is_some() {
            self.deactivate_map();
        }

        self.records.activate(map);

        for trigger in triggers {
            match self.zones.register_named(trigger.handle, &trigger.name, trigger.bounds) {
                Ok(_) | Err(ZoneError::UnrecognizedName(_)) | Err(ZoneError::EngineOwned(_)) => {}
                Err(e) => warn!(name = %trigger.name, error = %e, "map trigger rejected"),
            }
        }

        self.load_zone_file(map);

        let connected: Vec<(PlayerId, String)> = self
            .slots
            .iter_mut()
            .map(|(_, entry)| {
                entry.timers.stop();
                (entry.player, entry.name.clone())
            })
            .collect();

        self.spawn_map_load(map);
        for (player, name) in connected {
            self.spawn_player_load(player, name);
        }

        let issues = self.zones.audit();
        info!(map, zones = self.zones.len(), issues = issues.len(), "map activated");
        issues
    }

    /// End the active map: remove the spawned trigger volumes and forget
    /// every zone and cached record.
    pub fn deactivate_map(&mut self) {
        let spawned: Vec<VolumeHandle> = self
            .zones
            .iter()
            .filter(|(_, zone)| !zone.prebuilt)
            .map(|(handle, _)| handle)
            .collect();
        for handle in spawned {
            self.world.remove_trigger(handle);
        }

        for (_, entry) in self.slots.iter_mut() {
            entry.timers.stop();
        }

        if let Some(map) = self.records.map() {
            info!(map, "map deactivated");
        }
        self.zones.clear();
        self.records.deactivate();
    }

    fn load_zone_file(&mut self, map: &str) {
        let path = file::zone_file_path(&self.config.zone_dir, map);
        let definitions = match file::load(&path) {
            Ok(definitions) => definitions,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to load zone file");
                return;
            }
        };

        for definition in definitions {
            if let Err(e) = self.spawn_zone(definition.to_zone()) {
                warn!(kind = ?definition.kind, track = definition.track, error = %e, "zone from file rejected");
            }
        }
    }

    fn spawn_zone(&mut self, zone: Zone) -> Result<VolumeHandle, EngineError> {
        let handle = self
            .world
            .spawn_trigger(&zone.engine_trigger_name(), &zone.bounds)
            .ok_or(EngineError::TriggerUnavailable)?;

        if let Err(e) = self.zones.add_zone(handle, zone) {
            self.world.remove_trigger(handle);
            return Err(e.into());
        }

        Ok(handle)
    }

    /// Classify a map trigger that spawned after the map was activated.
    pub fn register_trigger(&mut self, handle: VolumeHandle, name: &str, bounds: BoundingBox) -> Result<(), EngineError> {
        self.zones.register_named(handle, name, bounds)?;
        Ok(())
    }

    /// A trigger volume was deleted.
    pub fn remove_trigger(&mut self, handle: VolumeHandle) -> Option<Zone> {
        self.zones.remove(handle)
    }

    /// Add a hand-authored zone and save the map's zone file.
    pub fn add_custom_zone(&mut self, zone: Zone) -> Result<VolumeHandle, EngineError> {
        let map = self.records.map().ok_or(EngineError::NoActiveMap)?.to_string();
        let handle = self.spawn_zone(zone)?;

        let path = file::zone_file_path(&self.config.zone_dir, &map);
        let definitions = self.zones.custom_definitions();
        self.zone_file_generation += 1;
        let generation = self.zone_file_generation;
        let written = Arc::clone(&self.zone_file_written);

        self.spawn_job(async move {
            let mut last = written.lock().await;
            if *last > generation {
                debug!(generation, "zone file already superseded");
                return Completion::ZoneFileSaved { path, result: Ok(()) };
            }
            let result = file::save(&path, &definitions).await;
            if result.is_ok() {
                *last = generation;
            }
            Completion::ZoneFileSaved { path, result }
        });

        Ok(handle)
    }

    /// Attach teleport destination entities to the zones containing them.
    pub fn assign_teleport_destinations(&mut self, destinations: &[Pose]) -> usize {
        let assigned = self.zones.assign_teleport_destinations(destinations);
        debug!(destinations = destinations.len(), assigned, "teleport destinations assigned");
        assigned
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// A player joined and was given `slot`.
    pub fn client_put_in_server(&mut self, slot: PlayerSlot, player: PlayerId, name: &str) -> Result<(), EngineError> {
        self.slots.occupy(slot, PlayerEntry::new(player, name))?;
        debug!(%slot, %player, name, "player connected");
        self.spawn_player_load(player, name.to_string());
        Ok(())
    }

    /// A player left. Their slot is free immediately; pending results for
    /// them are dropped when they arrive.
    pub fn client_disconnected(&mut self, slot: PlayerSlot) -> Result<(), EngineError> {
        let entry = self.slots.vacate(slot)?;
        self.records.clear_player(entry.player);
        debug!(%slot, player = %entry.player, "player disconnected");
        Ok(())
    }

    // =========================================================================
    // Zone events
    // =========================================================================

    fn runner(&self, slot: PlayerSlot) -> Result<Runner, EngineError> {
        let entry = self.slots.get(slot)?;
        Ok(Runner { slot, player: entry.player })
    }

    /// Player started touching a trigger volume.
    pub fn zone_start_touch(&mut self, slot: PlayerSlot, handle: VolumeHandle, velocity: Vec3) -> Result<(), EngineError> {
        let who = self.runner(slot)?;
        let Some(zone) = self.zones.get(handle) else {
            return Ok(());
        };

        let entry = self.slots.get_mut(slot)?;
        let result = entry.timers.enter_zone(who, zone, velocity, &self.zones);

        self.publish(slot, result.events);
        Ok(())
    }

    /// Player stopped touching a trigger volume. Returns the velocity the
    /// host must give the player, clamped when leaving a start zone.
    pub fn zone_end_touch(&mut self, slot: PlayerSlot, handle: VolumeHandle, velocity: Vec3) -> Result<Vec3, EngineError> {
        let who = self.runner(slot)?;
        let Some(zone) = self.zones.get(handle) else {
            return Ok(velocity);
        };

        let limits = self.config.prespeed_limits();
        let entry = self.slots.get_mut(slot)?;
        let (velocity, result) = entry.timers.exit_zone(who, zone, velocity, &self.zones, limits);

        self.publish(slot, result.events);
        Ok(velocity)
    }

    /// Player is still touching a trigger volume.
    pub fn zone_trigger(&mut self, slot: PlayerSlot, handle: VolumeHandle) -> Result<(), EngineError> {
        let Some(zone) = self.zones.get(handle) else {
            return Ok(());
        };

        let entry = self.slots.get_mut(slot)?;
        entry.timers.trigger_zone(zone);
        Ok(())
    }

    // =========================================================================
    // Tick events
    // =========================================================================

    /// Pre-move hook. Applies the style's key blocks and the prejump cap,
    /// possibly rewriting `input`.
    pub fn process_move(&mut self, slot: PlayerSlot, input: &mut MoveInput) -> Result<GateOutcome, EngineError> {
        let rule = self.config.prejump_rule();
        let entry = self.slots.get_mut(slot)?;

        if let Some(style) = self.styles.get(entry.timers.style()) {
            style.filter_input(input);
        }

        let outcome = entry.timers.process_move(input, rule);
        if outcome == GateOutcome::PrejumpCapped {
            debug!(%slot, player = %entry.player, "prejump capped");
        }
        Ok(outcome)
    }

    /// Post-command hook. Applies the style key blocks, then samples the tick
    /// into the player's running timers.
    pub fn run_command(&mut self, slot: PlayerSlot, tick: &TickSnapshot) -> Result<(), EngineError> {
        let timers = &self.slots.get(slot)?.timers;
        let mut tick = *tick;
        if let Some(style) = self.styles.get(timers.style()) {
            style.filter_tick(&mut tick);
        }

        let running = timers.main.is_running() || timers.stage.is_running();

        let surfing = running
            && !tick.on_ground
            && is_surfing(
                self.world
                    .trace_ground(tick.position, tick.ducked, self.config.ground_trace_distance),
                self.config.standable_normal,
            );

        let ctx = SampleContext {
            surfing,
            yaw_epsilon: self.config.yaw_epsilon,
        };
        self.slots.get_mut(slot)?.timers.sample(&tick, ctx);
        Ok(())
    }

    /// Player jumped.
    pub fn player_jump(&mut self, slot: PlayerSlot) -> Result<(), EngineError> {
        self.slots.get_mut(slot)?.timers.jump();
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Main timer of a player.
    pub fn timer_info(&self, slot: PlayerSlot) -> Result<&TimerRun, EngineError> {
        Ok(&self.slots.get(slot)?.timers.main)
    }

    /// Stage timer of a player.
    pub fn stage_timer_info(&self, slot: PlayerSlot) -> Result<&TimerRun, EngineError> {
        Ok(&self.slots.get(slot)?.timers.stage)
    }

    /// Fastest run of a track (`stage` 0) or stage.
    pub fn wr(&self, style: u32, track: u32, stage: u32) -> Result<Option<&RunRecord>, EngineError> {
        Ok(self.records.wr(style, track, stage)?)
    }

    /// Fastest whole-track time.
    pub fn wr_time(&self, style: u32, track: u32) -> Result<Option<f32>, EngineError> {
        Ok(self.records.wr_time(style, track)?)
    }

    /// Best run of the player in `slot`.
    pub fn player_record(
        &self,
        slot: PlayerSlot,
        style: u32,
        track: u32,
        stage: u32,
    ) -> Result<Option<&RunRecord>, EngineError> {
        let player = self.slots.get(slot)?.player;
        Ok(self.records.personal_best(player, style, track, stage)?)
    }

    /// 1-based rank `time` would take.
    pub fn rank(&self, style: u32, track: u32, stage: u32, time: f32) -> Result<usize, EngineError> {
        Ok(self.records.rank(BucketKey::stage(style, track, stage), time)?)
    }

    /// Runs of a bucket, fastest first.
    pub fn leaderboard(&self, style: u32, track: u32, stage: u32) -> Result<&[RunRecord], EngineError> {
        Ok(self.records.bucket(BucketKey::stage(style, track, stage))?)
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Stop a player's timers without saving anything.
    pub fn stop_timer(&mut self, slot: PlayerSlot) -> Result<(), EngineError> {
        self.slots.get_mut(slot)?.timers.stop();
        Ok(())
    }

    /// Switch a player's style. Their timers stop.
    pub fn change_style(&mut self, slot: PlayerSlot, style: u32) -> Result<(), EngineError> {
        if self.styles.get(style).is_none() {
            return Err(RecordError::InvalidStyle(style).into());
        }
        self.slots.get_mut(slot)?.timers.change_style(style);
        Ok(())
    }

    /// Switch a player's track. Their timers stop.
    pub fn change_track(&mut self, slot: PlayerSlot, track: u32) -> Result<(), EngineError> {
        check_track(track)?;
        self.slots.get_mut(slot)?.timers.change_track(track);
        Ok(())
    }

    /// Restart on a track. Returns where to teleport the player, if the
    /// track has a start zone.
    pub fn restart(&mut self, slot: PlayerSlot, track: u32) -> Result<Option<Pose>, EngineError> {
        check_track(track)?;
        let timers = &mut self.slots.get_mut(slot)?.timers;
        timers.stop();
        timers.change_track(track);
        Ok(self.zones.teleport_target(track, ZoneKind::Start))
    }

    /// Where a respawning player should appear.
    pub fn spawn_pose(&self, slot: PlayerSlot) -> Result<Option<Pose>, EngineError> {
        let track = self.slots.get(slot)?.timers.track();
        Ok(self.zones.teleport_target(track, ZoneKind::Start))
    }

    // =========================================================================
    // Events and background jobs
    // =========================================================================

    fn publish(&mut self, slot: PlayerSlot, events: Vec<TimerEvent>) {
        for mut event in events {
            match &mut event {
                TimerEvent::Finish { record, .. } | TimerEvent::StageFinish { record, .. } => {
                    if let Ok(entry) = self.slots.get(slot) {
                        record.player_name = entry.name.clone();
                    }
                    info!(
                        player = %record.player,
                        track = record.track,
                        stage = record.stage,
                        time = %format_time(record.time, true),
                        "run finished"
                    );

                    if self.records.map().is_some() {
                        let submission = self.records.prepare(record.clone());
                        record.map = submission.record.map.clone();
                        self.submit(submission);
                    } else {
                        warn!(player = %record.player, "run finished with no active map, not saved");
                    }
                }
                TimerEvent::SequenceViolation { player, kind, .. } => {
                    info!(%player, ?kind, "run aborted");
                }
                _ => {}
            }

            // No subscribers is fine
            let _ = self.event_tx.send(event);
        }
    }

    fn spawn_job<F>(&mut self, job: F)
    where
        F: Future<Output = Completion> + Send + 'static,
    {
        let tx = self.completion_tx.clone();
        self.pending += 1;
        self.runtime.spawn(async move {
            let _ = tx.send(job.await);
        });
    }

    fn submit(&mut self, submission: Submission) {
        let Some(map) = self.records.map().map(str::to_string) else {
            return;
        };
        let store = Arc::clone(&self.store);

        self.spawn_job(async move {
            let saved = store.submit_run(&map, submission.record.clone()).await;
            let bucket = match &saved {
                Ok((_, record)) => Some(store.bucket_records(&map, record.key()).await),
                Err(_) => None,
            };
            Completion::RunSaved { map, submission, saved, bucket }
        });
    }

    fn spawn_map_load(&mut self, map: &str) {
        let map = map.to_string();
        let store = Arc::clone(&self.store);

        self.spawn_job(async move {
            let result = store.map_records(&map).await;
            Completion::MapLoaded { map, result }
        });
    }

    fn spawn_player_load(&mut self, player: PlayerId, name: String) {
        let map = self.records.map().map(str::to_string);
        let store = Arc::clone(&self.store);

        self.spawn_job(async move {
            let result = async {
                let profile = store.player_profile(player, &name).await?;
                let records = match &map {
                    Some(map) => store.player_records(player, map).await?,
                    None => Vec::new(),
                };
                Ok::<_, StoreError>((profile, records))
            }
            .await;
            Completion::PlayerLoaded { map, player, result }
        });
    }

    /// Apply finished background jobs. Call once per simulation tick.
    ///
    /// Returns the number of completions applied.
    pub fn frame(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(completion) = self.completion_rx.try_recv() {
            self.pending = self.pending.saturating_sub(1);
            self.apply(completion);
            applied += 1;
        }
        applied
    }

    fn is_active(&self, map: &str) -> bool {
        self.records.map() == Some(map)
    }

    fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::MapLoaded { map, result } => {
                if !self.is_active(&map) {
                    debug!(map, "records arrived for an inactive map");
                    return;
                }
                match result {
                    Ok(records) => {
                        info!(map, runs = records.len(), "records loaded");
                        self.records.replace_all(records);
                    }
                    Err(e) => error!(map, error = %e, "failed to load records"),
                }
            }

            Completion::PlayerLoaded { map, player, result } => {
                let Some(slot) = self.slots.find(player) else {
                    debug!(%player, "player left before their profile loaded");
                    return;
                };
                let (profile, records) = match result {
                    Ok(loaded) => loaded,
                    Err(e) => {
                        error!(%player, error = %e, "failed to load player");
                        return;
                    }
                };

                if let Ok(entry) = self.slots.get_mut(slot) {
                    entry.profile = Some(profile);
                }
                if map.as_deref().is_some_and(|m| self.is_active(m)) {
                    debug!(%player, runs = records.len(), "personal bests loaded");
                    self.records.load_personal(player, records);
                }
            }

            Completion::RunSaved { map, submission, saved, bucket } => {
                let player = submission.record.player;
                let (result, saved) = match saved {
                    Ok(saved) => saved,
                    Err(e) => {
                        error!(%player, map, time = submission.record.time, error = %e, "failed to save run");
                        return;
                    }
                };
                if !self.is_active(&map) {
                    debug!(map, "run saved for an inactive map");
                    return;
                }

                let slot = self.slots.find(player);
                let verdict = self.records.reconcile(&saved, result, slot.is_some());

                match bucket {
                    Some(Ok(records)) => self.records.replace_bucket(saved.key(), records),
                    Some(Err(e)) => warn!(key = ?saved.key(), error = %e, "failed to refresh leaderboard"),
                    None => {}
                }

                let Some(slot) = slot else {
                    debug!(%player, "player left before their run was saved");
                    return;
                };

                info!(%player, result = ?verdict.result, rank = verdict.rank, "run saved");
                let _ = self.event_tx.send(TimerEvent::RecordSaved {
                    slot,
                    result: verdict.result,
                    record: saved,
                    server_best: submission.server_best,
                    personal_best: submission.personal_best,
                });
            }

            Completion::ZoneFileSaved { path, result } => match result {
                Ok(()) => debug!(path = %path.display(), "zone file saved"),
                Err(e) => error!(path = %path.display(), error = %e, "failed to save zone file"),
            },
        }
    }
}

fn check_track(track: u32) -> Result<(), RecordError> {
    if track as usize >= MAX_TRACK {
        return Err(RecordError::InvalidTrackOrStage { track, stage: 0 });
    }
    Ok(())
}
