//! Zone Registry
//!
//! Owns the zones of the current map, keyed by the host's volume handle.
//! Uses BTreeMap so lookups that pick "the first zone of a kind" are stable.

use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use super::matcher::classify;
use super::{BoundingBox, Pose, VolumeHandle, Zone, ZoneDefinition, ZoneKind, ENGINE_ZONE_PREFIX};
use crate::MAX_TRACK;

/// Zone registration errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ZoneError {
    /// Trigger name does not describe a zone.
    #[error("Unrecognized trigger name: {0}")]
    UnrecognizedName(String),

    /// Trigger was spawned by the timer itself.
    #[error("Trigger {0} is owned by the timer")]
    EngineOwned(String),

    /// Track number is outside the supported range.
    #[error("Track {0} out of range [0, {MAX_TRACK})")]
    TrackOutOfRange(u32),

    /// Track already has a zone of this kind.
    #[error("Track {track} already has a {kind:?} zone")]
    Duplicate {
        /// Track
        track: u32,
        /// Zone kind
        kind: ZoneKind,
    },

    /// Stage and checkpoint zones need an index of at least 1.
    #[error("{0:?} zone needs a sequence index of at least 1")]
    MissingIndex(ZoneKind),

    /// Volume handle is already registered.
    #[error("Volume {0:?} is already registered")]
    HandleInUse(VolumeHandle),
}

/// Problems found when auditing a loaded zone set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ZoneIssue {
    /// Track has a start zone but no end zone, so its timer never starts.
    MissingEnd {
        /// Track
        track: u32,
    },
    /// Stage or checkpoint sequence has a hole.
    SequenceGap {
        /// Track
        track: u32,
        /// Stage or Checkpoint
        kind: ZoneKind,
        /// First missing index
        missing: u32,
    },
}

/// Stages a zone accounts for on its track.
fn stage_count(zone: &Zone) -> u32 {
    match zone.kind {
        ZoneKind::Start if zone.track > 0 => 1,
        ZoneKind::Stage => zone.index,
        _ => 0,
    }
}

/// Zones of the current map.
#[derive(Debug, Clone)]
pub struct ZoneRegistry {
    zones: BTreeMap<VolumeHandle, Zone>,
    max_stages: [u32; MAX_TRACK],
}

impl ZoneRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            zones: BTreeMap::new(),
            max_stages: [0; MAX_TRACK],
        }
    }

    /// Classify and register a trigger placed by the map author.
    pub fn register_named(
        &mut self,
        handle: VolumeHandle,
        name: &str,
        bounds: BoundingBox,
    ) -> Result<&Zone, ZoneError> {
        if name.trim().to_ascii_lowercase().starts_with(ENGINE_ZONE_PREFIX) {
            return Err(ZoneError::EngineOwned(name.to_string()));
        }

        let Some(matched) = classify(name) else {
            warn!(name, "trigger is not a timer zone");
            return Err(ZoneError::UnrecognizedName(name.to_string()));
        };

        let zone = Zone {
            kind: matched.kind,
            track: matched.track,
            index: matched.index,
            bounds,
            teleport: None,
            prebuilt: true,
            name: Some(name.to_string()),
        };

        self.insert(handle, zone)?;
        info!(name, kind = ?matched.kind, track = matched.track, index = matched.index, "added prebuilt zone");

        Ok(&self.zones[&handle])
    }

    /// Register a zone with explicit type, track and index.
    pub fn add_zone(&mut self, handle: VolumeHandle, zone: Zone) -> Result<(), ZoneError> {
        self.insert(handle, zone)
    }

    fn insert(&mut self, handle: VolumeHandle, zone: Zone) -> Result<(), ZoneError> {
        if zone.track as usize >= MAX_TRACK {
            return Err(ZoneError::TrackOutOfRange(zone.track));
        }

        if zone.kind.is_sequenced() && zone.index == 0 {
            return Err(ZoneError::MissingIndex(zone.kind));
        }

        if self.zones.contains_key(&handle) {
            return Err(ZoneError::HandleInUse(handle));
        }

        if matches!(zone.kind, ZoneKind::Start | ZoneKind::End) && self.has_zone(zone.track, zone.kind) {
            return Err(ZoneError::Duplicate {
                track: zone.track,
                kind: zone.kind,
            });
        }

        let max_stage = &mut self.max_stages[zone.track as usize];
        *max_stage = (*max_stage).max(stage_count(&zone));

        self.zones.insert(handle, zone);
        Ok(())
    }

    /// Forget a volume (its entity was deleted). The track's stage counter
    /// is recounted from the zones left.
    pub fn remove(&mut self, handle: VolumeHandle) -> Option<Zone> {
        let zone = self.zones.remove(&handle)?;

        let track = zone.track;
        self.max_stages[track as usize] = self
            .zones
            .values()
            .filter(|z| z.track == track)
            .map(stage_count)
            .max()
            .unwrap_or(0);

        Some(zone)
    }

    /// Drop every zone and stage counter (map end).
    pub fn clear(&mut self) {
        self.zones.clear();
        self.max_stages = [0; MAX_TRACK];
    }

    /// Zone for a volume reported by the collision collaborator.
    pub fn get(&self, handle: VolumeHandle) -> Option<&Zone> {
        self.zones.get(&handle)
    }

    /// All registered zones in handle order.
    pub fn iter(&self) -> impl Iterator<Item = (VolumeHandle, &Zone)> {
        self.zones.iter().map(|(h, z)| (*h, z))
    }

    /// Number of registered zones.
    pub fn len(&self) -> usize {
        self.zones.len()
    }

    /// Whether no zones are registered.
    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    /// Teleport destination of the first zone of a kind on a track.
    pub fn teleport_target(&self, track: u32, kind: ZoneKind) -> Option<Pose> {
        self.zones
            .values()
            .find(|z| z.track == track && z.kind == kind)
            .map(Zone::teleport_pose)
    }

    /// Whether a track has at least one zone of a kind.
    pub fn has_zone(&self, track: u32, kind: ZoneKind) -> bool {
        self.zones.values().any(|z| z.track == track && z.kind == kind)
    }

    /// A track is linear when it has at most one stage.
    pub fn is_linear(&self, track: u32) -> bool {
        self.total_stages(track) <= 1
    }

    /// Highest registered stage on a track.
    pub fn total_stages(&self, track: u32) -> u32 {
        self.max_stages.get(track as usize).copied().unwrap_or(0)
    }

    /// Whether a track has checkpoint zones.
    pub fn has_checkpoints(&self, track: u32) -> bool {
        self.has_zone(track, ZoneKind::Checkpoint)
    }

    /// Number of checkpoint zones on a track.
    pub fn checkpoint_count(&self, track: u32) -> usize {
        self.zones
            .values()
            .filter(|z| z.track == track && z.kind == ZoneKind::Checkpoint)
            .count()
    }

    /// Check the loaded zone set for tracks that can never be timed
    /// correctly. Every issue is logged once here.
    pub fn audit(&self) -> Vec<ZoneIssue> {
        let mut issues = Vec::new();

        for track in 0..MAX_TRACK as u32 {
            if self.has_zone(track, ZoneKind::Start) && !self.has_zone(track, ZoneKind::End) {
                warn!(track, "track has a start zone but no end zone; its timer will not start");
                issues.push(ZoneIssue::MissingEnd { track });
            }

            // Stage 1 begins at the start zone, so stage zones count from 2.
            for (kind, first) in [(ZoneKind::Stage, 2), (ZoneKind::Checkpoint, 1)] {
                let mut indices: Vec<u32> = self
                    .zones
                    .values()
                    .filter(|z| z.track == track && z.kind == kind)
                    .map(|z| z.index)
                    .collect();
                indices.sort_unstable();
                indices.dedup();

                let mut expected = first;
                for index in indices {
                    if index > expected {
                        warn!(track, ?kind, missing = expected, "zone sequence has a gap");
                        issues.push(ZoneIssue::SequenceGap { track, kind, missing: expected });
                        break;
                    }
                    expected = index + 1;
                }
            }
        }

        issues
    }

    /// Attach teleport destinations that lie inside a zone to that zone.
    ///
    /// Returns how many zones received a destination.
    pub fn assign_teleport_destinations(&mut self, destinations: &[Pose]) -> usize {
        let mut assigned = 0;

        for destination in destinations {
            if let Some(zone) = self
                .zones
                .values_mut()
                .find(|z| z.bounds.contains(destination.origin))
            {
                debug!(origin = %destination.origin, kind = ?zone.kind, track = zone.track, "teleport destination inside zone");
                zone.teleport = Some(*destination);
                assigned += 1;
            }
        }

        assigned
    }

    /// Hand-authored zones, in the shape of the zone file.
    pub fn custom_definitions(&self) -> Vec<ZoneDefinition> {
        self.zones
            .values()
            .filter(|z| !z.prebuilt)
            .map(ZoneDefinition::from_zone)
            .collect()
    }
}

impl Default for ZoneRegistry {
    fn default() -> Self {
        Self::new()
    }
}
