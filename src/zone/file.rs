//! Zone Definition File
//!
//! Hand-authored zones are kept per map as a pretty-printed JSON list at
//! `<zone_dir>/<map>.json`. Prebuilt zones come from the map itself and are
//! never written here.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Serialize, Deserialize};
use tracing::{debug, instrument};

use super::{BoundingBox, Pose, Zone, ZoneKind};
use crate::core::vec3::Vec3;

/// Zone file errors.
#[derive(Debug, thiserror::Error)]
pub enum ZoneFileError {
    /// Reading or writing the file failed.
    #[error("Zone file IO error: {0}")]
    Io(#[from] io::Error),

    /// File contents are not a valid zone list.
    #[error("Zone file is malformed: {0}")]
    Json(#[from] serde_json::Error),
}

/// One entry of the zone file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ZoneDefinition {
    /// Zone type
    pub kind: ZoneKind,
    /// Track
    pub track: u32,
    /// First corner
    pub corner1: Vec3,
    /// Opposite corner
    pub corner2: Vec3,
    /// Stage or checkpoint number
    #[serde(default)]
    pub index: u32,
    /// Teleport destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teleport_origin: Option<Vec3>,
    /// Teleport view angles
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub teleport_angles: Option<Vec3>,
}

impl ZoneDefinition {
    /// File entry for a registered zone.
    pub fn from_zone(zone: &Zone) -> Self {
        Self {
            kind: zone.kind,
            track: zone.track,
            corner1: zone.bounds.corner1,
            corner2: zone.bounds.corner2,
            index: zone.index,
            teleport_origin: zone.teleport.map(|p| p.origin),
            teleport_angles: zone.teleport.and_then(|p| p.angles),
        }
    }

    /// Hand-authored zone described by this entry.
    pub fn to_zone(&self) -> Zone {
        let mut zone = Zone::authored(
            self.kind,
            self.track,
            self.index,
            BoundingBox::new(self.corner1, self.corner2),
        );
        zone.teleport = self.teleport_origin.map(|origin| Pose {
            origin,
            angles: self.teleport_angles,
        });
        zone
    }
}

/// Location of a map's zone file.
pub fn zone_file_path(zone_dir: &Path, map: &str) -> PathBuf {
    zone_dir.join(format!("{}.json", map))
}

/// Load the zone list. A missing file is an empty list.
#[instrument(skip_all, fields(path = %path.display()))]
pub fn load(path: &Path) -> Result<Vec<ZoneDefinition>, ZoneFileError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("no zone file");
            return Ok(Vec::new());
        }
        Err(e) => return Err(e.into()),
    };

    let zones: Vec<ZoneDefinition> = serde_json::from_str(&text)?;
    debug!(count = zones.len(), "loaded zone file");
    Ok(zones)
}

/// Write the zone list, creating the directory when needed.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn save(path: &Path, zones: &[ZoneDefinition]) -> Result<(), ZoneFileError> {
    let text = serde_json::to_string_pretty(zones)?;

    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    tokio::fs::write(path, text).await?;

    debug!(count = zones.len(), "saved zone file");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definitions() -> Vec<ZoneDefinition> {
        let mut end = Zone::authored(
            ZoneKind::End,
            0,
            0,
            BoundingBox::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(64.0, 64.0, 128.0)),
        );
        end.teleport = Some(Pose {
            origin: Vec3::new(32.0, 32.0, 8.0),
            angles: Some(Vec3::new(0.0, 90.0, 0.0)),
        });

        let cp = Zone::authored(
            ZoneKind::Checkpoint,
            2,
            3,
            BoundingBox::new(Vec3::new(-10.0, 5.0, 0.0), Vec3::new(10.0, -5.0, 50.0)),
        );

        vec![ZoneDefinition::from_zone(&end), ZoneDefinition::from_zone(&cp)]
    }

    #[test]
    fn test_definition_preserves_zone() {
        let defs = definitions();
        let zone = defs[0].to_zone();

        assert_eq!(zone.kind, ZoneKind::End);
        assert!(!zone.prebuilt);
        assert_eq!(zone.teleport_pose().origin, Vec3::new(32.0, 32.0, 8.0));
        assert_eq!(defs[1].to_zone().teleport, None);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let zones = load(&zone_file_path(dir.path(), "surf_nothing")).unwrap();
        assert!(zones.is_empty());
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = zone_file_path(dir.path(), "surf_broken");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(load(&path), Err(ZoneFileError::Json(_))));
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = zone_file_path(&dir.path().join("nested"), "surf_utopia");

        save(&path, &definitions()).await.unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded, definitions());
    }
}
