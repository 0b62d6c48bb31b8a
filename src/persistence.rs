//! Registry snapshots on local disk

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{error, info, warn};

use crate::errors::RegistryError;
use crate::registry::TargetRegistry;
use crate::target::{AtonTarget, SarTarget, VesselTarget};

/// Persisted registry state. Trajectories are not part of it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistrySnapshot {
    /// Reserved for the own-ship target; never filled in
    #[serde(default)]
    pub own_ship: Option<VesselTarget>,
    #[serde(default)]
    pub vessels: Vec<VesselTarget>,
    #[serde(default)]
    pub sar_targets: Vec<SarTarget>,
    #[serde(default)]
    pub atons: Vec<AtonTarget>,
}

impl RegistrySnapshot {
    pub fn len(&self) -> usize {
        self.vessels.len() + self.sar_targets.len() + self.atons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Read a snapshot. A missing file gives `None`; so does a corrupt one, which
/// is deleted so the next start does not trip over it again.
pub async fn load_snapshot(path: &Path) -> Option<RegistrySnapshot> {
    let data = match fs::read_to_string(path).await {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!("No snapshot at {}, starting empty", path.display());
            return None;
        }
        Err(e) => {
            warn!("Failed to read snapshot {}: {}", path.display(), e);
            discard(path).await;
            return None;
        }
    };

    match serde_json::from_str::<RegistrySnapshot>(&data) {
        Ok(snapshot) => {
            info!(
                "Loaded snapshot from {} ({} targets)",
                path.display(),
                snapshot.len()
            );
            Some(snapshot)
        }
        Err(e) => {
            warn!("Corrupt snapshot {}: {}", path.display(), e);
            discard(path).await;
            None
        }
    }
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        error!("Failed to delete snapshot {}: {}", path.display(), e);
    }
}

/// Write a snapshot through a temporary file so a crash never leaves a
/// half-written snapshot behind
pub async fn save_snapshot(path: &Path, snapshot: &RegistrySnapshot) -> Result<(), RegistryError> {
    let json = serde_json::to_string(snapshot)?;
    let tmp = temp_path(path);
    fs::write(&tmp, json).await?;
    fs::rename(&tmp, path).await?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl TargetRegistry {
    /// Restore targets from the snapshot at `path`, if there is a usable one
    pub async fn load_from(&self, path: &Path) -> bool {
        match load_snapshot(path).await {
            Some(snapshot) => {
                self.restore(snapshot, Utc::now());
                true
            }
            None => false,
        }
    }

    /// Save the current picture to `path`
    pub async fn save_to(&self, path: &Path) -> Result<(), RegistryError> {
        let snapshot = self.snapshot();
        save_snapshot(path, &snapshot).await?;
        info!("Saved {} targets to {}", snapshot.len(), path.display());
        Ok(())
    }
}
