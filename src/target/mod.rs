//! Tracked AIS targets and their lifecycle rules.

mod aton;
mod base_station;
mod mobile;
mod sar;
mod vessel;

pub use aton::{AtonTarget, AtonType};
pub use base_station::BaseStationTarget;
pub use mobile::{MobileTarget, PositionData, StaticData};
pub use sar::SarTarget;
pub use vessel::{AisClass, VesselTarget};

use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

use crate::models::Mmsi;

/// Targets not heard from for this long after going gone are evicted
pub const TARGET_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetStatus {
    #[default]
    Active,
    Gone,
}

/// Identity and staleness bookkeeping shared by every kind of target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetCore {
    pub mmsi: Mmsi,
    pub last_received: DateTime<Utc>,
    pub status: TargetStatus,
}

impl TargetCore {
    pub fn new(mmsi: Mmsi, now: DateTime<Utc>) -> Self {
        Self {
            mmsi,
            last_received: now,
            status: TargetStatus::Active,
        }
    }

    /// A report arrived: the target is alive again
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.last_received = now;
        self.status = TargetStatus::Active;
    }

    pub fn elapsed(&self, now: DateTime<Utc>) -> TimeDelta {
        now - self.last_received
    }

    pub fn elapsed_more_than(&self, now: DateTime<Utc>, secs: i64) -> bool {
        self.elapsed(now) > TimeDelta::seconds(secs)
    }

    pub fn is_gone(&self) -> bool {
        self.status == TargetStatus::Gone
    }
}

/// Per-target display settings, seeded from process defaults
#[serde_as]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSettings {
    pub visible: bool,
    /// How much of the trajectory is shown
    #[serde_as(as = "serde_with::DurationSeconds<u64>")]
    pub past_track_display_time: Duration,
    /// Minimum spacing between stored trajectory points, in metres
    pub past_track_min_dist: f64,
}

impl Default for TargetSettings {
    fn default() -> Self {
        Self {
            visible: true,
            past_track_display_time: Duration::from_secs(30 * 60),
            past_track_min_dist: 100.0,
        }
    }
}

/// What the sweep decided for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepAction {
    Unchanged,
    /// Status or another published attribute changed
    Changed,
    /// Gone for longer than the retention window
    Evict,
}

/// Staleness rules evaluated by the periodic sweep
pub trait Lifecycle {
    fn core(&self) -> &TargetCore;

    fn core_mut(&mut self) -> &mut TargetCore;

    /// Kind-specific "no longer reporting" test for an active target
    fn has_gone(&self, now: DateTime<Utc>, strict: bool) -> bool;

    fn is_dead(&self, now: DateTime<Utc>) -> bool {
        self.core().elapsed_more_than(now, TARGET_TTL_SECS)
    }

    /// Transition to gone
    fn mark_gone(&mut self, _now: DateTime<Utc>) {
        self.core_mut().status = TargetStatus::Gone;
    }

    /// Changes worth publishing that do not touch the status
    fn refresh(&mut self, _now: DateTime<Utc>) -> bool {
        false
    }

    /// Trim history older than `ttl`
    fn prune(&mut self, _ttl: TimeDelta, _now: DateTime<Utc>) {}

    /// Owned copy handed to readers and listeners
    fn to_target(&self) -> Target;

    /// One sweep step
    fn sweep(&mut self, now: DateTime<Utc>, strict: bool) -> SweepAction {
        if self.core().is_gone() {
            return if self.is_dead(now) {
                SweepAction::Evict
            } else {
                SweepAction::Unchanged
            };
        }
        if self.has_gone(now, strict) {
            self.mark_gone(now);
            return SweepAction::Changed;
        }
        if self.refresh(now) {
            SweepAction::Changed
        } else {
            SweepAction::Unchanged
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Vessel,
    Sar,
    Aton,
    BaseStation,
}

/// Snapshot of any tracked target
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    Vessel(VesselTarget),
    Sar(SarTarget),
    Aton(AtonTarget),
    BaseStation(BaseStationTarget),
}

impl Target {
    pub fn core(&self) -> &TargetCore {
        match self {
            Target::Vessel(t) => t.core(),
            Target::Sar(t) => t.core(),
            Target::Aton(t) => t.core(),
            Target::BaseStation(t) => t.core(),
        }
    }

    pub fn mmsi(&self) -> Mmsi {
        self.core().mmsi
    }

    pub fn status(&self) -> TargetStatus {
        self.core().status
    }

    pub fn last_received(&self) -> DateTime<Utc> {
        self.core().last_received
    }

    pub fn kind(&self) -> TargetKind {
        match self {
            Target::Vessel(_) => TargetKind::Vessel,
            Target::Sar(_) => TargetKind::Sar,
            Target::Aton(_) => TargetKind::Aton,
            Target::BaseStation(_) => TargetKind::BaseStation,
        }
    }

    pub fn has_gone(&self, now: DateTime<Utc>, strict: bool) -> bool {
        match self {
            Target::Vessel(t) => t.has_gone(now, strict),
            Target::Sar(t) => t.has_gone(now, strict),
            Target::Aton(t) => t.has_gone(now, strict),
            Target::BaseStation(t) => t.has_gone(now, strict),
        }
    }

    pub fn is_dead(&self, now: DateTime<Utc>) -> bool {
        match self {
            Target::Vessel(t) => t.is_dead(now),
            Target::Sar(t) => t.is_dead(now),
            Target::Aton(t) => t.is_dead(now),
            Target::BaseStation(t) => t.is_dead(now),
        }
    }

    /// Mobile part of vessels and SARTs
    pub fn mobile(&self) -> Option<&MobileTarget> {
        match self {
            Target::Vessel(t) => Some(&t.mobile),
            Target::Sar(t) => Some(&t.mobile),
            _ => None,
        }
    }

    pub fn as_vessel(&self) -> Option<&VesselTarget> {
        match self {
            Target::Vessel(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_sar(&self) -> Option<&SarTarget> {
        match self {
            Target::Sar(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_aton(&self) -> Option<&AtonTarget> {
        match self {
            Target::Aton(t) => Some(t),
            _ => None,
        }
    }
}
