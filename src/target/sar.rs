//! AIS search-and-rescue transmitters

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{Lifecycle, MobileTarget, Target, TargetCore, TargetSettings, TargetStatus};
use crate::models::{Mmsi, PositionReport};

const GONE_TOLERANCE_SECS: i64 = 30 * 60;
const OLD_TOLERANCE_SECS: i64 = 12 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SarTarget {
    pub mobile: MobileTarget,
    /// Not heard from for a while, but not yet gone
    pub old: bool,
    pub first_received: DateTime<Utc>,
}

impl SarTarget {
    pub fn new(mmsi: Mmsi, settings: TargetSettings, now: DateTime<Utc>) -> Self {
        Self {
            mobile: MobileTarget::new(mmsi, settings, now),
            old: false,
            first_received: now,
        }
    }

    pub fn update_position(&mut self, report: &PositionReport, now: DateTime<Utc>) {
        self.mobile.update_position(report, now);
        self.old = false;
    }

    pub fn is_old(&self, now: DateTime<Utc>) -> bool {
        self.mobile.core.elapsed_more_than(now, OLD_TOLERANCE_SECS)
    }
}

impl Lifecycle for SarTarget {
    fn core(&self) -> &TargetCore {
        &self.mobile.core
    }

    fn core_mut(&mut self) -> &mut TargetCore {
        &mut self.mobile.core
    }

    fn has_gone(&self, now: DateTime<Utc>, _strict: bool) -> bool {
        self.mobile.core.elapsed_more_than(now, GONE_TOLERANCE_SECS)
    }

    fn mark_gone(&mut self, now: DateTime<Utc>) {
        self.mobile.core.status = TargetStatus::Gone;
        self.mobile.trajectory.flag_gone(now);
    }

    /// Publishes when the old flag flips
    fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        let old = self.is_old(now);
        if old != self.old {
            self.old = old;
            return true;
        }
        false
    }

    fn prune(&mut self, ttl: TimeDelta, now: DateTime<Utc>) {
        self.mobile.prune_trajectory(ttl, now);
    }

    fn to_target(&self) -> Target {
        Target::Sar(self.clone())
    }
}
