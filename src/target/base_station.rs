//! AIS base stations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Lifecycle, Target, TargetCore};
use crate::models::{BaseStationReport, Mmsi, Position};

const GONE_TOLERANCE_SECS: i64 = 2 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseStationTarget {
    pub core: TargetCore,
    pub position: Option<Position>,
}

impl BaseStationTarget {
    pub fn new(mmsi: Mmsi, now: DateTime<Utc>) -> Self {
        Self {
            core: TargetCore::new(mmsi, now),
            position: None,
        }
    }

    pub fn update(&mut self, report: &BaseStationReport, now: DateTime<Utc>) {
        self.position = Some(report.position);
        self.core.touch(now);
    }
}

impl Lifecycle for BaseStationTarget {
    fn core(&self) -> &TargetCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut TargetCore {
        &mut self.core
    }

    fn has_gone(&self, now: DateTime<Utc>, _strict: bool) -> bool {
        self.core.elapsed_more_than(now, GONE_TOLERANCE_SECS)
    }

    fn to_target(&self) -> Target {
        Target::BaseStation(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    #[test]
    fn gone_after_two_minutes() {
        let now = Utc::now();
        let mut station = BaseStationTarget::new(Mmsi::try_from(2_190_047).unwrap(), now);
        station.update(
            &BaseStationReport {
                position: Position::new(55.7, 12.6),
            },
            now,
        );
        assert!(!station.has_gone(now + TimeDelta::seconds(120), true));
        assert!(station.has_gone(now + TimeDelta::seconds(121), true));
    }
}
