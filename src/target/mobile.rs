//! State shared by vessels and SARTs

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{TargetCore, TargetSettings};
use crate::models::{
    ClassBStaticPartA, ClassBStaticPartB, Dimensions, Eta, Mmsi, Position, PositionReport,
    StaticVoyageReport,
};
use crate::trajectory::{Trajectory, TrajectoryPoint};

/// Dynamic data from the latest position report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionData {
    pub position: Position,
    /// Speed over ground in knots
    pub sog: Option<f32>,
    /// Course over ground in degrees
    pub cog: Option<f32>,
    pub heading: Option<u16>,
    pub rot: Option<i8>,
    pub nav_status: Option<u8>,
    pub pos_acc: bool,
    pub raim: bool,
}

impl From<&PositionReport> for PositionData {
    fn from(report: &PositionReport) -> Self {
        Self {
            position: report.position,
            sog: report.sog,
            cog: report.cog,
            heading: report.heading,
            rot: report.rot,
            nav_status: report.nav_status,
            pos_acc: report.pos_acc,
            raim: report.raim,
        }
    }
}

/// Static and voyage data, accumulated over several reports
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StaticData {
    pub name: Option<String>,
    pub call_sign: Option<String>,
    pub imo: Option<u32>,
    pub ship_type: Option<u8>,
    pub dimensions: Dimensions,
    pub destination: Option<String>,
    pub eta: Eta,
    /// Draught in metres
    pub draught: Option<f32>,
    pub pos_type: Option<u8>,
}

fn merge<T: Clone>(into: &mut Option<T>, from: &Option<T>) {
    if from.is_some() {
        into.clone_from(from);
    }
}

impl StaticData {
    pub fn merge_voyage(&mut self, report: &StaticVoyageReport) {
        merge(&mut self.name, &report.name);
        merge(&mut self.call_sign, &report.call_sign);
        merge(&mut self.imo, &report.imo);
        merge(&mut self.ship_type, &report.ship_type);
        self.merge_dimensions(&report.dimensions);
        merge(&mut self.destination, &report.destination);
        self.eta = report.eta;
        merge(&mut self.draught, &report.draught);
        merge(&mut self.pos_type, &report.pos_type);
    }

    pub fn merge_part_a(&mut self, report: &ClassBStaticPartA) {
        merge(&mut self.name, &report.name);
    }

    pub fn merge_part_b(&mut self, report: &ClassBStaticPartB) {
        merge(&mut self.ship_type, &report.ship_type);
        merge(&mut self.call_sign, &report.call_sign);
        self.merge_dimensions(&report.dimensions);
    }

    fn merge_dimensions(&mut self, dims: &Dimensions) {
        merge(&mut self.dimensions.to_bow, &dims.to_bow);
        merge(&mut self.dimensions.to_stern, &dims.to_stern);
        merge(&mut self.dimensions.to_port, &dims.to_port);
        merge(&mut self.dimensions.to_starboard, &dims.to_starboard);
    }
}

/// A target that moves and leaves a trajectory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobileTarget {
    pub core: TargetCore,
    pub position_data: Option<PositionData>,
    pub static_data: Option<StaticData>,
    pub settings: TargetSettings,
    #[serde(skip)]
    pub trajectory: Trajectory,
}

impl MobileTarget {
    pub fn new(mmsi: Mmsi, settings: TargetSettings, now: DateTime<Utc>) -> Self {
        Self {
            core: TargetCore::new(mmsi, now),
            position_data: None,
            static_data: None,
            settings,
            trajectory: Trajectory::new(),
        }
    }

    /// Replace the dynamic data and sample the trajectory
    pub fn update_position(&mut self, report: &PositionReport, now: DateTime<Utc>) {
        self.position_data = Some(PositionData::from(report));
        self.core.touch(now);
        self.trajectory
            .add_position(now, report.position, self.settings.past_track_min_dist);
    }

    pub fn update_static<F>(&mut self, now: DateTime<Utc>, apply: F)
    where
        F: FnOnce(&mut StaticData),
    {
        apply(self.static_data.get_or_insert_with(StaticData::default));
        self.core.touch(now);
    }

    pub fn sog(&self) -> Option<f32> {
        self.position_data.as_ref().and_then(|p| p.sog)
    }

    pub fn name(&self) -> Option<&str> {
        self.static_data.as_ref().and_then(|s| s.name.as_deref())
    }

    /// Trajectory within the configured display window
    pub fn visible_trajectory(&self, now: DateTime<Utc>) -> Vec<TrajectoryPoint> {
        let window = TimeDelta::from_std(self.settings.past_track_display_time)
            .unwrap_or(TimeDelta::MAX);
        match now.checked_sub_signed(window) {
            Some(since) => self.trajectory.points_newer_than(since),
            None => self.trajectory.points().copied().collect(),
        }
    }

    pub(super) fn prune_trajectory(&mut self, ttl: TimeDelta, now: DateTime<Utc>) {
        self.trajectory.cleanup(ttl, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::time::Duration;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn report(lat: f64) -> PositionReport {
        PositionReport {
            position: Position::new(lat, 11.0),
            sog: Some(10.0),
            cog: Some(90.0),
            heading: Some(91),
            rot: None,
            nav_status: Some(0),
            pos_acc: true,
            raim: false,
        }
    }

    #[test]
    fn position_is_replaced_wholesale() {
        let mut target = MobileTarget::new(
            Mmsi::try_from(219_000_001).unwrap(),
            TargetSettings::default(),
            t0(),
        );
        target.update_position(&report(55.0), t0());
        let mut second = report(55.1);
        second.sog = None;
        target.update_position(&second, t0() + TimeDelta::seconds(10));

        let data = target.position_data.as_ref().unwrap();
        assert_eq!(data.position.lat, 55.1);
        assert_eq!(data.sog, None);
        assert_eq!(target.trajectory.len(), 2);
        assert_eq!(target.core.last_received, t0() + TimeDelta::seconds(10));
    }

    #[test]
    fn two_part_static_reports_merge() {
        let mut data = StaticData::default();
        data.merge_part_a(&ClassBStaticPartA {
            name: Some("SUULA".to_string()),
        });
        assert_eq!(data.name.as_deref(), Some("SUULA"));
        assert_eq!(data.call_sign, None);

        data.merge_part_b(&ClassBStaticPartB {
            ship_type: Some(37),
            call_sign: Some("OUAB2".to_string()),
            dimensions: Dimensions {
                to_bow: Some(8),
                to_stern: Some(4),
                to_port: Some(2),
                to_starboard: Some(2),
            },
        });
        assert_eq!(data.name.as_deref(), Some("SUULA"));
        assert_eq!(data.call_sign.as_deref(), Some("OUAB2"));
        assert_eq!(data.dimensions.length(), Some(12));

        // A later part A without a name keeps the known one
        data.merge_part_a(&ClassBStaticPartA::default());
        assert_eq!(data.name.as_deref(), Some("SUULA"));
    }

    #[test]
    fn visible_trajectory_uses_display_window() {
        let settings = TargetSettings {
            past_track_display_time: Duration::from_secs(600),
            ..TargetSettings::default()
        };
        let mut target = MobileTarget::new(Mmsi::try_from(219_000_001).unwrap(), settings, t0());
        target.update_position(&report(55.0), t0());
        target.update_position(&report(55.1), t0() + TimeDelta::minutes(15));

        let now = t0() + TimeDelta::minutes(20);
        assert_eq!(target.visible_trajectory(now).len(), 1);
        assert_eq!(target.trajectory.len(), 2);
    }
}
