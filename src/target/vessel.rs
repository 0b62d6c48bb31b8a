//! Vessel targets

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{Lifecycle, MobileTarget, Target, TargetCore, TargetSettings};
use crate::models::Mmsi;
use crate::route::IntendedRoute;

/// Non-strict sweeps use a flat tolerance
const RELAXED_TOLERANCE_SECS: i64 = 600;
/// Strict sweeps scale the reporting interval by this factor ...
const STRICT_FACTOR: i64 = 4;
/// ... but never go below this
const STRICT_MIN_TOLERANCE_SECS: i64 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AisClass {
    A,
    B,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VesselTarget {
    pub mobile: MobileTarget,
    pub ais_class: AisClass,
    pub show_intended_route: bool,
    pub intended_route: Option<IntendedRoute>,
}

impl VesselTarget {
    pub fn new(
        mmsi: Mmsi,
        ais_class: AisClass,
        settings: TargetSettings,
        show_intended_route: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            mobile: MobileTarget::new(mmsi, settings, now),
            ais_class,
            show_intended_route,
            intended_route: None,
        }
    }

    /// Nominal reporting interval in seconds for the current motion state,
    /// after ITU-R M.1371.
    ///
    /// `None` until a position report has been received.
    pub fn reporting_interval(&self) -> Option<i64> {
        let data = self.mobile.position_data.as_ref()?;
        let sog = data.sog.unwrap_or(0.0);
        let secs = match self.ais_class {
            AisClass::A => match data.nav_status {
                Some(1) | Some(5) => 3 * 60,
                _ if sog <= 14.0 => 10,
                _ => 6,
            },
            AisClass::B => {
                if sog <= 2.0 {
                    3 * 60
                } else if sog <= 14.0 {
                    30
                } else {
                    15
                }
            }
        };
        Some(secs)
    }

    /// Seconds without a report before the vessel is considered gone
    pub fn gone_tolerance(&self, strict: bool) -> Option<i64> {
        let interval = self.reporting_interval()?;
        if !strict {
            return Some(RELAXED_TOLERANCE_SECS);
        }
        Some((interval * STRICT_FACTOR).max(STRICT_MIN_TOLERANCE_SECS))
    }

    /// Store a newly received intended route; cancellations clear it
    pub fn set_intended_route(&mut self, route: IntendedRoute) {
        if route.cancelled {
            self.intended_route = None;
        } else {
            self.intended_route = Some(route);
        }
    }

    /// Intended route, if one is known and set to be shown
    pub fn visible_intended_route(&self) -> Option<&IntendedRoute> {
        self.intended_route
            .as_ref()
            .filter(|_| self.show_intended_route)
    }
}

impl Lifecycle for VesselTarget {
    fn core(&self) -> &TargetCore {
        &self.mobile.core
    }

    fn core_mut(&mut self) -> &mut TargetCore {
        &mut self.mobile.core
    }

    fn has_gone(&self, now: DateTime<Utc>, strict: bool) -> bool {
        match self.gone_tolerance(strict) {
            Some(tolerance) => self.core().elapsed_more_than(now, tolerance),
            None => false,
        }
    }

    fn mark_gone(&mut self, now: DateTime<Utc>) {
        self.mobile.core.status = super::TargetStatus::Gone;
        self.mobile.trajectory.flag_gone(now);
    }

    /// Expired intended routes are dropped
    fn refresh(&mut self, now: DateTime<Utc>) -> bool {
        match &self.intended_route {
            Some(route) if !route.is_valid(now) => {
                self.intended_route = None;
                true
            }
            _ => false,
        }
    }

    fn prune(&mut self, ttl: TimeDelta, now: DateTime<Utc>) {
        self.mobile.prune_trajectory(ttl, now);
    }

    fn to_target(&self) -> Target {
        Target::Vessel(self.clone())
    }
}
