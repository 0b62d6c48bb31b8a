//! Intended routes decoded from route information messages.

mod suggestion;

pub use suggestion::{SuggestionStatus, SuggestionWorkflow};

use chrono::{DateTime, Datelike, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geo::rhumb_line_distance_nm;
use crate::models::{Eta, Mmsi, Position, RouteMessage};

/// Route type code meaning "cancel the previously sent route"
pub const ROUTE_TYPE_CANCEL: u8 = 31;

/// Box a waypoint has to fall in to be accepted
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct RouteBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for RouteBounds {
    fn default() -> Self {
        Self {
            min_lat: -90.0,
            max_lat: 90.0,
            min_lon: -180.0,
            max_lon: 180.0,
        }
    }
}

impl RouteBounds {
    pub fn contains(&self, pos: &Position) -> bool {
        pos.is_plausible()
            && (self.min_lat..=self.max_lat).contains(&pos.lat)
            && (self.min_lon..=self.max_lon).contains(&pos.lon)
    }
}

/// A station's planned route with leg ranges and waypoint ETAs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntendedRoute {
    pub msg_link_id: u16,
    pub route_type: u8,
    pub received: DateTime<Utc>,
    /// Minutes from the first ETA until the route ends
    pub duration: u32,
    pub waypoints: Vec<Position>,
    /// Cumulative rhumb-line range to each waypoint in nautical miles
    pub ranges: Vec<f64>,
    pub eta_first: Option<DateTime<Utc>>,
    /// ETA per waypoint; empty when unknown
    pub etas: Vec<DateTime<Utc>>,
    /// Average speed in knots
    pub speed: Option<f64>,
    pub cancelled: bool,
}

impl IntendedRoute {
    /// Decode a route message received at `received`.
    ///
    /// Waypoints outside `bounds` are dropped one by one; the remaining ones
    /// still form the route. A route left without waypoints is cancelled.
    pub fn decode(message: &RouteMessage, received: DateTime<Utc>, bounds: &RouteBounds) -> Self {
        let mut route = IntendedRoute {
            msg_link_id: message.msg_link_id,
            route_type: message.route_type,
            received,
            duration: message.duration,
            waypoints: Vec::new(),
            ranges: Vec::new(),
            eta_first: None,
            etas: Vec::new(),
            speed: None,
            cancelled: false,
        };

        if message.duration == 0
            || message.waypoints.is_empty()
            || message.route_type == ROUTE_TYPE_CANCEL
        {
            route.cancelled = true;
            return route;
        }

        for (i, wp) in message.waypoints.iter().enumerate() {
            if bounds.contains(wp) {
                route.waypoints.push(*wp);
            } else {
                warn!(
                    "Dropping implausible waypoint {} ({}, {}) in route {}",
                    i, wp.lat, wp.lon, message.msg_link_id
                );
            }
        }
        if route.waypoints.is_empty() {
            // Nothing left to follow, same as an explicit cancel
            route.cancelled = true;
            return route;
        }

        let mut total = 0.0;
        route.ranges.push(0.0);
        for leg in route.waypoints.windows(2) {
            total += rhumb_line_distance_nm(&leg[0], &leg[1]);
            route.ranges.push(total);
        }

        let hours = message.duration as f64 / 60.0;
        route.speed = Some(total / hours);

        route.eta_first = Eta::from_fields(
            message.start_month,
            message.start_day,
            message.start_hour,
            message.start_minute,
        )
        .in_year(received.year());

        if let Some(eta_first) = route.eta_first {
            let duration_ms = message.duration as f64 * 60_000.0;
            route.etas = route
                .ranges
                .iter()
                .map(|range| {
                    let share = if total > 0.0 { range / total } else { 0.0 };
                    eta_first + TimeDelta::milliseconds((duration_ms * share).round() as i64)
                })
                .collect();
        }

        route
    }

    /// End of the period the route describes
    pub fn valid_to(&self) -> DateTime<Utc> {
        self.eta_first.unwrap_or(self.received) + TimeDelta::minutes(self.duration as i64)
    }

    /// Route still describes where the station is going
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        !self.cancelled && !self.waypoints.is_empty() && now <= self.valid_to()
    }

    pub fn total_range(&self) -> f64 {
        self.ranges.last().copied().unwrap_or(0.0)
    }

    /// Index of the first waypoint whose ETA has not yet passed
    pub fn next_waypoint(&self, now: DateTime<Utc>) -> Option<usize> {
        self.etas.iter().position(|eta| *eta >= now)
    }

    fn clear_timing(&mut self) {
        self.eta_first = None;
        self.etas.clear();
        self.speed = None;
    }
}

/// Suggestions are identified by sender and message link id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SuggestionKey {
    pub sender: Mmsi,
    pub msg_link_id: u16,
}

/// Route suggested to one station, answered through its workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressedRouteSuggestion {
    pub sender: Mmsi,
    pub destination: Mmsi,
    pub route: IntendedRoute,
    pub workflow: SuggestionWorkflow,
}

impl AddressedRouteSuggestion {
    /// Timing is dropped when the first ETA already lies in the past; the
    /// broadcast was stale by the time it arrived.
    pub fn new(sender: Mmsi, destination: Mmsi, mut route: IntendedRoute) -> Self {
        if matches!(route.eta_first, Some(eta) if eta < route.received) {
            route.clear_timing();
        }
        Self {
            sender,
            destination,
            route,
            workflow: SuggestionWorkflow::new(),
        }
    }

    pub fn key(&self) -> SuggestionKey {
        SuggestionKey {
            sender: self.sender,
            msg_link_id: self.route.msg_link_id,
        }
    }

    pub fn status(&self) -> SuggestionStatus {
        self.workflow.status()
    }

    pub fn is_hidden(&self) -> bool {
        self.workflow.is_hidden()
    }
}

/// Route suggested to every station in range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BroadcastRouteSuggestion {
    pub sender: Mmsi,
    pub route: IntendedRoute,
}

impl BroadcastRouteSuggestion {
    pub fn key(&self) -> SuggestionKey {
        SuggestionKey {
            sender: self.sender,
            msg_link_id: self.route.msg_link_id,
        }
    }
}
