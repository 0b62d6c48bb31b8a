//! Past-track sampling for mobile targets

use std::collections::VecDeque;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::planar_distance_m;
use crate::models::Position;

/// A sampled position of a mobile target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub time: DateTime<Utc>,
    pub position: Position,
    /// Recorded while the target was gone
    pub gone: bool,
}

/// Time-ordered, distance-filtered position history
///
/// Guarded by the lock of the target that owns it.
#[derive(Debug, Clone, Default)]
pub struct Trajectory {
    points: VecDeque<TrajectoryPoint>,
    last_modified: Option<DateTime<Utc>>,
}

impl Trajectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a position if it is the first one or lies farther than
    /// `min_distance_m` from the last stored point.
    ///
    /// Reports older than the last stored point are ignored so the history
    /// stays ordered. Returns `true` if a point was stored.
    pub fn add_position(&mut self, time: DateTime<Utc>, position: Position, min_distance_m: f64) -> bool {
        if let Some(last) = self.points.back() {
            if time < last.time {
                return false;
            }
            if planar_distance_m(&last.position, &position) <= min_distance_m {
                return false;
            }
        }

        self.points.push_back(TrajectoryPoint {
            time,
            position,
            gone: false,
        });
        self.last_modified = Some(time);
        true
    }

    /// Drop points older than `ttl` relative to `now`, oldest first.
    ///
    /// Returns the number of points removed.
    pub fn cleanup(&mut self, ttl: TimeDelta, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        while let Some(first) = self.points.front() {
            if now - first.time <= ttl {
                break;
            }
            self.points.pop_front();
            removed += 1;
        }
        if removed > 0 {
            self.last_modified = Some(now);
        }
        removed
    }

    /// Mark the latest point as recorded while the target was gone
    pub fn flag_gone(&mut self, now: DateTime<Utc>) {
        if let Some(last) = self.points.back_mut() {
            last.gone = true;
            self.last_modified = Some(now);
        }
    }

    pub fn points_newer_than(&self, time: DateTime<Utc>) -> Vec<TrajectoryPoint> {
        self.points.iter().filter(|p| p.time > time).copied().collect()
    }

    pub fn points(&self) -> impl Iterator<Item = &TrajectoryPoint> {
        self.points.iter()
    }

    pub fn last(&self) -> Option<&TrajectoryPoint> {
        self.points.back()
    }

    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
