//! Decoded AIS messages and the value types they carry.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::RegistryError;

/// Maritime Mobile Service Identity (MMSI)
///
/// A unique nine-digit number for identifying vessels in AIS messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Mmsi(u32);

impl TryFrom<u32> for Mmsi {
    type Error = RegistryError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if value > 999_999_999 {
            return Err(RegistryError::InvalidMmsi(value.to_string()));
        }
        Ok(Self(value))
    }
}

impl TryFrom<&str> for Mmsi {
    type Error = RegistryError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let parsed = value
            .parse::<u32>()
            .map_err(|_| RegistryError::InvalidMmsi(value.to_string()))?;
        Self::try_from(parsed)
    }
}

impl From<Mmsi> for u32 {
    fn from(mmsi: Mmsi) -> Self {
        mmsi.0
    }
}

impl fmt::Display for Mmsi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:09}", self.0)
    }
}

impl Mmsi {
    /// Get the raw MMSI value
    pub fn value(&self) -> u32 {
        self.0
    }

    /// True if the nine-digit form of the MMSI starts with `prefix`.
    ///
    /// AIS-SART units use the reserved `970` prefix.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.to_string().starts_with(prefix)
    }
}

/// WGS84 position in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lon: f64,
}

impl Position {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Position is inside the valid WGS84 range.
    ///
    /// The AIS "not available" values (lat 91, lon 181) fall outside it.
    pub fn is_plausible(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lon)
    }
}

/// Estimated time of arrival as broadcast: month, day, hour and minute UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Eta {
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
}

impl Eta {
    /// Convert ETA from 20-bit packed format
    ///
    /// - Bits 19-16: month; 1-12; 0 = not available = default
    /// - Bits 15-11: day; 1-31; 0 = not available = default
    /// - Bits 10-6: hour; 0-23; 24 = not available = default
    /// - Bits 5-0: minute; 0-59; 60 = not available = default
    pub fn from_bits(value: u32) -> Self {
        let month = (value >> 16 & 0xF) as u8;
        let day = (value >> 11 & 0x1F) as u8;
        let hour = (value >> 6 & 0x1F) as u8;
        let minute = (value & 0x3F) as u8;

        Self::from_fields(month, day, hour, minute)
    }

    /// Build from raw field values, mapping the "not available" codes to `None`
    pub fn from_fields(month: u8, day: u8, hour: u8, minute: u8) -> Self {
        Eta {
            month: match month {
                0 | 13..=255 => None,
                m => Some(m),
            },
            day: match day {
                0 | 32..=255 => None,
                d => Some(d),
            },
            hour: match hour {
                24..=255 => None,
                h => Some(h),
            },
            minute: match minute {
                60..=255 => None,
                m => Some(m),
            },
        }
    }

    /// Resolve to a timestamp in the given year
    pub fn in_year(&self, year: i32) -> Option<DateTime<Utc>> {
        let (month, day, hour, minute) = match (self.month, self.day, self.hour, self.minute) {
            (Some(m), Some(d), Some(h), Some(min)) => (m, d, h, min),
            _ => return None,
        };

        let naive_dt = chrono::NaiveDateTime::new(
            chrono::NaiveDate::from_ymd_opt(year, month as u32, day as u32)?,
            chrono::NaiveTime::from_hms_opt(hour as u32, minute as u32, 0)?,
        );
        Some(DateTime::<Utc>::from_naive_utc_and_offset(naive_dt, Utc))
    }
}

/// Position report, messages 1-3 (Class A) and 18-19 (Class B)
#[derive(Debug, Clone, PartialEq)]
pub struct PositionReport {
    pub position: Position,
    /// Speed over ground in knots
    pub sog: Option<f32>,
    /// Course over ground in degrees
    pub cog: Option<f32>,
    /// True heading in degrees
    pub heading: Option<u16>,
    /// Rate of turn, raw AIS value
    pub rot: Option<i8>,
    /// Navigational status, 0 - 14; always `None` for Class B
    pub nav_status: Option<u8>,
    pub pos_acc: bool,
    pub raim: bool,
}

/// Static and voyage related data, message 5
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StaticVoyageReport {
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

/// Class B static data report part A, message 24A
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassBStaticPartA {
    pub name: Option<String>,
}

/// Class B static data report part B, message 24B
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClassBStaticPartB {
    pub ship_type: Option<u8>,
    pub call_sign: Option<String>,
    pub dimensions: Dimensions,
}

/// Distances from the reference point to bow, stern, port and starboard, in metres
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Dimensions {
    pub to_bow: Option<u16>,
    pub to_stern: Option<u16>,
    pub to_port: Option<u16>,
    pub to_starboard: Option<u16>,
}

impl Dimensions {
    pub fn is_empty(&self) -> bool {
        self.to_bow.is_none()
            && self.to_stern.is_none()
            && self.to_port.is_none()
            && self.to_starboard.is_none()
    }

    /// `None` if either side is unknown or the sum does not fit
    pub fn length(&self) -> Option<u16> {
        self.to_bow?.checked_add(self.to_stern?)
    }

    pub fn width(&self) -> Option<u16> {
        self.to_port?.checked_add(self.to_starboard?)
    }
}

/// Aid-to-navigation report, message 21
#[derive(Debug, Clone, PartialEq)]
pub struct AtonReport {
    /// Type of aid, 0 - 31
    pub aton_type: u8,
    pub name: String,
    pub name_extension: Option<String>,
    pub position: Position,
    pub dimensions: Dimensions,
    pub pos_acc: bool,
    pub off_position: bool,
    pub virtual_aton: bool,
    pub assigned_mode: bool,
}

/// Base station report, message 4
#[derive(Debug, Clone, PartialEq)]
pub struct BaseStationReport {
    pub position: Position,
}

/// Route information application message, decoded from its binary payload
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteMessage {
    pub msg_link_id: u16,
    pub sender_classification: u8,
    /// Route type code; 31 cancels a previously sent route
    pub route_type: u8,
    pub start_month: u8,
    pub start_day: u8,
    pub start_hour: u8,
    pub start_minute: u8,
    /// Minutes until the route ends; 0 means cancelled
    pub duration: u32,
    pub waypoints: Vec<Position>,
}

/// Route suggestion addressed to a single station
#[derive(Debug, Clone, PartialEq)]
pub struct AddressedRouteMessage {
    pub destination: Mmsi,
    pub route: RouteMessage,
}

/// Different AIS message types
#[derive(Debug, Clone, PartialEq)]
pub enum AisMessageType {
    PositionReport(PositionReport),
    ClassBPositionReport(PositionReport),
    AtonReport(AtonReport),
    StaticVoyage(StaticVoyageReport),
    ClassBStaticPartA(ClassBStaticPartA),
    ClassBStaticPartB(ClassBStaticPartB),
    BaseStationReport(BaseStationReport),
    IntendedRoute(RouteMessage),
    AddressedRouteSuggestion(AddressedRouteMessage),
    BroadcastRouteSuggestion(RouteMessage),
}

/// Represents a complete AIS message with MMSI and type
#[derive(Debug, Clone, PartialEq)]
pub struct AisMessage {
    /// Maritime Mobile Service Identity of the sender
    pub mmsi: Mmsi,
    /// Type of AIS message
    pub message_type: AisMessageType,
}

impl AisMessage {
    /// Create a new AIS message
    pub fn new(mmsi: Mmsi, message_type: AisMessageType) -> Self {
        Self { mmsi, message_type }
    }
}
