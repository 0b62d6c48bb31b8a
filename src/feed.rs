//! Digitraffic marine AIS feed records.
//!
//! The public feed publishes already decoded AIS data as JSON; these records
//! are converted into registry messages.

use serde::{Deserialize, Serialize};

use crate::models::{Dimensions, Eta, Position, PositionReport, StaticVoyageReport};
use serde_helpers::*;

/// Vessel location
///
/// See: https://meri.digitraffic.fi/swagger/#/AIS%20V1/vesselLocationsByMssiAndTimestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VesselLocation {
    /// Location record timestamp in seconds from Unix epoch.
    pub time: u64,
    /// Speed over ground in knots, None if not available (=102.3)
    #[serde(deserialize_with = "deserialize_sog")]
    pub sog: Option<f32>,
    /// Course over ground in degrees, None if not available (360)
    #[serde(deserialize_with = "deserialize_cog")]
    pub cog: Option<f32>,
    /// Navigational status, 0 - 14; 15 = default -> None
    ///
    /// - 1 = at anchor
    /// - 5 = moored
    /// - 14 = AIS-SART (active), MOB-AIS, EPIRB-AIS
    #[serde(rename = "navStat", deserialize_with = "deserialize_nav_stat")]
    pub nav_stat: Option<u8>,
    /// Rate of turn, None if not available (=-128)
    #[serde(deserialize_with = "deserialize_rot")]
    pub rot: Option<i8>,
    /// Position accuracy, 1 = high, 0 = low
    #[serde(rename = "posAcc")]
    pub pos_acc: bool,
    /// Receiver autonomous integrity monitoring (RAIM) flag of electronic position fixing device
    pub raim: bool,
    /// Heading in Degrees (0-359), None if 511 = not available (default)
    #[serde(deserialize_with = "deserialize_heading")]
    pub heading: Option<u16>,
    /// Longitude in WGS84 format in decimal degrees:
    pub lon: f64,
    /// Latitude in WGS84 format in decimal degrees:
    pub lat: f64,
}

/// Vessel metadata
///
/// See: https://meri.digitraffic.fi/swagger/#/AIS%20V1/vesselMetadataByMssi
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
pub struct VesselMetadata {
    /// Name of the vessel, empty string if not available
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub name: Option<String>,
    /// Record timestamp in milliseconds from Unix epoch
    pub timestamp: u64,
    /// Destination, empty string if not available
    #[serde(deserialize_with = "deserialize_trimmed_string")]
    pub destination: Option<String>,
    /// Vessel type, None if undefined (0)
    #[serde(rename = "type", deserialize_with = "deserialize_vessel_type")]
    pub vessel_type: Option<u8>,
    /// Call sign, empty string if not available
    #[serde(rename = "callSign", deserialize_with = "deserialize_trimmed_string")]
    pub call_sign: Option<String>,
    /// IMO number, None if not available (0)
    #[serde(deserialize_with = "deserialize_imo")]
    pub imo: Option<u32>,
    /// Maximum present static draught in m, None if not available (0)
    #[serde(deserialize_with = "deserialize_draught")]
    pub draught: Option<f32>,
    /// Estimated time of arrival; MMDDHHMM UTC
    #[serde(deserialize_with = "deserialize_eta")]
    pub eta: Eta,
    /// Type of electronic position fixing device, None if undefined (0)
    #[serde(rename = "posType", deserialize_with = "deserialize_pos_type")]
    pub pos_type: Option<u8>,
    /// Reference point for reported position dimension A
    #[serde(rename = "refA", deserialize_with = "deserialize_ref_dim")]
    pub ref_a: Option<u16>,
    /// Reference point for reported position dimension B
    #[serde(rename = "refB", deserialize_with = "deserialize_ref_dim")]
    pub ref_b: Option<u16>,
    /// Reference point for reported position dimension C
    #[serde(rename = "refC", deserialize_with = "deserialize_ref_dim")]
    pub ref_c: Option<u16>,
    /// Reference point for reported position dimension D
    #[serde(rename = "refD", deserialize_with = "deserialize_ref_dim")]
    pub ref_d: Option<u16>,
}

impl From<&VesselLocation> for PositionReport {
    fn from(location: &VesselLocation) -> Self {
        PositionReport {
            position: Position::new(location.lat, location.lon),
            sog: location.sog,
            cog: location.cog,
            heading: location.heading,
            rot: location.rot,
            nav_status: location.nav_stat,
            pos_acc: location.pos_acc,
            raim: location.raim,
        }
    }
}

impl From<&VesselMetadata> for StaticVoyageReport {
    fn from(metadata: &VesselMetadata) -> Self {
        StaticVoyageReport {
            name: metadata.name.clone(),
            call_sign: metadata.call_sign.clone(),
            imo: metadata.imo,
            ship_type: metadata.vessel_type,
            dimensions: Dimensions {
                to_bow: metadata.ref_a,
                to_stern: metadata.ref_b,
                to_port: metadata.ref_c,
                to_starboard: metadata.ref_d,
            },
            destination: metadata.destination.clone(),
            eta: metadata.eta,
            draught: metadata.draught,
            pos_type: metadata.pos_type,
        }
    }
}

/// Custom deserializers
mod serde_helpers {
    use crate::models::Eta;
    use serde::{self, Deserialize, Deserializer};

    /// Deserialize `T`, mapping the feed's "not available" marker to `None`
    fn with_sentinel<'de, D, T>(deserializer: D, sentinel: T) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + PartialEq,
    {
        let value = T::deserialize(deserializer)?;
        Ok(if value == sentinel { None } else { Some(value) })
    }

    pub fn deserialize_sog<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        with_sentinel(deserializer, 102.3)
    }

    pub fn deserialize_cog<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        with_sentinel(deserializer, 360.0)
    }

    pub fn deserialize_nav_stat<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        with_sentinel(deserializer, 15)
    }

    pub fn deserialize_rot<'de, D>(deserializer: D) -> Result<Option<i8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        with_sentinel(deserializer, -128)
    }

    pub fn deserialize_heading<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
    where
        D: Deserializer<'de>,
    {
        with_sentinel(deserializer, 511)
    }

    pub fn deserialize_trimmed_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        let trimmed = s.trim();
        Ok(if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        })
    }

    pub fn deserialize_vessel_type<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        with_sentinel(deserializer, 0)
    }

    pub fn deserialize_imo<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        with_sentinel(deserializer, 0)
    }

    pub fn deserialize_draught<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<u8> = with_sentinel(deserializer, 0)?;
        Ok(value.map(|v| v as f32 / 10f32))
    }

    pub fn deserialize_eta<'de, D>(deserializer: D) -> Result<Eta, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u32::deserialize(deserializer)?;
        Ok(Eta::from_bits(value))
    }

    pub fn deserialize_pos_type<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        with_sentinel(deserializer, 0)
    }

    pub fn deserialize_ref_dim<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
    where
        D: Deserializer<'de>,
    {
        with_sentinel(deserializer, 0)
    }
}
