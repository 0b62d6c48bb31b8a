//! Aids to navigation

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Lifecycle, Target, TargetCore};
use crate::models::{AtonReport, Dimensions, Mmsi, Position};

const GONE_TOLERANCE_SECS: i64 = 10 * 60;

/// Type of aid to navigation, ITU-R M.1371 table 74
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum AtonType {
    #[default]
    NotSpecified,
    ReferencePoint,
    Racon,
    FixedStructure,
    Spare,
    LightWithoutSectors,
    LightWithSectors,
    LeadingLightFront,
    LeadingLightRear,
    BeaconCardinalNorth,
    BeaconCardinalEast,
    BeaconCardinalSouth,
    BeaconCardinalWest,
    BeaconPortHand,
    BeaconStarboardHand,
    BeaconPreferredChannelPort,
    BeaconPreferredChannelStarboard,
    BeaconIsolatedDanger,
    BeaconSafeWater,
    BeaconSpecialMark,
    CardinalMarkNorth,
    CardinalMarkEast,
    CardinalMarkSouth,
    CardinalMarkWest,
    PortHandMark,
    StarboardHandMark,
    PreferredChannelPort,
    PreferredChannelStarboard,
    IsolatedDanger,
    SafeWater,
    SpecialMark,
    LightVessel,
}

const ATON_TYPES: [AtonType; 32] = [
    AtonType::NotSpecified,
    AtonType::ReferencePoint,
    AtonType::Racon,
    AtonType::FixedStructure,
    AtonType::Spare,
    AtonType::LightWithoutSectors,
    AtonType::LightWithSectors,
    AtonType::LeadingLightFront,
    AtonType::LeadingLightRear,
    AtonType::BeaconCardinalNorth,
    AtonType::BeaconCardinalEast,
    AtonType::BeaconCardinalSouth,
    AtonType::BeaconCardinalWest,
    AtonType::BeaconPortHand,
    AtonType::BeaconStarboardHand,
    AtonType::BeaconPreferredChannelPort,
    AtonType::BeaconPreferredChannelStarboard,
    AtonType::BeaconIsolatedDanger,
    AtonType::BeaconSafeWater,
    AtonType::BeaconSpecialMark,
    AtonType::CardinalMarkNorth,
    AtonType::CardinalMarkEast,
    AtonType::CardinalMarkSouth,
    AtonType::CardinalMarkWest,
    AtonType::PortHandMark,
    AtonType::StarboardHandMark,
    AtonType::PreferredChannelPort,
    AtonType::PreferredChannelStarboard,
    AtonType::IsolatedDanger,
    AtonType::SafeWater,
    AtonType::SpecialMark,
    AtonType::LightVessel,
];

impl From<u8> for AtonType {
    /// Only the low five bits carry the type
    fn from(code: u8) -> Self {
        ATON_TYPES[(code & 0x1F) as usize]
    }
}

impl AtonType {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Codes 20 - 31 are floating aids
    pub fn is_floating(self) -> bool {
        self.code() >= 20
    }

    pub fn description(self) -> &'static str {
        match self {
            AtonType::NotSpecified => "Not specified",
            AtonType::ReferencePoint => "Reference point",
            AtonType::Racon => "RACON",
            AtonType::FixedStructure => "Fixed structure off shore",
            AtonType::Spare => "Spare",
            AtonType::LightWithoutSectors => "Light, without sectors",
            AtonType::LightWithSectors => "Light, with sectors",
            AtonType::LeadingLightFront => "Leading light front",
            AtonType::LeadingLightRear => "Leading light rear",
            AtonType::BeaconCardinalNorth => "Beacon, cardinal N",
            AtonType::BeaconCardinalEast => "Beacon, cardinal E",
            AtonType::BeaconCardinalSouth => "Beacon, cardinal S",
            AtonType::BeaconCardinalWest => "Beacon, cardinal W",
            AtonType::BeaconPortHand => "Beacon, port hand",
            AtonType::BeaconStarboardHand => "Beacon, starboard hand",
            AtonType::BeaconPreferredChannelPort => "Beacon, preferred channel port hand",
            AtonType::BeaconPreferredChannelStarboard => "Beacon, preferred channel starboard hand",
            AtonType::BeaconIsolatedDanger => "Beacon, isolated danger",
            AtonType::BeaconSafeWater => "Beacon, safe water",
            AtonType::BeaconSpecialMark => "Beacon, special mark",
            AtonType::CardinalMarkNorth => "Cardinal mark N",
            AtonType::CardinalMarkEast => "Cardinal mark E",
            AtonType::CardinalMarkSouth => "Cardinal mark S",
            AtonType::CardinalMarkWest => "Cardinal mark W",
            AtonType::PortHandMark => "Port hand mark",
            AtonType::StarboardHandMark => "Starboard hand mark",
            AtonType::PreferredChannelPort => "Preferred channel port hand",
            AtonType::PreferredChannelStarboard => "Preferred channel starboard hand",
            AtonType::IsolatedDanger => "Isolated danger",
            AtonType::SafeWater => "Safe water",
            AtonType::SpecialMark => "Special mark",
            AtonType::LightVessel => "Light vessel / LANBY / rigs",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AtonTarget {
    pub core: TargetCore,
    pub aton_type: AtonType,
    pub name: String,
    pub name_extension: Option<String>,
    pub position: Option<Position>,
    pub dimensions: Dimensions,
    pub pos_acc: bool,
    pub off_position: bool,
    pub virtual_aton: bool,
    pub assigned_mode: bool,
}

impl AtonTarget {
    pub fn new(mmsi: Mmsi, now: DateTime<Utc>) -> Self {
        Self {
            core: TargetCore::new(mmsi, now),
            aton_type: AtonType::default(),
            name: String::new(),
            name_extension: None,
            position: None,
            dimensions: Dimensions::default(),
            pos_acc: false,
            off_position: false,
            virtual_aton: false,
            assigned_mode: false,
        }
    }

    pub fn update(&mut self, report: &AtonReport, now: DateTime<Utc>) {
        self.aton_type = AtonType::from(report.aton_type);
        self.name = report.name.trim().to_string();
        self.name_extension = report
            .name_extension
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        self.position = Some(report.position);
        self.dimensions = report.dimensions;
        self.pos_acc = report.pos_acc;
        self.off_position = report.off_position;
        self.virtual_aton = report.virtual_aton;
        self.assigned_mode = report.assigned_mode;
        self.core.touch(now);
    }

    /// Name with the extension appended
    pub fn full_name(&self) -> String {
        match &self.name_extension {
            Some(ext) => format!("{}{}", self.name, ext),
            None => self.name.clone(),
        }
    }
}

impl Lifecycle for AtonTarget {
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
        Target::Aton(self.clone())
    }
}
