//! Record type definitions.
//!
//! Maps the 1-byte type field of a record frame to a [`RecordType`] enum.
//! Codes outside the catalog are preserved as `Unknown(N)` so that logs from
//! newer firmware still scan and decode (as raw bytes).

use serde::{Serialize, Serializer};
use std::fmt;

/// Record types observed in DJI TXT flight logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordType {
    /// Aircraft position, attitude, speed and flight state (1)
    Osd,
    /// Home point and return-to-home settings (2)
    Home,
    /// Gimbal attitude and mode (3)
    Gimbal,
    /// Remote controller stick positions (4)
    Rc,
    /// App-side distance, speed and timestamp summary (5)
    Custom,
    /// Landing gear deformation state (6)
    Deform,
    /// Battery pack status (7)
    CenterBattery,
    /// Flight-time and return-home battery estimates (8)
    SmartBattery,
    /// App tip text (9)
    AppTip,
    /// App warning text (10)
    AppWarn,
    /// Remote controller GPS fix (11)
    RcGps,
    /// Remote controller debug data (12)
    RcDebug,
    /// Recovery / identification info (13)
    Recover,
    /// Mobile device GPS fix (14)
    AppGps,
    /// Firmware versions (15)
    Firmware,
    /// OFDM link debug data (16)
    OfdmDebug,
    /// Vision system group (17)
    VisionGroup,
    /// Vision system warnings (18)
    VisionWarn,
    /// Flight controller parameters (19)
    McParam,
    /// App operation (20)
    AppOperation,
    /// App server warning text (24)
    AppSerWarn,
    /// Embedded JPEG thumbnail data (57)
    Jpeg,
    /// Code not in the catalog
    Unknown(u8),
}

/// Every catalogued type, in code order.
pub const KNOWN_RECORD_TYPES: &[RecordType] = &[
    RecordType::Osd,
    RecordType::Home,
    RecordType::Gimbal,
    RecordType::Rc,
    RecordType::Custom,
    RecordType::Deform,
    RecordType::CenterBattery,
    RecordType::SmartBattery,
    RecordType::AppTip,
    RecordType::AppWarn,
    RecordType::RcGps,
    RecordType::RcDebug,
    RecordType::Recover,
    RecordType::AppGps,
    RecordType::Firmware,
    RecordType::OfdmDebug,
    RecordType::VisionGroup,
    RecordType::VisionWarn,
    RecordType::McParam,
    RecordType::AppOperation,
    RecordType::AppSerWarn,
    RecordType::Jpeg,
];

impl RecordType {
    /// Convert a type code to a RecordType.
    ///
    /// # Examples
    ///
    /// ```
    /// use djitxt::txtlog::record_types::RecordType;
    ///
    /// assert_eq!(RecordType::from_u8(1), RecordType::Osd);
    /// assert_eq!(RecordType::from_u8(57).name(), "JPEG");
    ///
    /// // Unknown codes are preserved
    /// let unknown = RecordType::from_u8(200);
    /// assert_eq!(unknown, RecordType::Unknown(200));
    /// assert_eq!(format!("{}", unknown), "UNKNOWN(200)");
    /// ```
    pub fn from_u8(val: u8) -> Self {
        match val {
            1 => RecordType::Osd,
            2 => RecordType::Home,
            3 => RecordType::Gimbal,
            4 => RecordType::Rc,
            5 => RecordType::Custom,
            6 => RecordType::Deform,
            7 => RecordType::CenterBattery,
            8 => RecordType::SmartBattery,
            9 => RecordType::AppTip,
            10 => RecordType::AppWarn,
            11 => RecordType::RcGps,
            12 => RecordType::RcDebug,
            13 => RecordType::Recover,
            14 => RecordType::AppGps,
            15 => RecordType::Firmware,
            16 => RecordType::OfdmDebug,
            17 => RecordType::VisionGroup,
            18 => RecordType::VisionWarn,
            19 => RecordType::McParam,
            20 => RecordType::AppOperation,
            24 => RecordType::AppSerWarn,
            57 => RecordType::Jpeg,
            v => RecordType::Unknown(v),
        }
    }

    /// The on-disk type code.
    pub fn as_u8(&self) -> u8 {
        match self {
            RecordType::Osd => 1,
            RecordType::Home => 2,
            RecordType::Gimbal => 3,
            RecordType::Rc => 4,
            RecordType::Custom => 5,
            RecordType::Deform => 6,
            RecordType::CenterBattery => 7,
            RecordType::SmartBattery => 8,
            RecordType::AppTip => 9,
            RecordType::AppWarn => 10,
            RecordType::RcGps => 11,
            RecordType::RcDebug => 12,
            RecordType::Recover => 13,
            RecordType::AppGps => 14,
            RecordType::Firmware => 15,
            RecordType::OfdmDebug => 16,
            RecordType::VisionGroup => 17,
            RecordType::VisionWarn => 18,
            RecordType::McParam => 19,
            RecordType::AppOperation => 20,
            RecordType::AppSerWarn => 24,
            RecordType::Jpeg => 57,
            RecordType::Unknown(v) => *v,
        }
    }

    /// Display name for this record type.
    pub fn name(&self) -> &'static str {
        match self {
            RecordType::Osd => "OSD",
            RecordType::Home => "HOME",
            RecordType::Gimbal => "GIMBAL",
            RecordType::Rc => "RC",
            RecordType::Custom => "CUSTOM",
            RecordType::Deform => "DEFORM",
            RecordType::CenterBattery => "CENTER_BATTERY",
            RecordType::SmartBattery => "SMART_BATTERY",
            RecordType::AppTip => "APP_TIP",
            RecordType::AppWarn => "APP_WARN",
            RecordType::RcGps => "RC_GPS",
            RecordType::RcDebug => "RC_DEBUG",
            RecordType::Recover => "RECOVER",
            RecordType::AppGps => "APP_GPS",
            RecordType::Firmware => "FIRMWARE",
            RecordType::OfdmDebug => "OFDM_DEBUG",
            RecordType::VisionGroup => "VISION_GROUP",
            RecordType::VisionWarn => "VISION_WARN",
            RecordType::McParam => "MC_PARAM",
            RecordType::AppOperation => "APP_OPERATION",
            RecordType::AppSerWarn => "APP_SER_WARN",
            RecordType::Jpeg => "JPEG",
            RecordType::Unknown(_) => "UNKNOWN",
        }
    }

    /// Resolve a user-supplied type name or numeric code.
    ///
    /// Names are matched case-insensitively against [`RecordType::name`];
    /// plain numbers map through [`RecordType::from_u8`].
    ///
    /// ```
    /// use djitxt::txtlog::record_types::RecordType;
    ///
    /// assert_eq!(RecordType::from_name("gimbal"), Some(RecordType::Gimbal));
    /// assert_eq!(RecordType::from_name("8"), Some(RecordType::SmartBattery));
    /// assert_eq!(RecordType::from_name("99"), Some(RecordType::Unknown(99)));
    /// assert_eq!(RecordType::from_name("BOGUS"), None);
    /// ```
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if let Ok(code) = name.parse::<u8>() {
            return Some(Self::from_u8(code));
        }
        KNOWN_RECORD_TYPES
            .iter()
            .copied()
            .find(|t| t.name().eq_ignore_ascii_case(name))
    }

    /// True if the code is part of the catalog.
    pub fn is_known(&self) -> bool {
        !matches!(self, RecordType::Unknown(_))
    }

    /// True if payloads of this type are stored scrambled in scrambling-era logs.
    ///
    /// JPEG payloads are written as-is; unknown codes are never touched.
    pub fn is_scrambled(&self) -> bool {
        !matches!(self, RecordType::Jpeg | RecordType::Unknown(_))
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordType::Unknown(v) => write!(f, "UNKNOWN({})", v),
            _ => write!(f, "{}", self.name()),
        }
    }
}

impl Serialize for RecordType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
