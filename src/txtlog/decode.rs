//! Per-type record decoding.
//!
//! [`decode_record`] turns a canonical (descrambled) payload into a
//! [`DecodedRecord`]. Types with a known fixed layout are listed in the
//! static [`DECODERS`] table; each entry names the minimum payload length and
//! a decode function that reads fields at fixed little-endian offsets.
//!
//! Catalogued types without a layout, and every unknown type code, decode to
//! [`RecordValue::Raw`]. Only a known layout with a short payload fails, and
//! that failure ([`DjiError::MalformedRecord`]) is scoped to the one record.

use byteorder::{ByteOrder, LittleEndian};
use serde::{Serialize, Serializer};

use crate::txtlog::record_types::RecordType;
use crate::util::hex::format_bytes;
use crate::DjiError;

/// Opaque payload bytes, serialized as a hex string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBytes(pub Vec<u8>);

impl Serialize for RawBytes {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_bytes(&self.0))
    }
}

/// Aircraft state (OSD, type 1).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OsdRecord {
    /// Degrees. Bytes 0-7 (stored as radians).
    pub longitude: f64,
    /// Degrees. Bytes 8-15 (stored as radians).
    pub latitude: f64,
    /// Metres above take-off. Bytes 16-17 (decimetres).
    pub height: f64,
    /// m/s. Bytes 18-23.
    pub x_speed: f64,
    pub y_speed: f64,
    pub z_speed: f64,
    /// Degrees. Bytes 24-29 (tenths).
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
    /// Flight controller state, low 7 bits of byte 30.
    pub flyc_state: u8,
    /// RC signal present, bit 7 of byte 30.
    pub rc_state: bool,
    pub app_command: u8,
    // Flag word, bytes 32-35
    pub can_ip_up: bool,
    pub is_motor_up: bool,
    pub is_on_ground: bool,
    pub is_go_home_height_modified: bool,
    pub is_gps_used: bool,
    pub wave_error: bool,
    pub compass_error: bool,
    pub is_vision_used: bool,
    pub voltage_warning: u8,
    pub gps_num: u8,
    pub flight_action: u8,
    pub motor_fail_reason: u8,
    pub non_gps_cause: u8,
    pub battery: u8,
    /// Ultrasonic height in metres. Byte 41 (decimetres).
    pub swave_height: f64,
    /// Seconds. Bytes 42-43 (tenths).
    pub fly_time: f64,
    pub motor_revolution: u8,
    pub flyc_version: u8,
    pub drone_type: u8,
    pub imu_init_fail_reason: u8,
}

/// Home point (HOME, type 2).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HomeRecord {
    pub longitude: f64,
    pub latitude: f64,
    /// Metres.
    pub height: f64,
    pub has_go_home: bool,
    pub go_home_status: u8,
    pub is_dyn_home_point_enabled: bool,
    pub aircraft_head_direction: bool,
    pub go_home_mode: bool,
    pub is_home_record: bool,
    /// Metres.
    pub go_home_height: u16,
}

/// Gimbal attitude (GIMBAL, type 3).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GimbalRecord {
    pub pitch: f64,
    pub roll: f64,
    pub yaw: f64,
    pub mode: u8,
    pub roll_adjust: f64,
    pub yaw_angle: f64,
    pub is_pitch_in_limit: bool,
    pub is_roll_in_limit: bool,
    pub is_yaw_in_limit: bool,
    pub is_auto_calibration: bool,
    pub auto_calibration_result: bool,
    pub is_stuck: bool,
}

/// Remote controller sticks (RC, type 4). Stick values are offsets from centre.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RcRecord {
    pub aileron: i32,
    pub elevator: i32,
    pub throttle: i32,
    pub rudder: i32,
    pub gimbal: i32,
    pub wheel_offset: u8,
    pub mode_switch: u8,
    pub go_home: bool,
    pub record: bool,
}

/// Battery pack status (CENTER_BATTERY, type 7).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CenterBatteryRecord {
    pub relative_capacity: u8,
    /// Volts.
    pub current_pv: f64,
    /// mAh.
    pub current_capacity: u16,
    pub full_capacity: u16,
    pub life: u8,
    pub loop_num: u16,
    pub error_type: u32,
    /// Amperes.
    pub current: f64,
    /// Volts, one entry per cell.
    pub voltage_cells: [f64; 5],
    pub serial_no: u16,
    pub product_date: u16,
    /// Degrees Celsius.
    pub temperature: f64,
}

/// Battery estimates (SMART_BATTERY, type 8).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmartBatteryRecord {
    /// Seconds.
    pub useful_time: u16,
    pub go_home_time: u16,
    pub land_time: u16,
    /// Percent.
    pub go_home_battery: u16,
    pub land_battery: u16,
    /// Metres.
    pub safe_fly_radius: u32,
    pub volume_consume: f32,
    pub status: u32,
    pub go_home_status: u8,
    pub go_home_countdown: u8,
    /// Volts.
    pub voltage: f64,
    pub battery: u8,
    pub low_warning: u8,
    pub low_warning_go_home: bool,
    pub serious_low_warning: u8,
    pub serious_low_warning_landing: bool,
    pub voltage_percent: u8,
}

/// Remote controller GPS fix (RC_GPS, type 11).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RcGpsRecord {
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    /// Degrees (stored as 1e-7 degrees).
    pub latitude: f64,
    pub longitude: f64,
    /// m/s (stored as mm/s).
    pub x_speed: f64,
    pub y_speed: f64,
    pub gps_num: u8,
    pub accuracy: f32,
    pub valid_data: u16,
}

/// Mobile device GPS fix (APP_GPS, type 14).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppGpsRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f32,
}

/// Decoded representation of a record payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordValue {
    Osd(OsdRecord),
    Home(HomeRecord),
    Gimbal(GimbalRecord),
    Rc(RcRecord),
    CenterBattery(CenterBatteryRecord),
    SmartBattery(SmartBatteryRecord),
    RcGps(RcGpsRecord),
    AppGps(AppGpsRecord),
    /// APP_TIP, APP_WARN and APP_SER_WARN messages.
    Text(String),
    /// Embedded JPEG data.
    Jpeg(RawBytes),
    /// Types without a known layout.
    Raw(RawBytes),
}

/// One record after descrambling and decoding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedRecord {
    /// Absolute file offset of the frame.
    pub offset: usize,
    pub record_type: RecordType,
    /// False when the frame's marker byte was wrong; the value is then the
    /// stored payload, undecoded.
    pub valid: bool,
    pub value: RecordValue,
}

impl DecodedRecord {
    /// Record carrying the payload bytes without field decoding.
    pub fn raw(offset: usize, record_type: u8, payload: &[u8], valid: bool) -> Self {
        DecodedRecord {
            offset,
            record_type: RecordType::from_u8(record_type),
            valid,
            value: RecordValue::Raw(RawBytes(payload.to_vec())),
        }
    }
}

/// Decode function for a fixed layout. Only called with payloads of at
/// least the layout's `min_len`.
pub type DecodeFn = fn(&[u8]) -> RecordValue;

/// A known record layout.
#[derive(Debug, Clone, Copy)]
pub struct RecordLayout {
    pub record_type: RecordType,
    /// Minimum payload length the layout reads.
    pub min_len: usize,
    pub decode: DecodeFn,
}

pub const OSD_LEN: usize = 50;
pub const HOME_LEN: usize = 24;
pub const GIMBAL_LEN: usize = 11;
pub const RC_LEN: usize = 13;
pub const CENTER_BATTERY_LEN: usize = 32;
pub const SMART_BATTERY_LEN: usize = 30;
pub const RC_GPS_LEN: usize = 30;
pub const APP_GPS_LEN: usize = 20;

/// Registry of known layouts, keyed by record type.
pub static DECODERS: &[RecordLayout] = &[
    RecordLayout { record_type: RecordType::Osd, min_len: OSD_LEN, decode: decode_osd },
    RecordLayout { record_type: RecordType::Home, min_len: HOME_LEN, decode: decode_home },
    RecordLayout { record_type: RecordType::Gimbal, min_len: GIMBAL_LEN, decode: decode_gimbal },
    RecordLayout { record_type: RecordType::Rc, min_len: RC_LEN, decode: decode_rc },
    RecordLayout {
        record_type: RecordType::CenterBattery,
        min_len: CENTER_BATTERY_LEN,
        decode: decode_center_battery,
    },
    RecordLayout {
        record_type: RecordType::SmartBattery,
        min_len: SMART_BATTERY_LEN,
        decode: decode_smart_battery,
    },
    RecordLayout { record_type: RecordType::AppTip, min_len: 0, decode: decode_text },
    RecordLayout { record_type: RecordType::AppWarn, min_len: 0, decode: decode_text },
    RecordLayout { record_type: RecordType::RcGps, min_len: RC_GPS_LEN, decode: decode_rc_gps },
    RecordLayout { record_type: RecordType::AppGps, min_len: APP_GPS_LEN, decode: decode_app_gps },
    RecordLayout { record_type: RecordType::AppSerWarn, min_len: 0, decode: decode_text },
    RecordLayout { record_type: RecordType::Jpeg, min_len: 0, decode: decode_jpeg },
];

/// Look up the layout registered for `record_type`.
pub fn layout_for(record_type: RecordType) -> Option<&'static RecordLayout> {
    DECODERS.iter().find(|l| l.record_type == record_type)
}

/// Decode a canonical payload.
///
/// `offset` is the frame's file offset, carried into the result and into
/// any error.
///
/// # Examples
///
/// ```
/// use djitxt::txtlog::decode::{decode_record, RecordValue};
///
/// let rec = decode_record(9, b"Takeoff\0\0", 100).unwrap();
/// assert_eq!(rec.value, RecordValue::Text("Takeoff".to_string()));
///
/// // Unknown types never fail
/// let raw = decode_record(222, &[1, 2, 3], 200).unwrap();
/// assert!(matches!(raw.value, RecordValue::Raw(_)));
///
/// // A short OSD payload is malformed
/// assert!(decode_record(1, &[0u8; 4], 300).is_err());
/// ```
pub fn decode_record(record_type: u8, payload: &[u8], offset: usize) -> Result<DecodedRecord, DjiError> {
    let kind = RecordType::from_u8(record_type);
    let value = match layout_for(kind) {
        Some(layout) => {
            if payload.len() < layout.min_len {
                return Err(DjiError::MalformedRecord {
                    record_type: kind.to_string(),
                    offset,
                    expected: layout.min_len,
                    actual: payload.len(),
                });
            }
            (layout.decode)(payload)
        }
        None => RecordValue::Raw(RawBytes(payload.to_vec())),
    };

    Ok(DecodedRecord {
        offset,
        record_type: kind,
        valid: true,
        value,
    })
}

fn i16_tenths(data: &[u8], offset: usize) -> f64 {
    f64::from(LittleEndian::read_i16(&data[offset..])) / 10.0
}

fn u16_thousandths(data: &[u8], offset: usize) -> f64 {
    f64::from(LittleEndian::read_u16(&data[offset..])) / 1000.0
}

fn radians_to_degrees(data: &[u8], offset: usize) -> f64 {
    LittleEndian::read_f64(&data[offset..]).to_degrees()
}

fn bit(value: u32, n: u32) -> bool {
    value & (1 << n) != 0
}

fn decode_osd(data: &[u8]) -> RecordValue {
    let mode1 = data[30];
    let flags = LittleEndian::read_u32(&data[32..]);
    RecordValue::Osd(OsdRecord {
        longitude: radians_to_degrees(data, 0),
        latitude: radians_to_degrees(data, 8),
        height: i16_tenths(data, 16),
        x_speed: i16_tenths(data, 18),
        y_speed: i16_tenths(data, 20),
        z_speed: i16_tenths(data, 22),
        pitch: i16_tenths(data, 24),
        roll: i16_tenths(data, 26),
        yaw: i16_tenths(data, 28),
        flyc_state: mode1 & 0x7F,
        rc_state: mode1 & 0x80 != 0,
        app_command: data[31],
        can_ip_up: bit(flags, 0),
        is_motor_up: bit(flags, 1),
        is_on_ground: bit(flags, 2),
        is_go_home_height_modified: bit(flags, 3),
        is_gps_used: bit(flags, 4),
        wave_error: bit(flags, 5),
        compass_error: bit(flags, 6),
        is_vision_used: bit(flags, 7),
        voltage_warning: ((flags >> 8) & 0xFF) as u8,
        gps_num: data[36],
        flight_action: data[37],
        motor_fail_reason: data[38],
        non_gps_cause: data[39] & 0x0F,
        battery: data[40],
        swave_height: f64::from(data[41]) / 10.0,
        fly_time: f64::from(LittleEndian::read_u16(&data[42..])) / 10.0,
        motor_revolution: data[44],
        // 45-46 reserved
        flyc_version: data[47],
        drone_type: data[48],
        imu_init_fail_reason: data[49],
    })
}

fn decode_home(data: &[u8]) -> RecordValue {
    let flags = u32::from(LittleEndian::read_u16(&data[20..]));
    RecordValue::Home(HomeRecord {
        longitude: radians_to_degrees(data, 0),
        latitude: radians_to_degrees(data, 8),
        height: f64::from(LittleEndian::read_f32(&data[16..])),
        has_go_home: bit(flags, 0),
        go_home_status: ((flags >> 1) & 0x07) as u8,
        is_dyn_home_point_enabled: bit(flags, 4),
        aircraft_head_direction: bit(flags, 5),
        go_home_mode: bit(flags, 6),
        is_home_record: bit(flags, 7),
        go_home_height: LittleEndian::read_u16(&data[22..]),
    })
}

fn decode_gimbal(data: &[u8]) -> RecordValue {
    let flags = u32::from(data[10]);
    RecordValue::Gimbal(GimbalRecord {
        pitch: i16_tenths(data, 0),
        roll: i16_tenths(data, 2),
        yaw: i16_tenths(data, 4),
        mode: data[6] >> 6,
        roll_adjust: f64::from(data[7] as i8) / 10.0,
        yaw_angle: i16_tenths(data, 8),
        is_pitch_in_limit: bit(flags, 0),
        is_roll_in_limit: bit(flags, 1),
        is_yaw_in_limit: bit(flags, 2),
        is_auto_calibration: bit(flags, 3),
        auto_calibration_result: bit(flags, 4),
        is_stuck: bit(flags, 6),
    })
}

/// Raw stick reading at centre position.
const RC_STICK_CENTER: i32 = 1024;

fn stick(data: &[u8], offset: usize) -> i32 {
    i32::from(LittleEndian::read_u16(&data[offset..])) - RC_STICK_CENTER
}

fn decode_rc(data: &[u8]) -> RecordValue {
    RecordValue::Rc(RcRecord {
        aileron: stick(data, 0),
        elevator: stick(data, 2),
        throttle: stick(data, 4),
        rudder: stick(data, 6),
        gimbal: stick(data, 8),
        wheel_offset: (data[10] >> 1) & 0x1F,
        mode_switch: (data[11] >> 4) & 0x03,
        go_home: (data[11] >> 3) & 0x01 != 0,
        record: data[12] & 0x01 != 0,
    })
}

fn decode_center_battery(data: &[u8]) -> RecordValue {
    let mut voltage_cells = [0.0; 5];
    for (i, cell) in voltage_cells.iter_mut().enumerate() {
        *cell = u16_thousandths(data, 16 + i * 2);
    }
    RecordValue::CenterBattery(CenterBatteryRecord {
        relative_capacity: data[0],
        current_pv: u16_thousandths(data, 1),
        current_capacity: LittleEndian::read_u16(&data[3..]),
        full_capacity: LittleEndian::read_u16(&data[5..]),
        life: data[7],
        loop_num: LittleEndian::read_u16(&data[8..]),
        error_type: LittleEndian::read_u32(&data[10..]),
        current: u16_thousandths(data, 14),
        voltage_cells,
        serial_no: LittleEndian::read_u16(&data[26..]),
        product_date: LittleEndian::read_u16(&data[28..]),
        temperature: f64::from(LittleEndian::read_u16(&data[30..])) / 10.0,
    })
}

fn decode_smart_battery(data: &[u8]) -> RecordValue {
    RecordValue::SmartBattery(SmartBatteryRecord {
        useful_time: LittleEndian::read_u16(&data[0..]),
        go_home_time: LittleEndian::read_u16(&data[2..]),
        land_time: LittleEndian::read_u16(&data[4..]),
        go_home_battery: LittleEndian::read_u16(&data[6..]),
        land_battery: LittleEndian::read_u16(&data[8..]),
        safe_fly_radius: LittleEndian::read_u32(&data[10..]),
        volume_consume: LittleEndian::read_f32(&data[14..]),
        status: LittleEndian::read_u32(&data[18..]),
        go_home_status: data[22],
        go_home_countdown: data[23],
        voltage: u16_thousandths(data, 24),
        battery: data[26],
        low_warning: data[27] & 0x7F,
        low_warning_go_home: data[27] & 0x80 != 0,
        serious_low_warning: data[28] & 0x7F,
        serious_low_warning_landing: data[28] & 0x80 != 0,
        voltage_percent: data[29],
    })
}

fn decode_rc_gps(data: &[u8]) -> RecordValue {
    RecordValue::RcGps(RcGpsRecord {
        hour: data[0],
        minute: data[1],
        second: data[2],
        year: LittleEndian::read_u16(&data[3..]),
        month: data[5],
        day: data[6],
        latitude: f64::from(LittleEndian::read_i32(&data[7..])) / 1e7,
        longitude: f64::from(LittleEndian::read_i32(&data[11..])) / 1e7,
        x_speed: f64::from(LittleEndian::read_i32(&data[15..])) / 1000.0,
        y_speed: f64::from(LittleEndian::read_i32(&data[19..])) / 1000.0,
        gps_num: data[23],
        accuracy: LittleEndian::read_f32(&data[24..]),
        valid_data: LittleEndian::read_u16(&data[28..]),
    })
}

fn decode_app_gps(data: &[u8]) -> RecordValue {
    RecordValue::AppGps(AppGpsRecord {
        latitude: LittleEndian::read_f64(&data[0..]),
        longitude: LittleEndian::read_f64(&data[8..]),
        accuracy: LittleEndian::read_f32(&data[16..]),
    })
}

fn decode_text(data: &[u8]) -> RecordValue {
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |p| p + 1);
    RecordValue::Text(String::from_utf8_lossy(&data[..end]).into_owned())
}

fn decode_jpeg(data: &[u8]) -> RecordValue {
    RecordValue::Jpeg(RawBytes(data.to_vec()))
}
