/// DJI TXT flight log container constants.
///
/// The container is a fixed 100-byte header, a contiguous run of framed
/// records, and a trailing details area. All multi-byte fields are
/// little-endian.
// File header (100 bytes total)
pub const SIZE_FILE_HEADER: usize = 100;
pub const HDR_HEADER_RECORD_SIZE_LO: usize = 0; // 4 bytes - header + record area size
pub const HDR_HEADER_RECORD_SIZE_HI: usize = 4; // 4 bytes - upper half, unused by known firmware
pub const HDR_FILE_VERSION: usize = 8; // 1 byte - format version
pub const HDR_RESERVED: usize = 9; // 91 bytes - reserved, preserved verbatim
pub const HDR_UNSCRAMBLED_TAG: usize = 9; // 4 bytes - set on descrambled copies, zero in device logs

// Record frame prologue (3 bytes total)
pub const FRAME_OVERHEAD: usize = 3;
pub const FRAME_MARKER: usize = 0; // 1 byte - 0xFF on well-formed records
pub const FRAME_TYPE: usize = 1; // 1 byte - record type code
pub const FRAME_LENGTH: usize = 2; // 1 byte - payload length

/// Sentinel expected in the marker byte of every well-formed record.
pub const RECORD_MARKER: u8 = 0xFF;

// Descrambling
/// First format version whose record payloads are scrambled.
pub const SCRAMBLE_MIN_VERSION: u32 = 6;
/// Tag written at [`HDR_UNSCRAMBLED_TAG`] by the unscrambled rewrite.
pub const UNSCRAMBLED_TAG: [u8; 4] = *b"UNSC";
/// Length of the per-record XOR key.
pub const SCRAMBLE_KEY_LEN: usize = 8;
/// Salt mixed into the per-record key derivation.
pub const SCRAMBLE_SALT: &[u8] = b"DJITXT";
