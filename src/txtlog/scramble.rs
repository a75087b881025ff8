//! Record payload descrambling.
//!
//! Logs with format version 6 and later store most record payloads in a
//! scrambled form. The first payload byte is a per-record key byte and is
//! stored in the clear. The remaining bytes are XORed with an 8-byte key
//! derived from the record type and that key byte:
//!
//! ```text
//! key       = SHA-256(type || key_byte || "DJITXT")[0..8]
//! plain[i]  = stored[i] ^ key[(i - 1) % 8]      for i >= 1
//! ```
//!
//! The transform depends only on the record's own type and payload, so records
//! can be descrambled independently and in any order. It is an involution:
//! applying it twice yields the input, which is what [`scramble`] relies on.
//!
//! The key byte is not part of the record: decoders see only the bytes after
//! it ([`Descrambler::record_body`]). Unscrambled copies keep the key byte in
//! place so framing is unchanged, and carry a header tag telling readers to
//! skip the keystream.
//!
//! JPEG payloads and unknown type codes are never scrambled.

use std::borrow::Cow;

use sha2::{Digest, Sha256};
use tracing::trace;

use crate::txtlog::constants::*;
use crate::txtlog::header::FileHeader;
use crate::txtlog::record_types::RecordType;

/// Derive the XOR key for one record.
pub fn record_key(record_type: u8, key_byte: u8) -> [u8; SCRAMBLE_KEY_LEN] {
    let mut hasher = Sha256::new();
    hasher.update([record_type, key_byte]);
    hasher.update(SCRAMBLE_SALT);
    let digest = hasher.finalize();

    let mut key = [0u8; SCRAMBLE_KEY_LEN];
    key.copy_from_slice(&digest[..SCRAMBLE_KEY_LEN]);
    key
}

/// Apply the keystream to a payload in place.
///
/// Payloads shorter than two bytes carry no scrambled data and are left as-is.
pub fn apply_keystream(record_type: u8, payload: &mut [u8]) {
    let Some((key_byte, data)) = payload.split_first_mut() else {
        return;
    };
    let key = record_key(record_type, *key_byte);
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= key[i % SCRAMBLE_KEY_LEN];
    }
}

/// Scramble a canonical payload the way the recording app does.
///
/// Used to build test fixtures and to re-scramble an unscrambled container.
pub fn scramble(record_type: u8, payload: &[u8]) -> Vec<u8> {
    let mut out = payload.to_vec();
    if RecordType::from_u8(record_type).is_scrambled() {
        apply_keystream(record_type, &mut out);
    }
    out
}

/// Reverses payload scrambling for one log file.
///
/// Construct it from the file header ([`Descrambler::for_header`]) so the
/// format version decides whether payloads are scrambled at all, and the
/// unscrambled-copy tag decides whether the keystream is still applied.
/// [`Descrambler::without_keystream`] reads payloads as stored while still
/// dropping key bytes; [`Descrambler::disabled`] treats every payload as a
/// plain record body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descrambler {
    /// Scrambled-type payloads start with a key byte.
    keyed: bool,
    /// The keystream is still applied to those payloads.
    scrambled: bool,
}

impl Descrambler {
    /// Descrambler for logs at `format_version`.
    pub fn for_version(format_version: u32) -> Self {
        let keyed = format_version >= SCRAMBLE_MIN_VERSION;
        Descrambler {
            keyed,
            scrambled: keyed,
        }
    }

    /// Descrambler matching the given header.
    pub fn for_header(header: &FileHeader) -> Self {
        let d = Self::for_version(header.format_version);
        if header.unscrambled_copy {
            d.without_keystream()
        } else {
            d
        }
    }

    /// Descrambler that returns every payload unchanged and whole.
    pub fn disabled() -> Self {
        Descrambler {
            keyed: false,
            scrambled: false,
        }
    }

    /// Same key-byte handling, but payloads are taken as already canonical.
    pub fn without_keystream(self) -> Self {
        Descrambler {
            scrambled: false,
            ..self
        }
    }

    /// True if this descrambler transforms any record type.
    pub fn is_enabled(&self) -> bool {
        self.scrambled
    }

    /// True if scrambled-type payloads carry a leading key byte.
    pub fn is_keyed(&self) -> bool {
        self.keyed
    }

    /// True if payloads of `record_type` are transformed.
    pub fn applies_to(&self, record_type: u8) -> bool {
        self.scrambled && RecordType::from_u8(record_type).is_scrambled()
    }

    /// The part of a canonical payload that holds record fields.
    ///
    /// Drops the key byte from scrambled types in keyed logs.
    ///
    /// ```
    /// use djitxt::txtlog::scramble::Descrambler;
    ///
    /// let d = Descrambler::for_version(12);
    /// assert_eq!(d.record_body(9, b"\x05Landing"), b"Landing");
    /// assert_eq!(d.record_body(57, b"\xFF\xD8"), b"\xFF\xD8");
    /// assert_eq!(Descrambler::for_version(3).record_body(9, b"\x05Landing"), b"\x05Landing");
    /// ```
    pub fn record_body<'a>(&self, record_type: u8, payload: &'a [u8]) -> &'a [u8] {
        if self.keyed && RecordType::from_u8(record_type).is_scrambled() {
            payload.get(1..).unwrap_or_default()
        } else {
            payload
        }
    }

    /// Return the canonical form of `payload`.
    ///
    /// Borrows the input unchanged for types that are not scrambled.
    ///
    /// # Examples
    ///
    /// ```
    /// use djitxt::txtlog::scramble::{scramble, Descrambler};
    ///
    /// let plain = [0x42, 1, 2, 3, 4, 5, 6, 7, 8, 9];
    /// let stored = scramble(1, &plain);
    /// assert_ne!(stored, plain);
    ///
    /// let d = Descrambler::for_version(12);
    /// assert_eq!(d.descramble(1, &stored).as_ref(), &plain);
    ///
    /// // JPEG (57) is stored in the clear
    /// assert_eq!(d.descramble(57, &plain).as_ref(), &plain);
    /// ```
    pub fn descramble<'a>(&self, record_type: u8, payload: &'a [u8]) -> Cow<'a, [u8]> {
        if !self.applies_to(record_type) || payload.len() < 2 {
            return Cow::Borrowed(payload);
        }
        trace!(record_type, len = payload.len(), "descrambling payload");
        let mut out = payload.to_vec();
        apply_keystream(record_type, &mut out);
        Cow::Owned(out)
    }

    /// Descramble `payload` in place. Returns true if it was transformed.
    pub fn descramble_in_place(&self, record_type: u8, payload: &mut [u8]) -> bool {
        if !self.applies_to(record_type) || payload.len() < 2 {
            return false;
        }
        apply_keystream(record_type, payload);
        true
    }
}
