//! Shared utilities (hex formatting for payloads, log subscriber setup).

pub mod hex;
#[cfg(feature = "cli")]
pub mod logging;
