//! Hex formatting for offsets and record payloads.
//!
//! Payloads are shown either as a compact hex string (JSON output, one-line
//! previews) or as a traditional dump with offset column and ASCII sidebar.

/// Format a file offset as "decimal (0xhex)".
pub fn format_offset(offset: usize) -> String {
    format!("{} (0x{:x})", offset, offset)
}

/// Format bytes as a compact hex string (e.g., "4a2f00ff").
pub fn format_bytes(data: &[u8]) -> String {
    data.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Compact hex of at most `max` bytes, with a byte count suffix when cut.
pub fn format_preview(data: &[u8], max: usize) -> String {
    if data.len() <= max {
        return format_bytes(data);
    }
    format!("{}.. ({} bytes)", format_bytes(&data[..max]), data.len())
}

/// Hex dump of `data`, 16 bytes per line, addressed from `base_offset`.
///
/// ```
/// use djitxt::util::hex::hex_dump;
///
/// assert_eq!(
///     hex_dump(b"\xff\x09\x04Hi!\0", 0x67),
///     "00000067  ff 09 04 48 69 21 00                              |...Hi!.         |"
/// );
/// ```
pub fn hex_dump(data: &[u8], base_offset: usize) -> String {
    let mut lines = Vec::with_capacity(data.len().div_ceil(16));

    for (i, chunk) in data.chunks(16).enumerate() {
        let mut line = format!("{:08x}  ", base_offset + i * 16);

        for j in 0..16 {
            if j == 8 {
                line.push(' ');
            }
            match chunk.get(j) {
                Some(b) => line.push_str(&format!("{:02x} ", b)),
                None => line.push_str("   "),
            }
        }

        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        line.push_str(&format!(" |{:<16}|", ascii));

        lines.push(line);
    }

    lines.join("\n")
}
