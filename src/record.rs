//! Wire encoding for outgoing records.
//!
//! Collectors consuming CEF or JSON expect the bare payload, so no syslog
//! `<PRI>` token is prepended. Each record is terminated by exactly one
//! newline.

/// Encode a formatted record as UTF-8 with a single trailing `\n`.
///
/// A record that already ends in a newline is passed through unchanged.
pub fn encode_record(record: &str) -> Vec<u8> {
    let mut buf = Vec::with_capacity(record.len() + 1);
    buf.extend_from_slice(record.as_bytes());
    if !record.ends_with('\n') {
        buf.push(b'\n');
    }
    buf
}
