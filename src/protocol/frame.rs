//! Fixed-length command frame codec.
//!
//! Wire format:
//! ```text
//! ┌────────┬────────┬────────┬────────┬──────┬──────┬──────┐
//! │ 0x65   │ b1     │ b2     │ b3     │ 0xFF │ 0xFF │ 0xFF │
//! │ header │ target │ target │ cmd    │ tail                │
//! └────────┴────────┴────────┴────────┴──────┴──────┴──────┘
//! ```
//!
//! Decoding is stateless: only the first [`FRAME_LEN`] bytes of a buffer
//! are inspected and anything after them is ignored. There is no
//! resynchronisation, so a frame split across two reads is lost.
//!
//! The format carries no checksum and no escaping. A payload that happens
//! to contain `0x65 .. 0xFF 0xFF 0xFF` at the start of a read is accepted
//! as a frame. This is a known gap in the panel protocol and is kept as-is
//! for compatibility with the display firmware.

use core::fmt::Write;

/// First byte of every frame.
pub const FRAME_HEADER: u8 = 0x65;

/// Value of each of the three trailing bytes.
pub const FRAME_TAIL: u8 = 0xFF;

/// Total frame length on the wire.
pub const FRAME_LEN: usize = 7;

const TAIL_LEN: usize = 3;

/// A structurally valid frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub payload: [u8; 3],
}

impl Frame {
    pub const fn new(b1: u8, b2: u8, b3: u8) -> Self {
        Self {
            payload: [b1, b2, b3],
        }
    }

    /// Encode back to the 7-byte wire form.
    pub fn to_bytes(&self) -> [u8; FRAME_LEN] {
        let [b1, b2, b3] = self.payload;
        [FRAME_HEADER, b1, b2, b3, FRAME_TAIL, FRAME_TAIL, FRAME_TAIL]
    }
}

/// Decode a frame from the start of `bytes`.
///
/// Returns `None` when fewer than [`FRAME_LEN`] bytes are present, the
/// header is wrong, or any tail byte is wrong.
pub fn decode(bytes: &[u8]) -> Option<Frame> {
    let raw = bytes.get(..FRAME_LEN)?;
    if raw[0] != FRAME_HEADER {
        return None;
    }
    if raw[FRAME_LEN - TAIL_LEN..].iter().any(|&b| b != FRAME_TAIL) {
        return None;
    }
    Some(Frame::new(raw[1], raw[2], raw[3]))
}

/// Decode a frame given as a hex string such as `"65010201FFFFFF"`.
///
/// Every pair of characters must be a complete hex byte; an odd-length
/// string or a non-hex pair fails.
pub fn decode_hex(hex: &str) -> Option<Frame> {
    if hex.len() % 2 != 0 {
        return None;
    }
    let mut buf: heapless::Vec<u8, FRAME_LEN> = heapless::Vec::new();
    for pair in hex.as_bytes().chunks_exact(2) {
        // from_str_radix alone would take a leading '+'.
        if !pair.iter().all(u8::is_ascii_hexdigit) {
            return None;
        }
        let text = core::str::from_utf8(pair).ok()?;
        let byte = u8::from_str_radix(text, 16).ok()?;
        // Bytes past the frame are validated but not kept; decode only
        // looks at the first FRAME_LEN anyway.
        let _ = buf.push(byte);
    }
    decode(&buf)
}

/// Acknowledgement line written back after a successful decode:
/// `PARSED:<b1><b2><b3>\r\n` in upper-case hex.
pub fn ack_line(frame: &Frame) -> heapless::String<20> {
    let mut line = heapless::String::new();
    let [b1, b2, b3] = frame.payload;
    // 7 + 6 + 2 bytes always fits.
    let _ = write!(line, "PARSED:{b1:02X}{b2:02X}{b3:02X}\r\n");
    line
}
