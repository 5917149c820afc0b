//! Fuzz target: `frame::decode` and `frame::decode_hex`
//!
//! Drives arbitrary byte sequences into the panel frame decoder and
//! asserts that it never panics, accepts exactly the structurally valid
//! prefixes, and that the acknowledgement line always fits.
//!
//! cargo fuzz run fuzz_frame_decoder

#![no_main]

use libfuzzer_sys::fuzz_target;
use roomhub::protocol::frame::{self, FRAME_LEN};

fuzz_target!(|data: &[u8]| {
    let decoded = frame::decode(data);
    let valid = data.len() >= FRAME_LEN
        && data[0] == frame::FRAME_HEADER
        && data[4..FRAME_LEN].iter().all(|b| *b == frame::FRAME_TAIL);
    assert_eq!(decoded.is_some(), valid);

    if let Some(f) = decoded {
        assert_eq!(f.payload, [data[1], data[2], data[3]]);
        assert_eq!(frame::decode(&f.to_bytes()), Some(f));
        assert!(frame::ack_line(&f).ends_with("\r\n"));
    }

    if let Ok(text) = core::str::from_utf8(data) {
        let _ = frame::decode_hex(text);
    }
});
