//! Display panel status lines.
//!
//! One value per line, `key="value"\r\n`, where the key addresses a text
//! widget on the panel (`page.widget.txt`). Bare feedback codes such as
//! `a=5` use the unquoted [`code`] form.

use core::fmt::{self, Write};

/// Longest line the panel accepts.
pub const MAX_LINE: usize = 64;

pub type StatusLine = heapless::String<MAX_LINE>;

// ---------------------------------------------------------------------------
// Widget keys
// ---------------------------------------------------------------------------

/// Humidity on the screensaver page.
pub const SAVER_HUMIDITY: &str = "saver.t2.txt";
/// Temperature on the screensaver page.
pub const SAVER_TEMPERATURE: &str = "saver.t1.txt";
/// Temperature on the main page.
pub const MAIN_TEMPERATURE: &str = "main.t1.txt";
/// Smoke ppm on the screensaver page.
pub const SAVER_SMOKE: &str = "saver.t3.txt";
/// Smoke ppm on the main page.
pub const MAIN_SMOKE: &str = "main.t2.txt";

// ---------------------------------------------------------------------------
// Feedback codes
// ---------------------------------------------------------------------------

pub const LAMP_ON: u8 = 1;
pub const LAMP_OFF: u8 = 2;
pub const FAN_ON: u8 = 5;
pub const FAN_OFF: u8 = 6;

/// `key="value"\r\n`. Returns `None` if the line would not fit.
pub fn field(key: &str, value: impl fmt::Display) -> Option<StatusLine> {
    let mut line = StatusLine::new();
    write!(line, "{key}=\"{value}\"\r\n").ok()?;
    Some(line)
}

/// `a=<n>\r\n` feedback code.
pub fn code(n: u8) -> StatusLine {
    let mut line = StatusLine::new();
    // "a=" + at most three digits + CRLF always fits.
    let _ = write!(line, "a={n}\r\n");
    line
}
