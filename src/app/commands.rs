//! Commands that arrive as byte-stream frames.
//!
//! | b1 | b2 | b3 | Command                  |
//! |----|----|----|--------------------------|
//! | 01 | 01 | 01 | lamp on                  |
//! | 01 | 01 | 02 | lamp off                 |
//! | 01 | 02 | 01 | fan on (default level)   |
//! | 01 | 02 | 02 | fan off                  |

use crate::protocol::frame::Frame;

const GROUP_DEVICE: u8 = 0x01;
const TARGET_LAMP: u8 = 0x01;
const TARGET_FAN: u8 = 0x02;
const ACTION_ON: u8 = 0x01;
const ACTION_OFF: u8 = 0x02;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceCommand {
    LampOn,
    LampOff,
    FanOn,
    FanOff,
}

impl DeviceCommand {
    /// `None` for any payload outside the table.
    pub fn from_frame(frame: &Frame) -> Option<Self> {
        match frame.payload {
            [GROUP_DEVICE, TARGET_LAMP, ACTION_ON] => Some(Self::LampOn),
            [GROUP_DEVICE, TARGET_LAMP, ACTION_OFF] => Some(Self::LampOff),
            [GROUP_DEVICE, TARGET_FAN, ACTION_ON] => Some(Self::FanOn),
            [GROUP_DEVICE, TARGET_FAN, ACTION_OFF] => Some(Self::FanOff),
            _ => None,
        }
    }
}

/// Executes decoded commands. Implemented by the application service.
pub trait CommandRouter: Send + Sync {
    /// `true` when the command was applied.
    fn route(&self, cmd: DeviceCommand) -> bool;
}
