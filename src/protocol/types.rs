//! Shared protocol data types
//!
//! Key types for protocol consumers:
//! - [`ControlMode`], [`Alliance`], [`Station`]: bit-packed wire enums
//! - [`JoystickData`]: one input device snapshot (axes/buttons/hats)
//! - [`DateStamp`]: the 10-byte wire date record

use serde::{Deserialize, Serialize};

/// Robot operating mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ControlMode {
    /// Per-mechanism test mode
    Test,
    /// Autonomous (no operator input)
    Autonomous,
    /// Operator controlled (protocol default)
    #[default]
    Teleoperated,
}

/// Alliance color assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alliance {
    #[default]
    Red,
    Blue,
}

/// Station position within an alliance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Station {
    #[default]
    Station1,
    Station2,
    Station3,
}

/// Snapshot of one joystick's inputs
///
/// Ordering is significant everywhere: axis index, button index and hat index
/// all map directly to wire positions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JoystickData {
    /// Axis values in [-1.0, 1.0]
    pub axes: Vec<f64>,
    /// Button states, index = button number
    pub buttons: Vec<bool>,
    /// POV hat angles in hundredths of a degree, -1 = centered/none
    pub hats: Vec<i16>,
}

/// The 10-byte wire date record carried in a date block
///
/// `month` is 0-based as it appears on the wire; `year` is the full year
/// (the wire byte stores `year - 1900`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateStamp {
    pub microseconds: u32,
    pub seconds: u8,
    pub minutes: u8,
    pub hours: u8,
    pub day: u8,
    pub month: u8,
    pub year: u16,
}

impl DateStamp {
    /// Capture the current local wall-clock time
    pub fn now() -> Self {
        use chrono::{Datelike, Local, Timelike};

        let now = Local::now();
        Self {
            microseconds: now.timestamp_subsec_micros(),
            seconds: now.second() as u8,
            minutes: now.minute() as u8,
            hours: now.hour() as u8,
            day: now.day() as u8,
            month: now.month0() as u8,
            year: now.year() as u16,
        }
    }
}
