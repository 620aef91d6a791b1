//! Pure sub-encodings shared by the four packet kinds
//!
//! Everything in this module is a stateless transform: byte outputs are
//! reproducible from the inputs alone. Clock reads happen at the engine
//! layer; a [`DateStamp`] arrives here as plain data.
//!
//! Numeric quirks preserved from the wire format:
//! - Battery voltage is split into an integer byte and a hundredths byte.
//! - Joystick axes use an asymmetric signed byte scale: positive bytes map
//!   through /127, negative bytes through /128.

use super::constants::*;
use super::types::{Alliance, ControlMode, DateStamp, JoystickData, Station};

// ============================================================================
// Voltage
// ============================================================================

/// Split a voltage into `(integer, hundredths)` bytes
///
/// The fractional part is rounded; a fraction that rounds to 100 carries into
/// the integer byte, so 12.999 encodes as `(13, 0)` rather than overflowing
/// the hundredths byte.
pub fn encode_voltage(voltage: f64) -> (u8, u8) {
    let v = voltage.max(0.0);
    let mut upper = v.floor() as u32;
    let mut lower = ((v - v.floor()) * 100.0).round() as u32;
    if lower >= 100 {
        upper += 1;
        lower = 0;
    }
    ((upper & 0xFF) as u8, lower as u8)
}

/// Reassemble a voltage from its `(integer, hundredths)` bytes
pub fn decode_voltage(upper: u8, lower: u8) -> f64 {
    upper as f64 + lower as f64 / 100.0
}

// ============================================================================
// Joystick axis scaling
// ============================================================================

/// Scale a ratio `value / max` onto a signed byte
///
/// `[0, max]` maps linearly onto `[0, 127]`. Negative values scale through
/// the same formula (floored), so -0.2 at max 1.0 becomes -26. Zero, a
/// non-positive `max`, and values above `max` all map to 0. Values below
/// `-max` saturate at -128, which decodes back to exactly -1.0.
pub fn float_to_byte(value: f64, max: f64) -> i8 {
    if value == 0.0 || max <= 0.0 || value > max {
        return 0;
    }
    ((value / max) * 127.0).floor() as i8
}

/// Invert [`float_to_byte`]
///
/// The negative range divides by 128 rather than 127, matching the
/// twos-complement byte range. This asymmetry is part of the wire format.
pub fn byte_to_float(byte: i8) -> f64 {
    if byte == 0 {
        0.0
    } else if byte < 0 {
        byte as f64 / 128.0
    } else {
        byte as f64 / 127.0
    }
}

// ============================================================================
// Control codes
// ============================================================================

fn mode_bits(mode: ControlMode) -> u8 {
    match mode {
        ControlMode::Test => MODE_TEST,
        ControlMode::Autonomous => MODE_AUTONOMOUS,
        ControlMode::Teleoperated => MODE_TELEOPERATED,
    }
}

/// Mode resolution precedence: Test > Autonomous > Teleoperated
fn mode_from_bits(code: u8) -> ControlMode {
    if code & MODE_TEST != 0 {
        ControlMode::Test
    } else if code & MODE_AUTONOMOUS != 0 {
        ControlMode::Autonomous
    } else {
        ControlMode::Teleoperated
    }
}

/// Build the control code carried on FMS-bound and FMS-originated packets
pub fn make_fms_control_code(
    mode: ControlMode,
    emergency_stopped: bool,
    robot_enabled: bool,
    robot_communications: bool,
) -> u8 {
    let mut code = mode_bits(mode);
    if emergency_stopped {
        code |= MODE_EMERGENCY_STOP;
    }
    if robot_enabled {
        code |= MODE_ENABLED;
    }
    if robot_communications {
        code |= FMS_ROBOT_COMMS | FMS_ROBOT_PING;
    }
    code
}

/// Parse an FMS control code into
/// `(mode, emergency_stopped, robot_enabled, robot_communications)`
///
/// Robot communications require both the comms and ping bits.
pub fn parse_fms_control_code(code: u8) -> (ControlMode, bool, bool, bool) {
    (
        mode_from_bits(code),
        code & MODE_EMERGENCY_STOP != 0,
        code & MODE_ENABLED != 0,
        code & FMS_ROBOT_COMMS != 0 && code & FMS_ROBOT_PING != 0,
    )
}

/// Build the control code carried on robot-bound and robot-originated packets
pub fn make_robot_control_code(
    mode: ControlMode,
    emergency_stopped: bool,
    robot_enabled: bool,
    fms_communications: bool,
) -> u8 {
    let mut code = mode_bits(mode);
    if fms_communications {
        code |= MODE_FMS_ATTACHED;
    }
    if emergency_stopped {
        code |= MODE_EMERGENCY_STOP;
    }
    if robot_enabled {
        code |= MODE_ENABLED;
    }
    code
}

/// Parse a robot control code into
/// `(mode, emergency_stopped, robot_enabled, fms_communications)`
pub fn parse_robot_control_code(code: u8) -> (ControlMode, bool, bool, bool) {
    (
        mode_from_bits(code),
        code & MODE_EMERGENCY_STOP != 0,
        code & MODE_ENABLED != 0,
        code & MODE_FMS_ATTACHED != 0,
    )
}

// ============================================================================
// Station codes
// ============================================================================

/// Encode an alliance/station assignment as one of six discrete values
pub fn make_station_code(alliance: Alliance, station: Station) -> u8 {
    match (alliance, station) {
        (Alliance::Red, Station::Station1) => STATION_RED_1,
        (Alliance::Red, Station::Station2) => STATION_RED_2,
        (Alliance::Red, Station::Station3) => STATION_RED_3,
        (Alliance::Blue, Station::Station1) => STATION_BLUE_1,
        (Alliance::Blue, Station::Station2) => STATION_BLUE_2,
        (Alliance::Blue, Station::Station3) => STATION_BLUE_3,
    }
}

/// Decode a station code; unrecognized bytes fall back to `(Red, Station1)`
pub fn parse_station_code(code: u8) -> (Alliance, Station) {
    match code {
        STATION_RED_1 => (Alliance::Red, Station::Station1),
        STATION_RED_2 => (Alliance::Red, Station::Station2),
        STATION_RED_3 => (Alliance::Red, Station::Station3),
        STATION_BLUE_1 => (Alliance::Blue, Station::Station1),
        STATION_BLUE_2 => (Alliance::Blue, Station::Station2),
        STATION_BLUE_3 => (Alliance::Blue, Station::Station3),
        _ => (Alliance::Red, Station::Station1),
    }
}

// ============================================================================
// Request codes
// ============================================================================

/// Build the client->robot request code
///
/// Without robot communications the request is always Unconnected. A reboot
/// request takes priority over a code restart when both are pending.
pub fn make_request_code(robot_communications: bool, reboot: bool, restart_code: bool) -> u8 {
    if !robot_communications {
        REQUEST_UNCONNECTED
    } else if reboot {
        REQUEST_REBOOT
    } else if restart_code {
        REQUEST_RESTART_CODE
    } else {
        REQUEST_NORMAL
    }
}

/// Parse a request code into `(reboot, restart_code)`
pub fn parse_request_code(code: u8) -> (bool, bool) {
    (code & REQUEST_REBOOT != 0, code & REQUEST_RESTART_CODE != 0)
}

// ============================================================================
// Date record
// ============================================================================

/// Encode the 10-byte date record: usec u32 BE, then sec, min, hour, day,
/// month (0-based) and year-1900, one byte each
pub fn encode_date(date: &DateStamp) -> [u8; DATE_RECORD_SIZE] {
    let mut buf = [0u8; DATE_RECORD_SIZE];
    buf[..4].copy_from_slice(&date.microseconds.to_be_bytes());
    buf[4] = date.seconds;
    buf[5] = date.minutes;
    buf[6] = date.hours;
    buf[7] = date.day;
    buf[8] = date.month;
    buf[9] = date.year.wrapping_sub(1900) as u8;
    buf
}

/// Parse a 10-byte date record; `None` if the buffer is short
pub fn parse_date(buf: &[u8]) -> Option<DateStamp> {
    if buf.len() < DATE_RECORD_SIZE {
        return None;
    }
    Some(DateStamp {
        microseconds: u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]),
        seconds: buf[4],
        minutes: buf[5],
        hours: buf[6],
        day: buf[7],
        month: buf[8],
        year: buf[9] as u16 + 1900,
    })
}

// ============================================================================
// Extended data blocks
// ============================================================================

/// Size value for a joystick block: every byte after the size byte itself
pub fn joystick_block_size(stick: &JoystickData) -> usize {
    // tag + axis count + axes + button count + flags u16 + hat count + hats
    6 + stick.axes.len() + 2 * stick.hats.len()
}

/// Append one `[size] [0x0C] [...]` joystick block
pub fn write_joystick_block(stick: &JoystickData, out: &mut Vec<u8>) {
    out.push(joystick_block_size(stick) as u8);
    out.push(TAG_JOYSTICK);

    out.push(stick.axes.len() as u8);
    for &axis in &stick.axes {
        out.push(float_to_byte(axis, 1.0) as u8);
    }

    // Button i packs into bit i of a 16-bit flag field, big-endian on the wire
    let mut flags: u16 = 0;
    for (i, &pressed) in stick.buttons.iter().enumerate().take(16) {
        if pressed {
            flags |= 1 << i;
        }
    }
    out.push(stick.buttons.len() as u8);
    out.extend_from_slice(&flags.to_be_bytes());

    out.push(stick.hats.len() as u8);
    for &hat in &stick.hats {
        out.extend_from_slice(&hat.to_be_bytes());
    }
}

/// Parse the body of a joystick block (everything after the tag byte)
///
/// Returns `None` when a declared count runs past the end of the buffer.
pub fn parse_joystick_block(body: &[u8]) -> Option<JoystickData> {
    let axis_count = *body.first()? as usize;
    let mut off = 1;
    if body.len() < off + axis_count {
        return None;
    }
    let axes = body[off..off + axis_count]
        .iter()
        .map(|&b| byte_to_float(b as i8))
        .collect();
    off += axis_count;

    let button_count = *body.get(off)? as usize;
    off += 1;
    if body.len() < off + 2 {
        return None;
    }
    let flags = u16::from_be_bytes([body[off], body[off + 1]]);
    off += 2;
    let buttons = (0..button_count)
        .map(|i| i < 16 && (flags >> i) & 1 == 1)
        .collect();

    let hat_count = *body.get(off)? as usize;
    off += 1;
    if body.len() < off + 2 * hat_count {
        return None;
    }
    let hats = (0..hat_count)
        .map(|i| i16::from_be_bytes([body[off + 2 * i], body[off + 2 * i + 1]]))
        .collect();

    Some(JoystickData {
        axes,
        buttons,
        hats,
    })
}

/// Append the `[0x0B] [0x0F] [date]` block
pub fn write_date_block(date: &DateStamp, out: &mut Vec<u8>) {
    out.push((1 + DATE_RECORD_SIZE) as u8);
    out.push(TAG_DATE);
    out.extend_from_slice(&encode_date(date));
}

/// Append the `[len+1] [0x10] [abbreviation]` timezone block
pub fn write_timezone_block(timezone: &str, out: &mut Vec<u8>) {
    let bytes = timezone.as_bytes();
    out.push((bytes.len() + 1) as u8);
    out.push(TAG_TIMEZONE);
    out.extend_from_slice(bytes);
}
