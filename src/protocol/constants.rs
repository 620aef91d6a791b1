//! Wire-format constants for the 2016 driver station protocol
//!
//! All multi-byte integers on the wire are big-endian. Control, request and
//! station codes are single bit-packed bytes; extended data uses
//! `[size] [tag] [payload]` blocks where `size` counts every byte after the
//! size byte itself.

// ============================================================================
// Control code bits
// ============================================================================

/// Test mode bit
pub const MODE_TEST: u8 = 0x01;
/// Autonomous mode bit
pub const MODE_AUTONOMOUS: u8 = 0x02;
/// Teleoperated mode (zero/default when neither mode bit is set)
pub const MODE_TELEOPERATED: u8 = 0x00;
/// Robot enabled bit
pub const MODE_ENABLED: u8 = 0x04;
/// FMS attached bit (robot-bound control codes only)
pub const MODE_FMS_ATTACHED: u8 = 0x08;
/// Emergency stop bit
pub const MODE_EMERGENCY_STOP: u8 = 0x80;

/// Robot control code bit reporting that user code is running (robot->client)
pub const ROBOT_HAS_CODE: u8 = 0x20;

// ============================================================================
// FMS control code extras
// ============================================================================

/// Robot ping flag (FMS-bound, set together with [`FMS_ROBOT_COMMS`])
pub const FMS_ROBOT_PING: u8 = 0x08;
/// Robot communications present flag (FMS-bound)
pub const FMS_ROBOT_COMMS: u8 = 0x20;

// ============================================================================
// Request codes
// ============================================================================

/// No robot communications established
pub const REQUEST_UNCONNECTED: u8 = 0x00;
/// Restart the user code on the controller
pub const REQUEST_RESTART_CODE: u8 = 0x04;
/// Reboot the robot controller (takes priority over a code restart)
pub const REQUEST_REBOOT: u8 = 0x08;
/// Normal operation
pub const REQUEST_NORMAL: u8 = 0x80;

/// Robot->client request bit asking the client for a date/timezone block
pub const REQUEST_TIME: u8 = 0x01;

// ============================================================================
// Extended data tags
// ============================================================================

/// General packet tag (client->robot header byte 2)
pub const TAG_GENERAL: u8 = 0x01;
/// Joystick data block
pub const TAG_JOYSTICK: u8 = 0x0C;
/// Date/time block
pub const TAG_DATE: u8 = 0x0F;
/// Timezone abbreviation block
pub const TAG_TIMEZONE: u8 = 0x10;

// ============================================================================
// Station codes ({Red,Blue} x {1,2,3})
// ============================================================================

pub const STATION_RED_1: u8 = 0x00;
pub const STATION_RED_2: u8 = 0x01;
pub const STATION_RED_3: u8 = 0x02;
pub const STATION_BLUE_1: u8 = 0x03;
pub const STATION_BLUE_2: u8 = 0x04;
pub const STATION_BLUE_3: u8 = 0x05;

// ============================================================================
// Fixed header minimums (bytes); shorter buffers are discarded
// ============================================================================

pub const CLIENT_TO_FMS_MIN_SIZE: usize = 8;
pub const FMS_TO_CLIENT_MIN_SIZE: usize = 22;
pub const CLIENT_TO_ROBOT_MIN_SIZE: usize = 6;
pub const ROBOT_TO_CLIENT_MIN_SIZE: usize = 7;

/// Wire size of the date record inside a date block
pub const DATE_RECORD_SIZE: usize = 10;

// ============================================================================
// Default ports (fixed by protocol version)
// ============================================================================

pub const DEFAULT_CLIENT_TO_FMS_PORT: u16 = 1160;
pub const DEFAULT_FMS_TO_CLIENT_PORT: u16 = 1120;
pub const DEFAULT_CLIENT_TO_ROBOT_PORT: u16 = 1110;
pub const DEFAULT_ROBOT_TO_CLIENT_PORT: u16 = 1150;

// ============================================================================
// Default cadences
// ============================================================================

/// Client->robot send interval in milliseconds
pub const DEFAULT_ROBOT_SEND_INTERVAL_MS: u64 = 20;
/// Client->FMS send interval in milliseconds
pub const DEFAULT_FMS_SEND_INTERVAL_MS: u64 = 500;
/// Per-link watchdog timeout in milliseconds
pub const DEFAULT_WATCHDOG_TIMEOUT_MS: u64 = 500;

/// Joystick data is appended only after this many packets have been sent
/// since (re)connection; earlier packets establish identity/time first.
pub const JOYSTICK_WARMUP_PACKETS: u16 = 5;

// ============================================================================
// Joystick limits
// ============================================================================

pub const MAX_JOYSTICKS: usize = 6;
pub const MAX_JOYSTICK_AXES: usize = 6;
pub const MAX_JOYSTICK_BUTTONS: usize = 10;
pub const MAX_JOYSTICK_HATS: usize = 1;

/// Maximum battery voltage representable by the split-byte encoding
pub const MAX_VOLTAGE: f64 = 13.0;
