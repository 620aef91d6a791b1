//! SetuLink - UDP driver station protocol stack
//!
//! This library implements the real-time control link between a driver
//! console ("client"), a robot controller, and an optional field management
//! server (FMS): a byte-exact packet codec, per-link watchdog liveness
//! detection, and one protocol engine per role driving periodic sends over
//! UDP.
//!
//! ## Features
//!
//! - `mock`: Expose `MockTransport` for hardware-free testing

pub mod config;
pub mod engine;
pub mod error;
pub mod protocol;
pub mod session;
pub mod transport;
pub mod watchdog;

mod client;
mod fms;
mod robot;

// Re-export commonly used types
pub use client::DsClient;
pub use config::LinkConfig;
pub use engine::{DsEngine, EngineState, MatchInfo};
pub use error::{Error, Result};
pub use fms::DsFms;
pub use protocol::types::{Alliance, ControlMode, DateStamp, JoystickData, Station};
pub use robot::DsRobot;
pub use session::{DsEvent, SessionState};
