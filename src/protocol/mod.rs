//! Driver station wire protocol
//!
//! This module is the pure codec layer: packet structs, bit-packed code
//! helpers and the [`Protocol`] capability trait the engine is written
//! against. Nothing here touches sockets, clocks or shared state.
//!
//! ## Modules
//!
//! - `constants`: wire bytes, default ports/intervals, joystick limits
//! - `types`: control mode / alliance / station enums, joystick and date types
//! - `codec`: sub-encodings (voltage, axis bytes, codes, TLV blocks)
//! - `packets`: the four packet kinds and their builders/readers

pub mod codec;
pub mod constants;
pub mod packets;
pub mod types;

pub use packets::{
    ClientToFmsPacket, ClientToRobotPacket, FmsToClientPacket, RobotToClientPacket,
};
pub use types::{Alliance, ControlMode, DateStamp, JoystickData, Station};

use constants::{MAX_JOYSTICKS, MAX_VOLTAGE};

/// Capability interface for one wire-format version
///
/// The engine is written against this trait rather than a concrete format so
/// a future protocol revision slots in without touching the role loops. One
/// fixed format is modeled today ([`Frc2016`]); there is no on-the-wire
/// version negotiation.
pub trait Protocol: Send + Sync {
    /// Human-readable protocol name
    fn name(&self) -> &'static str;

    /// Default robot address derived from the team number
    fn default_robot_address(&self, team_number: u16) -> String;

    /// Default FMS address; `None` means "wait for the FMS to contact us"
    fn default_fms_address(&self) -> Option<String> {
        None
    }

    /// Maximum number of joysticks carried per packet
    fn max_joysticks(&self) -> usize;

    /// Maximum battery voltage representable on the wire
    fn max_voltage(&self) -> f64;

    fn make_client_to_fms_packet(&self, pkt: &ClientToFmsPacket) -> Vec<u8>;
    fn make_fms_to_client_packet(&self, pkt: &FmsToClientPacket) -> Vec<u8>;
    fn make_client_to_robot_packet(&self, pkt: &ClientToRobotPacket) -> Vec<u8>;
    fn make_robot_to_client_packet(&self, pkt: &RobotToClientPacket) -> Vec<u8>;

    fn read_client_to_fms_packet(&self, data: &[u8]) -> Option<ClientToFmsPacket>;
    fn read_fms_to_client_packet(&self, data: &[u8]) -> Option<FmsToClientPacket>;
    fn read_client_to_robot_packet(&self, data: &[u8]) -> Option<ClientToRobotPacket>;
    fn read_robot_to_client_packet(&self, data: &[u8]) -> Option<RobotToClientPacket>;
}

/// The 2016 driver station wire format
#[derive(Debug, Clone, Copy, Default)]
pub struct Frc2016;

impl Protocol for Frc2016 {
    fn name(&self) -> &'static str {
        "FRC 2016"
    }

    fn default_robot_address(&self, team_number: u16) -> String {
        format!("roboRIO-{}-frc.local", team_number)
    }

    fn max_joysticks(&self) -> usize {
        MAX_JOYSTICKS
    }

    fn max_voltage(&self) -> f64 {
        MAX_VOLTAGE
    }

    fn make_client_to_fms_packet(&self, pkt: &ClientToFmsPacket) -> Vec<u8> {
        packets::make_client_to_fms_packet(pkt)
    }

    fn make_fms_to_client_packet(&self, pkt: &FmsToClientPacket) -> Vec<u8> {
        packets::make_fms_to_client_packet(pkt)
    }

    fn make_client_to_robot_packet(&self, pkt: &ClientToRobotPacket) -> Vec<u8> {
        packets::make_client_to_robot_packet(pkt)
    }

    fn make_robot_to_client_packet(&self, pkt: &RobotToClientPacket) -> Vec<u8> {
        packets::make_robot_to_client_packet(pkt)
    }

    fn read_client_to_fms_packet(&self, data: &[u8]) -> Option<ClientToFmsPacket> {
        packets::read_client_to_fms_packet(data)
    }

    fn read_fms_to_client_packet(&self, data: &[u8]) -> Option<FmsToClientPacket> {
        packets::read_fms_to_client_packet(data)
    }

    fn read_client_to_robot_packet(&self, data: &[u8]) -> Option<ClientToRobotPacket> {
        packets::read_client_to_robot_packet(data)
    }

    fn read_robot_to_client_packet(&self, data: &[u8]) -> Option<RobotToClientPacket> {
        packets::read_robot_to_client_packet(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_robot_address() {
        let proto = Frc2016;
        assert_eq!(proto.default_robot_address(1234), "roboRIO-1234-frc.local");
        assert!(proto.default_fms_address().is_none());
    }
}
