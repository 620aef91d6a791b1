//! Shared session state with change notification
//!
//! One [`SessionState`] exists per active protocol role and is mutated only
//! by the engine thread that owns it (the facades post commands rather than
//! writing directly). Every setter emits a [`DsEvent`] on an actual value
//! change and stays silent when the value is unchanged, so subscribers can
//! treat the event stream as an edge-triggered view of the session.
//!
//! Two invariants are centralized here rather than trusted to callers:
//!
//! - The robot can only be enabled while not emergency stopped; raising the
//!   e-stop forces `robot_enabled` to `false` (never the reverse).
//! - A `robot_communications` toggle also republishes the derived status
//!   string, which is computed from comms/code/mode/enabled.

use crossbeam_channel::Sender;

use crate::protocol::types::{Alliance, ControlMode, JoystickData, Station};

/// Typed change notifications emitted by [`SessionState`] setters
#[derive(Debug, Clone, PartialEq)]
pub enum DsEvent {
    TeamNumberChanged(u16),
    ControlModeChanged(ControlMode),
    RobotEnabledChanged(bool),
    EmergencyStoppedChanged(bool),
    RobotCodeChanged(bool),
    RobotVoltageChanged(f64),
    RobotCommunicationsChanged(bool),
    FmsCommunicationsChanged(bool),
    AllianceChanged(Alliance),
    StationChanged(Station),
    StatusStringChanged(String),
    ShouldRebootChanged(bool),
    ShouldRestartCodeChanged(bool),
    /// Joystick set replaced; payload is the new device count
    JoysticksUpdated(usize),
}

/// Mutable record of control/telemetry/addressing fields for one role
pub struct SessionState {
    team_number: u16,
    control_mode: ControlMode,
    robot_enabled: bool,
    emergency_stopped: bool,
    robot_code: bool,
    robot_voltage: f64,
    robot_communications: bool,
    fms_communications: bool,
    alliance: Alliance,
    station: Station,
    should_reboot_controller: bool,
    should_restart_code: bool,
    custom_robot_address: Option<String>,
    custom_fms_address: Option<String>,
    joysticks: Vec<JoystickData>,
    events: Sender<DsEvent>,
}

impl SessionState {
    /// Create a fresh session publishing change events into `events`
    pub fn new(events: Sender<DsEvent>) -> Self {
        Self {
            team_number: 0,
            control_mode: ControlMode::Teleoperated,
            robot_enabled: false,
            emergency_stopped: false,
            robot_code: false,
            robot_voltage: 0.0,
            robot_communications: false,
            fms_communications: false,
            alliance: Alliance::Red,
            station: Station::Station1,
            should_reboot_controller: false,
            should_restart_code: false,
            custom_robot_address: None,
            custom_fms_address: None,
            joysticks: Vec::new(),
            events,
        }
    }

    /// Reset control/telemetry fields to defaults without emitting events
    ///
    /// Team number and custom addresses survive so a role restart keeps its
    /// addressing; everything negotiated over the link is dropped.
    pub fn reset(&mut self) {
        self.control_mode = ControlMode::Teleoperated;
        self.robot_enabled = false;
        self.emergency_stopped = false;
        self.robot_code = false;
        self.robot_voltage = 0.0;
        self.robot_communications = false;
        self.fms_communications = false;
        self.alliance = Alliance::Red;
        self.station = Station::Station1;
        self.should_reboot_controller = false;
        self.should_restart_code = false;
        self.joysticks.clear();
    }

    fn emit(&self, event: DsEvent) {
        // Subscriber may be gone; dropped events are fine
        let _ = self.events.send(event);
    }

    // ========================================================================
    // Getters
    // ========================================================================

    pub fn team_number(&self) -> u16 {
        self.team_number
    }

    pub fn control_mode(&self) -> ControlMode {
        self.control_mode
    }

    pub fn robot_enabled(&self) -> bool {
        self.robot_enabled
    }

    pub fn emergency_stopped(&self) -> bool {
        self.emergency_stopped
    }

    pub fn robot_code(&self) -> bool {
        self.robot_code
    }

    pub fn robot_voltage(&self) -> f64 {
        self.robot_voltage
    }

    pub fn robot_communications(&self) -> bool {
        self.robot_communications
    }

    pub fn fms_communications(&self) -> bool {
        self.fms_communications
    }

    pub fn alliance(&self) -> Alliance {
        self.alliance
    }

    pub fn station(&self) -> Station {
        self.station
    }

    pub fn should_reboot_controller(&self) -> bool {
        self.should_reboot_controller
    }

    pub fn should_restart_code(&self) -> bool {
        self.should_restart_code
    }

    pub fn custom_robot_address(&self) -> Option<&str> {
        self.custom_robot_address.as_deref()
    }

    pub fn custom_fms_address(&self) -> Option<&str> {
        self.custom_fms_address.as_deref()
    }

    pub fn joysticks(&self) -> &[JoystickData] {
        &self.joysticks
    }

    /// Whether the robot could be safely enabled right now: communications
    /// present, user code running, and not emergency stopped
    pub fn can_be_enabled(&self) -> bool {
        self.robot_communications && self.robot_code && !self.emergency_stopped
    }

    /// Derived one-line status shown by console frontends
    pub fn status_string(&self) -> String {
        if !self.robot_communications {
            return "No Robot Communications".to_string();
        }
        if !self.robot_code {
            return "No Robot Code".to_string();
        }
        let mode = match self.control_mode {
            ControlMode::Teleoperated => "Teleoperated",
            ControlMode::Autonomous => "Autonomous",
            ControlMode::Test => "Test",
        };
        let enabled = if self.robot_enabled {
            "Enabled"
        } else {
            "Disabled"
        };
        format!("{} {}", mode, enabled)
    }

    // ========================================================================
    // Setters (change-notification invariant lives here)
    // ========================================================================

    pub fn set_team_number(&mut self, team: u16) {
        if team != self.team_number {
            self.team_number = team;
            self.emit(DsEvent::TeamNumberChanged(team));
        }
    }

    /// Team number write that skips the event stream; used for local console
    /// writes so the facade's own input is not echoed back to it
    pub fn set_team_number_local(&mut self, team: u16) {
        self.team_number = team;
    }

    pub fn set_control_mode(&mut self, mode: ControlMode) {
        if mode != self.control_mode {
            self.control_mode = mode;
            self.emit(DsEvent::ControlModeChanged(mode));
        }
    }

    /// Enable request; silently clamped to `false` while emergency stopped
    pub fn set_robot_enabled(&mut self, enabled: bool) {
        let enabled = enabled && !self.emergency_stopped;
        if enabled != self.robot_enabled {
            self.robot_enabled = enabled;
            self.emit(DsEvent::RobotEnabledChanged(enabled));
        }
    }

    /// Raising the e-stop also forces the robot disabled; clearing it never
    /// re-enables on its own
    pub fn set_emergency_stopped(&mut self, stopped: bool) {
        if stopped != self.emergency_stopped {
            self.emergency_stopped = stopped;
            self.emit(DsEvent::EmergencyStoppedChanged(stopped));
            if stopped && self.robot_enabled {
                self.robot_enabled = false;
                self.emit(DsEvent::RobotEnabledChanged(false));
            }
        }
    }

    pub fn set_robot_code(&mut self, code: bool) {
        if code != self.robot_code {
            self.robot_code = code;
            self.emit(DsEvent::RobotCodeChanged(code));
        }
    }

    pub fn set_robot_voltage(&mut self, voltage: f64) {
        if voltage != self.robot_voltage {
            self.robot_voltage = voltage;
            self.emit(DsEvent::RobotVoltageChanged(voltage));
        }
    }

    /// Comms transitions additionally republish the derived status string
    pub fn set_robot_communications(&mut self, comms: bool) {
        if comms != self.robot_communications {
            self.robot_communications = comms;
            self.emit(DsEvent::RobotCommunicationsChanged(comms));
            self.emit(DsEvent::StatusStringChanged(self.status_string()));
        }
    }

    pub fn set_fms_communications(&mut self, comms: bool) {
        if comms != self.fms_communications {
            self.fms_communications = comms;
            self.emit(DsEvent::FmsCommunicationsChanged(comms));
        }
    }

    pub fn set_alliance(&mut self, alliance: Alliance) {
        if alliance != self.alliance {
            self.alliance = alliance;
            self.emit(DsEvent::AllianceChanged(alliance));
        }
    }

    pub fn set_station(&mut self, station: Station) {
        if station != self.station {
            self.station = station;
            self.emit(DsEvent::StationChanged(station));
        }
    }

    pub fn set_should_reboot_controller(&mut self, reboot: bool) {
        if reboot != self.should_reboot_controller {
            self.should_reboot_controller = reboot;
            self.emit(DsEvent::ShouldRebootChanged(reboot));
        }
    }

    pub fn set_should_restart_code(&mut self, restart: bool) {
        if restart != self.should_restart_code {
            self.should_restart_code = restart;
            self.emit(DsEvent::ShouldRestartCodeChanged(restart));
        }
    }

    pub fn set_custom_robot_address(&mut self, address: Option<String>) {
        self.custom_robot_address = address;
    }

    pub fn set_custom_fms_address(&mut self, address: Option<String>) {
        self.custom_fms_address = address;
    }

    pub fn set_joysticks(&mut self, joysticks: Vec<JoystickData>) {
        if joysticks != self.joysticks {
            let count = joysticks.len();
            self.joysticks = joysticks;
            self.emit(DsEvent::JoysticksUpdated(count));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::unbounded;

    fn session() -> (SessionState, crossbeam_channel::Receiver<DsEvent>) {
        let (tx, rx) = unbounded();
        (SessionState::new(tx), rx)
    }

    fn drain(rx: &crossbeam_channel::Receiver<DsEvent>) -> Vec<DsEvent> {
        rx.try_iter().collect()
    }

    #[test]
    fn test_setters_emit_on_change_only() {
        let (mut s, rx) = session();

        s.set_robot_code(true);
        s.set_robot_code(true);
        assert_eq!(drain(&rx), vec![DsEvent::RobotCodeChanged(true)]);

        s.set_robot_voltage(12.5);
        s.set_robot_voltage(12.5);
        assert_eq!(drain(&rx), vec![DsEvent::RobotVoltageChanged(12.5)]);
    }

    #[test]
    fn test_estop_forces_disable_exactly_two_events() {
        let (mut s, rx) = session();
        s.set_robot_enabled(true);
        assert_eq!(drain(&rx), vec![DsEvent::RobotEnabledChanged(true)]);

        s.set_emergency_stopped(true);
        assert!(!s.robot_enabled());
        assert_eq!(
            drain(&rx),
            vec![
                DsEvent::EmergencyStoppedChanged(true),
                DsEvent::RobotEnabledChanged(false),
            ]
        );
    }

    #[test]
    fn test_enable_rejected_while_estopped() {
        let (mut s, rx) = session();
        s.set_emergency_stopped(true);
        drain(&rx);

        s.set_robot_enabled(true);
        assert!(!s.robot_enabled());
        assert!(drain(&rx).is_empty());

        // Clearing the e-stop does not re-enable on its own
        s.set_emergency_stopped(false);
        assert!(!s.robot_enabled());
        assert_eq!(drain(&rx), vec![DsEvent::EmergencyStoppedChanged(false)]);
    }

    #[test]
    fn test_comms_toggle_republishes_status_string() {
        let (mut s, rx) = session();
        s.set_robot_communications(true);
        assert_eq!(
            drain(&rx),
            vec![
                DsEvent::RobotCommunicationsChanged(true),
                DsEvent::StatusStringChanged("No Robot Code".to_string()),
            ]
        );

        s.set_robot_communications(false);
        assert_eq!(
            drain(&rx),
            vec![
                DsEvent::RobotCommunicationsChanged(false),
                DsEvent::StatusStringChanged("No Robot Communications".to_string()),
            ]
        );
    }

    #[test]
    fn test_status_string() {
        let (mut s, _rx) = session();
        assert_eq!(s.status_string(), "No Robot Communications");

        s.set_robot_communications(true);
        assert_eq!(s.status_string(), "No Robot Code");

        s.set_robot_code(true);
        assert_eq!(s.status_string(), "Teleoperated Disabled");

        s.set_robot_enabled(true);
        s.set_control_mode(ControlMode::Autonomous);
        assert_eq!(s.status_string(), "Autonomous Enabled");
    }

    #[test]
    fn test_can_be_enabled() {
        let (mut s, _rx) = session();
        assert!(!s.can_be_enabled());

        s.set_robot_communications(true);
        s.set_robot_code(true);
        assert!(s.can_be_enabled());

        s.set_emergency_stopped(true);
        assert!(!s.can_be_enabled());
    }

    #[test]
    fn test_local_team_number_is_silent() {
        let (mut s, rx) = session();
        s.set_team_number_local(1234);
        assert_eq!(s.team_number(), 1234);
        assert!(drain(&rx).is_empty());

        s.set_team_number(5678);
        assert_eq!(drain(&rx), vec![DsEvent::TeamNumberChanged(5678)]);
    }

    #[test]
    fn test_reset_preserves_addressing() {
        let (mut s, rx) = session();
        s.set_team_number_local(1234);
        s.set_custom_robot_address(Some("10.12.34.2".to_string()));
        s.set_robot_communications(true);
        s.set_robot_voltage(12.0);
        drain(&rx);

        s.reset();
        assert_eq!(s.team_number(), 1234);
        assert_eq!(s.custom_robot_address(), Some("10.12.34.2"));
        assert!(!s.robot_communications());
        assert_eq!(s.robot_voltage(), 0.0);
        assert!(drain(&rx).is_empty());
    }
}
