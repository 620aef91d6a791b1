//! Driver console facade
//!
//! Thin property-style surface over a client-mode [`DsEngine`]: writes post
//! commands into the engine worker, reads take a brief lock on session
//! state. Console-originated team number writes are not echoed back on the
//! event stream, so frontends only see changes they did not make themselves.

use crossbeam_channel::Receiver;

use crate::config::LinkConfig;
use crate::engine::{Command, DsEngine, EngineState};
use crate::error::Result;
use crate::protocol::types::{Alliance, ControlMode, JoystickData, Station};
use crate::session::DsEvent;

/// Driver console ("client") for one robot
pub struct DsClient {
    engine: DsEngine,
}

impl DsClient {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            engine: DsEngine::new(config),
        }
    }

    /// Begin talking to the robot and FMS
    pub fn start(&mut self) -> Result<()> {
        self.engine.start_as_client()
    }

    /// Tear down timers, watchdogs and sockets; safe to call repeatedly
    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    /// Session change events (team number echoes are suppressed)
    pub fn events(&self) -> Receiver<DsEvent> {
        self.engine.events()
    }

    // ========================================================================
    // Read/write properties
    // ========================================================================

    pub fn team_number(&self) -> u16 {
        self.engine.with_session(|s| s.team_number())
    }

    pub fn set_team_number(&mut self, team: u16) {
        self.engine.command(Command::SetTeamNumber(team));
    }

    pub fn control_mode(&self) -> ControlMode {
        self.engine.with_session(|s| s.control_mode())
    }

    pub fn set_control_mode(&mut self, mode: ControlMode) {
        self.engine.command(Command::SetControlMode(mode));
    }

    pub fn robot_enabled(&self) -> bool {
        self.engine.with_session(|s| s.robot_enabled())
    }

    pub fn set_robot_enabled(&mut self, enabled: bool) {
        self.engine.command(Command::SetRobotEnabled(enabled));
    }

    pub fn set_emergency_stopped(&mut self, stopped: bool) {
        self.engine.command(Command::SetEmergencyStopped(stopped));
    }

    pub fn alliance(&self) -> Alliance {
        self.engine.with_session(|s| s.alliance())
    }

    pub fn set_alliance(&mut self, alliance: Alliance) {
        self.engine.command(Command::SetAlliance(alliance));
    }

    pub fn station(&self) -> Station {
        self.engine.with_session(|s| s.station())
    }

    pub fn set_station(&mut self, station: Station) {
        self.engine.command(Command::SetStation(station));
    }

    pub fn custom_robot_address(&self) -> Option<String> {
        self.engine
            .with_session(|s| s.custom_robot_address().map(String::from))
    }

    pub fn set_custom_robot_address(&mut self, address: Option<String>) {
        self.engine.command(Command::SetCustomRobotAddress(address));
    }

    pub fn custom_fms_address(&self) -> Option<String> {
        self.engine
            .with_session(|s| s.custom_fms_address().map(String::from))
    }

    pub fn set_custom_fms_address(&mut self, address: Option<String>) {
        self.engine.command(Command::SetCustomFmsAddress(address));
    }

    // ========================================================================
    // Read-only telemetry
    // ========================================================================

    pub fn robot_voltage(&self) -> f64 {
        self.engine.with_session(|s| s.robot_voltage())
    }

    pub fn robot_communications(&self) -> bool {
        self.engine.with_session(|s| s.robot_communications())
    }

    pub fn fms_communications(&self) -> bool {
        self.engine.with_session(|s| s.fms_communications())
    }

    pub fn emergency_stopped(&self) -> bool {
        self.engine.with_session(|s| s.emergency_stopped())
    }

    pub fn robot_code(&self) -> bool {
        self.engine.with_session(|s| s.robot_code())
    }

    /// Whether enabling is currently safe (comms + code + no e-stop)
    pub fn can_be_enabled(&self) -> bool {
        self.engine.with_session(|s| s.can_be_enabled())
    }

    /// Derived one-line status for frontends
    pub fn status_string(&self) -> String {
        self.engine.with_session(|s| s.status_string())
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Replace the cached joystick set sent with every robot packet
    ///
    /// Devices beyond the protocol maximum are dropped.
    pub fn update_joysticks(&mut self, mut joysticks: Vec<JoystickData>) {
        let max = self.engine.protocol().max_joysticks();
        if joysticks.len() > max {
            log::warn!(
                "Dropping {} joystick(s) beyond the protocol maximum of {}",
                joysticks.len() - max,
                max
            );
            joysticks.truncate(max);
        }
        self.engine.command(Command::UpdateJoysticks(joysticks));
    }

    /// Ask the robot controller to reboot
    pub fn request_reboot(&mut self) {
        self.engine.command(Command::RequestReboot);
    }

    /// Ask the robot controller to restart user code
    pub fn request_restart_code(&mut self) {
        self.engine.command(Command::RequestRestartCode);
    }
}

impl Default for DsClient {
    fn default() -> Self {
        Self::new(LinkConfig::protocol_defaults())
    }
}
