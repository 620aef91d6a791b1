//! Field management facade
//!
//! Wraps an FMS-mode [`DsEngine`] serving one latched driver console. The
//! operator owns mode, enable, e-stop, station assignment and match info;
//! the console's reports (team number, voltage, robot link state) surface
//! through read accessors and events.

use crossbeam_channel::Receiver;

use crate::config::LinkConfig;
use crate::engine::{Command, DsEngine, EngineState, MatchInfo};
use crate::error::Result;
use crate::protocol::types::{Alliance, ControlMode, Station};
use crate::session::DsEvent;

/// Field-management endpoint serving one driver console
pub struct DsFms {
    engine: DsEngine,
}

impl DsFms {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            engine: DsEngine::new(config),
        }
    }

    /// Begin listening for a driver console
    pub fn start(&mut self) -> Result<()> {
        self.engine.start_as_fms()
    }

    /// Tear down the listener, timer and watchdog; safe to call repeatedly
    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    pub fn events(&self) -> Receiver<DsEvent> {
        self.engine.events()
    }

    // ========================================================================
    // Operator controls
    // ========================================================================

    pub fn set_control_mode(&mut self, mode: ControlMode) {
        self.engine.command(Command::SetControlMode(mode));
    }

    pub fn set_robot_enabled(&mut self, enabled: bool) {
        self.engine.command(Command::SetRobotEnabled(enabled));
    }

    pub fn set_emergency_stopped(&mut self, stopped: bool) {
        self.engine.command(Command::SetEmergencyStopped(stopped));
    }

    pub fn set_alliance(&mut self, alliance: Alliance) {
        self.engine.command(Command::SetAlliance(alliance));
    }

    pub fn set_station(&mut self, station: Station) {
        self.engine.command(Command::SetStation(station));
    }

    /// Update the advertised tournament level, match number and time
    pub fn set_match_info(&mut self, info: MatchInfo) {
        self.engine.command(Command::SetMatchInfo(info));
    }

    // ========================================================================
    // Console reports
    // ========================================================================

    /// Team number of the latched console
    pub fn team_number(&self) -> u16 {
        self.engine.with_session(|s| s.team_number())
    }

    /// Battery voltage as reported by the console
    pub fn robot_voltage(&self) -> f64 {
        self.engine.with_session(|s| s.robot_voltage())
    }

    /// Whether a console is currently reporting in
    pub fn client_communications(&self) -> bool {
        self.engine.with_session(|s| s.fms_communications())
    }

    /// Whether that console reports its own robot link up
    pub fn robot_communications(&self) -> bool {
        self.engine.with_session(|s| s.robot_communications())
    }
}

impl Default for DsFms {
    fn default() -> Self {
        Self::new(LinkConfig::protocol_defaults())
    }
}
