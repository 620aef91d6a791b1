//! Robot controller facade
//!
//! Wraps a robot-mode [`DsEngine`]. The controller reports its own telemetry
//! (user code present, battery voltage) and observes the console's commands
//! through read accessors and the event stream: reboot/restart requests and
//! joystick updates arrive as [`DsEvent`]s.

use crossbeam_channel::Receiver;

use crate::config::LinkConfig;
use crate::engine::{Command, DsEngine, EngineState};
use crate::error::Result;
use crate::protocol::types::{Alliance, ControlMode, JoystickData, Station};
use crate::session::DsEvent;

/// Robot-side endpoint of the driver station link
pub struct DsRobot {
    engine: DsEngine,
}

impl DsRobot {
    pub fn new(config: LinkConfig) -> Self {
        Self {
            engine: DsEngine::new(config),
        }
    }

    /// Begin listening for a driver console
    pub fn start(&mut self) -> Result<()> {
        self.engine.start_as_robot()
    }

    /// Tear down the listener and watchdog; safe to call repeatedly
    pub fn stop(&mut self) {
        self.engine.stop();
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine.state()
    }

    /// Session change events (enable/mode/e-stop transitions, reboot and
    /// restart requests, joystick updates)
    pub fn events(&self) -> Receiver<DsEvent> {
        self.engine.events()
    }

    // ========================================================================
    // Telemetry reported by this controller
    // ========================================================================

    pub fn robot_code(&self) -> bool {
        self.engine.with_session(|s| s.robot_code())
    }

    /// Report whether user code is running
    pub fn set_robot_code(&mut self, code: bool) {
        self.engine.command(Command::SetRobotCode(code));
    }

    pub fn robot_voltage(&self) -> f64 {
        self.engine.with_session(|s| s.robot_voltage())
    }

    /// Report the battery voltage carried in every reply
    pub fn set_robot_voltage(&mut self, voltage: f64) {
        self.engine.command(Command::SetRobotVoltage(voltage));
    }

    // ========================================================================
    // State dictated by the console
    // ========================================================================

    pub fn control_mode(&self) -> ControlMode {
        self.engine.with_session(|s| s.control_mode())
    }

    pub fn robot_enabled(&self) -> bool {
        self.engine.with_session(|s| s.robot_enabled())
    }

    pub fn emergency_stopped(&self) -> bool {
        self.engine.with_session(|s| s.emergency_stopped())
    }

    pub fn alliance(&self) -> Alliance {
        self.engine.with_session(|s| s.alliance())
    }

    pub fn station(&self) -> Station {
        self.engine.with_session(|s| s.station())
    }

    /// Whether a console is currently talking to us
    pub fn communications(&self) -> bool {
        self.engine.with_session(|s| s.robot_communications())
    }

    /// Whether the console reports an FMS behind it
    pub fn fms_communications(&self) -> bool {
        self.engine.with_session(|s| s.fms_communications())
    }

    /// Latest joystick snapshot received from the console
    pub fn joysticks(&self) -> Vec<JoystickData> {
        self.engine.with_session(|s| s.joysticks().to_vec())
    }
}

impl Default for DsRobot {
    fn default() -> Self {
        Self::new(LinkConfig::protocol_defaults())
    }
}
