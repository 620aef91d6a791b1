//! Protocol engine
//!
//! The engine owns the session state for one protocol role and drives all
//! periodic sends and liveness tracking for it.
//!
//! # Thread Model
//!
//! Everything that mutates [`SessionState`] funnels through one worker
//! thread per engine:
//!
//! 1. **Role worker** (`setu-client` / `setu-robot` / `setu-fms`): runs a
//!    `select!` loop over send tickers, inbound datagrams, watchdog events
//!    and facade commands, and is the only thread that writes session state
//!    or sequence counters.
//! 2. **UDP reader threads** (one per link): post raw datagrams into the
//!    worker's inbox and never touch state.
//! 3. **Watchdog threads** (one per link): post expiry events into the
//!    worker's inbox and never touch state.
//!
//! Facades post [`Command`]s instead of writing directly, so reads can
//! happen from any thread (a brief mutex lock) while the write timeline
//! stays sequential.
//!
//! # Lifecycle
//!
//! ```text
//! NotStarted ──start_as_*()──▶ RunningAs{Client,Robot,Fms}
//!      ▲                               │ stop()
//!      └──────── start_as_*() ◀── Stopped
//! ```
//!
//! `stop()` is idempotent and callable from any state; it tears down the
//! worker, watchdogs and sockets before returning, so no timer fires or
//! watchdog events are delivered afterwards. Starting again rebuilds
//! everything with counters zeroed.

mod client;
mod fms;
mod robot;

pub(crate) use client::ClientRole;
pub(crate) use fms::FmsRole;
pub(crate) use robot::RobotRole;

use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, unbounded};

use crate::config::LinkConfig;
use crate::error::{Error, Result};
use crate::protocol::types::{Alliance, ControlMode, JoystickData, Station};
use crate::protocol::{Frc2016, Protocol};
use crate::session::{DsEvent, SessionState};
use crate::transport::UdpTransport;

/// Match status advertised by an FMS role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchInfo {
    pub tournament_level: u8,
    pub match_number: u16,
    /// Seconds remaining in the current match segment
    pub time_remaining: u16,
}

/// Requests posted from facades into the role worker
#[derive(Debug, Clone)]
pub enum Command {
    SetTeamNumber(u16),
    SetControlMode(ControlMode),
    SetRobotEnabled(bool),
    SetEmergencyStopped(bool),
    SetAlliance(Alliance),
    SetStation(Station),
    SetCustomRobotAddress(Option<String>),
    SetCustomFmsAddress(Option<String>),
    UpdateJoysticks(Vec<JoystickData>),
    RequestReboot,
    RequestRestartCode,
    /// Robot role: report whether user code is running
    SetRobotCode(bool),
    /// Robot role: report the battery voltage
    SetRobotVoltage(f64),
    /// FMS role: update the advertised match status
    SetMatchInfo(MatchInfo),
    Stop,
}

/// Engine lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    NotStarted,
    RunningAsClient,
    RunningAsRobot,
    RunningAsFms,
    Stopped,
}

/// Protocol engine for one role instance
///
/// Owns the session state, the command channel into the role worker and the
/// worker thread handle. One engine owns its transports exclusively; engines
/// never share sockets.
pub struct DsEngine {
    config: LinkConfig,
    protocol: Arc<dyn Protocol>,
    session: Arc<Mutex<SessionState>>,
    events_rx: Receiver<DsEvent>,
    commands: Option<Sender<Command>>,
    worker: Option<JoinHandle<()>>,
    state: EngineState,
    match_info: MatchInfo,
}

impl DsEngine {
    /// Create an engine speaking the 2016 wire format
    pub fn new(config: LinkConfig) -> Self {
        Self::with_protocol(config, Arc::new(Frc2016))
    }

    /// Create an engine with an explicit protocol implementation
    pub fn with_protocol(config: LinkConfig, protocol: Arc<dyn Protocol>) -> Self {
        let (events_tx, events_rx) = unbounded();
        let session = Arc::new(Mutex::new(SessionState::new(events_tx)));
        {
            let mut s = session.lock().unwrap_or_else(|e| e.into_inner());
            s.set_custom_robot_address(config.addresses.custom_robot.clone());
            s.set_custom_fms_address(config.addresses.custom_fms.clone());
        }
        Self {
            config,
            protocol,
            session,
            events_rx,
            commands: None,
            worker: None,
            state: EngineState::NotStarted,
            match_info: MatchInfo::default(),
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    pub(crate) fn protocol(&self) -> &Arc<dyn Protocol> {
        &self.protocol
    }

    /// Session change-event stream (single consumer)
    pub fn events(&self) -> Receiver<DsEvent> {
        self.events_rx.clone()
    }

    /// Run a closure against the current session state
    pub fn with_session<T>(&self, f: impl FnOnce(&SessionState) -> T) -> T {
        f(&self.lock_session())
    }

    fn lock_session(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Post a command; applied directly while no worker is running
    pub fn command(&mut self, cmd: Command) {
        if let Command::SetMatchInfo(info) = &cmd {
            // Keep the engine copy so a restarted FMS role resumes with it
            self.match_info = *info;
        }
        match &self.commands {
            Some(tx) => {
                let _ = tx.send(cmd);
            }
            None => self.apply_offline(cmd),
        }
    }

    /// Direct application for the stopped state, where no worker owns state
    fn apply_offline(&self, cmd: Command) {
        let mut s = self.lock_session();
        match cmd {
            Command::SetTeamNumber(team) => s.set_team_number_local(team),
            Command::SetControlMode(mode) => s.set_control_mode(mode),
            Command::SetRobotEnabled(enabled) => s.set_robot_enabled(enabled),
            Command::SetEmergencyStopped(stopped) => s.set_emergency_stopped(stopped),
            Command::SetAlliance(alliance) => s.set_alliance(alliance),
            Command::SetStation(station) => s.set_station(station),
            Command::SetCustomRobotAddress(addr) => s.set_custom_robot_address(addr),
            Command::SetCustomFmsAddress(addr) => s.set_custom_fms_address(addr),
            Command::UpdateJoysticks(sticks) => s.set_joysticks(sticks),
            Command::RequestReboot => s.set_should_reboot_controller(true),
            Command::RequestRestartCode => s.set_should_restart_code(true),
            Command::SetRobotCode(code) => s.set_robot_code(code),
            Command::SetRobotVoltage(voltage) => s.set_robot_voltage(voltage),
            Command::SetMatchInfo(_) | Command::Stop => {}
        }
    }

    /// Enter client mode: robot + FMS links, send timers and watchdogs
    pub fn start_as_client(&mut self) -> Result<()> {
        self.stop();
        self.lock_session().reset();

        let (cmd_tx, cmd_rx) = unbounded();
        let (robot_tx, robot_rx) = unbounded();
        let robot_link = UdpTransport::bind(
            self.config.ports.robot_to_client,
            self.config.ports.client_to_robot,
            robot_tx,
            "robot",
        )?;
        let (fms_tx, fms_rx) = unbounded();
        let fms_link = UdpTransport::bind(
            self.config.ports.fms_to_client,
            self.config.ports.client_to_fms,
            fms_tx,
            "fms",
        )?;

        let role = ClientRole::new(
            Arc::clone(&self.session),
            Arc::clone(&self.protocol),
            self.config.clone(),
            Box::new(robot_link),
            robot_rx,
            Box::new(fms_link),
            fms_rx,
            cmd_rx,
        );
        self.spawn_worker("setu-client", move || role.run())?;
        self.commands = Some(cmd_tx);
        self.state = EngineState::RunningAsClient;
        log::info!("Engine started as client ({})", self.protocol.name());
        Ok(())
    }

    /// Enter robot mode: listen for a console, reply synchronously
    ///
    /// Unlike client mode, locally reported state (user code flag, battery
    /// voltage) survives a restart; stale comms flags clear on the first
    /// watchdog expiry.
    pub fn start_as_robot(&mut self) -> Result<()> {
        self.stop();

        let (cmd_tx, cmd_rx) = unbounded();
        let (rx_tx, rx_rx) = unbounded();
        let link = UdpTransport::bind(
            self.config.ports.client_to_robot,
            self.config.ports.robot_to_client,
            rx_tx,
            "client",
        )?;

        let role = RobotRole::new(
            Arc::clone(&self.session),
            Arc::clone(&self.protocol),
            self.config.clone(),
            Box::new(link),
            rx_rx,
            cmd_rx,
        );
        self.spawn_worker("setu-robot", move || role.run())?;
        self.commands = Some(cmd_tx);
        self.state = EngineState::RunningAsRobot;
        log::info!("Engine started as robot ({})", self.protocol.name());
        Ok(())
    }

    /// Enter FMS mode: serve one latched client with match status
    ///
    /// Operator-assigned fields (mode, station, match info) survive a
    /// restart.
    pub fn start_as_fms(&mut self) -> Result<()> {
        self.stop();

        let (cmd_tx, cmd_rx) = unbounded();
        let (rx_tx, rx_rx) = unbounded();
        let link = UdpTransport::bind(
            self.config.ports.client_to_fms,
            self.config.ports.fms_to_client,
            rx_tx,
            "ds",
        )?;

        let role = FmsRole::new(
            Arc::clone(&self.session),
            Arc::clone(&self.protocol),
            self.config.clone(),
            Box::new(link),
            rx_rx,
            cmd_rx,
            self.match_info,
        );
        self.spawn_worker("setu-fms", move || role.run())?;
        self.commands = Some(cmd_tx);
        self.state = EngineState::RunningAsFms;
        log::info!("Engine started as FMS ({})", self.protocol.name());
        Ok(())
    }

    fn spawn_worker<F>(&mut self, name: &str, body: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(body)
            .map_err(|e| Error::Other(format!("Failed to spawn {} worker: {}", name, e)))?;
        self.worker = Some(handle);
        Ok(())
    }

    /// Tear down whichever role is active; calling twice is a no-op
    pub fn stop(&mut self) {
        if let Some(tx) = self.commands.take() {
            let _ = tx.send(Command::Stop);
        }
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
            self.state = EngineState::Stopped;
            log::info!("Engine stopped");
        }
    }
}

impl Drop for DsEngine {
    fn drop(&mut self) {
        self.stop();
    }
}
