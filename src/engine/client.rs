//! Client (driver console) role loop
//!
//! Drives two logical links from one worker thread:
//!
//! - **robot link**: ~20 ms control packets out, telemetry replies in,
//!   500 ms watchdog. Joystick data rides along only after the warmup
//!   window; a date/timezone block goes out first when the robot asks.
//! - **FMS link**: ~500 ms status packets out, match control packets in,
//!   500 ms watchdog. With no custom FMS address the first inbound packet
//!   latches the destination.
//!
//! Watchdog expiry is the only disconnect signal: it demotes the comms flag,
//! invalidates last-known telemetry and zeroes the sent counter so the next
//! connection renegotiates (time first, joysticks after warmup).

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{Receiver, select, tick};

use crate::config::LinkConfig;
use crate::engine::Command;
use crate::protocol::Protocol;
use crate::protocol::packets::{ClientToFmsPacket, ClientToRobotPacket};
use crate::protocol::types::DateStamp;
use crate::session::SessionState;
use crate::transport::Transport;
use crate::watchdog::{Watchdog, WatchdogEvent};

pub(crate) struct ClientRole {
    session: Arc<Mutex<SessionState>>,
    protocol: Arc<dyn Protocol>,
    config: LinkConfig,
    robot_link: Box<dyn Transport>,
    fms_link: Box<dyn Transport>,
    robot_rx: Receiver<(Vec<u8>, SocketAddr)>,
    fms_rx: Receiver<(Vec<u8>, SocketAddr)>,
    commands: Receiver<Command>,
    robot_watchdog: Watchdog,
    fms_watchdog: Watchdog,
    sent_robot: u16,
    received_robot: u32,
    sent_fms: u16,
    received_fms: u32,
    send_time_now: bool,
}

impl ClientRole {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session: Arc<Mutex<SessionState>>,
        protocol: Arc<dyn Protocol>,
        config: LinkConfig,
        robot_link: Box<dyn Transport>,
        robot_rx: Receiver<(Vec<u8>, SocketAddr)>,
        fms_link: Box<dyn Transport>,
        fms_rx: Receiver<(Vec<u8>, SocketAddr)>,
        commands: Receiver<Command>,
    ) -> Self {
        let timeout = config.watchdog_timeout();
        Self {
            session,
            protocol,
            config,
            robot_link,
            fms_link,
            robot_rx,
            fms_rx,
            commands,
            robot_watchdog: Watchdog::new(timeout),
            fms_watchdog: Watchdog::new(timeout),
            sent_robot: 0,
            received_robot: 0,
            sent_fms: 0,
            received_fms: 0,
            send_time_now: false,
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn run(mut self) {
        self.refresh_robot_address();
        let custom_fms = self.state().custom_fms_address().map(String::from);
        if let Some(host) = custom_fms {
            if let Err(e) = self.fms_link.set_remote_host(&host) {
                log::warn!("FMS address rejected: {}", e);
            }
        }

        if let Err(e) = self.robot_watchdog.start() {
            log::error!("Client role failed to start robot watchdog: {}", e);
            return;
        }
        if let Err(e) = self.fms_watchdog.start() {
            log::error!("Client role failed to start FMS watchdog: {}", e);
            return;
        }

        let robot_tick = tick(self.config.robot_send_interval());
        let fms_tick = tick(self.config.fms_send_interval());
        let robot_wd = self.robot_watchdog.events();
        let fms_wd = self.fms_watchdog.events();
        let commands = self.commands.clone();
        let robot_rx = self.robot_rx.clone();
        let fms_rx = self.fms_rx.clone();

        log::info!(
            "Client role started (robot every {:?}, FMS every {:?})",
            self.config.robot_send_interval(),
            self.config.fms_send_interval()
        );

        loop {
            select! {
                recv(commands) -> cmd => match cmd {
                    Ok(Command::Stop) | Err(_) => break,
                    Ok(cmd) => self.handle_command(cmd),
                },
                recv(robot_rx) -> msg => if let Ok((data, _sender)) = msg {
                    self.handle_robot_packet(&data);
                },
                recv(fms_rx) -> msg => if let Ok((data, sender)) = msg {
                    self.handle_fms_packet(&data, sender);
                },
                recv(robot_wd) -> ev => if let Ok(WatchdogEvent::Expired) = ev {
                    self.handle_robot_expiry();
                },
                recv(fms_wd) -> ev => if let Ok(WatchdogEvent::Expired) = ev {
                    self.handle_fms_expiry();
                },
                recv(robot_tick) -> _ => self.send_robot_packet(),
                recv(fms_tick) -> _ => self.send_fms_packet(),
            }
        }

        self.robot_watchdog.stop();
        self.fms_watchdog.stop();
        self.robot_link.close();
        self.fms_link.close();
        log::info!("Client role stopped");
    }

    /// Inbound robot telemetry: adopt it and rearm the robot watchdog
    fn handle_robot_packet(&mut self, data: &[u8]) {
        let Some(pkt) = self.protocol.read_robot_to_client_packet(data) else {
            log::debug!("Discarding malformed robot packet ({} bytes)", data.len());
            return;
        };

        {
            let mut s = self.state();
            s.set_robot_communications(true);
            s.set_robot_code(pkt.robot_code);
            s.set_robot_voltage(pkt.voltage);
        }
        if pkt.request_date {
            self.send_time_now = true;
        }
        self.received_robot = self.received_robot.wrapping_add(1);
        self.robot_watchdog.feed();
    }

    /// Inbound FMS match control: the FMS dictates mode, enable and station
    fn handle_fms_packet(&mut self, data: &[u8], sender: SocketAddr) {
        let Some(pkt) = self.protocol.read_fms_to_client_packet(data) else {
            log::debug!("Discarding malformed FMS packet ({} bytes)", data.len());
            return;
        };

        // Adopt the FMS as destination when no custom address was configured
        if self.fms_link.remote().is_none() {
            self.fms_link.latch_remote(sender);
        }

        {
            let mut s = self.state();
            s.set_fms_communications(true);
            s.set_emergency_stopped(pkt.emergency_stopped);
            s.set_control_mode(pkt.control_mode);
            s.set_robot_enabled(pkt.robot_enabled);
            s.set_alliance(pkt.alliance);
            s.set_station(pkt.station);
        }
        self.received_fms = self.received_fms.wrapping_add(1);
        self.fms_watchdog.feed();
    }

    /// Robot link went quiet: demote comms, invalidate telemetry, zero the
    /// sent counter so extended data renegotiates after reconnect
    fn handle_robot_expiry(&mut self) {
        log::debug!("Robot link watchdog expired");
        {
            let mut s = self.state();
            s.set_robot_communications(false);
            s.set_robot_code(false);
            s.set_robot_voltage(0.0);
            s.set_should_reboot_controller(false);
            s.set_should_restart_code(false);
        }
        self.sent_robot = 0;
        self.received_robot = 0;
        self.send_time_now = false;
    }

    fn handle_fms_expiry(&mut self) {
        log::debug!("FMS link watchdog expired");
        self.state().set_fms_communications(false);
        self.sent_fms = 0;
        self.received_fms = 0;
    }

    /// Robot send timer tick: snapshot state, encode, transmit
    fn send_robot_packet(&mut self) {
        let pkt = {
            let s = self.state();
            ClientToRobotPacket {
                seq: self.sent_robot,
                control_mode: s.control_mode(),
                emergency_stopped: s.emergency_stopped(),
                robot_enabled: s.robot_enabled(),
                fms_communications: s.fms_communications(),
                robot_communications: s.robot_communications(),
                alliance: s.alliance(),
                station: s.station(),
                reboot: s.should_reboot_controller(),
                restart_code: s.should_restart_code(),
                joysticks: s.joysticks().to_vec(),
                date: self.send_time_now.then(DateStamp::now),
                timezone: self.send_time_now.then(|| self.config.timezone.clone()),
            }
        };

        let buf = self.protocol.make_client_to_robot_packet(&pkt);
        match self.robot_link.send(&buf) {
            Ok(0) => {} // no remote address yet
            Ok(_) => {
                self.sent_robot = self.sent_robot.wrapping_add(1);
                self.send_time_now = false;
            }
            Err(e) => log::warn!("Robot send failed: {}", e),
        }
    }

    /// FMS send timer tick
    fn send_fms_packet(&mut self) {
        let pkt = {
            let s = self.state();
            ClientToFmsPacket {
                seq: self.sent_fms,
                team_number: s.team_number(),
                voltage: s.robot_voltage(),
                control_mode: s.control_mode(),
                emergency_stopped: s.emergency_stopped(),
                robot_enabled: s.robot_enabled(),
                robot_communications: s.robot_communications(),
            }
        };

        let buf = self.protocol.make_client_to_fms_packet(&pkt);
        match self.fms_link.send(&buf) {
            Ok(0) => {} // FMS not latched yet
            Ok(_) => self.sent_fms = self.sent_fms.wrapping_add(1),
            Err(e) => log::warn!("FMS send failed: {}", e),
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetTeamNumber(team) => {
                // Local console write, not echoed to the event stream
                self.state().set_team_number_local(team);
                self.refresh_robot_address();
            }
            Command::SetControlMode(mode) => self.state().set_control_mode(mode),
            Command::SetRobotEnabled(enabled) => self.state().set_robot_enabled(enabled),
            Command::SetEmergencyStopped(stopped) => self.state().set_emergency_stopped(stopped),
            Command::SetAlliance(alliance) => self.state().set_alliance(alliance),
            Command::SetStation(station) => self.state().set_station(station),
            Command::SetCustomRobotAddress(addr) => {
                self.state().set_custom_robot_address(addr);
                self.refresh_robot_address();
            }
            Command::SetCustomFmsAddress(addr) => {
                self.state().set_custom_fms_address(addr.clone());
                if let Some(host) = addr {
                    if let Err(e) = self.fms_link.set_remote_host(&host) {
                        log::warn!("FMS address rejected: {}", e);
                    }
                }
            }
            Command::UpdateJoysticks(sticks) => self.state().set_joysticks(sticks),
            Command::RequestReboot => self.state().set_should_reboot_controller(true),
            Command::RequestRestartCode => self.state().set_should_restart_code(true),
            Command::Stop => {} // handled by the run loop
            other => log::debug!("Ignoring command in client mode: {:?}", other),
        }
    }

    /// Re-resolve the effective robot address (custom, or derived from the
    /// team number)
    fn refresh_robot_address(&self) {
        let (team, custom) = {
            let s = self.state();
            (s.team_number(), s.custom_robot_address().map(String::from))
        };
        let addr = custom.unwrap_or_else(|| self.protocol.default_robot_address(team));
        if let Err(e) = self.robot_link.set_remote_host(&addr) {
            log::warn!("Robot address not resolvable: {}", e);
        }
    }
}
