//! Robot (controller) role loop
//!
//! The robot listens on the client->robot port with no preset remote; the
//! first console to send a packet becomes the reply destination. Every valid
//! inbound control packet is applied to session state and answered
//! synchronously with a telemetry reply echoing the packet's sequence
//! number, so the console's round-trip view stays packet-for-packet.
//!
//! The reply asserts the request-time bit until a date block arrives, which
//! makes a freshly (re)connected console ship wall-clock time before
//! joystick data.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{Receiver, select};

use crate::config::LinkConfig;
use crate::engine::Command;
use crate::protocol::Protocol;
use crate::protocol::packets::RobotToClientPacket;
use crate::session::SessionState;
use crate::transport::Transport;
use crate::watchdog::{Watchdog, WatchdogEvent};

pub(crate) struct RobotRole {
    session: Arc<Mutex<SessionState>>,
    protocol: Arc<dyn Protocol>,
    link: Box<dyn Transport>,
    rx: Receiver<(Vec<u8>, SocketAddr)>,
    commands: Receiver<Command>,
    watchdog: Watchdog,
    sent: u16,
    received: u32,
    date_received: bool,
}

impl RobotRole {
    pub fn new(
        session: Arc<Mutex<SessionState>>,
        protocol: Arc<dyn Protocol>,
        config: LinkConfig,
        link: Box<dyn Transport>,
        rx: Receiver<(Vec<u8>, SocketAddr)>,
        commands: Receiver<Command>,
    ) -> Self {
        Self {
            session,
            protocol,
            link,
            rx,
            commands,
            watchdog: Watchdog::new(config.watchdog_timeout()),
            sent: 0,
            received: 0,
            date_received: false,
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn run(mut self) {
        if let Err(e) = self.watchdog.start() {
            log::error!("Robot role failed to start watchdog: {}", e);
            return;
        }

        let wd = self.watchdog.events();
        let commands = self.commands.clone();
        let rx = self.rx.clone();

        log::info!("Robot role started (waiting for a console)");

        loop {
            select! {
                recv(commands) -> cmd => match cmd {
                    Ok(Command::Stop) | Err(_) => break,
                    Ok(cmd) => self.handle_command(cmd),
                },
                recv(rx) -> msg => if let Ok((data, sender)) = msg {
                    self.handle_packet(&data, sender);
                },
                recv(wd) -> ev => if let Ok(WatchdogEvent::Expired) = ev {
                    self.handle_expiry();
                },
            }
        }

        self.watchdog.stop();
        self.link.close();
        log::info!("Robot role stopped");
    }

    /// Apply an inbound control packet and reply synchronously
    fn handle_packet(&mut self, data: &[u8], sender: SocketAddr) {
        let Some(pkt) = self.protocol.read_client_to_robot_packet(data) else {
            log::debug!("Discarding malformed console packet ({} bytes)", data.len());
            return;
        };

        // Reply to whichever console is talking to us
        self.link.latch_remote(sender);

        if pkt.date.is_some() {
            self.date_received = true;
        }

        let reply = {
            let mut s = self.state();
            s.set_robot_communications(true);
            s.set_emergency_stopped(pkt.emergency_stopped);
            s.set_control_mode(pkt.control_mode);
            s.set_robot_enabled(pkt.robot_enabled);
            s.set_fms_communications(pkt.fms_communications);
            s.set_alliance(pkt.alliance);
            s.set_station(pkt.station);
            s.set_should_reboot_controller(pkt.reboot);
            s.set_should_restart_code(pkt.restart_code);
            if !pkt.joysticks.is_empty() {
                s.set_joysticks(pkt.joysticks);
            }

            RobotToClientPacket {
                seq: pkt.seq,
                control_mode: s.control_mode(),
                emergency_stopped: s.emergency_stopped(),
                robot_enabled: s.robot_enabled(),
                fms_communications: s.fms_communications(),
                robot_code: s.robot_code(),
                voltage: s.robot_voltage(),
                request_date: !self.date_received,
            }
        };

        let buf = self.protocol.make_robot_to_client_packet(&reply);
        match self.link.send(&buf) {
            Ok(0) => {}
            Ok(_) => self.sent = self.sent.wrapping_add(1),
            Err(e) => log::warn!("Reply send failed: {}", e),
        }

        self.received = self.received.wrapping_add(1);
        self.watchdog.feed();
    }

    /// Console link went quiet
    fn handle_expiry(&mut self) {
        log::debug!("Console link watchdog expired");
        self.state().set_robot_communications(false);
        self.sent = 0;
        self.received = 0;
        self.date_received = false;
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetRobotCode(code) => self.state().set_robot_code(code),
            Command::SetRobotVoltage(voltage) => self.state().set_robot_voltage(voltage),
            Command::Stop => {} // handled by the run loop
            other => log::debug!("Ignoring command in robot mode: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Frc2016;
    use crate::protocol::constants::{REQUEST_TIME, ROBOT_TO_CLIENT_MIN_SIZE};
    use crate::protocol::packets::{ClientToRobotPacket, make_client_to_robot_packet};
    use crate::protocol::types::{Alliance, ControlMode, DateStamp, Station};
    use crate::session::DsEvent;
    use crate::transport::MockTransport;
    use crossbeam_channel::unbounded;

    struct Fixture {
        role: RobotRole,
        mock: MockTransport,
        events: Receiver<DsEvent>,
    }

    fn fixture() -> Fixture {
        let (events_tx, events) = unbounded();
        let session = Arc::new(Mutex::new(SessionState::new(events_tx)));
        let mock = MockTransport::new(1150);
        let (_in_tx, rx) = unbounded();
        let (_cmd_tx, commands) = unbounded();

        let role = RobotRole::new(
            Arc::clone(&session),
            Arc::new(Frc2016),
            LinkConfig::protocol_defaults(),
            Box::new(mock.clone()),
            rx,
            commands,
        );

        Fixture { role, mock, events }
    }

    fn console_addr() -> SocketAddr {
        "10.12.34.5:50000".parse().unwrap()
    }

    #[test]
    fn test_packet_applies_state_and_replies() {
        let mut f = fixture();
        f.role.handle_command(Command::SetRobotCode(true));
        f.role.handle_command(Command::SetRobotVoltage(11.75));
        f.events.try_iter().count();

        let pkt = ClientToRobotPacket {
            seq: 7,
            control_mode: ControlMode::Autonomous,
            robot_enabled: true,
            robot_communications: true,
            alliance: Alliance::Blue,
            station: Station::Station2,
            ..Default::default()
        };
        f.role
            .handle_packet(&make_client_to_robot_packet(&pkt), console_addr());

        let s = f.role.state();
        assert!(s.robot_communications());
        assert_eq!(s.control_mode(), ControlMode::Autonomous);
        assert!(s.robot_enabled());
        assert_eq!(s.alliance(), Alliance::Blue);
        assert_eq!(s.station(), Station::Station2);
        drop(s);

        // Reply destination latched from the sender, reply port substituted
        assert_eq!(f.role.link.remote(), Some("10.12.34.5:1150".parse().unwrap()));

        let sent = f.mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), ROBOT_TO_CLIENT_MIN_SIZE);
        // Echoed sequence number
        assert_eq!(u16::from_be_bytes([sent[0][0], sent[0][1]]), 7);
        // Telemetry: voltage bytes and request-time flag
        assert_eq!(sent[0][4], 11);
        assert_eq!(sent[0][5], 75);
        assert_eq!(sent[0][6], REQUEST_TIME);
    }

    #[test]
    fn test_estop_packet_disables() {
        let mut f = fixture();

        let enable = ClientToRobotPacket {
            seq: 1,
            robot_enabled: true,
            robot_communications: true,
            ..Default::default()
        };
        f.role
            .handle_packet(&make_client_to_robot_packet(&enable), console_addr());
        assert!(f.role.state().robot_enabled());

        let estop = ClientToRobotPacket {
            seq: 2,
            emergency_stopped: true,
            robot_enabled: true,
            robot_communications: true,
            ..Default::default()
        };
        f.role
            .handle_packet(&make_client_to_robot_packet(&estop), console_addr());

        let s = f.role.state();
        assert!(s.emergency_stopped());
        assert!(!s.robot_enabled());
    }

    #[test]
    fn test_reboot_request_raises_event() {
        let mut f = fixture();
        let pkt = ClientToRobotPacket {
            seq: 9,
            robot_communications: true,
            reboot: true,
            ..Default::default()
        };
        f.role
            .handle_packet(&make_client_to_robot_packet(&pkt), console_addr());

        let events: Vec<DsEvent> = f.events.try_iter().collect();
        assert!(events.contains(&DsEvent::ShouldRebootChanged(true)));
    }

    #[test]
    fn test_request_date_until_received() {
        let mut f = fixture();

        let plain = ClientToRobotPacket {
            seq: 0,
            robot_communications: true,
            ..Default::default()
        };
        f.role
            .handle_packet(&make_client_to_robot_packet(&plain), console_addr());
        assert_eq!(f.mock.sent()[0][6], REQUEST_TIME);

        let dated = ClientToRobotPacket {
            seq: 1,
            robot_communications: true,
            date: Some(DateStamp {
                microseconds: 0,
                seconds: 0,
                minutes: 0,
                hours: 12,
                day: 7,
                month: 7,
                year: 2026,
            }),
            timezone: Some("UTC".to_string()),
            ..Default::default()
        };
        f.role
            .handle_packet(&make_client_to_robot_packet(&dated), console_addr());

        let sent = f.mock.sent();
        assert_eq!(sent[1][6], 0x00);
    }

    #[test]
    fn test_expiry_clears_comms_and_counters() {
        let mut f = fixture();
        let pkt = ClientToRobotPacket {
            seq: 0,
            robot_communications: true,
            ..Default::default()
        };
        f.role
            .handle_packet(&make_client_to_robot_packet(&pkt), console_addr());
        assert_eq!(f.role.received, 1);
        assert_eq!(f.role.sent, 1);

        f.role.handle_expiry();
        assert!(!f.role.state().robot_communications());
        assert_eq!(f.role.sent, 0);
        assert_eq!(f.role.received, 0);
        assert!(!f.role.date_received);
    }
}
