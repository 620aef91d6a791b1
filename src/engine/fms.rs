//! FMS (field management) role loop
//!
//! Serves a single driver console: the first client to send a status packet
//! is latched as the destination for the 500 ms match-status stream. Inbound
//! packets report the client's team number, telemetry and robot link state;
//! the operator-facing fields (mode, enable, e-stop, station assignment and
//! match info) are owned by this side and never overwritten by the client.
//!
//! Fan-out to multiple clients is deliberately not modeled.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{Receiver, select, tick};

use crate::config::LinkConfig;
use crate::engine::{Command, MatchInfo};
use crate::protocol::Protocol;
use crate::protocol::packets::FmsToClientPacket;
use crate::protocol::types::DateStamp;
use crate::session::SessionState;
use crate::transport::Transport;
use crate::watchdog::{Watchdog, WatchdogEvent};

pub(crate) struct FmsRole {
    session: Arc<Mutex<SessionState>>,
    protocol: Arc<dyn Protocol>,
    config: LinkConfig,
    link: Box<dyn Transport>,
    rx: Receiver<(Vec<u8>, SocketAddr)>,
    commands: Receiver<Command>,
    watchdog: Watchdog,
    sent: u16,
    received: u32,
    match_info: MatchInfo,
}

impl FmsRole {
    pub fn new(
        session: Arc<Mutex<SessionState>>,
        protocol: Arc<dyn Protocol>,
        config: LinkConfig,
        link: Box<dyn Transport>,
        rx: Receiver<(Vec<u8>, SocketAddr)>,
        commands: Receiver<Command>,
        match_info: MatchInfo,
    ) -> Self {
        let timeout = config.watchdog_timeout();
        Self {
            session,
            protocol,
            config,
            link,
            rx,
            commands,
            watchdog: Watchdog::new(timeout),
            sent: 0,
            received: 0,
            match_info,
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.session.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn run(mut self) {
        if let Err(e) = self.watchdog.start() {
            log::error!("FMS role failed to start watchdog: {}", e);
            return;
        }

        let send_tick = tick(self.config.fms_send_interval());
        let wd = self.watchdog.events();
        let commands = self.commands.clone();
        let rx = self.rx.clone();

        log::info!("FMS role started (waiting for a console)");

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
                recv(send_tick) -> _ => self.send_match_packet(),
            }
        }

        self.watchdog.stop();
        self.link.close();
        log::info!("FMS role stopped");
    }

    /// Inbound console status report
    fn handle_packet(&mut self, data: &[u8], sender: SocketAddr) {
        let Some(pkt) = self.protocol.read_client_to_fms_packet(data) else {
            log::debug!("Discarding malformed console packet ({} bytes)", data.len());
            return;
        };

        self.link.latch_remote(sender);

        {
            let mut s = self.state();
            s.set_fms_communications(true);
            s.set_team_number(pkt.team_number);
            s.set_robot_voltage(pkt.voltage);
            s.set_robot_communications(pkt.robot_communications);
        }
        self.received = self.received.wrapping_add(1);
        self.watchdog.feed();
    }

    /// Console link went quiet
    fn handle_expiry(&mut self) {
        log::debug!("Console link watchdog expired");
        self.state().set_fms_communications(false);
        self.sent = 0;
        self.received = 0;
    }

    /// 500 ms tick: advertise match status to the latched console
    fn send_match_packet(&mut self) {
        let pkt = {
            let s = self.state();
            FmsToClientPacket {
                seq: self.sent,
                control_mode: s.control_mode(),
                emergency_stopped: s.emergency_stopped(),
                robot_enabled: s.robot_enabled(),
                robot_communications: s.robot_communications(),
                alliance: s.alliance(),
                station: s.station(),
                tournament_level: self.match_info.tournament_level,
                match_number: self.match_info.match_number,
                time_remaining: self.match_info.time_remaining,
                date: DateStamp::now(),
            }
        };

        let buf = self.protocol.make_fms_to_client_packet(&pkt);
        match self.link.send(&buf) {
            Ok(0) => {} // no console latched yet
            Ok(_) => self.sent = self.sent.wrapping_add(1),
            Err(e) => log::warn!("Match status send failed: {}", e),
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::SetMatchInfo(info) => self.match_info = info,
            Command::SetControlMode(mode) => self.state().set_control_mode(mode),
            Command::SetRobotEnabled(enabled) => self.state().set_robot_enabled(enabled),
            Command::SetEmergencyStopped(stopped) => self.state().set_emergency_stopped(stopped),
            Command::SetAlliance(alliance) => self.state().set_alliance(alliance),
            Command::SetStation(station) => self.state().set_station(station),
            Command::Stop => {} // handled by the run loop
            other => log::debug!("Ignoring command in FMS mode: {:?}", other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Frc2016;
    use crate::protocol::constants::FMS_TO_CLIENT_MIN_SIZE;
    use crate::protocol::packets::{
        ClientToFmsPacket, make_client_to_fms_packet, read_fms_to_client_packet,
    };
    use crate::protocol::types::{Alliance, Station};
    use crate::session::DsEvent;
    use crate::transport::MockTransport;
    use crossbeam_channel::unbounded;

    struct Fixture {
        role: FmsRole,
        mock: MockTransport,
        events: Receiver<DsEvent>,
    }

    fn fixture() -> Fixture {
        let (events_tx, events) = unbounded();
        let session = Arc::new(Mutex::new(SessionState::new(events_tx)));
        let mock = MockTransport::new(1120);
        let (_in_tx, rx) = unbounded();
        let (_cmd_tx, commands) = unbounded();

        let role = FmsRole::new(
            Arc::clone(&session),
            Arc::new(Frc2016),
            LinkConfig::protocol_defaults(),
            Box::new(mock.clone()),
            rx,
            commands,
            MatchInfo {
                tournament_level: 2,
                match_number: 17,
                time_remaining: 135,
            },
        );

        Fixture { role, mock, events }
    }

    #[test]
    fn test_console_report_latches_and_applies() {
        let mut f = fixture();
        let pkt = ClientToFmsPacket {
            seq: 3,
            team_number: 1234,
            voltage: 12.25,
            robot_communications: true,
            ..Default::default()
        };
        f.role.handle_packet(
            &make_client_to_fms_packet(&pkt),
            "10.0.0.9:40000".parse().unwrap(),
        );

        assert_eq!(f.role.link.remote(), Some("10.0.0.9:1120".parse().unwrap()));
        let s = f.role.state();
        assert!(s.fms_communications());
        assert_eq!(s.team_number(), 1234);
        assert_eq!(s.robot_voltage(), 12.25);
        assert!(s.robot_communications());
        drop(s);

        let events: Vec<DsEvent> = f.events.try_iter().collect();
        assert!(events.contains(&DsEvent::TeamNumberChanged(1234)));
    }

    #[test]
    fn test_match_packet_carries_operator_state() {
        let mut f = fixture();
        f.role.handle_command(Command::SetAlliance(Alliance::Blue));
        f.role.handle_command(Command::SetStation(Station::Station3));
        f.role.link.latch_remote("10.0.0.9:40000".parse().unwrap());

        f.role.send_match_packet();
        let sent = f.mock.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].len(), FMS_TO_CLIENT_MIN_SIZE);

        let decoded = read_fms_to_client_packet(&sent[0]).unwrap();
        assert_eq!(decoded.alliance, Alliance::Blue);
        assert_eq!(decoded.station, Station::Station3);
        assert_eq!(decoded.tournament_level, 2);
        assert_eq!(decoded.match_number, 17);
        assert_eq!(decoded.time_remaining, 135);
    }

    #[test]
    fn test_expiry_clears_console_link() {
        let mut f = fixture();
        let pkt = ClientToFmsPacket::default();
        f.role.handle_packet(
            &make_client_to_fms_packet(&pkt),
            "10.0.0.9:40000".parse().unwrap(),
        );
        assert_eq!(f.role.received, 1);

        f.role.handle_expiry();
        assert!(!f.role.state().fms_communications());
        assert_eq!(f.role.received, 0);
    }
}
