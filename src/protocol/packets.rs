//! Top-level packet builders and readers
//!
//! Four packet kinds flow between the three roles:
//!
//! ```text
//! client -> FMS     8 bytes    seq, version, control, team, voltage
//! FMS -> client    22 bytes    seq, version, control, request, station,
//!                              level, match, play, date, time remaining
//! client -> robot   6+ bytes   seq, tag, control, request, station, [TLVs]
//! robot -> client   7 bytes    seq, version, control, voltage, request
//! ```
//!
//! Readers return `None` for any buffer shorter than the fixed header of its
//! kind. Extended data is parsed tolerantly: a truncated block ends the walk
//! while earlier blocks remain applied.

use super::codec::*;
use super::constants::*;
use super::types::{Alliance, ControlMode, DateStamp, JoystickData, Station};

/// Client->FMS status report (sent every ~500 ms)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientToFmsPacket {
    pub seq: u16,
    pub team_number: u16,
    pub voltage: f64,
    pub control_mode: ControlMode,
    pub emergency_stopped: bool,
    pub robot_enabled: bool,
    pub robot_communications: bool,
}

/// FMS->client match control packet
#[derive(Debug, Clone, PartialEq)]
pub struct FmsToClientPacket {
    pub seq: u16,
    pub control_mode: ControlMode,
    pub emergency_stopped: bool,
    pub robot_enabled: bool,
    pub robot_communications: bool,
    pub alliance: Alliance,
    pub station: Station,
    pub tournament_level: u8,
    pub match_number: u16,
    pub time_remaining: u16,
    pub date: DateStamp,
}

/// Client->robot control packet (sent every ~20 ms)
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ClientToRobotPacket {
    pub seq: u16,
    pub control_mode: ControlMode,
    pub emergency_stopped: bool,
    pub robot_enabled: bool,
    pub fms_communications: bool,
    pub robot_communications: bool,
    pub alliance: Alliance,
    pub station: Station,
    pub reboot: bool,
    pub restart_code: bool,
    /// Appended as TLV blocks only once `seq` has passed the warmup window
    pub joysticks: Vec<JoystickData>,
    /// When set, the date/timezone blocks are appended instead of joysticks
    pub date: Option<DateStamp>,
    pub timezone: Option<String>,
}

/// Robot->client reply carrying telemetry
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RobotToClientPacket {
    pub seq: u16,
    pub control_mode: ControlMode,
    pub emergency_stopped: bool,
    pub robot_enabled: bool,
    pub fms_communications: bool,
    pub robot_code: bool,
    pub voltage: f64,
    pub request_date: bool,
}

// ============================================================================
// Builders
// ============================================================================

/// Encode a client->FMS packet (8 bytes)
pub fn make_client_to_fms_packet(pkt: &ClientToFmsPacket) -> Vec<u8> {
    let (upper, lower) = encode_voltage(pkt.voltage);
    let control = make_fms_control_code(
        pkt.control_mode,
        pkt.emergency_stopped,
        pkt.robot_enabled,
        pkt.robot_communications,
    );

    let mut buf = Vec::with_capacity(CLIENT_TO_FMS_MIN_SIZE);
    buf.extend_from_slice(&pkt.seq.to_be_bytes());
    buf.push(0x00); // DS version
    buf.push(control);
    buf.extend_from_slice(&pkt.team_number.to_be_bytes());
    buf.push(upper);
    buf.push(lower);
    buf
}

/// Encode an FMS->client packet (22 bytes)
pub fn make_fms_to_client_packet(pkt: &FmsToClientPacket) -> Vec<u8> {
    let control = make_fms_control_code(
        pkt.control_mode,
        pkt.emergency_stopped,
        pkt.robot_enabled,
        pkt.robot_communications,
    );

    let mut buf = Vec::with_capacity(FMS_TO_CLIENT_MIN_SIZE);
    buf.extend_from_slice(&pkt.seq.to_be_bytes());
    buf.push(0x00); // comm version
    buf.push(control);
    buf.push(0x00); // request byte
    buf.push(make_station_code(pkt.alliance, pkt.station));
    buf.push(pkt.tournament_level);
    buf.extend_from_slice(&pkt.match_number.to_be_bytes());
    buf.push(0x00); // play number
    buf.extend_from_slice(&encode_date(&pkt.date));
    buf.extend_from_slice(&pkt.time_remaining.to_be_bytes());
    buf
}

/// Encode a client->robot packet: 6-byte header plus extended data
///
/// A pending date/timezone takes priority over joystick data; joysticks ride
/// along only after the warmup window so the first packets after a reconnect
/// establish identity and time before input data flows.
pub fn make_client_to_robot_packet(pkt: &ClientToRobotPacket) -> Vec<u8> {
    let control = make_robot_control_code(
        pkt.control_mode,
        pkt.emergency_stopped,
        pkt.robot_enabled,
        pkt.fms_communications,
    );
    let request = make_request_code(pkt.robot_communications, pkt.reboot, pkt.restart_code);

    let mut buf = Vec::with_capacity(64);
    buf.extend_from_slice(&pkt.seq.to_be_bytes());
    buf.push(TAG_GENERAL);
    buf.push(control);
    buf.push(request);
    buf.push(make_station_code(pkt.alliance, pkt.station));

    if let Some(ref date) = pkt.date {
        write_date_block(date, &mut buf);
        let tz = pkt.timezone.as_deref().unwrap_or("UTC");
        write_timezone_block(tz, &mut buf);
    } else if pkt.seq > JOYSTICK_WARMUP_PACKETS {
        for stick in &pkt.joysticks {
            write_joystick_block(stick, &mut buf);
        }
    }

    buf
}

/// Encode a robot->client reply (7 bytes)
pub fn make_robot_to_client_packet(pkt: &RobotToClientPacket) -> Vec<u8> {
    let mut control = make_robot_control_code(
        pkt.control_mode,
        pkt.emergency_stopped,
        pkt.robot_enabled,
        pkt.fms_communications,
    );
    if pkt.robot_code {
        control |= ROBOT_HAS_CODE;
    }
    let (upper, lower) = encode_voltage(pkt.voltage);

    let mut buf = Vec::with_capacity(ROBOT_TO_CLIENT_MIN_SIZE);
    buf.extend_from_slice(&pkt.seq.to_be_bytes());
    buf.push(0x01); // comm version
    buf.push(control);
    buf.push(upper);
    buf.push(lower);
    buf.push(if pkt.request_date { REQUEST_TIME } else { 0x00 });
    buf
}

// ============================================================================
// Readers
// ============================================================================

/// Decode a client->FMS packet; `None` if shorter than 8 bytes
pub fn read_client_to_fms_packet(data: &[u8]) -> Option<ClientToFmsPacket> {
    if data.len() < CLIENT_TO_FMS_MIN_SIZE {
        return None;
    }

    let (control_mode, emergency_stopped, robot_enabled, robot_communications) =
        parse_fms_control_code(data[3]);

    Some(ClientToFmsPacket {
        seq: u16::from_be_bytes([data[0], data[1]]),
        team_number: u16::from_be_bytes([data[4], data[5]]),
        voltage: decode_voltage(data[6], data[7]),
        control_mode,
        emergency_stopped,
        robot_enabled,
        robot_communications,
    })
}

/// Decode an FMS->client packet; `None` if shorter than 22 bytes
pub fn read_fms_to_client_packet(data: &[u8]) -> Option<FmsToClientPacket> {
    if data.len() < FMS_TO_CLIENT_MIN_SIZE {
        return None;
    }

    let (control_mode, emergency_stopped, robot_enabled, robot_communications) =
        parse_fms_control_code(data[3]);
    let (alliance, station) = parse_station_code(data[5]);
    let date = parse_date(&data[10..20])?;

    Some(FmsToClientPacket {
        seq: u16::from_be_bytes([data[0], data[1]]),
        control_mode,
        emergency_stopped,
        robot_enabled,
        robot_communications,
        alliance,
        station,
        tournament_level: data[6],
        match_number: u16::from_be_bytes([data[7], data[8]]),
        time_remaining: u16::from_be_bytes([data[20], data[21]]),
        date,
    })
}

/// Decode a client->robot packet; `None` if shorter than 6 bytes
///
/// Extended blocks after the header are walked until the buffer ends or a
/// block's declared size overruns it; whatever parsed up to that point is
/// kept.
pub fn read_client_to_robot_packet(data: &[u8]) -> Option<ClientToRobotPacket> {
    if data.len() < CLIENT_TO_ROBOT_MIN_SIZE {
        return None;
    }

    let (control_mode, emergency_stopped, robot_enabled, fms_communications) =
        parse_robot_control_code(data[3]);
    let (alliance, station) = parse_station_code(data[5]);
    let request = data[4];
    let (reboot, restart_code) = parse_request_code(request);

    let mut pkt = ClientToRobotPacket {
        seq: u16::from_be_bytes([data[0], data[1]]),
        control_mode,
        emergency_stopped,
        robot_enabled,
        fms_communications,
        robot_communications: request != REQUEST_UNCONNECTED,
        alliance,
        station,
        reboot,
        restart_code,
        joysticks: Vec::new(),
        date: None,
        timezone: None,
    };

    read_extended_data(&data[CLIENT_TO_ROBOT_MIN_SIZE..], &mut pkt);
    Some(pkt)
}

/// Walk `[size] [tag] [payload]` blocks, stopping at the first overrun
fn read_extended_data(buf: &[u8], pkt: &mut ClientToRobotPacket) {
    let mut off = 0;
    while off < buf.len() {
        let size = buf[off] as usize;
        if size == 0 || off + 1 + size > buf.len() {
            break;
        }
        let block = &buf[off + 1..off + 1 + size];
        let (tag, body) = (block[0], &block[1..]);

        match tag {
            TAG_JOYSTICK => {
                if let Some(stick) = parse_joystick_block(body) {
                    pkt.joysticks.push(stick);
                }
            }
            TAG_DATE => pkt.date = parse_date(body),
            TAG_TIMEZONE => {
                pkt.timezone = Some(String::from_utf8_lossy(body).into_owned());
            }
            // CPU/RAM/disk/CAN info blocks are not modeled
            _ => {}
        }

        off += 1 + size;
    }
}

/// Decode a robot->client reply; `None` if shorter than 7 bytes
pub fn read_robot_to_client_packet(data: &[u8]) -> Option<RobotToClientPacket> {
    if data.len() < ROBOT_TO_CLIENT_MIN_SIZE {
        return None;
    }

    let control = data[3];
    let (control_mode, emergency_stopped, robot_enabled, fms_communications) =
        parse_robot_control_code(control);

    Some(RobotToClientPacket {
        seq: u16::from_be_bytes([data[0], data[1]]),
        control_mode,
        emergency_stopped,
        robot_enabled,
        fms_communications,
        robot_code: control & ROBOT_HAS_CODE != 0,
        voltage: decode_voltage(data[4], data[5]),
        request_date: data[6] & REQUEST_TIME != 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_client_to_fms_packet() {
        let pkt = ClientToFmsPacket {
            seq: 0x1234,
            team_number: 1234,
            voltage: 12.5,
            control_mode: ControlMode::Teleoperated,
            emergency_stopped: false,
            robot_enabled: true,
            robot_communications: true,
        };
        // control = enabled (0x04) | comms (0x20) | ping (0x08)
        assert_eq!(
            make_client_to_fms_packet(&pkt),
            [0x12, 0x34, 0x00, 0x2C, 0x04, 0xD2, 12, 50]
        );
    }

    #[test]
    fn test_client_to_fms_round_trip() {
        let pkt = ClientToFmsPacket {
            seq: 9,
            team_number: 9999,
            voltage: 11.25,
            control_mode: ControlMode::Autonomous,
            emergency_stopped: true,
            robot_enabled: false,
            robot_communications: false,
        };
        let decoded = read_client_to_fms_packet(&make_client_to_fms_packet(&pkt)).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn test_fms_to_client_round_trip() {
        let pkt = FmsToClientPacket {
            seq: 77,
            control_mode: ControlMode::Teleoperated,
            emergency_stopped: false,
            robot_enabled: true,
            robot_communications: true,
            alliance: Alliance::Blue,
            station: Station::Station2,
            tournament_level: 2,
            match_number: 42,
            time_remaining: 135,
            date: DateStamp {
                microseconds: 255_000,
                seconds: 42,
                minutes: 15,
                hours: 3,
                day: 2,
                month: 11,
                year: 2017,
            },
        };
        let buf = make_fms_to_client_packet(&pkt);
        assert_eq!(buf.len(), FMS_TO_CLIENT_MIN_SIZE);
        assert_eq!(read_fms_to_client_packet(&buf).unwrap(), pkt);
    }

    #[test]
    fn test_client_to_robot_header() {
        let pkt = ClientToRobotPacket {
            seq: 3,
            control_mode: ControlMode::Test,
            robot_enabled: true,
            robot_communications: true,
            alliance: Alliance::Blue,
            station: Station::Station3,
            ..Default::default()
        };
        let buf = make_client_to_robot_packet(&pkt);
        // seq, TAG_GENERAL, control (test|enabled), request (normal), station
        assert_eq!(buf, [0x00, 0x03, 0x01, 0x05, 0x80, 0x05]);
    }

    #[test]
    fn test_client_to_robot_warmup_omits_joysticks() {
        let stick = JoystickData {
            axes: vec![1.0],
            buttons: vec![true],
            hats: vec![-1],
        };
        let mut pkt = ClientToRobotPacket {
            robot_communications: true,
            joysticks: vec![stick],
            ..Default::default()
        };

        // Through the warmup window the packet stays header-only
        for seq in 0..=JOYSTICK_WARMUP_PACKETS {
            pkt.seq = seq;
            assert_eq!(
                make_client_to_robot_packet(&pkt).len(),
                CLIENT_TO_ROBOT_MIN_SIZE
            );
        }

        // Afterwards joystick blocks are appended
        pkt.seq = JOYSTICK_WARMUP_PACKETS + 1;
        let buf = make_client_to_robot_packet(&pkt);
        assert!(buf.len() > CLIENT_TO_ROBOT_MIN_SIZE);
        let decoded = read_client_to_robot_packet(&buf).unwrap();
        assert_eq!(decoded.joysticks.len(), 1);
        assert!(decoded.date.is_none());
    }

    #[test]
    fn test_client_to_robot_date_takes_priority() {
        let pkt = ClientToRobotPacket {
            seq: 100,
            robot_communications: true,
            joysticks: vec![JoystickData::default()],
            date: Some(DateStamp {
                microseconds: 0,
                seconds: 30,
                minutes: 10,
                hours: 12,
                day: 7,
                month: 7,
                year: 2026,
            }),
            timezone: Some("EST".to_string()),
            ..Default::default()
        };
        let decoded = read_client_to_robot_packet(&make_client_to_robot_packet(&pkt)).unwrap();
        assert!(decoded.joysticks.is_empty());
        assert_eq!(decoded.date, pkt.date);
        assert_eq!(decoded.timezone.as_deref(), Some("EST"));
    }

    #[test]
    fn test_client_to_robot_round_trip() {
        let pkt = ClientToRobotPacket {
            seq: 10,
            control_mode: ControlMode::Autonomous,
            emergency_stopped: false,
            robot_enabled: true,
            fms_communications: true,
            robot_communications: true,
            alliance: Alliance::Red,
            station: Station::Station2,
            reboot: false,
            restart_code: true,
            joysticks: vec![JoystickData {
                axes: vec![0.0, 1.0],
                buttons: vec![true, true, false],
                hats: vec![-1],
            }],
            date: None,
            timezone: None,
        };
        let decoded = read_client_to_robot_packet(&make_client_to_robot_packet(&pkt)).unwrap();
        assert_eq!(decoded.seq, pkt.seq);
        assert_eq!(decoded.control_mode, pkt.control_mode);
        assert_eq!(decoded.restart_code, true);
        assert_eq!(decoded.reboot, false);
        assert_eq!(decoded.alliance, pkt.alliance);
        assert_eq!(decoded.station, pkt.station);
        assert_eq!(decoded.joysticks.len(), 1);
        assert_eq!(decoded.joysticks[0].buttons, pkt.joysticks[0].buttons);
        assert_eq!(decoded.joysticks[0].hats, pkt.joysticks[0].hats);
    }

    #[test]
    fn test_client_to_robot_truncated_extended_data() {
        let mut pkt = ClientToRobotPacket {
            seq: 50,
            robot_communications: true,
            ..Default::default()
        };
        pkt.joysticks = vec![
            JoystickData {
                axes: vec![0.5],
                buttons: vec![true],
                hats: vec![0],
            },
            JoystickData {
                axes: vec![-0.5],
                buttons: vec![false],
                hats: vec![0],
            },
        ];
        let mut buf = make_client_to_robot_packet(&pkt);
        // Cut into the second joystick block
        buf.truncate(buf.len() - 3);

        let decoded = read_client_to_robot_packet(&buf).unwrap();
        assert_eq!(decoded.joysticks.len(), 1);
    }

    #[test]
    fn test_make_robot_to_client_packet() {
        let pkt = RobotToClientPacket {
            seq: 1,
            control_mode: ControlMode::Teleoperated,
            emergency_stopped: false,
            robot_enabled: true,
            fms_communications: false,
            robot_code: true,
            voltage: 12.63,
            request_date: true,
        };
        // control = enabled (0x04) | has code (0x20)
        assert_eq!(
            make_robot_to_client_packet(&pkt),
            [0x00, 0x01, 0x01, 0x24, 12, 63, 0x01]
        );
    }

    #[test]
    fn test_robot_to_client_round_trip() {
        let pkt = RobotToClientPacket {
            seq: 500,
            control_mode: ControlMode::Test,
            emergency_stopped: true,
            robot_enabled: false,
            fms_communications: true,
            robot_code: false,
            voltage: 7.25,
            request_date: false,
        };
        let decoded = read_robot_to_client_packet(&make_robot_to_client_packet(&pkt)).unwrap();
        assert_eq!(decoded, pkt);
    }

    #[test]
    fn test_short_buffers_rejected() {
        assert!(read_client_to_fms_packet(&[0u8; 7]).is_none());
        assert!(read_fms_to_client_packet(&[0u8; 21]).is_none());
        assert!(read_client_to_robot_packet(&[0u8; 5]).is_none());
        assert!(read_robot_to_client_packet(&[0u8; 6]).is_none());
        assert!(read_client_to_fms_packet(&[]).is_none());
    }
}
