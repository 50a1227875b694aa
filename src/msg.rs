//! Host-link message framing.
//!
//! Every frame starts with a fixed 8-byte header: message class, message
//! type, sequence number, slot number, two reserved bytes, and the total
//! frame length including the header as a little-endian u16. A
//! type-specific payload follows. Multi-byte payload fields are
//! little-endian throughout.

use heapless::Vec;

/// Fixed message header length.
pub const HEADER_LEN: usize = 8;

/// A fully framed message: header plus the largest data payload.
pub type Frame = Vec<u8, 280>;

/// Payload of a single data message in either direction.
pub type Data = Vec<u8, 256>;

/// Message classes.
pub mod class {
    pub const GENERIC: u8 = 0;
    pub const CARDEM: u8 = 1;
}

/// Message types within the card-emulation class.
pub mod cardem {
    /// host -> card: data to transmit toward the reader
    pub const TX_DATA: u8 = 1;
    /// host -> card: ATR to return at the next reset
    pub const SET_ATR: u8 = 2;
    /// both directions: cumulative counters (empty payload = request)
    pub const STATS: u8 = 3;
    /// both directions: signal/timing status (empty payload = request)
    pub const STATUS: u8 = 4;
    /// host -> card: simulated card insert/remove
    pub const CARD_INSERT: u8 = 5;
    /// card -> host: data received from the reader
    pub const RX_DATA: u8 = 6;
    /// card -> host: completed PPS exchange (diagnostic)
    pub const PTS_INFO: u8 = 7;
    /// host -> card: runtime configuration
    pub const CONFIG: u8 = 8;
}

/// Flags carried by data messages in either direction.
pub mod data_flags {
    /// payload is the 5-byte TPDU header
    pub const TPDU_HDR: u32 = 1 << 0;
    /// last part of the transfer in this direction
    pub const FINAL: u32 = 1 << 1;
    /// first byte is a procedure byte; continue transmitting afterwards
    pub const PB_AND_TX: u32 = 1 << 2;
    /// first byte is a procedure byte; continue receiving afterwards
    pub const PB_AND_RX: u32 = 1 << 3;
}

/// Flags carried by the status message.
pub mod status_flags {
    pub const VCC_PRESENT: u32 = 1 << 0;
    pub const CLK_ACTIVE: u32 = 1 << 1;
    pub const CARD_INSERT: u32 = 1 << 3;
    pub const RESET_ACTIVE: u32 = 1 << 4;
}

/// Feature flags of the configuration message.
pub mod feature {
    /// push a status message whenever a card I/O signal changes
    pub const STATUS_ON_SIGNAL: u32 = 1 << 0;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub class: u8,
    pub msg_type: u8,
    pub seq: u8,
    pub slot: u8,
    pub len: u16,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub flags: u32,
    pub voltage_mv: u16,
    pub f_index: u8,
    pub d_index: u8,
    pub wi: u8,
    pub waiting_time: u32,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub tx_bytes: u32,
    pub rx_bytes: u32,
    pub pps: u32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub features: u32,
    pub slot_mux: u8,
    pub presence_polarity: u8,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CardemMessage {
    /// host -> card: bytes to put on the wire toward the reader
    TxData { flags: u32, data: Data },
    /// card -> host: bytes captured from the reader
    RxData { flags: u32, data: Data },
    SetAtr { atr: Data },
    CardInsert { inserted: bool },
    StatusRequest,
    Status(Status),
    StatsRequest,
    Stats(Stats),
    PtsInfo { len: u8, req: [u8; 6], resp: [u8; 6] },
    Config(Config),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    Short,
    Malformed,
    UnknownClass(u8),
    UnknownType(u8),
}

impl CardemMessage {
    pub fn msg_type(&self) -> u8 {
        match self {
            CardemMessage::TxData { .. } => cardem::TX_DATA,
            CardemMessage::RxData { .. } => cardem::RX_DATA,
            CardemMessage::SetAtr { .. } => cardem::SET_ATR,
            CardemMessage::CardInsert { .. } => cardem::CARD_INSERT,
            CardemMessage::StatusRequest | CardemMessage::Status(_) => cardem::STATUS,
            CardemMessage::StatsRequest | CardemMessage::Stats(_) => cardem::STATS,
            CardemMessage::PtsInfo { .. } => cardem::PTS_INFO,
            CardemMessage::Config(_) => cardem::CONFIG,
        }
    }

    /// Frame the message for the wire.
    pub fn encode(&self, seq: u8, slot: u8) -> Frame {
        let mut out = Frame::new();
        out.extend_from_slice(&[
            class::CARDEM,
            self.msg_type(),
            seq,
            slot,
            0,
            0,
            0, // length, patched below
            0,
        ])
        .ok();

        match self {
            CardemMessage::TxData { flags, data } | CardemMessage::RxData { flags, data } => {
                out.extend_from_slice(&flags.to_le_bytes()).ok();
                out.extend_from_slice(&(data.len() as u16).to_le_bytes()).ok();
                out.extend_from_slice(data).ok();
            }
            CardemMessage::SetAtr { atr } => {
                out.push(atr.len() as u8).ok();
                out.extend_from_slice(atr).ok();
            }
            CardemMessage::CardInsert { inserted } => {
                out.push(*inserted as u8).ok();
            }
            CardemMessage::StatusRequest | CardemMessage::StatsRequest => {}
            CardemMessage::Status(status) => {
                out.extend_from_slice(&status.flags.to_le_bytes()).ok();
                out.extend_from_slice(&status.voltage_mv.to_le_bytes()).ok();
                out.push(status.f_index).ok();
                out.push(status.d_index).ok();
                out.push(status.wi).ok();
                out.extend_from_slice(&status.waiting_time.to_le_bytes()).ok();
            }
            CardemMessage::Stats(stats) => {
                out.extend_from_slice(&stats.tx_bytes.to_le_bytes()).ok();
                out.extend_from_slice(&stats.rx_bytes.to_le_bytes()).ok();
                out.extend_from_slice(&stats.pps.to_le_bytes()).ok();
            }
            CardemMessage::PtsInfo { len, req, resp } => {
                out.push(*len).ok();
                out.extend_from_slice(req).ok();
                out.extend_from_slice(resp).ok();
            }
            CardemMessage::Config(config) => {
                out.extend_from_slice(&config.features.to_le_bytes()).ok();
                out.push(config.slot_mux).ok();
                out.push(config.presence_polarity).ok();
            }
        }

        let len = (out.len() as u16).to_le_bytes();
        out[6] = len[0];
        out[7] = len[1];
        out
    }
}

fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn parse_data(payload: &[u8]) -> Result<(u32, Data), ParseError> {
    if payload.len() < 6 {
        return Err(ParseError::Malformed);
    }
    let flags = read_u32(&payload[0..4]);
    let data_len = read_u16(&payload[4..6]) as usize;
    if payload.len() < 6 + data_len {
        return Err(ParseError::Malformed);
    }
    let mut data = Data::new();
    data.extend_from_slice(&payload[6..6 + data_len])
        .map_err(|_| ParseError::Malformed)?;
    Ok((flags, data))
}

/// Parse one frame from the start of `raw`. `raw` may extend beyond the
/// frame; the header length says where this frame ends.
pub fn parse(raw: &[u8]) -> Result<(Header, CardemMessage), ParseError> {
    if raw.len() < HEADER_LEN {
        return Err(ParseError::Short);
    }
    let header = Header {
        class: raw[0],
        msg_type: raw[1],
        seq: raw[2],
        slot: raw[3],
        len: read_u16(&raw[6..8]),
    };
    let len = header.len as usize;
    if len < HEADER_LEN {
        return Err(ParseError::Malformed);
    }
    if raw.len() < len {
        return Err(ParseError::Short);
    }
    if header.class != class::CARDEM {
        return Err(ParseError::UnknownClass(header.class));
    }
    let payload = &raw[HEADER_LEN..len];

    let message = match header.msg_type {
        cardem::TX_DATA => {
            let (flags, data) = parse_data(payload)?;
            CardemMessage::TxData { flags, data }
        }
        cardem::RX_DATA => {
            let (flags, data) = parse_data(payload)?;
            CardemMessage::RxData { flags, data }
        }
        cardem::SET_ATR => {
            if payload.is_empty() {
                return Err(ParseError::Malformed);
            }
            let atr_len = payload[0] as usize;
            if payload.len() < 1 + atr_len {
                return Err(ParseError::Malformed);
            }
            let mut atr = Data::new();
            atr.extend_from_slice(&payload[1..1 + atr_len])
                .map_err(|_| ParseError::Malformed)?;
            CardemMessage::SetAtr { atr }
        }
        cardem::CARD_INSERT => {
            if payload.len() != 1 {
                return Err(ParseError::Malformed);
            }
            CardemMessage::CardInsert {
                inserted: payload[0] != 0,
            }
        }
        cardem::STATUS => {
            if payload.is_empty() {
                CardemMessage::StatusRequest
            } else if payload.len() == 13 {
                CardemMessage::Status(Status {
                    flags: read_u32(&payload[0..4]),
                    voltage_mv: read_u16(&payload[4..6]),
                    f_index: payload[6],
                    d_index: payload[7],
                    wi: payload[8],
                    waiting_time: read_u32(&payload[9..13]),
                })
            } else {
                return Err(ParseError::Malformed);
            }
        }
        cardem::STATS => {
            if payload.is_empty() {
                CardemMessage::StatsRequest
            } else if payload.len() == 12 {
                CardemMessage::Stats(Stats {
                    tx_bytes: read_u32(&payload[0..4]),
                    rx_bytes: read_u32(&payload[4..8]),
                    pps: read_u32(&payload[8..12]),
                })
            } else {
                return Err(ParseError::Malformed);
            }
        }
        cardem::PTS_INFO => {
            if payload.len() != 13 {
                return Err(ParseError::Malformed);
            }
            let mut req = [0u8; 6];
            let mut resp = [0u8; 6];
            req.copy_from_slice(&payload[1..7]);
            resp.copy_from_slice(&payload[7..13]);
            CardemMessage::PtsInfo {
                len: payload[0],
                req,
                resp,
            }
        }
        cardem::CONFIG => {
            if payload.len() != 6 {
                return Err(ParseError::Malformed);
            }
            CardemMessage::Config(Config {
                features: read_u32(&payload[0..4]),
                slot_mux: payload[4],
                presence_polarity: payload[5],
            })
        }
        other => return Err(ParseError::UnknownType(other)),
    };

    Ok((header, message))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data(bytes: &[u8]) -> Data {
        let mut d = Data::new();
        d.extend_from_slice(bytes).unwrap();
        d
    }

    #[test]
    fn header_frame_is_bit_exact() {
        let msg = CardemMessage::RxData {
            flags: data_flags::TPDU_HDR,
            data: data(&[0xA0, 0xA4, 0x00, 0x00, 0x00]),
        };
        let frame = msg.encode(7, 1);
        assert_eq!(
            &frame[..],
            &[
                1, 6, 7, 1, 0, 0, 19, 0, // header, len = 8 + 4 + 2 + 5
                1, 0, 0, 0, // flags
                5, 0, // data length
                0xA0, 0xA4, 0x00, 0x00, 0x00,
            ]
        );
    }

    #[test]
    fn tx_data_parses_back() {
        let msg = CardemMessage::TxData {
            flags: data_flags::FINAL | data_flags::PB_AND_RX,
            data: data(&[0xD2]),
        };
        let frame = msg.encode(0, 0);
        let (header, parsed) = parse(&frame).unwrap();
        assert_eq!(header.msg_type, cardem::TX_DATA);
        assert_eq!(header.len as usize, frame.len());
        assert_eq!(parsed, msg);
    }

    #[test]
    fn status_parses_back() {
        let status = Status {
            flags: status_flags::VCC_PRESENT | status_flags::CLK_ACTIVE,
            voltage_mv: 3300,
            f_index: 1,
            d_index: 1,
            wi: 10,
            waiting_time: 9600,
        };
        let frame = CardemMessage::Status(status).encode(1, 0);
        assert_eq!(frame.len(), HEADER_LEN + 13);
        let (_, parsed) = parse(&frame).unwrap();
        assert_eq!(parsed, CardemMessage::Status(status));
    }

    #[test]
    fn empty_status_payload_is_a_request() {
        let frame = CardemMessage::StatusRequest.encode(0, 1);
        assert_eq!(frame.len(), HEADER_LEN);
        let (header, parsed) = parse(&frame).unwrap();
        assert_eq!(header.slot, 1);
        assert_eq!(parsed, CardemMessage::StatusRequest);
    }

    #[test]
    fn rejects_truncated_and_unknown_frames() {
        assert_eq!(parse(&[1, 1, 0]), Err(ParseError::Short));
        // header announcing more than was received
        assert_eq!(
            parse(&[1, 1, 0, 0, 0, 0, 20, 0]),
            Err(ParseError::Short)
        );
        assert_eq!(
            parse(&[1, 99, 0, 0, 0, 0, 8, 0]),
            Err(ParseError::UnknownType(99))
        );
        assert_eq!(
            parse(&[9, 1, 0, 0, 0, 0, 8, 0]),
            Err(ParseError::UnknownClass(9))
        );
    }
}
