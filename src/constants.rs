//! ISO 7816-3 protocol constants.

/// TS plus up to 32 interface/historical characters.
pub const ATR_LEN_MAX: usize = 1 + 32;

/// Waiting Integer in force when the ATR carries no TC2.
pub const DEFAULT_WI: u8 = 10;

/// Waiting time directly after reset, in ETU.
pub const INITIAL_WAITING_TIME: u32 = 9600;

/// NULL procedure byte, sent to make the reader keep waiting.
pub const PB_NULL: u8 = 0x60;

/// PPSS lead byte; in `WaitTpdu` this marks the start of a negotiation.
pub const PPS_MARKER: u8 = 0xFF;

/// Clock rate conversion integer in force directly after reset (Fd).
pub const DEFAULT_F: u16 = 372;
/// Baud rate adjustment factor in force directly after reset (Dd).
pub const DEFAULT_D: u8 = 1;

/// Table index of `DEFAULT_F` in ISO 7816-3 table 7.
pub const DEFAULT_F_INDEX: u8 = 1;
/// Table index of `DEFAULT_D` in ISO 7816-3 table 8.
pub const DEFAULT_D_INDEX: u8 = 1;

/// CLA, INS, P1, P2, P3.
pub const TPDU_HDR_LEN: usize = 5;

/// Physical card slots driven by one device.
pub const NUM_SLOTS: usize = 2;
