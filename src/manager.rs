//! Slot registry and host-to-card message dispatch.
//!
//! The transport hands received frames to [`SessionManager::dispatch_buffer`];
//! the manager parses, routes by slot number and applies each message to
//! the addressed session or to the board as a whole.

use heapless::Vec;

use crate::msg::{self, CardemMessage, ParseError};
use crate::session::CardSession;
use crate::traits::{BoardControl, BytePort, HostPort, WaitingTimer};

/// Returned by [`SessionManager::register`] when all slots are taken.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SlotsFull;

pub struct SessionManager<P, T, H, B>
where
    P: BytePort,
    T: WaitingTimer,
    H: HostPort,
    B: BoardControl,
{
    slots: Vec<CardSession<P, T, H>, 2>,
    board: B,
}

impl<P, T, H, B> SessionManager<P, T, H, B>
where
    P: BytePort,
    T: WaitingTimer,
    H: HostPort,
    B: BoardControl,
{
    pub fn new(board: B) -> Self {
        Self {
            slots: Vec::new(),
            board,
        }
    }

    pub fn register(&mut self, session: CardSession<P, T, H>) -> Result<(), SlotsFull> {
        self.slots.push(session).map_err(|_| SlotsFull)
    }

    pub fn slot_mut(&mut self, slot: u8) -> Option<&mut CardSession<P, T, H>> {
        self.slots.iter_mut().find(|s| s.slot() == slot)
    }

    pub fn board_mut(&mut self) -> &mut B {
        &mut self.board
    }

    /// Parse and apply the frame at the start of `raw`; returns how many
    /// bytes the frame occupied.
    pub fn dispatch_frame(&mut self, raw: &[u8]) -> Result<usize, ParseError> {
        let (header, message) = msg::parse(raw)?;
        debug!(
            "host frame type {} seq {} slot {}",
            header.msg_type, header.seq, header.slot
        );
        self.apply(header.slot, message);
        Ok(header.len as usize)
    }

    /// Drain a receive buffer that may hold several back-to-back frames.
    /// Frames of an unknown class or type are skipped individually, since
    /// their framing is still intact; anything else unparsable drops the
    /// rest of the buffer.
    pub fn dispatch_buffer(&mut self, mut raw: &[u8]) {
        while !raw.is_empty() {
            match self.dispatch_frame(raw) {
                Ok(consumed) => raw = &raw[consumed..],
                Err(e @ ParseError::UnknownClass(_)) | Err(e @ ParseError::UnknownType(_)) => {
                    // the length field was validated before the class/type
                    let len = u16::from_le_bytes([raw[6], raw[7]]) as usize;
                    warn!("skipping unhandled {} byte frame: {:?}", len, e);
                    raw = &raw[len..];
                }
                Err(e) => {
                    warn!("dropping {} unparsed host bytes: {:?}", raw.len(), e);
                    return;
                }
            }
        }
    }

    fn apply(&mut self, slot: u8, message: CardemMessage) {
        // board-level parts first; Config also carries per-slot features
        if let CardemMessage::Config(ref config) = message {
            self.board.select_slot_mux(config.slot_mux);
            self.board.set_presence_polarity(config.presence_polarity != 0);
        }
        if let CardemMessage::CardInsert { inserted } = message {
            self.board.set_card_insert(slot, inserted);
        }

        let session = match self.slot_mut(slot) {
            Some(session) => session,
            None => {
                warn!("message for unknown slot {}", slot);
                return;
            }
        };

        match message {
            CardemMessage::TxData { flags, data } => {
                session.enqueue_tx(flags, data);
                session.have_new_tx();
            }
            CardemMessage::SetAtr { atr } => {
                session.set_atr(&atr).ok();
            }
            CardemMessage::CardInsert { inserted } => {
                session.set_card_inserted(inserted);
            }
            CardemMessage::StatusRequest => session.report_status(),
            CardemMessage::StatsRequest => session.report_stats(),
            CardemMessage::Config(config) => session.set_config(&config),
            // card-to-host types have no business arriving here
            CardemMessage::RxData { .. }
            | CardemMessage::Status(_)
            | CardemMessage::Stats(_)
            | CardemMessage::PtsInfo { .. } => {
                warn!("unexpected card-to-host message for slot {}", slot);
            }
        }
    }
}
