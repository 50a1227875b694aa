//! Capability seams between the protocol engine and its collaborators.
//!
//! The engine never touches hardware registers; the embedding firmware
//! injects implementations of these traits at session construction.

use crate::msg::CardemMessage;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    None,
    Transmit,
    Receive,
}

/// Byte-oriented serial transport toward the reader.
///
/// Directions are mutually exclusive; enabling one implicitly disables
/// the other (both may momentarily be on during a direction handover).
/// `transmit` is best-effort and assumed to succeed once the transport
/// has reported transmit-ready by calling into
/// [`CardSession::transmit_byte`](crate::session::CardSession::transmit_byte).
pub trait BytePort {
    fn enable(&mut self, direction: Direction);

    fn transmit(&mut self, byte: u8);

    /// Apply a newly negotiated F/D ratio to the physical line.
    fn update_clock_ratio(&mut self, clocks_per_etu: u16);

    /// Synchronous drain of the transmit shift register. Used only at
    /// the negotiation-response direction handover.
    fn wait_until_idle(&mut self);
}

/// ETU-counting waiting-time timer.
///
/// Once armed, the timer counts ETUs of line silence and calls
/// `half_expired` on the session at half the configured count and
/// `fully_expired` at the full count, after which it auto-disarms. An
/// edge on the I/O line restarts the count at zero without touching the
/// configuration (`restart` exposes the same operation to software).
pub trait WaitingTimer {
    fn set_etu_length(&mut self, clocks_per_etu: u16);

    fn set_wait_etus(&mut self, etus: u32);

    fn arm(&mut self);

    fn disarm(&mut self);

    fn restart(&mut self);
}

/// Device-to-host message channel. The implementation frames the message
/// (see [`msg`](crate::msg)) and hands it to the transport; it must not
/// block.
pub trait HostPort {
    fn submit(&mut self, slot: u8, msg: CardemMessage);
}

/// Board-level operations triggered by host messages but outside the
/// per-slot protocol state: simulated card-insert contact, external slot
/// multiplexer, presence-contact polarity.
pub trait BoardControl {
    fn set_card_insert(&mut self, slot: u8, inserted: bool);

    fn select_slot_mux(&mut self, index: u8);

    fn set_presence_polarity(&mut self, inverted: bool);
}
