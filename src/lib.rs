//! ISO 7816-3 state machine for the card side.
//!
//! This crate implements the protocol engine of a SIM card emulator: it
//! plays the card's role toward a reader (ATR, PPS/PTS negotiation, T=0
//! TPDU exchange) one byte at a time, while relaying command and data
//! frames to a host process over a message-oriented channel.
//!
//! The engine is fully non-blocking. Hardware is reached exclusively
//! through the capability traits in [`traits`]: a byte-oriented serial
//! port toward the reader, an ETU-counting waiting-time timer, and a
//! framed host channel. The embedding firmware owns each [`CardSession`]
//! as a resource and serializes interrupt-level and main-loop access to
//! it; all state lives behind `&mut self`, so a byte-arrival callback and
//! a timer-expiry callback can never interleave their edits.

#![cfg_attr(not(feature = "std"), no_std)]

#[macro_use]
extern crate delog;
generate_macros!();

pub mod atr;
pub mod constants;
pub mod iso7816;
pub mod manager;
pub mod msg;
pub mod pts;
pub mod session;
pub mod traits;

pub use manager::SessionManager;
pub use session::CardSession;
