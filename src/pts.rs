//! PPS/PTS field sequencing, sparse-buffer serialization and
//! checksumming.
//!
//! A negotiation frame is PTSS, PTS0, then zero to three optional
//! parameter bytes announced by presence bits in PTS0, then PCK. Request
//! and response both live in sparse 6-slot buffers indexed by field, so
//! an absent PTS1 does not shift PTS2.

use heapless::Vec;

pub const PTSS: usize = 0;
pub const PTS0: usize = 1;
pub const PTS1: usize = 2;
pub const PTS2: usize = 3;
pub const PTS3: usize = 4;
pub const PCK: usize = 5;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Field {
    Ptss,
    Pts0,
    Pts1,
    Pts2,
    Pts3,
    Pck,
}

impl Field {
    pub const fn slot(self) -> usize {
        match self {
            Field::Ptss => PTSS,
            Field::Pts0 => PTS0,
            Field::Pts1 => PTS1,
            Field::Pts2 => PTS2,
            Field::Pts3 => PTS3,
            Field::Pck => PCK,
        }
    }
}

/// Optional parameter bytes and the PTS0 bit announcing each, in wire
/// order.
const OPTIONAL: [(u8, Field); 3] = [
    (1 << 4, Field::Pts1),
    (1 << 5, Field::Pts2),
    (1 << 6, Field::Pts3),
];

/// The field following `current`, given the format byte. `None` after
/// PCK: the frame is complete.
pub fn next_field(pts0: u8, current: Field) -> Option<Field> {
    match current {
        Field::Ptss => Some(Field::Pts0),
        Field::Pck => None,
        current => {
            for &(bit, field) in OPTIONAL.iter() {
                if field.slot() > current.slot() && pts0 & bit != 0 {
                    return Some(field);
                }
            }
            Some(Field::Pck)
        }
    }
}

/// Flatten a sparse exchange buffer into the byte sequence that is on
/// the wire.
pub fn serialize(buf: &[u8; 6]) -> Vec<u8, 6> {
    let mut out = Vec::new();
    out.push(buf[PTSS]).ok();
    out.push(buf[PTS0]).ok();
    for &(bit, field) in OPTIONAL.iter() {
        if buf[PTS0] & bit != 0 {
            out.push(buf[field.slot()]).ok();
        }
    }
    out.push(buf[PCK]).ok();
    out
}

/// Exclusive-or over every frame byte except PCK itself.
pub fn checksum(buf: &[u8; 6]) -> u8 {
    let wire = serialize(buf);
    wire[..wire.len() - 1].iter().fold(0, |acc, &b| acc ^ b)
}
