//! Interface-byte walk over a configured Answer-To-Reset.
//!
//! Interface bytes follow T0 in TA/TB/TC/TD order, each present only if
//! its bit in the preceding Y nibble is set. The walk here is an explicit
//! loop over those (presence bit, position) pairs; the only byte this
//! engine cares about is TC2, which carries the Waiting Integer.

const TA: u8 = 0x10;
const TB: u8 = 0x20;
const TC: u8 = 0x40;
const TD: u8 = 0x80;

/// Extract the Waiting Integer (TC2) from an ATR, if present and
/// non-zero.
pub fn waiting_integer(atr: &[u8]) -> Option<u8> {
    if atr.len() < 2 {
        return None;
    }
    let y1 = atr[1] & 0xf0;
    if y1 == 0 {
        return None;
    }

    // position of TD1: byte 2 plus one for each earlier interface byte
    let mut td1_pos = 2;
    for &bit in [TA, TB, TC].iter() {
        if y1 & bit != 0 {
            td1_pos += 1;
        }
    }
    if y1 & TD == 0 {
        return None;
    }

    let y2 = atr.get(td1_pos)? & 0xf0;
    if y2 == 0 {
        return None;
    }
    let mut tc2_pos = td1_pos + 1;
    for &bit in [TA, TB].iter() {
        if y2 & bit != 0 {
            tc2_pos += 1;
        }
    }
    if y2 & TC == 0 {
        return None;
    }

    match atr.get(tc2_pos) {
        Some(&wi) if wi != 0 => Some(wi),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shortest_atr_has_no_wi() {
        assert_eq!(waiting_integer(&[0x3B, 0x00]), None);
    }

    #[test]
    fn tc2_only() {
        // TD1 present, Y2 announces only TC2
        assert_eq!(waiting_integer(&[0x3B, 0x80, 0x40, 0x14]), Some(0x14));
    }

    #[test]
    fn tc2_behind_earlier_interface_bytes() {
        // TA1 + TD1 in round 1, TA2 + TC2 in round 2
        let atr = [0x3B, 0x90, 0x11, 0x50, 0x00, 0x25];
        assert_eq!(waiting_integer(&atr), Some(0x25));
    }

    #[test]
    fn zero_tc2_keeps_the_default() {
        assert_eq!(waiting_integer(&[0x3B, 0x80, 0x40, 0x00]), None);
    }

    #[test]
    fn truncated_atr_is_tolerated() {
        // TD1 announces TC2 but the byte is missing
        assert_eq!(waiting_integer(&[0x3B, 0x80, 0x40]), None);
        assert_eq!(waiting_integer(&[0x3B, 0x80]), None);
        assert_eq!(waiting_integer(&[0x3B]), None);
    }

    #[test]
    fn no_second_round_without_td1() {
        // TA1/TB1/TC1 present but no TD1
        assert_eq!(waiting_integer(&[0x3B, 0x70, 0x11, 0x22, 0x33]), None);
    }
}
