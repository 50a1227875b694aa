//! Fi/Di tables and timing math from ISO/IEC 7816-3:2006, section 7.1
//! and tables 7 and 8.
//!
//! One ETU is `F / D` clock cycles. The reader tolerates at most the
//! Waiting Time of inter-byte silence before it considers the card
//! unresponsive; for T=0 that is `WI x 960 x (Fi / f)` ETU, which in
//! divider terms works out to `WI x 960 x (Fi/F) x (Di/D)`.

/// Clock rate conversion integers, indexed by Fi (table 7).
pub const FI_TABLE: [u16; 16] = [
    372, 372, 558, 744, 1116, 1488, 1860, 0,
    0, 512, 768, 1024, 1536, 2048, 0, 0,
];

/// Maximum clock frequency in Hz, indexed by Fi (table 7).
pub const FMAX_TABLE: [u32; 16] = [
    4_000_000, 5_000_000, 6_000_000, 8_000_000,
    12_000_000, 16_000_000, 20_000_000, 0,
    0, 5_000_000, 7_500_000, 10_000_000,
    15_000_000, 20_000_000, 0, 0,
];

/// Baud rate adjustment factors, indexed by Di (table 8).
pub const DI_TABLE: [u8; 16] = [
    0, 1, 2, 4, 8, 16, 32, 64,
    12, 20, 0, 0, 0, 0, 0, 0,
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimingError {
    ZeroWaitingInteger,
    UnsupportedF,
    UnsupportedD,
    ExceedsFi,
    ExceedsDi,
    InvalidIndex,
}

pub fn valid_f(f: u16) -> bool {
    f != 0 && FI_TABLE.contains(&f)
}

pub fn valid_d(d: u8) -> bool {
    d != 0 && DI_TABLE.contains(&d)
}

/// Waiting Time in ETU for the given Waiting Integer and the currently
/// negotiated F/D against the card's advertised Fi/Di.
pub fn calculate_waiting_time(
    wi: u8,
    fi: u16,
    di: u8,
    f: u16,
    d: u8,
) -> Result<u32, TimingError> {
    if wi == 0 {
        return Err(TimingError::ZeroWaitingInteger);
    }
    if !valid_f(fi) || !valid_f(f) {
        return Err(TimingError::UnsupportedF);
    }
    if !valid_d(di) || !valid_d(d) {
        return Err(TimingError::UnsupportedD);
    }
    if f > fi {
        return Err(TimingError::ExceedsFi);
    }
    if d > di {
        return Err(TimingError::ExceedsDi);
    }

    Ok(wi as u32 * 960 * (fi / f) as u32 * (di / d) as u32)
}

/// Integer clocks-per-ETU ratio for the line divider. D indices of 8 and
/// up encode reciprocal adjustment factors, so the ratio multiplies
/// instead of dividing.
pub fn clocks_per_etu(f_index: u8, d_index: u8) -> Result<u16, TimingError> {
    let f = *FI_TABLE
        .get(f_index as usize)
        .ok_or(TimingError::InvalidIndex)?;
    let d = *DI_TABLE
        .get(d_index as usize)
        .ok_or(TimingError::InvalidIndex)?;
    if f == 0 || d == 0 {
        return Err(TimingError::InvalidIndex);
    }
    if d_index < 8 {
        Ok(f / d as u16)
    } else {
        Ok(f * d as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_waiting_time() {
        assert_eq!(calculate_waiting_time(10, 372, 1, 372, 1), Ok(9600));
    }

    #[test]
    fn waiting_time_scales_with_fi() {
        // Fi = 512, F still at the default: twice as many default ETUs fit
        // in the card's advertised bit time, minus integer truncation.
        assert_eq!(calculate_waiting_time(10, 512, 1, 372, 1), Ok(9600));
        assert_eq!(calculate_waiting_time(10, 744, 1, 372, 1), Ok(19200));
    }

    #[test]
    fn waiting_time_rejects_bad_parameters() {
        assert_eq!(
            calculate_waiting_time(0, 372, 1, 372, 1),
            Err(TimingError::ZeroWaitingInteger)
        );
        assert_eq!(
            calculate_waiting_time(10, 372, 1, 373, 1),
            Err(TimingError::UnsupportedF)
        );
        assert_eq!(
            calculate_waiting_time(10, 372, 1, 372, 0),
            Err(TimingError::UnsupportedD)
        );
        assert_eq!(
            calculate_waiting_time(10, 372, 1, 512, 1),
            Err(TimingError::ExceedsFi)
        );
        assert_eq!(
            calculate_waiting_time(10, 372, 1, 372, 2),
            Err(TimingError::ExceedsDi)
        );
    }

    #[test]
    fn clock_ratio() {
        assert_eq!(clocks_per_etu(1, 1), Ok(372));
        assert_eq!(clocks_per_etu(9, 2), Ok(256));
        // reciprocal D factors multiply
        assert_eq!(clocks_per_etu(1, 8), Ok(372 * 12));
        assert_eq!(clocks_per_etu(0, 0), Err(TimingError::InvalidIndex));
        assert_eq!(clocks_per_etu(7, 1), Err(TimingError::InvalidIndex));
    }
}
