//! Per-slot card session: the top-level ISO 7816-3 state machine and its
//! ATR, PPS and TPDU sub-engines.
//!
//! Events arrive one at a time: a received byte, a transmit-ready poll,
//! a timer expiry, a card I/O signal change, or a host message. Each is
//! a `&mut self` method; the embedding serializes the calling contexts.

use heapless::{spsc::Queue, Vec};

use crate::atr;
use crate::constants::*;
use crate::iso7816;
use crate::msg::{self, data_flags, feature, status_flags, CardemMessage};
use crate::pts;
use crate::traits::{BytePort, Direction, HostPort, WaitingTimer};

/// Card I/O signal lines, as seen by the card.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    Vcc,
    Clock,
    Reset,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum CardState {
    /// waiting for power being applied
    WaitPower,
    /// waiting for clock being applied
    WaitClock,
    /// waiting for reset being released
    WaitReset,
    /// reset released, waiting out the pre-ATR window
    WaitAtr,
    /// transmitting the ATR to the reader
    InAtr,
    /// inside a PPS negotiation
    InPts,
    /// waiting for a TPDU from the reader
    WaitTpdu,
    /// inside a TPDU
    InTpdu,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TpduState {
    WaitCla,
    WaitIns,
    WaitP1,
    WaitP2,
    WaitP3,
    /// header complete, waiting to transmit the procedure byte
    WaitProcedureByte,
    /// waiting for body data from the reader
    WaitRx,
    /// waiting for more data to transmit to the reader
    WaitTx,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum PtsDir {
    Request,
    Response,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct PtsState {
    dir: PtsDir,
    field: pts::Field,
}

impl PtsState {
    const fn request_start() -> Self {
        Self {
            dir: PtsDir::Request,
            field: pts::Field::Ptss,
        }
    }

    const fn response_start() -> Self {
        Self {
            dir: PtsDir::Response,
            field: pts::Field::Ptss,
        }
    }
}

/// Data direction of a TPDU body.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum DataDirection {
    ReaderToCard,
    CardToReader,
}

/// Number of body bytes announced by P3, per ISO 7816-3 section 10.3.2.
pub fn expected_data_bytes(p3: u8, direction: DataDirection) -> usize {
    match direction {
        DataDirection::ReaderToCard => p3 as usize,
        DataDirection::CardToReader => {
            if p3 == 0 {
                256
            } else {
                p3 as usize
            }
        }
    }
}

/// Capacity of one inbound (reader-to-host) data message. Larger bodies
/// chunk across several messages; only the last carries the final flag.
pub const RX_DATA_CAPACITY: usize = 64;

struct RxMessage {
    flags: u32,
    data: Vec<u8, 64>,
}

/// One host-supplied message pending transmission toward the reader.
struct TxMessage {
    flags: u32,
    data: msg::Data,
    cursor: usize,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub tx_bytes: u32,
    pub rx_bytes: u32,
    pub pps: u32,
}

/// Returned by [`CardSession::set_atr`] when the sequence does not fit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AtrTooLong;

pub struct CardSession<P, T, H>
where
    P: BytePort,
    T: WaitingTimer,
    H: HostPort,
{
    slot: u8,
    state: CardState,

    vcc_present: bool,
    clock_active: bool,
    reset_active: bool,
    card_inserted: bool,
    voltage_mv: u16,

    /// table indices of the negotiated F/D, reported in status messages
    f_index: u8,
    d_index: u8,
    /// negotiated values currently in force
    f: u16,
    d: u8,
    /// maxima advertised by the card (TA1 territory)
    fi: u16,
    di: u8,
    wi: u8,
    waiting_time: u32,

    atr: Vec<u8, 33>,
    atr_cursor: usize,

    pts: PtsState,
    pts_req: [u8; 6],
    pts_resp: [u8; 6],

    tpdu: TpduState,
    header: [u8; TPDU_HDR_LEN],
    /// body bytes seen so far in the current transaction, across chunks
    rx_received: usize,

    rx_msg: Option<RxMessage>,
    tx_msg: Option<TxMessage>,
    tx_queue: Queue<TxMessage, 5>,

    features: u32,
    counters: Counters,

    port: P,
    timer: T,
    host: H,
}

impl<P, T, H> CardSession<P, T, H>
where
    P: BytePort,
    T: WaitingTimer,
    H: HostPort,
{
    pub fn new(slot: u8, port: P, timer: T, host: H) -> Self {
        let mut atr = Vec::new();
        // shortest ATR possible: default speed, no options
        atr.extend_from_slice(&[0x3B, 0x00]).ok();

        Self {
            slot,
            state: CardState::WaitPower,
            vcc_present: false,
            clock_active: false,
            reset_active: true,
            card_inserted: false,
            voltage_mv: 0,
            f_index: DEFAULT_F_INDEX,
            d_index: DEFAULT_D_INDEX,
            f: DEFAULT_F,
            d: DEFAULT_D,
            fi: DEFAULT_F,
            di: DEFAULT_D,
            wi: DEFAULT_WI,
            waiting_time: INITIAL_WAITING_TIME,
            atr,
            atr_cursor: 0,
            pts: PtsState::request_start(),
            pts_req: [0; 6],
            pts_resp: [0; 6],
            tpdu: TpduState::WaitCla,
            header: [0; TPDU_HDR_LEN],
            rx_received: 0,
            rx_msg: None,
            tx_msg: None,
            tx_queue: Queue::new(),
            features: 0,
            counters: Counters::default(),
            port,
            timer,
            host,
        }
    }

    pub fn slot(&self) -> u8 {
        self.slot
    }

    pub fn state(&self) -> CardState {
        self.state
    }

    pub fn tpdu_state(&self) -> TpduState {
        self.tpdu
    }

    pub fn f_index(&self) -> u8 {
        self.f_index
    }

    pub fn d_index(&self) -> u8 {
        self.d_index
    }

    pub fn wi(&self) -> u8 {
        self.wi
    }

    pub fn waiting_time(&self) -> u32 {
        self.waiting_time
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn set_voltage_mv(&mut self, voltage_mv: u16) {
        self.voltage_mv = voltage_mv;
    }

    pub fn set_card_inserted(&mut self, inserted: bool) {
        self.card_inserted = inserted;
    }

    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    /// Replace the configured ATR and reset its cursor. Meant to be
    /// called between reset cycles.
    pub fn set_atr(&mut self, bytes: &[u8]) -> Result<(), AtrTooLong> {
        if bytes.len() > ATR_LEN_MAX {
            warn!("{}: ATR of {} bytes rejected", self.slot, bytes.len());
            return Err(AtrTooLong);
        }
        self.atr.clear();
        self.atr.extend_from_slice(bytes).ok();
        self.atr_cursor = 0;
        Ok(())
    }

    pub fn set_config(&mut self, config: &msg::Config) {
        self.features = config.features;
    }

    /// Hardware notifies us that a card I/O signal changed level.
    pub fn signal_changed(&mut self, signal: Signal, active: bool) {
        let before = self.state;
        match signal {
            Signal::Vcc => {
                if !active && self.vcc_present {
                    info!("{}: VCC deactivated", self.slot);
                    self.set_state(CardState::WaitPower);
                } else if active && !self.vcc_present {
                    info!("{}: VCC activated", self.slot);
                    self.set_state(CardState::WaitClock);
                }
                self.vcc_present = active;
            }
            Signal::Clock => {
                if active && !self.clock_active {
                    info!("{}: CLK activated", self.slot);
                    if self.state == CardState::WaitClock {
                        self.set_state(CardState::WaitReset);
                    }
                } else if !active && self.clock_active {
                    info!("{}: CLK deactivated", self.slot);
                }
                self.clock_active = active;
            }
            Signal::Reset => {
                if !active && self.reset_active {
                    info!("{}: RST released", self.slot);
                    if self.vcc_present
                        && self.clock_active
                        && self.state == CardState::WaitReset
                    {
                        self.set_state(CardState::WaitAtr);
                    }
                } else if active && !self.reset_active {
                    info!("{}: RST asserted", self.slot);
                    self.set_state(CardState::WaitReset);
                }
                self.reset_active = active;
            }
        }

        if self.state != before && self.features & feature::STATUS_ON_SIGNAL != 0 {
            self.report_status();
        }
    }

    /// Process a single byte received from the reader.
    pub fn receive_byte(&mut self, byte: u8) {
        self.counters.rx_bytes = self.counters.rx_bytes.wrapping_add(1);

        let new_state = match self.state {
            CardState::WaitTpdu if byte == PPS_MARKER => {
                self.counters.pps = self.counters.pps.wrapping_add(1);
                self.process_pts_byte(byte)
            }
            CardState::WaitTpdu | CardState::InTpdu => Some(self.process_tpdu_byte(byte)),
            CardState::InPts => self.process_pts_byte(byte),
            state => {
                // during the ATR the card is the one transmitting
                warn!("{}: byte {:02x} received in state {:?}", self.slot, byte, state);
                None
            }
        };

        if let Some(state) = new_state {
            self.set_state(state);
        }
    }

    /// Produce the next byte toward the reader, if any. The byte is also
    /// handed to the port; `None` means the caller should disable
    /// transmit-ready notifications.
    pub fn transmit_byte(&mut self) -> Option<u8> {
        let byte = match self.state {
            CardState::InAtr => self.transmit_atr_byte(),
            CardState::InPts => self.transmit_pts_byte(),
            CardState::InTpdu => self.transmit_tpdu_byte(),
            _ => None,
        };
        if byte.is_some() {
            self.counters.tx_bytes = self.counters.tx_bytes.wrapping_add(1);
        }
        byte
    }

    /// The host queued new transmit data; re-enable transmit if the TPDU
    /// sub-engine was starved waiting for it.
    pub fn have_new_tx(&mut self) {
        if self.state == CardState::InTpdu {
            match self.tpdu {
                TpduState::WaitTx | TpduState::WaitProcedureByte => {
                    self.port.enable(Direction::Transmit);
                }
                _ => {}
            }
        }
    }

    /// Queue a host-supplied data message for transmission, evicting the
    /// oldest queued message if the queue is full.
    pub fn enqueue_tx(&mut self, flags: u32, data: msg::Data) {
        let message = TxMessage {
            flags,
            data,
            cursor: 0,
        };
        if let Err(rejected) = self.tx_queue.enqueue(message) {
            warn!("{}: tx queue full, evicting oldest message", self.slot);
            self.tx_queue.dequeue();
            self.tx_queue.enqueue(rejected).ok();
        }
    }

    /// Half the waiting time has elapsed without a byte on the wire.
    pub fn half_expired(&mut self) {
        if self.state == CardState::InTpdu {
            match self.tpdu {
                TpduState::WaitTx | TpduState::WaitProcedureByte => {
                    // host has not answered yet; ask the reader for more time
                    debug!("{}: waiting time half expired, sending NULL", self.slot);
                    self.port.transmit(PB_NULL);
                    self.timer.restart();
                }
                _ => {}
            }
        }
    }

    /// The full waiting time has elapsed.
    pub fn fully_expired(&mut self) {
        match self.state {
            // the post-reset window has passed, the ATR may start
            CardState::WaitAtr => self.set_state(CardState::InAtr),
            state => {
                warn!("{}: waiting time expired in state {:?}", self.slot, state);
            }
        }
    }

    /// Report signal levels and timing parameters to the host.
    pub fn report_status(&mut self) {
        let mut flags = 0;
        if self.vcc_present {
            flags |= status_flags::VCC_PRESENT;
        }
        if self.clock_active {
            flags |= status_flags::CLK_ACTIVE;
        }
        if self.reset_active {
            flags |= status_flags::RESET_ACTIVE;
        }
        if self.card_inserted {
            flags |= status_flags::CARD_INSERT;
        }
        let status = msg::Status {
            flags,
            voltage_mv: self.voltage_mv,
            f_index: self.f_index,
            d_index: self.d_index,
            wi: self.wi,
            waiting_time: self.waiting_time,
        };
        self.host.submit(self.slot, CardemMessage::Status(status));
    }

    /// Report cumulative counters to the host.
    pub fn report_stats(&mut self) {
        let stats = msg::Stats {
            tx_bytes: self.counters.tx_bytes,
            rx_bytes: self.counters.rx_bytes,
            pps: self.counters.pps,
        };
        self.host.submit(self.slot, CardemMessage::Stats(stats));
    }

    fn set_state(&mut self, new: CardState) {
        if self.state == new {
            return;
        }
        debug!("{}: card state {:?} -> {:?}", self.slot, self.state, new);
        self.state = new;

        match new {
            CardState::WaitPower | CardState::WaitClock | CardState::WaitReset => {
                // hard reset: nothing survives into the next session
                self.port.enable(Direction::None);
                self.timer.disarm();
                self.release_pending();
            }
            CardState::WaitAtr => {
                self.f_index = DEFAULT_F_INDEX;
                self.d_index = DEFAULT_D_INDEX;
                self.f = DEFAULT_F;
                self.d = DEFAULT_D;
                self.apply_clock_ratio();
                self.fi = DEFAULT_F;
                self.di = DEFAULT_D;
                self.wi = DEFAULT_WI;
                self.recompute_waiting_time();
                self.port.enable(Direction::Transmit);
                // ISO 7816-3 6.2.1: the ATR starts 400 to 40k cycles
                // after reset release; wait out 2 initial ETUs
                self.timer.set_wait_etus(2);
                self.timer.arm();
            }
            CardState::InAtr => {
                self.atr_cursor = 0;
                self.port.enable(Direction::Transmit);
            }
            CardState::WaitTpdu => {
                self.set_tpdu_state(TpduState::WaitCla);
                self.port.enable(Direction::Receive);
                // no transaction open; explicit because the sub-state may
                // already have been WaitCla, skipping its entry action
                self.timer.disarm();
            }
            CardState::InPts | CardState::InTpdu => {}
        }
    }

    fn release_pending(&mut self) {
        self.rx_msg = None;
        self.tx_msg = None;
        while self.tx_queue.dequeue().is_some() {}
        self.rx_received = 0;
    }

    fn apply_clock_ratio(&mut self) {
        match iso7816::clocks_per_etu(self.f_index, self.d_index) {
            Ok(ratio) => {
                self.port.update_clock_ratio(ratio);
                self.timer.set_etu_length(ratio);
            }
            Err(e) => {
                error!(
                    "{}: unusable F/D indices {}/{}: {:?}",
                    self.slot, self.f_index, self.d_index, e
                );
            }
        }
    }

    fn recompute_waiting_time(&mut self) {
        match iso7816::calculate_waiting_time(self.wi, self.fi, self.di, self.f, self.d) {
            Ok(wt) => self.waiting_time = wt,
            Err(e) => {
                error!("{}: invalid waiting time parameters: {:?}", self.slot, e);
            }
        }
    }

    fn arm_waiting_time(&mut self) {
        self.timer.set_wait_etus(self.waiting_time);
        self.timer.arm();
    }

    /**********************************************************************
     * ATR sub-engine
     **********************************************************************/

    fn transmit_atr_byte(&mut self) -> Option<u8> {
        if self.atr_cursor < self.atr.len() {
            let byte = self.atr[self.atr_cursor];
            self.atr_cursor += 1;
            self.port.transmit(byte);
            Some(byte)
        } else {
            // sequence complete: one pass over what was sent for TC2/WI
            if let Some(wi) = atr::waiting_integer(&self.atr) {
                self.wi = wi;
            }
            self.recompute_waiting_time();
            self.timer.set_wait_etus(self.waiting_time);
            self.pts = PtsState::request_start();
            self.set_state(CardState::WaitTpdu);
            None
        }
    }

    /**********************************************************************
     * PPS/PTS sub-engine
     **********************************************************************/

    fn process_pts_byte(&mut self, byte: u8) -> Option<CardState> {
        match (self.pts.dir, self.pts.field) {
            (PtsDir::Request, pts::Field::Pck) => {
                self.pts_req[pts::PCK] = byte;
                if byte != pts::checksum(&self.pts_req) {
                    warn!("{}: PPS checksum error", self.slot);
                    self.pts = PtsState::request_start();
                    return Some(CardState::WaitTpdu);
                }
                // no downgrading: echo the proposal verbatim
                self.pts_resp = self.pts_req;
            }
            (PtsDir::Request, field) => {
                self.pts_req[field.slot()] = byte;
            }
            (PtsDir::Response, _) => {
                warn!("{}: PPS byte {:02x} while transmitting response", self.slot, byte);
                return None;
            }
        }

        self.advance_pts();

        if self.pts == PtsState::response_start() {
            self.flush_pts_info();
            self.port.enable(Direction::Transmit);
            // the tx-completion path drives the rest of the exchange
            return None;
        }

        Some(CardState::InPts)
    }

    fn advance_pts(&mut self) {
        let format = match self.pts.dir {
            PtsDir::Request => self.pts_req[pts::PTS0],
            PtsDir::Response => self.pts_resp[pts::PTS0],
        };
        self.pts = match pts::next_field(format, self.pts.field) {
            Some(field) => PtsState {
                dir: self.pts.dir,
                field,
            },
            None => PtsState::response_start(),
        };
    }

    fn flush_pts_info(&mut self) {
        let wire_req = pts::serialize(&self.pts_req);
        let wire_resp = pts::serialize(&self.pts_resp);
        let mut req = [0u8; 6];
        let mut resp = [0u8; 6];
        req[..wire_req.len()].copy_from_slice(&wire_req);
        resp[..wire_resp.len()].copy_from_slice(&wire_resp);
        self.host.submit(
            self.slot,
            CardemMessage::PtsInfo {
                len: wire_req.len() as u8,
                req,
                resp,
            },
        );
    }

    fn transmit_pts_byte(&mut self) -> Option<u8> {
        if self.pts.dir != PtsDir::Response {
            warn!("{}: transmit poll outside PPS response", self.slot);
            return None;
        }
        let field = self.pts.field;
        let byte = self.pts_resp[field.slot()];
        self.port.transmit(byte);

        match field {
            pts::Field::Pts1 => {
                // the echoed PTS1 nibbles select the new F/D
                self.f_index = byte >> 4;
                self.d_index = byte & 0x0f;
                let f = iso7816::FI_TABLE[self.f_index as usize];
                if f == 0 {
                    error!("{}: invalid F index {} in PPS response", self.slot, self.f_index);
                } else {
                    self.f = f;
                }
                let d = iso7816::DI_TABLE[self.d_index as usize];
                if d == 0 {
                    error!("{}: invalid D index {} in PPS response", self.slot, self.d_index);
                } else {
                    self.d = d;
                }
                self.advance_pts();
            }
            pts::Field::Pck => {
                // let the checksum drain before flipping the line rate
                self.port.wait_until_idle();
                self.apply_clock_ratio();
                self.recompute_waiting_time();
                self.pts = PtsState::request_start();
                self.set_state(CardState::WaitTpdu);
            }
            _ => self.advance_pts(),
        }

        Some(byte)
    }

    /**********************************************************************
     * TPDU sub-engine
     **********************************************************************/

    fn set_tpdu_state(&mut self, new: TpduState) {
        if self.tpdu == new {
            return;
        }
        if self.state != CardState::InTpdu && self.state != CardState::WaitTpdu {
            warn!("{}: TPDU state change in card state {:?}", self.slot, self.state);
        }
        debug!("{}: TPDU state {:?} -> {:?}", self.slot, self.tpdu, new);
        self.tpdu = new;

        match new {
            TpduState::WaitCla => {
                self.port.enable(Direction::Receive);
                // no transaction open, no deadline to meet
                self.timer.disarm();
            }
            TpduState::WaitIns => {
                self.arm_waiting_time();
            }
            TpduState::WaitRx => {
                self.port.enable(Direction::Receive);
                self.arm_waiting_time();
            }
            TpduState::WaitProcedureByte => {
                self.port.enable(Direction::Transmit);
                self.arm_waiting_time();
            }
            _ => {}
        }
    }

    fn process_tpdu_byte(&mut self, byte: u8) -> CardState {
        match self.tpdu {
            TpduState::WaitCla => {
                self.header[0] = byte;
                self.set_tpdu_state(TpduState::WaitIns);
            }
            TpduState::WaitIns => {
                self.header[1] = byte;
                self.set_tpdu_state(TpduState::WaitP1);
            }
            TpduState::WaitP1 => {
                self.header[2] = byte;
                self.set_tpdu_state(TpduState::WaitP2);
            }
            TpduState::WaitP2 => {
                self.header[3] = byte;
                self.set_tpdu_state(TpduState::WaitP3);
            }
            TpduState::WaitP3 => {
                self.header[4] = byte;
                self.set_tpdu_state(TpduState::WaitProcedureByte);
                self.forward_header();
            }
            TpduState::WaitRx => {
                self.accumulate_rx_byte(byte);
            }
            state => {
                warn!("{}: TPDU byte {:02x} in sub-state {:?}", self.slot, byte, state);
            }
        }

        CardState::InTpdu
    }

    /// Forward the complete 5-byte header to the host, before any body
    /// byte of this transaction.
    fn forward_header(&mut self) {
        info!(
            "{}: TPDU header {:02x} {:02x} {:02x} {:02x} {:02x}",
            self.slot,
            self.header[0],
            self.header[1],
            self.header[2],
            self.header[3],
            self.header[4]
        );

        // a leftover from the previous transaction goes out first
        if let Some(stale) = self.rx_msg.take() {
            if !stale.data.is_empty() {
                self.submit_rx(stale);
            }
        }
        self.rx_received = 0;

        let mut data = msg::Data::new();
        data.extend_from_slice(&self.header).ok();
        self.host.submit(
            self.slot,
            CardemMessage::RxData {
                flags: data_flags::TPDU_HDR,
                data,
            },
        );
    }

    fn submit_rx(&mut self, message: RxMessage) {
        debug!("{}: flushing {} body bytes to host", self.slot, message.data.len());
        let mut data = msg::Data::new();
        data.extend_from_slice(&message.data).ok();
        self.host.submit(
            self.slot,
            CardemMessage::RxData {
                flags: message.flags,
                data,
            },
        );
    }

    fn accumulate_rx_byte(&mut self, byte: u8) {
        let expected = expected_data_bytes(self.header[4], DataDirection::CardToReader);

        if self.rx_msg.is_none() {
            self.rx_msg = Some(RxMessage {
                flags: 0,
                data: Vec::new(),
            });
        }
        let (complete, full) = match self.rx_msg.as_mut() {
            Some(message) => {
                message.data.push(byte).ok();
                self.rx_received += 1;
                (
                    self.rx_received >= expected,
                    message.data.len() == RX_DATA_CAPACITY,
                )
            }
            None => return,
        };

        if complete {
            if let Some(message) = self.rx_msg.as_mut() {
                message.flags |= data_flags::FINAL;
            }
            if let Some(message) = self.rx_msg.take() {
                self.submit_rx(message);
            }
            // body complete; the status word comes from the host next
            self.set_tpdu_state(TpduState::WaitTx);
        } else if full {
            // chunk boundary, invisible on the wire side
            if let Some(message) = self.rx_msg.take() {
                self.submit_rx(message);
            }
        }
    }

    fn transmit_tpdu_byte(&mut self) -> Option<u8> {
        if self.tx_msg.is_none() {
            // strict submission order
            self.tx_msg = self.tx_queue.dequeue();
        }

        let exhausted = match self.tx_msg.as_ref() {
            Some(message) => message.cursor >= message.data.len(),
            None => return None,
        };
        if exhausted {
            warn!("{}: host supplied an empty data message", self.slot);
            self.tx_msg = None;
            return None;
        }

        let (byte, flags, drained) = {
            let message = self.tx_msg.as_mut()?;
            let byte = message.data[message.cursor];
            message.cursor += 1;
            (byte, message.flags, message.cursor >= message.data.len())
        };

        self.port.transmit(byte);

        // decide the direction right after the procedure byte went out
        if self.tpdu == TpduState::WaitProcedureByte {
            if flags & data_flags::PB_AND_TX != 0 {
                self.set_tpdu_state(TpduState::WaitTx);
            } else if flags & data_flags::PB_AND_RX != 0 {
                self.set_tpdu_state(TpduState::WaitRx);
            }
        }

        if drained {
            if flags & data_flags::PB_AND_RX != 0 {
                self.set_tpdu_state(TpduState::WaitRx);
            } else if flags & data_flags::FINAL != 0 {
                // that was the last part of the response
                self.set_state(CardState::WaitTpdu);
            }
            self.tx_msg = None;
        }

        Some(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn t0_length_rule() {
        assert_eq!(expected_data_bytes(0, DataDirection::ReaderToCard), 0);
        assert_eq!(expected_data_bytes(7, DataDirection::ReaderToCard), 7);
        assert_eq!(expected_data_bytes(0, DataDirection::CardToReader), 256);
        assert_eq!(expected_data_bytes(0x0A, DataDirection::CardToReader), 10);
        assert_eq!(expected_data_bytes(0xFF, DataDirection::CardToReader), 255);
    }
}
