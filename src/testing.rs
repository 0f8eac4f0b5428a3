//! Host-side doubles for the driver's collaborators.
//!
//! Everything here runs on the host under `cargo test`: a buffer pool that
//! catches leaks and double frees, a stack that records signals and dealloc
//! posts, a simulated MAC that walks the real descriptor rings, a register
//! file, a simulated Clause-22 PHY on bit-banged pins, and fake time sources.

#![allow(missing_docs)]
#![allow(clippy::std_instead_of_core, clippy::std_instead_of_alloc)]

extern crate std;

use core::cell::{Cell, RefCell, UnsafeCell};
use std::boxed::Box;
use std::collections::BTreeSet;
use std::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::driver::config::{Duplex, Speed};
use crate::driver::emac::Emac;
use crate::driver::error::{IoError, IoResult};
use crate::driver::interrupt::{InterruptStatus, Interrupts};
use crate::hal::bitbang::{BitBangMdio, MdioPins};
use crate::hal::chip::{Direction, FilterUpdate, HashWidth, MacHardware};
use crate::hal::mmio::RegisterAccess;
use crate::hal::wait::TickSource;
use crate::internal::constants::{CRC_SIZE, MAC_ADDR_LEN, SETUP_FRAME_LEN};
use crate::internal::dma::bits::rdes0;
use crate::internal::dma::{RxDescriptor, TxDescriptor};
use crate::stack::{BufferPool, BufferPtr, DeallocQueue, TaskSignal};

// =============================================================================
// Buffer Pool
// =============================================================================

/// Size of every mock pool buffer
pub const POOL_BUFFER_SIZE: usize = 2048;

/// Fixed pool that tracks every buffer it has handed out
pub struct MockPool {
    storage: Vec<Box<UnsafeCell<[u32; POOL_BUFFER_SIZE / 4]>>>,
    free: RefCell<Vec<usize>>,
    outstanding: RefCell<BTreeSet<usize>>,
    double_frees: Cell<usize>,
}

impl MockPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            storage: (0..capacity)
                .map(|_| Box::new(UnsafeCell::new([0; POOL_BUFFER_SIZE / 4])))
                .collect(),
            free: RefCell::new((0..capacity).rev().collect()),
            outstanding: RefCell::new(BTreeSet::new()),
            double_frees: Cell::new(0),
        }
    }

    /// Buffers handed out and not yet returned
    pub fn outstanding(&self) -> usize {
        self.outstanding.borrow().len()
    }

    /// Returns of buffers that were not outstanding
    pub fn double_frees(&self) -> usize {
        self.double_frees.get()
    }

    fn index_of(&self, buffer: BufferPtr) -> Option<usize> {
        self.storage
            .iter()
            .position(|slot| slot.get() as usize == buffer.addr())
    }
}

impl BufferPool for MockPool {
    fn get_buffer(&self, size: usize) -> Option<BufferPtr> {
        if size > POOL_BUFFER_SIZE {
            return None;
        }
        let index = self.free.borrow_mut().pop()?;
        let buffer = BufferPtr::from_ptr(self.storage[index].get().cast::<u8>())?;
        self.outstanding.borrow_mut().insert(index);
        Some(buffer)
    }

    fn free_buffer(&self, buffer: BufferPtr) {
        match self.index_of(buffer) {
            Some(index) if self.outstanding.borrow_mut().remove(&index) => {
                self.free.borrow_mut().push(index);
            }
            _ => self.double_frees.set(self.double_frees.get() + 1),
        }
    }
}

// =============================================================================
// Network Stack
// =============================================================================

/// Pool plus recorded task signals and dealloc posts
pub struct MockStack {
    pool: MockPool,
    rx_signals: Cell<usize>,
    tx_signals: Cell<usize>,
    posted: RefCell<Vec<BufferPtr>>,
}

impl MockStack {
    pub fn new(capacity: usize) -> Self {
        Self {
            pool: MockPool::new(capacity),
            rx_signals: Cell::new(0),
            tx_signals: Cell::new(0),
            posted: RefCell::new(Vec::new()),
        }
    }

    pub fn pool(&self) -> &MockPool {
        &self.pool
    }

    pub fn rx_signals(&self) -> usize {
        self.rx_signals.get()
    }

    pub fn tx_signals(&self) -> usize {
        self.tx_signals.get()
    }

    /// Buffers posted for dealloc and not yet released, oldest first
    pub fn dealloc_posts(&self) -> Vec<BufferPtr> {
        self.posted.borrow().clone()
    }

    /// Run the deferred dealloc: give every posted buffer back to the pool
    pub fn release_posted(&self) {
        for buffer in self.posted.borrow_mut().drain(..) {
            self.pool.free_buffer(buffer);
        }
    }
}

impl BufferPool for MockStack {
    fn get_buffer(&self, size: usize) -> Option<BufferPtr> {
        self.pool.get_buffer(size)
    }

    fn free_buffer(&self, buffer: BufferPtr) {
        self.pool.free_buffer(buffer);
    }
}

impl TaskSignal for MockStack {
    fn signal_rx_ready(&self, _if_id: u8) {
        self.rx_signals.set(self.rx_signals.get() + 1);
    }

    fn signal_tx_ready(&self, _if_id: u8) {
        self.tx_signals.set(self.tx_signals.get() + 1);
    }
}

impl DeallocQueue for MockStack {
    fn post_for_dealloc(&self, buffer: BufferPtr) {
        self.posted.borrow_mut().push(buffer);
    }
}

// =============================================================================
// Register File
// =============================================================================

const REG_WORDS: usize = 64;

/// Word-addressed register file with optional self-clearing and
/// write-one-to-clear behaviour per register
pub struct MockRegisters {
    values: RefCell<[u32; REG_WORDS]>,
    self_clearing: RefCell<[u32; REG_WORDS]>,
    w1c: RefCell<[bool; REG_WORDS]>,
    last: RefCell<[Option<u32>; REG_WORDS]>,
}

impl MockRegisters {
    pub fn new() -> Self {
        Self {
            values: RefCell::new([0; REG_WORDS]),
            self_clearing: RefCell::new([0; REG_WORDS]),
            w1c: RefCell::new([false; REG_WORDS]),
            last: RefCell::new([None; REG_WORDS]),
        }
    }

    fn word(offset: usize) -> usize {
        assert!(offset % 4 == 0 && offset / 4 < REG_WORDS, "bad offset {offset:#x}");
        offset / 4
    }

    /// Bits in `mask` read back as zero right after being written
    pub fn self_clearing(&self, offset: usize, mask: u32) {
        self.self_clearing.borrow_mut()[Self::word(offset)] |= mask;
    }

    /// Writes clear the bits written instead of storing them
    pub fn write_one_to_clear(&self, offset: usize) {
        self.w1c.borrow_mut()[Self::word(offset)] = true;
    }

    /// Set the value as the hardware would, bypassing write semantics
    pub fn force(&self, offset: usize, value: u32) {
        self.values.borrow_mut()[Self::word(offset)] = value;
    }

    /// Raw value of the most recent write
    pub fn last_write(&self, offset: usize) -> Option<u32> {
        self.last.borrow()[Self::word(offset)]
    }
}

impl Default for MockRegisters {
    fn default() -> Self {
        Self::new()
    }
}

impl RegisterAccess for MockRegisters {
    fn read(&self, offset: usize) -> u32 {
        self.values.borrow()[Self::word(offset)]
    }

    fn write(&self, offset: usize, value: u32) {
        let word = Self::word(offset);
        self.last.borrow_mut()[word] = Some(value);
        let mut values = self.values.borrow_mut();
        if self.w1c.borrow()[word] {
            values[word] &= !value;
        } else {
            values[word] = value & !self.self_clearing.borrow()[word];
        }
    }
}

// =============================================================================
// Simulated MAC
// =============================================================================

/// Simulated DMA engine and MAC.
///
/// Walks the real descriptor rings from the programmed base addresses,
/// following each descriptor's next pointer like the hardware does. With
/// `SETUP` set it behaves like a chip that only takes the filter as a setup
/// frame with a 512-bit hash; otherwise like one with 64-bit hash registers.
pub struct SimMac<const SETUP: bool> {
    mac: [u8; MAC_ADDR_LEN],
    rx_cursor: usize,
    tx_cursor: usize,
    rx_running: bool,
    tx_running: bool,
    rx_starts: usize,
    pending: Interrupts,
    enabled: Interrupts,
    hash: [u32; 16],
    link: Option<(Speed, Duplex)>,
    resets: usize,
    flushes: usize,
    tx_poll_demands: usize,
    setup_frames: usize,
    last_setup: Option<[u8; SETUP_FRAME_LEN]>,
    stall_stop: bool,
    hold_setup: bool,
    reset_fails: bool,
    flush_fails: bool,
}

impl<const SETUP: bool> SimMac<SETUP> {
    pub const fn new() -> Self {
        Self {
            mac: [0; MAC_ADDR_LEN],
            rx_cursor: 0,
            tx_cursor: 0,
            rx_running: false,
            tx_running: false,
            rx_starts: 0,
            pending: Interrupts::empty(),
            enabled: Interrupts::empty(),
            hash: [0; 16],
            link: None,
            resets: 0,
            flushes: 0,
            tx_poll_demands: 0,
            setup_frames: 0,
            last_setup: None,
            stall_stop: false,
            hold_setup: false,
            reset_fails: false,
            flush_fails: false,
        }
    }

    fn rx_desc_at(addr: usize) -> &'static RxDescriptor {
        // SAFETY: cursors only ever hold a programmed ring base or a next
        // pointer read from a descriptor of that ring, and the ring outlives
        // every test that walks it.
        unsafe { &*(addr as *const RxDescriptor) }
    }

    fn tx_desc_at(addr: usize) -> &'static TxDescriptor {
        // SAFETY: as for `rx_desc_at`.
        unsafe { &*(addr as *const TxDescriptor) }
    }

    /// Complete the next receive descriptor with a good frame of
    /// `payload_len` bytes plus FCS. Returns `false` if the DMA owns nothing.
    pub fn receive_frame(&mut self, payload_len: usize) -> bool {
        self.receive_errored(payload_len, 0)
    }

    /// Complete the next receive descriptor with extra RDES0 status bits
    pub fn receive_errored(&mut self, payload_len: usize, status: u32) -> bool {
        if !self.rx_running || self.rx_cursor == 0 {
            return false;
        }
        let desc = Self::rx_desc_at(self.rx_cursor);
        if !desc.is_owned() {
            return false;
        }

        let wire_len = (payload_len + CRC_SIZE) as u32;
        desc.set_raw_rdes0(
            (wire_len << rdes0::FRAME_LEN_SHIFT) | rdes0::FIRST_DESC | rdes0::LAST_DESC | status,
        );
        self.rx_cursor = desc.next_desc_addr();
        self.pending |= Interrupts::RX_READY;
        true
    }

    /// Complete up to `count` owned transmit descriptors. Returns how many.
    pub fn complete_tx(&mut self, count: usize) -> usize {
        let mut done = 0;
        while done < count && self.complete_one(0) {
            done += 1;
        }
        done
    }

    /// Complete the next transmit descriptor with TDES0 error bits
    pub fn complete_tx_with(&mut self, status: u32) -> bool {
        self.complete_one(status)
    }

    fn complete_one(&mut self, status: u32) -> bool {
        if self.tx_cursor == 0 {
            return false;
        }
        let desc = Self::tx_desc_at(self.tx_cursor);
        if !desc.is_owned() {
            return false;
        }

        if desc.is_setup_frame() {
            let mut frame = [0u8; SETUP_FRAME_LEN];
            let len = desc.frame_len().min(SETUP_FRAME_LEN);
            // SAFETY: the descriptor points at a pool buffer of at least
            // `frame_len` bytes that the driver filled before handing it over.
            let data = unsafe { core::slice::from_raw_parts(desc.buffer_addr() as *const u8, len) };
            frame[..len].copy_from_slice(data);
            self.last_setup = Some(frame);
            self.setup_frames += 1;
        }

        desc.set_raw_tdes0(status);
        self.tx_cursor = desc.next_desc_addr();
        self.pending |= Interrupts::TX_DONE;
        true
    }

    /// Number of owned descriptors from the cursor up to and including the
    /// first setup frame, if there is one.
    fn setup_frame_depth(&self) -> Option<usize> {
        let mut addr = self.tx_cursor;
        for depth in 1..=64 {
            if addr == 0 {
                return None;
            }
            let desc = Self::tx_desc_at(addr);
            if !desc.is_owned() {
                return None;
            }
            if desc.is_setup_frame() {
                return Some(depth);
            }
            addr = desc.next_desc_addr();
        }
        None
    }

    /// Latch interrupt sources
    pub fn raise(&mut self, sources: Interrupts) {
        self.pending |= sources;
    }

    pub fn stall_stop(&mut self, stall: bool) {
        self.stall_stop = stall;
    }

    /// Leave setup frames queued on poll demand
    pub fn hold_setup(&mut self, hold: bool) {
        self.hold_setup = hold;
    }

    pub fn fail_reset(&mut self, fail: bool) {
        self.reset_fails = fail;
    }

    pub fn fail_flush(&mut self, fail: bool) {
        self.flush_fails = fail;
    }

    pub fn mac_address(&self) -> [u8; MAC_ADDR_LEN] {
        self.mac
    }

    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn is_running(&self, dir: Direction) -> bool {
        match dir {
            Direction::Rx => self.rx_running,
            Direction::Tx => self.tx_running,
        }
    }

    pub fn enabled(&self) -> Interrupts {
        self.enabled
    }

    pub fn hash_table(&self) -> &[u32] {
        &self.hash[..Self::HASH_WIDTH.bits() / 32]
    }

    pub fn link(&self) -> Option<(Speed, Duplex)> {
        self.link
    }

    pub fn tx_poll_demands(&self) -> usize {
        self.tx_poll_demands
    }

    pub fn tx_flushes(&self) -> usize {
        self.flushes
    }

    /// Receive DMA starts after the first one
    pub fn rx_restarts(&self) -> usize {
        self.rx_starts.saturating_sub(1)
    }

    pub fn setup_frames(&self) -> usize {
        self.setup_frames
    }

    pub fn last_setup_frame(&self) -> Option<[u8; SETUP_FRAME_LEN]> {
        self.last_setup
    }
}

impl<const SETUP: bool> MacHardware for SimMac<SETUP> {
    const HASH_WIDTH: HashWidth = if SETUP {
        HashWidth::Bits512
    } else {
        HashWidth::Bits64
    };
    const FILTER_UPDATE: FilterUpdate = if SETUP {
        FilterUpdate::SetupFrame
    } else {
        FilterUpdate::Registers
    };
    const POLL_RETRIES: u32 = 64;

    fn reset(&mut self) -> IoResult<()> {
        self.resets += 1;
        if self.reset_fails {
            return Err(IoError::Timeout);
        }
        self.pending = Interrupts::empty();
        self.enabled = Interrupts::empty();
        self.hash = [0; 16];
        Ok(())
    }

    fn set_mac_address(&mut self, addr: &[u8; MAC_ADDR_LEN]) {
        self.mac = *addr;
    }

    fn set_descriptor_base(&mut self, dir: Direction, addr: usize) {
        match dir {
            Direction::Rx => self.rx_cursor = addr,
            Direction::Tx => self.tx_cursor = addr,
        }
    }

    fn start(&mut self, dir: Direction) {
        match dir {
            Direction::Rx => {
                self.rx_running = true;
                self.rx_starts += 1;
            }
            Direction::Tx => self.tx_running = true,
        }
    }

    fn stop(&mut self, dir: Direction) {
        match dir {
            Direction::Rx => self.rx_running = false,
            Direction::Tx => self.tx_running = false,
        }
    }

    fn is_stopped(&self, dir: Direction) -> bool {
        !self.stall_stop && !self.is_running(dir)
    }

    fn poll_demand(&mut self, dir: Direction) {
        if dir != Direction::Tx {
            return;
        }
        self.tx_poll_demands += 1;
        if self.tx_running && !self.hold_setup {
            if let Some(depth) = self.setup_frame_depth() {
                self.complete_tx(depth);
            }
        }
    }

    fn flush_tx(&mut self) -> IoResult<()> {
        self.flushes += 1;
        if self.flush_fails {
            Err(IoError::Timeout)
        } else {
            Ok(())
        }
    }

    fn enable_interrupts(&mut self, sources: Interrupts) {
        self.enabled |= sources;
    }

    fn disable_interrupts(&mut self, sources: Interrupts) {
        self.enabled = self.enabled.difference(sources);
    }

    fn interrupt_status(&self) -> InterruptStatus {
        InterruptStatus::new(
            self.pending.intersection(self.enabled),
            u32::from(self.pending.bits()),
        )
    }

    fn clear_interrupts(&mut self, status: InterruptStatus) {
        self.pending = self.pending.difference(status.pending);
    }

    fn set_link(&mut self, speed: Speed, duplex: Duplex) {
        self.link = Some((speed, duplex));
    }

    fn write_hash_filter(&mut self, table: &[u32]) {
        let len = table.len().min(self.hash.len());
        self.hash[..len].copy_from_slice(&table[..len]);
    }
}

// =============================================================================
// Simulated PHY on Bit-Banged Pins
// =============================================================================

#[derive(Clone, Copy)]
enum PhyPhase {
    /// Counting consecutive ones
    Preamble(usize),
    /// Inside a frame; `edge` is the next bit index after the start bit
    Frame { edge: usize, shift: u32 },
    /// Answering a read
    Reading { edge: usize, value: u16 },
    /// Taking a write
    Writing { edge: usize, reg: u8, value: u16 },
}

/// Clause-22 PHY that decodes the bit stream on MDC rising edges.
///
/// MDIO is wired-AND with a pull-up: the line is low whenever either side
/// drives it low. The PHY changes its output on the rising edge, so the
/// master samples it after the falling edge of the same clock.
pub struct MockMdioPins {
    regs: [u16; 32],
    phy_addr: u8,
    absent: bool,
    fail: bool,
    mdc: bool,
    master: bool,
    phy_out: bool,
    rising_edges: usize,
    phase: PhyPhase,
}

impl MockMdioPins {
    pub fn new(phy_addr: u8) -> Self {
        Self {
            regs: [0; 32],
            phy_addr,
            absent: false,
            fail: false,
            mdc: false,
            master: true,
            phy_out: true,
            rising_edges: 0,
            phase: PhyPhase::Preamble(0),
        }
    }

    /// Nothing on the bus answers
    pub fn absent() -> Self {
        Self {
            absent: true,
            ..Self::new(0)
        }
    }

    pub fn set_register(&mut self, reg: u8, value: u16) {
        self.regs[reg as usize] = value;
    }

    pub fn register(&self, reg: u8) -> u16 {
        self.regs[reg as usize]
    }

    pub fn rising_edges(&self) -> usize {
        self.rising_edges
    }

    /// Make every pin operation fail
    pub fn fail_pins(&mut self, fail: bool) {
        self.fail = fail;
    }

    fn line(&self) -> bool {
        self.master && self.phy_out
    }

    fn check(&self) -> IoResult<()> {
        if self.fail { Err(IoError::PinFault) } else { Ok(()) }
    }

    fn on_rising_edge(&mut self) {
        self.rising_edges += 1;
        let bit = self.line();
        let phase = self.phase;

        self.phase = match phase {
            PhyPhase::Preamble(ones) if bit => PhyPhase::Preamble(ones + 1),
            PhyPhase::Preamble(ones) if ones >= 32 => PhyPhase::Frame { edge: 1, shift: 0 },
            PhyPhase::Preamble(_) => PhyPhase::Preamble(0),

            PhyPhase::Frame { edge, shift } => {
                let shift = (shift << 1) | u32::from(bit);
                if edge < 13 {
                    PhyPhase::Frame {
                        edge: edge + 1,
                        shift,
                    }
                } else {
                    self.decode_header(shift)
                }
            }

            PhyPhase::Reading { edge, value } => {
                match edge {
                    14 => {}
                    15 => self.phy_out = false,
                    16..=31 => self.phy_out = value & (1 << (31 - edge)) != 0,
                    _ => {
                        self.phy_out = true;
                        return self.idle();
                    }
                }
                PhyPhase::Reading {
                    edge: edge + 1,
                    value,
                }
            }

            PhyPhase::Writing { edge, reg, value } => match edge {
                14 | 15 => PhyPhase::Writing {
                    edge: edge + 1,
                    reg,
                    value,
                },
                16..=30 => PhyPhase::Writing {
                    edge: edge + 1,
                    reg,
                    value: (value << 1) | u16::from(bit),
                },
                _ => {
                    self.regs[reg as usize] = (value << 1) | u16::from(bit);
                    PhyPhase::Preamble(0)
                }
            },
        };
    }

    fn idle(&mut self) {
        self.phase = PhyPhase::Preamble(1);
    }

    /// `shift` holds the 13 header bits after the start bit
    fn decode_header(&mut self, shift: u32) -> PhyPhase {
        let start = (shift >> 12) & 1;
        let op = (shift >> 10) & 0b11;
        let phy = ((shift >> 5) & 0x1F) as u8;
        let reg = (shift & 0x1F) as u8;

        if self.absent || start != 1 || phy != self.phy_addr {
            return PhyPhase::Preamble(0);
        }
        match op {
            0b10 => PhyPhase::Reading {
                edge: 14,
                value: self.regs[reg as usize],
            },
            0b01 => PhyPhase::Writing {
                edge: 14,
                reg,
                value: 0,
            },
            _ => PhyPhase::Preamble(0),
        }
    }
}

impl MdioPins for MockMdioPins {
    fn set_mdc(&mut self, high: bool) -> IoResult<()> {
        self.check()?;
        if high && !self.mdc {
            self.on_rising_edge();
        }
        self.mdc = high;
        Ok(())
    }

    fn set_mdio(&mut self, high: bool) -> IoResult<()> {
        self.check()?;
        self.master = high;
        Ok(())
    }

    fn release_mdio(&mut self) -> IoResult<()> {
        self.check()?;
        self.master = true;
        Ok(())
    }

    fn read_mdio(&mut self) -> IoResult<bool> {
        self.check()?;
        Ok(self.line())
    }
}

// =============================================================================
// Time Sources
// =============================================================================

/// Tick counter that advances by `step` on every read; `step == 0` freezes it
pub struct MockTicks {
    now: Cell<u32>,
    frequency: u32,
    step: u32,
    reads: Cell<usize>,
}

impl MockTicks {
    pub fn new(frequency: u32, step: u32) -> Self {
        Self::starting_at(0, frequency, step)
    }

    pub fn starting_at(start: u32, frequency: u32, step: u32) -> Self {
        Self {
            now: Cell::new(start),
            frequency,
            step,
            reads: Cell::new(0),
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.get()
    }
}

impl TickSource for MockTicks {
    fn now_ticks(&self) -> u32 {
        self.reads.set(self.reads.get() + 1);
        let now = self.now.get();
        self.now.set(now.wrapping_add(self.step));
        now
    }

    fn tick_frequency(&self) -> u32 {
        self.frequency
    }
}

/// Delay that returns immediately
#[derive(Default)]
pub struct MockDelay;

impl MockDelay {
    pub fn new() -> Self {
        Self
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, _ns: u32) {}
}

// =============================================================================
// Driver Fixture
// =============================================================================

/// Bit-banged management bus used by the driver fixture
pub type TestMdio = BitBangMdio<MockMdioPins, MockTicks>;

/// Driver over simulated hardware with four descriptors per ring
pub type TestEmac<'a, const SETUP: bool> = Emac<SimMac<SETUP>, &'a MockStack, TestMdio, 4, 4>;

/// Fresh, uninitialized driver with a PHY at address 0.
///
/// Start it only once it sits where it will stay: the rings are linked by
/// address.
pub fn test_emac<const SETUP: bool>(stack: &MockStack) -> TestEmac<'_, SETUP> {
    let mdio = BitBangMdio::new(MockMdioPins::new(0), MockTicks::new(80_000_000, 16));
    Emac::new(SimMac::new(), stack, mdio)
}
