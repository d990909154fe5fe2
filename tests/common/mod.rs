//! Simulated SX127x register file and a recording board for integration tests.

#![allow(dead_code)]

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::Sender;
use embedded_hal::spi::{ErrorKind, ErrorType, Operation, SpiDevice};
use spi_lora::board::{Board, BoardEvent};
use spi_lora::registers::{addr, Access, IrqFlags, REGISTER_MAP};
use spi_lora::Error;

/// One observed register access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusAccess {
    /// Start address of a read transaction.
    Read(u8),
    Write(u8, u8),
}

#[derive(Debug)]
pub struct SimError;

impl embedded_hal::spi::Error for SimError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

pub struct SimState {
    pub regs: [u8; 128],
    pub fifo: [u8; 256],
    pub read_only: HashSet<u8>,
    /// Registers that silently ignore writes.
    pub stuck: HashSet<u8>,
    /// Reads starting at these addresses fail.
    pub failing_reads: HashSet<u8>,
    /// Reads starting at these addresses fail once.
    pub failing_once: HashSet<u8>,
    /// Packets delivered one at a time whenever RXCONT is entered.
    pub pending: VecDeque<(Vec<u8>, bool)>,
    pub log: Vec<BusAccess>,
}

impl SimState {
    fn new() -> Self {
        let mut regs = [0u8; 128];
        regs[addr::OP_MODE as usize] = 0x09;
        regs[addr::FR_MSB as usize] = 0x6C;
        regs[addr::FR_MID as usize] = 0x80;
        regs[addr::PA_CONFIG as usize] = 0x4F;
        regs[addr::FIFO_TX_BASE_ADDR as usize] = 0x80;
        regs[addr::MODEM_CONFIG_1 as usize] = 0x72;
        regs[addr::MODEM_CONFIG_2 as usize] = 0x70;
        regs[addr::MODEM_CONFIG_3 as usize] = 0x04;
        regs[addr::PREAMBLE_LSB as usize] = 0x08;
        regs[addr::PAYLOAD_LENGTH as usize] = 0x01;
        regs[addr::DETECT_OPTIMIZE as usize] = 0xC3;
        regs[addr::DETECTION_THRESH as usize] = 0x0A;
        regs[addr::SYNC_WORD as usize] = 0x12;
        regs[addr::RSSI_VALUE as usize] = 0x40;
        regs[addr::VERSION as usize] = 0x12;

        let read_only = REGISTER_MAP
            .iter()
            .filter(|info| info.access == Access::ReadOnly && info.address != addr::IRQ_FLAGS)
            .map(|info| info.address)
            .collect();

        Self {
            regs,
            fifo: [0; 256],
            read_only,
            stuck: HashSet::new(),
            failing_reads: HashSet::new(),
            failing_once: HashSet::new(),
            pending: VecDeque::new(),
            log: Vec::new(),
        }
    }

    pub fn reg(&self, address: u8) -> u8 {
        self.regs[address as usize]
    }

    pub fn irq_flags(&self) -> IrqFlags {
        IrqFlags::from_bits_retain(self.reg(addr::IRQ_FLAGS))
    }

    pub fn raise(&mut self, flags: IrqFlags) {
        self.regs[addr::IRQ_FLAGS as usize] |= flags.bits();
    }

    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.log
            .iter()
            .filter_map(|access| match *access {
                BusAccess::Write(address, value) => Some((address, value)),
                BusAccess::Read(_) => None,
            })
            .collect()
    }

    pub fn op_mode_writes(&self) -> Vec<u8> {
        self.writes()
            .into_iter()
            .filter(|&(address, _)| address == addr::OP_MODE)
            .map(|(_, value)| value)
            .collect()
    }

    fn deliver(&mut self) {
        let Some((payload, crc_error)) = self.pending.pop_front() else {
            return;
        };
        let base = self.reg(addr::FIFO_RX_BASE_ADDR);
        for (offset, byte) in payload.iter().enumerate() {
            self.fifo[base.wrapping_add(offset as u8) as usize] = *byte;
        }
        self.regs[addr::FIFO_RX_CURR_ADDR as usize] = base;
        self.regs[addr::RX_NB_BYTES as usize] = payload.len() as u8;
        let mut flags = IrqFlags::RX_DONE | IrqFlags::VALID_HEADER;
        if crc_error {
            flags |= IrqFlags::PAYLOAD_CRC_ERROR;
        }
        self.raise(flags);
    }

    fn write_byte(&mut self, address: u8, value: u8) {
        self.log.push(BusAccess::Write(address, value));
        if self.stuck.contains(&address) || self.read_only.contains(&address) {
            return;
        }
        match address {
            addr::FIFO => {
                let ptr = self.reg(addr::FIFO_ADDR_PTR);
                self.fifo[ptr as usize] = value;
                self.regs[addr::FIFO_ADDR_PTR as usize] = ptr.wrapping_add(1);
            }
            addr::IRQ_FLAGS => self.regs[address as usize] &= !value,
            addr::OP_MODE => {
                self.regs[address as usize] = value;
                if value & 0x87 == 0x85 {
                    self.deliver();
                }
            }
            _ => self.regs[address as usize] = value,
        }
    }

    fn read_byte(&mut self, address: u8) -> u8 {
        if address == addr::FIFO {
            let ptr = self.reg(addr::FIFO_ADDR_PTR);
            self.regs[addr::FIFO_ADDR_PTR as usize] = ptr.wrapping_add(1);
            return self.fifo[ptr as usize];
        }
        self.reg(address)
    }
}

/// Cloneable handle on a simulated modem.
#[derive(Clone)]
pub struct SimRadio {
    state: Arc<Mutex<SimState>>,
}

impl SimRadio {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::new())),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap()
    }

    /// Queues a packet for the next time the modem enters RXCONT.
    pub fn receive(&self, payload: &[u8]) {
        self.state().pending.push_back((payload.to_vec(), false));
    }

    pub fn receive_corrupted(&self, payload: &[u8]) {
        self.state().pending.push_back((payload.to_vec(), true));
    }
}

impl ErrorType for SimRadio {
    type Error = SimError;
}

impl SpiDevice for SimRadio {
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), SimError> {
        let mut state = self.state();
        let mut cursor: Option<(u8, bool)> = None;

        let advance = |address: u8| {
            if address == addr::FIFO {
                address
            } else {
                address.wrapping_add(1) & 0x7F
            }
        };

        for operation in operations.iter_mut() {
            match operation {
                Operation::Write(bytes) => {
                    for &byte in bytes.iter() {
                        match cursor {
                            None => {
                                let address = byte & 0x7F;
                                let write = byte & 0x80 != 0;
                                if !write {
                                    state.log.push(BusAccess::Read(address));
                                    if state.failing_reads.contains(&address)
                                        || state.failing_once.remove(&address)
                                    {
                                        return Err(SimError);
                                    }
                                }
                                cursor = Some((address, write));
                            }
                            Some((address, true)) => {
                                state.write_byte(address, byte);
                                cursor = Some((advance(address), true));
                            }
                            Some((_, false)) => return Err(SimError),
                        }
                    }
                }
                Operation::Read(bytes) => {
                    let Some((mut address, false)) = cursor else {
                        return Err(SimError);
                    };
                    for byte in bytes.iter_mut() {
                        *byte = state.read_byte(address);
                        address = advance(address);
                    }
                    cursor = Some((address, false));
                }
                _ => return Err(SimError),
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct BoardLog {
    pub setups: usize,
    pub teardowns: usize,
    pub leds: Vec<bool>,
}

/// Board over a [`SimRadio`] that records what the driver asked of it.
pub struct TestBoard {
    pub radio: SimRadio,
    pub log: Arc<Mutex<BoardLog>>,
    pub irq_lines: usize,
    pub low_band: bool,
    pub fail_setup: bool,
}

impl TestBoard {
    pub fn new(radio: SimRadio) -> Self {
        Self {
            radio,
            log: Arc::default(),
            irq_lines: 0,
            low_band: false,
            fail_setup: false,
        }
    }

    pub fn log(&self) -> MutexGuard<'_, BoardLog> {
        self.log.lock().unwrap()
    }
}

impl Board for TestBoard {
    type Transport = SimRadio;

    fn is_low_band_frontend(&self) -> bool {
        self.low_band
    }

    fn open_transport(&mut self, _bus: u8, _chip_select: u8) -> Result<SimRadio, Error> {
        Ok(self.radio.clone())
    }

    fn setup(&mut self) -> Result<(), Error> {
        self.log().setups += 1;
        if self.fail_setup {
            return Err(Error::Board("GPIO busy".into()));
        }
        Ok(())
    }

    fn teardown(&mut self) {
        self.log().teardowns += 1;
    }

    fn register_interrupts(
        &mut self,
        _events: &Sender<BoardEvent>,
        _switch: bool,
    ) -> Result<usize, Error> {
        Ok(self.irq_lines)
    }

    fn led_on(&mut self, on: bool) -> bool {
        self.log().leds.push(on);
        on
    }
}
