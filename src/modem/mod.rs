//! Mode & IRQ state machine
//!
//! [`Modem`] sits on top of the register layer and tracks the state the
//! driver has asked the radio to be in:
//!
//! - the current transceiver [`Mode`], set explicitly via [`Modem::set_mode`]
//! - the DIO mapping, which decides what each physical interrupt line reflects
//! - the last known value of every register read or written this session
//!
//! Construction always puts the radio into SLEEP and then STANDBY, in that
//! order. The LoRa bit of RegOpMode can only change in SLEEP, and most
//! configuration registers are only writable in SLEEP or STANDBY.

mod config;
mod irq;

pub use config::{ModemStatus, Summary};
pub use irq::{dio_line_flags, IrqHandler, DISPATCH_ORDER};

use embedded_hal::spi::SpiDevice;
use regiface::{FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

use crate::registers::{addr, OpMode, MAX_ADDRESS};
use crate::{Device, Error};

/// Transceiver modes of the LoRa modem (RegOpMode bits 2:0).
///
/// The frequency synthesis modes (FSTX, FSRX) are not driven by this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Mode {
    Sleep = 0x0,
    Standby = 0x1,
    Transmit = 0x3,
    RxContinuous = 0x5,
    RxSingle = 0x6,
    Cad = 0x7,
}

impl TryFrom<u8> for Mode {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x0 => Ok(Self::Sleep),
            0x1 => Ok(Self::Standby),
            0x3 => Ok(Self::Transmit),
            0x5 => Ok(Self::RxContinuous),
            0x6 => Ok(Self::RxSingle),
            0x7 => Ok(Self::Cad),
            _ => Err(Error::UnknownMode { value }),
        }
    }
}

impl Mode {
    /// Decodes a full RegOpMode value.
    ///
    /// Only LoRa values are recognized: LongRangeMode set, AccessSharedReg and
    /// the reserved bits clear. LowFrequencyModeOn may be either.
    pub fn from_op_mode(value: u8) -> Result<Self, Error> {
        let op = match OpMode::from_bytes([value]) {
            Ok(op) => op,
            Err(never) => match never {},
        };
        if !op.long_range_mode || op.access_shared_reg || op.reserved != 0 {
            return Err(Error::UnknownMode { value });
        }
        Mode::try_from(op.mode).map_err(|_| Error::UnknownMode { value })
    }

    /// Encodes this mode as a LoRa RegOpMode value.
    pub fn op_mode(self, low_band: bool) -> u8 {
        let op = OpMode {
            long_range_mode: true,
            access_shared_reg: false,
            reserved: 0,
            low_frequency_mode_on: low_band,
            mode: self as u8,
        };
        match op.to_bytes() {
            Ok([value]) => value,
            Err(never) => match never {},
        }
    }
}

/// Driver state for one SX127x modem.
pub struct Modem<SPI> {
    device: Device<SPI>,
    mode: Option<Mode>,
    low_band: bool,
    dio_mapping: [u8; 6],
    cache: [Option<u8>; MAX_ADDRESS as usize + 1],
}

impl<SPI> Modem<SPI> {
    /// Mode last set by this driver, `None` before the first [`set_mode`](Modem::set_mode).
    pub fn mode(&self) -> Option<Mode> {
        self.mode
    }

    /// DIO mapping last written by [`set_dio_mapping`](Modem::set_dio_mapping).
    pub fn dio_mapping(&self) -> [u8; 6] {
        self.dio_mapping
    }

    /// Whether the front end uses the low frequency matching network.
    pub fn is_low_band(&self) -> bool {
        self.low_band
    }

    /// Last value read from or written to `address` this session.
    pub fn cached(&self, address: u8) -> Option<u8> {
        self.cache.get(address as usize).copied().flatten()
    }

    /// Releases the underlying SPI device.
    pub fn release(self) -> SPI {
        self.device.release()
    }
}

impl<SPI> Modem<SPI>
where
    SPI: SpiDevice,
{
    /// Takes ownership of the transport and brings the radio into STANDBY
    /// through SLEEP.
    pub fn new(spi: SPI, low_band: bool) -> Result<Self, Error> {
        let mut modem = Self {
            device: Device::new(spi),
            mode: None,
            low_band,
            dio_mapping: [0; 6],
            cache: [None; MAX_ADDRESS as usize + 1],
        };
        modem.set_mode(Mode::Sleep)?;
        modem.set_mode(Mode::Standby)?;
        Ok(modem)
    }

    /// Writes the mode bits of RegOpMode.
    ///
    /// Returns as soon as the write is done; read back with
    /// [`get_mode`](Modem::get_mode) when confirmation is needed. The first
    /// mode of a session has to be SLEEP.
    pub fn set_mode(&mut self, mode: Mode) -> Result<(), Error> {
        if self.mode.is_none() && mode != Mode::Sleep {
            return Err(Error::InvalidTransition {
                from: None,
                to: mode,
            });
        }
        tracing::debug!(from = ?self.mode, to = ?mode, "set mode");
        self.write(addr::OP_MODE, mode.op_mode(self.low_band))
    }

    /// Reads RegOpMode back from the radio.
    pub fn get_mode(&mut self) -> Result<Mode, Error> {
        let value = self.read(addr::OP_MODE)?;
        Mode::from_op_mode(value)
    }

    /// Reads a register and refreshes the cache.
    pub fn read(&mut self, address: u8) -> Result<u8, Error> {
        let value = self.device.read(address)?;
        self.cache[address as usize] = Some(value);
        Ok(value)
    }

    /// Writes a register without verifying it.
    ///
    /// A write to RegOpMode must carry a recognized LoRa mode and updates the
    /// tracked mode. Any other register is refused until a mode was set.
    pub fn write(&mut self, address: u8, value: u8) -> Result<(), Error> {
        let mode = if address == addr::OP_MODE {
            Some(Mode::from_op_mode(value)?)
        } else if self.mode.is_none() {
            return Err(Error::ModeNotSet { address });
        } else {
            None
        };

        self.device.write(address, value)?;
        tracing::trace!(address, value, "register written");
        self.cache[address as usize] = Some(value);
        if mode.is_some() {
            self.mode = mode;
        }
        Ok(())
    }

    /// Reads `bytes.len()` consecutive bytes in one transaction.
    pub fn burst_read(&mut self, address: u8, bytes: &mut [u8]) -> Result<(), Error> {
        self.device.burst_read(address, bytes)
    }

    pub(crate) fn read_typed<R>(&mut self) -> Result<R, Error>
    where
        R: ReadableRegister<IdType = u8> + FromByteArray<Array = [u8; 1]>,
    {
        let value = self.read(R::id())?;
        R::from_bytes([value]).map_err(|_| Error::Decode)
    }

    pub(crate) fn write_typed<R>(&mut self, register: R) -> Result<(), Error>
    where
        R: WritableRegister<IdType = u8> + ToByteArray<Array = [u8; 1]>,
    {
        let [value] = register.to_bytes().map_err(|_| Error::Decode)?;
        self.write(R::id(), value)
    }
}
