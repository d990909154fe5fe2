//! SX127x Register Access Layer
//!
//! This module provides the low-level interface to the radio's register file
//! over SPI. It supports both synchronous and asynchronous operations.
//!
//! Every access is a single SPI transaction that starts with an address byte:
//! bit 7 set for a write, clear for a read. The SX127x auto-increments the
//! address for every further byte clocked in the same transaction, except on
//! the FIFO register (0x00) where each byte pops the next FIFO entry.
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use spi_lora::{Device, Error};
//!
//! fn version<SPI: SpiDevice>(spi: SPI) -> Result<u8, Error> {
//!     let mut device = Device::new(spi);
//!     device.read(0x42)
//! }
//! ```

use embedded_hal::spi::Error as _;
use regiface::{ByteArray, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

use crate::registers::MAX_ADDRESS;
use crate::Error;

const WRITE_FLAG: u8 = 0x80;

/// Main register interface for the SX127x radio.
///
/// This struct wraps an SPI device and owns it exclusively; the SPI bus must
/// not be shared with another call path while a transaction is in flight.
pub struct Device<SPI> {
    spi: SPI,
}

impl<SPI> Device<SPI> {
    /// Creates a new Device instance wrapping the provided SPI interface.
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Releases the underlying SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }
}

fn check_address(address: u8) -> Result<u8, Error> {
    if address > MAX_ADDRESS {
        return Err(Error::AddressOutOfRange(address.into()));
    }
    Ok(address)
}

impl<SPI> Device<SPI>
where
    SPI: embedded_hal::spi::SpiDevice,
{
    /// Reads a single register.
    ///
    /// # Errors
    /// * `Error::AddressOutOfRange` - address above 0x7F
    /// * `Error::Bus` - SPI communication failed
    pub fn read(&mut self, address: u8) -> Result<u8, Error> {
        let mut value = [0u8];
        self.burst_read(address, &mut value)?;
        Ok(value[0])
    }

    /// Writes a single register.
    ///
    /// The write is not read back; callers that need to know the value
    /// landed must verify it themselves.
    pub fn write(&mut self, address: u8, value: u8) -> Result<(), Error> {
        let address = check_address(address)?;

        self.spi
            .transaction(&mut [embedded_hal::spi::Operation::Write(&[
                address | WRITE_FLAG,
                value,
            ])])
            .map_err(|e| Error::Bus(e.kind()))
    }

    /// Reads `bytes.len()` bytes starting at `address` in one transaction.
    ///
    /// On the FIFO register this drains consecutive FIFO entries.
    pub fn burst_read(&mut self, address: u8, bytes: &mut [u8]) -> Result<(), Error> {
        let address = check_address(address)?;

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[address]),
                embedded_hal::spi::Operation::Read(bytes),
            ])
            .map_err(|e| Error::Bus(e.kind()))
    }

    /// Reads a typed register.
    ///
    /// # Errors
    /// * `Error::Bus` - SPI communication failed
    /// * `Error::Decode` - Failed to parse register value
    pub fn read_register<R>(&mut self) -> Result<R, Error>
    where
        R: ReadableRegister<IdType = u8>,
    {
        let mut raw_value = R::Array::new();
        self.burst_read(R::id(), raw_value.as_mut())?;

        R::from_bytes(raw_value).map_err(|_| Error::Decode)
    }

    /// Writes a typed register.
    pub fn write_register<R>(&mut self, register: R) -> Result<(), Error>
    where
        R: WritableRegister<IdType = u8>,
    {
        let address = check_address(R::id())?;
        let raw_value = register.to_bytes().map_err(|_| Error::Decode)?;

        self.spi
            .transaction(&mut [
                embedded_hal::spi::Operation::Write(&[address | WRITE_FLAG]),
                embedded_hal::spi::Operation::Write(raw_value.as_ref()),
            ])
            .map_err(|e| Error::Bus(e.kind()))
    }
}

impl<SPI> Device<SPI>
where
    SPI: embedded_hal_async::spi::SpiDevice,
{
    /// Asynchronously reads a single register.
    ///
    /// This is the async version of [`read`](Device::read).
    pub async fn read_async(&mut self, address: u8) -> Result<u8, Error> {
        let mut value = [0u8];
        self.burst_read_async(address, &mut value).await?;
        Ok(value[0])
    }

    /// Asynchronously writes a single register.
    ///
    /// This is the async version of [`write`](Device::write).
    pub async fn write_async(&mut self, address: u8, value: u8) -> Result<(), Error> {
        let address = check_address(address)?;

        self.spi
            .transaction(&mut [embedded_hal_async::spi::Operation::Write(&[
                address | WRITE_FLAG,
                value,
            ])])
            .await
            .map_err(|e| Error::Bus(e.kind()))
    }

    /// Asynchronously reads consecutive bytes in one transaction.
    ///
    /// This is the async version of [`burst_read`](Device::burst_read).
    pub async fn burst_read_async(&mut self, address: u8, bytes: &mut [u8]) -> Result<(), Error> {
        let address = check_address(address)?;

        self.spi
            .transaction(&mut [
                embedded_hal_async::spi::Operation::Write(&[address]),
                embedded_hal_async::spi::Operation::Read(bytes),
            ])
            .await
            .map_err(|e| Error::Bus(e.kind()))
    }
}
