//! `embedded-hal` SPI device on top of the Linux spidev driver.

use core::fmt;

use embedded_hal::spi::{ErrorKind, ErrorType, Operation, SpiDevice};
use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use crate::Error;

/// spidev transport; every transaction is a single full-duplex transfer with
/// chip select held low throughout.
pub struct RppalSpi {
    spi: Spi,
}

impl RppalSpi {
    pub fn open(bus: u8, chip_select: u8, clock_hz: u32) -> Result<Self, Error> {
        let bus = match bus {
            0 => Bus::Spi0,
            1 => Bus::Spi1,
            2 => Bus::Spi2,
            3 => Bus::Spi3,
            4 => Bus::Spi4,
            5 => Bus::Spi5,
            6 => Bus::Spi6,
            _ => return Err(Error::Board(format!("no SPI bus {bus}"))),
        };
        let slave_select = match chip_select {
            0 => SlaveSelect::Ss0,
            1 => SlaveSelect::Ss1,
            2 => SlaveSelect::Ss2,
            _ => return Err(Error::Board(format!("no chip select {chip_select}"))),
        };

        let spi = Spi::new(bus, slave_select, clock_hz, Mode::Mode0)
            .map_err(|e| Error::Board(format!("opening SPI: {e}")))?;
        tracing::debug!(?bus, ?slave_select, clock_hz, "SPI opened");
        Ok(Self { spi })
    }
}

#[derive(Debug)]
pub struct TransportError(rppal::spi::Error);

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spidev transfer failed: {}", self.0)
    }
}

impl embedded_hal::spi::Error for TransportError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl ErrorType for RppalSpi {
    type Error = TransportError;
}

impl SpiDevice for RppalSpi {
    /// Flattens the operations into one buffer so the SX127x sees a single
    /// chip-select window. `DelayNs` operations are not supported by spidev
    /// transfers and are skipped.
    fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), Self::Error> {
        let mut tx = Vec::new();
        for operation in operations.iter() {
            match operation {
                Operation::Read(read) => tx.resize(tx.len() + read.len(), 0),
                Operation::Write(write) => tx.extend_from_slice(write),
                Operation::Transfer(read, write) => {
                    let end = tx.len() + read.len().max(write.len());
                    tx.extend_from_slice(write);
                    tx.resize(end, 0);
                }
                Operation::TransferInPlace(buffer) => tx.extend_from_slice(buffer),
                Operation::DelayNs(_) => {}
            }
        }

        let mut rx = vec![0u8; tx.len()];
        self.spi.transfer(&mut rx, &tx).map_err(TransportError)?;

        let mut offset = 0;
        for operation in operations.iter_mut() {
            match operation {
                Operation::Read(read) => {
                    read.copy_from_slice(&rx[offset..offset + read.len()]);
                    offset += read.len();
                }
                Operation::Write(write) => offset += write.len(),
                Operation::Transfer(read, write) => {
                    let len = read.len();
                    read.copy_from_slice(&rx[offset..offset + len]);
                    offset += len.max(write.len());
                }
                Operation::TransferInPlace(buffer) => {
                    let len = buffer.len();
                    buffer.copy_from_slice(&rx[offset..offset + len]);
                    offset += len;
                }
                Operation::DelayNs(_) => {}
            }
        }
        Ok(())
    }
}
