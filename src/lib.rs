//! SX127x LoRa modem driver
//!
//! Register-level access to Semtech SX1272/3/6/7/8/9 modems (HopeRF RFM9x,
//! Modtronix inAir) in LoRa mode over a Linux SPI bus.
//!
//! # Architecture
//!
//! - [`device`]: raw register transport. One SPI transaction per access,
//!   bit 7 of the address byte selects write.
//! - [`registers`]: register map and typed registers built on `regiface`.
//! - [`modem`]: the [`Modem`] state machine. Tracks the transceiver mode and
//!   DIO mapping and dispatches IRQ flags to an [`IrqHandler`].
//! - [`board`]: the [`Board`] adapter trait binding reset, DIO lines, LED and
//!   switch to a transport. Interrupts arrive as [`BoardEvent`]s on a channel.
//! - [`rx`]: the continuous receive loop.
//! - [`dump`]: text register dumps and verified table loads.
//! - `boards` (feature `rpi`): Raspberry Pi boards over `rppal`.
//!
//! # Important Notes
//! - The first mode written in a session must be SLEEP; the LoRa bit only
//!   changes there
//! - Frequency, bandwidth and spreading factor are only accepted in SLEEP or
//!   STANDBY
//! - Reading address 0x00 pops the FIFO
//!
//! # Example
//! ```no_run
//! use embedded_hal::spi::SpiDevice;
//! use spi_lora::{Error, Mode, Modem};
//!
//! fn listen<SPI: SpiDevice>(spi: SPI) -> Result<Modem<SPI>, Error> {
//!     // SLEEP, then STANDBY
//!     let mut modem = Modem::new(spi, false)?;
//!     modem.set_freq(868.1)?;
//!     modem.set_dio_mapping([0; 6])?;
//!     modem.set_mode(Mode::RxContinuous)?;
//!     Ok(modem)
//! }
//! ```

pub mod board;
#[cfg(feature = "rpi")]
pub mod boards;
pub mod device;
pub mod dump;
pub mod error;
pub mod modem;
pub mod registers;
pub mod rx;

pub use board::{Board, BoardEvent, BoardSession, DioLine};
pub use device::Device;
pub use error::Error;
pub use modem::{IrqHandler, Mode, Modem, ModemStatus, Summary};
pub use registers::{Bandwidth, CodingRate, IrqFlags};
pub use rx::{RxLoop, RxStats};
