//! Board adapter
//!
//! A board binds the modem's logical signals (reset, DIO0..=DIO5, an optional
//! LED and an optional push switch) to a concrete SPI transport and GPIO
//! pins. Everything except [`Board::open_transport`] is optional and
//! defaults to a no-op, so an SPI-only wiring implements a single method.
//!
//! Interrupt lines do not call into the driver directly. Each rising edge is
//! pushed as a [`BoardEvent`] into a channel that the receive loop drains on
//! its own thread, which keeps every SPI access on one call path.

use std::ops::{Deref, DerefMut};
use std::time::Duration;

use crossbeam_channel::Sender;
use embedded_hal::spi::SpiDevice;

use crate::Error;

/// Highest SPI clock the SX127x accepts.
pub const MAX_SPI_CLOCK_HZ: u32 = 10_000_000;

/// Clock used by the bundled boards, half the rated maximum.
pub const DEFAULT_SPI_CLOCK_HZ: u32 = MAX_SPI_CLOCK_HZ / 2;

/// Minimum debounce applied to the push switch.
pub const SWITCH_DEBOUNCE: Duration = Duration::from_millis(300);

/// One of the modem's six DIO pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DioLine {
    Dio0,
    Dio1,
    Dio2,
    Dio3,
    Dio4,
    Dio5,
}

impl DioLine {
    pub const ALL: [DioLine; 6] = [
        DioLine::Dio0,
        DioLine::Dio1,
        DioLine::Dio2,
        DioLine::Dio3,
        DioLine::Dio4,
        DioLine::Dio5,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Something that happened on the board, in the order it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEvent {
    /// Rising edge on a DIO line.
    Dio(DioLine),
    /// The push switch was pressed.
    Switch,
    /// Cooperative cancellation, e.g. from a termination signal.
    Stop,
}

/// Capabilities of a board carrying an SX127x modem.
pub trait Board {
    type Transport: SpiDevice;

    /// `true` when the RF front end uses the low frequency matching network
    /// (bands 1 and 2: 137-175 MHz and 410-525 MHz), `false` for band 3
    /// (862-1020 MHz).
    fn is_low_band_frontend(&self) -> bool;

    /// Opens the SPI transport to the modem at or below
    /// [`DEFAULT_SPI_CLOCK_HZ`].
    fn open_transport(&mut self, bus: u8, chip_select: u8) -> Result<Self::Transport, Error>;

    /// Claims GPIO pins and configures the DIO inputs.
    fn setup(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Releases every GPIO claim. Must tolerate a partial or missing setup
    /// and repeated calls.
    fn teardown(&mut self) {}

    /// Pulses the modem reset line.
    fn reset(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Arms rising-edge detection on the DIO lines the board wires up, and on
    /// the push switch when `switch` is set. Events are pushed into `events`.
    ///
    /// Returns the number of DIO lines armed; zero means the driver has to
    /// poll the IRQ flags itself.
    fn register_interrupts(
        &mut self,
        events: &Sender<BoardEvent>,
        switch: bool,
    ) -> Result<usize, Error> {
        let _ = (events, switch);
        Ok(0)
    }

    /// Switches the LED and returns the requested state.
    fn led_on(&mut self, on: bool) -> bool {
        on
    }

    fn led_off(&mut self) -> bool {
        self.led_on(false)
    }

    /// Blinks the LED `count` times.
    fn blink(&mut self, period: Duration, count: u32) {
        if count == 0 {
            return;
        }
        self.led_on(true);
        for _ in 0..count {
            std::thread::sleep(period);
            self.led_off();
            std::thread::sleep(period);
            self.led_on(true);
        }
        self.led_off();
    }
}

/// A board that has been set up and is torn down when dropped.
///
/// Teardown runs on every exit path, including a failed `setup` and early
/// returns through `?`.
pub struct BoardSession<B: Board> {
    board: B,
}

impl<B: Board> BoardSession<B> {
    pub fn setup(mut board: B) -> Result<Self, Error> {
        if let Err(error) = board.setup() {
            tracing::error!(%error, "board setup failed");
            board.teardown();
            return Err(error);
        }
        tracing::debug!(low_band = board.is_low_band_frontend(), "board ready");
        Ok(Self { board })
    }
}

impl<B: Board> Deref for BoardSession<B> {
    type Target = B;

    fn deref(&self) -> &B {
        &self.board
    }
}

impl<B: Board> DerefMut for BoardSession<B> {
    fn deref_mut(&mut self) -> &mut B {
        &mut self.board
    }
}

impl<B: Board> Drop for BoardSession<B> {
    fn drop(&mut self) {
        self.board.teardown();
        tracing::debug!("board torn down");
    }
}
