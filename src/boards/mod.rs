//! Raspberry Pi boards
//!
//! Every supported HAT differs only in which BCM pins carry the modem's
//! signals, so a board is a [`Layout`] plus a [`RpiBoard`] that claims those
//! pins through `rppal`.

mod spi;

pub use spi::{RppalSpi, TransportError};

use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use rppal::gpio::{Gpio, InputPin, OutputPin, Trigger};

use crate::board::{Board, BoardEvent, DioLine, DEFAULT_SPI_CLOCK_HZ, SWITCH_DEBOUNCE};
use crate::Error;

/// BCM pin assignment of a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub name: &'static str,
    /// DIO0 first. Lines past the end of the slice are not wired.
    pub dio: &'static [u8],
    pub reset: Option<u8>,
    pub led: Option<u8>,
    pub switch: Option<u8>,
    pub low_band: bool,
    /// Chip select the board is wired to.
    pub chip_select: u8,
}

/// Modtronix inAir9B on the Pi header, 433 MHz front end.
pub const INAIR9B: Layout = Layout {
    name: "inAir9B",
    dio: &[22, 23, 24, 25],
    reset: None,
    led: Some(18),
    switch: Some(4),
    low_band: true,
    chip_select: 0,
};

/// Adafruit LoRa Radio Bonnet (RFM95W, 915 MHz).
pub const ADAFRUIT_4074: Layout = Layout {
    name: "Adafruit 4074",
    dio: &[22, 23, 24],
    reset: Some(25),
    led: None,
    switch: None,
    low_band: false,
    chip_select: 1,
};

/// Bare RFM95W breakout with only SPI connected.
pub const GENERIC_RFM95W: Layout = Layout {
    name: "RFM95W",
    dio: &[],
    reset: None,
    led: None,
    switch: None,
    low_band: false,
    chip_select: 0,
};

/// Board variants selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BoardKind {
    Inair9b,
    Adafruit4074,
    Rfm95w,
}

impl BoardKind {
    pub fn layout(self) -> &'static Layout {
        match self {
            BoardKind::Inair9b => &INAIR9B,
            BoardKind::Adafruit4074 => &ADAFRUIT_4074,
            BoardKind::Rfm95w => &GENERIC_RFM95W,
        }
    }
}

/// Board selection shared by the command line tools.
#[derive(Debug, Clone, clap::Args)]
pub struct BoardArgs {
    /// Board the modem sits on
    #[arg(long, value_enum, env = "SPI_LORA_BOARD", default_value_t = BoardKind::Rfm95w)]
    pub board: BoardKind,

    /// SPI bus number
    #[arg(long, env = "SPI_LORA_BUS", default_value_t = 0)]
    pub bus: u8,

    /// SPI chip select, defaults to the board's wiring
    #[arg(long = "cs", env = "SPI_LORA_CS")]
    pub chip_select: Option<u8>,
}

impl BoardArgs {
    pub fn chip_select(&self) -> u8 {
        self.chip_select
            .unwrap_or(self.board.layout().chip_select)
    }

    pub fn board(&self) -> RpiBoard {
        RpiBoard::new(self.board.layout())
    }
}

/// A board on the Raspberry Pi GPIO header.
pub struct RpiBoard {
    layout: &'static Layout,
    dio: Vec<InputPin>,
    switch: Option<InputPin>,
    led: Option<OutputPin>,
    reset: Option<OutputPin>,
}

fn gpio_error(error: rppal::gpio::Error) -> Error {
    Error::Board(format!("GPIO: {error}"))
}

impl RpiBoard {
    pub fn new(layout: &'static Layout) -> Self {
        Self {
            layout,
            dio: Vec::new(),
            switch: None,
            led: None,
            reset: None,
        }
    }

    pub fn layout(&self) -> &'static Layout {
        self.layout
    }

    fn uses_gpio(&self) -> bool {
        let layout = self.layout;
        !layout.dio.is_empty() || layout.reset.is_some() || layout.led.is_some() || layout.switch.is_some()
    }
}

impl Board for RpiBoard {
    type Transport = RppalSpi;

    fn is_low_band_frontend(&self) -> bool {
        self.layout.low_band
    }

    fn open_transport(&mut self, bus: u8, chip_select: u8) -> Result<RppalSpi, Error> {
        RppalSpi::open(bus, chip_select, DEFAULT_SPI_CLOCK_HZ)
    }

    fn setup(&mut self) -> Result<(), Error> {
        if !self.uses_gpio() {
            return Ok(());
        }
        let gpio = Gpio::new().map_err(gpio_error)?;

        for &pin in self.layout.dio {
            self.dio
                .push(gpio.get(pin).map_err(gpio_error)?.into_input_pulldown());
        }
        if let Some(pin) = self.layout.switch {
            self.switch = Some(gpio.get(pin).map_err(gpio_error)?.into_input_pulldown());
        }
        if let Some(pin) = self.layout.reset {
            self.reset = Some(gpio.get(pin).map_err(gpio_error)?.into_output_high());
        }
        if let Some(pin) = self.layout.led {
            self.led = Some(gpio.get(pin).map_err(gpio_error)?.into_output_low());
            self.blink(Duration::from_millis(100), 2);
        }
        tracing::info!(board = self.layout.name, dio_lines = self.dio.len(), "GPIO claimed");
        Ok(())
    }

    fn teardown(&mut self) {
        for pin in &mut self.dio {
            if let Err(error) = pin.clear_async_interrupt() {
                tracing::warn!(%error, "clearing DIO interrupt");
            }
        }
        if let Some(pin) = &mut self.switch {
            if let Err(error) = pin.clear_async_interrupt() {
                tracing::warn!(%error, "clearing switch interrupt");
            }
        }
        if let Some(led) = &mut self.led {
            led.set_low();
        }
        // dropped pins revert to their previous mode
        self.dio.clear();
        self.switch = None;
        self.led = None;
        self.reset = None;
    }

    /// Holds NRESET low for 1 ms, then waits 5 ms for the chip to come up.
    fn reset(&mut self) -> Result<(), Error> {
        let Some(pin) = &mut self.reset else {
            tracing::debug!(board = self.layout.name, "no reset line");
            return Ok(());
        };
        pin.set_low();
        thread::sleep(Duration::from_millis(1));
        pin.set_high();
        thread::sleep(Duration::from_millis(5));
        Ok(())
    }

    fn register_interrupts(
        &mut self,
        events: &Sender<BoardEvent>,
        switch: bool,
    ) -> Result<usize, Error> {
        for (pin, line) in self.dio.iter_mut().zip(DioLine::ALL) {
            let events = events.clone();
            pin.set_async_interrupt(Trigger::RisingEdge, None, move |_| {
                let _ = events.send(BoardEvent::Dio(line));
            })
            .map_err(gpio_error)?;
        }
        for line in DioLine::ALL.iter().skip(self.dio.len()) {
            tracing::debug!(?line, board = self.layout.name, "not wired, no events");
        }

        if switch {
            if let Some(pin) = &mut self.switch {
                let events = events.clone();
                pin.set_async_interrupt(Trigger::RisingEdge, Some(SWITCH_DEBOUNCE), move |_| {
                    let _ = events.send(BoardEvent::Switch);
                })
                .map_err(gpio_error)?;
            }
        }
        Ok(self.dio.len())
    }

    fn led_on(&mut self, on: bool) -> bool {
        if let Some(led) = &mut self.led {
            if on {
                led.set_high();
            } else {
                led.set_low();
            }
        }
        on
    }
}
