//! Continuous receive loop
//!
//! [`RxLoop`] keeps the modem in RXCONT and reacts to two things:
//!
//! - board events (DIO edges, the push switch, a stop request) arriving on a
//!   channel
//! - a fixed tick, on which it samples RSSI and RegModemStat and, on boards
//!   without wired DIO lines, polls the IRQ flags itself
//!
//! Both paths end up in the same [`Modem::handle_irq_flags`] dispatch. A bus
//! error during dispatch drops the packet at hand and re-arms the receiver.
//! Whatever way [`RxLoop::run`] returns, the modem is back in SLEEP.

use std::io::Write;
use std::ops::ControlFlow;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError};
use embedded_hal::spi::SpiDevice;

use crate::board::{Board, BoardEvent, DioLine};
use crate::modem::{IrqHandler, Mode, Modem};
use crate::registers::IrqFlags;
use crate::Error;

/// Default sampling cadence.
pub const DEFAULT_TICK: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    /// Idle, the modem may be reconfigured.
    Standby,
    /// RXCONT armed and being polled.
    Armed,
}

/// Counters kept by the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RxStats {
    pub packets: u64,
    pub crc_errors: u64,
    /// Bus errors survived while handling an IRQ.
    pub bus_errors: u64,
    pub ticks: u64,
}

pub struct RxLoop<'b, B, W> {
    board: &'b mut B,
    report: W,
    events: Receiver<BoardEvent>,
    irq_lines: usize,
    tick: Duration,
    state: RxState,
    stats: RxStats,
}

impl<'b, B, W> RxLoop<'b, B, W>
where
    B: Board,
    W: Write,
{
    /// `irq_lines` is the number of DIO lines the board armed; with zero
    /// lines the loop polls the IRQ flags on every tick.
    pub fn new(board: &'b mut B, events: Receiver<BoardEvent>, irq_lines: usize, report: W) -> Self {
        Self {
            board,
            report,
            events,
            irq_lines,
            tick: DEFAULT_TICK,
            state: RxState::Standby,
            stats: RxStats::default(),
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn state(&self) -> RxState {
        self.state
    }

    pub fn stats(&self) -> RxStats {
        self.stats
    }

    /// Whether DIO edges are delivered as events.
    pub fn irq_events_available(&self) -> bool {
        self.irq_lines > 0
    }

    /// Resets the FIFO pointer and enters RXCONT.
    pub fn arm<SPI: SpiDevice>(&mut self, modem: &mut Modem<SPI>) -> Result<(), Error> {
        self.rearm(modem)?;
        self.state = RxState::Armed;
        tracing::info!(
            irq_lines = self.irq_lines,
            tick_ms = self.tick.as_millis() as u64,
            "receiver armed"
        );
        Ok(())
    }

    /// Runs until a [`BoardEvent::Stop`] arrives or the event channel closes,
    /// then puts the modem to SLEEP, also when the loop failed.
    pub fn run<SPI: SpiDevice>(&mut self, modem: &mut Modem<SPI>) -> Result<RxStats, Error> {
        let result = self.arm(modem).and_then(|()| self.poll(modem));

        self.state = RxState::Standby;
        let sleep = modem.set_mode(Mode::Sleep);
        if let Err(error) = &sleep {
            tracing::error!(%error, "could not put the modem to sleep");
        }
        result?;
        sleep?;

        tracing::info!(
            packets = self.stats.packets,
            crc_errors = self.stats.crc_errors,
            bus_errors = self.stats.bus_errors,
            "receiver stopped"
        );
        Ok(self.stats)
    }

    fn poll<SPI: SpiDevice>(&mut self, modem: &mut Modem<SPI>) -> Result<(), Error> {
        let mut next_tick = Instant::now() + self.tick;
        loop {
            let flow = match self.events.recv_deadline(next_tick) {
                Ok(event) => self.handle_event(modem, event)?,
                Err(RecvTimeoutError::Timeout) => {
                    next_tick += self.tick;
                    self.on_tick(modem)?;
                    ControlFlow::Continue(())
                }
                Err(RecvTimeoutError::Disconnected) => ControlFlow::Break(()),
            };
            if flow.is_break() {
                return Ok(());
            }
        }
    }

    /// Handles a single board event.
    pub fn handle_event<SPI: SpiDevice>(
        &mut self,
        modem: &mut Modem<SPI>,
        event: BoardEvent,
    ) -> Result<ControlFlow<()>, Error> {
        match event {
            BoardEvent::Dio(line) => {
                self.on_dio(modem, line)?;
                Ok(ControlFlow::Continue(()))
            }
            BoardEvent::Switch => {
                tracing::info!("switch pressed");
                Ok(ControlFlow::Continue(()))
            }
            BoardEvent::Stop => {
                tracing::info!("stop requested");
                Ok(ControlFlow::Break(()))
            }
        }
    }

    fn on_dio<SPI: SpiDevice>(&mut self, modem: &mut Modem<SPI>, line: DioLine) -> Result<(), Error> {
        tracing::debug!(?line, expected = ?modem.dio_line_flags(line), "DIO edge");
        self.dispatch(modem)
    }

    /// Samples signal quality and, without DIO lines, polls the IRQ flags.
    pub fn on_tick<SPI: SpiDevice>(&mut self, modem: &mut Modem<SPI>) -> Result<(), Error> {
        self.stats.ticks += 1;

        match (modem.get_rssi_value(), modem.get_modem_status()) {
            (Ok(rssi), Ok(status)) => {
                write!(
                    self.report,
                    "\r{} {} {}",
                    rssi,
                    status.rx_ongoing() as u8,
                    status.modem_clear() as u8
                )?;
                self.report.flush()?;
            }
            (Err(error), _) | (_, Err(error)) => {
                tracing::warn!(%error, "signal sample unreadable");
            }
        }

        if !self.irq_events_available() {
            self.dispatch(modem)?;
        }
        Ok(())
    }

    /// Runs the IRQ handlers. A bus error inside a handler is treated as
    /// noise: the packet being handled is lost, the receiver is re-armed and
    /// the loop goes on. Any other error ends the loop.
    fn dispatch<SPI: SpiDevice>(&mut self, modem: &mut Modem<SPI>) -> Result<(), Error> {
        let mut handler = RxHandler {
            board: &mut *self.board,
            report: &mut self.report,
            stats: &mut self.stats,
        };
        match modem.handle_irq_flags(&mut handler) {
            Ok(_) => Ok(()),
            Err(Error::Bus(kind)) => {
                self.stats.bus_errors += 1;
                tracing::warn!(%kind, "bus error while handling IRQ, re-arming");
                self.board.led_off();
                self.rearm(modem)
            }
            Err(error) => Err(error),
        }
    }

    fn rearm<SPI: SpiDevice>(&mut self, modem: &mut Modem<SPI>) -> Result<(), Error> {
        modem.reset_ptr_rx()?;
        modem.set_mode(Mode::RxContinuous)
    }
}

struct RxHandler<'a, B, W> {
    board: &'a mut B,
    report: &'a mut W,
    stats: &'a mut RxStats,
}

impl<SPI, B, W> IrqHandler<SPI> for RxHandler<'_, B, W>
where
    SPI: SpiDevice,
    B: Board,
    W: Write,
{
    /// Suspends reception, drains the FIFO, resets the pointer and only then
    /// re-arms RXCONT, so the next packet cannot land in a half-read buffer.
    fn on_rx_done(&mut self, modem: &mut Modem<SPI>, flags: IrqFlags) -> Result<(), Error> {
        self.board.led_on(true);
        modem.set_mode(Mode::Sleep)?;

        let payload = modem.read_payload()?;
        if flags.contains(IrqFlags::PAYLOAD_CRC_ERROR) {
            self.stats.crc_errors += 1;
            tracing::warn!(len = payload.len(), "payload CRC error, packet dropped");
            writeln!(self.report, "\nRxDone with CRC error, {} bytes dropped", payload.len())?;
        } else {
            self.stats.packets += 1;
            tracing::info!(len = payload.len(), "packet received");
            writeln!(self.report, "\nRxDone")?;
            writeln!(self.report, "Payload is {} bytes", payload.len())?;
            writeln!(self.report, "Payload: {:?}", payload)?;
            writeln!(
                self.report,
                "Payload decodes to: \"{}\"",
                String::from_utf8_lossy(&payload)
            )?;
        }
        self.report.flush()?;

        modem.reset_ptr_rx()?;
        self.board.led_off();
        modem.set_mode(Mode::RxContinuous)
    }

    /// Without RX_DONE a CRC error still leaves the pointer to re-arm.
    fn on_payload_crc_error(
        &mut self,
        modem: &mut Modem<SPI>,
        flags: IrqFlags,
    ) -> Result<(), Error> {
        if flags.contains(IrqFlags::RX_DONE) {
            return Ok(());
        }
        self.stats.crc_errors += 1;
        tracing::warn!(?flags, "PayloadCrcError");
        modem.reset_ptr_rx()
    }

    fn on_rx_timeout(&mut self, modem: &mut Modem<SPI>, flags: IrqFlags) -> Result<(), Error> {
        tracing::info!(?flags, "RxTimeout");
        modem.reset_ptr_rx()
    }
}
