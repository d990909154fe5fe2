//! Interrupt flag decoding and dispatch
//!
//! The radio raises events by setting bits in RegIrqFlags and, depending on
//! the DIO mapping, by driving one of its DIO pins high. Whatever the path, a
//! poll reads the flags register once and hands every set bit to the
//! matching [`IrqHandler`] method in [`DISPATCH_ORDER`].

use embedded_hal::spi::SpiDevice;

use super::Modem;
use crate::board::DioLine;
use crate::registers::{DioMapping1, DioMapping2, IrqFlags, RegIrqFlags};
use crate::Error;

/// Order in which simultaneous flags are handed to the handler.
pub const DISPATCH_ORDER: [IrqFlags; 8] = [
    IrqFlags::RX_DONE,
    IrqFlags::TX_DONE,
    IrqFlags::CAD_DONE,
    IrqFlags::RX_TIMEOUT,
    IrqFlags::VALID_HEADER,
    IrqFlags::PAYLOAD_CRC_ERROR,
    IrqFlags::FHSS_CHANGE_CHANNEL,
    IrqFlags::CAD_DETECTED,
];

/// Flags a DIO line reflects under the given 2-bit mapping value.
///
/// PllLock, ModeReady and ClkOut have no IRQ flag and map to an empty set.
pub fn dio_line_flags(line: DioLine, mapping: u8) -> IrqFlags {
    match (line, mapping) {
        (DioLine::Dio0, 0) => IrqFlags::RX_DONE,
        (DioLine::Dio0, 1) => IrqFlags::TX_DONE,
        (DioLine::Dio0, 2) => IrqFlags::CAD_DONE,
        (DioLine::Dio1, 0) => IrqFlags::RX_TIMEOUT,
        (DioLine::Dio1, 1) => IrqFlags::FHSS_CHANGE_CHANNEL,
        (DioLine::Dio1, 2) => IrqFlags::CAD_DETECTED,
        (DioLine::Dio2, 0..=2) => IrqFlags::FHSS_CHANGE_CHANNEL,
        (DioLine::Dio3, 0) => IrqFlags::CAD_DONE,
        (DioLine::Dio3, 1) => IrqFlags::VALID_HEADER,
        (DioLine::Dio3, 2) => IrqFlags::PAYLOAD_CRC_ERROR,
        (DioLine::Dio4, 0) => IrqFlags::CAD_DETECTED,
        _ => IrqFlags::empty(),
    }
}

/// Receives decoded interrupt events.
///
/// Every method defaults to logging the event. `flags` is the full snapshot
/// read for the current poll, so a handler can look at related bits (e.g.
/// PAYLOAD_CRC_ERROR while handling RX_DONE).
pub trait IrqHandler<SPI> {
    fn on_rx_done(&mut self, _modem: &mut Modem<SPI>, flags: IrqFlags) -> Result<(), Error> {
        tracing::info!(?flags, "RxDone");
        Ok(())
    }

    fn on_tx_done(&mut self, _modem: &mut Modem<SPI>, flags: IrqFlags) -> Result<(), Error> {
        tracing::info!(?flags, "TxDone");
        Ok(())
    }

    fn on_cad_done(&mut self, _modem: &mut Modem<SPI>, flags: IrqFlags) -> Result<(), Error> {
        tracing::info!(?flags, "CadDone");
        Ok(())
    }

    fn on_rx_timeout(&mut self, _modem: &mut Modem<SPI>, flags: IrqFlags) -> Result<(), Error> {
        tracing::info!(?flags, "RxTimeout");
        Ok(())
    }

    fn on_valid_header(&mut self, _modem: &mut Modem<SPI>, flags: IrqFlags) -> Result<(), Error> {
        tracing::info!(?flags, "ValidHeader");
        Ok(())
    }

    fn on_payload_crc_error(
        &mut self,
        _modem: &mut Modem<SPI>,
        flags: IrqFlags,
    ) -> Result<(), Error> {
        tracing::info!(?flags, "PayloadCrcError");
        Ok(())
    }

    fn on_fhss_change_channel(
        &mut self,
        _modem: &mut Modem<SPI>,
        flags: IrqFlags,
    ) -> Result<(), Error> {
        tracing::info!(?flags, "FhssChangeChannel");
        Ok(())
    }

    fn on_cad_detected(&mut self, _modem: &mut Modem<SPI>, flags: IrqFlags) -> Result<(), Error> {
        tracing::info!(?flags, "CadDetected");
        Ok(())
    }
}

fn dispatch<SPI, H>(
    handler: &mut H,
    modem: &mut Modem<SPI>,
    event: IrqFlags,
    flags: IrqFlags,
) -> Result<(), Error>
where
    H: IrqHandler<SPI> + ?Sized,
{
    if event == IrqFlags::RX_DONE {
        handler.on_rx_done(modem, flags)
    } else if event == IrqFlags::TX_DONE {
        handler.on_tx_done(modem, flags)
    } else if event == IrqFlags::CAD_DONE {
        handler.on_cad_done(modem, flags)
    } else if event == IrqFlags::RX_TIMEOUT {
        handler.on_rx_timeout(modem, flags)
    } else if event == IrqFlags::VALID_HEADER {
        handler.on_valid_header(modem, flags)
    } else if event == IrqFlags::PAYLOAD_CRC_ERROR {
        handler.on_payload_crc_error(modem, flags)
    } else if event == IrqFlags::FHSS_CHANGE_CHANNEL {
        handler.on_fhss_change_channel(modem, flags)
    } else if event == IrqFlags::CAD_DETECTED {
        handler.on_cad_detected(modem, flags)
    } else {
        Ok(())
    }
}

impl<SPI> Modem<SPI>
where
    SPI: SpiDevice,
{
    /// Selects what each of the 6 DIO lines reflects, DIO0 first.
    pub fn set_dio_mapping(&mut self, mapping: [u8; 6]) -> Result<(), Error> {
        for (line, value) in mapping.into_iter().enumerate() {
            if value > 3 {
                return Err(Error::InvalidDioMapping { line, value });
            }
        }

        let preamble = self.read_typed::<DioMapping2>()?.map_preamble_detect;
        self.write_typed(DioMapping1 {
            dio0: mapping[0],
            dio1: mapping[1],
            dio2: mapping[2],
            dio3: mapping[3],
        })?;
        self.write_typed(DioMapping2 {
            dio4: mapping[4],
            dio5: mapping[5],
            map_preamble_detect: preamble,
        })?;
        self.dio_mapping = mapping;
        Ok(())
    }

    /// Reads the DIO mapping back from the radio.
    pub fn get_dio_mapping(&mut self) -> Result<[u8; 6], Error> {
        let first: DioMapping1 = self.read_typed()?;
        let second: DioMapping2 = self.read_typed()?;
        Ok([
            first.dio0,
            first.dio1,
            first.dio2,
            first.dio3,
            second.dio4,
            second.dio5,
        ])
    }

    /// Flags the given line is currently configured to signal.
    pub fn dio_line_flags(&self, line: DioLine) -> IrqFlags {
        dio_line_flags(line, self.dio_mapping[line.index()])
    }

    /// Reads RegIrqFlags.
    pub fn get_irq_flags(&mut self) -> Result<IrqFlags, Error> {
        Ok(self.read_typed::<RegIrqFlags>()?.flags)
    }

    /// Acknowledges the given flags, leaving every other bit untouched.
    pub fn clear_irq_flags(&mut self, flags: IrqFlags) -> Result<(), Error> {
        if flags.is_empty() {
            return Ok(());
        }
        self.write_typed(RegIrqFlags { flags })
    }

    /// Reads the flags once and hands every set bit to `handler`.
    ///
    /// Each bit is acknowledged right before its handler runs, so a handler
    /// that re-arms reception cannot have a fresh event wiped by a late
    /// clear. An unreadable flags register counts as "no events". Returns the
    /// flags that were dispatched.
    pub fn handle_irq_flags<H>(&mut self, handler: &mut H) -> Result<IrqFlags, Error>
    where
        H: IrqHandler<SPI> + ?Sized,
    {
        let flags = match self.get_irq_flags() {
            Ok(flags) => flags,
            Err(error) => {
                tracing::warn!(%error, "IRQ flags unreadable, skipping poll");
                return Ok(IrqFlags::empty());
            }
        };

        let mut dispatched = IrqFlags::empty();
        for event in DISPATCH_ORDER {
            if !flags.contains(event) {
                continue;
            }
            self.clear_irq_flags(event)?;
            dispatch(handler, self, event, flags)?;
            dispatched |= event;
        }
        Ok(dispatched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use embedded_hal_mock::eh1::spi::{Mock as SpiDevice, Transaction as SpiTransaction};

    struct Defaults;

    impl<SPI> IrqHandler<SPI> for Defaults {}

    #[test]
    fn default_handlers_acknowledge_and_succeed() {
        let expectations = [
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x81, 0x80]),
            SpiTransaction::transaction_end(),
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x81, 0x81]),
            SpiTransaction::transaction_end(),
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x12]),
            SpiTransaction::read_vec(vec![0x08]),
            SpiTransaction::transaction_end(),
            SpiTransaction::transaction_start(),
            SpiTransaction::write_vec(vec![0x92, 0x08]),
            SpiTransaction::transaction_end(),
        ];
        let mut modem = Modem::new(SpiDevice::<u8>::new(&expectations), false).unwrap();

        let dispatched = modem.handle_irq_flags(&mut Defaults).unwrap();
        assert_eq!(dispatched, IrqFlags::TX_DONE);

        modem.release().done();
    }

    #[test]
    fn dio0_follows_mapping() {
        assert_eq!(dio_line_flags(DioLine::Dio0, 0), IrqFlags::RX_DONE);
        assert_eq!(dio_line_flags(DioLine::Dio0, 1), IrqFlags::TX_DONE);
        assert_eq!(dio_line_flags(DioLine::Dio0, 3), IrqFlags::empty());
    }

    #[test]
    fn dio5_carries_no_irq_flag() {
        for mapping in 0..=3 {
            assert!(dio_line_flags(DioLine::Dio5, mapping).is_empty());
        }
    }

    #[test]
    fn dispatch_order_covers_every_flag_once() {
        let all = DISPATCH_ORDER
            .iter()
            .fold(IrqFlags::empty(), |acc, &flag| acc | flag);
        assert_eq!(all, IrqFlags::all());
        assert_eq!(DISPATCH_ORDER[0], IrqFlags::RX_DONE);
        assert_eq!(DISPATCH_ORDER[1], IrqFlags::TX_DONE);
    }
}
