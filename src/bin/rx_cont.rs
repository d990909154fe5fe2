//! Continuous LoRa receiver
//!
//! Configures the modem, then prints every received packet until interrupted.
//! Between packets a status line shows RSSI, rx_ongoing and modem_clear.

use std::io;
use std::time::Duration;

use anyhow::Context;
use clap::{ArgAction, Parser};
use spi_lora::board::{Board, BoardEvent, BoardSession};
use spi_lora::boards::BoardArgs;
use spi_lora::{Bandwidth, CodingRate, Error, Mode, Modem, RxLoop, RxStats};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rx_cont", about = "Continuous LoRa receiver")]
struct Cli {
    /// Carrier frequency in MHz
    #[arg(short, long)]
    freq: Option<f64>,

    /// Bandwidth in kHz (7.8, 10.4, 15.6, 20.8, 31.25, 41.7, 62.5, 125, 250, 500)
    #[arg(long, value_parser = parse_bandwidth)]
    bw: Option<Bandwidth>,

    /// Coding rate denominator, 5..=8 for 4/5..4/8
    #[arg(long, value_parser = parse_coding_rate)]
    cr: Option<CodingRate>,

    /// Spreading factor
    #[arg(long, value_parser = clap::value_parser!(u8).range(6..=12))]
    sf: Option<u8>,

    /// Enable or disable the payload CRC check
    #[arg(long)]
    rx_crc: Option<bool>,

    /// Status line period in milliseconds
    #[arg(long, default_value_t = 500, value_parser = clap::value_parser!(u64).range(1..))]
    tick_ms: u64,

    /// Route the PA to PA_BOOST instead of RFO
    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    pa_boost: bool,

    /// Pulse the modem reset line before starting
    #[arg(long)]
    reset: bool,

    #[command(flatten)]
    board: BoardArgs,
}

fn parse_bandwidth(value: &str) -> Result<Bandwidth, String> {
    let khz: f64 = value.parse().map_err(|e| format!("{e}"))?;
    let hz = (khz * 1000.0).round() as u32;
    (0..=9)
        .filter_map(|raw: u8| Bandwidth::try_from(raw).ok())
        .find(|bw| bw.hz() == hz)
        .ok_or_else(|| format!("{value} kHz is not a LoRa bandwidth"))
}

fn parse_coding_rate(value: &str) -> Result<CodingRate, String> {
    let denominator: u8 = value.parse().map_err(|e| format!("{e}"))?;
    denominator
        .checked_sub(4)
        .and_then(|cr| CodingRate::try_from(cr).ok())
        .ok_or_else(|| format!("coding rate 4/{value} is not supported"))
}

fn configure<SPI: embedded_hal::spi::SpiDevice>(
    modem: &mut Modem<SPI>,
    cli: &Cli,
) -> anyhow::Result<()> {
    modem.set_mode(Mode::Sleep)?;
    modem.set_dio_mapping([0; 6])?;
    modem.set_mode(Mode::Standby)?;

    if let Some(freq) = cli.freq {
        modem.set_freq(freq)?;
    }
    if let Some(bw) = cli.bw {
        modem.set_bw(bw)?;
    }
    if let Some(cr) = cli.cr {
        modem.set_coding_rate(cr)?;
    }
    if let Some(sf) = cli.sf {
        modem.set_spreading_factor(sf)?;
    }
    if let Some(crc) = cli.rx_crc {
        modem.set_rx_crc(crc)?;
    }
    modem.set_pa_select(cli.pa_boost)?;
    Ok(())
}

/// Prints the closing summary without letting it mask the loop's outcome.
fn finish<SPI: embedded_hal::spi::SpiDevice>(
    modem: &mut Modem<SPI>,
    result: Result<RxStats, Error>,
) -> anyhow::Result<RxStats> {
    println!();
    match modem.summary() {
        Ok(summary) => println!("{summary}"),
        Err(error) => tracing::warn!(%error, "could not read the final configuration"),
    }
    Ok(result?)
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let mut board = BoardSession::setup(cli.board.board()).context("setting up the board")?;
    if cli.reset {
        board.reset()?;
    }
    let spi = board.open_transport(cli.board.bus, cli.board.chip_select())?;
    let mut modem = Modem::new(spi, board.is_low_band_frontend())?;

    configure(&mut modem, &cli)?;
    println!("{}", modem.summary()?);
    if !modem.get_agc_auto_on()? {
        tracing::warn!("AGC auto is off, RSSI readings may be off");
    }

    let (events, receiver) = crossbeam_channel::unbounded();
    let irq_lines = board.register_interrupts(&events, true)?;
    ctrlc::set_handler(move || {
        let _ = events.send(BoardEvent::Stop);
    })
    .context("installing the termination handler")?;

    let result = RxLoop::new(&mut *board, receiver, irq_lines, io::stdout())
        .with_tick(Duration::from_millis(cli.tick_ms))
        .run(&mut modem);
    let stats = finish(&mut modem, result)?;
    tracing::info!(
        packets = stats.packets,
        crc_errors = stats.crc_errors,
        ticks = stats.ticks,
        "done"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::spi::{ErrorKind, ErrorType, Operation, SpiDevice};

    /// Accepts writes, fails every read.
    struct WriteOnly;

    #[derive(Debug)]
    struct ReadFailed;

    impl embedded_hal::spi::Error for ReadFailed {
        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    impl ErrorType for WriteOnly {
        type Error = ReadFailed;
    }

    impl SpiDevice for WriteOnly {
        fn transaction(&mut self, operations: &mut [Operation<'_, u8>]) -> Result<(), ReadFailed> {
            match operations {
                [Operation::Write(_)] => Ok(()),
                _ => Err(ReadFailed),
            }
        }
    }

    #[test]
    fn zero_tick_is_rejected() {
        assert!(Cli::try_parse_from(["rx_cont", "--tick-ms", "0"]).is_err());
        let cli = Cli::try_parse_from(["rx_cont", "--tick-ms", "1"]).unwrap();
        assert_eq!(cli.tick_ms, 1);
    }

    #[test]
    fn radio_options_parse() {
        assert_eq!(parse_bandwidth("125"), Ok(Bandwidth::Bw125kHz));
        assert_eq!(parse_bandwidth("7.8"), Ok(Bandwidth::Bw7_8kHz));
        assert!(parse_bandwidth("100").is_err());
        assert_eq!(parse_coding_rate("6"), Ok(CodingRate::Cr4_6));
        assert!(parse_coding_rate("3").is_err());
    }

    #[test]
    fn loop_error_survives_an_unreadable_summary() {
        let mut modem = Modem::new(WriteOnly, false).unwrap();

        let error = finish(&mut modem, Err(Error::InvalidParameter("stop"))).unwrap_err();
        assert!(matches!(
            error.downcast_ref::<Error>(),
            Some(Error::InvalidParameter("stop"))
        ));

        let stats = RxStats {
            packets: 3,
            ..RxStats::default()
        };
        assert_eq!(finish(&mut modem, Ok(stats)).unwrap(), stats);
    }
}
