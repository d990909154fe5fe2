//! SX127x register utility
//!
//! - without options, prints the modem configuration
//! - `--dump` prints every register as a table on stdout
//! - `--load FILE` applies such a table and verifies it

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use spi_lora::board::{Board, BoardSession};
use spi_lora::boards::BoardArgs;
use spi_lora::dump::{dump_registers, load, HEADER};
use spi_lora::Modem;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lora_util", about = "LoRa utility functions")]
struct Cli {
    /// Dump all registers
    #[arg(short, long, conflicts_with = "load")]
    dump: bool,

    /// Apply a register dump and verify every written register
    #[arg(short, long, value_name = "FILE")]
    load: Option<PathBuf>,

    #[command(flatten)]
    board: BoardArgs,
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
    let spi = board.open_transport(cli.board.bus, cli.board.chip_select())?;
    let mut modem = Modem::new(spi, board.is_low_band_frontend())?;

    if cli.dump {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "LoRa register dump:\n")?;
        writeln!(out, "{HEADER}")?;
        for row in dump_registers(&mut modem) {
            writeln!(out, "{row}")?;
        }
        writeln!(out)?;
    } else if let Some(path) = cli.load {
        let table = fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let report = load(&mut modem, table.lines())
            .with_context(|| format!("applying {}", path.display()))?;
        eprintln!(
            "Applied successfully: {} registers written, {} read-only rows skipped",
            report.applied.len(),
            report.skipped
        );
    } else {
        println!("{}", modem.summary()?);
    }
    Ok(())
}
