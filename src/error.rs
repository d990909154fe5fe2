//! Error taxonomy shared by the register layer, the modem state machine,
//! the dump/load utility and the boards.

use embedded_hal::spi::ErrorKind;

use crate::modem::Mode;

/// Errors produced by this crate.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The SPI transaction failed.
    #[error("SPI bus error: {0}")]
    Bus(ErrorKind),

    /// Raw bytes could not be decoded into a typed register.
    #[error("register value could not be decoded")]
    Decode,

    /// Register address outside 0x00..=0x7F.
    #[error("register address 0x{0:02X} is out of range")]
    AddressOutOfRange(u16),

    /// DIO mapping values are two bits wide.
    #[error("DIO{line} mapping value {value} is out of range (0..=3)")]
    InvalidDioMapping { line: usize, value: u8 },

    /// The first mode of a session must be SLEEP.
    #[error("mode transition {from:?} -> {to:?} is not allowed")]
    InvalidTransition { from: Option<Mode>, to: Mode },

    /// A non OP_MODE register was written before any mode was set.
    #[error("register 0x{address:02X} written before OP_MODE was set")]
    ModeNotSet { address: u8 },

    /// OP_MODE value that is not a LoRa mode this driver knows.
    #[error("0x{value:02X} is not a recognized OP_MODE value")]
    UnknownMode { value: u8 },

    /// Register did not read back the value that was written.
    #[error("register 0x{address:02X} verification failed: expected 0x{expected:02X}, read 0x{actual:02X}")]
    Verification { address: u8, expected: u8, actual: u8 },

    /// Malformed register table row.
    #[error("malformed register row: {0}")]
    Parse(String),

    /// Register table row that failed, with its 1-based line number.
    #[error("line {line}: {source}")]
    Line {
        line: usize,
        #[source]
        source: Box<Error>,
    },

    /// Invalid argument to a configuration helper.
    #[error("invalid parameter: {0}")]
    InvalidParameter(&'static str),

    /// GPIO or bus facility could not be acquired.
    #[error("board error: {0}")]
    Board(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Attaches a line number to an error raised while applying a register table.
    pub fn at_line(self, line: usize) -> Self {
        Error::Line {
            line,
            source: Box::new(self),
        }
    }
}
