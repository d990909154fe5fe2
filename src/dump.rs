//! Register dump and load
//!
//! A dump is a plain text table, one register per line:
//!
//! ```text
//! 01            OP_MODE 81 10000001
//! 12          IRQ_FLAGS XX XXXXXXXX
//! ```
//!
//! Address and value are two hex digits, the name is right aligned in 18
//! columns and the last column repeats the value in binary. An unreadable
//! register shows `XX` / `XXXXXXXX`. Lines that do not have this exact shape
//! (headers, separators, blank lines, unreadable rows) are ignored on load.
//!
//! [`load`] applies a table in file order and then reads every written
//! register back. Several registers silently ignore writes depending on the
//! current mode, so a load only succeeds once every value has been verified.

use core::fmt;

use embedded_hal::spi::SpiDevice;

use crate::modem::{Mode, Modem};
use crate::registers::{addr, lookup, Access, MAX_ADDRESS};
use crate::Error;

/// Column header printed above a dump.
pub const HEADER: &str = " i           reg_name  v        v\n-- ------------------ -- --------";

/// One row of a register dump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterDump {
    pub address: u8,
    pub name: &'static str,
    /// `None` when the register could not be read.
    pub value: Option<u8>,
}

impl fmt::Display for RegisterDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Some(value) => write!(
                f,
                "{:02X} {:>18} {:02X} {:08b}",
                self.address, self.name, value, value
            ),
            None => write!(f, "{:02X} {:>18} XX XXXXXXXX", self.address, self.name),
        }
    }
}

/// Name shown for addresses the register map does not name.
pub const RESERVED: &str = "RESERVED";

/// Reads the whole register file except the FIFO, ascending by address.
///
/// Registers are read lazily as the iterator advances; call again for a
/// fresh pass. Reading the FIFO would pop an entry, so it is never part of a
/// dump.
pub fn dump_registers<SPI>(modem: &mut Modem<SPI>) -> impl Iterator<Item = RegisterDump> + '_
where
    SPI: SpiDevice,
{
    (addr::FIFO + 1..=MAX_ADDRESS).map(move |address| RegisterDump {
        address,
        name: lookup(address).map_or(RESERVED, |info| info.name),
        value: match modem.read(address) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::warn!(address, %error, "register unreadable");
                None
            }
        },
    })
}

/// A parsed, readable row of a register table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterLine {
    pub address: u8,
    pub name: String,
    pub value: u8,
}

fn hex_byte(field: &str) -> Option<u8> {
    if field.len() == 2 && field.bytes().all(|b| b.is_ascii_hexdigit()) {
        u8::from_str_radix(field, 16).ok()
    } else {
        None
    }
}

fn binary_byte(field: &str) -> Option<u8> {
    if field.len() == 8 && field.bytes().all(|b| b == b'0' || b == b'1') {
        u8::from_str_radix(field, 2).ok()
    } else {
        None
    }
}

/// Parses one table line.
///
/// Returns `Ok(None)` for lines that are not register rows. A row whose hex
/// and binary columns disagree, or whose address is beyond 0x7F, is an error.
pub fn parse_line(line: &str) -> Result<Option<RegisterLine>, Error> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let [address, name, value, binary] = fields[..] else {
        return Ok(None);
    };
    let (Some(address), Some(value), Some(binary)) =
        (hex_byte(address), hex_byte(value), binary_byte(binary))
    else {
        return Ok(None);
    };

    if address > MAX_ADDRESS {
        return Err(Error::AddressOutOfRange(address.into()));
    }
    if value != binary {
        return Err(Error::Parse(format!(
            "value 0x{value:02X} does not match binary column {binary:08b}"
        )));
    }
    Ok(Some(RegisterLine {
        address,
        name: name.to_string(),
        value,
    }))
}

/// Outcome of a successful [`load`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Registers written and verified, in first-write order.
    pub applied: Vec<(u8, u8)>,
    /// Read-only and FIFO rows that were skipped.
    pub skipped: usize,
}

/// Applies a register table, then verifies every write.
///
/// Rules, checked in file order:
/// - the first register row must be OP_MODE; any other row before it aborts
/// - the OP_MODE value must be a recognized LoRa mode
/// - read-only registers and the FIFO are skipped and not verified
/// - after the last row every written register is read back and compared
///
/// Any violation aborts the whole operation with the offending line number.
pub fn load<SPI, I, S>(modem: &mut Modem<SPI>, lines: I) -> Result<LoadReport, Error>
where
    SPI: SpiDevice,
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut report = LoadReport::default();
    let mut mode_set = false;

    for (index, line) in lines.into_iter().enumerate() {
        let number = index + 1;
        let Some(row) = parse_line(line.as_ref()).map_err(|e| e.at_line(number))? else {
            continue;
        };
        apply_row(modem, &row, &mut mode_set, &mut report).map_err(|e| e.at_line(number))?;
    }

    for &(address, expected) in &report.applied {
        let actual = modem.read(address)?;
        if actual != expected {
            tracing::error!(address, expected, actual, "verification failed");
            return Err(Error::Verification {
                address,
                expected,
                actual,
            });
        }
    }
    tracing::info!(
        applied = report.applied.len(),
        skipped = report.skipped,
        "register table verified"
    );
    Ok(report)
}

fn apply_row<SPI: SpiDevice>(
    modem: &mut Modem<SPI>,
    row: &RegisterLine,
    mode_set: &mut bool,
    report: &mut LoadReport,
) -> Result<(), Error> {
    let info = lookup(row.address);
    if let Some(info) = info.filter(|info| info.name != row.name) {
        tracing::warn!(
            address = row.address,
            expected = info.name,
            found = %row.name,
            "register name mismatch"
        );
    }

    if row.address == addr::OP_MODE {
        let mode = Mode::from_op_mode(row.value)?;
        tracing::info!(%mode, value = row.value, "applying OP_MODE");
        *mode_set = true;
    } else if !*mode_set {
        return Err(Error::ModeNotSet {
            address: row.address,
        });
    }

    // a FIFO write pushes data instead of setting a value
    if row.address == addr::FIFO || info.map(|info| info.access) == Some(Access::ReadOnly) {
        tracing::debug!(address = row.address, name = %row.name, "skipping register");
        report.skipped += 1;
        return Ok(());
    }

    modem.write(row.address, row.value)?;
    tracing::info!(address = row.address, name = %row.name, value = row.value, "applied");
    match report
        .applied
        .iter_mut()
        .find(|(address, _)| *address == row.address)
    {
        Some(entry) => entry.1 = row.value,
        None => report.applied.push((row.address, row.value)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_readable_and_unreadable_rows() {
        let row = RegisterDump {
            address: 0x01,
            name: "OP_MODE",
            value: Some(0x81),
        };
        assert_eq!(row.to_string(), "01            OP_MODE 81 10000001");

        let row = RegisterDump {
            address: 0x12,
            name: "IRQ_FLAGS",
            value: None,
        };
        assert_eq!(row.to_string(), "12          IRQ_FLAGS XX XXXXXXXX");
    }

    #[test]
    fn parses_a_formatted_row() {
        let row = parse_line("0F  FIFO_RX_BASE_ADDR 5A 01011010").unwrap().unwrap();
        assert_eq!(row.address, 0x0F);
        assert_eq!(row.name, "FIFO_RX_BASE_ADDR");
        assert_eq!(row.value, 0x5A);
    }

    #[test]
    fn ignores_non_register_lines() {
        for line in HEADER.lines().chain([
            "",
            "LoRa register dump:",
            "12          IRQ_FLAGS XX XXXXXXXX",
            "1 OP_MODE 81 10000001",
        ]) {
            assert_eq!(parse_line(line).unwrap(), None, "{line:?}");
        }
    }

    #[test]
    fn rejects_inconsistent_rows() {
        assert!(matches!(
            parse_line("01 OP_MODE 81 10000000"),
            Err(Error::Parse(_))
        ));
        assert!(matches!(
            parse_line("80 BOGUS 00 00000000"),
            Err(Error::AddressOutOfRange(0x80))
        ));
    }
}
