//! Operating mode and status registers
//!
//! This module contains the registers that make up the modem's state machine:
//! - RegOpMode, which selects LoRa vs FSK operation and the transceiver mode
//! - RegIrqFlags, the write-1-to-clear interrupt flags
//! - RegModemStat, the live demodulator status
//! - RegVersion, the silicon revision
//!
//! Bits 6:4 of RegOpMode are only writable in SLEEP; the transceiver mode bits
//! may be changed at any time.

use bitflags::bitflags;
use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Operating mode register (address: 0x01)
///
/// # Important Notes
/// - `long_range_mode` can only be changed in SLEEP
/// - `low_frequency_mode_on` selects the LF register bank (band 1 & 2)
/// - `mode` holds the 3-bit transceiver mode
#[register(0x01u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct OpMode {
    /// 1 = LoRa, 0 = FSK/OOK
    pub long_range_mode: bool,
    /// Access the FSK registers 0x0D..=0x3F while in LoRa mode
    pub access_shared_reg: bool,
    /// Reserved bits 5:4, always zero in LoRa mode
    pub reserved: u8,
    /// Low frequency register bank
    pub low_frequency_mode_on: bool,
    /// Transceiver mode bits 2:0
    pub mode: u8,
}

impl FromByteArray for OpMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            long_range_mode: bytes[0] & 0x80 != 0,
            access_shared_reg: bytes[0] & 0x40 != 0,
            reserved: (bytes[0] >> 4) & 0x03,
            low_frequency_mode_on: bytes[0] & 0x08 != 0,
            mode: bytes[0] & 0x07,
        })
    }
}

impl ToByteArray for OpMode {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.long_range_mode as u8) << 7)
            | ((self.access_shared_reg as u8) << 6)
            | ((self.reserved & 0x03) << 4)
            | ((self.low_frequency_mode_on as u8) << 3)
            | (self.mode & 0x07)])
    }
}

bitflags! {
    /// LoRa interrupt flags
    ///
    /// Flags stay set until cleared by writing a 1 to the same bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct IrqFlags: u8 {
        const RX_TIMEOUT = 1 << 7;
        const RX_DONE = 1 << 6;
        const PAYLOAD_CRC_ERROR = 1 << 5;
        const VALID_HEADER = 1 << 4;
        const TX_DONE = 1 << 3;
        const CAD_DONE = 1 << 2;
        const FHSS_CHANGE_CHANNEL = 1 << 1;
        const CAD_DETECTED = 1;
    }
}

/// Interrupt flags register (address: 0x12)
///
/// # Important Notes
/// - Writing a 1 clears the corresponding flag, writing 0 leaves it untouched
/// - Reading does not clear anything
#[register(0x12u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct RegIrqFlags {
    pub flags: IrqFlags,
}

impl FromByteArray for RegIrqFlags {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            flags: IrqFlags::from_bits_retain(bytes[0]),
        })
    }
}

impl ToByteArray for RegIrqFlags {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([self.flags.bits()])
    }
}

bitflags! {
    /// Demodulator status bits of RegModemStat
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ModemStatusFlags: u8 {
        const MODEM_CLEAR = 1 << 4;
        const HEADER_INFO_VALID = 1 << 3;
        const RX_ONGOING = 1 << 2;
        const SIGNAL_SYNCHRONIZED = 1 << 1;
        const SIGNAL_DETECTED = 1;
    }
}

/// Modem status register (address: 0x18), read-only
#[register(0x18u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct ModemStat {
    /// Coding rate of the last header received (bits 7:5)
    pub rx_coding_rate: u8,
    pub status: ModemStatusFlags,
}

impl ModemStat {
    pub fn rx_ongoing(&self) -> bool {
        self.status.contains(ModemStatusFlags::RX_ONGOING)
    }

    pub fn modem_clear(&self) -> bool {
        self.status.contains(ModemStatusFlags::MODEM_CLEAR)
    }
}

impl FromByteArray for ModemStat {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            rx_coding_rate: bytes[0] >> 5,
            status: ModemStatusFlags::from_bits_truncate(bytes[0]),
        })
    }
}

/// Silicon version register (address: 0x42), read-only
///
/// 0x12 on production SX1276/77/78/79 parts.
#[register(0x42u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister)]
pub struct Version {
    pub full_revision: u8,
    pub metal_mask_revision: u8,
}

impl FromByteArray for Version {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            full_revision: bytes[0] >> 4,
            metal_mask_revision: bytes[0] & 0x0F,
        })
    }
}
