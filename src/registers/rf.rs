//! RF and modem configuration registers
//!
//! This module contains registers related to the LoRa physical layer:
//! - Power amplifier selection
//! - Bandwidth, coding rate and header mode
//! - Spreading factor and payload CRC
//! - AGC and low data rate optimisation
//!
//! All of them should be written in SLEEP or STANDBY.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// Error type for out-of-range enum values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidValue(pub u8);

/// PA configuration register (address: 0x09)
///
/// # Important Notes
/// - RFO pin: Pout = Pmax - (15 - output_power), Pmax = 10.8 + 0.6 * max_power
/// - PA_BOOST pin: Pout = 17 - (15 - output_power)
/// - HopeRF RFM95W modules only route PA_BOOST to the antenna
#[register(0x09u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct PaConfig {
    /// 1 = PA_BOOST pin, 0 = RFO pin
    pub pa_select: bool,
    pub max_power: u8,
    pub output_power: u8,
}

impl FromByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            pa_select: bytes[0] & 0x80 != 0,
            max_power: (bytes[0] >> 4) & 0x07,
            output_power: bytes[0] & 0x0F,
        })
    }
}

impl ToByteArray for PaConfig {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.pa_select as u8) << 7)
            | ((self.max_power & 0x07) << 4)
            | (self.output_power & 0x0F)])
    }
}

/// Signal bandwidth (RegModemConfig1 bits 7:4)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Bandwidth {
    Bw7_8kHz = 0,
    Bw10_4kHz = 1,
    Bw15_6kHz = 2,
    Bw20_8kHz = 3,
    Bw31_25kHz = 4,
    Bw41_7kHz = 5,
    Bw62_5kHz = 6,
    Bw125kHz = 7,
    Bw250kHz = 8,
    Bw500kHz = 9,
}

impl Bandwidth {
    /// Bandwidth in Hz
    pub fn hz(self) -> u32 {
        match self {
            Self::Bw7_8kHz => 7_800,
            Self::Bw10_4kHz => 10_400,
            Self::Bw15_6kHz => 15_600,
            Self::Bw20_8kHz => 20_800,
            Self::Bw31_25kHz => 31_250,
            Self::Bw41_7kHz => 41_700,
            Self::Bw62_5kHz => 62_500,
            Self::Bw125kHz => 125_000,
            Self::Bw250kHz => 250_000,
            Self::Bw500kHz => 500_000,
        }
    }
}

impl TryFrom<u8> for Bandwidth {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => Self::Bw7_8kHz,
            1 => Self::Bw10_4kHz,
            2 => Self::Bw15_6kHz,
            3 => Self::Bw20_8kHz,
            4 => Self::Bw31_25kHz,
            5 => Self::Bw41_7kHz,
            6 => Self::Bw62_5kHz,
            7 => Self::Bw125kHz,
            8 => Self::Bw250kHz,
            9 => Self::Bw500kHz,
            invalid => return Err(InvalidValue(invalid)),
        })
    }
}

/// Error coding rate (RegModemConfig1 bits 3:1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CodingRate {
    Cr4_5 = 1,
    Cr4_6 = 2,
    Cr4_7 = 3,
    Cr4_8 = 4,
}

impl TryFrom<u8> for CodingRate {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Cr4_5),
            2 => Ok(Self::Cr4_6),
            3 => Ok(Self::Cr4_7),
            4 => Ok(Self::Cr4_8),
            invalid => Err(InvalidValue(invalid)),
        }
    }
}

/// Modem configuration register 1 (address: 0x1D)
#[register(0x1Du8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig1 {
    /// Raw bandwidth field, see [`Bandwidth`]
    pub bandwidth: u8,
    /// Raw coding rate field, see [`CodingRate`]
    pub coding_rate: u8,
    pub implicit_header_mode_on: bool,
}

impl FromByteArray for ModemConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            bandwidth: bytes[0] >> 4,
            coding_rate: (bytes[0] >> 1) & 0x07,
            implicit_header_mode_on: bytes[0] & 0x01 != 0,
        })
    }
}

impl ToByteArray for ModemConfig1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.bandwidth & 0x0F) << 4)
            | ((self.coding_rate & 0x07) << 1)
            | (self.implicit_header_mode_on as u8)])
    }
}

/// Modem configuration register 2 (address: 0x1E)
#[register(0x1Eu8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig2 {
    /// Spreading factor 6..=12
    pub spreading_factor: u8,
    pub tx_continuous_mode: bool,
    pub rx_payload_crc_on: bool,
    /// RX timeout MSB, bits 9:8
    pub symb_timeout_msb: u8,
}

impl FromByteArray for ModemConfig2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            spreading_factor: bytes[0] >> 4,
            tx_continuous_mode: bytes[0] & 0x08 != 0,
            rx_payload_crc_on: bytes[0] & 0x04 != 0,
            symb_timeout_msb: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for ModemConfig2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.spreading_factor & 0x0F) << 4)
            | ((self.tx_continuous_mode as u8) << 3)
            | ((self.rx_payload_crc_on as u8) << 2)
            | (self.symb_timeout_msb & 0x03)])
    }
}

/// Modem configuration register 3 (address: 0x26)
///
/// Only bits 3:2 are defined; the rest are preserved as read.
#[register(0x26u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ReadableRegister, WritableRegister)]
pub struct ModemConfig3 {
    /// Mandated when the symbol length exceeds 16 ms
    pub low_data_rate_optimize: bool,
    /// LNA gain set by the internal AGC loop instead of RegLna
    pub agc_auto_on: bool,
    pub reserved: u8,
}

impl FromByteArray for ModemConfig3 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            low_data_rate_optimize: bytes[0] & 0x08 != 0,
            agc_auto_on: bytes[0] & 0x04 != 0,
            reserved: bytes[0] & 0xF3,
        })
    }
}

impl ToByteArray for ModemConfig3 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([(self.reserved & 0xF3)
            | ((self.low_data_rate_optimize as u8) << 3)
            | ((self.agc_auto_on as u8) << 2)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modem_config1_defaults() {
        // Reset value: 125 kHz, 4/5, explicit header
        let reg = ModemConfig1::from_bytes([0x72]).unwrap();
        assert_eq!(Bandwidth::try_from(reg.bandwidth), Ok(Bandwidth::Bw125kHz));
        assert_eq!(CodingRate::try_from(reg.coding_rate), Ok(CodingRate::Cr4_5));
        assert!(!reg.implicit_header_mode_on);
    }

    #[test]
    fn modem_config3_preserves_reserved_bits() {
        let reg = ModemConfig3::from_bytes([0x04 | 0x10]).unwrap();
        assert!(reg.agc_auto_on);
        let reg = ModemConfig3 {
            low_data_rate_optimize: true,
            ..reg
        };
        assert_eq!(reg.to_bytes().unwrap(), [0x1C]);
    }

    #[test]
    fn rejects_reserved_bandwidth() {
        assert_eq!(Bandwidth::try_from(10), Err(InvalidValue(10)));
    }
}
