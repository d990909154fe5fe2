//! Digital IO mapping registers
//!
//! The SX127x has 6 DIO pins. Each pin reflects one of up to four interrupt
//! sources, selected by a 2-bit field in RegDioMapping1 (DIO0..=DIO3) or
//! RegDioMapping2 (DIO4, DIO5). In LoRa mode the mapping is:
//!
//! | Pin  | 00         | 01                | 10                |
//! |------|------------|-------------------|-------------------|
//! | DIO0 | RxDone     | TxDone            | CadDone           |
//! | DIO1 | RxTimeout  | FhssChangeChannel | CadDetected       |
//! | DIO2 | FhssChange | FhssChangeChannel | FhssChangeChannel |
//! | DIO3 | CadDone    | ValidHeader       | PayloadCrcError   |
//! | DIO4 | CadDetected| PllLock           | PllLock           |
//! | DIO5 | ModeReady  | ClkOut            | ClkOut            |
//!
//! Mapping value 11 is unused in LoRa mode.

use core::convert::Infallible;

use regiface::{register, FromByteArray, ReadableRegister, ToByteArray, WritableRegister};

/// DIO mapping register 1 (address: 0x40)
///
/// Selects the source of DIO0..=DIO3, two bits per pin, DIO0 in bits 7:6.
#[register(0x40u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct DioMapping1 {
    pub dio0: u8,
    pub dio1: u8,
    pub dio2: u8,
    pub dio3: u8,
}

/// DIO mapping register 2 (address: 0x41)
///
/// Selects the source of DIO4 (bits 7:6) and DIO5 (bits 5:4).
///
/// # Important Notes
/// - Bit 0 selects whether DIO4/DIO5 map preamble detect or RSSI in FSK mode
///   and is preserved untouched by the LoRa driver
#[register(0x41u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ReadableRegister, WritableRegister)]
pub struct DioMapping2 {
    pub dio4: u8,
    pub dio5: u8,
    pub map_preamble_detect: bool,
}

impl FromByteArray for DioMapping1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            dio0: (bytes[0] >> 6) & 0x03,
            dio1: (bytes[0] >> 4) & 0x03,
            dio2: (bytes[0] >> 2) & 0x03,
            dio3: bytes[0] & 0x03,
        })
    }
}

impl ToByteArray for DioMapping1 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.dio0 & 0x03) << 6)
            | ((self.dio1 & 0x03) << 4)
            | ((self.dio2 & 0x03) << 2)
            | (self.dio3 & 0x03)])
    }
}

impl FromByteArray for DioMapping2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn from_bytes(bytes: Self::Array) -> Result<Self, Self::Error> {
        Ok(Self {
            dio4: (bytes[0] >> 6) & 0x03,
            dio5: (bytes[0] >> 4) & 0x03,
            map_preamble_detect: bytes[0] & 0x01 != 0,
        })
    }
}

impl ToByteArray for DioMapping2 {
    type Error = Infallible;
    type Array = [u8; 1];

    fn to_bytes(self) -> Result<Self::Array, Self::Error> {
        Ok([((self.dio4 & 0x03) << 6)
            | ((self.dio5 & 0x03) << 4)
            | (self.map_preamble_detect as u8)])
    }
}
