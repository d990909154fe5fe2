//! LoRa-mode register map
//!
//! Address and name of every named SX127x register in LoRa mode, as used by
//! the register dump. Addresses not listed here are reserved or only used by
//! the FSK/OOK modem.

/// Highest addressable register.
pub const MAX_ADDRESS: u8 = 0x7F;

/// Register addresses used directly by the driver.
pub mod addr {
    pub const FIFO: u8 = 0x00;
    pub const OP_MODE: u8 = 0x01;
    pub const FR_MSB: u8 = 0x06;
    pub const FR_MID: u8 = 0x07;
    pub const FR_LSB: u8 = 0x08;
    pub const PA_CONFIG: u8 = 0x09;
    pub const FIFO_ADDR_PTR: u8 = 0x0D;
    pub const FIFO_TX_BASE_ADDR: u8 = 0x0E;
    pub const FIFO_RX_BASE_ADDR: u8 = 0x0F;
    pub const FIFO_RX_CURR_ADDR: u8 = 0x10;
    pub const IRQ_FLAGS: u8 = 0x12;
    pub const RX_NB_BYTES: u8 = 0x13;
    pub const MODEM_STAT: u8 = 0x18;
    pub const PKT_SNR_VALUE: u8 = 0x19;
    pub const PKT_RSSI_VALUE: u8 = 0x1A;
    pub const RSSI_VALUE: u8 = 0x1B;
    pub const MODEM_CONFIG_1: u8 = 0x1D;
    pub const MODEM_CONFIG_2: u8 = 0x1E;
    pub const PREAMBLE_MSB: u8 = 0x20;
    pub const PREAMBLE_LSB: u8 = 0x21;
    pub const PAYLOAD_LENGTH: u8 = 0x22;
    pub const MODEM_CONFIG_3: u8 = 0x26;
    pub const DETECT_OPTIMIZE: u8 = 0x31;
    pub const DETECTION_THRESH: u8 = 0x37;
    pub const SYNC_WORD: u8 = 0x39;
    pub const DIO_MAPPING_1: u8 = 0x40;
    pub const DIO_MAPPING_2: u8 = 0x41;
    pub const VERSION: u8 = 0x42;
}

/// Whether a register holds configuration or live modem state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    /// Configuration; written back by a register load.
    ReadWrite,
    /// Status, counters or silicon identification; never written by a load.
    ReadOnly,
}

/// One entry of the register map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterInfo {
    pub address: u8,
    pub name: &'static str,
    pub access: Access,
}

const fn rw(address: u8, name: &'static str) -> RegisterInfo {
    RegisterInfo {
        address,
        name,
        access: Access::ReadWrite,
    }
}

const fn ro(address: u8, name: &'static str) -> RegisterInfo {
    RegisterInfo {
        address,
        name,
        access: Access::ReadOnly,
    }
}

/// Named LoRa registers, ascending by address.
pub const REGISTER_MAP: &[RegisterInfo] = &[
    rw(0x00, "FIFO"),
    rw(0x01, "OP_MODE"),
    rw(0x06, "FR_MSB"),
    rw(0x07, "FR_MID"),
    rw(0x08, "FR_LSB"),
    rw(0x09, "PA_CONFIG"),
    rw(0x0A, "PA_RAMP"),
    rw(0x0B, "OCP"),
    rw(0x0C, "LNA"),
    rw(0x0D, "FIFO_ADDR_PTR"),
    rw(0x0E, "FIFO_TX_BASE_ADDR"),
    rw(0x0F, "FIFO_RX_BASE_ADDR"),
    ro(0x10, "FIFO_RX_CURR_ADDR"),
    rw(0x11, "IRQ_FLAGS_MASK"),
    ro(0x12, "IRQ_FLAGS"),
    ro(0x13, "RX_NB_BYTES"),
    ro(0x14, "RX_HEADER_CNT_MSB"),
    ro(0x15, "RX_HEADER_CNT_LSB"),
    ro(0x16, "RX_PACKET_CNT_MSB"),
    ro(0x17, "RX_PACKET_CNT_LSB"),
    ro(0x18, "MODEM_STAT"),
    ro(0x19, "PKT_SNR_VALUE"),
    ro(0x1A, "PKT_RSSI_VALUE"),
    ro(0x1B, "RSSI_VALUE"),
    ro(0x1C, "HOP_CHANNEL"),
    rw(0x1D, "MODEM_CONFIG_1"),
    rw(0x1E, "MODEM_CONFIG_2"),
    rw(0x1F, "SYMB_TIMEOUT_LSB"),
    rw(0x20, "PREAMBLE_MSB"),
    rw(0x21, "PREAMBLE_LSB"),
    rw(0x22, "PAYLOAD_LENGTH"),
    rw(0x23, "MAX_PAYLOAD_LENGTH"),
    rw(0x24, "HOP_PERIOD"),
    ro(0x25, "FIFO_RX_BYTE_ADDR"),
    rw(0x26, "MODEM_CONFIG_3"),
    rw(0x27, "PPM_CORRECTION"),
    ro(0x28, "FEI_MSB"),
    ro(0x29, "FEI_MID"),
    ro(0x2A, "FEI_LSB"),
    ro(0x2C, "RSSI_WIDEBAND"),
    rw(0x31, "DETECT_OPTIMIZE"),
    rw(0x33, "INVERT_IQ"),
    rw(0x37, "DETECTION_THRESH"),
    rw(0x39, "SYNC_WORD"),
    rw(0x40, "DIO_MAPPING_1"),
    rw(0x41, "DIO_MAPPING_2"),
    ro(0x42, "VERSION"),
    rw(0x4B, "TCXO"),
    rw(0x4D, "PA_DAC"),
    rw(0x5B, "FORMER_TEMP"),
    rw(0x61, "AGC_REF"),
    rw(0x62, "AGC_THRESH_1"),
    rw(0x63, "AGC_THRESH_2"),
    rw(0x64, "AGC_THRESH_3"),
    rw(0x70, "PLL"),
];

/// Looks up a named register by address.
pub fn lookup(address: u8) -> Option<&'static RegisterInfo> {
    REGISTER_MAP
        .binary_search_by_key(&address, |info| info.address)
        .ok()
        .map(|index| &REGISTER_MAP[index])
}
