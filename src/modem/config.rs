//! RF configuration, signal quality and payload access

use core::fmt;

use embedded_hal::spi::SpiDevice;

use super::{Mode, Modem};
use crate::registers::{
    addr, Bandwidth, CodingRate, ModemConfig1, ModemConfig2, ModemConfig3, ModemStat, PaConfig,
    Version,
};
use crate::Error;

/// Crystal frequency of every SX127x reference design.
const FXOSC_HZ: f64 = 32_000_000.0;
/// Frequency synthesizer step, FXOSC / 2^19.
const FSTEP_HZ: f64 = FXOSC_HZ / (1u32 << 19) as f64;

const RSSI_OFFSET_HF: i16 = 157;
const RSSI_OFFSET_LF: i16 = 164;

/// Demodulator status as read from RegModemStat.
pub type ModemStatus = ModemStat;

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Mode::Sleep => "SLEEP",
            Mode::Standby => "STDBY",
            Mode::Transmit => "TX",
            Mode::RxContinuous => "RXCONT",
            Mode::RxSingle => "RXSINGLE",
            Mode::Cad => "CAD",
        })
    }
}

impl<SPI> Modem<SPI>
where
    SPI: SpiDevice,
{
    fn rssi_offset(&self) -> i16 {
        if self.low_band {
            RSSI_OFFSET_LF
        } else {
            RSSI_OFFSET_HF
        }
    }

    fn require_idle(&self, what: &'static str) -> Result<(), Error> {
        match self.mode {
            Some(Mode::Sleep | Mode::Standby) => Ok(()),
            _ => Err(Error::InvalidParameter(what)),
        }
    }

    /// Current RSSI in dBm.
    pub fn get_rssi_value(&mut self) -> Result<i16, Error> {
        Ok(self.read(addr::RSSI_VALUE)? as i16 - self.rssi_offset())
    }

    /// RSSI of the last packet in dBm.
    pub fn get_pkt_rssi_value(&mut self) -> Result<i16, Error> {
        Ok(self.read(addr::PKT_RSSI_VALUE)? as i16 - self.rssi_offset())
    }

    /// SNR of the last packet in dB.
    pub fn get_pkt_snr_value(&mut self) -> Result<f32, Error> {
        Ok(self.read(addr::PKT_SNR_VALUE)? as i8 as f32 / 4.0)
    }

    pub fn get_modem_status(&mut self) -> Result<ModemStatus, Error> {
        self.read_typed()
    }

    /// Silicon revision from RegVersion.
    pub fn get_version(&mut self) -> Result<Version, Error> {
        self.read_typed()
    }

    /// Points the FIFO address pointer back at the RX base address.
    pub fn reset_ptr_rx(&mut self) -> Result<(), Error> {
        let base = self.read(addr::FIFO_RX_BASE_ADDR)?;
        self.write(addr::FIFO_ADDR_PTR, base)
    }

    /// Drains the last received packet from the FIFO.
    ///
    /// Does not look at the IRQ flags; callers decide whether the packet is
    /// worth keeping.
    pub fn read_payload(&mut self) -> Result<Vec<u8>, Error> {
        let current = self.read(addr::FIFO_RX_CURR_ADDR)?;
        self.write(addr::FIFO_ADDR_PTR, current)?;
        let length = self.read(addr::RX_NB_BYTES)?;

        let mut payload = vec![0u8; length as usize];
        if !payload.is_empty() {
            self.burst_read(addr::FIFO, &mut payload)?;
        }
        Ok(payload)
    }

    /// Sets the carrier frequency in MHz. SLEEP or STANDBY only.
    pub fn set_freq(&mut self, mhz: f64) -> Result<(), Error> {
        self.require_idle("frequency can only be changed in SLEEP or STANDBY")?;
        if !(137.0..=1020.0).contains(&mhz) {
            return Err(Error::InvalidParameter("frequency must be within 137..=1020 MHz"));
        }

        let frf = (mhz * 1e6 / FSTEP_HZ).round() as u32;
        let [_, msb, mid, lsb] = frf.to_be_bytes();
        self.write(addr::FR_MSB, msb)?;
        self.write(addr::FR_MID, mid)?;
        self.write(addr::FR_LSB, lsb)
    }

    /// Carrier frequency in MHz, read in one burst.
    pub fn get_freq(&mut self) -> Result<f64, Error> {
        let mut frf = [0u8; 3];
        self.burst_read(addr::FR_MSB, &mut frf)?;
        let frf = u32::from_be_bytes([0, frf[0], frf[1], frf[2]]);
        Ok(frf as f64 * FSTEP_HZ / 1e6)
    }

    pub fn set_bw(&mut self, bandwidth: Bandwidth) -> Result<(), Error> {
        let config: ModemConfig1 = self.read_typed()?;
        self.write_typed(ModemConfig1 {
            bandwidth: bandwidth as u8,
            ..config
        })
    }

    pub fn set_coding_rate(&mut self, coding_rate: CodingRate) -> Result<(), Error> {
        let config: ModemConfig1 = self.read_typed()?;
        self.write_typed(ModemConfig1 {
            coding_rate: coding_rate as u8,
            ..config
        })
    }

    /// Sets the spreading factor (6..=12) and the matching detection settings.
    pub fn set_spreading_factor(&mut self, spreading_factor: u8) -> Result<(), Error> {
        if !(6..=12).contains(&spreading_factor) {
            return Err(Error::InvalidParameter("spreading factor must be within 6..=12"));
        }

        // SF6 needs its own detection optimize / threshold pair
        let (optimize, threshold) = if spreading_factor == 6 {
            (0x05, 0x0C)
        } else {
            (0x03, 0x0A)
        };
        let detect = self.read(addr::DETECT_OPTIMIZE)?;
        self.write(addr::DETECT_OPTIMIZE, (detect & 0xF8) | optimize)?;
        self.write(addr::DETECTION_THRESH, threshold)?;

        let config: ModemConfig2 = self.read_typed()?;
        self.write_typed(ModemConfig2 {
            spreading_factor,
            ..config
        })
    }

    pub fn set_rx_crc(&mut self, enabled: bool) -> Result<(), Error> {
        let config: ModemConfig2 = self.read_typed()?;
        self.write_typed(ModemConfig2 {
            rx_payload_crc_on: enabled,
            ..config
        })
    }

    /// Routes the PA output to PA_BOOST (`true`) or RFO (`false`).
    pub fn set_pa_select(&mut self, pa_boost: bool) -> Result<(), Error> {
        let config: PaConfig = self.read_typed()?;
        self.write_typed(PaConfig {
            pa_select: pa_boost,
            ..config
        })
    }

    pub fn get_agc_auto_on(&mut self) -> Result<bool, Error> {
        Ok(self.read_typed::<ModemConfig3>()?.agc_auto_on)
    }

    /// Reads the current configuration for display.
    pub fn summary(&mut self) -> Result<Summary, Error> {
        let op_mode = self.read(addr::OP_MODE)?;
        let config1: ModemConfig1 = self.read_typed()?;
        let config2: ModemConfig2 = self.read_typed()?;
        let config3: ModemConfig3 = self.read_typed()?;
        let pa: PaConfig = self.read_typed()?;

        Ok(Summary {
            op_mode,
            mode: Mode::from_op_mode(op_mode).ok(),
            freq_mhz: self.get_freq()?,
            bandwidth: Bandwidth::try_from(config1.bandwidth).ok(),
            coding_rate: CodingRate::try_from(config1.coding_rate).ok(),
            implicit_header: config1.implicit_header_mode_on,
            spreading_factor: config2.spreading_factor,
            rx_crc: config2.rx_payload_crc_on,
            agc_auto_on: config3.agc_auto_on,
            low_data_rate_optimize: config3.low_data_rate_optimize,
            pa_boost: pa.pa_select,
            max_power: pa.max_power,
            output_power: pa.output_power,
            sync_word: self.read(addr::SYNC_WORD)?,
            payload_length: self.read(addr::PAYLOAD_LENGTH)?,
            dio_mapping: self.get_dio_mapping()?,
            version: self.get_version()?,
            rssi: self.get_rssi_value()?,
            low_band: self.low_band,
        })
    }
}

/// Snapshot of the modem configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub op_mode: u8,
    pub mode: Option<Mode>,
    pub freq_mhz: f64,
    pub bandwidth: Option<Bandwidth>,
    pub coding_rate: Option<CodingRate>,
    pub implicit_header: bool,
    pub spreading_factor: u8,
    pub rx_crc: bool,
    pub agc_auto_on: bool,
    pub low_data_rate_optimize: bool,
    pub pa_boost: bool,
    pub max_power: u8,
    pub output_power: u8,
    pub sync_word: u8,
    pub payload_length: u8,
    pub dio_mapping: [u8; 6],
    pub version: Version,
    pub rssi: i16,
    pub low_band: bool,
}

fn on_off(value: bool) -> &'static str {
    if value {
        "ON"
    } else {
        "OFF"
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            Some(mode) => writeln!(f, "mode               {mode}")?,
            None => writeln!(f, "mode               0x{:02X} (not LoRa)", self.op_mode)?,
        }
        writeln!(f, "freq               {:.6} MHz", self.freq_mhz)?;
        writeln!(
            f,
            "band               {}",
            if self.low_band { "LF" } else { "HF" }
        )?;
        match self.bandwidth {
            Some(bw) => writeln!(f, "bw                 {} kHz", bw.hz() as f64 / 1000.0)?,
            None => writeln!(f, "bw                 reserved")?,
        }
        match self.coding_rate {
            Some(cr) => writeln!(f, "coding_rate        4/{}", cr as u8 + 4)?,
            None => writeln!(f, "coding_rate        reserved")?,
        }
        writeln!(
            f,
            "spreading_factor   {} ({} chips/symb)",
            self.spreading_factor,
            1u32 << self.spreading_factor.min(12)
        )?;
        writeln!(f, "implicit_hdr_mode  {}", on_off(self.implicit_header))?;
        writeln!(f, "rx_payload_crc     {}", on_off(self.rx_crc))?;
        writeln!(
            f,
            "pa_select          {}",
            if self.pa_boost { "PA_BOOST" } else { "RFO" }
        )?;
        writeln!(f, "max_power          {}", self.max_power)?;
        writeln!(f, "output_power       {}", self.output_power)?;
        writeln!(f, "agc_auto_on        {}", on_off(self.agc_auto_on))?;
        writeln!(f, "low_data_rate_opti {}", on_off(self.low_data_rate_optimize))?;
        writeln!(f, "sync_word          0x{:02X}", self.sync_word)?;
        writeln!(f, "payload_length     {}", self.payload_length)?;
        writeln!(f, "dio_mapping 0..5   {:?}", self.dio_mapping)?;
        writeln!(
            f,
            "version            0x{:X}{:X}",
            self.version.full_revision, self.version.metal_mask_revision
        )?;
        write!(f, "rssi               {} dBm", self.rssi)
    }
}
