//! Register map and control register bit layouts
//!
//! The sensor is addressed at a fixed 7-bit address. Two control registers
//! are written once at startup; three data registers (each the low byte of a
//! little-endian pair) are read on every poll.

use serde::{Deserialize, Serialize};

/// Fixed 7-bit I2C slave address of the gyroscope.
pub const SLAVE_ADDRESS: u8 = 0x68;

/// Registers used by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    Control1 = 0x20,
    Control4 = 0x23,
    DataX = 0x28,
    DataY = 0x2A,
    DataZ = 0x2C,
}

impl Register {
    /// Byte address of this register.
    pub const fn addr(self) -> u8 {
        self as u8
    }

    /// Address of the high byte for a data register pair.
    pub const fn high_byte_addr(self) -> u8 {
        self.addr() + 1
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Control1 => "CTRL1",
            Self::Control4 => "CTRL4",
            Self::DataX => "OUT_X",
            Self::DataY => "OUT_Y",
            Self::DataZ => "OUT_Z",
        }
    }
}

impl core::fmt::Display for Register {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{} (0x{:02X})", self.name(), self.addr())
    }
}

// ---------------------------------------------------------------------------
// CTRL1
// ---------------------------------------------------------------------------

/// Output data rate, CTRL1 bits 7:6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OutputDataRate {
    #[default]
    Hz100,
    Hz200,
    Hz400,
    Hz800,
}

impl OutputDataRate {
    const fn bits(self) -> u8 {
        match self {
            Self::Hz100 => 0b00,
            Self::Hz200 => 0b01,
            Self::Hz400 => 0b10,
            Self::Hz800 => 0b11,
        }
    }
}

/// Bandwidth selection, CTRL1 bits 5:4. Cut-off depends on the data rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bandwidth {
    #[default]
    Narrowest,
    Narrow,
    Wide,
    Widest,
}

impl Bandwidth {
    const fn bits(self) -> u8 {
        match self {
            Self::Narrowest => 0b00,
            Self::Narrow => 0b01,
            Self::Wide => 0b10,
            Self::Widest => 0b11,
        }
    }
}

/// Power mode, CTRL1 bit 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PowerMode {
    PowerDown,
    #[default]
    Normal,
}

/// Per-axis enable flags, CTRL1 bits 2:0 (Z, Y, X).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisEnable {
    pub x: bool,
    pub y: bool,
    pub z: bool,
}

impl Default for AxisEnable {
    fn default() -> Self {
        Self {
            x: true,
            y: true,
            z: true,
        }
    }
}

/// CTRL1 contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Control1 {
    pub data_rate: OutputDataRate,
    pub bandwidth: Bandwidth,
    pub power: PowerMode,
    pub axes: AxisEnable,
}

impl Control1 {
    pub const fn bits(&self) -> u8 {
        (self.data_rate.bits() << 6)
            | (self.bandwidth.bits() << 4)
            | ((matches!(self.power, PowerMode::Normal) as u8) << 3)
            | ((self.axes.z as u8) << 2)
            | ((self.axes.y as u8) << 1)
            | (self.axes.x as u8)
    }
}

// ---------------------------------------------------------------------------
// CTRL4
// ---------------------------------------------------------------------------

/// Block data update, CTRL4 bit 7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockDataUpdate {
    /// Output registers update continuously.
    #[default]
    Continuous,
    /// Output registers hold until both bytes have been read.
    UntilRead,
}

/// Data byte order, CTRL4 bit 6. The driver decodes readings accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ByteOrder {
    /// LSB at the lower address.
    #[default]
    LittleEndian,
    BigEndian,
}

/// Full-scale range, CTRL4 bits 5:4.
///
/// Both `0b10` and `0b11` select 2000 dps on this part; the default uses
/// `0b11`, which is what the startup value `0x30` encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FullScale {
    Dps250,
    Dps500,
    #[default]
    Dps2000,
}

impl FullScale {
    const fn bits(self) -> u8 {
        match self {
            Self::Dps250 => 0b00,
            Self::Dps500 => 0b01,
            Self::Dps2000 => 0b11,
        }
    }
}

/// Serial interface mode, CTRL4 bit 0. Only relevant when wired over SPI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpiWireMode {
    #[default]
    FourWire,
    ThreeWire,
}

/// CTRL4 contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Control4 {
    pub block_update: BlockDataUpdate,
    pub byte_order: ByteOrder,
    pub full_scale: FullScale,
    pub spi_mode: SpiWireMode,
}

impl Control4 {
    pub const fn bits(&self) -> u8 {
        ((matches!(self.block_update, BlockDataUpdate::UntilRead) as u8) << 7)
            | ((matches!(self.byte_order, ByteOrder::BigEndian) as u8) << 6)
            | (self.full_scale.bits() << 4)
            | (matches!(self.spi_mode, SpiWireMode::ThreeWire) as u8)
    }
}

/// Complete startup configuration written during initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GyroConfig {
    pub control1: Control1,
    pub control4: Control4,
}

impl GyroConfig {
    /// The two `{register, value}` frames written at startup, in order.
    pub const fn frames(&self) -> [[u8; 2]; 2] {
        [
            [Register::Control1.addr(), self.control1.bits()],
            [Register::Control4.addr(), self.control4.bits()],
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_matches_startup_values() {
        let config = GyroConfig::default();
        assert_eq!(config.control1.bits(), 0x0F);
        assert_eq!(config.control4.bits(), 0x30);
        assert_eq!(config.frames(), [[0x20, 0x0F], [0x23, 0x30]]);
    }

    #[test]
    fn test_data_register_pairs() {
        assert_eq!(Register::DataX.high_byte_addr(), 0x29);
        assert_eq!(Register::DataY.high_byte_addr(), 0x2B);
        assert_eq!(Register::DataZ.high_byte_addr(), 0x2D);
    }

    #[test]
    fn test_control1_fields() {
        let ctrl = Control1 {
            data_rate: OutputDataRate::Hz800,
            bandwidth: Bandwidth::Narrow,
            power: PowerMode::PowerDown,
            axes: AxisEnable {
                x: true,
                y: false,
                z: true,
            },
        };
        assert_eq!(ctrl.bits(), 0b1101_0101);
    }

    #[test]
    fn test_control4_fields() {
        let ctrl = Control4 {
            block_update: BlockDataUpdate::UntilRead,
            byte_order: ByteOrder::BigEndian,
            full_scale: FullScale::Dps500,
            spi_mode: SpiWireMode::ThreeWire,
        };
        assert_eq!(ctrl.bits(), 0b1101_0001);
    }
}
