//! Angular-rate readings and raw register decoding

use serde::{Deserialize, Serialize};

use crate::registers::Register;

/// One gyroscope axis, in the order the driver reads them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    /// Read order of a full sample cycle.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Low-byte data register for this axis.
    pub const fn data_register(self) -> Register {
        match self {
            Self::X => Register::DataX,
            Self::Y => Register::DataY,
            Self::Z => Register::DataZ,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::X => 0,
            Self::Y => 1,
            Self::Z => 2,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::Y => "Y",
            Self::Z => "Z",
        }
    }
}

impl core::fmt::Display for Axis {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.label())
    }
}

/// Instantaneous angular rate in raw sensor units.
///
/// Values are the signed 16-bit register contents widened to `f64`; no
/// full-scale sensitivity is applied.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Reading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Reading {
    /// Build a reading from decoded per-axis values in X, Y, Z order.
    pub fn from_raw(raw: [i16; 3]) -> Self {
        Self {
            x: f64::from(raw[0]),
            y: f64::from(raw[1]),
            z: f64::from(raw[2]),
        }
    }

    pub fn axis(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// Combine a little-endian register pair into an unsigned 16-bit value.
pub const fn assemble(low: u8, high: u8) -> u16 {
    (low as u16) | ((high as u16) << 8)
}

/// Reinterpret a raw register pair as a signed value.
///
/// Anything above `i16::MAX` wraps to `raw - 65536`.
pub const fn twos_complement(raw: u16) -> i16 {
    if raw > i16::MAX as u16 {
        (raw as i32 - 65536) as i16
    } else {
        raw as i16
    }
}

/// Decode one axis from its low and high register bytes.
pub const fn decode_axis(low: u8, high: u8) -> i16 {
    twos_complement(assemble(low, high))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_is_little_endian() {
        assert_eq!(assemble(0x34, 0x12), 0x1234);
        assert_eq!(assemble(0xFF, 0x00), 0x00FF);
        assert_eq!(assemble(0x00, 0xFF), 0xFF00);
    }

    #[test]
    fn test_twos_complement_boundaries() {
        assert_eq!(twos_complement(0), 0);
        assert_eq!(twos_complement(32767), 32767);
        assert_eq!(twos_complement(32768), -32768);
        assert_eq!(twos_complement(65535), -1);
    }

    #[test]
    fn test_twos_complement_matches_subtraction_rule() {
        for raw in (0..=u16::MAX).step_by(257) {
            let expected = if raw > 32767 {
                i32::from(raw) - 65536
            } else {
                i32::from(raw)
            };
            assert_eq!(i32::from(twos_complement(raw)), expected, "raw = {raw}");
        }
    }

    #[test]
    fn test_decode_axis_extremes() {
        assert_eq!(decode_axis(0xFF, 0xFF), -1);
        assert_eq!(decode_axis(0x00, 0x80), -32768);
        assert_eq!(decode_axis(0xFF, 0x7F), 32767);
    }

    #[test]
    fn test_reading_from_raw_keeps_axis_order() {
        let reading = Reading::from_raw([-1, 0, 1234]);
        assert_eq!(reading.axis(Axis::X), -1.0);
        assert_eq!(reading.axis(Axis::Y), 0.0);
        assert_eq!(reading.axis(Axis::Z), 1234.0);
    }

    #[test]
    fn test_axis_registers() {
        let addrs: [u8; 3] = Axis::ALL.map(|a| a.data_register().addr());
        assert_eq!(addrs, [0x28, 0x2A, 0x2C]);
    }
}
