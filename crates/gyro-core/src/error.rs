//! Error types for initialization, sampling and polling

use embedded_hal::i2c::ErrorKind;
use thiserror_no_std::Error;

use crate::reading::Axis;
use crate::registers::Register;
use crate::transport::ControllerId;

/// Failures while bringing the sensor up. All of them are terminal for that
/// startup attempt: no handle is produced.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitError {
    #[error("No I2C controller found")]
    NoControllerFound,
    #[error("Address 0x{address:02X} already in use on {controller}")]
    AddressInUse {
        controller: ControllerId,
        address: u8,
    },
    #[error("Failed to open {controller}: {cause}")]
    OpenFailed {
        controller: ControllerId,
        cause: ErrorKind,
    },
    #[error("Failed to write {register}: {cause}")]
    ConfigWriteFailed { register: Register, cause: ErrorKind },
}

/// Failure during one read cycle.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadError {
    #[error("Failed to read axis {axis} at register 0x{register:02X}: {cause}")]
    TransactionFailed {
        axis: Axis,
        register: u8,
        cause: ErrorKind,
    },
}

impl ReadError {
    pub const fn axis(&self) -> Axis {
        match self {
            Self::TransactionFailed { axis, .. } => *axis,
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerError {
    #[error("Poller already running")]
    AlreadyRunning,
    #[error("Poll period must be non-zero")]
    InvalidPeriod,
}
