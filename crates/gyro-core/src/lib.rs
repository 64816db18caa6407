//! Hardware-independent core library for gyro-rs
//!
//! This crate contains all platform-agnostic logic for polling a 3-axis I2C
//! gyroscope: the register map, the sensor driver (initialization and the
//! read/decode cycle), the fixed-cadence poller and the reporting contract
//! between the poller and whatever presents the readings.
//!
//! It is `#![no_std]` so it compiles on both embedded targets and desktop
//! hosts (for the simulator and tests).

#![no_std]

pub mod bus;
pub mod config;
pub mod driver;
pub mod error;
pub mod poller;
pub mod reading;
pub mod registers;
pub mod sink;
pub mod transport;

#[cfg(test)]
extern crate std;

#[cfg(test)]
pub(crate) mod test_support;

pub use config::PollerConfig;
pub use driver::Gyro;
pub use error::{InitError, PollerError, ReadError};
pub use poller::{PollSummary, Poller, PollerControl, PollerState};
pub use reading::{Axis, Reading};
pub use sink::{FaultReport, GyroUpdate, ReportSink};
