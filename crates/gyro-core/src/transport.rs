//! Transport selector contract
//!
//! The driver does not know how I2C controllers are discovered or opened on
//! a given platform. It asks an [`I2cControllerProvider`] for the available
//! controllers and for a connection to one of them; the returned bus only
//! needs to implement [`embedded_hal_async::i2c::I2c`].

use core::future::Future;

use embedded_hal::i2c::ErrorKind;
use embedded_hal_async::i2c::I2c;

/// Upper bound on controllers a provider reports.
pub const MAX_CONTROLLERS: usize = 4;

/// Identifies one I2C controller known to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerId(pub u8);

impl core::fmt::Display for ControllerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "i2c{}", self.0)
    }
}

/// Bus clock selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BusSpeed {
    /// 100 kHz
    Standard,
    /// 400 kHz
    Fast,
}

impl BusSpeed {
    pub const fn khz(self) -> u32 {
        match self {
            Self::Standard => 100,
            Self::Fast => 400,
        }
    }
}

/// Settings for opening a connection to one slave device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub address: u8,
    pub speed: BusSpeed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenError {
    /// Another owner holds the address on this controller.
    AddressInUse,
    /// The controller id is unknown to the provider.
    UnknownController,
    /// The controller refused the connection.
    Bus(ErrorKind),
}

/// Enumerates I2C controllers and opens exclusive connections on them.
pub trait I2cControllerProvider {
    type Bus: I2c;

    /// Controllers currently available, in preference order.
    fn controllers(&self) -> heapless::Vec<ControllerId, MAX_CONTROLLERS>;

    /// Open an exclusive connection to `settings.address` on `controller`.
    fn open(
        &mut self,
        controller: ControllerId,
        settings: ConnectionSettings,
    ) -> impl Future<Output = Result<Self::Bus, OpenError>>;
}
