//! Async I2C bus with exclusive per-address claims
//!
//! Wraps one physical bus in Embassy's async `Mutex` so transactions from
//! different devices never interleave, and tracks which 7-bit addresses are
//! currently owned. A [`ClaimedI2cDevice`] is the only way to talk to an
//! address and releases its claim when dropped.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};
use log::{debug, info};

use crate::transport::{
    ConnectionSettings, ControllerId, I2cControllerProvider, MAX_CONTROLLERS, OpenError,
};

/// One physical I2C bus shared between claimed devices.
///
/// # Example
///
/// ```ignore
/// static BUS: StaticCell<SharedI2cBus<MyI2c>> = StaticCell::new();
/// let bus = BUS.init(SharedI2cBus::new(i2c));
///
/// let device = bus.claim(ConnectionSettings { address: 0x68, speed: BusSpeed::Fast })?;
/// ```
pub struct SharedI2cBus<T> {
    bus: Mutex<CriticalSectionRawMutex, T>,
    /// Bit `n` set means 7-bit address `n` is claimed.
    claims: BlockingMutex<CriticalSectionRawMutex, Cell<u128>>,
}

impl<T> SharedI2cBus<T> {
    pub const fn new(bus: T) -> Self {
        Self {
            bus: Mutex::new(bus),
            claims: BlockingMutex::new(Cell::new(0)),
        }
    }

    /// Take exclusive ownership of `settings.address`.
    pub fn claim(
        &self,
        settings: ConnectionSettings,
    ) -> Result<ClaimedI2cDevice<'_, T>, OpenError> {
        let bit = 1u128 << (settings.address & 0x7F);
        let claimed = self.claims.lock(|claims| {
            let current = claims.get();
            if current & bit != 0 {
                false
            } else {
                claims.set(current | bit);
                true
            }
        });

        if !claimed {
            return Err(OpenError::AddressInUse);
        }

        debug!(
            "Claimed I2C address 0x{:02X} at {} kHz",
            settings.address,
            settings.speed.khz()
        );
        Ok(ClaimedI2cDevice {
            bus: self,
            settings,
        })
    }

    pub fn is_claimed(&self, address: u8) -> bool {
        let bit = 1u128 << (address & 0x7F);
        self.claims.lock(|claims| claims.get() & bit != 0)
    }

    fn release(&self, address: u8) {
        let bit = 1u128 << (address & 0x7F);
        self.claims.lock(|claims| claims.set(claims.get() & !bit));
        debug!("Released I2C address 0x{:02X}", address);
    }

    /// Run `f` against the raw bus while holding the bus lock.
    pub async fn with_bus<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        let mut bus = self.bus.lock().await;
        f(&mut bus)
    }
}

/// Exclusive connection to one address on a [`SharedI2cBus`].
///
/// Every operation targets the claimed address; the `address` argument of the
/// `I2c` methods is ignored.
pub struct ClaimedI2cDevice<'a, T> {
    bus: &'a SharedI2cBus<T>,
    settings: ConnectionSettings,
}

impl<T> ClaimedI2cDevice<'_, T> {
    pub fn settings(&self) -> ConnectionSettings {
        self.settings
    }
}

impl<T> Drop for ClaimedI2cDevice<'_, T> {
    fn drop(&mut self) {
        self.bus.release(self.settings.address);
    }
}

impl<T> ErrorType for ClaimedI2cDevice<'_, T>
where
    T: ErrorType,
{
    type Error = T::Error;
}

impl<T> I2c for ClaimedI2cDevice<'_, T>
where
    T: I2c,
{
    #[inline]
    async fn read(&mut self, _address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.bus.lock().await;
        bus.read(self.settings.address, read).await
    }

    #[inline]
    async fn write(&mut self, _address: u8, write: &[u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.bus.lock().await;
        bus.write(self.settings.address, write).await
    }

    /// Performs a write-read transaction without releasing the bus between
    /// the two phases.
    #[inline]
    async fn write_read(
        &mut self,
        _address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.bus.lock().await;
        bus.write_read(self.settings.address, write, read).await
    }

    #[inline]
    async fn transaction(
        &mut self,
        _address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.bus.lock().await;
        bus.transaction(self.settings.address, operations).await
    }
}

/// Provider over a fixed set of shared buses, indexed by position.
pub struct BusSet<'a, T, const N: usize> {
    buses: [&'a SharedI2cBus<T>; N],
}

impl<'a, T, const N: usize> BusSet<'a, T, N> {
    pub const fn new(buses: [&'a SharedI2cBus<T>; N]) -> Self {
        Self { buses }
    }
}

impl<'a, T, const N: usize> I2cControllerProvider for BusSet<'a, T, N>
where
    T: I2c,
{
    type Bus = ClaimedI2cDevice<'a, T>;

    fn controllers(&self) -> heapless::Vec<ControllerId, MAX_CONTROLLERS> {
        (0..N.min(MAX_CONTROLLERS))
            .map(|i| ControllerId(i as u8))
            .collect()
    }

    async fn open(
        &mut self,
        controller: ControllerId,
        settings: ConnectionSettings,
    ) -> Result<Self::Bus, OpenError> {
        let bus: &'a SharedI2cBus<T> = *self
            .buses
            .get(controller.0 as usize)
            .ok_or(OpenError::UnknownController)?;
        let device = bus.claim(settings)?;
        info!("Opened {} for address 0x{:02X}", controller, settings.address);
        Ok(device)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockGyroBus;
    use crate::transport::BusSpeed;
    use embassy_futures::block_on;

    const SETTINGS: ConnectionSettings = ConnectionSettings {
        address: 0x68,
        speed: BusSpeed::Fast,
    };

    #[test]
    fn test_claim_is_exclusive_until_dropped() {
        let bus = SharedI2cBus::new(MockGyroBus::new());

        let first = bus.claim(SETTINGS).unwrap();
        assert!(bus.is_claimed(0x68));
        assert!(matches!(bus.claim(SETTINGS), Err(OpenError::AddressInUse)));

        drop(first);
        assert!(!bus.is_claimed(0x68));
        assert!(bus.claim(SETTINGS).is_ok());
    }

    #[test]
    fn test_other_addresses_stay_available() {
        let bus = SharedI2cBus::new(MockGyroBus::new());
        let _gyro = bus.claim(SETTINGS).unwrap();
        let other = ConnectionSettings {
            address: 0x69,
            ..SETTINGS
        };
        assert!(bus.claim(other).is_ok());
    }

    #[test]
    fn test_claimed_device_targets_claimed_address() {
        let mock = MockGyroBus::new();
        let log = mock.log();
        let bus = SharedI2cBus::new(mock);
        let mut device = bus.claim(SETTINGS).unwrap();

        block_on(device.write(0x00, &[0x20, 0x0F])).unwrap();

        assert_eq!(log.writes(), std::vec![(0x68, std::vec![0x20, 0x0F])]);
    }

    #[test]
    fn test_bus_set_enumeration_and_open() {
        let a = SharedI2cBus::new(MockGyroBus::new());
        let b = SharedI2cBus::new(MockGyroBus::new());
        let mut set = BusSet::new([&a, &b]);

        assert_eq!(
            set.controllers().as_slice(),
            &[ControllerId(0), ControllerId(1)]
        );

        let device = block_on(set.open(ControllerId(1), SETTINGS)).unwrap();
        assert_eq!(device.settings(), SETTINGS);
        assert!(b.is_claimed(0x68));
        assert!(!a.is_claimed(0x68));

        assert!(matches!(
            block_on(set.open(ControllerId(5), SETTINGS)),
            Err(OpenError::UnknownController)
        ));
    }
}
