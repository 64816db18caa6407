//! Gyroscope driver
//!
//! [`Gyro`] is the sensor handle: it can only be obtained by a successful
//! [`Gyro::initialize`], so a bus connection that failed to open or configure
//! is never used for reads. Dropping the handle drops the bus connection.

use embedded_hal::i2c::Error as _;
use embedded_hal_async::i2c::I2c;
use log::{debug, error, info};

use crate::error::{InitError, ReadError};
use crate::reading::{Axis, Reading, decode_axis};
use crate::registers::{ByteOrder, GyroConfig, Register, SLAVE_ADDRESS};
use crate::transport::{BusSpeed, ConnectionSettings, I2cControllerProvider, OpenError};

/// Connection settings used for the gyroscope.
pub const CONNECTION: ConnectionSettings = ConnectionSettings {
    address: SLAVE_ADDRESS,
    speed: BusSpeed::Fast,
};

/// Initialized gyroscope on an exclusively owned bus connection.
pub struct Gyro<I> {
    i2c: I,
    /// Layout of each data pair, as configured in CTRL4.
    byte_order: ByteOrder,
}

impl<I: I2c> Gyro<I> {
    /// Open the sensor on the first available controller and write the
    /// default startup configuration.
    pub async fn initialize<P>(provider: &mut P) -> Result<Self, InitError>
    where
        P: I2cControllerProvider<Bus = I>,
    {
        Self::initialize_with(provider, &GyroConfig::default()).await
    }

    /// Like [`Gyro::initialize`] with an explicit control register layout.
    ///
    /// Readings are decoded in the byte order selected by `config.control4`.
    pub async fn initialize_with<P>(
        provider: &mut P,
        config: &GyroConfig,
    ) -> Result<Self, InitError>
    where
        P: I2cControllerProvider<Bus = I>,
    {
        let controllers = provider.controllers();
        let Some(&controller) = controllers.first() else {
            error!("Gyro: no I2C controller found");
            return Err(InitError::NoControllerFound);
        };

        let i2c = provider
            .open(controller, CONNECTION)
            .await
            .map_err(|e| {
                error!("Gyro: failed to open {}: {:?}", controller, e);
                match e {
                    OpenError::AddressInUse => InitError::AddressInUse {
                        controller,
                        address: CONNECTION.address,
                    },
                    OpenError::UnknownController => InitError::OpenFailed {
                        controller,
                        cause: embedded_hal::i2c::ErrorKind::Other,
                    },
                    OpenError::Bus(cause) => InitError::OpenFailed { controller, cause },
                }
            })?;

        let mut gyro = Self {
            i2c,
            byte_order: config.control4.byte_order,
        };
        gyro.configure(config).await?;

        info!(
            "Gyro: initialized on {} at 0x{:02X} (CTRL1=0x{:02X}, CTRL4=0x{:02X})",
            controller,
            CONNECTION.address,
            config.control1.bits(),
            config.control4.bits()
        );
        Ok(gyro)
    }

    async fn configure(&mut self, config: &GyroConfig) -> Result<(), InitError> {
        let registers = [Register::Control1, Register::Control4];
        for (register, frame) in registers.into_iter().zip(config.frames()) {
            self.i2c
                .write(CONNECTION.address, &frame)
                .await
                .map_err(|e| {
                    error!("Gyro: write to {} failed: {:?}", register, e);
                    InitError::ConfigWriteFailed {
                        register,
                        cause: e.kind(),
                    }
                })?;
        }
        Ok(())
    }

    /// Read all three axes.
    ///
    /// Issues six single-byte write-read transactions in the order X low,
    /// X high, Y low, Y high, Z low, Z high. The first failure aborts the
    /// cycle and no reading is produced. With big-endian output the byte at
    /// the lower address is the MSB.
    pub async fn read_sample(&mut self) -> Result<Reading, ReadError> {
        let mut raw = [0i16; 3];
        for axis in Axis::ALL {
            let register = axis.data_register();
            let first = self.read_register(axis, register.addr()).await?;
            let second = self.read_register(axis, register.high_byte_addr()).await?;
            raw[axis.index()] = match self.byte_order {
                ByteOrder::LittleEndian => decode_axis(first, second),
                ByteOrder::BigEndian => decode_axis(second, first),
            };
        }

        debug!("Gyro: raw x={} y={} z={}", raw[0], raw[1], raw[2]);
        Ok(Reading::from_raw(raw))
    }

    async fn read_register(&mut self, axis: Axis, register: u8) -> Result<u8, ReadError> {
        let mut value = [0u8; 1];
        self.i2c
            .write_read(CONNECTION.address, &[register], &mut value)
            .await
            .map_err(|e| {
                debug!("Gyro: read of 0x{:02X} failed: {:?}", register, e);
                ReadError::TransactionFailed {
                    axis,
                    register,
                    cause: e.kind(),
                }
            })?;
        Ok(value[0])
    }
}
