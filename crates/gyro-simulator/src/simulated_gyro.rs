//! Simulated gyroscope register file behind an async I2C interface.

use std::time::Instant;

use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};
use log::{debug, trace};

use gyro_core::registers::{Register, SLAVE_ADDRESS};

/// CTRL1 power bit; data registers read zero while it is clear.
const CTRL1_POWER: u8 = 1 << 3;

/// Sub-address auto-increment flag.
const AUTO_INCREMENT: u8 = 0x80;

/// Per-axis rate waveform: amplitude (raw counts), period (s), phase (rad).
const WAVEFORMS: [(f64, f64, f64); 3] = [
    (12_000.0, 4.0, 0.0),
    (6_000.0, 2.5, 1.3),
    (20_000.0, 7.0, 2.1),
];

/// Register-level model of the gyroscope.
///
/// Rates follow slow sine waves. Reading `OUT_X_L` latches a fresh sample for
/// all three axes, so one read cycle always sees a consistent set.
///
/// Fault injection only counts transactions that read, so the configuration
/// writes at startup always succeed.
pub struct SimulatedGyro {
    registers: [u8; 0x40],
    started: Instant,
    transactions: u64,
    reads: u64,
    fault_every: u32,
}

impl SimulatedGyro {
    pub fn new(fault_every: u32) -> Self {
        Self {
            registers: [0; 0x40],
            started: Instant::now(),
            transactions: 0,
            reads: 0,
            fault_every,
        }
    }

    pub fn transactions(&self) -> u64 {
        self.transactions
    }

    fn latch_sample(&mut self) {
        let ctrl1 = self.registers[Register::Control1.addr() as usize];
        let t = self.started.elapsed().as_secs_f64();

        for (axis, (amplitude, period, phase)) in WAVEFORMS.iter().enumerate() {
            let enabled = ctrl1 & CTRL1_POWER != 0 && ctrl1 & (1 << axis) != 0;
            let value = if enabled {
                (amplitude * (core::f64::consts::TAU * t / period + phase).sin()) as i16
            } else {
                0
            };

            let low = Register::DataX.addr() as usize + axis * 2;
            let [lo, hi] = value.to_le_bytes();
            self.registers[low] = lo;
            self.registers[low + 1] = hi;
        }
    }

    fn read_register(&mut self, register: u8) -> u8 {
        if register == Register::DataX.addr() {
            self.latch_sample();
        }
        self.registers
            .get(register as usize)
            .copied()
            .unwrap_or(0)
    }

    fn write_registers(&mut self, data: &[u8]) {
        let Some((&sub, values)) = data.split_first() else {
            return;
        };
        let start = (sub & !AUTO_INCREMENT) as usize;
        for (offset, value) in values.iter().enumerate() {
            let step = if sub & AUTO_INCREMENT != 0 { offset } else { 0 };
            if let Some(slot) = self.registers.get_mut(start + step) {
                *slot = *value;
                debug!("Simulated gyro: 0x{:02X} <- 0x{:02X}", start + step, value);
            }
        }
    }
}

impl ErrorType for SimulatedGyro {
    type Error = ErrorKind;
}

impl I2c for SimulatedGyro {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address != SLAVE_ADDRESS {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }

        self.transactions += 1;
        if operations.iter().any(|op| matches!(op, Operation::Read(_))) {
            self.reads += 1;
            if self.fault_every > 0 && self.reads % u64::from(self.fault_every) == 0 {
                trace!("Simulated gyro: injecting fault on read {}", self.reads);
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
            }
        }

        let mut pointer = 0u8;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(data) => {
                    pointer = data.first().copied().unwrap_or(pointer);
                    self.write_registers(data);
                }
                Operation::Read(buf) => {
                    let auto_increment = pointer & AUTO_INCREMENT != 0;
                    let mut register = pointer & !AUTO_INCREMENT;
                    for byte in buf.iter_mut() {
                        *byte = self.read_register(register);
                        if auto_increment {
                            register = register.wrapping_add(1);
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
