//! Register-file I2C double used by the unit tests

use core::cell::RefCell;
use std::rc::Rc;
use std::vec::Vec;

use embassy_time::{Duration, Timer};
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

use crate::reading::Axis;

/// Bus transaction as observed by the mock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BusOp {
    Write { addr: u8, data: Vec<u8> },
    WriteRead { addr: u8, register: u8, len: usize },
}

#[derive(Debug)]
struct MockState {
    registers: [u8; 256],
    ops: Vec<BusOp>,
    fail_write_to: Option<u8>,
    fail_read_at: Vec<usize>,
    reads: usize,
    latency: Option<Duration>,
    in_flight: usize,
    max_in_flight: usize,
}

/// Shared view of a [`MockGyroBus`] that stays usable after the bus has been
/// moved into a driver.
#[derive(Debug, Clone)]
pub struct MockBusLog(Rc<RefCell<MockState>>);

impl MockBusLog {
    pub fn ops(&self) -> Vec<BusOp> {
        self.0.borrow().ops.clone()
    }

    pub fn writes(&self) -> Vec<(u8, Vec<u8>)> {
        self.0
            .borrow()
            .ops
            .iter()
            .filter_map(|op| match op {
                BusOp::Write { addr, data } => Some((*addr, data.clone())),
                BusOp::WriteRead { .. } => None,
            })
            .collect()
    }

    /// Register addresses targeted by write-read transactions, in order.
    pub fn read_registers(&self) -> Vec<u8> {
        self.0
            .borrow()
            .ops
            .iter()
            .filter_map(|op| match op {
                BusOp::WriteRead { register, .. } => Some(*register),
                BusOp::Write { .. } => None,
            })
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.0.borrow().max_in_flight
    }

    pub fn register(&self, register: u8) -> u8 {
        self.0.borrow().registers[register as usize]
    }

    /// Store a raw little-endian pair for `axis`.
    pub fn set_axis(&self, axis: Axis, raw: u16) {
        let low = axis.data_register().addr() as usize;
        let [lo, hi] = raw.to_le_bytes();
        let mut state = self.0.borrow_mut();
        state.registers[low] = lo;
        state.registers[low + 1] = hi;
    }

    /// Fail the `n`th write-read transaction (zero based, counted over the
    /// lifetime of the mock).
    pub fn fail_read_at(&self, n: usize) {
        self.0.borrow_mut().fail_read_at.push(n);
    }

    pub fn fail_write_to(&self, register: u8) {
        self.0.borrow_mut().fail_write_to = Some(register);
    }

    pub fn set_latency(&self, latency: Duration) {
        self.0.borrow_mut().latency = Some(latency);
    }
}

/// Gyroscope register file behind an async I2C interface.
pub struct MockGyroBus {
    state: Rc<RefCell<MockState>>,
}

impl MockGyroBus {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(MockState {
                registers: [0; 256],
                ops: Vec::new(),
                fail_write_to: None,
                fail_read_at: Vec::new(),
                reads: 0,
                latency: None,
                in_flight: 0,
                max_in_flight: 0,
            })),
        }
    }

    pub fn log(&self) -> MockBusLog {
        MockBusLog(self.state.clone())
    }

    async fn enter(&self) {
        let latency = {
            let mut state = self.state.borrow_mut();
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
            state.latency
        };
        if let Some(latency) = latency {
            Timer::after(latency).await;
        }
    }

    fn exit(&self) {
        self.state.borrow_mut().in_flight -= 1;
    }

    fn do_write(&self, addr: u8, data: &[u8]) -> Result<(), ErrorKind> {
        let mut state = self.state.borrow_mut();
        state.ops.push(BusOp::Write {
            addr,
            data: data.to_vec(),
        });
        if let Some((&register, values)) = data.split_first() {
            if state.fail_write_to == Some(register) {
                return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Data));
            }
            for (offset, value) in values.iter().enumerate() {
                state.registers[register as usize + offset] = *value;
            }
        }
        Ok(())
    }

    fn do_write_read(&self, addr: u8, write: &[u8], read: &mut [u8]) -> Result<(), ErrorKind> {
        let mut state = self.state.borrow_mut();
        let register = write.first().copied().unwrap_or(0);
        state.ops.push(BusOp::WriteRead {
            addr,
            register,
            len: read.len(),
        });

        let index = state.reads;
        state.reads += 1;
        if state.fail_read_at.contains(&index) {
            return Err(ErrorKind::Bus);
        }

        for (offset, byte) in read.iter_mut().enumerate() {
            *byte = state.registers[register as usize + offset];
        }
        Ok(())
    }
}

impl ErrorType for MockGyroBus {
    type Error = ErrorKind;
}

impl I2c for MockGyroBus {
    async fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        self.enter().await;
        let result = self.do_write(address, write);
        self.exit();
        result
    }

    async fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.enter().await;
        let result = self.do_write_read(address, write, read);
        self.exit();
        result
    }

    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut pointer = 0u8;
        for op in operations.iter_mut() {
            match op {
                Operation::Write(data) => {
                    pointer = data.first().copied().unwrap_or(pointer);
                    self.write(address, *data).await?;
                }
                Operation::Read(buf) => {
                    self.write_read(address, &[pointer], &mut **buf).await?;
                }
            }
        }
        Ok(())
    }
}
