//! Reporting contract between the poller and whatever presents readings
//!
//! The poller hands every tick's outcome to a [`ReportSink`]. The usual sink
//! is a publisher on a [`GyroUpdateChannel`]; the UI and logging tasks
//! subscribe and own their execution context, so the poller never touches
//! presentation state.

use core::fmt::{self, Write};
use core::future::Future;

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, RawMutex};
use embassy_sync::pubsub::{PubSubChannel, Publisher, Subscriber};

use crate::error::ReadError;
use crate::reading::{Axis, Reading};

/// Channel capacity for update events
pub const UPDATE_CHANNEL_CAPACITY: usize = 8;

/// Number of subscribers that can listen to updates
/// - Subscriber 0: UI / status display
/// - Subscriber 1: logger
pub const UPDATE_SUBSCRIBERS: usize = 2;

/// Number of publishers (just the poller)
pub const UPDATE_PUBLISHERS: usize = 1;

/// Maximum length of a status message.
pub const STATUS_LEN: usize = 96;

pub type StatusMessage = heapless::String<STATUS_LEN>;

pub type GyroUpdateChannel = PubSubChannel<
    CriticalSectionRawMutex,
    GyroUpdate,
    UPDATE_CHANNEL_CAPACITY,
    UPDATE_SUBSCRIBERS,
    UPDATE_PUBLISHERS,
>;

pub type GyroUpdatePublisher<'a> = Publisher<
    'a,
    CriticalSectionRawMutex,
    GyroUpdate,
    UPDATE_CHANNEL_CAPACITY,
    UPDATE_SUBSCRIBERS,
    UPDATE_PUBLISHERS,
>;

pub type GyroUpdateSubscriber<'a> = Subscriber<
    'a,
    CriticalSectionRawMutex,
    GyroUpdate,
    UPDATE_CHANNEL_CAPACITY,
    UPDATE_SUBSCRIBERS,
    UPDATE_PUBLISHERS,
>;

/// Outcome of one poll tick.
#[derive(Debug, Clone, PartialEq)]
pub enum GyroUpdate {
    /// A full read cycle succeeded.
    Running { reading: Reading, uptime_ms: u64 },
    /// The read cycle failed; no axis value from this tick is valid.
    Fault(FaultReport),
}

impl GyroUpdate {
    pub fn status(&self) -> &str {
        match self {
            Self::Running { .. } => "running",
            Self::Fault(fault) => fault.status.as_str(),
        }
    }

    pub fn reading(&self) -> Option<&Reading> {
        match self {
            Self::Running { reading, .. } => Some(reading),
            Self::Fault(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FaultReport {
    /// Per-axis error markers, indexed by [`Axis::index`].
    pub axis_errors: [bool; 3],
    /// Axis whose transaction failed, if the fault came from a transaction.
    pub failed_axis: Option<Axis>,
    pub status: StatusMessage,
}

impl FaultReport {
    pub fn from_read_error(error: &ReadError) -> Self {
        Self {
            // A failed cycle invalidates every axis of that tick.
            axis_errors: [true; 3],
            failed_axis: Some(error.axis()),
            status: bounded(format_args!("error: {}", error)),
        }
    }

    pub fn halted(consecutive_failures: u32) -> Self {
        Self {
            axis_errors: [true; 3],
            failed_axis: None,
            status: bounded(format_args!(
                "stopped: {} consecutive read failures",
                consecutive_failures
            )),
        }
    }

    pub fn axis_failed(&self, axis: Axis) -> bool {
        self.axis_errors[axis.index()]
    }
}

/// Format into a status message, truncating at [`STATUS_LEN`].
fn bounded(args: fmt::Arguments<'_>) -> StatusMessage {
    struct Truncate<'a>(&'a mut StatusMessage);

    impl Write for Truncate<'_> {
        fn write_str(&mut self, s: &str) -> fmt::Result {
            for c in s.chars() {
                if self.0.push(c).is_err() {
                    break;
                }
            }
            Ok(())
        }
    }

    let mut message = StatusMessage::new();
    let _ = Truncate(&mut message).write_fmt(args);
    message
}

/// Receives the outcome of every poll tick.
pub trait ReportSink {
    fn report(&mut self, update: GyroUpdate) -> impl Future<Output = ()>;
}

impl<M, const CAP: usize, const SUBS: usize, const PUBS: usize> ReportSink
    for Publisher<'_, M, GyroUpdate, CAP, SUBS, PUBS>
where
    M: RawMutex,
{
    async fn report(&mut self, update: GyroUpdate) {
        self.publish(update).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;
    use embedded_hal::i2c::ErrorKind;

    #[test]
    fn test_fault_report_marks_all_axes() {
        let error = ReadError::TransactionFailed {
            axis: Axis::Z,
            register: 0x2D,
            cause: ErrorKind::Bus,
        };
        let fault = FaultReport::from_read_error(&error);

        assert!(Axis::ALL.iter().all(|a| fault.axis_failed(*a)));
        assert_eq!(fault.failed_axis, Some(Axis::Z));
        assert!(fault.status.starts_with("error: Failed to read axis Z"));
    }

    #[test]
    fn test_status_message_is_truncated() {
        let message = bounded(format_args!("{:0>200}", 1));
        assert_eq!(message.len(), STATUS_LEN);
    }

    #[test]
    fn test_publisher_sink_delivers_to_subscribers() {
        let channel = GyroUpdateChannel::new();
        let mut publisher = channel.publisher().unwrap();
        let mut ui = channel.subscriber().unwrap();
        let mut logger = channel.subscriber().unwrap();

        let update = GyroUpdate::Running {
            reading: Reading {
                x: 1.0,
                y: -2.0,
                z: 3.0,
            },
            uptime_ms: 42,
        };
        block_on(publisher.report(update.clone()));

        assert_eq!(ui.try_next_message_pure(), Some(update.clone()));
        assert_eq!(logger.try_next_message_pure(), Some(update));
        assert_eq!(ui.try_next_message_pure(), None);
    }
}
