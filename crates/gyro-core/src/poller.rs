//! Fixed-cadence polling of the gyroscope
//!
//! A [`Poller`] owns the sensor handle for as long as it runs. Its lifecycle
//! is tracked by a [`PollerControl`], which can live in a `static` so that
//! any task can ask the poller to stop:
//!
//! ```rust,ignore
//! static POLLER: PollerControl = PollerControl::new();
//! static UPDATES: GyroUpdateChannel = GyroUpdateChannel::new();
//!
//! let gyro = Gyro::initialize(&mut provider).await?;
//! let poller = Poller::start(&POLLER, gyro, PollerConfig::default())?;
//! let mut publisher = UPDATES.publisher().unwrap();
//! let summary = poller.run(&mut publisher).await;
//!
//! // elsewhere
//! POLLER.stop().await;
//! ```
//!
//! Ticks are strictly serialized: the loop awaits each read cycle before
//! scheduling the next one. Deadlines that pass while a read is still in
//! progress are skipped rather than queued.

use core::cell::Cell;

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::Mutex as BlockingMutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use embedded_hal_async::i2c::I2c;
use log::{debug, error, info, warn};

use crate::config::PollerConfig;
use crate::driver::Gyro;
use crate::error::PollerError;
use crate::reading::Reading;
use crate::sink::{FaultReport, GyroUpdate, ReportSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollerState {
    Uninitialized,
    Running,
    Stopped,
}

/// Shared lifecycle state and stop handshake for one poller slot.
pub struct PollerControl {
    state: BlockingMutex<CriticalSectionRawMutex, Cell<PollerState>>,
    stop_requested: Signal<CriticalSectionRawMutex, ()>,
    stopped: Signal<CriticalSectionRawMutex, ()>,
}

impl Default for PollerControl {
    fn default() -> Self {
        Self::new()
    }
}

impl PollerControl {
    pub const fn new() -> Self {
        Self {
            state: BlockingMutex::new(Cell::new(PollerState::Uninitialized)),
            stop_requested: Signal::new(),
            stopped: Signal::new(),
        }
    }

    pub fn state(&self) -> PollerState {
        self.state.lock(|state| state.get())
    }

    /// Request a stop and wait until the poller has finished its current
    /// tick and released the sensor handle.
    ///
    /// Returns immediately if no poller is running. Any number of callers may
    /// wait on the same stop.
    pub async fn stop(&self) {
        if self.state() != PollerState::Running {
            return;
        }

        info!("Poller: stop requested");
        self.stop_requested.signal(());
        self.stopped.wait().await;
        // `Signal` wakes a single waiter; pass completion on to the next one.
        self.stopped.signal(());
    }

    fn begin(&self) -> Result<(), PollerError> {
        self.state.lock(|state| {
            if state.get() == PollerState::Running {
                return Err(PollerError::AlreadyRunning);
            }
            // Clear stale signals before `Running` becomes visible to `stop`.
            self.stop_requested.reset();
            self.stopped.reset();
            state.set(PollerState::Running);
            Ok(())
        })
    }

    fn finish(&self) {
        self.state.lock(|state| state.set(PollerState::Stopped));
        self.stopped.signal(());
    }
}

/// Counters reported when a poller finishes.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PollSummary {
    pub ticks: u32,
    pub failures: u32,
    pub skipped_ticks: u32,
    pub last_reading: Option<Reading>,
    /// The poller stopped itself after too many consecutive failures.
    pub halted: bool,
}

/// Running poller owning the sensor handle.
pub struct Poller<'a, I> {
    control: &'a PollerControl,
    config: PollerConfig,
    gyro: Option<Gyro<I>>,
    summary: PollSummary,
    consecutive_failures: u32,
}

impl<'a, I: I2c> Poller<'a, I> {
    /// Transition `control` to `Running` and take ownership of `gyro`.
    ///
    /// On error the handle is dropped, releasing its bus connection.
    pub fn start(
        control: &'a PollerControl,
        gyro: Gyro<I>,
        config: PollerConfig,
    ) -> Result<Self, PollerError> {
        if config.period_ms == 0 {
            return Err(PollerError::InvalidPeriod);
        }
        control.begin()?;

        info!("Poller: running every {} ms", config.period_ms);
        Ok(Self {
            control,
            config,
            gyro: Some(gyro),
            summary: PollSummary::default(),
            consecutive_failures: 0,
        })
    }

    /// Tick until stopped (or halted by the failure limit).
    ///
    /// The first tick fires immediately. The sensor handle is released before
    /// this returns.
    pub async fn run<S: ReportSink>(mut self, sink: &mut S) -> PollSummary {
        let period = self.config.period();
        let mut deadline = Instant::now();

        loop {
            if self.control.stop_requested.signaled() {
                break;
            }

            let woke = select(Timer::at(deadline), self.control.stop_requested.wait()).await;
            if let Either::Second(()) = woke {
                break;
            }

            if !self.tick(sink).await {
                break;
            }

            deadline = self.next_deadline(deadline, period);
        }

        info!(
            "Poller: stopped after {} ticks ({} failed, {} skipped)",
            self.summary.ticks, self.summary.failures, self.summary.skipped_ticks
        );
        self.summary
    }

    /// One read cycle. Returns `false` when the poller should halt.
    async fn tick<S: ReportSink>(&mut self, sink: &mut S) -> bool {
        let Some(gyro) = self.gyro.as_mut() else {
            return false;
        };

        self.summary.ticks += 1;
        match gyro.read_sample().await {
            Ok(reading) => {
                self.consecutive_failures = 0;
                self.summary.last_reading = Some(reading);
                sink.report(GyroUpdate::Running {
                    reading,
                    uptime_ms: Instant::now().as_millis(),
                })
                .await;
                true
            }
            Err(e) => {
                self.summary.failures += 1;
                self.consecutive_failures += 1;
                warn!("Poller: tick {} failed: {}", self.summary.ticks, e);
                sink.report(GyroUpdate::Fault(FaultReport::from_read_error(&e)))
                    .await;

                match self.config.max_consecutive_failures {
                    Some(limit) if self.consecutive_failures >= limit => {
                        error!(
                            "Poller: halting after {} consecutive failures",
                            self.consecutive_failures
                        );
                        self.summary.halted = true;
                        sink.report(GyroUpdate::Fault(FaultReport::halted(
                            self.consecutive_failures,
                        )))
                        .await;
                        false
                    }
                    _ => true,
                }
            }
        }
    }

    /// Next deadline after `deadline`, skipping any already in the past.
    fn next_deadline(&mut self, deadline: Instant, period: Duration) -> Instant {
        let now = Instant::now();
        let mut next = deadline + period;
        let mut skipped = 0;
        while next < now {
            next += period;
            skipped += 1;
        }

        if skipped > 0 {
            debug!("Poller: read overran period, skipped {} ticks", skipped);
            self.summary.skipped_ticks += skipped;
        }
        next
    }
}

impl<I> Drop for Poller<'_, I> {
    fn drop(&mut self) {
        // Release the bus before anyone waiting in `stop` is woken.
        drop(self.gyro.take());
        self.control.finish();
    }
}
