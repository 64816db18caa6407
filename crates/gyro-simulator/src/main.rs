//! Desktop simulator for gyro-rs.
//!
//! Runs the real driver and poller from `gyro-core` against a simulated
//! gyroscope register file on a host, and prints every status update the way
//! a status display would.
//!
//! # Environment
//!
//! | Variable               | Default | Meaning                                    |
//! |------------------------|---------|--------------------------------------------|
//! | `GYRO_POLL_PERIOD_MS`  | 300     | Poll period                                |
//! | `GYRO_MAX_FAILURES`    | unset   | Halt after this many failures in a row     |
//! | `GYRO_SIM_RUN_SECS`    | 5       | Stop the poller after this long            |
//! | `GYRO_SIM_FAULT_EVERY` | 0       | Fail every Nth register read (0 = off)     |
//!
//! Logging is controlled with `RUST_LOG` (defaults to `info`).

mod simulated_gyro;

use std::str::FromStr;

use embassy_futures::block_on;
use embassy_futures::join::join3;
use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};
use log::{error, info, warn};
use static_cell::StaticCell;

use gyro_core::bus::{BusSet, SharedI2cBus};
use gyro_core::sink::{GyroUpdateChannel, GyroUpdateSubscriber};
use gyro_core::{Axis, Gyro, GyroUpdate, Poller, PollerConfig, PollerControl, PollerState};

use simulated_gyro::SimulatedGyro;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

static BUS: StaticCell<SharedI2cBus<SimulatedGyro>> = StaticCell::new();

static POLLER: PollerControl = PollerControl::new();

static UPDATES: GyroUpdateChannel = GyroUpdateChannel::new();

/// How long the display waits for an update before checking for shutdown.
const DISPLAY_IDLE: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

struct SimSettings {
    poller: PollerConfig,
    run_for: Duration,
    fault_every: u32,
}

impl SimSettings {
    fn from_env() -> Self {
        let defaults = PollerConfig::default();
        Self {
            poller: PollerConfig {
                period_ms: env_or("GYRO_POLL_PERIOD_MS", defaults.period_ms),
                max_consecutive_failures: env_var("GYRO_MAX_FAILURES"),
            },
            run_for: Duration::from_secs(env_or("GYRO_SIM_RUN_SECS", 5)),
            fault_every: env_or("GYRO_SIM_FAULT_EVERY", 0),
        }
    }
}

fn env_var<T: FromStr>(key: &str) -> Option<T> {
    let raw = std::env::var(key).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!("Ignoring {}={:?}: not a valid value", key, raw);
            None
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env_var(key).unwrap_or(default)
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

/// Present one update, standing in for the status display.
fn show(update: &GyroUpdate) {
    match update {
        GyroUpdate::Running { reading, uptime_ms } => info!(
            "[{:>7} ms] status: running  x={:>7} y={:>7} z={:>7}",
            uptime_ms, reading.x, reading.y, reading.z
        ),
        GyroUpdate::Fault(fault) => {
            let marker = |axis: Axis| {
                if fault.axis_failed(axis) {
                    "error"
                } else {
                    "-"
                }
            };
            warn!(
                "status: {}  x={} y={} z={}",
                fault.status,
                marker(Axis::X),
                marker(Axis::Y),
                marker(Axis::Z)
            );
        }
    }
}

async fn display_updates(subscriber: &mut GyroUpdateSubscriber<'_>) {
    loop {
        match select(subscriber.next_message_pure(), Timer::after(DISPLAY_IDLE)).await {
            Either::First(update) => show(&update),
            Either::Second(()) if POLLER.state() == PollerState::Stopped => break,
            Either::Second(()) => {}
        }
    }
}

async fn stop_after(duration: Duration) {
    let deadline = Instant::now() + duration;
    while Instant::now() < deadline && POLLER.state() == PollerState::Running {
        Timer::after(DISPLAY_IDLE).await;
    }
    POLLER.stop().await;
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = SimSettings::from_env();
    info!("Starting gyro-rs simulator");
    info!(
        "Period {} ms, run {} s, fault every {} reads",
        settings.poller.period_ms,
        settings.run_for.as_secs(),
        settings.fault_every
    );

    let bus: &'static SharedI2cBus<SimulatedGyro> =
        BUS.init(SharedI2cBus::new(SimulatedGyro::new(settings.fault_every)));
    let mut provider = BusSet::new([bus]);

    block_on(async {
        let gyro = match Gyro::initialize(&mut provider).await {
            Ok(gyro) => gyro,
            Err(e) => {
                error!("Initialization failed: {}", e);
                return;
            }
        };

        let poller = match Poller::start(&POLLER, gyro, settings.poller) {
            Ok(poller) => poller,
            Err(e) => {
                error!("Poller failed to start: {}", e);
                return;
            }
        };

        let mut publisher = UPDATES
            .publisher()
            .expect("Failed to create update publisher");
        let mut display = UPDATES
            .subscriber()
            .expect("Failed to create update subscriber");

        let (summary, (), ()) = join3(
            poller.run(&mut publisher),
            display_updates(&mut display),
            stop_after(settings.run_for),
        )
        .await;

        let transactions = bus.with_bus(|sim| sim.transactions()).await;
        info!(
            "Summary: {} ticks, {} failed, {} skipped, {} bus transactions{}",
            summary.ticks,
            summary.failures,
            summary.skipped_ticks,
            transactions,
            if summary.halted { " (halted)" } else { "" }
        );
    });

    info!("Simulator exiting");
}
