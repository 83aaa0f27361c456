//! # Acquisition Loop
//!
//! Background task that polls the receiver once per cycle, publishes the
//! latest fix, drives the edge-triggered read-error signal and appends one
//! track sample per cycle.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::spawn_blocking;
use tokio::time::{sleep, timeout_at, Instant};
use tracing::{debug, warn};

use super::discovery::DiscoveredPort;
use super::session::{GpsHandle, GpsObserver, READ_ERROR_MESSAGE};
use super::track::TrackSample;
use crate::nmea::{decode_sentence, Fix, SentenceTypeTable};
use crate::serial::{NmeaPort, PortOpener};

/// How long one cycle waits for a valid fix
pub const READ_WINDOW: Duration = Duration::from_secs(5);

/// Pause between cycles
pub const CYCLE_INTERVAL: Duration = Duration::from_secs(1);

/// What one acquisition cycle produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleOutcome {
    /// A valid fix arrived within the window
    Fix(Fix),

    /// The window elapsed without a valid fix
    NoFix {
        /// Trusted sentences seen that reported no valid fix
        recognized: usize,
    },
}

/// Owns the GPS connection for the lifetime of the process
pub struct AcquisitionLoop {
    port_name: String,
    baud_rate: u32,
    sentence_types: SentenceTypeTable,
    port: Option<Box<dyn NmeaPort>>,
    opener: Arc<dyn PortOpener>,
    handle: GpsHandle,
    observer: Arc<dyn GpsObserver>,
}

impl AcquisitionLoop {
    /// Take over the port selected by discovery
    ///
    /// # Arguments
    ///
    /// * `discovered` - Selected port, its open connection and sentence table
    /// * `baud_rate` - Line speed used when the port has to be reopened
    /// * `opener` - Reopens the port after a read failure
    /// * `handle` - Shared state this loop publishes to
    /// * `observer` - Notified on read-error transitions
    pub fn new(
        discovered: DiscoveredPort,
        baud_rate: u32,
        opener: Arc<dyn PortOpener>,
        handle: GpsHandle,
        observer: Arc<dyn GpsObserver>,
    ) -> Self {
        Self {
            port_name: discovered.port_name,
            baud_rate,
            sentence_types: discovered.sentence_types,
            port: Some(discovered.port),
            opener,
            handle,
            observer,
        }
    }

    /// Run cycles forever, pausing [`CYCLE_INTERVAL`] between them
    pub async fn run(mut self) {
        loop {
            self.cycle().await;
            sleep(CYCLE_INTERVAL).await;
        }
    }

    /// Run one acquisition cycle
    ///
    /// A fix is published and clears a displayed error. No fix raises the
    /// error once and keeps the previous position. Either way a track sample
    /// with the current position is recorded.
    pub async fn cycle(&mut self) -> CycleOutcome {
        let outcome = self.read_fix().await;

        match outcome {
            CycleOutcome::Fix(fix) => {
                debug!("Fix {:.6}, {:.6}", fix.latitude, fix.longitude);
                if self.handle.publish_fix(fix) {
                    self.observer.clear_errors();
                }
            }
            CycleOutcome::NoFix { recognized } => {
                debug!(
                    "No fix from {} this cycle ({} sentences without a valid fix)",
                    self.port_name, recognized
                );
                if self.handle.raise_error() {
                    self.observer.show_read_error(READ_ERROR_MESSAGE);
                }
            }
        }

        record_track(self.handle.clone()).await;
        outcome
    }

    /// Read lines until the first valid fix or the end of the window
    async fn read_fix(&mut self) -> CycleOutcome {
        let deadline = Instant::now() + READ_WINDOW;
        let mut recognized = 0;

        if self.port.is_none() {
            match self.opener.open(&self.port_name, self.baud_rate) {
                Ok(port) => {
                    debug!("Reopened {}", self.port_name);
                    self.port = Some(port);
                }
                Err(e) => {
                    warn!("Failed to reopen {}: {}", self.port_name, e);
                    return CycleOutcome::NoFix { recognized };
                }
            }
        }
        let Some(port) = self.port.as_mut() else {
            return CycleOutcome::NoFix { recognized };
        };

        loop {
            match timeout_at(deadline, port.read_line()).await {
                Ok(Ok(Some(line))) => {
                    let text = String::from_utf8_lossy(&line);
                    match decode_sentence(&text, &self.sentence_types) {
                        Some(decoded) => match decoded.fix {
                            Some(fix) => return CycleOutcome::Fix(fix),
                            None => recognized += 1,
                        },
                        None => continue,
                    }
                }
                Ok(Ok(None)) => {
                    warn!("{} closed, reopening next cycle", self.port_name);
                    self.port = None;
                    break;
                }
                Ok(Err(e)) => {
                    warn!("Read from {} failed: {}", self.port_name, e);
                    self.port = None;
                    break;
                }
                Err(_) => break,
            }
        }

        CycleOutcome::NoFix { recognized }
    }
}

/// Append a track sample with the current position
///
/// Every write rewrites the whole track file, so the write runs on the
/// blocking pool and its cost grows with the length of the walk.
async fn record_track(handle: GpsHandle) {
    let sample = TrackSample::now(handle.position());

    match spawn_blocking(move || handle.record_track(sample)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!("Failed to write GPS track: {}", e),
        Err(e) => warn!("GPS track writer task failed: {}", e),
    }
}
