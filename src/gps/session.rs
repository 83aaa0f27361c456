//! # GPS Session
//!
//! Shared GPS state and the capability interfaces around it.
//!
//! The acquisition loop is the only writer of the position fix. Everything
//! else reads through [`PositionSource`], implemented by [`GpsHandle`], which
//! hands out whole snapshots taken under a lock. Display-side reactions to
//! read errors go the other way through [`GpsObserver`].

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::acquisition::AcquisitionLoop;
use super::discovery::DiscoveredPort;
use super::track::{TrackRecorder, TrackSample};
use crate::error::Result;
use crate::nmea::Fix;
use crate::serial::PortOpener;

/// Message shown while the receiver yields no fix
pub const READ_ERROR_MESSAGE: &str = "Can't read from GPS";

/// Foreground view of the GPS session
#[cfg_attr(test, mockall::automock)]
pub trait PositionSource: Send + Sync {
    /// Last known position as `(latitude, longitude)`
    fn get_current_position(&self) -> (f64, f64);

    /// Whether a read error is currently displayed
    fn get_error_state(&self) -> bool;

    /// Dismiss the displayed read error
    fn clear_error(&self);

    /// Gate whether track samples are written to disk
    fn set_output_enabled(&self, enabled: bool);

    /// Start a fresh track (`None`) or continue the track file at `path`
    fn resume_track(&self, path: Option<PathBuf>) -> Result<()>;

    /// Write the current track to disk if output is enabled
    fn flush_track(&self) -> Result<()>;
}

/// Receives read-error transitions from the acquisition loop
pub trait GpsObserver: Send + Sync {
    /// The receiver stopped producing fixes
    fn show_read_error(&self, message: &str);

    /// A fix arrived after a read error
    fn clear_errors(&self);
}

/// Observer that reports transitions through `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingObserver;

impl GpsObserver for LoggingObserver {
    fn show_read_error(&self, message: &str) {
        warn!("{}", message);
    }

    fn clear_errors(&self) {
        info!("GPS fix reacquired");
    }
}

#[derive(Debug, Default)]
struct GpsStatus {
    fix: Fix,
    error_displayed: bool,
}

#[derive(Debug)]
struct GpsShared {
    status: Mutex<GpsStatus>,
    track: Mutex<TrackRecorder>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cloneable accessor to the session's shared state
#[derive(Debug, Clone)]
pub struct GpsHandle {
    shared: Arc<GpsShared>,
}

impl GpsHandle {
    /// Creates fresh state; track sheets go to `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            shared: Arc::new(GpsShared {
                status: Mutex::new(GpsStatus::default()),
                track: Mutex::new(TrackRecorder::new(output_dir)),
            }),
        }
    }

    /// Snapshot of the current fix
    pub fn position(&self) -> Fix {
        lock(&self.shared.status).fix
    }

    /// Number of track samples recorded so far
    pub fn track_len(&self) -> usize {
        lock(&self.shared.track).log().len()
    }

    /// Current track file, once assigned
    pub fn track_path(&self) -> Option<PathBuf> {
        lock(&self.shared.track).path().map(Path::to_path_buf)
    }

    pub fn output_enabled(&self) -> bool {
        lock(&self.shared.track).output_enabled()
    }

    /// Store a new fix and clear the error flag.
    ///
    /// Returns `true` if an error was displayed and has now been cleared.
    pub(crate) fn publish_fix(&self, fix: Fix) -> bool {
        let mut status = lock(&self.shared.status);
        status.fix = fix;
        std::mem::replace(&mut status.error_displayed, false)
    }

    /// Raise the error flag.
    ///
    /// Returns `true` only on the transition from clear to raised.
    pub(crate) fn raise_error(&self) -> bool {
        let mut status = lock(&self.shared.status);
        !std::mem::replace(&mut status.error_displayed, true)
    }

    pub(crate) fn record_track(&self, sample: TrackSample) -> Result<()> {
        lock(&self.shared.track).record(sample)
    }
}

impl PositionSource for GpsHandle {
    fn get_current_position(&self) -> (f64, f64) {
        self.position().as_pair()
    }

    fn get_error_state(&self) -> bool {
        lock(&self.shared.status).error_displayed
    }

    fn clear_error(&self) {
        lock(&self.shared.status).error_displayed = false;
    }

    fn set_output_enabled(&self, enabled: bool) {
        lock(&self.shared.track).set_output_enabled(enabled);
    }

    fn resume_track(&self, path: Option<PathBuf>) -> Result<()> {
        lock(&self.shared.track).resume(path)
    }

    fn flush_track(&self) -> Result<()> {
        lock(&self.shared.track).flush()
    }
}

/// A discovered receiver and the state its acquisition loop will publish
pub struct GpsSession {
    discovered: DiscoveredPort,
    baud_rate: u32,
    handle: GpsHandle,
}

impl std::fmt::Debug for GpsSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpsSession")
            .field("port_name", &self.discovered.port_name)
            .field("baud_rate", &self.baud_rate)
            .field("sentence_types", &self.discovered.sentence_types)
            .finish_non_exhaustive()
    }
}

impl GpsSession {
    pub fn new(discovered: DiscoveredPort, baud_rate: u32, handle: GpsHandle) -> Self {
        Self {
            discovered,
            baud_rate,
            handle,
        }
    }

    /// Accessor for the foreground
    pub fn handle(&self) -> GpsHandle {
        self.handle.clone()
    }

    /// Start the acquisition loop on a background task.
    ///
    /// The task runs until the runtime shuts down; it holds no resources that
    /// keep the process alive.
    pub fn spawn(self, opener: Arc<dyn PortOpener>, observer: Arc<dyn GpsObserver>) -> JoinHandle<()> {
        info!(
            "Starting GPS acquisition on {} at {} baud with sentences {}",
            self.discovered.port_name, self.baud_rate, self.discovered.sentence_types
        );
        let acquisition = AcquisitionLoop::new(
            self.discovered,
            self.baud_rate,
            opener,
            self.handle,
            observer,
        );
        tokio::spawn(acquisition.run())
    }
}
