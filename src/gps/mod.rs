//! # GPS Module
//!
//! Receiver discovery, the background acquisition loop, and the shared state
//! the foreground reads positions from.
//!
//! This module handles:
//! - Probing candidate serial ports and negotiating sentence kinds
//! - Polling the selected port once per cycle on a background task
//! - Edge-triggered read-error signalling
//! - Recording and persisting the GPS track

pub mod acquisition;
pub mod discovery;
pub mod session;
pub mod track;

pub use acquisition::{AcquisitionLoop, CycleOutcome, CYCLE_INTERVAL, READ_WINDOW};
pub use discovery::{discover, DiscoveredPort, DISCOVERY_WINDOW};
pub use session::{
    GpsHandle, GpsObserver, GpsSession, LoggingObserver, PositionSource, READ_ERROR_MESSAGE,
};
pub use track::{TrackRecorder, TrackSample, TIME_FORMAT, TRACK_STEM};

#[cfg(test)]
pub use session::MockPositionSource;
