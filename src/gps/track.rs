//! # Track Recorder
//!
//! Append-only log of `{time, latitude, longitude}` samples, one per
//! acquisition cycle, persisted as a `<date>_track.csv` sheet once output is
//! enabled.

use chrono::{Local, NaiveTime};
use std::path::PathBuf;
use tracing::info;

use crate::error::{InstalogError, Result};
use crate::ledger::{load_ledger, Ledger, LedgerWriter, Row, TRACK_COLUMNS};
use crate::nmea::Fix;

/// File stem of track sheets
pub const TRACK_STEM: &str = "track";

/// Time-of-day format used in track and observation rows
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// One track sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackSample {
    pub time: NaiveTime,
    pub fix: Fix,
}

impl TrackSample {
    /// Sample at the current local wall-clock time
    pub fn now(fix: Fix) -> Self {
        Self {
            time: Local::now().time(),
            fix,
        }
    }

    pub fn to_row(&self) -> Row {
        vec![
            self.time.format(TIME_FORMAT).to_string(),
            self.fix.latitude.to_string(),
            self.fix.longitude.to_string(),
        ]
    }
}

/// Track log plus its writer
#[derive(Debug)]
pub struct TrackRecorder {
    log: Ledger,
    writer: LedgerWriter,
    output_enabled: bool,
}

impl TrackRecorder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            log: Ledger::track(),
            writer: LedgerWriter::new(output_dir, TRACK_STEM),
            output_enabled: false,
        }
    }

    pub fn log(&self) -> &Ledger {
        &self.log
    }

    pub fn path(&self) -> Option<&std::path::Path> {
        self.writer.path()
    }

    pub fn output_enabled(&self) -> bool {
        self.output_enabled
    }

    pub fn set_output_enabled(&mut self, enabled: bool) {
        self.output_enabled = enabled;
    }

    /// Append a sample and persist the track if output is enabled
    ///
    /// The sample is kept in memory even when the write fails.
    pub fn record(&mut self, sample: TrackSample) -> Result<()> {
        self.log.push_row(sample.to_row())?;
        self.flush()
    }

    /// Persist the whole track if output is enabled
    pub fn flush(&mut self) -> Result<()> {
        if !self.output_enabled {
            return Ok(());
        }
        self.writer.persist(&self.log)
    }

    /// Point the recorder at a new target.
    ///
    /// `None` starts a fresh, unsaved track with output disabled. `Some(path)`
    /// continues an existing track file, loading its samples if it exists,
    /// and enables output.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSheet` if an existing file has different columns; the
    /// recorder is left unchanged in that case
    pub fn resume(&mut self, path: Option<PathBuf>) -> Result<()> {
        match path {
            None => {
                self.log.clear();
                self.writer.reset();
                self.output_enabled = false;
            }
            Some(path) => {
                let log = if path.exists() {
                    let loaded = load_ledger(&path)?;
                    if loaded.columns() != TRACK_COLUMNS {
                        return Err(InstalogError::InvalidSheet(format!(
                            "{} does not have track columns",
                            path.display()
                        )));
                    }
                    info!("Loaded {} track samples from {}", loaded.len(), path.display());
                    loaded
                } else {
                    Ledger::track()
                };
                self.log = log;
                self.writer.resume(path);
                self.output_enabled = true;
            }
        }
        Ok(())
    }
}
