//! # Survey Module
//!
//! The observation sheet a surveyor edits while walking a transect.
//!
//! Every mutation goes through [`Survey`], which keeps three things in step:
//! the in-memory [`Ledger`], the undo [`ActionLog`], and the CSV file written
//! by the [`LedgerWriter`]. Rows are stamped with the wall-clock time and the
//! position reported by the GPS session.

pub mod entry;

use chrono::Local;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::{InstalogError, Result};
use crate::gps::{PositionSource, TIME_FORMAT, TRACK_STEM};
use crate::ledger::{
    load_ledger, Action, ActionLog, Ledger, LedgerWriter, Row, SheetName, OBSERVATION_COLUMNS,
};

pub use entry::parse_entry;

/// File stem of observation sheets
pub const OBS_STEM: &str = "obs";

/// Column edited by [`Survey::edit_comment`]
pub const COMMENT_COLUMN: &str = "Comment";

/// Observation sheet with undo and write-through persistence
pub struct Survey {
    ledger: Ledger,
    actions: ActionLog,
    writer: LedgerWriter,
    gps: Arc<dyn PositionSource>,
    shortcuts: HashMap<String, String>,
    observers: u32,
    /// Whether the GPS track has been told to start writing
    output_announced: bool,
}

impl std::fmt::Debug for Survey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Survey")
            .field("rows", &self.ledger.len())
            .field("undo_depth", &self.actions.len())
            .field("path", &self.writer.path())
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

impl Survey {
    /// Creates an empty, unsaved sheet
    ///
    /// # Arguments
    ///
    /// * `output_dir` - Directory the dated sheet is created in
    /// * `observers` - Initial value of the `Obs` column
    /// * `shortcuts` - Upper-case abbreviations mapped to species names
    /// * `gps` - Position source for new rows and the track sheet
    pub fn new(
        output_dir: impl Into<PathBuf>,
        observers: u32,
        shortcuts: HashMap<String, String>,
        gps: Arc<dyn PositionSource>,
    ) -> Self {
        Self {
            ledger: Ledger::observations(),
            actions: ActionLog::new(),
            writer: LedgerWriter::new(output_dir, OBS_STEM),
            gps,
            shortcuts,
            observers,
            output_announced: false,
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Sheet file, once the sheet has been saved or loaded
    pub fn path(&self) -> Option<&Path> {
        self.writer.path()
    }

    pub fn observers(&self) -> u32 {
        self.observers
    }

    /// Number of actions that can currently be undone
    pub fn undo_depth(&self) -> usize {
        self.actions.len()
    }

    /// Observer count stamped on rows added from now on
    pub fn set_observers(&mut self, observers: u32) {
        self.observers = observers;
    }

    /// Parse quick-entry text and add it as an observation
    ///
    /// # Returns
    ///
    /// * `Result<Row>` - The row that was added
    ///
    /// # Errors
    ///
    /// Returns an I/O or CSV error if the sheet could not be written; the row
    /// stays in the sheet and can be undone
    pub fn record_entry(&mut self, text: &str) -> Result<Row> {
        let (species, count) = parse_entry(text, &self.shortcuts);
        self.add_observation(&species, &count)
    }

    /// Append an observation at the current time and position
    pub fn add_observation(&mut self, species: &str, count: &str) -> Result<Row> {
        let (latitude, longitude) = self.gps.get_current_position();
        let row = vec![
            species.to_string(),
            count.to_string(),
            Local::now().time().format(TIME_FORMAT).to_string(),
            self.observers.to_string(),
            String::new(),
            latitude.to_string(),
            longitude.to_string(),
        ];

        self.ledger.push_row(row.clone())?;
        self.actions.record(Action::AddRow);
        self.save()?;
        Ok(row)
    }

    /// Remove the most recent row
    ///
    /// # Returns
    ///
    /// * `Result<bool>` - `false` if the sheet was already empty
    pub fn delete_last_row(&mut self) -> Result<bool> {
        let Some(row) = self.ledger.pop_row() else {
            return Ok(false);
        };
        self.actions.record(Action::DeleteRow(row));
        self.save()?;
        Ok(true)
    }

    /// Revert the most recent add or delete
    ///
    /// # Returns
    ///
    /// * `Result<bool>` - `false` if there was nothing to undo
    pub fn undo(&mut self) -> Result<bool> {
        if !self.actions.undo(&mut self.ledger)? {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    /// Overwrite one cell. Edits are not recorded for undo.
    ///
    /// # Arguments
    ///
    /// * `row` - Zero-based row index
    /// * `column` - Column name, e.g. `Count`
    /// * `value` - New cell text
    ///
    /// # Errors
    ///
    /// Returns `InvalidEdit` for an unknown column or a row out of range
    pub fn edit_cell(&mut self, row: usize, column: &str, value: &str) -> Result<()> {
        let index = self
            .ledger
            .column_index(column)
            .ok_or_else(|| InstalogError::InvalidEdit(format!("no column named {}", column)))?;
        self.ledger.set_cell(row, index, value)?;
        self.save()
    }

    /// Set the comment of the most recent row
    pub fn edit_comment(&mut self, comment: &str) -> Result<()> {
        let last = self
            .ledger
            .len()
            .checked_sub(1)
            .ok_or_else(|| InstalogError::InvalidEdit("the sheet has no rows".to_string()))?;
        self.edit_cell(last, COMMENT_COLUMN, comment)
    }

    /// Write the sheet to disk
    ///
    /// The first successful write also enables the GPS track output, so a
    /// track sheet only appears next to a saved observation sheet.
    pub fn save(&mut self) -> Result<()> {
        self.writer.persist(&self.ledger)?;
        if !self.output_announced {
            self.gps.set_output_enabled(true);
            self.output_announced = true;
        }
        Ok(())
    }

    /// Close the current sheet and start an empty one
    ///
    /// A sheet that was already saved is written once more and the track is
    /// flushed. The undo history is discarded and the GPS track restarts.
    pub fn new_sheet(&mut self) -> Result<()> {
        if self.writer.path().is_some() {
            self.save()?;
            self.gps.flush_track()?;
        }

        self.ledger.clear();
        self.actions.clear();
        self.writer.reset();
        self.output_announced = false;
        self.gps.resume_track(None)?;
        info!("Started a new sheet");
        Ok(())
    }

    /// Continue an observation sheet saved earlier
    ///
    /// The file must be named like `07Sep2024_obs.csv` or
    /// `07Sep2024_obs_2.csv` and carry the observation columns. Later writes
    /// go back to the same file, and the GPS track continues the matching
    /// `07Sep2024_track[_2].csv` next to it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSheet` for a foreign file name or header; the current
    /// sheet is left untouched in that case
    pub fn load_sheet(&mut self, path: &Path) -> Result<()> {
        let name = SheetName::parse(path, OBS_STEM)?;
        let loaded = load_ledger(path)?;
        if loaded.columns() != OBSERVATION_COLUMNS {
            return Err(InstalogError::InvalidSheet(format!(
                "{} headers do not match the observation columns",
                path.display()
            )));
        }

        info!("Loaded {} observations from {}", loaded.len(), path.display());
        self.ledger = loaded;
        self.actions.clear();
        self.writer.resume(path.to_path_buf());
        // Track output is enabled by resume_track, after it points at the loaded track
        self.output_announced = true;
        self.save()?;

        let track_path = path.with_file_name(name.file_name(TRACK_STEM));
        if let Err(e) = self.gps.resume_track(Some(track_path.clone())) {
            warn!("Could not continue track {}: {}", track_path.display(), e);
            return Err(e);
        }
        Ok(())
    }
}
