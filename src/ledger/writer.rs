//! # Ledger Writer
//!
//! Persists a [`Ledger`] as CSV after every mutation.
//!
//! The output path is assigned lazily on the first write as
//! `<output_dir>/<DDMonYYYY>_<stem>.csv`. If that file already exists a
//! counter is appended (`_1`, `_2`, ...) so an earlier session is never
//! overwritten. Every write replaces the whole file through a temporary file
//! and a rename, so readers never observe a half-written sheet.

use chrono::{Local, NaiveDate};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::Ledger;
use crate::error::{InstalogError, Result};

/// Date component of sheet file names, e.g. `07Sep2024`
pub const SHEET_DATE_FORMAT: &str = "%d%b%Y";

/// Dated sheet name: `<date>_<stem>[_<counter>].csv`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetName {
    /// Date in [`SHEET_DATE_FORMAT`]
    pub date: String,
    /// Collision counter; 0 means no suffix
    pub counter: u32,
}

impl SheetName {
    /// Sheet name for `date` without a counter
    pub fn for_date(date: NaiveDate) -> Self {
        Self {
            date: date.format(SHEET_DATE_FORMAT).to_string(),
            counter: 0,
        }
    }

    /// Sheet name for the local current date
    pub fn today() -> Self {
        Self::for_date(Local::now().date_naive())
    }

    /// File name for this sheet with the given stem (e.g. `obs`, `track`)
    pub fn file_name(&self, stem: &str) -> String {
        if self.counter == 0 {
            format!("{}_{}.csv", self.date, stem)
        } else {
            format!("{}_{}_{}.csv", self.date, stem, self.counter)
        }
    }

    /// Parse the name of an existing sheet file
    ///
    /// # Arguments
    ///
    /// * `path` - Path whose file name should look like `07Sep2024_obs.csv`
    ///   or `07Sep2024_obs_3.csv`
    /// * `stem` - Expected stem (`obs`)
    ///
    /// # Errors
    ///
    /// Returns `InvalidSheet` if the file name does not follow the pattern
    pub fn parse(path: &Path, stem: &str) -> Result<Self> {
        let invalid = || InstalogError::InvalidSheet(format!("unexpected file name {}", path.display()));

        if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
            return Err(invalid());
        }
        let name = path.file_stem().and_then(|name| name.to_str()).ok_or_else(invalid)?;

        let parts: Vec<&str> = name.split('_').collect();
        let counter = match parts.as_slice() {
            [_, s] if *s == stem => 0,
            [_, s, n] if *s == stem && !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => {
                n.parse().map_err(|_| invalid())?
            }
            _ => return Err(invalid()),
        };

        let date = parts[0];
        if date.len() != 9 || NaiveDate::parse_from_str(date, SHEET_DATE_FORMAT).is_err() {
            return Err(invalid());
        }

        Ok(Self {
            date: date.to_string(),
            counter,
        })
    }
}

/// Writes one ledger to a lazily assigned, dated CSV file
#[derive(Debug, Clone)]
pub struct LedgerWriter {
    output_dir: PathBuf,
    stem: String,
    path: Option<PathBuf>,
}

impl LedgerWriter {
    /// Creates a writer for `<output_dir>/<date>_<stem>.csv`
    pub fn new(output_dir: impl Into<PathBuf>, stem: &str) -> Self {
        Self {
            output_dir: output_dir.into(),
            stem: stem.to_string(),
            path: None,
        }
    }

    /// The assigned output path, if the ledger has been written or resumed
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Continue writing to an existing file
    pub fn resume(&mut self, path: PathBuf) {
        info!("Continuing {} sheet at {}", self.stem, path.display());
        self.path = Some(path);
    }

    /// Forget the assigned path; the next write picks a fresh one
    pub fn reset(&mut self) {
        self.path = None;
    }

    /// Write the full ledger, replacing the previous file contents
    ///
    /// # Errors
    ///
    /// Returns an I/O or CSV error if the file cannot be written. The ledger
    /// itself is untouched, so the caller may retry.
    pub fn persist(&mut self, ledger: &Ledger) -> Result<()> {
        let path = match &self.path {
            Some(path) => path.clone(),
            None => self.assign_path(),
        };

        write_csv_atomic(&path, ledger)?;
        debug!("Wrote {} rows to {}", ledger.len(), path.display());

        if self.path.is_none() {
            info!("Created {} sheet at {}", self.stem, path.display());
            self.path = Some(path);
        }
        Ok(())
    }

    /// First free dated path in the output directory
    fn assign_path(&self) -> PathBuf {
        let mut name = SheetName::today();
        loop {
            let candidate = self.output_dir.join(name.file_name(&self.stem));
            if !candidate.exists() {
                return candidate;
            }
            name.counter += 1;
        }
    }
}

/// Write `ledger` to `path` via a temporary sibling file and a rename
pub fn write_csv_atomic(path: &Path, ledger: &Ledger) -> Result<()> {
    let temp_path = path.with_extension("csv.tmp");

    if let Err(e) = write_records(&temp_path, ledger) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}

fn write_records(path: &Path, ledger: &Ledger) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(ledger.columns())?;
    for row in ledger.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Read a ledger back from a CSV file written by [`LedgerWriter`]
///
/// # Errors
///
/// Returns a CSV error if the file is unreadable or a record's width differs
/// from the header's
pub fn load_ledger(path: &Path) -> Result<Ledger> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;

    let mut ledger = Ledger::new(reader.headers()?.iter());
    for record in reader.records() {
        let record = record?;
        ledger.push_row(record.iter().map(String::from).collect())?;
    }
    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Row;
    use tempfile::TempDir;

    fn row(values: &[&str]) -> Row {
        values.iter().map(|v| v.to_string()).collect()
    }

    fn sample_ledger() -> Ledger {
        let mut ledger = Ledger::observations();
        ledger
            .push_row(row(&["American Robin", "3", "09:15:02", "1", "", "35.320573", "-120.999368"]))
            .unwrap();
        ledger
            .push_row(row(&["Steller's Jay", "1", "09:16:40", "2", "near creek", "35.32058", "-120.99937"]))
            .unwrap();
        ledger
    }

    #[test]
    fn test_sheet_file_names() {
        let date = NaiveDate::from_ymd_opt(2024, 9, 7).unwrap();
        let mut name = SheetName::for_date(date);
        assert_eq!(name.file_name("obs"), "07Sep2024_obs.csv");
        name.counter = 2;
        assert_eq!(name.file_name("track"), "07Sep2024_track_2.csv");
    }

    #[test]
    fn test_parse_sheet_names() {
        let plain = SheetName::parse(Path::new("/data/07Sep2024_obs.csv"), "obs").unwrap();
        assert_eq!(plain, SheetName { date: "07Sep2024".to_string(), counter: 0 });

        let numbered = SheetName::parse(Path::new("07Sep2024_obs_12.csv"), "obs").unwrap();
        assert_eq!(numbered.counter, 12);
        assert_eq!(numbered.file_name("track"), "07Sep2024_track_12.csv");
    }

    #[test]
    fn test_parse_rejects_foreign_names() {
        for name in [
            "07Sep2024_obs.txt",
            "07Sep2024_track.csv",
            "7Sep2024_obs.csv",
            "99Xyz2024_obs.csv",
            "07Sep2024_obs_x.csv",
            "07Sep2024_obs_.csv",
            "07Sep2024_obs_1_2.csv",
            "observations.csv",
        ] {
            assert!(SheetName::parse(Path::new(name), "obs").is_err(), "{} should be rejected", name);
        }
    }

    #[test]
    fn test_persist_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut writer = LedgerWriter::new(dir.path(), "obs");
        let ledger = sample_ledger();

        writer.persist(&ledger).unwrap();
        let loaded = load_ledger(writer.path().unwrap()).unwrap();
        assert_eq!(loaded, ledger);
    }

    #[test]
    fn test_round_trip_with_delimiters_and_empty_ledger() {
        let dir = TempDir::new().unwrap();
        let mut writer = LedgerWriter::new(dir.path(), "obs");

        let empty = Ledger::observations();
        writer.persist(&empty).unwrap();
        assert_eq!(load_ledger(writer.path().unwrap()).unwrap(), empty);

        let mut quoted = Ledger::observations();
        quoted
            .push_row(row(&["Jay, Steller's", "1", "09:16:40", "1", "said \"hi\"", "0", "0"]))
            .unwrap();
        writer.persist(&quoted).unwrap();
        assert_eq!(load_ledger(writer.path().unwrap()).unwrap(), quoted);
    }

    #[test]
    fn test_path_assigned_once_and_overwritten() {
        let dir = TempDir::new().unwrap();
        let mut writer = LedgerWriter::new(dir.path(), "obs");
        assert!(writer.path().is_none());

        let mut ledger = sample_ledger();
        writer.persist(&ledger).unwrap();
        let first = writer.path().unwrap().to_path_buf();
        assert_eq!(
            first.file_name().unwrap().to_str().unwrap(),
            SheetName::today().file_name("obs")
        );

        ledger.pop_row();
        writer.persist(&ledger).unwrap();
        assert_eq!(writer.path().unwrap(), first);
        assert_eq!(load_ledger(&first).unwrap().len(), 1);
        assert!(!first.with_extension("csv.tmp").exists());
    }

    #[test]
    fn test_existing_file_gets_counter_suffix() {
        let dir = TempDir::new().unwrap();
        let today = SheetName::today();
        fs::write(dir.path().join(today.file_name("obs")), "from another session\n").unwrap();

        let mut writer = LedgerWriter::new(dir.path(), "obs");
        writer.persist(&sample_ledger()).unwrap();

        let expected = SheetName { counter: 1, ..today.clone() }.file_name("obs");
        assert_eq!(writer.path().unwrap(), dir.path().join(expected));
        assert_eq!(
            fs::read_to_string(dir.path().join(today.file_name("obs"))).unwrap(),
            "from another session\n"
        );

        // A fresh sheet after reset skips both taken names
        let mut second = LedgerWriter::new(dir.path(), "obs");
        second.persist(&Ledger::observations()).unwrap();
        let expected = SheetName { counter: 2, ..today }.file_name("obs");
        assert_eq!(second.path().unwrap(), dir.path().join(expected));
    }

    #[test]
    fn test_persist_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let mut writer = LedgerWriter::new(dir.path().join("missing-dir"), "obs");
        assert!(writer.persist(&sample_ledger()).is_err());
        assert!(writer.path().is_none());
    }

    #[test]
    fn test_resume_and_reset() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("07Sep2024_obs.csv");
        let mut writer = LedgerWriter::new(dir.path(), "obs");
        writer.resume(target.clone());
        writer.persist(&sample_ledger()).unwrap();
        assert!(target.exists());

        writer.reset();
        assert!(writer.path().is_none());
    }

    #[test]
    fn test_load_rejects_ragged_rows() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ragged.csv");
        fs::write(&path, "Time,Latitude,Longitude\n10:00:00,1.0\n").unwrap();
        assert!(load_ledger(&path).is_err());
    }
}
