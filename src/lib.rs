//! # InstaLog Library
//!
//! Log field species observations tagged with live GPS position.
//!
//! This library finds a GPS receiver among the serial ports, keeps a current
//! position fix up to date on a background task, and maintains an undoable
//! observation sheet that is written to CSV after every change.

pub mod config;
pub mod error;
pub mod gps;
pub mod ledger;
pub mod nmea;
pub mod serial;
pub mod survey;

pub use error::{InstalogError, Result};
