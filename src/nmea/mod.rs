//! # NMEA-0183 Module
//!
//! Pure, synchronous decoding of NMEA sentences into position fixes.
//!
//! This module handles:
//! - Sentence markers and the sentence-type table negotiated at discovery
//! - Optional `*HH` checksum verification
//! - GGA / RMC / GLL decoding with validity flags
//! - Degrees-decimal-minutes to decimal-degrees conversion

pub mod protocol;
pub mod checksum;
pub mod decoder;

pub use decoder::{ddm_to_dd, decode_sentence};
pub use protocol::{Decoded, Fix, SentenceKind, SentenceTypeTable};
