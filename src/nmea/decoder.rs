//! # NMEA Sentence Decoder
//!
//! Decodes GGA, RMC and GLL sentences into position fixes.
//!
//! The decoder never fails: a line that is garbled, truncated, or not one of
//! the currently trusted sentence kinds simply produces no fix. Serial reads
//! regularly return partial lines, so this is the normal case rather than an
//! error.

use super::checksum::verify_checksum;
use super::protocol::*;

/// Field index of the GGA fix-quality indicator
const GGA_QUALITY_FIELD: usize = 6;

/// Field index of the RMC status flag
const RMC_STATUS_FIELD: usize = 2;

/// Field index of the GLL status flag
const GLL_STATUS_FIELD: usize = 6;

/// Minimum number of comma-separated fields for any supported sentence
const MIN_FIELDS: usize = 7;

/// Decode one raw line against the sentence-type table
///
/// Only the kinds returned by [`SentenceTypeTable::trusted_kinds`] are
/// inspected; any other line is ignored.
///
/// # Arguments
///
/// * `line` - Raw line as read from the port (line endings allowed)
/// * `table` - Sentence kinds discovered for the connected receiver
///
/// # Returns
///
/// * `Option<Decoded>` - `None` if the line is not a trusted, well-formed
///   sentence; otherwise the matched kind and, if the sentence reports a valid
///   fix, its position
///
/// # Examples
///
/// ```
/// use instalog::nmea::decoder::decode_sentence;
/// use instalog::nmea::protocol::{SentenceKind, SentenceTypeTable};
///
/// let table = SentenceTypeTable::with_kinds(&[SentenceKind::Gga]);
/// let decoded = decode_sentence(
///     "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47",
///     &table,
/// ).unwrap();
///
/// let fix = decoded.fix.unwrap();
/// assert_eq!(fix.latitude, 48.1173);
/// assert_eq!(fix.longitude, 11.516667);
/// ```
pub fn decode_sentence(line: &str, table: &SentenceTypeTable) -> Option<Decoded> {
    let line = line.trim_matches(|c: char| c.is_whitespace() || c == '\0');

    let kind = table
        .trusted_kinds()
        .into_iter()
        .find(|kind| line.starts_with(kind.marker()))?;

    if !verify_checksum(line) {
        return None;
    }

    let body = line.split('*').next().unwrap_or(line);
    let fields: Vec<&str> = body.split(',').collect();
    if fields.len() < MIN_FIELDS {
        return None;
    }

    let fix = match kind {
        SentenceKind::Gga => {
            if !matches!(fields[GGA_QUALITY_FIELD], "1" | "2") {
                return Some(Decoded { kind, fix: None });
            }
            ddm_to_dd((fields[2], fields[3]), (fields[4], fields[5]))?
        }
        SentenceKind::Rmc => {
            if fields[RMC_STATUS_FIELD] != "A" {
                return Some(Decoded { kind, fix: None });
            }
            ddm_to_dd((fields[3], fields[4]), (fields[5], fields[6]))?
        }
        SentenceKind::Gll => {
            if fields[GLL_STATUS_FIELD] != "A" {
                return Some(Decoded { kind, fix: None });
            }
            ddm_to_dd((fields[1], fields[2]), (fields[3], fields[4]))?
        }
    };

    Some(Decoded { kind, fix: Some(fix) })
}

/// Convert a DDM latitude/longitude pair to decimal degrees
///
/// # Arguments
///
/// * `latitude` - `(ddmm.mmmm, N|S)`
/// * `longitude` - `(dddmm.mmmm, E|W)`
///
/// # Returns
///
/// * `Option<Fix>` - Position rounded to 6 decimals, or `None` if any field is
///   malformed
///
/// # Examples
///
/// ```
/// use instalog::nmea::decoder::ddm_to_dd;
///
/// let fix = ddm_to_dd(("3519.2344", "N"), ("12059.9621", "W")).unwrap();
/// assert_eq!(fix.as_pair(), (35.320573, -120.999368));
/// ```
pub fn ddm_to_dd(latitude: (&str, &str), longitude: (&str, &str)) -> Option<Fix> {
    let lat = ddm_to_decimal(latitude.0, 2)?;
    let lon = ddm_to_decimal(longitude.0, 3)?;

    let lat = match latitude.1 {
        "N" => lat,
        "S" => -lat,
        _ => return None,
    };
    let lon = match longitude.1 {
        "E" => lon,
        "W" => -lon,
        _ => return None,
    };

    Some(Fix::new(round_coordinate(lat), round_coordinate(lon)))
}

/// Convert an unsigned DDM value with `degree_digits` leading degree digits
fn ddm_to_decimal(value: &str, degree_digits: usize) -> Option<f64> {
    let degrees = value.get(..degree_digits)?;
    let minutes = value.get(degree_digits..)?;

    if !degrees.bytes().all(|b| b.is_ascii_digit()) || minutes.is_empty() {
        return None;
    }

    let degrees: f64 = degrees.parse().ok()?;
    let minutes: f64 = minutes.parse().ok()?;
    if !minutes.is_finite() || !(0.0..60.0).contains(&minutes) {
        return None;
    }

    Some(degrees + minutes / 60.0)
}

/// Round to [`COORDINATE_DECIMALS`] decimal places
fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_DECIMALS);
    (value * scale).round() / scale
}
