//! # NMEA Checksum
//!
//! XOR checksum over the bytes between `$` and `*`, transmitted as two
//! uppercase hex digits after the `*`.

/// Calculate the NMEA checksum of a sentence body
///
/// # Arguments
///
/// * `body` - Sentence text between `$` and `*` (exclusive)
///
/// # Returns
///
/// * `u8` - XOR of all bytes
///
/// # Examples
///
/// ```
/// use instalog::nmea::checksum::nmea_checksum;
///
/// assert_eq!(nmea_checksum("GPGLL,4916.45,N,12311.12,W,225444,A"), 0x31);
/// ```
pub fn nmea_checksum(body: &str) -> u8 {
    body.bytes().fold(0u8, |acc, byte| acc ^ byte)
}

/// Verify the optional `*HH` suffix of a sentence
///
/// Sentences without a `*` are accepted as-is; serial receivers configured
/// without checksums still produce usable lines.
///
/// # Returns
///
/// * `bool` - `false` only when a checksum is present and wrong or unreadable
pub fn verify_checksum(sentence: &str) -> bool {
    let Some(body) = sentence.strip_prefix('$') else {
        return true;
    };
    let Some((payload, suffix)) = body.split_once('*') else {
        return true;
    };

    let hex = suffix.trim_end();
    if hex.len() != 2 {
        return false;
    }

    match u8::from_str_radix(hex, 16) {
        Ok(expected) => nmea_checksum(payload) == expected,
        Err(_) => false,
    }
}

/// Append a valid `*HH` checksum to a `$`-prefixed sentence body
#[cfg(test)]
pub(crate) fn with_checksum(sentence: &str) -> String {
    let body = sentence.strip_prefix('$').unwrap_or(sentence);
    format!("${}*{:02X}", body, nmea_checksum(body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_checksum() {
        // Textbook GGA example
        assert!(verify_checksum(
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47"
        ));
    }

    #[test]
    fn test_checksum_mismatch() {
        assert!(!verify_checksum(
            "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*48"
        ));
    }

    #[test]
    fn test_missing_checksum_accepted() {
        assert!(verify_checksum("$GPRMC,123519,A,4807.038,N,01131.000,E"));
    }

    #[test]
    fn test_truncated_checksum_rejected() {
        assert!(!verify_checksum("$GPGLL,4916.45,N,12311.12,W,225444,A*3"));
        assert!(!verify_checksum("$GPGLL,4916.45,N,12311.12,W,225444,A*ZZ"));
    }

    #[test]
    fn test_trailing_line_ending_ignored() {
        let line = format!("{}\r\n", with_checksum("$GPGLL,4916.45,N,12311.12,W,225444,A"));
        assert!(verify_checksum(&line));
    }

    #[test]
    fn test_with_checksum_round_trip() {
        let sentence = with_checksum("$GPRMC,081836,A,3751.65,S,14507.36,E,000.0,360.0,130998,011.3,E");
        assert!(sentence.starts_with("$GPRMC,"));
        assert!(verify_checksum(&sentence));
    }
}
