//! Quick-entry parsing: `"amro 3"` becomes `("American Robin", "3")`.

use std::collections::HashMap;

/// Count used when an entry carries no number
pub const DEFAULT_COUNT: &str = "0";

/// Split quick-entry text into species and count
///
/// The text is split at its first digit. Everything before it, trimmed, is
/// the species; the count keeps only the digits that follow. Text with no
/// digit, or that starts with one, is taken whole as the species with a count
/// of [`DEFAULT_COUNT`]. A species whose upper-cased form is a shortcut key is
/// replaced by the shortcut's expansion.
///
/// # Arguments
///
/// * `text` - Raw entry text
/// * `shortcuts` - Upper-case abbreviations mapped to full species names
///
/// # Returns
///
/// * `(String, String)` - Species and count
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use instalog::survey::entry::parse_entry;
///
/// let shortcuts = HashMap::from([("AMRO".to_string(), "American Robin".to_string())]);
/// assert_eq!(
///     parse_entry("amro 3", &shortcuts),
///     ("American Robin".to_string(), "3".to_string())
/// );
/// ```
pub fn parse_entry(text: &str, shortcuts: &HashMap<String, String>) -> (String, String) {
    let (species, count) = match text.find(|c: char| c.is_ascii_digit()) {
        Some(at) if !text[..at].trim().is_empty() => {
            let count: String = text[at..].chars().filter(char::is_ascii_digit).collect();
            (text[..at].trim().to_string(), count)
        }
        _ => (text.trim().to_string(), DEFAULT_COUNT.to_string()),
    };

    match shortcuts.get(&species.to_uppercase()) {
        Some(expanded) => (expanded.clone(), count),
        None => (species, count),
    }
}
