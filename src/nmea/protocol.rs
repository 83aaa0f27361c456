//! # NMEA Protocol Constants and Types
//!
//! Sentence identifiers, the sentence-type table negotiated during discovery,
//! and the position fix produced by the decoder.

/// GGA sentence marker (Global Positioning System Fix Data)
pub const NMEA_MARKER_GGA: &str = "$GPGGA";

/// RMC sentence marker (Recommended Minimum Specific GNSS Data)
pub const NMEA_MARKER_RMC: &str = "$GPRMC";

/// GLL sentence marker (Geographic Position, Latitude/Longitude)
pub const NMEA_MARKER_GLL: &str = "$GPGLL";

/// Number of sentence kinds tracked by the sentence-type table
pub const NMEA_SENTENCE_KINDS: usize = 3;

/// Decimal places kept on converted coordinates
pub const COORDINATE_DECIMALS: i32 = 6;

/// Sentence kinds recognized by the decoder, in priority order.
///
/// GGA carries a fix-quality indicator and is always preferred; RMC and GLL
/// only carry an active/void flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SentenceKind {
    Gga,
    Rmc,
    Gll,
}

impl SentenceKind {
    /// All kinds, indexed by their slot in the sentence-type table
    pub const ALL: [SentenceKind; NMEA_SENTENCE_KINDS] =
        [SentenceKind::Gga, SentenceKind::Rmc, SentenceKind::Gll];

    /// Line prefix identifying this sentence kind
    pub fn marker(self) -> &'static str {
        match self {
            SentenceKind::Gga => NMEA_MARKER_GGA,
            SentenceKind::Rmc => NMEA_MARKER_RMC,
            SentenceKind::Gll => NMEA_MARKER_GLL,
        }
    }

    /// Slot index of this kind in the sentence-type table
    pub fn slot(self) -> usize {
        match self {
            SentenceKind::Gga => 0,
            SentenceKind::Rmc => 1,
            SentenceKind::Gll => 2,
        }
    }
}

impl std::fmt::Display for SentenceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.marker())
    }
}

/// Which sentence kinds the connected receiver has been seen to emit.
///
/// Populated once during discovery and read-only afterwards. Each slot is
/// bound at most once and never cleared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentenceTypeTable {
    slots: [Option<SentenceKind>; NMEA_SENTENCE_KINDS],
}

impl SentenceTypeTable {
    /// Creates an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table with the given kinds already bound
    pub fn with_kinds(kinds: &[SentenceKind]) -> Self {
        let mut table = Self::new();
        for &kind in kinds {
            table.bind(kind);
        }
        table
    }

    /// Binds `kind` into its slot.
    ///
    /// # Returns
    ///
    /// * `bool` - `true` if the slot was empty and is now bound, `false` if it
    ///   was already bound
    pub fn bind(&mut self, kind: SentenceKind) -> bool {
        let slot = &mut self.slots[kind.slot()];
        if slot.is_some() {
            return false;
        }
        *slot = Some(kind);
        true
    }

    /// Returns the kind bound to `slot`, if any
    pub fn get(&self, slot: usize) -> Option<SentenceKind> {
        self.slots.get(slot).copied().flatten()
    }

    /// Number of bound slots
    pub fn bound_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// Whether every slot is bound
    pub fn is_complete(&self) -> bool {
        self.bound_count() == NMEA_SENTENCE_KINDS
    }

    /// Whether no slot is bound
    pub fn is_empty(&self) -> bool {
        self.bound_count() == 0
    }

    /// Kinds the decoder will currently inspect, in priority order.
    ///
    /// Slot `i` is trusted only once at least `i + 1` slots are bound, so a
    /// lower-priority sentence is ignored until the receiver's repertoire is
    /// known well enough.
    pub fn trusted_kinds(&self) -> Vec<SentenceKind> {
        let bound = self.bound_count();
        self.slots
            .iter()
            .enumerate()
            .filter(|(slot, _)| bound > *slot)
            .filter_map(|(_, kind)| *kind)
            .collect()
    }
}

impl std::fmt::Display for SentenceTypeTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self
            .slots
            .iter()
            .map(|slot| slot.map_or("-", SentenceKind::marker))
            .collect();
        write!(f, "[{}]", names.join(", "))
    }
}

/// A resolved latitude/longitude reading in decimal degrees
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Fix {
    /// Latitude, positive north
    pub latitude: f64,

    /// Longitude, positive east
    pub longitude: f64,
}

impl Fix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Returns the fix as a `(latitude, longitude)` pair
    pub fn as_pair(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// Result of decoding one line that matched a trusted sentence kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decoded {
    /// The sentence kind that matched
    pub kind: SentenceKind,

    /// The position, or `None` when the sentence reports no valid fix
    pub fix: Option<Fix>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_follow_marker_order() {
        for (i, kind) in SentenceKind::ALL.iter().enumerate() {
            assert_eq!(kind.slot(), i);
        }
        assert_eq!(SentenceKind::Gga.marker(), "$GPGGA");
        assert_eq!(SentenceKind::Rmc.marker(), "$GPRMC");
        assert_eq!(SentenceKind::Gll.marker(), "$GPGLL");
    }

    #[test]
    fn test_bind_only_once() {
        let mut table = SentenceTypeTable::new();
        assert!(table.is_empty());
        assert!(table.bind(SentenceKind::Rmc));
        assert!(!table.bind(SentenceKind::Rmc));
        assert_eq!(table.bound_count(), 1);
        assert_eq!(table.get(1), Some(SentenceKind::Rmc));
        assert_eq!(table.get(0), None);
        assert_eq!(table.get(7), None);
    }

    #[test]
    fn test_trusted_kinds_gated_by_bound_count() {
        let gga_only = SentenceTypeTable::with_kinds(&[SentenceKind::Gga]);
        assert_eq!(gga_only.trusted_kinds(), vec![SentenceKind::Gga]);

        let gga_rmc = SentenceTypeTable::with_kinds(&[SentenceKind::Gga, SentenceKind::Rmc]);
        assert_eq!(gga_rmc.trusted_kinds(), vec![SentenceKind::Gga, SentenceKind::Rmc]);

        // GLL sits in slot 2 and needs all three bound
        let gga_gll = SentenceTypeTable::with_kinds(&[SentenceKind::Gga, SentenceKind::Gll]);
        assert_eq!(gga_gll.trusted_kinds(), vec![SentenceKind::Gga]);

        let all = SentenceTypeTable::with_kinds(&SentenceKind::ALL);
        assert!(all.is_complete());
        assert_eq!(all.trusted_kinds(), SentenceKind::ALL.to_vec());
    }

    #[test]
    fn test_rmc_only_table_trusts_nothing() {
        let rmc_only = SentenceTypeTable::with_kinds(&[SentenceKind::Rmc]);
        assert!(rmc_only.trusted_kinds().is_empty());
    }

    #[test]
    fn test_table_display() {
        let table = SentenceTypeTable::with_kinds(&[SentenceKind::Gga, SentenceKind::Gll]);
        assert_eq!(table.to_string(), "[$GPGGA, -, $GPGLL]");
    }
}
