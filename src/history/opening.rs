//! ECO code to opening family lookup.
//!
//! The table is a flat list of closed id ranges per volume. [`OpeningTable::validated`]
//! checks that each volume `A`-`E` covers ids 00-99 exactly once, so a lookup miss can
//! only mean the code itself is outside the table.

use super::error::{ClassificationError, TableError};

pub const VOLUMES: [char; 5] = ['A', 'B', 'C', 'D', 'E'];

/// ECO value used by games without an opening code (mostly variants).
pub const UNKNOWN_ECO: &str = "?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningRange {
    pub volume: char,
    pub lo: u8,
    pub hi: u8,
    pub family: &'static str,
}

const fn range(volume: char, lo: u8, hi: u8, family: &'static str) -> OpeningRange {
    OpeningRange {
        volume,
        lo,
        hi,
        family,
    }
}

pub const OPENING_RANGES: &[OpeningRange] = &[
    range('A', 0, 0, "Polish opening"),
    range('A', 1, 3, "Bird's opening"),
    range('A', 4, 9, "Reti opening"),
    range('A', 10, 39, "English opening"),
    range('A', 40, 41, "Queen's pawn"),
    range('A', 42, 42, "Modern defence, Averbakh system"),
    range('A', 43, 44, "Old Benoni defence"),
    range('A', 45, 46, "Queen's pawn game"),
    range('A', 47, 47, "Queen's Indian defence"),
    range('A', 48, 49, "King's Indian, East Indian defence"),
    range('A', 50, 50, "Queen's pawn game"),
    range('A', 51, 52, "Budapest defence"),
    range('A', 53, 55, "Old Indian defence"),
    range('A', 56, 56, "Benoni defence"),
    range('A', 57, 59, "Benko gambit"),
    range('A', 60, 79, "Benoni defence"),
    range('A', 80, 99, "Dutch defence"),
    range('B', 0, 0, "King's pawn opening"),
    range('B', 1, 1, "Scandinavian defence"),
    range('B', 2, 5, "Alekhine's defence"),
    range('B', 6, 6, "Robatsch defence"),
    range('B', 7, 9, "Pirc defence"),
    range('B', 10, 19, "Caro-Kann defence"),
    range('B', 20, 99, "Sicilian defence"),
    range('C', 0, 19, "French defence"),
    range('C', 20, 20, "King's pawn game"),
    range('C', 21, 22, "Centre game"),
    range('C', 23, 24, "Bishop's opening"),
    range('C', 25, 29, "Vienna game"),
    range('C', 30, 39, "King's gambit"),
    range('C', 40, 40, "King's knight opening"),
    range('C', 41, 41, "Philidor's defence"),
    range('C', 42, 43, "Petrov's defence"),
    range('C', 44, 44, "King's pawn game"),
    range('C', 45, 45, "Scotch game"),
    range('C', 46, 46, "Three knights game"),
    range('C', 47, 49, "Four knights game"),
    range('C', 50, 50, "Italian game"),
    range('C', 51, 52, "Evans gambit"),
    range('C', 53, 54, "Giuoco Piano"),
    range('C', 55, 59, "Two knights defence"),
    range('C', 60, 99, "Ruy Lopez"),
    range('D', 0, 0, "Queen's pawn game"),
    range('D', 1, 1, "Richter-Veresov attack"),
    range('D', 2, 2, "Queen's pawn game"),
    range('D', 3, 3, "Torre attack"),
    range('D', 4, 5, "Queen's pawn game"),
    range('D', 6, 6, "Queen's gambit"),
    range('D', 7, 7, "Chigorin defence"),
    range('D', 8, 9, "Albin counter-gambit"),
    range('D', 10, 19, "Slav defence"),
    range('D', 20, 29, "Queen's gambit accepted"),
    range('D', 30, 42, "Queen's gambit declined"),
    range('D', 43, 49, "Semi-Slav defence"),
    range('D', 50, 69, "Queen's gambit declined"),
    range('D', 70, 79, "Neo-Gruenfeld defence"),
    range('D', 80, 99, "Gruenfeld defence"),
    range('E', 0, 0, "Queen's pawn game"),
    range('E', 1, 9, "Catalan opening"),
    range('E', 10, 10, "Queen's pawn game"),
    range('E', 11, 11, "Bogo-Indian defence"),
    range('E', 12, 19, "Queen's Indian defence"),
    range('E', 20, 59, "Nimzo-Indian defence"),
    range('E', 60, 99, "King's Indian defence"),
];

/// Opening ranges that passed the coverage check.
#[derive(Debug, Clone, Copy)]
pub struct OpeningTable {
    ranges: &'static [OpeningRange],
}

impl OpeningTable {
    /// The built-in table, checked for exhaustive 00-99 coverage per volume.
    pub fn validated() -> Result<Self, TableError> {
        Self::from_ranges(OPENING_RANGES)
    }

    pub fn from_ranges(ranges: &'static [OpeningRange]) -> Result<Self, TableError> {
        for volume in VOLUMES {
            let mut seen = [false; 100];
            for r in ranges.iter().filter(|r| r.volume == volume) {
                if r.lo > r.hi || r.hi > 99 {
                    return Err(TableError::BadRange {
                        volume,
                        lo: r.lo,
                        hi: r.hi,
                    });
                }
                for id in r.lo..=r.hi {
                    if seen[id as usize] {
                        return Err(TableError::Overlap { volume, id });
                    }
                    seen[id as usize] = true;
                }
            }
            if let Some(id) = seen.iter().position(|covered| !covered) {
                return Err(TableError::Gap {
                    volume,
                    id: id as u8,
                });
            }
        }
        Ok(Self { ranges })
    }

    /// Opening family for an ECO code such as `C50`.
    ///
    /// `?` gives `Ok(None)`. Any other code the table does not place is an error.
    pub fn classify(&self, eco: &str) -> Result<Option<&'static str>, ClassificationError> {
        let code = eco.trim();
        if code == UNKNOWN_ECO {
            return Ok(None);
        }

        let unknown = || ClassificationError {
            code: code.to_string(),
        };

        let mut chars = code.chars();
        let volume = chars.next().ok_or_else(unknown)?;
        let digits = chars.as_str();
        if digits.len() != 2 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unknown());
        }
        let id: u8 = digits.parse().map_err(|_| unknown())?;

        self.ranges
            .iter()
            .find(|r| r.volume == volume && (r.lo..=r.hi).contains(&id))
            .map(|r| Some(r.family))
            .ok_or_else(unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> OpeningTable {
        OpeningTable::validated().expect("built-in table must be exhaustive")
    }

    #[test]
    fn test_builtin_table_is_exhaustive() {
        assert!(OpeningTable::validated().is_ok());
    }

    #[test]
    fn test_known_codes() {
        let t = table();
        assert_eq!(t.classify("C50"), Ok(Some("Italian game")));
        assert_eq!(t.classify("A00"), Ok(Some("Polish opening")));
        assert_eq!(t.classify("A02"), Ok(Some("Bird's opening")));
        assert_eq!(t.classify("B90"), Ok(Some("Sicilian defence")));
        assert_eq!(t.classify("E60"), Ok(Some("King's Indian defence")));
        assert_eq!(t.classify("E99"), Ok(Some("King's Indian defence")));
    }

    #[test]
    fn test_question_mark_is_unclassifiable() {
        assert_eq!(table().classify("?"), Ok(None));
    }

    #[test]
    fn test_unknown_volume_is_fatal() {
        assert_eq!(
            table().classify("F10"),
            Err(ClassificationError {
                code: "F10".to_string()
            })
        );
    }

    #[test]
    fn test_malformed_code_is_fatal() {
        for bad in ["", "C5", "C500", "Cxx", "50"] {
            assert!(table().classify(bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn test_every_code_is_classified() {
        let t = table();
        for volume in VOLUMES {
            for id in 0..100 {
                let code = format!("{volume}{id:02}");
                assert!(matches!(t.classify(&code), Ok(Some(_))), "{code}");
            }
        }
    }

    #[test]
    fn test_gap_is_reported() {
        static GAPPY: &[OpeningRange] = &[
            range('A', 0, 49, "a"),
            range('A', 51, 99, "b"),
            range('B', 0, 99, "b"),
            range('C', 0, 99, "c"),
            range('D', 0, 99, "d"),
            range('E', 0, 99, "e"),
        ];
        assert_eq!(
            OpeningTable::from_ranges(GAPPY).unwrap_err(),
            TableError::Gap { volume: 'A', id: 50 }
        );
    }

    #[test]
    fn test_overlap_is_reported() {
        static OVERLAPPING: &[OpeningRange] = &[
            range('A', 0, 99, "a"),
            range('B', 0, 10, "b"),
            range('B', 10, 99, "b"),
            range('C', 0, 99, "c"),
            range('D', 0, 99, "d"),
            range('E', 0, 99, "e"),
        ];
        assert_eq!(
            OpeningTable::from_ranges(OVERLAPPING).unwrap_err(),
            TableError::Overlap { volume: 'B', id: 10 }
        );
    }

    #[test]
    fn test_out_of_bounds_range_is_reported() {
        static WIDE: &[OpeningRange] = &[range('A', 0, 120, "a")];
        assert_eq!(
            OpeningTable::from_ranges(WIDE).unwrap_err(),
            TableError::BadRange {
                volume: 'A',
                lo: 0,
                hi: 120
            }
        );
    }
}
