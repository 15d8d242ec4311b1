//! Cutter numbers and text normalization for shelf ordering

pub mod accents;
pub mod rhyme;
pub mod sanborn;

pub use accents::remove_vietnamese_accents;
pub use rhyme::{rhyme_cutter, RhymeTable};
pub use sanborn::CutterSanborn;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Cutter numbering scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CutterScheme {
    /// Rhyme table lookup, needs mappings for the language
    Rhyme,
    /// Fixed letter tables
    Sanborn,
}

/// Cutter number for a book title.
///
/// Uses the rhyme table when the language has one, Cutter-Sanborn otherwise.
pub fn book_cutter(title: &str, table: &RhymeTable) -> (CutterScheme, String) {
    if table.is_empty() {
        (CutterScheme::Sanborn, CutterSanborn::generate_code(title, true))
    } else {
        (CutterScheme::Rhyme, rhyme_cutter(title, table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scheme_selection() {
        let empty = RhymeTable::new();
        assert_eq!(book_cutter("Toi", &empty), (CutterScheme::Sanborn, "T927o".to_string()));

        let mut table = RhymeTable::new();
        table.insert("ộng".to_string(), "100".to_string());
        assert_eq!(
            book_cutter("Rộng mở cửa trái tim", &table),
            (CutterScheme::Rhyme, "R100M".to_string())
        );
    }
}
