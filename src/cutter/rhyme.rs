//! Rhyme-based Cutter numbers for Vietnamese titles
//!
//! The first syllable is split into its leading consonant cluster and its
//! rhyme; the rhyme is looked up in a per-language table.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use unicode_normalization::UnicodeNormalization;

use super::accents::remove_vietnamese_accents;

static LEADING_CONSONANTS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[bcdfghjklmnpqrstvwxyz]+").expect("valid consonant regex"));

/// Rhyme → code lookup for one language
pub type RhymeTable = HashMap<String, String>;

/// Split a lowercase NFC syllable into (consonant cluster, rhyme)
pub fn split_syllable(word: &str) -> (String, String) {
    let plain = remove_vietnamese_accents(word);
    let cluster_len = LEADING_CONSONANTS
        .find(&plain)
        .map(|m| m.as_str().chars().count())
        .unwrap_or(0);
    let cluster = word.chars().take(cluster_len).collect();
    let rhyme = word.chars().skip(cluster_len).collect();
    (cluster, rhyme)
}

fn first_letter(word: &str) -> String {
    remove_vietnamese_accents(word)
        .chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

/// Build `<first letter><rhyme code><second word initial>` for a title.
///
/// Unknown rhymes contribute an empty code.
pub fn rhyme_cutter(title: &str, table: &RhymeTable) -> String {
    let mut words = title.split_whitespace();
    let Some(first) = words.next() else {
        return String::new();
    };

    let syllable: String = first.nfc().collect::<String>().to_lowercase();
    let (_, rhyme) = split_syllable(&syllable);

    let code = table
        .get(&rhyme)
        .or_else(|| table.get(&remove_vietnamese_accents(&rhyme)))
        .map(String::as_str)
        .unwrap_or("");

    let second = words.next().map(first_letter).unwrap_or_default();

    format!("{}{}{}", first_letter(first), code, second)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RhymeTable {
        [("ộng", "100"), ("a", "11"), ("ương", "520"), ("ong", "99")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_known_example() {
        assert_eq!(rhyme_cutter("Rộng mở cửa trái tim", &table()), "R100M");
    }

    #[test]
    fn test_cluster_split() {
        assert_eq!(split_syllable("nghiêng"), ("ngh".to_string(), "iêng".to_string()));
        assert_eq!(split_syllable("đường"), ("đ".to_string(), "ường".to_string()));
        assert_eq!(split_syllable("ăn"), (String::new(), "ăn".to_string()));
    }

    #[test]
    fn test_unaccented_fallback_and_unknown() {
        // "òng" is not in the table, its unaccented form "ong" is
        assert_eq!(rhyme_cutter("Lòng mẹ", &table()), "L99M");
        assert_eq!(rhyme_cutter("Xuân", &table()), "X");
    }

    #[test]
    fn test_single_word_and_empty() {
        assert_eq!(rhyme_cutter("Đương", &table()), "D520");
        assert_eq!(rhyme_cutter("   ", &table()), "");
    }

    #[test]
    fn test_deterministic() {
        let t = table();
        assert_eq!(rhyme_cutter("Cha và con", &t), rhyme_cutter("Cha và con", &t));
    }
}
