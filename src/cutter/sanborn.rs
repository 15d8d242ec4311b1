//! Cutter-Sanborn style codes computed from fixed letter tables

use once_cell::sync::Lazy;
use regex::Regex;

use super::accents::remove_vietnamese_accents;

static NON_ALNUM: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9\s]").expect("valid regex"));
static LEADING_DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\s*").expect("valid regex"));

/// Leading words skipped before picking the main word (Vietnamese, English)
const ARTICLES: &[&str] = &[
    "các", "những", "mọi", "một", "hai", "ba", "bốn", "năm", "cuốn", "quyển", "tập", "bộ", "bản",
    "tuyển", "the", "a", "an",
];

static PLAIN_ARTICLES: Lazy<Vec<String>> =
    Lazy::new(|| ARTICLES.iter().map(|a| remove_vietnamese_accents(a)).collect());

fn base_value(c: char) -> u32 {
    match c {
        'a' => 10,
        'b' => 100,
        'c' => 200,
        'd' => 300,
        'e' => 400,
        'f' => 500,
        'g' => 600,
        'h' => 700,
        'i' => 800,
        'j' => 900,
        'k' => 10,
        'l' => 110,
        'm' => 210,
        'n' => 310,
        'o' => 410,
        'p' => 510,
        'q' => 610,
        'r' => 710,
        's' => 810,
        't' => 910,
        'u' => 20,
        'v' => 120,
        'w' => 220,
        'x' => 320,
        'y' => 420,
        'z' => 520,
        _ => 0,
    }
}

fn secondary_value(c: char) -> u32 {
    const ORDER: &str = "aeioubcdfghklmnpqrstvwxyz";
    ORDER.find(c).map(|i| i as u32).unwrap_or(0)
}

/// Generator for title-only Cutter-Sanborn codes
pub struct CutterSanborn;

impl CutterSanborn {
    /// Accent-free, lowercase, alphanumeric words with leading digits dropped
    pub fn normalize_title(title: &str) -> String {
        let lowered = remove_vietnamese_accents(title).to_lowercase();
        let cleaned = NON_ALNUM.replace_all(&lowered, "");
        let trimmed = LEADING_DIGITS.replace(cleaned.trim_start(), "");
        trimmed.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// First word after the leading articles, empty when nothing is left
    pub fn main_word(title: &str) -> String {
        let normalized = Self::normalize_title(title);
        normalized
            .split_whitespace()
            .find(|w| !PLAIN_ARTICLES.iter().any(|a| a.as_str() == *w))
            .map(str::to_string)
            .unwrap_or_default()
    }

    /// Numeric part for a main word, always in 0..1000
    pub fn cutter_number(word: &str) -> u32 {
        if word.is_empty() {
            return 0;
        }
        let mut chars = word.chars();
        let first = chars.next().unwrap_or('a');
        let second = chars.next().unwrap_or('a');
        let third = chars.next().unwrap_or('a');

        let tertiary = if third.is_ascii_lowercase() {
            third as u32 - 'a' as u32
        } else {
            0
        };

        (base_value(first) + secondary_value(second) * 3 + tertiary) % 1000
    }

    /// Code such as `S810` or `D300c`
    pub fn generate_code(title: &str, include_second_letter: bool) -> String {
        let word = Self::main_word(title);
        let mut chars = word.chars();
        let Some(first) = chars.next() else {
            return String::new();
        };

        let mut code = format!("{}{}", first.to_ascii_uppercase(), Self::cutter_number(&word));
        if include_second_letter {
            if let Some(second) = chars.next() {
                code.push(second.to_ascii_lowercase());
            }
        }
        code
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_letter_word() {
        // missing letters count as 'a'
        assert_eq!(CutterSanborn::generate_code("S", true), "S810");
    }

    #[test]
    fn test_number_formula() {
        // s=810, a=0*3, c=2
        assert_eq!(CutterSanborn::cutter_number("sach"), 812);
        // t=910, o=3*3, i=8 -> 927
        assert_eq!(CutterSanborn::cutter_number("toi"), 927);
        // z=520, z=24*3, z=25 -> 617
        assert_eq!(CutterSanborn::cutter_number("zzz"), 617);
        assert_eq!(CutterSanborn::cutter_number("rsy"), (710 + 18 * 3 + 24) % 1000);
    }

    #[test]
    fn test_articles_and_accents() {
        assert_eq!(CutterSanborn::main_word("Những ngày thơ ấu"), "ngay");
        assert_eq!(CutterSanborn::main_word("The Old Man"), "old");
        assert_eq!(CutterSanborn::main_word("Một hai ba"), "");
        assert_eq!(
            CutterSanborn::generate_code("Dế mèn phiêu lưu ký", true),
            "D303e"
        );
    }

    #[test]
    fn test_normalization() {
        assert_eq!(CutterSanborn::normalize_title("  1984: Animal   Farm!"), "animal farm");
        assert_eq!(CutterSanborn::generate_code("", true), "");
        assert_eq!(CutterSanborn::generate_code("!!!", false), "");
    }

    #[test]
    fn test_without_second_letter() {
        assert_eq!(CutterSanborn::generate_code("Toi", false), "T927");
        assert_eq!(CutterSanborn::generate_code("Toi", true), "T927o");
    }
}
