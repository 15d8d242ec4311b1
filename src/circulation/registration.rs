//! Registration number suggestion for new copies

use once_cell::sync::Lazy;
use regex::Regex;

static TRAILING_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)(\d+)$").expect("valid registration regex"));

/// Number following `last`: trailing digits incremented with their padding
/// kept, `<last>.1` when `last` has no trailing digits or they cannot be
/// incremented.
pub fn next_registration_number(last: &str) -> String {
    match TRAILING_DIGITS.captures(last) {
        Some(caps) => {
            let prefix = &caps[1];
            let digits = &caps[2];
            match digits.parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
                Some(n) => format!("{}{:0width$}", prefix, n, width = digits.len()),
                None => format!("{}.1", last),
            }
        }
        None => format!("{}.1", last),
    }
}

/// `count` numbers following `last`, starting at `Q1` for a book without copies
pub fn suggest_registration_numbers(last: Option<&str>, count: usize) -> Vec<String> {
    let mut suggestions = Vec::with_capacity(count);
    let mut current = match last {
        Some(last) if !last.trim().is_empty() => next_registration_number(last.trim()),
        _ => "Q1".to_string(),
    };
    for _ in 0..count {
        let next = next_registration_number(&current);
        suggestions.push(current);
        current = next;
    }
    suggestions
}

/// First value appearing twice, ignoring surrounding whitespace
pub fn find_duplicate(numbers: &[String]) -> Option<&str> {
    let mut seen = std::collections::HashSet::new();
    numbers
        .iter()
        .map(|n| n.trim())
        .find(|n| !seen.insert(*n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_increment_keeps_padding() {
        assert_eq!(next_registration_number("VN0009"), "VN0010");
        assert_eq!(next_registration_number("A-99"), "A-100");
        assert_eq!(next_registration_number("12"), "13");
    }

    #[test]
    fn test_no_digits() {
        assert_eq!(next_registration_number("ABC"), "ABC.1");
        assert_eq!(suggest_registration_numbers(Some("ABC"), 2), vec!["ABC.1", "ABC.2"]);
    }

    #[test]
    fn test_counter_at_limit() {
        assert_eq!(
            next_registration_number("18446744073709551615"),
            "18446744073709551615.1"
        );
        assert_eq!(
            next_registration_number("VN99999999999999999999999"),
            "VN99999999999999999999999.1"
        );
        assert_eq!(next_registration_number("18446744073709551614"), "18446744073709551615");
    }

    #[test]
    fn test_first_copy() {
        assert_eq!(suggest_registration_numbers(None, 3), vec!["Q1", "Q2", "Q3"]);
        assert_eq!(suggest_registration_numbers(Some("  "), 1), vec!["Q1"]);
        assert!(suggest_registration_numbers(None, 0).is_empty());
    }

    #[test]
    fn test_duplicates() {
        let numbers = vec!["A1".to_string(), "A2".to_string(), " A1 ".to_string()];
        assert_eq!(find_duplicate(&numbers), Some("A1"));
        assert_eq!(find_duplicate(&numbers[..2]), None);
    }
}
