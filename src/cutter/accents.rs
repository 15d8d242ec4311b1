//! Vietnamese diacritics removal

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Strip every combining mark after NFD decomposition and fold `Đ`/`đ`.
///
/// `Đ` has no decomposition, so it is the only letter mapped by hand.
pub fn remove_vietnamese_accents(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| match c {
            'Đ' => 'D',
            'đ' => 'd',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_tones_and_modifiers() {
        assert_eq!(remove_vietnamese_accents("Rộng mở cửa trái tim"), "Rong mo cua trai tim");
        assert_eq!(remove_vietnamese_accents("Tiếng Việt ơi ư"), "Tieng Viet oi u");
        assert_eq!(remove_vietnamese_accents("Đường đời"), "Duong doi");
    }

    #[test]
    fn test_idempotent() {
        for text in ["Những ngày thơ ấu", "Đất rừng phương Nam", "plain ascii", ""] {
            let once = remove_vietnamese_accents(text);
            assert_eq!(remove_vietnamese_accents(&once), once);
        }
    }

    #[test]
    fn test_precomposed_and_decomposed_agree() {
        let decomposed: String = "Phở".nfd().collect();
        assert_eq!(remove_vietnamese_accents(&decomposed), remove_vietnamese_accents("Phở"));
    }
}
