//! Arabic text normalization applied before encoding.
//!
//! Rules, in order:
//! 1. Strip diacritics (tanween, short vowels, shadda, sukun: U+064B..=U+0652)
//! 2. Alif with madda / hamza above / hamza below becomes bare Alif (U+0627)
//! 3. Ta Marbuta (U+0629) becomes Ha (U+0647)
//!
//! Rule 3 is lossy: it drops a grammatical distinction to match morphological
//! variants. Every rule maps into characters no rule touches, so the
//! transform is idempotent. Non-Arabic text is returned unchanged.

const DIACRITICS: std::ops::RangeInclusive<char> = '\u{064B}'..='\u{0652}';

const ALIF: char = '\u{0627}';
const ALIF_MADDA: char = '\u{0622}';
const ALIF_HAMZA_ABOVE: char = '\u{0623}';
const ALIF_HAMZA_BELOW: char = '\u{0625}';

const TA_MARBUTA: char = '\u{0629}';
const HA: char = '\u{0647}';

/// Normalize text for embedding. Pure and total over any input.
pub fn normalize(text: &str) -> String {
    text.chars().filter_map(normalize_char).collect()
}

fn normalize_char(c: char) -> Option<char> {
    if DIACRITICS.contains(&c) {
        return None;
    }
    Some(match c {
        ALIF_MADDA | ALIF_HAMZA_ABOVE | ALIF_HAMZA_BELOW => ALIF,
        TA_MARBUTA => HA,
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_diacritics() {
        // "مُحَمَّدٌ" with damma, fatha, shadda, tanween
        assert_eq!(normalize("مُحَمَّدٌ"), "محمد");
        assert_eq!(normalize("قَانُونٌ"), "قانون");
    }

    #[test]
    fn test_canonicalizes_alif_variants() {
        assert_eq!(normalize("أحكام"), "احكام");
        assert_eq!(normalize("إجراءات"), "اجراءات");
        assert_eq!(normalize("آثار"), "اثار");
    }

    #[test]
    fn test_ta_marbuta_to_ha() {
        assert_eq!(normalize("المحكمة"), "المحكمه");
        assert_eq!(normalize("مادة"), "ماده");
    }

    #[test]
    fn test_combined_rules() {
        assert_eq!(normalize("المَادَّةُ الأُولَى"), "الماده الاولى");
    }

    #[test]
    fn test_english_and_empty_pass_through() {
        assert_eq!(normalize(""), "");
        assert_eq!(
            normalize("Article 5: The Court shall decide."),
            "Article 5: The Court shall decide."
        );
        assert_eq!(normalize("Law No. 12 – قانون رقم"), "Law No. 12 – قانون رقم");
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            "",
            "plain ascii",
            "المَادَّةُ الأُولَى مِنْ قَانُونِ الإِجْرَاءَاتِ",
            "آ أ إ ة ً ٌ ٍ َ ُ ِ ّ ْ",
            "mixed أحكام and ةةة",
            "\u{064B}\u{064B}\u{0629}",
        ];
        for sample in samples {
            let once = normalize(sample);
            assert_eq!(normalize(&once), once, "not idempotent for {sample:?}");
        }
    }

    #[test]
    fn test_output_contains_no_rewritten_characters() {
        let once = normalize("آ أ إ ة ً ٌ ٍ َ ُ ِ ّ ْ");
        for c in once.chars() {
            assert!(!DIACRITICS.contains(&c));
            assert!(![ALIF_MADDA, ALIF_HAMZA_ABOVE, ALIF_HAMZA_BELOW, TA_MARBUTA].contains(&c));
        }
    }
}
