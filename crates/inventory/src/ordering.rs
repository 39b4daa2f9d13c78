//! Display ordering for tire records.
//!
//! Records are listed by `name ++ size` in a locale-style order. Strings are
//! decomposed (NFD) first. At the primary level accents and case are both
//! ignored, so `Énergy` sorts with the `e`s. Ties are broken by accents, then
//! by case (lowercase first), and finally by byte order so the result is total
//! and deterministic.

use core::cmp::Ordering;

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::tire::TireRecord;

fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().filter(|c| !is_combining_mark(*c))
}

/// Compare two strings the way the inventory list is sorted.
pub fn locale_cmp(a: &str, b: &str) -> Ordering {
    let primary_a = base_letters(a).flat_map(char::to_lowercase);
    let primary_b = base_letters(b).flat_map(char::to_lowercase);

    primary_a
        .cmp(primary_b)
        .then_with(|| {
            let accents_a = a.nfd().flat_map(char::to_lowercase);
            let accents_b = b.nfd().flat_map(char::to_lowercase);
            accents_a.cmp(accents_b)
        })
        .then_with(|| {
            // Lowercase sorts before uppercase at the case level.
            let case_a = base_letters(a).map(char::is_uppercase);
            let case_b = base_letters(b).map(char::is_uppercase);
            case_a.cmp(case_b)
        })
        .then_with(|| a.cmp(b))
}

/// Order two records by their sort key, falling back to the id for records
/// that share a name and size.
pub fn record_cmp(a: &TireRecord, b: &TireRecord) -> Ordering {
    locale_cmp(&a.sort_key(), &b.sort_key()).then_with(|| a.id_typed().cmp(b.id_typed()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn case_is_ignored_at_the_primary_level() {
        assert_eq!(locale_cmp("bridgestone", "Continental"), Ordering::Less);
        assert_eq!(locale_cmp("Bridgestone", "continental"), Ordering::Less);
        assert_eq!(locale_cmp("michelin", "Goodyear"), Ordering::Greater);
    }

    #[test]
    fn accents_are_ignored_at_the_primary_level() {
        assert_eq!(locale_cmp("Énergy", "Falken"), Ordering::Less);
        assert_eq!(locale_cmp("Énergy", "Dunlop"), Ordering::Greater);
        assert_eq!(locale_cmp("Zeta", "Énergy"), Ordering::Greater);
        assert_eq!(locale_cmp("Ñandu", "Nokian"), Ordering::Less);
    }

    #[test]
    fn unaccented_sorts_before_accented_when_otherwise_equal() {
        assert_eq!(locale_cmp("resume", "résumé"), Ordering::Less);
        assert_eq!(locale_cmp("résumé", "resume"), Ordering::Greater);
    }

    #[test]
    fn precomposed_and_decomposed_forms_sort_together() {
        assert_eq!(locale_cmp("Energ\u{e9}", "Energe\u{301}"), "Energ\u{e9}".cmp("Energe\u{301}"));
        assert_eq!(locale_cmp("Energ\u{e9} 1", "Energe\u{301} 2"), Ordering::Less);
    }

    #[test]
    fn lowercase_sorts_before_uppercase_when_otherwise_equal() {
        assert_eq!(locale_cmp("michelin", "Michelin"), Ordering::Less);
        assert_eq!(locale_cmp("Michelin", "michelin"), Ordering::Greater);
    }

    #[test]
    fn equal_strings_compare_equal() {
        assert_eq!(locale_cmp("Michelin 245", "Michelin 245"), Ordering::Equal);
        assert_eq!(locale_cmp("Énergy", "Énergy"), Ordering::Equal);
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(locale_cmp("Michelin", "Michelin Agilis"), Ordering::Less);
    }
}
