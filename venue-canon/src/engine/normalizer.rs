//! Venue name normalization
//!
//! Every raw name goes through [`normalize`] before any lookup or comparison.

use unicode_normalization::UnicodeNormalization;

/// Normalize a raw venue name for matching.
///
/// 1. Trim surrounding whitespace
/// 2. Unicode lowercase
/// 3. NFD decomposition (base letter + combining marks)
/// 4. Drop combining diacritical marks (U+0300..=U+036F)
///
/// Whitespace exposed by dropping a trailing or leading mark is trimmed as
/// well, which keeps the transform idempotent.
///
/// ```
/// use venue_canon::engine::normalize;
///
/// assert_eq!(normalize("İstanbul"), "istanbul");
/// assert_eq!(normalize("  Zorlu PSM "), "zorlu psm");
/// assert_eq!(normalize("Küçükçiftlik Park"), "kucukciftlik park");
/// ```
pub fn normalize(raw: &str) -> String {
    let stripped: String = raw
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_diacritic(*c))
        .collect();

    stripped.trim().to_string()
}

/// Combining Diacritical Marks block
fn is_combining_diacritic(c: char) -> bool {
    ('\u{0300}'..='\u{036F}').contains(&c)
}
