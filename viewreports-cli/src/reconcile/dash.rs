//! Dash normalization and the "A - B" → "B - A" swap

use once_cell::sync::Lazy;
use regex::Regex;

static AROUND_DASH: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*-\s*").expect("valid regex"));
static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Normalize dash variants and spacing so `A—B`, `A-B` and `A - B` compare equal
pub fn normalize_dash(text: &str) -> String {
    let s = text.replace(['–', '—'], "-");
    let s = AROUND_DASH.replace_all(&s, " - ");
    WHITESPACE.replace_all(&s, " ").trim().to_string()
}

/// Swap the operands of an `A - B` name, splitting at the first dash
///
/// Returns `None` when the normalized name has no ` - ` separator.
pub fn swap_dash(name: &str) -> Option<String> {
    let normalized = normalize_dash(name);
    let (left, right) = normalized.split_once(" - ")?;
    Some(format!("{} - {}", right.trim(), left.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dash_variants_normalize_identically() {
        assert_eq!(normalize_dash("A—B"), "A - B");
        assert_eq!(normalize_dash("A - B"), "A - B");
        assert_eq!(normalize_dash("A-B"), "A - B");
        assert_eq!(normalize_dash("A –  B"), "A - B");
        assert_eq!(normalize_dash("  A   B  "), "A B");
    }

    #[test]
    fn test_swap() {
        assert_eq!(swap_dash("A - B").as_deref(), Some("B - A"));
        assert_eq!(swap_dash("הישרדות—עונה 3").as_deref(), Some("עונה 3 - הישרדות"));
        assert_eq!(swap_dash("no dash here"), None);
    }

    #[test]
    fn test_swap_splits_at_first_dash() {
        assert_eq!(swap_dash("A - B - C").as_deref(), Some("B - C - A"));
    }

    #[test]
    fn test_swap_is_involution_on_normalized_pairs() {
        let swapped = swap_dash("Left-Right").unwrap();
        assert_eq!(swap_dash(&swapped).as_deref(), Some("Left - Right"));
    }
}
