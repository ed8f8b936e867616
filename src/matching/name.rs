// src/matching/name.rs

use crate::utils::{collapse_whitespace, fold_text};

// Known prefix noise patterns to clean
const NOISE_PREFIXES: [&str; 3] = ["zzz - ", "re-add ", "duplicado - "];

/// Normalizes an organization name for comparison.
///
/// Case, diacritics and punctuation are dropped so that
/// "Igreja Batista Central" and "IGREJA BATISTA CENTRAL." compare as equal.
pub fn normalize_name(name: &str) -> String {
    let mut normalized = fold_text(name);

    // Clean noise prefixes
    for prefix in &NOISE_PREFIXES {
        if let Some(rest) = normalized.strip_prefix(prefix) {
            normalized = rest.trim().to_string();
        }
    }

    // Handle special character substitutions
    let char_substitutions = [
        ("&", " e "),
        ("+", " "),
        ("/", " "),
        ("-", " "),
        (".", " "),
        ("'", ""),
        ("(", " "),
        (")", " "),
        (",", " "),
    ];

    for (pattern, replacement) in &char_substitutions {
        normalized = normalized.replace(pattern, replacement);
    }

    collapse_whitespace(&normalized)
}
