// src/matching/address.rs

use crate::utils::fold_text;

// Street-type abbreviations, English and Portuguese
const ABBREVIATIONS: [(&str, &str); 16] = [
    ("st", "street"),
    ("rd", "road"),
    ("ave", "avenue"),
    ("blvd", "boulevard"),
    ("dr", "drive"),
    ("ln", "lane"),
    ("r", "rua"),
    ("av", "avenida"),
    ("pca", "praca"),
    ("pc", "praca"),
    ("al", "alameda"),
    ("trav", "travessa"),
    ("tv", "travessa"),
    ("rod", "rodovia"),
    ("estr", "estrada"),
    ("lgo", "largo"),
];

// Unit designators carry no identity on their own
const DROPPED_TOKENS: [&str; 5] = ["apt", "suite", "unit", "sala", "apto"];

/// Normalize an address by:
/// - Converting to lowercase and stripping diacritics
/// - Removing punctuation
/// - Standardizing common abbreviations
/// - Removing apartment/suite designators
pub fn normalize_address(address: &str) -> String {
    let folded = fold_text(address);

    let cleaned: String = folded
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();

    cleaned
        .split_whitespace()
        .filter(|token| !DROPPED_TOKENS.contains(token))
        .map(|token| {
            ABBREVIATIONS
                .iter()
                .find(|(short, _)| *short == token)
                .map_or(token, |(_, long)| *long)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expands_abbreviations() {
        assert_eq!(
            normalize_address("Av. Paulista, 1000"),
            normalize_address("Avenida Paulista 1000")
        );
        assert_eq!(normalize_address("R. da Consolação, 55"), "rua da consolacao 55");
        assert_eq!(normalize_address("12 Main St."), "12 main street");
    }

    #[test]
    fn test_drops_unit_designators() {
        assert_eq!(normalize_address("Rua Augusta 200, Sala 3"), "rua augusta 200 3");
        assert_eq!(normalize_address("5 Oak Ave Suite 9"), "5 oak avenue 9");
    }

    #[test]
    fn test_abbreviation_only_matches_whole_tokens() {
        // "street" must not turn into "streetreet"
        assert_eq!(normalize_address("1 First Street"), "1 first street");
    }
}
