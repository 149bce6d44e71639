//! Description normalization and canonical ordering for phenotype rows.
//!
//! Two descriptions are semantic duplicates when they collapse to the same
//! key once case and every non-alphanumeric character are disregarded.

/// Lower-case `description` and keep only letters and digits.
pub fn normalize_description(description: &str) -> String {
    description
        .chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// Number of upper-case letters in the original description.
pub fn uppercase_count(description: &str) -> usize {
    description.chars().filter(|c| c.is_uppercase()).count()
}

/// Sort key for picking the canonical member of a duplicate group.
///
/// Fewer upper-case letters first, then shorter strings. Length is counted in
/// chars, not bytes. Equal keys keep their input order (callers sort stably).
pub fn canonical_sort_key(description: &str) -> (usize, usize) {
    (uppercase_count(description), description.chars().count())
}
