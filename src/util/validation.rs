use once_cell::sync::Lazy;
use regex::Regex;

static ID_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9]{8}$").expect("compile identifier regex"));

/// Checks whether a post or comment identifier has the shape
/// clients are expected to assign: exactly 8 lowercase ASCII
/// letters or digits.
///
/// This only checks the shape. Uniqueness is left entirely to
/// the primary key constraints of the database.
pub fn is_valid_id(id: &str) -> bool {
    ID_REGEX.is_match(id)
}
