use once_cell::sync::Lazy;
use regex::Regex;

pub const BOOKING_REFERENCE_PREFIX: &str = "SK";
pub const BOOKING_REFERENCE_SUFFIX_LEN: usize = 6;
pub const BOOKING_REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

static REFERENCE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^SK[A-Z0-9]{6}$").expect("valid booking reference regex"));

/// True for `SK` followed by six uppercase letters or digits.
pub fn is_booking_reference(value: &str) -> bool {
    REFERENCE_SHAPE.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_only_the_sk_shape() {
        assert!(is_booking_reference("SKA1B2C3"));
        assert!(is_booking_reference("SK000000"));
        assert!(!is_booking_reference("SKa1b2c3"));
        assert!(!is_booking_reference("SK12345"));
        assert!(!is_booking_reference("XX123456"));
        assert!(!is_booking_reference("SK1234567"));
    }

    #[test]
    fn alphabet_matches_the_shape() {
        assert_eq!(BOOKING_REFERENCE_ALPHABET.len(), 36);
        let sample: String = BOOKING_REFERENCE_ALPHABET
            .iter()
            .take(BOOKING_REFERENCE_SUFFIX_LEN)
            .map(|b| *b as char)
            .collect();
        assert!(is_booking_reference(&format!("{BOOKING_REFERENCE_PREFIX}{sample}")));
    }
}
