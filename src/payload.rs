//! Sub-field extraction from decoded payloads.
//!
//! Label payloads carry the product code as `...CEN;<code>;...`.

use once_cell::sync::Lazy;
use regex::Regex;

static BARCODE_FIELD: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"CEN;([^;]+);").ok());

/// The `CEN;` field of a payload, or the whole payload when it has none
pub fn barcode_value(payload: &str) -> &str {
    BARCODE_FIELD
        .as_ref()
        .and_then(|re| re.captures(payload))
        .and_then(|caps| caps.get(1))
        .map_or(payload, |m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_field() {
        assert_eq!(barcode_value("ID;42;CEN;4601234567890;QTY;3"), "4601234567890");
        assert_eq!(barcode_value("CEN;ABC;"), "ABC");
    }

    #[test]
    fn test_first_field_wins() {
        assert_eq!(barcode_value("CEN;one;CEN;two;"), "one");
    }

    #[test]
    fn test_falls_back_to_whole_payload() {
        assert_eq!(barcode_value("plain text"), "plain text");
        // Missing terminator
        assert_eq!(barcode_value("CEN;123"), "CEN;123");
        // Empty field
        assert_eq!(barcode_value("CEN;;"), "CEN;;");
    }
}
