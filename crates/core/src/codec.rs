//! Text codecs used by the LinkPlay command set.
//!
//! Media metadata (title, artist, album) usually arrives hex-encoded, and
//! strings embedded in multiroom join commands must be sent hex-encoded.

/// Decode hex-encoded UTF-8 text, returning the input unchanged when it is not
/// valid hex or does not decode to UTF-8
pub fn decode_hex_text(input: &str) -> String {
    hex::decode(input)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .unwrap_or_else(|| input.to_string())
}

/// Encode text as lowercase hex, two digits per UTF-8 byte
pub fn encode_hex_text(input: &str) -> String {
    hex::encode(input.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_title() {
        // "Time" by Pink Floyd as the device reports it
        assert_eq!(decode_hex_text("54696D65"), "Time");
        assert_eq!(decode_hex_text("50696e6b20466c6f7964"), "Pink Floyd");
    }

    #[test]
    fn test_decode_falls_back_to_raw() {
        assert_eq!(decode_hex_text("Unknown"), "Unknown");
        assert_eq!(decode_hex_text("abc"), "abc");
        // valid hex, but not UTF-8
        assert_eq!(decode_hex_text("ff"), "ff");
        assert_eq!(decode_hex_text(""), "");
        assert_eq!(decode_hex_text("   "), "   ");
        assert_eq!(decode_hex_text(" 54696D65"), " 54696D65");
    }

    #[test]
    fn test_encode_ssid() {
        assert_eq!(encode_hex_text("Home"), "486f6d65");
        assert_eq!(encode_hex_text(""), "");
        assert_eq!(decode_hex_text(&encode_hex_text("Living Room")), "Living Room");
    }
}
