use std::borrow::Cow;

/// Escape text for use in HTML element content and quoted attribute values
pub fn escape(input: &str) -> Cow<'_, str> {
    if !input.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(input);
    }

    let mut escaped = String::with_capacity(input.len() + 16);
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(ch),
        }
    }

    Cow::Owned(escaped)
}

/// Percent-encode a value for use as a single URL path segment
pub fn encode_path_segment(segment: &str) -> Cow<'_, str> {
    let is_unreserved =
        |b: u8| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~');

    if segment.bytes().all(is_unreserved) {
        return Cow::Borrowed(segment);
    }

    let mut encoded = String::with_capacity(segment.len() * 3);
    for byte in segment.bytes() {
        if is_unreserved(byte) {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }

    Cow::Owned(encoded)
}
