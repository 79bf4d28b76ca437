//! Browser-compatible URI encoding.
//!
//! Upstream consumers (external download managers, the reddit search page)
//! expect the exact byte-for-byte output of JavaScript's `encodeURIComponent`
//! and `encodeURI`, which keep a wider unreserved set than RFC 3986 encoders.

/// Characters `encodeURIComponent` leaves untouched besides ASCII alphanumerics.
const COMPONENT_UNRESERVED: &str = "-_.!~*'()";

/// Characters `encodeURI` additionally leaves untouched (reserved URI syntax).
const URI_RESERVED: &str = ";,/?:@&=+$#";

/// Encodes a string the way JavaScript's `encodeURIComponent` does.
///
/// ```
/// use episode_dl::encoding::encode_uri_component;
///
/// assert_eq!(encode_uri_component("Name - E1 (720p)"), "Name%20-%20E1%20(720p)");
/// ```
#[must_use]
pub fn encode_uri_component(input: &str) -> String {
    encode_with(input, |c| COMPONENT_UNRESERVED.contains(c))
}

/// Encodes a string the way JavaScript's `encodeURI` does.
#[must_use]
pub fn encode_uri(input: &str) -> String {
    encode_with(input, |c| {
        COMPONENT_UNRESERVED.contains(c) || URI_RESERVED.contains(c)
    })
}

fn encode_with(input: &str, keep: impl Fn(char) -> bool) -> String {
    let mut out = String::with_capacity(input.len());
    let mut buf = [0u8; 4];
    for ch in input.chars() {
        if ch.is_ascii_alphanumeric() || keep(ch) {
            out.push(ch);
        } else {
            out.push_str(&urlencoding::encode(ch.encode_utf8(&mut buf)));
        }
    }
    out
}
