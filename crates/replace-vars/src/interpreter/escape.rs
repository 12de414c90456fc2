//! Output escaping.

/// How substituted values are escaped on output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Escape {
    /// Entity-encode `& < > " ' +` and replace NUL.
    #[default]
    Html,
    /// Write values verbatim.
    None,
}

/// Escape text for an HTML text context.
///
/// # Example
///
/// ```
/// use replace_vars::interpreter::escape_html;
///
/// assert_eq!(escape_html("A & B <c>"), "A &amp; B &lt;c&gt;");
/// assert_eq!(escape_html(r#""it's""#), "&#34;it&#39;s&#34;");
/// assert_eq!(escape_html("c++"), "c&#43;&#43;");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            '+' => escaped.push_str("&#43;"),
            '\0' => escaped.push('\u{FFFD}'),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Escape text for a JavaScript string literal.
///
/// Quotes and backslashes are backslash-escaped; `< > & =` and non-printable
/// characters become `\uXXXX`.
pub fn escape_js(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '"' => escaped.push_str("\\\""),
            '<' => escaped.push_str("\\u003C"),
            '>' => escaped.push_str("\\u003E"),
            '&' => escaped.push_str("\\u0026"),
            '=' => escaped.push_str("\\u003D"),
            c if c < ' ' || (!c.is_ascii() && (c.is_control() || c.is_whitespace())) => {
                escaped.push_str(&format!("\\u{:04X}", u32::from(c)));
            }
            other => escaped.push(other),
        }
    }
    escaped
}

/// Escape text for use in a URL query component.
///
/// Unreserved characters pass through, spaces become `+`, and every other
/// byte is percent-encoded.
pub fn query_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                escaped.push(char::from(byte));
            }
            b' ' => escaped.push('+'),
            other => escaped.push_str(&format!("%{other:02X}")),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_leaves_plain_text_alone() {
        assert_eq!(escape_html("plain *markdown* text"), "plain *markdown* text");
        assert_eq!(escape_html("a\0b"), "a\u{FFFD}b");
    }

    #[test]
    fn html_encodes_plus() {
        assert_eq!(escape_html("1+1"), "1&#43;1");
    }

    #[test]
    fn js_encodes_control_characters() {
        assert_eq!(escape_js("a\nb\u{2028}é"), r"a\u000Ab\u2028é");
    }

    #[test]
    fn query_escape_encodes_reserved() {
        assert_eq!(query_escape("a b&c=d/é"), "a+b%26c%3Dd%2F%C3%A9");
    }
}
