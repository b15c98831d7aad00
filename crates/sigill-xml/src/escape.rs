#![forbid(unsafe_code)]

//! Character escaping shared by canonicalization and the XML writer.
//!
//! - Text: `&` `<` `>` and `\r` are escaped
//! - Attribute values: `&` `<` `"` plus `\t` `\n` `\r` as character references
//! - PI data: `\r` only

/// Escape character data.
pub fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape an attribute value (double-quoted).
pub fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '"' => out.push_str("&quot;"),
            '\t' => out.push_str("&#x9;"),
            '\n' => out.push_str("&#xA;"),
            '\r' => out.push_str("&#xD;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape processing instruction data.
pub fn escape_pi(s: &str) -> String {
    s.replace('\r', "&#xD;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text() {
        assert_eq!(escape_text("plain"), "plain");
        assert_eq!(escape_text("x<y & y>z"), "x&lt;y &amp; y&gt;z");
        assert_eq!(escape_text("a\r\nb"), "a&#xD;\nb");
    }

    #[test]
    fn test_escape_attr() {
        assert_eq!(escape_attr("say \"hi\""), "say &quot;hi&quot;");
        assert_eq!(escape_attr("a>b"), "a>b");
        assert_eq!(escape_attr("\t\n\r"), "&#x9;&#xA;&#xD;");
    }

    #[test]
    fn test_escape_pi() {
        assert_eq!(escape_pi("a\rb"), "a&#xD;b");
    }
}
