//! Text utilities shared by header detection and the renderers.

/// Returns true if the text reads as a number, tolerating thousands separators,
/// a leading currency sign and a trailing percent sign.
pub(crate) fn is_numeric(text: &str) -> bool {
    let text = text.trim();
    let text = text.strip_prefix(['¥', '$', '€', '£']).unwrap_or(text);
    let text = text.strip_suffix('%').unwrap_or(text).trim();
    if text.is_empty() || !text.bytes().any(|byte| byte.is_ascii_digit()) {
        return false;
    }
    text.replace(',', "").parse::<f64>().is_ok()
}

/// Escapes the characters that are significant in HTML text and attribute values.
pub(crate) fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Makes text safe for a single Markdown table cell.
/// Pipes are escaped and line breaks collapse to a single space.
pub(crate) fn escape_markdown_cell(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
        .replace('|', "\\|")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_detection() {
        assert!(is_numeric("3500"));
        assert!(is_numeric(" 1,234.5 "));
        assert!(is_numeric("-12"));
        assert!(is_numeric("45%"));
        assert!(is_numeric("¥300"));
        assert!(!is_numeric(""));
        assert!(!is_numeric("2021年"));
        assert!(!is_numeric("inf"));
        assert!(!is_numeric("NaN"));
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_html("a<b> & \"c\""), "a&lt;b&gt; &amp; &quot;c&quot;");
        assert_eq!(escape_markdown_cell("a|b\r\nc\n\nd"), "a\\|b c d");
    }
}
