//! XML escaping and whitespace-preservation rules.

/// Append `text` to `out`, escaping the five XML-special characters.
///
/// The same escaping is applied to attribute values and character data so
/// both emission backends produce identical bytes for identical input.
pub fn push_escaped(out: &mut Vec<u8>, text: &str) {
    for byte in text.bytes() {
        match byte {
            b'&' => out.extend_from_slice(b"&amp;"),
            b'<' => out.extend_from_slice(b"&lt;"),
            b'>' => out.extend_from_slice(b"&gt;"),
            b'"' => out.extend_from_slice(b"&quot;"),
            b'\'' => out.extend_from_slice(b"&apos;"),
            _ => out.push(byte),
        }
    }
}

/// Escape into an owned string. Convenience wrapper over [`push_escaped`].
pub fn escaped(text: &str) -> String {
    let mut out = Vec::with_capacity(text.len());
    push_escaped(&mut out, text);
    // push_escaped only inserts ASCII sequences between valid UTF-8 bytes.
    String::from_utf8(out).unwrap_or_default()
}

/// Whether a `<t>`-style text element needs `xml:space="preserve"`.
///
/// Excel drops surrounding whitespace unless the attribute is present, so it
/// is required for leading/trailing whitespace, runs of two or more spaces,
/// and embedded newlines or tabs.
pub fn needs_space_preserve(text: &str) -> bool {
    if text.is_empty() {
        return false;
    }
    let first = text.chars().next().unwrap_or('x');
    let last = text.chars().last().unwrap_or('x');
    first.is_whitespace()
        || last.is_whitespace()
        || text.contains("  ")
        || text.contains('\n')
        || text.contains('\t')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaped_special_characters() {
        assert_eq!(escaped("<test>&value</test>"), "&lt;test&gt;&amp;value&lt;/test&gt;");
        assert_eq!(escaped("a\"b'c"), "a&quot;b&apos;c");
    }

    #[test]
    fn test_escaped_plain_text_unchanged() {
        assert_eq!(escaped("Hello World"), "Hello World");
        assert_eq!(escaped("héllo wörld"), "héllo wörld");
    }

    #[test]
    fn test_needs_space_preserve_leading_trailing() {
        assert!(needs_space_preserve("  spaced"));
        assert!(needs_space_preserve("trailing "));
        assert!(needs_space_preserve(" both "));
    }

    #[test]
    fn test_needs_space_preserve_inner_runs() {
        assert!(needs_space_preserve("two  spaces"));
        assert!(needs_space_preserve("line\nbreak"));
        assert!(needs_space_preserve("tab\there"));
    }

    #[test]
    fn test_needs_space_preserve_plain() {
        assert!(!needs_space_preserve("plain text"));
        assert!(!needs_space_preserve(""));
        assert!(!needs_space_preserve("one word"));
    }
}
