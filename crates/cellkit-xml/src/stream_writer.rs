//! Streaming XML emission backend.
//!
//! Writes bytes directly into a growing buffer with no intermediate tree,
//! escaping inline. Open tags are closed lazily so childless elements render
//! self-closing.

use crate::emit::{XmlEmit, XML_DECLARATION};
use crate::escape::push_escaped;

/// Direct-to-buffer implementation of [`XmlEmit`].
pub struct StreamXmlWriter {
    buf: Vec<u8>,
    /// Names of currently open elements, innermost last.
    stack: Vec<String>,
    /// The innermost start tag has been written but not yet closed with '>'.
    tag_open: bool,
}

impl StreamXmlWriter {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(8192),
            stack: Vec::new(),
            tag_open: false,
        }
    }

    fn close_open_tag(&mut self) {
        if self.tag_open {
            self.buf.push(b'>');
            self.tag_open = false;
        }
    }
}

impl Default for StreamXmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlEmit for StreamXmlWriter {
    fn start_document(&mut self) {
        self.buf.extend_from_slice(XML_DECLARATION.as_bytes());
    }

    fn end_document(&mut self) {
        // Close any element the caller left open.
        while !self.stack.is_empty() {
            self.end_element();
        }
    }

    fn start_element(&mut self, local: &str, ns: Option<&str>) {
        self.close_open_tag();
        self.buf.push(b'<');
        self.buf.extend_from_slice(local.as_bytes());
        self.stack.push(local.to_string());
        self.tag_open = true;
        if let Some(uri) = ns {
            self.attribute("xmlns", uri);
        }
    }

    fn attribute(&mut self, name: &str, value: &str) {
        debug_assert!(self.tag_open, "attribute written outside an open start tag");
        self.buf.push(b' ');
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.extend_from_slice(b"=\"");
        push_escaped(&mut self.buf, value);
        self.buf.push(b'"');
    }

    fn characters(&mut self, text: &str) {
        self.close_open_tag();
        push_escaped(&mut self.buf, text);
    }

    fn end_element(&mut self) {
        let Some(name) = self.stack.pop() else {
            return;
        };
        if self.tag_open {
            self.buf.extend_from_slice(b"/>");
            self.tag_open = false;
        } else {
            self.buf.extend_from_slice(b"</");
            self.buf.extend_from_slice(name.as_bytes());
            self.buf.push(b'>');
        }
    }

    fn flush(&mut self) {}

    fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_self_closing_empty_element() {
        let mut w = StreamXmlWriter::new();
        w.start_document();
        w.start_element("dimension", None);
        w.attribute("ref", "A1:B2");
        w.end_element();
        w.end_document();
        let out = String::from_utf8(w.take()).unwrap();
        assert_eq!(
            out,
            format!("{XML_DECLARATION}<dimension ref=\"A1:B2\"/>")
        );
    }

    #[test]
    fn test_nested_elements() {
        let mut w = StreamXmlWriter::new();
        w.start_document();
        w.start_element("a", None);
        w.start_element("b", None);
        w.characters("x");
        w.end_element();
        w.end_element();
        w.end_document();
        let out = String::from_utf8(w.take()).unwrap();
        assert!(out.ends_with("<a><b>x</b></a>"));
    }

    #[test]
    fn test_end_document_closes_dangling_elements() {
        let mut w = StreamXmlWriter::new();
        w.start_document();
        w.start_element("a", None);
        w.start_element("b", None);
        w.characters("t");
        w.end_document();
        let out = String::from_utf8(w.take()).unwrap();
        assert!(out.ends_with("<a><b>t</b></a>"));
    }

    #[test]
    fn test_attribute_value_escaping() {
        let mut w = StreamXmlWriter::new();
        w.start_document();
        w.start_element("e", None);
        w.attribute("v", "a\"b<c>d&e");
        w.end_element();
        w.end_document();
        let out = String::from_utf8(w.take()).unwrap();
        assert!(out.contains("v=\"a&quot;b&lt;c&gt;d&amp;e\""));
    }

    #[test]
    fn test_default_namespace_only_where_requested() {
        let mut w = StreamXmlWriter::new();
        w.start_document();
        w.start_element("worksheet", Some("urn:x"));
        w.start_element("sheetData", None);
        w.end_element();
        w.end_element();
        w.end_document();
        let out = String::from_utf8(w.take()).unwrap();
        assert_eq!(out.matches("xmlns=").count(), 1);
        assert!(out.contains("<worksheet xmlns=\"urn:x\"><sheetData/></worksheet>"));
    }
}
