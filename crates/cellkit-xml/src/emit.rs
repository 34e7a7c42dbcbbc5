//! The abstract XML emission contract shared by both backends.
//!
//! Every part writer drives a [`XmlEmit`] implementation through the same
//! sequence of calls, so the attribute order and element order of a part are
//! fixed by the writer, not by the backend. Two backends exist:
//!
//! - [`DomXmlWriter`](crate::dom_writer::DomXmlWriter) builds an in-memory
//!   element tree and renders it on `end_document`.
//! - [`StreamXmlWriter`](crate::stream_writer::StreamXmlWriter) writes bytes
//!   directly into a growing buffer.
//!
//! Both produce identical bytes for identical call sequences.

use crate::dom_writer::DomXmlWriter;
use crate::escape::needs_space_preserve;
use crate::stream_writer::StreamXmlWriter;

/// The standard XML declaration emitted at the top of every part.
pub const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>";

/// Selects the XML emission backend used by the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlBackend {
    /// Build a DOM tree per part, render once at the end.
    #[default]
    Dom,
    /// Stream bytes directly into the output buffer.
    Stream,
}

impl XmlBackend {
    /// Create a fresh emitter for one part.
    pub fn emitter(self) -> Box<dyn XmlEmit> {
        match self {
            XmlBackend::Dom => Box::new(DomXmlWriter::new()),
            XmlBackend::Stream => Box::new(StreamXmlWriter::new()),
        }
    }
}

/// The emission contract.
///
/// Attribute calls apply to the most recently started element and must come
/// before any child content. Elements with no content are rendered
/// self-closing (`<c r="A1"/>`).
pub trait XmlEmit {
    fn start_document(&mut self);
    fn end_document(&mut self);
    /// Open an element. When `ns` is given, a default-namespace declaration
    /// is emitted on this element (used only at part roots).
    fn start_element(&mut self, local: &str, ns: Option<&str>);
    fn attribute(&mut self, name: &str, value: &str);
    fn characters(&mut self, text: &str);
    fn end_element(&mut self);
    fn flush(&mut self);
    /// Take the finished bytes out of the emitter.
    fn take(&mut self) -> Vec<u8>;
}

/// Open an element and write its attributes in the order given.
///
/// This is the preferred way to achieve deterministic attribute order: the
/// caller lists the pairs once, in schema order.
pub fn with_attributes(w: &mut dyn XmlEmit, local: &str, ns: Option<&str>, attrs: &[(&str, &str)]) {
    w.start_element(local, ns);
    for (name, value) in attrs {
        w.attribute(name, value);
    }
}

/// Write a `<local>text</local>` element, adding `xml:space="preserve"` when
/// the content is whitespace-sensitive.
pub fn text_element(w: &mut dyn XmlEmit, local: &str, text: &str) {
    w.start_element(local, None);
    if needs_space_preserve(text) {
        w.attribute("xml:space", "preserve");
    }
    w.characters(text);
    w.end_element();
}

/// Write an integer attribute without going through `format!`.
pub fn int_attribute(w: &mut dyn XmlEmit, name: &str, value: u64) {
    let mut buf = itoa::Buffer::new();
    w.attribute(name, buf.format(value));
}
