//! DOM-building XML emission backend.
//!
//! Collects the part into an in-memory element tree and renders it once on
//! `end_document`. Rendering rules match the streaming backend exactly so the
//! two produce identical bytes for identical emitter call sequences.

use crate::emit::{XmlEmit, XML_DECLARATION};
use crate::escape::push_escaped;

#[derive(Debug, Clone)]
enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    children: Vec<Node>,
}

impl Element {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    fn render(&self, out: &mut Vec<u8>) {
        out.push(b'<');
        out.extend_from_slice(self.name.as_bytes());
        for (name, value) in &self.attrs {
            out.push(b' ');
            out.extend_from_slice(name.as_bytes());
            out.extend_from_slice(b"=\"");
            push_escaped(out, value);
            out.push(b'"');
        }
        if self.children.is_empty() {
            out.extend_from_slice(b"/>");
            return;
        }
        out.push(b'>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.render(out),
                Node::Text(t) => push_escaped(out, t),
            }
        }
        out.extend_from_slice(b"</");
        out.extend_from_slice(self.name.as_bytes());
        out.push(b'>');
    }
}

/// Tree-building implementation of [`XmlEmit`].
pub struct DomXmlWriter {
    /// Finished top-level content (the declaration plus the rendered root).
    buf: Vec<u8>,
    /// Elements currently open, outermost first.
    stack: Vec<Element>,
}

impl DomXmlWriter {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(8192),
            stack: Vec::new(),
        }
    }
}

impl Default for DomXmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlEmit for DomXmlWriter {
    fn start_document(&mut self) {
        self.buf.extend_from_slice(XML_DECLARATION.as_bytes());
    }

    fn end_document(&mut self) {
        while !self.stack.is_empty() {
            self.end_element();
        }
    }

    fn start_element(&mut self, local: &str, ns: Option<&str>) {
        let mut element = Element::new(local);
        if let Some(uri) = ns {
            element.attrs.push(("xmlns".to_string(), uri.to_string()));
        }
        self.stack.push(element);
    }

    fn attribute(&mut self, name: &str, value: &str) {
        if let Some(current) = self.stack.last_mut() {
            current.attrs.push((name.to_string(), value.to_string()));
        }
    }

    fn characters(&mut self, text: &str) {
        if let Some(current) = self.stack.last_mut() {
            current.children.push(Node::Text(text.to_string()));
        }
    }

    fn end_element(&mut self) {
        let Some(done) = self.stack.pop() else {
            return;
        };
        match self.stack.last_mut() {
            Some(parent) => parent.children.push(Node::Element(done)),
            None => done.render(&mut self.buf),
        }
    }

    fn flush(&mut self) {}

    fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}
