//! Opaque residue elements.
//!
//! Unknown children encountered by a part parser are captured as
//! [`RawElement`] trees and replayed verbatim on emission, after the known
//! fields, in their original relative order. This is the mechanism behind
//! forward compatibility and byte-faithful round-trips of future-version
//! schemas.

use crate::emit::XmlEmit;
use crate::error::{ParseError, Result};
use crate::parse::XmlParser;
use crate::stream_writer::StreamXmlWriter;

/// One child node of a raw element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawNode {
    Element(RawElement),
    Text(String),
}

/// A parsed XML element kept verbatim: qualified name, attributes in source
/// order, children in source order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<RawNode>,
}

impl RawElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Parse a standalone XML fragment whose root is the element to capture.
    pub fn parse_fragment(xml: &str) -> Result<Self> {
        let mut parser = XmlParser::new("fragment", xml.as_bytes())?;
        parser
            .next_element()?
            .ok_or_else(|| ParseError::new("fragment", "expected an element"))
    }

    /// Look up an attribute by its qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// First child element with the given qualified name.
    pub fn child(&self, name: &str) -> Option<&RawElement> {
        self.children.iter().find_map(|c| match c {
            RawNode::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// All child elements with the given qualified name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a RawElement> {
        self.children.iter().filter_map(move |c| match c {
            RawNode::Element(e) if e.name == name => Some(e),
            _ => None,
        })
    }

    /// Concatenated text content of this element (direct text children only).
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                RawNode::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Replay this element through an emitter.
    pub fn emit(&self, w: &mut dyn XmlEmit) {
        w.start_element(&self.name, None);
        for (name, value) in &self.attrs {
            w.attribute(name, value);
        }
        for child in &self.children {
            match child {
                RawNode::Element(e) => e.emit(w),
                RawNode::Text(t) => w.characters(t),
            }
        }
        w.end_element();
    }

    /// Render to a standalone string without an XML declaration.
    pub fn to_xml(&self) -> String {
        let mut w = StreamXmlWriter::new();
        self.emit(&mut w);
        String::from_utf8(w.take()).unwrap_or_default()
    }
}
