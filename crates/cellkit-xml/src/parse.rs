//! Guarded event-driven XML reader shared by all part parsers.
//!
//! Wraps `quick_xml::Reader` with the protections every parser needs: UTF-8
//! validation, `<!DOCTYPE>` rejection (XXE), error mapping into
//! [`ParseError`] with the part location, and helpers for collecting
//! attributes and capturing unknown subtrees as [`RawElement`] residue.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;

use crate::error::{ParseError, Result};
use crate::raw::{RawElement, RawNode};

/// Event reader over one part's bytes.
pub struct XmlParser<'a> {
    reader: Reader<&'a [u8]>,
    location: String,
}

impl<'a> std::fmt::Debug for XmlParser<'a> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlParser")
            .field("location", &self.location)
            .finish()
    }
}

impl<'a> XmlParser<'a> {
    /// Create a parser for the part at `location` (the ZIP entry name).
    ///
    /// Fails if the bytes are not valid UTF-8. A leading byte-order mark is
    /// tolerated.
    pub fn new(location: &str, bytes: &'a [u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
        if std::str::from_utf8(bytes).is_err() {
            return Err(ParseError::new(
                location,
                "XML parse error: part is not valid UTF-8",
            ));
        }
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(false);
        Ok(Self {
            reader,
            location: location.to_string(),
        })
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Build a [`ParseError`] at this part's location.
    pub fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(&self.location, message)
    }

    /// Read the next event, rejecting DOCTYPE declarations.
    pub fn next(&mut self) -> Result<Event<'a>> {
        match self.reader.read_event() {
            Ok(Event::DocType(_)) => Err(self.error(
                "XML parse error: DOCTYPE declarations and external entities are not allowed",
            )),
            Ok(event) => Ok(event),
            Err(e) => Err(self.error(format!("XML parse error: {e}"))),
        }
    }

    /// Advance to the first element of the document and capture it whole.
    /// Returns `None` on an element-free document.
    pub fn next_element(&mut self) -> Result<Option<RawElement>> {
        loop {
            match self.next()? {
                Event::Start(e) => return Ok(Some(self.read_raw(&e, false)?)),
                Event::Empty(e) => return Ok(Some(self.read_raw(&e, true)?)),
                Event::Eof => return Ok(None),
                _ => {}
            }
        }
    }

    /// Advance to the root element and verify its local name.
    ///
    /// Returns the root's start tag; the caller then iterates children.
    pub fn expect_root(&mut self, local: &str) -> Result<BytesStart<'a>> {
        loop {
            match self.next()? {
                Event::Start(e) => {
                    if local_name(e.name()) != local {
                        return Err(self.error(format!(
                            "expected root element '{local}', found '{}'",
                            qualified_name(e.name())
                        )));
                    }
                    return Ok(e);
                }
                Event::Empty(e) => {
                    return Err(self.error(format!(
                        "root element '{}' is empty",
                        qualified_name(e.name())
                    )));
                }
                Event::Eof => {
                    return Err(self.error(format!("expected root element '{local}', found end of file")))
                }
                _ => {}
            }
        }
    }

    /// Collect an element's attributes as qualified-name/value pairs, in
    /// source order.
    pub fn attrs(&self, e: &BytesStart<'_>) -> Result<Vec<(String, String)>> {
        let mut pairs = Vec::new();
        for attr in e.attributes() {
            let attr = attr.map_err(|e| self.error(format!("XML parse error: {e}")))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| self.error(format!("XML parse error: {e}")))?
                .into_owned();
            pairs.push((key, value));
        }
        Ok(pairs)
    }

    /// Capture the element opened by `start` (and its whole subtree) as a
    /// [`RawElement`]. `empty` marks a self-closing tag.
    pub fn read_raw(&mut self, start: &BytesStart<'_>, empty: bool) -> Result<RawElement> {
        let mut element = RawElement {
            name: qualified_name(start.name()),
            attrs: self.attrs(start)?,
            children: Vec::new(),
        };
        if empty {
            return Ok(element);
        }
        loop {
            match self.next()? {
                Event::Start(e) => {
                    let child = self.read_raw(&e, false)?;
                    element.children.push(RawNode::Element(child));
                }
                Event::Empty(e) => {
                    let child = self.read_raw(&e, true)?;
                    element.children.push(RawNode::Element(child));
                }
                Event::Text(t) => {
                    let text = t
                        .unescape()
                        .map_err(|e| self.error(format!("XML parse error: {e}")))?;
                    // Inter-element pretty-printing is dropped, but
                    // whitespace is content under xml:space="preserve".
                    let preserve = element.attr("xml:space") == Some("preserve");
                    if preserve || !text.trim().is_empty() {
                        element.children.push(RawNode::Text(text.into_owned()));
                    }
                }
                Event::CData(c) => {
                    let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                    element.children.push(RawNode::Text(text));
                }
                Event::End(_) => return Ok(element),
                Event::Eof => {
                    return Err(self.error(format!(
                        "XML parse error: unexpected end of file inside '{}'",
                        element.name
                    )))
                }
                _ => {}
            }
        }
    }

    /// Read the text content of the element just opened, up to its end tag.
    /// Nested elements are an error.
    pub fn read_text(&mut self, name: &str) -> Result<String> {
        let mut text = String::new();
        loop {
            match self.next()? {
                Event::Text(t) => {
                    text.push_str(
                        &t.unescape()
                            .map_err(|e| self.error(format!("XML parse error: {e}")))?,
                    );
                }
                Event::CData(c) => text.push_str(&String::from_utf8_lossy(&c.into_inner())),
                Event::End(_) => return Ok(text),
                Event::Eof => {
                    return Err(self.error(format!(
                        "XML parse error: unexpected end of file inside '{name}'"
                    )))
                }
                Event::Start(e) => {
                    return Err(self.error(format!(
                        "unexpected element '{}' inside '{name}'",
                        qualified_name(e.name())
                    )))
                }
                _ => {}
            }
        }
    }

    /// Consume and discard the subtree of the element just opened.
    pub fn skip_element(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.next()? {
                Event::Start(_) => depth += 1,
                Event::End(_) => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                Event::Eof => return Err(self.error("XML parse error: unexpected end of file")),
                _ => {}
            }
        }
    }
}

/// Local part of a qualified name.
pub fn local_name(name: QName<'_>) -> String {
    String::from_utf8_lossy(name.local_name().as_ref()).into_owned()
}

/// Qualified name including any prefix.
pub fn qualified_name(name: QName<'_>) -> String {
    String::from_utf8_lossy(name.as_ref()).into_owned()
}

/// Parse an OOXML boolean attribute value ("1"/"true" are true).
pub fn parse_bool(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}
