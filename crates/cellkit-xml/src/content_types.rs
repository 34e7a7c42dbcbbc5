//! `[Content_Types].xml` parsing and regeneration.
//!
//! Defines the content types for all parts in the OOXML package.

use quick_xml::events::Event;

use crate::emit::{with_attributes, XmlBackend, XmlEmit};
use crate::error::Result;
use crate::namespaces;
use crate::parse::XmlParser;
use crate::raw::RawElement;

/// Parsed `[Content_Types].xml`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentTypes {
    /// Extension-based defaults (`Extension`, `ContentType`), in source order.
    pub defaults: Vec<(String, String)>,
    /// Part-name overrides (`PartName`, `ContentType`), in source order.
    pub overrides: Vec<(String, String)>,
    /// Unknown attributes on the root element.
    pub other_attrs: Vec<(String, String)>,
    /// Unknown children, preserved verbatim.
    pub other_children: Vec<RawElement>,
}

impl ContentTypes {
    /// Parse `[Content_Types].xml` bytes.
    pub fn parse(location: &str, bytes: &[u8]) -> Result<Self> {
        let mut parser = XmlParser::new(location, bytes)?;
        let root = parser.expect_root("Types")?;

        let mut ct = ContentTypes::default();
        for (name, value) in parser.attrs(&root)? {
            if name != "xmlns" {
                ct.other_attrs.push((name, value));
            }
        }

        loop {
            let raw = match parser.next()? {
                Event::Start(e) => parser.read_raw(&e, false)?,
                Event::Empty(e) => parser.read_raw(&e, true)?,
                Event::End(_) | Event::Eof => break,
                _ => continue,
            };
            match raw.name.as_str() {
                "Default" => {
                    let ext = raw.attr("Extension").unwrap_or_default().to_string();
                    let mime = raw.attr("ContentType").unwrap_or_default().to_string();
                    ct.defaults.push((ext, mime));
                }
                "Override" => {
                    let part = raw.attr("PartName").unwrap_or_default().to_string();
                    let mime = raw.attr("ContentType").unwrap_or_default().to_string();
                    ct.overrides.push((part, mime));
                }
                _ => ct.other_children.push(raw),
            }
        }

        Ok(ct)
    }

    /// Content type registered for a part, consulting overrides first and
    /// extension defaults second.
    pub fn content_type_of(&self, part_name: &str) -> Option<&str> {
        let key = format!("/{}", part_name.trim_start_matches('/'));
        if let Some((_, ct)) = self.overrides.iter().find(|(p, _)| *p == key) {
            return Some(ct);
        }
        let ext = part_name.rsplit('.').next()?;
        self.defaults
            .iter()
            .find(|(e, _)| e.eq_ignore_ascii_case(ext))
            .map(|(_, ct)| ct.as_str())
    }

    /// True when any override targets the given part name.
    pub fn has_override(&self, part_name: &str) -> bool {
        let key = format!("/{}", part_name.trim_start_matches('/'));
        self.overrides.iter().any(|(p, _)| *p == key)
    }

    /// Register an override, replacing any existing one for the same part.
    pub fn set_override(&mut self, part_name: &str, content_type: &str) {
        let key = format!("/{}", part_name.trim_start_matches('/'));
        self.overrides.retain(|(p, _)| *p != key);
        self.overrides.push((key, content_type.to_string()));
    }

    /// Remove the override for a part, if present.
    pub fn remove_override(&mut self, part_name: &str) {
        let key = format!("/{}", part_name.trim_start_matches('/'));
        self.overrides.retain(|(p, _)| *p != key);
    }

    /// Register an extension default if it is not already present.
    pub fn ensure_default(&mut self, extension: &str, content_type: &str) {
        if !self.defaults.iter().any(|(e, _)| e == extension) {
            self.defaults
                .push((extension.to_string(), content_type.to_string()));
        }
    }

    /// Serialize back to XML bytes.
    pub fn to_xml(&self, backend: XmlBackend) -> Vec<u8> {
        let mut w = backend.emitter();
        w.start_document();
        w.start_element("Types", Some(namespaces::CONTENT_TYPES));
        for (name, value) in &self.other_attrs {
            w.attribute(name, value);
        }
        for (ext, ct) in &self.defaults {
            with_attributes(
                w.as_mut(),
                "Default",
                None,
                &[("Extension", ext), ("ContentType", ct)],
            );
            w.end_element();
        }
        for (part, ct) in &self.overrides {
            with_attributes(
                w.as_mut(),
                "Override",
                None,
                &[("PartName", part), ("ContentType", ct)],
            );
            w.end_element();
        }
        for child in &self.other_children {
            child.emit(w.as_mut());
        }
        w.end_element();
        w.end_document();
        w.take()
    }
}

/// Minimal content types for a fully regenerated workbook.
///
/// `sheet_count` sheets are registered, plus styles/shared-strings overrides
/// when present and comment + VML parts for each sheet index (0-based) in
/// `sheets_with_comments`.
pub fn build_content_types(
    sheet_count: usize,
    has_styles: bool,
    has_shared_strings: bool,
    sheets_with_comments: &[usize],
    table_part_numbers: &[u32],
) -> ContentTypes {
    let mut ct = ContentTypes::default();
    ct.defaults
        .push(("rels".to_string(), mime_types::RELS.to_string()));
    ct.defaults
        .push(("xml".to_string(), mime_types::XML.to_string()));
    if !sheets_with_comments.is_empty() {
        ct.defaults
            .push(("vml".to_string(), mime_types::VML_DRAWING.to_string()));
    }
    ct.set_override("xl/workbook.xml", mime_types::WORKBOOK);
    for i in 0..sheet_count {
        ct.set_override(
            &format!("xl/worksheets/sheet{}.xml", i + 1),
            mime_types::WORKSHEET,
        );
    }
    if has_styles {
        ct.set_override("xl/styles.xml", mime_types::STYLES);
    }
    if has_shared_strings {
        ct.set_override("xl/sharedStrings.xml", mime_types::SHARED_STRINGS);
    }
    for &i in sheets_with_comments {
        ct.set_override(&format!("xl/comments{}.xml", i + 1), mime_types::COMMENTS);
    }
    for &n in table_part_numbers {
        ct.set_override(&format!("xl/tables/table{n}.xml"), mime_types::TABLE);
    }
    ct
}

/// Standard content type MIME string constants.
pub mod mime_types {
    // Default extensions
    pub const RELS: &str = "application/vnd.openxmlformats-package.relationships+xml";
    pub const XML: &str = "application/xml";

    // Workbook
    pub const WORKBOOK: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml";

    // Worksheet
    pub const WORKSHEET: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml";

    // Shared elements
    pub const SHARED_STRINGS: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml";
    pub const STYLES: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";
    pub const THEME: &str = "application/vnd.openxmlformats-officedocument.theme+xml";

    // Table
    pub const TABLE: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml";

    // Comments and their VML sidecars
    pub const COMMENTS: &str =
        "application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml";
    pub const VML_DRAWING: &str = "application/vnd.openxmlformats-officedocument.vmlDrawing";
}
