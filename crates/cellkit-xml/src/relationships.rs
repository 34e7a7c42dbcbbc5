//! Relationship (`.rels`) part parsing and regeneration.
//!
//! Used for `_rels/.rels`, `xl/_rels/workbook.xml.rels`, and per-sheet
//! relationship files.

use quick_xml::events::Event;

use crate::emit::{XmlBackend, XmlEmit};
use crate::error::Result;
use crate::namespaces;
use crate::parse::XmlParser;
use crate::raw::RawElement;

/// Individual relationship entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    /// `TargetMode` attribute; omitted on write when absent.
    pub target_mode: Option<String>,
    pub other_attrs: Vec<(String, String)>,
}

impl Relationship {
    pub fn new(id: impl Into<String>, rel_type: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rel_type: rel_type.into(),
            target: target.into(),
            target_mode: None,
            other_attrs: Vec::new(),
        }
    }
}

/// Parsed relationships part.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Relationships {
    pub relationships: Vec<Relationship>,
    pub other_children: Vec<RawElement>,
}

impl Relationships {
    /// Parse a `.rels` part.
    pub fn parse(location: &str, bytes: &[u8]) -> Result<Self> {
        let mut parser = XmlParser::new(location, bytes)?;
        parser.expect_root("Relationships")?;

        let mut rels = Relationships::default();
        loop {
            let raw = match parser.next()? {
                Event::Start(e) => parser.read_raw(&e, false)?,
                Event::Empty(e) => parser.read_raw(&e, true)?,
                Event::End(_) | Event::Eof => break,
                _ => continue,
            };
            if raw.name == "Relationship" {
                let mut rel = Relationship {
                    id: String::new(),
                    rel_type: String::new(),
                    target: String::new(),
                    target_mode: None,
                    other_attrs: Vec::new(),
                };
                for (name, value) in raw.attrs {
                    match name.as_str() {
                        "Id" => rel.id = value,
                        "Type" => rel.rel_type = value,
                        "Target" => rel.target = value,
                        "TargetMode" => rel.target_mode = Some(value),
                        _ => rel.other_attrs.push((name, value)),
                    }
                }
                rels.relationships.push(rel);
            } else {
                rels.other_children.push(raw);
            }
        }
        Ok(rels)
    }

    /// Find a relationship by its `Id`.
    pub fn by_id(&self, id: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.id == id)
    }

    /// First relationship of the given type.
    pub fn by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.rel_type == rel_type)
    }

    /// Next unused relationship id of the form `rIdN`.
    pub fn next_rid(&self) -> String {
        let max = self
            .relationships
            .iter()
            .filter_map(|r| r.id.strip_prefix("rId"))
            .filter_map(|n| n.parse::<u32>().ok())
            .max()
            .unwrap_or(0);
        format!("rId{}", max + 1)
    }

    /// Serialize back to XML bytes.
    ///
    /// Relationships are emitted sorted by the numeric suffix of their `Id`,
    /// so `rId10` follows `rId9` rather than `rId1`.
    pub fn to_xml(&self, backend: XmlBackend) -> Vec<u8> {
        let mut sorted: Vec<&Relationship> = self.relationships.iter().collect();
        sorted.sort_by_key(|r| rid_sort_key(&r.id));

        let mut w = backend.emitter();
        w.start_document();
        w.start_element("Relationships", Some(namespaces::PACKAGE_RELATIONSHIPS));
        for rel in sorted {
            w.start_element("Relationship", None);
            w.attribute("Id", &rel.id);
            w.attribute("Type", &rel.rel_type);
            w.attribute("Target", &rel.target);
            if let Some(mode) = &rel.target_mode {
                w.attribute("TargetMode", mode);
            }
            for (name, value) in &rel.other_attrs {
                w.attribute(name, value);
            }
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

/// Sort key ordering `rIdN` ids numerically, non-conforming ids last in
/// lexicographic order.
fn rid_sort_key(id: &str) -> (u8, u32, String) {
    match id.strip_prefix("rId").and_then(|n| n.parse::<u32>().ok()) {
        Some(n) => (0, n, String::new()),
        None => (1, 0, id.to_string()),
    }
}

/// Resolve a relationship target against the part that declared it.
///
/// `base_part` is the declaring part's entry name (e.g. `xl/workbook.xml`);
/// a relative target like `worksheets/sheet1.xml` resolves against its
/// directory, `../` segments are folded, and absolute targets (`/xl/...`)
/// are taken from the package root.
pub fn resolve_target(base_part: &str, target: &str) -> String {
    if let Some(abs) = target.strip_prefix('/') {
        return abs.to_string();
    }
    let mut segments: Vec<&str> = base_part.split('/').collect();
    segments.pop(); // the part's own file name
    for seg in target.split('/') {
        match seg {
            "." | "" => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Compute the relative target from one part to another.
pub fn relative_target(base_part: &str, target_part: &str) -> String {
    let base_dir: Vec<&str> = {
        let mut v: Vec<&str> = base_part.split('/').collect();
        v.pop();
        v
    };
    let target_segs: Vec<&str> = target_part.split('/').collect();

    let common = base_dir
        .iter()
        .zip(target_segs.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut out: Vec<String> = Vec::new();
    for _ in common..base_dir.len() {
        out.push("..".to_string());
    }
    for seg in &target_segs[common..] {
        out.push((*seg).to_string());
    }
    out.join("/")
}

/// The `_rels` sibling path for a part (e.g. `xl/workbook.xml` ->
/// `xl/_rels/workbook.xml.rels`).
pub fn rels_part_path(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Relationship type URI constants.
pub mod rel_types {
    // Package level
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";

    // Workbook level
    pub const WORKSHEET: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
    pub const SHARED_STRINGS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
    pub const STYLES: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
    pub const THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";

    // Worksheet level
    pub const COMMENTS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
    pub const VML_DRAWING: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/vmlDrawing";
    pub const DRAWING: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/drawing";
    pub const TABLE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/table";
    pub const HYPERLINK: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
    pub const PRINTER_SETTINGS: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/printerSettings";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_real_excel_rels() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;
        let rels = Relationships::parse("_rels/.rels", xml.as_bytes()).unwrap();
        assert_eq!(rels.relationships.len(), 1);
        assert_eq!(rels.relationships[0].id, "rId1");
        assert_eq!(rels.relationships[0].rel_type, rel_types::OFFICE_DOCUMENT);
        assert_eq!(rels.relationships[0].target, "xl/workbook.xml");
        assert!(rels.relationships[0].target_mode.is_none());
    }

    #[test]
    fn test_target_mode_roundtrip() {
        let xml = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/></Relationships>"#;
        let rels = Relationships::parse("r", xml.as_bytes()).unwrap();
        assert_eq!(
            rels.relationships[0].target_mode.as_deref(),
            Some("External")
        );
        let out = String::from_utf8(rels.to_xml(XmlBackend::Dom)).unwrap();
        assert!(out.contains("TargetMode=\"External\""));
    }

    #[test]
    fn test_target_mode_omitted_when_absent() {
        let mut rels = Relationships::default();
        rels.relationships
            .push(Relationship::new("rId1", rel_types::WORKSHEET, "worksheets/sheet1.xml"));
        let out = String::from_utf8(rels.to_xml(XmlBackend::Stream)).unwrap();
        assert!(!out.contains("TargetMode"));
    }

    #[test]
    fn test_write_sorts_by_numeric_id_suffix() {
        let mut rels = Relationships::default();
        for id in ["rId10", "rId2", "rId1"] {
            rels.relationships
                .push(Relationship::new(id, rel_types::WORKSHEET, "t"));
        }
        let out = String::from_utf8(rels.to_xml(XmlBackend::Dom)).unwrap();
        let p1 = out.find("rId1\"").unwrap();
        let p2 = out.find("rId2\"").unwrap();
        let p10 = out.find("rId10\"").unwrap();
        assert!(p1 < p2 && p2 < p10, "{out}");
    }

    #[test]
    fn test_next_rid() {
        let mut rels = Relationships::default();
        assert_eq!(rels.next_rid(), "rId1");
        rels.relationships
            .push(Relationship::new("rId7", rel_types::STYLES, "styles.xml"));
        assert_eq!(rels.next_rid(), "rId8");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("xl/workbook.xml", "worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "../comments1.xml"),
            "xl/comments1.xml"
        );
        assert_eq!(
            resolve_target("xl/worksheets/sheet1.xml", "/xl/styles.xml"),
            "xl/styles.xml"
        );
        assert_eq!(resolve_target("_rels/.rels", "xl/workbook.xml"), "xl/workbook.xml");
    }

    #[test]
    fn test_relative_target() {
        assert_eq!(
            relative_target("xl/workbook.xml", "xl/worksheets/sheet1.xml"),
            "worksheets/sheet1.xml"
        );
        assert_eq!(
            relative_target("xl/worksheets/sheet1.xml", "xl/comments1.xml"),
            "../comments1.xml"
        );
        assert_eq!(
            relative_target("xl/worksheets/sheet2.xml", "xl/drawings/vmlDrawing2.vml"),
            "../drawings/vmlDrawing2.vml"
        );
    }

    #[test]
    fn test_rels_part_path() {
        assert_eq!(rels_part_path("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(
            rels_part_path("xl/worksheets/sheet3.xml"),
            "xl/worksheets/_rels/sheet3.xml.rels"
        );
    }

    #[test]
    fn test_by_id_and_by_type() {
        let mut rels = Relationships::default();
        rels.relationships
            .push(Relationship::new("rId1", rel_types::STYLES, "styles.xml"));
        rels.relationships
            .push(Relationship::new("rId2", rel_types::COMMENTS, "../comments1.xml"));
        assert_eq!(rels.by_id("rId2").unwrap().rel_type, rel_types::COMMENTS);
        assert_eq!(rels.by_type(rel_types::STYLES).unwrap().id, "rId1");
        assert!(rels.by_id("rId9").is_none());
    }

    #[test]
    fn test_roundtrip() {
        let xml = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;
        let rels = Relationships::parse("xl/_rels/workbook.xml.rels", xml.as_bytes()).unwrap();
        let bytes = rels.to_xml(XmlBackend::Stream);
        let back = Relationships::parse("xl/_rels/workbook.xml.rels", &bytes).unwrap();
        assert_eq!(rels, back);
    }
}
