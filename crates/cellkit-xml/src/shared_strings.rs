//! `xl/sharedStrings.xml` parsing and regeneration.
//!
//! Plain and rich-text entries are represented uniformly: a plain `<si><t>`
//! becomes one unstyled run. Run properties (`<rPr>`) are captured verbatim
//! as residue; when present they win over any typed font on write, because
//! they are exactly what Excel wrote.

use quick_xml::events::Event;

use crate::emit::{text_element, XmlBackend, XmlEmit};
use crate::error::Result;
use crate::namespaces;
use crate::parse::XmlParser;
use crate::raw::RawElement;

/// One text run of a (possibly rich) string.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunXml {
    /// The `<rPr>` element exactly as parsed, when present.
    pub rpr: Option<RawElement>,
    pub text: String,
}

/// A string item: ordered runs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RichTextXml {
    pub runs: Vec<RunXml>,
    /// Children of `<si>`/`<is>` other than `<t>` and `<r>` (e.g.
    /// `<rPh>`/`<phoneticPr>`), preserved verbatim.
    pub other_children: Vec<RawElement>,
}

impl RichTextXml {
    /// A single unstyled run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            runs: vec![RunXml {
                rpr: None,
                text: text.into(),
            }],
            other_children: Vec::new(),
        }
    }

    /// True when this is representable as a plain `<t>` element.
    pub fn is_plain(&self) -> bool {
        self.runs.len() == 1 && self.runs[0].rpr.is_none() && self.other_children.is_empty()
    }

    /// Concatenated text of all runs.
    pub fn to_plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// Build from a captured `<si>` or `<is>` element.
    pub fn from_raw(raw: &RawElement) -> Self {
        let mut item = RichTextXml::default();
        for child in raw.children_named("t") {
            item.runs.push(RunXml {
                rpr: None,
                text: child.text(),
            });
        }
        for run in raw.children_named("r") {
            item.runs.push(RunXml {
                rpr: run.child("rPr").cloned(),
                text: run.child("t").map(|t| t.text()).unwrap_or_default(),
            });
        }
        for child in &raw.children {
            if let crate::raw::RawNode::Element(e) = child {
                if e.name != "t" && e.name != "r" && e.name != "rPr" {
                    item.other_children.push(e.clone());
                }
            }
        }
        item
    }

    /// Emit the body of an `<si>` or `<is>` element.
    pub fn emit_body(&self, w: &mut dyn XmlEmit) {
        if self.runs.len() == 1 && self.runs[0].rpr.is_none() {
            text_element(w, "t", &self.runs[0].text);
        } else {
            for run in &self.runs {
                w.start_element("r", None);
                if let Some(rpr) = &run.rpr {
                    rpr.emit(w);
                }
                text_element(w, "t", &run.text);
                w.end_element();
            }
        }
        for child in &self.other_children {
            child.emit(w);
        }
    }
}

/// Parsed `xl/sharedStrings.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SstXml {
    /// Number of string cell references in the workbook (`count`).
    pub count: Option<u64>,
    /// Number of `<si>` entries (`uniqueCount`).
    pub unique_count: Option<u64>,
    pub items: Vec<RichTextXml>,
    pub other_attrs: Vec<(String, String)>,
}

impl SstXml {
    /// Parse `xl/sharedStrings.xml` bytes.
    pub fn parse(location: &str, bytes: &[u8]) -> Result<Self> {
        let mut parser = XmlParser::new(location, bytes)?;
        let root = parser.expect_root("sst")?;

        let mut sst = SstXml::default();
        for (name, value) in parser.attrs(&root)? {
            match name.as_str() {
                "count" => sst.count = value.parse().ok(),
                "uniqueCount" => sst.unique_count = value.parse().ok(),
                "xmlns" => {}
                _ => sst.other_attrs.push((name, value)),
            }
        }

        loop {
            let raw = match parser.next()? {
                Event::Start(e) => parser.read_raw(&e, false)?,
                Event::Empty(e) => parser.read_raw(&e, true)?,
                Event::End(_) | Event::Eof => break,
                _ => continue,
            };
            if raw.name == "si" {
                sst.items.push(RichTextXml::from_raw(&raw));
            }
        }
        Ok(sst)
    }

    /// Serialize to XML bytes.
    ///
    /// `count` is the total number of cell references, `unique_count` the
    /// number of `<si>` entries; the caller maintains `count >= uniqueCount`.
    pub fn to_xml(&self, backend: XmlBackend) -> Vec<u8> {
        let mut w = backend.emitter();
        w.start_document();
        w.start_element("sst", Some(namespaces::SPREADSHEET_ML));
        let mut buf = itoa::Buffer::new();
        if let Some(count) = self.count {
            w.attribute("count", buf.format(count));
        }
        if let Some(unique) = self.unique_count {
            w.attribute("uniqueCount", buf.format(unique));
        }
        for (name, value) in &self.other_attrs {
            w.attribute(name, value);
        }
        for item in &self.items {
            w.start_element("si", None);
            item.emit_body(w.as_mut());
            w.end_element();
        }
        w.end_element();
        w.end_document();
        w.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const REAL: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="5" uniqueCount="3">
  <si><t>Name</t></si>
  <si><t xml:space="preserve">  spaced  </t></si>
  <si><r><rPr><b/><sz val="11"/></rPr><t>Bold</t></r><r><t xml:space="preserve"> plain</t></r></si>
</sst>"#;

    #[test]
    fn test_parse_counts_and_items() {
        let sst = SstXml::parse("xl/sharedStrings.xml", REAL.as_bytes()).unwrap();
        assert_eq!(sst.count, Some(5));
        assert_eq!(sst.unique_count, Some(3));
        assert_eq!(sst.items.len(), 3);
    }

    #[test]
    fn test_plain_item_is_one_unstyled_run() {
        let sst = SstXml::parse("xl/sharedStrings.xml", REAL.as_bytes()).unwrap();
        assert!(sst.items[0].is_plain());
        assert_eq!(sst.items[0].to_plain_text(), "Name");
    }

    #[test]
    fn test_whitespace_preserved_on_parse_and_write() {
        let sst = SstXml::parse("xl/sharedStrings.xml", REAL.as_bytes()).unwrap();
        assert_eq!(sst.items[1].to_plain_text(), "  spaced  ");
        let out = String::from_utf8(sst.to_xml(XmlBackend::Dom)).unwrap();
        assert!(out.contains("<t xml:space=\"preserve\">  spaced  </t>"));
    }

    #[test]
    fn test_rich_runs_keep_rpr_verbatim() {
        let sst = SstXml::parse("xl/sharedStrings.xml", REAL.as_bytes()).unwrap();
        let rich = &sst.items[2];
        assert_eq!(rich.runs.len(), 2);
        let rpr = rich.runs[0].rpr.as_ref().unwrap();
        assert_eq!(rpr.to_xml(), "<rPr><b/><sz val=\"11\"/></rPr>");
        assert!(rich.runs[1].rpr.is_none());
        let out = String::from_utf8(sst.to_xml(XmlBackend::Stream)).unwrap();
        assert!(out.contains("<r><rPr><b/><sz val=\"11\"/></rPr><t>Bold</t></r>"));
        assert!(out.contains("<r><t xml:space=\"preserve\"> plain</t></r>"));
    }

    #[test]
    fn test_exotic_rpr_children_survive() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="1" uniqueCount="1"><si><r><rPr><u val="singleAccounting"/><vertAlign val="superscript"/><family val="2"/></rPr><t>x</t></r></si></sst>"#;
        let sst = SstXml::parse("xl/sharedStrings.xml", xml.as_bytes()).unwrap();
        let out = String::from_utf8(sst.to_xml(XmlBackend::Dom)).unwrap();
        assert!(out.contains(
            "<rPr><u val=\"singleAccounting\"/><vertAlign val=\"superscript\"/><family val=\"2\"/></rPr>"
        ));
    }

    #[test]
    fn test_roundtrip_equality() {
        let sst = SstXml::parse("xl/sharedStrings.xml", REAL.as_bytes()).unwrap();
        let bytes = sst.to_xml(XmlBackend::Dom);
        let back = SstXml::parse("xl/sharedStrings.xml", &bytes).unwrap();
        assert_eq!(sst, back);
    }

    #[test]
    fn test_backends_agree() {
        let sst = SstXml::parse("xl/sharedStrings.xml", REAL.as_bytes()).unwrap();
        assert_eq!(sst.to_xml(XmlBackend::Dom), sst.to_xml(XmlBackend::Stream));
    }

    #[test]
    fn test_phonetic_residue_preserved() {
        let xml = r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="1" uniqueCount="1"><si><t>東京</t><rPh sb="0" eb="2"><t>トウキョウ</t></rPh><phoneticPr fontId="1"/></si></sst>"#;
        let sst = SstXml::parse("xl/sharedStrings.xml", xml.as_bytes()).unwrap();
        assert_eq!(sst.items[0].other_children.len(), 2);
        let out = String::from_utf8(sst.to_xml(XmlBackend::Stream)).unwrap();
        assert!(out.contains("<rPh sb=\"0\" eb=\"2\"><t>トウキョウ</t></rPh>"));
        assert!(out.contains("<phoneticPr fontId=\"1\"/>"));
    }
}
