//! Rich (per-run formatted) text.
//!
//! Each run carries an optional typed [`Font`] and, when the run came from a
//! parsed file, the exact `<rPr>` element it was read from. The raw form
//! wins on write: it is exactly what Excel wrote, including children the
//! typed font does not model.

use cellkit_xml::raw::RawElement;
use cellkit_xml::shared_strings::{RichTextXml, RunXml};
use cellkit_xml::styles::Font;

/// One run of formatted text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TextRun {
    pub text: String,
    pub font: Option<Font>,
    /// The source `<rPr>` element, written verbatim when present.
    pub raw_rpr: Option<RawElement>,
}

impl TextRun {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font: None,
            raw_rpr: None,
        }
    }

    pub fn styled(text: impl Into<String>, font: Font) -> Self {
        Self {
            text: text.into(),
            font: Some(font),
            raw_rpr: None,
        }
    }
}

/// An ordered sequence of text runs.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RichText {
    pub runs: Vec<TextRun>,
}

impl RichText {
    /// A single unstyled run.
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            runs: vec![TextRun::plain(text)],
        }
    }

    /// Concatenated text of all runs.
    pub fn to_plain_text(&self) -> String {
        self.runs.iter().map(|r| r.text.as_str()).collect()
    }

    /// True when the value is a single run with no formatting.
    pub fn is_plain(&self) -> bool {
        self.runs.len() == 1 && self.runs[0].font.is_none() && self.runs[0].raw_rpr.is_none()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.iter().all(|r| r.text.is_empty())
    }

    /// Build from the wire-level representation.
    pub fn from_wire(xml: &RichTextXml) -> Self {
        Self {
            runs: xml
                .runs
                .iter()
                .map(|run| TextRun {
                    text: run.text.clone(),
                    font: run.rpr.as_ref().map(|rpr| Font::from_raw(rpr, "rFont")),
                    raw_rpr: run.rpr.clone(),
                })
                .collect(),
        }
    }

    /// Convert to the wire-level representation. A run's preserved `<rPr>`
    /// wins over its typed font.
    pub fn to_wire(&self) -> RichTextXml {
        RichTextXml {
            runs: self
                .runs
                .iter()
                .map(|run| RunXml {
                    rpr: match (&run.raw_rpr, &run.font) {
                        (Some(raw), _) => Some(raw.clone()),
                        (None, Some(font)) => Some(font_to_rpr(font)),
                        (None, None) => None,
                    },
                    text: run.text.clone(),
                })
                .collect(),
            other_children: Vec::new(),
        }
    }
}

impl From<&str> for RichText {
    fn from(s: &str) -> Self {
        RichText::plain(s)
    }
}

/// Build an `<rPr>` element from a typed font, mirroring the font-table
/// child order with `rFont` for the face name.
fn font_to_rpr(font: &Font) -> RawElement {
    use cellkit_xml::raw::RawNode;

    let mut rpr = RawElement::new("rPr");
    let mut push = |e: RawElement| rpr.children.push(RawNode::Element(e));

    if font.bold {
        push(RawElement::new("b"));
    }
    if font.italic {
        push(RawElement::new("i"));
    }
    if font.strike {
        push(RawElement::new("strike"));
    }
    if let Some(val) = &font.underline {
        let mut u = RawElement::new("u");
        if let Some(val) = val {
            u.attrs.push(("val".to_string(), val.clone()));
        }
        push(u);
    }
    if let Some(size) = &font.size {
        let mut sz = RawElement::new("sz");
        sz.attrs.push(("val".to_string(), size.clone()));
        push(sz);
    }
    if let Some(color) = &font.color {
        if let Ok(color_el) = RawElement::parse_fragment(&color_fragment(color)) {
            push(color_el);
        }
    }
    if let Some(name) = &font.name {
        let mut rfont = RawElement::new("rFont");
        rfont.attrs.push(("val".to_string(), name.clone()));
        push(rfont);
    }
    if let Some(family) = font.family {
        let mut el = RawElement::new("family");
        el.attrs.push(("val".to_string(), family.to_string()));
        push(el);
    }
    if let Some(charset) = font.charset {
        let mut el = RawElement::new("charset");
        el.attrs.push(("val".to_string(), charset.to_string()));
        push(el);
    }
    if let Some(scheme) = &font.scheme {
        let mut el = RawElement::new("scheme");
        el.attrs.push(("val".to_string(), scheme.clone()));
        push(el);
    }
    for child in &font.other_children {
        rpr.children.push(RawNode::Element(child.clone()));
    }
    rpr
}

fn color_fragment(color: &cellkit_xml::styles::Color) -> String {
    use cellkit_xml::emit::{XmlBackend, XmlEmit};
    let mut w = XmlBackend::Stream.emitter();
    color.emit(w.as_mut(), "color");
    String::from_utf8(w.take()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_construction() {
        let rich = RichText::plain("hello");
        assert!(rich.is_plain());
        assert_eq!(rich.to_plain_text(), "hello");
    }

    #[test]
    fn test_to_plain_text_concatenates_runs() {
        let rich = RichText {
            runs: vec![TextRun::plain("Bold"), TextRun::plain(" Normal")],
        };
        assert_eq!(rich.to_plain_text(), "Bold Normal");
    }

    #[test]
    fn test_wire_roundtrip_preserves_raw_rpr() {
        let rpr = RawElement::parse_fragment(r#"<rPr><u val="singleAccounting"/><vertAlign val="superscript"/></rPr>"#)
            .unwrap();
        let wire = RichTextXml {
            runs: vec![RunXml {
                rpr: Some(rpr.clone()),
                text: "x".to_string(),
            }],
            other_children: Vec::new(),
        };
        let rich = RichText::from_wire(&wire);
        assert_eq!(rich.runs[0].raw_rpr, Some(rpr.clone()));
        // The typed view exists alongside the raw form.
        assert_eq!(
            rich.runs[0].font.as_ref().unwrap().underline,
            Some(Some("singleAccounting".to_string()))
        );
        // Raw wins on the way back out.
        let back = rich.to_wire();
        assert_eq!(back.runs[0].rpr, Some(rpr));
    }

    #[test]
    fn test_styled_run_builds_rpr_from_font() {
        let font = Font {
            bold: true,
            size: Some("9".to_string()),
            name: Some("Tahoma".to_string()),
            ..Font::default()
        };
        let rich = RichText {
            runs: vec![TextRun::styled("note", font)],
        };
        let wire = rich.to_wire();
        let rpr = wire.runs[0].rpr.as_ref().unwrap();
        assert_eq!(
            rpr.to_xml(),
            r#"<rPr><b/><sz val="9"/><rFont val="Tahoma"/></rPr>"#
        );
    }

    #[test]
    fn test_is_empty() {
        assert!(RichText::default().is_empty());
        assert!(RichText::plain("").is_empty());
        assert!(!RichText::plain("x").is_empty());
    }

    #[test]
    fn test_from_str() {
        let rich: RichText = "abc".into();
        assert_eq!(rich.to_plain_text(), "abc");
    }
}
