//! `xl/styles.xml` parsing and regeneration.
//!
//! The stylesheet is parsed into typed flat tables (`numFmts`, `fonts`,
//! `fills`, `borders`, `cellStyleXfs`, `cellXfs`, `cellStyles`, `dxfs`);
//! trailing sections and unknown children are preserved verbatim. Emission
//! follows the schema's required child order.

use quick_xml::events::Event;

use crate::emit::{XmlBackend, XmlEmit};
use crate::error::Result;
use crate::namespaces;
use crate::parse::{parse_bool, XmlParser};
use crate::raw::{RawElement, RawNode};

/// A `<color>` element. When multiple addressing attributes coexist, `rgb`
/// takes precedence over `theme`, which takes precedence over `indexed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Color {
    /// ARGB value (`rgb="FF00B050"`).
    Rgb(u32),
    /// Theme palette reference with optional tint. The tint is kept as its
    /// source text so serialization is full-precision and byte-stable.
    Theme { index: u32, tint: Option<String> },
    /// Legacy indexed palette entry (0-63 map to known ARGB values).
    Indexed(u32),
    /// `auto="1"`.
    Auto,
}

impl Color {
    /// Read a color from a captured `<color>`/`<fgColor>`/`<bgColor>`
    /// element. Returns `None` when no addressing attribute is present.
    pub fn from_raw(raw: &RawElement) -> Option<Self> {
        if let Some(rgb) = raw.attr("rgb") {
            return u32::from_str_radix(rgb, 16).ok().map(Color::Rgb);
        }
        if let Some(theme) = raw.attr("theme") {
            return theme.parse().ok().map(|index| Color::Theme {
                index,
                tint: raw.attr("tint").map(str::to_string),
            });
        }
        if let Some(indexed) = raw.attr("indexed") {
            return indexed.parse().ok().map(Color::Indexed);
        }
        if raw.attr("auto").is_some_and(parse_bool) {
            return Some(Color::Auto);
        }
        None
    }

    /// Emit as an element named `tag`.
    pub fn emit(&self, w: &mut dyn XmlEmit, tag: &str) {
        w.start_element(tag, None);
        match self {
            Color::Rgb(argb) => w.attribute("rgb", &format!("{argb:08X}")),
            Color::Theme { index, tint } => {
                let mut buf = itoa::Buffer::new();
                w.attribute("theme", buf.format(*index));
                if let Some(tint) = tint {
                    w.attribute("tint", tint);
                }
            }
            Color::Indexed(index) => {
                let mut buf = itoa::Buffer::new();
                w.attribute("indexed", buf.format(*index));
            }
            Color::Auto => w.attribute("auto", "1"),
        }
        w.end_element();
    }
}

/// A `<font>` table entry (also used for rich-text `<rPr>` conversion).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Font {
    pub bold: bool,
    pub italic: bool,
    pub strike: bool,
    /// Underline: `Some(None)` for a bare `<u/>`, `Some(Some(val))` for an
    /// explicit `val` attribute.
    pub underline: Option<Option<String>>,
    /// `<sz val>`, kept as source text.
    pub size: Option<String>,
    pub color: Option<Color>,
    pub name: Option<String>,
    pub family: Option<u32>,
    pub charset: Option<u32>,
    pub scheme: Option<String>,
    pub other_children: Vec<RawElement>,
}

impl Font {
    /// Build from a captured `<font>` (or `<rPr>`) element. `name_tag` is
    /// `"name"` in the font table and `"rFont"` inside run properties.
    pub fn from_raw(raw: &RawElement, name_tag: &str) -> Self {
        let mut font = Font::default();
        for node in &raw.children {
            let RawNode::Element(e) = node else { continue };
            match e.name.as_str() {
                "b" => font.bold = e.attr("val").map_or(true, parse_bool),
                "i" => font.italic = e.attr("val").map_or(true, parse_bool),
                "strike" => font.strike = e.attr("val").map_or(true, parse_bool),
                "u" => font.underline = Some(e.attr("val").map(str::to_string)),
                "sz" => font.size = e.attr("val").map(str::to_string),
                "color" => font.color = Color::from_raw(e),
                "family" => font.family = e.attr("val").and_then(|v| v.parse().ok()),
                "charset" => font.charset = e.attr("val").and_then(|v| v.parse().ok()),
                "scheme" => font.scheme = e.attr("val").map(str::to_string),
                n if n == name_tag => font.name = e.attr("val").map(str::to_string),
                _ => font.other_children.push(e.clone()),
            }
        }
        font
    }

    /// Emit as an element named `tag` with `name_tag` for the face name.
    pub fn emit(&self, w: &mut dyn XmlEmit, tag: &str, name_tag: &str) {
        let mut buf = itoa::Buffer::new();
        w.start_element(tag, None);
        if self.bold {
            w.start_element("b", None);
            w.end_element();
        }
        if self.italic {
            w.start_element("i", None);
            w.end_element();
        }
        if self.strike {
            w.start_element("strike", None);
            w.end_element();
        }
        if let Some(val) = &self.underline {
            w.start_element("u", None);
            if let Some(val) = val {
                w.attribute("val", val);
            }
            w.end_element();
        }
        if let Some(size) = &self.size {
            w.start_element("sz", None);
            w.attribute("val", size);
            w.end_element();
        }
        if let Some(color) = &self.color {
            color.emit(w, "color");
        }
        if let Some(name) = &self.name {
            w.start_element(name_tag, None);
            w.attribute("val", name);
            w.end_element();
        }
        if let Some(family) = self.family {
            w.start_element("family", None);
            w.attribute("val", buf.format(family));
            w.end_element();
        }
        if let Some(charset) = self.charset {
            w.start_element("charset", None);
            w.attribute("val", buf.format(charset));
            w.end_element();
        }
        if let Some(scheme) = &self.scheme {
            w.start_element("scheme", None);
            w.attribute("val", scheme);
            w.end_element();
        }
        for child in &self.other_children {
            child.emit(w);
        }
        w.end_element();
    }
}

/// A `<fill>` table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fill {
    Pattern(PatternFill),
    /// Gradient fills pass through verbatim.
    Gradient(RawElement),
}

impl Default for Fill {
    fn default() -> Self {
        Fill::none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PatternFill {
    pub pattern_type: Option<String>,
    pub fg_color: Option<Color>,
    pub bg_color: Option<Color>,
}

impl Fill {
    /// Fill index 0: `patternType="none"`.
    pub fn none() -> Self {
        Fill::Pattern(PatternFill {
            pattern_type: Some("none".to_string()),
            fg_color: None,
            bg_color: None,
        })
    }

    /// Fill index 1: `patternType="gray125"`.
    pub fn gray125() -> Self {
        Fill::Pattern(PatternFill {
            pattern_type: Some("gray125".to_string()),
            fg_color: None,
            bg_color: None,
        })
    }

    pub fn from_raw(raw: &RawElement) -> Self {
        if let Some(pattern) = raw.child("patternFill") {
            Fill::Pattern(PatternFill {
                pattern_type: pattern.attr("patternType").map(str::to_string),
                fg_color: pattern.child("fgColor").and_then(Color::from_raw),
                bg_color: pattern.child("bgColor").and_then(Color::from_raw),
            })
        } else if let Some(gradient) = raw.child("gradientFill") {
            Fill::Gradient(gradient.clone())
        } else {
            Fill::Pattern(PatternFill::default())
        }
    }

    pub fn emit(&self, w: &mut dyn XmlEmit) {
        w.start_element("fill", None);
        match self {
            Fill::Pattern(p) => {
                w.start_element("patternFill", None);
                if let Some(pt) = &p.pattern_type {
                    w.attribute("patternType", pt);
                }
                if let Some(fg) = &p.fg_color {
                    fg.emit(w, "fgColor");
                }
                if let Some(bg) = &p.bg_color {
                    bg.emit(w, "bgColor");
                }
                w.end_element();
            }
            Fill::Gradient(raw) => raw.emit(w),
        }
        w.end_element();
    }
}

/// One side of a `<border>`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BorderSide {
    pub style: Option<String>,
    pub color: Option<Color>,
}

impl BorderSide {
    fn from_raw(raw: &RawElement) -> Self {
        Self {
            style: raw.attr("style").map(str::to_string),
            color: raw.child("color").and_then(Color::from_raw),
        }
    }

    fn emit(&self, w: &mut dyn XmlEmit, tag: &str) {
        w.start_element(tag, None);
        if let Some(style) = &self.style {
            w.attribute("style", style);
        }
        if let Some(color) = &self.color {
            color.emit(w, "color");
        }
        w.end_element();
    }
}

/// A `<border>` table entry. Excel writes all five sides even when empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Border {
    pub diagonal_up: Option<bool>,
    pub diagonal_down: Option<bool>,
    pub left: Option<BorderSide>,
    pub right: Option<BorderSide>,
    pub top: Option<BorderSide>,
    pub bottom: Option<BorderSide>,
    pub diagonal: Option<BorderSide>,
}

impl Default for Border {
    fn default() -> Self {
        Self {
            diagonal_up: None,
            diagonal_down: None,
            left: Some(BorderSide::default()),
            right: Some(BorderSide::default()),
            top: Some(BorderSide::default()),
            bottom: Some(BorderSide::default()),
            diagonal: Some(BorderSide::default()),
        }
    }
}

impl Border {
    pub fn from_raw(raw: &RawElement) -> Self {
        Self {
            diagonal_up: raw.attr("diagonalUp").map(parse_bool),
            diagonal_down: raw.attr("diagonalDown").map(parse_bool),
            left: raw.child("left").map(BorderSide::from_raw),
            right: raw.child("right").map(BorderSide::from_raw),
            top: raw.child("top").map(BorderSide::from_raw),
            bottom: raw.child("bottom").map(BorderSide::from_raw),
            diagonal: raw.child("diagonal").map(BorderSide::from_raw),
        }
    }

    pub fn emit(&self, w: &mut dyn XmlEmit) {
        w.start_element("border", None);
        if let Some(up) = self.diagonal_up {
            w.attribute("diagonalUp", if up { "1" } else { "0" });
        }
        if let Some(down) = self.diagonal_down {
            w.attribute("diagonalDown", if down { "1" } else { "0" });
        }
        for (tag, side) in [
            ("left", &self.left),
            ("right", &self.right),
            ("top", &self.top),
            ("bottom", &self.bottom),
            ("diagonal", &self.diagonal),
        ] {
            if let Some(side) = side {
                side.emit(w, tag);
            }
        }
        w.end_element();
    }
}

/// A custom `<numFmt>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumFmt {
    pub id: u32,
    pub code: String,
}

/// Cell alignment settings, emitted only when at least one differs from the
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Alignment {
    pub horizontal: Option<String>,
    pub vertical: Option<String>,
    pub wrap_text: Option<bool>,
    pub indent: Option<u32>,
    pub shrink_to_fit: Option<bool>,
    pub text_rotation: Option<u32>,
    pub reading_order: Option<u32>,
    pub other_attrs: Vec<(String, String)>,
}

impl Alignment {
    pub fn is_default(&self) -> bool {
        self == &Alignment::default()
    }

    fn from_raw(raw: &RawElement) -> Self {
        let mut align = Alignment::default();
        for (name, value) in &raw.attrs {
            match name.as_str() {
                "horizontal" => align.horizontal = Some(value.clone()),
                "vertical" => align.vertical = Some(value.clone()),
                "wrapText" => align.wrap_text = Some(parse_bool(value)),
                "indent" => align.indent = value.parse().ok(),
                "shrinkToFit" => align.shrink_to_fit = Some(parse_bool(value)),
                "textRotation" => align.text_rotation = value.parse().ok(),
                "readingOrder" => align.reading_order = value.parse().ok(),
                _ => align.other_attrs.push((name.clone(), value.clone())),
            }
        }
        align
    }

    fn emit(&self, w: &mut dyn XmlEmit) {
        let mut buf = itoa::Buffer::new();
        w.start_element("alignment", None);
        if let Some(h) = &self.horizontal {
            w.attribute("horizontal", h);
        }
        if let Some(v) = &self.vertical {
            w.attribute("vertical", v);
        }
        if let Some(wrap) = self.wrap_text {
            w.attribute("wrapText", if wrap { "1" } else { "0" });
        }
        if let Some(indent) = self.indent {
            w.attribute("indent", buf.format(indent));
        }
        if let Some(shrink) = self.shrink_to_fit {
            w.attribute("shrinkToFit", if shrink { "1" } else { "0" });
        }
        if let Some(rotation) = self.text_rotation {
            w.attribute("textRotation", buf.format(rotation));
        }
        if let Some(order) = self.reading_order {
            w.attribute("readingOrder", buf.format(order));
        }
        for (name, value) in &self.other_attrs {
            w.attribute(name, value);
        }
        w.end_element();
    }
}

/// One `<xf>` record in `cellStyleXfs` or `cellXfs`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Xf {
    pub num_fmt_id: u32,
    pub font_id: u32,
    pub fill_id: u32,
    pub border_id: u32,
    pub xf_id: Option<u32>,
    pub apply_number_format: Option<bool>,
    pub apply_font: Option<bool>,
    pub apply_fill: Option<bool>,
    pub apply_border: Option<bool>,
    pub apply_alignment: Option<bool>,
    pub apply_protection: Option<bool>,
    pub alignment: Option<Alignment>,
    /// `<protection>` preserved verbatim.
    pub protection: Option<RawElement>,
    pub other_attrs: Vec<(String, String)>,
}

impl Xf {
    fn from_raw(raw: &RawElement) -> Self {
        let mut xf = Xf::default();
        for (name, value) in &raw.attrs {
            match name.as_str() {
                "numFmtId" => xf.num_fmt_id = value.parse().unwrap_or(0),
                "fontId" => xf.font_id = value.parse().unwrap_or(0),
                "fillId" => xf.fill_id = value.parse().unwrap_or(0),
                "borderId" => xf.border_id = value.parse().unwrap_or(0),
                "xfId" => xf.xf_id = value.parse().ok(),
                "applyNumberFormat" => xf.apply_number_format = Some(parse_bool(value)),
                "applyFont" => xf.apply_font = Some(parse_bool(value)),
                "applyFill" => xf.apply_fill = Some(parse_bool(value)),
                "applyBorder" => xf.apply_border = Some(parse_bool(value)),
                "applyAlignment" => xf.apply_alignment = Some(parse_bool(value)),
                "applyProtection" => xf.apply_protection = Some(parse_bool(value)),
                _ => xf.other_attrs.push((name.clone(), value.clone())),
            }
        }
        xf.alignment = raw.child("alignment").map(Alignment::from_raw);
        xf.protection = raw.child("protection").cloned();
        xf
    }

    fn emit(&self, w: &mut dyn XmlEmit) {
        let mut buf = itoa::Buffer::new();
        w.start_element("xf", None);
        w.attribute("numFmtId", buf.format(self.num_fmt_id));
        w.attribute("fontId", buf.format(self.font_id));
        w.attribute("fillId", buf.format(self.fill_id));
        w.attribute("borderId", buf.format(self.border_id));
        if let Some(xf_id) = self.xf_id {
            w.attribute("xfId", buf.format(xf_id));
        }
        for (name, value) in [
            ("applyNumberFormat", self.apply_number_format),
            ("applyFont", self.apply_font),
            ("applyFill", self.apply_fill),
            ("applyBorder", self.apply_border),
            ("applyAlignment", self.apply_alignment),
            ("applyProtection", self.apply_protection),
        ] {
            if let Some(v) = value {
                w.attribute(name, if v { "1" } else { "0" });
            }
        }
        for (name, value) in &self.other_attrs {
            w.attribute(name, value);
        }
        if let Some(align) = &self.alignment {
            if !align.is_default() {
                align.emit(w);
            }
        }
        if let Some(protection) = &self.protection {
            protection.emit(w);
        }
        w.end_element();
    }
}

/// One `<cellStyle>` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellStyleEntry {
    pub name: String,
    pub xf_id: u32,
    pub builtin_id: Option<u32>,
    pub other_attrs: Vec<(String, String)>,
}

impl CellStyleEntry {
    /// The mandatory "Normal" style.
    pub fn normal() -> Self {
        Self {
            name: "Normal".to_string(),
            xf_id: 0,
            builtin_id: Some(0),
            other_attrs: Vec::new(),
        }
    }
}

/// Parsed `xl/styles.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylesXml {
    pub root_attrs: Vec<(String, String)>,
    pub num_fmts: Vec<NumFmt>,
    pub fonts: Vec<Font>,
    pub fills: Vec<Fill>,
    pub borders: Vec<Border>,
    pub cell_style_xfs: Vec<Xf>,
    pub cell_xfs: Vec<Xf>,
    pub cell_styles: Vec<CellStyleEntry>,
    /// Differential formats preserved verbatim.
    pub dxfs: Vec<RawElement>,
    pub table_styles: Option<RawElement>,
    pub colors: Option<RawElement>,
    pub ext_lst: Option<RawElement>,
    pub other: Vec<RawElement>,
}

impl Default for StylesXml {
    /// Excel-compatible minimal stylesheet: one default font, the two
    /// required fills (none, gray125), one empty border, one cellStyleXf,
    /// one cellXf, and the "Normal" cell style.
    fn default() -> Self {
        Self {
            root_attrs: vec![(
                "xmlns".to_string(),
                namespaces::SPREADSHEET_ML.to_string(),
            )],
            num_fmts: Vec::new(),
            fonts: vec![Font {
                size: Some("11".to_string()),
                color: Some(Color::Theme {
                    index: 1,
                    tint: None,
                }),
                name: Some("Calibri".to_string()),
                family: Some(2),
                scheme: Some("minor".to_string()),
                ..Font::default()
            }],
            fills: vec![Fill::none(), Fill::gray125()],
            borders: vec![Border::default()],
            cell_style_xfs: vec![Xf::default()],
            cell_xfs: vec![Xf {
                xf_id: Some(0),
                ..Xf::default()
            }],
            cell_styles: vec![CellStyleEntry::normal()],
            dxfs: Vec::new(),
            table_styles: None,
            colors: None,
            ext_lst: None,
            other: Vec::new(),
        }
    }
}

impl StylesXml {
    /// Parse `xl/styles.xml` bytes.
    pub fn parse(location: &str, bytes: &[u8]) -> Result<Self> {
        let mut parser = XmlParser::new(location, bytes)?;
        let root = parser.expect_root("styleSheet")?;

        let mut styles = StylesXml {
            root_attrs: parser.attrs(&root)?,
            num_fmts: Vec::new(),
            fonts: Vec::new(),
            fills: Vec::new(),
            borders: Vec::new(),
            cell_style_xfs: Vec::new(),
            cell_xfs: Vec::new(),
            cell_styles: Vec::new(),
            dxfs: Vec::new(),
            table_styles: None,
            colors: None,
            ext_lst: None,
            other: Vec::new(),
        };

        loop {
            let raw = match parser.next()? {
                Event::Start(e) => parser.read_raw(&e, false)?,
                Event::Empty(e) => parser.read_raw(&e, true)?,
                Event::End(_) | Event::Eof => break,
                _ => continue,
            };
            match raw.name.as_str() {
                "numFmts" => {
                    for nf in raw.children_named("numFmt") {
                        styles.num_fmts.push(NumFmt {
                            id: nf.attr("numFmtId").and_then(|v| v.parse().ok()).unwrap_or(0),
                            code: nf.attr("formatCode").unwrap_or_default().to_string(),
                        });
                    }
                }
                "fonts" => {
                    for font in raw.children_named("font") {
                        styles.fonts.push(Font::from_raw(font, "name"));
                    }
                }
                "fills" => {
                    for fill in raw.children_named("fill") {
                        styles.fills.push(Fill::from_raw(fill));
                    }
                }
                "borders" => {
                    for border in raw.children_named("border") {
                        styles.borders.push(Border::from_raw(border));
                    }
                }
                "cellStyleXfs" => {
                    for xf in raw.children_named("xf") {
                        styles.cell_style_xfs.push(Xf::from_raw(xf));
                    }
                }
                "cellXfs" => {
                    for xf in raw.children_named("xf") {
                        styles.cell_xfs.push(Xf::from_raw(xf));
                    }
                }
                "cellStyles" => {
                    for cs in raw.children_named("cellStyle") {
                        let mut entry = CellStyleEntry {
                            name: String::new(),
                            xf_id: 0,
                            builtin_id: None,
                            other_attrs: Vec::new(),
                        };
                        for (name, value) in &cs.attrs {
                            match name.as_str() {
                                "name" => entry.name = value.clone(),
                                "xfId" => entry.xf_id = value.parse().unwrap_or(0),
                                "builtinId" => entry.builtin_id = value.parse().ok(),
                                _ => entry.other_attrs.push((name.clone(), value.clone())),
                            }
                        }
                        styles.cell_styles.push(entry);
                    }
                }
                "dxfs" => {
                    for dxf in raw.children_named("dxf") {
                        styles.dxfs.push(dxf.clone());
                    }
                }
                "tableStyles" => styles.table_styles = Some(raw),
                "colors" => styles.colors = Some(raw),
                "extLst" => styles.ext_lst = Some(raw),
                _ => styles.other.push(raw),
            }
        }
        Ok(styles)
    }

    /// Serialize to XML bytes in schema order: `numFmts?, fonts, fills,
    /// borders, cellStyleXfs, cellXfs, cellStyles, dxfs?, tableStyles?,
    /// colors?, extLst?`.
    pub fn to_xml(&self, backend: XmlBackend) -> Vec<u8> {
        let mut buf = itoa::Buffer::new();
        let mut w = backend.emitter();
        w.start_document();
        w.start_element("styleSheet", None);
        for (name, value) in &self.root_attrs {
            w.attribute(name, value);
        }

        if !self.num_fmts.is_empty() {
            w.start_element("numFmts", None);
            w.attribute("count", buf.format(self.num_fmts.len() as u64));
            for nf in &self.num_fmts {
                w.start_element("numFmt", None);
                w.attribute("numFmtId", buf.format(nf.id));
                w.attribute("formatCode", &nf.code);
                w.end_element();
            }
            w.end_element();
        }

        w.start_element("fonts", None);
        w.attribute("count", buf.format(self.fonts.len() as u64));
        for font in &self.fonts {
            font.emit(w.as_mut(), "font", "name");
        }
        w.end_element();

        w.start_element("fills", None);
        w.attribute("count", buf.format(self.fills.len() as u64));
        for fill in &self.fills {
            fill.emit(w.as_mut());
        }
        w.end_element();

        w.start_element("borders", None);
        w.attribute("count", buf.format(self.borders.len() as u64));
        for border in &self.borders {
            border.emit(w.as_mut());
        }
        w.end_element();

        w.start_element("cellStyleXfs", None);
        w.attribute("count", buf.format(self.cell_style_xfs.len() as u64));
        for xf in &self.cell_style_xfs {
            xf.emit(w.as_mut());
        }
        w.end_element();

        w.start_element("cellXfs", None);
        w.attribute("count", buf.format(self.cell_xfs.len() as u64));
        for xf in &self.cell_xfs {
            xf.emit(w.as_mut());
        }
        w.end_element();

        w.start_element("cellStyles", None);
        w.attribute("count", buf.format(self.cell_styles.len() as u64));
        for cs in &self.cell_styles {
            w.start_element("cellStyle", None);
            w.attribute("name", &cs.name);
            w.attribute("xfId", buf.format(cs.xf_id));
            if let Some(builtin) = cs.builtin_id {
                w.attribute("builtinId", buf.format(builtin));
            }
            for (name, value) in &cs.other_attrs {
                w.attribute(name, value);
            }
            w.end_element();
        }
        w.end_element();

        if !self.dxfs.is_empty() {
            w.start_element("dxfs", None);
            w.attribute("count", buf.format(self.dxfs.len() as u64));
            for dxf in &self.dxfs {
                dxf.emit(w.as_mut());
            }
            w.end_element();
        }
        if let Some(ts) = &self.table_styles {
            ts.emit(w.as_mut());
        }
        if let Some(colors) = &self.colors {
            colors.emit(w.as_mut());
        }
        if let Some(ext) = &self.ext_lst {
            ext.emit(w.as_mut());
        }
        for child in &self.other {
            child.emit(w.as_mut());
        }

        w.end_element();
        w.end_document();
        w.take()
    }
}
