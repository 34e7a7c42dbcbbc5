//! `xl/worksheets/sheet*.xml` parsing and regeneration.
//!
//! The parser populates cells, merged ranges, row records, and column
//! records, and carries the remaining source-only metadata sections
//! (`sheetPr`, `sheetViews`, `conditionalFormatting`, `pageMargins`, ...)
//! as verbatim residue so a surgical rewrite can re-emit them. Emission
//! follows the schema's fixed element order; reordering is rejected by
//! Excel.

use quick_xml::events::Event;

use crate::emit::{XmlBackend, XmlEmit};
use crate::error::Result;
use crate::namespaces;
use crate::parse::{local_name, XmlParser};
use crate::raw::RawElement;
use crate::shared_strings::RichTextXml;

/// One `<c>` cell record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CellXml {
    /// A1-style cell reference.
    pub r: String,
    /// Style index into `cellXfs`.
    pub s: Option<u32>,
    /// Cell type: `b`, `d`, `e`, `inlineStr`, `n`, `s`, `str`, or absent.
    pub t: Option<String>,
    /// Raw `<v>` content.
    pub v: Option<String>,
    /// Formula, when present.
    pub f: Option<FormulaXml>,
    /// Inline string, when `t="inlineStr"`.
    pub is: Option<RichTextXml>,
    pub other_attrs: Vec<(String, String)>,
    pub other_children: Vec<RawElement>,
}

/// Cell type attribute constants.
pub mod cell_types {
    pub const BOOLEAN: &str = "b";
    pub const DATE: &str = "d";
    pub const ERROR: &str = "e";
    pub const INLINE_STRING: &str = "inlineStr";
    pub const NUMBER: &str = "n";
    pub const SHARED_STRING: &str = "s";
    pub const FORMULA_STRING: &str = "str";
}

/// A `<f>` formula element: attributes verbatim plus the expression text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FormulaXml {
    pub attrs: Vec<(String, String)>,
    pub text: String,
}

/// One `<row>` record. Attribute values that pass through unchanged are kept
/// as their source strings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RowXml {
    /// 1-based row number.
    pub r: u32,
    pub spans: Option<String>,
    /// Row-level style index.
    pub s: Option<u32>,
    pub custom_format: Option<bool>,
    pub ht: Option<String>,
    pub custom_height: Option<bool>,
    pub hidden: Option<bool>,
    pub outline_level: Option<u8>,
    pub collapsed: Option<bool>,
    pub thick_bot: Option<bool>,
    /// `x14ac:dyDescent`, preserved verbatim.
    pub dy_descent: Option<String>,
    pub other_attrs: Vec<(String, String)>,
    pub cells: Vec<CellXml>,
}

/// One `<col>` record covering columns `min..=max`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ColXml {
    pub min: u32,
    pub max: u32,
    pub width: Option<String>,
    pub style: Option<u32>,
    pub hidden: Option<bool>,
    pub custom_width: Option<bool>,
    pub outline_level: Option<u8>,
    pub collapsed: Option<bool>,
    pub other_attrs: Vec<(String, String)>,
}

/// Source-only worksheet metadata carried for surgical rewrites, one slot
/// per schema section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SheetSections {
    pub sheet_pr: Option<RawElement>,
    pub sheet_views: Option<RawElement>,
    pub sheet_format_pr: Option<RawElement>,
    pub conditional_formatting: Vec<RawElement>,
    pub data_validations: Option<RawElement>,
    pub hyperlinks: Option<RawElement>,
    pub print_options: Option<RawElement>,
    pub page_margins: Option<RawElement>,
    pub page_setup: Option<RawElement>,
    pub header_footer: Option<RawElement>,
    pub row_breaks: Option<RawElement>,
    pub col_breaks: Option<RawElement>,
    pub drawing: Option<RawElement>,
    pub legacy_drawing: Option<RawElement>,
    pub table_parts: Option<RawElement>,
    pub ext_lst: Option<RawElement>,
    /// Anything else, emitted after the known sections.
    pub other: Vec<RawElement>,
}

/// Parsed `xl/worksheets/sheetN.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorksheetXml {
    /// Root attributes verbatim (namespace declarations, `mc:Ignorable`).
    pub root_attrs: Vec<(String, String)>,
    /// Original `<dimension ref>`, if any.
    pub dimension: Option<String>,
    pub cols: Vec<ColXml>,
    pub rows: Vec<RowXml>,
    /// `<mergeCell ref>` values in source order.
    pub merged: Vec<String>,
    pub sections: SheetSections,
}

impl Default for WorksheetXml {
    fn default() -> Self {
        Self {
            root_attrs: vec![
                ("xmlns".to_string(), namespaces::SPREADSHEET_ML.to_string()),
                ("xmlns:r".to_string(), namespaces::RELATIONSHIPS.to_string()),
            ],
            dimension: None,
            cols: Vec::new(),
            rows: Vec::new(),
            merged: Vec::new(),
            sections: SheetSections::default(),
        }
    }
}

impl WorksheetXml {
    /// Parse worksheet bytes.
    pub fn parse(location: &str, bytes: &[u8]) -> Result<Self> {
        let mut parser = XmlParser::new(location, bytes)?;
        let root = parser.expect_root("worksheet")?;

        let mut ws = WorksheetXml {
            root_attrs: parser.attrs(&root)?,
            ..WorksheetXml::default()
        };

        loop {
            match parser.next()? {
                Event::Start(e) => {
                    let name = local_name(e.name());
                    if name == "sheetData" {
                        parse_sheet_data(&mut parser, &mut ws)?;
                    } else {
                        let raw = parser.read_raw(&e, false)?;
                        dispatch_section(&mut ws, raw);
                    }
                }
                Event::Empty(e) => {
                    let raw = parser.read_raw(&e, true)?;
                    dispatch_section(&mut ws, raw);
                }
                Event::End(_) | Event::Eof => break,
                _ => {}
            }
        }
        Ok(ws)
    }

    /// Serialize to XML bytes in the schema's mandatory element order.
    pub fn to_xml(&self, backend: XmlBackend) -> Vec<u8> {
        let mut w = backend.emitter();
        w.start_document();
        w.start_element("worksheet", None);
        for (name, value) in &self.root_attrs {
            w.attribute(name, value);
        }

        let s = &self.sections;
        if let Some(e) = &s.sheet_pr {
            e.emit(w.as_mut());
        }
        if let Some(dim) = &self.dimension {
            w.start_element("dimension", None);
            w.attribute("ref", dim);
            w.end_element();
        }
        if let Some(e) = &s.sheet_views {
            e.emit(w.as_mut());
        }
        if let Some(e) = &s.sheet_format_pr {
            e.emit(w.as_mut());
        }
        if !self.cols.is_empty() {
            w.start_element("cols", None);
            for col in &self.cols {
                emit_col(w.as_mut(), col);
            }
            w.end_element();
        }

        w.start_element("sheetData", None);
        for row in &self.rows {
            emit_row(w.as_mut(), row);
        }
        w.end_element();

        if !self.merged.is_empty() {
            w.start_element("mergeCells", None);
            let mut buf = itoa::Buffer::new();
            w.attribute("count", buf.format(self.merged.len() as u64));
            for merge in &self.merged {
                w.start_element("mergeCell", None);
                w.attribute("ref", merge);
                w.end_element();
            }
            w.end_element();
        }
        for e in &s.conditional_formatting {
            e.emit(w.as_mut());
        }
        for e in [
            &s.data_validations,
            &s.hyperlinks,
            &s.print_options,
            &s.page_margins,
            &s.page_setup,
            &s.header_footer,
            &s.row_breaks,
            &s.col_breaks,
            &s.drawing,
            &s.legacy_drawing,
            &s.table_parts,
            &s.ext_lst,
        ]
        .into_iter()
        .flatten()
        {
            e.emit(w.as_mut());
        }
        for e in &s.other {
            e.emit(w.as_mut());
        }

        w.end_element();
        w.end_document();
        w.take()
    }
}

fn dispatch_section(ws: &mut WorksheetXml, raw: RawElement) {
    let s = &mut ws.sections;
    match raw.name.as_str() {
        // A self-closing <sheetData/> reaches here; it contributes no rows.
        "sheetData" => {}
        "dimension" => ws.dimension = raw.attr("ref").map(str::to_string),
        "cols" => {
            for col in raw.children_named("col") {
                ws.cols.push(parse_col(col));
            }
        }
        "mergeCells" => {
            for mc in raw.children_named("mergeCell") {
                if let Some(r) = mc.attr("ref") {
                    ws.merged.push(r.to_string());
                }
            }
        }
        "sheetPr" => s.sheet_pr = Some(raw),
        "sheetViews" => s.sheet_views = Some(raw),
        "sheetFormatPr" => s.sheet_format_pr = Some(raw),
        "conditionalFormatting" => s.conditional_formatting.push(raw),
        "dataValidations" => s.data_validations = Some(raw),
        "hyperlinks" => s.hyperlinks = Some(raw),
        "printOptions" => s.print_options = Some(raw),
        "pageMargins" => s.page_margins = Some(raw),
        "pageSetup" => s.page_setup = Some(raw),
        "headerFooter" => s.header_footer = Some(raw),
        "rowBreaks" => s.row_breaks = Some(raw),
        "colBreaks" => s.col_breaks = Some(raw),
        "drawing" => s.drawing = Some(raw),
        "legacyDrawing" => s.legacy_drawing = Some(raw),
        "tableParts" => s.table_parts = Some(raw),
        "extLst" => s.ext_lst = Some(raw),
        _ => s.other.push(raw),
    }
}

fn parse_col(raw: &RawElement) -> ColXml {
    let mut col = ColXml::default();
    for (name, value) in &raw.attrs {
        match name.as_str() {
            "min" => col.min = value.parse().unwrap_or(0),
            "max" => col.max = value.parse().unwrap_or(0),
            "width" => col.width = Some(value.clone()),
            "style" => col.style = value.parse().ok(),
            "hidden" => col.hidden = Some(crate::parse::parse_bool(value)),
            "customWidth" => col.custom_width = Some(crate::parse::parse_bool(value)),
            "outlineLevel" => col.outline_level = value.parse().ok(),
            "collapsed" => col.collapsed = Some(crate::parse::parse_bool(value)),
            _ => col.other_attrs.push((name.clone(), value.clone())),
        }
    }
    col
}

/// Parse the `<sheetData>` subtree row-by-row.
fn parse_sheet_data(parser: &mut XmlParser<'_>, ws: &mut WorksheetXml) -> Result<()> {
    loop {
        match parser.next()? {
            Event::Start(e) if local_name(e.name()) == "row" => {
                let mut row = parse_row_attrs(parser, &e)?;
                parse_row_cells(parser, &mut row)?;
                ws.rows.push(row);
            }
            Event::Empty(e) if local_name(e.name()) == "row" => {
                // An empty row with formatting attributes but no cells.
                ws.rows.push(parse_row_attrs(parser, &e)?);
            }
            Event::Start(_) => parser.skip_element()?,
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(parser.error("XML parse error: unexpected end of file inside 'sheetData'"))
            }
            _ => {}
        }
    }
}

fn parse_row_attrs(
    parser: &XmlParser<'_>,
    e: &quick_xml::events::BytesStart<'_>,
) -> Result<RowXml> {
    let mut row = RowXml::default();
    for (name, value) in parser.attrs(e)? {
        match name.as_str() {
            "r" => row.r = value.parse().unwrap_or(0),
            "spans" => row.spans = Some(value),
            "s" => row.s = value.parse().ok(),
            "customFormat" => row.custom_format = Some(crate::parse::parse_bool(&value)),
            "ht" => row.ht = Some(value),
            "customHeight" => row.custom_height = Some(crate::parse::parse_bool(&value)),
            "hidden" => row.hidden = Some(crate::parse::parse_bool(&value)),
            "outlineLevel" => row.outline_level = value.parse().ok(),
            "collapsed" => row.collapsed = Some(crate::parse::parse_bool(&value)),
            "thickBot" => row.thick_bot = Some(crate::parse::parse_bool(&value)),
            "x14ac:dyDescent" => row.dy_descent = Some(value),
            _ => row.other_attrs.push((name, value)),
        }
    }
    Ok(row)
}

fn parse_row_cells(parser: &mut XmlParser<'_>, row: &mut RowXml) -> Result<()> {
    loop {
        match parser.next()? {
            Event::Start(e) if local_name(e.name()) == "c" => {
                let mut cell = parse_cell_attrs(parser, &e)?;
                parse_cell_body(parser, &mut cell)?;
                row.cells.push(cell);
            }
            Event::Empty(e) if local_name(e.name()) == "c" => {
                row.cells.push(parse_cell_attrs(parser, &e)?);
            }
            Event::Start(_) => parser.skip_element()?,
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(parser.error("XML parse error: unexpected end of file inside 'row'"))
            }
            _ => {}
        }
    }
}

fn parse_cell_attrs(
    parser: &XmlParser<'_>,
    e: &quick_xml::events::BytesStart<'_>,
) -> Result<CellXml> {
    let mut cell = CellXml::default();
    for (name, value) in parser.attrs(e)? {
        match name.as_str() {
            "r" => cell.r = value,
            "s" => cell.s = value.parse().ok(),
            "t" => cell.t = Some(value),
            _ => cell.other_attrs.push((name, value)),
        }
    }
    Ok(cell)
}

fn parse_cell_body(parser: &mut XmlParser<'_>, cell: &mut CellXml) -> Result<()> {
    loop {
        match parser.next()? {
            Event::Start(e) => match local_name(e.name()).as_str() {
                "v" => cell.v = Some(parser.read_text("v")?),
                "f" => {
                    let attrs = parser.attrs(&e)?;
                    let text = parser.read_text("f")?;
                    cell.f = Some(FormulaXml { attrs, text });
                }
                "is" => {
                    let raw = parser.read_raw(&e, false)?;
                    cell.is = Some(RichTextXml::from_raw(&raw));
                }
                _ => {
                    let raw = parser.read_raw(&e, false)?;
                    cell.other_children.push(raw);
                }
            },
            Event::Empty(e) => match local_name(e.name()).as_str() {
                "v" => cell.v = Some(String::new()),
                "f" => {
                    cell.f = Some(FormulaXml {
                        attrs: parser.attrs(&e)?,
                        text: String::new(),
                    })
                }
                _ => {
                    let raw = parser.read_raw(&e, true)?;
                    cell.other_children.push(raw);
                }
            },
            Event::End(_) => return Ok(()),
            Event::Eof => {
                return Err(parser.error("XML parse error: unexpected end of file inside 'c'"))
            }
            _ => {}
        }
    }
}

fn emit_bool_attr(w: &mut dyn XmlEmit, name: &str, value: Option<bool>) {
    if let Some(v) = value {
        w.attribute(name, if v { "1" } else { "0" });
    }
}

fn emit_col(w: &mut dyn XmlEmit, col: &ColXml) {
    let mut buf = itoa::Buffer::new();
    w.start_element("col", None);
    // min before max is mandatory; Excel rejects the reverse order.
    w.attribute("min", buf.format(col.min));
    w.attribute("max", buf.format(col.max));
    if let Some(width) = &col.width {
        w.attribute("width", width);
    }
    if let Some(style) = col.style {
        w.attribute("style", buf.format(style));
    }
    emit_bool_attr(w, "hidden", col.hidden);
    emit_bool_attr(w, "customWidth", col.custom_width);
    if let Some(level) = col.outline_level {
        w.attribute("outlineLevel", buf.format(level));
    }
    emit_bool_attr(w, "collapsed", col.collapsed);
    for (name, value) in &col.other_attrs {
        w.attribute(name, value);
    }
    w.end_element();
}

fn emit_row(w: &mut dyn XmlEmit, row: &RowXml) {
    let mut buf = itoa::Buffer::new();
    w.start_element("row", None);
    w.attribute("r", buf.format(row.r));
    if let Some(spans) = &row.spans {
        w.attribute("spans", spans);
    }
    if let Some(s) = row.s {
        w.attribute("s", buf.format(s));
    }
    emit_bool_attr(w, "customFormat", row.custom_format);
    if let Some(ht) = &row.ht {
        w.attribute("ht", ht);
    }
    emit_bool_attr(w, "customHeight", row.custom_height);
    emit_bool_attr(w, "hidden", row.hidden);
    if let Some(level) = row.outline_level {
        w.attribute("outlineLevel", buf.format(level));
    }
    emit_bool_attr(w, "collapsed", row.collapsed);
    emit_bool_attr(w, "thickBot", row.thick_bot);
    if let Some(dy) = &row.dy_descent {
        w.attribute("x14ac:dyDescent", dy);
    }
    for (name, value) in &row.other_attrs {
        w.attribute(name, value);
    }
    for cell in &row.cells {
        emit_cell(w, cell);
    }
    w.end_element();
}

fn emit_cell(w: &mut dyn XmlEmit, cell: &CellXml) {
    let mut buf = itoa::Buffer::new();
    w.start_element("c", None);
    w.attribute("r", &cell.r);
    if let Some(s) = cell.s {
        w.attribute("s", buf.format(s));
    }
    if let Some(t) = &cell.t {
        w.attribute("t", t);
    }
    for (name, value) in &cell.other_attrs {
        w.attribute(name, value);
    }
    if let Some(f) = &cell.f {
        w.start_element("f", None);
        for (name, value) in &f.attrs {
            w.attribute(name, value);
        }
        if !f.text.is_empty() {
            w.characters(&f.text);
        }
        w.end_element();
    }
    if let Some(v) = &cell.v {
        w.start_element("v", None);
        w.characters(v);
        w.end_element();
    }
    if let Some(is) = &cell.is {
        w.start_element("is", None);
        is.emit_body(w);
        w.end_element();
    }
    for child in &cell.other_children {
        child.emit(w);
    }
    w.end_element();
}
