//! `xl/tables/table*.xml` parsing and regeneration.
//!
//! UIDs on the table, its autoFilter, and its columns are preserved when
//! present; Excel 365 stamps them and drops into repair mode when a rewrite
//! loses relationships they participate in.

use quick_xml::events::Event;

use crate::emit::{XmlBackend, XmlEmit};
use crate::error::Result;
use crate::namespaces;
use crate::parse::XmlParser;
use crate::raw::RawElement;

/// One `<tableColumn>` record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableColumnXml {
    pub id: u32,
    pub name: String,
    pub uid: Option<String>,
    pub other_attrs: Vec<(String, String)>,
    pub other_children: Vec<RawElement>,
}

/// Parsed `xl/tables/tableN.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableXml {
    pub id: u32,
    pub name: String,
    pub display_name: String,
    /// Table range in A1:B2 form.
    pub cell_range: String,
    pub header_row_count: Option<u32>,
    pub totals_row_count: Option<u32>,
    pub totals_row_shown: Option<bool>,
    /// `xr:uid` on the table root.
    pub uid: Option<String>,
    pub columns: Vec<TableColumnXml>,
    /// `<autoFilter>` preserved verbatim (its `xr:uid` included).
    pub auto_filter: Option<RawElement>,
    /// `<tableStyleInfo>` preserved verbatim.
    pub style_info: Option<RawElement>,
    pub other_attrs: Vec<(String, String)>,
    pub other_children: Vec<RawElement>,
}

impl TableXml {
    /// Parse a table part.
    pub fn parse(location: &str, bytes: &[u8]) -> Result<Self> {
        let mut parser = XmlParser::new(location, bytes)?;
        let root = parser.expect_root("table")?;

        let mut table = TableXml::default();
        for (name, value) in parser.attrs(&root)? {
            match name.as_str() {
                "id" => table.id = value.parse().unwrap_or(0),
                "name" => table.name = value,
                "displayName" => table.display_name = value,
                "ref" => table.cell_range = value,
                "headerRowCount" => table.header_row_count = value.parse().ok(),
                "totalsRowCount" => table.totals_row_count = value.parse().ok(),
                "totalsRowShown" => {
                    table.totals_row_shown = Some(crate::parse::parse_bool(&value))
                }
                "xr:uid" => table.uid = Some(value),
                _ => table.other_attrs.push((name, value)),
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
                "autoFilter" => table.auto_filter = Some(raw),
                "tableColumns" => {
                    for col in raw.children_named("tableColumn") {
                        let mut column = TableColumnXml::default();
                        for (name, value) in &col.attrs {
                            match name.as_str() {
                                "id" => column.id = value.parse().unwrap_or(0),
                                "name" => column.name = value.clone(),
                                "xr3:uid" | "xr:uid" => column.uid = Some(value.clone()),
                                _ => column.other_attrs.push((name.clone(), value.clone())),
                            }
                        }
                        for child in &col.children {
                            if let crate::raw::RawNode::Element(e) = child {
                                column.other_children.push(e.clone());
                            }
                        }
                        table.columns.push(column);
                    }
                }
                "tableStyleInfo" => table.style_info = Some(raw),
                _ => table.other_children.push(raw),
            }
        }
        Ok(table)
    }

    /// Serialize to XML bytes.
    pub fn to_xml(&self, backend: XmlBackend) -> Vec<u8> {
        let mut buf = itoa::Buffer::new();
        let mut w = backend.emitter();
        w.start_document();
        w.start_element("table", None);
        // Root attrs other than the typed set come back in source order; a
        // freshly built table gets the baseline namespace.
        if !self.other_attrs.iter().any(|(k, _)| k == "xmlns") {
            w.attribute("xmlns", namespaces::SPREADSHEET_ML);
        }
        let mut pending: Vec<(&str, &str)> = Vec::new();
        for (name, value) in &self.other_attrs {
            if name.starts_with("xmlns") {
                w.attribute(name, value);
            } else {
                pending.push((name, value));
            }
        }
        w.attribute("id", buf.format(self.id));
        if let Some(uid) = &self.uid {
            w.attribute("xr:uid", uid);
        }
        w.attribute("name", &self.name);
        w.attribute("displayName", &self.display_name);
        w.attribute("ref", &self.cell_range);
        if let Some(count) = self.header_row_count {
            w.attribute("headerRowCount", buf.format(count));
        }
        if let Some(count) = self.totals_row_count {
            w.attribute("totalsRowCount", buf.format(count));
        }
        if let Some(shown) = self.totals_row_shown {
            w.attribute("totalsRowShown", if shown { "1" } else { "0" });
        }
        for (name, value) in pending {
            w.attribute(name, value);
        }

        if let Some(filter) = &self.auto_filter {
            filter.emit(w.as_mut());
        }
        w.start_element("tableColumns", None);
        w.attribute("count", buf.format(self.columns.len() as u64));
        for column in &self.columns {
            w.start_element("tableColumn", None);
            w.attribute("id", buf.format(column.id));
            if let Some(uid) = &column.uid {
                w.attribute("xr3:uid", uid);
            }
            w.attribute("name", &column.name);
            for (name, value) in &column.other_attrs {
                w.attribute(name, value);
            }
            for child in &column.other_children {
                child.emit(w.as_mut());
            }
            w.end_element();
        }
        w.end_element();
        if let Some(style) = &self.style_info {
            style.emit(w.as_mut());
        }
        for child in &self.other_children {
            child.emit(w.as_mut());
        }
        w.end_element();
        w.end_document();
        w.take()
    }
}
