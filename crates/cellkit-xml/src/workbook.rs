//! `xl/workbook.xml` parsing and regeneration.
//!
//! The workbook root carries the full set of namespace declarations and the
//! `mc:Ignorable` attribute from the source; all root attributes are kept
//! verbatim and re-emitted exactly once, on the root. Children other than
//! `<sheets>` and `<definedNames>` are preserved as residue in their original
//! positions.

use quick_xml::events::Event;

use crate::emit::{XmlBackend, XmlEmit};
use crate::error::Result;
use crate::namespaces;
use crate::parse::XmlParser;
use crate::raw::RawElement;

/// Visibility state of a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SheetState {
    #[default]
    Visible,
    Hidden,
    VeryHidden,
}

impl SheetState {
    /// Attribute value, `None` for the visible default.
    pub fn as_attr(&self) -> Option<&'static str> {
        match self {
            SheetState::Visible => None,
            SheetState::Hidden => Some("hidden"),
            SheetState::VeryHidden => Some("veryHidden"),
        }
    }

    pub fn from_attr(value: &str) -> Self {
        match value {
            "hidden" => SheetState::Hidden,
            "veryHidden" => SheetState::VeryHidden,
            _ => SheetState::Visible,
        }
    }
}

/// One `<sheet>` entry in the workbook's sheet list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub name: String,
    pub sheet_id: u32,
    pub r_id: String,
    pub state: SheetState,
    pub other_attrs: Vec<(String, String)>,
}

/// One `<definedName>` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefinedName {
    pub name: String,
    pub local_sheet_id: Option<u32>,
    pub hidden: bool,
    pub value: String,
    pub other_attrs: Vec<(String, String)>,
}

/// A root child in source order; `<sheets>` and `<definedNames>` are typed,
/// everything else is residue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkbookChild {
    Sheets,
    DefinedNames,
    Raw(RawElement),
}

/// Parsed `xl/workbook.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkbookXml {
    /// All root attributes verbatim: the default namespace, every prefixed
    /// namespace declaration (`mc`, `x15`, `xr`, ...), and `mc:Ignorable`.
    pub root_attrs: Vec<(String, String)>,
    pub sheets: Vec<SheetEntry>,
    pub defined_names: Vec<DefinedName>,
    /// Root children in original order, with markers at the positions of the
    /// typed containers.
    pub children: Vec<WorkbookChild>,
}

impl Default for WorkbookXml {
    /// Conservative baseline for workbooks without a source.
    fn default() -> Self {
        Self {
            root_attrs: vec![
                ("xmlns".to_string(), namespaces::SPREADSHEET_ML.to_string()),
                ("xmlns:r".to_string(), namespaces::RELATIONSHIPS.to_string()),
            ],
            sheets: Vec::new(),
            defined_names: Vec::new(),
            children: vec![WorkbookChild::Sheets],
        }
    }
}

impl WorkbookXml {
    /// Parse `xl/workbook.xml` bytes.
    ///
    /// Fails with "Missing required child element: sheets" when the document
    /// has no `<sheets>` child.
    pub fn parse(location: &str, bytes: &[u8]) -> Result<Self> {
        let mut parser = XmlParser::new(location, bytes)?;
        let root = parser.expect_root("workbook")?;

        let mut wb = WorkbookXml {
            root_attrs: parser.attrs(&root)?,
            sheets: Vec::new(),
            defined_names: Vec::new(),
            children: Vec::new(),
        };

        let mut saw_sheets = false;
        loop {
            let raw = match parser.next()? {
                Event::Start(e) => parser.read_raw(&e, false)?,
                Event::Empty(e) => parser.read_raw(&e, true)?,
                Event::End(_) | Event::Eof => break,
                _ => continue,
            };
            match raw.name.as_str() {
                "sheets" => {
                    saw_sheets = true;
                    for sheet in raw.children_named("sheet") {
                        wb.sheets.push(parse_sheet_entry(sheet));
                    }
                    wb.children.push(WorkbookChild::Sheets);
                }
                "definedNames" => {
                    for dn in raw.children_named("definedName") {
                        wb.defined_names.push(parse_defined_name(dn));
                    }
                    wb.children.push(WorkbookChild::DefinedNames);
                }
                _ => wb.children.push(WorkbookChild::Raw(raw)),
            }
        }

        if !saw_sheets {
            return Err(parser.error("Missing required child element: sheets"));
        }
        Ok(wb)
    }

    /// The `mc:Ignorable` attribute value, when the source declared one.
    pub fn mc_ignorable(&self) -> Option<&str> {
        self.root_attrs
            .iter()
            .find(|(k, _)| k == "mc:Ignorable")
            .map(|(_, v)| v.as_str())
    }

    /// Serialize back to XML bytes.
    pub fn to_xml(&self, backend: XmlBackend) -> Vec<u8> {
        let mut w = backend.emitter();
        w.start_document();
        w.start_element("workbook", None);
        for (name, value) in &self.root_attrs {
            w.attribute(name, value);
        }

        let mut emitted_defined_names = false;
        for child in &self.children {
            match child {
                WorkbookChild::Sheets => {
                    self.emit_sheets(w.as_mut());
                    // Defined names added to a workbook whose source had no
                    // <definedNames> container still need a slot; schema
                    // places it right after <sheets>.
                    if !self.defined_names.is_empty()
                        && !self.children.contains(&WorkbookChild::DefinedNames)
                    {
                        self.emit_defined_names(w.as_mut());
                        emitted_defined_names = true;
                    }
                }
                WorkbookChild::DefinedNames => {
                    if !self.defined_names.is_empty() && !emitted_defined_names {
                        self.emit_defined_names(w.as_mut());
                        emitted_defined_names = true;
                    }
                }
                WorkbookChild::Raw(raw) => raw.emit(w.as_mut()),
            }
        }

        w.end_element();
        w.end_document();
        w.take()
    }

    fn emit_sheets(&self, w: &mut dyn XmlEmit) {
        w.start_element("sheets", None);
        for sheet in &self.sheets {
            w.start_element("sheet", None);
            w.attribute("name", &sheet.name);
            let mut buf = itoa::Buffer::new();
            w.attribute("sheetId", buf.format(sheet.sheet_id));
            if let Some(state) = sheet.state.as_attr() {
                w.attribute("state", state);
            }
            w.attribute("r:id", &sheet.r_id);
            for (name, value) in &sheet.other_attrs {
                w.attribute(name, value);
            }
            w.end_element();
        }
        w.end_element();
    }

    fn emit_defined_names(&self, w: &mut dyn XmlEmit) {
        w.start_element("definedNames", None);
        for dn in &self.defined_names {
            w.start_element("definedName", None);
            w.attribute("name", &dn.name);
            if let Some(id) = dn.local_sheet_id {
                let mut buf = itoa::Buffer::new();
                w.attribute("localSheetId", buf.format(id));
            }
            if dn.hidden {
                w.attribute("hidden", "1");
            }
            for (name, value) in &dn.other_attrs {
                w.attribute(name, value);
            }
            w.characters(&dn.value);
            w.end_element();
        }
        w.end_element();
    }
}

fn parse_sheet_entry(raw: &RawElement) -> SheetEntry {
    let mut entry = SheetEntry {
        name: String::new(),
        sheet_id: 0,
        r_id: String::new(),
        state: SheetState::Visible,
        other_attrs: Vec::new(),
    };
    for (name, value) in &raw.attrs {
        match name.as_str() {
            "name" => entry.name = value.clone(),
            "sheetId" => entry.sheet_id = value.parse().unwrap_or(0),
            "r:id" | "id" => entry.r_id = value.clone(),
            "state" => entry.state = SheetState::from_attr(value),
            _ => entry.other_attrs.push((name.clone(), value.clone())),
        }
    }
    entry
}

fn parse_defined_name(raw: &RawElement) -> DefinedName {
    let mut dn = DefinedName {
        name: String::new(),
        local_sheet_id: None,
        hidden: false,
        value: raw.text(),
        other_attrs: Vec::new(),
    };
    for (name, value) in &raw.attrs {
        match name.as_str() {
            "name" => dn.name = value.clone(),
            "localSheetId" => dn.local_sheet_id = value.parse().ok(),
            "hidden" => dn.hidden = crate::parse::parse_bool(value),
            _ => dn.other_attrs.push((name.clone(), value.clone())),
        }
    }
    dn
}
