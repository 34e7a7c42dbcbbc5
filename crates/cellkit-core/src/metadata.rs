//! Fast workbook metadata: sheet names and dimensions without parsing
//! cells.
//!
//! The reader opens the archive, parses only `xl/workbook.xml` and the
//! workbook rels, and scans each worksheet just far enough to see its
//! `<dimension>` (stopping at `<sheetData>`).

use std::io::Read;
use std::path::Path;

use quick_xml::events::Event;

use cellkit_xml::parse::{local_name, XmlParser};
use cellkit_xml::relationships::{rel_types, resolve_target, Relationships};
use cellkit_xml::workbook::WorkbookXml;
use cellkit_xml::ParseError;

use crate::error::{Error, Result};

/// Name and declared dimension of one sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetMetadata {
    pub name: String,
    /// The `<dimension ref>` value, when the sheet declares one.
    pub dimension: Option<String>,
}

/// Sheet names plus per-sheet dimensions.
pub fn read<P: AsRef<Path>>(path: P) -> Result<Vec<SheetMetadata>> {
    let mut archive = open_archive(path.as_ref())?;
    let (workbook, rels) = read_workbook_parts(&mut archive)?;

    let mut out = Vec::with_capacity(workbook.sheets.len());
    for entry in &workbook.sheets {
        let dimension = match rels.by_id(&entry.r_id) {
            Some(rel) if rel.rel_type == rel_types::WORKSHEET => {
                let part = resolve_target("xl/workbook.xml", &rel.target);
                match read_entry(&mut archive, &part) {
                    Some(bytes) => scan_dimension(&part, &bytes)?,
                    None => None,
                }
            }
            _ => None,
        };
        out.push(SheetMetadata {
            name: entry.name.clone(),
            dimension,
        });
    }
    Ok(out)
}

/// Sheet names only; no worksheet part is opened.
pub fn read_sheet_list<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
    let mut archive = open_archive(path.as_ref())?;
    let (workbook, _) = read_workbook_parts(&mut archive)?;
    Ok(workbook.sheets.into_iter().map(|s| s.name).collect())
}

/// Dimension of one sheet by 0-based index.
pub fn read_dimension<P: AsRef<Path>>(path: P, sheet_index: usize) -> Result<Option<String>> {
    let mut archive = open_archive(path.as_ref())?;
    let (workbook, rels) = read_workbook_parts(&mut archive)?;
    let entry = workbook.sheets.get(sheet_index).ok_or_else(|| {
        Error::Validation(format!(
            "sheet index {sheet_index} is out of range ({} sheets)",
            workbook.sheets.len()
        ))
    })?;
    let rel = rels
        .by_id(&entry.r_id)
        .filter(|r| r.rel_type == rel_types::WORKSHEET)
        .ok_or_else(|| {
            Error::Parse(ParseError::new(
                "xl/workbook.xml",
                format!("missing worksheet relationship for sheet '{}'", entry.name),
            ))
        })?;
    let part = resolve_target("xl/workbook.xml", &rel.target);
    let bytes = read_entry(&mut archive, &part).ok_or_else(|| {
        Error::Parse(ParseError::new(
            &part,
            format!("worksheet part for sheet '{}' is not in the archive", entry.name),
        ))
    })?;
    scan_dimension(&part, &bytes)
}

type Archive = zip::ZipArchive<std::fs::File>;

fn open_archive(path: &Path) -> Result<Archive> {
    let file = std::fs::File::open(path)?;
    zip::ZipArchive::new(file).map_err(|e| Error::Zip(format!("not a ZIP archive: {e}")))
}

fn read_entry(archive: &mut Archive, name: &str) -> Option<Vec<u8>> {
    let mut entry = archive.by_name(name).ok()?;
    let mut bytes = Vec::with_capacity(entry.size() as usize);
    entry.read_to_end(&mut bytes).ok()?;
    Some(bytes)
}

fn read_workbook_parts(archive: &mut Archive) -> Result<(WorkbookXml, Relationships)> {
    let workbook_bytes = read_entry(archive, "xl/workbook.xml").ok_or_else(|| {
        Error::Parse(ParseError::new(
            "xl/workbook.xml",
            "required part is missing from the archive",
        ))
    })?;
    let workbook = WorkbookXml::parse("xl/workbook.xml", &workbook_bytes)?;
    let rels_bytes = read_entry(archive, "xl/_rels/workbook.xml.rels").ok_or_else(|| {
        Error::Parse(ParseError::new(
            "xl/_rels/workbook.xml.rels",
            "required part is missing from the archive",
        ))
    })?;
    let rels = Relationships::parse("xl/_rels/workbook.xml.rels", &rels_bytes)?;
    Ok((workbook, rels))
}

/// Scan a worksheet for its `<dimension>`, stopping as soon as cell data
/// begins.
fn scan_dimension(location: &str, bytes: &[u8]) -> Result<Option<String>> {
    let mut parser = XmlParser::new(location, bytes)?;
    loop {
        match parser.next()? {
            Event::Empty(e) | Event::Start(e) => match local_name(e.name()).as_str() {
                "dimension" => {
                    for (name, value) in parser.attrs(&e)? {
                        if name == "ref" {
                            return Ok(Some(value));
                        }
                    }
                    return Ok(None);
                }
                "sheetData" => return Ok(None),
                _ => {}
            },
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}
