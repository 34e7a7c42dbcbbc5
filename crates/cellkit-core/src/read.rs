//! Opening workbooks: package read, part discovery, domain construction.
//!
//! Fatal conditions: non-ZIP input, missing `xl/workbook.xml`, missing
//! `<sheets>`, a sheet whose worksheet part is not in the archive. A
//! missing `xl/styles.xml` is only a warning; defaults apply.

use std::path::Path;

use cellkit_xml::comments::CommentsXml;
use cellkit_xml::content_types::ContentTypes;
use cellkit_xml::relationships::{rel_types, rels_part_path, resolve_target, Relationships};
use cellkit_xml::shared_strings::SstXml;
use cellkit_xml::styles::StylesXml;
use cellkit_xml::table::TableXml;
use cellkit_xml::workbook::WorkbookXml;
use cellkit_xml::worksheet::WorksheetXml;
use cellkit_xml::ParseError;

use crate::comment::Comment;
use crate::error::{Error, Result, Warning};
use crate::limits::{exceeds, ReadOptions};
use crate::manifest::{fingerprint, PartInfo, PartManifest, SourceContext};
use crate::package::Package;
use crate::rich_text::RichText;
use crate::sheet::Sheet;
use crate::style::{style_from_xf, CellStyle};
use crate::table::TableSpec;
use crate::utils::cell_ref::cell_name_to_coordinates;
use crate::value::CellValue;
use crate::workbook::Workbook;

impl Workbook {
    /// Open an `.xlsx` file from disk with default limits.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, &ReadOptions::default())
    }

    /// Open an `.xlsx` file from disk under explicit limits.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: &ReadOptions) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        let mut workbook = parse_package(&data, options)?;
        if let Some(ctx) = &mut workbook.source {
            ctx.source_path = Some(path.as_ref().to_path_buf());
        }
        Ok(workbook)
    }

    /// Open a workbook from an in-memory `.xlsx` buffer.
    pub fn open_from_buffer(data: &[u8]) -> Result<Self> {
        Self::open_from_buffer_with_options(data, &ReadOptions::default())
    }

    /// Open from a buffer under explicit limits.
    pub fn open_from_buffer_with_options(data: &[u8], options: &ReadOptions) -> Result<Self> {
        parse_package(data, options)
    }
}

fn parse_package(data: &[u8], options: &ReadOptions) -> Result<Workbook> {
    let package = Package::read(data, options)?;

    // Seed the manifest with every entry in archive order.
    let mut manifest = PartManifest::default();
    for (name, entry) in &package.entries {
        manifest.insert(
            name.clone(),
            PartInfo {
                parsed: false,
                size: Some(entry.bytes.len() as u64),
                sheet_index: None,
                bytes: entry.bytes.clone(),
            },
        );
    }

    let content_types = match package.get("[Content_Types].xml") {
        Some(bytes) => ContentTypes::parse("[Content_Types].xml", bytes)?,
        None => {
            return Err(Error::Parse(ParseError::new(
                "[Content_Types].xml",
                "required part is missing from the archive",
            )))
        }
    };
    manifest.mark_parsed("[Content_Types].xml", None);

    if let Some(bytes) = package.get("_rels/.rels") {
        // Parsed for validation; the writer keeps the original bytes.
        Relationships::parse("_rels/.rels", bytes)?;
        manifest.mark_parsed("_rels/.rels", None);
    }

    let workbook_xml = match package.get("xl/workbook.xml") {
        Some(bytes) => WorkbookXml::parse("xl/workbook.xml", bytes)?,
        None => {
            return Err(Error::Parse(ParseError::new(
                "xl/workbook.xml",
                "required part is missing from the archive",
            )))
        }
    };
    manifest.mark_parsed("xl/workbook.xml", None);

    let workbook_rels = match package.get("xl/_rels/workbook.xml.rels") {
        Some(bytes) => Relationships::parse("xl/_rels/workbook.xml.rels", bytes)?,
        None => {
            return Err(Error::Parse(ParseError::new(
                "xl/_rels/workbook.xml.rels",
                "required part is missing from the archive",
            )))
        }
    };
    manifest.mark_parsed("xl/_rels/workbook.xml.rels", None);

    let mut warnings = Vec::new();
    let styles = match package.get("xl/styles.xml") {
        Some(bytes) => {
            manifest.mark_parsed("xl/styles.xml", None);
            StylesXml::parse("xl/styles.xml", bytes)?
        }
        None => {
            warnings.push(Warning::MissingStylesXml);
            StylesXml::default()
        }
    };
    let global_styles: Vec<CellStyle> = styles
        .cell_xfs
        .iter()
        .map(|xf| style_from_xf(&styles, xf))
        .collect();

    let original_sst = match package.get("xl/sharedStrings.xml") {
        Some(bytes) => {
            manifest.mark_parsed("xl/sharedStrings.xml", None);
            Some(SstXml::parse("xl/sharedStrings.xml", bytes)?)
        }
        None => None,
    };
    let shared_strings: Vec<RichText> = original_sst
        .as_ref()
        .map(|sst| sst.items.iter().map(RichText::from_wire).collect())
        .unwrap_or_default();
    for rich in &shared_strings {
        check_string_length(&rich.to_plain_text(), options)?;
    }

    // Parse each worksheet referenced by the workbook part.
    let mut sheets = Vec::with_capacity(workbook_xml.sheets.len());
    let mut sheet_paths = Vec::with_capacity(workbook_xml.sheets.len());
    let mut total_cells: u64 = 0;
    for (sheet_index, entry) in workbook_xml.sheets.iter().enumerate() {
        let rel = workbook_rels
            .by_id(&entry.r_id)
            .filter(|r| r.rel_type == rel_types::WORKSHEET)
            .ok_or_else(|| {
                Error::Parse(ParseError::new(
                    "xl/workbook.xml",
                    format!("missing worksheet relationship for sheet '{}'", entry.name),
                ))
            })?;
        let sheet_path = resolve_target("xl/workbook.xml", &rel.target);
        let bytes = package.get(&sheet_path).ok_or_else(|| {
            Error::Parse(ParseError::new(
                &sheet_path,
                format!("worksheet part for sheet '{}' is not in the archive", entry.name),
            ))
        })?;

        let ws = WorksheetXml::parse(&sheet_path, bytes)?;
        manifest.mark_parsed(&sheet_path, Some(sheet_index));

        let mut sheet = Sheet::from_wire(
            entry.name.clone(),
            entry.state,
            &ws,
            &shared_strings,
            &global_styles,
        )?;
        sheet.source_index = Some(sheet_index);

        total_cells += sheet.cell_count() as u64;
        if exceeds(total_cells, options.max_cell_count) {
            return Err(Error::Security(format!(
                "cell count {total_cells} exceeds limit {}",
                options.max_cell_count
            )));
        }
        for cell in sheet.cells.values() {
            if let CellValue::Text(text) = &cell.value {
                check_string_length(text, options)?;
            }
        }

        attach_sheet_parts(&package, &mut manifest, &sheet_path, sheet_index, &mut sheet)?;
        sheets.push(sheet);
        sheet_paths.push(sheet_path);
    }

    let mut workbook = Workbook {
        sheets,
        defined_names: workbook_xml.defined_names.clone(),
        source: Some(SourceContext {
            source_path: None,
            fingerprint: fingerprint(data),
            manifest,
            original_styles: styles,
            original_sst,
            workbook_xml,
            content_types,
            workbook_rels,
            sheet_paths,
            tracker: Default::default(),
        }),
        warnings,
    };
    workbook.warnings.dedup();
    Ok(workbook)
}

/// Discover and parse the parts a sheet owns: its relationship file,
/// comments, tables, and the VML sidecar (bound but not parsed).
fn attach_sheet_parts(
    package: &Package,
    manifest: &mut PartManifest,
    sheet_path: &str,
    sheet_index: usize,
    sheet: &mut Sheet,
) -> Result<()> {
    let rels_path = rels_part_path(sheet_path);
    let Some(rels_bytes) = package.get(&rels_path) else {
        return Ok(());
    };
    let rels = Relationships::parse(&rels_path, rels_bytes)?;
    manifest.mark_parsed(&rels_path, Some(sheet_index));

    for rel in &rels.relationships {
        let target = resolve_target(sheet_path, &rel.target);
        match rel.rel_type.as_str() {
            rel_types::COMMENTS => {
                if let Some(bytes) = package.get(&target) {
                    let part = CommentsXml::parse(&target, bytes)?;
                    manifest.mark_parsed(&target, Some(sheet_index));
                    for comment in &part.comments {
                        let (col, row) = cell_name_to_coordinates(&comment.cell_ref)
                            .map_err(|_| {
                                Error::Parse(ParseError::new(
                                    &target,
                                    format!("invalid comment cell reference '{}'", comment.cell_ref),
                                ))
                            })?;
                        let author = part
                            .authors
                            .get(comment.author_id as usize)
                            .map(String::as_str)
                            .unwrap_or_default();
                        let text = RichText::from_wire(&comment.text);
                        sheet
                            .comments
                            .insert((row, col), Comment::from_wire_text(author, text));
                    }
                }
            }
            rel_types::TABLE => {
                if let Some(bytes) = package.get(&target) {
                    let table = TableXml::parse(&target, bytes)?;
                    manifest.mark_parsed(&target, Some(sheet_index));
                    let mut spec = TableSpec::from_wire(table)?;
                    spec.part_path = Some(target.clone());
                    sheet.tables.push(spec);
                }
            }
            rel_types::VML_DRAWING | rel_types::PRINTER_SETTINGS | rel_types::DRAWING => {
                // Sheet-owned but unparsed: preserved byte-for-byte unless
                // the owning sheet's comment set is cleared.
                manifest.bind_sheet(&target, sheet_index);
            }
            _ => {}
        }
    }
    Ok(())
}

fn check_string_length(text: &str, options: &ReadOptions) -> Result<()> {
    if exceeds(text.len() as u64, options.max_string_length) {
        return Err(Error::Security(format!(
            "string of {} bytes exceeds limit {}",
            text.len(),
            options.max_string_length
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::entries_to_buffer;

    fn minimal_entries() -> Vec<(String, Vec<u8>)> {
        vec![
            (
                "[Content_Types].xml".to_string(),
                br#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#.to_vec(),
            ),
            (
                "_rels/.rels".to_string(),
                br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_vec(),
            ),
            (
                "xl/workbook.xml".to_string(),
                br#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_vec(),
            ),
            (
                "xl/_rels/workbook.xml.rels".to_string(),
                br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_vec(),
            ),
            (
                "xl/worksheets/sheet1.xml".to_string(),
                br#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:B1"/><sheetData><row r="1"><c r="A1"><v>10</v></c><c r="B1" t="inlineStr"><is><t>hi</t></is></c></row></sheetData></worksheet>"#.to_vec(),
            ),
        ]
    }

    #[test]
    fn test_open_minimal_workbook() {
        let buf = entries_to_buffer(&minimal_entries()).unwrap();
        let wb = Workbook::open_from_buffer(&buf).unwrap();
        assert_eq!(wb.sheet_names(), vec!["Sheet1"]);
        assert_eq!(
            wb.sheet("Sheet1").unwrap().value("A1").unwrap(),
            CellValue::Number(10.0)
        );
        assert_eq!(
            wb.sheet("Sheet1").unwrap().value("B1").unwrap(),
            CellValue::Text("hi".to_string())
        );
        // Missing styles.xml is a warning, not an error.
        assert_eq!(wb.warnings, vec![Warning::MissingStylesXml]);
        assert!(wb.is_clean());
    }

    #[test]
    fn test_missing_workbook_part_is_fatal() {
        let entries: Vec<_> = minimal_entries()
            .into_iter()
            .filter(|(name, _)| name != "xl/workbook.xml")
            .collect();
        let buf = entries_to_buffer(&entries).unwrap();
        let err = Workbook::open_from_buffer(&buf).unwrap_err();
        match err {
            Error::Parse(e) => assert_eq!(e.location, "xl/workbook.xml"),
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_worksheet_part_is_fatal() {
        let entries: Vec<_> = minimal_entries()
            .into_iter()
            .filter(|(name, _)| name != "xl/worksheets/sheet1.xml")
            .collect();
        let buf = entries_to_buffer(&entries).unwrap();
        let err = Workbook::open_from_buffer(&buf).unwrap_err();
        match err {
            Error::Parse(e) => {
                assert!(e.message.contains("not in the archive"), "{}", e.message)
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_sheets_element_is_fatal() {
        let mut entries = minimal_entries();
        entries[2].1 = br#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><workbookPr/></workbook>"#.to_vec();
        let buf = entries_to_buffer(&entries).unwrap();
        let err = Workbook::open_from_buffer(&buf).unwrap_err();
        match err {
            Error::Parse(e) => {
                assert_eq!(e.message, "Missing required child element: sheets")
            }
            other => panic!("expected Parse, got {other:?}"),
        }
    }

    #[test]
    fn test_non_zip_input_is_fatal() {
        let err = Workbook::open_from_buffer(b"BM not a workbook").unwrap_err();
        assert!(matches!(err, Error::Zip(_)));
    }

    #[test]
    fn test_cell_count_limit() {
        let buf = entries_to_buffer(&minimal_entries()).unwrap();
        let options = ReadOptions {
            max_cell_count: 1,
            ..ReadOptions::default()
        };
        let err = Workbook::open_from_buffer_with_options(&buf, &options).unwrap_err();
        match err {
            Error::Security(msg) => assert!(msg.contains("cell count"), "{msg}"),
            other => panic!("expected Security, got {other:?}"),
        }
    }

    #[test]
    fn test_manifest_marks_parsed_and_unparsed_parts() {
        let mut entries = minimal_entries();
        entries.push(("xl/media/image1.png".to_string(), vec![0x89, 0x50, 0x4e]));
        let buf = entries_to_buffer(&entries).unwrap();
        let wb = Workbook::open_from_buffer(&buf).unwrap();
        let manifest = &wb.source.as_ref().unwrap().manifest;
        assert!(manifest.get("xl/workbook.xml").unwrap().parsed);
        assert!(!manifest.get("xl/media/image1.png").unwrap().parsed);
        assert_eq!(
            manifest.get("xl/worksheets/sheet1.xml").unwrap().sheet_index,
            Some(0)
        );
    }

    #[test]
    fn test_doctype_in_part_is_rejected() {
        let mut entries = minimal_entries();
        entries[2].1 = br#"<!DOCTYPE workbook [<!ENTITY x SYSTEM "file:///etc/passwd">]><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheets><sheet name="S" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_vec();
        let buf = entries_to_buffer(&entries).unwrap();
        let err = Workbook::open_from_buffer(&buf).unwrap_err();
        match err {
            Error::Parse(e) => assert!(e.message.contains("XML parse"), "{}", e.message),
            other => panic!("expected Parse, got {other:?}"),
        }
    }
}
