//! End-to-end surgical write scenarios: byte preservation of untouched
//! parts, structural-part regeneration, comment part cleanup, and strategy
//! selection.

use cellkit_core::limits::ReadOptions;
use cellkit_core::package::{entries_to_buffer, Package};
use cellkit_core::{CellValue, Comment, Sheet, Workbook, WriterConfig};

fn entry(name: &str, body: &str) -> (String, Vec<u8>) {
    (name.to_string(), body.as_bytes().to_vec())
}

/// A two-sheet source workbook with shared strings, a themed style, a
/// comment on Sheet1, and an unparsed binary part.
fn source_workbook() -> Vec<(String, Vec<u8>)> {
    vec![
        entry(
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="vml" ContentType="application/vnd.openxmlformats-officedocument.vmlDrawing"/><Default Extension="bin" ContentType="application/octet-stream"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/worksheets/sheet2.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/><Override PartName="/xl/comments1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml"/></Types>"#,
        ),
        entry(
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#,
        ),
        entry(
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:mc="http://schemas.openxmlformats.org/markup-compatibility/2006" mc:Ignorable="x15 xr" xmlns:x15="http://schemas.microsoft.com/office/spreadsheetml/2010/11/main" xmlns:xr="http://schemas.microsoft.com/office/spreadsheetml/2014/revision"><workbookPr defaultThemeVersion="166925"/><sheets><sheet name="Sheet1" sheetId="1" r:id="rId1"/><sheet name="Sheet2" sheetId="2" r:id="rId2"/></sheets><calcPr calcId="191029"/></workbook>"#,
        ),
        entry(
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet2.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#,
        ),
        entry(
            "xl/worksheets/sheet1.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><dimension ref="A1:B1"/><sheetData><row r="1"><c r="A1" t="s"><v>0</v></c><c r="B1"><v>7</v></c></row></sheetData><legacyDrawing r:id="rId2"/></worksheet>"#,
        ),
        entry(
            "xl/worksheets/_rels/sheet1.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="../comments1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/vmlDrawing" Target="../drawings/vmlDrawing1.vml"/></Relationships>"#,
        ),
        entry(
            "xl/worksheets/sheet2.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><dimension ref="A1:A2"/><sheetData><row r="1"><c r="A1" s="1" t="s"><v>1</v></c></row><row r="2"><c r="A2"><v>3.25</v></c></row></sheetData></worksheet>"#,
        ),
        entry(
            "xl/comments1.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><authors><author>Alice</author></authors><commentList><comment ref="A1" authorId="0"><text><r><rPr><b/><sz val="9"/><rFont val="Tahoma"/></rPr><t>Alice:</t></r><r><rPr><sz val="9"/><rFont val="Tahoma"/></rPr><t xml:space="preserve">
check this</t></r></text></comment></commentList></comments>"#,
        ),
        entry(
            "xl/drawings/vmlDrawing1.vml",
            "<xml xmlns:v=\"urn:schemas-microsoft-com:vml\" xmlns:o=\"urn:schemas-microsoft-com:office:office\" xmlns:x=\"urn:schemas-microsoft-com:office:excel\">\n <v:shape id=\"_x0000_s1025\" type=\"#_x0000_t202\"><x:ClientData ObjectType=\"Note\"><x:Row>0</x:Row><x:Column>0</x:Column></x:ClientData></v:shape>\n</xml>",
        ),
        entry(
            "xl/styles.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="1"><font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font></fonts><fills count="3"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor theme="0" tint="-4.9989318521683403E-2"/><bgColor indexed="64"/></patternFill></fill></fills><borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="0" fontId="0" fillId="2" borderId="0" xfId="0" applyFill="1"/></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles></styleSheet>"#,
        ),
        entry(
            "xl/sharedStrings.xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="2" uniqueCount="2"><si><t>alpha</t></si><si><t>beta</t></si></sst>"#,
        ),
        ("xl/media/blob.bin".to_string(), vec![0xde, 0xad, 0xbe, 0xef, 0x01]),
    ]
}

fn source_bytes() -> Vec<u8> {
    entries_to_buffer(&source_workbook()).unwrap()
}

fn part<'a>(package: &'a Package, name: &str) -> &'a [u8] {
    package
        .get(name)
        .unwrap_or_else(|| panic!("missing part {name}"))
}

#[test]
fn unmodified_sheet_and_unparsed_parts_preserved_byte_for_byte() {
    let src = source_bytes();
    let mut wb = Workbook::open_from_buffer(&src).unwrap();
    wb.update("Sheet1", |sheet| sheet.put("B1", 99.0)).unwrap();

    let out = wb.save_to_buffer(&WriterConfig::default()).unwrap();
    let output = Package::read(&out, &ReadOptions::default()).unwrap();
    let source = Package::read(&src, &ReadOptions::default()).unwrap();

    assert_eq!(
        part(&output, "xl/worksheets/sheet2.xml"),
        part(&source, "xl/worksheets/sheet2.xml")
    );
    assert_eq!(part(&output, "xl/media/blob.bin"), part(&source, "xl/media/blob.bin"));
    // No style/metadata change, so structural parts copied too.
    assert_eq!(part(&output, "xl/styles.xml"), part(&source, "xl/styles.xml"));
    assert_eq!(part(&output, "xl/workbook.xml"), part(&source, "xl/workbook.xml"));

    let back = Workbook::open_from_buffer(&out).unwrap();
    assert_eq!(
        back.sheet("Sheet1").unwrap().value("B1").unwrap(),
        CellValue::Number(99.0)
    );
    // The untouched shared string reference still resolves.
    assert_eq!(
        back.sheet("Sheet1").unwrap().value("A1").unwrap(),
        CellValue::Text("alpha".to_string())
    );
}

#[test]
fn sheet_add_preserves_existing_sheets_and_updates_structure() {
    let src = source_bytes();
    let mut wb = Workbook::open_from_buffer(&src).unwrap();
    wb.put(Sheet::new("NewSheet").unwrap()).unwrap();

    let out = wb.save_to_buffer(&WriterConfig::default()).unwrap();
    let output = Package::read(&out, &ReadOptions::default()).unwrap();
    let source = Package::read(&src, &ReadOptions::default()).unwrap();

    // Existing sheet bytes untouched.
    assert_eq!(
        part(&output, "xl/worksheets/sheet2.xml"),
        part(&source, "xl/worksheets/sheet2.xml")
    );
    assert_eq!(
        part(&output, "xl/worksheets/sheet1.xml"),
        part(&source, "xl/worksheets/sheet1.xml")
    );

    // Structure references the new sheet part.
    let ct = String::from_utf8(part(&output, "[Content_Types].xml").to_vec()).unwrap();
    assert!(ct.contains("/xl/worksheets/sheet3.xml"), "{ct}");
    let rels = String::from_utf8(part(&output, "xl/_rels/workbook.xml.rels").to_vec()).unwrap();
    assert!(rels.contains("worksheets/sheet3.xml"), "{rels}");

    // The workbook root keeps its namespace prolog and mc:Ignorable.
    let workbook = String::from_utf8(part(&output, "xl/workbook.xml").to_vec()).unwrap();
    assert!(workbook.contains("mc:Ignorable=\"x15 xr\""), "{workbook}");
    assert!(workbook.contains("<sheet name=\"NewSheet\" sheetId=\"3\" r:id=\"rId5\"/>"), "{workbook}");
    assert!(workbook.contains("<workbookPr defaultThemeVersion=\"166925\"/>"));

    let back = Workbook::open_from_buffer(&out).unwrap();
    assert_eq!(back.sheet_names(), vec!["Sheet1", "Sheet2", "NewSheet"]);
}

#[test]
fn comment_removal_cleans_up_every_trace() {
    let src = source_bytes();
    let mut wb = Workbook::open_from_buffer(&src).unwrap();
    assert_eq!(wb.sheet("Sheet1").unwrap().comments.len(), 1);
    wb.update("Sheet1", |sheet| {
        assert!(sheet.remove_comment("A1")?);
        Ok(())
    })
    .unwrap();

    let out = wb.save_to_buffer(&WriterConfig::default()).unwrap();
    let output = Package::read(&out, &ReadOptions::default()).unwrap();

    assert!(!output.contains("xl/comments1.xml"));
    assert!(!output.contains("xl/drawings/vmlDrawing1.vml"));
    let ct = String::from_utf8(part(&output, "[Content_Types].xml").to_vec()).unwrap();
    assert!(!ct.contains("comments1.xml"), "{ct}");
    let rels = String::from_utf8(part(&output, "xl/worksheets/_rels/sheet1.xml.rels").to_vec());
    // Either the rels part is gone or it no longer mentions the dead parts.
    if let Ok(rels) = rels {
        assert!(!rels.contains("comments1.xml"), "{rels}");
        assert!(!rels.contains("vmlDrawing1.vml"), "{rels}");
    }
    let sheet_xml = String::from_utf8(part(&output, "xl/worksheets/sheet1.xml").to_vec()).unwrap();
    assert!(!sheet_xml.contains("legacyDrawing"), "{sheet_xml}");

    let back = Workbook::open_from_buffer(&out).unwrap();
    assert!(back.sheet("Sheet1").unwrap().comments.is_empty());
}

#[test]
fn comment_author_prefix_roundtrips_through_source() {
    let src = source_bytes();
    let wb = Workbook::open_from_buffer(&src).unwrap();
    let comment = wb.sheet("Sheet1").unwrap().comments.get(&(1, 1)).unwrap();
    assert_eq!(comment.author, "Alice");
    assert_eq!(comment.text.to_plain_text(), "check this");
}

#[test]
fn theme_color_survives_style_regeneration() {
    let src = source_bytes();
    let mut wb = Workbook::open_from_buffer(&src).unwrap();
    // Touch an unrelated cell and add a brand-new style, forcing styles.xml
    // to regenerate.
    wb.update("Sheet2", |sheet| {
        sheet.put("B2", 1.0)?;
        sheet.with_cell_style(
            "B2",
            cellkit_core::CellStyle {
                font: cellkit_core::style::Font {
                    bold: true,
                    ..Default::default()
                },
                ..Default::default()
            },
        )
    })
    .unwrap();

    let out = wb.save_to_buffer(&WriterConfig::default()).unwrap();
    let output = Package::read(&out, &ReadOptions::default()).unwrap();
    let styles = String::from_utf8(part(&output, "xl/styles.xml").to_vec()).unwrap();
    assert!(
        styles.contains("<fgColor theme=\"0\" tint=\"-4.9989318521683403E-2\"/>"),
        "{styles}"
    );
    assert!(!styles.contains("rgb=\"00000000\""), "{styles}");
    // The new style appended after the original two cellXfs.
    assert!(styles.contains("cellXfs count=\"3\""), "{styles}");
}

#[test]
fn style_ids_stable_for_cells_on_regenerated_sheets() {
    let src = source_bytes();
    let mut wb = Workbook::open_from_buffer(&src).unwrap();
    // A2 changes; A1 keeps its themed style id 1.
    wb.update("Sheet2", |sheet| sheet.put("A2", 99.0)).unwrap();

    let out = wb.save_to_buffer(&WriterConfig::default()).unwrap();
    let output = Package::read(&out, &ReadOptions::default()).unwrap();
    let sheet_xml = String::from_utf8(part(&output, "xl/worksheets/sheet2.xml").to_vec()).unwrap();
    assert!(sheet_xml.contains("<c r=\"A1\" s=\"1\" t=\"s\"><v>1</v></c>"), "{sheet_xml}");
}

#[test]
fn sst_extension_is_append_only() {
    let src = source_bytes();
    let mut wb = Workbook::open_from_buffer(&src).unwrap();
    wb.update("Sheet1", |sheet| sheet.put("C1", "gamma")).unwrap();

    let out = wb.save_to_buffer(&WriterConfig::default()).unwrap();
    let output = Package::read(&out, &ReadOptions::default()).unwrap();
    let sst = String::from_utf8(part(&output, "xl/sharedStrings.xml").to_vec()).unwrap();
    let alpha = sst.find("<si><t>alpha</t></si>").unwrap();
    let beta = sst.find("<si><t>beta</t></si>").unwrap();
    let gamma = sst.find("<si><t>gamma</t></si>").unwrap();
    assert!(alpha < beta && beta < gamma, "{sst}");
    assert!(sst.contains("uniqueCount=\"3\""), "{sst}");

    // The regenerated sheet references the table, not inline strings.
    let sheet_xml = String::from_utf8(part(&output, "xl/worksheets/sheet1.xml").to_vec()).unwrap();
    assert!(sheet_xml.contains("<c r=\"C1\" t=\"s\"><v>2</v></c>"), "{sheet_xml}");
    assert!(!sheet_xml.contains("inlineStr"), "{sheet_xml}");

    // Verbatim Sheet2 still resolves its old index.
    let back = Workbook::open_from_buffer(&out).unwrap();
    assert_eq!(
        back.sheet("Sheet2").unwrap().value("A1").unwrap(),
        CellValue::Text("beta".to_string())
    );
}

#[test]
fn verbatim_copy_for_clean_workbook() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.xlsx");
    std::fs::write(&source_path, source_bytes()).unwrap();

    let wb = Workbook::open(&source_path).unwrap();
    assert!(wb.is_clean());
    let out_path = dir.path().join("copy.xlsx");
    wb.save(&out_path).unwrap();

    assert_eq!(
        std::fs::read(&source_path).unwrap(),
        std::fs::read(&out_path).unwrap()
    );
}

#[test]
fn fingerprint_mismatch_falls_back_to_hybrid() {
    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("source.xlsx");
    std::fs::write(&source_path, source_bytes()).unwrap();

    let wb = Workbook::open(&source_path).unwrap();
    // The file changes on disk after parse.
    std::fs::write(&source_path, b"tampered").unwrap();

    let out_path = dir.path().join("out.xlsx");
    wb.save(&out_path).unwrap();
    let out = std::fs::read(&out_path).unwrap();
    assert_ne!(out, b"tampered".to_vec());
    let back = Workbook::open_from_buffer(&out).unwrap();
    assert_eq!(back.sheet_names(), vec!["Sheet1", "Sheet2"]);
    assert_eq!(
        back.sheet("Sheet1").unwrap().value("A1").unwrap(),
        CellValue::Text("alpha".to_string())
    );
}

#[test]
fn sheet_removal_drops_its_parts() {
    let src = source_bytes();
    let mut wb = Workbook::open_from_buffer(&src).unwrap();
    wb.remove("Sheet1").unwrap();

    let out = wb.save_to_buffer(&WriterConfig::default()).unwrap();
    let output = Package::read(&out, &ReadOptions::default()).unwrap();
    assert!(!output.contains("xl/worksheets/sheet1.xml"));
    assert!(!output.contains("xl/comments1.xml"));
    assert!(!output.contains("xl/drawings/vmlDrawing1.vml"));
    assert!(!output.contains("xl/worksheets/_rels/sheet1.xml.rels"));

    let ct = String::from_utf8(part(&output, "[Content_Types].xml").to_vec()).unwrap();
    assert!(!ct.contains("sheet1.xml"), "{ct}");
    assert!(!ct.contains("comments1.xml"), "{ct}");

    let back = Workbook::open_from_buffer(&out).unwrap();
    assert_eq!(back.sheet_names(), vec!["Sheet2"]);
    assert_eq!(
        back.sheet("Sheet2").unwrap().value("A1").unwrap(),
        CellValue::Text("beta".to_string())
    );
}

#[test]
fn both_backends_produce_equivalent_hybrid_output() {
    let src = source_bytes();
    let mut wb = Workbook::open_from_buffer(&src).unwrap();
    wb.update("Sheet1", |sheet| sheet.put("B1", 123.0)).unwrap();

    let dom = wb.save_to_buffer(&WriterConfig::default()).unwrap();
    let stream = wb.save_to_buffer(&WriterConfig::fast()).unwrap();

    let dom_package = Package::read(&dom, &ReadOptions::default()).unwrap();
    let stream_package = Package::read(&stream, &ReadOptions::default()).unwrap();
    let dom_names: Vec<_> = dom_package.names().collect();
    let stream_names: Vec<_> = stream_package.names().collect();
    assert_eq!(dom_names, stream_names);

    let a = Workbook::open_from_buffer(&dom).unwrap();
    let b = Workbook::open_from_buffer(&stream).unwrap();
    assert_eq!(
        a.sheet("Sheet1").unwrap().value("B1").unwrap(),
        b.sheet("Sheet1").unwrap().value("B1").unwrap()
    );
}

#[test]
fn hybrid_output_is_deterministic() {
    let src = source_bytes();
    let mut wb = Workbook::open_from_buffer(&src).unwrap();
    wb.update("Sheet1", |sheet| sheet.put("B1", 5.0)).unwrap();
    let config = WriterConfig::default();
    assert_eq!(
        wb.save_to_buffer(&config).unwrap(),
        wb.save_to_buffer(&config).unwrap()
    );
}

#[test]
fn adding_comment_to_uncommented_sheet_creates_sidecars() {
    let src = source_bytes();
    let mut wb = Workbook::open_from_buffer(&src).unwrap();
    wb.update("Sheet2", |sheet| {
        sheet.comment("A2", Comment::new("Bob", "why 3.25?"))
    })
    .unwrap();

    let out = wb.save_to_buffer(&WriterConfig::default()).unwrap();
    let output = Package::read(&out, &ReadOptions::default()).unwrap();
    assert!(output.contains("xl/comments2.xml"));
    assert!(output.contains("xl/drawings/vmlDrawing2.vml"));
    let ct = String::from_utf8(part(&output, "[Content_Types].xml").to_vec()).unwrap();
    assert!(ct.contains("/xl/comments2.xml"), "{ct}");
    let rels =
        String::from_utf8(part(&output, "xl/worksheets/_rels/sheet2.xml.rels").to_vec()).unwrap();
    assert!(rels.contains("comments2.xml"), "{rels}");
    assert!(rels.contains("vmlDrawing2.vml"), "{rels}");

    let back = Workbook::open_from_buffer(&out).unwrap();
    let comment = back.sheet("Sheet2").unwrap().comments.get(&(2, 1)).unwrap();
    assert_eq!(comment.author, "Bob");
    assert_eq!(comment.text.to_plain_text(), "why 3.25?");
}

#[test]
fn roundtrip_fidelity_for_programmatic_workbook() {
    let mut wb = Workbook::new();
    wb.update("Sheet1", |sheet| {
        sheet.put("A1", "text")?;
        sheet.put("A2", 1.5)?;
        sheet.put("A3", true)?;
        sheet.put("A4", CellValue::Error(cellkit_core::CellError::DivideByZero))?;
        sheet.put(
            "A5",
            CellValue::Formula {
                expr: "A2*2".to_string(),
                cached: Some(Box::new(CellValue::Number(3.0))),
            },
        )?;
        sheet.put("A6", "=not a formula")?;
        sheet.merge(cellkit_core::CellRange::parse("C1:D2").unwrap())?;
        sheet.set_row_properties(
            2,
            cellkit_core::RowProperties {
                height: Some(30.0),
                hidden: true,
                ..Default::default()
            },
        )?;
        sheet.set_column_properties(
            1,
            cellkit_core::ColumnProperties {
                width: Some(17.25),
                custom_width: true,
                ..Default::default()
            },
        )
    })
    .unwrap();

    let buf = wb.save_to_buffer(&WriterConfig::default()).unwrap();
    let back = Workbook::open_from_buffer(&buf).unwrap();
    let sheet = back.sheet("Sheet1").unwrap();
    assert_eq!(sheet.value("A1").unwrap(), CellValue::Text("text".to_string()));
    assert_eq!(sheet.value("A2").unwrap(), CellValue::Number(1.5));
    assert_eq!(sheet.value("A3").unwrap(), CellValue::Bool(true));
    assert_eq!(
        sheet.value("A4").unwrap(),
        CellValue::Error(cellkit_core::CellError::DivideByZero)
    );
    assert_eq!(
        sheet.value("A5").unwrap(),
        CellValue::Formula {
            expr: "A2*2".to_string(),
            cached: Some(Box::new(CellValue::Number(3.0))),
        }
    );
    // Leading '=' text stays text.
    assert_eq!(
        sheet.value("A6").unwrap(),
        CellValue::Text("=not a formula".to_string())
    );
    assert_eq!(sheet.merged.len(), 1);
    assert_eq!(sheet.merged[0].to_a1(), "C1:D2");
    assert_eq!(sheet.row_props.get(&2).unwrap().height, Some(30.0));
    assert!(sheet.row_props.get(&2).unwrap().hidden);
    assert_eq!(sheet.col_props.get(&1).unwrap().width, Some(17.25));
}
