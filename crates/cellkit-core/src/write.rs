//! The surgical writer.
//!
//! Three strategies, tried in order:
//!
//! 1. **Verbatim copy** — the workbook is clean and the source file still
//!    matches its fingerprint: the source bytes are copied unchanged.
//! 2. **Hybrid** — a source context exists: every entry of the source
//!    manifest is planned as copy / regenerate / drop, new parts are
//!    inserted, and the plan executes linearly into the output ZIP.
//! 3. **Full regeneration** — no source: every part is emitted from the
//!    domain model over minimal defaults.
//!
//! All paths stream to a temporary file and atomically rename on success;
//! a failed write leaves no partial destination.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use cellkit_xml::comments::{CommentXml, CommentsXml};
use cellkit_xml::content_types::{build_content_types, mime_types};
use cellkit_xml::emit::{XmlBackend, XmlEmit};
use cellkit_xml::raw::RawElement;
use cellkit_xml::relationships::{
    rel_types, relative_target, rels_part_path, resolve_target, Relationship, Relationships,
};
use cellkit_xml::shared_strings::{RichTextXml, SstXml};
use cellkit_xml::stream_writer::StreamXmlWriter;
use cellkit_xml::worksheet::{CellXml, FormulaXml, RowXml, WorksheetXml};

use crate::error::{Error, Result};
use crate::manifest::{fingerprint, SourceContext};
use crate::package::entries_to_buffer;
use crate::sheet::{format_number, row_props_to_wire, Cell, Sheet};
use crate::style_index::StyleIndex;
use crate::utils::cell_ref::coordinates_to_cell_name;
use crate::value::{datetime_to_serial, CellValue};
use crate::workbook::Workbook;

/// Shared-string emission policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SstPolicy {
    /// Every string cell references the shared string table.
    Always,
    /// Every string cell is written inline.
    Never,
    /// Use the table when it pays: more string cells than unique strings,
    /// and more than ten string cells overall.
    #[default]
    Auto,
}

/// Defense against formula injection through text cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormulaInjectionPolicy {
    /// Pass text through untouched.
    #[default]
    None,
    /// Prefix `'` to text whose first character is `=`, `+`, `-`, or `@`.
    Escape,
}

/// Writer configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriterConfig {
    pub backend: XmlBackend,
    pub sst_policy: SstPolicy,
    pub formula_injection_policy: FormulaInjectionPolicy,
}

impl WriterConfig {
    /// DOM backend, Auto SST, formula escaping on.
    pub fn secure() -> Self {
        Self {
            formula_injection_policy: FormulaInjectionPolicy::Escape,
            ..Self::default()
        }
    }

    /// Streaming backend, Auto SST, no escaping.
    pub fn fast() -> Self {
        Self {
            backend: XmlBackend::Stream,
            ..Self::default()
        }
    }
}

/// Apply the injection escape. Idempotent: an already-escaped value is
/// returned unchanged.
pub fn escape_formula_text(s: &str) -> String {
    match s.as_bytes().first() {
        Some(b'=') | Some(b'+') | Some(b'-') | Some(b'@') => format!("'{s}"),
        _ => s.to_string(),
    }
}

impl Workbook {
    /// Save with the default configuration.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_with_config(path, &WriterConfig::default())
    }

    /// Save, choosing the cheapest valid strategy.
    pub fn save_with_config<P: AsRef<Path>>(&self, path: P, config: &WriterConfig) -> Result<()> {
        if let Some(ctx) = &self.source {
            if ctx.tracker.is_clean() {
                if let Some(source_path) = &ctx.source_path {
                    if let Ok(bytes) = std::fs::read(source_path) {
                        if fingerprint(&bytes) == ctx.fingerprint {
                            return write_atomically(path.as_ref(), &bytes);
                        }
                    }
                    // Fingerprint mismatch: the file changed under us; fall
                    // through to the hybrid strategy, which writes from the
                    // bytes retained at parse time.
                }
            }
        }
        let buf = self.save_to_buffer(config)?;
        write_atomically(path.as_ref(), &buf)
    }

    /// Serialize to an in-memory `.xlsx` buffer.
    pub fn save_to_buffer(&self, config: &WriterConfig) -> Result<Vec<u8>> {
        let entries = match &self.source {
            Some(ctx) => build_hybrid_entries(self, ctx, config)?,
            None => build_full_entries(self, config)?,
        };
        entries_to_buffer(&entries)
    }
}

/// Write bytes to `path` through a sibling temp file and an atomic rename.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => std::path::PathBuf::from("."),
    };
    std::fs::create_dir_all(&parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
    std::io::Write::write_all(&mut tmp, bytes)?;
    tmp.persist(path)
        .map_err(|e| Error::Io(e.error))?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared string interning
// ---------------------------------------------------------------------------

/// Append-only shared string builder. Seeding from a source table keeps
/// every original index valid for byte-copied sheets.
struct SstBuilder {
    items: Vec<RichTextXml>,
    by_key: HashMap<String, usize>,
    original_len: usize,
    refs: u64,
}

impl SstBuilder {
    fn new(original: Option<&SstXml>) -> Self {
        let items: Vec<RichTextXml> = original
            .map(|sst| sst.items.clone())
            .unwrap_or_default();
        let mut by_key = HashMap::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
            by_key.entry(item_key(item)).or_insert(i);
        }
        Self {
            original_len: items.len(),
            items,
            by_key,
            refs: 0,
        }
    }

    fn intern(&mut self, item: &RichTextXml) -> usize {
        self.refs += 1;
        let key = item_key(item);
        if let Some(&index) = self.by_key.get(&key) {
            return index;
        }
        let index = self.items.len();
        self.items.push(item.clone());
        self.by_key.insert(key, index);
        index
    }

    /// Account for string cells living on byte-copied sheets.
    fn count_external_refs(&mut self, n: u64) {
        self.refs += n;
    }

    fn has_new_entries(&self) -> bool {
        self.items.len() > self.original_len
    }

    fn to_sst(&self) -> SstXml {
        let unique = self.items.len() as u64;
        SstXml {
            count: Some(self.refs.max(unique)),
            unique_count: Some(unique),
            items: self.items.clone(),
            other_attrs: Vec::new(),
        }
    }
}

/// Deterministic dedup key: the rendered `<si>` body.
fn item_key(item: &RichTextXml) -> String {
    let mut w = StreamXmlWriter::new();
    item.emit_body(&mut w);
    String::from_utf8(w.take()).unwrap_or_default()
}

fn string_cell_count(sheet: &Sheet) -> u64 {
    sheet
        .cells
        .values()
        .filter(|c| c.value.is_string())
        .count() as u64
}

/// The Auto heuristic over a set of sheets.
fn auto_wants_sst<'a>(sheets: impl Iterator<Item = &'a Sheet>) -> bool {
    let mut total = 0u64;
    let mut unique: HashSet<String> = HashSet::new();
    for sheet in sheets {
        for cell in sheet.cells.values() {
            match &cell.value {
                CellValue::Text(s) => {
                    total += 1;
                    unique.insert(s.clone());
                }
                CellValue::Rich(r) => {
                    total += 1;
                    unique.insert(item_key(&r.to_wire()));
                }
                _ => {}
            }
        }
    }
    total > unique.len() as u64 && total > 10
}

// ---------------------------------------------------------------------------
// Worksheet emission
// ---------------------------------------------------------------------------

/// Map a sheet's local style registry onto global cellXf indices.
///
/// On a surgical build, registry entries that came from the source keep
/// their original indices; everything else goes through the index.
fn build_style_map(sheet: &Sheet, index: &mut StyleIndex, surgical: bool) -> HashMap<u32, u32> {
    let mut map = HashMap::with_capacity(sheet.styles.len());
    for (local, style) in sheet.styles.iter().enumerate() {
        let global = if surgical && local < sheet.styles_from_source {
            local as u32
        } else {
            index.intern(style)
        };
        map.insert(local as u32, global);
    }
    map
}

/// Render one domain sheet to its wire form. The dimension is recomputed
/// from the actual cell set; the preserved metadata blob supplies the
/// sections this writer does not manage.
fn sheet_to_wire(
    sheet: &Sheet,
    style_map: &HashMap<u32, u32>,
    mut sst: Option<&mut SstBuilder>,
    policy: FormulaInjectionPolicy,
) -> WorksheetXml {
    let mut ws = WorksheetXml::default();
    if let Some(attrs) = &sheet.wire_root_attrs {
        ws.root_attrs = attrs.clone();
    }
    // Relationship references (legacyDrawing, hyperlinks) need the r prefix
    // bound on the root.
    if !ws.root_attrs.iter().any(|(name, _)| name == "xmlns:r") {
        ws.root_attrs.push((
            "xmlns:r".to_string(),
            cellkit_xml::namespaces::RELATIONSHIPS.to_string(),
        ));
    }
    ws.dimension = Some(sheet.dimension());
    if let Some(metadata) = &sheet.metadata {
        ws.sections = metadata.clone();
    }

    ws.cols = sheet.coalesced_cols();
    for col in &mut ws.cols {
        col.style = col.style.and_then(|id| style_map.get(&id).copied());
    }

    let mut rows: std::collections::BTreeMap<u32, RowXml> = sheet
        .row_props
        .iter()
        .map(|(&row, props)| {
            let mut wire = row_props_to_wire(row, props);
            // Never emit a row pointing at a style the table does not have.
            wire.s = wire.s.and_then(|id| style_map.get(&id).copied());
            if wire.s.is_none() {
                wire.custom_format = None;
            }
            (row, wire)
        })
        .collect();

    for (&(row, col), cell) in &sheet.cells {
        let Ok(cell_ref) = coordinates_to_cell_name(col, row) else {
            continue;
        };
        let wire = encode_cell(cell_ref, cell, style_map, &mut sst, policy);
        rows.entry(row)
            .or_insert_with(|| RowXml {
                r: row,
                ..RowXml::default()
            })
            .cells
            .push(wire);
    }

    for row in rows.values_mut() {
        if let (Some(first), Some(last)) = (row.cells.first(), row.cells.last()) {
            let span = |r: &CellXml| {
                crate::utils::cell_ref::cell_name_to_coordinates(&r.r)
                    .map(|(c, _)| c)
                    .unwrap_or(1)
            };
            row.spans = Some(format!("{}:{}", span(first), span(last)));
        }
    }
    ws.rows = rows.into_values().collect();
    ws.merged = sheet.merged.iter().map(|m| m.to_a1()).collect();
    ws
}

fn encode_cell(
    cell_ref: String,
    cell: &Cell,
    style_map: &HashMap<u32, u32>,
    sst: &mut Option<&mut SstBuilder>,
    policy: FormulaInjectionPolicy,
) -> CellXml {
    let mut wire = CellXml {
        r: cell_ref,
        s: cell.style_id.and_then(|id| style_map.get(&id).copied()),
        ..CellXml::default()
    };
    match &cell.value {
        CellValue::Empty => {}
        CellValue::Bool(b) => {
            wire.t = Some("b".to_string());
            wire.v = Some(if *b { "1" } else { "0" }.to_string());
        }
        CellValue::Number(n) => {
            wire.v = Some(format_number(*n));
        }
        CellValue::DateTime(dt) => {
            wire.v = Some(format_number(datetime_to_serial(dt)));
        }
        CellValue::Text(text) => {
            let text = match policy {
                FormulaInjectionPolicy::None => text.clone(),
                FormulaInjectionPolicy::Escape => escape_formula_text(text),
            };
            encode_string(&mut wire, RichTextXml::plain(text), sst);
        }
        CellValue::Rich(rich) => {
            encode_string(&mut wire, rich.to_wire(), sst);
        }
        CellValue::Formula { expr, cached } => {
            wire.f = Some(FormulaXml {
                attrs: Vec::new(),
                text: expr.clone(),
            });
            match cached.as_deref() {
                // A formula without a cached value carries no `t` at all;
                // `t="str"` here trips Excel's repair dialog.
                None => {}
                Some(CellValue::Number(n)) => wire.v = Some(format_number(*n)),
                Some(CellValue::Bool(b)) => {
                    wire.t = Some("b".to_string());
                    wire.v = Some(if *b { "1" } else { "0" }.to_string());
                }
                Some(CellValue::Error(e)) => {
                    wire.t = Some("e".to_string());
                    wire.v = Some(e.as_str().to_string());
                }
                Some(other) => {
                    wire.t = Some("str".to_string());
                    wire.v = Some(other.to_string());
                }
            }
        }
        CellValue::Error(e) => {
            wire.t = Some("e".to_string());
            wire.v = Some(e.as_str().to_string());
        }
    }
    wire
}

fn encode_string(wire: &mut CellXml, item: RichTextXml, sst: &mut Option<&mut SstBuilder>) {
    match sst {
        Some(builder) => {
            let index = builder.intern(&item);
            wire.t = Some("s".to_string());
            wire.v = Some(index.to_string());
        }
        None => {
            wire.t = Some("inlineStr".to_string());
            wire.is = Some(item);
        }
    }
}

// ---------------------------------------------------------------------------
// Comments and their sidecars
// ---------------------------------------------------------------------------

fn comments_to_wire(sheet: &Sheet) -> CommentsXml {
    let mut part = CommentsXml::default();
    for comment in sheet.comments.values() {
        if !part.authors.contains(&comment.author) {
            part.authors.push(comment.author.clone());
        }
    }
    for (&(row, col), comment) in &sheet.comments {
        let author_id = part
            .authors
            .iter()
            .position(|a| *a == comment.author)
            .unwrap_or(0) as u32;
        let cell_ref = coordinates_to_cell_name(col, row).unwrap_or_else(|_| "A1".to_string());
        part.comments.push(CommentXml {
            cell_ref,
            author_id,
            text: comment.to_wire_text().to_wire(),
            shape_id: None,
            guid: None,
            other_attrs: Vec::new(),
        });
    }
    part
}

fn vml_for_sheet(sheet: &Sheet, output_index: usize, stride: usize) -> Vec<u8> {
    let anchors: Vec<(u32, u32)> = sheet.comments.keys().map(|&(row, col)| (col, row)).collect();
    crate::vml::build_vml_drawing(&anchors, output_index, stride).into_bytes()
}

// ---------------------------------------------------------------------------
// Full regeneration
// ---------------------------------------------------------------------------

fn build_full_entries(wb: &Workbook, config: &WriterConfig) -> Result<Vec<(String, Vec<u8>)>> {
    let backend = config.backend;
    let use_sst = match config.sst_policy {
        SstPolicy::Always => true,
        SstPolicy::Never => false,
        SstPolicy::Auto => auto_wants_sst(wb.sheets.iter()),
    };
    let mut sst_builder = use_sst.then(|| SstBuilder::new(None));

    let mut style_index = StyleIndex::fresh();
    let stride = crate::vml::shape_id_stride(
        wb.sheets.iter().map(|s| s.comments.len()).max().unwrap_or(0),
    );

    // Sheet bodies first: they intern styles and strings as they render.
    let mut sheet_bodies: Vec<Vec<u8>> = Vec::with_capacity(wb.sheets.len());
    let mut sheet_rels: Vec<Option<Relationships>> = Vec::with_capacity(wb.sheets.len());
    let mut table_parts: Vec<(String, Vec<u8>)> = Vec::new();
    let mut table_numbers: Vec<u32> = Vec::new();
    let mut next_table = 1u32;

    for (i, sheet) in wb.sheets.iter().enumerate() {
        let style_map = build_style_map(sheet, &mut style_index, false);
        let mut ws = sheet_to_wire(sheet, &style_map, sst_builder.as_mut(), config.formula_injection_policy);

        let mut rels = Relationships::default();
        if !sheet.comments.is_empty() {
            let comment_rid = rels.next_rid();
            rels.relationships.push(Relationship::new(
                comment_rid,
                rel_types::COMMENTS,
                format!("../comments{}.xml", i + 1),
            ));
            let vml_rid = rels.next_rid();
            rels.relationships.push(Relationship::new(
                vml_rid.clone(),
                rel_types::VML_DRAWING,
                format!("../drawings/vmlDrawing{}.vml", i + 1),
            ));
            let mut legacy = RawElement::new("legacyDrawing");
            legacy.attrs.push(("r:id".to_string(), vml_rid));
            ws.sections.legacy_drawing = Some(legacy);
        }
        if !sheet.tables.is_empty() {
            let mut parts = RawElement::new("tableParts");
            parts
                .attrs
                .push(("count".to_string(), sheet.tables.len().to_string()));
            for table in &sheet.tables {
                let number = next_table;
                next_table += 1;
                let path = format!("xl/tables/table{number}.xml");
                let rid = rels.next_rid();
                rels.relationships.push(Relationship::new(
                    rid.clone(),
                    rel_types::TABLE,
                    format!("../tables/table{number}.xml"),
                ));
                let mut part = RawElement::new("tablePart");
                part.attrs.push(("r:id".to_string(), rid));
                parts.children.push(cellkit_xml::raw::RawNode::Element(part));
                table_parts.push((path, table.to_wire().to_xml(backend)));
                table_numbers.push(number);
            }
            ws.sections.table_parts = Some(parts);
        }

        sheet_bodies.push(ws.to_xml(backend));
        sheet_rels.push((!rels.relationships.is_empty()).then_some(rels));
    }

    let commented: Vec<usize> = wb
        .sheets
        .iter()
        .enumerate()
        .filter(|(_, s)| !s.comments.is_empty())
        .map(|(i, _)| i)
        .collect();

    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();

    let content_types = build_content_types(
        wb.sheets.len(),
        true,
        sst_builder.is_some(),
        &commented,
        &table_numbers,
    );
    entries.push(("[Content_Types].xml".to_string(), content_types.to_xml(backend)));

    let mut package_rels = Relationships::default();
    package_rels.relationships.push(Relationship::new(
        "rId1",
        rel_types::OFFICE_DOCUMENT,
        "xl/workbook.xml",
    ));
    entries.push(("_rels/.rels".to_string(), package_rels.to_xml(backend)));

    let mut workbook_xml = cellkit_xml::workbook::WorkbookXml::default();
    let mut workbook_rels = Relationships::default();
    for (i, sheet) in wb.sheets.iter().enumerate() {
        let rid = workbook_rels.next_rid();
        workbook_rels.relationships.push(Relationship::new(
            rid.clone(),
            rel_types::WORKSHEET,
            format!("worksheets/sheet{}.xml", i + 1),
        ));
        workbook_xml.sheets.push(cellkit_xml::workbook::SheetEntry {
            name: sheet.name.clone(),
            sheet_id: i as u32 + 1,
            r_id: rid,
            state: sheet.state,
            other_attrs: Vec::new(),
        });
    }
    workbook_xml.defined_names = wb.defined_names.clone();
    let styles_rid = workbook_rels.next_rid();
    workbook_rels.relationships.push(Relationship::new(
        styles_rid,
        rel_types::STYLES,
        "styles.xml",
    ));
    if sst_builder.is_some() {
        let sst_rid = workbook_rels.next_rid();
        workbook_rels.relationships.push(Relationship::new(
            sst_rid,
            rel_types::SHARED_STRINGS,
            "sharedStrings.xml",
        ));
    }
    entries.push(("xl/workbook.xml".to_string(), workbook_xml.to_xml(backend)));
    entries.push((
        "xl/_rels/workbook.xml.rels".to_string(),
        workbook_rels.to_xml(backend),
    ));

    for (i, body) in sheet_bodies.into_iter().enumerate() {
        entries.push((format!("xl/worksheets/sheet{}.xml", i + 1), body));
    }
    for (i, rels) in sheet_rels.iter().enumerate() {
        if let Some(rels) = rels {
            entries.push((
                rels_part_path(&format!("xl/worksheets/sheet{}.xml", i + 1)),
                rels.to_xml(backend),
            ));
        }
    }

    entries.push((
        "xl/styles.xml".to_string(),
        style_index.into_styles().to_xml(backend),
    ));
    if let Some(builder) = &sst_builder {
        entries.push(("xl/sharedStrings.xml".to_string(), builder.to_sst().to_xml(backend)));
    }

    for &i in &commented {
        entries.push((
            format!("xl/comments{}.xml", i + 1),
            comments_to_wire(&wb.sheets[i]).to_xml(backend),
        ));
        entries.push((
            format!("xl/drawings/vmlDrawing{}.vml", i + 1),
            vml_for_sheet(&wb.sheets[i], i, stride),
        ));
    }
    entries.extend(table_parts);

    Ok(entries)
}

// ---------------------------------------------------------------------------
// Hybrid surgical write
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct OutSheet {
    /// Worksheet part path in the output.
    path: String,
    /// Number used for sibling part names (commentsN, vmlDrawingN).
    number: u32,
    regenerate: bool,
    source_index: Option<usize>,
}

fn sheet_part_number(path: &str) -> Option<u32> {
    let stem = path.rsplit('/').next()?;
    let digits: String = stem
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn build_hybrid_entries(
    wb: &Workbook,
    ctx: &SourceContext,
    config: &WriterConfig,
) -> Result<Vec<(String, Vec<u8>)>> {
    let backend = config.backend;
    let tracker = &ctx.tracker;
    let structural = tracker.modified_metadata || !tracker.deleted_sheets.is_empty();

    // Assign output paths: preserved sheets keep theirs, new sheets take
    // the next free number.
    let mut used_numbers: HashSet<u32> = wb
        .sheets
        .iter()
        .filter_map(|s| s.source_index)
        .filter_map(|si| ctx.sheet_paths.get(si))
        .filter_map(|p| sheet_part_number(p))
        .collect();
    let mut out_sheets: Vec<OutSheet> = Vec::with_capacity(wb.sheets.len());
    for sheet in &wb.sheets {
        match sheet.source_index {
            Some(si) => {
                let path = ctx
                    .sheet_paths
                    .get(si)
                    .cloned()
                    .unwrap_or_else(|| format!("xl/worksheets/sheet{}.xml", si + 1));
                out_sheets.push(OutSheet {
                    number: sheet_part_number(&path).unwrap_or(si as u32 + 1),
                    path,
                    regenerate: tracker.modified_sheets.contains(&si),
                    source_index: Some(si),
                });
            }
            None => {
                let mut number = wb.sheets.len() as u32;
                while !used_numbers.insert(number) {
                    number += 1;
                }
                out_sheets.push(OutSheet {
                    path: format!("xl/worksheets/sheet{number}.xml"),
                    number,
                    regenerate: true,
                    source_index: None,
                });
            }
        }
    }

    // Shared strings: when the source had a table it must be extended
    // append-only so verbatim sheets keep valid references; otherwise the
    // policy decides for regenerated content.
    let use_sst = if ctx.original_sst.is_some() {
        true
    } else {
        match config.sst_policy {
            SstPolicy::Always => true,
            SstPolicy::Never => false,
            SstPolicy::Auto => auto_wants_sst(
                wb.sheets
                    .iter()
                    .zip(&out_sheets)
                    .filter(|(_, out)| out.regenerate)
                    .map(|(s, _)| s),
            ),
        }
    };
    let mut sst_builder = use_sst.then(|| SstBuilder::new(ctx.original_sst.as_ref()));
    if let Some(builder) = &mut sst_builder {
        for (sheet, out) in wb.sheets.iter().zip(&out_sheets) {
            if !out.regenerate {
                builder.count_external_refs(string_cell_count(sheet));
            }
        }
    }

    let mut style_index = StyleIndex::surgical(&ctx.original_styles);
    let stride = crate::vml::shape_id_stride(
        wb.sheets.iter().map(|s| s.comments.len()).max().unwrap_or(0),
    );

    // Locate the source's per-sheet sibling parts.
    let comment_part_of = |si: usize| -> Option<String> {
        ctx.manifest
            .parts_for_sheet(si)
            .into_iter()
            .find(|name| ctx.content_types.content_type_of(name) == Some(mime_types::COMMENTS))
            .map(str::to_string)
    };
    let vml_part_of = |si: usize| -> Option<String> {
        ctx.manifest
            .parts_for_sheet(si)
            .into_iter()
            .find(|name| name.ends_with(".vml"))
            .map(str::to_string)
    };

    // Regenerate modified sheets. Each produces its worksheet bytes plus
    // replacement or insertion of sibling parts.
    let mut replacements: HashMap<String, Vec<u8>> = HashMap::new();
    let mut drops: HashSet<String> = HashSet::new();
    let mut inserts: Vec<(String, Vec<u8>)> = Vec::new();
    let mut content_types = ctx.content_types.clone();
    let mut ct_changed = false;
    let mut next_table_number = next_free_table_number(ctx);

    for (output_index, (sheet, out)) in wb.sheets.iter().zip(&out_sheets).enumerate() {
        if !out.regenerate {
            continue;
        }
        let style_map = build_style_map(sheet, &mut style_index, true);
        let mut ws = sheet_to_wire(
            sheet,
            &style_map,
            sst_builder.as_mut(),
            config.formula_injection_policy,
        );

        // Rebuild the sheet's relationship file from the source's, with the
        // comment/VML pair synchronized to the current comment set.
        let rels_path = rels_part_path(&out.path);
        let mut rels = match ctx.manifest.get(&rels_path) {
            Some(info) => Relationships::parse(&rels_path, &info.bytes)?,
            None => Relationships::default(),
        };
        rels.relationships
            .retain(|r| r.rel_type != rel_types::COMMENTS && r.rel_type != rel_types::VML_DRAWING);

        let original_comment_part = out.source_index.and_then(comment_part_of);
        let original_vml_part = out.source_index.and_then(vml_part_of);

        if sheet.comments.is_empty() {
            ws.sections.legacy_drawing = None;
            if let Some(part) = &original_comment_part {
                drops.insert(part.clone());
                content_types.remove_override(part);
                ct_changed = true;
            }
            if let Some(part) = &original_vml_part {
                drops.insert(part.clone());
                content_types.remove_override(part);
                ct_changed = true;
            }
        } else {
            let comment_path = original_comment_part
                .clone()
                .unwrap_or_else(|| format!("xl/comments{}.xml", out.number));
            let vml_path = original_vml_part
                .clone()
                .unwrap_or_else(|| format!("xl/drawings/vmlDrawing{}.vml", out.number));

            let comment_rid = rels.next_rid();
            rels.relationships.push(Relationship::new(
                comment_rid,
                rel_types::COMMENTS,
                relative_target(&out.path, &comment_path),
            ));
            let vml_rid = rels.next_rid();
            rels.relationships.push(Relationship::new(
                vml_rid.clone(),
                rel_types::VML_DRAWING,
                relative_target(&out.path, &vml_path),
            ));
            let mut legacy = RawElement::new("legacyDrawing");
            legacy.attrs.push(("r:id".to_string(), vml_rid));
            ws.sections.legacy_drawing = Some(legacy);

            let comment_bytes = comments_to_wire(sheet).to_xml(backend);
            let vml_bytes = vml_for_sheet(sheet, output_index, stride);
            if original_comment_part.is_some() {
                replacements.insert(comment_path.clone(), comment_bytes);
            } else {
                inserts.push((comment_path.clone(), comment_bytes));
                ct_changed = true;
            }
            if original_vml_part.is_some() {
                replacements.insert(vml_path, vml_bytes);
            } else {
                inserts.push((vml_path, vml_bytes));
                content_types.ensure_default("vml", mime_types::VML_DRAWING);
            }
            content_types.set_override(&comment_path, mime_types::COMMENTS);
        }

        // Tables: rewrite source-owned parts in place, create parts for
        // tables added to this sheet.
        let mut new_table_parts: Vec<(String, String)> = Vec::new();
        for table in &sheet.tables {
            match &table.part_path {
                Some(path) => {
                    replacements.insert(path.clone(), table.to_wire().to_xml(backend));
                }
                None => {
                    let number = next_table_number;
                    next_table_number += 1;
                    let path = format!("xl/tables/table{number}.xml");
                    let rid = rels.next_rid();
                    rels.relationships.push(Relationship::new(
                        rid.clone(),
                        rel_types::TABLE,
                        relative_target(&out.path, &path),
                    ));
                    content_types.set_override(&path, mime_types::TABLE);
                    ct_changed = true;
                    inserts.push((path.clone(), table.to_wire().to_xml(backend)));
                    new_table_parts.push((path, rid));
                }
            }
        }
        if !new_table_parts.is_empty() {
            let mut parts = ws
                .sections
                .table_parts
                .take()
                .unwrap_or_else(|| RawElement::new("tableParts"));
            for (_, rid) in &new_table_parts {
                let mut part = RawElement::new("tablePart");
                part.attrs.push(("r:id".to_string(), rid.clone()));
                parts.children.push(cellkit_xml::raw::RawNode::Element(part));
            }
            let count = parts.children_named("tablePart").count();
            parts.attrs.retain(|(k, _)| k != "count");
            parts.attrs.push(("count".to_string(), count.to_string()));
            ws.sections.table_parts = Some(parts);
        }

        // The worksheet body itself, and its rels part.
        let body = ws.to_xml(backend);
        match out.source_index {
            Some(_) => {
                replacements.insert(out.path.clone(), body);
            }
            None => inserts.push((out.path.clone(), body)),
        }
        if rels.relationships.is_empty() {
            drops.insert(rels_path);
        } else if ctx.manifest.get(&rels_path).is_some() {
            replacements.insert(rels_path, rels.to_xml(backend));
        } else {
            inserts.push((rels_path, rels.to_xml(backend)));
        }
    }

    // Structural parts.
    let styles_changed = tracker.modified_styles || style_index.len() > style_index.original_count();
    let sst_changed = sst_builder
        .as_ref()
        .map(|b| b.has_new_entries() || ctx.original_sst.is_none())
        .unwrap_or(false);
    let sst_added = sst_changed && ctx.original_sst.is_none();

    if structural {
        ct_changed = true;
        for out in &out_sheets {
            content_types.set_override(&out.path, mime_types::WORKSHEET);
        }
        for &si in &tracker.deleted_sheets {
            if let Some(path) = ctx.sheet_paths.get(si) {
                content_types.remove_override(path);
                for part in ctx.manifest.parts_for_sheet(si) {
                    content_types.remove_override(part);
                }
            }
        }
    }
    if sst_added {
        content_types.set_override("xl/sharedStrings.xml", mime_types::SHARED_STRINGS);
        ct_changed = true;
    }
    let styles_added = styles_changed && !ctx.manifest.entries.contains_key("xl/styles.xml");
    if styles_added {
        content_types.set_override("xl/styles.xml", mime_types::STYLES);
        ct_changed = true;
    }

    // workbook.xml + its rels.
    let rels_changed = structural || sst_added || styles_added;
    let (workbook_bytes, workbook_rels_bytes) = if rels_changed {
        let pair = regenerate_workbook_parts(wb, ctx, &out_sheets, sst_added, styles_added)?;
        (Some(pair.0.to_xml(backend)), Some(pair.1.to_xml(backend)))
    } else {
        (None, None)
    };

    // Execute the plan in source archive order, then append inserts.
    let deleted_parts: HashSet<String> = tracker
        .deleted_sheets
        .iter()
        .flat_map(|&si| {
            ctx.manifest
                .parts_for_sheet(si)
                .into_iter()
                .map(str::to_string)
        })
        .collect();

    let mut entries: Vec<(String, Vec<u8>)> = Vec::new();
    for (name, info) in &ctx.manifest.entries {
        if drops.contains(name) || deleted_parts.contains(name) {
            continue;
        }
        if let Some(bytes) = replacements.remove(name) {
            entries.push((name.clone(), bytes));
            continue;
        }
        let bytes = match name.as_str() {
            "[Content_Types].xml" if ct_changed => content_types.to_xml(backend),
            "xl/workbook.xml" if workbook_bytes.is_some() => {
                workbook_bytes.clone().unwrap_or_default()
            }
            "xl/_rels/workbook.xml.rels" if workbook_rels_bytes.is_some() => {
                workbook_rels_bytes.clone().unwrap_or_default()
            }
            "xl/styles.xml" if styles_changed => style_index_bytes(&style_index, backend),
            "xl/sharedStrings.xml" if sst_changed => match &sst_builder {
                Some(builder) => builder.to_sst().to_xml(backend),
                None => info.bytes.clone(),
            },
            _ => info.bytes.clone(),
        };
        entries.push((name.clone(), bytes));
    }
    entries.extend(inserts);
    if sst_added {
        if let Some(builder) = &sst_builder {
            entries.push(("xl/sharedStrings.xml".to_string(), builder.to_sst().to_xml(backend)));
        }
    }
    if styles_added {
        entries.push(("xl/styles.xml".to_string(), style_index_bytes(&style_index, backend)));
    }

    Ok(entries)
}

/// Render the style index without consuming it.
fn style_index_bytes(index: &StyleIndex, backend: XmlBackend) -> Vec<u8> {
    index.snapshot().to_xml(backend)
}

fn next_free_table_number(ctx: &SourceContext) -> u32 {
    ctx.manifest
        .entries
        .keys()
        .filter(|name| name.starts_with("xl/tables/"))
        .filter_map(|name| sheet_part_number(name))
        .max()
        .map(|n| n + 1)
        .unwrap_or(1)
}

/// Rebuild `xl/workbook.xml` and its rels after a structural change,
/// keeping the source's namespace prolog and `mc:Ignorable` verbatim.
fn regenerate_workbook_parts(
    wb: &Workbook,
    ctx: &SourceContext,
    out_sheets: &[OutSheet],
    sst_added: bool,
    styles_added: bool,
) -> Result<(cellkit_xml::workbook::WorkbookXml, Relationships)> {
    let mut rels = ctx.workbook_rels.clone();

    // Drop worksheet rels of deleted sheets.
    let deleted_paths: HashSet<String> = ctx
        .tracker
        .deleted_sheets
        .iter()
        .filter_map(|&si| ctx.sheet_paths.get(si).cloned())
        .collect();
    rels.relationships.retain(|r| {
        r.rel_type != rel_types::WORKSHEET
            || !deleted_paths.contains(&resolve_target("xl/workbook.xml", &r.target))
    });

    let mut workbook_xml = ctx.workbook_xml.clone();
    let max_sheet_id = workbook_xml.sheets.iter().map(|s| s.sheet_id).max().unwrap_or(0);
    let mut next_sheet_id = max_sheet_id + 1;

    let mut entries = Vec::with_capacity(wb.sheets.len());
    for (sheet, out) in wb.sheets.iter().zip(out_sheets) {
        match out.source_index {
            Some(si) => {
                let mut entry = workbook_xml
                    .sheets
                    .get(si)
                    .cloned()
                    .ok_or_else(|| Error::Validation(format!("unknown source sheet {si}")))?;
                entry.name = sheet.name.clone();
                entry.state = sheet.state;
                entries.push(entry);
            }
            None => {
                let rid = rels.next_rid();
                rels.relationships.push(Relationship::new(
                    rid.clone(),
                    rel_types::WORKSHEET,
                    relative_target("xl/workbook.xml", &out.path),
                ));
                entries.push(cellkit_xml::workbook::SheetEntry {
                    name: sheet.name.clone(),
                    sheet_id: next_sheet_id,
                    r_id: rid,
                    state: sheet.state,
                    other_attrs: Vec::new(),
                });
                next_sheet_id += 1;
            }
        }
    }
    workbook_xml.sheets = entries;
    workbook_xml.defined_names = wb.defined_names.clone();

    if styles_added && rels.by_type(rel_types::STYLES).is_none() {
        let rid = rels.next_rid();
        rels.relationships
            .push(Relationship::new(rid, rel_types::STYLES, "styles.xml"));
    }
    if sst_added && rels.by_type(rel_types::SHARED_STRINGS).is_none() {
        let rid = rels.next_rid();
        rels.relationships.push(Relationship::new(
            rid,
            rel_types::SHARED_STRINGS,
            "sharedStrings.xml",
        ));
    }
    Ok((workbook_xml, rels))
}
