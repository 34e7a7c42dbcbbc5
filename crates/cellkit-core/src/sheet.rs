//! The domain worksheet.
//!
//! A [`Sheet`] owns its cells, merged ranges, row/column properties, local
//! style registry, comments, tables, and the preserved source-only metadata
//! blob a surgical rewrite consults.

use std::collections::BTreeMap;

use cellkit_xml::worksheet::{CellXml, ColXml, RowXml, SheetSections, WorksheetXml};

use crate::comment::Comment;
use crate::error::{Error, Result};
use crate::rich_text::RichText;
use crate::style::CellStyle;
use crate::table::TableSpec;
use crate::utils::cell_ref::{cell_name_to_coordinates, coordinates_to_cell_name, CellRange};
use crate::utils::constants::{FORBIDDEN_SHEET_NAME_CHARS, MAX_SHEET_NAME_LEN};
use crate::value::{CellError, CellValue};
use crate::{col::ColumnProperties, row::RowProperties};

pub use cellkit_xml::workbook::SheetState;

/// One cell: a value plus an optional reference into the sheet's style
/// registry.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Cell {
    pub value: CellValue,
    pub style_id: Option<u32>,
}

/// Validate a sheet name against Excel's rules.
pub fn validate_sheet_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Validation("sheet name must not be empty".to_string()));
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(Error::Validation(format!(
            "sheet name '{name}' exceeds {MAX_SHEET_NAME_LEN} characters"
        )));
    }
    if let Some(bad) = name.chars().find(|c| FORBIDDEN_SHEET_NAME_CHARS.contains(c)) {
        return Err(Error::Validation(format!(
            "sheet name '{name}' contains forbidden character '{bad}'"
        )));
    }
    Ok(())
}

/// A single worksheet.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub state: SheetState,
    /// Cells keyed by 1-based `(row, col)`.
    pub cells: BTreeMap<(u32, u32), Cell>,
    pub merged: Vec<CellRange>,
    pub row_props: BTreeMap<u32, RowProperties>,
    pub col_props: BTreeMap<u32, ColumnProperties>,
    /// Local style registry; a cell's `style_id` indexes this table.
    pub styles: Vec<CellStyle>,
    /// Registry entries below this count came from the source stylesheet
    /// and keep their global indices on a surgical write.
    pub styles_from_source: usize,
    /// Comments keyed by 1-based `(row, col)`.
    pub comments: BTreeMap<(u32, u32), Comment>,
    pub tables: Vec<TableSpec>,
    /// Source-only worksheet metadata (sheetViews, conditional formatting,
    /// page setup, ...) consulted when this sheet is regenerated.
    pub metadata: Option<SheetSections>,
    /// Root attributes of the source worksheet part (namespace
    /// declarations, `mc:Ignorable`), re-emitted on regeneration.
    pub wire_root_attrs: Option<Vec<(String, String)>>,
    /// Position in the source workbook; `None` for sheets added after load.
    pub source_index: Option<usize>,
}

impl Sheet {
    /// Create an empty sheet with a validated name.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_sheet_name(&name)?;
        Ok(Self {
            name,
            ..Sheet::default()
        })
    }

    /// Set a cell value at an A1-style reference.
    pub fn put(&mut self, cell_ref: &str, value: impl Into<CellValue>) -> Result<()> {
        let (col, row) = cell_name_to_coordinates(cell_ref)?;
        let entry = self.cells.entry((row, col)).or_default();
        entry.value = value.into();
        Ok(())
    }

    /// Remove a cell entirely. Returns `true` when something was removed.
    pub fn remove(&mut self, cell_ref: &str) -> Result<bool> {
        let (col, row) = cell_name_to_coordinates(cell_ref)?;
        Ok(self.cells.remove(&(row, col)).is_some())
    }

    /// The value at a reference; `Empty` when the cell is absent.
    pub fn value(&self, cell_ref: &str) -> Result<CellValue> {
        let (col, row) = cell_name_to_coordinates(cell_ref)?;
        Ok(self
            .cells
            .get(&(row, col))
            .map(|c| c.value.clone())
            .unwrap_or_default())
    }

    pub fn cell(&self, cell_ref: &str) -> Result<Option<&Cell>> {
        let (col, row) = cell_name_to_coordinates(cell_ref)?;
        Ok(self.cells.get(&(row, col)))
    }

    /// Merge a cell range.
    pub fn merge(&mut self, range: CellRange) -> Result<()> {
        if range.width() == 1 && range.height() == 1 {
            return Err(Error::Validation(format!(
                "merge range {} must span more than one cell",
                range.to_a1()
            )));
        }
        if self.merged.iter().any(|m| *m == range) {
            return Ok(());
        }
        self.merged.push(range);
        Ok(())
    }

    /// Apply a style to a cell, interning it in the local registry.
    pub fn with_cell_style(&mut self, cell_ref: &str, style: CellStyle) -> Result<()> {
        let (col, row) = cell_name_to_coordinates(cell_ref)?;
        let style_id = self.intern_style(style);
        self.cells.entry((row, col)).or_default().style_id = Some(style_id);
        Ok(())
    }

    /// Local registry id for a style, appending when unseen.
    pub fn intern_style(&mut self, style: CellStyle) -> u32 {
        let key = style.canonical_key();
        for (i, existing) in self.styles.iter().enumerate() {
            if existing.canonical_key() == key {
                return i as u32;
            }
        }
        self.styles.push(style);
        (self.styles.len() - 1) as u32
    }

    /// Set row formatting properties (1-based row).
    pub fn set_row_properties(&mut self, row: u32, props: RowProperties) -> Result<()> {
        props.validate()?;
        if props.is_default() {
            self.row_props.remove(&row);
        } else {
            self.row_props.insert(row, props);
        }
        Ok(())
    }

    /// Set column formatting properties (1-based column).
    pub fn set_column_properties(&mut self, col: u32, props: ColumnProperties) -> Result<()> {
        props.validate()?;
        if props.is_default() {
            self.col_props.remove(&col);
        } else {
            self.col_props.insert(col, props);
        }
        Ok(())
    }

    /// Attach a comment to a cell, replacing any existing one.
    pub fn comment(&mut self, cell_ref: &str, comment: Comment) -> Result<()> {
        let (col, row) = cell_name_to_coordinates(cell_ref)?;
        self.comments.insert((row, col), comment);
        Ok(())
    }

    /// Remove the comment at a cell. Returns `true` when one existed.
    pub fn remove_comment(&mut self, cell_ref: &str) -> Result<bool> {
        let (col, row) = cell_name_to_coordinates(cell_ref)?;
        Ok(self.comments.remove(&(row, col)).is_some())
    }

    /// Register a table, validating it and checking name uniqueness.
    pub fn with_table(&mut self, table: TableSpec) -> Result<()> {
        table.validate()?;
        if self
            .tables
            .iter()
            .any(|t| t.name == table.name || t.display_name == table.display_name)
        {
            return Err(Error::Validation(format!(
                "table name '{}' already exists on sheet '{}'",
                table.name, self.name
            )));
        }
        self.tables.push(table);
        Ok(())
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// The dimension enclosing every cell, as `A1:B2` (or `A1` when empty).
    pub fn dimension(&self) -> String {
        let mut iter = self.cells.keys();
        let Some(&(first_row, first_col)) = iter.next() else {
            return "A1".to_string();
        };
        let (mut min_row, mut max_row) = (first_row, first_row);
        let (mut min_col, mut max_col) = (first_col, first_col);
        for &(row, col) in iter {
            min_row = min_row.min(row);
            max_row = max_row.max(row);
            min_col = min_col.min(col);
            max_col = max_col.max(col);
        }
        // Rows with only formatting still widen the dimension in Excel's
        // own output, but cells are the contract here.
        let start = coordinates_to_cell_name(min_col, min_row).unwrap_or_else(|_| "A1".to_string());
        if min_row == max_row && min_col == max_col {
            return start;
        }
        let end = coordinates_to_cell_name(max_col, max_row).unwrap_or_else(|_| "A1".to_string());
        format!("{start}:{end}")
    }

    /// Build the domain sheet from a parsed worksheet part.
    ///
    /// `shared_strings` resolves `t="s"` references; `global_styles` is the
    /// stylesheet's cellXf-indexed style list, which becomes this sheet's
    /// local registry with identity ids.
    pub fn from_wire(
        name: impl Into<String>,
        state: SheetState,
        ws: &WorksheetXml,
        shared_strings: &[RichText],
        global_styles: &[CellStyle],
    ) -> Result<Self> {
        let mut sheet = Sheet {
            name: name.into(),
            state,
            styles: global_styles.to_vec(),
            styles_from_source: global_styles.len(),
            metadata: Some(ws.sections.clone()),
            wire_root_attrs: Some(ws.root_attrs.clone()),
            ..Sheet::default()
        };

        for merge in &ws.merged {
            sheet.merged.push(CellRange::parse(merge)?);
        }
        for col in &ws.cols {
            let props = column_props_from_wire(col);
            for c in col.min..=col.max.min(crate::utils::constants::MAX_COLUMNS) {
                sheet.col_props.insert(c, props.clone());
            }
        }

        for row in &ws.rows {
            let props = row_props_from_wire(row);
            if !props.is_default() {
                sheet.row_props.insert(row.r, props);
            }
            for cell in &row.cells {
                let (col, cell_row) = cell_name_to_coordinates(&cell.r)?;
                let value = decode_cell_value(cell, shared_strings);
                let keep_empty = cell.s.is_some();
                if value.is_empty() && !keep_empty {
                    continue;
                }
                sheet.cells.insert(
                    (cell_row, col),
                    Cell {
                        value,
                        style_id: cell.s,
                    },
                );
            }
        }
        Ok(sheet)
    }

    /// Coalesce per-column properties into `<col min max>` runs.
    pub fn coalesced_cols(&self) -> Vec<ColXml> {
        let mut out: Vec<ColXml> = Vec::new();
        for (&col, props) in &self.col_props {
            let wire = column_props_to_wire(col, props);
            if let Some(last) = out.last_mut() {
                if last.max + 1 == col && col_runs_equal(last, &wire) {
                    last.max = col;
                    continue;
                }
            }
            out.push(wire);
        }
        out
    }
}

fn col_runs_equal(a: &ColXml, b: &ColXml) -> bool {
    a.width == b.width
        && a.style == b.style
        && a.hidden == b.hidden
        && a.custom_width == b.custom_width
        && a.outline_level == b.outline_level
        && a.collapsed == b.collapsed
}

fn column_props_from_wire(col: &ColXml) -> ColumnProperties {
    ColumnProperties {
        width: col.width.as_deref().and_then(|w| w.parse().ok()),
        hidden: col.hidden.unwrap_or(false),
        outline_level: col.outline_level.unwrap_or(0),
        collapsed: col.collapsed.unwrap_or(false),
        custom_width: col.custom_width.unwrap_or(false),
        style_id: col.style,
    }
}

fn column_props_to_wire(col: u32, props: &ColumnProperties) -> ColXml {
    ColXml {
        min: col,
        max: col,
        width: props.width.map(format_number),
        style: props.style_id,
        hidden: props.hidden.then_some(true),
        custom_width: (props.custom_width || props.width.is_some()).then_some(true),
        outline_level: (props.outline_level > 0).then_some(props.outline_level),
        collapsed: props.collapsed.then_some(true),
        other_attrs: Vec::new(),
    }
}

fn row_props_from_wire(row: &RowXml) -> RowProperties {
    RowProperties {
        height: row.ht.as_deref().and_then(|h| h.parse().ok()),
        hidden: row.hidden.unwrap_or(false),
        outline_level: row.outline_level.unwrap_or(0),
        collapsed: row.collapsed.unwrap_or(false),
        thick_bottom: row.thick_bot.unwrap_or(false),
        style_id: row.s,
        custom_format: row.custom_format.unwrap_or(false),
        dy_descent: row.dy_descent.clone(),
    }
}

/// Convert row properties back to a wire row shell (no cells yet).
pub(crate) fn row_props_to_wire(row: u32, props: &RowProperties) -> RowXml {
    RowXml {
        r: row,
        spans: None,
        s: props.style_id,
        custom_format: props.custom_format.then_some(true),
        ht: props.height.map(format_number),
        custom_height: props.height.is_some().then_some(true),
        hidden: props.hidden.then_some(true),
        outline_level: (props.outline_level > 0).then_some(props.outline_level),
        collapsed: props.collapsed.then_some(true),
        thick_bot: props.thick_bottom.then_some(true),
        dy_descent: props.dy_descent.clone(),
        other_attrs: Vec::new(),
        cells: Vec::new(),
    }
}

/// Format a float the way Excel writes attribute numbers: integral values
/// without a decimal point.
pub(crate) fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Apply the OOXML cell typing rules to one `<c>` record.
fn decode_cell_value(cell: &CellXml, shared_strings: &[RichText]) -> CellValue {
    let t = cell.t.as_deref();
    match t {
        Some("s") => {
            let index = cell.v.as_deref().and_then(|v| v.parse::<usize>().ok());
            match index.and_then(|i| shared_strings.get(i)) {
                Some(rich) if rich.is_plain() => CellValue::Text(rich.to_plain_text()),
                Some(rich) => CellValue::Rich(rich.clone()),
                None => CellValue::Error(CellError::Ref),
            }
        }
        Some("inlineStr") => match &cell.is {
            Some(is) => {
                let rich = RichText::from_wire(is);
                if rich.is_plain() {
                    CellValue::Text(rich.to_plain_text())
                } else {
                    CellValue::Rich(rich)
                }
            }
            None => CellValue::Empty,
        },
        Some("b") => CellValue::Bool(cell.v.as_deref() == Some("1")),
        Some("e") => {
            let code = cell.v.as_deref().unwrap_or("#VALUE!");
            CellValue::Error(CellError::from_str(code).unwrap_or(CellError::Value))
        }
        Some("d") => cell
            .v
            .as_deref()
            .and_then(parse_iso_datetime)
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Empty),
        _ => {
            if let Some(f) = &cell.f {
                let cached = cell.v.as_deref().map(|v| {
                    if t == Some("str") {
                        Box::new(CellValue::Text(v.to_string()))
                    } else {
                        match v.parse::<f64>() {
                            Ok(n) => Box::new(CellValue::Number(n)),
                            Err(_) => Box::new(CellValue::Text(v.to_string())),
                        }
                    }
                });
                CellValue::Formula {
                    expr: f.text.clone(),
                    cached,
                }
            } else if let Some(v) = &cell.v {
                match v.parse::<f64>() {
                    Ok(n) => CellValue::Number(n),
                    Err(_) => CellValue::Text(v.clone()),
                }
            } else {
                CellValue::Empty
            }
        }
    }
}

fn parse_iso_datetime(s: &str) -> Option<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
