//! The domain workbook: an ordered sequence of sheets plus defined names
//! and, for workbooks loaded from a package, the retained source context.
//!
//! Mutating operations advance the modification tracker; the surgical
//! writer reads the tracker to decide what can copy byte-for-byte. Cloning
//! a workbook snapshots the whole value.

use cellkit_xml::workbook::DefinedName;

use crate::error::{Error, Result, Warning};
use crate::manifest::SourceContext;
use crate::sheet::{validate_sheet_name, Sheet};

/// An in-memory workbook.
#[derive(Debug, Clone)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
    pub defined_names: Vec<DefinedName>,
    /// Present only when the workbook was loaded from a package.
    pub source: Option<SourceContext>,
    /// Non-fatal conditions noticed during open.
    pub warnings: Vec<Warning>,
}

impl Workbook {
    /// A new empty workbook containing a single empty sheet named "Sheet1".
    pub fn new() -> Self {
        Self {
            sheets: vec![Sheet {
                name: "Sheet1".to_string(),
                ..Sheet::default()
            }],
            defined_names: Vec::new(),
            source: None,
            warnings: Vec::new(),
        }
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    /// Mutable access to a sheet. The sheet is marked modified in the
    /// tracker; use [`Workbook::sheet`] for inspection.
    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        let index = self.sheets.iter().position(|s| s.name == name)?;
        let source_index = self.sheets[index].source_index;
        if let Some(ctx) = &mut self.source {
            ctx.tracker.mark_sheet(source_index);
        }
        Some(&mut self.sheets[index])
    }

    /// Run a closure against one sheet, tracking the modification.
    pub fn update<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Sheet) -> Result<()>,
    {
        let sheet = self
            .sheet_mut(name)
            .ok_or_else(|| Error::Validation(format!("sheet '{name}' does not exist")))?;
        f(sheet)
    }

    /// Append a sheet. Structural change: sets `modifiedMetadata`.
    pub fn put(&mut self, sheet: Sheet) -> Result<()> {
        self.insert_at(self.sheets.len(), sheet)
    }

    /// Insert a sheet at a position. Structural change.
    pub fn insert_at(&mut self, index: usize, sheet: Sheet) -> Result<()> {
        validate_sheet_name(&sheet.name)?;
        if self.sheet(&sheet.name).is_some() {
            return Err(Error::Validation(format!(
                "sheet '{}' already exists",
                sheet.name
            )));
        }
        if index > self.sheets.len() {
            return Err(Error::Validation(format!(
                "insert position {index} is past the end ({} sheets)",
                self.sheets.len()
            )));
        }
        self.sheets.insert(index, sheet);
        if let Some(ctx) = &mut self.source {
            ctx.tracker.mark_metadata();
        }
        Ok(())
    }

    /// Remove a sheet by name. Structural change.
    pub fn remove(&mut self, name: &str) -> Result<Sheet> {
        if self.sheets.len() == 1 {
            return Err(Error::Validation(
                "a workbook must keep at least one sheet".to_string(),
            ));
        }
        let index = self
            .sheets
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| Error::Validation(format!("sheet '{name}' does not exist")))?;
        let sheet = self.sheets.remove(index);
        if let Some(ctx) = &mut self.source {
            match sheet.source_index {
                Some(source_index) => ctx.tracker.mark_deleted(source_index),
                None => ctx.tracker.mark_metadata(),
            }
        }
        Ok(sheet)
    }

    /// Rename a sheet. Structural change.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<()> {
        validate_sheet_name(new)?;
        if old != new && self.sheet(new).is_some() {
            return Err(Error::Validation(format!("sheet '{new}' already exists")));
        }
        let sheet = self
            .sheets
            .iter_mut()
            .find(|s| s.name == old)
            .ok_or_else(|| Error::Validation(format!("sheet '{old}' does not exist")))?;
        sheet.name = new.to_string();
        if let Some(ctx) = &mut self.source {
            ctx.tracker.mark_metadata();
        }
        Ok(())
    }

    /// Total number of non-empty cells across all sheets.
    pub fn cell_count(&self) -> usize {
        self.sheets.iter().map(Sheet::cell_count).sum()
    }

    /// True when nothing was mutated since load (always false for
    /// programmatic workbooks, which have nothing to copy verbatim).
    pub fn is_clean(&self) -> bool {
        self.source
            .as_ref()
            .map(|ctx| ctx.tracker.is_clean())
            .unwrap_or(false)
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}
