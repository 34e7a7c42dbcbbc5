//! Worksheet tables.
//!
//! [`TableSpec`] is the validated domain view of one `xl/tables/tableN.xml`
//! part. A spec parsed from a source keeps its wire form so UIDs and
//! unrecognized attributes survive a rewrite.

use cellkit_xml::table::{TableColumnXml, TableXml};

use crate::error::{Error, Result};
use crate::utils::cell_ref::CellRange;

/// A validated table definition.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSpec {
    pub id: u32,
    pub name: String,
    pub display_name: String,
    pub range: CellRange,
    pub header_row_count: u32,
    pub totals_row_count: u32,
    pub columns: Vec<String>,
    /// The parsed source part, when this table came from a file.
    pub wire: Option<TableXml>,
    /// ZIP entry name of the source part, when this table came from a file.
    pub part_path: Option<String>,
}

impl TableSpec {
    /// Construct a new table over `range` with one header row.
    ///
    /// Validation: `name`/`display_name` must be non-empty and contain no
    /// spaces, the range must span at least two rows, the column list must
    /// match the range width, and column names must be unique.
    pub fn new(
        id: u32,
        name: impl Into<String>,
        range: CellRange,
        columns: Vec<String>,
    ) -> Result<Self> {
        let name = name.into();
        let spec = Self {
            id,
            display_name: name.clone(),
            name,
            range,
            header_row_count: 1,
            totals_row_count: 0,
            columns,
            wire: None,
            part_path: None,
        };
        spec.validate()?;
        Ok(spec)
    }

    pub fn validate(&self) -> Result<()> {
        for (label, value) in [("name", &self.name), ("displayName", &self.display_name)] {
            if value.is_empty() {
                return Err(Error::Validation(format!("table {label} must not be empty")));
            }
            if value.contains(' ') {
                return Err(Error::Validation(format!(
                    "table {label} '{value}' must not contain spaces"
                )));
            }
        }
        if self.range.height() < 2 {
            return Err(Error::Validation(format!(
                "table range {} must span at least two rows",
                self.range.to_a1()
            )));
        }
        if self.columns.len() as u32 != self.range.width() {
            return Err(Error::Validation(format!(
                "table has {} columns but range {} is {} wide",
                self.columns.len(),
                self.range.to_a1(),
                self.range.width()
            )));
        }
        let mut seen = std::collections::HashSet::new();
        for column in &self.columns {
            if !seen.insert(column) {
                return Err(Error::Validation(format!(
                    "duplicate table column name '{column}'"
                )));
            }
        }
        Ok(())
    }

    /// Build from a parsed table part, keeping the wire form.
    pub fn from_wire(wire: TableXml) -> Result<Self> {
        let range = CellRange::parse(&wire.cell_range)?;
        let spec = Self {
            id: wire.id,
            name: wire.name.clone(),
            display_name: wire.display_name.clone(),
            range,
            header_row_count: wire.header_row_count.unwrap_or(1),
            totals_row_count: wire.totals_row_count.unwrap_or(0),
            columns: wire.columns.iter().map(|c| c.name.clone()).collect(),
            wire: Some(wire),
            part_path: None,
        };
        spec.validate()?;
        Ok(spec)
    }

    /// Convert to the wire form. A preserved source part is updated in
    /// place so UIDs and residue survive; a programmatic table gets a fresh
    /// minimal part.
    pub fn to_wire(&self) -> TableXml {
        let mut wire = self.wire.clone().unwrap_or_default();
        wire.id = self.id;
        wire.name = self.name.clone();
        wire.display_name = self.display_name.clone();
        wire.cell_range = self.range.to_a1();
        wire.header_row_count = (self.header_row_count != 1).then_some(self.header_row_count);
        wire.totals_row_count = (self.totals_row_count != 0).then_some(self.totals_row_count);
        if wire.totals_row_shown.is_none() {
            wire.totals_row_shown = Some(false);
        }

        let preserved = std::mem::take(&mut wire.columns);
        wire.columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut column = preserved
                    .iter()
                    .find(|c| c.name == *name)
                    .cloned()
                    .unwrap_or_else(|| TableColumnXml {
                        id: i as u32 + 1,
                        ..TableColumnXml::default()
                    });
                column.name = name.clone();
                column
            })
            .collect();
        wire
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(s: &str) -> CellRange {
        CellRange::parse(s).unwrap()
    }

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_valid_table() {
        let table = TableSpec::new(1, "Sales", range("A1:C4"), columns(&["Region", "Units", "Total"]));
        assert!(table.is_ok());
    }

    #[test]
    fn test_name_with_space_rejected() {
        let err = TableSpec::new(1, "My Table", range("A1:B3"), columns(&["A", "B"])).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(TableSpec::new(1, "", range("A1:B3"), columns(&["A", "B"])).is_err());
    }

    #[test]
    fn test_single_row_range_rejected() {
        let err = TableSpec::new(1, "T", range("A1:C1"), columns(&["A", "B", "C"])).unwrap_err();
        assert!(err.to_string().contains("at least two rows"));
    }

    #[test]
    fn test_column_count_must_match_width() {
        let err = TableSpec::new(1, "T", range("A1:C3"), columns(&["A", "B"])).unwrap_err();
        assert!(err.to_string().contains("wide"));
    }

    #[test]
    fn test_duplicate_columns_rejected() {
        let err = TableSpec::new(1, "T", range("A1:B3"), columns(&["X", "X"])).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_wire_roundtrip_preserves_uids() {
        let xml = r#"<table xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" id="2" xr:uid="{AAAA}" name="T1" displayName="T1" ref="B2:C5" totalsRowShown="0"><autoFilter ref="B2:C5" xr:uid="{BBBB}"/><tableColumns count="2"><tableColumn id="1" xr3:uid="{CCCC}" name="K"/><tableColumn id="2" name="V"/></tableColumns></table>"#;
        let wire = TableXml::parse("xl/tables/table2.xml", xml.as_bytes()).unwrap();
        let spec = TableSpec::from_wire(wire).unwrap();
        assert_eq!(spec.name, "T1");
        assert_eq!(spec.columns, columns(&["K", "V"]));
        assert_eq!(spec.range.to_a1(), "B2:C5");

        let out = spec.to_wire();
        assert_eq!(out.uid.as_deref(), Some("{AAAA}"));
        assert_eq!(out.columns[0].uid.as_deref(), Some("{CCCC}"));
        assert!(out.auto_filter.is_some());
    }

    #[test]
    fn test_programmatic_table_gets_fresh_wire() {
        let spec = TableSpec::new(3, "New", range("A1:B4"), columns(&["A", "B"])).unwrap();
        let wire = spec.to_wire();
        assert_eq!(wire.id, 3);
        assert_eq!(wire.cell_range, "A1:B4");
        assert_eq!(wire.columns.len(), 2);
        assert_eq!(wire.columns[1].id, 2);
        assert!(wire.uid.is_none());
    }
}
