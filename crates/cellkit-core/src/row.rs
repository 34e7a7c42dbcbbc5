//! Row properties.

use crate::error::{Error, Result};
use crate::utils::constants::MAX_OUTLINE_LEVEL;

/// Formatting properties of one row, independent of its cells.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RowProperties {
    /// Height in points (`ht`), with `customHeight` implied when set.
    pub height: Option<f64>,
    pub hidden: bool,
    /// Grouping level, 0..=7.
    pub outline_level: u8,
    pub collapsed: bool,
    pub thick_bottom: bool,
    /// Row-level style index into the global style table.
    pub style_id: Option<u32>,
    /// `customFormat` flag accompanying a row-level style.
    pub custom_format: bool,
    /// `x14ac:dyDescent`, preserved verbatim from the source.
    pub dy_descent: Option<String>,
}

impl RowProperties {
    /// Validate construction invariants.
    pub fn validate(&self) -> Result<()> {
        if self.outline_level > MAX_OUTLINE_LEVEL {
            return Err(Error::Validation(format!(
                "row outline level {} is out of range 0..={MAX_OUTLINE_LEVEL}",
                self.outline_level
            )));
        }
        if let Some(height) = self.height {
            if !(0.0..=409.5).contains(&height) {
                return Err(Error::Validation(format!(
                    "row height {height} is out of range 0..=409.5"
                )));
            }
        }
        Ok(())
    }

    /// True when every field is at its default and the row record carries
    /// nothing worth emitting.
    pub fn is_default(&self) -> bool {
        self == &RowProperties::default()
    }
}
