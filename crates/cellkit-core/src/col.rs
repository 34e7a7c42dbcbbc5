//! Column properties.

use crate::error::{Error, Result};
use crate::utils::constants::MAX_OUTLINE_LEVEL;

/// Formatting properties of one column.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ColumnProperties {
    /// Width in character units; `customWidth` is implied when set.
    pub width: Option<f64>,
    pub hidden: bool,
    /// Grouping level, 0..=7.
    pub outline_level: u8,
    pub collapsed: bool,
    /// Whether the width was user-set rather than best-fit.
    pub custom_width: bool,
    /// Column-level style index into the global style table.
    pub style_id: Option<u32>,
}

impl ColumnProperties {
    /// Validate construction invariants.
    pub fn validate(&self) -> Result<()> {
        if self.outline_level > MAX_OUTLINE_LEVEL {
            return Err(Error::Validation(format!(
                "column outline level {} is out of range 0..={MAX_OUTLINE_LEVEL}",
                self.outline_level
            )));
        }
        if let Some(width) = self.width {
            if !(0.0..=255.0).contains(&width) {
                return Err(Error::Validation(format!(
                    "column width {width} is out of range 0..=255"
                )));
            }
        }
        Ok(())
    }

    pub fn is_default(&self) -> bool {
        self == &ColumnProperties::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_default() {
        assert!(ColumnProperties::default().is_default());
    }

    #[test]
    fn test_outline_level_range() {
        let bad = ColumnProperties {
            outline_level: 9,
            ..ColumnProperties::default()
        };
        assert!(matches!(bad.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_width_range() {
        let ok = ColumnProperties {
            width: Some(15.5),
            ..ColumnProperties::default()
        };
        assert!(ok.validate().is_ok());
        let bad = ColumnProperties {
            width: Some(300.0),
            ..ColumnProperties::default()
        };
        assert!(bad.validate().is_err());
    }
}
