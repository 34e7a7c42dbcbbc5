//! Workbook-wide numeric limits from the OOXML specification.

/// Maximum number of columns in a worksheet ("XFD").
pub const MAX_COLUMNS: u32 = 16_384;

/// Maximum number of rows in a worksheet.
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum length of a sheet name, in characters.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Characters forbidden in sheet names.
pub const FORBIDDEN_SHEET_NAME_CHARS: &[char] = &['\\', '/', '?', '*', '[', ']', ':'];

/// Maximum row/column outline (grouping) level.
pub const MAX_OUTLINE_LEVEL: u8 = 7;
