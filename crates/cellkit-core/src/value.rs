//! Cell value representation.
//!
//! [`CellValue`] is the typed value of a single cell, the high-level
//! counterpart to the raw `<c>` element from `cellkit-xml`. Dates convert
//! to and from the Excel 1900-epoch serial double on the wire.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::rich_text::RichText;

/// Days from CE to the Excel serial epoch (1899-12-30).
const EXCEL_EPOCH_DAYS_FROM_CE: i64 = 693_594;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// A cell-level error value. These are data, not control-flow errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellError {
    DivideByZero,
    NotAvailable,
    Name,
    Null,
    Number,
    Ref,
    Value,
    GettingData,
}

impl CellError {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellError::DivideByZero => "#DIV/0!",
            CellError::NotAvailable => "#N/A",
            CellError::Name => "#NAME?",
            CellError::Null => "#NULL!",
            CellError::Number => "#NUM!",
            CellError::Ref => "#REF!",
            CellError::Value => "#VALUE!",
            CellError::GettingData => "#GETTING_DATA",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "#DIV/0!" => Some(CellError::DivideByZero),
            "#N/A" => Some(CellError::NotAvailable),
            "#NAME?" => Some(CellError::Name),
            "#NULL!" => Some(CellError::Null),
            "#NUM!" => Some(CellError::Number),
            "#REF!" => Some(CellError::Ref),
            "#VALUE!" => Some(CellError::Value),
            "#GETTING_DATA" => Some(CellError::GettingData),
            _ => None,
        }
    }
}

impl fmt::Display for CellError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the value of a cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// No value (empty cell).
    Empty,
    /// Boolean value.
    Bool(bool),
    /// Numeric value (integers are stored as f64 in Excel).
    Number(f64),
    /// Plain text. A leading `=`, `+`, `-`, or `@` is legal here and remains
    /// text; only [`CellValue::Formula`] is a formula.
    Text(String),
    /// Local date-time, serialized to an Excel serial double on the wire.
    DateTime(NaiveDateTime),
    /// Rich (per-run formatted) text.
    Rich(RichText),
    /// Formula with optional cached result.
    Formula {
        expr: String,
        cached: Option<Box<CellValue>>,
    },
    /// Error value (e.g. #DIV/0!, #N/A).
    Error(CellError),
}

impl Default for CellValue {
    fn default() -> Self {
        Self::Empty
    }
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// True for plain-text and rich-text values.
    pub fn is_string(&self) -> bool {
        matches!(self, CellValue::Text(_) | CellValue::Rich(_))
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, ""),
            CellValue::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            CellValue::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::DateTime(dt) => write!(f, "{dt}"),
            CellValue::Rich(rich) => write!(f, "{}", rich.to_plain_text()),
            CellValue::Formula { expr, cached } => match cached {
                Some(value) => write!(f, "{value}"),
                None => write!(f, "={expr}"),
            },
            CellValue::Error(e) => write!(f, "{}", e.as_str()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Bool(b)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(dt: NaiveDateTime) -> Self {
        CellValue::DateTime(dt)
    }
}

/// Convert a local date-time to its Excel serial double.
pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    let days = chrono::Datelike::num_days_from_ce(&dt.date()) as i64 - EXCEL_EPOCH_DAYS_FROM_CE;
    let seconds = f64::from(dt.time().num_seconds_from_midnight());
    days as f64 + seconds / SECONDS_PER_DAY
}

/// Convert an Excel serial double back to a local date-time.
///
/// Returns `None` for serials outside the representable range.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.floor();
    let mut seconds = ((serial - days) * SECONDS_PER_DAY).round() as i64;
    let mut day_offset = days as i64;
    if seconds >= SECONDS_PER_DAY as i64 {
        seconds -= SECONDS_PER_DAY as i64;
        day_offset += 1;
    }
    let date = NaiveDate::from_num_days_from_ce_opt((EXCEL_EPOCH_DAYS_FROM_CE + day_offset) as i32)?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds as u32, 0)?;
    Some(NaiveDateTime::new(date, time))
}
