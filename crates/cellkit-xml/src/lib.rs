//! cellkit-xml: OOXML part parsing and XML emission for Excel (.xlsx) files.
//!
//! Parsers are event-driven (`quick-xml`) and preserve unknown attributes and
//! child elements as opaque residue so unrecognized schema extensions survive
//! a read/write round-trip byte-faithfully. Emission goes through one
//! abstract contract ([`emit::XmlEmit`]) with two interchangeable backends.
//!
//! # Modules
//!
//! - [`namespaces`] - OOXML namespace URI constants
//! - [`emit`] - emission contract, backends, ordering helpers
//! - [`raw`] - opaque residue elements
//! - [`parse`] - guarded event reader (DOCTYPE rejection, residue capture)
//! - [`content_types`] - `[Content_Types].xml`
//! - [`relationships`] - `.rels` parts
//! - [`workbook`] - `xl/workbook.xml`
//! - [`worksheet`] - `xl/worksheets/sheet*.xml`
//! - [`styles`] - `xl/styles.xml`
//! - [`shared_strings`] - `xl/sharedStrings.xml`
//! - [`comments`] - `xl/comments*.xml`
//! - [`table`] - `xl/tables/table*.xml`

pub mod comments;
pub mod content_types;
pub mod dom_writer;
pub mod emit;
pub mod error;
pub mod escape;
pub mod namespaces;
pub mod parse;
pub mod raw;
pub mod relationships;
pub mod shared_strings;
pub mod stream_writer;
pub mod styles;
pub mod table;
pub mod workbook;
pub mod worksheet;

pub use error::{ParseError, Result};
