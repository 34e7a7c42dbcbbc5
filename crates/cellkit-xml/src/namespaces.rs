//! OOXML namespace definitions.
//! Standard namespaces used across all XML documents.

// Core spreadsheet namespace
pub const SPREADSHEET_ML: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

// Relationship namespaces
pub const RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const PACKAGE_RELATIONSHIPS: &str =
    "http://schemas.openxmlformats.org/package/2006/relationships";

// Content Types
pub const CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

// Markup Compatibility
pub const MC: &str = "http://schemas.openxmlformats.org/markup-compatibility/2006";

// Forward-compatibility namespaces Excel declares on workbook/worksheet roots
pub const X14AC: &str = "http://schemas.microsoft.com/office/spreadsheetml/2009/9/ac";
pub const X15: &str = "http://schemas.microsoft.com/office/spreadsheetml/2010/11/main";
pub const XR: &str = "http://schemas.microsoft.com/office/spreadsheetml/2014/revision";
pub const XR6: &str = "http://schemas.microsoft.com/office/spreadsheetml/2016/revision6";
pub const XR10: &str = "http://schemas.microsoft.com/office/spreadsheetml/2016/revision10";

// VML (legacy drawing parts anchoring comment bubbles)
pub const VML: &str = "urn:schemas-microsoft-com:vml";
pub const VML_OFFICE: &str = "urn:schemas-microsoft-com:office:office";
pub const VML_EXCEL: &str = "urn:schemas-microsoft-com:office:excel";

// XML standard
pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
