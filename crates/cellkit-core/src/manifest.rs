//! Part manifest, modification tracker, and source context.
//!
//! The manifest records every ZIP entry of a parsed source package, whether
//! the engine understood it semantically, and which sheet owns it. Together
//! with the modification tracker it is the input to the surgical writer's
//! plan: unparsed and untouched entries copy byte-for-byte, everything else
//! regenerates.

use std::collections::BTreeSet;
use std::path::PathBuf;

use indexmap::IndexMap;
use sha2::{Digest, Sha256};

use cellkit_xml::content_types::ContentTypes;
use cellkit_xml::relationships::Relationships;
use cellkit_xml::shared_strings::SstXml;
use cellkit_xml::styles::StylesXml;
use cellkit_xml::workbook::WorkbookXml;

/// One ZIP entry of the source package.
#[derive(Debug, Clone)]
pub struct PartInfo {
    /// Whether a parser consumed this part semantically.
    pub parsed: bool,
    /// Uncompressed size in bytes.
    pub size: Option<u64>,
    /// Owning sheet (0-based source index) for sheet-scoped parts.
    pub sheet_index: Option<usize>,
    /// The original bytes, retained for verbatim copies.
    pub bytes: Vec<u8>,
}

/// Ordered map of ZIP entry name to [`PartInfo`].
#[derive(Debug, Clone, Default)]
pub struct PartManifest {
    pub entries: IndexMap<String, PartInfo>,
}

impl PartManifest {
    pub fn insert(&mut self, name: impl Into<String>, info: PartInfo) {
        self.entries.insert(name.into(), info);
    }

    pub fn get(&self, name: &str) -> Option<&PartInfo> {
        self.entries.get(name)
    }

    /// Mark an entry as semantically parsed, optionally binding it to a
    /// sheet.
    pub fn mark_parsed(&mut self, name: &str, sheet_index: Option<usize>) {
        if let Some(info) = self.entries.get_mut(name) {
            info.parsed = true;
            if sheet_index.is_some() {
                info.sheet_index = sheet_index;
            }
        }
    }

    /// Bind an entry to a sheet without marking it parsed (VML, printer
    /// settings and other sheet-owned opaque parts).
    pub fn bind_sheet(&mut self, name: &str, sheet_index: usize) {
        if let Some(info) = self.entries.get_mut(name) {
            info.sheet_index = Some(sheet_index);
        }
    }

    /// Entry names owned by the given source sheet index.
    pub fn parts_for_sheet(&self, sheet_index: usize) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(_, info)| info.sheet_index == Some(sheet_index))
            .map(|(name, _)| name.as_str())
            .collect()
    }
}

/// Records which sheets, styles, and metadata were mutated since load.
///
/// Sheet indices refer to the *source* sheet order; sheets added after load
/// have no source index and are tracked through `modified_metadata`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModificationTracker {
    pub modified_sheets: BTreeSet<usize>,
    pub deleted_sheets: BTreeSet<usize>,
    pub modified_metadata: bool,
    pub modified_styles: bool,
}

impl ModificationTracker {
    /// True when nothing has been mutated since load.
    pub fn is_clean(&self) -> bool {
        self.modified_sheets.is_empty()
            && self.deleted_sheets.is_empty()
            && !self.modified_metadata
            && !self.modified_styles
    }

    pub fn mark_sheet(&mut self, source_index: Option<usize>) {
        match source_index {
            Some(index) => {
                self.modified_sheets.insert(index);
            }
            // A sheet with no source counterpart implies structural change.
            None => self.modified_metadata = true,
        }
    }

    pub fn mark_deleted(&mut self, source_index: usize) {
        self.deleted_sheets.insert(source_index);
        self.modified_sheets.remove(&source_index);
        self.modified_metadata = true;
    }

    pub fn mark_metadata(&mut self) {
        self.modified_metadata = true;
    }

    pub fn mark_styles(&mut self) {
        self.modified_styles = true;
    }
}

/// Everything retained from a parsed source package.
#[derive(Debug, Clone)]
pub struct SourceContext {
    /// Path the workbook was loaded from; `None` for in-memory buffers.
    pub source_path: Option<PathBuf>,
    /// SHA-256 of the source bytes, for verbatim-copy validation.
    pub fingerprint: [u8; 32],
    pub manifest: PartManifest,
    /// Parsed original stylesheet; the surgical style index starts here.
    pub original_styles: StylesXml,
    /// Parsed original shared strings, extended append-only on rewrite.
    pub original_sst: Option<SstXml>,
    /// Parsed original workbook part (namespace prolog, sheet entries).
    pub workbook_xml: WorkbookXml,
    pub content_types: ContentTypes,
    pub workbook_rels: Relationships,
    /// Worksheet part path per source sheet index.
    pub sheet_paths: Vec<String>,
    pub tracker: ModificationTracker,
}

/// Stable digest of source bytes.
pub fn fingerprint(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(parsed: bool, sheet: Option<usize>) -> PartInfo {
        PartInfo {
            parsed,
            size: Some(0),
            sheet_index: sheet,
            bytes: Vec::new(),
        }
    }

    #[test]
    fn test_manifest_preserves_insertion_order() {
        let mut manifest = PartManifest::default();
        manifest.insert("[Content_Types].xml", info(true, None));
        manifest.insert("xl/workbook.xml", info(true, None));
        manifest.insert("xl/media/image1.png", info(false, None));
        let names: Vec<&String> = manifest.entries.keys().collect();
        assert_eq!(
            names,
            vec!["[Content_Types].xml", "xl/workbook.xml", "xl/media/image1.png"]
        );
    }

    #[test]
    fn test_parts_for_sheet() {
        let mut manifest = PartManifest::default();
        manifest.insert("xl/worksheets/sheet1.xml", info(true, Some(0)));
        manifest.insert("xl/comments1.xml", info(true, Some(0)));
        manifest.insert("xl/worksheets/sheet2.xml", info(true, Some(1)));
        manifest.insert("xl/theme/theme1.xml", info(false, None));
        assert_eq!(
            manifest.parts_for_sheet(0),
            vec!["xl/worksheets/sheet1.xml", "xl/comments1.xml"]
        );
        assert_eq!(manifest.parts_for_sheet(1), vec!["xl/worksheets/sheet2.xml"]);
    }

    #[test]
    fn test_tracker_starts_clean() {
        let tracker = ModificationTracker::default();
        assert!(tracker.is_clean());
    }

    #[test]
    fn test_tracker_cell_edit_marks_sheet() {
        let mut tracker = ModificationTracker::default();
        tracker.mark_sheet(Some(2));
        assert!(!tracker.is_clean());
        assert!(tracker.modified_sheets.contains(&2));
        assert!(!tracker.modified_metadata);
    }

    #[test]
    fn test_tracker_new_sheet_marks_metadata() {
        let mut tracker = ModificationTracker::default();
        tracker.mark_sheet(None);
        assert!(tracker.modified_metadata);
        assert!(tracker.modified_sheets.is_empty());
    }

    #[test]
    fn test_tracker_delete_is_structural() {
        let mut tracker = ModificationTracker::default();
        tracker.mark_sheet(Some(1));
        tracker.mark_deleted(1);
        assert!(tracker.deleted_sheets.contains(&1));
        assert!(!tracker.modified_sheets.contains(&1));
        assert!(tracker.modified_metadata);
    }

    #[test]
    fn test_fingerprint_is_stable_and_sensitive() {
        let a = fingerprint(b"hello");
        let b = fingerprint(b"hello");
        let c = fingerprint(b"hello!");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
