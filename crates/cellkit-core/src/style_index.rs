//! The style index: builds the flat tables behind `styles.xml`.
//!
//! Two build modes exist. *Fresh* starts from the minimal default stylesheet
//! and interns every style a full regeneration needs. *Surgical* starts from
//! the source's parsed tables: every original cellXf keeps its index, and
//! new styles append at indices at or past the original count, so cells on
//! unmodified (byte-copied) sheets keep referencing valid entries.
//!
//! Deduplication is canonical-key hashing, O(n) in the number of styles.

use std::collections::HashMap;

use cellkit_xml::styles::{StylesXml, Xf};

use crate::style::{
    border_key, fill_key, font_key, style_from_xf, CellStyle, NumFmtTable, NumberFormat,
};

/// Incremental builder over a stylesheet's flat tables.
#[derive(Debug)]
pub struct StyleIndex {
    styles: StylesXml,
    xf_by_key: HashMap<String, u32>,
    font_by_key: HashMap<String, u32>,
    fill_by_key: HashMap<String, u32>,
    border_by_key: HashMap<String, u32>,
    num_fmts: NumFmtTable,
    original_count: u32,
}

impl StyleIndex {
    /// Fresh build over the minimal default stylesheet.
    pub fn fresh() -> Self {
        Self::seeded(StylesXml::default())
    }

    /// Surgical build: preserve the source's tables and indices.
    pub fn surgical(original: &StylesXml) -> Self {
        Self::seeded(original.clone())
    }

    fn seeded(styles: StylesXml) -> Self {
        let mut index = Self {
            xf_by_key: HashMap::with_capacity(styles.cell_xfs.len()),
            font_by_key: HashMap::with_capacity(styles.fonts.len()),
            fill_by_key: HashMap::with_capacity(styles.fills.len()),
            border_by_key: HashMap::with_capacity(styles.borders.len()),
            num_fmts: NumFmtTable::seeded_from(&styles.num_fmts),
            original_count: styles.cell_xfs.len() as u32,
            styles,
        };
        for (i, font) in index.styles.fonts.iter().enumerate() {
            index.font_by_key.entry(font_key(font)).or_insert(i as u32);
        }
        for (i, fill) in index.styles.fills.iter().enumerate() {
            index.fill_by_key.entry(fill_key(fill)).or_insert(i as u32);
        }
        for (i, border) in index.styles.borders.iter().enumerate() {
            index
                .border_by_key
                .entry(border_key(border))
                .or_insert(i as u32);
        }
        for i in 0..index.styles.cell_xfs.len() {
            let style = style_from_xf(&index.styles, &index.styles.cell_xfs[i]);
            index
                .xf_by_key
                .entry(style.canonical_key())
                .or_insert(i as u32);
        }
        index
    }

    /// Number of cellXf entries the build started from.
    pub fn original_count(&self) -> u32 {
        self.original_count
    }

    /// Number of cellXf entries currently in the table.
    pub fn len(&self) -> u32 {
        self.styles.cell_xfs.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.styles.cell_xfs.is_empty()
    }

    /// Global cellXf index for a style, appending a new entry when the
    /// canonical key has not been seen.
    pub fn intern(&mut self, style: &CellStyle) -> u32 {
        let key = style.canonical_key();
        if let Some(&index) = self.xf_by_key.get(&key) {
            return index;
        }

        let font_id = self.intern_font(style);
        let fill_id = self.intern_fill(style);
        let border_id = self.intern_border(style);
        let num_fmt_id = self.num_fmts.intern(&style.number_format);

        let alignment = style.alignment.clone().filter(|a| !a.is_default());
        let xf = Xf {
            num_fmt_id,
            font_id,
            fill_id,
            border_id,
            xf_id: Some(0),
            apply_number_format: (style.number_format != NumberFormat::General).then_some(true),
            apply_font: (font_id != 0).then_some(true),
            apply_fill: (fill_id != 0).then_some(true),
            apply_border: (border_id != 0).then_some(true),
            apply_alignment: alignment.is_some().then_some(true),
            apply_protection: None,
            alignment,
            protection: None,
            other_attrs: Vec::new(),
        };

        let index = self.styles.cell_xfs.len() as u32;
        self.styles.cell_xfs.push(xf);
        self.xf_by_key.insert(key, index);
        index
    }

    fn intern_font(&mut self, style: &CellStyle) -> u32 {
        let key = font_key(&style.font);
        if let Some(&id) = self.font_by_key.get(&key) {
            return id;
        }
        let id = self.styles.fonts.len() as u32;
        self.styles.fonts.push(style.font.clone());
        self.font_by_key.insert(key, id);
        id
    }

    fn intern_fill(&mut self, style: &CellStyle) -> u32 {
        let key = fill_key(&style.fill);
        if let Some(&id) = self.fill_by_key.get(&key) {
            return id;
        }
        let id = self.styles.fills.len() as u32;
        self.styles.fills.push(style.fill.clone());
        self.fill_by_key.insert(key, id);
        id
    }

    fn intern_border(&mut self, style: &CellStyle) -> u32 {
        let key = border_key(&style.border);
        if let Some(&id) = self.border_by_key.get(&key) {
            return id;
        }
        let id = self.styles.borders.len() as u32;
        self.styles.borders.push(style.border.clone());
        self.border_by_key.insert(key, id);
        id
    }

    /// A rendered copy of the current tables, without consuming the build.
    pub fn snapshot(&self) -> StylesXml {
        let mut styles = self.styles.clone();
        styles.num_fmts = self.num_fmts.entries().to_vec();
        styles
    }

    /// Finish the build and hand back the stylesheet.
    pub fn into_styles(mut self) -> StylesXml {
        self.styles.num_fmts = self.num_fmts.into_entries();
        self.styles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::{Alignment, Color, Fill, Font, PatternFill};
    use pretty_assertions::assert_eq;

    fn bold_style() -> CellStyle {
        CellStyle {
            font: Font {
                bold: true,
                size: Some("11".to_string()),
                name: Some("Calibri".to_string()),
                ..Font::default()
            },
            ..CellStyle::default()
        }
    }

    #[test]
    fn test_fresh_build_starts_from_minimal_defaults() {
        let index = StyleIndex::fresh();
        assert_eq!(index.len(), 1);
        assert_eq!(index.original_count(), 1);
        let styles = index.into_styles();
        assert_eq!(styles.fills.len(), 2);
        assert_eq!(styles.cell_styles[0].name, "Normal");
    }

    #[test]
    fn test_intern_deduplicates_by_canonical_key() {
        let mut index = StyleIndex::fresh();
        let a = index.intern(&bold_style());
        let b = index.intern(&bold_style());
        assert_eq!(a, b);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_intern_default_style_maps_to_zero() {
        let mut index = StyleIndex::fresh();
        assert_eq!(index.intern(&CellStyle::default()), 0);
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_sub_components_dedupe_independently() {
        let mut index = StyleIndex::fresh();
        let bold_centered = CellStyle {
            alignment: Some(Alignment {
                horizontal: Some("center".to_string()),
                ..Alignment::default()
            }),
            ..bold_style()
        };
        index.intern(&bold_style());
        index.intern(&bold_centered);
        let styles = index.into_styles();
        // Two distinct xfs, one shared bold font.
        assert_eq!(styles.cell_xfs.len(), 3);
        assert_eq!(styles.fonts.len(), 2);
    }

    #[test]
    fn test_solid_fill_appends_after_required_defaults() {
        let mut index = StyleIndex::fresh();
        let filled = CellStyle {
            fill: Fill::Pattern(PatternFill {
                pattern_type: Some("solid".to_string()),
                fg_color: Some(Color::Rgb(0xFFFFFF00)),
                bg_color: None,
            }),
            ..CellStyle::default()
        };
        index.intern(&filled);
        let styles = index.into_styles();
        assert_eq!(styles.fills.len(), 3);
        let xf = styles.cell_xfs.last().unwrap();
        assert_eq!(xf.fill_id, 2);
        assert_eq!(xf.apply_fill, Some(true));
    }

    #[test]
    fn test_surgical_preserves_original_indices() {
        // Build an "original" stylesheet with two styles.
        let mut original_index = StyleIndex::fresh();
        original_index.intern(&bold_style());
        let original = original_index.into_styles();
        assert_eq!(original.cell_xfs.len(), 2);

        let mut surgical = StyleIndex::surgical(&original);
        assert_eq!(surgical.original_count(), 2);
        // An unchanged style resolves to its original global index.
        assert_eq!(surgical.intern(&bold_style()), 1);
        assert_eq!(surgical.len(), 2);
        // A new style appends past the original count.
        let new_style = CellStyle {
            number_format: NumberFormat::Builtin(14),
            ..CellStyle::default()
        };
        let id = surgical.intern(&new_style);
        assert_eq!(id, 2);
        assert!(id >= surgical.original_count());
    }

    #[test]
    fn test_repeat_builds_are_byte_identical() {
        use cellkit_xml::emit::XmlBackend;

        let build = || {
            let mut index = StyleIndex::fresh();
            index.intern(&bold_style());
            index.intern(&CellStyle {
                number_format: NumberFormat::Custom("0.00%".to_string()),
                ..CellStyle::default()
            });
            index.into_styles().to_xml(XmlBackend::Dom)
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_custom_numfmt_gets_id_and_apply_flag() {
        let mut index = StyleIndex::fresh();
        index.intern(&CellStyle {
            number_format: NumberFormat::Custom("#,##0.00".to_string()),
            ..CellStyle::default()
        });
        let styles = index.into_styles();
        assert_eq!(styles.num_fmts.len(), 1);
        assert_eq!(styles.num_fmts[0].id, 164);
        let xf = styles.cell_xfs.last().unwrap();
        assert_eq!(xf.num_fmt_id, 164);
        assert_eq!(xf.apply_number_format, Some(true));
    }

    #[test]
    fn test_no_negative_component_references() {
        let mut index = StyleIndex::fresh();
        index.intern(&bold_style());
        let styles = index.into_styles();
        for xf in &styles.cell_xfs {
            assert!((xf.font_id as usize) < styles.fonts.len());
            assert!((xf.fill_id as usize) < styles.fills.len());
            assert!((xf.border_id as usize) < styles.borders.len());
        }
    }
}
