//! Domain cell styles and canonical keys.
//!
//! A [`CellStyle`] bundles the four flat-table components plus alignment.
//! Equality is defined by the canonical key: a byte-stable serialization of
//! all sub-fields in a fixed order. Canonical-key hashing is what keeps
//! style deduplication O(n).

pub use cellkit_xml::styles::{Alignment, Border, BorderSide, Color, Fill, Font, PatternFill};

use cellkit_xml::styles::{NumFmt, StylesXml, Xf};

/// First id available for custom number formats.
pub const FIRST_CUSTOM_NUMFMT_ID: u32 = 164;

/// Number format of a cell style.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NumberFormat {
    /// `numFmtId="0"`.
    #[default]
    General,
    /// A built-in format referenced by id (1..=163).
    Builtin(u32),
    /// A custom format code; its id is assigned at emission time.
    Custom(String),
}

/// One addressable cell style.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CellStyle {
    pub font: Font,
    pub fill: Fill,
    pub border: Border,
    pub number_format: NumberFormat,
    pub alignment: Option<Alignment>,
}

impl CellStyle {
    /// The byte-stable canonical key. Two styles are identical if and only
    /// if their keys match.
    pub fn canonical_key(&self) -> String {
        format!(
            "F{{{}}}|L{{{}}}|B{{{}}}|N{{{}}}|A{{{}}}",
            font_key(&self.font),
            fill_key(&self.fill),
            border_key(&self.border),
            numfmt_key(&self.number_format),
            self.alignment.as_ref().map(align_key).unwrap_or_default()
        )
    }
}

/// Canonical key for a color.
pub fn color_key(color: &Color) -> String {
    match color {
        Color::Rgb(argb) => format!("rgb:{argb:08X}"),
        Color::Theme { index, tint } => {
            format!("theme:{index}:{}", tint.as_deref().unwrap_or(""))
        }
        Color::Indexed(index) => format!("indexed:{index}"),
        Color::Auto => "auto".to_string(),
    }
}

/// Canonical key for a font: fixed field order, `|` separated.
pub fn font_key(font: &Font) -> String {
    let mut key = String::with_capacity(64);
    key.push(if font.bold { 'b' } else { '-' });
    key.push(if font.italic { 'i' } else { '-' });
    key.push(if font.strike { 's' } else { '-' });
    key.push('|');
    match &font.underline {
        None => key.push('-'),
        Some(None) => key.push('u'),
        Some(Some(val)) => {
            key.push_str("u:");
            key.push_str(val);
        }
    }
    key.push('|');
    key.push_str(font.size.as_deref().unwrap_or(""));
    key.push('|');
    if let Some(color) = &font.color {
        key.push_str(&color_key(color));
    }
    key.push('|');
    key.push_str(font.name.as_deref().unwrap_or(""));
    key.push('|');
    if let Some(family) = font.family {
        key.push_str(&family.to_string());
    }
    key.push('|');
    if let Some(charset) = font.charset {
        key.push_str(&charset.to_string());
    }
    key.push('|');
    key.push_str(font.scheme.as_deref().unwrap_or(""));
    for child in &font.other_children {
        key.push('|');
        key.push_str(&child.to_xml());
    }
    key
}

/// Canonical key for a fill.
pub fn fill_key(fill: &Fill) -> String {
    match fill {
        Fill::Pattern(p) => format!(
            "p:{}:{}:{}",
            p.pattern_type.as_deref().unwrap_or(""),
            p.fg_color.as_ref().map(color_key).unwrap_or_default(),
            p.bg_color.as_ref().map(color_key).unwrap_or_default()
        ),
        Fill::Gradient(raw) => format!("g:{}", raw.to_xml()),
    }
}

fn side_key(side: &Option<BorderSide>) -> String {
    match side {
        None => "-".to_string(),
        Some(side) => format!(
            "{}:{}",
            side.style.as_deref().unwrap_or(""),
            side.color.as_ref().map(color_key).unwrap_or_default()
        ),
    }
}

/// Canonical key for a border.
pub fn border_key(border: &Border) -> String {
    format!(
        "{}|{}|{}|{}|{}|du:{:?}|dd:{:?}",
        side_key(&border.left),
        side_key(&border.right),
        side_key(&border.top),
        side_key(&border.bottom),
        side_key(&border.diagonal),
        border.diagonal_up,
        border.diagonal_down
    )
}

/// Canonical key for a number format.
pub fn numfmt_key(fmt: &NumberFormat) -> String {
    match fmt {
        NumberFormat::General => "general".to_string(),
        NumberFormat::Builtin(id) => format!("builtin:{id}"),
        NumberFormat::Custom(code) => format!("custom:{code}"),
    }
}

/// Canonical key for an alignment.
pub fn align_key(align: &Alignment) -> String {
    let mut key = format!(
        "{}|{}|{:?}|{:?}|{:?}|{:?}|{:?}",
        align.horizontal.as_deref().unwrap_or(""),
        align.vertical.as_deref().unwrap_or(""),
        align.wrap_text,
        align.indent,
        align.shrink_to_fit,
        align.text_rotation,
        align.reading_order
    );
    for (name, value) in &align.other_attrs {
        key.push('|');
        key.push_str(name);
        key.push('=');
        key.push_str(value);
    }
    key
}

/// The 64 standard indexed palette entries, as ARGB with a zero alpha
/// channel. Indices at or beyond the table produce no color.
const INDEXED_PALETTE: [u32; 64] = [
    0x00000000, 0x00FFFFFF, 0x00FF0000, 0x0000FF00, 0x000000FF, 0x00FFFF00, 0x00FF00FF, 0x0000FFFF,
    0x00000000, 0x00FFFFFF, 0x00FF0000, 0x0000FF00, 0x000000FF, 0x00FFFF00, 0x00FF00FF, 0x0000FFFF,
    0x00800000, 0x00008000, 0x00000080, 0x00808000, 0x00800080, 0x00008080, 0x00C0C0C0, 0x00808080,
    0x009999FF, 0x00993366, 0x00FFFFCC, 0x00CCFFFF, 0x00660066, 0x00FF8080, 0x000066CC, 0x00CCCCFF,
    0x00000080, 0x00FF00FF, 0x00FFFF00, 0x0000FFFF, 0x00800080, 0x00800000, 0x00008080, 0x000000FF,
    0x0000CCFF, 0x00CCFFFF, 0x00CCFFCC, 0x00FFFF99, 0x0099CCFF, 0x00FF99CC, 0x00CC99FF, 0x00FFCC99,
    0x003366FF, 0x0033CCCC, 0x0099CC00, 0x00FFCC00, 0x00FF9900, 0x00FF6600, 0x00666699, 0x00969696,
    0x00003366, 0x00339966, 0x00003300, 0x00333300, 0x00993300, 0x00993366, 0x00333399, 0x00333333,
];

/// ARGB value for an indexed palette entry; `None` for indices >= 64.
pub fn indexed_to_argb(index: u32) -> Option<u32> {
    INDEXED_PALETTE.get(index as usize).copied()
}

/// Resolve legacy indexed colors to their ARGB values at the domain
/// boundary. Theme and RGB colors pass through untouched; out-of-palette
/// indices dissolve to no color.
pub fn resolve_color(color: Color) -> Option<Color> {
    match color {
        Color::Indexed(index) => indexed_to_argb(index).map(Color::Rgb),
        other => Some(other),
    }
}

/// Read a [`CellStyle`] out of a stylesheet's flat tables via one cellXf.
pub fn style_from_xf(styles: &StylesXml, xf: &Xf) -> CellStyle {
    let mut font = styles
        .fonts
        .get(xf.font_id as usize)
        .cloned()
        .unwrap_or_default();
    font.color = font.color.take().and_then(resolve_color);
    let fill = styles
        .fills
        .get(xf.fill_id as usize)
        .cloned()
        .unwrap_or_default();
    let border = styles
        .borders
        .get(xf.border_id as usize)
        .cloned()
        .unwrap_or_default();
    let number_format = numfmt_from_id(styles, xf.num_fmt_id);
    let alignment = xf.alignment.clone().filter(|a| !a.is_default());
    CellStyle {
        font,
        fill,
        border,
        number_format,
        alignment,
    }
}

fn numfmt_from_id(styles: &StylesXml, id: u32) -> NumberFormat {
    if id == 0 {
        return NumberFormat::General;
    }
    if let Some(custom) = styles.num_fmts.iter().find(|nf| nf.id == id) {
        return NumberFormat::Custom(custom.code.clone());
    }
    NumberFormat::Builtin(id)
}

/// Assign ids to custom number formats in first-seen order.
#[derive(Debug, Default)]
pub struct NumFmtTable {
    entries: Vec<NumFmt>,
    next_id: u32,
}

impl NumFmtTable {
    /// Start allocating after the ids already used in `existing`.
    pub fn seeded_from(existing: &[NumFmt]) -> Self {
        let next_id = existing
            .iter()
            .map(|nf| nf.id + 1)
            .max()
            .unwrap_or(FIRST_CUSTOM_NUMFMT_ID)
            .max(FIRST_CUSTOM_NUMFMT_ID);
        Self {
            entries: existing.to_vec(),
            next_id,
        }
    }

    /// Resolve a domain number format to its wire id, interning customs.
    pub fn intern(&mut self, fmt: &NumberFormat) -> u32 {
        match fmt {
            NumberFormat::General => 0,
            NumberFormat::Builtin(id) => *id,
            NumberFormat::Custom(code) => {
                if let Some(existing) = self.entries.iter().find(|nf| nf.code == *code) {
                    return existing.id;
                }
                let id = self.next_id;
                self.next_id += 1;
                self.entries.push(NumFmt {
                    id,
                    code: code.clone(),
                });
                id
            }
        }
    }

    pub fn entries(&self) -> &[NumFmt] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<NumFmt> {
        self.entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellkit_xml::emit::{XmlBackend, XmlEmit};

    #[test]
    fn test_canonical_key_equal_iff_styles_equal() {
        let a = CellStyle {
            font: Font {
                bold: true,
                size: Some("11".to_string()),
                ..Font::default()
            },
            ..CellStyle::default()
        };
        let b = a.clone();
        assert_eq!(a.canonical_key(), b.canonical_key());

        let c = CellStyle {
            font: Font {
                bold: false,
                size: Some("11".to_string()),
                ..Font::default()
            },
            ..a.clone()
        };
        assert_ne!(a.canonical_key(), c.canonical_key());
    }

    #[test]
    fn test_canonical_key_is_byte_stable() {
        let style = CellStyle {
            fill: Fill::Pattern(PatternFill {
                pattern_type: Some("solid".to_string()),
                fg_color: Some(Color::Theme {
                    index: 4,
                    tint: Some("-0.249977111117893".to_string()),
                }),
                bg_color: None,
            }),
            number_format: NumberFormat::Custom("0.00%".to_string()),
            ..CellStyle::default()
        };
        assert_eq!(style.canonical_key(), style.canonical_key());
    }

    #[test]
    fn test_indexed_palette_known_entries() {
        assert_eq!(indexed_to_argb(0), Some(0x00000000));
        assert_eq!(indexed_to_argb(1), Some(0x00FFFFFF));
        assert_eq!(indexed_to_argb(2), Some(0x00FF0000));
        assert_eq!(indexed_to_argb(63), Some(0x00333333));
        assert_eq!(indexed_to_argb(64), None);
        assert_eq!(indexed_to_argb(255), None);
    }

    #[test]
    fn test_resolve_color_indexed_to_rgb() {
        assert_eq!(
            resolve_color(Color::Indexed(2)),
            Some(Color::Rgb(0x00FF0000))
        );
        assert_eq!(resolve_color(Color::Indexed(64)), None);
        let theme = Color::Theme {
            index: 0,
            tint: Some("-0.0499".to_string()),
        };
        assert_eq!(resolve_color(theme.clone()), Some(theme));
    }

    #[test]
    fn test_style_from_xf_resolves_font_indexed_color() {
        let mut styles = StylesXml::default();
        styles.fonts[0].color = Some(Color::Indexed(2));
        let xf = Xf::default();
        let style = style_from_xf(&styles, &xf);
        assert_eq!(style.font.color, Some(Color::Rgb(0x00FF0000)));
    }

    #[test]
    fn test_numfmt_from_id_custom_lookup() {
        let mut styles = StylesXml::default();
        styles.num_fmts.push(NumFmt {
            id: 164,
            code: "#,##0.00_ ".to_string(),
        });
        let xf = Xf {
            num_fmt_id: 164,
            ..Xf::default()
        };
        let style = style_from_xf(&styles, &xf);
        assert_eq!(
            style.number_format,
            NumberFormat::Custom("#,##0.00_ ".to_string())
        );

        let builtin = Xf {
            num_fmt_id: 14,
            ..Xf::default()
        };
        assert_eq!(
            style_from_xf(&styles, &builtin).number_format,
            NumberFormat::Builtin(14)
        );
    }

    #[test]
    fn test_numfmt_table_interns_customs() {
        let mut table = NumFmtTable::seeded_from(&[]);
        assert_eq!(table.intern(&NumberFormat::General), 0);
        assert_eq!(table.intern(&NumberFormat::Builtin(14)), 14);
        let a = table.intern(&NumberFormat::Custom("0.00%".to_string()));
        let b = table.intern(&NumberFormat::Custom("0.00%".to_string()));
        assert_eq!(a, FIRST_CUSTOM_NUMFMT_ID);
        assert_eq!(a, b);
        let c = table.intern(&NumberFormat::Custom("mm/dd".to_string()));
        assert_eq!(c, FIRST_CUSTOM_NUMFMT_ID + 1);
    }

    #[test]
    fn test_numfmt_table_seeded_avoids_existing_ids() {
        let existing = vec![NumFmt {
            id: 170,
            code: "yyyy".to_string(),
        }];
        let mut table = NumFmtTable::seeded_from(&existing);
        assert_eq!(table.intern(&NumberFormat::Custom("yyyy".to_string())), 170);
        assert_eq!(table.intern(&NumberFormat::Custom("dd".to_string())), 171);
    }

    #[test]
    fn test_gradient_fill_key_uses_verbatim_xml() {
        let raw = cellkit_xml::raw::RawElement::parse_fragment(
            r#"<gradientFill degree="90"><stop position="0"><color rgb="FF0000FF"/></stop></gradientFill>"#,
        )
        .unwrap();
        let fill = Fill::Gradient(raw);
        assert!(fill_key(&fill).starts_with("g:<gradientFill degree=\"90\">"));
        // Sanity: gradient fills emit verbatim too.
        let mut w = XmlBackend::Stream.emitter();
        fill.emit(w.as_mut());
        let out = String::from_utf8(w.take()).unwrap();
        assert!(out.contains("<gradientFill degree=\"90\">"));
    }
}
