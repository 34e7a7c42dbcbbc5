//! VML (Vector Markup Language) generation for comment bubbles.
//!
//! Excel anchors comment pop-ups through legacy VML drawing parts
//! (`xl/drawings/vmlDrawingN.vml`). This module generates minimal VML for
//! sheets whose comments changed; untouched sheets keep their source VML
//! byte-for-byte.
//!
//! Shape IDs take the form `_x0000_sN`. N is allocated per sheet at a
//! stride so IDs never collide across sheets of one workbook.

/// Default per-sheet shape-ID stride.
const BASE_STRIDE: usize = 1024;

/// Default comment box width in columns.
const DEFAULT_COMMENT_WIDTH_COLS: u32 = 2;
/// Default comment box height in rows.
const DEFAULT_COMMENT_HEIGHT_ROWS: u32 = 4;

/// Pick the workbook-wide shape-ID stride.
///
/// 1024 covers ordinary workbooks; a sheet with more comments widens the
/// stride to the next multiple of 1024 above its comment count, keeping the
/// id ranges of consecutive sheets disjoint.
pub fn shape_id_stride(max_comments_per_sheet: usize) -> usize {
    let mut stride = BASE_STRIDE;
    while stride <= max_comments_per_sheet {
        stride += BASE_STRIDE;
    }
    stride
}

/// First shape ID of a sheet under the given stride.
pub fn first_shape_id(sheet_index: usize, stride: usize) -> usize {
    stride * (sheet_index + 1) + 1
}

/// Build a complete VML drawing for one sheet's comments.
///
/// `cells` are the commented anchors as 1-based `(col, row)` pairs, in
/// comment order. `sheet_index` is the sheet's 0-based position.
pub fn build_vml_drawing(cells: &[(u32, u32)], sheet_index: usize, stride: usize) -> String {
    let mut shapes = String::new();
    for (i, &(col, row)) in cells.iter().enumerate() {
        let shape_id = first_shape_id(sheet_index, stride) + i;
        let anchor = comment_anchor(col, row);
        write_vml_shape(&mut shapes, shape_id, i + 1, &anchor, row - 1, col - 1);
    }

    let mut doc = String::with_capacity(1024 + shapes.len());
    doc.push_str("<xml xmlns:v=\"urn:schemas-microsoft-com:vml\"");
    doc.push_str(" xmlns:o=\"urn:schemas-microsoft-com:office:office\"");
    doc.push_str(" xmlns:x=\"urn:schemas-microsoft-com:office:excel\">\n");
    doc.push_str(" <o:shapelayout v:ext=\"edit\">\n");
    doc.push_str("  <o:idmap v:ext=\"edit\" data=\"1\"/>\n");
    doc.push_str(" </o:shapelayout>\n");
    doc.push_str(" <v:shapetype id=\"_x0000_t202\" coordsize=\"21600,21600\"");
    doc.push_str(" o:spt=\"202\" path=\"m,l,21600r21600,l21600,xe\">\n");
    doc.push_str("  <v:stroke joinstyle=\"miter\"/>\n");
    doc.push_str("  <v:path gradientshapeok=\"t\" o:connecttype=\"rect\"/>\n");
    doc.push_str(" </v:shapetype>\n");
    doc.push_str(&shapes);
    doc.push_str("</xml>\n");
    doc
}

/// Write a single comment shape.
fn write_vml_shape(
    out: &mut String,
    shape_id: usize,
    z_index: usize,
    anchor: &str,
    row_0: u32,
    col_0: u32,
) {
    use std::fmt::Write;
    let _ = write!(out, " <v:shape id=\"_x0000_s{}\"", shape_id);
    out.push_str(" type=\"#_x0000_t202\"");
    let _ = write!(
        out,
        " style=\"position:absolute;margin-left:59.25pt;margin-top:1.5pt;\
         width:108pt;height:59.25pt;z-index:{};visibility:hidden\"",
        z_index
    );
    out.push_str(" fillcolor=\"#ffffe1\" o:insetmode=\"auto\">\n");
    out.push_str("  <v:fill color2=\"#ffffe1\"/>\n");
    out.push_str("  <v:shadow on=\"t\" color=\"black\" obscured=\"t\"/>\n");
    out.push_str("  <v:path o:connecttype=\"none\"/>\n");
    out.push_str("  <v:textbox/>\n");
    out.push_str("  <x:ClientData ObjectType=\"Note\">\n");
    out.push_str("   <x:MoveWithCells/>\n");
    out.push_str("   <x:SizeWithCells/>\n");
    let _ = writeln!(out, "   <x:Anchor>{}</x:Anchor>", anchor);
    let _ = writeln!(out, "   <x:Row>{}</x:Row>", row_0);
    let _ = writeln!(out, "   <x:Column>{}</x:Column>", col_0);
    out.push_str("  </x:ClientData>\n");
    out.push_str(" </v:shape>\n");
}

/// Compute the 8-value anchor string for a comment box near a cell.
///
/// Format: "LeftCol, LeftOff, TopRow, TopOff, RightCol, RightOff,
/// BottomRow, BottomOff". Offsets use fixed small values.
fn comment_anchor(col: u32, row: u32) -> String {
    let left_col = col;
    let top_row = if row > 1 { row - 2 } else { 0 };
    let right_col = col + DEFAULT_COMMENT_WIDTH_COLS;
    let bottom_row = top_row + DEFAULT_COMMENT_HEIGHT_ROWS;
    format!("{left_col}, 15, {top_row}, 10, {right_col}, 15, {bottom_row}, 4")
}
