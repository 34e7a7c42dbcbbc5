//! Cell comments and the Excel author-prefix convention.
//!
//! Excel renders a comment's author as the first text run (`"Author:"` in
//! bold, then a newline and the body). Reading detects that prefix and
//! lifts the author out of the visible text; writing puts it back in the
//! same form.

use cellkit_xml::styles::Font;

use crate::rich_text::{RichText, TextRun};

/// A cell comment: author plus visible text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Comment {
    pub author: String,
    pub text: RichText,
}

impl Comment {
    pub fn new(author: impl Into<String>, text: impl Into<RichText>) -> Self {
        Self {
            author: author.into(),
            text: text.into(),
        }
    }

    /// Build from the wire text of a `<comment>` plus the authors-table
    /// entry it references.
    ///
    /// When the text leads with the conventional `"Author:"` run followed by
    /// a newline (tolerant of `\r\n`), the prefix is stripped from the
    /// visible text and the embedded name wins over the table entry.
    pub fn from_wire_text(table_author: &str, text: RichText) -> Self {
        if let Some((author, stripped)) = split_author_prefix(&text) {
            return Self {
                author,
                text: stripped,
            };
        }
        Self {
            author: table_author.to_string(),
            text,
        }
    }

    /// Convert to the wire form, re-prepending the author run.
    pub fn to_wire_text(&self) -> RichText {
        let mut runs = Vec::with_capacity(self.text.runs.len() + 1);
        runs.push(TextRun {
            text: format!("{}:", self.author),
            font: Some(author_run_font()),
            raw_rpr: None,
        });
        let mut body = self.text.runs.clone();
        match body.first_mut() {
            Some(first) => first.text = format!("\n{}", first.text),
            None => body.push(TextRun::plain("\n")),
        }
        runs.extend(body);
        RichText { runs }
    }
}

/// The font Excel uses for the bold author run.
fn author_run_font() -> Font {
    Font {
        bold: true,
        size: Some("9".to_string()),
        name: Some("Tahoma".to_string()),
        ..Font::default()
    }
}

/// Detect and strip the `"Author:"` first run. Returns the author name and
/// the remaining visible text.
fn split_author_prefix(text: &RichText) -> Option<(String, RichText)> {
    let first = text.runs.first()?;

    // Single-run form: "Author:\nbody" written without per-run styling.
    if text.runs.len() == 1 {
        let (head, body) = first.text.split_once('\n')?;
        let author = head.trim_end_matches('\r').trim_end().strip_suffix(':')?;
        if author.is_empty() {
            return None;
        }
        let mut run = first.clone();
        run.text = body.to_string();
        return Some((author.to_string(), RichText { runs: vec![run] }));
    }

    let author = first.text.trim_end().strip_suffix(':')?;
    if author.is_empty() {
        return None;
    }
    let mut rest: Vec<TextRun> = text.runs[1..].to_vec();
    // The body must start with the conventional newline after the prefix.
    let lead = rest.first_mut()?;
    if let Some(stripped) = lead.text.strip_prefix("\r\n").or_else(|| lead.text.strip_prefix('\n'))
    {
        lead.text = stripped.to_string();
    } else {
        return None;
    }
    Some((author.to_string(), RichText { runs: rest }))
}
