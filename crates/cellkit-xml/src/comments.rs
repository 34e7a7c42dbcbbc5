//! `xl/comments*.xml` parsing and regeneration.

use quick_xml::events::Event;

use crate::emit::{XmlBackend, XmlEmit};
use crate::error::Result;
use crate::namespaces;
use crate::parse::XmlParser;
use crate::raw::RawElement;
use crate::shared_strings::RichTextXml;

/// One `<comment>` record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentXml {
    /// Anchor cell reference (e.g. "A1").
    pub cell_ref: String,
    /// Index into the authors table.
    pub author_id: u32,
    pub text: RichTextXml,
    pub shape_id: Option<String>,
    /// `xr:uid`, preserved when present.
    pub guid: Option<String>,
    pub other_attrs: Vec<(String, String)>,
}

/// Parsed `xl/commentsN.xml`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommentsXml {
    pub authors: Vec<String>,
    pub comments: Vec<CommentXml>,
    pub root_attrs: Vec<(String, String)>,
    pub other_children: Vec<RawElement>,
}

impl CommentsXml {
    /// Parse a comments part. An `authorId` outside the authors table is an
    /// error.
    pub fn parse(location: &str, bytes: &[u8]) -> Result<Self> {
        let mut parser = XmlParser::new(location, bytes)?;
        let root = parser.expect_root("comments")?;

        let mut part = CommentsXml::default();
        for (name, value) in parser.attrs(&root)? {
            if name != "xmlns" {
                part.root_attrs.push((name, value));
            }
        }

        loop {
            let raw = match parser.next()? {
                Event::Start(e) => parser.read_raw(&e, false)?,
                Event::Empty(e) => parser.read_raw(&e, true)?,
                Event::End(_) | Event::Eof => break,
                _ => continue,
            };
            match raw.name.as_str() {
                "authors" => {
                    for author in raw.children_named("author") {
                        part.authors.push(author.text());
                    }
                }
                "commentList" => {
                    for comment in raw.children_named("comment") {
                        part.comments.push(parse_comment(comment));
                    }
                }
                _ => part.other_children.push(raw),
            }
        }

        for comment in &part.comments {
            if comment.author_id as usize >= part.authors.len() {
                return Err(parser.error(format!(
                    "comment at {} references author {} but only {} authors are declared",
                    comment.cell_ref,
                    comment.author_id,
                    part.authors.len()
                )));
            }
        }
        Ok(part)
    }

    /// Serialize to XML bytes.
    pub fn to_xml(&self, backend: XmlBackend) -> Vec<u8> {
        let mut buf = itoa::Buffer::new();
        let mut w = backend.emitter();
        w.start_document();
        w.start_element("comments", Some(namespaces::SPREADSHEET_ML));
        for (name, value) in &self.root_attrs {
            w.attribute(name, value);
        }

        w.start_element("authors", None);
        for author in &self.authors {
            w.start_element("author", None);
            w.characters(author);
            w.end_element();
        }
        w.end_element();

        w.start_element("commentList", None);
        for comment in &self.comments {
            w.start_element("comment", None);
            w.attribute("ref", &comment.cell_ref);
            w.attribute("authorId", buf.format(comment.author_id));
            if let Some(shape_id) = &comment.shape_id {
                w.attribute("shapeId", shape_id);
            }
            if let Some(guid) = &comment.guid {
                w.attribute("xr:uid", guid);
            }
            for (name, value) in &comment.other_attrs {
                w.attribute(name, value);
            }
            w.start_element("text", None);
            comment.text.emit_body(w.as_mut());
            w.end_element();
            w.end_element();
        }
        w.end_element();

        for child in &self.other_children {
            child.emit(w.as_mut());
        }
        w.end_element();
        w.end_document();
        w.take()
    }
}

fn parse_comment(raw: &RawElement) -> CommentXml {
    let mut comment = CommentXml {
        cell_ref: String::new(),
        author_id: 0,
        text: RichTextXml::default(),
        shape_id: None,
        guid: None,
        other_attrs: Vec::new(),
    };
    for (name, value) in &raw.attrs {
        match name.as_str() {
            "ref" => comment.cell_ref = value.clone(),
            "authorId" => comment.author_id = value.parse().unwrap_or(0),
            "shapeId" => comment.shape_id = Some(value.clone()),
            "xr:uid" => comment.guid = Some(value.clone()),
            _ => comment.other_attrs.push((name.clone(), value.clone())),
        }
    }
    if let Some(text) = raw.child("text") {
        comment.text = RichTextXml::from_raw(text);
    }
    comment
}
