use std::fs;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::QName;
use quick_xml::Reader;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::tree::{is_list_tag, ConfigTree};

/// Errors that can occur while decoding `config.xml` into a [`ConfigTree`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// Input XML could not be decoded or tokenized.
    #[error("failed to parse XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Input bytes were not valid UTF-8 for tag or text extraction.
    #[error("invalid UTF-8 while parsing XML: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    /// Failed to decode text entity or bytes.
    #[error("failed to decode XML text: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),
    /// Failed to read input file.
    #[error("failed to read XML file: {0}")]
    Io(#[from] std::io::Error),
    /// Structural issue in XML document.
    #[error("malformed XML: {0}")]
    Malformed(String),
}

struct Frame {
    tag: String,
    children: Map<String, Value>,
    text: Option<String>,
}

impl Frame {
    fn new(tag: String) -> Self {
        Self {
            tag,
            children: Map::new(),
            text: None,
        }
    }

    fn push_text(&mut self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        match &mut self.text {
            Some(existing) => existing.push_str(text),
            None => self.text = Some(text.to_string()),
        }
    }

    /// Leaf elements become strings, elements with children become mappings.
    fn into_value(self) -> Value {
        if self.children.is_empty() {
            Value::String(self.text.unwrap_or_default())
        } else {
            Value::Object(self.children)
        }
    }
}

/// Decode `config.xml` bytes into a [`ConfigTree`].
///
/// Attributes are dropped. Elements named in
/// [`LIST_TAGS`](crate::tree::LIST_TAGS), and any element repeated under the
/// same parent, decode to sequences.
pub fn parse(xml: &[u8]) -> Result<ConfigTree, ParseError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(false);

    let mut buf = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();
    let mut root: Option<ConfigTree> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => stack.push(Frame::new(tag_name(&e)?)),
            Event::Empty(e) => {
                let frame = Frame::new(tag_name(&e)?);
                close(frame, &mut stack, &mut root)?;
            }
            Event::Text(e) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some(current) = stack.last_mut() {
                    current.push_text(std::str::from_utf8(e.as_ref())?);
                }
            }
            Event::End(_) => {
                let frame = stack.pop().ok_or_else(|| {
                    ParseError::Malformed("encountered closing tag without open tag".to_string())
                })?;
                close(frame, &mut stack, &mut root)?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) | Event::Comment(_) => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(ParseError::Malformed(
            "unclosed element(s) at end of document".to_string(),
        ));
    }

    root.ok_or_else(|| ParseError::Malformed("no root element found".to_string()))
}

/// Decode a `config.xml` file into a [`ConfigTree`].
pub fn parse_file(path: &Path) -> Result<ConfigTree, ParseError> {
    let bytes = fs::read(path)?;
    parse(&bytes)
}

fn close(
    frame: Frame,
    stack: &mut [Frame],
    root: &mut Option<ConfigTree>,
) -> Result<(), ParseError> {
    if let Some(parent) = stack.last_mut() {
        let tag = frame.tag.clone();
        insert_child(&mut parent.children, tag, frame.into_value());
        return Ok(());
    }
    if root.is_some() {
        return Err(ParseError::Malformed(
            "multiple top-level elements found".to_string(),
        ));
    }
    *root = Some(ConfigTree {
        root_tag: frame.tag,
        root: Value::Object(frame.children),
    });
    Ok(())
}

fn insert_child(children: &mut Map<String, Value>, tag: String, value: Value) {
    match children.get_mut(&tag) {
        Some(existing) => {
            let previous = std::mem::take(existing);
            *existing = match previous {
                Value::Array(mut items) => {
                    items.push(value);
                    Value::Array(items)
                }
                single => Value::Array(vec![single, value]),
            };
        }
        None if is_list_tag(&tag) => {
            children.insert(tag, Value::Array(vec![value]));
        }
        None => {
            children.insert(tag, value);
        }
    }
}

fn tag_name(e: &BytesStart<'_>) -> Result<String, ParseError> {
    qname_to_string(e.name())
}

fn qname_to_string(name: QName<'_>) -> Result<String, ParseError> {
    Ok(std::str::from_utf8(name.as_ref())?.to_string())
}
