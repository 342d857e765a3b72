use std::fs;
use std::path::Path;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde_json::Value;
use thiserror::Error;

use crate::document::sequence_entries;
use crate::tree::ConfigTree;

/// Errors that can occur while writing `config.xml` from a [`ConfigTree`].
#[derive(Debug, Error)]
pub enum WriteError {
    /// Failed to serialize XML bytes.
    #[error("failed to write XML: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Failed to write output file.
    #[error("failed to write XML file: {0}")]
    Io(#[from] std::io::Error),
}

/// Serialize a [`ConfigTree`] into `config.xml` bytes.
///
/// Sequences (including integer-keyed mappings left behind by removals) are
/// written as repeated elements. `true` becomes an empty element; `false`
/// and `null` are omitted.
pub fn write(tree: &ConfigTree) -> Result<Vec<u8>, WriteError> {
    let mut writer = Writer::new_with_indent(Vec::new(), b'\t', 1);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))?;
    write_element(&mut writer, &tree.root_tag, &tree.root)?;
    Ok(writer.into_inner())
}

/// Serialize a [`ConfigTree`] and write it to `path`.
pub fn write_file(tree: &ConfigTree, path: &Path) -> Result<(), WriteError> {
    let bytes = write(tree)?;
    fs::write(path, bytes)?;
    Ok(())
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    value: &Value,
) -> Result<(), quick_xml::Error> {
    match value {
        Value::Null | Value::Bool(false) => Ok(()),
        Value::Bool(true) => {
            writer.write_event(Event::Empty(BytesStart::new(tag)))?;
            Ok(())
        }
        Value::String(text) => write_text(writer, tag, text),
        Value::Number(n) => write_text(writer, tag, &n.to_string()),
        Value::Array(_) => write_repeated(writer, tag, value),
        Value::Object(map) => {
            if is_keyed_sequence(value) {
                return write_repeated(writer, tag, value);
            }
            if map.is_empty() {
                writer.write_event(Event::Empty(BytesStart::new(tag)))?;
                return Ok(());
            }
            writer.write_event(Event::Start(BytesStart::new(tag)))?;
            for (child_tag, child) in map {
                write_element(writer, child_tag, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(tag)))?;
            Ok(())
        }
    }
}

fn write_repeated(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    value: &Value,
) -> Result<(), quick_xml::Error> {
    // Shape was checked by the caller; anything else is written as nothing.
    let entries = sequence_entries(tag, value).unwrap_or_default();
    for (_, item) in entries {
        write_element(writer, tag, item)?;
    }
    Ok(())
}

fn write_text(
    writer: &mut Writer<Vec<u8>>,
    tag: &str,
    text: &str,
) -> Result<(), quick_xml::Error> {
    if text.is_empty() {
        writer.write_event(Event::Empty(BytesStart::new(tag)))?;
        return Ok(());
    }
    writer.write_event(Event::Start(BytesStart::new(tag)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(tag)))?;
    Ok(())
}

fn is_keyed_sequence(value: &Value) -> bool {
    value.as_object().is_some_and(|map| {
        !map.is_empty() && map.keys().all(|key| key.parse::<usize>().is_ok())
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::write;
    use crate::tree::ConfigTree;

    #[test]
    fn holes_are_written_as_repeated_elements() {
        let mut tree = ConfigTree::new("pfsense");
        tree.root = json!({
            "filter": {"rule": {"0": {"tracker": "1"}, "2": {"tracker": "3", "disabled": true}}}
        });
        let xml = String::from_utf8(write(&tree).expect("write")).expect("utf8");

        assert_eq!(xml.matches("<rule>").count(), 2);
        assert!(xml.contains("<disabled/>"));
        assert!(!xml.contains("<0>"));
    }
}
