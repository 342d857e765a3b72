use serde::Serialize;
use serde_json::{Map, Value};

use crate::document::Document;

/// Tags that always decode to a sequence, even with a single occurrence.
///
/// Mirrors the appliance's own list of repeatable elements so that a
/// one-rule `<filter>` still yields `rule: [...]`.
pub const LIST_TAGS: &[&str] = &[
    "alias", "ca", "cert", "gateway_item", "group", "item", "member", "priv", "route", "rule",
    "user", "vip",
];

/// A whole configuration document decoded from `config.xml`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConfigTree {
    /// Root element tag, normally `pfsense`.
    pub root_tag: String,
    /// Top-level sections keyed by tag.
    pub root: Value,
}

impl ConfigTree {
    /// Create an empty tree with the given root tag.
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self {
            root_tag: root_tag.into(),
            root: Value::Object(Map::new()),
        }
    }

    /// Return a copy of one top-level section as a [`Document`].
    ///
    /// A missing section yields an empty document, matching what the console
    /// reports for an unset key.
    pub fn section(&self, name: &str) -> Document {
        Document::new(self.root.get(name).cloned().unwrap_or(Value::Null))
    }
}

/// Whether `tag` always decodes to a sequence.
pub fn is_list_tag(tag: &str) -> bool {
    LIST_TAGS.contains(&tag)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::ConfigTree;

    #[test]
    fn section_returns_subtree_or_empty_document() {
        let mut tree = ConfigTree::new("pfsense");
        tree.root = json!({"system": {"nextgid": "2000"}});

        assert_eq!(tree.section("system").counter("nextgid"), Some(2000));
        assert!(tree.section("filter").records("rule").expect("records").is_empty());
    }
}
