use crate::document::{scalar_text, Document, DocumentError, Position, Record};

/// A record found by its natural key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Located<'a> {
    pub position: Position,
    pub record: &'a Record,
}

/// Find the first record in `list` whose `key_field` equals `key_value`.
///
/// Keys are compared in their textual form, so a numeric key stored by the
/// appliance matches the same number supplied as text. `Ok(None)` means the
/// entity does not exist yet; it is not an error.
pub fn locate<'a>(
    document: &'a Document,
    list: &str,
    key_field: &str,
    key_value: &str,
) -> Result<Option<Located<'a>>, DocumentError> {
    let found = document
        .records(list)?
        .into_iter()
        .find(|(_, record)| {
            record
                .get(key_field)
                .and_then(scalar_text)
                .is_some_and(|value| value == key_value)
        })
        .map(|(position, record)| Located { position, record });
    Ok(found)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::locate;
    use crate::document::{Document, Position};

    fn rules() -> Document {
        Document::new(json!({
            "rule": [
                {"tracker": 1000, "descr": "first"},
                {"tracker": "2000", "descr": "second"},
                {"tracker": "2000", "descr": "duplicate"}
            ]
        }))
    }

    #[test]
    fn numeric_stored_key_matches_text() {
        let doc = rules();
        let found = locate(&doc, "rule", "tracker", "1000").expect("locate");
        assert_eq!(found.map(|l| l.position), Some(Position(0)));
    }

    #[test]
    fn first_match_wins() {
        let doc = rules();
        let found = locate(&doc, "rule", "tracker", "2000")
            .expect("locate")
            .expect("found");
        assert_eq!(found.position, Position(1));
        assert_eq!(found.record.get("descr"), Some(&json!("second")));
    }

    #[test]
    fn missing_key_is_not_found() {
        let doc = rules();
        assert!(locate(&doc, "rule", "tracker", "3000")
            .expect("locate")
            .is_none());
        assert!(locate(&doc, "group", "name", "admins")
            .expect("locate")
            .is_none());
    }

    #[test]
    fn records_without_key_field_are_skipped() {
        let doc = Document::new(json!({"rule": [{"descr": "no tracker"}, {"tracker": "7"}]}));
        let found = locate(&doc, "rule", "tracker", "7").expect("locate");
        assert_eq!(found.map(|l| l.position), Some(Position(1)));
    }
}
