//! Dynamic document model and nested-path value resolution.
//!
//! Search-index documents arrive as loosely-typed trees of mappings,
//! sequences, and scalars. Field-map expressions address values inside them
//! with dotted paths (`foo.bar.0.title`), resolved here against
//! `serde_json::Value` as the closed variant type. Source representations
//! that are typed maps are converted once at the fetch boundary via
//! [`to_document`].

use serde::Serialize;
use serde_json::{Map, Value};

/// One document fetched from a search index: a mapping of string keys to
/// arbitrary values.
pub type Document = Map<String, Value>;

/// Resolve a dotted path against a value tree.
///
/// At each step a mapping is indexed by the segment as a key and a sequence
/// by the segment parsed as a non-negative integer. A missing key, an
/// unparsable or out-of-range index, or a scalar in the middle of the path
/// resolves to `None`. The empty path resolves to `None`.
pub fn resolve<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }

    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(seq) => {
                let idx: usize = segment.parse().ok()?;
                seq.get(idx)?
            }
            _ => return None,
        };
    }

    Some(current)
}

/// Resolve a dotted path against a document's top-level mapping.
pub fn resolve_in<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
    let (head, rest) = match path.split_once('.') {
        Some((head, rest)) => (head, Some(rest)),
        None => (path, None),
    };

    if head.is_empty() {
        return None;
    }

    let value = doc.get(head)?;
    match rest {
        Some(rest) => resolve(value, rest),
        None => Some(value),
    }
}

/// Convert any serializable mapping into a [`Document`].
///
/// This is the adapter applied at the fetch boundary: typed maps
/// (`HashMap<String, String>`, `HashMap<i32, _>`, nested structs) all
/// flatten into the same dynamic tree, so path resolution behaves uniformly
/// regardless of the source representation. Integer keys become their
/// decimal string form. Returns `None` if the value does not serialize to a
/// mapping.
pub fn to_document<T: Serialize>(value: &T) -> Option<Document> {
    match serde_json::to_value(value).ok()? {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn nested_doc() -> Value {
        json!({
            "foo": {
                "bar": {
                    "x": {
                        "y": {
                            "z": "found me",
                            "a": [
                                {"title": "Calligraphy", "domain": "art"},
                                {"title": "Paint", "domain": "art"}
                            ]
                        }
                    }
                }
            }
        })
    }

    #[test]
    fn test_resolve_full_path() {
        let doc = nested_doc();
        assert_eq!(
            resolve(&doc, "foo.bar.x.y.z"),
            Some(&Value::String("found me".into()))
        );
    }

    #[test]
    fn test_resolve_sequence_index() {
        let doc = nested_doc();
        assert_eq!(
            resolve(&doc, "foo.bar.x.y.a.0.title"),
            Some(&Value::String("Calligraphy".into()))
        );
        assert_eq!(
            resolve(&doc, "foo.bar.x.y.a.1.title"),
            Some(&Value::String("Paint".into()))
        );
    }

    #[test]
    fn test_resolve_mid_level_returns_subtree() {
        let doc = nested_doc();
        let sub = resolve(&doc, "foo.bar.x.y").unwrap();
        assert!(sub.is_object());
        assert!(sub.get("z").is_some());
    }

    #[test]
    fn test_resolve_absent_cases() {
        let doc = nested_doc();
        assert_eq!(resolve(&doc, ""), None);
        assert_eq!(resolve(&doc, ".foo"), None);
        assert_eq!(resolve(&doc, "baz"), None);
        assert_eq!(resolve(&doc, "foo.bar.missing"), None);
        // Scalar in the middle of the path.
        assert_eq!(resolve(&doc, "foo.bar.x.y.z.deeper"), None);
        // Non-numeric and out-of-range sequence indexes.
        assert_eq!(resolve(&doc, "foo.bar.x.y.a.first"), None);
        assert_eq!(resolve(&doc, "foo.bar.x.y.a.2.title"), None);
        assert_eq!(resolve(&doc, "foo.bar.x.y.a.-1.title"), None);
    }

    #[test]
    fn test_resolve_in_document() {
        let Value::Object(doc) = nested_doc() else {
            panic!("fixture is an object");
        };
        assert_eq!(
            resolve_in(&doc, "foo.bar.x.y.z"),
            Some(&Value::String("found me".into()))
        );
        assert!(resolve_in(&doc, "foo").is_some());
        assert_eq!(resolve_in(&doc, ""), None);
        assert_eq!(resolve_in(&doc, ".foo"), None);
    }

    #[test]
    fn test_adapter_string_map() {
        let mut map = HashMap::new();
        map.insert("title".to_string(), "Anatomy of a Fall".to_string());
        let doc = to_document(&map).unwrap();
        assert_eq!(
            resolve_in(&doc, "title"),
            Some(&Value::String("Anatomy of a Fall".into()))
        );
    }

    #[test]
    fn test_adapter_int_keys_resolve_as_string_segments() {
        let mut inner = HashMap::new();
        inner.insert(0, "zero");
        inner.insert(7, "seven");
        let mut map = HashMap::new();
        map.insert("slots".to_string(), inner);

        let doc = to_document(&map).unwrap();
        assert_eq!(
            resolve_in(&doc, "slots.7"),
            Some(&Value::String("seven".into()))
        );
    }

    #[test]
    fn test_adapter_sequence_of_mappings() {
        let mut map: HashMap<String, Vec<HashMap<String, String>>> = HashMap::new();
        map.insert(
            "tags".to_string(),
            vec![HashMap::from([("name".to_string(), "art".to_string())])],
        );

        let doc = to_document(&map).unwrap();
        assert_eq!(
            resolve_in(&doc, "tags.0.name"),
            Some(&Value::String("art".into()))
        );
    }

    #[test]
    fn test_adapter_rejects_non_mapping() {
        assert!(to_document(&vec![1, 2, 3]).is_none());
        assert!(to_document(&"scalar").is_none());
    }
}
