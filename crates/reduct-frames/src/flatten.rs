//! JSON content sniffing and path flattening

use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

/// Root of every flattened path
pub const ROOT: &str = "$";

/// Flattened document: path → leaf value
pub type FlatMap = BTreeMap<String, JsonValue>;

/// Cheap rejection of non-JSON payloads: the first non-whitespace byte must
/// open an object or an array. Blank bodies are rejected.
pub fn looks_like_json(body: &[u8]) -> bool {
    body.iter()
        .find(|b| !matches!(b, b' ' | b'\n' | b'\t' | b'\r'))
        .map_or(false, |b| *b == b'{' || *b == b'[')
}

/// Walk `value` and write every leaf into `out` under its path.
///
/// Objects extend the path with `.key`, arrays with `[index]`; scalars and
/// `null` are leaves.
pub fn flatten(prefix: &str, value: &JsonValue, out: &mut FlatMap) {
    match value {
        JsonValue::Object(map) => {
            for (key, child) in map {
                flatten(&format!("{}.{}", prefix, key), child, out);
            }
        }
        JsonValue::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                flatten(&format!("{}[{}]", prefix, index), child, out);
            }
        }
        leaf => {
            out.insert(prefix.to_string(), leaf.clone());
        }
    }
}

/// Sniff, parse and flatten a record body rooted at `$`.
///
/// Returns `None` for blank or non-JSON bodies and for bodies that look like
/// JSON but fail to parse.
pub fn flatten_body(body: &[u8]) -> Option<FlatMap> {
    if !looks_like_json(body) {
        return None;
    }

    let document: JsonValue = serde_json::from_slice(body).ok()?;
    let mut out = FlatMap::new();
    flatten(ROOT, &document, &mut out);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sniff() {
        assert!(looks_like_json(b"{}"));
        assert!(looks_like_json(b" \r\n\t[1]"));
        assert!(!looks_like_json(b""));
        assert!(!looks_like_json(b"   \n"));
        assert!(!looks_like_json(b"42"));
        assert!(!looks_like_json(b"\"text\""));
        assert!(!looks_like_json(b"\x00\x01binary"));
    }

    #[test]
    fn test_flatten_is_structure_preserving() {
        let mut out = FlatMap::new();
        flatten(ROOT, &json!({"a": [1, {"b": 2}]}), &mut out);

        assert_eq!(out.len(), 2);
        assert_eq!(out["$.a[0]"], json!(1));
        assert_eq!(out["$.a[1].b"], json!(2));
    }

    #[test]
    fn test_flatten_nested_paths() {
        let flat = flatten_body(br#"{"meta": {"seq": 3}, "items": [{"name": "x"}, {"name": "y"}, {"name": "z"}]}"#)
            .unwrap();

        assert_eq!(flat["$.meta.seq"], json!(3));
        assert_eq!(flat["$.items[2].name"], json!("z"));
        assert_eq!(flat.len(), 4);
    }

    #[test]
    fn test_flatten_keeps_null_leaves() {
        let flat = flatten_body(br#"{"missing": null}"#).unwrap();
        assert_eq!(flat["$.missing"], JsonValue::Null);
    }

    #[test]
    fn test_flatten_top_level_array() {
        let flat = flatten_body(b"[true, \"s\"]").unwrap();
        assert_eq!(flat["$[0]"], json!(true));
        assert_eq!(flat["$[1]"], json!("s"));
    }

    #[test]
    fn test_empty_containers_produce_no_keys() {
        assert!(flatten_body(b"{}").unwrap().is_empty());
        assert!(flatten_body(br#"{"a": [], "b": {}}"#).unwrap().is_empty());
    }

    #[test]
    fn test_broken_json_is_skipped() {
        assert!(flatten_body(b"{not json").is_none());
        assert!(flatten_body(b"plain text").is_none());
        assert!(flatten_body(b"").is_none());
    }
}
