//! Canonical JSON serialization.
//!
//! The signing format requires byte-identical JSON on both ends: object keys
//! sorted lexicographically, no insignificant whitespace. serde_json's
//! default `Map` is backed by a `BTreeMap`, so round-tripping any payload
//! through `Value` yields sorted keys, and `to_string` emits the compact
//! form. This holds only while the `preserve_order` feature stays off
//! (pinned in the workspace manifest).

use serde::Serialize;

use crate::error::Result;

/// Serialize `payload` to its canonical JSON form.
pub fn canonical_json<T: Serialize>(payload: &T) -> Result<String> {
    let value = serde_json::to_value(payload)?;
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Unordered {
        zeta: u32,
        alpha: &'static str,
        mid: bool,
    }

    #[test]
    fn test_keys_sorted_and_compact() {
        let json = canonical_json(&Unordered {
            zeta: 1,
            alpha: "a",
            mid: true,
        })
        .unwrap();
        assert_eq!(json, r#"{"alpha":"a","mid":true,"zeta":1}"#);
    }

    #[test]
    fn test_nested_objects_sorted() {
        let value = serde_json::json!({
            "b": {"y": 2, "x": 1},
            "a": [{"q": 0, "p": 9}]
        });
        let json = canonical_json(&value).unwrap();
        assert_eq!(json, r#"{"a":[{"p":9,"q":0}],"b":{"x":1,"y":2}}"#);
    }

    #[test]
    fn test_stable_across_calls() {
        let value = serde_json::json!({"k": "v", "a": 1});
        assert_eq!(
            canonical_json(&value).unwrap(),
            canonical_json(&value).unwrap()
        );
    }
}
