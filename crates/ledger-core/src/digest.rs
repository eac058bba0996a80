//! Hashing, encoding, and canonical-JSON helpers shared by the
//! persona-registration and reconcile-payload signing paths.

use base64::{engine::general_purpose::STANDARD, Engine};
use sha2::{Digest, Sha256};

/// `"SHA-256=" || base64(sha256(octets))`, the exact `digest` header
/// value used by both persona registration and reconcile payload
/// signing.
pub fn sha256_base64(octets: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(octets);
    let digest = hasher.finalize();
    format!("SHA-256={}", STANDARD.encode(digest))
}

pub fn to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Serialize a JSON value with sorted object keys at every level, so two
/// logically-equal payloads always produce byte-identical octets before
/// hashing/signing.
pub fn canonical_json(value: &serde_json::Value) -> Vec<u8> {
    let sorted = sort_keys(value);
    serde_json::to_vec(&sorted).expect("canonical json values are always serializable")
}

fn sort_keys(value: &serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Object(map) => {
            let mut sorted = serde_json::Map::new();
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            for key in keys {
                sorted.insert(key.clone(), sort_keys(&map[key]));
            }
            serde_json::Value::Object(sorted)
        }
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.iter().map(sort_keys).collect())
        }
        other => other.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn sha256_base64_known_vector() {
        // sha256("") == e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855
        let digest = sha256_base64(b"");
        assert_eq!(digest, "SHA-256=47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");
    }

    #[test]
    fn canonical_json_is_key_order_independent() {
        let a = json!({"b": 1, "a": 2});
        let b = json!({"a": 2, "b": 1});
        assert_eq!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn canonical_json_sorts_nested_objects() {
        let value = json!({"z": {"y": 1, "x": 2}, "a": 1});
        let bytes = canonical_json(&value);
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, r#"{"a":1,"z":{"x":2,"y":1}}"#);
    }
}
