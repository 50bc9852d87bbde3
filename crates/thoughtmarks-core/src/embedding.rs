//! Codec for the embedding text stored on a thoughtmark row.
//!
//! Embeddings are persisted as a JSON float array in a plain text column,
//! exactly as the provider returned them. Decoding is deliberately tolerant:
//! one corrupt row must drop out of a similarity scan, not fail it.

/// Encode an embedding vector into its stored JSON text form.
pub fn encode_embedding(vector: &[f32]) -> String {
    serde_json::to_string(vector).unwrap_or_else(|_| "[]".to_string())
}

/// Decode stored embedding text back into a vector.
///
/// Returns `None` when the text is not a JSON array of finite numbers or
/// decodes to an empty vector.
pub fn decode_embedding(text: &str) -> Option<Vec<f32>> {
    let vector: Vec<f32> = serde_json::from_str(text).ok()?;
    if vector.is_empty() || vector.iter().any(|v| !v.is_finite()) {
        return None;
    }
    Some(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_values() {
        let original = vec![0.25_f32, -1.5, 0.0, 3.75];
        let decoded = decode_embedding(&encode_embedding(&original)).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn decode_rejects_non_json() {
        assert!(decode_embedding("not json").is_none());
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        assert!(decode_embedding(r#"{"embedding": [1.0]}"#).is_none());
        assert!(decode_embedding(r#"["a", "b"]"#).is_none());
    }

    #[test]
    fn decode_rejects_empty_array() {
        assert!(decode_embedding("[]").is_none());
    }

    #[test]
    fn decode_rejects_non_finite_values() {
        // JSON has no NaN/Infinity literals, but a huge value overflows f32
        // to infinity during deserialization.
        assert!(decode_embedding("[1e999]").is_none());
    }

    #[test]
    fn encode_empty_vector_is_empty_array() {
        assert_eq!(encode_embedding(&[]), "[]");
    }
}
