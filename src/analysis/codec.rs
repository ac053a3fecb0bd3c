//! Storage encodings for analysis results.
//!
//! Tags are a compact JSON array. Embeddings are packed little-endian `f32`.
//! Empty values are stored as NULL.

use tracing::warn;

/// Encode tags, or `None` when there are none.
pub fn encode_tags(tags: &[String]) -> Option<String> {
    if tags.is_empty() {
        return None;
    }
    serde_json::to_string(tags).ok()
}

/// Decode stored tags. Malformed input yields no tags.
pub fn decode_tags(raw: &str) -> Vec<String> {
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!("Ignoring malformed stored tags: {}", e);
        Vec::new()
    })
}

/// Encode an embedding, or `None` when it is empty.
pub fn encode_embedding(embedding: &[f32]) -> Option<Vec<u8>> {
    if embedding.is_empty() {
        return None;
    }
    Some(embedding.iter().flat_map(|v| v.to_le_bytes()).collect())
}

/// Decode a stored embedding. Trailing bytes that don't form a full `f32`
/// are dropped.
pub fn decode_embedding(raw: &[u8]) -> Vec<f32> {
    raw.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity of two vectors; `None` if lengths differ or either is zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() || a.is_empty() {
        return None;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return None;
    }
    Some(dot / (norm_a.sqrt() * norm_b.sqrt()))
}
