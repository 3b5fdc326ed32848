//! Deterministic point-ID derivation and embedding normalization.

use uuid::Uuid;

/// Fixed namespace UUID the point-ID v5 derivation hangs off of. Arbitrary
/// but must never change, or every existing point ID shifts.
const POINT_ID_NAMESPACE: Uuid = Uuid::from_bytes([
    0x9e, 0x1f, 0x6c, 0x3a, 0x5b, 0x0d, 0x4a, 0x8e, 0xb2, 0x71, 0x2c, 0x4f, 0x6a, 0x9d, 0x1e, 0x03,
]);

/// Deterministic point ID for `namespace ‖ ":" ‖ uid`. Using the same
/// (namespace, uid) pair always yields the same point ID, which is what
/// makes `Store` idempotent. UUIDv5 is stable across Rust/toolchain
/// versions, unlike a std hasher's output, so persisted point IDs survive
/// upgrades.
#[must_use]
pub fn point_id(namespace: &str, uid: &str) -> String {
    let name = format!("{namespace}:{uid}");
    Uuid::new_v5(&POINT_ID_NAMESPACE, name.as_bytes()).to_string()
}

/// L2-normalizes a vector in place; a zero vector is left unchanged.
pub fn l2_normalize(vec: &mut [f32]) {
    let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in vec.iter_mut() {
            *x /= norm;
        }
    }
}

/// Cosine similarity between two equal-length vectors. Assumes both are
/// already L2-normalized (returns the dot product in that case).
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn point_id_is_deterministic() {
        assert_eq!(point_id("user_alice", "0x1"), point_id("user_alice", "0x1"));
        assert_ne!(point_id("user_alice", "0x1"), point_id("user_bob", "0x1"));
    }

    #[test]
    fn l2_normalize_yields_unit_vector() {
        let mut v = vec![3.0_f32, 4.0];
        l2_normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_identical_normalized_vectors_is_one() {
        let mut v = vec![1.0_f32, 2.0, 3.0];
        l2_normalize(&mut v);
        let sim = cosine_similarity(&v, &v);
        assert!((sim - 1.0).abs() < 1e-5);
    }
}
