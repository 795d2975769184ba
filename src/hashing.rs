//! Deterministic hashing used to derive seed offsets for named random streams. The standard
//! library hasher is randomly seeded per process, so it cannot be used where results must be
//! reproducible across runs.

use xxhash_rust::xxh3::xxh3_64;

/// A convenience method to compute the hash of a `&str`.
pub fn hash_str(data: &str) -> u64 {
    xxh3_64(data.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_strings() {
        let a = hash_str("city-0");
        let b = hash_str("city-0");
        let c = hash_str("city-1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
