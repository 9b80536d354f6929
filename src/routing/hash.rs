use sha2::{Digest, Sha256};

/// Hash function placing keys and virtual positions on the ring.
///
/// Implementations must be deterministic across processes: two routers
/// configured alike must agree on every key.
pub trait RoutingHash: Send + Sync + 'static {
    fn hash_bytes(&self, bytes: &[u8]) -> u64;
}

/// Default hash: the first 8 bytes of SHA-256, big-endian.
///
/// Stable across platforms and toolchain versions (unlike `DefaultHasher`).
#[derive(Clone, Copy, Debug, Default)]
pub struct Sha256Hash;

impl RoutingHash for Sha256Hash {
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        let digest = Sha256::digest(bytes);
        let mut head = [0u8; 8];
        head.copy_from_slice(&digest[..8]);
        u64::from_be_bytes(head)
    }
}

impl<F> RoutingHash for F
where
    F: Fn(&[u8]) -> u64 + Send + Sync + 'static,
{
    fn hash_bytes(&self, bytes: &[u8]) -> u64 {
        self(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hash_is_stable() {
        // sha256("") = e3b0c442 98fc1c14 ...
        assert_eq!(Sha256Hash.hash_bytes(b""), 0xe3b0_c442_98fc_1c14);
        assert_eq!(Sha256Hash.hash_bytes(b"d1"), Sha256Hash.hash_bytes(b"d1"));
        assert_ne!(Sha256Hash.hash_bytes(b"d1"), Sha256Hash.hash_bytes(b"d2"));
    }

    #[test]
    fn test_closure_is_a_routing_hash() {
        let h = |b: &[u8]| b.len() as u64;
        assert_eq!(h.hash_bytes(b"abc"), 3);
    }
}
