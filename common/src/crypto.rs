//! Blake2b digests used for key hashes and transaction ids

use crate::hash::{Hash, KeyHash, TxHash};
use cryptoxide::hashing::blake2b::Blake2b;

/// Blake2b-224, the digest behind payment key hashes
pub fn blake2b_224(data: &[u8]) -> KeyHash {
    let mut context = Blake2b::<224>::new();
    context.update_mut(data);
    let mut out = [0u8; 28];
    out.copy_from_slice(context.finalize().as_slice());
    Hash::new(out)
}

/// Blake2b-256, the digest behind transaction ids
pub fn blake2b_256(data: &[u8]) -> TxHash {
    let mut context = Blake2b::<256>::new();
    context.update_mut(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(context.finalize().as_slice());
    Hash::new(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blake2b_256_of_empty_input() {
        assert_eq!(
            blake2b_256(&[]).to_string(),
            "0e5751c026e543b2e8ab2eb06099daa1d1e5df47778f7787faab45cdf12fe3a8"
        );
    }

    #[test]
    fn blake2b_224_of_empty_input() {
        assert_eq!(
            blake2b_224(&[]).to_string(),
            "836cc68931c2e4e3e838602eca1902591d216837bafddfe6f0c8cb07"
        );
    }
}
