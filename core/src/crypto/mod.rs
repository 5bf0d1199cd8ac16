pub mod hash;

use num_bigint::BigUint;

pub use hash::{HashError, HashPrimitive, Sha256Hasher};

pub fn to_hex(data: &[u8]) -> String {
    hex::encode(data)
}

// Helper to parse hex string to bytes, accepting an optional 0x prefix
pub fn from_hex(s: &str) -> Option<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).ok()
}

/// Encode `value` as a big-endian integer exactly `len` bytes wide.
///
/// Returns `None` when the value needs more than `len` bytes.
pub fn encode_big_endian(value: &BigUint, len: usize) -> Option<Vec<u8>> {
    let bytes = value.to_bytes_be();
    // to_bytes_be() yields [0] for zero
    let significant = match bytes.iter().position(|b| *b != 0) {
        Some(first) => &bytes[first..],
        None => &[][..],
    };
    if significant.len() > len {
        return None;
    }
    let mut out = vec![0u8; len];
    out[len - significant.len()..].copy_from_slice(significant);
    Some(out)
}

/// True if `s` is a 32-byte id in hex, with or without `0x`.
pub fn is_bytes32_hex(s: &str) -> bool {
    matches!(from_hex(s), Some(bytes) if bytes.len() == 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_big_endian_pads_left() {
        let out = encode_big_endian(&BigUint::from(5u32), 4).unwrap();
        assert_eq!(out, vec![0, 0, 0, 5]);

        let out = encode_big_endian(&BigUint::from(0x0102_0304u32), 4).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_encode_big_endian_zero() {
        let out = encode_big_endian(&BigUint::from(0u32), 32).unwrap();
        assert_eq!(out, vec![0u8; 32]);
        assert_eq!(encode_big_endian(&BigUint::from(0u32), 0).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_encode_big_endian_overflow() {
        assert!(encode_big_endian(&BigUint::from(u32::MAX as u64 + 1), 4).is_none());
        assert!(encode_big_endian(&BigUint::from(256u32), 1).is_none());
    }

    #[test]
    fn test_hex_helpers() {
        assert_eq!(to_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
        assert_eq!(from_hex("0xdeadbeef").unwrap(), vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(from_hex("abc").is_none());
        assert!(from_hex("zz").is_none());
    }

    #[test]
    fn test_is_bytes32_hex() {
        let id = "11".repeat(32);
        assert!(is_bytes32_hex(&id));
        assert!(is_bytes32_hex(&format!("0x{}", id)));
        assert!(!is_bytes32_hex("1234"));
        assert!(!is_bytes32_hex(&"g1".repeat(32)));
    }
}
