//! Fixed-size byte arrays serialized as lowercase hex strings.
//!
//! Used for keys, signatures and content ids so that JSON dumps stay
//! readable and bincode frames stay self-describing enough to debug.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serializer};

pub fn serialize<S: Serializer, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(bytes))
}

pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error> {
    let s = String::deserialize(deserializer)?;
    decode_fixed(&s).ok_or_else(|| D::Error::custom(format!("expected {N} hex-encoded bytes")))
}

/// Decode a hex string into exactly `N` bytes.
pub fn decode_fixed<const N: usize>(s: &str) -> Option<[u8; N]> {
    let raw = hex::decode(s).ok()?;
    raw.try_into().ok()
}
