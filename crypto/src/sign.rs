//! Ed25519 signing and verification.
//!
//! Verification never fails loudly: any malformed key or signature
//! simply does not verify.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use crate::CryptoError;
use rumorality_types::{PrivateKey, PublicKey, Signature};

pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(message).to_bytes())
}

/// `true` only for a valid signature by `public_key` over `message`.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify_strict(message, &sig).is_ok()
}

/// Verification over hex-encoded signature and key, as they travel in
/// presentation payloads. Undecodable input yields `false`.
pub fn verify_hex(message: &[u8], signature_hex: &str, public_key_hex: &str) -> bool {
    match (
        Signature::from_hex(signature_hex),
        PublicKey::from_hex(public_key_hex),
    ) {
        (Some(sig), Some(key)) => verify_signature(message, &sig, &key),
        _ => false,
    }
}

/// Parse a hex public key, rejecting bytes that are not a curve point.
pub fn decode_public_key(hex_key: &str) -> Result<PublicKey, CryptoError> {
    let key = PublicKey::from_hex(hex_key)
        .ok_or_else(|| CryptoError::MalformedPublicKey(hex_key.to_string()))?;
    VerifyingKey::from_bytes(&key.0)
        .map_err(|e| CryptoError::MalformedPublicKey(e.to_string()))?;
    Ok(key)
}

pub fn decode_signature(hex_sig: &str) -> Result<Signature, CryptoError> {
    Signature::from_hex(hex_sig).ok_or_else(|| CryptoError::MalformedSignature(hex_sig.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::{generate_keypair, keypair_from_seed};

    #[test]
    fn sign_and_verify() {
        let kp = generate_keypair();
        let sig = sign_message(b"the bridge is closed", &kp.private);
        assert!(verify_signature(b"the bridge is closed", &sig, &kp.public));
        assert!(!verify_signature(b"the bridge is open", &sig, &kp.public));
    }

    #[test]
    fn foreign_key_does_not_verify() {
        let a = keypair_from_seed(&[1u8; 32]);
        let b = keypair_from_seed(&[2u8; 32]);
        let sig = sign_message(b"msg", &a.private);
        assert!(!verify_signature(b"msg", &sig, &b.public));
    }

    #[test]
    fn garbage_never_panics() {
        assert!(!verify_signature(b"msg", &Signature([0u8; 64]), &PublicKey([0xFF; 32])));
        assert!(!verify_hex(b"msg", "zz", "not-hex"));
        assert!(!verify_hex(b"msg", "", ""));
    }

    #[test]
    fn decode_rejects_bad_hex() {
        assert!(matches!(decode_public_key("xyz"), Err(CryptoError::MalformedPublicKey(_))));
        assert!(matches!(decode_signature("00"), Err(CryptoError::MalformedSignature(_))));
        let kp = keypair_from_seed(&[4u8; 32]);
        assert_eq!(decode_public_key(&kp.public.to_hex()).unwrap(), kp.public);
    }

    #[test]
    fn hex_path_matches_binary_path() {
        let kp = keypair_from_seed(&[3u8; 32]);
        let sig = sign_message(b"msg", &kp.private);
        assert!(verify_hex(b"msg", &sig.to_hex(), &kp.public.to_hex()));
    }
}
