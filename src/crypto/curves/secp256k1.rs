//! secp256k1 Curve Implementation
//!
//! Used by: Bitcoin, Litecoin, Ethereum, Binance Chain.
//!
//! Features:
//! - ECDSA signing over 32-byte digests, always recoverable
//! - Verification of compact (optionally with recovery byte) and DER signatures
//! - Compressed and uncompressed public keys
//! - BIP-32 key derivation

use super::{
    CurveError, CurveType, EllipticCurve, ExtendedNode, KeyDerivation, RecoverableSignature,
    SeedMaterial, HARDENED_BIT,
};
use bitcoin::secp256k1::ecdsa::{RecoverableSignature as RecovSig, RecoveryId, Signature};
use bitcoin::secp256k1::{Message, PublicKey, Scalar, Secp256k1, SecretKey};
use hmac::{Hmac, Mac};

type HmacSha512 = Hmac<sha2::Sha512>;

/// secp256k1 curve implementation
pub struct Secp256k1Curve;

fn secret_key(private_key: &[u8]) -> Result<SecretKey, CurveError> {
    if private_key.len() != 32 {
        return Err(CurveError::InvalidPrivateKey(
            format!("Private key must be 32 bytes, got {}", private_key.len())
        ));
    }
    SecretKey::from_slice(private_key).map_err(|e| CurveError::InvalidPrivateKey(e.to_string()))
}

fn digest_message(digest: &[u8]) -> Result<Message, CurveError> {
    Message::from_digest_slice(digest)
        .map_err(|_| CurveError::SigningFailed(format!("Digest must be 32 bytes, got {}", digest.len())))
}

impl EllipticCurve for Secp256k1Curve {
    type PublicKey = [u8; 33]; // Compressed
    type Signature = [u8; 65]; // r || s || recovery id

    const CURVE: CurveType = CurveType::Secp256k1;

    fn public_key_from_private(private_key: &[u8]) -> Result<Self::PublicKey, CurveError> {
        let secp = Secp256k1::signing_only();
        let sk = secret_key(private_key)?;
        Ok(PublicKey::from_secret_key(&secp, &sk).serialize())
    }

    fn sign(private_key: &[u8], digest: &[u8]) -> Result<Self::Signature, CurveError> {
        let (compact, recovery_id) = Self::sign_recoverable(private_key, digest)?;
        let mut result = [0u8; 65];
        result[..64].copy_from_slice(&compact);
        result[64] = recovery_id;
        Ok(result)
    }

    /// Accepts r || s with or without a trailing recovery byte. High-S
    /// signatures are normalized before checking.
    fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let compact = match signature.len() {
            64 | 65 => &signature[..64],
            _ => return false,
        };
        let Ok(mut sig) = Signature::from_compact(compact) else {
            return false;
        };
        sig.normalize_s();
        Self::verify_signature(public_key, message, &sig)
    }
}

impl RecoverableSignature for Secp256k1Curve {
    fn sign_recoverable(private_key: &[u8], digest: &[u8]) -> Result<([u8; 64], u8), CurveError> {
        let secp = Secp256k1::signing_only();
        let sk = secret_key(private_key)?;
        let msg = digest_message(digest)?;

        let sig = secp.sign_ecdsa_recoverable(&msg, &sk);
        let (recovery_id, serialized) = sig.serialize_compact();

        Ok((serialized, recovery_id.to_i32() as u8))
    }

    fn recover_public_key(digest: &[u8], signature: &[u8], recovery_id: u8) -> Result<Self::PublicKey, CurveError> {
        if signature.len() != 64 {
            return Err(CurveError::InvalidSignature(
                format!("Signature must be 64 bytes, got {}", signature.len())
            ));
        }

        let secp = Secp256k1::verification_only();
        let rec_id = RecoveryId::from_i32(recovery_id as i32)
            .map_err(|e| CurveError::InvalidSignature(format!("Invalid recovery ID: {}", e)))?;
        let sig = RecovSig::from_compact(signature, rec_id)
            .map_err(|e| CurveError::InvalidSignature(e.to_string()))?;
        let msg = Message::from_digest_slice(digest)
            .map_err(|e| CurveError::InvalidSignature(e.to_string()))?;

        let pk = secp.recover_ecdsa(&msg, &sig)
            .map_err(|e| CurveError::InvalidSignature(format!("Recovery failed: {}", e)))?;

        Ok(pk.serialize())
    }
}

impl KeyDerivation for Secp256k1Curve {
    fn master_node(material: &SeedMaterial<'_>) -> Result<ExtendedNode, CurveError> {
        if material.seed.len() < 16 || material.seed.len() > 64 {
            return Err(CurveError::InvalidSeed(
                format!("Seed must be 16 to 64 bytes, got {}", material.seed.len())
            ));
        }

        let mut mac = HmacSha512::new_from_slice(b"Bitcoin seed")
            .map_err(|e| CurveError::DerivationFailed(e.to_string()))?;
        mac.update(material.seed);
        let result = mac.finalize().into_bytes();

        let (master_key, master_chain_code) = result.split_at(32);
        secret_key(master_key)?;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(master_chain_code);
        Ok(ExtendedNode::new(master_key.to_vec(), chain_code))
    }

    fn derive_child(parent: &ExtendedNode, index: u32) -> Result<ExtendedNode, CurveError> {
        let parent_sk = secret_key(&parent.key)?;

        let mut mac = HmacSha512::new_from_slice(&parent.chain_code)
            .map_err(|e| CurveError::DerivationFailed(e.to_string()))?;

        if index & HARDENED_BIT != 0 {
            // Hardened: 0x00 || private_key || index
            mac.update(&[0x00]);
            mac.update(&parent.key);
        } else {
            // Normal: public_key || index
            let secp = Secp256k1::signing_only();
            let parent_pk = PublicKey::from_secret_key(&secp, &parent_sk);
            mac.update(&parent_pk.serialize());
        }
        mac.update(&index.to_be_bytes());

        let result = mac.finalize().into_bytes();
        let (il, ir) = result.split_at(32);

        // child_key = parse256(IL) + parent_key (mod n)
        let mut tweak_bytes = [0u8; 32];
        tweak_bytes.copy_from_slice(il);
        let tweak = Scalar::from_be_bytes(tweak_bytes)
            .map_err(|_| CurveError::DerivationFailed(format!("Invalid tweak at index {}", index)))?;
        let child_sk = parent_sk.add_tweak(&tweak)
            .map_err(|e| CurveError::DerivationFailed(format!("Tweak failed: {}", e)))?;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(ir);

        Ok(ExtendedNode::new(child_sk.secret_bytes().to_vec(), chain_code))
    }
}

// MARK: - Helper Functions

impl Secp256k1Curve {
    /// Get uncompressed public key (65 bytes)
    pub fn public_key_uncompressed(private_key: &[u8]) -> Result<[u8; 65], CurveError> {
        let secp = Secp256k1::signing_only();
        let sk = secret_key(private_key)?;
        Ok(PublicKey::from_secret_key(&secp, &sk).serialize_uncompressed())
    }

    /// Re-encode a compressed or uncompressed public key in uncompressed form
    pub fn decompress(public_key: &[u8]) -> Result<[u8; 65], CurveError> {
        let pk = PublicKey::from_slice(public_key)
            .map_err(|e| CurveError::InvalidPublicKey(e.to_string()))?;
        Ok(pk.serialize_uncompressed())
    }

    /// Re-encode a public key in compressed form
    pub fn compress(public_key: &[u8]) -> Result<[u8; 33], CurveError> {
        let pk = PublicKey::from_slice(public_key)
            .map_err(|e| CurveError::InvalidPublicKey(e.to_string()))?;
        Ok(pk.serialize())
    }

    /// Sign a digest and return the DER encoding (low-S)
    pub fn sign_der(private_key: &[u8], digest: &[u8]) -> Result<Vec<u8>, CurveError> {
        let secp = Secp256k1::signing_only();
        let sk = secret_key(private_key)?;
        let msg = digest_message(digest)?;
        Ok(secp.sign_ecdsa(&msg, &sk).serialize_der().to_vec())
    }

    /// Verify a strict-DER signature over a 32-byte digest
    pub fn verify_der(public_key: &[u8], message: &[u8], der: &[u8]) -> bool {
        let Ok(mut sig) = Signature::from_der(der) else {
            return false;
        };
        sig.normalize_s();
        Self::verify_signature(public_key, message, &sig)
    }

    /// Encode a compact signature in DER format
    pub fn signature_to_der(signature: &[u8]) -> Result<Vec<u8>, CurveError> {
        if signature.len() != 64 && signature.len() != 65 {
            return Err(CurveError::InvalidSignature(
                format!("Signature must be 64 or 65 bytes, got {}", signature.len())
            ));
        }
        let sig = Signature::from_compact(&signature[..64])
            .map_err(|e| CurveError::InvalidSignature(e.to_string()))?;
        Ok(sig.serialize_der().to_vec())
    }

    /// Decode signature from DER format
    pub fn signature_from_der(der: &[u8]) -> Result<[u8; 64], CurveError> {
        let sig = Signature::from_der(der)
            .map_err(|e| CurveError::InvalidSignature(e.to_string()))?;
        Ok(sig.serialize_compact())
    }

    /// Rewrite r || s with s in the lower half of the order.
    /// The flag reports whether s was negated, which flips the recovery id.
    pub fn normalize_compact(signature: &[u8]) -> Result<([u8; 64], bool), CurveError> {
        let mut sig = Signature::from_compact(signature)
            .map_err(|e| CurveError::InvalidSignature(e.to_string()))?;
        let original = sig.serialize_compact();
        sig.normalize_s();
        let normalized = sig.serialize_compact();
        Ok((normalized, normalized != original))
    }

    /// Re-encode a DER signature with low S
    pub fn normalize_der(der: &[u8]) -> Result<Vec<u8>, CurveError> {
        let mut sig = Signature::from_der(der)
            .map_err(|e| CurveError::InvalidSignature(e.to_string()))?;
        sig.normalize_s();
        Ok(sig.serialize_der().to_vec())
    }

    fn verify_signature(public_key: &[u8], message: &[u8], sig: &Signature) -> bool {
        let Ok(pk) = PublicKey::from_slice(public_key) else {
            return false;
        };
        let Ok(msg) = Message::from_digest_slice(message) else {
            return false;
        };
        Secp256k1::verification_only().verify_ecdsa(&msg, sig, &pk).is_ok()
    }
}

// MARK: - Tests

#[cfg(test)]
mod tests {
    use super::*;

    const KEY0: [u8; 32] = [0x46; 32];

    #[test]
    fn test_secp256k1_public_key() {
        let pk = Secp256k1Curve::public_key_from_private(&KEY0).unwrap();
        assert_eq!(
            hex::encode(pk),
            "024bc2a31265153f07e70e0bab08724e6b85e217f8cd628ceb62974247bb493382"
        );

        let uncompressed = Secp256k1Curve::public_key_uncompressed(&KEY0).unwrap();
        assert_eq!(uncompressed[0], 0x04);
        assert_eq!(Secp256k1Curve::compress(&uncompressed).unwrap(), pk);
    }

    #[test]
    fn test_secp256k1_sign_verify() {
        let pk = Secp256k1Curve::public_key_from_private(&KEY0).unwrap();

        let digest = [0xABu8; 32];
        let signature = Secp256k1Curve::sign(&KEY0, &digest).unwrap();
        assert_eq!(signature.len(), 65);
        assert!(signature[64] < 4);

        assert!(Secp256k1Curve::verify(&pk, &digest, &signature));
        assert!(Secp256k1Curve::verify(&pk, &digest, &signature[..64]));

        let wrong = [0xACu8; 32];
        assert!(!Secp256k1Curve::verify(&pk, &wrong, &signature));
        assert!(!Secp256k1Curve::verify(&pk, &digest, &signature[..63]));
        assert!(!Secp256k1Curve::verify(&pk[..32], &digest, &signature));
    }

    #[test]
    fn test_secp256k1_rejects_non_digest() {
        assert!(Secp256k1Curve::sign(&KEY0, b"not a digest").is_err());
    }

    #[test]
    fn test_secp256k1_recoverable_signature() {
        let pk = Secp256k1Curve::public_key_from_private(&KEY0).unwrap();

        let digest = [0xABu8; 32];
        let (signature, recovery_id) = Secp256k1Curve::sign_recoverable(&KEY0, &digest).unwrap();

        let recovered = Secp256k1Curve::recover_public_key(&digest, &signature, recovery_id).unwrap();
        assert_eq!(pk, recovered);
    }

    #[test]
    fn test_secp256k1_bip32_vector() {
        // BIP-32 test vector 1, chain m/0'/1
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        let material = SeedMaterial { seed: &seed, entropy: &[], passphrase: "" };

        let master = Secp256k1Curve::master_node(&material).unwrap();
        assert_eq!(
            hex::encode(&master.key),
            "e8f32e723decf4051aefac8e2c93c9c5b214313817cdb01a1494b917c8436b35"
        );

        let child = Secp256k1Curve::derive_path(&material, &[HARDENED_BIT, 1]).unwrap();
        assert_eq!(
            hex::encode(&child.key),
            "3c6cb8d0f6a264c91ea8b5030fadaa8e538b020f0a387421a12de9319dc93368"
        );
    }

    #[test]
    fn test_secp256k1_der_encoding() {
        let pk = Secp256k1Curve::public_key_from_private(&KEY0).unwrap();
        let digest = [0x01u8; 32];

        let signature = Secp256k1Curve::sign(&KEY0, &digest).unwrap();
        let der = Secp256k1Curve::signature_to_der(&signature).unwrap();
        assert_eq!(der[0], 0x30);
        assert_eq!(Secp256k1Curve::signature_from_der(&der).unwrap()[..], signature[..64]);

        assert!(Secp256k1Curve::verify_der(&pk, &digest, &der));
        assert!(Secp256k1Curve::verify_der(&pk, &digest, &Secp256k1Curve::sign_der(&KEY0, &digest).unwrap()));
        assert!(!Secp256k1Curve::verify_der(&pk, &digest, &der[1..]));
    }

    #[test]
    fn test_secp256k1_normalize_high_s() {
        let signature = Secp256k1Curve::sign(&KEY0, &[0x02u8; 32]).unwrap();
        let (same, flipped) = Secp256k1Curve::normalize_compact(&signature[..64]).unwrap();
        assert!(!flipped);
        assert_eq!(same[..], signature[..64]);

        let mut sig = Signature::from_compact(&signature[..64]).unwrap();
        let low_der = sig.serialize_der().to_vec();
        // s -> n - s
        let s = SecretKey::from_slice(&signature[32..64]).unwrap().negate();
        let mut high = [0u8; 64];
        high[..32].copy_from_slice(&signature[..32]);
        high[32..].copy_from_slice(&s.secret_bytes());
        let (normalized, flipped) = Secp256k1Curve::normalize_compact(&high).unwrap();
        assert!(flipped);
        assert_eq!(normalized[..], signature[..64]);

        sig = Signature::from_compact(&high).unwrap();
        let high_der = sig.serialize_der().to_vec();
        assert_ne!(high_der, low_der);
        assert_eq!(Secp256k1Curve::normalize_der(&high_der).unwrap(), low_der);
        assert!(Secp256k1Curve::normalize_compact(&[0u8; 10]).is_err());
    }
}
