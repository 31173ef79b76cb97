//! Curve-tagged key values
//!
//! [`PrivateKey`] zeroes its bytes on drop and never prints them.
//! [`PublicKey`] carries a [`PublicKeyType`] so verification can pick the
//! right curve and encoding without extra context.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::curves::{self, CurveType, Ed25519CardanoCurve, EllipticCurve, Secp256k1Curve};
use crate::error::{ErrorCode, WalletError, WalletResult};
use crate::utils::crypto::hash160;

/// Encoding of a public key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicKeyType {
    /// 33-byte compressed SEC1
    Secp256k1,
    /// 65-byte uncompressed SEC1
    Secp256k1Extended,
    Ed25519,
    /// 32-byte key, optionally followed by the 32-byte chain code
    Ed25519Cardano,
}

impl PublicKeyType {
    pub fn curve(&self) -> CurveType {
        match self {
            Self::Secp256k1 | Self::Secp256k1Extended => CurveType::Secp256k1,
            Self::Ed25519 => CurveType::Ed25519,
            Self::Ed25519Cardano => CurveType::Ed25519Cardano,
        }
    }

    fn accepts_len(&self, len: usize) -> bool {
        match self {
            Self::Secp256k1 => len == 33,
            Self::Secp256k1Extended => len == 65,
            Self::Ed25519 => len == 32,
            Self::Ed25519Cardano => len == 32 || len == 64,
        }
    }
}

// MARK: - Private Key

/// A private key bound to its curve
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey {
    bytes: Vec<u8>,
    #[zeroize(skip)]
    curve: CurveType,
}

impl PrivateKey {
    /// Wrap raw key bytes, rejecting sizes and values invalid on `curve`
    pub fn new(bytes: &[u8], curve: CurveType) -> WalletResult<Self> {
        if bytes.len() != curve.private_key_size() {
            return Err(WalletError::invalid_private_key(format!(
                "{} private key must be {} bytes, got {}",
                curve,
                curve.private_key_size(),
                bytes.len()
            )));
        }
        // rejects zero and out-of-range secp256k1 scalars
        curves::public_key_from_private(curve, bytes)?;

        Ok(Self {
            bytes: bytes.to_vec(),
            curve,
        })
    }

    pub fn from_hex(hex_key: &str, curve: CurveType) -> WalletResult<Self> {
        let bytes = zeroize::Zeroizing::new(
            hex::decode(hex_key.trim_start_matches("0x"))
                .map_err(|e| WalletError::invalid_private_key(format!("invalid hex: {}", e)))?,
        );
        Self::new(&bytes, curve)
    }

    pub fn curve(&self) -> CurveType {
        self.curve
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Public key in the curve's default encoding
    pub fn public_key(&self) -> WalletResult<PublicKey> {
        let key_type = match self.curve {
            CurveType::Secp256k1 => PublicKeyType::Secp256k1,
            CurveType::Ed25519 => PublicKeyType::Ed25519,
            CurveType::Ed25519Cardano => PublicKeyType::Ed25519Cardano,
        };
        self.public_key_with_type(key_type)
    }

    pub fn public_key_with_type(&self, key_type: PublicKeyType) -> WalletResult<PublicKey> {
        if key_type.curve() != self.curve {
            return Err(WalletError::new(
                ErrorCode::InvalidPublicKey,
                format!("{:?} public key cannot come from a {} private key", key_type, self.curve),
            ));
        }
        let bytes = match key_type {
            PublicKeyType::Secp256k1Extended => Secp256k1Curve::public_key_uncompressed(&self.bytes)?.to_vec(),
            _ => curves::public_key_from_private(self.curve, &self.bytes)?,
        };
        Ok(PublicKey { bytes, key_type })
    }

    /// Sign a 32-byte digest.
    ///
    /// secp256k1 yields `r || s || recid` (65 bytes); the ed25519 curves
    /// yield 64 bytes.
    pub fn sign(&self, digest: &[u8]) -> WalletResult<Vec<u8>> {
        if digest.len() != 32 {
            return Err(WalletError::signing_failed(format!(
                "digest must be 32 bytes, got {}",
                digest.len()
            )));
        }
        Ok(curves::sign(self.curve, &self.bytes, digest)?)
    }

    /// Sign a 32-byte digest and return a DER-encoded ECDSA signature
    pub fn sign_as_der(&self, digest: &[u8]) -> WalletResult<Vec<u8>> {
        match self.curve {
            CurveType::Secp256k1 => Ok(Secp256k1Curve::sign_der(&self.bytes, digest)?),
            other => Err(WalletError::signing_failed(format!(
                "DER signatures are not defined for {}",
                other
            ))),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKey")
            .field("curve", &self.curve)
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        use subtle::ConstantTimeEq;
        self.curve == other.curve && bool::from(self.bytes.ct_eq(&other.bytes))
    }
}

impl Eq for PrivateKey {}

// MARK: - Public Key

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicKey {
    bytes: Vec<u8>,
    key_type: PublicKeyType,
}

impl PublicKey {
    pub fn new(bytes: &[u8], key_type: PublicKeyType) -> WalletResult<Self> {
        if !Self::is_valid(bytes, key_type) {
            return Err(WalletError::new(
                ErrorCode::InvalidPublicKey,
                format!("invalid {:?} public key of {} bytes", key_type, bytes.len()),
            ));
        }
        Ok(Self {
            bytes: bytes.to_vec(),
            key_type,
        })
    }

    /// Length and point-encoding check
    pub fn is_valid(bytes: &[u8], key_type: PublicKeyType) -> bool {
        if !key_type.accepts_len(bytes.len()) {
            return false;
        }
        match key_type.curve() {
            CurveType::Secp256k1 => bitcoin::secp256k1::PublicKey::from_slice(bytes).is_ok(),
            CurveType::Ed25519 | CurveType::Ed25519Cardano => {
                let mut point = [0u8; 32];
                point.copy_from_slice(&bytes[..32]);
                ed25519_dalek::VerifyingKey::from_bytes(&point).is_ok()
            }
        }
    }

    pub fn key_type(&self) -> PublicKeyType {
        self.key_type
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }

    /// Same key in 33-byte compressed form (secp256k1 only)
    pub fn compressed(&self) -> WalletResult<PublicKey> {
        match self.key_type {
            PublicKeyType::Secp256k1 => Ok(self.clone()),
            PublicKeyType::Secp256k1Extended => Ok(PublicKey {
                bytes: Secp256k1Curve::compress(&self.bytes)?.to_vec(),
                key_type: PublicKeyType::Secp256k1,
            }),
            other => Err(WalletError::new(
                ErrorCode::InvalidPublicKey,
                format!("{:?} keys have no compressed form", other),
            )),
        }
    }

    /// Same key in 65-byte uncompressed form (secp256k1 only)
    pub fn extended(&self) -> WalletResult<PublicKey> {
        match self.key_type {
            PublicKeyType::Secp256k1Extended => Ok(self.clone()),
            PublicKeyType::Secp256k1 => Ok(PublicKey {
                bytes: Secp256k1Curve::decompress(&self.bytes)?.to_vec(),
                key_type: PublicKeyType::Secp256k1Extended,
            }),
            other => Err(WalletError::new(
                ErrorCode::InvalidPublicKey,
                format!("{:?} keys have no extended form", other),
            )),
        }
    }

    /// HASH160 of the key bytes as stored
    pub fn hash160(&self) -> [u8; 20] {
        hash160(&self.bytes)
    }

    /// The 32-byte key without a trailing Cardano chain code
    pub fn key_bytes(&self) -> &[u8] {
        match self.key_type {
            PublicKeyType::Ed25519Cardano => &self.bytes[..32],
            _ => &self.bytes,
        }
    }

    /// Verify a raw signature over `message` (a 32-byte digest for secp256k1)
    pub fn verify(&self, signature: &[u8], message: &[u8]) -> bool {
        verify(&self.bytes, self.key_type, signature, message)
    }

    pub fn verify_as_der(&self, signature: &[u8], message: &[u8]) -> bool {
        verify_as_der(&self.bytes, self.key_type, signature, message)
    }
}

// MARK: - Verification

/// Verify a raw signature. Never fails; malformed input verifies as false.
///
/// secp256k1 signatures are `r || s` with an optional trailing recovery
/// byte. Ed25519 signatures are 64 bytes.
pub fn verify(public_key: &[u8], key_type: PublicKeyType, signature: &[u8], message: &[u8]) -> bool {
    if !key_type.accepts_len(public_key.len()) {
        return false;
    }
    match key_type {
        PublicKeyType::Ed25519Cardano => Ed25519CardanoCurve::verify(public_key, message, signature),
        _ => curves::verify(key_type.curve(), public_key, message, signature),
    }
}

/// Verify a DER-encoded ECDSA signature (secp256k1 only)
pub fn verify_as_der(public_key: &[u8], key_type: PublicKeyType, signature: &[u8], message: &[u8]) -> bool {
    if key_type.curve() != CurveType::Secp256k1 || !key_type.accepts_len(public_key.len()) {
        return false;
    }
    Secp256k1Curve::verify_der(public_key, message, signature)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY0: &str = "4646464646464646464646464646464646464646464646464646464646464646";

    #[test]
    fn test_private_key_validation() {
        assert!(PrivateKey::new(&[0u8; 32], CurveType::Secp256k1).is_err());
        assert!(PrivateKey::new(&[1u8; 31], CurveType::Secp256k1).is_err());
        assert!(PrivateKey::new(&[1u8; 32], CurveType::Ed25519Cardano).is_err());
        assert!(PrivateKey::new(&[1u8; 64], CurveType::Ed25519Cardano).is_ok());

        let err = PrivateKey::from_hex("zz", CurveType::Secp256k1).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidPrivateKey);
    }

    #[test]
    fn test_debug_redacts() {
        let key = PrivateKey::from_hex(KEY0, CurveType::Secp256k1).unwrap();
        let printed = format!("{:?}", key);
        assert!(!printed.contains("4646"));
        assert!(printed.contains("REDACTED"));
    }

    #[test]
    fn test_public_key_forms() {
        let key = PrivateKey::from_hex(KEY0, CurveType::Secp256k1).unwrap();
        let compressed = key.public_key().unwrap();
        assert_eq!(
            compressed.to_hex(),
            "024bc2a31265153f07e70e0bab08724e6b85e217f8cd628ceb62974247bb493382"
        );

        let extended = key.public_key_with_type(PublicKeyType::Secp256k1Extended).unwrap();
        assert_eq!(
            extended.to_hex(),
            "044bc2a31265153f07e70e0bab08724e6b85e217f8cd628ceb62974247bb493382\
             ce28cab79ad7119ee1ad3ebcdb98a16805211530ecc6cfefa1b88e6dff99232a"
        );
        assert_eq!(extended.compressed().unwrap(), compressed);
        assert_eq!(compressed.extended().unwrap(), extended);
        assert_eq!(hex::encode(compressed.hash160()), "bd92088bb7e82d611a9b94fbb74a0908152b784f");

        assert!(key.public_key_with_type(PublicKeyType::Ed25519).is_err());
    }

    #[test]
    fn test_sign_and_verify_each_form() {
        let key = PrivateKey::from_hex(KEY0, CurveType::Secp256k1).unwrap();
        let digest = [0x33u8; 32];

        let raw = key.sign(&digest).unwrap();
        assert_eq!(raw.len(), 65);
        let der = key.sign_as_der(&digest).unwrap();

        for public_key in [
            key.public_key().unwrap(),
            key.public_key_with_type(PublicKeyType::Secp256k1Extended).unwrap(),
        ] {
            assert!(public_key.verify(&raw, &digest));
            assert!(public_key.verify(&raw[..64], &digest));
            assert!(public_key.verify_as_der(&der, &digest));
            assert!(!public_key.verify_as_der(&raw, &digest));
            assert!(!public_key.verify(&raw, &[0x34u8; 32]));
        }
    }

    #[test]
    fn test_ethereum_fixture_signature_verifies() {
        let public_key = hex::decode(
            "044bc2a31265153f07e70e0bab08724e6b85e217f8cd628ceb62974247bb493382\
             ce28cab79ad7119ee1ad3ebcdb98a16805211530ecc6cfefa1b88e6dff99232a",
        )
        .unwrap();
        let signature = hex::decode(
            "360a84fb41ad07f07c845fedc34cde728421803ebbaae392fc39c116b29fc07b\
             53bd9d1376e15a191d844db458893b928f3efbfee90c9febf51ab84c9796677900",
        )
        .unwrap();
        let digest = hex::decode("15e180a6274b2f6a572b9b51823fce25ef39576d10188ecdcd7de44526c47217").unwrap();

        assert!(verify(&public_key, PublicKeyType::Secp256k1Extended, &signature, &digest));
        assert!(!verify(&public_key, PublicKeyType::Secp256k1, &signature, &digest));
    }

    #[test]
    fn test_verify_is_total() {
        assert!(!verify(&[], PublicKeyType::Secp256k1, &[], &[]));
        assert!(!verify(&[1u8; 31], PublicKeyType::Ed25519, &[0u8; 64], b"m"));
        assert!(!verify_as_der(&[0u8; 32], PublicKeyType::Ed25519, &[0x30], &[0u8; 32]));
        assert!(!PublicKey::is_valid(&[0u8; 33], PublicKeyType::Secp256k1));
    }

    #[test]
    fn test_ed25519_keys() {
        let key = PrivateKey::new(&[7u8; 32], CurveType::Ed25519).unwrap();
        let public_key = key.public_key().unwrap();
        let message = [9u8; 32];
        let signature = key.sign(&message).unwrap();
        assert_eq!(signature.len(), 64);
        assert!(public_key.verify(&signature, &message));
        assert!(key.sign_as_der(&message).is_err());
    }
}
