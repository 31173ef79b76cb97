//! Multi-Curve Cryptography Support
//!
//! This module provides a unified abstraction for the elliptic curves used by
//! the supported coins:
//!
//! - `secp256k1`: Bitcoin, Litecoin, Ethereum, Binance Chain
//! - `ed25519`: Solana (SLIP-0010)
//! - `ed25519-cardano`: Cardano (Icarus master key, BIP32-Ed25519 children)
//!
//! # Architecture
//!
//! All curves implement the `EllipticCurve` trait which provides:
//! - Public key derivation
//! - Digest signing
//! - Signature verification
//!
//! and `KeyDerivation` for hierarchical derivation from seed material.
//!
//! # Example
//!
//! ```rust,ignore
//! use wallet_compiler::crypto::curves::{CurveType, sign, verify, public_key_from_private};
//!
//! let digest = [0x11u8; 32];
//! let signature = sign(CurveType::Secp256k1, &private_key, &digest)?;
//! let public_key = public_key_from_private(CurveType::Secp256k1, &private_key)?;
//! assert!(verify(CurveType::Secp256k1, &public_key, &digest, &signature));
//! ```

pub mod ed25519;
pub mod ed25519_cardano;
pub mod secp256k1;
pub mod traits;

pub use ed25519::Ed25519Curve;
pub use ed25519_cardano::Ed25519CardanoCurve;
pub use secp256k1::Secp256k1Curve;
pub use traits::*;

use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ErrorCode, WalletError};

/// Bit set on hardened child indices
pub const HARDENED_BIT: u32 = 0x8000_0000;

// MARK: - Curve Type Enum

/// Supported elliptic curve types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveType {
    /// secp256k1 - Bitcoin, Litecoin, Ethereum, Binance
    Secp256k1,
    /// Ed25519 with SLIP-0010 derivation - Solana
    Ed25519,
    /// Ed25519 extended keys (kL || kR) - Cardano
    Ed25519Cardano,
}

impl CurveType {
    /// Get the curve name as a string
    pub fn name(&self) -> &'static str {
        match self {
            Self::Secp256k1 => "secp256k1",
            Self::Ed25519 => "ed25519",
            Self::Ed25519Cardano => "ed25519-cardano",
        }
    }

    /// Get the private key size in bytes
    pub fn private_key_size(&self) -> usize {
        match self {
            Self::Secp256k1 => 32,
            Self::Ed25519 => 32,
            Self::Ed25519Cardano => 64, // kL || kR
        }
    }

    /// Get the public key size in bytes (compressed for secp256k1)
    pub fn public_key_size(&self) -> usize {
        match self {
            Self::Secp256k1 => 33,
            Self::Ed25519 => 32,
            Self::Ed25519Cardano => 32,
        }
    }

    /// Parse curve type from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "secp256k1" => Some(Self::Secp256k1),
            "ed25519" => Some(Self::Ed25519),
            "ed25519-cardano" | "ed25519_cardano" | "ed25519extended" => Some(Self::Ed25519Cardano),
            _ => None,
        }
    }

    /// Whether non-hardened child derivation is possible on this curve
    pub fn supports_soft_derivation(&self) -> bool {
        !matches!(self, Self::Ed25519)
    }
}

impl std::fmt::Display for CurveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

// MARK: - Curve Errors

/// Errors that can occur during curve operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveError {
    InvalidPrivateKey(String),
    InvalidPublicKey(String),
    InvalidSignature(String),
    InvalidSeed(String),
    SigningFailed(String),
    DerivationFailed(String),
}

impl std::fmt::Display for CurveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPrivateKey(s) => write!(f, "Invalid private key: {}", s),
            Self::InvalidPublicKey(s) => write!(f, "Invalid public key: {}", s),
            Self::InvalidSignature(s) => write!(f, "Invalid signature: {}", s),
            Self::InvalidSeed(s) => write!(f, "Invalid seed: {}", s),
            Self::SigningFailed(s) => write!(f, "Signing failed: {}", s),
            Self::DerivationFailed(s) => write!(f, "Key derivation failed: {}", s),
        }
    }
}

impl std::error::Error for CurveError {}

impl From<CurveError> for WalletError {
    fn from(e: CurveError) -> Self {
        let code = match e {
            CurveError::InvalidPrivateKey(_) => ErrorCode::InvalidPrivateKey,
            CurveError::InvalidPublicKey(_) => ErrorCode::InvalidPublicKey,
            CurveError::InvalidSignature(_) | CurveError::SigningFailed(_) => ErrorCode::SigningError,
            CurveError::InvalidSeed(_) | CurveError::DerivationFailed(_) => ErrorCode::Internal,
        };
        WalletError::new(code, e.to_string())
    }
}

// MARK: - Derivation Material

/// Inputs a curve may draw on for its master node.
///
/// secp256k1 and ed25519 start from the BIP-39 seed; the Cardano curve
/// starts from the raw entropy and the passphrase.
#[derive(Clone, Copy)]
pub struct SeedMaterial<'a> {
    pub seed: &'a [u8],
    pub entropy: &'a [u8],
    pub passphrase: &'a str,
}

/// A private node in a derivation tree.
///
/// `key` is 32 bytes for secp256k1 and ed25519, and `kL || kR` (64 bytes)
/// for the Cardano curve.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedNode {
    pub key: Vec<u8>,
    pub chain_code: [u8; 32],
}

impl ExtendedNode {
    pub fn new(key: Vec<u8>, chain_code: [u8; 32]) -> Self {
        Self { key, chain_code }
    }
}

impl std::fmt::Debug for ExtendedNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtendedNode").finish_non_exhaustive()
    }
}

// MARK: - Unified Interface

/// Derive public key from private key
pub fn public_key_from_private(curve: CurveType, private_key: &[u8]) -> Result<Vec<u8>, CurveError> {
    match curve {
        CurveType::Secp256k1 => Ok(Secp256k1Curve::public_key_from_private(private_key)?.to_vec()),
        CurveType::Ed25519 => Ok(Ed25519Curve::public_key_from_private(private_key)?.to_vec()),
        CurveType::Ed25519Cardano => {
            Ok(Ed25519CardanoCurve::public_key_from_private(private_key)?.to_vec())
        }
    }
}

/// Sign a 32-byte digest with the specified curve
pub fn sign(curve: CurveType, private_key: &[u8], digest: &[u8]) -> Result<Vec<u8>, CurveError> {
    match curve {
        CurveType::Secp256k1 => Ok(Secp256k1Curve::sign(private_key, digest)?.to_vec()),
        CurveType::Ed25519 => Ok(Ed25519Curve::sign(private_key, digest)?.to_vec()),
        CurveType::Ed25519Cardano => Ok(Ed25519CardanoCurve::sign(private_key, digest)?.to_vec()),
    }
}

/// Verify a signature with the specified curve
pub fn verify(curve: CurveType, public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
    match curve {
        CurveType::Secp256k1 => Secp256k1Curve::verify(public_key, message, signature),
        CurveType::Ed25519 => Ed25519Curve::verify(public_key, message, signature),
        CurveType::Ed25519Cardano => Ed25519CardanoCurve::verify(public_key, message, signature),
    }
}

/// Derive the node at `path` (raw indices, hardened bit included)
pub fn derive_path(
    curve: CurveType,
    material: &SeedMaterial<'_>,
    path: &[u32],
) -> Result<ExtendedNode, CurveError> {
    match curve {
        CurveType::Secp256k1 => Secp256k1Curve::derive_path(material, path),
        CurveType::Ed25519 => Ed25519Curve::derive_path(material, path),
        CurveType::Ed25519Cardano => Ed25519CardanoCurve::derive_path(material, path),
    }
}

/// Sign a digest and return both signature and public key
pub fn sign_with_pubkey(
    curve: CurveType,
    private_key: &[u8],
    digest: &[u8],
) -> Result<(Vec<u8>, Vec<u8>), CurveError> {
    let signature = sign(curve, private_key, digest)?;
    let public_key = public_key_from_private(curve, private_key)?;
    Ok((signature, public_key))
}

// MARK: - Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_curve_type_properties() {
        assert_eq!(CurveType::Secp256k1.name(), "secp256k1");
        assert_eq!(CurveType::Ed25519.name(), "ed25519");
        assert_eq!(CurveType::Ed25519Cardano.name(), "ed25519-cardano");

        assert_eq!(CurveType::Secp256k1.private_key_size(), 32);
        assert_eq!(CurveType::Ed25519Cardano.private_key_size(), 64);
        assert_eq!(CurveType::Ed25519.public_key_size(), 32);
        assert!(!CurveType::Ed25519.supports_soft_derivation());
    }

    #[test]
    fn test_curve_type_from_str() {
        assert_eq!(CurveType::from_str("secp256k1"), Some(CurveType::Secp256k1));
        assert_eq!(CurveType::from_str("Ed25519"), Some(CurveType::Ed25519));
        assert_eq!(CurveType::from_str("ed25519-cardano"), Some(CurveType::Ed25519Cardano));
        assert_eq!(CurveType::from_str("sr25519"), None);
    }

    #[test]
    fn test_unified_sign_verify() {
        let digest = [0x5au8; 32];
        for curve in [CurveType::Secp256k1, CurveType::Ed25519] {
            let key = [0x46u8; 32];
            let (sig, pubkey) = sign_with_pubkey(curve, &key, &digest).unwrap();
            assert!(verify(curve, &pubkey, &digest, &sig), "{}", curve);
            assert!(!verify(curve, &pubkey, &[0u8; 32], &sig), "{}", curve);
        }
    }

    #[test]
    fn test_curve_error_maps_to_code() {
        let err: WalletError = CurveError::InvalidPrivateKey("zero".into()).into();
        assert_eq!(err.code, ErrorCode::InvalidPrivateKey);
        let err: WalletError = CurveError::SigningFailed("nope".into()).into();
        assert_eq!(err.code, ErrorCode::SigningError);
    }
}
