//! Elliptic Curve Traits
//!
//! Defines the common interface for all elliptic curve implementations.

use super::{CurveError, CurveType, ExtendedNode, SeedMaterial};

/// Core trait for elliptic curve operations
pub trait EllipticCurve {
    /// The public key type
    type PublicKey: AsRef<[u8]>;
    /// The signature type
    type Signature: AsRef<[u8]>;

    const CURVE: CurveType;

    /// Derive the public key from a private key
    fn public_key_from_private(private_key: &[u8]) -> Result<Self::PublicKey, CurveError>;

    /// Sign a 32-byte digest with a private key
    fn sign(private_key: &[u8], digest: &[u8]) -> Result<Self::Signature, CurveError>;

    /// Verify a signature. Malformed keys or signatures verify as `false`.
    fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool;
}

/// Extended trait for curves that support recoverable signatures
pub trait RecoverableSignature: EllipticCurve {
    /// Sign with recovery ID (r, s, recid)
    fn sign_recoverable(private_key: &[u8], digest: &[u8]) -> Result<([u8; 64], u8), CurveError>;

    /// Recover public key from signature and digest
    fn recover_public_key(digest: &[u8], signature: &[u8], recovery_id: u8) -> Result<Self::PublicKey, CurveError>;
}

/// Hierarchical derivation over a curve
pub trait KeyDerivation: EllipticCurve {
    /// Root node for the wallet's seed material
    fn master_node(material: &SeedMaterial<'_>) -> Result<ExtendedNode, CurveError>;

    /// Derive one child; `index` carries the hardened bit
    fn derive_child(parent: &ExtendedNode, index: u32) -> Result<ExtendedNode, CurveError>;

    /// Derive along a full path of raw indices
    fn derive_path(material: &SeedMaterial<'_>, path: &[u32]) -> Result<ExtendedNode, CurveError> {
        let mut node = Self::master_node(material)?;
        for index in path {
            node = Self::derive_child(&node, *index)?;
        }
        Ok(node)
    }
}
