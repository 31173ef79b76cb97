//! Cryptographic primitives
//!
//! - Multi-curve abstractions (secp256k1, ed25519, Cardano extended ed25519)
//! - Curve-tagged private and public keys with verification

pub mod curves;
pub mod keys;

pub use curves::{
    CurveType, CurveError, ExtendedNode, SeedMaterial,
    Secp256k1Curve, Ed25519Curve, Ed25519CardanoCurve,
    EllipticCurve, RecoverableSignature, KeyDerivation,
};
pub use keys::{verify, verify_as_der, PrivateKey, PublicKey, PublicKeyType};
