//! Ed25519 Curve Implementation
//!
//! Used by: Solana.
//!
//! Features:
//! - EdDSA signing and verification (RFC 8032)
//! - SLIP-0010 key derivation (hardened only)
//! - Solana Base58 address encoding

use super::{CurveError, CurveType, EllipticCurve, ExtendedNode, KeyDerivation, SeedMaterial, HARDENED_BIT};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};

type HmacSha512 = Hmac<sha2::Sha512>;

/// Ed25519 curve implementation
pub struct Ed25519Curve;

fn signing_key(private_key: &[u8]) -> Result<SigningKey, CurveError> {
    let sk_bytes: [u8; 32] = private_key.try_into().map_err(|_| {
        CurveError::InvalidPrivateKey(format!("Private key must be 32 bytes, got {}", private_key.len()))
    })?;
    Ok(SigningKey::from_bytes(&sk_bytes))
}

impl EllipticCurve for Ed25519Curve {
    type PublicKey = [u8; 32];
    type Signature = [u8; 64];

    const CURVE: CurveType = CurveType::Ed25519;

    fn public_key_from_private(private_key: &[u8]) -> Result<Self::PublicKey, CurveError> {
        Ok(signing_key(private_key)?.verifying_key().to_bytes())
    }

    fn sign(private_key: &[u8], message: &[u8]) -> Result<Self::Signature, CurveError> {
        Ok(signing_key(private_key)?.sign(message).to_bytes())
    }

    fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        let Ok(pk_bytes) = <[u8; 32]>::try_from(public_key) else {
            return false;
        };
        let Ok(sig_bytes) = <[u8; 64]>::try_from(signature) else {
            return false;
        };
        let Ok(verifying_key) = VerifyingKey::from_bytes(&pk_bytes) else {
            return false;
        };

        verifying_key.verify(message, &Signature::from_bytes(&sig_bytes)).is_ok()
    }
}

impl KeyDerivation for Ed25519Curve {
    fn master_node(material: &SeedMaterial<'_>) -> Result<ExtendedNode, CurveError> {
        if material.seed.is_empty() {
            return Err(CurveError::InvalidSeed("Seed must not be empty".into()));
        }

        let mut mac = HmacSha512::new_from_slice(b"ed25519 seed")
            .map_err(|e| CurveError::DerivationFailed(e.to_string()))?;
        mac.update(material.seed);
        let result = mac.finalize().into_bytes();

        let (master_key, master_chain_code) = result.split_at(32);
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(master_chain_code);

        Ok(ExtendedNode::new(master_key.to_vec(), chain_code))
    }

    fn derive_child(parent: &ExtendedNode, index: u32) -> Result<ExtendedNode, CurveError> {
        // SLIP-0010 defines no public derivation for ed25519
        if index & HARDENED_BIT == 0 {
            return Err(CurveError::DerivationFailed(format!(
                "ed25519 only supports hardened derivation, got index {}",
                index
            )));
        }
        if parent.key.len() != 32 {
            return Err(CurveError::InvalidPrivateKey("Parent key must be 32 bytes".into()));
        }

        let mut mac = HmacSha512::new_from_slice(&parent.chain_code)
            .map_err(|e| CurveError::DerivationFailed(e.to_string()))?;

        // SLIP-0010: 0x00 || private_key || index
        mac.update(&[0x00]);
        mac.update(&parent.key);
        mac.update(&index.to_be_bytes());

        let result = mac.finalize().into_bytes();
        let (child_key, child_chain) = result.split_at(32);

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(child_chain);

        Ok(ExtendedNode::new(child_key.to_vec(), chain_code))
    }
}

// MARK: - Helper Functions

impl Ed25519Curve {
    /// Derive Solana address from public key (Base58)
    pub fn to_solana_address(public_key: &[u8; 32]) -> String {
        bs58::encode(public_key).into_string()
    }

    /// Decode a Solana address back to its 32-byte public key
    pub fn from_solana_address(address: &str) -> Result<[u8; 32], CurveError> {
        let bytes = bs58::decode(address)
            .into_vec()
            .map_err(|e| CurveError::InvalidPublicKey(e.to_string()))?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|_| CurveError::InvalidPublicKey(format!("Expected 32 bytes, got {}", bytes.len())))
    }
}

// MARK: - Tests

#[cfg(test)]
mod tests {
    use super::*;

    fn slip10_seed() -> Vec<u8> {
        hex::decode("000102030405060708090a0b0c0d0e0f").unwrap()
    }

    #[test]
    fn test_ed25519_sign_verify() {
        let sk = [42u8; 32];
        let pk = Ed25519Curve::public_key_from_private(&sk).unwrap();

        let message = [0x11u8; 32];
        let signature = Ed25519Curve::sign(&sk, &message).unwrap();

        assert!(Ed25519Curve::verify(&pk, &message, &signature));
        assert!(!Ed25519Curve::verify(&pk, &[0x12u8; 32], &signature));
        assert!(!Ed25519Curve::verify(&pk, &message, &signature[..63]));
        assert!(!Ed25519Curve::verify(&pk[..31], &message, &signature));
    }

    #[test]
    fn test_ed25519_slip10_vector() {
        // SLIP-0010 test vector 1 for ed25519
        let seed = slip10_seed();
        let material = SeedMaterial { seed: &seed, entropy: &[], passphrase: "" };

        let master = Ed25519Curve::master_node(&material).unwrap();
        assert_eq!(
            hex::encode(&master.key),
            "2b4be7f19ee27bbf30c667b642d5f4aa69fd169872f8fc3059c08ebae2eb19e7"
        );
        assert_eq!(
            hex::encode(Ed25519Curve::public_key_from_private(&master.key).unwrap()),
            "a4b2856bfec510abab89753fac1ac0e1112364e7d250545963f135f2a33188ed"
        );

        let child = Ed25519Curve::derive_path(&material, &[HARDENED_BIT]).unwrap();
        assert_eq!(
            hex::encode(&child.key),
            "68e0fe46dfb67e368c75379acec591dad19df3cde26e63b93a8e704f1dade7a3"
        );
    }

    #[test]
    fn test_ed25519_rejects_soft_index() {
        let seed = slip10_seed();
        let material = SeedMaterial { seed: &seed, entropy: &[], passphrase: "" };
        assert!(matches!(
            Ed25519Curve::derive_path(&material, &[HARDENED_BIT, 0]),
            Err(CurveError::DerivationFailed(_))
        ));
    }

    #[test]
    fn test_ed25519_solana_address() {
        let pk = Ed25519Curve::public_key_from_private(&[42u8; 32]).unwrap();
        let address = Ed25519Curve::to_solana_address(&pk);
        assert_eq!(Ed25519Curve::from_solana_address(&address).unwrap(), pk);
        assert!(Ed25519Curve::from_solana_address("111").is_err());
    }
}
