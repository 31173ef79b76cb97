//! Ed25519 extended keys for Cardano
//!
//! Private keys are 64 bytes, `kL || kR`. `kL` is used directly as the
//! signing scalar and `kR` as the nonce prefix, so keys cannot be expressed
//! as RFC 8032 seeds.
//!
//! - Icarus master key generation from BIP-39 entropy
//! - BIP32-Ed25519 child derivation, hardened and soft
//! - Signatures that verify as plain Ed25519

use super::{CurveError, CurveType, EllipticCurve, ExtendedNode, KeyDerivation, SeedMaterial, HARDENED_BIT};
use curve25519_dalek::edwards::EdwardsPoint;
use curve25519_dalek::scalar::Scalar;
use ed25519_dalek::hazmat::{self, ExpandedSecretKey};
use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use zeroize::Zeroizing;

type HmacSha512 = Hmac<Sha512>;

const ICARUS_ROUNDS: u32 = 4096;

/// Cardano extended ed25519 curve
pub struct Ed25519CardanoCurve;

/// Split a 64-byte extended key into (kL, kR)
fn split_key(private_key: &[u8]) -> Result<(Zeroizing<[u8; 32]>, Zeroizing<[u8; 32]>), CurveError> {
    if private_key.len() != 64 {
        return Err(CurveError::InvalidPrivateKey(
            format!("Extended key must be 64 bytes, got {}", private_key.len())
        ));
    }
    let mut kl = Zeroizing::new([0u8; 32]);
    let mut kr = Zeroizing::new([0u8; 32]);
    kl.copy_from_slice(&private_key[..32]);
    kr.copy_from_slice(&private_key[32..]);
    Ok((kl, kr))
}

fn public_point(kl: &[u8; 32]) -> EdwardsPoint {
    EdwardsPoint::mul_base(&Scalar::from_bytes_mod_order(*kl))
}

/// 256-bit little-endian addition, wrapping
fn add_le(a: &[u8; 32], b: &[u8; 32]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut carry = 0u16;
    for i in 0..32 {
        let sum = a[i] as u16 + b[i] as u16 + carry;
        out[i] = sum as u8;
        carry = sum >> 8;
    }
    out
}

/// 8 * z[0..28] as a 32-byte little-endian integer
fn mul8_truncated(z: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    let mut carry = 0u8;
    for i in 0..28 {
        out[i] = (z[i] << 3) | carry;
        carry = z[i] >> 5;
    }
    out[28] = carry;
    out
}

impl EllipticCurve for Ed25519CardanoCurve {
    type PublicKey = [u8; 32];
    type Signature = [u8; 64];

    const CURVE: CurveType = CurveType::Ed25519Cardano;

    fn public_key_from_private(private_key: &[u8]) -> Result<Self::PublicKey, CurveError> {
        let (kl, _) = split_key(private_key)?;
        Ok(public_point(&kl).compress().to_bytes())
    }

    fn sign(private_key: &[u8], message: &[u8]) -> Result<Self::Signature, CurveError> {
        let (kl, kr) = split_key(private_key)?;
        let scalar = Scalar::from_bytes_mod_order(*kl);
        let verifying_key = VerifyingKey::from(EdwardsPoint::mul_base(&scalar));

        let esk = ExpandedSecretKey {
            scalar,
            hash_prefix: *kr,
        };
        Ok(hazmat::raw_sign::<Sha512>(&esk, message, &verifying_key).to_bytes())
    }

    /// The public key may carry its 32-byte chain code; only the first 32
    /// bytes are used.
    fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> bool {
        if public_key.len() != 32 && public_key.len() != 64 {
            return false;
        }
        let Ok(pk_bytes) = <[u8; 32]>::try_from(&public_key[..32]) else {
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

impl KeyDerivation for Ed25519CardanoCurve {
    /// Icarus: PBKDF2-HMAC-SHA512(passphrase, entropy, 4096) stretched to
    /// 96 bytes, then clamped.
    fn master_node(material: &SeedMaterial<'_>) -> Result<ExtendedNode, CurveError> {
        if material.entropy.is_empty() {
            return Err(CurveError::InvalidSeed("Cardano derivation requires mnemonic entropy".into()));
        }

        let mut secret = Zeroizing::new([0u8; 96]);
        pbkdf2::pbkdf2_hmac::<Sha512>(
            material.passphrase.as_bytes(),
            material.entropy,
            ICARUS_ROUNDS,
            secret.as_mut_slice(),
        );

        secret[0] &= 0xf8;
        secret[31] &= 0x1f;
        secret[31] |= 0x40;

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&secret[64..]);
        Ok(ExtendedNode::new(secret[..64].to_vec(), chain_code))
    }

    fn derive_child(parent: &ExtendedNode, index: u32) -> Result<ExtendedNode, CurveError> {
        let (kl, kr) = split_key(&parent.key)?;
        let index_le = index.to_le_bytes();

        let mut z_mac = HmacSha512::new_from_slice(&parent.chain_code)
            .map_err(|e| CurveError::DerivationFailed(e.to_string()))?;
        let mut c_mac = z_mac.clone();

        if index & HARDENED_BIT != 0 {
            z_mac.update(&[0x00]);
            z_mac.update(&parent.key);
            c_mac.update(&[0x01]);
            c_mac.update(&parent.key);
        } else {
            let public_key = public_point(&kl).compress().to_bytes();
            z_mac.update(&[0x02]);
            z_mac.update(&public_key);
            c_mac.update(&[0x03]);
            c_mac.update(&public_key);
        }
        z_mac.update(&index_le);
        c_mac.update(&index_le);

        let mut z = Zeroizing::new([0u8; 64]);
        z.copy_from_slice(&z_mac.finalize().into_bytes());
        let (zl, zr) = z.split_at(32);

        // kL' = 8 * ZL[0..28] + kL, kR' = ZR + kR, both mod 2^256
        let child_kl = Zeroizing::new(add_le(&mul8_truncated(zl), &kl));
        let mut zr_arr = Zeroizing::new([0u8; 32]);
        zr_arr.copy_from_slice(zr);
        let child_kr = Zeroizing::new(add_le(&zr_arr, &kr));

        let mut key = Vec::with_capacity(64);
        key.extend_from_slice(child_kl.as_slice());
        key.extend_from_slice(child_kr.as_slice());

        let c = c_mac.finalize().into_bytes();
        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&c[32..]);

        Ok(ExtendedNode::new(key, chain_code))
    }
}

// MARK: - Tests
