//! Mnemonic Generation
//!
//! Creates BIP-39 mnemonics from OS randomness and parses user phrases.
//!
//! SECURITY: Entropy buffers are zeroized on drop.

use bip39::{Language, Mnemonic};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::{ErrorCode, WalletError, WalletResult};

/// Entropy sizes BIP-39 defines, in bits
pub const VALID_STRENGTHS: [usize; 5] = [128, 160, 192, 224, 256];

/// Generate a fresh English mnemonic with `strength_bits` of entropy
pub fn generate_mnemonic(strength_bits: usize) -> WalletResult<Mnemonic> {
    if !VALID_STRENGTHS.contains(&strength_bits) {
        return Err(WalletError::invalid_input(format!(
            "Mnemonic strength must be one of {:?} bits, got {}",
            VALID_STRENGTHS, strength_bits
        )));
    }

    let mut entropy = Zeroizing::new(vec![0u8; strength_bits / 8]);
    OsRng.fill_bytes(entropy.as_mut_slice());

    Mnemonic::from_entropy_in(Language::English, entropy.as_slice())
        .map_err(|e| WalletError::internal(format!("Failed to create mnemonic: {}", e)))
}

/// Parse an English mnemonic, checking wordlist membership and checksum
pub fn parse_mnemonic(phrase: &str) -> WalletResult<Mnemonic> {
    Mnemonic::parse_in(Language::English, phrase.trim())
        .map_err(|e| WalletError::new(ErrorCode::InvalidMnemonic, format!("Invalid mnemonic: {}", e)))
}
