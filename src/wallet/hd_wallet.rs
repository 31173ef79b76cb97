//! Hierarchical deterministic wallet
//!
//! An [`HDWallet`] owns the mnemonic, passphrase, entropy and seed in
//! zeroizing buffers and derives per-coin keys on demand. It holds no other
//! state, so every derivation is deterministic and the wallet can be shared
//! across threads.

use std::str::FromStr;

use bitcoin::bip32::{ChildNumber, Xpriv, Xpub};
use bitcoin::secp256k1::Secp256k1;
use bitcoin::NetworkKind;
use zeroize::Zeroizing;

use crate::coin::{AddressFormat, CoinType};
use crate::crypto::curves::{self, SeedMaterial};
use crate::crypto::{CurveType, PrivateKey, PublicKey};
use crate::error::{WalletError, WalletResult};
use crate::log_debug;
use crate::utils::crypto::encode_base58check;

use super::derivation::encode_address;
use super::derivation_path::{require_valid_path, DerivationPath};
use super::keygen::{generate_mnemonic, parse_mnemonic};

/// SLIP-132 version bytes for account-level extended keys
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedKeyVersion {
    /// xpub / xprv
    Xpub,
    /// ypub / yprv (P2SH-wrapped segwit)
    Ypub,
    /// zpub / zprv (native segwit)
    Zpub,
}

impl ExtendedKeyVersion {
    pub fn public_version(&self) -> [u8; 4] {
        match self {
            Self::Xpub => [0x04, 0x88, 0xb2, 0x1e],
            Self::Ypub => [0x04, 0x9d, 0x7c, 0xb2],
            Self::Zpub => [0x04, 0xb2, 0x47, 0x46],
        }
    }

    pub fn private_version(&self) -> [u8; 4] {
        match self {
            Self::Xpub => [0x04, 0x88, 0xad, 0xe4],
            Self::Ypub => [0x04, 0x9d, 0x78, 0x78],
            Self::Zpub => [0x04, 0xb2, 0x43, 0x0c],
        }
    }
}

/// BIP-39 backed HD wallet
pub struct HDWallet {
    mnemonic: Zeroizing<String>,
    passphrase: Zeroizing<String>,
    entropy: Zeroizing<Vec<u8>>,
    seed: Zeroizing<[u8; 64]>,
}

impl HDWallet {
    /// Restore from a mnemonic; fails with `InvalidMnemonic`
    pub fn from_mnemonic(words: &str, passphrase: &str) -> WalletResult<Self> {
        let mnemonic = parse_mnemonic(words)?;
        let wallet = Self {
            mnemonic: Zeroizing::new(mnemonic.to_string()),
            passphrase: Zeroizing::new(passphrase.to_string()),
            entropy: Zeroizing::new(mnemonic.to_entropy()),
            seed: Zeroizing::new(mnemonic.to_seed(passphrase)),
        };
        log_debug!("wallet", "restored from mnemonic", word_count = mnemonic.word_count());
        Ok(wallet)
    }

    /// Create a wallet with a fresh mnemonic of `strength_bits` entropy
    pub fn random(strength_bits: usize) -> WalletResult<Self> {
        Self::random_with_passphrase(strength_bits, "")
    }

    pub fn random_with_passphrase(strength_bits: usize, passphrase: &str) -> WalletResult<Self> {
        let mnemonic = generate_mnemonic(strength_bits)?;
        let phrase = Zeroizing::new(mnemonic.to_string());
        Self::from_mnemonic(&phrase, passphrase)
    }

    pub fn mnemonic(&self) -> &str {
        &self.mnemonic
    }

    pub fn entropy(&self) -> &[u8] {
        &self.entropy
    }

    pub fn seed(&self) -> &[u8] {
        self.seed.as_slice()
    }

    fn material(&self) -> SeedMaterial<'_> {
        SeedMaterial {
            seed: self.seed.as_slice(),
            entropy: &self.entropy,
            passphrase: &self.passphrase,
        }
    }

    fn derive(&self, curve: CurveType, path: &DerivationPath) -> WalletResult<PrivateKey> {
        let node = curves::derive_path(curve, &self.material(), &path.indices())?;
        PrivateKey::new(&node.key, curve)
    }

    /// Private key on the coin's canonical path
    pub fn private_key(&self, coin: CoinType) -> WalletResult<PrivateKey> {
        let descriptor = coin.descriptor()?;
        self.private_key_for_path(coin, descriptor.derivation_path)
    }

    /// Private key at an arbitrary path on the coin's curve
    pub fn private_key_for_path(&self, coin: CoinType, path: &str) -> WalletResult<PrivateKey> {
        let descriptor = coin.descriptor()?;
        let parsed = require_valid_path(path, coin)?;
        log_debug!("wallet", "deriving key", coin = descriptor.symbol, path = parsed);
        self.derive(descriptor.curve, &parsed)
    }

    /// Public key on the canonical path, in the coin's key encoding
    pub fn public_key(&self, coin: CoinType) -> WalletResult<PublicKey> {
        let descriptor = coin.descriptor()?;
        self.private_key(coin)?.public_key_with_type(descriptor.public_key_type)
    }

    /// Address on the canonical path
    pub fn address(&self, coin: CoinType) -> WalletResult<String> {
        let descriptor = coin.descriptor()?;
        let public_key = self.public_key(coin)?;

        let staking_key = match descriptor.address_format {
            AddressFormat::CardanoBase { staking_path, .. } => Some(
                self.private_key_for_path(coin, staking_path)?
                    .public_key_with_type(descriptor.public_key_type)?,
            ),
            _ => None,
        };

        encode_address(descriptor, &public_key, staking_key.as_ref())
    }

    fn account_xpriv(&self, purpose: u32, coin: CoinType) -> WalletResult<Xpriv> {
        let descriptor = coin.descriptor()?;
        if descriptor.curve != CurveType::Secp256k1 {
            return Err(WalletError::invalid_input(format!(
                "Extended keys are only defined for secp256k1 coins, not {}",
                descriptor.name
            )));
        }

        let path = DerivationPath::account_path(purpose, coin, 0);
        let children = path
            .indices()
            .into_iter()
            .map(ChildNumber::from)
            .collect::<Vec<_>>();

        let secp = Secp256k1::signing_only();
        let master = Xpriv::new_master(NetworkKind::Main, self.seed.as_slice())?;
        Ok(master.derive_priv(&secp, &children)?)
    }

    /// Account-level extended private key, `m/purpose'/coin'/0'`
    pub fn extended_private_key(
        &self,
        purpose: u32,
        coin: CoinType,
        version: ExtendedKeyVersion,
    ) -> WalletResult<Zeroizing<String>> {
        let xpriv = self.account_xpriv(purpose, coin)?;
        let mut raw = Zeroizing::new(xpriv.encode());
        raw[..4].copy_from_slice(&version.private_version());
        Ok(Zeroizing::new(encode_base58check(raw.as_slice())))
    }

    /// Account-level extended public key, `m/purpose'/coin'/0'`
    pub fn extended_public_key(
        &self,
        purpose: u32,
        coin: CoinType,
        version: ExtendedKeyVersion,
    ) -> WalletResult<String> {
        let xpriv = self.account_xpriv(purpose, coin)?;
        let xpub = Xpub::from_priv(&Secp256k1::signing_only(), &xpriv);
        let mut raw = xpub.encode();
        raw[..4].copy_from_slice(&version.public_version());
        Ok(encode_base58check(&raw))
    }
}

impl std::fmt::Debug for HDWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HDWallet").finish_non_exhaustive()
    }
}

impl FromStr for HDWallet {
    type Err = WalletError;

    /// Restore with an empty passphrase
    fn from_str(words: &str) -> Result<Self, Self::Err> {
        Self::from_mnemonic(words, "")
    }
}
