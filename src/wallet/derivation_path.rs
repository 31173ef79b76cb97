//! Key Derivation Path Parsing and Validation
//!
//! Parses BIP-32 style paths (`m/84'/0'/0'/0/0`) and checks them against a
//! coin's curve:
//! - Correct format and syntax
//! - Coin-appropriate purpose and coin type
//! - Soft components on curves that only derive hardened children

use crate::coin::CoinType;
use crate::crypto::curves::HARDENED_BIT;
use crate::error::{WalletError, WalletResult};

/// Standard BIP purposes
pub mod bip_purposes {
    pub const BIP44: u32 = 44; // Legacy (P2PKH)
    pub const BIP49: u32 = 49; // SegWit compatible (P2SH-P2WPKH)
    pub const BIP84: u32 = 84; // Native SegWit (P2WPKH)
    pub const CIP1852: u32 = 1852; // Cardano Shelley
}

/// Hardened offset for BIP-32 derivation
pub const HARDENED: u32 = HARDENED_BIT;

/// Parsed derivation path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationPath {
    pub components: Vec<DerivationComponent>,
}

/// Single component of a derivation path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivationComponent {
    pub index: u32,
    pub hardened: bool,
}

impl DerivationComponent {
    pub fn new(index: u32, hardened: bool) -> Self {
        Self { index, hardened }
    }

    /// Get the full index including hardened bit
    pub fn full_index(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED
        } else {
            self.index
        }
    }
}

impl DerivationPath {
    pub fn purpose(&self) -> Option<u32> {
        self.components.first().map(|c| c.index)
    }

    pub fn coin_type(&self) -> Option<u32> {
        self.components.get(1).map(|c| c.index)
    }

    pub fn account(&self) -> Option<u32> {
        self.components.get(2).map(|c| c.index)
    }

    pub fn change(&self) -> Option<u32> {
        self.components.get(3).map(|c| c.index)
    }

    pub fn address_index(&self) -> Option<u32> {
        self.components.get(4).map(|c| c.index)
    }

    /// Raw child indices with the hardened bit applied
    pub fn indices(&self) -> Vec<u32> {
        self.components.iter().map(|c| c.full_index()).collect()
    }

    /// `m/purpose'/coin'/account'`
    pub fn account_path(purpose: u32, coin: CoinType, account: u32) -> Self {
        Self {
            components: vec![
                DerivationComponent::new(purpose, true),
                DerivationComponent::new(coin.0, true),
                DerivationComponent::new(account, true),
            ],
        }
    }
}

impl std::fmt::Display for DerivationComponent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

impl std::fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m")?;
        for component in &self.components {
            write!(f, "/{}", component)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for DerivationPath {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_path(s).map_err(|e| {
            WalletError::invalid_input(format!("Invalid derivation path '{}'", s)).with_details(e)
        })
    }
}

/// Derivation path validation result
#[derive(Debug, Clone)]
pub struct PathValidation {
    pub is_valid: bool,
    pub path: Option<DerivationPath>,
    pub normalized: Option<String>,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
}

/// Parse and validate a derivation path string for a coin
pub fn validate_derivation_path(path: &str, coin: CoinType) -> PathValidation {
    let mut warnings = Vec::new();
    let mut errors = Vec::new();

    let parsed = match parse_path(path) {
        Ok(p) => p,
        Err(e) => {
            return PathValidation {
                is_valid: false,
                path: None,
                normalized: None,
                warnings: vec![],
                errors: vec![e],
            };
        }
    };

    let descriptor = match coin.descriptor() {
        Ok(d) => d,
        Err(e) => {
            return PathValidation {
                is_valid: false,
                path: Some(parsed),
                normalized: None,
                warnings: vec![],
                errors: vec![e.message],
            };
        }
    };

    if !descriptor.curve.supports_soft_derivation() {
        if let Some(soft) = parsed.components.iter().find(|c| !c.hardened) {
            errors.push(format!(
                "{} derives hardened children only; component {} is not hardened",
                descriptor.curve, soft
            ));
        }
    }

    if let Some(purpose) = parsed.purpose() {
        let standard = match purpose {
            bip_purposes::BIP44 => true,
            bip_purposes::BIP49 | bip_purposes::BIP84 => descriptor.utxo.is_some(),
            bip_purposes::CIP1852 => coin == CoinType::CARDANO,
            _ => false,
        };
        if !standard {
            warnings.push(format!("Purpose {} is not standard for {}", purpose, descriptor.symbol));
        }
    }

    if let Some(coin_type) = parsed.coin_type() {
        if coin_type != coin.0 {
            warnings.push(format!(
                "Coin type {} is not standard for {} (expected {})",
                coin_type, descriptor.symbol, coin.0
            ));
        }
    }

    if let Some(account) = parsed.account() {
        if account > 100 {
            warnings.push(format!("Unusual account number: {}. Most wallets use 0", account));
        }
    }

    let has_unhardened_before_account = parsed.components.len() >= 3
        && parsed.components.iter().take(3).any(|c| !c.hardened);
    if has_unhardened_before_account {
        warnings.push("Purpose, coin type, and account should be hardened (')".to_string());
    }

    let normalized = parsed.to_string();

    PathValidation {
        is_valid: errors.is_empty(),
        path: Some(parsed),
        normalized: Some(normalized),
        warnings,
        errors,
    }
}

/// Parse a derivation path string
fn parse_path(path: &str) -> Result<DerivationPath, String> {
    let trimmed = path.trim();

    if trimmed == "m" || trimmed == "M" {
        return Ok(DerivationPath { components: Vec::new() });
    }

    if !trimmed.starts_with("m/") && !trimmed.starts_with("M/") {
        return Err("Derivation path must start with 'm/'".to_string());
    }

    let path_part = &trimmed[2..];
    if path_part.is_empty() {
        return Err("Empty derivation path".to_string());
    }

    let components = path_part
        .split('/')
        .map(parse_component)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(DerivationPath { components })
}

/// Parse a single path component
fn parse_component(s: &str) -> Result<DerivationComponent, String> {
    let trimmed = s.trim();

    if trimmed.is_empty() {
        return Err("Empty path component".to_string());
    }

    let (number_str, hardened) = if trimmed.ends_with('\'') || trimmed.ends_with('h') || trimmed.ends_with('H') {
        (&trimmed[..trimmed.len() - 1], true)
    } else {
        (trimmed, false)
    };

    let index: u32 = number_str.parse()
        .map_err(|e| format!("Invalid path component '{}': {}", s, e))?;

    if index >= HARDENED {
        return Err(format!("Path component {} exceeds maximum value", index));
    }

    Ok(DerivationComponent::new(index, hardened))
}

/// Require a path that is valid for the coin's curve
pub fn require_valid_path(path: &str, coin: CoinType) -> WalletResult<DerivationPath> {
    let validation = validate_derivation_path(path, coin);

    if !validation.is_valid {
        return Err(WalletError::invalid_input(format!("Invalid derivation path '{}'", path))
            .with_details(validation.errors.join("; ")));
    }

    validation
        .path
        .ok_or_else(|| WalletError::internal("Path validation succeeded but path is None"))
}
