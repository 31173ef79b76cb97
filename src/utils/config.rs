//! Compiler configuration
//!
//! Tunables for transaction planning and payload decoding:
//! - preset levels (standard, strict)
//! - dust and size limits for UTXO planning
//! - default chain identifiers for the input builder
//! - Cardano linear fee parameters
//!
//! The configuration is a plain value handed to the pipeline. There is no
//! process-wide instance.

use crate::error::{WalletError, WalletResult};

/// Compiler settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerConfig {
    pub level: ConfigLevel,

    // UTXO planning
    /// Outputs and change below this many satoshis are not created
    pub dust_threshold: u64,
    /// Largest transaction, in virtual bytes, the planner will produce
    pub max_tx_vsize: u64,
    /// Fee rate used when an input leaves `byte_fee` at zero
    pub default_byte_fee: u64,

    // Account chains
    pub ethereum_default_chain_id: u64,
    pub binance_default_chain_id: String,

    // Cardano
    /// Change below this many lovelace is folded into the fee
    pub cardano_min_change: u64,
    pub cardano_fee_constant: u64,
    pub cardano_fee_per_byte: u64,

    // Payloads
    /// Upper bound on any encoded payload accepted by the codec
    pub max_payload_bytes: u64,
    /// Verify every signature against its public key before compiling
    pub verify_signatures: bool,
}

/// Configuration presets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    Standard,
    /// Tighter payload and size limits
    Strict,
    Custom,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl CompilerConfig {
    pub fn standard() -> Self {
        Self {
            level: ConfigLevel::Standard,

            dust_threshold: 546,
            max_tx_vsize: 100_000,
            default_byte_fee: 1,

            ethereum_default_chain_id: 1,
            binance_default_chain_id: "Binance-Chain-Nile".to_string(),

            cardano_min_change: 1_000_000,
            cardano_fee_constant: 155_381,
            cardano_fee_per_byte: 44,

            max_payload_bytes: 1 << 20,
            verify_signatures: true,
        }
    }

    pub fn strict() -> Self {
        Self {
            level: ConfigLevel::Strict,
            max_tx_vsize: 10_000,
            max_payload_bytes: 64 * 1024,
            ..Self::standard()
        }
    }

    /// Apply a change and mark the configuration as custom
    pub fn customize<F>(mut self, updater: F) -> Self
    where
        F: FnOnce(&mut CompilerConfig),
    {
        updater(&mut self);
        self.level = ConfigLevel::Custom;
        self
    }

    /// Reject settings the planner cannot work with
    pub fn validate(&self) -> WalletResult<()> {
        let mut problems = Vec::new();

        if self.max_tx_vsize == 0 {
            problems.push("max_tx_vsize must be positive");
        }
        if self.max_payload_bytes < 64 {
            problems.push("max_payload_bytes is too small to hold any signing input");
        }
        if self.ethereum_default_chain_id == 0 {
            problems.push("ethereum_default_chain_id must be positive");
        }
        if self.binance_default_chain_id.trim().is_empty() {
            problems.push("binance_default_chain_id must not be empty");
        }
        if self.cardano_min_change > 0 && self.cardano_min_change < self.cardano_fee_per_byte {
            problems.push("cardano_min_change is below the per-byte fee");
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(WalletError::invalid_input("invalid compiler configuration")
                .with_details(problems.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_validate() {
        assert!(CompilerConfig::standard().validate().is_ok());
        assert!(CompilerConfig::strict().validate().is_ok());
        assert_eq!(CompilerConfig::default(), CompilerConfig::standard());
    }

    #[test]
    fn test_strict_is_tighter() {
        let standard = CompilerConfig::standard();
        let strict = CompilerConfig::strict();
        assert!(strict.max_tx_vsize < standard.max_tx_vsize);
        assert!(strict.max_payload_bytes < standard.max_payload_bytes);
        assert_eq!(strict.dust_threshold, standard.dust_threshold);
    }

    #[test]
    fn test_customize_marks_custom() {
        let config = CompilerConfig::standard().customize(|c| c.dust_threshold = 1000);
        assert_eq!(config.level, ConfigLevel::Custom);
        assert_eq!(config.dust_threshold, 1000);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let config = CompilerConfig::standard().customize(|c| {
            c.max_tx_vsize = 0;
            c.binance_default_chain_id = String::new();
        });
        let err = config.validate().unwrap_err();
        let details = err.details.unwrap();
        assert!(details.contains("max_tx_vsize"));
        assert!(details.contains("binance_default_chain_id"));
    }
}
