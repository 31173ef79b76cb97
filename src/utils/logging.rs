//! Structured logging with redaction of key material
//!
//! Pipeline stages log through the `log_*!` macros. Field values are
//! classified by their key name:
//! - secrets (keys, seeds, mnemonics, passphrases, signatures) are replaced
//! - addresses keep a short prefix and suffix
//! - hashes are shortened

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

/// Enable debug logging
pub fn enable_debug() {
    DEBUG_ENABLED.store(true, Ordering::SeqCst);
}

/// Disable debug logging
pub fn disable_debug() {
    DEBUG_ENABLED.store(false, Ordering::SeqCst);
}

pub fn is_debug_enabled() -> bool {
    DEBUG_ENABLED.load(Ordering::SeqCst)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

/// How a field value is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Redaction {
    Secret,
    Address,
    Hash,
    Plain,
}

const SECRET_KEYS: &[&str] = &[
    "private", "secret", "seed", "mnemonic", "phrase", "passphrase",
    "password", "entropy", "signature", "xprv", "wif",
];

const ADDRESS_KEYS: &[&str] = &["address", "recipient", "sender", "from", "to"];

const HASH_KEYS: &[&str] = &["hash", "txid", "preimage", "digest"];

fn classify(key: &str) -> Redaction {
    let key = key.to_ascii_lowercase();
    if SECRET_KEYS.iter().any(|k| key.contains(k)) {
        Redaction::Secret
    } else if key.split('_').any(|part| ADDRESS_KEYS.contains(&part)) {
        Redaction::Address
    } else if HASH_KEYS.iter().any(|k| key.contains(k)) {
        Redaction::Hash
    } else {
        Redaction::Plain
    }
}

/// Structured log entry
#[derive(Debug)]
pub struct LogEntry {
    pub level: LogLevel,
    pub module: &'static str,
    pub message: String,
    pub fields: Vec<(&'static str, String)>,
}

impl LogEntry {
    pub fn new(level: LogLevel, module: &'static str, message: impl Into<String>) -> Self {
        Self {
            level,
            module,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field; the value is redacted according to the key name
    pub fn field(mut self, key: &'static str, value: impl fmt::Display) -> Self {
        let raw = value.to_string();
        let rendered = match classify(key) {
            Redaction::Secret => redact_secret(&raw),
            Redaction::Address => redact_address(&raw),
            Redaction::Hash => redact_hash(&raw),
            Redaction::Plain => raw,
        };
        self.fields.push((key, rendered));
        self
    }

    pub fn render(&self) -> String {
        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ");
        let mut line = format!("[{}] {} [{}] {}", timestamp, self.level, self.module, self.message);
        if !self.fields.is_empty() {
            let fields = self
                .fields
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect::<Vec<_>>()
                .join(" ");
            line.push_str(" | ");
            line.push_str(&fields);
        }
        line
    }

    pub fn log(self) {
        if self.level == LogLevel::Debug && !is_debug_enabled() {
            return;
        }
        eprintln!("{}", self.render());
    }
}

fn redact_secret(value: &str) -> String {
    if value.is_empty() {
        "[EMPTY]".to_string()
    } else if value.len() <= 4 {
        "[REDACTED]".to_string()
    } else {
        format!("[REDACTED:{}chars]", value.len())
    }
}

/// Keep the first 6 (8 for 0x-prefixed) and last 4 characters
fn redact_address(address: &str) -> String {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return "[EMPTY]".to_string();
    }

    let prefix_len = if trimmed.starts_with("0x") { 8 } else { 6 };
    let suffix_len = 4;
    if !trimmed.is_ascii() || trimmed.len() <= prefix_len + suffix_len + 3 {
        return redact_secret(trimmed);
    }

    format!("{}...{}", &trimmed[..prefix_len], &trimmed[trimmed.len() - suffix_len..])
}

fn redact_hash(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() <= 20 || !trimmed.is_ascii() {
        return trimmed.to_string();
    }
    format!("{}...{}", &trimmed[..10], &trimmed[trimmed.len() - 6..])
}

/// Convenience macro for debug logging
#[macro_export]
macro_rules! log_debug {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Debug,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for info logging
#[macro_export]
macro_rules! log_info {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Info,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for warning logging
#[macro_export]
macro_rules! log_warn {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Warn,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

/// Convenience macro for error logging
#[macro_export]
macro_rules! log_error {
    ($module:expr, $msg:expr) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg
        ).log()
    };
    ($module:expr, $msg:expr, $($key:ident = $value:expr),* $(,)?) => {
        $crate::utils::logging::LogEntry::new(
            $crate::utils::logging::LogLevel::Error,
            $module,
            $msg
        )
        $(.field(stringify!($key), &$value))*
        .log()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_keys() {
        assert_eq!(classify("private_key"), Redaction::Secret);
        assert_eq!(classify("signature"), Redaction::Secret);
        assert_eq!(classify("to_address"), Redaction::Address);
        assert_eq!(classify("preimage_hash"), Redaction::Hash);
        assert_eq!(classify("utxo_count"), Redaction::Plain);
        assert_eq!(classify("total_amount"), Redaction::Plain);
    }

    #[test]
    fn test_redact_secret() {
        assert_eq!(redact_secret(""), "[EMPTY]");
        assert_eq!(redact_secret("abc"), "[REDACTED]");
        assert_eq!(redact_secret("abandon abandon"), "[REDACTED:15chars]");
    }

    #[test]
    fn test_redact_address() {
        let bnb = "bnb1grpf0955h0ykzq3ar5nmum7y6gdfl6lxfn46h2";
        assert_eq!(redact_address(bnb), "bnb1gr...46h2");

        let eth = "0x9858EfFD232B4033E47d90003D41EC34EcaEda94";
        assert_eq!(redact_address(eth), "0x9858Ef...da94");
    }

    #[test]
    fn test_redact_hash() {
        let hash = "3f3fece9059e714d303a9a1496ddade8f2c38fa78fc4cc2e505c5dbb0ea678d1";
        assert_eq!(redact_hash(hash), "3f3fece905...a678d1");
        assert_eq!(redact_hash("short"), "short");
    }

    #[test]
    fn test_log_entry_redacts_fields() {
        let entry = LogEntry::new(LogLevel::Info, "compiler", "compiled")
            .field("utxo_count", 3)
            .field("signature", "3044022041294880caa09bb1b653775310fcdd14")
            .field("from", "bc1qhkfq3zahaqkkzx5mjnamwjsfpq2jk7z00ppggv");

        let rendered = entry.render();
        assert!(rendered.contains("utxo_count=3"));
        assert!(rendered.contains("signature=[REDACTED:40chars]"));
        assert!(rendered.contains("from=bc1qhk...pggv"));
        assert!(!rendered.contains("3044022041294880"));
    }
}
