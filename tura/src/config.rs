//! Configuration types for the wallet core.
//!
//! [`TuraConfig`] aggregates chain, RPC, session and faucet settings. Each
//! piece has a `Default` matching the Tura test network, can be loaded from
//! a JSON file, and can be overridden from the environment.

use std::path::Path;
use std::time::Duration;

use alloy::primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::{Result, WalletError};

/// Environment variable overriding [`ChainConfig::rpc_url`].
pub const ENV_RPC_URL: &str = "TURA_RPC_URL";
/// Environment variable overriding [`ChainConfig::chain_id`].
pub const ENV_CHAIN_ID: &str = "TURA_CHAIN_ID";
/// Environment variable overriding [`SessionConfig::ttl_secs`].
pub const ENV_SESSION_TTL: &str = "TURA_SESSION_TTL_SECS";
/// Environment variable holding the faucet signing key.
pub const ENV_FAUCET_KEY: &str = "TURA_FAUCET_KEY";

/// Longest accepted session lifetime: one year.
pub const MAX_SESSION_TTL_SECS: u64 = 365 * 24 * 60 * 60;

/// Native currency metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeCurrency {
    /// Display name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Number of decimals of the smallest unit.
    pub decimals: u8,
}

impl Default for NativeCurrency {
    fn default() -> Self {
        Self {
            name: "TURA".into(),
            symbol: "TURA".into(),
            decimals: 18,
        }
    }
}

/// Chain the wallet is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainConfig {
    /// EIP-155 chain id.
    pub chain_id: u64,
    /// Human-readable chain name.
    pub chain_name: String,
    /// JSON-RPC endpoint URL.
    pub rpc_url: String,
    /// Native currency metadata.
    pub native_currency: NativeCurrency,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            chain_id: 1337,
            chain_name: "Tura Chain".into(),
            rpc_url: "http://127.0.0.1:8545".into(),
            native_currency: NativeCurrency::default(),
        }
    }
}

impl ChainConfig {
    /// Chain id as a `0x`-prefixed hex quantity.
    #[must_use]
    pub fn chain_id_hex(&self) -> String {
        format!("{:#x}", self.chain_id)
    }
}

/// Configuration for retrying failed idempotent RPC reads.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Initial delay between retries in milliseconds.
    pub initial_delay_ms: u64,
    /// Exponential backoff multiplier.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to retry delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Calculate delay for a given attempt number (0-indexed).
    #[must_use]
    #[allow(
        clippy::cast_possible_wrap,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay_ms as f64 * self.backoff_multiplier.powi(attempt as i32);
        let delay_ms = if self.jitter {
            // Add up to 25% jitter
            let jitter = base_delay * 0.25 * rand_factor();
            base_delay + jitter
        } else {
            base_delay
        };
        Duration::from_millis(delay_ms as u64)
    }
}

/// Generate a pseudo-random factor between 0.0 and 1.0.
fn rand_factor() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    f64::from(nanos % 1000) / 1000.0
}

/// JSON-RPC transport configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcConfig {
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Retry policy for idempotent reads.
    pub retry: RetryConfig,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            retry: RetryConfig::default(),
        }
    }
}

impl RpcConfig {
    /// Per-request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Login session policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionConfig {
    /// Session lifetime in seconds.
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { ttl_secs: 30 * 60 }
    }
}

impl SessionConfig {
    /// Session lifetime, clamped to [`MAX_SESSION_TTL_SECS`].
    #[must_use]
    pub fn ttl(&self) -> chrono::Duration {
        let secs = self.ttl_secs.min(MAX_SESSION_TTL_SECS);
        chrono::Duration::seconds(i64::try_from(secs).unwrap_or(i64::MAX))
    }
}

/// Test-token faucet settings used by the chat agent.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaucetConfig {
    /// Faucet source address (informational; the signing key decides).
    pub address: Address,
    /// Signing key of the faucet account. Faucet is disabled when unset.
    #[serde(default, skip_serializing)]
    pub private_key: Option<String>,
    /// Balance below which a wallet may request tokens, in TURA.
    pub min_balance: String,
    /// Amount dispensed per request, in TURA.
    pub amount: String,
}

impl std::fmt::Debug for FaucetConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaucetConfig")
            .field("address", &self.address)
            .field("enabled", &self.private_key.is_some())
            .field("min_balance", &self.min_balance)
            .field("amount", &self.amount)
            .finish()
    }
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            address: alloy::primitives::address!("08Bb6eA809A2d6c13D57166Fa3ede48C0ae9a70e"),
            private_key: None,
            min_balance: "0.1".into(),
            amount: "1".into(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TuraConfig {
    /// Chain settings.
    pub chain: ChainConfig,
    /// RPC transport settings.
    pub rpc: RpcConfig,
    /// Session policy.
    pub session: SessionConfig,
    /// Faucet settings.
    pub faucet: FaucetConfig,
}

impl TuraConfig {
    /// Load configuration from a JSON file, then apply env overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            WalletError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| WalletError::config(format!("invalid config {}: {e}", path.display())))?;
        config.with_env_overrides()
    }

    /// Apply `TURA_*` environment overrides.
    pub fn with_env_overrides(self) -> Result<Self> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(url) = lookup(ENV_RPC_URL) {
            self.chain.rpc_url = url;
        }
        if let Some(id) = lookup(ENV_CHAIN_ID) {
            self.chain.chain_id = id
                .parse()
                .map_err(|e| WalletError::config(format!("{ENV_CHAIN_ID}: {e}")))?;
        }
        if let Some(ttl) = lookup(ENV_SESSION_TTL) {
            self.session.ttl_secs = ttl
                .parse()
                .map_err(|e| WalletError::config(format!("{ENV_SESSION_TTL}: {e}")))?;
        }
        if let Some(key) = lookup(ENV_FAUCET_KEY) {
            self.faucet.private_key = Some(key);
        }
        self.validate()?;
        Ok(self)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.chain.rpc_url.trim().is_empty() {
            return Err(WalletError::config("rpc url must not be empty"));
        }
        if self.rpc.timeout_secs == 0 {
            return Err(WalletError::config("rpc timeout must be positive"));
        }
        if self.rpc.retry.max_attempts == 0 {
            return Err(WalletError::config("retry attempts must be at least 1"));
        }
        if self.session.ttl_secs == 0 {
            return Err(WalletError::config("session ttl must be positive"));
        }
        if self.session.ttl_secs > MAX_SESSION_TTL_SECS {
            return Err(WalletError::config(format!(
                "session ttl must be at most {MAX_SESSION_TTL_SECS} seconds"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletErrorKind;

    #[test]
    fn test_chain_config_default() {
        let config = ChainConfig::default();
        assert_eq!(config.chain_id, 1337);
        assert_eq!(config.chain_id_hex(), "0x539");
        assert_eq!(config.native_currency.decimals, 18);
    }

    #[test]
    fn test_rpc_config_default() {
        let config = RpcConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.retry.max_attempts, 3);
    }

    #[test]
    fn test_retry_config_delay_without_jitter() {
        let config = RetryConfig {
            max_attempts: 3,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            jitter: false,
        };

        assert_eq!(config.delay_for_attempt(0).as_millis(), 1000);
        assert_eq!(config.delay_for_attempt(1).as_millis(), 2000);
        assert_eq!(config.delay_for_attempt(2).as_millis(), 4000);
    }

    #[test]
    fn test_session_ttl_default() {
        assert_eq!(SessionConfig::default().ttl(), chrono::Duration::minutes(30));
    }

    #[test]
    fn test_overrides() {
        let config = TuraConfig::default()
            .with_overrides(|key| match key {
                ENV_RPC_URL => Some("https://rpc.tura.example".into()),
                ENV_CHAIN_ID => Some("202".into()),
                ENV_SESSION_TTL => Some("300".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.chain.rpc_url, "https://rpc.tura.example");
        assert_eq!(config.chain.chain_id, 202);
        assert_eq!(config.session.ttl_secs, 300);
        assert!(config.faucet.private_key.is_none());
    }

    #[test]
    fn test_invalid_override_rejected() {
        let err = TuraConfig::default()
            .with_overrides(|key| (key == ENV_SESSION_TTL).then(|| "0".to_string()))
            .unwrap_err();
        assert_eq!(err.kind, WalletErrorKind::Config);
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        let err = TuraConfig::default()
            .with_overrides(|key| (key == ENV_SESSION_TTL).then(|| "9000000000000".to_string()))
            .unwrap_err();
        assert_eq!(err.kind, WalletErrorKind::Config);

        let config = TuraConfig::default()
            .with_overrides(|key| {
                (key == ENV_SESSION_TTL).then(|| MAX_SESSION_TTL_SECS.to_string())
            })
            .unwrap();
        assert_eq!(config.session.ttl_secs, MAX_SESSION_TTL_SECS);
    }

    #[test]
    fn test_ttl_clamped() {
        let session = SessionConfig { ttl_secs: u64::MAX };
        assert_eq!(
            session.ttl(),
            chrono::Duration::seconds(i64::try_from(MAX_SESSION_TTL_SECS).unwrap())
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TuraConfig =
            serde_json::from_str(r#"{"session": {"ttlSecs": 60}}"#).unwrap();
        assert_eq!(config.session.ttl_secs, 60);
        assert_eq!(config.chain.chain_id, 1337);
    }

    #[test]
    fn test_faucet_debug_hides_key() {
        let faucet = FaucetConfig {
            private_key: Some("0xsecret".into()),
            ..FaucetConfig::default()
        };
        let rendered = format!("{faucet:?}");
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("enabled: true"));
    }
}
