//! Unified error type for the tura wallet core.
//!
//! Every public operation returns [`Result`]. Callers branch on
//! [`WalletError::kind`], never on the message text. The message is meant
//! for the user and is always specific to the failure.
//!
//! Cryptographic failures are deliberately collapsed: a wrong password and
//! a corrupted record produce the same [`WalletErrorKind::Decryption`]
//! error, so the API cannot be used as a password oracle. The underlying
//! cause is only emitted through `tracing` at debug level.

use std::fmt;

/// Result type alias for tura operations.
pub type Result<T> = std::result::Result<T, WalletError>;

/// Message shared by every decryption failure.
pub const DECRYPTION_FAILED: &str = "decryption failed: invalid password or data";

/// Error type for wallet, key-management and provider operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct WalletError {
    /// The error kind.
    pub kind: WalletErrorKind,
    /// Human-readable error message.
    pub message: String,
    /// Whether retrying the same call may succeed.
    pub retryable: bool,
}

/// Categories of wallet errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum WalletErrorKind {
    /// Input rejected before any cryptographic or network work.
    Validation,
    /// The password did not unlock the requested wallet.
    InvalidPassword,
    /// Authentication tag mismatch or malformed encrypted record.
    Decryption,
    /// A cryptographic primitive failed while encrypting or generating keys.
    Crypto,
    /// The backing store failed or did not verify a write.
    Storage,
    /// Transport or JSON-RPC failure.
    Network,
    /// The requested wallet or record does not exist.
    NotFound,
    /// A record that must be unique already exists.
    AlreadyExists,
    /// The account cannot cover value plus gas.
    InsufficientFunds,
    /// No key is stored yet; the caller must create one with a password.
    NeedsPasswordSetup,
    /// A key is stored but locked; the caller must supply the password.
    NeedsPasswordUnlock,
    /// No account is connected to the provider.
    NotConnected,
    /// The requested chain is not the configured chain.
    UnsupportedChain,
    /// The provider does not implement the requested RPC method.
    UnsupportedMethod,
    /// Invalid configuration.
    Config,
}

impl WalletErrorKind {
    /// Stable identifier for the kind, suitable for logs and wire formats.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::InvalidPassword => "INVALID_PASSWORD",
            Self::Decryption => "DECRYPTION_FAILED",
            Self::Crypto => "CRYPTO",
            Self::Storage => "STORAGE",
            Self::Network => "NETWORK",
            Self::NotFound => "NOT_FOUND",
            Self::AlreadyExists => "ALREADY_EXISTS",
            Self::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Self::NeedsPasswordSetup => "NEEDS_PASSWORD_SETUP",
            Self::NeedsPasswordUnlock => "NEEDS_PASSWORD_UNLOCK",
            Self::NotConnected => "NOT_CONNECTED",
            Self::UnsupportedChain => "UNSUPPORTED_CHAIN",
            Self::UnsupportedMethod => "UNSUPPORTED_METHOD",
            Self::Config => "CONFIG",
        }
    }

    /// EIP-1193 provider error code for this kind.
    #[must_use]
    pub const fn provider_code(self) -> i64 {
        match self {
            Self::NeedsPasswordSetup | Self::NeedsPasswordUnlock | Self::InvalidPassword => 4100,
            Self::UnsupportedMethod => 4200,
            Self::NotConnected => 4900,
            Self::UnsupportedChain => 4902,
            Self::Validation => -32602,
            Self::Network => -32603,
            _ => -32000,
        }
    }
}

impl fmt::Display for WalletErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WalletError {
    /// Create an error of the given kind.
    #[must_use]
    pub fn new(kind: WalletErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable: false,
        }
    }

    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(WalletErrorKind::Validation, message)
    }

    /// Create an invalid password error.
    #[must_use]
    pub fn invalid_password() -> Self {
        Self::new(WalletErrorKind::InvalidPassword, "invalid password")
    }

    /// Create the ambiguous decryption error.
    #[must_use]
    pub fn decryption() -> Self {
        Self::new(WalletErrorKind::Decryption, DECRYPTION_FAILED)
    }

    /// Create a crypto error.
    #[must_use]
    pub fn crypto(message: impl Into<String>) -> Self {
        Self::new(WalletErrorKind::Crypto, message)
    }

    /// Create a storage error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(WalletErrorKind::Storage, message)
    }

    /// Create a network error, marking it retryable.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            retryable: true,
            ..Self::new(WalletErrorKind::Network, message)
        }
    }

    /// Create a network error that must not be retried.
    #[must_use]
    pub fn network_fatal(message: impl Into<String>) -> Self {
        Self::new(WalletErrorKind::Network, message)
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::new(WalletErrorKind::NotFound, what)
    }

    /// Create an already exists error.
    #[must_use]
    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::new(WalletErrorKind::AlreadyExists, what)
    }

    /// Create an insufficient funds error.
    #[must_use]
    pub fn insufficient_funds(message: impl Into<String>) -> Self {
        Self::new(WalletErrorKind::InsufficientFunds, message)
    }

    /// The provider has no stored key.
    #[must_use]
    pub fn needs_password_setup() -> Self {
        Self::new(WalletErrorKind::NeedsPasswordSetup, "NEEDS_PASSWORD_SETUP")
    }

    /// The provider has a stored key that must be unlocked.
    #[must_use]
    pub fn needs_password_unlock() -> Self {
        Self::new(WalletErrorKind::NeedsPasswordUnlock, "NEEDS_PASSWORD_UNLOCK")
    }

    /// No account is connected.
    #[must_use]
    pub fn not_connected() -> Self {
        Self::new(WalletErrorKind::NotConnected, "No account selected")
    }

    /// Unsupported chain switch target.
    #[must_use]
    pub fn unsupported_chain(requested: impl fmt::Display, supported: u64) -> Self {
        Self::new(
            WalletErrorKind::UnsupportedChain,
            format!("unsupported chain {requested}: only chain id {supported} is available"),
        )
    }

    /// Unsupported RPC method.
    #[must_use]
    pub fn unsupported_method(method: impl fmt::Display) -> Self {
        Self::new(
            WalletErrorKind::UnsupportedMethod,
            format!("unsupported method: {method}"),
        )
    }

    /// Create a configuration error.
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(WalletErrorKind::Config, message)
    }

    /// Prefix the message with context while keeping the kind.
    #[must_use]
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{context}: {}", self.message);
        self
    }

    /// Check if this is a retryable error.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// EIP-1193 numeric code for this error.
    #[must_use]
    pub const fn code(&self) -> i64 {
        self.kind.provider_code()
    }
}

impl fmt::Display for WalletError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WalletError {}

impl From<serde_json::Error> for WalletError {
    fn from(err: serde_json::Error) -> Self {
        Self::storage(format!("serialization error: {err}"))
    }
}

impl From<std::io::Error> for WalletError {
    fn from(err: std::io::Error) -> Self {
        Self::storage(format!("I/O error: {err}"))
    }
}

impl From<tokio::task::JoinError> for WalletError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::crypto(format!("background task failed: {err}"))
    }
}

/// Error type for the key/value store backends.
///
/// Converted into [`WalletErrorKind::Storage`] at the wallet boundary.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StoreError {
    /// IO error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend refused the write (quota, disabled storage, ...).
    #[error("[{backend}] {message}")]
    Backend {
        /// Backend identifier (e.g., `"memory"`, `"file"`).
        backend: &'static str,
        /// Human-readable error description.
        message: String,
    },
}

impl StoreError {
    /// Creates a [`Backend`](Self::Backend) error for the given backend.
    #[must_use]
    pub fn backend(backend: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            backend,
            message: message.into(),
        }
    }
}

impl From<StoreError> for WalletError {
    fn from(err: StoreError) -> Self {
        Self::storage(format!("storage error: {err}"))
    }
}

/// Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decryption_error_is_ambiguous() {
        let err = WalletError::decryption();
        assert_eq!(err.kind, WalletErrorKind::Decryption);
        assert_eq!(err.to_string(), DECRYPTION_FAILED);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_provider_codes() {
        assert_eq!(WalletError::needs_password_setup().code(), 4100);
        assert_eq!(WalletError::unsupported_method("eth_foo").code(), 4200);
        assert_eq!(WalletError::not_connected().code(), 4900);
        assert_eq!(WalletError::unsupported_chain("0x1", 1337).code(), 4902);
    }

    #[test]
    fn test_network_errors_retryable() {
        assert!(WalletError::network("timeout").is_retryable());
        assert!(!WalletError::network_fatal("rejected").is_retryable());
    }

    #[test]
    fn test_context_keeps_kind() {
        let err = WalletError::not_found("wallet").context("login failed");
        assert_eq!(err.kind, WalletErrorKind::NotFound);
        assert_eq!(err.message, "login failed: wallet");
    }

    #[test]
    fn test_store_error_converts_to_storage() {
        let err: WalletError = StoreError::backend("memory", "quota exceeded").into();
        assert_eq!(err.kind, WalletErrorKind::Storage);
        assert!(err.message.contains("quota exceeded"));
    }
}
