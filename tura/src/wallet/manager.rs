//! The wallet facade.

use std::sync::Arc;

use alloy::primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::session::{Session, SessionManager};
use super::storage::{WalletData, WalletStorage};
use crate::chain::{SentTransaction, SharedChain, TransferRequest, sign_and_send};
use crate::config::{ChainConfig, SessionConfig, TuraConfig};
use crate::crypto::{KeyManager, PrivateKey};
use crate::error::{Result, WalletError, WalletErrorKind};
use crate::store::{MemoryStore, SharedStore};
use crate::units::{format_address, format_amount, parse_address, parse_amount};

/// Minimum accepted wallet password length.
pub const MIN_PASSWORD_LEN: usize = 8;
/// Number of words in a generated recovery phrase.
pub const MNEMONIC_WORDS: usize = 12;

/// Result of [`WalletManager::create_wallet`].
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedWallet {
    /// New wallet address.
    pub address: Address,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Recovery phrase. Shown once, never persisted.
    #[serde(serialize_with = "serialize_secret")]
    pub mnemonic: Zeroizing<String>,
}

impl std::fmt::Debug for CreatedWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedWallet")
            .field("address", &self.address)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

fn serialize_secret<S: serde::Serializer>(
    value: &Zeroizing<String>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(value)
}

/// Address and creation time of a stored wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WalletInfo {
    /// Wallet address.
    pub address: Address,
    /// Creation or import time.
    pub created_at: DateTime<Utc>,
}

/// Builder for [`WalletManager`].
///
/// Only the chain client is required. Both stores default to in-memory
/// backends and the configuration to [`TuraConfig::default`].
#[derive(Debug, Default)]
pub struct WalletManagerBuilder {
    config: Option<TuraConfig>,
    store: Option<SharedStore>,
    session_store: Option<SharedStore>,
    chain: Option<SharedChain>,
}

impl WalletManagerBuilder {
    /// Set the configuration.
    #[must_use]
    pub fn config(mut self, config: TuraConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the persistent store for wallet records.
    #[must_use]
    pub fn store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the ephemeral store for the session.
    #[must_use]
    pub fn session_store(mut self, store: SharedStore) -> Self {
        self.session_store = Some(store);
        self
    }

    /// Set the chain client.
    #[must_use]
    pub fn chain(mut self, chain: SharedChain) -> Self {
        self.chain = Some(chain);
        self
    }

    /// Build the [`WalletManager`].
    pub fn build(self) -> Result<WalletManager> {
        let config = self.config.unwrap_or_default();
        config.validate()?;
        let chain = self
            .chain
            .ok_or_else(|| WalletError::config("a chain client is required"))?;
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));
        let session_store = self
            .session_store
            .unwrap_or_else(|| Arc::new(MemoryStore::new()));

        Ok(WalletManager {
            storage: WalletStorage::new(store),
            sessions: SessionManager::new(session_store, config.session.ttl()),
            chain,
            config,
        })
    }
}

/// Entry point for wallet lifecycle, login sessions, balances and sends.
///
/// # Examples
///
/// ```rust,ignore
/// let manager = WalletManager::builder()
///     .config(TuraConfig::default().with_env_overrides()?)
///     .store(Arc::new(FileStore::default_path()))
///     .chain(Arc::new(HttpChainClient::connect(url, RpcConfig::default()).await?))
///     .build()?;
///
/// let created = manager.create_wallet("correct horse").await?;
/// println!("back up: {}", created.mnemonic.as_str());
/// ```
#[derive(Debug, Clone)]
pub struct WalletManager {
    config: TuraConfig,
    storage: WalletStorage,
    sessions: SessionManager,
    chain: SharedChain,
}

impl WalletManager {
    /// Create a builder.
    #[must_use]
    pub fn builder() -> WalletManagerBuilder {
        WalletManagerBuilder::default()
    }

    /// Chain settings.
    #[must_use]
    pub const fn chain_config(&self) -> &ChainConfig {
        &self.config.chain
    }

    /// Session settings.
    #[must_use]
    pub const fn session_config(&self) -> &SessionConfig {
        &self.config.session
    }

    /// Full configuration.
    #[must_use]
    pub const fn config(&self) -> &TuraConfig {
        &self.config
    }

    /// The chain client.
    #[must_use]
    pub fn chain(&self) -> &SharedChain {
        &self.chain
    }

    /// The wallet record storage.
    #[must_use]
    pub const fn storage(&self) -> &WalletStorage {
        &self.storage
    }

    /// Generate a new wallet from a fresh 12-word recovery phrase.
    ///
    /// The record is sealed under `password`, becomes the current wallet
    /// and a session is started.
    pub async fn create_wallet(&self, password: &str) -> Result<CreatedWallet> {
        validate_password(password)?;
        let hd = kobe::Wallet::generate(MNEMONIC_WORDS, None)
            .map_err(|e| WalletError::crypto(format!("mnemonic generation failed: {e}")))?;
        let key = derive_first_account(&hd)?;
        let mnemonic = Zeroizing::new(hd.mnemonic().to_owned());

        let info = self.persist(&key, password).await?;
        info!(address = %format_address(&info.address), "wallet created");
        Ok(CreatedWallet {
            address: info.address,
            created_at: info.created_at,
            mnemonic,
        })
    }

    /// Restore a wallet from its recovery phrase, sealing it under
    /// `password`.
    pub async fn import_wallet(&self, mnemonic: &str, password: &str) -> Result<WalletInfo> {
        validate_password(password)?;
        let phrase = mnemonic.split_whitespace().collect::<Vec<_>>().join(" ");
        let hd = kobe::Wallet::from_mnemonic(&phrase, None)
            .map_err(|e| WalletError::validation(format!("invalid recovery phrase: {e}")))?;
        let key = derive_first_account(&hd)?;

        let info = self.persist(&key, password).await?;
        info!(address = %format_address(&info.address), "wallet imported from recovery phrase");
        Ok(info)
    }

    /// Import a raw private key, sealing it under `password`.
    pub async fn import_private_key(&self, private_key: &str, password: &str) -> Result<WalletInfo> {
        validate_password(password)?;
        let key = KeyManager::parse_private_key(private_key)?;

        let info = self.persist(&key, password).await?;
        info!(address = %format_address(&info.address), "wallet imported from private key");
        Ok(info)
    }

    async fn persist(&self, key: &PrivateKey, password: &str) -> Result<WalletInfo> {
        let address = key.address();
        let created_at = Utc::now();
        let data = WalletData {
            address: format_address(&address),
            private_key: key.to_hex().to_string(),
            created_at,
        };
        self.storage.save_wallet(&data, password).await?;
        self.storage.set_current_address(&address).await?;
        self.sessions.start(address, password).await?;
        Ok(WalletInfo {
            address,
            created_at,
        })
    }

    /// Unlock `address` with `password` and start a session.
    ///
    /// A wrong password leaves any existing session untouched and writes
    /// no new one.
    pub async fn login(&self, address: &str, password: &str) -> Result<Session> {
        let address = parse_address(address)?;
        if password.is_empty() {
            return Err(WalletError::validation("password must not be empty"));
        }
        self.unlock(&address, password).await?;
        self.storage.set_current_address(&address).await?;
        let session = self.sessions.start(address, password).await?;
        info!(address = %format_address(&address), "logged in");
        Ok(session)
    }

    /// [`login`](Self::login) to the current wallet.
    pub async fn login_current(&self, password: &str) -> Result<Session> {
        let address = self
            .storage
            .current_address()
            .await?
            .ok_or_else(|| WalletError::not_found("no current wallet"))?;
        self.login(&format_address(&address), password).await
    }

    /// End the session and forget the current wallet pointer.
    ///
    /// Wallet records stay in the store.
    pub async fn logout(&self) -> Result<()> {
        self.sessions.clear().await?;
        self.storage.clear_current_address().await?;
        info!("logged out");
        Ok(())
    }

    /// The live session, if any. An expired session is purged.
    pub async fn session(&self) -> Result<Option<Session>> {
        self.sessions.current().await
    }

    /// The current wallet pointer.
    pub async fn current_address(&self) -> Result<Option<Address>> {
        self.storage.current_address().await
    }

    /// Whether a record exists for `address`.
    pub async fn has_wallet(&self, address: &str) -> Result<bool> {
        self.storage.has_wallet(&parse_address(address)?).await
    }

    /// Decrypted record of `address`.
    pub async fn wallet_data(&self, address: &str, password: &str) -> Result<WalletData> {
        let address = parse_address(address)?;
        let (data, _) = self.unlock(&address, password).await?;
        Ok(data)
    }

    /// Decrypt the record of `address` and check it belongs to it.
    async fn unlock(&self, address: &Address, password: &str) -> Result<(WalletData, PrivateKey)> {
        let data = match self.storage.load_wallet(address, password).await {
            Ok(data) => data,
            Err(e) if e.kind == WalletErrorKind::Decryption => {
                debug!(address = %format_address(address), "wallet record did not open");
                return Err(WalletError::invalid_password());
            }
            Err(e) => return Err(e),
        };
        let key = KeyManager::parse_private_key(&data.private_key).map_err(|_| {
            warn!(address = %format_address(address), "wallet record holds an invalid key");
            WalletError::invalid_password()
        })?;
        if key.address() != *address {
            warn!(address = %format_address(address), "wallet record belongs to another address");
            return Err(WalletError::invalid_password());
        }
        Ok((data, key))
    }

    /// Balance of `address` as a decimal string in the native currency.
    pub async fn get_balance(&self, address: &str) -> Result<String> {
        let address = parse_address(address)?;
        let balance = self.balance_of(address).await?;
        Ok(format_amount(balance, self.config.chain.native_currency.decimals))
    }

    /// Balance of `address` in base units.
    pub async fn balance_of(&self, address: Address) -> Result<U256> {
        self.chain.balance(address).await
    }

    /// Send `amount` of the native currency from `from` to `to`.
    ///
    /// Addresses and amount are validated before any decryption or network
    /// request. The sender's record must open with `password`.
    pub async fn send_transaction(
        &self,
        from: &str,
        to: &str,
        amount: &str,
        password: &str,
    ) -> Result<SentTransaction> {
        let from = parse_address(from)?;
        let to = parse_address(to)?;
        let value = parse_amount(amount, self.config.chain.native_currency.decimals)?;
        if password.is_empty() {
            return Err(WalletError::validation("password must not be empty"));
        }

        let (_, key) = self.unlock(&from, password).await?;
        sign_and_send(
            self.chain.as_ref(),
            &key,
            self.config.chain.chain_id,
            TransferRequest::transfer(to, value),
        )
        .await
    }

    /// Send from the wallet of the live session.
    pub async fn send_with_session(&self, to: &str, amount: &str) -> Result<SentTransaction> {
        let session = self
            .session()
            .await?
            .ok_or_else(|| WalletError::new(WalletErrorKind::NotConnected, "not logged in"))?;
        self.send_transaction(
            &format_address(&session.address),
            to,
            amount,
            session.password(),
        )
        .await
    }
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(WalletError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// Key at `m/44'/60'/0'/0/0`.
fn derive_first_account(hd: &kobe::Wallet) -> Result<PrivateKey> {
    let derived = kobe_eth::Deriver::new(hd)
        .derive(0)
        .map_err(|e| WalletError::crypto(format!("key derivation failed: {e}")))?;
    KeyManager::parse_private_key(&derived.private_key_hex)
}
