//! EIP-1193 style provider backed by the encrypted key store.
//!
//! The provider never caches key material. It only remembers which account
//! is connected; every signature requires the password again through
//! [`CustomProvider::unlock_and_send_transaction`].
//!
//! ```text
//! disconnected ──create_account / unlock_account──▶ connected
//!      ▲                                               │
//!      └──────────────────── disconnect ───────────────┘
//! ```

mod events;

pub use events::{EventEmitter, EventKind, Listener, ListenerId, ProviderEvent};

use std::sync::{PoisonError, RwLock};

use alloy::primitives::{Address, Bytes, U64, U256};
use alloy::rpc::types::TransactionRequest;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::chain::{SentTransaction, SharedChain, TransferRequest, sign_and_send};
use crate::config::ChainConfig;
use crate::crypto::KeyManager;
use crate::error::{Result, WalletError, WalletErrorKind};
use crate::units::{format_address, parse_address};

/// Transaction object accepted by `eth_sendTransaction`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionParams {
    /// Sender. Must be the connected account when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<Address>,
    /// Recipient.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<Address>,
    /// Value in base units, hex quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<U256>,
    /// Call data.
    #[serde(default, alias = "input", skip_serializing_if = "Option::is_none")]
    pub data: Option<Bytes>,
    /// Gas limit, hex quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas: Option<U64>,
}

/// EIP-1193 error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderRpcError {
    /// Numeric error code.
    pub code: i64,
    /// Message.
    pub message: String,
}

impl From<&WalletError> for ProviderRpcError {
    fn from(err: &WalletError) -> Self {
        Self {
            code: err.code(),
            message: err.message.clone(),
        }
    }
}

/// Request dispatcher and connection state for a single local account.
#[derive(Debug)]
pub struct CustomProvider {
    keys: KeyManager,
    chain: SharedChain,
    chain_config: ChainConfig,
    account: RwLock<Option<Address>>,
    events: EventEmitter,
}

impl CustomProvider {
    /// Create a disconnected provider.
    #[must_use]
    pub fn new(keys: KeyManager, chain: SharedChain, chain_config: ChainConfig) -> Self {
        Self {
            keys,
            chain,
            chain_config,
            account: RwLock::new(None),
            events: EventEmitter::new(),
        }
    }

    /// Whether an account is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.selected_address().is_some()
    }

    /// The connected account.
    #[must_use]
    pub fn selected_address(&self) -> Option<Address> {
        *self.account.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_account(&self, account: Option<Address>) {
        *self.account.write().unwrap_or_else(PoisonError::into_inner) = account;
    }

    /// Subscribe to `kind`.
    pub fn on(
        &self,
        kind: EventKind,
        listener: impl Fn(&ProviderEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.events.on(kind, listener)
    }

    /// Unsubscribe a listener.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.events.remove_listener(id)
    }

    /// Dispatch a JSON-RPC request.
    ///
    /// `params` is the positional parameter array; `Null` means none.
    pub async fn request(&self, method: &str, params: Value) -> Result<Value> {
        debug!(method, "provider request");
        let params = match params {
            Value::Null => Vec::new(),
            Value::Array(items) => items,
            other => vec![other],
        };

        match method {
            "eth_chainId" => Ok(Value::String(self.chain_config.chain_id_hex())),
            "net_version" => Ok(Value::String(self.chain_config.chain_id.to_string())),
            "eth_accounts" => Ok(self.accounts_value()),
            "eth_requestAccounts" => self.request_accounts().await,
            "eth_sendTransaction" => Err(if self.is_connected() {
                WalletError::needs_password_unlock()
            } else {
                WalletError::not_connected()
            }),
            "wallet_switchEthereumChain" => self.switch_chain(&params),
            "eth_getBalance" => {
                let address = address_param(&params, 0)?;
                Ok(quantity(self.chain.balance(address).await?))
            }
            "eth_getTransactionCount" => {
                let address = address_param(&params, 0)?;
                Ok(quantity(self.chain.transaction_count(address).await?))
            }
            "eth_blockNumber" => Ok(quantity(self.chain.block_number().await?)),
            "eth_gasPrice" => Ok(quantity(self.chain.gas_price().await?)),
            "eth_call" => {
                let request: TransactionRequest = param(&params, 0, "transaction")?;
                Ok(serde_json::to_value(self.chain.call(request).await?)?)
            }
            "eth_sendRawTransaction" => {
                let raw: Bytes = param(&params, 0, "raw transaction")?;
                Ok(serde_json::to_value(self.chain.send_raw_transaction(raw).await?)?)
            }
            other => Err(WalletError::unsupported_method(other)),
        }
    }

    fn accounts_value(&self) -> Value {
        match self.selected_address() {
            Some(address) => json!([format_address(&address)]),
            None => json!([]),
        }
    }

    async fn request_accounts(&self) -> Result<Value> {
        if self.is_connected() {
            return Ok(self.accounts_value());
        }
        if self.keys.has_stored_key().await? {
            Err(WalletError::needs_password_unlock())
        } else {
            Err(WalletError::needs_password_setup())
        }
    }

    fn switch_chain(&self, params: &[Value]) -> Result<Value> {
        let requested = params
            .first()
            .and_then(|p| p.get("chainId"))
            .and_then(Value::as_str)
            .ok_or_else(|| WalletError::validation("missing chainId parameter"))?;
        let parsed = requested
            .strip_prefix("0x")
            .and_then(|hex| u64::from_str_radix(hex, 16).ok());
        if parsed == Some(self.chain_config.chain_id) {
            Ok(Value::Null)
        } else {
            Err(WalletError::unsupported_chain(
                requested,
                self.chain_config.chain_id,
            ))
        }
    }

    /// Generate a key, seal it under `password`, store it and connect.
    ///
    /// Fails with [`WalletErrorKind::AlreadyExists`] when a key is stored.
    pub async fn create_account(&self, password: &str) -> Result<Address> {
        if self.keys.has_stored_key().await? {
            return Err(WalletError::already_exists(
                "an account already exists; unlock it or disconnect first",
            ));
        }
        let key = self.keys.generate_private_key()?;
        let record = self.keys.encrypt(&key, password).await?;
        self.keys.store_encrypted_key(&record).await?;

        let address = key.address();
        self.set_account(Some(address));
        info!(address = %format_address(&address), "provider account created");
        self.events
            .emit(&ProviderEvent::AccountsChanged(vec![address]));
        self.emit_connect();
        Ok(address)
    }

    /// Decrypt the stored key and connect its account.
    pub async fn unlock_account(&self, password: &str) -> Result<Address> {
        let record = self
            .keys
            .get_stored_key()
            .await?
            .ok_or_else(WalletError::needs_password_setup)?;
        let key = self
            .keys
            .decrypt_key(&record, password)
            .await
            .map_err(|_| WalletError::invalid_password())?;

        let address = key.address();
        self.set_account(Some(address));
        info!(address = %format_address(&address), "provider account unlocked");
        self.emit_connect();
        Ok(address)
    }

    /// Forget the account and delete the stored key.
    pub async fn disconnect(&self) -> Result<()> {
        self.set_account(None);
        self.keys.clear_stored_key().await?;
        info!("provider disconnected");
        self.events.emit(&ProviderEvent::AccountsChanged(Vec::new()));
        self.events.emit(&ProviderEvent::Disconnect);
        Ok(())
    }

    /// Decrypt the key, sign `tx` locally and submit it.
    pub async fn unlock_and_send_transaction(
        &self,
        tx: TransactionParams,
        password: &str,
    ) -> Result<SentTransaction> {
        let account = self.selected_address().ok_or_else(WalletError::not_connected)?;
        if tx.from.is_some_and(|from| from != account) {
            return Err(WalletError::validation(
                "transaction sender is not the connected account",
            ));
        }
        let to = tx
            .to
            .ok_or_else(|| WalletError::validation("transaction recipient is required"))?;

        let record = self
            .keys
            .get_stored_key()
            .await?
            .ok_or_else(WalletError::needs_password_setup)?;
        let key = self
            .keys
            .decrypt_key(&record, password)
            .await
            .map_err(|_| WalletError::invalid_password())?;
        if key.address() != account {
            return Err(WalletError::new(
                WalletErrorKind::NotConnected,
                "stored key does not belong to the connected account",
            ));
        }

        let request = TransferRequest {
            to,
            value: tx.value.unwrap_or_default(),
            input: tx.data.unwrap_or_default(),
            gas_limit: tx.gas.map(|gas| gas.to::<u64>()),
        };
        sign_and_send(
            self.chain.as_ref(),
            &key,
            self.chain_config.chain_id,
            request,
        )
        .await
    }

    fn emit_connect(&self) {
        self.events.emit(&ProviderEvent::Connect {
            chain_id: self.chain_config.chain_id_hex(),
        });
    }
}

fn quantity<T: std::fmt::LowerHex>(value: T) -> Value {
    Value::String(format!("{value:#x}"))
}

fn param<T: DeserializeOwned>(params: &[Value], index: usize, what: &str) -> Result<T> {
    let value = params
        .get(index)
        .cloned()
        .ok_or_else(|| WalletError::validation(format!("missing {what} parameter")))?;
    serde_json::from_value(value)
        .map_err(|e| WalletError::validation(format!("invalid {what} parameter: {e}")))
}

fn address_param(params: &[Value], index: usize) -> Result<Address> {
    let raw = params
        .get(index)
        .and_then(Value::as_str)
        .ok_or_else(|| WalletError::validation("missing address parameter"))?;
    parse_address(raw)
}
