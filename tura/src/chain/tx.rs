//! Legacy transaction construction and local signing.

use alloy::consensus::{SignableTransaction, TxEnvelope, TxLegacy};
use alloy::eips::eip2718::Encodable2718;
use alloy::network::TxSignerSync;
use alloy::primitives::{Address, B256, Bytes, TxKind, U256};
use serde::Serialize;
use tracing::info;

use super::ChainClient;
use crate::crypto::PrivateKey;
use crate::error::{Result, WalletError};

/// Gas limit of a plain value transfer.
pub const TRANSFER_GAS_LIMIT: u64 = 21_000;

/// What the caller wants to send.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferRequest {
    /// Recipient.
    pub to: Address,
    /// Value in base units.
    pub value: U256,
    /// Call data. Empty for a plain transfer.
    pub input: Bytes,
    /// Explicit gas limit. Required when `input` is not empty.
    pub gas_limit: Option<u64>,
}

impl TransferRequest {
    /// A plain value transfer.
    #[must_use]
    pub fn transfer(to: Address, value: U256) -> Self {
        Self {
            to,
            value,
            ..Self::default()
        }
    }

    fn resolve_gas_limit(&self) -> Result<u64> {
        match self.gas_limit {
            Some(0) => Err(WalletError::validation("gas limit must be positive")),
            Some(limit) => Ok(limit),
            None if self.input.is_empty() => Ok(TRANSFER_GAS_LIMIT),
            None => Err(WalletError::validation(
                "gas limit is required for transactions with call data",
            )),
        }
    }
}

/// An unsigned EIP-155 legacy transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    /// Chain id bound into the signature.
    pub chain_id: u64,
    /// Sender nonce.
    pub nonce: u64,
    /// Gas price in base units.
    pub gas_price: u128,
    /// Gas limit.
    pub gas_limit: u64,
    /// Recipient.
    pub to: Address,
    /// Value in base units.
    pub value: U256,
    /// Call data.
    pub input: Bytes,
}

/// A signed transaction ready for `eth_sendRawTransaction`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    /// Transaction hash.
    pub hash: B256,
    /// EIP-2718 encoding.
    pub raw: Bytes,
}

impl LegacyTransaction {
    /// Upper bound on what the sender pays: value plus the full gas budget.
    #[must_use]
    pub fn max_cost(&self) -> U256 {
        self.value
            .saturating_add(U256::from(self.gas_price).saturating_mul(U256::from(self.gas_limit)))
    }

    /// Sign with `key`.
    pub fn sign(&self, key: &PrivateKey) -> Result<SignedTransaction> {
        let mut tx = TxLegacy {
            chain_id: Some(self.chain_id),
            nonce: self.nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: TxKind::Call(self.to),
            value: self.value,
            input: self.input.clone(),
        };
        let signature = key
            .signer()?
            .sign_transaction_sync(&mut tx)
            .map_err(|e| WalletError::crypto(format!("transaction signing failed: {e}")))?;
        let signed = tx.into_signed(signature);
        let hash = *signed.hash();
        let raw = TxEnvelope::Legacy(signed).encoded_2718();
        Ok(SignedTransaction {
            hash,
            raw: raw.into(),
        })
    }
}

/// Outcome of a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentTransaction {
    /// Transaction hash.
    pub hash: B256,
    /// Sender.
    pub from: Address,
    /// Recipient.
    pub to: Address,
    /// Value in base units.
    pub value: U256,
    /// Nonce used.
    pub nonce: u64,
}

/// Fill nonce and gas price, check funds, sign locally and submit.
///
/// The balance must cover `value + gas_price * gas_limit`. Submission is
/// attempted once.
pub async fn sign_and_send(
    chain: &dyn ChainClient,
    key: &PrivateKey,
    chain_id: u64,
    request: TransferRequest,
) -> Result<SentTransaction> {
    let gas_limit = request.resolve_gas_limit()?;
    let from = key.address();

    let nonce = chain.transaction_count(from).await?;
    let gas_price = chain.gas_price().await?;
    let tx = LegacyTransaction {
        chain_id,
        nonce,
        gas_price,
        gas_limit,
        to: request.to,
        value: request.value,
        input: request.input,
    };

    let balance = chain.balance(from).await?;
    let required = tx.max_cost();
    if balance < required {
        return Err(WalletError::insufficient_funds(format!(
            "insufficient funds: balance {balance} is below the required {required} (value plus gas)"
        )));
    }

    let signed = tx.sign(key)?;
    let hash = chain.send_raw_transaction(signed.raw).await?;
    if hash != signed.hash {
        return Err(WalletError::network_fatal(format!(
            "node reported hash {hash} for transaction {}",
            signed.hash
        )));
    }

    info!(
        tx_hash = %hash,
        from = %from,
        to = %tx.to,
        nonce,
        "transaction sent"
    );
    Ok(SentTransaction {
        hash,
        from,
        to: tx.to,
        value: tx.value,
        nonce,
    })
}
