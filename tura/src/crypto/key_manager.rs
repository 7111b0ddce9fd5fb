//! Encrypted private key custody.

use std::sync::Arc;

use alloy::primitives::Address;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use super::cipher::{EncryptedKeyRecord, open_in_background, seal_in_background};
use super::key::PrivateKey;
use super::random::{RandomSource, SystemRandomSource, random_array};
use crate::error::{Result, WalletError};
use crate::store::{SharedStore, restore};

/// Store key holding the single encrypted key record.
pub const STORAGE_KEY: &str = "tura_encrypted_key";

/// How many candidates [`KeyManager::generate_private_key`] draws before
/// giving up on the random source.
const MAX_GENERATION_ATTEMPTS: usize = 8;

/// Encrypts, persists and recovers a single private key.
///
/// Key derivation runs on the blocking thread pool, so every operation
/// that touches a password is `async`.
#[derive(Debug, Clone)]
pub struct KeyManager {
    store: SharedStore,
    rng: Arc<dyn RandomSource>,
}

impl KeyManager {
    /// Create a key manager over `store` using the system CSPRNG.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self::with_random(store, Arc::new(SystemRandomSource::new()))
    }

    /// Create a key manager with an explicit random source.
    #[must_use]
    pub fn with_random(store: SharedStore, rng: Arc<dyn RandomSource>) -> Self {
        Self { store, rng }
    }

    /// Encrypt `private_key` under `password`.
    ///
    /// The key is validated and normalized to `0x` + 64 lower-case hex
    /// before encryption.
    pub async fn encrypt_key(
        &self,
        private_key: &str,
        password: &str,
    ) -> Result<EncryptedKeyRecord> {
        if password.is_empty() {
            return Err(WalletError::validation("password must not be empty"));
        }
        let key = PrivateKey::parse(private_key)?;
        self.encrypt(&key, password).await
    }

    /// Encrypt an already validated key.
    pub async fn encrypt(&self, key: &PrivateKey, password: &str) -> Result<EncryptedKeyRecord> {
        if password.is_empty() {
            return Err(WalletError::validation("password must not be empty"));
        }
        let plaintext = Zeroizing::new(key.to_hex().as_bytes().to_vec());
        seal_in_background(plaintext, password, Arc::clone(&self.rng)).await
    }

    /// Decrypt `record` with `password`.
    ///
    /// The recovered text must again be a valid private key. Every failure
    /// yields the same decryption error.
    pub async fn decrypt_key(
        &self,
        record: &EncryptedKeyRecord,
        password: &str,
    ) -> Result<PrivateKey> {
        let plaintext = open_in_background(record.clone(), password).await?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| {
            debug!("decrypted key is not UTF-8");
            WalletError::decryption()
        })?;
        PrivateKey::parse(text).map_err(|e| {
            debug!(reason = %e, "decrypted key failed validation");
            WalletError::decryption()
        })
    }

    /// Persist `record`, then read it back to confirm the write.
    ///
    /// A read-back that is missing, different or malformed puts the previous
    /// record back (or removes the entry if there was none) and fails with a
    /// storage error.
    pub async fn store_encrypted_key(&self, record: &EncryptedKeyRecord) -> Result<()> {
        if !record.is_well_formed() {
            return Err(WalletError::validation("refusing to store a malformed key record"));
        }
        let serialized = serde_json::to_string(record)?;
        let prior = self.store.get(STORAGE_KEY).await?;
        self.store.set(STORAGE_KEY, &serialized).await?;

        let verified = match self.store.get(STORAGE_KEY).await? {
            Some(raw) => serde_json::from_str::<EncryptedKeyRecord>(&raw)
                .is_ok_and(|read| read == *record && read.is_well_formed()),
            None => false,
        };
        if !verified {
            if let Err(e) = restore(self.store.as_ref(), STORAGE_KEY, prior.as_deref()).await {
                warn!(error = %e, "failed to roll back unverified key record");
            }
            return Err(WalletError::storage(
                "encrypted key could not be verified after writing",
            ));
        }

        info!(backend = self.store.backend(), "stored encrypted key");
        Ok(())
    }

    /// Load the stored record.
    ///
    /// Returns `None` when nothing is stored or the stored value is not a
    /// structurally valid record.
    pub async fn get_stored_key(&self) -> Result<Option<EncryptedKeyRecord>> {
        let Some(raw) = self.store.get(STORAGE_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<EncryptedKeyRecord>(&raw) {
            Ok(record) if record.is_well_formed() => Ok(Some(record)),
            Ok(_) => {
                warn!("stored key record has invalid field lengths");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "stored key record is not valid JSON");
                Ok(None)
            }
        }
    }

    /// Whether a usable record is stored.
    pub async fn has_stored_key(&self) -> Result<bool> {
        Ok(self.get_stored_key().await?.is_some())
    }

    /// Delete the stored record.
    pub async fn clear_stored_key(&self) -> Result<()> {
        self.store.remove(STORAGE_KEY).await?;
        info!("cleared stored key");
        Ok(())
    }

    /// Parse and validate a hex private key, with or without `0x`.
    ///
    /// The scalar must lie in `(0, n)` for secp256k1.
    pub fn parse_private_key(key: &str) -> Result<PrivateKey> {
        PrivateKey::parse(key)
    }

    /// Check that `key` is a usable secp256k1 private key.
    #[must_use]
    pub fn validate_private_key(key: &str) -> bool {
        Self::parse_private_key(key).is_ok()
    }

    /// Draw a fresh private key from the random source.
    ///
    /// Candidates outside the curve order are discarded. A source that
    /// keeps producing invalid scalars is reported as a crypto error.
    pub fn generate_private_key(&self) -> Result<PrivateKey> {
        for attempt in 1..=MAX_GENERATION_ATTEMPTS {
            let bytes = Zeroizing::new(random_array::<32>(self.rng.as_ref())?);
            match PrivateKey::from_bytes(&bytes) {
                Ok(key) => return Ok(key),
                Err(_) => debug!(attempt, "discarded out-of-range key candidate"),
            }
        }
        Err(WalletError::crypto(
            "random source failed to produce a valid private key",
        ))
    }

    /// Address controlled by `private_key`.
    pub fn address_of(private_key: &str) -> Result<Address> {
        Ok(Self::parse_private_key(private_key)?.address())
    }
}
