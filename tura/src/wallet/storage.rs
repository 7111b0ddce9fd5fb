//! Password-sealed wallet records.

use std::sync::Arc;

use alloy::primitives::Address;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::crypto::cipher::{self, EncryptedKeyRecord, KEY_LEN};
use crate::crypto::{RandomSource, SystemRandomSource};
use crate::error::{Result, WalletError};
use crate::store::{SharedStore, restore};
use crate::units::{format_address, parse_address};

/// Prefix of per-address wallet record keys.
pub const WALLET_KEY_PREFIX: &str = "wallet_";
/// Key of the current wallet pointer.
pub const CURRENT_WALLET_KEY: &str = "lastWalletAddress";

/// Decrypted contents of a wallet record.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct WalletData {
    /// Lower-case `0x` address.
    pub address: String,
    /// `0x`-prefixed private key.
    pub private_key: String,
    /// When the wallet was created or imported.
    #[zeroize(skip)]
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for WalletData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletData")
            .field("address", &self.address)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// Store key for the record of `address`.
#[must_use]
pub fn wallet_key(address: &Address) -> String {
    format!("{WALLET_KEY_PREFIX}{}", format_address(address))
}

/// Derive the 256-bit encryption key for `password` and `salt`.
#[must_use]
pub fn derive_key(password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    cipher::derive_key(password, salt)
}

/// Encrypted per-address wallet records plus the current wallet pointer.
///
/// A sealed blob is `base64(JSON(EncryptedKeyRecord))` whose plaintext is
/// the JSON encoding of the payload.
#[derive(Debug, Clone)]
pub struct WalletStorage {
    store: SharedStore,
    rng: Arc<dyn RandomSource>,
}

impl WalletStorage {
    /// Create wallet storage over `store`.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self {
            store,
            rng: Arc::new(SystemRandomSource::new()),
        }
    }

    /// Seal `payload` under `password`.
    pub async fn encrypt<T: Serialize + Sync>(&self, payload: &T, password: &str) -> Result<String> {
        let plaintext = Zeroizing::new(serde_json::to_vec(payload)?);
        let record =
            cipher::seal_in_background(plaintext, password, Arc::clone(&self.rng)).await?;
        Ok(STANDARD.encode(serde_json::to_vec(&record)?))
    }

    /// Open a blob produced by [`encrypt`](Self::encrypt).
    ///
    /// Any failure, including a payload of the wrong shape, is the generic
    /// decryption error.
    pub async fn decrypt<T: DeserializeOwned>(&self, blob: &str, password: &str) -> Result<T> {
        let record = decode_blob(blob).ok_or_else(WalletError::decryption)?;
        let plaintext = cipher::open_in_background(record, password).await?;
        serde_json::from_slice(&plaintext).map_err(|e| {
            debug!(error = %e, "decrypted payload has unexpected shape");
            WalletError::decryption()
        })
    }

    /// Seal and persist `data` under its address, verifying the write.
    ///
    /// A write that does not verify is rolled back to the previous record.
    pub async fn save_wallet(&self, data: &WalletData, password: &str) -> Result<()> {
        let address = parse_address(&data.address)?;
        let key = wallet_key(&address);
        let blob = self.encrypt(data, password).await?;

        let prior = self.store.get(&key).await?;
        self.store.set(&key, &blob).await?;
        let verified = self
            .store
            .get(&key)
            .await?
            .is_some_and(|stored| stored == blob && decode_blob(&stored).is_some());
        if !verified {
            if let Err(e) = restore(self.store.as_ref(), &key, prior.as_deref()).await {
                warn!(key = %key, error = %e, "failed to roll back unverified wallet record");
            }
            return Err(WalletError::storage(
                "wallet record could not be verified after writing",
            ));
        }

        info!(address = %data.address, "saved wallet record");
        Ok(())
    }

    /// Load and decrypt the record of `address`.
    pub async fn load_wallet(&self, address: &Address, password: &str) -> Result<WalletData> {
        let blob = self
            .store
            .get(&wallet_key(address))
            .await?
            .ok_or_else(|| {
                WalletError::not_found(format!("no wallet found for {}", format_address(address)))
            })?;
        self.decrypt(&blob, password).await
    }

    /// Whether a record exists for `address`.
    pub async fn has_wallet(&self, address: &Address) -> Result<bool> {
        Ok(self.store.contains(&wallet_key(address)).await?)
    }

    /// Delete the record of `address`, and the current pointer if it
    /// points there.
    pub async fn remove_wallet(&self, address: &Address) -> Result<()> {
        self.store.remove(&wallet_key(address)).await?;
        if self.current_address().await? == Some(*address) {
            self.clear_current_address().await?;
        }
        info!(address = %format_address(address), "removed wallet record");
        Ok(())
    }

    /// Addresses with a stored record.
    pub async fn wallet_addresses(&self) -> Result<Vec<Address>> {
        let mut addresses: Vec<Address> = self
            .store
            .keys()
            .await?
            .iter()
            .filter_map(|key| key.strip_prefix(WALLET_KEY_PREFIX))
            .filter_map(|suffix| parse_address(suffix).ok())
            .collect();
        addresses.sort_unstable();
        Ok(addresses)
    }

    /// The current wallet pointer.
    pub async fn current_address(&self) -> Result<Option<Address>> {
        let Some(raw) = self.store.get(CURRENT_WALLET_KEY).await? else {
            return Ok(None);
        };
        match parse_address(&raw) {
            Ok(address) => Ok(Some(address)),
            Err(_) => {
                warn!(value = %raw, "ignoring malformed current wallet pointer");
                Ok(None)
            }
        }
    }

    /// Point the current wallet at `address`.
    pub async fn set_current_address(&self, address: &Address) -> Result<()> {
        self.store
            .set(CURRENT_WALLET_KEY, &format_address(address))
            .await?;
        Ok(())
    }

    /// Clear the current wallet pointer.
    pub async fn clear_current_address(&self) -> Result<()> {
        self.store.remove(CURRENT_WALLET_KEY).await?;
        Ok(())
    }
}

fn decode_blob(blob: &str) -> Option<EncryptedKeyRecord> {
    let json = STANDARD.decode(blob.trim()).ok()?;
    let record: EncryptedKeyRecord = serde_json::from_slice(&json).ok()?;
    record.is_well_formed().then_some(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WalletErrorKind;
    use crate::store::{MemoryStore, Store};
    use crate::test_utils::{FaultyStore, TEST_ADDRESS, TEST_KEY};

    fn wallet_data() -> WalletData {
        WalletData {
            address: TEST_ADDRESS.into(),
            private_key: TEST_KEY.into(),
            created_at: Utc::now(),
        }
    }

    fn storage() -> (WalletStorage, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (WalletStorage::new(Arc::<MemoryStore>::clone(&store)), store)
    }

    #[tokio::test]
    async fn test_encrypt_decrypt_payload() {
        let (storage, _) = storage();
        let payload = serde_json::json!({"hello": "tura", "n": 3});
        let blob = storage.encrypt(&payload, "password123").await.unwrap();

        let record: EncryptedKeyRecord =
            serde_json::from_slice(&STANDARD.decode(&blob).unwrap()).unwrap();
        assert!(record.is_well_formed());

        let opened: serde_json::Value = storage.decrypt(&blob, "password123").await.unwrap();
        assert_eq!(opened, payload);
    }

    #[tokio::test]
    async fn test_decrypt_failures_are_uniform() {
        let (storage, _) = storage();
        let blob = storage.encrypt(&"secret", "right").await.unwrap();

        let wrong = storage
            .decrypt::<String>(&blob, "wrong")
            .await
            .unwrap_err();
        let garbage = storage
            .decrypt::<String>("not base64!", "right")
            .await
            .unwrap_err();
        let wrong_shape = storage.decrypt::<u64>(&blob, "right").await.unwrap_err();

        for err in [&wrong, &garbage, &wrong_shape] {
            assert_eq!(err.kind, WalletErrorKind::Decryption);
            assert_eq!(err.message, wrong.message);
        }
    }

    #[tokio::test]
    async fn test_save_and_load_wallet() {
        let (storage, store) = storage();
        let data = wallet_data();
        storage.save_wallet(&data, "password123").await.unwrap();

        let address = parse_address(TEST_ADDRESS).unwrap();
        assert!(storage.has_wallet(&address).await.unwrap());
        assert!(
            store
                .contains(&format!("wallet_{TEST_ADDRESS}"))
                .await
                .unwrap()
        );

        let loaded = storage.load_wallet(&address, "password123").await.unwrap();
        assert_eq!(loaded, data);
        assert_eq!(storage.wallet_addresses().await.unwrap(), vec![address]);
    }

    #[tokio::test]
    async fn test_load_missing_wallet() {
        let (storage, _) = storage();
        let err = storage
            .load_wallet(&Address::repeat_byte(0x42), "pw")
            .await
            .unwrap_err();
        assert_eq!(err.kind, WalletErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_save_detects_corrupted_read_back() {
        let store = Arc::new(FaultyStore::corrupting());
        let storage = WalletStorage::new(Arc::<FaultyStore>::clone(&store));

        let err = storage
            .save_wallet(&wallet_data(), "password123")
            .await
            .unwrap_err();
        assert_eq!(err.kind, WalletErrorKind::Storage);
        assert!(store.inner().keys().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_overwrite_keeps_previous_record() {
        let store = Arc::new(FaultyStore::corrupting_write(1));
        let storage = WalletStorage::new(Arc::<FaultyStore>::clone(&store));
        let data = wallet_data();
        storage.save_wallet(&data, "first-password").await.unwrap();

        let err = storage
            .save_wallet(&data, "second-password")
            .await
            .unwrap_err();
        assert_eq!(err.kind, WalletErrorKind::Storage);

        let address = parse_address(TEST_ADDRESS).unwrap();
        let loaded = storage.load_wallet(&address, "first-password").await.unwrap();
        assert_eq!(loaded, data);
    }

    #[tokio::test]
    async fn test_current_address_pointer() {
        let (storage, store) = storage();
        assert!(storage.current_address().await.unwrap().is_none());

        let address = parse_address(TEST_ADDRESS).unwrap();
        storage.set_current_address(&address).await.unwrap();
        assert_eq!(storage.current_address().await.unwrap(), Some(address));
        assert_eq!(
            store.get(CURRENT_WALLET_KEY).await.unwrap().as_deref(),
            Some(TEST_ADDRESS)
        );

        store.set(CURRENT_WALLET_KEY, "garbage").await.unwrap();
        assert!(storage.current_address().await.unwrap().is_none());

        storage.clear_current_address().await.unwrap();
        assert!(store.get(CURRENT_WALLET_KEY).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_remove_wallet_clears_pointer() {
        let (storage, _) = storage();
        let data = wallet_data();
        let address = parse_address(&data.address).unwrap();
        storage.save_wallet(&data, "password123").await.unwrap();
        storage.set_current_address(&address).await.unwrap();

        storage.remove_wallet(&address).await.unwrap();
        assert!(!storage.has_wallet(&address).await.unwrap());
        assert!(storage.current_address().await.unwrap().is_none());
    }

    #[test]
    fn test_derive_key_is_deterministic() {
        let salt = [7u8; 16];
        assert_eq!(*derive_key("pw", &salt), *derive_key("pw", &salt));
        assert_ne!(*derive_key("pw", &salt), *derive_key("pw2", &salt));
    }

    #[test]
    fn test_wallet_data_debug_hides_key() {
        let rendered = format!("{:?}", wallet_data());
        assert!(!rendered.contains(&TEST_KEY[2..]));
    }
}
