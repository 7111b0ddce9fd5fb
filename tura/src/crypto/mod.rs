//! Key material and password-based encryption.
//!
//! - [`cipher`]: PBKDF2-HMAC-SHA256 key derivation and AES-256-GCM sealing.
//! - [`PrivateKey`]: validated secp256k1 scalar with zeroize-on-drop.
//! - [`KeyManager`]: encrypt, persist and recover the provider's key.

pub mod cipher;
mod key;
mod key_manager;
mod random;

pub use cipher::{EncryptedKeyRecord, derive_key};
pub use key::{PRIVATE_KEY_HEX_LEN, PrivateKey, SECP256K1_ORDER};
pub use key_manager::{KeyManager, STORAGE_KEY};
pub use random::{RandomSource, SystemRandomSource};
