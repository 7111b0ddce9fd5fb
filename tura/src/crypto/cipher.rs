//! Password-based authenticated encryption.
//!
//! A 256-bit key is derived from the password with PBKDF2-HMAC-SHA256
//! ([`PBKDF2_ITERATIONS`] rounds, 16-byte salt) and used with AES-256-GCM
//! (12-byte IV). Salt and IV are drawn fresh for every call to [`seal`],
//! so the same plaintext never encrypts to the same record twice.
//!
//! Every way [`open`] can fail maps to [`WalletError::decryption`]. The
//! precise reason is only logged at debug level.

use std::num::NonZeroU32;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use ring::pbkdf2;
use serde::{Deserialize, Serialize};
use tracing::debug;
use zeroize::Zeroizing;

use super::random::{RandomSource, random_array};
use crate::error::{Result, WalletError};

/// PBKDF2 iteration count.
pub const PBKDF2_ITERATIONS: u32 = 100_000;
/// Salt length in bytes.
pub const SALT_LEN: usize = 16;
/// AES-GCM IV length in bytes.
pub const IV_LEN: usize = 12;
/// Derived key length in bytes.
pub const KEY_LEN: usize = 32;
/// AES-GCM authentication tag length in bytes.
pub const TAG_LEN: usize = 16;

/// A password-encrypted secret, base64 fields ready for storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedKeyRecord {
    /// AES-GCM ciphertext with appended tag.
    #[serde(rename = "encryptedKey")]
    pub ciphertext: String,
    /// PBKDF2 salt.
    pub salt: String,
    /// AES-GCM IV.
    pub iv: String,
}

/// Why a record could not be opened. Internal only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum OpenFailure {
    Base64,
    SaltLength,
    IvLength,
    CiphertextLength,
    Authentication,
}

/// Decoded binary form of an [`EncryptedKeyRecord`].
struct DecodedRecord {
    ciphertext: Vec<u8>,
    salt: [u8; SALT_LEN],
    iv: [u8; IV_LEN],
}

impl EncryptedKeyRecord {
    /// Check that the fields decode to well-formed lengths.
    ///
    /// This is a structural check only. It says nothing about whether any
    /// password opens the record.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.decode().is_ok()
    }

    fn decode(&self) -> std::result::Result<DecodedRecord, OpenFailure> {
        let ciphertext = STANDARD
            .decode(&self.ciphertext)
            .map_err(|_| OpenFailure::Base64)?;
        let salt = STANDARD.decode(&self.salt).map_err(|_| OpenFailure::Base64)?;
        let iv = STANDARD.decode(&self.iv).map_err(|_| OpenFailure::Base64)?;

        let salt: [u8; SALT_LEN] = salt.try_into().map_err(|_| OpenFailure::SaltLength)?;
        let iv: [u8; IV_LEN] = iv.try_into().map_err(|_| OpenFailure::IvLength)?;
        if ciphertext.len() <= TAG_LEN {
            return Err(OpenFailure::CiphertextLength);
        }
        Ok(DecodedRecord {
            ciphertext,
            salt,
            iv,
        })
    }
}

/// Derive the AES key for `password` and `salt`.
#[must_use]
pub fn derive_key(password: &str, salt: &[u8]) -> Zeroizing<[u8; KEY_LEN]> {
    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    let iterations = NonZeroU32::new(PBKDF2_ITERATIONS).unwrap_or(NonZeroU32::MIN);
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        iterations,
        salt,
        password.as_bytes(),
        key.as_mut_slice(),
    );
    key
}

fn aead_key(key: &[u8; KEY_LEN]) -> Result<LessSafeKey> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| WalletError::crypto("AES key creation failed"))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt `plaintext` under `password`.
///
/// CPU-bound: the key derivation dominates. Async callers should run this
/// on a blocking thread.
pub fn seal(
    plaintext: &[u8],
    password: &str,
    rng: &dyn RandomSource,
) -> Result<EncryptedKeyRecord> {
    if password.is_empty() {
        return Err(WalletError::validation("password must not be empty"));
    }

    let salt: [u8; SALT_LEN] = random_array(rng)?;
    let iv: [u8; IV_LEN] = random_array(rng)?;
    let key = derive_key(password, &salt);

    let nonce = Nonce::try_assume_unique_for_key(&iv)
        .map_err(|_| WalletError::crypto("invalid nonce"))?;
    let mut in_out = plaintext.to_vec();
    aead_key(&key)?
        .seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
        .map_err(|_| WalletError::crypto("encryption failed"))?;

    Ok(EncryptedKeyRecord {
        ciphertext: STANDARD.encode(&in_out),
        salt: STANDARD.encode(salt),
        iv: STANDARD.encode(iv),
    })
}

/// Decrypt `record` with `password`.
///
/// CPU-bound, see [`seal`].
pub fn open(record: &EncryptedKeyRecord, password: &str) -> Result<Zeroizing<Vec<u8>>> {
    open_detailed(record, password).map_err(|reason| {
        debug!(?reason, "record could not be opened");
        WalletError::decryption()
    })
}

pub(crate) fn open_detailed(
    record: &EncryptedKeyRecord,
    password: &str,
) -> std::result::Result<Zeroizing<Vec<u8>>, OpenFailure> {
    let decoded = record.decode()?;
    let key = derive_key(password, &decoded.salt);

    let nonce = Nonce::try_assume_unique_for_key(&decoded.iv).map_err(|_| OpenFailure::IvLength)?;
    let aead = aead_key(&key).map_err(|_| OpenFailure::Authentication)?;

    let mut in_out = Zeroizing::new(decoded.ciphertext);
    let plaintext_len = aead
        .open_in_place(nonce, Aad::empty(), in_out.as_mut_slice())
        .map_err(|_| OpenFailure::Authentication)?
        .len();
    in_out.truncate(plaintext_len);
    Ok(in_out)
}

/// [`seal`] on the blocking thread pool.
pub async fn seal_in_background(
    plaintext: Zeroizing<Vec<u8>>,
    password: &str,
    rng: Arc<dyn RandomSource>,
) -> Result<EncryptedKeyRecord> {
    let password = Zeroizing::new(password.to_owned());
    tokio::task::spawn_blocking(move || seal(&plaintext, &password, rng.as_ref())).await?
}

/// [`open`] on the blocking thread pool.
pub async fn open_in_background(
    record: EncryptedKeyRecord,
    password: &str,
) -> Result<Zeroizing<Vec<u8>>> {
    let password = Zeroizing::new(password.to_owned());
    tokio::task::spawn_blocking(move || open(&record, &password)).await?
}
