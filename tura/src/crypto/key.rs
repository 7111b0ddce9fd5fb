//! secp256k1 private keys.

use alloy::primitives::{Address, B256, hex};
use alloy::signers::local::PrivateKeySigner;
use zeroize::Zeroizing;

use crate::error::{Result, WalletError};

/// Order `n` of the secp256k1 group, big-endian.
pub const SECP256K1_ORDER: [u8; 32] =
    hex!("FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141");

/// Length of a normalized private key string (`0x` + 64 hex digits).
pub const PRIVATE_KEY_HEX_LEN: usize = 66;

/// A validated secp256k1 private key.
///
/// Construction guarantees the scalar lies in `(0, n)` and yields an
/// address. The bytes are wiped when the value is dropped, and `Debug`
/// only shows the derived address.
#[derive(Clone)]
pub struct PrivateKey {
    bytes: Zeroizing<[u8; 32]>,
    address: Address,
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

impl PartialEq for PrivateKey {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.as_slice() == other.bytes.as_slice()
    }
}

impl Eq for PrivateKey {}

impl PrivateKey {
    /// Parse a hex private key, with or without the `0x` prefix.
    pub fn parse(input: &str) -> Result<Self> {
        let digits = input
            .strip_prefix("0x")
            .or_else(|| input.strip_prefix("0X"))
            .unwrap_or(input);

        if digits.len() != PRIVATE_KEY_HEX_LEN - 2 {
            return Err(WalletError::validation(
                "invalid private key: expected 32 bytes (64 hex characters)",
            ));
        }
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(WalletError::validation(
                "invalid private key: contains non-hex characters",
            ));
        }

        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(digits, bytes.as_mut_slice())
            .map_err(|_| WalletError::validation("invalid private key: malformed hex"))?;
        Self::from_bytes(&bytes)
    }

    /// Build a key from raw big-endian scalar bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self> {
        if !in_curve_range(bytes) {
            return Err(WalletError::validation(
                "invalid private key: value out of range for secp256k1",
            ));
        }
        let signer = PrivateKeySigner::from_bytes(&B256::from(*bytes)).map_err(|_| {
            WalletError::validation("invalid private key: cannot derive an address")
        })?;
        Ok(Self {
            bytes: Zeroizing::new(*bytes),
            address: signer.address(),
        })
    }

    /// The address derived from this key.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Normalized `0x`-prefixed lower-case hex form.
    #[must_use]
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.bytes.as_slice())))
    }

    /// Build a local signer for this key.
    pub fn signer(&self) -> Result<PrivateKeySigner> {
        PrivateKeySigner::from_bytes(&B256::from(*self.bytes))
            .map_err(|_| WalletError::crypto("failed to build signer"))
    }
}

/// Check `0 < scalar < n`.
///
/// Big-endian arrays of equal length compare lexicographically in the same
/// order as the integers they encode.
fn in_curve_range(bytes: &[u8; 32]) -> bool {
    bytes.iter().any(|b| *b != 0) && *bytes < SECP256K1_ORDER
}
