//! Cryptographically secure randomness.

use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{Result, WalletError};

/// Source of cryptographically secure random bytes.
///
/// Production code uses [`SystemRandomSource`]. The trait exists so key
/// generation can be exercised against a defective source.
pub trait RandomSource: Send + Sync + std::fmt::Debug {
    /// Fill `dest` entirely with random bytes.
    fn fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// Operating system CSPRNG via `ring`.
#[derive(Debug, Clone)]
pub struct SystemRandomSource {
    inner: SystemRandom,
}

impl SystemRandomSource {
    /// Create a new system random source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: SystemRandom::new(),
        }
    }
}

impl Default for SystemRandomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandomSource {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        self.inner
            .fill(dest)
            .map_err(|_| WalletError::crypto("secure random source unavailable"))
    }
}

/// Draw `N` random bytes from `rng`.
pub(crate) fn random_array<const N: usize>(rng: &dyn RandomSource) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    rng.fill(&mut out)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_random_fills() {
        let rng = SystemRandomSource::new();
        let a: [u8; 32] = random_array(&rng).unwrap();
        let b: [u8; 32] = random_array(&rng).unwrap();
        assert_ne!(a, b);
    }
}
