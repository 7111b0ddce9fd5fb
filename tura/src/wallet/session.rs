//! Login sessions with a fixed lifetime.
//!
//! A session is written to the ephemeral store as
//! `base64(JSON({address, password, expires, created}))`, timestamps in
//! milliseconds since the Unix epoch. Reading a session after `expires`
//! deletes it and reports no session.

use alloy::primitives::Address;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::error::{Result, WalletError};
use crate::store::SharedStore;
use crate::units::format_address;

/// Ephemeral store key of the session record.
pub const SESSION_KEY: &str = "tura_session";

/// An unlocked wallet session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct Session {
    /// Unlocked wallet.
    #[zeroize(skip)]
    pub address: Address,
    password: String,
    /// Expiry instant.
    #[zeroize(skip)]
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires: DateTime<Utc>,
    /// Creation instant.
    #[zeroize(skip)]
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created: DateTime<Utc>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("expires", &self.expires)
            .field("created", &self.created)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Password that unlocked the wallet.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// Whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires
    }

    /// Time left before expiry, zero once expired.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        (self.expires - Utc::now()).max(Duration::zero())
    }

    fn encode(&self) -> Result<Zeroizing<String>> {
        let json = Zeroizing::new(serde_json::to_vec(self)?);
        Ok(Zeroizing::new(STANDARD.encode(json.as_slice())))
    }

    fn decode(raw: &str) -> Option<Self> {
        let json = Zeroizing::new(STANDARD.decode(raw.trim()).ok()?);
        serde_json::from_slice(&json).ok()
    }
}

/// Issues, reads and clears the single active session.
#[derive(Debug, Clone)]
pub struct SessionManager {
    store: SharedStore,
    ttl: Duration,
}

impl SessionManager {
    /// Create a session manager over an ephemeral `store`.
    #[must_use]
    pub const fn new(store: SharedStore, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Session lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Start a session for `address`, replacing any previous one.
    pub async fn start(&self, address: Address, password: &str) -> Result<Session> {
        self.start_at(address, password, Utc::now()).await
    }

    async fn start_at(
        &self,
        address: Address,
        password: &str,
        now: DateTime<Utc>,
    ) -> Result<Session> {
        if self.ttl <= Duration::zero() {
            return Err(WalletError::config("session ttl must be positive"));
        }
        let now = now.trunc_subsecs(3);
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or_else(|| WalletError::config("session ttl is out of range"))?;
        let session = Session {
            address,
            password: password.to_owned(),
            expires,
            created: now,
        };
        self.store.set(SESSION_KEY, &session.encode()?).await?;
        info!(
            address = %format_address(&address),
            expires = %session.expires,
            "session started"
        );
        Ok(session)
    }

    /// Read the live session, purging it if it has expired.
    pub async fn current(&self) -> Result<Option<Session>> {
        self.current_at(Utc::now()).await
    }

    async fn current_at(&self, now: DateTime<Utc>) -> Result<Option<Session>> {
        let Some(raw) = self.store.get(SESSION_KEY).await? else {
            return Ok(None);
        };
        let Some(session) = Session::decode(&raw) else {
            warn!("discarding unreadable session record");
            self.store.remove(SESSION_KEY).await?;
            return Ok(None);
        };
        if session.is_expired_at(now) {
            debug!(address = %format_address(&session.address), "session expired");
            self.store.remove(SESSION_KEY).await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// End the session.
    pub async fn clear(&self) -> Result<()> {
        self.store.remove(SESSION_KEY).await?;
        debug!("session cleared");
        Ok(())
    }
}
