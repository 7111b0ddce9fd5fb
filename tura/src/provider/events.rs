//! Provider event subscriptions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use alloy::primitives::Address;
use serde_json::{Value, json};

use crate::units::format_address;

/// Event names a listener can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// The exposed accounts changed.
    AccountsChanged,
    /// The active chain changed.
    ChainChanged,
    /// The provider became connected.
    Connect,
    /// The provider disconnected.
    Disconnect,
}

impl EventKind {
    /// EIP-1193 event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccountsChanged => "accountsChanged",
            Self::ChainChanged => "chainChanged",
            Self::Connect => "connect",
            Self::Disconnect => "disconnect",
        }
    }

    /// Parse an EIP-1193 event name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "accountsChanged" => Some(Self::AccountsChanged),
            "chainChanged" => Some(Self::ChainChanged),
            "connect" => Some(Self::Connect),
            "disconnect" => Some(Self::Disconnect),
            _ => None,
        }
    }
}

/// An event with its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    /// New account list; empty when disconnected.
    AccountsChanged(Vec<Address>),
    /// New chain id, `0x` hex.
    ChainChanged(String),
    /// Connected to the chain with this `0x` hex id.
    Connect {
        /// Chain id, `0x` hex.
        chain_id: String,
    },
    /// Disconnected.
    Disconnect,
}

impl ProviderEvent {
    /// Kind of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::AccountsChanged(_) => EventKind::AccountsChanged,
            Self::ChainChanged(_) => EventKind::ChainChanged,
            Self::Connect { .. } => EventKind::Connect,
            Self::Disconnect => EventKind::Disconnect,
        }
    }

    /// JSON payload as delivered to EIP-1193 listeners.
    #[must_use]
    pub fn payload(&self) -> Value {
        match self {
            Self::AccountsChanged(accounts) => {
                Value::Array(accounts.iter().map(|a| Value::String(format_address(a))).collect())
            }
            Self::ChainChanged(chain_id) => Value::String(chain_id.clone()),
            Self::Connect { chain_id } => json!({ "chainId": chain_id }),
            Self::Disconnect => json!({ "code": 4900, "message": "disconnected" }),
        }
    }
}

/// Handle returned by [`EventEmitter::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Event callback.
pub type Listener = Arc<dyn Fn(&ProviderEvent) + Send + Sync>;

/// Synchronous, ordered event fan-out.
///
/// Listeners run on the emitting thread in registration order. The list is
/// snapshotted before dispatch, so a listener may subscribe or unsubscribe
/// without deadlocking; the change applies from the next emit.
#[derive(Default)]
pub struct EventEmitter {
    next_id: AtomicU64,
    listeners: RwLock<Vec<(ListenerId, EventKind, Listener)>>,
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        f.debug_struct("EventEmitter")
            .field("listeners", &count)
            .finish()
    }
}

impl EventEmitter {
    /// Create an emitter with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `listener` to `kind`.
    pub fn on(
        &self,
        kind: EventKind,
        listener: impl Fn(&ProviderEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, kind, Arc::new(listener)));
        id
    }

    /// Unsubscribe. Returns whether the listener was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _, _)| *existing != id);
        listeners.len() != before
    }

    /// Number of listeners subscribed to `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .count()
    }

    /// Deliver `event` to its subscribers.
    pub fn emit(&self, event: &ProviderEvent) {
        let kind = event.kind();
        let targets: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(_, k, _)| *k == kind)
            .map(|(_, _, listener)| Arc::clone(listener))
            .collect();
        for listener in targets {
            listener(event);
        }
    }
}
