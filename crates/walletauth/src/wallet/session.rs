/*
[INPUT]:  Provider registry, session store and provider events
[OUTPUT]: Connected provider/address state, typed-data signatures, change notifications
[POS]:    Wallet layer - connect / disconnect / reconnect state machine
[UPDATE]: When session transitions, persisted keys or event reactions change
*/

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::error::{Result, WalletError};
use crate::types::addresses_match;
use crate::wallet::observer::{Listener, ListenerId, Observers, Subscription, lock};
use crate::wallet::provider::{
    CHAIN_ID, ProviderEvent, ProviderEventKind, ProviderRecord, REQUEST_ACCOUNTS, RpcRequest,
    SIGN_TYPED_DATA_V4,
};
use crate::wallet::registry::ProviderRegistry;
use crate::wallet::store::SessionStore;

/// Store key holding the last connected address
pub const STORAGE_ADDRESS_KEY: &str = "walletAddress";
/// Store key holding the uuid of the last connected provider
pub const STORAGE_PROVIDER_KEY: &str = "walletProviderUuid";

pub const DEFAULT_RECONNECT_GRACE: Duration = Duration::from_millis(500);

/// Session tuning
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long `reconnect` waits once for late provider announcements
    pub reconnect_grace: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_grace: DEFAULT_RECONNECT_GRACE,
        }
    }
}

#[derive(Default)]
struct SessionState {
    selected: Option<ProviderRecord>,
    address: Option<String>,
    subscriptions: Vec<(ProviderEventKind, ListenerId)>,
    // Bumped on every transition; provider listeners from older
    // connections compare against it and go quiet.
    epoch: u64,
}

struct SessionInner {
    registry: Arc<ProviderRegistry>,
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
    state: Mutex<SessionState>,
    address_listeners: Observers<Option<String>>,
    provider_listeners: Observers<Option<ProviderRecord>>,
}

/// Wallet session over one selected provider
///
/// Disconnected until `connect` succeeds; Connected holds exactly one
/// provider, one address and live provider listeners. `address` and
/// `selected_provider` are always set and cleared together.
///
/// All mutations go through one mutex that is never held across an await
/// or while notifying. A caller that abandons a pending `connect` does not
/// cancel it: a late provider answer still completes the transition, and
/// `disconnect` resets it.
#[derive(Clone)]
pub struct WalletSession {
    inner: Arc<SessionInner>,
}

impl WalletSession {
    pub fn new(registry: Arc<ProviderRegistry>, store: Arc<dyn SessionStore>) -> Self {
        Self::with_config(registry, store, SessionConfig::default())
    }

    pub fn with_config(
        registry: Arc<ProviderRegistry>,
        store: Arc<dyn SessionStore>,
        config: SessionConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                registry,
                store,
                config,
                state: Mutex::new(SessionState::default()),
                address_listeners: Observers::new(),
                provider_listeners: Observers::new(),
            }),
        }
    }

    pub fn address(&self) -> Option<String> {
        lock(&self.inner.state).address.clone()
    }

    pub fn selected_provider(&self) -> Option<ProviderRecord> {
        lock(&self.inner.state).selected.clone()
    }

    pub fn is_connected(&self) -> bool {
        lock(&self.inner.state).selected.is_some()
    }

    /// Snapshot of the discovered providers
    pub fn providers(&self) -> Vec<ProviderRecord> {
        self.inner.registry.get_providers()
    }

    /// Connect to `provider` and select its first account
    ///
    /// A rejected request or an empty account list fails with
    /// `ConnectionFailed` and leaves the session untouched. So does a
    /// connect overtaken by another `connect` or `disconnect` before it
    /// commits; the later transition wins.
    pub async fn connect(&self, provider: &ProviderRecord) -> Result<String> {
        info!(uuid = %provider.uuid(), name = %provider.info.name, "connecting wallet provider");

        let response = provider
            .provider
            .request(RpcRequest::new(REQUEST_ACCOUNTS, Vec::new()))
            .await
            .map_err(|e| {
                warn!(uuid = %provider.uuid(), error = %e, "account request rejected");
                WalletError::ConnectionFailed {
                    reason: e.to_string(),
                }
            })?;
        let accounts: Vec<String> =
            serde_json::from_value(response).map_err(|e| WalletError::ConnectionFailed {
                reason: format!("malformed account list: {e}"),
            })?;
        let Some(address) = accounts.into_iter().next() else {
            warn!(uuid = %provider.uuid(), "provider returned no accounts");
            return Err(WalletError::ConnectionFailed {
                reason: "provider returned no accounts".to_string(),
            });
        };

        let (previous, epoch) = {
            let mut state = lock(&self.inner.state);
            state.epoch += 1;
            (detach_state(&mut state), state.epoch)
        };
        if let Some((record, subscriptions)) = previous {
            remove_listeners(&record, subscriptions);
        }

        let subscriptions = self.attach_listeners(provider, epoch);
        let committed = {
            let mut state = lock(&self.inner.state);
            if state.epoch == epoch {
                state.selected = Some(provider.clone());
                state.address = Some(address.clone());
                state.subscriptions = subscriptions;
                self.persist(&address, provider.uuid());
                None
            } else {
                Some(subscriptions)
            }
        };
        // Another connect or a disconnect ran while listeners were attached
        if let Some(subscriptions) = committed {
            remove_listeners(provider, subscriptions);
            warn!(uuid = %provider.uuid(), "connection superseded before it completed");
            return Err(WalletError::ConnectionFailed {
                reason: "superseded by a concurrent connect or disconnect".to_string(),
            });
        }

        info!(uuid = %provider.uuid(), address = %address, "wallet connected");
        self.inner.address_listeners.notify(&Some(address.clone()));
        self.inner.provider_listeners.notify(&Some(provider.clone()));

        Ok(address)
    }

    /// Drop the connection; safe to call while disconnected
    pub fn disconnect(&self) {
        let previous = {
            let mut state = lock(&self.inner.state);
            state.epoch += 1;
            for key in [STORAGE_ADDRESS_KEY, STORAGE_PROVIDER_KEY] {
                if let Err(err) = self.inner.store.remove(key) {
                    warn!(key, error = %err, "failed to clear persisted session");
                }
            }
            detach_state(&mut state)
        };
        if let Some((record, subscriptions)) = previous {
            remove_listeners(&record, subscriptions);
            info!(uuid = %record.uuid(), "wallet disconnected");
        }

        self.inner.address_listeners.notify(&None);
        self.inner.provider_listeners.notify(&None);
    }

    /// Restore the persisted session, if any
    ///
    /// The persisted address is not trusted: the full `connect` handshake
    /// runs again and the provider's current account wins.
    pub async fn reconnect(&self) -> Result<Option<String>> {
        let Some(uuid) = self.inner.store.get(STORAGE_PROVIDER_KEY)? else {
            debug!("no persisted wallet session");
            return Ok(None);
        };
        let cached_address = self.inner.store.get(STORAGE_ADDRESS_KEY)?;

        if self.inner.registry.is_empty() {
            debug!(
                grace_ms = self.inner.config.reconnect_grace.as_millis() as u64,
                "waiting for provider announcements"
            );
            self.inner
                .registry
                .wait_for_providers(self.inner.config.reconnect_grace)
                .await;
        }

        let Some(provider) = self.inner.registry.find(&uuid) else {
            warn!(uuid = %uuid, "persisted wallet provider not found");
            return Err(WalletError::UnknownProvider { uuid });
        };

        let address = self.connect(&provider).await?;
        if cached_address.as_deref() != Some(address.as_str()) {
            info!(
                cached = cached_address.as_deref().unwrap_or_default(),
                current = %address,
                "wallet account changed while disconnected"
            );
        }
        Ok(Some(address))
    }

    /// Ask the selected provider to sign an EIP-712 payload
    pub async fn sign_typed_data<T: Serialize + ?Sized>(&self, payload: &T) -> Result<String> {
        let (provider, address) = self.active()?;
        let payload = serde_json::to_string(payload)?;

        let response = provider
            .provider
            .request(RpcRequest::new(
                SIGN_TYPED_DATA_V4,
                vec![json!(address), json!(payload)],
            ))
            .await?;

        match response {
            Value::String(signature) => Ok(signature),
            other => Err(WalletError::InvalidResponse(format!(
                "expected signature string, got {other}"
            ))),
        }
    }

    /// Chain id reported by the selected provider
    pub async fn get_chain_id(&self) -> Result<u64> {
        let (provider, _) = self.active()?;
        let response = provider
            .provider
            .request(RpcRequest::new(CHAIN_ID, Vec::new()))
            .await?;

        let hex = response.as_str().ok_or_else(|| {
            WalletError::InvalidResponse(format!("chain id not a string: {response}"))
        })?;
        parse_chain_id(hex)
    }

    pub fn on_address_change(&self, listener: Listener<Option<String>>) -> Subscription {
        self.inner.address_listeners.subscribe(listener)
    }

    pub fn on_provider_change(&self, listener: Listener<Option<ProviderRecord>>) -> Subscription {
        self.inner.provider_listeners.subscribe(listener)
    }

    /// Listen for newly discovered providers
    pub fn on_provider_list_change(&self, listener: Listener<ProviderRecord>) -> Subscription {
        self.inner.registry.on_provider_list_change(listener)
    }

    fn active(&self) -> Result<(ProviderRecord, String)> {
        let state = lock(&self.inner.state);
        match (&state.selected, &state.address) {
            (Some(provider), Some(address)) => Ok((provider.clone(), address.clone())),
            _ => Err(WalletError::NoActiveSession),
        }
    }

    fn attach_listeners(
        &self,
        provider: &ProviderRecord,
        epoch: u64,
    ) -> Vec<(ProviderEventKind, ListenerId)> {
        ProviderEventKind::ALL
            .into_iter()
            .map(|kind| {
                let weak: Weak<SessionInner> = Arc::downgrade(&self.inner);
                let listener: Listener<ProviderEvent> = Arc::new(move |event: &ProviderEvent| {
                    if let Some(inner) = weak.upgrade() {
                        WalletSession { inner }.handle_event(epoch, event);
                    }
                });
                (kind, provider.provider.on(kind, listener))
            })
            .collect()
    }

    fn handle_event(&self, epoch: u64, event: &ProviderEvent) {
        let current = {
            let state = lock(&self.inner.state);
            state.epoch == epoch && state.selected.is_some()
        };
        if !current {
            debug!(event = event.kind().as_str(), "ignoring event from stale connection");
            return;
        }

        match event {
            ProviderEvent::AccountsChanged(accounts) => match accounts.first() {
                None => {
                    info!("wallet exposed no accounts; disconnecting");
                    self.disconnect();
                }
                Some(first) => self.switch_address(epoch, first),
            },
            ProviderEvent::ChainChanged(chain) => {
                debug!(chain = %chain, "wallet chain changed");
                let address = self.address();
                self.inner.address_listeners.notify(&address);
            }
            ProviderEvent::Disconnect => {
                info!("wallet provider disconnected");
                self.disconnect();
            }
        }
    }

    fn switch_address(&self, epoch: u64, next: &str) {
        let changed = {
            let mut state = lock(&self.inner.state);
            let same = state
                .address
                .as_deref()
                .is_some_and(|current| addresses_match(current, next));
            if state.epoch != epoch || same {
                false
            } else {
                state.address = Some(next.to_string());
                if let Err(err) = self.inner.store.set(STORAGE_ADDRESS_KEY, next) {
                    warn!(error = %err, "failed to persist wallet address");
                }
                true
            }
        };
        if !changed {
            return;
        }

        info!(address = %next, "wallet account changed");
        self.inner.address_listeners.notify(&Some(next.to_string()));
    }

    fn persist(&self, address: &str, provider_uuid: &str) {
        for (key, value) in [
            (STORAGE_ADDRESS_KEY, address),
            (STORAGE_PROVIDER_KEY, provider_uuid),
        ] {
            if let Err(err) = self.inner.store.set(key, value) {
                warn!(key, error = %err, "failed to persist wallet session");
            }
        }
    }
}

impl std::fmt::Debug for WalletSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = lock(&self.inner.state);
        f.debug_struct("WalletSession")
            .field("address", &state.address)
            .field("provider", &state.selected.as_ref().map(|p| p.uuid().to_string()))
            .finish()
    }
}

type Detached = (ProviderRecord, Vec<(ProviderEventKind, ListenerId)>);

fn detach_state(state: &mut SessionState) -> Option<Detached> {
    state.address = None;
    let subscriptions = std::mem::take(&mut state.subscriptions);
    state.selected.take().map(|record| (record, subscriptions))
}

fn remove_listeners(record: &ProviderRecord, subscriptions: Vec<(ProviderEventKind, ListenerId)>) {
    for (kind, id) in subscriptions {
        record.provider.remove_listener(kind, id);
    }
}

fn parse_chain_id(hex: &str) -> Result<u64> {
    let digits = hex
        .strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex);
    u64::from_str_radix(digits, 16)
        .map_err(|e| WalletError::InvalidResponse(format!("invalid chain id {hex}: {e}")))
}
