/*
[INPUT]:  EVM private keys (hex strings) and provider RPC requests
[OUTPUT]: Accounts, chain id and EIP-712 signatures; provider events
[POS]:    Wallet layer - in-process wallet provider backed by local keys
[UPDATE]: When supported RPC methods or signature encoding change
*/

use std::str::FromStr;
use std::sync::Mutex;

use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::debug;

use crate::error::{ProviderError, WalletError};
use crate::types::{TypedPayload, addresses_match};
use crate::wallet::observer::{Listener, ListenerId, Observers, lock};
use crate::wallet::provider::{
    CHAIN_ID, ProviderEvent, ProviderEventKind, REQUEST_ACCOUNTS, RpcRequest, SIGN_TYPED_DATA_V4,
    WalletProvider,
};

const ACCOUNTS: &str = "eth_accounts";

struct LocalState {
    // First entry is the selected account
    signers: Vec<PrivateKeySigner>,
    chain_id: u64,
    locked: bool,
    rejecting: bool,
}

/// Wallet provider holding private keys in process
///
/// Behaves like an injected browser wallet: `switch_account`, `lock`,
/// `switch_chain` and `disconnect` emit the matching provider events.
pub struct LocalWalletProvider {
    state: Mutex<LocalState>,
    accounts_changed: Observers<ProviderEvent>,
    chain_changed: Observers<ProviderEvent>,
    disconnected: Observers<ProviderEvent>,
}

impl LocalWalletProvider {
    fn with_signers(signers: Vec<PrivateKeySigner>, chain_id: u64) -> Self {
        Self {
            state: Mutex::new(LocalState {
                signers,
                chain_id,
                locked: false,
                rejecting: false,
            }),
            accounts_changed: Observers::new(),
            chain_changed: Observers::new(),
            disconnected: Observers::new(),
        }
    }

    /// Create a provider from hex-encoded private keys
    ///
    /// Supports both "0x"-prefixed and non-prefixed hex strings.
    pub fn from_private_keys<S: AsRef<str>>(
        keys: &[S],
        chain_id: u64,
    ) -> Result<Self, WalletError> {
        let signers = keys
            .iter()
            .map(|key| {
                let key = key.as_ref().trim();
                let key = key.strip_prefix("0x").unwrap_or(key);
                PrivateKeySigner::from_str(key).map_err(|e| WalletError::ConnectionFailed {
                    reason: format!("Invalid EVM private key: {e}"),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_signers(signers, chain_id))
    }

    /// Provider with `count` freshly generated accounts
    pub fn random(count: usize, chain_id: u64) -> Self {
        let signers = (0..count).map(|_| PrivateKeySigner::random()).collect();
        Self::with_signers(signers, chain_id)
    }

    /// Checksummed addresses, selected account first
    pub fn addresses(&self) -> Vec<String> {
        let state = lock(&self.state);
        exposed_addresses(&state)
    }

    pub fn chain_id(&self) -> u64 {
        lock(&self.state).chain_id
    }

    /// Make account requests fail as if the user declined
    pub fn set_rejecting(&self, rejecting: bool) {
        lock(&self.state).rejecting = rejecting;
    }

    /// Select another account and emit `accountsChanged`
    pub fn switch_account(&self, index: usize) {
        let accounts = {
            let mut state = lock(&self.state);
            if index >= state.signers.len() {
                return;
            }
            let signer = state.signers.remove(index);
            state.signers.insert(0, signer);
            exposed_addresses(&state)
        };
        self.emit(ProviderEvent::AccountsChanged(accounts));
    }

    /// Lock the wallet; it exposes no accounts until unlocked
    pub fn lock(&self) {
        lock(&self.state).locked = true;
        self.emit(ProviderEvent::AccountsChanged(Vec::new()));
    }

    pub fn unlock(&self) {
        let accounts = {
            let mut state = lock(&self.state);
            state.locked = false;
            exposed_addresses(&state)
        };
        self.emit(ProviderEvent::AccountsChanged(accounts));
    }

    pub fn switch_chain(&self, chain_id: u64) {
        lock(&self.state).chain_id = chain_id;
        self.emit(ProviderEvent::ChainChanged(format!("{chain_id:#x}")));
    }

    pub fn disconnect(&self) {
        self.emit(ProviderEvent::Disconnect);
    }

    /// Number of attached listeners across all event kinds
    pub fn listener_count(&self) -> usize {
        self.accounts_changed.len() + self.chain_changed.len() + self.disconnected.len()
    }

    /// Dispatch an event to the listeners of its kind
    pub fn emit(&self, event: ProviderEvent) {
        debug!(event = event.kind().as_str(), "local provider event");
        self.observers(event.kind()).notify(&event);
    }

    fn observers(&self, kind: ProviderEventKind) -> &Observers<ProviderEvent> {
        match kind {
            ProviderEventKind::AccountsChanged => &self.accounts_changed,
            ProviderEventKind::ChainChanged => &self.chain_changed,
            ProviderEventKind::Disconnect => &self.disconnected,
        }
    }

    fn sign_typed_data(&self, params: &[Value]) -> Result<Value, ProviderError> {
        let address = params
            .first()
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::invalid_params("missing signer address"))?;
        let payload_json = params
            .get(1)
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::invalid_params("missing typed data"))?;
        let payload: TypedPayload = serde_json::from_str(payload_json)
            .map_err(|e| ProviderError::invalid_params(format!("malformed typed data: {e}")))?;
        let hash = payload
            .signing_hash()
            .map_err(|e| ProviderError::invalid_params(e.to_string()))?;

        let state = lock(&self.state);
        if state.locked {
            return Err(ProviderError::unauthorized("wallet is locked"));
        }
        let signer = state
            .signers
            .iter()
            .find(|s| addresses_match(&s.address().to_checksum(None), address))
            .ok_or_else(|| ProviderError::unauthorized(format!("unknown account {address}")))?;
        let signature = signer
            .sign_hash_sync(&hash)
            .map_err(|e| ProviderError::new(-32603, format!("signing failed: {e}")))?;

        // alloy's Signature as_bytes() returns [r, s, v]
        Ok(json!(format!("0x{}", hex::encode(signature.as_bytes()))))
    }
}

fn exposed_addresses(state: &LocalState) -> Vec<String> {
    if state.locked {
        return Vec::new();
    }
    state
        .signers
        .iter()
        .map(|s| s.address().to_checksum(None))
        .collect()
}

#[async_trait]
impl WalletProvider for LocalWalletProvider {
    async fn request(&self, request: RpcRequest) -> Result<Value, ProviderError> {
        match request.method.as_str() {
            REQUEST_ACCOUNTS => {
                let state = lock(&self.state);
                if state.rejecting {
                    return Err(ProviderError::user_rejected());
                }
                Ok(json!(exposed_addresses(&state)))
            }
            ACCOUNTS => Ok(json!(exposed_addresses(&lock(&self.state)))),
            CHAIN_ID => Ok(json!(format!("{:#x}", self.chain_id()))),
            SIGN_TYPED_DATA_V4 => self.sign_typed_data(&request.params),
            other => Err(ProviderError::unsupported_method(other)),
        }
    }

    fn on(&self, event: ProviderEventKind, listener: Listener<ProviderEvent>) -> ListenerId {
        self.observers(event).insert(listener)
    }

    fn remove_listener(&self, event: ProviderEventKind, id: ListenerId) {
        self.observers(event).remove(id);
    }
}
