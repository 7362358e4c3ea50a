/*
[INPUT]:  JSON-RPC style requests and provider event subscriptions
[OUTPUT]: Injected wallet provider abstraction and discovery records
[POS]:    Wallet layer - provider integration seam (EIP-1193 / EIP-6963 shaped)
[UPDATE]: When adding provider methods or event kinds
*/

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ProviderError;
use crate::wallet::observer::{Listener, ListenerId};

pub const REQUEST_ACCOUNTS: &str = "eth_requestAccounts";
pub const CHAIN_ID: &str = "eth_chainId";
pub const SIGN_TYPED_DATA_V4: &str = "eth_signTypedData_v4";

/// Provider request `{method, params}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcRequest {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderEventKind {
    AccountsChanged,
    ChainChanged,
    Disconnect,
}

impl ProviderEventKind {
    pub const ALL: [ProviderEventKind; 3] = [
        ProviderEventKind::AccountsChanged,
        ProviderEventKind::ChainChanged,
        ProviderEventKind::Disconnect,
    ];

    /// Event name on the provider's `on`/`removeListener` surface
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderEventKind::AccountsChanged => "accountsChanged",
            ProviderEventKind::ChainChanged => "chainChanged",
            ProviderEventKind::Disconnect => "disconnect",
        }
    }
}

/// Event emitted by a provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderEvent {
    AccountsChanged(Vec<String>),
    ChainChanged(String),
    Disconnect,
}

impl ProviderEvent {
    pub fn kind(&self) -> ProviderEventKind {
        match self {
            ProviderEvent::AccountsChanged(_) => ProviderEventKind::AccountsChanged,
            ProviderEvent::ChainChanged(_) => ProviderEventKind::ChainChanged,
            ProviderEvent::Disconnect => ProviderEventKind::Disconnect,
        }
    }
}

/// Injected signing provider
///
/// Requests may suspend for as long as the wallet waits on its user; no
/// timeout is applied here.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request(&self, request: RpcRequest) -> Result<Value, ProviderError>;

    /// Attach a listener for one event kind
    fn on(&self, event: ProviderEventKind, listener: Listener<ProviderEvent>) -> ListenerId;

    /// Detach a listener previously returned by [`WalletProvider::on`]
    fn remove_listener(&self, event: ProviderEventKind, id: ListenerId);
}

/// Metadata carried by a provider announcement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub uuid: String,
    pub name: String,
    pub icon: String,
    pub rdns: String,
}

impl ProviderInfo {
    /// Info with a freshly generated uuid
    pub fn new(name: impl Into<String>, icon: impl Into<String>, rdns: impl Into<String>) -> Self {
        Self {
            uuid: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            icon: icon.into(),
            rdns: rdns.into(),
        }
    }

    pub fn with_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.uuid = uuid.into();
        self
    }
}

/// Discovered provider: announcement info plus its handle
#[derive(Clone)]
pub struct ProviderRecord {
    pub info: ProviderInfo,
    pub provider: Arc<dyn WalletProvider>,
}

impl ProviderRecord {
    pub fn new(info: ProviderInfo, provider: Arc<dyn WalletProvider>) -> Self {
        Self { info, provider }
    }

    pub fn uuid(&self) -> &str {
        &self.info.uuid
    }
}

impl std::fmt::Debug for ProviderRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRecord")
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

impl PartialEq for ProviderRecord {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info && Arc::ptr_eq(&self.provider, &other.provider)
    }
}
