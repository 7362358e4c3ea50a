/*
[INPUT]:  Provider announcements, provider events and a session store
[OUTPUT]: Provider discovery and the connected wallet session
[POS]:    Wallet layer - client side provider management
[UPDATE]: When adding provider kinds or session behaviour
*/

pub mod local;
pub mod observer;
pub mod provider;
pub mod registry;
pub mod session;
pub mod store;

pub use local::LocalWalletProvider;
pub use observer::{Listener, ListenerId, Subscription};
pub use provider::{
    ProviderEvent, ProviderEventKind, ProviderInfo, ProviderRecord, RpcRequest, WalletProvider,
};
pub use registry::{AnnouncementChannel, InProcessChannel, ProviderRegistry, announce_on};
pub use session::{
    STORAGE_ADDRESS_KEY, STORAGE_PROVIDER_KEY, SessionConfig, WalletSession,
};
pub use store::{JsonFileStore, MemoryStore, SessionStore};
