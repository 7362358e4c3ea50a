/*
[INPUT]:  Provider announcements arriving over an announcement channel
[OUTPUT]: Deduplicated, first-seen ordered provider list with change notifications
[POS]:    Wallet layer - provider discovery (announce / request broadcast)
[UPDATE]: When the discovery protocol or dedup key changes
*/

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, info};

use crate::wallet::observer::{Listener, Observers, Subscription, lock};
use crate::wallet::provider::ProviderRecord;

/// Process-wide discovery bus
///
/// Carries two messages: provider announcements and requests for providers
/// to announce themselves again.
pub trait AnnouncementChannel: Send + Sync {
    /// Broadcast one provider announcement
    fn announce(&self, record: ProviderRecord);

    fn on_announce(&self, listener: Listener<ProviderRecord>) -> Subscription;

    /// Ask every listening provider to re-announce
    fn request_announcements(&self);

    fn on_request(&self, listener: Listener<()>) -> Subscription;
}

/// Synchronous in-process announcement channel
#[derive(Default)]
pub struct InProcessChannel {
    announcements: Observers<ProviderRecord>,
    requests: Observers<()>,
}

impl InProcessChannel {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnnouncementChannel for InProcessChannel {
    fn announce(&self, record: ProviderRecord) {
        self.announcements.notify(&record);
    }

    fn on_announce(&self, listener: Listener<ProviderRecord>) -> Subscription {
        self.announcements.subscribe(listener)
    }

    fn request_announcements(&self) {
        self.requests.notify(&());
    }

    fn on_request(&self, listener: Listener<()>) -> Subscription {
        self.requests.subscribe(listener)
    }
}

/// Announce `record` now and again on every request broadcast
///
/// Dispose the returned subscription to stop answering requests.
pub fn announce_on(channel: &Arc<dyn AnnouncementChannel>, record: ProviderRecord) -> Subscription {
    let weak = Arc::downgrade(channel);
    let announced = record.clone();
    let subscription = channel.on_request(Arc::new(move |_: &()| {
        if let Some(channel) = weak.upgrade() {
            channel.announce(announced.clone());
        }
    }));
    channel.announce(record);
    subscription
}

struct RegistryInner {
    providers: Mutex<Vec<ProviderRecord>>,
    listeners: Observers<ProviderRecord>,
    count: watch::Sender<usize>,
}

impl RegistryInner {
    fn add(&self, record: &ProviderRecord) {
        {
            let mut providers = lock(&self.providers);
            if providers.iter().any(|p| p.uuid() == record.uuid()) {
                debug!(uuid = %record.uuid(), "duplicate provider announcement ignored");
                return;
            }
            providers.push(record.clone());
            self.count.send_replace(providers.len());
        }

        info!(
            uuid = %record.uuid(),
            name = %record.info.name,
            rdns = %record.info.rdns,
            "wallet provider discovered"
        );
        self.listeners.notify(record);
    }
}

/// Registry of discovered wallet providers
///
/// Records are only ever appended; uuid is the dedup key and first-seen
/// order is preserved. Discovery itself has no timeout.
pub struct ProviderRegistry {
    inner: Arc<RegistryInner>,
    announcements: Option<Subscription>,
}

impl ProviderRegistry {
    /// Subscribe to announcements, then request them
    pub fn start(channel: &dyn AnnouncementChannel) -> Self {
        let (count, _) = watch::channel(0);
        let inner = Arc::new(RegistryInner {
            providers: Mutex::new(Vec::new()),
            listeners: Observers::new(),
            count,
        });

        let weak = Arc::downgrade(&inner);
        let announcements = channel.on_announce(Arc::new(move |record: &ProviderRecord| {
            if let Some(inner) = weak.upgrade() {
                inner.add(record);
            }
        }));
        channel.request_announcements();

        Self {
            inner,
            announcements: Some(announcements),
        }
    }

    /// Snapshot of the discovered providers
    pub fn get_providers(&self) -> Vec<ProviderRecord> {
        lock(&self.inner.providers).clone()
    }

    pub fn find(&self, uuid: &str) -> Option<ProviderRecord> {
        lock(&self.inner.providers)
            .iter()
            .find(|p| p.uuid() == uuid)
            .cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.providers).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Listen for newly added providers
    pub fn on_provider_list_change(&self, listener: Listener<ProviderRecord>) -> Subscription {
        self.inner.listeners.subscribe(listener)
    }

    /// Wait until at least one provider is known, or `timeout` elapses
    pub async fn wait_for_providers(&self, timeout: Duration) -> bool {
        let mut count = self.inner.count.subscribe();
        tokio::time::timeout(timeout, async move { count.wait_for(|n| *n > 0).await.is_ok() })
            .await
            .unwrap_or(false)
    }
}

impl Drop for ProviderRegistry {
    fn drop(&mut self) {
        if let Some(subscription) = self.announcements.take() {
            subscription.dispose();
        }
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &*lock(&self.inner.providers))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wallet::local::LocalWalletProvider;
    use crate::wallet::provider::ProviderInfo;

    fn record(uuid: &str, name: &str) -> ProviderRecord {
        let provider = Arc::new(LocalWalletProvider::random(1, 1));
        ProviderRecord::new(
            ProviderInfo::new(name, "data:image/svg+xml,", "io.example").with_uuid(uuid),
            provider,
        )
    }

    #[test]
    fn test_duplicate_uuid_kept_once() {
        let channel = InProcessChannel::new();
        let registry = ProviderRegistry::start(&channel);

        channel.announce(record("p1", "first"));
        channel.announce(record("p1", "second"));

        let providers = registry.get_providers();
        assert_eq!(providers.len(), 1);
        assert_eq!(providers[0].info.name, "first");
    }

    #[test]
    fn test_first_seen_order() {
        let channel = InProcessChannel::new();
        let registry = ProviderRegistry::start(&channel);

        for uuid in ["b", "a", "c", "a", "b"] {
            channel.announce(record(uuid, uuid));
        }

        let uuids: Vec<_> = registry
            .get_providers()
            .iter()
            .map(|p| p.uuid().to_string())
            .collect();
        assert_eq!(uuids, ["b", "a", "c"]);
    }

    #[test]
    fn test_start_requests_announcements() {
        let channel: Arc<dyn AnnouncementChannel> = Arc::new(InProcessChannel::new());
        let _early = announce_on(&channel, record("early", "Early Wallet"));

        let registry = ProviderRegistry::start(channel.as_ref());

        assert_eq!(registry.len(), 1);
        assert!(registry.find("early").is_some());
        assert!(registry.find("missing").is_none());
    }

    #[test]
    fn test_list_change_fires_only_for_new_records() {
        let channel = InProcessChannel::new();
        let registry = ProviderRegistry::start(&channel);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let _sub = registry.on_provider_list_change(Arc::new(move |r: &ProviderRecord| {
            lock(&sink).push(r.uuid().to_string());
        }));

        channel.announce(record("p1", "one"));
        channel.announce(record("p1", "one again"));
        channel.announce(record("p2", "two"));

        assert_eq!(*lock(&seen), vec!["p1", "p2"]);
    }

    #[test]
    fn test_snapshot_is_detached() {
        let channel = InProcessChannel::new();
        let registry = ProviderRegistry::start(&channel);
        channel.announce(record("p1", "one"));

        let mut snapshot = registry.get_providers();
        snapshot.clear();
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_wait_for_providers() {
        let channel = Arc::new(InProcessChannel::new());
        let registry = ProviderRegistry::start(channel.as_ref());
        assert!(!registry.wait_for_providers(Duration::from_millis(20)).await);

        let late = channel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            late.announce(record("late", "Late Wallet"));
        });
        assert!(registry.wait_for_providers(Duration::from_secs(2)).await);
    }
}
