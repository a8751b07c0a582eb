//! Loads pages into tabs and injects content agents.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use lightpilot_core::{MessageBus, TabRegistry};
use lightpilot_protocols::{TabEvent, TabId, TabStatus, Target};

use crate::content::{ContentAgent, DriveSettings};
use crate::loader::PageLoader;

/// Reacts to tab lifecycle events: every tab that starts loading gets its
/// document fetched and a fresh content agent, then is marked complete.
/// Closed tabs lose their agent.
pub struct Navigator {
    bus: Arc<MessageBus>,
    tabs: Arc<TabRegistry>,
    loader: Arc<dyn PageLoader>,
    settings: DriveSettings,
    // Latest navigation per tab. A load whose generation is no longer the
    // latest must not attach its document.
    generations: Mutex<HashMap<TabId, u64>>,
}

impl Navigator {
    pub fn new(
        bus: Arc<MessageBus>,
        tabs: Arc<TabRegistry>,
        loader: Arc<dyn PageLoader>,
        settings: DriveSettings,
    ) -> Self {
        Self {
            bus,
            tabs,
            loader,
            settings,
            generations: Mutex::new(HashMap::new()),
        }
    }

    /// Start following tab events. The subscription is taken before this
    /// returns, so tabs created afterwards are never missed.
    pub fn start(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let mut events = self.tabs.subscribe();

        tokio::spawn(async move {
            loop {
                let event = tokio::select! {
                    _ = cancel.cancelled() => break,
                    event = events.recv() => event,
                };

                match event {
                    Ok(TabEvent::Updated {
                        tab_id,
                        status: TabStatus::Loading,
                    }) => {
                        let navigator = self.clone();
                        tokio::spawn(async move { navigator.load(tab_id).await });
                    }
                    Ok(TabEvent::Updated { .. }) => {}
                    Ok(TabEvent::Removed { tab_id }) => {
                        self.generations.lock().remove(&tab_id);
                        self.bus.close_endpoint(Target::Tab(tab_id));
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Navigator missed {} tab event(s)", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!("Navigator stopped");
        })
    }

    /// Load the tab's current URL and inject an agent. A page that cannot
    /// be loaded still completes, without an agent.
    ///
    /// A load is dropped when the tab closes or navigates again before the
    /// document arrives.
    pub async fn load(&self, tab_id: TabId) {
        let Some(tab) = self.tabs.get(tab_id) else {
            return;
        };
        let generation = self.begin(tab_id);

        // A navigation tears down the previous document's agent.
        self.bus.close_endpoint(Target::Tab(tab_id));

        let loaded = self.loader.load(&tab.url).await;
        if !self.is_current(tab_id, generation) {
            debug!("Dropping stale load of {} into {}", tab.url, tab_id);
            if self.tabs.get(tab_id).is_none() {
                self.generations.lock().remove(&tab_id);
            }
            return;
        }

        match loaded {
            Ok(document) => {
                info!("Loaded {} into {}", tab.url, tab_id);
                Arc::new(ContentAgent::new(tab_id, document, self.settings.clone()))
                    .attach(&self.bus);
                // The tab may have closed while the agent was attaching.
                if self.tabs.get(tab_id).is_none() {
                    self.bus.close_endpoint(Target::Tab(tab_id));
                    return;
                }
            }
            Err(e) => warn!("Failed to load {} into {}: {}", tab.url, tab_id, e),
        }

        self.tabs.set_status(tab_id, TabStatus::Complete);
    }

    fn begin(&self, tab_id: TabId) -> u64 {
        let mut generations = self.generations.lock();
        let generation = generations.entry(tab_id).or_insert(0);
        *generation += 1;
        *generation
    }

    fn is_current(&self, tab_id: TabId, generation: u64) -> bool {
        self.tabs.get(tab_id).is_some()
            && self.generations.lock().get(&tab_id) == Some(&generation)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::document::StaticDocument;
    use crate::error::LoadError;
    use crate::loader::StaticPageLoader;
    use lightpilot_protocols::{BusError, ContextId, Message, PageDocument, Reply};

    /// Serves a new version of the page on every load. The first load is
    /// slow.
    struct SlowLoader {
        first_delay: Duration,
        loads: AtomicUsize,
    }

    impl SlowLoader {
        fn new(first_delay: Duration) -> Self {
            Self {
                first_delay,
                loads: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl PageLoader for SlowLoader {
        async fn load(&self, url: &str) -> Result<Arc<dyn PageDocument>, LoadError> {
            let version = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
            if version == 1 {
                tokio::time::sleep(self.first_delay).await;
            }
            let html = format!("<p>v{version}</p>");
            Ok(Arc::new(StaticDocument::parse(url, &html)))
        }
    }

    fn navigator(loader: StaticPageLoader) -> (Arc<MessageBus>, Arc<TabRegistry>, Arc<Navigator>) {
        let bus = Arc::new(MessageBus::new(Duration::from_secs(5)));
        let tabs = Arc::new(TabRegistry::new());
        let navigator = Arc::new(Navigator::new(
            bus.clone(),
            tabs.clone(),
            Arc::new(loader),
            DriveSettings::default(),
        ));
        (bus, tabs, navigator)
    }

    #[tokio::test]
    async fn test_created_tab_gets_agent() {
        let loader = StaticPageLoader::new();
        loader.insert(
            "https://example.com",
            Arc::new(StaticDocument::parse("https://example.com", "<p>hi</p>")),
        );
        let (bus, tabs, navigator) = navigator(loader);
        let cancel = CancellationToken::new();
        let task = navigator.start(cancel.clone());

        let (tab, listener) = tabs.create_with_listener("https://example.com/a");
        listener.wait().await.unwrap();

        assert!(bus.has_endpoint(Target::Tab(tab.id)));
        let reply = bus
            .send(ContextId::Background, Target::Tab(tab.id), Message::GetPageContent)
            .await;
        assert_eq!(reply, Reply::content("<p>hi</p>"));

        tabs.close(tab.id);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!bus.has_endpoint(Target::Tab(tab.id)));

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_unloadable_page_completes_without_agent() {
        let (bus, tabs, navigator) = navigator(StaticPageLoader::new());
        let _task = navigator.start(CancellationToken::new());

        let (tab, listener) = tabs.create_with_listener("chrome://extensions");
        let loaded = listener.wait().await.unwrap();
        assert!(loaded.is_complete());
        assert!(!bus.has_endpoint(Target::Tab(tab.id)));
    }

    #[tokio::test]
    async fn test_reload_replaces_agent() {
        let loader = StaticPageLoader::new();
        loader.insert(
            "https://example.com",
            Arc::new(StaticDocument::parse("https://example.com", "<p>v1</p>")),
        );
        let (bus, tabs, navigator) = navigator(loader);

        let tab = tabs.create("https://example.com");
        navigator.load(tab.id).await;
        navigator.load(tab.id).await;
        assert_eq!(bus.handler_count(Target::Tab(tab.id)), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tab_closed_mid_load_gets_no_agent() {
        let bus = Arc::new(MessageBus::new(Duration::from_secs(5)));
        let tabs = Arc::new(TabRegistry::new());
        let navigator = Arc::new(Navigator::new(
            bus.clone(),
            tabs.clone(),
            Arc::new(SlowLoader::new(Duration::from_millis(200))),
            DriveSettings::default(),
        ));
        let _task = navigator.clone().start(CancellationToken::new());

        let tab = tabs.create("https://example.com");
        tokio::time::sleep(Duration::from_millis(50)).await;
        tabs.close(tab.id);
        tokio::time::sleep(Duration::from_millis(400)).await;

        assert!(!bus.has_endpoint(Target::Tab(tab.id)));
        assert!(navigator.generations.lock().is_empty());
        let err = bus
            .request(ContextId::Background, Target::Tab(tab.id), Message::GetPageContent)
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::TransportUnreachable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_load_is_dropped() {
        let bus = Arc::new(MessageBus::new(Duration::from_secs(5)));
        let tabs = Arc::new(TabRegistry::new());
        let navigator = Arc::new(Navigator::new(
            bus.clone(),
            tabs.clone(),
            Arc::new(SlowLoader::new(Duration::from_millis(200))),
            DriveSettings::default(),
        ));

        let tab = tabs.create("https://example.com");
        let first = {
            let navigator = navigator.clone();
            tokio::spawn(async move { navigator.load(tab.id).await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        navigator.load(tab.id).await;
        first.await.unwrap();

        assert_eq!(bus.handler_count(Target::Tab(tab.id)), 1);
        let reply = bus
            .send(ContextId::Background, Target::Tab(tab.id), Message::GetPageContent)
            .await;
        assert_eq!(reply, Reply::content("<p>v2</p>"));
    }
}
