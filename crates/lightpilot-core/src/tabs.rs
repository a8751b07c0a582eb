//! Tab registry owned by the background context.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info};

use lightpilot_protocols::{DriveError, TabEvent, TabHandle, TabId, TabStatus};

const EVENT_CAPACITY: usize = 64;

type ListenerMap = Arc<Mutex<HashMap<u64, Listener>>>;

struct Listener {
    tab_id: TabId,
    tx: oneshot::Sender<Result<TabHandle, DriveError>>,
}

/// Tracks open tabs, the active tab and one-shot load listeners.
pub struct TabRegistry {
    next_tab: AtomicU32,
    next_listener: AtomicU64,
    tabs: DashMap<TabId, TabHandle>,
    active: RwLock<Option<TabId>>,
    listeners: ListenerMap,
    events: broadcast::Sender<TabEvent>,
}

impl TabRegistry {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            next_tab: AtomicU32::new(1),
            next_listener: AtomicU64::new(1),
            tabs: DashMap::new(),
            active: RwLock::new(None),
            listeners: Arc::new(Mutex::new(HashMap::new())),
            events,
        }
    }

    /// Open a new, active tab in the `loading` state.
    pub fn create(&self, url: impl Into<String>) -> TabHandle {
        let handle = self.insert_tab(url);
        self.announce_loading(&handle);
        handle
    }

    /// Open a new tab with a completion listener already registered. The
    /// listener is in place before the `loading` event goes out, so a load
    /// that finishes immediately still fires it.
    pub fn create_with_listener(&self, url: impl Into<String>) -> (TabHandle, CompletionListener) {
        let handle = self.insert_tab(url);
        let listener = self.once_complete(handle.id);
        self.announce_loading(&handle);
        (handle, listener)
    }

    fn insert_tab(&self, url: impl Into<String>) -> TabHandle {
        let id = TabId(self.next_tab.fetch_add(1, Ordering::SeqCst));
        let handle = TabHandle::new(id, url);
        self.tabs.insert(id, handle.clone());
        *self.active.write() = Some(id);
        handle
    }

    fn announce_loading(&self, handle: &TabHandle) {
        info!("Created {} at {}", handle.id, handle.url);
        let _ = self.events.send(TabEvent::Updated {
            tab_id: handle.id,
            status: TabStatus::Loading,
        });
    }

    /// Record a status change. A transition to `complete` fires and removes
    /// every completion listener registered for the tab.
    pub fn set_status(&self, id: TabId, status: TabStatus) -> Option<TabHandle> {
        let handle = {
            let mut entry = self.tabs.get_mut(&id)?;
            entry.status = status;
            entry.clone()
        };

        debug!("{} is {:?}", id, status);
        let _ = self.events.send(TabEvent::Updated { tab_id: id, status });

        if status == TabStatus::Complete {
            for listener in self.take_listeners(id) {
                let _ = listener.tx.send(Ok(handle.clone()));
            }
        }
        Some(handle)
    }

    pub fn activate(&self, id: TabId) -> bool {
        if !self.tabs.contains_key(&id) {
            return false;
        }
        *self.active.write() = Some(id);
        true
    }

    pub fn active(&self) -> Option<TabHandle> {
        let id = (*self.active.read())?;
        self.get(id)
    }

    pub fn get(&self, id: TabId) -> Option<TabHandle> {
        self.tabs.get(&id).map(|h| h.clone())
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    /// Close a tab. Its completion listeners settle with
    /// [`DriveError::TabClosed`].
    pub fn close(&self, id: TabId) -> Option<TabHandle> {
        let (_, handle) = self.tabs.remove(&id)?;
        {
            let mut active = self.active.write();
            if *active == Some(id) {
                *active = None;
            }
        }

        for listener in self.take_listeners(id) {
            let _ = listener.tx.send(Err(DriveError::TabClosed(id.to_string())));
        }

        info!("Closed {}", id);
        let _ = self.events.send(TabEvent::Removed { tab_id: id });
        Some(handle)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TabEvent> {
        self.events.subscribe()
    }

    /// Register a one-shot listener for the next transition of `id` to
    /// `complete`. A tab that is already complete must finish another load
    /// before the listener fires.
    pub fn once_complete(&self, id: TabId) -> CompletionListener {
        let listener_id = self.next_listener.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();

        if self.tabs.contains_key(&id) {
            self.listeners
                .lock()
                .insert(listener_id, Listener { tab_id: id, tx });
        } else {
            let _ = tx.send(Err(DriveError::TabClosed(id.to_string())));
        }

        CompletionListener {
            tab_id: id,
            rx: Some(rx),
            handle: ListenerHandle {
                id: listener_id,
                listeners: self.listeners.clone(),
            },
        }
    }

    /// Number of live completion listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    fn take_listeners(&self, id: TabId) -> Vec<Listener> {
        let mut listeners = self.listeners.lock();
        let keys: Vec<u64> = listeners
            .iter()
            .filter(|(_, l)| l.tab_id == id)
            .map(|(k, _)| *k)
            .collect();
        keys.into_iter()
            .filter_map(|k| listeners.remove(&k))
            .collect()
    }
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Removes a completion listener from the registry.
#[derive(Clone)]
pub struct ListenerHandle {
    id: u64,
    listeners: ListenerMap,
}

impl ListenerHandle {
    /// Deregister the listener. Returns `false` if it already fired or was
    /// removed.
    pub fn remove(&self) -> bool {
        self.listeners.lock().remove(&self.id).is_some()
    }
}

/// One-shot wait for a tab to finish loading. Dropping it deregisters.
pub struct CompletionListener {
    tab_id: TabId,
    rx: Option<oneshot::Receiver<Result<TabHandle, DriveError>>>,
    handle: ListenerHandle,
}

impl CompletionListener {
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub fn handle(&self) -> ListenerHandle {
        self.handle.clone()
    }

    pub fn remove(&self) -> bool {
        self.handle.remove()
    }

    /// Wait for the tab to complete. Settles with [`DriveError::Cancelled`]
    /// when the listener is removed first.
    pub async fn wait(mut self) -> Result<TabHandle, DriveError> {
        let Some(rx) = self.rx.take() else {
            return Err(DriveError::Cancelled);
        };
        rx.await.unwrap_or(Err(DriveError::Cancelled))
    }
}

impl Drop for CompletionListener {
    fn drop(&mut self) {
        self.handle.remove();
    }
}

#[cfg(test)]
#[path = "tabs_tests.rs"]
mod tests;
