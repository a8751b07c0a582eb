//! Reducer-style state projections.
//!
//! A [`Projection`] owns the in-memory state of one domain. Transitions are
//! pure [`Reducer`] calls; persistence and other side effects hang off the
//! projection as [`StateEffect`]s and run only when a transition changes the
//! state.

mod app;
mod credentials;
mod effect;
mod webpage;

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use lightpilot_protocols::{StateStore, StoreKey};

pub use app::{AppAction, AppReducer, AppState, Screen, Tab, User};
pub use credentials::{XAction, XAiAction, XAiReducer, XAiState, XApiCredentials, XReducer, XState};
pub use effect::{PersistEffect, StateEffect};
pub use webpage::{follow_webpage_updates, load_webpage_content};

/// Pure state transition for one domain.
pub trait Reducer: Send + Sync + 'static {
    type State: Clone
        + Default
        + PartialEq
        + fmt::Debug
        + Serialize
        + DeserializeOwned
        + Send
        + Sync
        + 'static;
    type Action: fmt::Debug + Send + 'static;

    /// Store record the state is persisted under.
    const STORE_KEY: StoreKey;

    fn reduce(state: &Self::State, action: Self::Action) -> Self::State;
}

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("Projection for {0} is already hydrated")]
    AlreadyHydrated(StoreKey),
}

/// Start-up phase of a projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Uninitialized,
    Hydrating,
    Ready,
}

struct Inner<R: Reducer> {
    phase: Phase,
    state: R::State,
    queue: VecDeque<R::Action>,
}

/// State container for one domain.
pub struct Projection<R: Reducer> {
    inner: Mutex<Inner<R>>,
    effects: RwLock<Vec<Arc<dyn StateEffect<R::State>>>>,
    watch_tx: watch::Sender<R::State>,
}

impl<R: Reducer> Projection<R> {
    pub fn new() -> Self {
        let (watch_tx, _) = watch::channel(R::State::default());
        Self {
            inner: Mutex::new(Inner {
                phase: Phase::Uninitialized,
                state: R::State::default(),
                queue: VecDeque::new(),
            }),
            effects: RwLock::new(Vec::new()),
            watch_tx,
        }
    }

    /// Attach a side effect invoked after every state-changing transition.
    pub fn add_effect(&self, effect: Arc<dyn StateEffect<R::State>>) {
        self.effects.write().push(effect);
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().phase
    }

    pub fn state(&self) -> R::State {
        self.inner.lock().state.clone()
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<R::State> {
        self.watch_tx.subscribe()
    }

    /// Number of actions waiting for hydration to finish.
    pub fn queued(&self) -> usize {
        self.inner.lock().queue.len()
    }

    /// Apply `action`. Before hydration completes the action is queued and
    /// `false` is returned; otherwise returns whether the state changed.
    pub fn dispatch(&self, action: R::Action) -> bool {
        let mut inner = self.inner.lock();
        if inner.phase != Phase::Ready {
            debug!("Queued {:?} for {} until hydrated", action, R::STORE_KEY);
            inner.queue.push_back(action);
            return false;
        }
        self.apply(&mut inner, action)
    }

    fn apply(&self, inner: &mut Inner<R>, action: R::Action) -> bool {
        let next = R::reduce(&inner.state, action);
        if next == inner.state {
            return false;
        }

        inner.state = next;
        // Effects run under the lock so they observe transitions in order.
        for effect in self.effects.read().iter() {
            effect.on_change(&inner.state);
        }
        self.watch_tx.send_replace(inner.state.clone());
        true
    }

    /// Load the persisted record, then replay any queued actions.
    ///
    /// A missing, unreadable or undecodable record leaves the default state.
    /// Returns whether a persisted record was applied.
    pub async fn hydrate(&self, store: &dyn StateStore) -> Result<bool, ProjectionError> {
        {
            let mut inner = self.inner.lock();
            if inner.phase != Phase::Uninitialized {
                return Err(ProjectionError::AlreadyHydrated(R::STORE_KEY));
            }
            inner.phase = Phase::Hydrating;
        }

        let loaded = match store.get(R::STORE_KEY).await {
            Ok(Some(value)) => match serde_json::from_value::<R::State>(value) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!("Ignoring undecodable {} record: {}", R::STORE_KEY, e);
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!("Failed to read {}: {}", R::STORE_KEY, e);
                None
            }
        };

        let mut inner = self.inner.lock();
        let found = loaded.is_some();
        if let Some(state) = loaded {
            inner.state = state;
            self.watch_tx.send_replace(inner.state.clone());
        }
        inner.phase = Phase::Ready;

        let queued: Vec<_> = inner.queue.drain(..).collect();
        let replayed = queued.len();
        for action in queued {
            self.apply(&mut inner, action);
        }

        info!(
            "Hydrated {} (record found: {}, replayed {} action(s))",
            R::STORE_KEY,
            found,
            replayed
        );
        Ok(found)
    }
}

impl<R: Reducer> Default for Projection<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "projection_tests.rs"]
mod tests;
