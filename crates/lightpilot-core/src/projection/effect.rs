//! Side effects triggered by state changes.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use lightpilot_protocols::{StateStore, StoreKey};

/// Hook run after a transition that changed the state.
///
/// Runs while the projection is locked, so implementations must not block or
/// dispatch back into the same projection.
pub trait StateEffect<S>: Send + Sync {
    fn on_change(&self, state: &S);
}

enum Command {
    Write(Value),
    Flush(oneshot::Sender<()>),
}

/// Writes every changed state to the store under one key.
///
/// Writes go through a single background task, so they land in transition
/// order. Failures are logged and dropped.
pub struct PersistEffect {
    key: StoreKey,
    tx: mpsc::UnboundedSender<Command>,
}

impl PersistEffect {
    /// Start the writer task. Must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn StateStore>, key: StoreKey) -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Command::Write(value) => {
                        if let Err(e) = store.set(key, value).await {
                            warn!("Failed to persist {}: {}", key, e);
                        } else {
                            debug!("Persisted {}", key);
                        }
                    }
                    Command::Flush(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });

        Arc::new(Self { key, tx })
    }

    pub fn key(&self) -> StoreKey {
        self.key
    }

    /// Wait until every write scheduled so far has completed.
    pub async fn flush(&self) {
        let (ack, done) = oneshot::channel();
        if self.tx.send(Command::Flush(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

impl<S: Serialize> StateEffect<S> for PersistEffect {
    fn on_change(&self, state: &S) {
        match serde_json::to_value(state) {
            Ok(value) => {
                if self.tx.send(Command::Write(value)).is_err() {
                    warn!("Writer for {} stopped, change not persisted", self.key);
                }
            }
            Err(e) => warn!("Failed to serialize {}: {}", self.key, e),
        }
    }
}
