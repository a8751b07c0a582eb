//! Cross-context message bus.
//!
//! Point-to-point messages are addressed to a [`Target`] endpoint. Each
//! endpoint holds an ordered list of handlers; a message is offered to them
//! in registration order until one replies, and the first reply wins.
//! Broadcasts fan out to every subscribed UI context and collect no replies.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use lightpilot_protocols::{BusError, ContextId, Envelope, Message, Reply, Target};

const BROADCAST_CAPACITY: usize = 64;

/// What a handler did with a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A reply was sent before returning.
    Replied,
    /// The handler kept the [`Responder`] and will reply later.
    Deferred,
    /// The handler does not handle this message.
    Ignored,
}

/// Handler registered on a bus endpoint.
///
/// Handlers run on the sender's task and must not block. Work that needs to
/// await moves the [`Responder`] into a spawned task and returns
/// [`Dispatch::Deferred`].
pub trait MessageHandler: Send + Sync {
    fn handle(&self, envelope: &Envelope, responder: Responder) -> Dispatch;
}

impl<F> MessageHandler for F
where
    F: Fn(&Envelope, Responder) -> Dispatch + Send + Sync,
{
    fn handle(&self, envelope: &Envelope, responder: Responder) -> Dispatch {
        self(envelope, responder)
    }
}

enum Slot {
    Pending(oneshot::Sender<Reply>),
    Done,
    Detached,
}

/// Reply channel for a single message. Cloning shares the channel.
#[derive(Clone)]
pub struct Responder {
    action: &'static str,
    slot: Arc<Mutex<Slot>>,
    cancel: CancellationToken,
}

impl Responder {
    fn new(action: &'static str, tx: oneshot::Sender<Reply>, cancel: CancellationToken) -> Self {
        Self {
            action,
            slot: Arc::new(Mutex::new(Slot::Pending(tx))),
            cancel,
        }
    }

    fn detached(action: &'static str, cancel: CancellationToken) -> Self {
        Self {
            action,
            slot: Arc::new(Mutex::new(Slot::Detached)),
            cancel,
        }
    }

    /// Send the reply. Only the first call is delivered.
    pub fn respond(&self, reply: Reply) -> Result<(), BusError> {
        let mut slot = self.slot.lock();
        match std::mem::replace(&mut *slot, Slot::Done) {
            Slot::Pending(tx) => {
                if tx.send(reply).is_err() {
                    debug!("Reply to {} dropped, sender stopped waiting", self.action);
                }
                Ok(())
            }
            Slot::Detached => {
                *slot = Slot::Detached;
                debug!("Reply to fire-and-forget {} discarded", self.action);
                Ok(())
            }
            Slot::Done => {
                warn!("Second reply to {} ignored", self.action);
                Err(BusError::AlreadyReplied)
            }
        }
    }

    /// Whether a reply has been delivered.
    pub fn is_replied(&self) -> bool {
        matches!(*self.slot.lock(), Slot::Done)
    }

    /// Whether the sender is waiting for a reply at all.
    pub fn expects_reply(&self) -> bool {
        !matches!(*self.slot.lock(), Slot::Detached)
    }

    /// Cancelled when the endpoint that received the message is closed.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn action(&self) -> &'static str {
        self.action
    }
}

struct Endpoint {
    handlers: Vec<Arc<dyn MessageHandler>>,
    token: CancellationToken,
}

/// Addressed request/response bus with a broadcast side channel.
pub struct MessageBus {
    endpoints: DashMap<Target, Endpoint>,
    broadcast_tx: broadcast::Sender<Message>,
    reply_timeout: Duration,
}

impl MessageBus {
    pub fn new(reply_timeout: Duration) -> Self {
        let (broadcast_tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            endpoints: DashMap::new(),
            broadcast_tx,
            reply_timeout,
        }
    }

    pub fn reply_timeout(&self) -> Duration {
        self.reply_timeout
    }

    /// Append `handler` to the endpoint for `target`, creating it if needed.
    pub fn register(&self, target: Target, handler: Arc<dyn MessageHandler>) {
        let mut endpoint = self.endpoints.entry(target).or_insert_with(|| Endpoint {
            handlers: Vec::new(),
            token: CancellationToken::new(),
        });
        endpoint.handlers.push(handler);
        debug!("Registered handler #{} on {}", endpoint.handlers.len(), target);
    }

    pub fn has_endpoint(&self, target: Target) -> bool {
        self.endpoints.contains_key(&target)
    }

    pub fn handler_count(&self, target: Target) -> usize {
        self.endpoints
            .get(&target)
            .map(|e| e.handlers.len())
            .unwrap_or(0)
    }

    /// Tear down an endpoint. Pending sends to it settle with
    /// [`BusError::TransportUnreachable`].
    pub fn close_endpoint(&self, target: Target) -> bool {
        match self.endpoints.remove(&target) {
            Some((_, endpoint)) => {
                endpoint.token.cancel();
                debug!("Closed endpoint {}", target);
                true
            }
            None => false,
        }
    }

    fn snapshot(&self, target: Target) -> Option<(Vec<Arc<dyn MessageHandler>>, CancellationToken)> {
        self.endpoints
            .get(&target)
            .map(|e| (e.handlers.clone(), e.token.clone()))
    }

    /// Send `message` to `target` and wait for its reply.
    ///
    /// Never hangs: every failure settles as a [`Reply::Error`].
    pub async fn send(&self, sender: ContextId, target: Target, message: Message) -> Reply {
        match self.request(sender, target, message).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!("Send to {} failed: {}", target, err);
                Reply::from(err)
            }
        }
    }

    /// Like [`MessageBus::send`], keeping bus failures typed.
    pub async fn request(
        &self,
        sender: ContextId,
        target: Target,
        message: Message,
    ) -> Result<Reply, BusError> {
        let action = message.action();
        let Some((handlers, token)) = self.snapshot(target) else {
            return Err(BusError::TransportUnreachable(target.to_string()));
        };

        debug!("{} -> {}: {}", sender, target, action);
        let envelope = Envelope::new(message, sender);
        let (tx, mut rx) = oneshot::channel();
        let responder = Responder::new(action, tx, token.clone());

        let mut deferred = false;
        for handler in handlers {
            match handler.handle(&envelope, responder.clone()) {
                Dispatch::Replied => break,
                Dispatch::Deferred => deferred = true,
                Dispatch::Ignored => {}
            }
            if responder.is_replied() {
                break;
            }
        }

        if !deferred && !responder.is_replied() {
            return Err(BusError::NoResponse(action.to_string()));
        }
        drop(responder);

        let wait = async {
            tokio::select! {
                biased;
                reply = &mut rx => reply.map_err(|_| {
                    if token.is_cancelled() {
                        BusError::TransportUnreachable(target.to_string())
                    } else {
                        BusError::NoResponse(action.to_string())
                    }
                }),
                _ = token.cancelled() => Err(BusError::TransportUnreachable(target.to_string())),
            }
        };

        match tokio::time::timeout(self.reply_timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(BusError::Timeout {
                action: action.to_string(),
                timeout_ms: self.reply_timeout.as_millis() as u64,
            }),
        }
    }

    /// Deliver `message` without waiting for a reply. Returns whether the
    /// endpoint exists.
    pub fn post(&self, sender: ContextId, target: Target, message: Message) -> bool {
        let Some((handlers, token)) = self.snapshot(target) else {
            debug!("Dropped {} for missing endpoint {}", message.action(), target);
            return false;
        };

        debug!("{} -> {} (post): {}", sender, target, message.action());
        let envelope = Envelope::new(message, sender);
        let responder = Responder::detached(envelope.message.action(), token);
        for handler in handlers {
            if handler.handle(&envelope, responder.clone()) == Dispatch::Replied {
                break;
            }
        }
        true
    }

    /// Fan `message` out to every subscriber. Returns the number reached.
    pub fn broadcast(&self, message: Message) -> usize {
        let action = message.action();
        let reached = self.broadcast_tx.send(message).unwrap_or(0);
        debug!("Broadcast {} to {} listener(s)", action, reached);
        reached
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.broadcast_tx.subscribe()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
