//! # LightPilot Core
//!
//! Runtime pieces shared by every execution context.
//!
//! ## Components
//!
//! - [`MessageBus`] - addressed request/response messaging plus broadcast
//! - [`MemoryStateStore`] / [`FileStateStore`] - persistent state backends
//! - [`TabRegistry`] - tab lifecycle with one-shot completion listeners
//! - [`Projection`] - reducer-driven state with queued hydration

pub mod bus;
pub mod projection;
pub mod store;
pub mod tabs;

pub use bus::{Dispatch, MessageBus, MessageHandler, Responder};
pub use projection::{
    AppAction, AppReducer, AppState, PersistEffect, Phase, Projection, ProjectionError, Reducer,
    StateEffect,
};
pub use store::{FileStateStore, MemoryStateStore};
pub use tabs::{CompletionListener, ListenerHandle, TabRegistry};
