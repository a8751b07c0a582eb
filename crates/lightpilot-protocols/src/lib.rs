//! # LightPilot Protocols
//!
//! Shared vocabulary for the three execution contexts (background, content
//! agent, UI surface). Contains only types and interface definitions.
//!
//! ## Core Items
//!
//! - [`Message`] / [`Reply`] - the addressed message vocabulary
//! - [`StateStore`] - durable key-value store shared across contexts
//! - [`PageDocument`] - the page surface a content agent operates on
//! - [`ChatMessage`] - conversation entries for the completion client

pub mod chat;
pub mod error;
pub mod message;
pub mod page;
pub mod store;
pub mod tab;

pub use chat::{ChatMessage, ChatRole};
pub use error::{BusError, DriveError, ExtractionError, ProviderError, StoreError};
pub use message::{ContextId, Envelope, Message, Reply, Target};
pub use page::{ControlRef, InteractionEvent, PageDocument};
pub use store::{StateStore, StoreKey};
pub use tab::{TabEvent, TabHandle, TabId, TabStatus};
