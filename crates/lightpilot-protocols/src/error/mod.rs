//! Error types for the LightPilot protocol layer.

mod bus;
mod page;
mod provider;
mod store;

pub use bus::*;
pub use page::*;
pub use provider::*;
pub use store::*;
