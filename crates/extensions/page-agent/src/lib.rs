//! Page-side agents for LightPilot.
//!
//! - [`ContentAgent`] runs inside a tab: serves its markup and presses the
//!   build control on request.
//! - [`PageContentExtractor`] captures the active tab into the state store.
//! - [`UiDriver`] opens the agent page with a prompt and drives it.
//! - [`BackgroundService`] routes background-addressed messages.
//! - [`Navigator`] loads documents into tabs and injects agents.

mod background;
mod content;
mod document;
mod driver;
mod error;
mod extractor;
mod loader;
mod navigator;

pub use background::{BackgroundService, STORE_SUCCESS};
pub use content::{CLICK_FAILED, CLICK_SUCCEEDED, ContentAgent, DriveSettings, wait_for_control};
pub use document::{RecordedClick, StaticDocument};
pub use driver::{DriveFlow, DriveOutcome, UiDriver};
pub use error::LoadError;
pub use extractor::{ExtractionState, PageContentExtractor};
pub use loader::{HttpPageLoader, PageLoader, StaticPageLoader};
pub use navigator::Navigator;
