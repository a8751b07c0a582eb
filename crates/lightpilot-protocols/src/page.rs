//! Page surface exposed to an injected content agent.

use serde::{Deserialize, Serialize};

/// Reference to an interactive control found by a selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRef {
    /// Stable index of the control within its document.
    pub index: usize,
    pub tag: String,
    pub text: String,
    pub disabled: bool,
}

/// A user interaction dispatched to a control.
///
/// Dispatching an event runs the page's own handlers, unlike flipping
/// control state directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InteractionEvent {
    Click { bubbles: bool, cancelable: bool },
}

impl InteractionEvent {
    /// A bubbling, cancelable click, as a pointer would produce.
    pub fn click() -> Self {
        InteractionEvent::Click {
            bubbles: true,
            cancelable: true,
        }
    }
}

/// The document a content agent lives in.
pub trait PageDocument: Send + Sync {
    /// URL the document was loaded from.
    fn url(&self) -> &str;

    /// Serialized markup of the whole document.
    fn outer_html(&self) -> String;

    /// First control matching an attribute selector such as
    /// `button[data-cy="ai-prompt-submit"]`.
    fn query_selector(&self, selector: &str) -> Option<ControlRef>;

    /// Dispatch `event` to `control`. Returns `false` when a page handler
    /// prevented the default action.
    fn dispatch(&self, control: &ControlRef, event: InteractionEvent) -> bool;
}
