//! In-memory page documents.
//!
//! A [`StaticDocument`] holds page markup plus the interactive controls found
//! in it. Controls can be mounted late to mimic pages whose own scripts
//! render them after the load event.

use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;

use parking_lot::Mutex;
use regex::Regex;
use tokio::time::Instant;
use tracing::{debug, trace};

use lightpilot_protocols::{ControlRef, InteractionEvent, PageDocument};

const CONTROL_TAGS: &str = "button|a|input|select|textarea";

#[derive(Debug, Clone)]
struct Control {
    tag: String,
    attrs: HashMap<String, String>,
    text: String,
    markup: String,
    mounted_at: Option<Instant>,
    prevents_default: bool,
}

impl Control {
    fn ref_at(&self, index: usize) -> ControlRef {
        ControlRef {
            index,
            tag: self.tag.clone(),
            text: self.text.clone(),
            disabled: self.attrs.contains_key("disabled"),
        }
    }

    fn is_mounted(&self, now: Instant) -> bool {
        self.mounted_at.is_none_or(|at| at <= now)
    }
}

/// A parsed `tag[attr="value"]` selector. Either part may be absent.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Selector {
    tag: Option<String>,
    attr: Option<(String, Option<String>)>,
}

impl Selector {
    fn parse(selector: &str) -> Option<Self> {
        let caps = selector_regex().captures(selector)?;
        let tag = caps.get(1).map(|m| m.as_str().to_ascii_lowercase());
        let attr = caps
            .get(2)
            .map(|name| (name.as_str().to_string(), caps.get(3).map(|v| v.as_str().to_string())));
        if tag.is_none() && attr.is_none() {
            return None;
        }
        Some(Self { tag, attr })
    }

    fn matches(&self, control: &Control) -> bool {
        if self.tag.as_ref().is_some_and(|tag| *tag != control.tag) {
            return false;
        }
        match &self.attr {
            Some((name, Some(value))) => control.attrs.get(name) == Some(value),
            Some((name, None)) => control.attrs.contains_key(name),
            None => true,
        }
    }
}

/// A dispatched interaction, as observed by the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedClick {
    pub control: ControlRef,
    pub event: InteractionEvent,
    pub default_prevented: bool,
}

/// Page document backed by a markup string.
pub struct StaticDocument {
    url: String,
    html: String,
    controls: Mutex<Vec<Control>>,
    clicks: Mutex<Vec<RecordedClick>>,
}

impl StaticDocument {
    /// Parse `html`, collecting every control element it contains.
    pub fn parse(url: impl Into<String>, html: impl Into<String>) -> Self {
        let html = html.into();
        let controls = scan_controls(&html, None);
        debug!("Parsed document with {} control(s)", controls.len());
        Self {
            url: url.into(),
            html,
            controls: Mutex::new(controls),
            clicks: Mutex::new(Vec::new()),
        }
    }

    /// Add controls from `markup` that only become visible after `delay`.
    pub fn mount_later(&self, markup: &str, delay: Duration) {
        let at = Instant::now() + delay;
        let mut controls = scan_controls(markup, Some(at));
        trace!("Scheduling {} control(s) in {:?}", controls.len(), delay);
        self.controls.lock().append(&mut controls);
    }

    /// Make the page's own handler on controls matching `selector` call
    /// `preventDefault`.
    pub fn prevent_default_on(&self, selector: &str) -> usize {
        let Some(selector) = Selector::parse(selector) else {
            return 0;
        };
        let mut count = 0;
        for control in self.controls.lock().iter_mut() {
            if selector.matches(control) {
                control.prevents_default = true;
                count += 1;
            }
        }
        count
    }

    /// Interactions dispatched so far, oldest first.
    pub fn clicks(&self) -> Vec<RecordedClick> {
        self.clicks.lock().clone()
    }

    /// Number of controls currently rendered.
    pub fn mounted_controls(&self) -> usize {
        let now = Instant::now();
        self.controls.lock().iter().filter(|c| c.is_mounted(now)).count()
    }
}

impl PageDocument for StaticDocument {
    fn url(&self) -> &str {
        &self.url
    }

    fn outer_html(&self) -> String {
        let now = Instant::now();
        let late: String = self
            .controls
            .lock()
            .iter()
            .filter(|c| c.mounted_at.is_some() && c.is_mounted(now))
            .map(|c| c.markup.as_str())
            .collect();
        if late.is_empty() {
            return self.html.clone();
        }

        match self.html.rfind("</body>") {
            Some(pos) => format!("{}{}{}", &self.html[..pos], late, &self.html[pos..]),
            None => format!("{}{}", self.html, late),
        }
    }

    fn query_selector(&self, selector: &str) -> Option<ControlRef> {
        let parsed = Selector::parse(selector)?;
        let now = Instant::now();
        self.controls
            .lock()
            .iter()
            .enumerate()
            .find(|(_, c)| c.is_mounted(now) && parsed.matches(c))
            .map(|(index, c)| c.ref_at(index))
    }

    fn dispatch(&self, control: &ControlRef, event: InteractionEvent) -> bool {
        let prevented = {
            let controls = self.controls.lock();
            let Some(target) = controls.get(control.index) else {
                return true;
            };
            let cancelable = match event {
                InteractionEvent::Click { cancelable, .. } => cancelable,
            };
            target.prevents_default && cancelable
        };

        debug!("Dispatched {:?} to <{}> #{}", event, control.tag, control.index);
        self.clicks.lock().push(RecordedClick {
            control: control.clone(),
            event,
            default_prevented: prevented,
        });
        !prevented
    }
}

fn selector_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*([A-Za-z][\w-]*)?(?:\[([\w:-]+)(?:="([^"]*)")?\])?\s*$"#)
            .expect("selector regex")
    })
}

fn element_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)<({CONTROL_TAGS})\b([^>]*)>(?:([^<]*)</\s*(?:{CONTROL_TAGS})\s*>)?"
        ))
        .expect("element regex")
    })
}

fn attr_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([\w:-]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+)))?"#)
            .expect("attribute regex")
    })
}

/// Collect control elements from `html`.
///
/// This is a lexical scan, not an HTML parser: an attribute value containing
/// `>` ends the tag early, and a control's text is only captured when it has
/// no nested markup. Pages fetched over HTTP are scanned the same way, so a
/// control rendered inside such markup may be missed.
fn scan_controls(html: &str, mounted_at: Option<Instant>) -> Vec<Control> {
    let attr = attr_regex();
    element_regex()
        .captures_iter(html)
        .map(|caps| {
            let attrs = caps
                .get(2)
                .map(|raw| {
                    attr.captures_iter(raw.as_str().trim_end_matches('/'))
                        .map(|a| {
                            let value = a
                                .get(2)
                                .or_else(|| a.get(3))
                                .or_else(|| a.get(4))
                                .map(|v| v.as_str().to_string())
                                .unwrap_or_default();
                            (a[1].to_ascii_lowercase(), value)
                        })
                        .collect()
                })
                .unwrap_or_default();
            Control {
                tag: caps[1].to_ascii_lowercase(),
                attrs,
                text: caps.get(3).map(|t| t.as_str().trim().to_string()).unwrap_or_default(),
                markup: caps[0].to_string(),
                mounted_at,
                prevents_default: false,
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "document_tests.rs"]
mod tests;
