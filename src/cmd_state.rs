//! Persisted state inspection.

use lightpilot_core::AppAction;
use lightpilot_core::projection::{XAction, XAiAction};
use lightpilot_protocols::StateStore;

use crate::cli::StateAction;
use crate::container::ContextContainer;

pub(crate) async fn handle(container: &ContextContainer, action: Option<StateAction>) -> anyhow::Result<()> {
    match action.unwrap_or(StateAction::Show) {
        StateAction::Show => show(container).await,
        StateAction::SetXaiKey { key } => {
            container.xai.dispatch(XAiAction::SetApiKey(Some(key.clone())));
            container.app.dispatch(AppAction::SetXAiApiKey(Some(key)));
            println!("xAI API key stored");
            Ok(())
        }
        StateAction::SetXToken { token } => {
            let mut credentials = container.x.state().api_credentials.unwrap_or_default();
            credentials.bearer_token = token.clone();
            container.x.dispatch(XAction::SetCredentials(Some(credentials)));
            container.app.dispatch(AppAction::SetXApiKey(Some(token)));
            println!("X bearer token stored");
            Ok(())
        }
    }
}

async fn show(container: &ContextContainer) -> anyhow::Result<()> {
    let mut keys = container.store.keys().await?;
    keys.sort_by_key(|k| k.as_str());
    if keys.is_empty() {
        println!("No stored state");
    }
    for key in keys {
        if let Some(value) = container.store.get(key).await? {
            println!("{}: {}", key, serde_json::to_string_pretty(&redact(value))?);
        }
    }
    Ok(())
}

const SECRET_FIELDS: [&str; 5] = ["apiKey", "apiKeySecret", "bearerToken", "xAiApiKey", "xApiKey"];

/// Mask credential fields before printing.
fn redact(mut value: serde_json::Value) -> serde_json::Value {
    match &mut value {
        serde_json::Value::Object(map) => {
            for (name, field) in map.iter_mut() {
                if SECRET_FIELDS.contains(&name.as_str()) {
                    if let serde_json::Value::String(secret) = field {
                        if !secret.is_empty() {
                            *field = serde_json::Value::String("****".to_string());
                        }
                    }
                } else {
                    *field = redact(field.take());
                }
            }
        }
        serde_json::Value::Array(items) => {
            for item in items.iter_mut() {
                *item = redact(item.take());
            }
        }
        _ => {}
    }
    value
}
