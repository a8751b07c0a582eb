//! Per-run service container.
//!
//! Every service of the background context is constructed once here and
//! handed out by reference. Nothing is global.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use lightpilot_config::{Config, StoreBackend};
use lightpilot_core::projection::{XAiReducer, XReducer, follow_webpage_updates, load_webpage_content};
use lightpilot_core::{
    AppReducer, FileStateStore, MemoryStateStore, MessageBus, PersistEffect, Projection, Reducer,
    TabRegistry,
};
use lightpilot_page_agent::{
    BackgroundService, DriveSettings, Navigator, PageContentExtractor, PageLoader, UiDriver,
};
use lightpilot_protocols::StateStore;
use lightpilot_provider_xai::XAiClient;
use lightpilot_search_x::XApiClient;

pub(crate) struct ContextContainer {
    pub config: Config,
    pub bus: Arc<MessageBus>,
    pub tabs: Arc<TabRegistry>,
    pub store: Arc<dyn StateStore>,
    pub app: Arc<Projection<AppReducer>>,
    pub xai: Arc<Projection<XAiReducer>>,
    pub x: Arc<Projection<XReducer>>,
    pub extractor: Arc<PageContentExtractor>,
    pub driver: Arc<UiDriver>,
    effects: Vec<Arc<PersistEffect>>,
    cancel: CancellationToken,
}

impl ContextContainer {
    /// Build and hydrate every service. Page loads go through `loader`.
    pub async fn start(config: Config, loader: Arc<dyn PageLoader>) -> anyhow::Result<Self> {
        let store = open_store(&config)?;
        let bus = Arc::new(MessageBus::new(Duration::from_millis(config.bus.reply_timeout_ms)));
        let tabs = Arc::new(TabRegistry::new());
        let cancel = CancellationToken::new();

        let mut effects = Vec::new();
        let app = Arc::new(Projection::<AppReducer>::new());
        let xai = Arc::new(Projection::<XAiReducer>::new());
        let x = Arc::new(Projection::<XReducer>::new());
        effects.push(persist(&app, &store));
        effects.push(persist(&xai, &store));
        effects.push(persist(&x, &store));

        // Follow broadcasts before hydrating so no update is lost; early
        // ones are queued by the projection.
        follow_webpage_updates(app.clone(), bus.subscribe(), cancel.clone());

        app.hydrate(store.as_ref()).await?;
        xai.hydrate(store.as_ref()).await?;
        x.hydrate(store.as_ref()).await?;
        load_webpage_content(&app, store.as_ref()).await?;

        let extractor = Arc::new(PageContentExtractor::new(bus.clone(), tabs.clone(), store.clone()));
        let driver = Arc::new(UiDriver::new(
            bus.clone(),
            tabs.clone(),
            config.agent.build_url.clone(),
        ));
        Arc::new(BackgroundService::new(extractor.clone(), driver.clone())).register(&bus);

        let navigator = Arc::new(Navigator::new(
            bus.clone(),
            tabs.clone(),
            loader,
            drive_settings(&config),
        ));
        navigator.start(cancel.clone());

        info!("Background context ready");
        Ok(Self {
            config,
            bus,
            tabs,
            store,
            app,
            xai,
            x,
            extractor,
            driver,
            effects,
            cancel,
        })
    }

    /// Completion client using the stored key, falling back to the
    /// configured one.
    pub fn xai_client(&self) -> anyhow::Result<XAiClient> {
        let api_key = self
            .xai
            .state()
            .api_key
            .or_else(|| self.app.state().xai_api_key)
            .or_else(|| self.config.xai.api_key.clone())
            .filter(|k| !k.is_empty());
        let Some(api_key) = api_key else {
            bail!("No xAI API key: set one with `lightpilot state set-xai-key` or [xai].api_key");
        };

        let mut client = XAiClient::with_url(api_key, self.config.xai.base_url.clone());
        client.set_default_model(self.config.xai.model.clone());
        client.set_default_temperature(self.config.xai.temperature);
        Ok(client)
    }

    /// Search client using the stored bearer token, falling back to the
    /// configured one.
    pub fn x_client(&self) -> XApiClient {
        let token = self
            .x
            .state()
            .bearer_token()
            .map(str::to_string)
            .or_else(|| self.config.x.bearer_token.clone());
        XApiClient::with_url(token, self.config.x.base_url.clone())
    }

    /// Wait for pending state writes and stop background tasks.
    pub async fn shutdown(self) {
        for effect in &self.effects {
            effect.flush().await;
        }
        self.cancel.cancel();
        debug!("Background context stopped");
    }
}

fn persist<R: Reducer>(projection: &Projection<R>, store: &Arc<dyn StateStore>) -> Arc<PersistEffect> {
    let effect = PersistEffect::spawn(store.clone(), R::STORE_KEY);
    projection.add_effect(effect.clone());
    effect
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn StateStore>> {
    Ok(match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStateStore::new()),
        StoreBackend::File => {
            let path = PathBuf::from(lightpilot_config::ConfigLoader::expand_path(&config.store.path));
            std::fs::create_dir_all(&path)
                .with_context(|| format!("creating state directory {}", path.display()))?;
            Arc::new(FileStateStore::new(path))
        }
    })
}

pub(crate) fn drive_settings(config: &Config) -> DriveSettings {
    DriveSettings {
        control_selector: config.agent.control_selector.clone(),
        settle_delay: Duration::from_millis(config.agent.settle_delay_ms),
        poll_interval: Duration::from_millis(config.agent.poll_interval_ms),
        poll_timeout: Duration::from_millis(config.agent.poll_timeout_ms),
    }
}
