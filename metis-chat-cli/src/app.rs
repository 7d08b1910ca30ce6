//! Composition root: configuration, credentials, API client and store

use anyhow::{bail, Context, Result};
use console::style;
use dialoguer::{Input, Password};
use indicatif::{ProgressBar, ProgressStyle};
use metis_chat_api::{ApiClient, ChatBackend};
use metis_chat_core::config::{ApiConfig, ApiConfigUpdate, Config, ConfigLoader};
use metis_chat_core::credentials::{Credentials, FileKeyValueStore};
use metis_chat_store::ChatStore;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Everything a command needs, owned in one place
pub struct App {
    pub loader: ConfigLoader,
    pub config: Config,
    pub credentials: FileKeyValueStore,
    pub store: ChatStore,
}

impl App {
    pub fn new(loader: ConfigLoader, config: Config) -> Result<Self> {
        let api_config = ApiConfig {
            base_url: config.api.base_url.clone(),
            ..ApiConfig::default()
        };
        let client = if config.api.timeout_secs > 0 {
            ApiClient::with_timeout(api_config, Duration::from_secs(config.api.timeout_secs))
                .context("failed to create HTTP client")?
        } else {
            ApiClient::new(api_config)
        };
        let backend: Arc<dyn ChatBackend> = Arc::new(client);
        let store = ChatStore::new(backend).with_history_order(config.chat.history_order);
        let credentials = FileKeyValueStore::new(loader.credentials_path());

        Ok(Self {
            loader,
            config,
            credentials,
            store,
        })
    }

    /// Load saved credentials into the client, prompting for them when missing.
    pub fn ensure_configured(&self) -> Result<Credentials> {
        let credentials = match Credentials::resolve(&self.credentials)? {
            Some(credentials) => credentials,
            None => {
                if !console::user_attended() {
                    bail!("API key and bot id are not configured; run `metis-chat configure`");
                }
                println!("{}", style("API credentials required").bold().yellow());
                self.configure(None, None)?
            }
        };
        self.store.backend().update_config(credentials.to_update());
        Ok(credentials)
    }

    /// Save new credentials, asking for any value not given.
    pub fn configure(&self, api_key: Option<String>, bot_id: Option<String>) -> Result<Credentials> {
        let current = Credentials::load(&self.credentials)?;

        let api_key = match api_key {
            Some(key) => key,
            None => Password::new()
                .with_prompt("MetisAI API key")
                .interact()
                .context("failed to read API key")?,
        };
        let bot_id = match bot_id {
            Some(id) => id,
            None => {
                let mut input = Input::<String>::new().with_prompt("Bot id");
                if let Some(current) = &current {
                    input = input.default(current.bot_id.clone());
                }
                input.interact_text().context("failed to read bot id")?
            }
        };

        let credentials = Credentials::new(api_key.trim(), bot_id.trim());
        credentials.save(&self.credentials)?;
        self.store.backend().update_config(credentials.to_update());
        info!("Saved credentials for bot {}", credentials.bot_id);
        Ok(credentials)
    }

    /// Persist a new base URL and point the client at it
    pub fn set_base_url(&mut self, base_url: String) -> Result<()> {
        self.config.api.base_url = base_url.clone();
        self.loader.save(&self.config)?;
        self.store.backend().update_config(ApiConfigUpdate {
            base_url: Some(base_url),
            ..Default::default()
        });
        Ok(())
    }

    /// Print the store error, if any, and clear it
    pub fn report_error(&self) -> bool {
        match self.store.error() {
            Some(error) => {
                eprintln!("{} {}", style("error:").red().bold(), error);
                self.store.reset_error();
                true
            }
            None => false,
        }
    }
}

/// Run `future` while showing a spinner
pub async fn with_spinner<F, T>(message: &str, future: F) -> T
where
    F: Future<Output = T>,
{
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(100));
    let output = future.await;
    spinner.finish_and_clear();
    output
}
