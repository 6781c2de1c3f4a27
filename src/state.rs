//! Application State
//!
//! Explicit state object passed to every command. Holds the configuration,
//! the model provider, the report history, the chat manager, and the
//! transient search and view state. There are no globals.

use std::sync::Arc;

use politisight_core::Report;
use politisight_llm::{GeminiProvider, LlmProvider, LlmRequestOptions, ProviderConfig};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::models::search::SearchState;
use crate::models::settings::{AppConfig, SettingsUpdate};
use crate::services::chat::ChatSessionManager;
use crate::services::history::HistoryStore;
use crate::services::report_generator::{GeneratorOptions, ReportGenerator};
use crate::storage::config::{api_key_from_env, ConfigService};
use crate::storage::local::{FileStore, KeyValueStore};
use crate::utils::error::{AppError, AppResult};

/// Build the Gemini provider for `config`.
pub fn build_provider(config: &AppConfig, api_key: Option<String>) -> AppResult<Arc<dyn LlmProvider>> {
    let provider_config = ProviderConfig {
        api_key,
        base_url: config.base_url.clone(),
        model: config.model.clone(),
        max_tokens: config.max_output_tokens,
        temperature: config.report_temperature,
        proxy: config.proxy.clone(),
    };
    Ok(Arc::new(GeminiProvider::new(provider_config)?))
}

/// Request options for chat replies
pub fn chat_options(config: &AppConfig) -> LlmRequestOptions {
    LlmRequestOptions {
        temperature_override: Some(config.chat_temperature),
        model_override: Some(config.chat_model.clone()),
        response_schema: None,
        enable_search: false,
    }
}

/// Options for report generation
pub fn generator_options(config: &AppConfig) -> GeneratorOptions {
    GeneratorOptions {
        temperature: config.report_temperature,
        model: None,
        enable_search: config.enable_search,
    }
}

/// Application state shared by all commands
pub struct AppState {
    /// Configuration service for app settings
    config: Arc<RwLock<Option<ConfigService>>>,
    /// API credential read from the environment at startup
    api_key: Arc<RwLock<Option<String>>>,
    /// Model provider
    provider: Arc<RwLock<Option<Arc<dyn LlmProvider>>>>,
    /// Whether the provider is rebuilt from config on settings changes
    owns_provider: Arc<RwLock<bool>>,
    /// Persisted report history
    history: Arc<RwLock<Option<HistoryStore>>>,
    /// Chat panel state machine
    chat: Arc<RwLock<Option<Arc<Mutex<ChatSessionManager>>>>>,
    /// Progress of the current generation request
    search: Arc<std::sync::RwLock<SearchState>>,
    /// Report currently on screen
    active_report: Arc<RwLock<Option<Report>>>,
    /// Whether the state has been initialized
    initialized: Arc<RwLock<bool>>,
}

impl AppState {
    /// Create a new uninitialized app state
    pub fn new() -> Self {
        Self {
            config: Arc::new(RwLock::new(None)),
            api_key: Arc::new(RwLock::new(None)),
            provider: Arc::new(RwLock::new(None)),
            owns_provider: Arc::new(RwLock::new(false)),
            history: Arc::new(RwLock::new(None)),
            chat: Arc::new(RwLock::new(None)),
            search: Arc::new(std::sync::RwLock::new(SearchState::default())),
            active_report: Arc::new(RwLock::new(None)),
            initialized: Arc::new(RwLock::new(false)),
        }
    }

    /// Initialize from the user's config directory and environment.
    ///
    /// A missing API key is not an error here; the first model request
    /// reports it.
    pub async fn initialize(&self) -> AppResult<()> {
        let config = ConfigService::new()?;
        let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new()?);
        let api_key = api_key_from_env();
        if api_key.is_none() {
            warn!("no API key in GEMINI_API_KEY or API_KEY; model requests will fail");
        }
        let provider = build_provider(config.get_config(), api_key.clone())?;

        *self.api_key.write().await = api_key;
        *self.owns_provider.write().await = true;
        self.initialize_with(config, store, provider).await
    }

    /// Initialize with explicit services.
    pub async fn initialize_with(
        &self,
        config: ConfigService,
        store: Arc<dyn KeyValueStore>,
        provider: Arc<dyn LlmProvider>,
    ) -> AppResult<()> {
        let mut initialized = self.initialized.write().await;
        if *initialized {
            return Ok(());
        }

        let options = chat_options(config.get_config());
        let history = HistoryStore::load(store);
        let mut chat = ChatSessionManager::new(Arc::clone(&provider), options);
        chat.sync_context(None, history.reports());

        info!(
            model = %provider.model(),
            history = history.len(),
            "app state initialized"
        );

        *self.config.write().await = Some(config);
        *self.provider.write().await = Some(provider);
        *self.history.write().await = Some(history);
        *self.chat.write().await = Some(Arc::new(Mutex::new(chat)));

        *initialized = true;
        Ok(())
    }

    pub async fn is_initialized(&self) -> bool {
        *self.initialized.read().await
    }

    /// Check if config is healthy
    pub fn is_config_healthy(&self) -> bool {
        if let Ok(guard) = self.config.try_read() {
            if let Some(ref config) = *guard {
                return config.is_healthy();
            }
        }
        false
    }

    /// Check if history has been loaded
    pub fn is_history_loaded(&self) -> bool {
        self.history
            .try_read()
            .map(|guard| guard.is_some())
            .unwrap_or(false)
    }

    // ========================================================================
    // Config
    // ========================================================================

    /// Get the current configuration
    pub async fn get_config(&self) -> AppResult<AppConfig> {
        let guard = self.config.read().await;
        match &*guard {
            Some(config) => Ok(config.get_config_clone()),
            None => Err(AppError::config("Config service not initialized")),
        }
    }

    /// Path of the config file
    pub async fn config_path(&self) -> AppResult<std::path::PathBuf> {
        let guard = self.config.read().await;
        match &*guard {
            Some(config) => Ok(config.path().to_path_buf()),
            None => Err(AppError::config("Config service not initialized")),
        }
    }

    /// Update the configuration and refresh the services that depend on it
    pub async fn update_config(&self, update: SettingsUpdate) -> AppResult<AppConfig> {
        let updated = {
            let mut guard = self.config.write().await;
            match &mut *guard {
                Some(config) => config.update_config(update)?,
                None => return Err(AppError::config("Config service not initialized")),
            }
        };

        let provider = if *self.owns_provider.read().await {
            let api_key = self.api_key.read().await.clone();
            let provider = build_provider(&updated, api_key)?;
            *self.provider.write().await = Some(Arc::clone(&provider));
            provider
        } else {
            self.provider().await?
        };

        let chat = self.chat_manager().await?;
        chat.lock()
            .await
            .replace_provider(provider, chat_options(&updated));
        debug!("settings applied");
        Ok(updated)
    }

    // ========================================================================
    // Services
    // ========================================================================

    pub async fn provider(&self) -> AppResult<Arc<dyn LlmProvider>> {
        self.provider
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::config("Provider not initialized"))
    }

    /// Whether an API credential is available to the provider
    pub async fn has_credential(&self) -> bool {
        match &*self.provider.read().await {
            Some(provider) => provider.has_credential(),
            None => false,
        }
    }

    pub async fn report_generator(&self) -> AppResult<ReportGenerator> {
        let config = self.get_config().await?;
        let provider = self.provider().await?;
        Ok(ReportGenerator::with_options(
            provider,
            generator_options(&config),
        ))
    }

    pub async fn chat_manager(&self) -> AppResult<Arc<Mutex<ChatSessionManager>>> {
        self.chat
            .read()
            .await
            .clone()
            .ok_or_else(|| AppError::internal("Chat manager not initialized"))
    }

    /// Read access to the history store
    pub async fn with_history<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&HistoryStore) -> AppResult<T>,
    {
        let guard = self.history.read().await;
        match &*guard {
            Some(history) => f(history),
            None => Err(AppError::internal("History not initialized")),
        }
    }

    /// Write access to the history store
    pub async fn with_history_mut<F, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(&mut HistoryStore) -> AppResult<T>,
    {
        let mut guard = self.history.write().await;
        match &mut *guard {
            Some(history) => f(history),
            None => Err(AppError::internal("History not initialized")),
        }
    }

    // ========================================================================
    // View state
    // ========================================================================

    pub async fn active_report(&self) -> Option<Report> {
        self.active_report.read().await.clone()
    }

    pub async fn set_active_report(&self, report: Option<Report>) {
        *self.active_report.write().await = report;
    }

    pub fn search_state(&self) -> SearchState {
        self.search
            .read()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Mutate the search state. Usable from synchronous progress callbacks.
    pub fn update_search<F>(&self, f: F)
    where
        F: FnOnce(&mut SearchState),
    {
        if let Ok(mut state) = self.search.write() {
            f(&mut state);
        }
    }

    /// Start a generation for `query` unless one is already running.
    ///
    /// The check and the transition happen under one write lock.
    pub fn try_begin_search(&self, query: &str) -> bool {
        let Ok(mut state) = self.search.write() else {
            return false;
        };
        if state.is_searching {
            return false;
        }
        state.begin(query);
        true
    }

    /// Rebuild the chat session if the active report or history length changed
    pub async fn sync_chat_context(&self) -> AppResult<bool> {
        let active = self.active_report().await;
        let chat = self.chat_manager().await?;
        let guard = self.history.read().await;
        let history = guard
            .as_ref()
            .ok_or_else(|| AppError::internal("History not initialized"))?;
        let recreated = chat.lock().await.sync_context(active.as_ref(), history.reports());
        Ok(recreated)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("initialized", &self.initialized)
            .finish()
    }
}
