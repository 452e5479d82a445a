pub mod config;
pub mod conversation;
pub mod logging;
pub mod providers;
pub mod session;
pub mod upload;

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use neuroscan_contracts::analysis::AnalysisResult;
use neuroscan_contracts::history::{FileStorage, ResultStore};
use tracing::info;

pub use config::EngineConfig;
pub use conversation::{ConversationSession, SendOutcome, SendRejection};
pub use logging::init_logging;
pub use providers::{default_provider_registry, Provider, RemoteError};
pub use session::{AnalysisSession, PhaseObserver, SessionError, SessionPhase};
pub use upload::{ImageUpload, UploadError};

/// Process-wide wiring: one result store and one provider, shared by every
/// analysis and conversation created from it.
pub struct NeuroScanEngine {
    config: EngineConfig,
    store: Arc<ResultStore>,
    provider: Provider,
}

impl NeuroScanEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        std::fs::create_dir_all(&config.data_dir)
            .with_context(|| format!("failed to create {}", config.data_dir.display()))?;
        let registry = default_provider_registry(&config);
        let Some(provider) = registry.get(&config.provider) else {
            bail!(
                "unknown provider '{}' (available: {})",
                config.provider,
                registry.names().join(", ")
            );
        };
        let store = Arc::new(ResultStore::load(Arc::new(FileStorage::new(
            config.data_dir.clone(),
        ))));
        info!(
            provider = provider.name(),
            data_dir = %config.data_dir.display(),
            records = store.len(),
            "engine ready"
        );
        Ok(Self::with_parts(config, store, provider))
    }

    pub fn with_parts(config: EngineConfig, store: Arc<ResultStore>, provider: Provider) -> Self {
        Self {
            config,
            store,
            provider,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ResultStore> {
        &self.store
    }

    pub fn provider(&self) -> &Provider {
        &self.provider
    }

    pub fn new_session(&self) -> AnalysisSession {
        AnalysisSession::new(
            self.provider.classifier.clone(),
            self.store.clone(),
            self.config.enhancement_delay,
        )
    }

    pub fn start_conversation(&self, context: Option<AnalysisResult>) -> ConversationSession {
        ConversationSession::start(self.provider.chat.clone(), context)
    }
}
