use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_PROVIDER: &str = "gemini";
pub const DEFAULT_ENHANCEMENT_DELAY: Duration = Duration::from_millis(1500);
pub const DEFAULT_REQUEST_TIMEOUT_S: f64 = 90.0;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub data_dir: PathBuf,
    pub provider: String,
    pub model: String,
    pub api_base: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    /// Length of the cosmetic enhancement stage. No pixels are touched.
    pub enhancement_delay: Duration,
}

impl EngineConfig {
    pub fn from_env() -> Self {
        let data_dir = non_empty_env("NEUROSCAN_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(default_data_dir);
        let request_timeout_s = non_empty_env("NEUROSCAN_REQUEST_TIMEOUT")
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|value| value.is_finite())
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_S)
            .clamp(5.0, 300.0);
        let enhancement_delay = non_empty_env("NEUROSCAN_ENHANCE_DELAY_MS")
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_ENHANCEMENT_DELAY);

        Self {
            data_dir,
            provider: non_empty_env("NEUROSCAN_PROVIDER")
                .unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            model: non_empty_env("NEUROSCAN_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            api_base: non_empty_env("GEMINI_API_BASE")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            api_key: non_empty_env("GEMINI_API_KEY")
                .or_else(|| non_empty_env("GOOGLE_API_KEY"))
                .or_else(|| non_empty_env("API_KEY")),
            request_timeout: Duration::from_secs_f64(request_timeout_s),
            enhancement_delay,
        }
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        if let Some(dir) = data_dir {
            self.data_dir = dir;
        }
        self
    }

    pub fn with_provider(mut self, provider: Option<String>) -> Self {
        if let Some(provider) = provider.filter(|value| !value.trim().is_empty()) {
            self.provider = provider.trim().to_ascii_lowercase();
        }
        self
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        if let Some(model) = model.filter(|value| !value.trim().is_empty()) {
            self.model = model.trim().to_string();
        }
        self
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("neuroscan"))
        .unwrap_or_else(|| PathBuf::from(".neuroscan"))
}

pub(crate) fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::{EngineConfig, DEFAULT_ENHANCEMENT_DELAY, DEFAULT_MODEL};

    fn base() -> EngineConfig {
        EngineConfig {
            data_dir: PathBuf::from("/tmp/neuroscan"),
            provider: "gemini".to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_base: "https://example.test/v1beta".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(90),
            enhancement_delay: DEFAULT_ENHANCEMENT_DELAY,
        }
    }

    #[test]
    fn overrides_replace_only_non_empty_values() {
        let config = base()
            .with_data_dir(Some(PathBuf::from("/srv/scans")))
            .with_provider(Some(" DryRun ".to_string()))
            .with_model(Some("   ".to_string()));
        assert_eq!(config.data_dir, PathBuf::from("/srv/scans"));
        assert_eq!(config.provider, "dryrun");
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn missing_overrides_keep_defaults() {
        let config = base().with_data_dir(None).with_provider(None).with_model(None);
        assert_eq!(config, base());
    }

    #[test]
    fn enhancement_delay_defaults_to_a_second_and_a_half() {
        assert_eq!(DEFAULT_ENHANCEMENT_DELAY, Duration::from_millis(1500));
    }
}
