use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;
use crate::ui::preferences::PreferenceStore;

const MIN_RENDER_WIDTH: usize = 20;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend_url: String,
    pub request_timeout: Duration,
    pub stream_read_timeout: Duration,
    pub default_title: String,
    pub preferences_path: Option<PathBuf>,
    pub render_width: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".to_string(),
            request_timeout: Duration::from_secs(30),
            stream_read_timeout: Duration::from_secs(120),
            default_title: "New Chat".to_string(),
            preferences_path: None,
            render_width: 80,
        }
    }
}

impl From<&Args> for ClientConfig {
    fn from(args: &Args) -> Self {
        let default_title = match args.default_title.trim() {
            "" => ClientConfig::default().default_title,
            title => title.to_string(),
        };
        Self {
            backend_url: args.backend_url.trim().to_string(),
            request_timeout: Duration::from_secs(args.request_timeout_secs.max(1)),
            stream_read_timeout: Duration::from_secs(args.stream_read_timeout_secs.max(1)),
            default_title,
            preferences_path: args.preferences_path
                .as_deref()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            render_width: args.render_width.max(MIN_RENDER_WIDTH),
        }
    }
}

impl ClientConfig {
    /// The configured preferences file, falling back to the per-user default location.
    pub fn preference_store(&self) -> Option<PreferenceStore> {
        match &self.preferences_path {
            Some(path) => Some(PreferenceStore::new(path.clone())),
            None => PreferenceStore::default_location().map(PreferenceStore::new),
        }
    }
}
