use log::debug;
use serde_json::{ Map, Value as JsonValue };
use std::fs;
use std::io;
use std::path::{ Path, PathBuf };
use thiserror::Error;

const APP_DIR: &str = "e1-chat";
const FILE_NAME: &str = "preferences.json";

#[derive(Debug, Error)]
pub enum PreferenceError {
    #[error("preferences file {path} could not be accessed: {source}")] Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("preferences file {path} is not a JSON object: {source}")] Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Small durable key/value store backed by a JSON object on disk.
#[derive(Debug, Clone)]
pub struct PreferenceStore {
    path: PathBuf,
}

impl PreferenceStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn default_location() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, PreferenceError> {
        let entries = self.read()?;
        Ok(
            entries.get(key).and_then(|value| match value {
                JsonValue::String(s) => Some(s.clone()),
                _ => None,
            })
        )
    }

    pub fn set(&self, key: &str, value: &str) -> Result<(), PreferenceError> {
        let mut entries = self.read()?;
        entries.insert(key.to_string(), JsonValue::String(value.to_string()));

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let data = serde_json
            ::to_string_pretty(&JsonValue::Object(entries))
            .map_err(|source| self.json_error(source))?;
        fs::write(&self.path, data).map_err(|source| self.io_error(source))?;
        debug!("Saved preference {}={} to {}", key, value, self.path.display());
        Ok(())
    }

    fn read(&self) -> Result<Map<String, JsonValue>, PreferenceError> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Map::new());
            }
            Err(source) => {
                return Err(self.io_error(source));
            }
        };
        if data.trim().is_empty() {
            return Ok(Map::new());
        }
        serde_json::from_str(&data).map_err(|source| self.json_error(source))
    }

    fn io_error(&self, source: io::Error) -> PreferenceError {
        PreferenceError::Io { path: self.path.clone(), source }
    }

    fn json_error(&self, source: serde_json::Error) -> PreferenceError {
        PreferenceError::Json { path: self.path.clone(), source }
    }
}
