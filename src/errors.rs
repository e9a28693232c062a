use thiserror::Error;

use crate::geometry::NormalizeError;

#[derive(Debug, Error)]
pub enum BoxPromptError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error("Image prompt limit reached ({0})")]
    PromptLimit(usize),

    #[error("Not connected to device")]
    NotConnected,

    #[error("Invalid image prompt label: {0}")]
    InvalidLabel(String),

    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    #[error("Service bridge error: {0}")]
    Bridge(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),
}

impl serde::Serialize for BoxPromptError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_str())
    }
}

pub type BoxPromptResult<T> = Result<T, BoxPromptError>;
