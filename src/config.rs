use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::errors::{BoxPromptError, BoxPromptResult};
use crate::geometry::ContentFit;
use crate::snapping::SnapSettings;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub bridge: BridgeConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub prompts: PromptsConfig,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    /// Snap-collection conditions used until the device exports its own.
    #[serde(default)]
    pub snapping: SnapSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Endpoint accepting `{service, requestId, payload}` JSON posts.
    pub endpoint: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8082/services".to_string(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    5000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    /// Connection/notification polling period. 0 disables polling.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// How canvas-rendered previews lay out the frame. Video always fills its element.
    #[serde(default)]
    pub canvas_fit: ContentFit,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            canvas_fit: ContentFit::default(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    1000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptsConfig {
    #[serde(default = "default_max_image_prompts")]
    pub max_image_prompts: usize,
    #[serde(default = "default_max_num_classes")]
    pub max_num_classes: usize,
    #[serde(default = "default_classes")]
    pub default_classes: Vec<String>,
    /// Image prompt labels are `<prefix><n>`, n starting at 1.
    #[serde(default = "default_label_prefix")]
    pub label_prefix: String,
}

impl Default for PromptsConfig {
    fn default() -> Self {
        Self {
            max_image_prompts: default_max_image_prompts(),
            max_num_classes: default_max_num_classes(),
            default_classes: default_classes(),
            label_prefix: default_label_prefix(),
        }
    }
}

fn default_max_image_prompts() -> usize {
    5
}

fn default_max_num_classes() -> usize {
    80
}

fn default_classes() -> Vec<String> {
    vec!["person".to_string(), "chair".to_string(), "TV".to_string()]
}

fn default_label_prefix() -> String {
    "object".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_duration_ms")]
    pub default_duration_ms: u64,
    #[serde(default = "default_max_visible")]
    pub max_visible: usize,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            default_duration_ms: default_duration_ms(),
            max_visible: default_max_visible(),
        }
    }
}

fn default_duration_ms() -> u64 {
    4500
}

fn default_max_visible() -> usize {
    5
}

/// Click-to-point selection used by the measurement viewers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionConfig {
    #[serde(default = "default_selection_service")]
    pub service: String,
    #[serde(default = "default_frame_width")]
    pub frame_width: u32,
    #[serde(default = "default_frame_height")]
    pub frame_height: u32,
}

impl SelectionConfig {
    pub fn fit(&self) -> ContentFit {
        ContentFit::AspectFit {
            aspect: self.frame_width.max(1) as f64 / self.frame_height.max(1) as f64,
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            service: default_selection_service(),
            frame_width: default_frame_width(),
            frame_height: default_frame_height(),
        }
    }
}

fn default_selection_service() -> String {
    "Selection Service".to_string()
}

fn default_frame_width() -> u32 {
    640
}

fn default_frame_height() -> u32 {
    400
}

fn resolve_config_path() -> BoxPromptResult<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join("config.toml");
            if candidate.exists() {
                tracing::debug!(path = %candidate.display(), "config found next to executable");
                return Ok(candidate);
            }
        }
    }

    let cwd = std::env::current_dir()?;
    let candidate = cwd.join("config.toml");
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "config found in working directory");
        return Ok(candidate);
    }

    if let Some(dir) = dirs::config_dir() {
        let candidate = dir.join("boxprompt").join("config.toml");
        if candidate.exists() {
            tracing::debug!(path = %candidate.display(), "config found in user config dir");
            return Ok(candidate);
        }
    }

    Err(BoxPromptError::Config(
        "config.toml not found next to executable, in working directory or user config dir".into(),
    ))
}

pub fn parse_config(content: &str) -> BoxPromptResult<AppConfig> {
    let config: AppConfig = toml::from_str(content)?;
    if config.prompts.max_image_prompts == 0 {
        return Err(BoxPromptError::Config("prompts.max_image_prompts must be at least 1".into()));
    }
    if config.bridge.endpoint.trim().is_empty() {
        return Err(BoxPromptError::Config("bridge.endpoint is empty".into()));
    }
    if !config.viewer.canvas_fit.is_valid() {
        return Err(BoxPromptError::Config(format!(
            "viewer.canvas_fit: aspect must be a finite number above 0, got {:?}",
            config.viewer.canvas_fit
        )));
    }
    if config.selection.frame_width == 0 || config.selection.frame_height == 0 {
        return Err(BoxPromptError::Config("selection frame size must be non-zero".into()));
    }
    Ok(config)
}

pub fn load_config() -> BoxPromptResult<AppConfig> {
    let path = resolve_config_path()?;
    let content = std::fs::read_to_string(&path)?;
    let config = parse_config(&content)?;
    tracing::info!(path = %path.display(), endpoint = %config.bridge.endpoint, "config loaded");
    Ok(config)
}

/// Environment overrides, applied after `.env` has been loaded.
/// `BOXPROMPT_BRIDGE_ENDPOINT` replaces `bridge.endpoint`.
pub fn apply_env_overrides(config: &mut AppConfig) {
    if let Ok(endpoint) = std::env::var("BOXPROMPT_BRIDGE_ENDPOINT") {
        if !endpoint.trim().is_empty() {
            tracing::debug!(endpoint = %endpoint, "bridge endpoint overridden from environment");
            config.bridge.endpoint = endpoint;
        }
    }
}

pub fn save_config(config: &AppConfig) -> BoxPromptResult<()> {
    let path = resolve_config_path()?;
    write_config(&path, config)
}

pub fn write_config(path: &std::path::Path, config: &AppConfig) -> BoxPromptResult<()> {
    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}
