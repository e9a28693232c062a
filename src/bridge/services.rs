/// Service names registered by the device backend, and the payloads they take.
use serde::{Deserialize, Serialize};

use crate::errors::{BoxPromptError, BoxPromptResult};
use crate::geometry::{NormalizedBox, NormalizedPoint, PixelBox};

pub const BBOX_PROMPT_SERVICE: &str = "BBox Prompt Service";
pub const CLASS_UPDATE_SERVICE: &str = "Class Update Service";
pub const THRESHOLD_UPDATE_SERVICE: &str = "Threshold Update Service";
pub const CURRENT_PARAMS_SERVICE: &str = "Get Current Params Service";
pub const RENAME_IMAGE_PROMPT_SERVICE: &str = "Rename Image Prompt Service";
pub const DELETE_IMAGE_PROMPT_SERVICE: &str = "Delete Image Prompt Service";
pub const IMAGE_UPLOAD_SERVICE: &str = "Image Upload Service";
pub const SNAP_COLLECTION_SERVICE: &str = "Snap Collection Service";
pub const EXPORT_SERVICE: &str = "Export Service";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BBoxType {
    Normalized,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BBoxPromptPayload {
    pub filename: String,
    #[serde(rename = "type")]
    pub content_type: String,
    /// Base64 PNG of the frame the box was drawn on.
    pub data: Option<String>,
    pub bbox: NormalizedBox,
    pub bbox_type: BBoxType,
    pub label: String,
}

impl BBoxPromptPayload {
    pub fn new(bbox: NormalizedBox, label: String, frame_png: Option<&[u8]>) -> Self {
        let data = frame_png.map(|bytes| {
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes)
        });
        Self {
            filename: "object.png".to_string(),
            content_type: "application/json".to_string(),
            data,
            bbox,
            bbox_type: BBoxType::Normalized,
            label,
        }
    }
}

/// An image file sent as a prompt. `data` is a `data:` URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUploadPayload {
    pub filename: String,
    #[serde(rename = "type")]
    pub content_type: String,
    pub data: String,
    pub label: String,
}

impl ImageUploadPayload {
    pub fn new(filename: &str, content_type: &str, bytes: &[u8], label: String) -> Self {
        let encoded = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, bytes);
        Self {
            filename: filename.to_string(),
            content_type: content_type.to_string(),
            data: format!("data:{content_type};base64,{encoded}"),
            label,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameImagePrompt {
    pub index: usize,
    pub new_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteImagePrompt {
    pub index: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SelectionRequest {
    Point(NormalizedPoint),
    Clear { clear: bool },
}

/// Parameters the device is currently running with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceParams {
    pub confidence_threshold: f64,
    pub class_names: Vec<String>,
    #[serde(default)]
    pub image_prompt_labels: Vec<String>,
}

/// One snapping condition as the device takes it. Cooldowns are in seconds
/// on the way in and in minutes in the Export Service snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConditionConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cooldown: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    /// Edge buffer as a fraction of the frame, `0.0..=0.49`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
}

impl ConditionConfig {
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// Snap Collection Service payload. Absent conditions are left untouched by the device.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapConditions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timed: Option<ConditionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_detections: Option<ConditionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_confidence: Option<ConditionConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lost_mid: Option<ConditionConfig>,
}

/// Snapping section of an Export Service snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ExportedSnapping {
    #[serde(default)]
    pub running: bool,
    #[serde(flatten)]
    pub conditions: SnapConditions,
}

/// Device configuration as returned by the Export Service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportedConfig {
    pub classes: Vec<String>,
    pub confidence_threshold: f64,
    #[serde(default)]
    pub snapping: Option<ExportedSnapping>,
}

/// Parse an Export Service reply, unwrapping an optional `data` envelope.
/// `None` when the device has no export or the shape is not recognized.
pub fn parse_exported(ack: &serde_json::Value) -> Option<ExportedConfig> {
    let body = match ack.get("data") {
        Some(inner) if inner.is_object() => inner,
        _ => ack,
    };
    match serde_json::from_value(body.clone()) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::debug!(error = %e, "export snapshot not recognized");
            None
        }
    }
}

/// Fail on an explicit `{ "ok": false, "reason": ... }` acknowledgment.
/// Anything else, including `null`, counts as accepted.
pub fn check_ack(ack: &serde_json::Value) -> BoxPromptResult<()> {
    if ack.get("ok").and_then(|v| v.as_bool()) == Some(false) {
        let reason = ack
            .get("reason")
            .and_then(|r| r.as_str())
            .unwrap_or("rejected");
        return Err(BoxPromptError::Bridge(reason.to_string()));
    }
    Ok(())
}

/// Pixel box the device reports having used for a box prompt, if any.
pub fn ack_pixel_box(ack: &serde_json::Value) -> Option<PixelBox> {
    serde_json::from_value(ack.get("bbox")?.clone()).ok()
}
