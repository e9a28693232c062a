/// Box-prompt controller: the caller side of the normalizer.
///
/// Owns the draw gesture, the image-prompt label registry and the parameters
/// last sent to the device. Everything outside the process (device services,
/// media element, overlay, toasts, connection state) is injected.
use std::sync::Arc;

use crate::bridge::services::{
    ack_pixel_box, check_ack, parse_exported, BBoxPromptPayload, DeleteImagePrompt, DeviceParams,
    ImageUploadPayload, RenameImagePrompt, SelectionRequest, SnapConditions, BBOX_PROMPT_SERVICE,
    CLASS_UPDATE_SERVICE, CURRENT_PARAMS_SERVICE, DELETE_IMAGE_PROMPT_SERVICE, EXPORT_SERVICE,
    IMAGE_UPLOAD_SERVICE, RENAME_IMAGE_PROMPT_SERVICE, SNAP_COLLECTION_SERVICE,
    THRESHOLD_UPDATE_SERVICE,
};
use crate::bridge::ServiceBridge;
use crate::config::{AppConfig, SelectionConfig};
use crate::errors::{BoxPromptError, BoxPromptResult};
use crate::geometry::{
    normalize, normalize_point, ContentFit, DragRect, NormalizeError, NormalizedBox,
    NormalizedPoint, Point,
};
use crate::gesture::{DrawGesture, DrawState};
use crate::notify::{NotificationLevel, Notifier};
use crate::prompts::labels::ImagePromptLabels;
use crate::snapping::{edge_buffer_ok, threshold_ok, SnapSettings};
use crate::viewer::{ConnectionStatus, MediaProbe, OverlaySurface};

const MIN_CONFIDENCE: f64 = 0.01;
const MAX_CONFIDENCE: f64 = 0.99;
const PROMPTS_CLEARED: &str = "Image prompts cleared. Using text prompts for detection.";

/// External collaborators handed to the controller.
pub struct Collaborators {
    pub bridge: Arc<dyn ServiceBridge>,
    pub media: Arc<dyn MediaProbe>,
    pub overlay: Box<dyn OverlaySurface>,
    pub notifier: Arc<dyn Notifier>,
    pub connection: Arc<dyn ConnectionStatus>,
}

pub struct BoxPromptController {
    bridge: Arc<dyn ServiceBridge>,
    media: Arc<dyn MediaProbe>,
    overlay: Box<dyn OverlaySurface>,
    notifier: Arc<dyn Notifier>,
    connection: Arc<dyn ConnectionStatus>,
    gesture: DrawGesture,
    labels: ImagePromptLabels,
    text_classes: Vec<String>,
    confidence: Option<f64>,
    canvas_fit: ContentFit,
    selection: SelectionConfig,
    max_num_classes: usize,
    last_connected: Option<bool>,
    params_loaded: bool,
    snap: SnapSettings,
    snapping: bool,
    config_restored: bool,
}

impl BoxPromptController {
    pub fn new(config: &AppConfig, collab: Collaborators) -> BoxPromptResult<Self> {
        let labels = ImagePromptLabels::new(&config.prompts.label_prefix, config.prompts.max_image_prompts)?;
        Ok(Self {
            bridge: collab.bridge,
            media: collab.media,
            overlay: collab.overlay,
            notifier: collab.notifier,
            connection: collab.connection,
            gesture: DrawGesture::new(),
            labels,
            text_classes: config.prompts.default_classes.clone(),
            confidence: None,
            canvas_fit: config.viewer.canvas_fit,
            selection: config.selection.clone(),
            max_num_classes: config.prompts.max_num_classes,
            last_connected: None,
            params_loaded: false,
            snap: config.snapping,
            snapping: false,
            config_restored: false,
        })
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    pub fn draw_state(&self) -> DrawState {
        self.gesture.state()
    }

    pub fn image_prompt_labels(&self) -> &[String] {
        self.labels.labels()
    }

    pub fn text_classes(&self) -> &[String] {
        &self.text_classes
    }

    pub fn confidence(&self) -> Option<f64> {
        self.confidence
    }

    pub fn params_loaded(&self) -> bool {
        self.params_loaded
    }

    pub fn snap_settings(&self) -> &SnapSettings {
        &self.snap
    }

    pub fn is_snapping(&self) -> bool {
        self.snapping
    }

    pub fn config_restored(&self) -> bool {
        self.config_restored
    }

    // ── Box drawing ─────────────────────────────────────────────────────────

    /// Arm the overlay for a new box. Refused while the prompt registry is full.
    pub fn begin_draw(&mut self) -> BoxPromptResult<()> {
        if self.labels.is_full() {
            self.warn_prompt_limit();
            return Err(BoxPromptError::PromptLimit(self.labels.max()));
        }
        tracing::debug!("begin drawing requested");
        self.gesture.begin();
        self.overlay.clear();
        Ok(())
    }

    pub fn pointer_down(&mut self, p: Point) -> bool {
        let started = self.gesture.pointer_down(p);
        if started {
            tracing::debug!(x = p.x, y = p.y, "pointer down");
        }
        started
    }

    pub fn pointer_move(&mut self, p: Point) -> Option<DragRect> {
        let rect = self.gesture.pointer_move(p)?;
        self.overlay.clear();
        self.overlay.draw_guide(&rect);
        Some(rect)
    }

    /// Release the pointer. `Ok(None)` when no box was being traced.
    pub async fn pointer_up(&mut self) -> BoxPromptResult<Option<NormalizedBox>> {
        let Some(rect) = self.gesture.pointer_up() else {
            return Ok(None);
        };
        self.finalize(rect).await.map(Some)
    }

    /// Normalize `rect` against the current media and send it as an image prompt.
    /// The gesture is back at `Idle` and the overlay cleared on every return path.
    pub async fn finalize(&mut self, rect: DragRect) -> BoxPromptResult<NormalizedBox> {
        let bbox = match self.measure(&rect) {
            Ok(b) => b,
            Err(e) => return Err(self.reject(e)),
        };

        let Some(label) = self.labels.next_label() else {
            self.warn_prompt_limit();
            self.reset_drawing();
            return Err(BoxPromptError::PromptLimit(self.labels.max()));
        };

        self.notifier.notify(
            &format!("Sending box {}", bbox.summary()),
            NotificationLevel::Info,
            None,
        );
        let frame = self.media.capture_frame();
        tracing::info!(
            x = bbox.x,
            y = bbox.y,
            width = bbox.width,
            height = bbox.height,
            label = %label,
            with_frame = frame.is_some(),
            "posting box prompt"
        );
        self.reset_drawing();

        let payload = serde_json::to_value(BBoxPromptPayload::new(bbox, label.clone(), frame.as_deref()))?;
        match self.post_checked(BBOX_PROMPT_SERVICE, payload).await {
            Ok(ack) => {
                if let Some(px) = ack_pixel_box(&ack) {
                    tracing::debug!(x0 = px.x0, y0 = px.y0, x1 = px.x1, y1 = px.y1, "device crop");
                }
                self.labels.commit(label)?;
                self.notifier.notify("Bounding box sent", NotificationLevel::Success, None);
                Ok(bbox)
            }
            Err(e) => {
                self.notifier.notify(
                    &format!("Failed to send bounding box: {e}"),
                    NotificationLevel::Error,
                    Some(6000),
                );
                Err(e)
            }
        }
    }

    fn measure(&self, rect: &DragRect) -> Result<NormalizedBox, NormalizeError> {
        if rect.is_degenerate() {
            return Err(NormalizeError::TooSmall);
        }
        let media = self.media.snapshot().ok_or(NormalizeError::NoSourceMedia)?;
        let bbox = normalize(rect, &media.display, media.source, media.fit(self.canvas_fit))?;
        tracing::trace!(px = ?bbox.to_pixel_box(media.source), kind = ?media.kind, "expected source pixels");
        Ok(bbox)
    }

    fn reject(&mut self, err: NormalizeError) -> BoxPromptError {
        tracing::warn!(reason = %err, "box rejected");
        self.notifier.notify(err.user_message(), err.level(), err.duration_ms());
        self.reset_drawing();
        err.into()
    }

    fn reset_drawing(&mut self) {
        self.gesture.finish();
        self.overlay.clear();
    }

    fn warn_prompt_limit(&self) {
        self.notifier.notify(
            &format!(
                "Maximum of {} image prompts reached. Delete some before adding more.",
                self.labels.max()
            ),
            NotificationLevel::Warning,
            Some(6000),
        );
    }

    // ── Image prompt management ─────────────────────────────────────────────

    /// Re-send the text classes so the device drops its image prompts.
    pub async fn reset_image_prompts(&mut self) -> BoxPromptResult<()> {
        self.require_connection("Unable to reset prompts.")?;
        let payload = serde_json::to_value(&self.text_classes)?;
        self.post_checked(CLASS_UPDATE_SERVICE, payload).await?;
        self.labels.clear();
        self.notifier.notify(PROMPTS_CLEARED, NotificationLevel::Success, Some(5000));
        Ok(())
    }

    pub async fn rename_image_prompt(&mut self, index: usize, new_label: &str) -> BoxPromptResult<()> {
        let new_label = new_label.trim();
        if new_label.is_empty() {
            self.notifier.notify("Label cannot be empty", NotificationLevel::Warning, None);
            return Err(BoxPromptError::InvalidLabel("label cannot be empty".into()));
        }
        if index >= self.labels.len() {
            return Err(BoxPromptError::InvalidLabel(format!("no image prompt at index {index}")));
        }
        if self.labels.labels()[index] == new_label {
            return Ok(());
        }
        self.require_connection("Unable to rename.")?;

        let payload = serde_json::to_value(RenameImagePrompt {
            index,
            new_label: new_label.to_string(),
        })?;
        self.post_checked(RENAME_IMAGE_PROMPT_SERVICE, payload).await?;
        self.labels.rename(index, new_label)?;
        self.notifier.notify(
            &format!("Renamed image prompt #{} to \"{}\"", index + 1, new_label),
            NotificationLevel::Success,
            Some(3000),
        );
        Ok(())
    }

    pub async fn delete_image_prompt(&mut self, index: usize) -> BoxPromptResult<()> {
        if index >= self.labels.len() {
            return Err(BoxPromptError::InvalidLabel(format!("no image prompt at index {index}")));
        }
        self.require_connection("Unable to delete.")?;

        let payload = serde_json::to_value(DeleteImagePrompt { index })?;
        self.post_checked(DELETE_IMAGE_PROMPT_SERVICE, payload).await?;
        let removed = self.labels.remove(index)?;
        self.notifier.notify(
            &format!("Deleted image prompt \"{removed}\""),
            NotificationLevel::Success,
            Some(3000),
        );
        Ok(())
    }

    /// Send an image file as a prompt. The label is the filename without its
    /// extension, or the next generated label when the stem is blank.
    pub async fn upload_image_prompt(
        &mut self,
        filename: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> BoxPromptResult<String> {
        if self.labels.is_full() {
            self.warn_prompt_limit();
            return Err(BoxPromptError::PromptLimit(self.labels.max()));
        }
        if bytes.is_empty() {
            self.notifier.notify("Please choose an image first", NotificationLevel::Warning, None);
            return Err(BoxPromptError::InvalidParam(format!("{filename} is empty")));
        }
        self.require_connection("Unable to upload image.")?;

        let stem = match filename.rfind('.') {
            Some(dot) if dot > 0 => &filename[..dot],
            _ => filename,
        };
        let label = match stem.trim() {
            "" => self
                .labels
                .next_label()
                .ok_or(BoxPromptError::PromptLimit(self.labels.max()))?,
            s => s.to_string(),
        };

        let size_kb = ((bytes.len() as f64) / 1024.0).round().max(1.0) as u64;
        self.notifier.notify(
            &format!("Uploading {filename} ({size_kb} KB)…"),
            NotificationLevel::Info,
            None,
        );
        tracing::info!(filename, content_type, bytes = bytes.len(), label = %label, "uploading image prompt");

        let payload = serde_json::to_value(ImageUploadPayload::new(filename, content_type, bytes, label.clone()))?;
        self.post_checked(IMAGE_UPLOAD_SERVICE, payload).await?;
        self.labels.commit(label.clone())?;
        self.notifier.notify(
            &format!("Image uploaded: {filename}"),
            NotificationLevel::Success,
            Some(6000),
        );
        Ok(label)
    }

    // ── Detection parameters ────────────────────────────────────────────────

    /// Replace the text classes. Existing image prompts are dropped on success.
    pub async fn update_classes(&mut self, classes: Vec<String>) -> BoxPromptResult<()> {
        let classes: Vec<String> = classes
            .into_iter()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();
        if classes.is_empty() {
            self.notifier.notify("Enter at least one class", NotificationLevel::Warning, None);
            return Err(BoxPromptError::InvalidParam("class list is empty".into()));
        }
        if classes.len() > self.max_num_classes {
            self.notifier.notify(
                &format!("At most {} classes are supported", self.max_num_classes),
                NotificationLevel::Warning,
                None,
            );
            return Err(BoxPromptError::InvalidParam(format!(
                "{} classes exceeds the maximum of {}",
                classes.len(),
                self.max_num_classes
            )));
        }
        self.require_connection("Unable to update classes.")?;

        let plural = if classes.len() > 1 { "es" } else { "" };
        self.notifier.notify(
            &format!("Updating {} class{plural}…", classes.len()),
            NotificationLevel::Info,
            None,
        );
        let payload = serde_json::to_value(&classes)?;
        self.post_checked(CLASS_UPDATE_SERVICE, payload).await?;

        self.notifier.notify(
            &format!("Classes updated ({})", classes.join(", ")),
            NotificationLevel::Success,
            Some(6000),
        );
        self.text_classes = classes;
        if !self.labels.is_empty() {
            self.labels.clear();
            self.notifier.notify(PROMPTS_CLEARED, NotificationLevel::Info, Some(5000));
        }
        Ok(())
    }

    /// Send a new confidence threshold. Returns the value actually applied.
    pub async fn update_confidence(&mut self, value: f64) -> BoxPromptResult<f64> {
        if !value.is_finite() {
            tracing::warn!(value, "invalid threshold, skipping update");
            return Err(BoxPromptError::InvalidParam(format!("confidence {value} is not a number")));
        }
        let value = value.clamp(MIN_CONFIDENCE, MAX_CONFIDENCE);
        self.require_connection("Unable to update threshold.")?;
        self.post_checked(THRESHOLD_UPDATE_SERVICE, serde_json::json!(value)).await?;
        tracing::info!(value, "confidence threshold updated");
        self.confidence = Some(value);
        Ok(value)
    }

    /// Pull the parameters the device is running with and adopt them.
    pub async fn refresh_params(&mut self) -> BoxPromptResult<DeviceParams> {
        self.require_connection("")?;
        tracing::debug!("requesting current params from device");
        let ack = self.bridge.fetch(CURRENT_PARAMS_SERVICE).await?;
        let params: DeviceParams = serde_json::from_value(ack)?;

        self.confidence = Some(params.confidence_threshold);
        self.text_classes = params.class_names.clone();
        self.labels.replace(params.image_prompt_labels.clone());
        self.params_loaded = true;
        tracing::info!(
            confidence = params.confidence_threshold,
            classes = params.class_names.len(),
            image_prompts = params.image_prompt_labels.len(),
            "current params loaded"
        );
        Ok(params)
    }

    /// Observe the connection provider. Toasts on every change and reloads
    /// parameters on (re)connect. Returns whether the state changed.
    pub async fn sync_connection(&mut self) -> BoxPromptResult<bool> {
        let connected = self.connection.is_connected();
        if self.last_connected == Some(connected) {
            return Ok(false);
        }
        self.last_connected = Some(connected);

        if connected {
            self.notifier.notify("Connected to device", NotificationLevel::Success, Some(1800));
            if let Err(e) = self.refresh_params().await {
                tracing::warn!(error = %e, "failed to load current params after connect");
            }
            if !self.config_restored {
                if let Err(e) = self.restore_exported_config().await {
                    tracing::warn!(error = %e, "failed to restore exported config after connect");
                }
            }
        } else {
            self.notifier.notify("Disconnected from device", NotificationLevel::Warning, Some(1800));
            self.params_loaded = false;
            self.config_restored = false;
        }
        Ok(true)
    }

    /// Adopt the classes, threshold and snapping state the device exports.
    /// Returns `false` when the device has nothing recognizable to export.
    pub async fn restore_exported_config(&mut self) -> BoxPromptResult<bool> {
        self.require_connection("")?;
        tracing::debug!("requesting exported config from device");
        let ack = self.bridge.fetch(EXPORT_SERVICE).await?;
        let Some(exported) = parse_exported(&ack) else {
            tracing::info!("no exported config on device, keeping local settings");
            return Ok(false);
        };

        if !exported.classes.is_empty() {
            self.text_classes = exported.classes;
        }
        if exported.confidence_threshold.is_finite() {
            self.confidence = Some(exported.confidence_threshold);
        }
        if let Some(snapping) = exported.snapping {
            self.snap.restore(&snapping);
            self.snapping = snapping.running;
        }
        self.config_restored = true;
        tracing::info!(classes = ?self.text_classes, snapping = self.snapping, "config restored from device");
        self.notifier.notify("Configuration restored from backend", NotificationLevel::Success, None);
        Ok(true)
    }

    // ── Snap collection ─────────────────────────────────────────────────────

    /// Replace the snapping conditions. Refused while a session is running.
    pub fn configure_snapping(&mut self, settings: SnapSettings) -> BoxPromptResult<()> {
        if self.snapping {
            self.notifier.notify(
                "Stop snapping before changing conditions.",
                NotificationLevel::Warning,
                None,
            );
            return Err(BoxPromptError::InvalidParam("snapping is running".into()));
        }
        self.snap = settings;
        Ok(())
    }

    pub async fn start_snapping(&mut self) -> BoxPromptResult<()> {
        self.require_connection("")?;
        if self.snapping {
            tracing::debug!("snapping already running");
            return Ok(());
        }
        if let Some(problem) = self.snap.problem() {
            self.notifier.notify(problem, NotificationLevel::Error, None);
            return Err(BoxPromptError::InvalidParam(problem.to_string()));
        }
        self.notifier.notify("Starting snapping…", NotificationLevel::Info, None);
        self.post_snap(self.snap.start_payload()).await?;
        self.snapping = true;
        self.notifier.notify("Snapping started.", NotificationLevel::Success, None);
        Ok(())
    }

    pub async fn stop_snapping(&mut self) -> BoxPromptResult<()> {
        self.require_connection("")?;
        if !self.snapping {
            tracing::debug!("snapping not running");
            return Ok(());
        }
        self.notifier.notify("Stopping snapping…", NotificationLevel::Info, None);
        self.post_snap(SnapSettings::stop_payload()).await?;
        self.snapping = false;
        self.notifier.notify("Snapping stopped.", NotificationLevel::Success, None);
        Ok(())
    }

    /// Change the low-confidence threshold. While snapping runs the change is
    /// pushed to the device at once; returns whether it was.
    pub async fn update_low_confidence(&mut self, threshold: f64) -> BoxPromptResult<bool> {
        if !threshold_ok(threshold) {
            let msg = "Confidence threshold must be between 0.00 and 1.00.";
            self.notifier.notify(msg, NotificationLevel::Error, None);
            return Err(BoxPromptError::InvalidParam(msg.into()));
        }
        self.snap.low_confidence_threshold = threshold;
        if !self.pushes_live_updates() {
            return Ok(false);
        }
        let Some(update) = self.snap.low_confidence_update() else {
            return Ok(false);
        };
        self.post_snap(update).await?;
        Ok(true)
    }

    /// Change the lost-in-middle edge buffer, in percent of the frame.
    pub async fn update_edge_buffer(&mut self, percent: f64) -> BoxPromptResult<bool> {
        if !edge_buffer_ok(percent) {
            let msg = "Edge buffer must be between 0% and 49%.";
            self.notifier.notify(msg, NotificationLevel::Error, None);
            return Err(BoxPromptError::InvalidParam(msg.into()));
        }
        self.snap.lost_mid_edge_pct = percent;
        if !self.pushes_live_updates() {
            return Ok(false);
        }
        let Some(update) = self.snap.lost_mid_update() else {
            return Ok(false);
        };
        self.post_snap(update).await?;
        Ok(true)
    }

    fn pushes_live_updates(&self) -> bool {
        self.snapping && self.connection.is_connected()
    }

    async fn post_snap(&self, conditions: SnapConditions) -> BoxPromptResult<serde_json::Value> {
        let payload = serde_json::to_value(conditions)?;
        tracing::debug!(payload = %payload, "posting snap conditions");
        self.post_checked(SNAP_COLLECTION_SERVICE, payload).await
    }

    // ── Point selection ─────────────────────────────────────────────────────

    /// Send a click on the media element as a normalized point.
    /// Clicks on letterbox bars are dropped without a toast.
    pub async fn select_point(&mut self, p: Point) -> BoxPromptResult<NormalizedPoint> {
        let Some(media) = self.media.snapshot() else {
            let e = NormalizeError::NoSourceMedia;
            self.notifier.notify(e.user_message(), e.level(), e.duration_ms());
            return Err(e.into());
        };
        let point = match normalize_point(p, &media.display, self.selection.fit()) {
            Ok(point) => point,
            Err(e) => {
                tracing::debug!(x = p.x, y = p.y, reason = %e, "click ignored");
                return Err(e.into());
            }
        };
        self.require_connection("")?;
        let payload = serde_json::to_value(SelectionRequest::Point(point))?;
        self.post_checked(&self.selection.service, payload).await?;
        Ok(point)
    }

    pub async fn clear_points(&mut self) -> BoxPromptResult<()> {
        self.require_connection("")?;
        let payload = serde_json::to_value(SelectionRequest::Clear { clear: true })?;
        self.post_checked(&self.selection.service, payload).await?;
        Ok(())
    }

    // ── Helpers ─────────────────────────────────────────────────────────────

    fn require_connection(&self, action: &str) -> BoxPromptResult<()> {
        if self.connection.is_connected() {
            return Ok(());
        }
        let msg = if action.is_empty() {
            "Not connected to device".to_string()
        } else {
            format!("Not connected to device. {action}")
        };
        self.notifier.notify(&msg, NotificationLevel::Error, None);
        Err(BoxPromptError::NotConnected)
    }

    async fn post_checked(&self, service: &str, payload: serde_json::Value) -> BoxPromptResult<serde_json::Value> {
        let ack = self.bridge.post(service, payload).await?;
        check_ack(&ack)?;
        Ok(ack)
    }
}
