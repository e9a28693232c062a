use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use crate::config::{self, AppConfig};
use crate::errors::BoxPromptResult;
use crate::geometry::{DisplayRect, Point, SourceSize};
use crate::notify::NotificationQueue;
use crate::prompts::BoxPromptController;
use crate::snapping::SnapSettings;
use crate::viewer::{MediaKind, MediaSnapshot, SharedConnection, SharedMedia};

/// One line of the driver's stdin protocol, e.g. `{"cmd": "pointer_down", "x": 10, "y": 20}`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ViewerCommand {
    BeginDraw,
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    /// Media element measurements, pushed whenever the viewer lays out.
    Media {
        kind: MediaKind,
        display: DisplayRect,
        source: SourceSize,
    },
    ClearMedia,
    Connection { connected: bool },
    UpdateClasses { classes: Vec<String> },
    SetConfidence { value: f64 },
    RenamePrompt { index: usize, label: String },
    DeletePrompt { index: usize },
    ResetPrompts,
    /// Image file on disk sent as a prompt. The content type is guessed from
    /// the extension when omitted.
    UploadImage {
        path: PathBuf,
        #[serde(default)]
        content_type: Option<String>,
    },
    RefreshParams,
    RestoreConfig,
    SelectPoint { x: f64, y: f64 },
    ClearPoints,
    ConfigureSnapping { settings: SnapSettings },
    StartSnapping,
    StopSnapping,
    SnapLowConfidence { threshold: f64 },
    SnapEdgeBuffer { percent: f64 },
    Notifications,
    Dismiss { id: u64 },
    /// Persist the current classes and snapping conditions to `config.toml`.
    SaveConfig,
}

/// Host-side state the commands read and write.
pub struct ViewerHost {
    pub media: SharedMedia,
    pub connection: SharedConnection,
    pub notifications: Arc<NotificationQueue>,
    pub config: AppConfig,
}

impl ViewerHost {
    pub fn new(config: AppConfig) -> Self {
        Self {
            media: SharedMedia::new(),
            connection: SharedConnection::new(false),
            notifications: Arc::new(NotificationQueue::new(&config.notifications)),
            config,
        }
    }

    /// Running config with the controller's current classes and snapping conditions.
    pub fn snapshot_config(&self, ctl: &BoxPromptController) -> AppConfig {
        let mut cfg = self.config.clone();
        cfg.prompts.default_classes = ctl.text_classes().to_vec();
        cfg.snapping = *ctl.snap_settings();
        cfg
    }
}

/// Blank lines and `#` comments yield `None`.
pub fn parse_line(line: &str) -> BoxPromptResult<Option<ViewerCommand>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    Ok(Some(serde_json::from_str(line)?))
}

fn guess_content_type(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

pub async fn dispatch(
    ctl: &mut BoxPromptController,
    host: &ViewerHost,
    cmd: ViewerCommand,
) -> BoxPromptResult<()> {
    tracing::trace!(?cmd, "dispatching viewer command");
    match cmd {
        ViewerCommand::BeginDraw => ctl.begin_draw()?,
        ViewerCommand::PointerDown { x, y } => {
            ctl.pointer_down(Point::new(x, y));
        }
        ViewerCommand::PointerMove { x, y } => {
            ctl.pointer_move(Point::new(x, y));
        }
        ViewerCommand::PointerUp => {
            if let Some(b) = ctl.pointer_up().await? {
                tracing::info!(bbox = %b.summary(), "box prompt accepted");
            }
        }
        ViewerCommand::Media { kind, display, source } => {
            host.media.set(Some(MediaSnapshot { kind, display, source }));
        }
        ViewerCommand::ClearMedia => host.media.set(None),
        ViewerCommand::Connection { connected } => {
            host.connection.set(connected);
            ctl.sync_connection().await?;
        }
        ViewerCommand::UpdateClasses { classes } => ctl.update_classes(classes).await?,
        ViewerCommand::SetConfidence { value } => {
            ctl.update_confidence(value).await?;
        }
        ViewerCommand::RenamePrompt { index, label } => ctl.rename_image_prompt(index, &label).await?,
        ViewerCommand::DeletePrompt { index } => ctl.delete_image_prompt(index).await?,
        ViewerCommand::ResetPrompts => ctl.reset_image_prompts().await?,
        ViewerCommand::UploadImage { path, content_type } => {
            let bytes = tokio::fs::read(&path).await?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let content_type = content_type.unwrap_or_else(|| guess_content_type(&path).to_string());
            ctl.upload_image_prompt(&filename, &content_type, &bytes).await?;
        }
        ViewerCommand::RefreshParams => {
            ctl.refresh_params().await?;
        }
        ViewerCommand::RestoreConfig => {
            ctl.restore_exported_config().await?;
        }
        ViewerCommand::SelectPoint { x, y } => {
            ctl.select_point(Point::new(x, y)).await?;
        }
        ViewerCommand::ClearPoints => ctl.clear_points().await?,
        ViewerCommand::ConfigureSnapping { settings } => ctl.configure_snapping(settings)?,
        ViewerCommand::StartSnapping => ctl.start_snapping().await?,
        ViewerCommand::StopSnapping => ctl.stop_snapping().await?,
        ViewerCommand::SnapLowConfidence { threshold } => {
            ctl.update_low_confidence(threshold).await?;
        }
        ViewerCommand::SnapEdgeBuffer { percent } => {
            ctl.update_edge_buffer(percent).await?;
        }
        ViewerCommand::Notifications => {
            for n in host.notifications.visible() {
                tracing::info!(id = n.id, level = ?n.level, created_at = %n.created_at, "{}", n.message);
            }
        }
        ViewerCommand::Dismiss { id } => {
            if !host.notifications.dismiss(id) {
                tracing::debug!(id, "no such notification");
            }
        }
        ViewerCommand::SaveConfig => config::save_config(&host.snapshot_config(ctl))?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::bridge::HttpBridge;
    use crate::config::BridgeConfig;
    use crate::errors::BoxPromptError;
    use crate::geometry::NormalizeError;
    use crate::gesture::DrawState;
    use crate::notify::{NotificationLevel, Notifier};
    use crate::prompts::Collaborators;
    use crate::viewer::TracingOverlay;

    fn controller(host: &ViewerHost) -> BoxPromptController {
        // Nothing in these tests reaches the bridge.
        let bridge = HttpBridge::new(&BridgeConfig {
            endpoint: "http://127.0.0.1:9/services".into(),
            timeout_ms: 100,
        })
        .unwrap();
        BoxPromptController::new(
            &host.config,
            Collaborators {
                bridge: Arc::new(bridge),
                media: Arc::new(host.media.clone()),
                overlay: Box::new(TracingOverlay::default()),
                notifier: host.notifications.clone(),
                connection: Arc::new(host.connection.clone()),
            },
        )
        .unwrap()
    }

    #[test]
    fn parses_tagged_commands() {
        assert_eq!(
            parse_line(r#"{"cmd": "pointer_down", "x": 10, "y": 20.5}"#).unwrap(),
            Some(ViewerCommand::PointerDown { x: 10.0, y: 20.5 })
        );
        let media = parse_line(
            r#"{"cmd":"media","kind":"canvas","display":{"offsetX":0,"offsetY":0,"displayWidth":800,"displayHeight":600},"source":{"width":640,"height":640}}"#,
        )
        .unwrap()
        .unwrap();
        assert!(matches!(media, ViewerCommand::Media { kind: MediaKind::Canvas, .. }));
    }

    #[test]
    fn parses_snapping_and_upload_commands() {
        let cmd = parse_line(
            r#"{"cmd":"configure_snapping","settings":{"timed":{"enabled":true,"cooldown_min":1.5}}}"#,
        )
        .unwrap()
        .unwrap();
        let ViewerCommand::ConfigureSnapping { settings } = cmd else {
            panic!("expected configure_snapping");
        };
        assert!(settings.timed.enabled);
        assert_eq!(settings.timed.cooldown_min, 1.5);
        assert_eq!(settings.lost_mid_edge_pct, 20.0);

        assert_eq!(
            parse_line(r#"{"cmd":"upload_image","path":"prompts/mug.png"}"#).unwrap(),
            Some(ViewerCommand::UploadImage { path: PathBuf::from("prompts/mug.png"), content_type: None })
        );
        assert_eq!(
            parse_line(r#"{"cmd":"snap_edge_buffer","percent":25}"#).unwrap(),
            Some(ViewerCommand::SnapEdgeBuffer { percent: 25.0 })
        );
    }

    #[test]
    fn skips_blank_and_comment_lines() {
        assert_eq!(parse_line("   ").unwrap(), None);
        assert_eq!(parse_line("# draw a box").unwrap(), None);
        assert!(parse_line(r#"{"cmd": "warp"}"#).is_err());
    }

    #[test]
    fn content_type_follows_extension() {
        assert_eq!(guess_content_type(Path::new("a/b/mug.PNG")), "image/png");
        assert_eq!(guess_content_type(Path::new("cup.jpeg")), "image/jpeg");
        assert_eq!(guess_content_type(Path::new("notes")), "application/octet-stream");
    }

    #[tokio::test]
    async fn scripted_drag_without_media_is_rejected() {
        let host = ViewerHost::new(AppConfig::default());
        let mut ctl = controller(&host);
        for line in [
            r#"{"cmd":"begin_draw"}"#,
            r#"{"cmd":"pointer_down","x":10,"y":10}"#,
            r#"{"cmd":"pointer_move","x":90,"y":70}"#,
        ] {
            let cmd = parse_line(line).unwrap().unwrap();
            dispatch(&mut ctl, &host, cmd).await.unwrap();
        }
        assert!(matches!(ctl.draw_state(), DrawState::Dragging { rect: Some(_), .. }));

        let err = dispatch(&mut ctl, &host, ViewerCommand::PointerUp).await.unwrap_err();
        assert!(matches!(err, BoxPromptError::Normalize(NormalizeError::NoSourceMedia)));
        assert_eq!(ctl.draw_state(), DrawState::Idle);
        assert_eq!(
            host.notifications.visible().last().map(|n| n.message.clone()),
            Some(NormalizeError::NoSourceMedia.user_message().to_string())
        );
    }

    #[tokio::test]
    async fn media_command_updates_shared_media() {
        let host = ViewerHost::new(AppConfig::default());
        let mut ctl = controller(&host);
        let cmd = ViewerCommand::Media {
            kind: MediaKind::Video,
            display: DisplayRect::new(0.0, 0.0, 640.0, 480.0),
            source: SourceSize::new(1280, 720),
        };
        dispatch(&mut ctl, &host, cmd).await.unwrap();
        assert!(crate::viewer::MediaProbe::snapshot(&host.media).is_some());
        dispatch(&mut ctl, &host, ViewerCommand::ClearMedia).await.unwrap();
        assert!(crate::viewer::MediaProbe::snapshot(&host.media).is_none());
    }

    #[tokio::test]
    async fn disconnected_commands_fail_fast() {
        let host = ViewerHost::new(AppConfig::default());
        let mut ctl = controller(&host);
        for cmd in [
            ViewerCommand::SetConfidence { value: 0.5 },
            ViewerCommand::StartSnapping,
            ViewerCommand::RestoreConfig,
        ] {
            let err = dispatch(&mut ctl, &host, cmd).await.unwrap_err();
            assert!(matches!(err, BoxPromptError::NotConnected));
        }
    }

    #[tokio::test]
    async fn missing_upload_file_is_io_error() {
        let host = ViewerHost::new(AppConfig::default());
        let mut ctl = controller(&host);
        let path = std::env::temp_dir().join(format!("boxprompt-missing-{}.png", uuid::Uuid::new_v4()));
        let err = dispatch(&mut ctl, &host, ViewerCommand::UploadImage { path, content_type: None })
            .await
            .unwrap_err();
        assert!(matches!(err, BoxPromptError::Io(_)));
        assert!(ctl.image_prompt_labels().is_empty());
    }

    #[tokio::test]
    async fn dismiss_removes_notification() {
        let host = ViewerHost::new(AppConfig::default());
        let mut ctl = controller(&host);
        host.notifications.notify("hello", NotificationLevel::Info, Some(0));
        let id = host.notifications.visible()[0].id;

        dispatch(&mut ctl, &host, ViewerCommand::Notifications).await.unwrap();
        dispatch(&mut ctl, &host, ViewerCommand::Dismiss { id }).await.unwrap();
        assert!(host.notifications.visible().is_empty());
        dispatch(&mut ctl, &host, ViewerCommand::Dismiss { id }).await.unwrap();
    }

    #[tokio::test]
    async fn saved_config_carries_controller_state() {
        let host = ViewerHost::new(AppConfig::default());
        let mut ctl = controller(&host);
        let mut settings = SnapSettings::default();
        settings.no_detections.enabled = true;
        settings.no_detections.cooldown_min = 0.5;
        dispatch(&mut ctl, &host, ViewerCommand::ConfigureSnapping { settings }).await.unwrap();

        let cfg = host.snapshot_config(&ctl);
        assert_eq!(cfg.snapping, settings);
        assert_eq!(cfg.prompts.default_classes, vec!["person", "chair", "TV"]);

        let path = std::env::temp_dir().join(format!("boxprompt-{}.toml", uuid::Uuid::new_v4()));
        config::write_config(&path, &cfg).unwrap();
        let back = config::parse_config(&std::fs::read_to_string(&path).unwrap()).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(back.snapping.no_detections.cooldown_min, 0.5);
    }
}
