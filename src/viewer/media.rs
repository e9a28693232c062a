use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};

use crate::geometry::{ContentFit, DisplayRect, SourceSize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Canvas,
}

/// Measurements of the media element under the overlay, taken just-in-time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MediaSnapshot {
    pub kind: MediaKind,
    pub display: DisplayRect,
    pub source: SourceSize,
}

impl MediaSnapshot {
    /// Video elements fill their box; canvases follow the configured layout.
    pub fn fit(&self, canvas_fit: ContentFit) -> ContentFit {
        match self.kind {
            MediaKind::Video => ContentFit::Display,
            MediaKind::Canvas => canvas_fit,
        }
    }
}

/// Locates the media element the viewer is rendering into.
pub trait MediaProbe: Send + Sync {
    /// `None` when no video or canvas with known dimensions is present.
    fn snapshot(&self) -> Option<MediaSnapshot>;

    /// Encoded frame (PNG) to attach to a box prompt. The device falls back to
    /// its own cached frame when absent.
    fn capture_frame(&self) -> Option<Vec<u8>> {
        None
    }
}

/// Media measurements pushed in by the host.
#[derive(Debug, Clone, Default)]
pub struct SharedMedia {
    snapshot: Arc<RwLock<Option<MediaSnapshot>>>,
    frame: Arc<RwLock<Option<Vec<u8>>>>,
}

impl SharedMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, snapshot: Option<MediaSnapshot>) {
        *self.snapshot.write().unwrap_or_else(|e| e.into_inner()) = snapshot;
    }

    pub fn set_frame(&self, frame: Option<Vec<u8>>) {
        *self.frame.write().unwrap_or_else(|e| e.into_inner()) = frame;
    }
}

impl MediaProbe for SharedMedia {
    fn snapshot(&self) -> Option<MediaSnapshot> {
        let snap = *self.snapshot.read().unwrap_or_else(|e| e.into_inner());
        // A media element without decoded dimensions is as good as none.
        snap.filter(|s| s.source.width > 0 && s.source.height > 0)
    }

    fn capture_frame(&self) -> Option<Vec<u8>> {
        self.frame.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
