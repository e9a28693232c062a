use crate::geometry::DragRect;

/// Drawing surface laid over the stream while a box is being traced.
pub trait OverlaySurface: Send + Sync {
    fn clear(&mut self);
    fn draw_guide(&mut self, rect: &DragRect);
}

/// Overlay for headless runs: records the guide and logs each redraw.
#[derive(Debug, Default)]
pub struct TracingOverlay {
    guide: Option<DragRect>,
}

impl OverlaySurface for TracingOverlay {
    fn clear(&mut self) {
        if self.guide.take().is_some() {
            tracing::trace!("overlay cleared");
        }
    }

    fn draw_guide(&mut self, rect: &DragRect) {
        tracing::trace!(x = rect.x, y = rect.y, w = rect.w, h = rect.h, "guide rectangle");
        self.guide = Some(*rect);
    }
}
