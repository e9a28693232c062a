use crate::geometry::{DragRect, Point};

/// Lifecycle of a box-drawing gesture over the overlay.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DrawState {
    Idle,
    /// Drawing is armed. `anchor` is set once the pointer goes down.
    Dragging {
        anchor: Option<Point>,
        rect: Option<DragRect>,
    },
    /// Pointer released; the rect is being normalized and dispatched.
    Committing { rect: DragRect },
}

/// Single-pointer draw gesture. At most one drag is active at a time.
#[derive(Debug, Clone)]
pub struct DrawGesture {
    state: DrawState,
}

impl DrawGesture {
    pub fn new() -> Self {
        Self {
            state: DrawState::Idle,
        }
    }

    pub fn state(&self) -> DrawState {
        self.state
    }

    pub fn is_drawing(&self) -> bool {
        !matches!(self.state, DrawState::Idle)
    }

    /// Arm the gesture. Any partially traced rectangle is discarded.
    pub fn begin(&mut self) {
        tracing::debug!(from = ?self.state, "draw gesture armed");
        self.state = DrawState::Dragging {
            anchor: None,
            rect: None,
        };
    }

    /// Returns false when the gesture is not armed.
    pub fn pointer_down(&mut self, p: Point) -> bool {
        match self.state {
            DrawState::Dragging { .. } => {
                self.state = DrawState::Dragging {
                    anchor: Some(p),
                    rect: Some(DragRect { x: p.x, y: p.y, w: 0.0, h: 0.0 }),
                };
                true
            }
            _ => false,
        }
    }

    /// Update the traced rectangle. Returns it so the caller can redraw the guide.
    pub fn pointer_move(&mut self, p: Point) -> Option<DragRect> {
        let DrawState::Dragging { anchor: Some(anchor), .. } = self.state else {
            return None;
        };
        let rect = DragRect::from_corners(anchor, p);
        self.state = DrawState::Dragging {
            anchor: Some(anchor),
            rect: Some(rect),
        };
        Some(rect)
    }

    /// Release the pointer. Moves to `Committing` when a rectangle was traced.
    pub fn pointer_up(&mut self) -> Option<DragRect> {
        let DrawState::Dragging { rect: Some(rect), .. } = self.state else {
            return None;
        };
        self.state = DrawState::Committing { rect };
        Some(rect)
    }

    /// Return to `Idle` from any state.
    pub fn finish(&mut self) {
        self.state = DrawState::Idle;
    }
}

impl Default for DrawGesture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_drag_cycle() {
        let mut g = DrawGesture::new();
        assert!(!g.is_drawing());
        g.begin();
        assert!(g.pointer_down(Point::new(300.0, 200.0)));
        g.pointer_move(Point::new(250.0, 260.0));
        let r = g.pointer_move(Point::new(100.0, 100.0)).unwrap();
        assert_eq!(r, DragRect { x: 100.0, y: 100.0, w: 200.0, h: 100.0 });
        assert_eq!(g.pointer_up(), Some(r));
        assert_eq!(g.state(), DrawState::Committing { rect: r });
        g.finish();
        assert_eq!(g.state(), DrawState::Idle);
    }

    #[test]
    fn pointer_events_ignored_while_idle() {
        let mut g = DrawGesture::new();
        assert!(!g.pointer_down(Point::new(1.0, 1.0)));
        assert!(g.pointer_move(Point::new(5.0, 5.0)).is_none());
        assert!(g.pointer_up().is_none());
        assert_eq!(g.state(), DrawState::Idle);
    }

    #[test]
    fn move_before_down_does_nothing() {
        let mut g = DrawGesture::new();
        g.begin();
        assert!(g.pointer_move(Point::new(5.0, 5.0)).is_none());
        assert!(g.pointer_up().is_none());
        assert!(matches!(g.state(), DrawState::Dragging { anchor: None, .. }));
    }

    #[test]
    fn click_without_move_commits_zero_rect() {
        let mut g = DrawGesture::new();
        g.begin();
        g.pointer_down(Point::new(10.0, 20.0));
        let r = g.pointer_up().unwrap();
        assert!(r.is_degenerate());
    }

    #[test]
    fn begin_again_discards_rect() {
        let mut g = DrawGesture::new();
        g.begin();
        g.pointer_down(Point::new(0.0, 0.0));
        g.pointer_move(Point::new(50.0, 50.0));
        g.begin();
        assert_eq!(g.state(), DrawState::Dragging { anchor: None, rect: None });
    }

    #[test]
    fn state_serializes_with_tag() {
        let v = serde_json::to_value(DrawState::Idle).unwrap();
        assert_eq!(v, serde_json::json!({ "state": "idle" }));
    }
}
