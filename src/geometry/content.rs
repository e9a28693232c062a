use serde::{Deserialize, Serialize};

use crate::geometry::types::{ContentBox, DisplayRect};

/// How source pixels are laid out inside the displayed media element.
///
/// Different viewer panels render differently: video elements fill their box,
/// while canvas previews either show a centered square or a fixed-aspect frame
/// whose height fills the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ContentFit {
    /// Content fills the whole display rectangle.
    Display,
    /// Centered square with side `min(width, height)`.
    #[default]
    CenteredSquare,
    /// Height fills the display, width is `height * aspect`, centered horizontally.
    FixedAspect { aspect: f64 },
    /// Largest `aspect` rectangle that fits, centered, bars on the short axis.
    AspectFit { aspect: f64 },
}

impl ContentFit {
    pub fn from_square_crop(is_square_crop: bool) -> Self {
        if is_square_crop {
            ContentFit::CenteredSquare
        } else {
            ContentFit::Display
        }
    }

    /// Aspect-based layouts need a finite, positive aspect.
    pub fn is_valid(&self) -> bool {
        match *self {
            ContentFit::Display | ContentFit::CenteredSquare => true,
            ContentFit::FixedAspect { aspect } | ContentFit::AspectFit { aspect } => {
                aspect.is_finite() && aspect > 0.0
            }
        }
    }

    /// 4:3 frame drawn into a canvas whose height it fills.
    pub fn four_by_three() -> Self {
        ContentFit::FixedAspect { aspect: 4.0 / 3.0 }
    }

    /// Compute the content box for `display`. Offsets carry through unchanged.
    pub fn content_box(&self, display: &DisplayRect) -> ContentBox {
        let (ox, oy) = (display.offset_x, display.offset_y);
        let (dw, dh) = (display.display_width, display.display_height);
        match *self {
            ContentFit::Display => ContentBox { x: ox, y: oy, w: dw, h: dh },
            ContentFit::CenteredSquare => {
                let side = dw.min(dh);
                ContentBox {
                    x: ox + (dw - side) / 2.0,
                    y: oy + (dh - side) / 2.0,
                    w: side,
                    h: side,
                }
            }
            ContentFit::FixedAspect { aspect } => {
                let w = dh * aspect;
                ContentBox {
                    x: ox + (dw - w) / 2.0,
                    y: oy,
                    w,
                    h: dh,
                }
            }
            ContentFit::AspectFit { aspect } => {
                if dw / dh > aspect {
                    // bars left/right
                    let w = dh * aspect;
                    ContentBox { x: ox + (dw - w) / 2.0, y: oy, w, h: dh }
                } else {
                    // bars top/bottom
                    let h = dw / aspect;
                    ContentBox { x: ox, y: oy + (dh - h) / 2.0, w: dw, h }
                }
            }
        }
    }
}
