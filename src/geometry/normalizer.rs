/// Box normalizer: maps a rectangle drawn over the viewer overlay onto the
/// source frame's pixel grid and expresses it as fractions of the frame size.
///
/// The overlay covers the whole stream container, while the media element may
/// sit anywhere inside it and may itself letterbox or crop the frame. The drag
/// is therefore clipped to the content box first, scaled into source pixels,
/// snapped to the pixel grid and only then normalized.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::content::ContentFit;
use crate::geometry::types::{DisplayRect, DragRect, NormalizedBox, NormalizedPoint, Point, SourceSize};
use crate::notify::NotificationLevel;

/// A clipped box must be wider and taller than this many overlay pixels.
const MIN_CLIPPED_PX: f64 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizeError {
    #[error("selection too small")]
    TooSmall,

    #[error("selection outside of content area")]
    OutOfBounds,

    #[error("no source media to measure")]
    NoSourceMedia,
}

impl NormalizeError {
    /// Text shown to the user when a drag is rejected.
    pub fn user_message(&self) -> &'static str {
        match self {
            NormalizeError::TooSmall => "Selection too small. Please draw a larger box.",
            NormalizeError::OutOfBounds => {
                "Box outside of content area. Try again within the stream."
            }
            NormalizeError::NoSourceMedia => "No video/canvas found. Reset the view and try again.",
        }
    }

    pub fn level(&self) -> NotificationLevel {
        match self {
            NormalizeError::TooSmall | NormalizeError::OutOfBounds => NotificationLevel::Warning,
            NormalizeError::NoSourceMedia => NotificationLevel::Error,
        }
    }

    /// Toast duration override; `None` uses the dispatcher default.
    pub fn duration_ms(&self) -> Option<u64> {
        match self {
            NormalizeError::TooSmall => None,
            NormalizeError::OutOfBounds | NormalizeError::NoSourceMedia => Some(6000),
        }
    }
}

/// Convert a drag rectangle in overlay pixels into a box normalized to `source`.
///
/// `display` is where the media element sits inside the overlay; `fit` says
/// which part of it shows source pixels.
pub fn normalize(
    drag: &DragRect,
    display: &DisplayRect,
    source: SourceSize,
    fit: ContentFit,
) -> Result<NormalizedBox, NormalizeError> {
    if drag.is_degenerate() {
        return Err(NormalizeError::TooSmall);
    }
    if !(drag.x.is_finite() && drag.y.is_finite()) {
        return Err(NormalizeError::OutOfBounds);
    }
    if source.width == 0 || source.height == 0 || !display.is_measurable() {
        return Err(NormalizeError::NoSourceMedia);
    }

    let content = fit.content_box(display);
    if !content.is_usable() {
        tracing::warn!(?fit, ?content, "content box cannot be measured");
        return Err(NormalizeError::NoSourceMedia);
    }

    let rx0 = drag.x.max(content.x);
    let ry0 = drag.y.max(content.y);
    let rx1 = (drag.x + drag.w).min(content.right());
    let ry1 = (drag.y + drag.h).min(content.bottom());
    let rw = (rx1 - rx0).max(0.0);
    let rh = (ry1 - ry0).max(0.0);
    if rw <= MIN_CLIPPED_PX || rh <= MIN_CLIPPED_PX {
        return Err(NormalizeError::OutOfBounds);
    }

    let src_w = source.width as i64;
    let src_h = source.height as i64;
    let scale_x = source.width as f64 / content.w;
    let scale_y = source.height as f64 / content.h;

    let sx0 = to_source_px(rx0 - content.x, scale_x).clamp(0, src_w - 1);
    let sy0 = to_source_px(ry0 - content.y, scale_y).clamp(0, src_h - 1);
    let sx1 = to_source_px(rx1 - content.x, scale_x).clamp(0, src_w);
    let sy1 = to_source_px(ry1 - content.y, scale_y).clamp(0, src_h);
    let sw = (sx1 - sx0).max(1);
    let sh = (sy1 - sy0).max(1);

    let out = NormalizedBox {
        x: sx0 as f64 / src_w as f64,
        y: sy0 as f64 / src_h as f64,
        width: sw as f64 / src_w as f64,
        height: sh as f64 / src_h as f64,
    };

    tracing::debug!(
        content_x = content.x,
        content_y = content.y,
        content_w = content.w,
        content_h = content.h,
        scale_x,
        scale_y,
        sx0,
        sy0,
        sw,
        sh,
        "drag normalized to source frame"
    );
    Ok(out)
}

/// Convert a click at `p` (relative to the media element) into a point
/// normalized to the content box. Clicks on letterbox bars are rejected.
pub fn normalize_point(
    p: Point,
    display: &DisplayRect,
    fit: ContentFit,
) -> Result<NormalizedPoint, NormalizeError> {
    if !display.is_measurable() {
        return Err(NormalizeError::NoSourceMedia);
    }
    if !(p.x.is_finite() && p.y.is_finite()) {
        return Err(NormalizeError::OutOfBounds);
    }

    // Element-local: the click is already relative to the media element.
    let local = DisplayRect::new(0.0, 0.0, display.display_width, display.display_height);
    let content = fit.content_box(&local);
    if !content.is_usable() {
        return Err(NormalizeError::NoSourceMedia);
    }
    if !content.contains(p) {
        return Err(NormalizeError::OutOfBounds);
    }

    Ok(NormalizedPoint {
        x: ((p.x - content.x) / content.w).clamp(0.0, 1.0),
        y: ((p.y - content.y) / content.h).clamp(0.0, 1.0),
    })
}

fn to_source_px(offset: f64, scale: f64) -> i64 {
    (offset * scale).round() as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-5
    }

    fn drag(x: f64, y: f64, w: f64, h: f64) -> DragRect {
        DragRect { x, y, w, h }
    }

    #[test]
    fn double_resolution_source() {
        let display = DisplayRect::new(0.0, 0.0, 640.0, 480.0);
        let b = normalize(
            &drag(100.0, 50.0, 200.0, 100.0),
            &display,
            SourceSize::new(1280, 960),
            ContentFit::Display,
        )
        .unwrap();
        assert!(approx(b.x, 0.15625));
        assert!(approx(b.y, 0.10417));
        assert!(approx(b.width, 0.3125));
        assert!(approx(b.height, 0.20833));
    }

    #[test]
    fn identity_scaling_when_source_matches_content() {
        let display = DisplayRect::new(0.0, 0.0, 640.0, 480.0);
        let d = drag(64.0, 48.0, 128.0, 96.0);
        let b = normalize(&d, &display, SourceSize::new(640, 480), ContentFit::Display).unwrap();
        assert!(approx(b.x, d.x / 640.0));
        assert!(approx(b.y, d.y / 480.0));
        assert!(approx(b.width, d.w / 640.0));
        assert!(approx(b.height, d.h / 480.0));
    }

    #[test]
    fn degenerate_drag_is_too_small() {
        let display = DisplayRect::new(0.0, 0.0, 640.0, 480.0);
        let src = SourceSize::new(640, 480);
        for d in [drag(10.0, 10.0, 0.0, 50.0), drag(10.0, 10.0, 50.0, 0.0), drag(10.0, 10.0, 0.0, 0.0)] {
            assert_eq!(
                normalize(&d, &display, src, ContentFit::Display),
                Err(NormalizeError::TooSmall)
            );
        }
    }

    #[test]
    fn degenerate_drag_wins_over_missing_source() {
        let display = DisplayRect::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(
            normalize(&drag(0.0, 0.0, 0.0, 3.0), &display, SourceSize::new(0, 0), ContentFit::Display),
            Err(NormalizeError::TooSmall)
        );
    }

    #[test]
    fn drag_past_content_edge_is_out_of_bounds() {
        let display = DisplayRect::new(0.0, 0.0, 640.0, 480.0);
        let d = drag(700.0, 10.0, 50.0, 50.0);
        assert_eq!(
            normalize(&d, &display, SourceSize::new(640, 480), ContentFit::Display),
            Err(NormalizeError::OutOfBounds)
        );
    }

    #[test]
    fn drag_left_of_square_crop_is_out_of_bounds() {
        let display = DisplayRect::new(0.0, 0.0, 800.0, 600.0);
        let d = drag(10.0, 100.0, 80.0, 200.0);
        assert_eq!(
            normalize(&d, &display, SourceSize::new(512, 512), ContentFit::from_square_crop(true)),
            Err(NormalizeError::OutOfBounds)
        );
    }

    #[test]
    fn one_pixel_overlap_is_out_of_bounds() {
        let display = DisplayRect::new(0.0, 0.0, 800.0, 600.0);
        // overlaps the square (x >= 100) by exactly one pixel
        let d = drag(50.0, 100.0, 51.0, 200.0);
        assert_eq!(
            normalize(&d, &display, SourceSize::new(512, 512), ContentFit::CenteredSquare),
            Err(NormalizeError::OutOfBounds)
        );
    }

    #[test]
    fn drag_straddling_content_is_clipped() {
        let display = DisplayRect::new(0.0, 0.0, 800.0, 600.0);
        // starts in the left bar, ends a quarter of the way into the square
        let d = drag(0.0, 0.0, 250.0, 300.0);
        let b = normalize(&d, &display, SourceSize::new(600, 600), ContentFit::CenteredSquare).unwrap();
        assert_eq!(b.x, 0.0);
        assert_eq!(b.y, 0.0);
        assert!(approx(b.width, 0.25));
        assert!(approx(b.height, 0.5));
    }

    #[test]
    fn media_offset_inside_overlay_is_respected() {
        let display = DisplayRect::new(40.0, 30.0, 320.0, 240.0);
        let d = drag(40.0, 30.0, 160.0, 120.0);
        let b = normalize(&d, &display, SourceSize::new(640, 480), ContentFit::Display).unwrap();
        assert_eq!(b.x, 0.0);
        assert_eq!(b.y, 0.0);
        assert!(approx(b.width, 0.5));
        assert!(approx(b.height, 0.5));
    }

    #[test]
    fn drag_covering_everything_stays_inside_source() {
        let display = DisplayRect::new(0.0, 0.0, 333.0, 251.0);
        let d = drag(-50.0, -50.0, 1000.0, 1000.0);
        let b = normalize(&d, &display, SourceSize::new(1920, 1080), ContentFit::Display).unwrap();
        assert_eq!(b.x, 0.0);
        assert_eq!(b.y, 0.0);
        assert!(approx(b.width, 1.0));
        assert!(approx(b.height, 1.0));
        assert!(b.is_valid());
    }

    #[test]
    fn boxes_inside_content_never_overflow() {
        let display = DisplayRect::new(12.0, 7.0, 617.0, 389.0);
        let src = SourceSize::new(1277, 719);
        let mut x: f64 = 12.5;
        while x < 600.0 {
            let mut y: f64 = 7.5;
            while y < 380.0 {
                let w = (629.0 - x).min(37.3);
                let h = (396.0 - y).min(23.9);
                let d = drag(x, y, w, h);
                if let Ok(b) = normalize(&d, &display, src, ContentFit::Display) {
                    assert!(b.x >= 0.0 && b.y >= 0.0);
                    assert!(b.x + b.width <= 1.0 + 1e-12);
                    assert!(b.y + b.height <= 1.0 + 1e-12);
                    assert!(b.width > 0.0 && b.height > 0.0);
                }
                y += 31.0;
            }
            x += 29.0;
        }
    }

    #[test]
    fn fixed_aspect_canvas_maps_through_four_by_three() {
        // 1000x600 canvas showing a 4:3 frame: content is 800x600 at x=100
        let display = DisplayRect::new(0.0, 0.0, 1000.0, 600.0);
        let d = drag(100.0, 0.0, 400.0, 300.0);
        let b = normalize(&d, &display, SourceSize::new(640, 480), ContentFit::four_by_three()).unwrap();
        assert_eq!(b.x, 0.0);
        assert!(approx(b.width, 0.5));
        assert!(approx(b.height, 0.5));
    }

    #[test]
    fn missing_source_size_is_no_source_media() {
        let display = DisplayRect::new(0.0, 0.0, 640.0, 480.0);
        assert_eq!(
            normalize(&drag(1.0, 1.0, 50.0, 50.0), &display, SourceSize::new(0, 480), ContentFit::Display),
            Err(NormalizeError::NoSourceMedia)
        );
    }

    #[test]
    fn invalid_aspect_is_no_source_media() {
        let display = DisplayRect::new(0.0, 0.0, 1000.0, 600.0);
        let d = drag(100.0, 0.0, 400.0, 300.0);
        let src = SourceSize::new(640, 480);
        for fit in [
            ContentFit::FixedAspect { aspect: f64::NAN },
            ContentFit::FixedAspect { aspect: 0.0 },
            ContentFit::AspectFit { aspect: f64::NAN },
            ContentFit::AspectFit { aspect: -2.0 },
        ] {
            assert_eq!(normalize(&d, &display, src, fit), Err(NormalizeError::NoSourceMedia));
        }
    }

    #[test]
    fn non_finite_offset_is_no_source_media() {
        let d = drag(100.0, 0.0, 400.0, 300.0);
        let src = SourceSize::new(640, 480);
        for display in [
            DisplayRect::new(f64::NAN, 0.0, 1000.0, 600.0),
            DisplayRect::new(0.0, f64::INFINITY, 1000.0, 600.0),
        ] {
            assert_eq!(
                normalize(&d, &display, src, ContentFit::Display),
                Err(NormalizeError::NoSourceMedia)
            );
        }
    }

    #[test]
    fn non_finite_drag_origin_is_out_of_bounds() {
        let display = DisplayRect::new(0.0, 0.0, 640.0, 480.0);
        let d = drag(f64::NAN, 10.0, 50.0, 50.0);
        assert_eq!(
            normalize(&d, &display, SourceSize::new(640, 480), ContentFit::Display),
            Err(NormalizeError::OutOfBounds)
        );
    }

    #[test]
    fn click_with_invalid_aspect_is_no_source_media() {
        let display = DisplayRect::new(0.0, 0.0, 640.0, 640.0);
        assert_eq!(
            normalize_point(Point::new(320.0, 320.0), &display, ContentFit::AspectFit { aspect: 0.0 }),
            Err(NormalizeError::NoSourceMedia)
        );
    }

    #[test]
    fn click_in_letterbox_bar_is_rejected() {
        let display = DisplayRect::new(0.0, 0.0, 640.0, 640.0);
        let fit = ContentFit::AspectFit { aspect: 640.0 / 400.0 };
        assert_eq!(
            normalize_point(Point::new(320.0, 50.0), &display, fit),
            Err(NormalizeError::OutOfBounds)
        );
        let p = normalize_point(Point::new(320.0, 320.0), &display, fit).unwrap();
        assert!(approx(p.x, 0.5));
        assert!(approx(p.y, 0.5));
    }

    #[test]
    fn click_ignores_element_offset() {
        let display = DisplayRect::new(200.0, 100.0, 400.0, 300.0);
        let p = normalize_point(Point::new(400.0, 300.0), &display, ContentFit::Display).unwrap();
        assert_eq!(p, NormalizedPoint { x: 1.0, y: 1.0 });
    }

    #[test]
    fn rejection_severity_matches_cause() {
        assert_eq!(NormalizeError::TooSmall.level(), NotificationLevel::Warning);
        assert_eq!(NormalizeError::NoSourceMedia.level(), NotificationLevel::Error);
        assert_eq!(NormalizeError::OutOfBounds.duration_ms(), Some(6000));
    }
}
