pub mod content;
pub mod normalizer;
pub mod types;

pub use content::ContentFit;
pub use normalizer::{normalize, normalize_point, NormalizeError};
pub use types::{
    ContentBox, DisplayRect, DragRect, NormalizedBox, NormalizedPoint, PixelBox, Point, SourceSize,
};
