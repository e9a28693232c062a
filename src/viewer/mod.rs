pub mod connection;
pub mod media;
pub mod overlay;

pub use connection::{ConnectionStatus, SharedConnection};
pub use media::{MediaKind, MediaProbe, MediaSnapshot, SharedMedia};
pub use overlay::{OverlaySurface, TracingOverlay};
