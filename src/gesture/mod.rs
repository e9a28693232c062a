pub mod state;

pub use state::{DrawGesture, DrawState};
