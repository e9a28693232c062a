pub mod controller;
pub mod labels;

pub use controller::{BoxPromptController, Collaborators};
pub use labels::ImagePromptLabels;
