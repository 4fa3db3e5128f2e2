//! Export artifacts: self-contained storybook HTML and rendered video.

pub mod storybook;
pub mod video;

pub use storybook::export_storybook;
pub use video::{RenderOutcome, VideoRenderer};
