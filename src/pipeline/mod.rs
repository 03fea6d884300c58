//! Message-to-image pipeline.
//!
//! [`ImagePipeline`] ties the renderer, encoder and content store together
//! and turns a message text into a public image URL.

mod service;

pub use service::{GeneratedImage, ImagePipeline, IMAGES_PATH};
