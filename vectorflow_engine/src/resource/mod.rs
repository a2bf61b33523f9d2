//! Resource module
//!
//! Client-facing GPU resources created through the render context.

pub mod render_buffer;
pub mod image_texture;
pub mod image_asset;

pub use render_buffer::{RenderBuffer, RenderBufferType, RenderBufferFlags, RenderBufferMapping};
pub use image_texture::ImageTexture;
pub use image_asset::ImageAsset;
