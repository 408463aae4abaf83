//! Pixel sources, texture frames and file loading.

mod base_texture;
mod loader;
#[allow(clippy::module_inception)]
mod texture;

pub use base_texture::{BaseTexture, ScaleMode, WrapMode};
pub(crate) use base_texture::WeakBaseTexture;
pub use loader::{LoadProgress, Loader, Resources};
pub use texture::{Texture, TextureUvs};
