//! A retained-mode 2D display list rendered with wgpu.
//!
//! Build a tree of containers, sprites, vector [`graphics::Graphics`] and
//! textured meshes in a [`display::DisplayTree`], drive it with a
//! [`ticker::Ticker`], route pointer input through
//! [`interaction::InteractionManager`], and draw it with a
//! [`renderer::Renderer`] onto a window surface or an offscreen
//! framebuffer.
//!
//! ```no_run
//! use stage2d::prelude::*;
//!
//! # fn main() -> stage2d::error::Result<()> {
//! let context = GpuContext::new()?;
//! let config = StageConfig::new().size(256, 256);
//! let mut renderer = Renderer::new(&context, config.renderer_options());
//! let mut stage = Stage::new(config);
//!
//! let mut circle = Graphics::new();
//! circle.begin_fill(Color::from_hex(0xff8800)).draw_circle(128.0, 128.0, 64.0);
//! let node = stage.tree_mut().create_graphics(circle);
//! stage.add_child(node)?;
//!
//! let framebuffer = renderer.create_framebuffer(256, 256);
//! stage.render(&mut renderer, RenderTarget::Framebuffer(&framebuffer))?;
//! let pixels = renderer.extract_pixels(&framebuffer)?;
//! # let _ = pixels;
//! # Ok(())
//! # }
//! ```

pub mod blend_mode;
pub mod color;
pub mod display;
pub mod error;
pub mod events;
pub mod graphics;
pub mod interaction;
pub mod math;
pub mod renderer;
pub mod stage;
pub mod texture;
pub mod ticker;
pub mod transform;

pub mod prelude {
    pub use crate::blend_mode::BlendMode;
    pub use crate::color::Color;
    pub use crate::display::{
        DisplayObject, DisplayTree, DrawMode, Mesh, NodeId, NodeKind, Sprite,
    };
    pub use crate::error::{Result, StageError};
    pub use crate::events::{Event, EventType};
    pub use crate::graphics::Graphics;
    pub use crate::interaction::InteractionManager;
    pub use crate::math::{
        Circle, Ellipse, Matrix, Point, Polygon, Rectangle, RoundedRectangle, Shape,
    };
    pub use crate::renderer::{GlFramebuffer, GpuContext, Renderer, RendererOptions, SurfaceState};
    pub use crate::stage::{RenderTarget, Stage, StageConfig};
    pub use crate::texture::{BaseTexture, Loader, Resources, ScaleMode, Texture, WrapMode};
    pub use crate::ticker::{Ticker, UpdatePriority};
    pub use crate::transform::{Transform, TransformBase};
}
