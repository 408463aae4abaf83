//! The display list: nodes, their content and the tree that owns them.

mod mesh;
mod sprite;
mod tree;

pub use mesh::{DrawMode, Mesh};
pub use sprite::Sprite;
pub use tree::{DisplayObject, DisplayTree, NodeId, NodeKind};
