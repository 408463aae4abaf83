//! Display tree flattening into ordered draw steps.
//!
//! [`build_render_plan`] walks the tree depth-first and produces the
//! [`RenderStep`]s a frame executes, in paint order. Sprites and meshes are
//! transformed to world space on the CPU and merged into batches while
//! their texture, blend mode and stencil level stay the same; graphics keep
//! their cached local geometry and draw with their world matrix.

use crate::blend_mode::BlendMode;
use crate::display::{DisplayObject, DisplayTree, Mesh, NodeId, NodeKind, Sprite};
use crate::math::Matrix;
use crate::texture::BaseTexture;

use super::stencil::{StencilManager, StencilOp};
use super::vertex::Vertex;

/// A graphics node drawn from its cached geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsDraw {
    pub node: NodeId,
    pub world: Matrix,
    /// Premultiplied tint, including world alpha.
    pub tint: [f32; 4],
    pub blend: BlendMode,
    pub stencil_level: u32,
}

/// A run of batched sprite and mesh triangles sharing one texture.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchDraw {
    pub texture: BaseTexture,
    pub blend: BlendMode,
    pub stencil_level: u32,
    /// First index in [`RenderPlan::indices`].
    pub start: u32,
    pub count: u32,
}

/// A mask graphics node drawn into the stencil buffer only.
#[derive(Debug, Clone, PartialEq)]
pub struct MaskDraw {
    pub node: NodeId,
    pub world: Matrix,
    pub op: StencilOp,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderStep {
    Graphics(GraphicsDraw),
    Batch(BatchDraw),
    PushMask(MaskDraw),
    PopMask(MaskDraw),
}

/// Everything one frame draws, in order.
#[derive(Debug, Default)]
pub struct RenderPlan {
    pub steps: Vec<RenderStep>,
    /// World-space vertices of every batch.
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl RenderPlan {
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn batch_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|s| matches!(s, RenderStep::Batch(_)))
            .count()
    }

    /// Distinct base textures referenced by batches, in first-use order.
    pub fn textures(&self) -> Vec<&BaseTexture> {
        let mut out: Vec<&BaseTexture> = Vec::new();
        for step in &self.steps {
            if let RenderStep::Batch(batch) = step {
                if !out.iter().any(|t| t.id() == batch.texture.id()) {
                    out.push(&batch.texture);
                }
            }
        }
        out
    }

    /// Graphics nodes drawn as content or as masks.
    pub fn graphics_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.steps.iter().filter_map(|step| match step {
            RenderStep::Graphics(draw) => Some(draw.node),
            RenderStep::PushMask(mask) | RenderStep::PopMask(mask) => Some(mask.node),
            RenderStep::Batch(_) => None,
        })
    }
}

struct OpenBatch {
    texture: BaseTexture,
    blend: BlendMode,
    stencil_level: u32,
    start: u32,
}

struct PlanBuilder<'a> {
    tree: &'a DisplayTree,
    plan: RenderPlan,
    stencil: StencilManager,
    batch: Option<OpenBatch>,
}

/// Flatten the subtree at `root` into draw steps.
///
/// Uses the world transforms and alphas from the last
/// [`DisplayTree::update_transform`]. Invisible, fully transparent and
/// non-renderable nodes are skipped with their children, as are nodes that
/// serve as another node's mask.
pub fn build_render_plan(tree: &DisplayTree, root: NodeId) -> RenderPlan {
    let mut builder = PlanBuilder {
        tree,
        plan: RenderPlan::default(),
        stencil: StencilManager::new(),
        batch: None,
    };
    builder.visit(root, true);
    builder.flush();
    builder.stencil.reset();
    builder.plan
}

impl PlanBuilder<'_> {
    fn visit(&mut self, id: NodeId, is_root: bool) {
        let tree = self.tree;
        let Some(object) = tree.get(id) else {
            return;
        };
        if !object.visible || object.world_alpha() <= 0.0 || !object.renderable {
            return;
        }
        if !is_root && tree.is_mask(id) {
            return;
        }

        // dangling or non-graphics masks are ignored
        let mask = object
            .mask()
            .and_then(|m| tree.get(m).map(|mask_object| (m, mask_object)))
            .filter(|(_, mask_object)| mask_object.graphics().is_some())
            .map(|(m, mask_object)| (m, *mask_object.world_transform()));

        if let Some((mask, world)) = mask {
            self.flush();
            let op = self.stencil.push_mask(mask);
            self.plan
                .steps
                .push(RenderStep::PushMask(MaskDraw { node: mask, world, op }));
        }

        self.emit(id, object);

        for &child in tree.children(id) {
            self.visit(child, false);
        }

        if let Some((_, world)) = mask {
            self.flush();
            if let Some(op) = self.stencil.pop_mask() {
                self.plan.steps.push(RenderStep::PopMask(MaskDraw {
                    node: op.mask,
                    world,
                    op,
                }));
            }
        }
    }

    fn emit(&mut self, id: NodeId, object: &DisplayObject) {
        let world = *object.world_transform();
        let alpha = object.world_alpha();
        match &object.kind {
            NodeKind::Container => {}
            NodeKind::Sprite(sprite) => self.add_sprite(sprite, &world, alpha, object.blend_mode),
            NodeKind::Mesh(mesh) => self.add_mesh(mesh, &world, alpha, object.blend_mode),
            NodeKind::Graphics(graphics) => {
                if graphics.graphics_data().is_empty() {
                    return;
                }
                self.flush();
                let tint = graphics.tint;
                self.plan.steps.push(RenderStep::Graphics(GraphicsDraw {
                    node: id,
                    world,
                    tint: tint.with_alpha(tint.a * alpha).premultiplied(),
                    blend: object.blend_mode,
                    stencil_level: self.stencil.level(),
                }));
            }
        }
    }

    /// Make sure the open batch accepts `texture` and `blend`.
    fn batch_for(&mut self, texture: &BaseTexture, blend: BlendMode) {
        let level = self.stencil.level();
        if let Some(open) = &self.batch {
            if open.texture.id() == texture.id()
                && open.blend == blend
                && open.stencil_level == level
            {
                return;
            }
        }
        self.flush();
        self.batch = Some(OpenBatch {
            texture: texture.clone(),
            blend,
            stencil_level: level,
            start: self.plan.indices.len() as u32,
        });
    }

    fn flush(&mut self) {
        let Some(open) = self.batch.take() else {
            return;
        };
        let count = self.plan.indices.len() as u32 - open.start;
        if count == 0 {
            return;
        }
        self.plan.steps.push(RenderStep::Batch(BatchDraw {
            texture: open.texture,
            blend: open.blend,
            stencil_level: open.stencil_level,
            start: open.start,
            count,
        }));
    }

    fn add_sprite(&mut self, sprite: &Sprite, world: &Matrix, alpha: f32, blend: BlendMode) {
        let base = sprite.texture.base();
        if !base.is_valid() {
            return;
        }
        self.batch_for(base, blend);

        let color = sprite.tint.with_alpha(sprite.tint.a * alpha).premultiplied();
        let positions = sprite.vertex_data(world);
        let uvs = sprite.texture.uvs().corners();
        let first = self.plan.vertices.len() as u32;
        for (i, uv) in uvs.iter().enumerate() {
            self.plan.vertices.push(Vertex::new(
                [positions[i * 2], positions[i * 2 + 1]],
                *uv,
                color,
            ));
        }
        self.plan.indices.extend_from_slice(&[
            first,
            first + 1,
            first + 2,
            first,
            first + 2,
            first + 3,
        ]);
    }

    fn add_mesh(&mut self, mesh: &Mesh, world: &Matrix, alpha: f32, blend: BlendMode) {
        let base = mesh.texture.base();
        if !base.is_valid() || mesh.vertex_count() == 0 {
            return;
        }
        let indices = mesh.triangle_indices();
        let count = mesh.vertex_count() as u32;
        if let Some(bad) = indices.iter().find(|&&i| i >= count) {
            log::warn!("Skipping mesh with index {} out of {} vertices", bad, count);
            return;
        }
        if indices.is_empty() {
            return;
        }
        self.batch_for(base, blend);

        let color = mesh.tint.with_alpha(mesh.tint.a * alpha).premultiplied();
        let first = self.plan.vertices.len() as u32;
        let uvs = mesh.uvs();
        for (i, xy) in mesh.vertices().chunks_exact(2).enumerate() {
            let p = world.apply(xy[0], xy[1]);
            let (u, v) = match (uvs.get(i * 2), uvs.get(i * 2 + 1)) {
                (Some(u), Some(v)) => (*u, *v),
                _ => (0.0, 0.0),
            };
            self.plan
                .vertices
                .push(Vertex::new([p.x, p.y], mesh.texture.map_uv(u, v), color));
        }
        self.plan
            .indices
            .extend(indices.into_iter().map(|i| first + i));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::graphics::Graphics;
    use crate::texture::Texture;

    fn texture(size: u32) -> Texture {
        let pixels = vec![255; (size * size * 4) as usize];
        let base = BaseTexture::from_rgba(size, size, pixels).unwrap();
        Texture::from_base(base)
    }

    fn rect_graphics() -> Graphics {
        let mut g = Graphics::new();
        g.begin_fill(Color::WHITE).draw_rect(0.0, 0.0, 10.0, 10.0);
        g
    }

    fn kinds(plan: &RenderPlan) -> Vec<&'static str> {
        plan.steps
            .iter()
            .map(|s| match s {
                RenderStep::Graphics(_) => "graphics",
                RenderStep::Batch(_) => "batch",
                RenderStep::PushMask(_) => "push",
                RenderStep::PopMask(_) => "pop",
            })
            .collect()
    }

    #[test]
    fn test_sprites_sharing_a_texture_batch_together() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let tex = texture(4);
        for i in 0..3 {
            let s = tree.create_sprite(Sprite::new(tex.clone()));
            tree.get_mut(s).unwrap().transform.position.set(i as f32 * 10.0, 0.0);
            tree.add_child(root, s).unwrap();
        }
        tree.update_transform(root);
        let plan = build_render_plan(&tree, root);
        assert_eq!(kinds(&plan), vec!["batch"]);
        assert_eq!(plan.vertices.len(), 12);
        assert_eq!(plan.indices.len(), 18);
        let RenderStep::Batch(batch) = &plan.steps[0] else {
            panic!("expected a batch");
        };
        assert_eq!((batch.start, batch.count), (0, 18));
        assert_eq!(plan.vertices[4].position, [10.0, 0.0]);
    }

    #[test]
    fn test_texture_and_blend_changes_split_batches() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let a = tree.create_sprite(Sprite::new(texture(2)));
        let shared = texture(2);
        let b = tree.create_sprite(Sprite::new(shared.clone()));
        let c = tree.create_sprite(Sprite::new(shared));
        tree.get_mut(c).unwrap().blend_mode = BlendMode::Add;
        for id in [a, b, c] {
            tree.add_child(root, id).unwrap();
        }
        tree.update_transform(root);
        let plan = build_render_plan(&tree, root);
        assert_eq!(kinds(&plan), vec!["batch", "batch", "batch"]);
        assert_eq!(plan.textures().len(), 2);
    }

    #[test]
    fn test_graphics_break_batches_and_keep_order() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let tex = texture(2);
        let a = tree.create_sprite(Sprite::new(tex.clone()));
        let g = tree.create_graphics(rect_graphics());
        let b = tree.create_sprite(Sprite::new(tex));
        for id in [a, g, b] {
            tree.add_child(root, id).unwrap();
        }
        tree.get_mut(root).unwrap().alpha = 0.5;
        tree.update_transform(root);
        let plan = build_render_plan(&tree, root);
        assert_eq!(kinds(&plan), vec!["batch", "graphics", "batch"]);
        let RenderStep::Graphics(draw) = &plan.steps[1] else {
            panic!("expected graphics");
        };
        assert_eq!(draw.node, g);
        assert_eq!(draw.tint, [0.5, 0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_hidden_and_transparent_subtrees_are_skipped() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let hidden = tree.create_container();
        let faded = tree.create_container();
        let off = tree.create_sprite(Sprite::new(texture(2)));
        for (parent, count) in [(hidden, 1), (faded, 1)] {
            for _ in 0..count {
                let s = tree.create_sprite(Sprite::new(texture(2)));
                tree.add_child(parent, s).unwrap();
            }
            tree.add_child(root, parent).unwrap();
        }
        tree.add_child(root, off).unwrap();
        tree.get_mut(hidden).unwrap().visible = false;
        tree.get_mut(faded).unwrap().alpha = 0.0;
        tree.get_mut(off).unwrap().renderable = false;
        tree.update_transform(root);
        assert!(build_render_plan(&tree, root).is_empty());
    }

    #[test]
    fn test_masks_wrap_content_in_stencil_steps() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let masked = tree.create_container();
        let inner = tree.create_sprite(Sprite::new(texture(2)));
        let mask = tree.create_graphics(rect_graphics());
        tree.add_child(root, masked).unwrap();
        tree.add_child(masked, inner).unwrap();
        tree.add_child(root, mask).unwrap();
        tree.set_mask(masked, Some(mask)).unwrap();
        let after = tree.create_sprite(Sprite::new(texture(2)));
        tree.add_child(root, after).unwrap();
        tree.update_transform(root);

        let plan = build_render_plan(&tree, root);
        assert_eq!(kinds(&plan), vec!["push", "batch", "pop", "batch"]);
        let (
            RenderStep::PushMask(push),
            RenderStep::Batch(inside),
            RenderStep::PopMask(pop),
            RenderStep::Batch(outside),
        ) = (&plan.steps[0], &plan.steps[1], &plan.steps[2], &plan.steps[3])
        else {
            panic!("unexpected steps");
        };
        assert_eq!(push.node, mask);
        assert_eq!(push.op.reference, 0);
        assert_eq!(inside.stencil_level, 1);
        assert_eq!(pop.op.reference, 1);
        assert_eq!(outside.stencil_level, 0);
    }

    #[test]
    fn test_nested_masks_raise_the_level() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let outer = tree.create_container();
        let inner = tree.create_container();
        let g = tree.create_graphics(rect_graphics());
        let m1 = tree.create_graphics(rect_graphics());
        let m2 = tree.create_graphics(rect_graphics());
        tree.add_child(root, outer).unwrap();
        tree.add_child(outer, inner).unwrap();
        tree.add_child(inner, g).unwrap();
        tree.set_mask(outer, Some(m1)).unwrap();
        tree.set_mask(inner, Some(m2)).unwrap();
        tree.update_transform(root);

        let plan = build_render_plan(&tree, root);
        assert_eq!(kinds(&plan), vec!["push", "push", "graphics", "pop", "pop"]);
        let RenderStep::Graphics(draw) = &plan.steps[2] else {
            panic!("expected graphics");
        };
        assert_eq!(draw.stencil_level, 2);
        assert_eq!(plan.graphics_nodes().count(), 5);
    }

    #[test]
    fn test_mesh_strip_is_expanded_and_offset() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let tex = texture(2);
        let sprite = tree.create_sprite(Sprite::new(tex.clone()));
        let mesh = Mesh::new(
            tex,
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0],
            vec![0, 1, 2, 3],
            crate::display::DrawMode::TriangleStrip,
        );
        let m = tree.create_mesh(mesh);
        tree.add_child(root, sprite).unwrap();
        tree.add_child(root, m).unwrap();
        tree.update_transform(root);

        let plan = build_render_plan(&tree, root);
        assert_eq!(kinds(&plan), vec!["batch"]);
        assert_eq!(plan.vertices.len(), 8);
        assert_eq!(&plan.indices[6..], &[4, 5, 6, 6, 5, 7]);
    }

    #[test]
    fn test_mesh_with_bad_indices_is_skipped() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let mesh = Mesh::new(
            texture(2),
            vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0],
            vec![],
            vec![0, 1, 7],
            crate::display::DrawMode::Triangles,
        );
        let m = tree.create_mesh(mesh);
        tree.add_child(root, m).unwrap();
        tree.update_transform(root);
        assert!(build_render_plan(&tree, root).is_empty());
    }
}
