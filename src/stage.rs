use crate::color::Color;
use crate::display::{DisplayObject, DisplayTree, NodeId};
use crate::error::Result;
use crate::interaction::InteractionManager;
use crate::math::Point;
use crate::renderer::{GlFramebuffer, RenderStats, Renderer, RendererOptions, SurfaceState};
use crate::ticker::Ticker;

#[derive(Debug, Clone, PartialEq)]
pub struct StageConfig {
    pub width: u32,
    pub height: u32,
    pub background_color: Color,
    /// Physical pixels per logical pixel.
    pub resolution: f32,
    pub clear_before_render: bool,
}

impl StageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn background_color(mut self, color: Color) -> Self {
        self.background_color = color;
        self
    }

    pub fn resolution(mut self, resolution: f32) -> Self {
        self.resolution = resolution;
        self
    }

    pub fn clear_before_render(mut self, clear: bool) -> Self {
        self.clear_before_render = clear;
        self
    }

    /// Stage size in physical pixels.
    pub fn physical_size(&self) -> (u32, u32) {
        let scale = self.resolution.max(f32::EPSILON);
        (
            (self.width as f32 * scale).round() as u32,
            (self.height as f32 * scale).round() as u32,
        )
    }

    /// Renderer options matching this stage, in physical pixels.
    pub fn renderer_options(&self) -> RendererOptions {
        let (width, height) = self.physical_size();
        RendererOptions::default()
            .size(width, height)
            .resolution(self.resolution)
            .background_color(self.background_color)
            .clear_before_render(self.clear_before_render)
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background_color: Color::BLACK,
            resolution: 1.0,
            clear_before_render: true,
        }
    }
}

/// Where [`Stage::render`] draws.
pub enum RenderTarget<'a> {
    Surface(&'a SurfaceState),
    Framebuffer(&'a GlFramebuffer),
}

/// The root of a display tree together with the clock and pointer state
/// driving it.
#[derive(Debug)]
pub struct Stage {
    tree: DisplayTree,
    root: NodeId,
    config: StageConfig,
    ticker: Ticker,
    interaction: InteractionManager,
}

impl Stage {
    pub fn new(config: StageConfig) -> Self {
        let mut tree = DisplayTree::new();
        let root = tree.insert(DisplayObject::container().with_name("stage"));
        Self {
            tree,
            root,
            config,
            ticker: Ticker::new(),
            interaction: InteractionManager::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn tree(&self) -> &DisplayTree {
        &self.tree
    }

    pub fn tree_mut(&mut self) -> &mut DisplayTree {
        &mut self.tree
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn ticker_mut(&mut self) -> &mut Ticker {
        &mut self.ticker
    }

    pub fn interaction(&self) -> &InteractionManager {
        &self.interaction
    }

    /// Change the logical stage size. The renderer picks the new size up on
    /// the next [`Stage::render`]; surfaces still need their own resize.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.config.width = width;
        self.config.height = height;
    }

    /// Attach `child` (and its subtree) to the stage root.
    pub fn add_child(&mut self, child: NodeId) -> Result<()> {
        self.tree.add_child(self.root, child)
    }

    pub fn remove_child(&mut self, child: NodeId) -> Result<()> {
        self.tree.remove_child(self.root, child)
    }

    pub fn update_transform(&mut self) {
        self.tree.update_transform(self.root);
    }

    pub fn hit_test(&self, global: Point) -> Option<NodeId> {
        self.tree.hit_test(self.root, global)
    }

    pub fn pointer_down(&mut self, global: Point) -> Option<NodeId> {
        self.tree.update_transform(self.root);
        self.interaction.pointer_down(&mut self.tree, self.root, global)
    }

    pub fn pointer_up(&mut self, global: Point) -> Option<NodeId> {
        self.tree.update_transform(self.root);
        self.interaction.pointer_up(&mut self.tree, self.root, global)
    }

    pub fn pointer_move(&mut self, global: Point) -> Option<NodeId> {
        self.tree.update_transform(self.root);
        self.interaction.pointer_move(&mut self.tree, self.root, global)
    }

    pub fn pointer_leave(&mut self) {
        self.interaction.pointer_leave(&mut self.tree);
    }

    /// Draw the whole stage.
    pub fn render(
        &mut self,
        renderer: &mut Renderer,
        target: RenderTarget<'_>,
    ) -> Result<RenderStats> {
        renderer.set_background_color(self.config.background_color);
        let (width, height) = self.config.physical_size();
        let options = renderer.options();
        if (options.width, options.height) != (width, height) {
            log::debug!("Stage resized to {}x{}", width, height);
            renderer.resize(width, height);
        }
        match target {
            RenderTarget::Surface(surface) => {
                renderer.render_to_surface(&mut self.tree, self.root, surface)
            }
            RenderTarget::Framebuffer(framebuffer) => {
                Ok(renderer.render_to_framebuffer(&mut self.tree, self.root, framebuffer))
            }
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new(StageConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventType;
    use crate::graphics::Graphics;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_renderer_options_scale_with_resolution() {
        let options = StageConfig::new()
            .size(400, 300)
            .resolution(2.0)
            .background_color(Color::WHITE)
            .renderer_options();
        assert_eq!((options.width, options.height), (800, 600));
        assert_eq!(options.resolution, 2.0);
        assert_eq!(options.background_color, Color::WHITE);
    }

    #[test]
    fn test_render_picks_up_stage_resize() {
        let _ = env_logger::builder().is_test(true).try_init();
        let context = match crate::renderer::GpuContext::new() {
            Ok(context) => context,
            Err(e) => {
                eprintln!("no GPU adapter, skipping: {}", e);
                return;
            }
        };
        let mut stage = Stage::new(StageConfig::new().size(64, 32));
        let mut renderer = Renderer::new(&context, stage.config().renderer_options());
        stage.resize(32, 16);
        assert_eq!(stage.config().physical_size(), (32, 16));

        let framebuffer = renderer.create_framebuffer(32, 16);
        stage
            .render(&mut renderer, RenderTarget::Framebuffer(&framebuffer))
            .unwrap();
        assert_eq!((renderer.options().width, renderer.options().height), (32, 16));
    }

    #[test]
    fn test_pointer_events_reach_stage_children() {
        let mut stage = Stage::default();
        let mut g = Graphics::new();
        g.begin_fill(Color::WHITE).draw_rect(0.0, 0.0, 20.0, 20.0);
        let node = stage.tree_mut().create_graphics(g);
        stage.tree_mut().get_mut(node).unwrap().interactive = true;
        stage.tree_mut().get_mut(node).unwrap().transform.position.set(100.0, 100.0);
        stage.add_child(node).unwrap();

        let clicks = Rc::new(Cell::new(0));
        let sink = clicks.clone();
        stage
            .tree_mut()
            .events_mut()
            .on(node, EventType::Click, move |_| sink.set(sink.get() + 1));

        assert_eq!(stage.pointer_down(Point::new(110.0, 110.0)), Some(node));
        stage.pointer_up(Point::new(111.0, 111.0));
        assert_eq!(clicks.get(), 1);
        assert_eq!(stage.pointer_down(Point::new(5.0, 5.0)), None);
    }
}
