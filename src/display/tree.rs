//! Arena storage for the display list.
//!
//! Nodes live in a dense `Vec` for cache-friendly traversal, with a sparse
//! map from generational [`NodeId`]s to dense slots. Removal swaps the last
//! node into the freed slot, so dense positions are not stable; ids are.
//!
//! Parent links are plain ids and never keep a node alive. A node is owned
//! by the tree until [`DisplayTree::destroy`] is called on it or an ancestor.

use std::ops::{Bound, RangeBounds};

use crate::blend_mode::BlendMode;
use crate::error::{Result, StageError};
use crate::events::{Event, EventDispatcher, EventType};
use crate::graphics::Graphics;
use crate::math::{Bounds, Matrix, Point, Rectangle, Shape};
use crate::transform::{ParentTransform, Transform, TransformBase};

use super::{Mesh, Sprite};

/// Identifier of a node in a [`DisplayTree`].
///
/// `index` is a reusable slot, `generation` changes every time the slot is
/// reused, so an id kept after [`DisplayTree::destroy`] never aliases a
/// newer node.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, PartialOrd, Ord)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

impl NodeId {
    fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Generation in the high bits, index in the low bits.
    pub fn as_u64(self) -> u64 {
        ((self.generation as u64) << 32) | (self.index as u64)
    }
}

/// What a node draws.
#[derive(Debug, Clone)]
pub enum NodeKind {
    Container,
    Sprite(Sprite),
    Graphics(Graphics),
    Mesh(Mesh),
}

/// Per-node state. Structure (parent, children, mask references) is owned
/// by the tree and only changed through [`DisplayTree`] methods.
#[derive(Debug, Clone)]
pub struct DisplayObject {
    pub name: Option<String>,
    pub transform: Transform,
    pub alpha: f32,
    pub visible: bool,
    /// When false the node is skipped by the renderer but still hit-tested.
    pub renderable: bool,
    pub blend_mode: BlendMode,
    pub interactive: bool,
    pub interactive_children: bool,
    /// Replaces the content shape for hit testing, in local coordinates.
    pub hit_area: Option<Shape>,
    pub kind: NodeKind,
    world_alpha: f32,
    mask: Option<NodeId>,
}

impl DisplayObject {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            transform: Transform::new(),
            alpha: 1.0,
            visible: true,
            renderable: true,
            blend_mode: BlendMode::Normal,
            interactive: false,
            interactive_children: true,
            hit_area: None,
            kind,
            world_alpha: 1.0,
            mask: None,
        }
    }

    pub fn container() -> Self {
        Self::new(NodeKind::Container)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.transform.position.set(x, y);
        self
    }

    pub fn with_interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// `alpha` multiplied by every ancestor's alpha, as of the last transform update.
    pub fn world_alpha(&self) -> f32 {
        self.world_alpha
    }

    pub fn world_transform(&self) -> &Matrix {
        self.transform.world_transform()
    }

    pub fn local_transform(&self) -> &Matrix {
        self.transform.local_transform()
    }

    pub fn mask(&self) -> Option<NodeId> {
        self.mask
    }

    pub fn sprite(&self) -> Option<&Sprite> {
        match &self.kind {
            NodeKind::Sprite(sprite) => Some(sprite),
            _ => None,
        }
    }

    pub fn sprite_mut(&mut self) -> Option<&mut Sprite> {
        match &mut self.kind {
            NodeKind::Sprite(sprite) => Some(sprite),
            _ => None,
        }
    }

    pub fn graphics(&self) -> Option<&Graphics> {
        match &self.kind {
            NodeKind::Graphics(graphics) => Some(graphics),
            _ => None,
        }
    }

    pub fn graphics_mut(&mut self) -> Option<&mut Graphics> {
        match &mut self.kind {
            NodeKind::Graphics(graphics) => Some(graphics),
            _ => None,
        }
    }

    pub fn mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            NodeKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    /// Bounds of this node's own content, without children, in local space.
    pub fn content_bounds(&self) -> Rectangle {
        match &self.kind {
            NodeKind::Container => Rectangle::EMPTY,
            NodeKind::Sprite(sprite) => sprite.local_bounds(),
            NodeKind::Graphics(graphics) => graphics.local_bounds(),
            NodeKind::Mesh(mesh) => mesh.local_bounds(),
        }
    }

    /// Whether the node's own content covers a local point.
    pub fn contains_point(&self, x: f32, y: f32) -> bool {
        match &self.kind {
            NodeKind::Container => false,
            NodeKind::Sprite(sprite) => sprite.contains_point(x, y),
            NodeKind::Graphics(graphics) => graphics.contains_point(x, y),
            NodeKind::Mesh(mesh) => mesh.contains_point(x, y),
        }
    }

    fn add_content_bounds(&self, matrix: &Matrix, bounds: &mut Bounds) {
        match &self.kind {
            NodeKind::Container => {}
            NodeKind::Sprite(sprite) => bounds.add_quad(&sprite.local_bounds(), matrix),
            NodeKind::Graphics(graphics) => bounds.add_quad(&graphics.local_bounds(), matrix),
            NodeKind::Mesh(mesh) => {
                for pair in mesh.vertices().chunks_exact(2) {
                    let p = matrix.apply(pair[0], pair[1]);
                    bounds.add_point(p.x, p.y);
                }
            }
        }
    }
}

impl Default for DisplayObject {
    fn default() -> Self {
        Self::container()
    }
}

struct SparseEntry {
    dense_index: usize,
    generation: u32,
}

struct Node {
    object: DisplayObject,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Number of nodes using this one as their mask.
    mask_refs: u32,
    /// Back-pointer for swap-remove fixup.
    sparse_index: u32,
}

/// Outcome of hit testing one subtree.
enum Hit {
    Miss,
    /// Something was hit; carries the nearest interactive node, if any.
    Hit(Option<NodeId>),
}

/// Owner of every display node and their listeners.
pub struct DisplayTree {
    dense: Vec<Node>,
    sparse: Vec<Option<SparseEntry>>,
    free_indices: Vec<u32>,
    events: EventDispatcher,
}

impl DisplayTree {
    pub fn new() -> Self {
        Self {
            dense: Vec::new(),
            sparse: Vec::new(),
            free_indices: Vec::new(),
            events: EventDispatcher::new(),
        }
    }

    /// Store a detached node and return its id.
    pub fn insert(&mut self, object: DisplayObject) -> NodeId {
        let (sparse_index, generation) = if let Some(idx) = self.free_indices.pop() {
            let old_gen = self.sparse[idx as usize]
                .as_ref()
                .map(|e| e.generation)
                .unwrap_or(0);
            (idx, old_gen)
        } else {
            let idx = self.sparse.len() as u32;
            self.sparse.push(None);
            (idx, 0)
        };

        let dense_index = self.dense.len();
        self.dense.push(Node {
            object,
            parent: None,
            children: Vec::new(),
            mask_refs: 0,
            sparse_index,
        });
        self.sparse[sparse_index as usize] = Some(SparseEntry {
            dense_index,
            generation,
        });

        NodeId::new(sparse_index, generation)
    }

    pub fn create_container(&mut self) -> NodeId {
        self.insert(DisplayObject::container())
    }

    pub fn create_sprite(&mut self, sprite: Sprite) -> NodeId {
        self.insert(DisplayObject::new(NodeKind::Sprite(sprite)))
    }

    pub fn create_graphics(&mut self, graphics: Graphics) -> NodeId {
        self.insert(DisplayObject::new(NodeKind::Graphics(graphics)))
    }

    pub fn create_mesh(&mut self, mesh: Mesh) -> NodeId {
        self.insert(DisplayObject::new(NodeKind::Mesh(mesh)))
    }

    fn dense_index(&self, id: NodeId) -> Option<usize> {
        self.sparse
            .get(id.index as usize)
            .and_then(|e| e.as_ref())
            .filter(|e| e.generation == id.generation && e.dense_index != usize::MAX)
            .map(|e| e.dense_index)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.dense_index(id).map(|idx| &self.dense[idx])
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.dense_index(id).map(move |idx| &mut self.dense[idx])
    }

    fn require(&self, id: NodeId) -> Result<&Node> {
        self.node(id).ok_or(StageError::InvalidNode(id))
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.dense_index(id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&DisplayObject> {
        self.node(id).map(|n| &n.object)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut DisplayObject> {
        self.node_mut(id).map(|n| &mut n.object)
    }

    pub fn len(&self) -> usize {
        self.dense.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dense.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Children in drawing order. Empty for unknown ids.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn child_at(&self, parent: NodeId, index: usize) -> Option<NodeId> {
        self.children(parent).get(index).copied()
    }

    pub fn child_index(&self, parent: NodeId, child: NodeId) -> Result<usize> {
        self.require(parent)?
            .children
            .iter()
            .position(|&c| c == child)
            .ok_or_else(|| {
                StageError::InvalidTreeOperation(format!(
                    "{:?} is not a child of {:?}",
                    child, parent
                ))
            })
    }

    pub fn child_by_name(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&c| self.get(c).and_then(|o| o.name.as_deref()) == Some(name))
    }

    /// Whether `ancestor` is `id` or one of its ancestors.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == ancestor {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    /// `id` followed by its ancestors up to the root.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut path = Vec::new();
        let mut current = self.contains(id).then_some(id);
        while let Some(node) = current {
            path.push(node);
            current = self.parent(node);
        }
        path
    }

    /// Append `child` to `parent`, detaching it from its current parent first.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.check_attach(parent, child)?;
        self.detach(child);
        let index = self.children(parent).len();
        self.attach(parent, child, index);
        Ok(())
    }

    /// Insert `child` at `index` (`0..=len`).
    pub fn add_child_at(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        self.check_attach(parent, child)?;
        let len = self.children(parent).len();
        if index > len {
            return Err(StageError::ChildIndexOutOfRange { index, len });
        }
        self.detach(child);
        let index = index.min(self.children(parent).len());
        self.attach(parent, child, index);
        Ok(())
    }

    fn check_attach(&self, parent: NodeId, child: NodeId) -> Result<()> {
        self.require(parent)?;
        self.require(child)?;
        if self.is_ancestor(child, parent) {
            return Err(StageError::InvalidTreeOperation(format!(
                "cannot add {:?} to its own descendant {:?}",
                child, parent
            )));
        }
        Ok(())
    }

    fn attach(&mut self, parent: NodeId, child: NodeId, index: usize) {
        if let Some(node) = self.node_mut(parent) {
            node.children.insert(index, child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = Some(parent);
            node.object.transform.invalidate_parent();
        }
        self.events.emit(&mut Event::new(EventType::Added, child));
    }

    /// Unlink `child` from its parent, if any, and emit `Removed`.
    fn detach(&mut self, child: NodeId) -> bool {
        let Some(parent) = self.parent(child) else {
            return false;
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.retain(|&c| c != child);
        }
        if let Some(node) = self.node_mut(child) {
            node.parent = None;
        }
        self.events.emit(&mut Event::new(EventType::Removed, child));
        true
    }

    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.child_index(parent, child)?;
        self.detach(child);
        Ok(())
    }

    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> Result<NodeId> {
        let len = self.require(parent)?.children.len();
        let child = self
            .child_at(parent, index)
            .ok_or(StageError::ChildIndexOutOfRange { index, len })?;
        self.detach(child);
        Ok(child)
    }

    /// Detach the children in `range` and return them in order.
    pub fn remove_children(
        &mut self,
        parent: NodeId,
        range: impl RangeBounds<usize>,
    ) -> Result<Vec<NodeId>> {
        let len = self.require(parent)?.children.len();
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => len,
        };
        if start > end || end > len {
            return Err(StageError::ChildIndexOutOfRange {
                index: end.max(start),
                len,
            });
        }

        let removed = self.children(parent)[start..end].to_vec();
        for &child in &removed {
            self.detach(child);
        }
        Ok(removed)
    }

    pub fn swap_children(&mut self, parent: NodeId, a: NodeId, b: NodeId) -> Result<()> {
        let ia = self.child_index(parent, a)?;
        let ib = self.child_index(parent, b)?;
        if let Some(node) = self.node_mut(parent) {
            node.children.swap(ia, ib);
        }
        Ok(())
    }

    /// Move an existing child to `index` (`0..len`).
    pub fn set_child_index(&mut self, parent: NodeId, child: NodeId, index: usize) -> Result<()> {
        let current = self.child_index(parent, child)?;
        let len = self.children(parent).len();
        if index >= len {
            return Err(StageError::ChildIndexOutOfRange { index, len });
        }
        if let Some(node) = self.node_mut(parent) {
            let child = node.children.remove(current);
            node.children.insert(index, child);
        }
        Ok(())
    }

    /// Detach `id` and free it together with its whole subtree.
    pub fn destroy(&mut self, id: NodeId) {
        if !self.contains(id) {
            return;
        }
        self.detach(id);

        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            stack.extend_from_slice(self.children(current));
            if let Some(mask) = self.get(current).and_then(|o| o.mask) {
                if let Some(node) = self.node_mut(mask) {
                    node.mask_refs = node.mask_refs.saturating_sub(1);
                }
            }
            self.events.remove_all(current);
            self.remove_slot(current);
        }
    }

    fn remove_slot(&mut self, id: NodeId) {
        let Some(dense_index) = self.dense_index(id) else {
            return;
        };
        let last_dense_index = self.dense.len() - 1;
        self.dense.swap_remove(dense_index);

        if dense_index != last_dense_index {
            let moved_sparse_idx = self.dense[dense_index].sparse_index;
            if let Some(entry) = self.sparse[moved_sparse_idx as usize].as_mut() {
                entry.dense_index = dense_index;
            }
        }

        // keep the bumped generation around for the next allocation
        self.sparse[id.index as usize] = Some(SparseEntry {
            dense_index: usize::MAX,
            generation: id.generation.wrapping_add(1),
        });
        self.free_indices.push(id.index);
    }

    /// Clip `id` and its subtree to the filled area of a graphics node.
    ///
    /// Pass `None` to remove the mask. A mask node is not drawn as content.
    pub fn set_mask(&mut self, id: NodeId, mask: Option<NodeId>) -> Result<()> {
        self.require(id)?;
        if let Some(mask) = mask {
            let node = self.require(mask)?;
            if mask == id {
                return Err(StageError::InvalidTreeOperation(
                    "a node cannot mask itself".into(),
                ));
            }
            if node.object.graphics().is_none() {
                return Err(StageError::InvalidTreeOperation(format!(
                    "mask {:?} is not a graphics node",
                    mask
                )));
            }
        }

        let previous = self.get(id).and_then(|o| o.mask);
        if previous == mask {
            return Ok(());
        }
        if let Some(node) = previous.and_then(|m| self.node_mut(m)) {
            node.mask_refs = node.mask_refs.saturating_sub(1);
        }
        if let Some(node) = mask.and_then(|m| self.node_mut(m)) {
            node.mask_refs += 1;
        }
        if let Some(object) = self.get_mut(id) {
            object.mask = mask;
        }
        Ok(())
    }

    /// Whether some node uses `id` as its mask.
    pub fn is_mask(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(|n| n.mask_refs > 0)
    }

    /// Recompute world transforms and alphas of `root` and its visible descendants.
    ///
    /// Masks referenced from the subtree that have no parent are updated
    /// against the identity.
    pub fn update_transform(&mut self, root: NodeId) {
        let (parent, parent_alpha) = match self.parent(root).and_then(|p| self.get(p)) {
            Some(p) => (p.transform.as_parent(), p.world_alpha),
            None => (ParentTransform::ROOT, 1.0),
        };

        let mut masks = Vec::new();
        self.walk_transforms(root, parent, parent_alpha, &mut masks);

        for mask in masks {
            if self.contains(mask) && self.parent(mask).is_none() {
                self.walk_transforms(mask, ParentTransform::ROOT, 1.0, &mut Vec::new());
            }
        }
    }

    fn walk_transforms(
        &mut self,
        root: NodeId,
        parent: ParentTransform,
        parent_alpha: f32,
        masks: &mut Vec<NodeId>,
    ) {
        let mut stack = vec![(root, parent, parent_alpha)];
        while let Some((id, parent, parent_alpha)) = stack.pop() {
            let Some(dense_index) = self.dense_index(id) else {
                continue;
            };
            let node = &mut self.dense[dense_index];
            if id != root && !node.object.visible {
                continue;
            }

            let object = &mut node.object;
            object.transform.update_transform(&parent);
            object.world_alpha = object.alpha * parent_alpha;
            if let Some(mask) = object.mask {
                masks.push(mask);
            }

            let as_parent = object.transform.as_parent();
            let world_alpha = object.world_alpha;
            stack.extend(
                node.children
                    .iter()
                    .rev()
                    .map(|&child| (child, as_parent, world_alpha)),
            );
        }
    }

    /// Update the transforms of the whole tree containing `id`.
    fn refresh(&mut self, id: NodeId) {
        let mut top = id;
        while let Some(parent) = self.parent(top) {
            top = parent;
        }
        self.update_transform(top);
    }

    pub fn world_transform(&self, id: NodeId) -> Option<Matrix> {
        self.get(id).map(|o| *o.world_transform())
    }

    /// Axis-aligned bounds of the visible content of `id` in stage space.
    pub fn bounds(&mut self, id: NodeId) -> Rectangle {
        let Some(world) = self.refreshed_world(id) else {
            return Rectangle::EMPTY;
        };
        let mut bounds = Bounds::new();
        self.accumulate_bounds(id, &world, &Matrix::IDENTITY, &mut bounds, true);
        bounds.rectangle()
    }

    /// Bounds of the content of `id` in its own coordinate space.
    ///
    /// Children are mapped through their local matrices, so a collapsed
    /// (zero scale) ancestor or node still reports its content size.
    pub fn local_bounds(&mut self, id: NodeId) -> Rectangle {
        let Some(world) = self.refreshed_world(id) else {
            return Rectangle::EMPTY;
        };
        let mut bounds = Bounds::new();
        self.accumulate_bounds(id, &Matrix::IDENTITY, &world.inverse(), &mut bounds, true);
        bounds.rectangle()
    }

    fn refreshed_world(&mut self, id: NodeId) -> Option<Matrix> {
        if !self.contains(id) {
            return None;
        }
        self.refresh(id);
        self.world_transform(id)
    }

    /// `matrix` maps the local space of `id` into the target space;
    /// `from_stage` maps stage space into it and only places masks.
    fn accumulate_bounds(
        &self,
        id: NodeId,
        matrix: &Matrix,
        from_stage: &Matrix,
        bounds: &mut Bounds,
        is_root: bool,
    ) {
        let Some(node) = self.node(id) else {
            return;
        };
        let object = &node.object;
        if !is_root && (!object.visible || !object.renderable || node.mask_refs > 0) {
            return;
        }

        let mut own = Bounds::new();
        object.add_content_bounds(matrix, &mut own);
        for &child in &node.children {
            if let Some(child_object) = self.get(child) {
                let child_matrix = matrix.then(child_object.local_transform());
                self.accumulate_bounds(child, &child_matrix, from_stage, &mut own, false);
            }
        }

        if let Some((mask, mask_object)) = object.mask.and_then(|m| self.get(m).map(|o| (m, o))) {
            let mask_matrix = from_stage.then(mask_object.world_transform());
            let mut mask_bounds = Bounds::new();
            self.accumulate_bounds(mask, &mask_matrix, from_stage, &mut mask_bounds, true);
            let clipped = own.rectangle().intersection(&mask_bounds.rectangle());
            own.clear();
            if !clipped.is_empty() {
                own.add_point(clipped.left(), clipped.top());
                own.add_point(clipped.right(), clipped.bottom());
            }
        }

        bounds.add_bounds(&own);
    }

    /// Map a point from the local space of `id` to stage space.
    pub fn to_global(&mut self, id: NodeId, point: Point) -> Option<Point> {
        if !self.contains(id) {
            return None;
        }
        self.refresh(id);
        self.world_transform(id).map(|m| m.apply(point.x, point.y))
    }

    /// Map a stage-space point into the local space of `id`.
    pub fn to_local(&mut self, id: NodeId, global: Point) -> Option<Point> {
        if !self.contains(id) {
            return None;
        }
        self.refresh(id);
        self.world_transform(id)
            .map(|m| m.apply_inverse(global.x, global.y))
    }

    /// Current width of `id` in its parent's space.
    pub fn width(&mut self, id: NodeId) -> f32 {
        let scale = self.get(id).map(|o| o.transform.scale.x()).unwrap_or(1.0);
        scale.abs() * self.local_bounds(id).width
    }

    pub fn height(&mut self, id: NodeId) -> f32 {
        let scale = self.get(id).map(|o| o.transform.scale.y()).unwrap_or(1.0);
        scale.abs() * self.local_bounds(id).height
    }

    /// Scale `id` horizontally so its content is `width` wide. Content with
    /// zero width resets the scale to 1.
    pub fn set_width(&mut self, id: NodeId, width: f32) -> Result<()> {
        self.require(id)?;
        let content = self.local_bounds(id).width;
        if let Some(object) = self.get_mut(id) {
            let sign = object.transform.scale.x().signum();
            let scale = if content != 0.0 { sign * width / content } else { 1.0 };
            object.transform.scale.set_x(scale);
        }
        Ok(())
    }

    pub fn set_height(&mut self, id: NodeId, height: f32) -> Result<()> {
        self.require(id)?;
        let content = self.local_bounds(id).height;
        if let Some(object) = self.get_mut(id) {
            let sign = object.transform.scale.y().signum();
            let scale = if content != 0.0 { sign * height / content } else { 1.0 };
            object.transform.scale.set_y(scale);
        }
        Ok(())
    }

    /// Topmost interactive node under a stage-space point.
    ///
    /// Uses the world transforms from the last [`DisplayTree::update_transform`].
    /// Children are tested front to back. Content of a non-interactive node
    /// resolves to its nearest interactive ancestor and still occludes
    /// whatever lies beneath it.
    pub fn hit_test(&self, root: NodeId, global: Point) -> Option<NodeId> {
        match self.hit_node(root, global) {
            Hit::Hit(target) => target,
            Hit::Miss => None,
        }
    }

    fn hit_node(&self, id: NodeId, global: Point) -> Hit {
        let Some(node) = self.node(id) else {
            return Hit::Miss;
        };
        let object = &node.object;
        if !object.visible {
            return Hit::Miss;
        }
        if let Some(mask) = object.mask {
            if !self.mask_contains(mask, global) {
                return Hit::Miss;
            }
        }

        let local = object.world_transform().apply_inverse(global.x, global.y);
        let owner = object.interactive.then_some(id);

        if let Some(area) = &object.hit_area {
            return if area.contains(local.x, local.y) {
                Hit::Hit(owner)
            } else {
                Hit::Miss
            };
        }

        if object.interactive_children {
            for &child in node.children.iter().rev() {
                if self.is_mask(child) {
                    continue;
                }
                match self.hit_node(child, global) {
                    Hit::Hit(Some(target)) => return Hit::Hit(Some(target)),
                    Hit::Hit(None) => return Hit::Hit(owner),
                    Hit::Miss => {}
                }
            }
        }

        if object.contains_point(local.x, local.y) {
            Hit::Hit(owner)
        } else {
            Hit::Miss
        }
    }

    fn mask_contains(&self, mask: NodeId, global: Point) -> bool {
        let Some(object) = self.get(mask) else {
            return true;
        };
        let local = object.world_transform().apply_inverse(global.x, global.y);
        object.contains_point(local.x, local.y)
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventDispatcher {
        &mut self.events
    }

    /// Deliver `event` to its target and then each ancestor.
    pub fn dispatch_event(&mut self, mut event: Event) -> Event {
        let path = self.ancestors(event.target);
        self.events.dispatch(&path, &mut event);
        event
    }
}

impl Default for DisplayTree {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DisplayTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplayTree")
            .field("nodes", &self.dense.len())
            .field("free", &self.free_indices.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Color;
    use crate::texture::{BaseTexture, Texture};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn approx_eq(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn texture(w: u32, h: u32) -> Texture {
        Texture::from_base(BaseTexture::from_rgba(w, h, vec![255; (w * h * 4) as usize]).unwrap())
    }

    fn rect_graphics(x: f32, y: f32, w: f32, h: f32) -> Graphics {
        let mut g = Graphics::new();
        g.begin_fill(Color::WHITE).draw_rect(x, y, w, h);
        g
    }

    #[test]
    fn test_insert_and_destroy() {
        let mut tree = DisplayTree::new();
        let a = tree.create_container();
        let b = tree.create_container();
        assert_eq!(tree.len(), 2);

        tree.destroy(a);
        assert!(!tree.contains(a));
        assert!(tree.contains(b));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_generational_index() {
        let mut tree = DisplayTree::new();
        let a = tree.create_container();
        tree.destroy(a);
        let b = tree.create_container();
        // slot reused with a new generation
        assert_eq!(a.index, b.index);
        assert_ne!(a, b);
        assert!(tree.get(a).is_none());
        assert!(tree.get(b).is_some());
    }

    #[test]
    fn test_swap_remove_fixup() {
        let mut tree = DisplayTree::new();
        let a = tree.insert(DisplayObject::container().with_name("a"));
        let b = tree.insert(DisplayObject::container().with_name("b"));
        let c = tree.insert(DisplayObject::container().with_name("c"));
        tree.destroy(a);
        assert_eq!(tree.get(b).and_then(|o| o.name.clone()).as_deref(), Some("b"));
        assert_eq!(tree.get(c).and_then(|o| o.name.clone()).as_deref(), Some("c"));
    }

    #[test]
    fn test_add_child_reparents() {
        let mut tree = DisplayTree::new();
        let p1 = tree.create_container();
        let p2 = tree.create_container();
        let child = tree.create_container();

        tree.add_child(p1, child).unwrap();
        tree.add_child(p2, child).unwrap();
        assert!(tree.children(p1).is_empty());
        assert_eq!(tree.children(p2), &[child]);
        assert_eq!(tree.parent(child), Some(p2));
    }

    #[test]
    fn test_add_child_rejects_cycles() {
        let mut tree = DisplayTree::new();
        let a = tree.create_container();
        let b = tree.create_container();
        tree.add_child(a, b).unwrap();
        assert!(matches!(
            tree.add_child(b, a),
            Err(StageError::InvalidTreeOperation(_))
        ));
        assert!(tree.add_child(a, a).is_err());
    }

    #[test]
    fn test_add_child_at_and_indices() {
        let mut tree = DisplayTree::new();
        let p = tree.create_container();
        let a = tree.create_container();
        let b = tree.create_container();
        let c = tree.create_container();
        tree.add_child(p, a).unwrap();
        tree.add_child(p, b).unwrap();
        tree.add_child_at(p, c, 0).unwrap();
        assert_eq!(tree.children(p), &[c, a, b]);
        assert_eq!(tree.child_index(p, b).unwrap(), 2);

        let d = tree.create_container();
        assert!(matches!(
            tree.add_child_at(p, d, 5),
            Err(StageError::ChildIndexOutOfRange { index: 5, len: 3 })
        ));

        // re-adding an existing child at the end clamps to the shortened list
        tree.add_child_at(p, c, 3).unwrap();
        assert_eq!(tree.children(p), &[a, b, c]);
    }

    #[test]
    fn test_swap_and_set_child_index() {
        let mut tree = DisplayTree::new();
        let p = tree.create_container();
        let kids: Vec<_> = (0..3).map(|_| tree.create_container()).collect();
        for &k in &kids {
            tree.add_child(p, k).unwrap();
        }
        tree.swap_children(p, kids[0], kids[2]).unwrap();
        assert_eq!(tree.children(p), &[kids[2], kids[1], kids[0]]);

        tree.set_child_index(p, kids[0], 0).unwrap();
        assert_eq!(tree.children(p), &[kids[0], kids[2], kids[1]]);
        assert!(tree.set_child_index(p, kids[0], 3).is_err());
    }

    #[test]
    fn test_remove_children_range() {
        let mut tree = DisplayTree::new();
        let p = tree.create_container();
        let kids: Vec<_> = (0..4).map(|_| tree.create_container()).collect();
        for &k in &kids {
            tree.add_child(p, k).unwrap();
        }
        let removed = tree.remove_children(p, 1..3).unwrap();
        assert_eq!(removed, vec![kids[1], kids[2]]);
        assert_eq!(tree.children(p), &[kids[0], kids[3]]);
        assert!(tree.parent(kids[1]).is_none());
        assert!(tree.remove_children(p, 1..5).is_err());
        assert_eq!(tree.remove_children(p, ..).unwrap().len(), 2);
    }

    #[test]
    fn test_remove_child_requires_membership() {
        let mut tree = DisplayTree::new();
        let p = tree.create_container();
        let other = tree.create_container();
        assert!(tree.remove_child(p, other).is_err());
        assert!(matches!(
            tree.remove_child_at(p, 0),
            Err(StageError::ChildIndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_destroy_is_recursive() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let branch = tree.create_container();
        let leaf = tree.create_container();
        tree.add_child(root, branch).unwrap();
        tree.add_child(branch, leaf).unwrap();

        tree.destroy(branch);
        assert!(!tree.contains(branch));
        assert!(!tree.contains(leaf));
        assert!(tree.children(root).is_empty());
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_added_and_removed_events() {
        let mut tree = DisplayTree::new();
        let p = tree.create_container();
        let child = tree.create_container();
        let log = Rc::new(RefCell::new(Vec::new()));
        for kind in [EventType::Added, EventType::Removed] {
            let log = log.clone();
            tree.events_mut()
                .on(child, kind, move |e| log.borrow_mut().push(e.kind.clone()));
        }

        tree.add_child(p, child).unwrap();
        tree.remove_child(p, child).unwrap();
        assert_eq!(*log.borrow(), vec![EventType::Added, EventType::Removed]);
    }

    #[test]
    fn test_world_transform_and_alpha() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let child = tree.insert(DisplayObject::container().with_position(10.0, 0.0));
        tree.add_child(root, child).unwrap();
        {
            let r = tree.get_mut(root).unwrap();
            r.transform.position.set(5.0, 5.0);
            r.alpha = 0.5;
        }
        tree.get_mut(child).unwrap().alpha = 0.5;

        tree.update_transform(root);
        let world = tree.world_transform(child).unwrap();
        assert!(approx_eq(world.tx, 15.0));
        assert!(approx_eq(world.ty, 5.0));
        assert!(approx_eq(tree.get(child).unwrap().world_alpha(), 0.25));
    }

    #[test]
    fn test_invisible_subtree_is_not_updated() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let hidden = tree.create_container();
        tree.add_child(root, hidden).unwrap();
        tree.update_transform(root);
        let id = tree.get(hidden).unwrap().transform.world_id();

        tree.get_mut(hidden).unwrap().visible = false;
        tree.get_mut(root).unwrap().transform.position.set(1.0, 1.0);
        tree.update_transform(root);
        assert_eq!(tree.get(hidden).unwrap().transform.world_id(), id);
    }

    #[test]
    fn test_reparent_refreshes_world() {
        let mut tree = DisplayTree::new();
        let a = tree.insert(DisplayObject::container().with_position(100.0, 0.0));
        let b = tree.insert(DisplayObject::container().with_position(200.0, 0.0));
        let child = tree.create_container();
        tree.add_child(a, child).unwrap();
        tree.update_transform(a);
        tree.add_child(b, child).unwrap();
        tree.update_transform(b);
        assert!(approx_eq(tree.world_transform(child).unwrap().tx, 200.0));
    }

    #[test]
    fn test_bounds_and_local_bounds() {
        let mut tree = DisplayTree::new();
        let root = tree.insert(DisplayObject::container().with_position(10.0, 10.0));
        let sprite = tree.create_sprite(Sprite::new(texture(20, 10)));
        tree.add_child(root, sprite).unwrap();
        tree.get_mut(sprite).unwrap().transform.scale.set(2.0, 2.0);

        assert_eq!(tree.bounds(root), Rectangle::new(10.0, 10.0, 40.0, 20.0));
        assert_eq!(tree.local_bounds(root), Rectangle::new(0.0, 0.0, 40.0, 20.0));
        assert_eq!(tree.local_bounds(sprite), Rectangle::new(0.0, 0.0, 20.0, 10.0));
        assert!(approx_eq(tree.width(sprite), 40.0));
    }

    #[test]
    fn test_bounds_are_clipped_by_mask() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let sprite = tree.create_sprite(Sprite::new(texture(100, 100)));
        let mask = tree.create_graphics(rect_graphics(0.0, 0.0, 30.0, 40.0));
        tree.add_child(root, sprite).unwrap();
        tree.set_mask(sprite, Some(mask)).unwrap();
        assert_eq!(tree.bounds(root), Rectangle::new(0.0, 0.0, 30.0, 40.0));
    }

    #[test]
    fn test_set_width_scales_content() {
        let mut tree = DisplayTree::new();
        let sprite = tree.create_sprite(Sprite::new(texture(20, 10)));
        tree.set_width(sprite, 60.0).unwrap();
        tree.set_height(sprite, 5.0).unwrap();
        let scale = tree.get(sprite).unwrap().transform.scale.get();
        assert!(approx_eq(scale.x, 3.0));
        assert!(approx_eq(scale.y, 0.5));
    }

    #[test]
    fn test_collapsed_scale_keeps_local_size() {
        let mut tree = DisplayTree::new();
        let sprite = tree.create_sprite(Sprite::new(texture(20, 10)));
        tree.get_mut(sprite).unwrap().transform.scale.set_x(0.0);
        tree.set_width(sprite, 60.0).unwrap();
        assert!(approx_eq(tree.get(sprite).unwrap().transform.scale.x(), 3.0));

        let parent = tree.create_container();
        let child = tree.create_sprite(Sprite::new(texture(20, 10)));
        tree.add_child(parent, child).unwrap();
        tree.get_mut(parent).unwrap().transform.scale.set(0.0, 0.0);
        assert_eq!(tree.local_bounds(child), Rectangle::new(0.0, 0.0, 20.0, 10.0));
        assert_eq!(tree.local_bounds(parent), Rectangle::new(0.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn test_to_global_and_back() {
        let mut tree = DisplayTree::new();
        let root = tree.insert(DisplayObject::container().with_position(50.0, 0.0));
        let child = tree.create_container();
        tree.add_child(root, child).unwrap();
        tree.get_mut(child).unwrap().transform.set_rotation_degrees(90.0);

        let global = tree.to_global(child, Point::new(10.0, 0.0)).unwrap();
        assert!(approx_eq(global.x, 50.0));
        assert!(approx_eq(global.y, 10.0));
        let local = tree.to_local(child, global).unwrap();
        assert!(approx_eq(local.x, 10.0));
        assert!(approx_eq(local.y, 0.0));
    }

    #[test]
    fn test_set_mask_validation() {
        let mut tree = DisplayTree::new();
        let node = tree.create_container();
        let not_graphics = tree.create_container();
        let mask = tree.create_graphics(rect_graphics(0.0, 0.0, 1.0, 1.0));

        assert!(tree.set_mask(node, Some(not_graphics)).is_err());
        tree.set_mask(node, Some(mask)).unwrap();
        assert!(tree.is_mask(mask));
        tree.set_mask(node, None).unwrap();
        assert!(!tree.is_mask(mask));
    }

    #[test]
    fn test_hit_test_topmost_interactive() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let below = tree.create_sprite(Sprite::new(texture(10, 10)));
        let above = tree.create_sprite(Sprite::new(texture(10, 10)));
        tree.add_child(root, below).unwrap();
        tree.add_child(root, above).unwrap();
        tree.get_mut(below).unwrap().interactive = true;
        tree.get_mut(above).unwrap().interactive = true;
        tree.get_mut(above).unwrap().transform.position.set(5.0, 0.0);
        tree.update_transform(root);

        assert_eq!(tree.hit_test(root, Point::new(7.0, 5.0)), Some(above));
        assert_eq!(tree.hit_test(root, Point::new(2.0, 5.0)), Some(below));
        assert_eq!(tree.hit_test(root, Point::new(50.0, 5.0)), None);
    }

    #[test]
    fn test_hit_test_resolves_to_interactive_ancestor() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let button = tree.insert(DisplayObject::container().with_interactive(true));
        let face = tree.create_sprite(Sprite::new(texture(10, 10)));
        tree.add_child(root, button).unwrap();
        tree.add_child(button, face).unwrap();
        tree.update_transform(root);

        assert_eq!(tree.hit_test(root, Point::new(5.0, 5.0)), Some(button));
    }

    #[test]
    fn test_hit_test_respects_hit_area_and_mask() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let target = tree.insert(DisplayObject::container().with_interactive(true));
        tree.add_child(root, target).unwrap();
        tree.get_mut(target).unwrap().hit_area =
            Some(Rectangle::new(0.0, 0.0, 100.0, 100.0).into());
        let mask = tree.create_graphics(rect_graphics(0.0, 0.0, 50.0, 50.0));
        tree.set_mask(target, Some(mask)).unwrap();
        tree.update_transform(root);

        assert_eq!(tree.hit_test(root, Point::new(25.0, 25.0)), Some(target));
        assert_eq!(tree.hit_test(root, Point::new(75.0, 75.0)), None);
    }

    #[test]
    fn test_dispatch_event_bubbles() {
        let mut tree = DisplayTree::new();
        let root = tree.create_container();
        let child = tree.create_container();
        tree.add_child(root, child).unwrap();
        let hits = Rc::new(RefCell::new(Vec::new()));
        for id in [root, child] {
            let hits = hits.clone();
            tree.events_mut().on(id, EventType::Click, move |e| {
                hits.borrow_mut().push(e.current_target)
            });
        }
        tree.dispatch_event(Event::new(EventType::Click, child));
        assert_eq!(*hits.borrow(), vec![child, root]);
    }
}
