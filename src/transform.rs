//! Per-node transforms.
//!
//! A [`Transform`] owns the decomposed components (position, scale, pivot,
//! skew, rotation) and two cached matrices. Recomputation is lazy: the local
//! matrix is rebuilt only when a component's version changed, and the world
//! matrix only when the local matrix or the parent's world matrix changed.

use crate::math::{Matrix, ObservablePoint, Point};

/// Snapshot of a parent's world state, passed down during traversal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParentTransform {
    pub world: Matrix,
    pub world_id: u32,
}

impl ParentTransform {
    /// The implicit parent of a tree root.
    pub const ROOT: Self = Self {
        world: Matrix::IDENTITY,
        world_id: 0,
    };
}

/// Something with a local and a world matrix that can be refreshed from its parent.
pub trait TransformBase {
    fn local_transform(&self) -> &Matrix;
    fn world_transform(&self) -> &Matrix;
    /// Incremented every time the world matrix is recomputed.
    fn world_id(&self) -> u32;
    fn update_local_transform(&mut self);
    fn update_transform(&mut self, parent: &ParentTransform);

    fn as_parent(&self) -> ParentTransform {
        ParentTransform {
            world: *self.world_transform(),
            world_id: self.world_id(),
        }
    }
}

const UNSEEN: u32 = u32::MAX;

#[derive(Clone, Debug)]
pub struct Transform {
    pub position: ObservablePoint,
    pub scale: ObservablePoint,
    pub pivot: ObservablePoint,
    pub skew: ObservablePoint,
    rotation: f32,
    rotation_version: u32,
    // cos/sin terms derived from rotation and skew
    cx: f32,
    sx: f32,
    cy: f32,
    sy: f32,
    local: Matrix,
    world: Matrix,
    local_stamp: u32,
    world_id: u32,
    parent_id: u32,
}

impl Transform {
    pub fn new() -> Self {
        Self {
            position: ObservablePoint::new(0.0, 0.0),
            scale: ObservablePoint::new(1.0, 1.0),
            pivot: ObservablePoint::new(0.0, 0.0),
            skew: ObservablePoint::new(0.0, 0.0),
            rotation: 0.0,
            rotation_version: 0,
            cx: 1.0,
            sx: 0.0,
            cy: 0.0,
            sy: 1.0,
            local: Matrix::IDENTITY,
            world: Matrix::IDENTITY,
            local_stamp: UNSEEN,
            world_id: 0,
            parent_id: UNSEEN,
        }
    }

    pub fn rotation(&self) -> f32 {
        self.rotation
    }

    pub fn set_rotation(&mut self, radians: f32) {
        if self.rotation != radians {
            self.rotation = radians;
            self.rotation_version = self.rotation_version.wrapping_add(1);
        }
    }

    pub fn set_rotation_degrees(&mut self, degrees: f32) {
        self.set_rotation(degrees.to_radians());
    }

    /// Forget the recorded parent so the next update recomputes the world matrix.
    ///
    /// Called when the node is attached to a different parent.
    pub fn invalidate_parent(&mut self) {
        self.parent_id = UNSEEN;
    }

    /// Set all components from an arbitrary affine matrix.
    pub fn set_from_matrix(&mut self, matrix: &Matrix) {
        let parts = matrix.decompose();
        self.position.copy_from(parts.position);
        self.scale.copy_from(parts.scale);
        self.skew.copy_from(parts.skew);
        self.pivot.copy_from(Point::ZERO);
        self.set_rotation(parts.rotation);
    }

    fn component_stamp(&self) -> u32 {
        self.position
            .version()
            .wrapping_add(self.scale.version())
            .wrapping_add(self.pivot.version())
            .wrapping_add(self.skew.version())
            .wrapping_add(self.rotation_version)
    }

    fn update_skew(&mut self) {
        let r = self.rotation;
        self.cx = (r + self.skew.y()).cos();
        self.sx = (r + self.skew.y()).sin();
        self.cy = -(r - self.skew.x()).sin();
        self.sy = (r - self.skew.x()).cos();
    }

    /// Rebuild the local matrix if a component changed. Returns whether it did.
    fn refresh_local(&mut self) -> bool {
        let stamp = self.component_stamp();
        if stamp == self.local_stamp {
            return false;
        }
        self.update_skew();
        let (scale_x, scale_y) = (self.scale.x(), self.scale.y());
        let (pivot_x, pivot_y) = (self.pivot.x(), self.pivot.y());
        let lt = &mut self.local;
        lt.a = self.cx * scale_x;
        lt.b = self.sx * scale_x;
        lt.c = self.cy * scale_y;
        lt.d = self.sy * scale_y;
        lt.tx = self.position.x() - (pivot_x * lt.a + pivot_y * lt.c);
        lt.ty = self.position.y() - (pivot_x * lt.b + pivot_y * lt.d);
        self.local_stamp = stamp;
        true
    }
}

impl TransformBase for Transform {
    fn local_transform(&self) -> &Matrix {
        &self.local
    }

    fn world_transform(&self) -> &Matrix {
        &self.world
    }

    fn world_id(&self) -> u32 {
        self.world_id
    }

    fn update_local_transform(&mut self) {
        if self.refresh_local() {
            self.parent_id = UNSEEN;
        }
    }

    fn update_transform(&mut self, parent: &ParentTransform) {
        if self.refresh_local() {
            self.parent_id = UNSEEN;
        }
        if self.parent_id != parent.world_id {
            let mut world = parent.world;
            world.append(&self.local);
            self.world = world;
            self.parent_id = parent.world_id;
            self.world_id = self.world_id.wrapping_add(1);
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}
