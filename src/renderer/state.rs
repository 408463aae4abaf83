//! Cached fixed-function state.
//!
//! wgpu bakes blending, culling, depth and stencil behavior into pipelines.
//! [`WebGLState`] tracks what the next draw needs and [`PipelineKey`] names
//! the pipeline that provides it, so a pipeline is only re-bound when the
//! key changes between draws.

use bitflags::bitflags;

use crate::blend_mode::BlendMode;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StateFlags: u8 {
        const BLEND = 1 << 0;
        /// Constant depth bias.
        const OFFSET = 1 << 1;
        const CULL_FACE = 1 << 2;
        const DEPTH_TEST = 1 << 3;
        /// Clockwise front faces.
        const WINDING = 1 << 4;
    }
}

impl StateFlags {
    /// Blending on, everything else off.
    pub const DEFAULT_2D: StateFlags = StateFlags::BLEND;
}

/// What a draw does to the stencil buffer.
///
/// The comparison reference is the current mask level, set per draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StencilMode {
    /// No masks active; stencil ignored.
    Disabled,
    /// Draw only where the stencil equals the reference.
    Test,
    /// Mask push: increment where the stencil equals the reference, no color.
    Increment,
    /// Mask pop: decrement where the stencil equals the reference, no color.
    Decrement,
}

impl StencilMode {
    pub fn writes_color(self) -> bool {
        matches!(self, StencilMode::Disabled | StencilMode::Test)
    }

    pub fn to_wgpu(self) -> wgpu::StencilFaceState {
        let (compare, pass_op) = match self {
            StencilMode::Disabled => (wgpu::CompareFunction::Always, wgpu::StencilOperation::Keep),
            StencilMode::Test => (wgpu::CompareFunction::Equal, wgpu::StencilOperation::Keep),
            StencilMode::Increment => (
                wgpu::CompareFunction::Equal,
                wgpu::StencilOperation::IncrementClamp,
            ),
            StencilMode::Decrement => (
                wgpu::CompareFunction::Equal,
                wgpu::StencilOperation::DecrementClamp,
            ),
        };
        wgpu::StencilFaceState {
            compare,
            fail_op: wgpu::StencilOperation::Keep,
            depth_fail_op: wgpu::StencilOperation::Keep,
            pass_op,
        }
    }
}

/// Everything that selects a render pipeline for a given target format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub flags: StateFlags,
    pub blend: BlendMode,
    pub stencil: StencilMode,
}

/// Current fixed-function state.
#[derive(Debug, Clone, PartialEq)]
pub struct WebGLState {
    flags: StateFlags,
    blend_mode: BlendMode,
    stack: Vec<(StateFlags, BlendMode)>,
}

impl WebGLState {
    pub fn new() -> Self {
        Self {
            flags: StateFlags::DEFAULT_2D,
            blend_mode: BlendMode::Normal,
            stack: Vec::new(),
        }
    }

    pub fn flags(&self) -> StateFlags {
        self.flags
    }

    pub fn blend_mode(&self) -> BlendMode {
        self.blend_mode
    }

    /// Returns whether anything changed.
    pub fn set_state(&mut self, flags: StateFlags) -> bool {
        if self.flags == flags {
            return false;
        }
        let diff = self.flags ^ flags;
        log::trace!("State change: {:?}", diff);
        self.flags = flags;
        true
    }

    /// Returns whether the mode changed.
    pub fn set_blend_mode(&mut self, mode: BlendMode) -> bool {
        if self.blend_mode == mode {
            return false;
        }
        self.blend_mode = mode;
        true
    }

    pub fn push(&mut self) {
        self.stack.push((self.flags, self.blend_mode));
    }

    /// Restore the state saved by the matching [`WebGLState::push`].
    pub fn pop(&mut self) -> bool {
        match self.stack.pop() {
            Some((flags, blend)) => {
                let changed = self.set_state(flags);
                self.set_blend_mode(blend) || changed
            }
            None => {
                log::warn!("WebGLState::pop without matching push");
                false
            }
        }
    }

    /// Back to the 2D defaults.
    pub fn reset(&mut self) {
        self.stack.clear();
        self.flags = StateFlags::DEFAULT_2D;
        self.blend_mode = BlendMode::Normal;
    }

    pub fn key(&self, stencil: StencilMode) -> PipelineKey {
        PipelineKey {
            flags: self.flags,
            blend: self.blend_mode,
            stencil,
        }
    }
}

impl Default for WebGLState {
    fn default() -> Self {
        Self::new()
    }
}
