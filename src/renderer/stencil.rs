use crate::display::NodeId;

use super::state::StencilMode;

/// One stencil operation produced by [`StencilManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StencilOp {
    pub mask: NodeId,
    /// Reference value for drawing the mask.
    pub reference: u32,
    /// Mode for drawing the mask.
    pub mode: StencilMode,
    /// Level content is tested against afterwards.
    pub level_after: u32,
}

/// Stack of active masks.
///
/// Level `n` means `n` masks are active and content passes where the stencil
/// buffer equals `n`. The buffer is cleared to 0 at the start of a frame.
#[derive(Debug, Default)]
pub struct StencilManager {
    stack: Vec<NodeId>,
}

impl StencilManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(&self) -> u32 {
        self.stack.len() as u32
    }

    /// Mode for content drawn at the current level.
    pub fn content_mode(&self) -> StencilMode {
        content_mode(self.level())
    }

    /// Increment the stencil where the mask covers the current level.
    pub fn push_mask(&mut self, mask: NodeId) -> StencilOp {
        let level = self.level();
        self.stack.push(mask);
        StencilOp {
            mask,
            reference: level,
            mode: StencilMode::Increment,
            level_after: level + 1,
        }
    }

    /// Undo the most recent push. An empty stack is ignored.
    pub fn pop_mask(&mut self) -> Option<StencilOp> {
        let level = self.level();
        let Some(mask) = self.stack.pop() else {
            log::warn!("Stencil pop without an active mask");
            return None;
        };
        Some(StencilOp {
            mask,
            reference: level,
            mode: StencilMode::Decrement,
            level_after: level - 1,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    pub fn reset(&mut self) {
        if !self.stack.is_empty() {
            log::warn!("Discarding {} unbalanced stencil masks", self.stack.len());
        }
        self.stack.clear();
    }
}

/// Stencil mode for content drawn at `level`.
pub fn content_mode(level: u32) -> StencilMode {
    if level == 0 {
        StencilMode::Disabled
    } else {
        StencilMode::Test
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayObject, DisplayTree};

    #[test]
    fn test_push_pop_levels() {
        let mut tree = DisplayTree::new();
        let a = tree.insert(DisplayObject::container());
        let b = tree.insert(DisplayObject::container());
        let mut stencil = StencilManager::new();
        assert_eq!(stencil.content_mode(), StencilMode::Disabled);

        let first = stencil.push_mask(a);
        assert_eq!((first.reference, first.level_after), (0, 1));
        let second = stencil.push_mask(b);
        assert_eq!((second.reference, second.level_after), (1, 2));
        assert_eq!(stencil.content_mode(), StencilMode::Test);

        let pop = stencil.pop_mask().unwrap();
        assert_eq!(pop.mask, b);
        assert_eq!((pop.reference, pop.level_after), (2, 1));
        assert_eq!(pop.mode, StencilMode::Decrement);
        stencil.pop_mask();
        assert_eq!(stencil.level(), 0);
    }

    #[test]
    fn test_pop_on_empty_is_ignored() {
        let _ = env_logger::builder().is_test(true).try_init();
        let mut stencil = StencilManager::new();
        assert!(stencil.pop_mask().is_none());
        assert_eq!(stencil.level(), 0);
    }
}
