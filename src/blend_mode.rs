/// How a node's premultiplied color combines with what is already drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    #[default]
    Normal,
    Add,
    Multiply,
    Screen,
}

impl BlendMode {
    pub fn to_wgpu(self) -> wgpu::BlendState {
        use wgpu::BlendFactor as F;

        let (src_factor, dst_factor) = match self {
            BlendMode::Normal => (F::One, F::OneMinusSrcAlpha),
            BlendMode::Add => (F::One, F::One),
            BlendMode::Multiply => (F::Dst, F::OneMinusSrcAlpha),
            BlendMode::Screen => (F::One, F::OneMinusSrc),
        };
        let color = wgpu::BlendComponent {
            src_factor,
            dst_factor,
            operation: wgpu::BlendOperation::Add,
        };
        let alpha = wgpu::BlendComponent {
            src_factor: F::One,
            dst_factor: F::OneMinusSrcAlpha,
            operation: wgpu::BlendOperation::Add,
        };
        wgpu::BlendState { color, alpha }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normal_is_premultiplied_over() {
        let state = BlendMode::Normal.to_wgpu();
        assert_eq!(state, wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING);
    }

    #[test]
    fn test_add_is_additive() {
        let state = BlendMode::Add.to_wgpu();
        assert_eq!(state.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(state.color.dst_factor, wgpu::BlendFactor::One);
    }
}
