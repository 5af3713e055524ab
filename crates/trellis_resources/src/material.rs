use std::sync::{Arc, LazyLock};

use glam::Vec4;

/// How a primitive's alpha channel is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AlphaMode {
    #[default]
    Opaque,
    /// Fragments with alpha below the cutoff are discarded.
    Mask(f32),
    Blend,
}

/// Material parameters a model primitive is drawn with.
///
/// This is a plain descriptor: shading is the host pipeline's business.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderMaterial {
    pub name: Option<String>,
    pub base_color: Vec4,
    pub alpha_mode: AlphaMode,
    pub double_sided: bool,
    /// Vertices carry joint indices and weights.
    pub skinned: bool,
}

static DEFAULT_MATERIAL: LazyLock<Arc<RenderMaterial>> =
    LazyLock::new(|| Arc::new(RenderMaterial::default()));

impl RenderMaterial {
    /// Shared fallback for primitives that do not name a material.
    #[must_use]
    pub fn default_material() -> Arc<RenderMaterial> {
        Arc::clone(&DEFAULT_MATERIAL)
    }
}

impl Default for RenderMaterial {
    fn default() -> Self {
        Self {
            name: None,
            base_color: Vec4::ONE,
            alpha_mode: AlphaMode::Opaque,
            double_sided: false,
            skinned: false,
        }
    }
}
