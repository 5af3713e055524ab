use glam::{Mat4, Quat, Vec3};

/// Translation, rotation and scale of a node relative to its parent.
///
/// Converted to a matrix as `T * R * S`: scale first, then rotation, then
/// translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecomposedTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl DecomposedTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    #[must_use]
    pub fn new(translation: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[must_use]
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Self::IDENTITY
        }
    }

    /// Decomposes an affine matrix. Shear is lost.
    #[must_use]
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    #[inline]
    #[must_use]
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    /// Moves by `offset` in parent space.
    pub fn translate(&mut self, offset: Vec3) -> &mut Self {
        self.translation += offset;
        self
    }

    /// Multiplies the scale uniformly.
    pub fn scale_by(&mut self, factor: f32) -> &mut Self {
        self.scale *= factor;
        self
    }

    /// Applies `rotation` after the current rotation.
    pub fn rotate(&mut self, rotation: Quat) -> &mut Self {
        self.rotation = (rotation * self.rotation).normalize();
        self
    }
}

impl Default for DecomposedTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Which stored transform of a node an edit targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformId {
    /// Replaces the node's bind transform. A fresh absolute transform starts
    /// as a copy of the bind transform, so edits are relative to it.
    Absolute,
    /// An additional layer composed on top of the node's local transform.
    ///
    /// Layers compose in ascending `layer` order when render data is
    /// recomputed. `base` names the layer this one builds on; `None` builds
    /// directly on the absolute (or bind) transform. A named base must be a
    /// lower layer that has already been set on the same node.
    Relative { layer: u32, base: Option<u32> },
}

impl TransformId {
    /// Shorthand for a relative layer built directly on the local transform.
    #[must_use]
    pub const fn relative(layer: u32) -> Self {
        Self::Relative { layer, base: None }
    }

    /// Shorthand for a relative layer built on another layer.
    #[must_use]
    pub const fn relative_to(layer: u32, base: u32) -> Self {
        Self::Relative {
            layer,
            base: Some(base),
        }
    }
}
