use glam::Mat4;

/// Bytes per column-major `mat4x4<f32>` entry.
pub const MAT4X4_SIZE: usize = std::mem::size_of::<Mat4>();

/// Flat array of world matrices, one per node, laid out for direct upload
/// as a storage buffer.
///
/// Cloning produces an independent snapshot; instances keep the current
/// snapshot behind an `Arc` and copy it only when a reader still holds the
/// previous one.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMatricesBuffer {
    matrices: Vec<Mat4>,
}

impl ModelMatricesBuffer {
    /// A buffer of `len` identity matrices.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            matrices: vec![Mat4::IDENTITY; len],
        }
    }

    /// Resets every entry to identity.
    pub fn clear(&mut self) {
        self.matrices.fill(Mat4::IDENTITY);
    }

    #[inline]
    pub fn set_matrix(&mut self, index: usize, matrix: Mat4) {
        self.matrices[index] = matrix;
    }

    #[inline]
    #[must_use]
    pub fn matrix(&self, index: usize) -> Option<Mat4> {
        self.matrices.get(index).copied()
    }

    #[inline]
    #[must_use]
    pub fn matrices(&self) -> &[Mat4] {
        &self.matrices
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.matrices.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.matrices.is_empty()
    }

    /// Raw upload bytes, `len() * MAT4X4_SIZE` long.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.matrices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn starts_and_clears_to_identity() {
        let mut buffer = ModelMatricesBuffer::new(3);
        assert_eq!(buffer.as_bytes().len(), 3 * MAT4X4_SIZE);
        assert_eq!(MAT4X4_SIZE, 64);

        buffer.set_matrix(1, Mat4::from_translation(Vec3::X));
        let snapshot = buffer.clone();
        buffer.clear();

        assert_eq!(buffer.matrix(1), Some(Mat4::IDENTITY));
        assert_eq!(snapshot.matrix(1), Some(Mat4::from_translation(Vec3::X)));
        assert_eq!(buffer.matrix(3), None);
    }
}
