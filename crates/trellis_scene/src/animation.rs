//! Animation Channels
//!
//! Keyframe channels that drive one component (translation, rotation or
//! scale) of one node's transform through
//! [`ModelInstance::set_transform_decomposed`]. Each channel targets a
//! [`TransformId`], so several channels can animate the same node on
//! separate relative layers without overwriting each other.
//!
//! There is no clip, mixer or blending here; callers sample channels at a
//! time of their choosing.

use glam::{Quat, Vec3};
use trellis_core::{Result, TrellisError};

use crate::instance::ModelInstance;
use crate::transform::TransformId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InterpolationMode {
    #[default]
    Linear,
    Step,
}

pub trait Interpolatable: Copy {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.slerp(end, t).normalize()
    }
}

/// Sorted keyframe times with one value per keyframe.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyframeTrack<T> {
    times: Vec<f32>,
    values: Vec<T>,
    interpolation: InterpolationMode,
}

impl<T: Interpolatable> KeyframeTrack<T> {
    /// Fails unless there is at least one keyframe, one value per time, and
    /// the times never decrease.
    pub fn new(times: Vec<f32>, values: Vec<T>, interpolation: InterpolationMode) -> Result<Self> {
        if times.is_empty() {
            return Err(TrellisError::LoadFailed(
                "animation track has no keyframes".to_string(),
            ));
        }
        if times.len() != values.len() {
            return Err(TrellisError::LoadFailed(format!(
                "animation track has {} times but {} values",
                times.len(),
                values.len()
            )));
        }
        if times.windows(2).any(|pair| pair[1] < pair[0]) {
            return Err(TrellisError::LoadFailed(
                "animation track times are not sorted".to_string(),
            ));
        }
        Ok(Self {
            times,
            values,
            interpolation,
        })
    }

    /// Time of the last keyframe.
    #[must_use]
    pub fn duration(&self) -> f32 {
        self.times[self.times.len() - 1]
    }

    /// Value at `time`, clamped to the first and last keyframes.
    #[must_use]
    pub fn sample(&self, time: f32) -> T {
        // First keyframe strictly after `time`
        let next = self.times.partition_point(|&t| t <= time);
        if next == 0 {
            return self.values[0];
        }
        let index = next - 1;
        if index >= self.times.len() - 1 {
            return self.values[self.values.len() - 1];
        }

        match self.interpolation {
            InterpolationMode::Step => self.values[index],
            InterpolationMode::Linear => {
                let t0 = self.times[index];
                let dt = self.times[index + 1] - t0;
                let t = if dt > 1e-6 { (time - t0) / dt } else { 0.0 };
                T::interpolate_linear(self.values[index], self.values[index + 1], t.clamp(0.0, 1.0))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ChannelTrack {
    Translation(KeyframeTrack<Vec3>),
    Rotation(KeyframeTrack<Quat>),
    Scale(KeyframeTrack<Vec3>),
}

/// A track bound to one node and one transform slot.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationChannel {
    pub node: usize,
    pub transform_id: TransformId,
    pub track: ChannelTrack,
}

impl AnimationChannel {
    #[must_use]
    pub fn new(node: usize, transform_id: TransformId, track: ChannelTrack) -> Self {
        Self {
            node,
            transform_id,
            track,
        }
    }

    #[must_use]
    pub fn duration(&self) -> f32 {
        match &self.track {
            ChannelTrack::Translation(track) | ChannelTrack::Scale(track) => track.duration(),
            ChannelTrack::Rotation(track) => track.duration(),
        }
    }

    /// Writes the sampled component into the targeted transform.
    ///
    /// The other components of that transform keep their stored values. The
    /// instance's render data becomes stale.
    pub fn apply(&self, instance: &ModelInstance, time: f32) -> Result<()> {
        let sampled = match &self.track {
            ChannelTrack::Translation(track) => Sampled::Translation(track.sample(time)),
            ChannelTrack::Rotation(track) => Sampled::Rotation(track.sample(time).normalize()),
            ChannelTrack::Scale(track) => Sampled::Scale(track.sample(time)),
        };
        instance.set_transform_decomposed(self.node, self.transform_id, |transform| match sampled {
            Sampled::Translation(value) => transform.translation = value,
            Sampled::Rotation(value) => transform.rotation = value,
            Sampled::Scale(value) => transform.scale = value,
        })
    }
}

enum Sampled {
    Translation(Vec3),
    Rotation(Quat),
    Scale(Vec3),
}
