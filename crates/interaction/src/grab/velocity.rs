//! Velocity estimation from pose samples and release-velocity policy.

use super::EaseCurve;
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::f32::consts::PI;

/// Position intervals averaged by [`VelocityEstimator::velocity`].
pub const POSITION_FRAMES: usize = 5;
/// Rotation intervals averaged by [`VelocityEstimator::angular_velocity`].
pub const ROTATION_FRAMES: usize = 11;
/// How far back (seconds) `GetFromHand` samples the hand.
pub const HAND_LOOKBACK: f64 = -0.011;

const HISTORY: usize = 32;

/// Timestamped pose.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    /// Seconds.
    pub time: f64,
    /// World position.
    pub position: Vec3,
    /// World rotation.
    pub rotation: Quat,
}

/// Rolling window of pose samples.
#[derive(Debug, Clone, Default)]
pub struct VelocityEstimator {
    samples: VecDeque<PoseSample>,
}

impl VelocityEstimator {
    /// Empty window.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a sample. Samples not newer than the last one are ignored.
    pub fn push(&mut self, time: f64, position: Vec3, rotation: Quat) {
        if self.samples.back().is_some_and(|last| time <= last.time) {
            return;
        }
        if self.samples.len() == HISTORY {
            self.samples.pop_front();
        }
        self.samples.push_back(PoseSample {
            time,
            position,
            rotation,
        });
    }

    /// Forget all samples.
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Number of samples held.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are held.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean linear velocity over the last [`POSITION_FRAMES`] intervals.
    pub fn velocity(&self) -> Vec3 {
        let n = self.samples.len();
        if n < 2 {
            return Vec3::ZERO;
        }
        let first = self.samples[n - 1 - (n - 1).min(POSITION_FRAMES)];
        let last = self.samples[n - 1];
        let dt = (last.time - first.time) as f32;
        if dt <= 0.0 {
            return Vec3::ZERO;
        }
        (last.position - first.position) / dt
    }

    /// Mean angular velocity (axis × rad/s) over the last [`ROTATION_FRAMES`] intervals.
    pub fn angular_velocity(&self) -> Vec3 {
        let n = self.samples.len();
        if n < 2 {
            return Vec3::ZERO;
        }
        let start = n - 1 - (n - 1).min(ROTATION_FRAMES);
        let mut sum = Vec3::ZERO;
        let mut total = 0.0f32;
        for i in start..n - 1 {
            let (a, b) = (self.samples[i], self.samples[i + 1]);
            let dt = (b.time - a.time) as f32;
            sum += rotation_vector(a.rotation, b.rotation);
            total += dt;
        }
        if total <= 0.0 {
            return Vec3::ZERO;
        }
        sum / total
    }

    /// Linear and angular velocity of the interval containing `time`.
    ///
    /// Uses the newest interval ending at or before `time`, else the oldest interval.
    pub fn velocity_at(&self, time: f64) -> Option<(Vec3, Vec3)> {
        if self.samples.len() < 2 {
            return None;
        }
        let end = (1..self.samples.len())
            .rev()
            .find(|&i| self.samples[i].time <= time)
            .unwrap_or(1);
        let (a, b) = (self.samples[end - 1], self.samples[end]);
        let dt = (b.time - a.time) as f32;
        if dt <= 0.0 {
            return None;
        }
        Some(((b.position - a.position) / dt, rotation_vector(a.rotation, b.rotation) / dt))
    }
}

/// Axis × angle of the rotation taking `from` to `to`, angle in `-PI..=PI`.
pub fn rotation_vector(from: Quat, to: Quat) -> Vec3 {
    let delta = (to * from.inverse()).normalize();
    let (axis, mut angle) = delta.to_axis_angle();
    if angle > PI {
        angle -= 2.0 * PI;
    }
    if !axis.is_finite() || angle.abs() < f32::EPSILON {
        return Vec3::ZERO;
    }
    axis * angle
}

/// Where a released object's velocity comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReleaseStyle {
    /// Keep the body's current velocity.
    #[default]
    NoChange,
    /// Hand velocity slightly in the past.
    GetFromHand,
    /// Short rolling estimate of the object's own motion.
    ShortEstimation,
}

/// Per-object release policy.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReleaseSettings {
    /// Velocity source.
    pub style: ReleaseStyle,
    /// Multiplier applied to the chosen velocity.
    pub scale: f32,
    /// Speed at which the full scale applies; `None` applies it always.
    pub scale_threshold: Option<f32>,
    /// Curve over `speed / scale_threshold`.
    pub scale_curve: EaseCurve,
}

impl Default for ReleaseSettings {
    fn default() -> Self {
        Self {
            style: ReleaseStyle::NoChange,
            scale: 1.0,
            scale_threshold: None,
            scale_curve: EaseCurve::EaseInOut,
        }
    }
}

impl ReleaseSettings {
    /// Settings for thrown objects: hand velocity, amplified slightly.
    pub fn throwable() -> Self {
        Self {
            style: ReleaseStyle::GetFromHand,
            scale: 1.1,
            ..Self::default()
        }
    }

    /// Multiplier for a release at `speed`.
    pub fn scale_factor(&self, speed: f32) -> f32 {
        match self.scale_threshold {
            Some(threshold) if threshold > 0.0 => {
                self.scale_curve.apply(speed / threshold).clamp(0.0, 1.0) * self.scale
            }
            _ => self.scale,
        }
    }
}
