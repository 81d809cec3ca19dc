//! 单帧关键点计算出的标量指标
//!
//! 角度单位为度。距离和速度使用归一化图像单位，
//! 双手间距以躯干长度（肩中点到髋中点）为单位。

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    ElbowAngle,
    KneeAngle,
    WristFlexion,
    HeadRotation,
    TorsoLean,
    GuideThumbAngle,
    HandSeparation,
    ElbowFlare,
    WristVelocity,
    WristAcceleration,
}

impl MetricKind {
    pub const ALL: [MetricKind; 10] = [
        MetricKind::ElbowAngle,
        MetricKind::KneeAngle,
        MetricKind::WristFlexion,
        MetricKind::HeadRotation,
        MetricKind::TorsoLean,
        MetricKind::GuideThumbAngle,
        MetricKind::HandSeparation,
        MetricKind::ElbowFlare,
        MetricKind::WristVelocity,
        MetricKind::WristAcceleration,
    ];
}

/// 指标读数及其是否通过合理性检查
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub value: f32,
    pub valid: bool,
}

/// 生理上合理的闭区间
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricRange {
    pub min: f32,
    pub max: f32,
}

impl MetricRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f32) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricRanges {
    pub elbow_angle: MetricRange,
    pub knee_angle: MetricRange,
    pub wrist_flexion: MetricRange,
    pub head_rotation: MetricRange,
    pub torso_lean: MetricRange,
    pub guide_thumb_angle: MetricRange,
    pub hand_separation: MetricRange,
    pub elbow_flare: MetricRange,
    pub wrist_velocity: MetricRange,
    pub wrist_acceleration: MetricRange,
}

impl Default for MetricRanges {
    fn default() -> Self {
        Self {
            elbow_angle: MetricRange::new(20.0, 180.0),
            knee_angle: MetricRange::new(40.0, 180.0),
            wrist_flexion: MetricRange::new(20.0, 180.0),
            head_rotation: MetricRange::new(0.0, 90.0),
            torso_lean: MetricRange::new(0.0, 60.0),
            guide_thumb_angle: MetricRange::new(0.0, 150.0),
            hand_separation: MetricRange::new(0.0, 4.0),
            elbow_flare: MetricRange::new(0.0, 90.0),
            wrist_velocity: MetricRange::new(0.0, 0.5),
            wrist_acceleration: MetricRange::new(-0.5, 0.5),
        }
    }
}

impl MetricRanges {
    pub fn range(&self, kind: MetricKind) -> MetricRange {
        match kind {
            MetricKind::ElbowAngle => self.elbow_angle,
            MetricKind::KneeAngle => self.knee_angle,
            MetricKind::WristFlexion => self.wrist_flexion,
            MetricKind::HeadRotation => self.head_rotation,
            MetricKind::TorsoLean => self.torso_lean,
            MetricKind::GuideThumbAngle => self.guide_thumb_angle,
            MetricKind::HandSeparation => self.hand_separation,
            MetricKind::ElbowFlare => self.elbow_flare,
            MetricKind::WristVelocity => self.wrist_velocity,
            MetricKind::WristAcceleration => self.wrist_acceleration,
        }
    }

    /// 标记读数，无论如何帧都会保留它
    pub fn validate(&self, kind: MetricKind, value: f32) -> Metric {
        Metric {
            value,
            valid: self.range(kind).contains(value),
        }
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        for kind in MetricKind::ALL {
            let range = self.range(kind);
            if !(range.min.is_finite() && range.max.is_finite()) || range.min > range.max {
                return Err(format!("metric range for {:?} is empty or not finite", kind));
            }
        }
        Ok(())
    }
}

/// Interior angle at `vertex` between the rays to `a` and `c`.
///
/// Degenerate rays yield NaN so the reading fails range validation.
pub fn joint_angle(a: (f32, f32), vertex: (f32, f32), c: (f32, f32)) -> f32 {
    let v1 = (a.0 - vertex.0, a.1 - vertex.1);
    let v2 = (c.0 - vertex.0, c.1 - vertex.1);

    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if mag1 < 1e-4 || mag2 < 1e-4 {
        return f32::NAN;
    }

    let cos_angle = ((v1.0 * v2.0 + v1.1 * v2.1) / (mag1 * mag2)).clamp(-1.0, 1.0);
    cos_angle.acos().to_degrees()
}

/// 两条无向直线的夹角，折叠到 `[0, 90]`
pub fn line_angle(a1: (f32, f32), a2: (f32, f32), b1: (f32, f32), b2: (f32, f32)) -> f32 {
    let u = (a2.0 - a1.0, a2.1 - a1.1);
    let v = (b2.0 - b1.0, b2.1 - b1.1);
    let angle = (u.1.atan2(u.0) - v.1.atan2(v.0)).to_degrees().abs() % 180.0;
    if angle > 90.0 {
        180.0 - angle
    } else {
        angle
    }
}

/// 线段 `from -> to` 偏离竖直方向的角度，范围 `[0, 90]`
pub fn tilt_from_vertical(from: (f32, f32), to: (f32, f32)) -> f32 {
    let dx = (to.0 - from.0).abs();
    let dy = (to.1 - from.1).abs();
    if dx < 1e-6 && dy < 1e-6 {
        return f32::NAN;
    }
    dx.atan2(dy).to_degrees()
}

pub fn midpoint(a: (f32, f32), b: (f32, f32)) -> (f32, f32) {
    ((a.0 + b.0) / 2.0, (a.1 + b.1) / 2.0)
}
