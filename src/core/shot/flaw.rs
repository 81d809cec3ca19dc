//! 声明式问题定义
//!
//! 每个问题都是表中一项，由通用聚合器评估，新增问题只需改数据。
//! 默认表是共享的不可变状态，调用方可克隆到 `EngineConfig` 中修改或替换。

use super::camera::CameraAngle;
use super::landmark::{BodyPart, Handedness, Joint};
use super::metrics::MetricKind;
use super::phase::PhaseName;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// 问题窗口可以居中的关键时刻
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyMoment {
    DeepestKneeBend,
    Release,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WindowPolicy {
    /// 指定的若干阶段（各自独立，不含间隙）
    Phases { phases: Vec<PhaseName> },
    /// 关键时刻前后 `± radius` 帧
    KeyMoment { moment: KeyMoment, radius: u64 },
}

/// 死区内的读数严重度为 0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeadZone {
    Above { limit: f32 },
    Below { limit: f32 },
    Outside { low: f32, high: f32 },
}

impl DeadZone {
    /// 读数超出可接受区间的幅度
    pub fn excess(&self, value: f32) -> f32 {
        match *self {
            DeadZone::Above { limit } => (value - limit).max(0.0),
            DeadZone::Below { limit } => (limit - value).max(0.0),
            DeadZone::Outside { low, high } => (low - value).max(value - high).max(0.0),
        }
    }
}

/// 偏差超过 `beyond` 的部分额外放大
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityBoost {
    pub beyond: f32,
    pub scale: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityFormula {
    pub scale: f32,
    #[serde(default)]
    pub boost: Option<SeverityBoost>,
    pub max: f32,
}

impl SeverityFormula {
    pub const CEILING: f32 = 100.0;

    pub fn linear(scale: f32, max: f32) -> Self {
        Self {
            scale,
            boost: None,
            max,
        }
    }

    pub fn boosted(scale: f32, beyond: f32, boost_scale: f32, max: f32) -> Self {
        Self {
            scale,
            boost: Some(SeverityBoost {
                beyond,
                scale: boost_scale,
            }),
            max,
        }
    }

    pub fn apply(&self, excess: f32) -> f32 {
        if !excess.is_finite() || excess <= 0.0 {
            return 0.0;
        }
        let mut severity = excess * self.scale;
        if let Some(boost) = self.boost {
            if excess > boost.beyond {
                severity += (excess - boost.beyond) * boost.scale;
            }
        }
        severity.clamp(0.0, self.max.min(Self::CEILING))
    }
}

/// 让某帧更适合作为教学示例的逐帧条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameCondition {
    /// 双手分开足够远，能看清辅助手拇指
    MinHandSeparation { min: f32 },
    Visible { parts: Vec<BodyPart> },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlawDefinition {
    pub id: String,
    pub metric: MetricKind,
    pub window: WindowPolicy,
    pub dead_zone: DeadZone,
    pub severity: SeverityFormula,
    #[serde(default = "all_angles")]
    pub camera_angles: Vec<CameraAngle>,
    /// 在任意视角下，检测率足够即可启用该问题的关键点
    #[serde(default)]
    pub override_parts: Vec<BodyPart>,
    #[serde(default)]
    pub preferred_phases: Vec<PhaseName>,
    #[serde(default)]
    pub frame_conditions: Vec<FrameCondition>,
}

fn all_angles() -> Vec<CameraAngle> {
    CameraAngle::ALL.to_vec()
}

impl FlawDefinition {
    pub fn frame_severity(&self, value: f32) -> f32 {
        self.severity.apply(self.dead_zone.excess(value))
    }

    pub fn applies_to(&self, angle: CameraAngle) -> bool {
        self.camera_angles.contains(&angle)
    }

    /// 选帧时接近度项使用的关键时刻
    pub fn key_moment(&self) -> Option<KeyMoment> {
        match &self.window {
            WindowPolicy::KeyMoment { moment, .. } => Some(*moment),
            WindowPolicy::Phases { .. } => None,
        }
    }

    pub fn max_severity(&self) -> f32 {
        self.severity.max.min(SeverityFormula::CEILING)
    }

    pub(crate) fn check(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("flaw id must not be empty".to_string());
        }
        if let WindowPolicy::Phases { phases } = &self.window {
            if phases.is_empty() {
                return Err(format!("flaw {} has an empty phase window", self.id));
            }
        }
        if !(self.severity.scale.is_finite() && self.severity.scale > 0.0) {
            return Err(format!("flaw {} needs a positive severity scale", self.id));
        }
        if !(self.severity.max.is_finite() && self.severity.max > 0.0) {
            return Err(format!("flaw {} needs a positive severity maximum", self.id));
        }
        if let DeadZone::Outside { low, high } = self.dead_zone {
            if low > high {
                return Err(format!("flaw {} has an inverted dead zone", self.id));
            }
        }
        Ok(())
    }

    /// 按投篮手解析出的具体覆盖关节
    pub(crate) fn override_joints(&self, handedness: Handedness) -> Vec<Joint> {
        self.override_parts
            .iter()
            .map(|part| handedness.resolve(*part))
            .collect()
    }
}

pub static DEFAULT_FLAWS: Lazy<Vec<FlawDefinition>> = Lazy::new(|| {
    use CameraAngle::*;
    use PhaseName::*;

    vec![
        FlawDefinition {
            id: "shallow_knee_bend".to_string(),
            metric: MetricKind::KneeAngle,
            window: WindowPolicy::KeyMoment {
                moment: KeyMoment::DeepestKneeBend,
                radius: 3,
            },
            dead_zone: DeadZone::Above { limit: 125.0 },
            severity: SeverityFormula::boosted(1.5, 25.0, 1.0, 100.0),
            camera_angles: all_angles(),
            override_parts: vec![],
            preferred_phases: vec![LoadDip],
            frame_conditions: vec![],
        },
        FlawDefinition {
            id: "excessive_knee_bend".to_string(),
            metric: MetricKind::KneeAngle,
            window: WindowPolicy::KeyMoment {
                moment: KeyMoment::DeepestKneeBend,
                radius: 3,
            },
            dead_zone: DeadZone::Below { limit: 70.0 },
            severity: SeverityFormula::linear(1.5, 80.0),
            camera_angles: all_angles(),
            override_parts: vec![],
            preferred_phases: vec![LoadDip],
            frame_conditions: vec![],
        },
        FlawDefinition {
            id: "elbow_flare".to_string(),
            metric: MetricKind::ElbowFlare,
            window: WindowPolicy::Phases {
                phases: vec![LoadDip, Release],
            },
            dead_zone: DeadZone::Above { limit: 12.0 },
            severity: SeverityFormula::boosted(2.0, 20.0, 1.5, 100.0),
            camera_angles: vec![Front, Angled],
            override_parts: vec![],
            preferred_phases: vec![LoadDip],
            frame_conditions: vec![FrameCondition::Visible {
                parts: vec![BodyPart::ShootingElbow, BodyPart::ShootingWrist],
            }],
        },
        FlawDefinition {
            id: "guide_hand_thumb_flick".to_string(),
            metric: MetricKind::GuideThumbAngle,
            window: WindowPolicy::Phases {
                phases: vec![FollowThrough],
            },
            dead_zone: DeadZone::Above { limit: 50.0 },
            severity: SeverityFormula::linear(1.5, 90.0),
            camera_angles: vec![Front, Angled],
            override_parts: vec![BodyPart::GuideThumb, BodyPart::GuideWrist],
            preferred_phases: vec![Release],
            frame_conditions: vec![
                FrameCondition::MinHandSeparation { min: 0.3 },
                FrameCondition::Visible {
                    parts: vec![BodyPart::GuideThumb],
                },
            ],
        },
        FlawDefinition {
            id: "guide_hand_drift".to_string(),
            metric: MetricKind::HandSeparation,
            window: WindowPolicy::Phases {
                phases: vec![LoadDip, Release],
            },
            dead_zone: DeadZone::Above { limit: 1.0 },
            severity: SeverityFormula::linear(60.0, 80.0),
            camera_angles: vec![Front, Angled],
            override_parts: vec![BodyPart::GuideWrist],
            preferred_phases: vec![LoadDip],
            frame_conditions: vec![],
        },
        FlawDefinition {
            id: "limited_wrist_snap".to_string(),
            metric: MetricKind::WristFlexion,
            window: WindowPolicy::Phases {
                phases: vec![FollowThrough],
            },
            dead_zone: DeadZone::Above { limit: 155.0 },
            severity: SeverityFormula::linear(2.0, 90.0),
            camera_angles: all_angles(),
            override_parts: vec![],
            preferred_phases: vec![FollowThrough],
            frame_conditions: vec![FrameCondition::Visible {
                parts: vec![BodyPart::ShootingIndex],
            }],
        },
        FlawDefinition {
            id: "head_turn".to_string(),
            metric: MetricKind::HeadRotation,
            window: WindowPolicy::Phases {
                phases: vec![Release],
            },
            dead_zone: DeadZone::Above { limit: 20.0 },
            severity: SeverityFormula::linear(2.0, 70.0),
            camera_angles: vec![Front, Angled],
            override_parts: vec![],
            preferred_phases: vec![Release],
            frame_conditions: vec![],
        },
        FlawDefinition {
            id: "torso_lean".to_string(),
            metric: MetricKind::TorsoLean,
            window: WindowPolicy::Phases {
                phases: vec![LoadDip, Release],
            },
            dead_zone: DeadZone::Above { limit: 15.0 },
            severity: SeverityFormula::boosted(2.5, 15.0, 1.5, 100.0),
            camera_angles: vec![LeftSide, RightSide, Angled],
            override_parts: vec![],
            preferred_phases: vec![Release],
            frame_conditions: vec![],
        },
        FlawDefinition {
            id: "bent_release_arm".to_string(),
            metric: MetricKind::ElbowAngle,
            window: WindowPolicy::KeyMoment {
                moment: KeyMoment::Release,
                radius: 2,
            },
            dead_zone: DeadZone::Below { limit: 150.0 },
            severity: SeverityFormula::linear(1.5, 90.0),
            camera_angles: all_angles(),
            override_parts: vec![],
            preferred_phases: vec![Release],
            frame_conditions: vec![],
        },
    ]
});

pub fn default_flaws() -> Vec<FlawDefinition> {
    DEFAULT_FLAWS.clone()
}
