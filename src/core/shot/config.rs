use super::aggregator::ConfirmationRule;
use super::error::AnalysisError;
use super::flaw::{default_flaws, FlawDefinition, WindowPolicy};
use super::landmark::Handedness;
use super::metrics::MetricRanges;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// 可见度低于该值的关键点视为未检测到
    pub min_visibility: f32,
    pub handedness: Handedness,
    /// 手腕运动学最多回看的帧数
    pub max_lookback: u64,
    pub ranges: MetricRanges,
}

impl FrameConfig {
    pub const MAX_LOOKBACK: u64 = 64;
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            min_visibility: 0.5,
            handedness: Handedness::Right,
            max_lookback: 3,
            ranges: MetricRanges::default(),
        }
    }
}

/// 窗口大小（帧数）：W1、W2、W3 以及 Follow-Through 提前量 O
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseConfig {
    pub load_window: u64,
    pub release_window: u64,
    pub follow_through_window: u64,
    pub follow_through_lead: u64,
    pub min_velocity_samples: usize,
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self {
            load_window: 15,
            release_window: 10,
            follow_through_window: 8,
            follow_through_lead: 4,
            min_velocity_samples: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub min_visibility: f32,
    /// 正面视角要求两侧至少以该比例被看到
    pub front_min_ratio: f32,
    /// 判定为侧面视角的左右平均比例差
    pub side_asymmetry: f32,
    /// 覆盖关键点的窗口检测率超过该值时启用对应问题
    pub override_ratio: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            min_visibility: 0.5,
            front_min_ratio: 0.6,
            side_asymmetry: 0.35,
            override_ratio: 0.2,
        }
    }
}

/// 代表帧质量项的权重
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    pub phase_bonus: f32,
    pub proximity_weight: f32,
    pub condition_bonus: f32,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            phase_bonus: 10.0,
            proximity_weight: 5.0,
            condition_bonus: 5.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub frame: FrameConfig,
    pub phase: PhaseConfig,
    pub camera: CameraConfig,
    pub confirmation: ConfirmationRule,
    pub selection: SelectionConfig,
    pub flaws: Vec<FlawDefinition>,
    pub worker_threads: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            phase: PhaseConfig::default(),
            camera: CameraConfig::default(),
            confirmation: ConfirmationRule::default(),
            selection: SelectionConfig::default(),
            flaws: default_flaws(),
            worker_threads: num_cpus::get().min(4),
        }
    }
}

impl EngineConfig {
    /// 60 fps 片段：所有按帧数计的窗口加倍
    pub fn for_high_frame_rate() -> Self {
        Self::default().with_window_scale(2, 1)
    }

    /// 15 fps 片段：窗口减半
    pub fn for_low_frame_rate() -> Self {
        Self::default().with_window_scale(1, 2)
    }

    fn with_window_scale(mut self, num: u64, den: u64) -> Self {
        let scale = |frames: u64| (frames * num / den).max(1);
        self.phase.load_window = scale(self.phase.load_window);
        self.phase.release_window = scale(self.phase.release_window);
        self.phase.follow_through_window = scale(self.phase.follow_through_window);
        self.phase.follow_through_lead = scale(self.phase.follow_through_lead);
        self.frame.max_lookback = scale(self.frame.max_lookback);
        for flaw in &mut self.flaws {
            if let WindowPolicy::KeyMoment { radius, .. } = &mut flaw.window {
                *radius = scale(*radius);
            }
        }
        self
    }

    /// 解析 JSON5 文档，未给出的字段保持默认值
    pub fn from_json5(text: &str) -> Result<Self, AnalysisError> {
        let config: EngineConfig = json5::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = AnalysisError::InvalidConfig;

        if !(0.0..=1.0).contains(&self.frame.min_visibility)
            || !(0.0..=1.0).contains(&self.camera.min_visibility)
        {
            return Err(invalid("visibility thresholds must lie in [0, 1]".into()));
        }
        if !(0.0..1.0).contains(&self.camera.override_ratio) {
            return Err(invalid("override_ratio must lie in [0, 1)".into()));
        }
        if !(1..=FrameConfig::MAX_LOOKBACK).contains(&self.frame.max_lookback) {
            return Err(invalid(format!(
                "max_lookback must lie in [1, {}] frames",
                FrameConfig::MAX_LOOKBACK
            )));
        }
        if self.confirmation.evidence_divisor == 0 {
            return Err(invalid("evidence_divisor must be positive".into()));
        }
        if self.worker_threads == 0 {
            return Err(invalid("worker_threads must be positive".into()));
        }
        self.frame.ranges.check().map_err(invalid)?;

        let mut seen = std::collections::BTreeSet::new();
        for flaw in &self.flaws {
            flaw.check().map_err(invalid)?;
            if !seen.insert(flaw.id.as_str()) {
                return Err(invalid(format!("duplicate flaw id {}", flaw.id)));
            }
        }
        Ok(())
    }
}
