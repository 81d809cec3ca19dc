//! 根据左右两侧关键点可见度判断拍摄视角

use super::config::CameraConfig;
use super::frame_record::FrameRecord;
use super::landmark::Joint;
use super::phase::EvidenceWindow;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraAngle {
    Front,
    LeftSide,
    RightSide,
    Angled,
}

impl CameraAngle {
    pub const ALL: [CameraAngle; 4] = [
        CameraAngle::Front,
        CameraAngle::LeftSide,
        CameraAngle::RightSide,
        CameraAngle::Angled,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraAnalysis {
    pub angle: CameraAngle,
    /// 每个左右成对关节在检测帧中可用的比例
    pub visibility_ratios: BTreeMap<Joint, f32>,
    /// 左侧平均比例减右侧平均比例
    pub asymmetry: f32,
}

pub struct CameraClassifier<'a> {
    config: &'a CameraConfig,
}

impl<'a> CameraClassifier<'a> {
    pub fn new(config: &'a CameraConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, records: &[FrameRecord]) -> CameraAnalysis {
        let detected: Vec<&FrameRecord> = records.iter().filter(|r| !r.is_placeholder()).collect();

        let ratio = |joint: Joint| -> f32 {
            if detected.is_empty() {
                return 0.0;
            }
            let hits = detected
                .iter()
                .filter(|r| r.is_detected(joint, self.config.min_visibility))
                .count();
            hits as f32 / detected.len() as f32
        };

        let mut visibility_ratios = BTreeMap::new();
        let (mut left_sum, mut right_sum) = (0.0f32, 0.0f32);
        for (left, right) in Joint::BILATERAL_PAIRS {
            let l = ratio(left);
            let r = ratio(right);
            left_sum += l;
            right_sum += r;
            visibility_ratios.insert(left, l);
            visibility_ratios.insert(right, r);
        }

        let pairs = Joint::BILATERAL_PAIRS.len() as f32;
        let left_mean = left_sum / pairs;
        let right_mean = right_sum / pairs;
        let asymmetry = left_mean - right_mean;

        let angle = if asymmetry >= self.config.side_asymmetry {
            CameraAngle::LeftSide
        } else if asymmetry <= -self.config.side_asymmetry {
            CameraAngle::RightSide
        } else if left_mean >= self.config.front_min_ratio && right_mean >= self.config.front_min_ratio
        {
            CameraAngle::Front
        } else {
            CameraAngle::Angled
        };

        debug!(
            "camera: left {:.2}, right {:.2}, asymmetry {:.2} -> {:?}",
            left_mean, right_mean, asymmetry, angle
        );

        CameraAnalysis {
            angle,
            visibility_ratios,
            asymmetry,
        }
    }
}

/// 窗口内（含占位帧）该关节可用的帧比例
pub fn window_detection_ratio(
    records: &[FrameRecord],
    window: &EvidenceWindow,
    joint: Joint,
    min_visibility: f32,
) -> f32 {
    let mut total = 0usize;
    let mut hits = 0usize;
    for record in records.iter().filter(|r| window.contains(r.frame_number)) {
        total += 1;
        if record.is_detected(joint, min_visibility) {
            hits += 1;
        }
    }

    if total == 0 {
        0.0
    } else {
        hits as f32 / total as f32
    }
}
