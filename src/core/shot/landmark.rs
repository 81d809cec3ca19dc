use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 引擎使用的身体关节（估计器骨架的子集）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    Nose,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftThumb,
    RightThumb,
    LeftIndex,
    RightIndex,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
}

impl Joint {
    pub const ALL: [Joint; 19] = [
        Joint::Nose,
        Joint::LeftEar,
        Joint::RightEar,
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftThumb,
        Joint::RightThumb,
        Joint::LeftIndex,
        Joint::RightIndex,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    /// 用于视角判断的左右成对关节
    pub const BILATERAL_PAIRS: [(Joint, Joint); 6] = [
        (Joint::LeftShoulder, Joint::RightShoulder),
        (Joint::LeftElbow, Joint::RightElbow),
        (Joint::LeftWrist, Joint::RightWrist),
        (Joint::LeftHip, Joint::RightHip),
        (Joint::LeftKnee, Joint::RightKnee),
        (Joint::LeftAnkle, Joint::RightAnkle),
    ];

    pub fn from_name(name: &str) -> Option<Joint> {
        let normalized = name.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        Joint::ALL
            .iter()
            .copied()
            .find(|joint| joint.name() == normalized)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Joint::Nose => "nose",
            Joint::LeftEar => "left_ear",
            Joint::RightEar => "right_ear",
            Joint::LeftShoulder => "left_shoulder",
            Joint::RightShoulder => "right_shoulder",
            Joint::LeftElbow => "left_elbow",
            Joint::RightElbow => "right_elbow",
            Joint::LeftWrist => "left_wrist",
            Joint::RightWrist => "right_wrist",
            Joint::LeftThumb => "left_thumb",
            Joint::RightThumb => "right_thumb",
            Joint::LeftIndex => "left_index",
            Joint::RightIndex => "right_index",
            Joint::LeftHip => "left_hip",
            Joint::RightHip => "right_hip",
            Joint::LeftKnee => "left_knee",
            Joint::RightKnee => "right_knee",
            Joint::LeftAnkle => "left_ankle",
            Joint::RightAnkle => "right_ankle",
        }
    }
}

/// 投篮手，另一只手为辅助手
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Handedness {
    #[default]
    Right,
    Left,
}

/// 按投篮手解析的关节角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    ShootingShoulder,
    ShootingElbow,
    ShootingWrist,
    ShootingIndex,
    GuideShoulder,
    GuideElbow,
    GuideWrist,
    GuideThumb,
    GuideIndex,
    ShootingHip,
    ShootingKnee,
    ShootingAnkle,
    GuideHip,
    GuideKnee,
    GuideAnkle,
    Joint(Joint),
}

impl Handedness {
    pub fn resolve(&self, part: BodyPart) -> Joint {
        let right = *self == Handedness::Right;
        let pick = |r: Joint, l: Joint| if right { r } else { l };
        match part {
            BodyPart::ShootingShoulder => pick(Joint::RightShoulder, Joint::LeftShoulder),
            BodyPart::ShootingElbow => pick(Joint::RightElbow, Joint::LeftElbow),
            BodyPart::ShootingWrist => pick(Joint::RightWrist, Joint::LeftWrist),
            BodyPart::ShootingIndex => pick(Joint::RightIndex, Joint::LeftIndex),
            BodyPart::GuideShoulder => pick(Joint::LeftShoulder, Joint::RightShoulder),
            BodyPart::GuideElbow => pick(Joint::LeftElbow, Joint::RightElbow),
            BodyPart::GuideWrist => pick(Joint::LeftWrist, Joint::RightWrist),
            BodyPart::GuideThumb => pick(Joint::LeftThumb, Joint::RightThumb),
            BodyPart::GuideIndex => pick(Joint::LeftIndex, Joint::RightIndex),
            BodyPart::ShootingHip => pick(Joint::RightHip, Joint::LeftHip),
            BodyPart::ShootingKnee => pick(Joint::RightKnee, Joint::LeftKnee),
            BodyPart::ShootingAnkle => pick(Joint::RightAnkle, Joint::LeftAnkle),
            BodyPart::GuideHip => pick(Joint::LeftHip, Joint::RightHip),
            BodyPart::GuideKnee => pick(Joint::LeftKnee, Joint::RightKnee),
            BodyPart::GuideAnkle => pick(Joint::LeftAnkle, Joint::RightAnkle),
            BodyPart::Joint(joint) => joint,
        }
    }
}

/// 归一化图像坐标（y 向下增大）及估计器可见度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    pub visibility: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, visibility: f32) -> Self {
        Self {
            x,
            y,
            z: 0.0,
            visibility,
        }
    }

    pub fn point(&self) -> (f32, f32) {
        (self.x, self.y)
    }

    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

pub type LandmarkMap = BTreeMap<Joint, Landmark>;

/// 关键点提取模块输出的一帧
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    pub frame_number: u64,
    pub timestamp_ms: u64,
    /// `None` 表示该帧未检测到人
    pub landmarks: Option<LandmarkMap>,
}

impl InputFrame {
    pub fn detected(frame_number: u64, timestamp_ms: u64, landmarks: LandmarkMap) -> Self {
        Self {
            frame_number,
            timestamp_ms,
            landmarks: Some(landmarks),
        }
    }

    pub fn missing(frame_number: u64, timestamp_ms: u64) -> Self {
        Self {
            frame_number,
            timestamp_ms,
            landmarks: None,
        }
    }
}

/// 仅在置信度足够时返回关键点
pub fn usable(landmarks: &LandmarkMap, joint: Joint, min_visibility: f32) -> Option<&Landmark> {
    landmarks
        .get(&joint)
        .filter(|lm| lm.visibility >= min_visibility && lm.x.is_finite() && lm.y.is_finite())
}
