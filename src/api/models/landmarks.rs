use crate::core::shot::{AnalysisError, InputFrame, Joint, Landmark, LandmarkMap};
use log::debug;
use serde::{Deserialize, Serialize};

/// 姿态估计器输出的单个命名关键点
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandmarkPayload {
    pub name: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    /// 不提供逐点置信度的估计器会省略该字段
    #[serde(default = "full_visibility")]
    pub visibility: f32,
}

fn full_visibility() -> f32 {
    1.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FramePayload {
    #[serde(alias = "frameNumber")]
    pub frame_number: u64,
    #[serde(alias = "timestampMs")]
    pub timestamp_ms: u64,
    #[serde(default)]
    pub landmarks: Option<Vec<LandmarkPayload>>,
}

impl From<FramePayload> for InputFrame {
    fn from(payload: FramePayload) -> Self {
        let landmarks: LandmarkMap = payload
            .landmarks
            .unwrap_or_default()
            .into_iter()
            .filter_map(|lm| match Joint::from_name(&lm.name) {
                Some(joint) => Some((
                    joint,
                    Landmark {
                        x: lm.x,
                        y: lm.y,
                        z: lm.z,
                        visibility: lm.visibility,
                    },
                )),
                None => {
                    debug!("ignoring landmark {:?}", lm.name);
                    None
                }
            })
            .collect();

        if landmarks.is_empty() {
            InputFrame::missing(payload.frame_number, payload.timestamp_ms)
        } else {
            InputFrame::detected(payload.frame_number, payload.timestamp_ms, landmarks)
        }
    }
}

/// 解析帧数据的 JSON 数组
pub fn parse_frames(json: &str) -> Result<Vec<InputFrame>, AnalysisError> {
    let payloads: Vec<FramePayload> = serde_json::from_str(json)?;
    Ok(payloads.into_iter().map(InputFrame::from).collect())
}
