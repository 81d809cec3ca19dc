use super::config::FrameConfig;
use super::error::AnalysisError;
use super::landmark::{usable, BodyPart, InputFrame, Joint, Landmark, LandmarkMap};
use super::metrics::{
    joint_angle, line_angle, midpoint, tilt_from_vertical, Metric, MetricKind, MetricRanges,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// 单帧姿态状态，构建后不可变
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub frame_number: u64,
    pub timestamp_ms: u64,
    /// 该帧号收到的原始关键点
    pub landmarks: Option<LandmarkMap>,
    metrics: BTreeMap<MetricKind, Metric>,
}

impl FrameRecord {
    pub fn placeholder(frame_number: u64, timestamp_ms: u64) -> Self {
        Self {
            frame_number,
            timestamp_ms,
            landmarks: None,
            metrics: BTreeMap::new(),
        }
    }

    /// 用已计算好的指标构建记录，并做范围校验
    pub fn from_raw_metrics<I>(
        frame_number: u64,
        timestamp_ms: u64,
        landmarks: Option<LandmarkMap>,
        raw: I,
        ranges: &MetricRanges,
    ) -> Self
    where
        I: IntoIterator<Item = (MetricKind, f32)>,
    {
        let metrics = raw
            .into_iter()
            .map(|(kind, value)| (kind, ranges.validate(kind, value)))
            .collect();
        Self {
            frame_number,
            timestamp_ms,
            landmarks,
            metrics,
        }
    }

    /// 未检测到人的帧保留在序列中，但没有指标
    pub fn is_placeholder(&self) -> bool {
        self.landmarks.as_ref().map_or(true, |lm| lm.is_empty())
    }

    /// 只返回有效读数，超出范围的值视为缺失
    pub fn metric(&self, kind: MetricKind) -> Option<f32> {
        self.metrics
            .get(&kind)
            .filter(|m| m.valid)
            .map(|m| m.value)
    }

    pub fn raw_metric(&self, kind: MetricKind) -> Option<Metric> {
        self.metrics.get(&kind).copied()
    }

    pub fn metrics(&self) -> impl Iterator<Item = (MetricKind, Metric)> + '_ {
        self.metrics.iter().map(|(k, m)| (*k, *m))
    }

    pub fn invalid_metric_count(&self) -> usize {
        self.metrics.values().filter(|m| !m.valid).count()
    }

    pub fn landmark(&self, joint: Joint, min_visibility: f32) -> Option<&Landmark> {
        self.landmarks
            .as_ref()
            .and_then(|lm| usable(lm, joint, min_visibility))
    }

    pub fn is_detected(&self, joint: Joint, min_visibility: f32) -> bool {
        self.landmark(joint, min_visibility).is_some()
    }
}

#[derive(Debug, Clone, Copy)]
struct WristSample {
    frame_number: u64,
    position: (f32, f32),
    velocity: Option<f32>,
}

/// 顺序构建器，手腕运动学最多回看有限帧数
pub struct FrameRecordBuilder {
    config: FrameConfig,
    history: VecDeque<WristSample>,
    last_frame_number: Option<u64>,
}

impl FrameRecordBuilder {
    pub fn new(config: FrameConfig) -> Self {
        Self {
            history: VecDeque::new(),
            config,
            last_frame_number: None,
        }
    }

    /// 校验帧顺序并转换整个片段
    pub fn build_all(
        config: &FrameConfig,
        frames: Vec<InputFrame>,
    ) -> Result<Vec<FrameRecord>, AnalysisError> {
        if frames.is_empty() {
            return Err(AnalysisError::EmptyInput);
        }

        let mut builder = Self::new(config.clone());
        frames.into_iter().map(|frame| builder.push(frame)).collect()
    }

    pub fn push(&mut self, frame: InputFrame) -> Result<FrameRecord, AnalysisError> {
        if let Some(previous) = self.last_frame_number {
            if frame.frame_number <= previous {
                return Err(AnalysisError::NonIncreasingFrames {
                    previous,
                    current: frame.frame_number,
                });
            }
        }
        self.last_frame_number = Some(frame.frame_number);

        let landmarks = match frame.landmarks {
            Some(lm) if !lm.is_empty() => lm,
            _ => return Ok(FrameRecord::placeholder(frame.frame_number, frame.timestamp_ms)),
        };

        let mut raw = self.pose_metrics(&landmarks);
        raw.extend(self.wrist_kinematics(frame.frame_number, &landmarks));

        Ok(FrameRecord::from_raw_metrics(
            frame.frame_number,
            frame.timestamp_ms,
            Some(landmarks),
            raw,
            &self.config.ranges,
        ))
    }

    fn point(&self, landmarks: &LandmarkMap, part: BodyPart) -> Option<(f32, f32)> {
        let joint = self.config.handedness.resolve(part);
        usable(landmarks, joint, self.config.min_visibility).map(Landmark::point)
    }

    fn pose_metrics(&self, lm: &LandmarkMap) -> Vec<(MetricKind, f32)> {
        let p = |part| self.point(lm, part);
        let j = |joint| p(BodyPart::Joint(joint));
        let mut raw = Vec::with_capacity(MetricKind::ALL.len());

        let shoulder = p(BodyPart::ShootingShoulder);
        let elbow = p(BodyPart::ShootingElbow);
        let wrist = p(BodyPart::ShootingWrist);

        if let (Some(s), Some(e), Some(w)) = (shoulder, elbow, wrist) {
            raw.push((MetricKind::ElbowAngle, joint_angle(s, e, w)));
        }

        if let (Some(e), Some(w)) = (elbow, wrist) {
            // flare is only meaningful once the hand is raised above the elbow
            if w.1 < e.1 {
                raw.push((MetricKind::ElbowFlare, tilt_from_vertical(e, w)));
            }
            if let Some(i) = p(BodyPart::ShootingIndex) {
                raw.push((MetricKind::WristFlexion, joint_angle(e, w, i)));
            }
        }

        let shooting_leg = (
            p(BodyPart::ShootingHip),
            p(BodyPart::ShootingKnee),
            p(BodyPart::ShootingAnkle),
        );
        let guide_leg = (
            p(BodyPart::GuideHip),
            p(BodyPart::GuideKnee),
            p(BodyPart::GuideAnkle),
        );
        match (shooting_leg, guide_leg) {
            ((Some(h), Some(k), Some(a)), _) | (_, (Some(h), Some(k), Some(a))) => {
                raw.push((MetricKind::KneeAngle, joint_angle(h, k, a)));
            }
            _ => {}
        }

        let shoulders = (j(Joint::LeftShoulder), j(Joint::RightShoulder));
        let hips = (j(Joint::LeftHip), j(Joint::RightHip));

        if let ((Some(ls), Some(rs)), (Some(le), Some(re))) =
            (shoulders, (j(Joint::LeftEar), j(Joint::RightEar)))
        {
            raw.push((MetricKind::HeadRotation, line_angle(le, re, ls, rs)));
        }

        let torso = match (shoulders, hips) {
            ((Some(ls), Some(rs)), (Some(lh), Some(rh))) => {
                Some((midpoint(lh, rh), midpoint(ls, rs)))
            }
            _ => None,
        };

        if let Some((hip_mid, shoulder_mid)) = torso {
            raw.push((MetricKind::TorsoLean, tilt_from_vertical(hip_mid, shoulder_mid)));
        }

        if let (Some(t), Some(w), Some(i)) = (
            p(BodyPart::GuideThumb),
            p(BodyPart::GuideWrist),
            p(BodyPart::GuideIndex),
        ) {
            raw.push((MetricKind::GuideThumbAngle, joint_angle(t, w, i)));
        }

        if let (Some((hip_mid, shoulder_mid)), Some(w), Some(g)) =
            (torso, wrist, p(BodyPart::GuideWrist))
        {
            let torso_len = distance(hip_mid, shoulder_mid);
            let separation = if torso_len > 1e-3 {
                distance(w, g) / torso_len
            } else {
                f32::NAN
            };
            raw.push((MetricKind::HandSeparation, separation));
        }

        raw
    }

    /// Finite differences against the nearest preceding frame with a usable wrist
    fn wrist_kinematics(&mut self, frame_number: u64, lm: &LandmarkMap) -> Vec<(MetricKind, f32)> {
        let horizon = frame_number.saturating_sub(self.config.max_lookback);
        while self
            .history
            .front()
            .is_some_and(|s| s.frame_number < horizon)
        {
            self.history.pop_front();
        }

        let Some(position) = self.point(lm, BodyPart::ShootingWrist) else {
            return Vec::new();
        };

        let mut raw = Vec::with_capacity(2);
        let mut velocity = None;

        if let Some(prev) = self.history.back().copied() {
            let gap = (frame_number - prev.frame_number) as f32;
            let v = distance(position, prev.position) / gap;
            raw.push((MetricKind::WristVelocity, v));

            let ranges = &self.config.ranges;
            if ranges.range(MetricKind::WristVelocity).contains(v) {
                velocity = Some(v);
                if let Some(prev_v) = prev.velocity {
                    raw.push((MetricKind::WristAcceleration, (v - prev_v) / gap));
                }
            }
        }

        self.history.push_back(WristSample {
            frame_number,
            position,
            velocity,
        });

        raw
    }
}

fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}
