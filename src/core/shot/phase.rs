//! 投篮阶段划分（基于运动学关键时刻）
//!
//! Load/Dip 在膝盖最深弯曲处结束，Release 从随后的手腕速度峰值开始，
//! Follow-Through 横跨出手瞬间，这样手仍靠近球时就能采集压腕证据。

use super::config::PhaseConfig;
use super::frame_record::FrameRecord;
use super::metrics::MetricKind;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseName {
    LoadDip,
    Release,
    FollowThrough,
}

impl PhaseName {
    pub const ALL: [PhaseName; 3] = [PhaseName::LoadDip, PhaseName::Release, PhaseName::FollowThrough];
}

/// 绝对帧号闭区间
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameWindow {
    pub start: u64,
    pub end: u64,
}

impl FrameWindow {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// 以 `center` 为中心的对称窗口，裁剪到 `[0, last_frame]`
    pub fn around(center: u64, radius: u64, last_frame: u64) -> Self {
        Self::new(center.saturating_sub(radius), center.saturating_add(radius))
            .clipped(last_frame)
    }

    pub fn clipped(self, last_frame: u64) -> Self {
        Self {
            start: self.start.min(last_frame),
            end: self.end.min(last_frame),
        }
    }

    pub fn contains(&self, frame_number: u64) -> bool {
        frame_number >= self.start && frame_number <= self.end
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> u64 {
        self.end - self.start + 1
    }

}

/// 问题判定所用的帧：一个或多个阶段窗口，不包含窗口之间的间隙
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceWindow {
    spans: Vec<FrameWindow>,
}

impl EvidenceWindow {
    /// 排序并合并重叠或相邻的区间
    pub fn from_spans(spans: impl IntoIterator<Item = FrameWindow>) -> Self {
        let mut sorted: Vec<FrameWindow> = spans.into_iter().collect();
        sorted.sort_by_key(|w| (w.start, w.end));

        let mut merged: Vec<FrameWindow> = Vec::with_capacity(sorted.len());
        for span in sorted {
            match merged.last_mut() {
                Some(last) if span.start <= last.end.saturating_add(1) => {
                    last.end = last.end.max(span.end);
                }
                _ => merged.push(span),
            }
        }
        Self { spans: merged }
    }

    pub fn spans(&self) -> &[FrameWindow] {
        &self.spans
    }

    pub fn contains(&self, frame_number: u64) -> bool {
        self.spans.iter().any(|w| w.contains(frame_number))
    }

    /// 覆盖的首帧到末帧
    pub fn bounds(&self) -> Option<FrameWindow> {
        match (self.spans.first(), self.spans.last()) {
            (Some(first), Some(last)) => Some(FrameWindow::new(first.start, last.end)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }
}

impl From<FrameWindow> for EvidenceWindow {
    fn from(window: FrameWindow) -> Self {
        Self {
            spans: vec![window],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub name: PhaseName,
    pub window: FrameWindow,
    pub key_frame: u64,
}

/// 运动学极值出现的帧
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct KeyMoments {
    pub deepest_knee_bend: Option<u64>,
    pub release: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Phases {
    pub load_dip: Option<Phase>,
    pub release: Option<Phase>,
    pub follow_through: Option<Phase>,
    pub key_moments: KeyMoments,
}

impl Phases {
    pub fn get(&self, name: PhaseName) -> Option<&Phase> {
        match name {
            PhaseName::LoadDip => self.load_dip.as_ref(),
            PhaseName::Release => self.release.as_ref(),
            PhaseName::FollowThrough => self.follow_through.as_ref(),
        }
    }

    /// 已定义的阶段，按起始帧排序
    pub fn ordered(&self) -> Vec<&Phase> {
        let mut phases: Vec<&Phase> = PhaseName::ALL
            .iter()
            .filter_map(|name| self.get(*name))
            .collect();
        phases.sort_by_key(|p| p.window.start);
        phases
    }

    /// 覆盖该帧的阶段（Release 与 Follow-Through 会重叠）
    pub fn containing(&self, frame_number: u64) -> impl Iterator<Item = &Phase> + '_ {
        PhaseName::ALL
            .into_iter()
            .filter_map(move |name| self.get(name))
            .filter(move |p| p.window.contains(frame_number))
    }
}

pub struct PhaseSegmenter<'a> {
    config: &'a PhaseConfig,
}

impl<'a> PhaseSegmenter<'a> {
    pub fn new(config: &'a PhaseConfig) -> Self {
        Self { config }
    }

    pub fn segment(&self, records: &[FrameRecord]) -> Phases {
        let Some(last_frame) = records.last().map(|r| r.frame_number) else {
            return Phases::default();
        };

        let knee_key = Self::deepest_knee_bend(records);
        let release_key = self.release_moment(records, knee_key);

        let load_dip = knee_key.map(|key| Phase {
            name: PhaseName::LoadDip,
            window: FrameWindow::new(key.saturating_sub(self.config.load_window), key)
                .clipped(last_frame),
            key_frame: key,
        });

        let release = release_key.map(|key| Phase {
            name: PhaseName::Release,
            window: FrameWindow::new(key, key.saturating_add(self.config.release_window))
                .clipped(last_frame),
            key_frame: key,
        });

        let follow_through = release_key.map(|key| Phase {
            name: PhaseName::FollowThrough,
            window: FrameWindow::new(
                key.saturating_sub(self.config.follow_through_lead),
                key.saturating_add(self.config.follow_through_window),
            )
            .clipped(last_frame),
            key_frame: key,
        });

        if knee_key.is_none() {
            warn!("no valid knee angle in clip, Load/Dip undefined");
        }
        if release_key.is_none() {
            warn!("no wrist velocity peak found, Release and Follow-Through undefined");
        }
        debug!(
            "phases: knee key {:?}, release key {:?}",
            knee_key, release_key
        );

        Phases {
            load_dip,
            release,
            follow_through,
            key_moments: KeyMoments {
                deepest_knee_bend: knee_key,
                release: release_key,
            },
        }
    }

    /// 最小的有效膝角，相同时取最早帧
    fn deepest_knee_bend(records: &[FrameRecord]) -> Option<u64> {
        records
            .iter()
            .filter_map(|r| r.metric(MetricKind::KneeAngle).map(|v| (r.frame_number, v)))
            .fold(None, |best: Option<(u64, f32)>, (frame, angle)| match best {
                Some((_, best_angle)) if best_angle <= angle => best,
                _ => Some((frame, angle)),
            })
            .map(|(frame, _)| frame)
    }

    /// Wrist velocity peak after the knee key (whole clip when there is none)
    fn release_moment(&self, records: &[FrameRecord], after: Option<u64>) -> Option<u64> {
        let samples: Vec<(u64, f32)> = records
            .iter()
            .filter(|r| after.map_or(true, |knee| r.frame_number > knee))
            .filter_map(|r| r.metric(MetricKind::WristVelocity).map(|v| (r.frame_number, v)))
            .collect();

        if samples.len() < self.config.min_velocity_samples {
            return None;
        }

        samples
            .into_iter()
            .fold(None, |best: Option<(u64, f32)>, (frame, v)| match best {
                Some((_, best_v)) if best_v >= v => best,
                _ => Some((frame, v)),
            })
            .filter(|(_, v)| *v > 0.0)
            .map(|(frame, _)| frame)
    }
}
