//! 渲染阶段的抽帧策略
//!
//! 外部流水线可能只渲染部分帧。无论采用哪种策略，`ForcedSampler`
//! 都保证证据窗口内的帧和代表帧一定会被处理。

use super::frame_record::FrameRecord;
use super::metrics::MetricKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub trait SamplingPolicy {
    fn should_process(&mut self, record: &FrameRecord) -> bool;

    fn reset(&mut self) {}
}

/// 每隔 `stride` 帧取一帧（按绝对帧号）
pub struct StrideSampler {
    stride: u64,
}

impl StrideSampler {
    pub fn new(stride: u64) -> Self {
        Self {
            stride: stride.max(1),
        }
    }
}

impl SamplingPolicy for StrideSampler {
    fn should_process(&mut self, record: &FrameRecord) -> bool {
        record.frame_number % self.stride == 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SamplingState {
    Scanning { skip_count: u32 },
    Tracking { remaining_frames: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplerAction {
    Process,
    SkipFrames(u32),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    pub initial_skip: u32,
    pub max_skip: u32,
    /// 视为运动的手腕速度（归一化单位/帧）
    pub motion_threshold: f32,
    /// 运动停止后仍保持全帧率的帧数
    pub hold_frames: u32,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            initial_skip: 2,
            max_skip: 8,
            motion_threshold: 0.01,
            hold_frames: 10,
        }
    }
}

impl SamplingState {
    pub fn transition(&self, moving: bool, config: &SamplerConfig) -> (SamplingState, SamplerAction) {
        match self {
            SamplingState::Scanning { skip_count } => {
                if moving {
                    (
                        SamplingState::Tracking {
                            remaining_frames: config.hold_frames,
                        },
                        SamplerAction::Process,
                    )
                } else {
                    let new_skip = (*skip_count + 1).min(config.max_skip);
                    (
                        SamplingState::Scanning {
                            skip_count: new_skip,
                        },
                        SamplerAction::SkipFrames(*skip_count),
                    )
                }
            }

            SamplingState::Tracking { remaining_frames } => {
                if moving {
                    (
                        SamplingState::Tracking {
                            remaining_frames: config.hold_frames,
                        },
                        SamplerAction::Process,
                    )
                } else {
                    let new_remaining = remaining_frames.saturating_sub(1);
                    if new_remaining == 0 {
                        (
                            SamplingState::Scanning {
                                skip_count: config.initial_skip,
                            },
                            SamplerAction::Process,
                        )
                    } else {
                        (
                            SamplingState::Tracking {
                                remaining_frames: new_remaining,
                            },
                            SamplerAction::Process,
                        )
                    }
                }
            }
        }
    }
}

/// 静止时逐步加大跳帧，运动时全帧率
pub struct AdaptiveSampler {
    state: SamplingState,
    config: SamplerConfig,
    pending_skip: u32,
}

impl AdaptiveSampler {
    pub fn new() -> Self {
        Self::with_config(SamplerConfig::default())
    }

    pub fn with_config(config: SamplerConfig) -> Self {
        Self {
            state: SamplingState::Scanning {
                skip_count: config.initial_skip,
            },
            config,
            pending_skip: 0,
        }
    }

    pub fn current_state(&self) -> &SamplingState {
        &self.state
    }
}

impl Default for AdaptiveSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplingPolicy for AdaptiveSampler {
    fn should_process(&mut self, record: &FrameRecord) -> bool {
        if self.pending_skip > 0 {
            self.pending_skip -= 1;
            return false;
        }

        let moving = record
            .metric(MetricKind::WristVelocity)
            .is_some_and(|v| v >= self.config.motion_threshold);
        let (new_state, action) = self.state.transition(moving, &self.config);
        self.state = new_state;

        if let SamplerAction::SkipFrames(n) = action {
            self.pending_skip = n;
        }
        true
    }

    fn reset(&mut self) {
        self.state = SamplingState::Scanning {
            skip_count: self.config.initial_skip,
        };
        self.pending_skip = 0;
    }
}

/// 包装任意策略，强制帧始终会被处理
pub struct ForcedSampler<P: SamplingPolicy> {
    inner: P,
    forced: BTreeSet<u64>,
}

impl<P: SamplingPolicy> ForcedSampler<P> {
    pub fn new(inner: P, forced: BTreeSet<u64>) -> Self {
        Self { inner, forced }
    }

    /// 渲染阶段需要处理的帧号（有序）
    pub fn plan(&mut self, records: &[FrameRecord]) -> Vec<u64> {
        records
            .iter()
            .filter(|r| self.should_process(r))
            .map(|r| r.frame_number)
            .collect()
    }
}

impl<P: SamplingPolicy> SamplingPolicy for ForcedSampler<P> {
    fn should_process(&mut self, record: &FrameRecord) -> bool {
        // the inner policy always sees the frame so its state stays consistent
        let sampled = self.inner.should_process(record);
        sampled || self.forced.contains(&record.frame_number)
    }

    fn reset(&mut self) {
        self.inner.reset();
    }
}
