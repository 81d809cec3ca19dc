//! 投篮姿态分析引擎
//!
//! 把片段的逐帧姿态关键点转换为排序后的投篮问题列表，
//! 每个问题都对应叠加绘制所用的确切帧。

pub mod aggregator;
pub mod camera;
pub mod config;
pub mod error;
pub mod flaw;
pub mod frame_record;
pub mod landmark;
pub mod metrics;
pub mod phase;
pub mod pipeline;
pub mod report;
pub mod sampler;
pub mod selector;

pub use aggregator::{Confirmation, ConfirmationRule, FlawOutcome, InsufficientReason};
pub use camera::{CameraAngle, CameraAnalysis};
pub use config::EngineConfig;
pub use error::AnalysisError;
pub use flaw::{default_flaws, FlawDefinition};
pub use frame_record::FrameRecord;
pub use landmark::{Handedness, InputFrame, Joint, Landmark, LandmarkMap};
pub use metrics::MetricKind;
pub use phase::{EvidenceWindow, FrameWindow, Phase, PhaseName, Phases};
pub use pipeline::{OverlayFrame, ShotAnalysis, ShotAnalyzer};
pub use report::{AnalysisStats, FlawInstance, ShotReport};
pub use sampler::{AdaptiveSampler, ForcedSampler, SamplingPolicy, StrideSampler};
