use super::aggregator::{rank, EvidenceAggregator, FlawOutcome};
use super::camera::{CameraAnalysis, CameraClassifier};
use super::config::EngineConfig;
use super::error::AnalysisError;
use super::frame_record::{FrameRecord, FrameRecordBuilder};
use super::landmark::{InputFrame, LandmarkMap};
use super::phase::{PhaseSegmenter, Phases};
use super::report::{AnalysisStats, FlawInstance, ReportEmitter, ShotReport};
use super::sampler::{ForcedSampler, SamplingPolicy};
use super::selector::FrameSelector;
use log::info;
use rayon::prelude::*;
use std::collections::BTreeSet;

/// 对一个完整片段执行全部分析流程
pub struct ShotAnalyzer {
    config: EngineConfig,
    pool: rayon::ThreadPool,
}

impl ShotAnalyzer {
    pub fn new() -> Result<Self, AnalysisError> {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, AnalysisError> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.worker_threads)
            .thread_name(|i| format!("shot-worker-{}", i))
            .build()?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn analyze(&self, frames: Vec<InputFrame>) -> Result<ShotAnalysis, AnalysisError> {
        let config = &self.config;

        let records = FrameRecordBuilder::build_all(&config.frame, frames)?;
        let phases = PhaseSegmenter::new(&config.phase).segment(&records);
        let camera = CameraClassifier::new(&config.camera).classify(&records);

        let aggregator = EvidenceAggregator::new(&records, &phases, &camera, config);
        let outcomes = self.pool.install(|| aggregator.aggregate());
        let ranked = rank(&outcomes, &config.confirmation);

        let selector = FrameSelector::new(&records, &phases, config);
        let selected: Vec<_> = self.pool.install(|| {
            ranked
                .into_par_iter()
                .filter_map(|(evidence, confirmation)| {
                    let def = config.flaws.get(evidence.definition_index)?;
                    let frame = selector.select(def, &evidence)?;
                    Some((evidence, confirmation, frame))
                })
                .collect()
        });

        let stats = AnalysisStats {
            total_frames: records.len(),
            placeholder_frames: records.iter().filter(|r| r.is_placeholder()).count(),
            invalid_metric_readings: records.iter().map(FrameRecord::invalid_metric_count).sum(),
            evaluated_definitions: outcomes
                .iter()
                .filter(|o| {
                    matches!(
                        o,
                        FlawOutcome::Confirmed(_) | FlawOutcome::Borderline(_) | FlawOutcome::Rejected(_)
                    )
                })
                .count(),
            reported_flaws: 0,
        };

        let report = ReportEmitter::new(&config.flaws, &phases, camera.angle).emit(
            &selected,
            &outcomes,
            stats,
        );

        info!(
            "🏀 analyzed {} frames ({} without pose), {:?} view, {} flaws reported",
            report.stats.total_frames,
            report.stats.placeholder_frames,
            report.camera_angle,
            report.flaws.len()
        );

        Ok(ShotAnalysis {
            records,
            phases,
            camera,
            outcomes,
            report,
        })
    }
}

/// 某个问题对应的叠加绘制关键点
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OverlayFrame<'a> {
    pub frame_number: u64,
    pub timestamp_ms: u64,
    pub landmarks: &'a LandmarkMap,
}

/// 单次分析的结果（不可变）
#[derive(Debug, Clone)]
pub struct ShotAnalysis {
    records: Vec<FrameRecord>,
    phases: Phases,
    camera: CameraAnalysis,
    outcomes: Vec<FlawOutcome>,
    report: ShotReport,
}

impl ShotAnalysis {
    pub fn report(&self) -> &ShotReport {
        &self.report
    }

    pub fn into_report(self) -> ShotReport {
        self.report
    }

    pub fn records(&self) -> &[FrameRecord] {
        &self.records
    }

    pub fn phases(&self) -> &Phases {
        &self.phases
    }

    pub fn camera(&self) -> &CameraAnalysis {
        &self.camera
    }

    pub fn outcomes(&self) -> &[FlawOutcome] {
        &self.outcomes
    }

    /// 按帧号精确查找收到的关键点，不会返回相邻帧
    pub fn landmarks_for(&self, frame_number: u64) -> Option<&LandmarkMap> {
        self.records
            .binary_search_by_key(&frame_number, |r| r.frame_number)
            .ok()
            .and_then(|i| self.records[i].landmarks.as_ref())
    }

    pub fn overlay_for(&self, instance: &FlawInstance) -> Option<OverlayFrame<'_>> {
        let index = self
            .records
            .binary_search_by_key(&instance.representative_frame_number, |r| r.frame_number)
            .ok()?;
        let record = &self.records[index];
        record.landmarks.as_ref().map(|landmarks| OverlayFrame {
            frame_number: record.frame_number,
            timestamp_ms: record.timestamp_ms,
            landmarks,
        })
    }

    /// 已报告问题的证据窗口内收到的所有帧，以及所有代表帧
    pub fn forced_frames(&self) -> BTreeSet<u64> {
        let mut forced = BTreeSet::new();
        for flaw in &self.report.flaws {
            forced.insert(flaw.representative_frame_number);
            forced.extend(
                self.records
                    .iter()
                    .map(|r| r.frame_number)
                    .filter(|f| flaw.evidence_window.contains(*f)),
            );
        }
        forced
    }

    /// 在 `policy` 下渲染阶段应处理的帧（包含强制帧）
    pub fn render_plan<P: SamplingPolicy>(&self, policy: P) -> Vec<u64> {
        ForcedSampler::new(policy, self.forced_frames()).plan(&self.records)
    }
}
