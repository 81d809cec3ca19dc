//! 代表帧选择
//!
//! `combined = severity(frame) + quality(frame)`；quality 奖励处于首选教学阶段、
//! 接近关键时刻以及满足可见条件的帧。分数相同时取最早帧。

use super::aggregator::FlawEvidence;
use super::config::EngineConfig;
use super::flaw::{FlawDefinition, FrameCondition, KeyMoment};
use super::frame_record::FrameRecord;
use super::metrics::MetricKind;
use super::phase::{EvidenceWindow, Phases};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectedFrame {
    pub frame_number: u64,
    pub severity: f32,
    pub quality: f32,
    pub score: f32,
}

pub struct FrameSelector<'a> {
    records: &'a [FrameRecord],
    phases: &'a Phases,
    config: &'a EngineConfig,
}

impl<'a> FrameSelector<'a> {
    pub fn new(records: &'a [FrameRecord], phases: &'a Phases, config: &'a EngineConfig) -> Self {
        Self {
            records,
            phases,
            config,
        }
    }

    /// 按帧号精确查找，不会用相邻帧代替
    pub fn record(&self, frame_number: u64) -> Option<&'a FrameRecord> {
        self.records
            .binary_search_by_key(&frame_number, |r| r.frame_number)
            .ok()
            .map(|i| &self.records[i])
    }

    pub fn select(&self, def: &FlawDefinition, evidence: &FlawEvidence) -> Option<SelectedFrame> {
        let anchor = self.anchor_frame(def);
        let mut best: Option<SelectedFrame> = None;

        for frame in evidence.evidence_frames() {
            let Some(record) = self.record(frame.frame_number).filter(|r| !r.is_placeholder())
            else {
                continue;
            };
            if !evidence.window.contains(frame.frame_number) {
                continue;
            }

            let quality = self.quality(def, record, &evidence.window, anchor);
            let candidate = SelectedFrame {
                frame_number: frame.frame_number,
                severity: frame.severity,
                quality,
                score: frame.severity + quality,
            };

            // strict comparison keeps the earliest frame on ties
            match best {
                Some(b) if b.score >= candidate.score => {}
                _ => best = Some(candidate),
            }
        }

        if let Some(chosen) = best {
            debug!(
                "{}: frame {} (severity {:.1}, quality {:.1})",
                def.id, chosen.frame_number, chosen.severity, chosen.quality
            );
        }
        best
    }

    /// 问题的关键时刻，或其第一个首选阶段的关键时刻
    fn anchor_frame(&self, def: &FlawDefinition) -> Option<u64> {
        match def.key_moment() {
            Some(KeyMoment::DeepestKneeBend) => self.phases.key_moments.deepest_knee_bend,
            Some(KeyMoment::Release) => self.phases.key_moments.release,
            None => def
                .preferred_phases
                .iter()
                .find_map(|name| self.phases.get(*name))
                .map(|phase| phase.key_frame),
        }
    }

    pub fn quality(
        &self,
        def: &FlawDefinition,
        record: &FrameRecord,
        window: &EvidenceWindow,
        anchor: Option<u64>,
    ) -> f32 {
        let weights = &self.config.selection;
        let frame = record.frame_number;
        let mut quality = 0.0;

        let in_preferred = def
            .preferred_phases
            .iter()
            .filter_map(|name| self.phases.get(*name))
            .any(|phase| phase.window.contains(frame));
        if in_preferred {
            quality += weights.phase_bonus;
        }

        if let Some(key) = anchor {
            let distance = frame.abs_diff(key) as f32;
            let span = window.bounds().map_or(1, |b| b.len()).max(1) as f32;
            quality += weights.proximity_weight * (1.0 - distance / span).max(0.0);
        }

        if !def.frame_conditions.is_empty()
            && def
                .frame_conditions
                .iter()
                .all(|c| self.condition_holds(c, record))
        {
            quality += weights.condition_bonus;
        }

        quality
    }

    fn condition_holds(&self, condition: &FrameCondition, record: &FrameRecord) -> bool {
        match condition {
            FrameCondition::MinHandSeparation { min } => record
                .metric(MetricKind::HandSeparation)
                .is_some_and(|sep| sep >= *min),
            FrameCondition::Visible { parts } => parts.iter().all(|part| {
                let joint = self.config.frame.handedness.resolve(*part);
                record.is_detected(joint, self.config.frame.min_visibility)
            }),
        }
    }
}
