//! 问题证据统计聚合
//!
//! 只有窗口内足够多的帧出现偏差（至少 `ceil(n / evidence_divisor)` 帧严重度为正），
//! 且所有评估帧（包括 0）的平均严重度达到报告下限时，问题才被确认。
//! 报告的严重度就是该平均值，而不是单帧最大值。

use super::camera::{window_detection_ratio, CameraAnalysis};
use super::config::EngineConfig;
use super::flaw::{FlawDefinition, KeyMoment, WindowPolicy};
use super::frame_record::FrameRecord;
use super::phase::{EvidenceWindow, FrameWindow, PhaseName, Phases};
use log::debug;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// 没有确认的问题、但有问题差一点达标时保留
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackPolicy {
    pub min_severity: f32,
    pub max_count: usize,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            min_severity: 12.0,
            max_count: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationRule {
    pub evidence_divisor: usize,
    pub min_report_severity: f32,
    pub max_reported: usize,
    pub fallback: FallbackPolicy,
}

impl Default for ConfirmationRule {
    fn default() -> Self {
        Self {
            evidence_divisor: 3,
            min_report_severity: 15.0,
            max_reported: 5,
            fallback: FallbackPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvidenceVerdict {
    pub evaluated_frames: usize,
    pub positive_frames: usize,
    pub required_frames: usize,
    pub mean_severity: f32,
    pub frame_rule_met: bool,
    pub severity_rule_met: bool,
}

impl EvidenceVerdict {
    pub fn is_confirmed(&self) -> bool {
        self.frame_rule_met && self.severity_rule_met
    }
}

impl ConfirmationRule {
    pub fn required_frames(&self, evaluated: usize) -> usize {
        evaluated.div_ceil(self.evidence_divisor.max(1))
    }

    /// Both comparisons are inclusive
    pub fn evaluate(&self, severities: &[f32]) -> EvidenceVerdict {
        let evaluated_frames = severities.len();
        let positive_frames = severities.iter().filter(|s| **s > 0.0).count();
        let required_frames = self.required_frames(evaluated_frames);
        let mean_severity = if evaluated_frames == 0 {
            0.0
        } else {
            severities.iter().sum::<f32>() / evaluated_frames as f32
        };

        EvidenceVerdict {
            evaluated_frames,
            positive_frames,
            required_frames,
            mean_severity,
            frame_rule_met: evaluated_frames > 0 && positive_frames >= required_frames,
            severity_rule_met: mean_severity >= self.min_report_severity,
        }
    }

    fn is_borderline(&self, verdict: &EvidenceVerdict) -> bool {
        verdict.frame_rule_met
            && !verdict.severity_rule_met
            && verdict.mean_severity >= self.fallback.min_severity
    }
}

/// 证据窗口内的逐帧读数和严重度
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameEvidence {
    pub frame_number: u64,
    pub value: f32,
    pub severity: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlawEvidence {
    /// 在问题表中的位置，严重度相同时用于排序
    pub definition_index: usize,
    pub flaw_id: String,
    pub window: EvidenceWindow,
    /// 所有评估帧，包括严重度为 0 的帧
    pub frames: Vec<FrameEvidence>,
    pub verdict: EvidenceVerdict,
}

impl FlawEvidence {
    /// 实际出现偏差的帧
    pub fn evidence_frames(&self) -> impl Iterator<Item = &FrameEvidence> + '_ {
        self.frames.iter().filter(|f| f.severity > 0.0)
    }

    pub fn severity(&self) -> f32 {
        self.verdict.mean_severity
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum InsufficientReason {
    MissingKeyMoment(KeyMoment),
    MissingPhase(PhaseName),
    NoEvaluableFrames,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlawOutcome {
    Confirmed(FlawEvidence),
    Borderline(FlawEvidence),
    Rejected(FlawEvidence),
    InsufficientData {
        flaw_id: String,
        reason: InsufficientReason,
    },
    NotApplicable {
        flaw_id: String,
    },
}

impl FlawOutcome {
    pub fn flaw_id(&self) -> &str {
        match self {
            FlawOutcome::Confirmed(e) | FlawOutcome::Borderline(e) | FlawOutcome::Rejected(e) => {
                &e.flaw_id
            }
            FlawOutcome::InsufficientData { flaw_id, .. } | FlawOutcome::NotApplicable { flaw_id } => {
                flaw_id
            }
        }
    }
}

/// 问题进入报告的方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    Confirmed,
    Borderline,
}

pub struct EvidenceAggregator<'a> {
    records: &'a [FrameRecord],
    phases: &'a Phases,
    camera: &'a CameraAnalysis,
    config: &'a EngineConfig,
}

impl<'a> EvidenceAggregator<'a> {
    pub fn new(
        records: &'a [FrameRecord],
        phases: &'a Phases,
        camera: &'a CameraAnalysis,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            records,
            phases,
            camera,
            config,
        }
    }

    /// 每个定义一个结果，按表顺序
    pub fn aggregate(&self) -> Vec<FlawOutcome> {
        self.config
            .flaws
            .par_iter()
            .enumerate()
            .map(|(index, def)| self.evaluate(index, def))
            .collect()
    }

    /// 各阶段保持独立区间，阶段之间的帧不作为证据
    pub fn resolve_window(&self, def: &FlawDefinition) -> Result<EvidenceWindow, InsufficientReason> {
        let last_frame = self.records.last().map_or(0, |r| r.frame_number);

        match &def.window {
            WindowPolicy::Phases { phases } => {
                let spans = phases
                    .iter()
                    .map(|name| {
                        self.phases
                            .get(*name)
                            .map(|phase| phase.window)
                            .ok_or(InsufficientReason::MissingPhase(*name))
                    })
                    .collect::<Result<Vec<FrameWindow>, _>>()?;
                let window = EvidenceWindow::from_spans(spans);
                if window.is_empty() {
                    return Err(InsufficientReason::NoEvaluableFrames);
                }
                Ok(window)
            }
            WindowPolicy::KeyMoment { moment, radius } => {
                let key = self
                    .key_frame(*moment)
                    .ok_or(InsufficientReason::MissingKeyMoment(*moment))?;
                Ok(FrameWindow::around(key, *radius, last_frame).into())
            }
        }
    }

    pub fn key_frame(&self, moment: KeyMoment) -> Option<u64> {
        match moment {
            KeyMoment::DeepestKneeBend => self.phases.key_moments.deepest_knee_bend,
            KeyMoment::Release => self.phases.key_moments.release,
        }
    }

    /// 视角限制；如果问题相关关键点确实被观察到，则放宽
    pub fn is_applicable(&self, def: &FlawDefinition, window: &EvidenceWindow) -> bool {
        if def.applies_to(self.camera.angle) {
            return true;
        }
        if def.override_parts.is_empty() {
            return false;
        }

        let min_visibility = self.config.camera.min_visibility;
        let threshold = self.config.camera.override_ratio;
        def.override_joints(self.config.frame.handedness)
            .into_iter()
            .all(|joint| window_detection_ratio(self.records, window, joint, min_visibility) > threshold)
    }

    pub fn evaluate(&self, index: usize, def: &FlawDefinition) -> FlawOutcome {
        let window = match self.resolve_window(def) {
            Ok(window) => window,
            Err(reason) => {
                debug!("{}: insufficient data ({:?})", def.id, reason);
                return FlawOutcome::InsufficientData {
                    flaw_id: def.id.clone(),
                    reason,
                };
            }
        };

        if !self.is_applicable(def, &window) {
            debug!("{}: not applicable for {:?} view", def.id, self.camera.angle);
            return FlawOutcome::NotApplicable {
                flaw_id: def.id.clone(),
            };
        }

        let frames: Vec<FrameEvidence> = self
            .records
            .iter()
            .filter(|r| window.contains(r.frame_number) && !r.is_placeholder())
            .filter_map(|r| {
                r.metric(def.metric).map(|value| FrameEvidence {
                    frame_number: r.frame_number,
                    value,
                    severity: def.frame_severity(value),
                })
            })
            .collect();

        if frames.is_empty() {
            return FlawOutcome::InsufficientData {
                flaw_id: def.id.clone(),
                reason: InsufficientReason::NoEvaluableFrames,
            };
        }

        let severities: Vec<f32> = frames.iter().map(|f| f.severity).collect();
        let rule = &self.config.confirmation;
        let verdict = rule.evaluate(&severities);

        debug!(
            "{}: {} frames, {} positive (need {}), mean {:.2}",
            def.id,
            verdict.evaluated_frames,
            verdict.positive_frames,
            verdict.required_frames,
            verdict.mean_severity
        );

        let evidence = FlawEvidence {
            definition_index: index,
            flaw_id: def.id.clone(),
            window,
            frames,
            verdict,
        };

        if verdict.is_confirmed() {
            FlawOutcome::Confirmed(evidence)
        } else if rule.is_borderline(&verdict) {
            FlawOutcome::Borderline(evidence)
        } else {
            FlawOutcome::Rejected(evidence)
        }
    }
}

/// 按严重度排序已确认的问题并限制数量；没有确认的问题时，
/// 才退而选择最强的临界问题
pub fn rank(outcomes: &[FlawOutcome], rule: &ConfirmationRule) -> Vec<(FlawEvidence, Confirmation)> {
    let by_severity = |a: &&FlawEvidence, b: &&FlawEvidence| {
        b.severity()
            .total_cmp(&a.severity())
            .then(a.definition_index.cmp(&b.definition_index))
    };

    let mut confirmed: Vec<&FlawEvidence> = outcomes
        .iter()
        .filter_map(|o| match o {
            FlawOutcome::Confirmed(e) => Some(e),
            _ => None,
        })
        .collect();

    if !confirmed.is_empty() {
        confirmed.sort_by(by_severity);
        return confirmed
            .into_iter()
            .take(rule.max_reported)
            .map(|e| (e.clone(), Confirmation::Confirmed))
            .collect();
    }

    let mut borderline: Vec<&FlawEvidence> = outcomes
        .iter()
        .filter_map(|o| match o {
            FlawOutcome::Borderline(e) => Some(e),
            _ => None,
        })
        .collect();
    borderline.sort_by(by_severity);
    borderline
        .into_iter()
        .take(rule.fallback.max_count.min(rule.max_reported))
        .map(|e| (e.clone(), Confirmation::Borderline))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shot::camera::CameraAngle;
    use crate::core::shot::flaw::{DeadZone, SeverityFormula};
    use crate::core::shot::landmark::{BodyPart, Joint, Landmark, LandmarkMap};
    use crate::core::shot::metrics::{MetricKind, MetricRanges};
    use crate::core::shot::phase::Phase;
    use std::collections::BTreeMap;

    fn landmarks(guide_visible: bool) -> LandmarkMap {
        let mut lm = LandmarkMap::new();
        lm.insert(Joint::RightWrist, Landmark::new(0.5, 0.4, 0.9));
        let vis = if guide_visible { 0.9 } else { 0.1 };
        lm.insert(Joint::LeftWrist, Landmark::new(0.45, 0.4, vis));
        lm.insert(Joint::LeftThumb, Landmark::new(0.45, 0.37, vis));
        lm
    }

    fn records(values: &[(u64, f32)], metric: MetricKind) -> Vec<FrameRecord> {
        values
            .iter()
            .map(|(frame, v)| {
                FrameRecord::from_raw_metrics(
                    *frame,
                    frame * 33,
                    Some(landmarks(true)),
                    [(metric, *v)],
                    &MetricRanges::default(),
                )
            })
            .collect()
    }

    fn phases(load: (u64, u64), release: (u64, u64)) -> Phases {
        Phases {
            load_dip: Some(Phase {
                name: PhaseName::LoadDip,
                window: FrameWindow::new(load.0, load.1),
                key_frame: load.1,
            }),
            release: Some(Phase {
                name: PhaseName::Release,
                window: FrameWindow::new(release.0, release.1),
                key_frame: release.0,
            }),
            follow_through: Some(Phase {
                name: PhaseName::FollowThrough,
                window: FrameWindow::new(release.0.saturating_sub(2), release.1),
                key_frame: release.0,
            }),
            key_moments: crate::core::shot::phase::KeyMoments {
                deepest_knee_bend: Some(load.1),
                release: Some(release.0),
            },
        }
    }

    fn camera(angle: CameraAngle) -> CameraAnalysis {
        CameraAnalysis {
            angle,
            visibility_ratios: BTreeMap::new(),
            asymmetry: 0.0,
        }
    }

    /// Severity equals the reading above zero
    fn identity_flaw(id: &str, phases: Vec<PhaseName>) -> FlawDefinition {
        FlawDefinition {
            id: id.to_string(),
            metric: MetricKind::TorsoLean,
            window: WindowPolicy::Phases { phases },
            dead_zone: DeadZone::Above { limit: 0.0 },
            severity: SeverityFormula::linear(1.0, 100.0),
            camera_angles: CameraAngle::ALL.to_vec(),
            override_parts: vec![],
            preferred_phases: vec![],
            frame_conditions: vec![],
        }
    }

    fn config_with(flaws: Vec<FlawDefinition>) -> EngineConfig {
        EngineConfig {
            flaws,
            ..Default::default()
        }
    }

    #[test]
    fn test_confirmation_boundary_one_third() {
        let rule = ConfirmationRule::default();

        let two_of_six = rule.evaluate(&[60.0, 30.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(two_of_six.required_frames, 2);
        assert!(two_of_six.is_confirmed());

        let one_of_six = rule.evaluate(&[60.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(!one_of_six.frame_rule_met);
        assert!(!one_of_six.is_confirmed());
    }

    #[test]
    fn test_mean_includes_zero_frames() {
        let rule = ConfirmationRule::default();

        let weak = rule.evaluate(&[18.0, 18.0, 18.0, 18.0, 18.0, 0.0, 0.0, 0.0]);
        assert!((weak.mean_severity - 11.25).abs() < 1e-4);
        assert!(weak.frame_rule_met);
        assert!(!weak.is_confirmed());

        let strong = rule.evaluate(&[25.0, 25.0, 25.0, 25.0, 25.0, 0.0, 0.0, 0.0]);
        assert!((strong.mean_severity - 15.625).abs() < 1e-4);
        assert!(strong.is_confirmed());
    }

    #[test]
    fn test_required_frames_rounds_up() {
        let rule = ConfirmationRule::default();
        assert_eq!(rule.required_frames(1), 1);
        assert_eq!(rule.required_frames(7), 3);
        assert_eq!(rule.required_frames(9), 3);
        assert!(!rule.evaluate(&[]).frame_rule_met);
    }

    #[test]
    fn test_aggregate_averages_window() {
        let values: Vec<(u64, f32)> = (0..8)
            .map(|f| (f, if f < 5 { 25.0 } else { 0.0 }))
            .collect();
        let records = records(&values, MetricKind::TorsoLean);
        let phases = phases((0, 7), (8, 12));
        let camera = camera(CameraAngle::LeftSide);
        let config = config_with(vec![identity_flaw("lean", vec![PhaseName::LoadDip])]);

        let outcomes = EvidenceAggregator::new(&records, &phases, &camera, &config).aggregate();
        match &outcomes[0] {
            FlawOutcome::Confirmed(evidence) => {
                assert!((evidence.severity() - 15.625).abs() < 1e-4);
                assert_eq!(evidence.evidence_frames().count(), 5);
                assert_eq!(evidence.window, EvidenceWindow::from(FrameWindow::new(0, 7)));
            }
            other => panic!("expected confirmation, got {:?}", other),
        }
    }

    #[test]
    fn test_frames_between_phases_are_not_evidence() {
        // only the frames between Load/Dip and Release deviate
        let values: Vec<(u64, f32)> = (0..=25)
            .map(|f| (f, if (6..=19).contains(&f) { 40.0 } else { 0.0 }))
            .collect();
        let records = records(&values, MetricKind::TorsoLean);
        let phases = phases((0, 5), (20, 25));
        let camera = camera(CameraAngle::LeftSide);
        let config = config_with(vec![identity_flaw(
            "lean",
            vec![PhaseName::LoadDip, PhaseName::Release],
        )]);

        let outcomes = EvidenceAggregator::new(&records, &phases, &camera, &config).aggregate();
        match &outcomes[0] {
            FlawOutcome::Rejected(evidence) => {
                assert_eq!(evidence.verdict.evaluated_frames, 12);
                assert_eq!(evidence.verdict.positive_frames, 0);
                assert_eq!(evidence.severity(), 0.0);
                assert_eq!(
                    evidence.window.spans(),
                    &[FrameWindow::new(0, 5), FrameWindow::new(20, 25)]
                );
                assert!(!evidence.window.contains(12));
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_out_of_range_knee_reading_is_not_evidence() {
        let def = FlawDefinition {
            id: "shallow".to_string(),
            metric: MetricKind::KneeAngle,
            window: WindowPolicy::KeyMoment {
                moment: KeyMoment::DeepestKneeBend,
                radius: 1,
            },
            dead_zone: DeadZone::Above { limit: 125.0 },
            severity: SeverityFormula::linear(1.5, 100.0),
            camera_angles: CameraAngle::ALL.to_vec(),
            override_parts: vec![],
            preferred_phases: vec![],
            frame_conditions: vec![],
        };
        let records = records(&[(9, 100.0), (10, 300.0), (11, 105.0)], MetricKind::KneeAngle);
        let phases = phases((0, 10), (15, 20));
        let camera = camera(CameraAngle::Front);
        let config = config_with(vec![def]);

        let outcomes = EvidenceAggregator::new(&records, &phases, &camera, &config).aggregate();
        match &outcomes[0] {
            FlawOutcome::Rejected(evidence) => {
                assert_eq!(evidence.verdict.evaluated_frames, 2);
                assert!(evidence.frames.iter().all(|f| f.frame_number != 10));
                assert_eq!(evidence.verdict.positive_frames, 0);
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_phase_is_insufficient_data() {
        let records = records(&[(0, 30.0)], MetricKind::TorsoLean);
        let mut phases = phases((0, 5), (6, 9));
        phases.release = None;
        phases.key_moments.release = None;
        let camera = camera(CameraAngle::Front);
        let mut bent = identity_flaw("bent", vec![]);
        bent.window = WindowPolicy::KeyMoment {
            moment: KeyMoment::Release,
            radius: 2,
        };
        let config = config_with(vec![identity_flaw("lean", vec![PhaseName::Release]), bent]);

        let outcomes = EvidenceAggregator::new(&records, &phases, &camera, &config).aggregate();
        assert_eq!(
            outcomes[0],
            FlawOutcome::InsufficientData {
                flaw_id: "lean".to_string(),
                reason: InsufficientReason::MissingPhase(PhaseName::Release),
            }
        );
        assert_eq!(
            outcomes[1],
            FlawOutcome::InsufficientData {
                flaw_id: "bent".to_string(),
                reason: InsufficientReason::MissingKeyMoment(KeyMoment::Release),
            }
        );
    }

    #[test]
    fn test_dynamic_visibility_override() {
        // guide hand seen in 2 of 8 window frames: 25% > 20%
        let mut records: Vec<FrameRecord> = (0..8)
            .map(|f| {
                FrameRecord::from_raw_metrics(
                    f,
                    f * 33,
                    Some(landmarks(f % 4 == 0)),
                    [(MetricKind::TorsoLean, 30.0)],
                    &MetricRanges::default(),
                )
            })
            .collect();
        let phases = phases((0, 7), (8, 10));
        let camera = camera(CameraAngle::LeftSide);

        let mut guide = identity_flaw("guide", vec![PhaseName::LoadDip]);
        guide.camera_angles = vec![CameraAngle::Front, CameraAngle::Angled];
        guide.override_parts = vec![BodyPart::GuideWrist];
        let mut hard = guide.clone();
        hard.id = "hard".to_string();
        hard.override_parts.clear();
        let config = config_with(vec![guide, hard]);

        let outcomes = EvidenceAggregator::new(&records, &phases, &camera, &config).aggregate();
        assert!(matches!(outcomes[0], FlawOutcome::Confirmed(_)));
        assert!(matches!(outcomes[1], FlawOutcome::NotApplicable { .. }));

        // one sighting in eight frames stays excluded
        records[4] = FrameRecord::from_raw_metrics(
            4,
            132,
            Some(landmarks(false)),
            [(MetricKind::TorsoLean, 30.0)],
            &MetricRanges::default(),
        );
        let outcomes = EvidenceAggregator::new(&records, &phases, &camera, &config).aggregate();
        assert!(matches!(outcomes[0], FlawOutcome::NotApplicable { .. }));
    }

    #[test]
    fn test_override_uses_camera_visibility_threshold() {
        // guide hand visible at 0.9 in every frame
        let records: Vec<FrameRecord> = (0..8)
            .map(|f| {
                FrameRecord::from_raw_metrics(
                    f,
                    f * 33,
                    Some(landmarks(true)),
                    [(MetricKind::TorsoLean, 30.0)],
                    &MetricRanges::default(),
                )
            })
            .collect();
        let phases = phases((0, 7), (8, 10));
        let camera = camera(CameraAngle::LeftSide);

        let mut guide = identity_flaw("guide", vec![PhaseName::LoadDip]);
        guide.camera_angles = vec![CameraAngle::Front];
        guide.override_parts = vec![BodyPart::GuideWrist];

        let mut config = config_with(vec![guide]);
        config.frame.min_visibility = 0.95;
        let outcomes = EvidenceAggregator::new(&records, &phases, &camera, &config).aggregate();
        assert!(matches!(outcomes[0], FlawOutcome::Confirmed(_)));

        config.frame.min_visibility = 0.5;
        config.camera.min_visibility = 0.95;
        let outcomes = EvidenceAggregator::new(&records, &phases, &camera, &config).aggregate();
        assert!(matches!(outcomes[0], FlawOutcome::NotApplicable { .. }));
    }

    #[test]
    fn test_placeholders_are_not_evaluated() {
        let mut records = records(&[(0, 30.0), (2, 30.0)], MetricKind::TorsoLean);
        records.insert(1, FrameRecord::placeholder(1, 33));
        let phases = phases((0, 2), (3, 5));
        let camera = camera(CameraAngle::Front);
        let config = config_with(vec![identity_flaw("lean", vec![PhaseName::LoadDip])]);

        let outcomes = EvidenceAggregator::new(&records, &phases, &camera, &config).aggregate();
        match &outcomes[0] {
            FlawOutcome::Confirmed(evidence) => assert_eq!(evidence.verdict.evaluated_frames, 2),
            other => panic!("expected confirmation, got {:?}", other),
        }
    }

    fn evidence(index: usize, id: &str, severities: &[f32]) -> FlawEvidence {
        let rule = ConfirmationRule::default();
        FlawEvidence {
            definition_index: index,
            flaw_id: id.to_string(),
            window: FrameWindow::new(0, severities.len() as u64 - 1).into(),
            frames: severities
                .iter()
                .enumerate()
                .map(|(i, s)| FrameEvidence {
                    frame_number: i as u64,
                    value: *s,
                    severity: *s,
                })
                .collect(),
            verdict: rule.evaluate(severities),
        }
    }

    #[test]
    fn test_rank_orders_and_truncates() {
        let rule = ConfirmationRule {
            max_reported: 2,
            ..Default::default()
        };
        let outcomes = vec![
            FlawOutcome::Confirmed(evidence(0, "a", &[20.0, 20.0])),
            FlawOutcome::Confirmed(evidence(1, "b", &[40.0, 40.0])),
            FlawOutcome::Confirmed(evidence(2, "c", &[20.0, 20.0])),
            FlawOutcome::Rejected(evidence(3, "d", &[0.0, 0.0])),
        ];

        let ranked = rank(&outcomes, &rule);
        let ids: Vec<&str> = ranked.iter().map(|(e, _)| e.flaw_id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert!(ranked.iter().all(|(_, c)| *c == Confirmation::Confirmed));
    }

    #[test]
    fn test_rank_falls_back_to_borderline() {
        let rule = ConfirmationRule::default();
        let outcomes = vec![
            FlawOutcome::Borderline(evidence(0, "weak", &[13.0, 13.0, 13.0])),
            FlawOutcome::Borderline(evidence(1, "stronger", &[14.0, 14.0, 14.0])),
            FlawOutcome::Rejected(evidence(2, "none", &[0.0, 0.0, 0.0])),
        ];

        let ranked = rank(&outcomes, &rule);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].0.flaw_id, "stronger");
        assert_eq!(ranked[0].1, Confirmation::Borderline);

        let with_confirmed = vec![
            outcomes[0].clone(),
            FlawOutcome::Confirmed(evidence(3, "real", &[30.0, 30.0])),
        ];
        let ranked = rank(&with_confirmed, &rule);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].1, Confirmation::Confirmed);
    }

    #[test]
    fn test_below_fallback_floor_is_rejected() {
        let values: Vec<(u64, f32)> = (0..8)
            .map(|f| (f, if f < 5 { 18.0 } else { 0.0 }))
            .collect();
        let records = records(&values, MetricKind::TorsoLean);
        let phases = phases((0, 7), (8, 12));
        let camera = camera(CameraAngle::Front);
        let config = config_with(vec![identity_flaw("lean", vec![PhaseName::LoadDip])]);

        let outcomes = EvidenceAggregator::new(&records, &phases, &camera, &config).aggregate();
        assert!(matches!(outcomes[0], FlawOutcome::Rejected(_)));
        assert!(rank(&outcomes, &config.confirmation).is_empty());
    }
}
