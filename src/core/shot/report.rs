use super::aggregator::{Confirmation, FlawEvidence, FlawOutcome, InsufficientReason};
use super::camera::CameraAngle;
use super::error::AnalysisError;
use super::flaw::{FlawDefinition, KeyMoment, SeverityFormula, WindowPolicy};
use super::phase::{EvidenceWindow, Phase, PhaseName, Phases};
use super::selector::SelectedFrame;
use serde::{Deserialize, Serialize};

/// 已确认的问题，供叠加绘制和内容查询使用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlawInstance {
    pub flaw_id: String,
    /// 证据窗口内逐帧严重度的平均值，0-100
    pub severity: f32,
    pub phase: PhaseName,
    pub camera_angle: CameraAngle,
    pub representative_frame_number: u64,
    pub evidence_frame_count: usize,
    pub evidence_window: EvidenceWindow,
    pub confirmation: Confirmation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsufficientData {
    pub flaw_id: String,
    pub reason: InsufficientReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AnalysisStats {
    pub total_frames: usize,
    pub placeholder_frames: usize,
    pub invalid_metric_readings: usize,
    pub evaluated_definitions: usize,
    pub reported_flaws: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotReport {
    pub flaws: Vec<FlawInstance>,
    pub insufficient_data: Vec<InsufficientData>,
    pub camera_angle: CameraAngle,
    pub phases: Vec<Phase>,
    pub stats: AnalysisStats,
}

impl ShotReport {
    /// 报告中没有任何问题
    pub fn is_clean(&self) -> bool {
        self.flaws.is_empty()
    }

    pub fn to_json(&self) -> Result<String, AnalysisError> {
        Ok(serde_json::to_string(self)?)
    }
}

pub struct ReportEmitter<'a> {
    flaws: &'a [FlawDefinition],
    phases: &'a Phases,
    camera_angle: CameraAngle,
}

impl<'a> ReportEmitter<'a> {
    pub fn new(flaws: &'a [FlawDefinition], phases: &'a Phases, camera_angle: CameraAngle) -> Self {
        Self {
            flaws,
            phases,
            camera_angle,
        }
    }

    /// `selected` arrives already ranked; its order is kept
    pub fn emit(
        &self,
        selected: &[(FlawEvidence, Confirmation, SelectedFrame)],
        outcomes: &[FlawOutcome],
        mut stats: AnalysisStats,
    ) -> ShotReport {
        let flaws: Vec<FlawInstance> = selected
            .iter()
            .filter_map(|(evidence, confirmation, frame)| {
                let def = self.flaws.get(evidence.definition_index)?;
                Some(FlawInstance {
                    flaw_id: evidence.flaw_id.clone(),
                    severity: evidence.severity().clamp(0.0, SeverityFormula::CEILING),
                    phase: self.instance_phase(def, frame.frame_number),
                    camera_angle: self.camera_angle,
                    representative_frame_number: frame.frame_number,
                    evidence_frame_count: evidence.evidence_frames().count(),
                    evidence_window: evidence.window.clone(),
                    confirmation: *confirmation,
                })
            })
            .collect();

        let insufficient_data = outcomes
            .iter()
            .filter_map(|o| match o {
                FlawOutcome::InsufficientData { flaw_id, reason } => Some(InsufficientData {
                    flaw_id: flaw_id.clone(),
                    reason: *reason,
                }),
                _ => None,
            })
            .collect();

        stats.reported_flaws = flaws.len();

        ShotReport {
            flaws,
            insufficient_data,
            camera_angle: self.camera_angle,
            phases: self.phases.ordered().into_iter().copied().collect(),
            stats,
        }
    }

    /// 优先取包含该帧的首选阶段，其次任意包含该帧的阶段，
    /// 最后取构成问题窗口的阶段
    fn instance_phase(&self, def: &FlawDefinition, frame_number: u64) -> PhaseName {
        let holds = |name: &PhaseName| {
            self.phases
                .get(*name)
                .is_some_and(|p| p.window.contains(frame_number))
        };

        def.preferred_phases
            .iter()
            .chain(PhaseName::ALL.iter())
            .copied()
            .find(|name| holds(name))
            .unwrap_or(match &def.window {
                WindowPolicy::Phases { phases } => {
                    phases.first().copied().unwrap_or(PhaseName::Release)
                }
                WindowPolicy::KeyMoment {
                    moment: KeyMoment::DeepestKneeBend,
                    ..
                } => PhaseName::LoadDip,
                WindowPolicy::KeyMoment {
                    moment: KeyMoment::Release,
                    ..
                } => PhaseName::Release,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::shot::aggregator::{ConfirmationRule, FrameEvidence};
    use crate::core::shot::flaw::default_flaws;
    use crate::core::shot::phase::{FrameWindow, KeyMoments};

    fn phases() -> Phases {
        Phases {
            load_dip: Some(Phase {
                name: PhaseName::LoadDip,
                window: FrameWindow::new(5, 20),
                key_frame: 20,
            }),
            release: Some(Phase {
                name: PhaseName::Release,
                window: FrameWindow::new(30, 40),
                key_frame: 30,
            }),
            follow_through: Some(Phase {
                name: PhaseName::FollowThrough,
                window: FrameWindow::new(26, 38),
                key_frame: 30,
            }),
            key_moments: KeyMoments {
                deepest_knee_bend: Some(20),
                release: Some(30),
            },
        }
    }

    fn evidence(index: usize, id: &str, frames: &[(u64, f32)]) -> FlawEvidence {
        let severities: Vec<f32> = frames.iter().map(|(_, s)| *s).collect();
        FlawEvidence {
            definition_index: index,
            flaw_id: id.to_string(),
            window: FrameWindow::new(frames[0].0, frames[frames.len() - 1].0).into(),
            frames: frames
                .iter()
                .map(|(f, s)| FrameEvidence {
                    frame_number: *f,
                    value: 0.0,
                    severity: *s,
                })
                .collect(),
            verdict: ConfirmationRule::default().evaluate(&severities),
        }
    }

    fn pick(frame_number: u64) -> SelectedFrame {
        SelectedFrame {
            frame_number,
            severity: 0.0,
            quality: 0.0,
            score: 0.0,
        }
    }

    #[test]
    fn test_emit_keeps_order_and_counts() {
        let flaws = default_flaws();
        let phases = phases();
        let emitter = ReportEmitter::new(&flaws, &phases, CameraAngle::Front);

        let flare_index = flaws.iter().position(|f| f.id == "elbow_flare").unwrap();
        let snap_index = flaws.iter().position(|f| f.id == "limited_wrist_snap").unwrap();

        let selected = vec![
            (
                evidence(snap_index, "limited_wrist_snap", &[(28, 40.0), (29, 0.0), (30, 40.0)]),
                Confirmation::Confirmed,
                pick(30),
            ),
            (
                evidence(flare_index, "elbow_flare", &[(10, 30.0), (11, 20.0)]),
                Confirmation::Confirmed,
                pick(10),
            ),
        ];
        let outcomes = vec![FlawOutcome::InsufficientData {
            flaw_id: "head_turn".to_string(),
            reason: InsufficientReason::MissingPhase(PhaseName::Release),
        }];

        let report = emitter.emit(&selected, &outcomes, AnalysisStats::default());

        assert_eq!(report.flaws.len(), 2);
        assert_eq!(report.flaws[0].flaw_id, "limited_wrist_snap");
        assert_eq!(report.flaws[0].evidence_frame_count, 2);
        assert_eq!(report.flaws[0].phase, PhaseName::FollowThrough);
        assert!((report.flaws[0].severity - 80.0 / 3.0).abs() < 1e-4);
        assert_eq!(report.flaws[1].phase, PhaseName::LoadDip);
        assert_eq!(report.flaws[1].representative_frame_number, 10);
        assert_eq!(report.insufficient_data.len(), 1);
        assert_eq!(report.stats.reported_flaws, 2);
        assert_eq!(report.phases.len(), 3);
    }

    #[test]
    fn test_phase_falls_back_to_window_policy() {
        let flaws = default_flaws();
        let phases = Phases::default();
        let emitter = ReportEmitter::new(&flaws, &phases, CameraAngle::LeftSide);

        let knee = flaws.iter().find(|f| f.id == "shallow_knee_bend").unwrap();
        assert_eq!(emitter.instance_phase(knee, 12), PhaseName::LoadDip);
    }

    #[test]
    fn test_report_serializes() {
        let flaws = default_flaws();
        let phases = phases();
        let emitter = ReportEmitter::new(&flaws, &phases, CameraAngle::Angled);
        let report = emitter.emit(&[], &[], AnalysisStats::default());

        assert!(report.is_clean());
        let json = report.to_json().unwrap();
        assert!(json.contains("\"camera_angle\":\"angled\""));
        let back: ShotReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, report);
    }
}
