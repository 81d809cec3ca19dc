//! 投篮姿态分析器

use crate::api::models::landmarks::parse_frames;
use crate::core::shot::{AnalysisError, EngineConfig, InputFrame, ShotAnalysis, ShotAnalyzer};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// 累计统计（同一个分析器处理过的所有片段）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotFormStats {
    pub analyzed_clips: u64,
    pub total_frames: u64,
    pub placeholder_frames: u64,
    pub reported_flaws: u64,
}

/// 投篮姿态分析器 - 输入关键点，输出排序后的问题报告
///
/// ```ignore
/// let analyzer = ShotFormAnalyzer::create()?;
/// let analysis = analyzer.analyze_json(&frames_json)?;
/// for flaw in &analysis.report().flaws {
///     let overlay = analysis.overlay_for(flaw);
/// }
/// ```
pub struct ShotFormAnalyzer {
    analyzer: ShotAnalyzer,
    stats: Arc<Mutex<ShotFormStats>>,
}

impl ShotFormAnalyzer {
    pub fn create() -> Result<Self, AnalysisError> {
        Self::with_config(EngineConfig::default())
    }

    /// 从 JSON5 配置文档创建分析器
    pub fn with_config_json5(text: &str) -> Result<Self, AnalysisError> {
        Self::with_config(EngineConfig::from_json5(text)?)
    }

    pub fn with_config(config: EngineConfig) -> Result<Self, AnalysisError> {
        let analyzer = ShotAnalyzer::with_config(config)?;
        info!(
            "🏀 ShotFormAnalyzer: created ({} flaw definitions, {} workers)",
            analyzer.config().flaws.len(),
            analyzer.config().worker_threads
        );
        Ok(Self {
            analyzer,
            stats: Arc::new(Mutex::new(ShotFormStats::default())),
        })
    }

    pub fn analyze(&self, frames: Vec<InputFrame>) -> Result<ShotAnalysis, AnalysisError> {
        let analysis = self.analyzer.analyze(frames)?;

        let clip = analysis.report().stats;
        match self.stats.lock() {
            Ok(mut stats) => {
                stats.analyzed_clips += 1;
                stats.total_frames += clip.total_frames as u64;
                stats.placeholder_frames += clip.placeholder_frames as u64;
                stats.reported_flaws += clip.reported_flaws as u64;
            }
            Err(_) => warn!("⚠️ ShotFormAnalyzer: stats lock poisoned"),
        }

        Ok(analysis)
    }

    /// 同 [`analyze`](Self::analyze)，输入为帧数据 JSON 数组
    pub fn analyze_json(&self, json: &str) -> Result<ShotAnalysis, AnalysisError> {
        self.analyze(parse_frames(json)?)
    }

    pub fn stats(&self) -> ShotFormStats {
        self.stats.lock().map(|s| *s).unwrap_or_default()
    }

    pub fn reset(&self) {
        if let Ok(mut stats) = self.stats.lock() {
            *stats = ShotFormStats::default();
        }
    }
}

impl Drop for ShotFormAnalyzer {
    fn drop(&mut self) {
        info!("🗑️ ShotFormAnalyzer: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_accumulate_and_reset() {
        let analyzer = ShotFormAnalyzer::create().unwrap();
        let json = r#"[
            {"frame_number": 0, "timestamp_ms": 0},
            {"frame_number": 1, "timestamp_ms": 33, "landmarks": [
                {"name": "right_wrist", "x": 0.5, "y": 0.3, "visibility": 0.9}
            ]}
        ]"#;

        analyzer.analyze_json(json).unwrap();
        analyzer.analyze_json(json).unwrap();

        let stats = analyzer.stats();
        assert_eq!(stats.analyzed_clips, 2);
        assert_eq!(stats.total_frames, 4);
        assert_eq!(stats.placeholder_frames, 2);

        analyzer.reset();
        assert_eq!(analyzer.stats(), ShotFormStats::default());
    }

    #[test]
    fn test_failed_analysis_leaves_stats_untouched() {
        let analyzer = ShotFormAnalyzer::create().unwrap();
        assert!(analyzer.analyze_json("[]").is_err());
        assert_eq!(analyzer.stats().analyzed_clips, 0);
    }

    #[test]
    fn test_json5_config_override() {
        let analyzer =
            ShotFormAnalyzer::with_config_json5("{ worker_threads: 1, frame: { handedness: 'left' } }")
                .unwrap();
        assert_eq!(analyzer.analyzer.config().worker_threads, 1);
        assert!(ShotFormAnalyzer::with_config_json5("{ worker_threads: 0 }").is_err());
    }
}
