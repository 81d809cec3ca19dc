use thiserror::Error;

/// 结构上无效的输入或配置；其余情况都体现在报告中
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("input frame sequence is empty")]
    EmptyInput,
    #[error("frame numbers must be strictly increasing: {current} follows {previous}")]
    NonIncreasingFrames { previous: u64, current: u64 },
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON5 config error: {0}")]
    Json5(#[from] json5::Error),
    #[error("worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
