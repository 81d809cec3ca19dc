pub mod api;
pub mod core;

pub use crate::core::shot::{AnalysisError, EngineConfig, ShotAnalysis, ShotAnalyzer, ShotReport};

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("shot_lib_rust"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // host applications install their own `log` backend
    }
}
