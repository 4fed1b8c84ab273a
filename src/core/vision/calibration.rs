//! 阈值校准 - 批量统计各特征占比
//!
//! 并行对多帧做特征提取，统计每个特征的占比分布，以及当前阈值下的命中率

use log::{info, warn};
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;

use super::error::DetectionError;
use super::extractor::{FeatureExtractor, PixelHeuristicExtractor};
use super::features::{Feature, RawAnalysis};
use super::frame::Frame;
use super::thresholds::ThresholdTable;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureStats {
    pub feature: String,
    pub threshold: f32,
    pub min_fraction: f32,
    pub mean_fraction: f32,
    pub max_fraction: f32,
    /// 当前阈值下特征成立的帧占比
    pub hit_rate: f32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationReport {
    pub frames_analyzed: usize,
    pub frames_skipped: usize,
    pub frames_failed: usize,
    pub features: Vec<FeatureStats>,
}

impl CalibrationReport {
    pub fn feature(&self, feature: Feature) -> Option<&FeatureStats> {
        self.features.iter().find(|s| s.feature == feature.key())
    }
}

pub struct Calibrator {
    extractor: PixelHeuristicExtractor,
    thresholds: ThresholdTable,
    pool: ThreadPool,
}

impl Calibrator {
    pub fn new(
        extractor: PixelHeuristicExtractor,
        thresholds: ThresholdTable,
    ) -> Result<Self, DetectionError> {
        let num_threads = num_cpus::get().min(4);
        let pool = rayon::ThreadPoolBuilder::new()
            .thread_name(|idx| format!("calibration-{idx}"))
            .num_threads(num_threads)
            .build()
            .map_err(|e| DetectionError::Extraction(format!("failed to build worker pool: {e}")))?;
        Ok(Self {
            extractor,
            thresholds,
            pool,
        })
    }

    pub fn calibrate(&self, frames: &[Frame]) -> CalibrationReport {
        let results: Vec<Result<RawAnalysis, DetectionError>> = self
            .pool
            .install(|| frames.par_iter().map(|f| self.extractor.extract(f)).collect());

        let mut report = CalibrationReport::default();
        let mut analyses = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(raw) if raw.is_degenerate() => report.frames_skipped += 1,
                Ok(raw) => analyses.push(raw),
                Err(e) => {
                    warn!("⚠️ Calibration frame rejected: {}", e);
                    report.frames_failed += 1;
                }
            }
        }
        report.frames_analyzed = analyses.len();

        if analyses.is_empty() {
            return report;
        }

        let classified: Vec<_> = analyses.iter().map(|a| self.thresholds.classify(a)).collect();
        let n = analyses.len() as f32;

        for feature in Feature::ALL {
            let fractions = analyses.iter().filter_map(|a| a.fraction(feature));
            let (min, max, sum) = fractions.fold((f32::MAX, f32::MIN, 0.0), |(lo, hi, sum), v| {
                (lo.min(v), hi.max(v), sum + v)
            });
            let hits = classified.iter().filter(|c| c.has(feature)).count();
            report.features.push(FeatureStats {
                feature: feature.key().to_string(),
                threshold: self.thresholds.get(feature),
                min_fraction: min,
                mean_fraction: sum / n,
                max_fraction: max,
                hit_rate: hits as f32 / n,
            });
        }

        info!(
            "📊 Calibrated over {} frames ({} skipped, {} failed)",
            report.frames_analyzed, report.frames_skipped, report.frames_failed
        );
        report
    }
}
