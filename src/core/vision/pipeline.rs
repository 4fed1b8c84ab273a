use log::{debug, info, warn};
use serde::Serialize;

use super::analyzer::{HeuristicAnalyzer, LabelAnalyzer, SceneAnalyzer};
use super::config::DetectorConfig;
use super::dedup::VerdictGate;
use super::error::DetectionError;
use super::extractor::PixelHeuristicExtractor;
use super::frame::{Frame, RawFrame};
use super::labels::ObjectDetector;
use super::verdict::DetectionVerdict;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 还没有帧
    NotReady,
    /// 没有可采样的像素
    EmptyFrame,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Reported(DetectionVerdict),
    Suppressed,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorStats {
    pub processed_frames: u64,
    pub reported_verdicts: u64,
    pub suppressed_verdicts: u64,
    pub skipped_frames: u64,
    pub trash_verdicts: u64,
    pub failed_frames: u64,
}

pub struct DetectionPipeline {
    analyzer: Box<dyn SceneAnalyzer>,
    gate: VerdictGate,
    stats: DetectorStats,
}

impl DetectionPipeline {
    pub fn new() -> Self {
        Self::with_analyzer(Box::new(HeuristicAnalyzer::new()))
    }

    pub fn with_analyzer(analyzer: Box<dyn SceneAnalyzer>) -> Self {
        Self {
            analyzer,
            gate: VerdictGate::new(),
            stats: DetectorStats::default(),
        }
    }

    pub fn from_config(config: &DetectorConfig) -> Result<Self, DetectionError> {
        let extractor =
            PixelHeuristicExtractor::with_config(config.sample_stride, config.palette.clone())?;
        let analyzer = HeuristicAnalyzer::with_parts(
            Box::new(extractor),
            config.thresholds.clone(),
            config.policy,
        )?;
        info!(
            "✅ Detection pipeline ready: stride {}, thresholds v{}",
            config.sample_stride, config.thresholds.version
        );
        Ok(Self::with_analyzer(Box::new(analyzer)))
    }

    /// 标签路径：`detector` 识别目标，`config.labels` 负责分类
    pub fn with_detector(
        config: &DetectorConfig,
        detector: Box<dyn ObjectDetector>,
    ) -> Result<Self, DetectionError> {
        let analyzer = LabelAnalyzer::new(detector, config.labels.clone())?;
        info!(
            "✅ Detection pipeline ready: {} detector, min confidence {}",
            analyzer.name(),
            config.labels.min_confidence
        );
        Ok(Self::with_analyzer(Box::new(analyzer)))
    }

    pub fn process_frame(&mut self, frame: &Frame) -> Result<PipelineOutcome, DetectionError> {
        self.stats.processed_frames += 1;

        let verdict = match self.analyzer.analyze(frame) {
            Ok(Some(verdict)) => verdict,
            Ok(None) => {
                self.stats.skipped_frames += 1;
                return Ok(PipelineOutcome::Skipped(SkipReason::EmptyFrame));
            }
            Err(e) => {
                self.stats.failed_frames += 1;
                return Err(e);
            }
        };

        match self.gate.admit(verdict) {
            Some(verdict) => {
                self.stats.reported_verdicts += 1;
                if verdict.trash_detected {
                    self.stats.trash_verdicts += 1;
                }
                debug!("📣 Frame #{}: {}", frame.frame_number, verdict.summary());
                Ok(PipelineOutcome::Reported(verdict))
            }
            None => {
                self.stats.suppressed_verdicts += 1;
                Ok(PipelineOutcome::Suppressed)
            }
        }
    }

    pub fn process_raw_frame(&mut self, raw_frame: &RawFrame) -> Result<PipelineOutcome, DetectionError> {
        let frame = raw_frame.to_rgba()?;
        self.process_frame(&frame)
    }

    /// 记录一次无帧可用的检测
    pub fn record_not_ready(&mut self) -> PipelineOutcome {
        self.stats.skipped_frames += 1;
        PipelineOutcome::Skipped(SkipReason::NotReady)
    }

    /// 记录一次取帧失败，原样返回错误
    pub fn record_capture_failure(&mut self, error: DetectionError) -> DetectionError {
        self.stats.failed_frames += 1;
        warn!("⚠️ Frame capture failed: {}", error);
        error
    }

    pub fn analyzer_name(&self) -> &'static str {
        self.analyzer.name()
    }

    pub fn stats(&self) -> DetectorStats {
        self.stats.clone()
    }

    /// 清除去重缓存，下一个结果一定上报
    pub fn reset_cache(&mut self) {
        self.gate.reset();
    }

    pub fn reset(&mut self) {
        self.gate.reset();
        self.stats = DetectorStats::default();
    }
}

impl Default for DetectionPipeline {
    fn default() -> Self {
        Self::new()
    }
}
