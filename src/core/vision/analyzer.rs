//! 帧 → 检测结果，基于像素启发式或目标检测标签

use log::{debug, warn};

use super::error::DetectionError;
use super::extractor::{FeatureExtractor, PixelHeuristicExtractor};
use super::features::{ClassifiedAnalysis, RawAnalysis};
use super::frame::Frame;
use super::labels::{LabelCatalog, ObjectDetector};
use super::policy::DecisionPolicy;
use super::thresholds::ThresholdTable;
use super::verdict::DetectionVerdict;

pub trait SceneAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// `Ok(None)` 表示没有可采样的像素
    fn analyze(&self, frame: &Frame) -> Result<Option<DetectionVerdict>, DetectionError>;
}

/// 单次启发式分析的中间结果（调试和校准用）
#[derive(Debug, Clone)]
pub struct FrameInspection {
    pub raw: RawAnalysis,
    pub classified: ClassifiedAnalysis,
    pub verdict: Option<DetectionVerdict>,
}

pub struct HeuristicAnalyzer {
    extractor: Box<dyn FeatureExtractor>,
    thresholds: ThresholdTable,
    policy: DecisionPolicy,
}

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self {
            extractor: Box::new(PixelHeuristicExtractor::new()),
            thresholds: ThresholdTable::default(),
            policy: DecisionPolicy::default(),
        }
    }

    pub fn with_parts(
        extractor: Box<dyn FeatureExtractor>,
        thresholds: ThresholdTable,
        policy: DecisionPolicy,
    ) -> Result<Self, DetectionError> {
        thresholds.validate()?;
        Ok(Self {
            extractor,
            thresholds,
            policy,
        })
    }

    pub fn thresholds(&self) -> &ThresholdTable {
        &self.thresholds
    }

    pub fn inspect(&self, frame: &Frame) -> Result<FrameInspection, DetectionError> {
        let raw = self.extractor.extract(frame)?;
        let classified = self.thresholds.classify(&raw);
        let verdict = if raw.is_degenerate() {
            None
        } else {
            Some(self.policy.decide(&classified))
        };
        Ok(FrameInspection {
            raw,
            classified,
            verdict,
        })
    }
}

impl Default for HeuristicAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneAnalyzer for HeuristicAnalyzer {
    fn name(&self) -> &'static str {
        self.extractor.name()
    }

    fn analyze(&self, frame: &Frame) -> Result<Option<DetectionVerdict>, DetectionError> {
        let inspection = self.inspect(frame)?;
        if inspection.verdict.is_none() {
            debug!("⏭️ Frame #{} has no samples", frame.frame_number);
        }
        Ok(inspection.verdict)
    }
}

pub struct LabelAnalyzer {
    detector: Box<dyn ObjectDetector>,
    catalog: LabelCatalog,
}

impl LabelAnalyzer {
    pub fn new(detector: Box<dyn ObjectDetector>, catalog: LabelCatalog) -> Result<Self, DetectionError> {
        catalog.validate()?;
        Ok(Self { detector, catalog })
    }
}

impl SceneAnalyzer for LabelAnalyzer {
    fn name(&self) -> &'static str {
        self.detector.name()
    }

    fn analyze(&self, frame: &Frame) -> Result<Option<DetectionVerdict>, DetectionError> {
        frame.validate()?;
        if frame.pixel_count() == 0 {
            return Ok(None);
        }

        let detections = self.detector.detect(frame)?;
        if detections.iter().any(|d| !(0.0..=1.0).contains(&d.confidence)) {
            warn!("⚠️ {} reported confidence outside [0, 1]", self.detector.name());
        }
        debug!(
            "🔍 Frame #{}: {} labelled detections",
            frame.frame_number,
            detections.len()
        );
        Ok(Some(self.catalog.verdict(&detections)))
    }
}
