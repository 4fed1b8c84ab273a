//! 帧分类引擎 - 判断画面中是垃圾还是正常物品
//!
//! 1. 特征提取 - 按步长采样像素，统计颜色/纹理特征
//! 2. 阈值表 - 特征占比转换为 `has<Feature>` 标志
//! 3. 决策规则 - 标志转换为垃圾/正常物品结果
//! 4. 结果去重 - 相同结果只上报一次

pub mod analyzer;
pub mod calibration;
pub mod config;
pub mod dedup;
pub mod error;
pub mod extractor;
pub mod features;
pub mod frame;
pub mod labels;
pub mod palette;
pub mod pipeline;
pub mod policy;
pub mod thresholds;
pub mod verdict;

pub use analyzer::{FrameInspection, HeuristicAnalyzer, LabelAnalyzer, SceneAnalyzer};
pub use calibration::{CalibrationReport, Calibrator, FeatureStats};
pub use config::DetectorConfig;
pub use dedup::{GateDecision, GateReason, VerdictGate};
pub use error::DetectionError;
pub use extractor::{FeatureExtractor, FixedExtractor, PixelHeuristicExtractor};
pub use features::{ClassifiedAnalysis, Feature, RawAnalysis};
pub use frame::{Frame, RawFrame};
pub use labels::{LabelCatalog, LabelKind, LabeledDetection, MockObjectDetector, ObjectDetector};
pub use palette::FeaturePalette;
pub use pipeline::{DetectionPipeline, DetectorStats, PipelineOutcome, SkipReason};
pub use policy::DecisionPolicy;
pub use thresholds::ThresholdTable;
pub use verdict::DetectionVerdict;
