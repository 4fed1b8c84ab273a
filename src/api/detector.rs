//! 垃圾检测器 - 单帧检测

use std::sync::Mutex;

use flutter_rust_bridge::frb;
use log::{error, info};
use serde::{Deserialize, Serialize};

use crate::api::models::{
    DetectedLabel, FeatureReport, FrameReport, RgbaFrameData, StatsReport, VerdictReport,
    YuvFrameData,
};
use crate::core::vision::{
    CalibrationReport, Calibrator, DetectionError, DetectionPipeline, DetectorConfig, Frame,
    HeuristicAnalyzer, LabeledDetection, PixelHeuristicExtractor,
};

/// 检测器错误类型，FRB 友好的设计
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorApiError {
    pub error_type: String,
    pub message: String,
}

impl DetectorApiError {
    pub(crate) fn new(error_type: &str, message: impl Into<String>) -> Self {
        Self {
            error_type: error_type.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn lock_poisoned() -> Self {
        Self::new("Internal", "detector state lock poisoned")
    }
}

impl From<DetectionError> for DetectorApiError {
    fn from(e: DetectionError) -> Self {
        let error_type = match &e {
            DetectionError::FrameNotReady => "FrameNotReady",
            DetectionError::InvalidFrame { .. } => "InvalidFrame",
            DetectionError::InvalidAnalysis(_) => "InvalidAnalysis",
            DetectionError::Extraction(_) => "Extraction",
            DetectionError::Session(_) => "Session",
            DetectionError::Config(_) | DetectionError::Json(_) => "Config",
            DetectionError::Io(_) => "Io",
            DetectionError::Image(_) => "Image",
        };
        Self::new(error_type, e.to_string())
    }
}

impl std::fmt::Display for DetectorApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.error_type, self.message)
    }
}

impl std::error::Error for DetectorApiError {}

/// 垃圾检测器 - 像素启发式 + 重复抑制
///
/// ```dart
/// final detector = TrashDetector.create(configJson: null);
/// final report = detector.analyzeFrame(frame: rgbaFrame);
/// final stats = detector.stats;
/// ```
#[frb(opaque)]
pub struct TrashDetector {
    config: DetectorConfig,
    pipeline: Mutex<DetectionPipeline>,
    inspector: HeuristicAnalyzer,
}

impl TrashDetector {
    /// 创建检测器，`config_json` 可省略任意字段，`None` 使用默认配置
    #[frb(sync)]
    pub fn create(config_json: Option<String>) -> Result<Self, DetectorApiError> {
        crate::init_logging();

        let config = match config_json {
            Some(json) => DetectorConfig::from_json_str(&json)?,
            None => DetectorConfig::default(),
        };
        let pipeline = DetectionPipeline::from_config(&config)?;
        let inspector = HeuristicAnalyzer::with_parts(
            Box::new(PixelHeuristicExtractor::with_config(
                config.sample_stride,
                config.palette.clone(),
            )?),
            config.thresholds.clone(),
            config.policy,
        )?;

        info!("🗑️ TrashDetector: created");
        Ok(Self {
            config,
            pipeline: Mutex::new(pipeline),
            inspector,
        })
    }

    fn process(&self, frame: Frame) -> Result<FrameReport, DetectorApiError> {
        let frame_number = frame.frame_number;
        let mut pipeline = self
            .pipeline
            .lock()
            .map_err(|_| DetectorApiError::lock_poisoned())?;
        match pipeline.process_frame(&frame) {
            Ok(outcome) => Ok(FrameReport::new(frame_number, outcome)),
            Err(e) => {
                error!("❌ Frame #{} failed: {}", frame_number, e);
                Err(e.into())
            }
        }
    }

    /// 检测 RGBA 帧（与上一结果相同时返回 Suppressed）
    #[frb]
    pub fn analyze_frame(&self, frame: RgbaFrameData) -> Result<FrameReport, DetectorApiError> {
        self.process(frame.into_frame()?)
    }

    #[frb]
    pub fn analyze_yuv_frame(&self, frame: YuvFrameData) -> Result<FrameReport, DetectorApiError> {
        self.process(frame.into_frame()?)
    }

    /// 解码图片文件（jpeg/png/bmp）并检测
    #[frb(dart_async)]
    pub async fn analyze_image_file(&self, path: String) -> Result<FrameReport, DetectorApiError> {
        info!("🖼️ Loading image: {}", path);
        let frame = Frame::open(&path, 0)?;
        self.process(frame)
    }

    /// 获取单帧的原始计数和特征标志，不影响去重缓存
    #[frb]
    pub fn inspect_frame(&self, frame: RgbaFrameData) -> Result<FeatureReport, DetectorApiError> {
        let frame = frame.into_frame()?;
        Ok(self.inspector.inspect(&frame)?.into())
    }

    /// 用配置的标签目录对宿主端目标检测结果分类
    /// 无状态，不经过去重缓存
    #[frb(sync)]
    pub fn classify_labels(&self, detections: Vec<DetectedLabel>) -> VerdictReport {
        let detections: Vec<LabeledDetection> = detections.into_iter().map(Into::into).collect();
        self.config.labels.verdict(&detections).into()
    }

    #[frb]
    pub fn calibrate(&self, frames: Vec<RgbaFrameData>) -> Result<CalibrationReport, DetectorApiError> {
        let frames = frames
            .into_iter()
            .map(RgbaFrameData::into_frame)
            .collect::<Result<Vec<_>, _>>()?;
        let extractor =
            PixelHeuristicExtractor::with_config(self.config.sample_stride, self.config.palette.clone())?;
        let calibrator = Calibrator::new(extractor, self.config.thresholds.clone())?;
        Ok(calibrator.calibrate(&frames))
    }

    #[frb(sync, getter)]
    pub fn stats(&self) -> StatsReport {
        self.pipeline
            .lock()
            .map(|p| p.stats().into())
            .unwrap_or_default()
    }

    #[frb(sync, getter)]
    pub fn config_json(&self) -> Result<String, DetectorApiError> {
        Ok(self.config.to_json_string()?)
    }

    /// 重置状态（去重缓存 + 统计）
    #[frb(sync)]
    pub fn reset(&self) {
        if let Ok(mut pipeline) = self.pipeline.lock() {
            pipeline.reset();
        }
    }
}

impl Drop for TrashDetector {
    fn drop(&mut self) {
        info!("🗑️ TrashDetector: released");
    }
}
