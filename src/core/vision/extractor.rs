use log::{debug, trace};

use super::error::DetectionError;
use super::features::{Feature, RawAnalysis};
use super::frame::Frame;
use super::palette::{FeaturePalette, Rgb};

/// 默认采样步长：每 40 个像素（RGBA 160 字节）
pub const DEFAULT_SAMPLE_STRIDE: usize = 40;

pub trait FeatureExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// 按特征统计采样像素
    fn extract(&self, frame: &Frame) -> Result<RawAnalysis, DetectionError>;
}

/// 当前采样前后相邻采样的 R 通道
///
/// 按遍历顺序取相邻*采样*，不是空间相邻像素（步长可能跨行）
#[derive(Debug, Clone, Copy)]
struct Neighbours {
    prev2: Option<i16>,
    prev1: Option<i16>,
    next1: Option<i16>,
    next2: Option<i16>,
}

impl Neighbours {
    fn around(data: &[u8], stride: usize, total: usize, k: usize) -> Self {
        let red = |idx: Option<usize>| {
            idx.filter(|&j| j < total)
                .map(|j| data[j * stride * 4] as i16)
        };
        Self {
            prev2: red(k.checked_sub(2)),
            prev1: red(k.checked_sub(1)),
            next1: red(Some(k + 1)),
            next2: red(Some(k + 2)),
        }
    }

    fn direct(&self) -> Option<(i16, i16)> {
        Some((self.prev1?, self.next1?))
    }

    fn both_sides(&self) -> Option<(i16, i16, i16, i16)> {
        Some((self.prev2?, self.prev1?, self.next1?, self.next2?))
    }
}

pub struct PixelHeuristicExtractor {
    sample_stride: usize,
    palette: FeaturePalette,
}

impl PixelHeuristicExtractor {
    pub fn new() -> Self {
        Self {
            sample_stride: DEFAULT_SAMPLE_STRIDE,
            palette: FeaturePalette::default(),
        }
    }

    pub fn with_config(sample_stride: usize, palette: FeaturePalette) -> Result<Self, DetectionError> {
        if sample_stride < 2 {
            return Err(DetectionError::Config(format!(
                "sample stride must be at least 2 pixels, got {}",
                sample_stride
            )));
        }
        palette.validate()?;
        Ok(Self {
            sample_stride,
            palette,
        })
    }

    pub fn sample_stride(&self) -> usize {
        self.sample_stride
    }

    /// `pixel_count` 个像素对应的采样数
    pub fn samples_for(&self, pixel_count: usize) -> usize {
        pixel_count.div_ceil(self.sample_stride)
    }

    fn accumulate(&self, analysis: &mut RawAnalysis, px: Rgb, around: Neighbours) {
        let p = &self.palette;
        let t = &p.texture;
        let r = px.r as i16;

        let colour_buckets = [
            (Feature::EmptySurface, &p.empty_surface),
            (Feature::ObjectContent, &p.object_content),
            (Feature::RedLabel, &p.red_label),
            (Feature::BottleCap, &p.bottle_cap),
            (Feature::FrontViewBottle, &p.front_view_bottle),
            (Feature::ReflectiveSurface, &p.reflective_surface),
            (Feature::TransparentBottle, &p.transparent_bottle),
            (Feature::PlasticBottle, &p.plastic_bottle),
            (Feature::SkinTone, &p.skin_tone),
            (Feature::Fabric, &p.fabric),
            (Feature::Clothing, &p.clothing),
        ];
        for (feature, rule) in colour_buckets {
            if rule.matches(px) {
                analysis.increment(feature);
            }
        }

        if p.bottle_body.matches(px) {
            if let Some((prev2, prev1, next1, next2)) = around.both_sides() {
                let vertical =
                    (r - prev1).abs() < t.shape_tolerance && (r - next1).abs() < t.shape_tolerance;
                let run = (prev1 - prev2).abs() < t.shape_run_tolerance
                    && (next1 - next2).abs() < t.shape_run_tolerance;
                if vertical || run {
                    analysis.increment(Feature::BottleShape);
                }
            }
        }

        if p.trash_color.matches(px) {
            analysis.increment(Feature::ActualTrash);
            if let Some((prev1, next1)) = around.direct() {
                if (r - prev1).abs() > t.trash_contrast || (r - next1).abs() > t.trash_contrast {
                    analysis.increment(Feature::TrashTexture);
                }
            }
        }

        if p.paper_color.matches(px) {
            analysis.increment(Feature::CrumpledPaper);
            if let Some((prev2, prev1, next1, next2)) = around.both_sides() {
                let edge = (r - prev1).abs() > t.paper_edge || (r - next1).abs() > t.paper_edge;
                let ripple = (prev1 - prev2).abs() > t.paper_ripple
                    || (next1 - next2).abs() > t.paper_ripple;
                if edge && ripple {
                    analysis.increment(Feature::PaperTexture);
                }
            }
        }
    }
}

impl Default for PixelHeuristicExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureExtractor for PixelHeuristicExtractor {
    fn name(&self) -> &'static str {
        "pixel-heuristic"
    }

    fn extract(&self, frame: &Frame) -> Result<RawAnalysis, DetectionError> {
        frame.validate()?;

        let stride = self.sample_stride;
        let total = self.samples_for(frame.pixel_count());
        let total_samples = u32::try_from(total).map_err(|_| {
            DetectionError::Extraction(format!("{} samples overflow the counter", total))
        })?;

        let data = &frame.data;
        let mut analysis = RawAnalysis::empty(total_samples);

        for k in 0..total {
            let i = k * stride * 4;
            let px = Rgb::new(data[i], data[i + 1], data[i + 2]);
            let around = Neighbours::around(data, stride, total, k);
            self.accumulate(&mut analysis, px, around);
        }

        debug!(
            "🔍 Frame #{} {}x{}: {} samples, red label {}, front view {}, cap {}, reflective {}",
            frame.frame_number,
            frame.width,
            frame.height,
            total_samples,
            analysis.count(Feature::RedLabel),
            analysis.count(Feature::FrontViewBottle),
            analysis.count(Feature::BottleCap),
            analysis.count(Feature::ReflectiveSurface),
        );
        trace!("raw analysis: {:?}", analysis);

        Ok(analysis)
    }
}

type AnalysisPattern = Box<dyn Fn(&Frame) -> Result<RawAnalysis, DetectionError> + Send + Sync>;

/// 返回预设结果的提取器（演示和测试用）
pub struct FixedExtractor {
    pattern: AnalysisPattern,
}

impl FixedExtractor {
    pub fn constant(analysis: RawAnalysis) -> Self {
        Self {
            pattern: Box::new(move |_| Ok(analysis.clone())),
        }
    }

    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&Frame) -> Result<RawAnalysis, DetectionError> + Send + Sync + 'static,
    {
        Self {
            pattern: Box::new(pattern),
        }
    }
}

impl FeatureExtractor for FixedExtractor {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn extract(&self, frame: &Frame) -> Result<RawAnalysis, DetectionError> {
        (self.pattern)(frame)
    }
}
