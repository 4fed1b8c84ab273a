use serde::{Deserialize, Serialize};

use crate::core::session::SessionEvent;
use crate::core::vision::{
    DetectionError, DetectionVerdict, DetectorStats, Feature, FrameInspection, Frame,
    LabeledDetection, PipelineOutcome, RawFrame, SkipReason,
};

/// 宿主相机层传入的 RGBA 帧
#[derive(Debug, Clone)]
pub struct RgbaFrameData {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl RgbaFrameData {
    pub(crate) fn into_frame(self) -> Result<Frame, DetectionError> {
        Frame::from_rgba(
            self.width,
            self.height,
            self.data,
            self.timestamp_ms,
            self.frame_number,
        )
    }
}

/// I420 平面格式帧（移动端相机常用）
#[derive(Debug, Clone)]
pub struct YuvFrameData {
    pub width: u32,
    pub height: u32,
    pub y_plane: Vec<u8>,
    pub u_plane: Vec<u8>,
    pub v_plane: Vec<u8>,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl YuvFrameData {
    pub(crate) fn into_frame(self) -> Result<Frame, DetectionError> {
        RawFrame {
            width: self.width,
            height: self.height,
            y_plane: self.y_plane,
            u_plane: self.u_plane,
            v_plane: self.v_plane,
            timestamp_ms: self.timestamp_ms,
            frame_number: self.frame_number,
        }
        .to_rgba()
    }
}

/// 宿主端检测模型给出的单个目标
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedLabel {
    pub label: String,
    pub confidence: f32,
}

impl From<DetectedLabel> for LabeledDetection {
    fn from(d: DetectedLabel) -> Self {
        LabeledDetection::new(d.label, d.confidence)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerdictReport {
    pub trash_detected: bool,
    pub trash_items: Vec<String>,
    pub normal_items: Vec<String>,
    pub all_labels: Vec<String>,
    pub summary: String,
}

impl From<DetectionVerdict> for VerdictReport {
    fn from(verdict: DetectionVerdict) -> Self {
        let summary = verdict.summary();
        Self {
            trash_detected: verdict.trash_detected,
            trash_items: verdict.trash_items,
            normal_items: verdict.normal_items,
            all_labels: verdict.all_labels,
            summary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrameOutcome {
    /// 新结果
    Reported,
    /// 与上一帧标签相同
    Suppressed,
    /// 空帧
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameReport {
    pub frame_number: u64,
    pub outcome: FrameOutcome,
    pub verdict: Option<VerdictReport>,
}

impl FrameReport {
    pub(crate) fn new(frame_number: u64, outcome: PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Reported(verdict) => Self {
                frame_number,
                outcome: FrameOutcome::Reported,
                verdict: Some(verdict.into()),
            },
            PipelineOutcome::Suppressed => Self {
                frame_number,
                outcome: FrameOutcome::Suppressed,
                verdict: None,
            },
            PipelineOutcome::Skipped(SkipReason::EmptyFrame | SkipReason::NotReady) => Self {
                frame_number,
                outcome: FrameOutcome::Skipped,
                verdict: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureReading {
    pub feature: String,
    pub count: u32,
    pub fraction: f32,
    pub present: bool,
}

/// 单帧各特征明细，用于真机调参
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureReport {
    pub total_samples: u32,
    pub readings: Vec<FeatureReading>,
    pub verdict: Option<VerdictReport>,
}

impl From<FrameInspection> for FeatureReport {
    fn from(inspection: FrameInspection) -> Self {
        let readings = Feature::ALL
            .into_iter()
            .map(|f| FeatureReading {
                feature: f.key().to_string(),
                count: inspection.raw.count(f),
                fraction: inspection.raw.fraction(f).unwrap_or(0.0),
                present: inspection.classified.has(f),
            })
            .collect();
        Self {
            total_samples: inspection.raw.total_samples(),
            readings,
            verdict: inspection.verdict.map(Into::into),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub processed_frames: u64,
    pub reported_verdicts: u64,
    pub suppressed_verdicts: u64,
    pub skipped_frames: u64,
    pub trash_verdicts: u64,
    pub failed_frames: u64,
}

impl From<DetectorStats> for StatsReport {
    fn from(stats: DetectorStats) -> Self {
        Self {
            processed_frames: stats.processed_frames,
            reported_verdicts: stats.reported_verdicts,
            suppressed_verdicts: stats.suppressed_verdicts,
            skipped_frames: stats.skipped_frames,
            trash_verdicts: stats.trash_verdicts,
            failed_frames: stats.failed_frames,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiveEvent {
    Status { message: String },
    TrashAlert { items: Vec<String> },
}

impl From<SessionEvent> for LiveEvent {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::Status(message) => LiveEvent::Status { message },
            SessionEvent::Trash(items) => LiveEvent::TrashAlert { items },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_report_from_outcome() {
        let verdict = DetectionVerdict {
            trash_detected: true,
            trash_items: vec!["crumpled paper".into()],
            normal_items: vec![],
            all_labels: vec!["crumpled paper detected".into()],
        };
        let report = FrameReport::new(7, PipelineOutcome::Reported(verdict));
        assert_eq!(report.outcome, FrameOutcome::Reported);
        assert_eq!(
            report.verdict.unwrap().summary,
            "🗑️ Trash detected: crumpled paper"
        );

        let report = FrameReport::new(8, PipelineOutcome::Skipped(SkipReason::EmptyFrame));
        assert_eq!(report.outcome, FrameOutcome::Skipped);
        assert!(report.verdict.is_none());
    }

    #[test]
    fn test_yuv_conversion_checks_planes() {
        let frame = YuvFrameData {
            width: 2,
            height: 2,
            y_plane: vec![128; 4],
            u_plane: vec![128; 1],
            v_plane: vec![],
            timestamp_ms: 0,
            frame_number: 0,
        };
        assert!(frame.into_frame().is_err());
    }

    #[test]
    fn test_live_event_mapping() {
        assert_eq!(
            LiveEvent::from(SessionEvent::Trash(vec!["bottle".into()])),
            LiveEvent::TrashAlert {
                items: vec!["bottle".into()]
            }
        );
    }
}
