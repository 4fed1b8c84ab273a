pub mod detection;

pub use detection::{
    DetectedLabel, FeatureReading, FeatureReport, FrameOutcome, FrameReport, LiveEvent, RgbaFrameData,
    StatsReport, VerdictReport, YuvFrameData,
};
