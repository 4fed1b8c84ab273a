use std::fs;
use std::path::Path;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

use super::error::DetectionError;
use super::extractor::DEFAULT_SAMPLE_STRIDE;
use super::labels::LabelCatalog;
use super::palette::FeaturePalette;
use super::policy::DecisionPolicy;
use super::thresholds::ThresholdTable;

pub const DEFAULT_INTERVAL_MS: u64 = 3000;
/// 最小检测间隔
pub const MIN_INTERVAL_MS: u64 = 100;

/// 检测器配置，可从 JSON 加载，缺省字段使用默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DetectorConfig {
    /// 采样步长（像素）
    pub sample_stride: usize,
    pub palette: FeaturePalette,
    pub thresholds: ThresholdTable,
    pub policy: DecisionPolicy,
    pub labels: LabelCatalog,
    pub interval_ms: u64,
    pub alerts_enabled: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sample_stride: DEFAULT_SAMPLE_STRIDE,
            palette: FeaturePalette::default(),
            thresholds: ThresholdTable::default(),
            policy: DecisionPolicy::default(),
            labels: LabelCatalog::default(),
            interval_ms: DEFAULT_INTERVAL_MS,
            alerts_enabled: true,
        }
    }
}

impl DetectorConfig {
    /// 近距离：采样更密，检测更频繁
    pub fn for_close_range() -> Self {
        Self {
            sample_stride: 20,
            interval_ms: 1500,
            ..Self::default()
        }
    }

    pub fn for_low_power() -> Self {
        Self {
            sample_stride: 80,
            interval_ms: 5000,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, DetectionError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, DetectionError> {
        let path = path.as_ref();
        let config = Self::from_json_str(&fs::read_to_string(path)?)?;
        info!("📄 Loaded detector config from {}", path.display());
        Ok(config)
    }

    pub fn to_json_string(&self) -> Result<String, DetectionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), DetectionError> {
        if self.sample_stride < 2 {
            return Err(DetectionError::Config(format!(
                "sample stride must be at least 2 pixels, got {}",
                self.sample_stride
            )));
        }
        if self.interval_ms < MIN_INTERVAL_MS {
            return Err(DetectionError::Config(format!(
                "interval must be at least {} ms, got {}",
                MIN_INTERVAL_MS, self.interval_ms
            )));
        }
        self.palette.validate()?;
        self.thresholds.validate()?;
        self.labels.validate()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vision::features::Feature;

    #[test]
    fn test_defaults_validate() {
        assert!(DetectorConfig::default().validate().is_ok());
        assert!(DetectorConfig::for_close_range().validate().is_ok());
        assert!(DetectorConfig::for_low_power().validate().is_ok());
        assert_eq!(DetectorConfig::default().interval(), Duration::from_millis(3000));
    }

    #[test]
    fn test_json_round_trip_of_defaults() {
        let config = DetectorConfig::default();
        let json = config.to_json_string().unwrap();
        assert_eq!(DetectorConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_partial_json() {
        let config = DetectorConfig::from_json_str(
            r#"{ "sampleStride": 10, "thresholds": { "fabric": 0.3 }, "alertsEnabled": false }"#,
        )
        .unwrap();
        assert_eq!(config.sample_stride, 10);
        assert_eq!(config.thresholds.get(Feature::Fabric), 0.3);
        assert_eq!(config.thresholds.get(Feature::SkinTone), 0.04);
        assert!(!config.alerts_enabled);
        assert_eq!(config.interval_ms, DEFAULT_INTERVAL_MS);
    }

    #[test]
    fn test_validation_failures() {
        assert!(matches!(
            DetectorConfig::from_json_str(r#"{ "sampleStride": 1 }"#),
            Err(DetectionError::Config(_))
        ));
        assert!(matches!(
            DetectorConfig::from_json_str(r#"{ "intervalMs": 10 }"#),
            Err(DetectionError::Config(_))
        ));
        assert!(matches!(
            DetectorConfig::from_json_str(r#"{ "thresholds": { "clothing": 1.2 } }"#),
            Err(DetectionError::Config(_))
        ));
        assert!(matches!(
            DetectorConfig::from_json_str("{ not json"),
            Err(DetectionError::Json(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            DetectorConfig::load("/nonexistent/trash_watch.json"),
            Err(DetectionError::Io(_))
        ));
    }
}
