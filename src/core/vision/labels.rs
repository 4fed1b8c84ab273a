//! 标签分类 - 用于目标检测模型的输出
//!
//! 检测模型给出标签（"bottle"、"person" 等），目录将其分为垃圾和正常物品，
//! 规则与像素路径一致：出现正常物品时不报垃圾

use serde::{Deserialize, Serialize};

use super::error::DetectionError;
use super::frame::Frame;
use super::verdict::{DetectionVerdict, VerdictBuilder};

/// 包含即视为垃圾
const TRASH_MARKERS: [&str; 7] = ["bottle", "paper", "tissue", "cup", "can", "wrapper", "container"];
/// 包含即不算正常物品
const NEVER_NORMAL: [&str; 2] = ["bottle", "container"];

#[derive(Debug, Clone, PartialEq)]
pub struct LabeledDetection {
    pub label: String,
    pub confidence: f32,
}

impl LabeledDetection {
    pub fn new(label: impl Into<String>, confidence: f32) -> Self {
        Self {
            label: label.into(),
            confidence,
        }
    }
}

pub trait ObjectDetector: Send + Sync {
    fn name(&self) -> &'static str;

    fn detect(&self, frame: &Frame) -> Result<Vec<LabeledDetection>, DetectionError>;
}

type DetectionPattern = Box<dyn Fn(&Frame) -> Vec<LabeledDetection> + Send + Sync>;

/// Mock 检测器，按帧返回预设标签
pub struct MockObjectDetector {
    pattern: DetectionPattern,
}

impl MockObjectDetector {
    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: Fn(&Frame) -> Vec<LabeledDetection> + Send + Sync + 'static,
    {
        Self {
            pattern: Box::new(pattern),
        }
    }
}

impl ObjectDetector for MockObjectDetector {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<LabeledDetection>, DetectionError> {
        Ok((self.pattern)(frame))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
    Trash,
    Normal,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LabelCatalog {
    pub trash_keywords: Vec<String>,
    pub normal_keywords: Vec<String>,
    /// 低于此置信度的结果被忽略
    pub min_confidence: f32,
}

fn owned(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}

impl Default for LabelCatalog {
    fn default() -> Self {
        Self {
            trash_keywords: owned(&[
                "bottle",
                "plastic bottle",
                "water bottle",
                "paper",
                "tissue",
                "napkin",
                "cup",
                "can",
                "container",
                "wrapper",
                "bag",
                "plastic bag",
                "food container",
                "package",
                "cigarette",
                "cigar",
            ]),
            normal_keywords: owned(&[
                "person",
                "hand",
                "finger",
                "shoe",
                "sneaker",
                "boot",
                "bag",
                "backpack",
                "purse",
                "book",
                "notebook",
                "books",
                "phone",
                "cell phone",
                "mobile phone",
                "keys",
                "wallet",
                "clothing",
                "shirt",
                "jacket",
            ]),
            min_confidence: 0.5,
        }
    }
}

impl LabelCatalog {
    pub fn is_trash(&self, label: &str) -> bool {
        let lower = label.to_lowercase();
        TRASH_MARKERS.iter().any(|m| lower.contains(m))
            || self.trash_keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    pub fn is_normal(&self, label: &str) -> bool {
        let lower = label.to_lowercase();
        if NEVER_NORMAL.iter().any(|m| lower.contains(m)) {
            return false;
        }
        lower.contains("book") || self.normal_keywords.iter().any(|k| lower.contains(k.as_str()))
    }

    /// 同时命中两个列表时按垃圾处理
    pub fn kind(&self, label: &str) -> LabelKind {
        if self.is_trash(label) {
            LabelKind::Trash
        } else if self.is_normal(label) {
            LabelKind::Normal
        } else {
            LabelKind::Unknown
        }
    }

    pub fn verdict(&self, detections: &[LabeledDetection]) -> DetectionVerdict {
        let mut trash: Vec<&str> = Vec::new();
        let mut normal: Vec<&str> = Vec::new();
        let mut unknown: Vec<&str> = Vec::new();

        for d in detections.iter().filter(|d| d.confidence >= self.min_confidence) {
            let bucket = match self.kind(&d.label) {
                LabelKind::Trash => &mut trash,
                LabelKind::Normal => &mut normal,
                LabelKind::Unknown => &mut unknown,
            };
            if !bucket.contains(&d.label.as_str()) {
                bucket.push(d.label.as_str());
            }
        }

        let mut verdict = VerdictBuilder::default();
        for label in &normal {
            verdict.normal(label);
        }
        if normal.is_empty() {
            for label in &trash {
                verdict.trash(label);
            }
        }
        for label in &unknown {
            verdict.unclassified(label);
        }
        verdict.build()
    }

    pub fn validate(&self) -> Result<(), DetectionError> {
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(DetectionError::Config(format!(
                "min confidence must be within [0, 1], got {}",
                self.min_confidence
            )));
        }
        if self
            .trash_keywords
            .iter()
            .chain(&self.normal_keywords)
            .any(|k| k.trim().is_empty())
        {
            return Err(DetectionError::Config("empty label keyword".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_kinds() {
        let catalog = LabelCatalog::default();
        assert_eq!(catalog.kind("Water Bottle"), LabelKind::Trash);
        assert_eq!(catalog.kind("cup"), LabelKind::Trash);
        assert_eq!(catalog.kind("person"), LabelKind::Normal);
        assert_eq!(catalog.kind("notebook"), LabelKind::Normal);
        assert_eq!(catalog.kind("handbag"), LabelKind::Trash);
        assert_eq!(catalog.kind("dog"), LabelKind::Unknown);
        assert!(!catalog.is_normal("bottle"));
    }

    #[test]
    fn test_verdict_normal_vetoes_trash() {
        let catalog = LabelCatalog::default();
        let verdict = catalog.verdict(&[
            LabeledDetection::new("bottle", 0.9),
            LabeledDetection::new("person", 0.8),
        ]);
        assert!(!verdict.trash_detected);
        assert_eq!(verdict.normal_items, vec!["person"]);
        assert_eq!(verdict.all_labels, vec!["person detected"]);
    }

    #[test]
    fn test_verdict_trash_and_unknown() {
        let catalog = LabelCatalog::default();
        let verdict = catalog.verdict(&[
            LabeledDetection::new("bottle", 0.9),
            LabeledDetection::new("bottle", 0.7),
            LabeledDetection::new("dog", 0.9),
            LabeledDetection::new("cup", 0.2),
        ]);
        assert!(verdict.trash_detected);
        assert_eq!(verdict.trash_items, vec!["bottle"]);
        assert_eq!(verdict.all_labels, vec!["bottle detected", "dog detected"]);
    }

    #[test]
    fn test_validate() {
        let mut catalog = LabelCatalog::default();
        assert!(catalog.validate().is_ok());
        catalog.min_confidence = 1.5;
        assert!(catalog.validate().is_err());

        let mut catalog = LabelCatalog::default();
        catalog.normal_keywords.push("  ".into());
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_mock_detector() {
        let detector = MockObjectDetector::with_pattern(|frame| {
            if frame.frame_number % 2 == 0 {
                vec![LabeledDetection::new("can", 0.9)]
            } else {
                vec![]
            }
        });
        let even = Frame::new(0, 0, vec![], 0, 2);
        let odd = Frame::new(0, 0, vec![], 0, 3);
        assert_eq!(detector.detect(&even).unwrap().len(), 1);
        assert!(detector.detect(&odd).unwrap().is_empty());
    }
}
