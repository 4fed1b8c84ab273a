use serde::{Deserialize, Serialize};

pub const NO_OBJECTS_STATUS: &str = "❌ No objects detected - try adjusting camera angle or lighting";

/// 检测结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionVerdict {
    pub trash_detected: bool,
    pub trash_items: Vec<String>,
    pub normal_items: Vec<String>,
    pub all_labels: Vec<String>,
}

impl DetectionVerdict {
    /// 去重键
    pub fn key(&self) -> String {
        self.all_labels.join(",")
    }

    /// 未识别到物体，继续扫描
    pub fn is_empty(&self) -> bool {
        self.all_labels.is_empty()
    }

    /// 状态文本
    pub fn summary(&self) -> String {
        if self.trash_detected {
            format!("🗑️ Trash detected: {}", self.trash_items.join(", "))
        } else if !self.normal_items.is_empty() {
            format!("✅ Normal items detected: {}", self.normal_items.join(", "))
        } else if !self.all_labels.is_empty() {
            format!("🔍 Objects detected: {}", self.all_labels.join(", "))
        } else {
            NO_OBJECTS_STATUS.to_string()
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct VerdictBuilder {
    verdict: DetectionVerdict,
}

impl VerdictBuilder {
    pub(crate) fn normal(&mut self, item: &str) {
        self.normal_as(item, item);
    }

    /// 标签与物品名不同的正常物品
    pub(crate) fn normal_as(&mut self, item: &str, label: &str) {
        self.verdict.normal_items.push(item.to_string());
        self.verdict.all_labels.push(format!("{} detected", label));
    }

    pub(crate) fn trash(&mut self, item: &str) {
        self.verdict.trash_detected = true;
        self.verdict.trash_items.push(item.to_string());
        self.verdict.all_labels.push(format!("{} detected", item));
    }

    /// 既不是垃圾也不是正常物品
    pub(crate) fn unclassified(&mut self, label: &str) {
        self.verdict.all_labels.push(format!("{} detected", label));
    }

    pub(crate) fn has_normal(&self) -> bool {
        !self.verdict.normal_items.is_empty()
    }

    pub(crate) fn build(self) -> DetectionVerdict {
        self.verdict
    }
}
