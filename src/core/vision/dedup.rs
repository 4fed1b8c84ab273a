use log::debug;

use super::verdict::DetectionVerdict;

/// 结果去重 - 记住上次上报的标签键，丢弃完全相同的结果
#[derive(Debug, Default)]
pub struct VerdictGate {
    last_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateDecision {
    pub suppressed: bool,
    pub reason: GateReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateReason {
    /// 标签与缓存不同
    NewScene,
    /// 未识别到任何物体，不算重复
    EmptyScene,
    /// 与上次标签相同
    Repeat,
}

impl VerdictGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_key(&self) -> &str {
        &self.last_key
    }

    /// 与缓存比较，通过时更新缓存
    pub fn check(&mut self, verdict: &DetectionVerdict) -> GateDecision {
        let key = verdict.key();

        if key.is_empty() {
            self.last_key.clear();
            return GateDecision {
                suppressed: false,
                reason: GateReason::EmptyScene,
            };
        }

        if key == self.last_key {
            debug!("🔁 Same labels as last cycle, suppressed: {}", key);
            return GateDecision {
                suppressed: true,
                reason: GateReason::Repeat,
            };
        }

        self.last_key = key;
        GateDecision {
            suppressed: false,
            reason: GateReason::NewScene,
        }
    }

    /// 非重复时返回结果
    pub fn admit(&mut self, verdict: DetectionVerdict) -> Option<DetectionVerdict> {
        if self.check(&verdict).suppressed {
            None
        } else {
            Some(verdict)
        }
    }

    pub fn reset(&mut self) {
        self.last_key.clear();
    }
}
