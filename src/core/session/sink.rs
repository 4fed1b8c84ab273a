//! 检测循环与宿主的边界：帧来源，以及状态和提醒的去向

use std::sync::{Arc, Mutex};

use log::{info, warn};
use tokio::sync::mpsc;

use crate::core::vision::{DetectionError, Frame};

pub trait FrameSource: Send + Sync {
    /// 相机还没有帧时返回 `Ok(None)`
    fn capture(&self) -> Result<Option<Frame>, DetectionError>;
}

impl<F> FrameSource for F
where
    F: Fn() -> Result<Option<Frame>, DetectionError> + Send + Sync,
{
    fn capture(&self) -> Result<Option<Frame>, DetectionError> {
        self()
    }
}

/// 最新帧槽位 - 相机回调写入，每轮读取
#[derive(Debug, Clone, Default)]
pub struct SharedFrameSlot {
    latest: Arc<Mutex<Option<Frame>>>,
}

impl SharedFrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 覆盖等待中的帧
    pub fn push(&self, frame: Frame) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = Some(frame);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut latest) = self.latest.lock() {
            *latest = None;
        }
    }

    pub fn has_frame(&self) -> bool {
        self.latest.lock().map(|f| f.is_some()).unwrap_or(false)
    }
}

impl FrameSource for SharedFrameSlot {
    fn capture(&self) -> Result<Option<Frame>, DetectionError> {
        self.latest
            .lock()
            .map(|latest| latest.clone())
            .map_err(|_| DetectionError::FrameNotReady)
    }
}

pub trait AlertSink: Send + Sync {
    fn on_trash(&self, items: &[String]);
}

impl<F> AlertSink for F
where
    F: Fn(&[String]) + Send + Sync,
{
    fn on_trash(&self, items: &[String]) {
        self(items)
    }
}

pub trait StatusSink: Send + Sync {
    fn on_status(&self, status: &str);
}

impl<F> StatusSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn on_status(&self, status: &str) {
        self(status)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Status(String),
    Trash(Vec<String>),
}

/// 按顺序把状态和提醒转发给异步消费者
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl ChannelSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SessionEvent) {
        if self.tx.send(event).is_err() {
            warn!("⚠️ Session event dropped: receiver closed");
        }
    }
}

impl AlertSink for ChannelSink {
    fn on_trash(&self, items: &[String]) {
        self.send(SessionEvent::Trash(items.to_vec()));
    }
}

impl StatusSink for ChannelSink {
    fn on_status(&self, status: &str) {
        self.send(SessionEvent::Status(status.to_string()));
    }
}

/// 无音频宿主使用：提醒和状态写入日志
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingAlertSink;

impl AlertSink for LoggingAlertSink {
    fn on_trash(&self, items: &[String]) {
        info!("🔊 Please throw the trash ({})", items.join(", "));
    }
}

impl StatusSink for LoggingAlertSink {
    fn on_status(&self, status: &str) {
        info!("📟 {}", status);
    }
}
