//! 周期检测循环 - 每个间隔取一帧、分类并通知宿主

pub mod driver;
pub mod sink;

pub use driver::{DetectionSession, SessionHandle, STATUS_ACTIVE, STATUS_ERROR, STATUS_PAUSED};
pub use sink::{
    AlertSink, ChannelSink, FrameSource, LoggingAlertSink, SessionEvent, SharedFrameSlot,
    StatusSink,
};
