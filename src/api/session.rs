//! 实时检测 - 宿主推送相机帧，会话按间隔检测最新帧

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use flutter_rust_bridge::frb;
use log::{error, info, warn};
use tokio::runtime::Runtime;
use tokio::sync::mpsc::UnboundedReceiver;

use super::detector::DetectorApiError;
use crate::api::models::{LiveEvent, RgbaFrameData, YuvFrameData};
use crate::core::session::{
    ChannelSink, DetectionSession, SessionEvent, SessionHandle, SharedFrameSlot,
};
use crate::core::vision::{DetectionPipeline, DetectorConfig};

enum LiveState {
    Idle(DetectionSession),
    Running(SessionHandle),
}

/// 实时垃圾检测会话
///
/// ```dart
/// final live = LiveDetection.create(configJson: null);
/// live.start();
/// camera.onFrame((f) => live.pushFrame(frame: f));
/// while (true) { final event = await live.nextEvent(); ... }
/// ```
#[frb(opaque)]
pub struct LiveDetection {
    /// 仅在 drop 时为 None
    runtime: Option<Runtime>,
    config: DetectorConfig,
    slot: SharedFrameSlot,
    sink: Arc<ChannelSink>,
    state: Mutex<Option<LiveState>>,
    events: tokio::sync::Mutex<UnboundedReceiver<SessionEvent>>,
    alerts_enabled: Arc<AtomicBool>,
}

impl LiveDetection {
    #[frb(sync)]
    pub fn create(config_json: Option<String>) -> Result<Self, DetectorApiError> {
        crate::init_logging();

        let config = match config_json {
            Some(json) => DetectorConfig::from_json_str(&json)?,
            None => DetectorConfig::default(),
        };
        let pipeline = DetectionPipeline::from_config(&config)?;
        Self::with_pipeline(config, pipeline)
    }

    pub(crate) fn with_pipeline(
        config: DetectorConfig,
        pipeline: DetectionPipeline,
    ) -> Result<Self, DetectorApiError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("trash-watch-session")
            .enable_all()
            .build()
            .map_err(|e| DetectorApiError::new("Session", format!("failed to start runtime: {e}")))?;

        let slot = SharedFrameSlot::new();
        let (sink, events) = ChannelSink::channel();
        let sink = Arc::new(sink);
        let session = Self::session_for(&config, pipeline, &slot, &sink);

        info!("📹 LiveDetection: created, interval {} ms", config.interval_ms);
        Ok(Self {
            runtime: Some(runtime),
            alerts_enabled: Arc::new(AtomicBool::new(config.alerts_enabled)),
            config,
            slot,
            sink,
            state: Mutex::new(Some(LiveState::Idle(session))),
            events: tokio::sync::Mutex::new(events),
        })
    }

    fn session_for(
        config: &DetectorConfig,
        pipeline: DetectionPipeline,
        slot: &SharedFrameSlot,
        sink: &Arc<ChannelSink>,
    ) -> DetectionSession {
        DetectionSession::new(pipeline, Arc::new(slot.clone()))
            .with_alert_sink(sink.clone())
            .with_status_sink(sink.clone())
            .with_interval(config.interval())
            .with_alerts_enabled(config.alerts_enabled)
    }

    /// 运行中的会话丢失后，重建空闲会话
    fn rebuild_session(&self) -> Result<DetectionSession, DetectorApiError> {
        let pipeline = DetectionPipeline::from_config(&self.config)?;
        Ok(Self::session_for(&self.config, pipeline, &self.slot, &self.sink)
            .with_alerts_enabled(self.alerts_enabled()))
    }

    /// 推送最新帧（覆盖未处理的旧帧）
    #[frb(sync)]
    pub fn push_frame(&self, frame: RgbaFrameData) -> Result<(), DetectorApiError> {
        self.slot.push(frame.into_frame()?);
        Ok(())
    }

    #[frb(sync)]
    pub fn push_yuv_frame(&self, frame: YuvFrameData) -> Result<(), DetectorApiError> {
        self.slot.push(frame.into_frame()?);
        Ok(())
    }

    /// 开始周期检测，已在运行时忽略
    #[frb(sync)]
    pub fn start(&self) -> Result<(), DetectorApiError> {
        let runtime = self
            .runtime
            .as_ref()
            .ok_or_else(|| DetectorApiError::new("Session", "runtime already shut down"))?;
        let mut state = self
            .state
            .lock()
            .map_err(|_| DetectorApiError::lock_poisoned())?;
        match state.take() {
            Some(LiveState::Idle(session)) => {
                let _guard = runtime.enter();
                let handle = session.start();
                handle.set_alerts_enabled(self.alerts_enabled());
                *state = Some(LiveState::Running(handle));
                Ok(())
            }
            Some(running @ LiveState::Running(_)) => {
                warn!("⚠️ LiveDetection: already running");
                *state = Some(running);
                Ok(())
            }
            None => Err(DetectorApiError::new("Session", "session is being stopped")),
        }
    }

    /// 停止检测，等待进行中的一轮结束
    ///
    /// 会话任务异常退出时返回错误，并换上新的空闲会话，之后仍可 `start`
    #[frb(dart_async)]
    pub async fn stop(&self) -> Result<(), DetectorApiError> {
        let handle = {
            let mut state = self
                .state
                .lock()
                .map_err(|_| DetectorApiError::lock_poisoned())?;
            match state.take() {
                Some(LiveState::Running(handle)) => handle,
                other => {
                    *state = other;
                    return Ok(());
                }
            }
        };

        let (session, result): (DetectionSession, Result<(), DetectorApiError>) =
            match handle.stop().await {
                Ok(session) => (session, Ok(())),
                Err(e) => {
                    error!("❌ LiveDetection: session task lost: {}", e);
                    (self.rebuild_session()?, Err(e.into()))
                }
            };
        if let Ok(mut state) = self.state.lock() {
            *state = Some(LiveState::Idle(session));
        }
        self.slot.clear();
        result
    }

    #[frb(sync, getter)]
    pub fn is_running(&self) -> bool {
        self.state
            .lock()
            .map(|s| matches!(&*s, Some(LiveState::Running(h)) if h.is_running()))
            .unwrap_or(false)
    }

    #[frb(sync)]
    pub fn set_alerts_enabled(&self, enabled: bool) {
        self.alerts_enabled.store(enabled, Ordering::SeqCst);
        if let Ok(state) = self.state.lock() {
            match &*state {
                Some(LiveState::Running(handle)) => handle.set_alerts_enabled(enabled),
                Some(LiveState::Idle(session)) => session.set_alerts_enabled(enabled),
                None => {}
            }
        }
    }

    #[frb(sync, getter)]
    pub fn alerts_enabled(&self) -> bool {
        self.alerts_enabled.load(Ordering::SeqCst)
    }

    /// 等待下一条状态或垃圾提醒，会话销毁后返回 `None`
    #[frb(dart_async)]
    pub async fn next_event(&self) -> Option<LiveEvent> {
        self.events.lock().await.recv().await.map(Into::into)
    }
}

impl Drop for LiveDetection {
    fn drop(&mut self) {
        // 宿主可能在异步上下文中释放，不能阻塞关闭 runtime
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
        info!("🗑️ LiveDetection: released");
    }
}
