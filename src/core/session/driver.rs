use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::sink::{AlertSink, FrameSource, LoggingAlertSink, StatusSink};
use crate::core::vision::config::DEFAULT_INTERVAL_MS;
use crate::core::vision::{DetectionError, DetectionPipeline, DetectorStats, PipelineOutcome};

pub const STATUS_ACTIVE: &str = "Detection active - monitoring for trash vs normal items";
pub const STATUS_PAUSED: &str = "Detection paused";
pub const STATUS_ERROR: &str = "Detection error occurred";

/// 检测会话，`stop` 后可取回并重新启动
pub struct DetectionSession {
    pipeline: DetectionPipeline,
    source: Arc<dyn FrameSource>,
    alerts: Arc<dyn AlertSink>,
    status: Arc<dyn StatusSink>,
    alerts_enabled: Arc<AtomicBool>,
    interval: Duration,
}

impl DetectionSession {
    pub fn new(pipeline: DetectionPipeline, source: Arc<dyn FrameSource>) -> Self {
        Self {
            pipeline,
            source,
            alerts: Arc::new(LoggingAlertSink),
            status: Arc::new(LoggingAlertSink),
            alerts_enabled: Arc::new(AtomicBool::new(true)),
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
        }
    }

    pub fn with_alert_sink(mut self, alerts: Arc<dyn AlertSink>) -> Self {
        self.alerts = alerts;
        self
    }

    pub fn with_status_sink(mut self, status: Arc<dyn StatusSink>) -> Self {
        self.status = status;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_alerts_enabled(self, enabled: bool) -> Self {
        self.set_alerts_enabled(enabled);
        self
    }

    pub fn set_alerts_enabled(&self, enabled: bool) {
        self.alerts_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn alerts_enabled(&self) -> bool {
        self.alerts_enabled.load(Ordering::SeqCst)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn stats(&self) -> DetectorStats {
        self.pipeline.stats()
    }

    /// 单轮检测：取帧 → 分类 → 通知（宿主自己驱动定时器时使用）
    pub fn run_cycle(&mut self) -> Result<PipelineOutcome, DetectionError> {
        let outcome = self.evaluate();
        self.dispatch(&outcome);
        outcome
    }

    fn evaluate(&mut self) -> Result<PipelineOutcome, DetectionError> {
        match self.source.capture() {
            Ok(Some(frame)) => self.pipeline.process_frame(&frame),
            Ok(None) | Err(DetectionError::FrameNotReady) => Ok(self.pipeline.record_not_ready()),
            Err(e) => Err(self.pipeline.record_capture_failure(e)),
        }
    }

    fn dispatch(&self, outcome: &Result<PipelineOutcome, DetectionError>) {
        match outcome {
            Ok(PipelineOutcome::Reported(verdict)) => {
                self.status.on_status(&verdict.summary());
                if verdict.trash_detected && self.alerts_enabled() {
                    info!("🚨 Trash alert: {}", verdict.trash_items.join(", "));
                    self.alerts.on_trash(&verdict.trash_items);
                }
            }
            Ok(PipelineOutcome::Suppressed) | Ok(PipelineOutcome::Skipped(_)) => {}
            Err(e) => {
                error!("❌ Detection cycle failed: {}", e);
                self.status.on_status(STATUS_ERROR);
            }
        }
    }

    /// 在当前 Tokio runtime 上启动，第一轮在一个间隔之后
    pub fn start(mut self) -> SessionHandle {
        self.pipeline.reset_cache();
        self.status.on_status(STATUS_ACTIVE);
        info!("▶️ Detection session started, interval {:?}", self.interval);

        let alive = Arc::new(AtomicBool::new(true));
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let alerts_enabled = self.alerts_enabled.clone();
        let task_alive = alive.clone();
        let first_tick = Instant::now() + self.interval;

        let task = tokio::spawn(async move {
            let mut ticker = time::interval_at(first_tick, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        let outcome = self.evaluate();
                        if !task_alive.load(Ordering::SeqCst) {
                            debug!("⏹️ Session stopped mid-cycle, result discarded");
                            break;
                        }
                        self.dispatch(&outcome);
                    }
                }
            }
            self
        });

        SessionHandle {
            stop_tx,
            alive,
            alerts_enabled,
            task,
        }
    }
}

/// 运行中的会话句柄，`stop` 返回会话本身
pub struct SessionHandle {
    stop_tx: watch::Sender<bool>,
    alive: Arc<AtomicBool>,
    alerts_enabled: Arc<AtomicBool>,
    task: JoinHandle<DetectionSession>,
}

impl SessionHandle {
    pub fn is_running(&self) -> bool {
        self.alive.load(Ordering::SeqCst) && !self.task.is_finished()
    }

    pub fn set_alerts_enabled(&self, enabled: bool) {
        self.alerts_enabled.store(enabled, Ordering::SeqCst);
    }

    /// 取消后续检测，等待进行中的一轮结束
    pub async fn stop(self) -> Result<DetectionSession, DetectionError> {
        self.alive.store(false, Ordering::SeqCst);
        let _ = self.stop_tx.send(true);

        let session = self
            .task
            .await
            .map_err(|e| DetectionError::Session(e.to_string()))?;
        session.status.on_status(STATUS_PAUSED);
        info!("⏸️ Detection session stopped");
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::session::sink::{ChannelSink, SessionEvent, SharedFrameSlot};
    use crate::core::vision::{
        DecisionPolicy, Feature, FixedExtractor, Frame, HeuristicAnalyzer, RawAnalysis,
        ThresholdTable,
    };
    use std::sync::atomic::AtomicU64;
    use tokio::sync::mpsc::UnboundedReceiver;

    const BOTTLE: u64 = 1;
    const HAND: u64 = 2;
    const BROKEN: u64 = 3;

    /// 帧号决定场景
    fn scripted_pipeline() -> DetectionPipeline {
        let extractor = FixedExtractor::with_pattern(|frame| match frame.frame_number {
            BOTTLE => RawAnalysis::from_counts(
                100,
                &[
                    (Feature::PlasticBottle, 20),
                    (Feature::BottleShape, 10),
                    (Feature::ObjectContent, 40),
                ],
            ),
            HAND => RawAnalysis::from_counts(100, &[(Feature::SkinTone, 30)]),
            _ => Err(DetectionError::Extraction("sensor glitch".into())),
        });
        let analyzer = HeuristicAnalyzer::with_parts(
            Box::new(extractor),
            ThresholdTable::default(),
            DecisionPolicy::default(),
        )
        .unwrap();
        DetectionPipeline::with_analyzer(Box::new(analyzer))
    }

    fn scene(frame_number: u64) -> Frame {
        Frame::new(2, 2, vec![0u8; 16], 0, frame_number)
    }

    fn session(slot: &SharedFrameSlot) -> (DetectionSession, UnboundedReceiver<SessionEvent>) {
        let (sink, rx) = ChannelSink::channel();
        let sink = Arc::new(sink);
        let session = DetectionSession::new(scripted_pipeline(), Arc::new(slot.clone()))
            .with_alert_sink(sink.clone())
            .with_status_sink(sink);
        (session, rx)
    }

    fn drain(rx: &mut UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn status(s: &str) -> SessionEvent {
        SessionEvent::Status(s.to_string())
    }

    #[test]
    fn test_run_cycle_reports_then_suppresses() {
        let slot = SharedFrameSlot::new();
        let (mut session, mut rx) = session(&slot);

        slot.push(scene(BOTTLE));
        assert!(matches!(session.run_cycle().unwrap(), PipelineOutcome::Reported(_)));
        assert_eq!(session.run_cycle().unwrap(), PipelineOutcome::Suppressed);

        slot.push(scene(HAND));
        session.run_cycle().unwrap();

        assert_eq!(
            drain(&mut rx),
            vec![
                status("🗑️ Trash detected: plastic bottle"),
                SessionEvent::Trash(vec!["plastic bottle".into()]),
                status("✅ Normal items detected: person/hand"),
            ]
        );
    }

    #[test]
    fn test_missing_frame_is_silent() {
        let slot = SharedFrameSlot::new();
        let (mut session, mut rx) = session(&slot);

        assert!(matches!(session.run_cycle().unwrap(), PipelineOutcome::Skipped(_)));
        assert!(drain(&mut rx).is_empty());
        assert_eq!(session.stats().skipped_frames, 1);
    }

    #[test]
    fn test_not_ready_error_is_silent() {
        let (sink, mut rx) = ChannelSink::channel();
        let source = || -> Result<Option<Frame>, DetectionError> { Err(DetectionError::FrameNotReady) };
        let mut session = DetectionSession::new(scripted_pipeline(), Arc::new(source))
            .with_status_sink(Arc::new(sink));

        assert!(session.run_cycle().is_ok());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_capture_error_counts_as_failed() {
        let (sink, mut rx) = ChannelSink::channel();
        let source = || -> Result<Option<Frame>, DetectionError> {
            Err(DetectionError::Extraction("camera disconnected".into()))
        };
        let mut session = DetectionSession::new(scripted_pipeline(), Arc::new(source))
            .with_status_sink(Arc::new(sink));

        assert!(session.run_cycle().is_err());
        assert_eq!(drain(&mut rx), vec![status(STATUS_ERROR)]);
        assert_eq!(session.stats().failed_frames, 1);
        assert_eq!(session.stats().skipped_frames, 0);
    }

    #[test]
    fn test_error_reports_status_and_continues() {
        let slot = SharedFrameSlot::new();
        let (mut session, mut rx) = session(&slot);

        slot.push(scene(BROKEN));
        assert!(session.run_cycle().is_err());
        slot.push(scene(HAND));
        assert!(session.run_cycle().is_ok());

        assert_eq!(
            drain(&mut rx),
            vec![status(STATUS_ERROR), status("✅ Normal items detected: person/hand")]
        );
    }

    #[test]
    fn test_alerts_disabled_keeps_status() {
        let slot = SharedFrameSlot::new();
        let (session, mut rx) = session(&slot);
        let mut session = session.with_alerts_enabled(false);

        slot.push(scene(BOTTLE));
        session.run_cycle().unwrap();

        assert_eq!(drain(&mut rx), vec![status("🗑️ Trash detected: plastic bottle")]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_cycle_after_one_interval() {
        let slot = SharedFrameSlot::new();
        let (session, mut rx) = session(&slot);
        slot.push(scene(BOTTLE));

        let handle = session.start();
        assert!(handle.is_running());
        assert_eq!(drain(&mut rx), vec![status(STATUS_ACTIVE)]);

        time::sleep(Duration::from_millis(2999)).await;
        assert!(drain(&mut rx).is_empty());

        time::sleep(Duration::from_millis(2)).await;
        assert_eq!(
            drain(&mut rx),
            vec![
                status("🗑️ Trash detected: plastic bottle"),
                SessionEvent::Trash(vec!["plastic bottle".into()]),
            ]
        );

        // 下一轮场景不变
        time::sleep(Duration::from_millis(3000)).await;
        assert!(drain(&mut rx).is_empty());

        let session = handle.stop().await.unwrap();
        assert_eq!(drain(&mut rx), vec![status(STATUS_PAUSED)]);
        assert_eq!(session.stats().reported_verdicts, 1);
        assert_eq!(session.stats().suppressed_verdicts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_cycles_after_stop_and_restart_resets_cache() {
        let slot = SharedFrameSlot::new();
        let (session, mut rx) = session(&slot);
        slot.push(scene(BOTTLE));

        let handle = session.start();
        time::sleep(Duration::from_millis(3500)).await;
        let session = handle.stop().await.unwrap();
        drain(&mut rx);

        time::sleep(Duration::from_millis(10_000)).await;
        assert!(drain(&mut rx).is_empty());

        let handle = session.start();
        time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(
            drain(&mut rx),
            vec![
                status(STATUS_ACTIVE),
                status("🗑️ Trash detected: plastic bottle"),
                SessionEvent::Trash(vec!["plastic bottle".into()]),
            ]
        );
        handle.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_handle_toggles_alerts_while_running() {
        let slot = SharedFrameSlot::new();
        let (session, mut rx) = session(&slot);
        slot.push(scene(BOTTLE));

        let handle = session.start();
        handle.set_alerts_enabled(false);
        time::sleep(Duration::from_millis(3500)).await;

        let events = drain(&mut rx);
        assert!(!events.iter().any(|e| matches!(e, SessionEvent::Trash(_))));
        let session = handle.stop().await.unwrap();
        assert!(!session.alerts_enabled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cycles_keep_running_after_errors() {
        let calls = Arc::new(AtomicU64::new(0));
        let counter = calls.clone();
        let source = move || -> Result<Option<Frame>, DetectionError> {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            Ok(Some(scene(if n == 0 { BROKEN } else { HAND })))
        };
        let (sink, mut rx) = ChannelSink::channel();
        let sink = Arc::new(sink);
        let session = DetectionSession::new(scripted_pipeline(), Arc::new(source))
            .with_alert_sink(sink.clone())
            .with_status_sink(sink)
            .with_interval(Duration::from_millis(1000));

        let handle = session.start();
        time::sleep(Duration::from_millis(2500)).await;
        handle.stop().await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(
            drain(&mut rx),
            vec![
                status(STATUS_ACTIVE),
                status(STATUS_ERROR),
                status("✅ Normal items detected: person/hand"),
                status(STATUS_PAUSED),
            ]
        );
    }
}
