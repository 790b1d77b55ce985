//! 采集会话 (Capture session)
//!
//! 视图出现时启动采集, 消失时停止. 每次启动都会通知帧接收端, 跟踪状态由此回到Idle.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use super::frame::Frame;
use crate::Result;

/// 帧接收端: 对每一帧决定处理还是丢弃
pub trait FrameSink: Send + Sync {
    fn on_frame(&self, frame: Frame);

    /// 采集流启动
    fn on_start(&self) {}

    /// 采集流停止
    fn on_stop(&self) {}
}

/// 采集源: 在自己的后台线程上逐帧回调接收端
pub trait CaptureSource: Send {
    /// 启动采集. 没有可用设备时返回 `Error::NoDevice`.
    fn start(&mut self, sink: Arc<dyn FrameSink>) -> Result<()>;

    /// 停止采集 (阻塞直到采集线程退出)
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    fn name(&self) -> &str;
}

/// 把同一帧分发给多个接收端 (例如预览 + 跟踪)
pub struct Tee {
    sinks: Vec<Arc<dyn FrameSink>>,
}

impl Tee {
    pub fn new(sinks: Vec<Arc<dyn FrameSink>>) -> Self {
        Self { sinks }
    }
}

impl FrameSink for Tee {
    fn on_frame(&self, frame: Frame) {
        for sink in &self.sinks {
            sink.on_frame(frame.clone());
        }
    }

    fn on_start(&self) {
        for sink in &self.sinks {
            sink.on_start();
        }
    }

    fn on_stop(&self) {
        for sink in &self.sinks {
            sink.on_stop();
        }
    }
}

/// 最新帧槽位 (渲染线程读取)
#[derive(Default)]
pub struct LatestFrame {
    slot: Mutex<Option<Frame>>,
}

impl LatestFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<Frame> {
        self.slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl FrameSink for LatestFrame {
    fn on_frame(&self, frame: Frame) {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(frame);
    }
}

/// 采集会话
pub struct CaptureSession {
    source: Box<dyn CaptureSource>,
    sink: Arc<dyn FrameSink>,
    started: bool,
}

impl CaptureSession {
    pub fn new(source: Box<dyn CaptureSource>, sink: Arc<dyn FrameSink>) -> Self {
        Self {
            source,
            sink,
            started: false,
        }
    }

    /// 视图出现: 启动采集
    pub fn appear(&mut self) -> Result<()> {
        if self.source.is_running() {
            return Ok(());
        }
        self.sink.on_start();
        match self.source.start(self.sink.clone()) {
            Ok(()) => {
                self.started = true;
                info!("📹 采集会话启动: {}", self.source.name());
                Ok(())
            }
            Err(e) => {
                warn!("❌ 采集会话启动失败 ({}): {}", self.source.name(), e);
                Err(e)
            }
        }
    }

    /// 视图消失: 停止采集. 采集源已自行结束时同样通知接收端.
    pub fn disappear(&mut self) {
        if !self.started {
            return;
        }
        self.started = false;
        self.source.stop();
        self.sink.on_stop();
        info!("🛑 采集会话停止: {}", self.source.name());
    }

    pub fn is_running(&self) -> bool {
        self.source.is_running()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.disappear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSink {
        frames: AtomicUsize,
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    impl FrameSink for CountingSink {
        fn on_frame(&self, _frame: Frame) {
            self.frames.fetch_add(1, Ordering::SeqCst);
        }
        fn on_start(&self) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }
        fn on_stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 同步采集源: start 时直接推送固定帧数
    struct InlineSource {
        frames: u64,
        running: bool,
        available: bool,
        finite: bool, // 推送完立即结束
    }

    impl CaptureSource for InlineSource {
        fn start(&mut self, sink: Arc<dyn FrameSink>) -> Result<()> {
            if !self.available {
                return Err(Error::NoDevice("inline".to_string()));
            }
            self.running = !self.finite;
            for id in 0..self.frames {
                sink.on_frame(Frame::new(id, 1, 1, vec![0; 4]).unwrap());
            }
            Ok(())
        }
        fn stop(&mut self) {
            self.running = false;
        }
        fn is_running(&self) -> bool {
            self.running
        }
        fn name(&self) -> &str {
            "inline"
        }
    }

    #[test]
    fn test_appear_disappear_lifecycle() {
        let sink = Arc::new(CountingSink::default());
        let source = InlineSource {
            frames: 3,
            running: false,
            available: true,
            finite: false,
        };
        let mut session = CaptureSession::new(Box::new(source), sink.clone());

        session.appear().unwrap();
        session.appear().unwrap(); // 已在运行, 不重复启动
        assert_eq!(sink.frames.load(Ordering::SeqCst), 3);
        assert_eq!(sink.starts.load(Ordering::SeqCst), 1);

        session.disappear();
        session.appear().unwrap();
        assert_eq!(sink.starts.load(Ordering::SeqCst), 2);
        assert_eq!(sink.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_missing_device_is_reported() {
        let sink = Arc::new(CountingSink::default());
        let source = InlineSource {
            frames: 3,
            running: false,
            available: false,
            finite: false,
        };
        let mut session = CaptureSession::new(Box::new(source), sink.clone());
        assert!(matches!(session.appear(), Err(Error::NoDevice(_))));
        assert!(!session.is_running());
        assert_eq!(sink.frames.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_finished_source_still_notifies_stop() {
        let sink = Arc::new(CountingSink::default());
        let source = InlineSource {
            frames: 2,
            running: false,
            available: true,
            finite: true,
        };
        let mut session = CaptureSession::new(Box::new(source), sink.clone());
        session.appear().unwrap();
        assert!(!session.is_running());

        session.disappear();
        session.disappear();
        assert_eq!(sink.stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tee_and_latest_frame() {
        let latest = Arc::new(LatestFrame::new());
        let counter = Arc::new(CountingSink::default());
        let sinks: Vec<Arc<dyn FrameSink>> = vec![
            latest.clone() as Arc<dyn FrameSink>,
            counter.clone() as Arc<dyn FrameSink>,
        ];
        let tee = Tee::new(sinks);
        tee.on_frame(Frame::new(7, 1, 1, vec![0; 4]).unwrap());
        tee.on_frame(Frame::new(8, 1, 1, vec![0; 4]).unwrap());
        assert_eq!(latest.get().map(|f| f.frame_id), Some(8));
        assert_eq!(counter.frames.load(Ordering::SeqCst), 2);
    }
}
