//! 跟踪循环 (Tracking loop)
//! 职责: 接收采集帧 → 提交跟踪器 → 更新跟踪区域 → 投递叠加层更新
//!
//! 线程架构:
//! - 跟踪循环线程: 唯一持有 `TrackingState`, 所有修改都经由命令队列串行执行
//! - 跟踪器线程:   执行 `ObjectTracker::track`, 完成回调以命令形式回到队列
//! - 采集线程 / UI线程: 通过 `TrackingHandle` 发送命令
//!
//! 帧队列最多容纳一帧: 上一帧尚未被跟踪循环取走时, 新帧直接丢弃.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{bounded, unbounded, Receiver, Sender, TrySendError};
use tracing::{debug, info, trace, warn};

use super::geometry::PreviewGeometry;
use super::state::{CompletionEffect, Dispatch, DropReason, Phase, TrackingState};
use super::tracker::{ObjectTracker, TrackCompletion, TrackRequest};
use super::types::{LayerRect, NormalizedRect, Point, TrackingLevel};
use crate::config::TrackingConfig;
use crate::input::{Frame, FrameSink};
use crate::overlay::{OverlayUpdate, UiSender};
use crate::{Error, Result};

/// 跟踪循环命令
enum Command {
    Frame(Frame),
    SetTarget(Point),
    ClearTarget,
    ResizeLayer { width: f32, height: f32 },
    Completed {
        generation: u64,
        result: Result<Option<NormalizedRect>>,
    },
    Reset,
    Query(Sender<TrackingSnapshot>),
    Shutdown,
}

/// 跟踪器任务 (跟踪循环 → 跟踪器线程)
struct Job {
    request: TrackRequest,
    done: TrackCompletion,
}

/// 跟踪统计
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrackingStats {
    pub frames_received: u64,
    pub dropped_late: u64,      // 帧队列已满
    pub dropped_no_target: u64, // 没有跟踪目标
    pub dropped_busy: u64,      // 已有调用在途
    pub submitted: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub failed: u64,
    pub stale: u64,
    pub tracker_fps: f64,
}

/// 跟踪循环状态快照
#[derive(Clone, Debug)]
pub struct TrackingSnapshot {
    pub phase: Phase,
    pub target: Option<NormalizedRect>,
    pub generation: u64,
    pub in_flight: bool,
    pub geometry: PreviewGeometry,
    pub stats: TrackingStats,
}

/// 跟踪循环句柄 (可克隆, 任意线程使用)
#[derive(Clone)]
pub struct TrackingHandle {
    commands: Sender<Command>,
    frame_pending: Arc<AtomicBool>,
    dropped_late: Arc<AtomicU64>,
}

impl TrackingHandle {
    /// 提交一帧. 上一帧还在队列中时丢弃本帧并返回 false.
    pub fn submit_frame(&self, frame: Frame) -> bool {
        if self.frame_pending.swap(true, Ordering::AcqRel) {
            self.dropped_late.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        if self.commands.send(Command::Frame(frame)).is_err() {
            self.frame_pending.store(false, Ordering::Release);
            return false;
        }
        true
    }

    /// 点击: 以该图层点为中心锁定默认尺寸的目标
    pub fn set_target(&self, point: Point) -> Result<()> {
        self.send(Command::SetTarget(point))
    }

    /// 长按: 清除跟踪目标
    pub fn clear_target(&self) -> Result<()> {
        self.send(Command::ClearTarget)
    }

    /// 预览图层尺寸变化
    pub fn resize_layer(&self, width: f32, height: f32) -> Result<()> {
        self.send(Command::ResizeLayer { width, height })
    }

    /// 回到 Idle (会话重启)
    pub fn reset(&self) -> Result<()> {
        self.send(Command::Reset)
    }

    /// 查询当前状态. 在此之前从同一线程发出的命令都已处理.
    pub fn snapshot(&self) -> Result<TrackingSnapshot> {
        let (tx, rx) = bounded(1);
        self.send(Command::Query(tx))?;
        rx.recv().map_err(|_| Error::Disconnected)
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands.send(command).map_err(|_| Error::Disconnected)
    }
}

impl FrameSink for TrackingHandle {
    fn on_frame(&self, frame: Frame) {
        self.submit_frame(frame);
    }

    fn on_start(&self) {
        if let Err(e) = self.reset() {
            warn!("⚠️ 跟踪循环重置失败: {}", e);
        }
    }
}

/// 跟踪循环 (拥有线程; drop 时关闭)
pub struct TrackingLoop {
    handle: TrackingHandle,
    actor: Option<JoinHandle<()>>,
}

impl TrackingLoop {
    pub fn spawn<T>(tracker: T, config: &TrackingConfig, ui: UiSender) -> Result<Self>
    where
        T: ObjectTracker + 'static,
    {
        let (tx, rx) = unbounded();
        let (job_tx, job_rx) = bounded::<Job>(1);
        let frame_pending = Arc::new(AtomicBool::new(false));
        let dropped_late = Arc::new(AtomicU64::new(0));

        let tracker_name = tracker.name().to_string();
        spawn_worker(tracker, job_rx)?;

        let actor = Actor {
            commands: rx,
            loopback: tx.clone(),
            jobs: job_tx,
            ui,
            state: TrackingState::new(),
            geometry: PreviewGeometry::new(
                config.layer_width,
                config.layer_height,
                config.frame_width,
                config.frame_height,
                config.video_gravity,
            ),
            target_size: (config.target_width, config.target_height),
            level: config.tracking_level,
            stats_interval: config.stats_interval.max(1),
            stats: TrackingStats::default(),
            frame_pending: frame_pending.clone(),
            dropped_late: dropped_late.clone(),
            fps_count: 0,
            fps_last: Instant::now(),
        };

        let join = std::thread::Builder::new()
            .name("tracking-loop".to_string())
            .spawn(move || actor.run())?;
        info!("🎯 跟踪循环启动 (跟踪器: {})", tracker_name);

        Ok(Self {
            handle: TrackingHandle {
                commands: tx,
                frame_pending,
                dropped_late,
            },
            actor: Some(join),
        })
    }

    pub fn handle(&self) -> TrackingHandle {
        self.handle.clone()
    }

    /// 停止跟踪循环并等待线程退出. 在途的跟踪器调用不会被等待.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        if let Some(join) = self.actor.take() {
            let _ = self.handle.commands.send(Command::Shutdown);
            if join.join().is_err() {
                warn!("⚠️ 跟踪循环线程异常退出");
            }
        }
    }
}

impl Drop for TrackingLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

/// 跟踪器线程: 逐个执行任务. 任务通道关闭时退出.
fn spawn_worker<T>(mut tracker: T, jobs: Receiver<Job>) -> Result<()>
where
    T: ObjectTracker + 'static,
{
    std::thread::Builder::new()
        .name("tracker-worker".to_string())
        .spawn(move || {
            while let Ok(job) = jobs.recv() {
                tracker.track(job.request, job.done);
            }
            debug!("跟踪器线程退出");
        })?;
    Ok(())
}

struct Actor {
    commands: Receiver<Command>,
    loopback: Sender<Command>,
    jobs: Sender<Job>,
    ui: UiSender,
    state: TrackingState,
    geometry: PreviewGeometry,
    target_size: (f32, f32),
    level: TrackingLevel,
    stats_interval: u64,
    stats: TrackingStats,
    frame_pending: Arc<AtomicBool>,
    dropped_late: Arc<AtomicU64>,

    // 跟踪器FPS统计
    fps_count: u64,
    fps_last: Instant,
}

impl Actor {
    fn run(mut self) {
        while let Ok(command) = self.commands.recv() {
            match command {
                Command::Frame(frame) => {
                    self.frame_pending.store(false, Ordering::Release);
                    self.dispatch(frame);
                }
                Command::SetTarget(point) => self.set_target(point),
                Command::ClearTarget => self.clear_target(),
                Command::ResizeLayer { width, height } => self.resize_layer(width, height),
                Command::Completed { generation, result } => self.complete(generation, result),
                Command::Reset => {
                    self.state.reset();
                    self.ui.post(OverlayUpdate::ResetLockOn);
                    debug!("🔄 跟踪状态重置为 Idle");
                }
                Command::Query(reply) => {
                    let _ = reply.send(self.snapshot());
                }
                Command::Shutdown => break,
            }
        }
        info!(
            "🛑 跟踪循环退出 (收到 {} 帧, 提交 {} 次)",
            self.stats.frames_received, self.stats.submitted
        );
    }

    fn snapshot(&self) -> TrackingSnapshot {
        let mut stats = self.stats.clone();
        stats.dropped_late = self.dropped_late.load(Ordering::Relaxed);
        TrackingSnapshot {
            phase: self.state.phase(),
            target: self.state.target(),
            generation: self.state.generation(),
            in_flight: self.state.in_flight(),
            geometry: self.geometry,
            stats,
        }
    }

    /// 帧分发: 无目标或在途时丢弃, 否则交给跟踪器线程
    fn dispatch(&mut self, frame: Frame) {
        self.stats.frames_received += 1;
        self.geometry.set_frame_size(frame.width, frame.height);

        let (target, generation) = match self.state.dispatch() {
            Dispatch::Drop(DropReason::NoTarget) => {
                self.stats.dropped_no_target += 1;
                return;
            }
            Dispatch::Drop(DropReason::Busy) => {
                self.stats.dropped_busy += 1;
                trace!("跟踪器忙, 丢弃帧 #{}", frame.frame_id);
                return;
            }
            Dispatch::Submit { target, generation } => (target, generation),
        };

        let loopback = self.loopback.clone();
        let done = TrackCompletion::new(move |result| {
            let _ = loopback.send(Command::Completed { generation, result });
        });
        let job = Job {
            request: TrackRequest {
                frame,
                target,
                generation,
                level: self.level,
            },
            done,
        };

        match self.jobs.try_send(job) {
            Ok(()) => self.stats.submitted += 1,
            Err(TrySendError::Full(job)) | Err(TrySendError::Disconnected(job)) => {
                // 完成回调随任务一起被丢弃, 会以 CompletionDropped 回到队列释放在途标志
                warn!("⚠️ 跟踪器不可用, 丢弃帧 #{}", job.request.frame.frame_id);
            }
        }
    }

    fn set_target(&mut self, point: Point) {
        let (w, h) = self.target_size;
        let (layer, normalized) = self.geometry.target_at(point, w, h);
        self.state.set_target(normalized);
        self.ui.post(OverlayUpdate::LockOn(layer));
        info!(
            "🎯 锁定目标 @ ({:.0}, {:.0}) → {:?} (代数 {})",
            point.x,
            point.y,
            normalized,
            self.state.generation()
        );
    }

    /// 图层尺寸变化 (例如旋转): 同一跟踪区域按新几何重新投递锁定框
    fn resize_layer(&mut self, width: f32, height: f32) {
        self.geometry.set_layer_size(width, height);
        debug!("预览图层尺寸: {:.0}x{:.0}", width, height);
        if let Some(target) = self.state.target() {
            let layer = self.geometry.layer_from_normalized(target);
            self.ui.post(OverlayUpdate::LockOn(layer));
        }
    }

    fn clear_target(&mut self) {
        self.state.clear();
        self.ui.post(OverlayUpdate::ResetLockOn);
        info!("❎ 清除跟踪目标 (代数 {})", self.state.generation());
    }

    fn complete(&mut self, generation: u64, result: Result<Option<NormalizedRect>>) {
        let result = match result {
            Ok(result) => result,
            Err(e) => {
                // 跟踪器失败: 不重试, 等同于无结果
                self.stats.failed += 1;
                debug!("跟踪器调用失败: {}", e);
                None
            }
        };

        match self.state.complete(generation, result) {
            CompletionEffect::Updated(rect) => {
                self.stats.updated += 1;
                let layer: LayerRect = self.geometry.layer_from_normalized(rect);
                self.ui.post(OverlayUpdate::LockOn(layer));
            }
            CompletionEffect::Unchanged => self.stats.unchanged += 1,
            CompletionEffect::Stale => {
                self.stats.stale += 1;
                debug!(
                    "丢弃过期结果 (代数 {} != {})",
                    generation,
                    self.state.generation()
                );
            }
        }
        self.update_fps();
    }

    fn update_fps(&mut self) {
        self.fps_count += 1;
        let now = Instant::now();
        let elapsed = now.duration_since(self.fps_last);
        if elapsed.as_secs() >= 1 {
            self.stats.tracker_fps = self.fps_count as f64 / elapsed.as_secs_f64();
            self.fps_count = 0;
            self.fps_last = now;
        }

        let completed =
            self.stats.updated + self.stats.unchanged + self.stats.failed + self.stats.stale;
        if completed % self.stats_interval == 0 {
            info!(
                "🎯 跟踪: {} | {:.1}fps | 更新{} 未变{} 失败{} 过期{} | 丢帧 无目标{} 忙{} 迟到{}",
                if self.state.phase() == Phase::Tracking {
                    "跟踪中"
                } else {
                    "空闲"
                },
                self.stats.tracker_fps,
                self.stats.updated,
                self.stats.unchanged,
                self.stats.failed,
                self.stats.stale,
                self.stats.dropped_no_target,
                self.stats.dropped_busy,
                self.dropped_late.load(Ordering::Relaxed),
            );
        }
    }
}
