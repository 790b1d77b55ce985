//! 跟踪器统一接口
//! Common interface for object tracking primitives

use super::types::{NormalizedRect, TrackingLevel};
use crate::completion::Completion;
use crate::input::Frame;

/// 一次跟踪调用的完成回调: `Ok(Some(rect))` 成功, `Ok(None)` 未找到, `Err` 失败
pub type TrackCompletion = Completion<Option<NormalizedRect>>;

/// 跟踪请求: 当前帧 + 上一次的跟踪区域
///
/// `generation` 在每次点击锁定/清除时递增; 代数变化意味着新目标,
/// 跟踪器应丢弃之前的内部状态, 即使区域与上一次输出相同.
#[derive(Clone, Debug)]
pub struct TrackRequest {
    pub frame: Frame,
    pub target: NormalizedRect,
    pub generation: u64,
    pub level: TrackingLevel,
}

/// 单目标跟踪器 Trait
///
/// 所有跟踪算法都应实现此接口. 实现可以在调用线程内同步完成,
/// 也可以把 `done` 交给自己的线程稍后完成.
pub trait ObjectTracker: Send {
    fn track(&mut self, request: TrackRequest, done: TrackCompletion);

    /// 跟踪器名称 (日志用)
    fn name(&self) -> &str {
        "tracker"
    }
}

impl<T: ObjectTracker + ?Sized> ObjectTracker for Box<T> {
    fn track(&mut self, request: TrackRequest, done: TrackCompletion) {
        (**self).track(request, done)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
