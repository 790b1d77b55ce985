/// 目标跟踪系统 (Object Tracking System)
///
/// 独立工作线程, 维护单个跟踪区域:
/// - TrackingLoop:   跟踪循环 (唯一写入者)
/// - TrackingState:  Idle / Tracking 状态机
/// - PreviewGeometry: 归一化 ↔ 图层坐标换算
/// - TemplateTracker: 模板匹配跟踪器
pub mod actor;
pub mod geometry;
pub mod state;
pub mod template;
pub mod tracker;
pub mod types;

pub use actor::{TrackingHandle, TrackingLoop, TrackingSnapshot, TrackingStats};
pub use geometry::{PreviewGeometry, VideoGravity};
pub use state::{CompletionEffect, Dispatch, DropReason, Phase, TrackingState};
pub use template::TemplateTracker;
pub use tracker::{ObjectTracker, TrackCompletion, TrackRequest};
pub use types::{LayerRect, NormalizedRect, Point, TrackingLevel};
