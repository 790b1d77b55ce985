// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
//! 摄像头目标跟踪 / 条码识别循环
//!
//! 两条流水线结构相同: 采集帧 → 外部检测/跟踪原语 → 更新状态 → UI线程叠加层.
//! 只有目标跟踪流水线持有跨帧状态 (单个跟踪区域).
pub mod barcode; // 条码识别循环
pub mod completion; // 一次性完成回调
pub mod config; // 配置参数
pub mod error;
pub mod input; // 视频输入系统
pub mod overlay; // 叠加层与UI队列
pub mod tracking; // 目标跟踪系统

pub use crate::barcode::{BarcodeDecoder, BarcodeLoop, DecodeCompletion, ManifestDecoder};
pub use crate::completion::Completion;
pub use crate::config::TrackingConfig;
pub use crate::error::{Error, Result};
pub use crate::input::{CaptureSession, CaptureSource, Frame, FrameSink};
pub use crate::overlay::{
    load_font, ui_queue, ImageOverlay, Overlay, OverlayUpdate, UiReceiver, UiSender,
};
pub use crate::tracking::{
    LayerRect, NormalizedRect, ObjectTracker, Phase, Point, TemplateTracker, TrackingHandle,
    TrackingLoop,
};

/// 快照文件名用的时间字符串
pub fn gen_time_string(delimiter: &str) -> String {
    let t_now = chrono::Local::now();
    let fmt = format!(
        "%Y{}%m{}%d{}%H{}%M{}%S{}%f",
        delimiter, delimiter, delimiter, delimiter, delimiter, delimiter
    );
    t_now.format(&fmt).to_string()
}
