//! 错误类型 (Error types)

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// 采集初始化失败: 没有可用的视频设备
    #[error("no capture device available: {0}")]
    NoDevice(String),

    #[error("capture source is already running")]
    AlreadyRunning,

    #[error("capture source failure: {0}")]
    Capture(String),

    /// 检测器/跟踪器调用失败 (会被跟踪循环吞掉, 等同于"无结果")
    #[error("detector failure: {0}")]
    Detector(String),

    /// 检测器丢弃了完成回调而没有调用
    #[error("detector dropped its completion without reporting")]
    CompletionDropped,

    #[error("tracking loop has shut down")]
    Disconnected,

    #[error("invalid font: {0}")]
    Font(String),

    #[error("frame buffer does not match {width}x{height} RGBA")]
    InvalidFrame { width: u32, height: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}
