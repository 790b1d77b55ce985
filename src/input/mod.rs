/// 视频输入系统 (Video Input System)
///
/// 采集源在独立线程上逐帧回调接收端:
/// - Frame:          不可变采集帧
/// - CaptureSession: 随视图出现/消失启动/停止采集
/// - SyntheticCamera: 移动方块测试画面
/// - ImageSequence:  目录图片回放
pub mod frame;
pub mod sequence;
pub mod session;
pub mod synthetic;

pub use frame::{rgba_len, Frame};
pub use sequence::{list_images, ImageSequence};
pub use session::{CaptureSession, CaptureSource, FrameSink, LatestFrame, Tee};
pub use synthetic::{MovingSquare, SyntheticCamera, SyntheticConfig};
