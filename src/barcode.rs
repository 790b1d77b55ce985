//! 条码识别循环 (Barcode decode loop)
//!
//! 每帧无状态: 帧 → 解码器 → 有内容则显示标签, 否则隐藏. 不重试.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::completion::Completion;
use crate::input::{Frame, FrameSink};
use crate::overlay::{OverlayUpdate, UiSender};
use crate::Result;

/// 解码完成回调: `Ok(Some(payload))` 识别成功, `Ok(None)` 没有条码
pub type DecodeCompletion = Completion<Option<String>>;

/// 条码解码器 Trait
pub trait BarcodeDecoder: Send + Sync {
    fn decode(&self, frame: &Frame, done: DecodeCompletion);

    fn name(&self) -> &str {
        "decoder"
    }
}

/// 条码统计
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BarcodeStats {
    pub frames: u64,
    pub decoded: u64,
    pub empty: u64,
    pub failed: u64,
}

#[derive(Default)]
struct Counters {
    frames: AtomicU64,
    decoded: AtomicU64,
    empty: AtomicU64,
    failed: AtomicU64,
}

/// 条码识别循环 (作为帧接收端挂到采集会话上)
pub struct BarcodeLoop {
    decoder: Arc<dyn BarcodeDecoder>,
    ui: UiSender,
    counters: Arc<Counters>,
}

impl BarcodeLoop {
    pub fn new(decoder: Arc<dyn BarcodeDecoder>, ui: UiSender) -> Self {
        info!("🔍 条码识别启动 (解码器: {})", decoder.name());
        Self {
            decoder,
            ui,
            counters: Arc::new(Counters::default()),
        }
    }

    pub fn stats(&self) -> BarcodeStats {
        BarcodeStats {
            frames: self.counters.frames.load(Ordering::Relaxed),
            decoded: self.counters.decoded.load(Ordering::Relaxed),
            empty: self.counters.empty.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

impl FrameSink for BarcodeLoop {
    fn on_frame(&self, frame: Frame) {
        self.counters.frames.fetch_add(1, Ordering::Relaxed);
        let ui = self.ui.clone();
        let counters = self.counters.clone();
        let frame_id = frame.frame_id;

        let done = DecodeCompletion::new(move |result| match result {
            Ok(Some(payload)) => {
                counters.decoded.fetch_add(1, Ordering::Relaxed);
                debug!("📦 帧 #{} 条码: {}", frame_id, payload);
                ui.post(OverlayUpdate::ShowLabel(payload));
            }
            Ok(None) => {
                counters.empty.fetch_add(1, Ordering::Relaxed);
                ui.post(OverlayUpdate::HideLabel);
            }
            Err(e) => {
                counters.failed.fetch_add(1, Ordering::Relaxed);
                debug!("帧 #{} 解码失败: {}", frame_id, e);
                ui.post(OverlayUpdate::HideLabel);
            }
        });
        self.decoder.decode(&frame, done);
    }

    fn on_stop(&self) {
        self.ui.post(OverlayUpdate::HideLabel);
    }
}

/// 清单解码器: 按图片序列顺序查表 (`payloads.json`: 文件名 → 条码内容)
///
/// 与 `ImageSequence` 配合使用, 帧序号 n 对应第 n 个文件 (循环回放时取模).
pub struct ManifestDecoder {
    payloads: Vec<Option<String>>,
}

impl ManifestDecoder {
    pub fn new(payloads: Vec<Option<String>>) -> Self {
        Self { payloads }
    }

    /// 读取清单, 按 `files` 顺序对齐
    pub fn load(manifest: &Path, files: &[PathBuf]) -> Result<Self> {
        let json = std::fs::read_to_string(manifest)?;
        let table: HashMap<String, String> = serde_json::from_str(&json)?;
        let payloads = files
            .iter()
            .map(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .and_then(|name| table.get(name).cloned())
            })
            .collect();
        Ok(Self::new(payloads))
    }
}

impl BarcodeDecoder for ManifestDecoder {
    fn decode(&self, frame: &Frame, done: DecodeCompletion) {
        if self.payloads.is_empty() || frame.frame_id == 0 {
            return done.succeed(None);
        }
        let index = ((frame.frame_id - 1) % self.payloads.len() as u64) as usize;
        done.succeed(self.payloads[index].clone());
    }

    fn name(&self) -> &str {
        "manifest"
    }
}
