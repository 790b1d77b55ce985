//! 图片序列采集源 - 按文件名顺序回放目录中的 PNG/JPEG

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::frame::Frame;
use super::session::{CaptureSource, FrameSink};
use crate::{Error, Result};

const EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// 列出目录中的图片 (按文件名排序)
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// 图片序列采集源. 帧序号从1开始, 与 `files()` 的顺序一一对应.
pub struct ImageSequence {
    dir: PathBuf,
    files: Vec<PathBuf>,
    fps: f64,
    looped: bool,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl ImageSequence {
    pub fn new(dir: impl Into<PathBuf>, fps: f64, looped: bool) -> Self {
        let dir = dir.into();
        let files = list_images(&dir).unwrap_or_default();
        Self {
            dir,
            files,
            fps,
            looped,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl CaptureSource for ImageSequence {
    fn start(&mut self, sink: Arc<dyn FrameSink>) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }
        if self.files.is_empty() {
            return Err(Error::NoDevice(format!(
                "no images in {}",
                self.dir.display()
            )));
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let files = self.files.clone();
        let interval = Duration::from_secs_f64(1.0 / self.fps.max(0.1));
        let looped = self.looped;

        let handle = std::thread::Builder::new()
            .name("image-sequence".to_string())
            .spawn(move || {
                info!("🎞️ 图片序列回放: {} 张", files.len());
                let mut frame_id = 0u64;
                'outer: loop {
                    for path in &files {
                        if !running.load(Ordering::SeqCst) {
                            break 'outer;
                        }
                        let tick = Instant::now();
                        frame_id += 1;
                        match image::open(path) {
                            Ok(img) => sink.on_frame(Frame::from_image(frame_id, img.to_rgba8())),
                            Err(e) => warn!("⚠️ 丢弃帧 #{} ({}): {}", frame_id, path.display(), e),
                        }
                        if let Some(rest) = interval.checked_sub(tick.elapsed()) {
                            std::thread::sleep(rest);
                        }
                    }
                    if !looped {
                        break;
                    }
                }
                running.store(false, Ordering::SeqCst);
                info!("📹 图片序列结束 (共 {} 帧)", frame_id);
            });

        match handle {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(Error::Capture(e.to_string()))
            }
        }
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("⚠️ 图片序列线程异常退出");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "image-sequence"
    }
}

impl Drop for ImageSequence {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::{unbounded, Sender};

    struct ChannelSink(Sender<Frame>);

    impl FrameSink for ChannelSink {
        fn on_frame(&self, frame: Frame) {
            let _ = self.0.send(frame);
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("objtrack-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_empty_dir_is_no_device() {
        let dir = temp_dir("empty");
        let (tx, _rx) = unbounded();
        let mut source = ImageSequence::new(&dir, 30.0, false);
        assert!(matches!(
            source.start(Arc::new(ChannelSink(tx))),
            Err(Error::NoDevice(_))
        ));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_replays_in_name_order() {
        let dir = temp_dir("replay");
        for (name, shade) in [("b.png", 200u8), ("a.png", 100u8)] {
            image::RgbaImage::from_pixel(4, 3, image::Rgba([shade, shade, shade, 255]))
                .save(dir.join(name))
                .unwrap();
        }
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let (tx, rx) = unbounded();
        let mut source = ImageSequence::new(&dir, 1000.0, false);
        assert_eq!(source.files().len(), 2);
        source.start(Arc::new(ChannelSink(tx))).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let second = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!((first.frame_id, first.width, first.height), (1, 4, 3));
        assert_eq!(first.rgba_data[0], 100);
        assert_eq!(second.rgba_data[0], 200);

        source.stop();
        let _ = std::fs::remove_dir_all(&dir);
    }
}
