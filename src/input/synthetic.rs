//! 合成摄像头 - 生成移动方块测试画面
//!
//! 背景为暗灰色, 一个白色方块在画面内匀速移动并在边缘反弹.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use super::frame::{rgba_len, Frame};
use super::session::{CaptureSource, FrameSink};
use crate::{Error, Result};

const BACKGROUND: u8 = 32;

/// 合成摄像头参数
#[derive(Clone, Debug)]
pub struct SyntheticConfig {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub square: u32,            // 方块边长 (像素)
    pub velocity: (f32, f32),   // 像素/帧
    pub jitter: f32,            // 每帧速度随机扰动幅度
    pub max_frames: Option<u64>, // None = 无限
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            fps: 30.0,
            square: 32,
            velocity: (3.0, 2.0),
            jitter: 0.0,
            max_frames: None,
            seed: 0,
        }
    }
}

/// 移动方块场景 (不含线程, 便于直接测试)
#[derive(Clone, Debug)]
pub struct MovingSquare {
    config: SyntheticConfig,
    position: (f32, f32),
    velocity: (f32, f32),
    rng: StdRng,
}

impl MovingSquare {
    /// 方块初始位于画面中心
    pub fn new(config: SyntheticConfig) -> Self {
        let position = (
            (config.width.saturating_sub(config.square)) as f32 / 2.0,
            (config.height.saturating_sub(config.square)) as f32 / 2.0,
        );
        let rng = StdRng::seed_from_u64(config.seed);
        let velocity = config.velocity;
        Self {
            config,
            position,
            velocity,
            rng,
        }
    }

    /// 方块当前左上角 (像素)
    pub fn position(&self) -> (u32, u32) {
        (self.position.0.round() as u32, self.position.1.round() as u32)
    }

    /// 渲染当前画面
    pub fn render(&self, frame_id: u64) -> Frame {
        let (w, h) = (self.config.width, self.config.height);
        let mut data = vec![BACKGROUND; rgba_len(w, h)];
        for px in data.chunks_exact_mut(4) {
            px[3] = 255;
        }
        let (x0, y0) = self.position();
        let x1 = x0.saturating_add(self.config.square).min(w);
        let y1 = y0.saturating_add(self.config.square).min(h);
        for y in y0..y1 {
            let row = y as usize * w as usize * 4;
            for x in x0..x1 {
                let i = row + x as usize * 4;
                data[i..i + 3].copy_from_slice(&[255, 255, 255]);
            }
        }
        Frame::from_image(
            frame_id,
            image::RgbaImage::from_raw(w, h, data).unwrap_or_else(|| image::RgbaImage::new(w, h)),
        )
    }

    /// 前进一帧 (边缘反弹)
    pub fn step(&mut self) {
        if self.config.jitter > 0.0 {
            let j = self.config.jitter;
            self.velocity.0 += self.rng.gen_range(-j..=j);
            self.velocity.1 += self.rng.gen_range(-j..=j);
        }
        let max_x = self.config.width.saturating_sub(self.config.square) as f32;
        let max_y = self.config.height.saturating_sub(self.config.square) as f32;

        self.position.0 += self.velocity.0;
        self.position.1 += self.velocity.1;
        if self.position.0 < 0.0 || self.position.0 > max_x {
            self.velocity.0 = -self.velocity.0;
            self.position.0 = self.position.0.clamp(0.0, max_x);
        }
        if self.position.1 < 0.0 || self.position.1 > max_y {
            self.velocity.1 = -self.velocity.1;
            self.position.1 = self.position.1.clamp(0.0, max_y);
        }
    }
}

/// 合成摄像头采集源
pub struct SyntheticCamera {
    config: SyntheticConfig,
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SyntheticCamera {
    pub fn new(config: SyntheticConfig) -> Self {
        Self {
            config,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl CaptureSource for SyntheticCamera {
    fn start(&mut self, sink: Arc<dyn FrameSink>) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(Error::AlreadyRunning);
        }
        if self.config.width == 0 || self.config.height == 0 || self.config.fps <= 0.0 {
            return Err(Error::NoDevice(format!(
                "synthetic {}x{}@{}",
                self.config.width, self.config.height, self.config.fps
            )));
        }
        // 回收上一次自行结束的线程
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }

        self.running.store(true, Ordering::SeqCst);
        let running = self.running.clone();
        let config = self.config.clone();
        let handle = std::thread::Builder::new()
            .name("synthetic-camera".to_string())
            .spawn(move || {
                info!(
                    "🎥 合成摄像头启动 {}x{} @ {:.0}fps",
                    config.width, config.height, config.fps
                );
                let interval = Duration::from_secs_f64(1.0 / config.fps);
                let mut scene = MovingSquare::new(config.clone());
                let mut frame_id = 0u64;

                while running.load(Ordering::SeqCst) {
                    let tick = Instant::now();
                    frame_id += 1;
                    sink.on_frame(scene.render(frame_id));
                    scene.step();

                    if config.max_frames.is_some_and(|max| frame_id >= max) {
                        debug!("合成摄像头达到最大帧数 {}", frame_id);
                        break;
                    }
                    if let Some(rest) = interval.checked_sub(tick.elapsed()) {
                        std::thread::sleep(rest);
                    }
                }
                running.store(false, Ordering::SeqCst);
                info!("📹 合成摄像头结束 (共 {} 帧)", frame_id);
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
                warn!("⚠️ 合成摄像头线程异常退出");
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

impl Drop for SyntheticCamera {
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

    #[test]
    fn test_square_starts_centered() {
        let scene = MovingSquare::new(SyntheticConfig::default());
        assert_eq!(scene.position(), (144, 104));
        let frame = scene.render(1);
        let rgba = frame.to_rgba_image().unwrap();
        assert_eq!(rgba.get_pixel(150, 110).0, [255, 255, 255, 255]);
        assert_eq!(rgba.get_pixel(0, 0).0, [BACKGROUND, BACKGROUND, BACKGROUND, 255]);
    }

    #[test]
    fn test_render_corner_of_wide_frame() {
        let mut scene = MovingSquare::new(SyntheticConfig {
            width: 50,
            height: 30,
            square: 10,
            velocity: (100.0, 100.0),
            ..Default::default()
        });
        scene.step(); // 贴到右下角
        assert_eq!(scene.position(), (40, 20));
        let frame = scene.render(1);
        assert_eq!(frame.rgba_data.len(), rgba_len(50, 30));
        let rgba = frame.to_rgba_image().unwrap();
        assert_eq!(rgba.get_pixel(49, 29).0, [255, 255, 255, 255]);
        assert_eq!(rgba.get_pixel(39, 29).0, [BACKGROUND, BACKGROUND, BACKGROUND, 255]);
    }

    #[test]
    fn test_square_bounces() {
        let mut scene = MovingSquare::new(SyntheticConfig {
            width: 40,
            height: 40,
            square: 10,
            velocity: (20.0, 0.0),
            ..Default::default()
        });
        scene.step(); // 15 → 35 越界, 贴边反弹
        assert_eq!(scene.position().0, 30);
        scene.step();
        assert_eq!(scene.position().0, 10);
        scene.step(); // 10 → -10 越界, 贴边反弹
        assert_eq!(scene.position().0, 0);
    }

    #[test]
    fn test_camera_stops_after_max_frames() {
        let (tx, rx) = unbounded();
        let mut camera = SyntheticCamera::new(SyntheticConfig {
            fps: 1000.0,
            max_frames: Some(5),
            ..Default::default()
        });
        camera.start(Arc::new(ChannelSink(tx))).unwrap();
        let ids: Vec<u64> = (0..5)
            .map(|_| rx.recv_timeout(Duration::from_secs(2)).unwrap().frame_id)
            .collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
        camera.stop();
        assert!(!camera.is_running());
    }

    #[test]
    fn test_zero_size_is_no_device() {
        let (tx, _rx) = unbounded();
        let mut camera = SyntheticCamera::new(SyntheticConfig {
            width: 0,
            ..Default::default()
        });
        assert!(matches!(
            camera.start(Arc::new(ChannelSink(tx))),
            Err(Error::NoDevice(_))
        ));
    }
}
