/// 摄像头目标跟踪 / 条码识别演示
///
/// 系统架构:
/// 1. 采集线程:   合成摄像头或图片序列 (独立工作线程)
/// 2. 跟踪线程:   跟踪循环 + 跟踪器 (独立工作线程)
/// 3. 主线程:     UI队列 → 叠加层 → 快照
///
/// 直接运行: cargo run --bin objtrack -- track --snapshots out
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use objtrack::input::{ImageSequence, LatestFrame, SyntheticCamera, SyntheticConfig, Tee};
use objtrack::tracking::TrackingLevel;
use objtrack::{
    gen_time_string, load_font, ui_queue, BarcodeLoop, CaptureSession, FrameSink, ImageOverlay,
    ManifestDecoder, Point, TemplateTracker, TrackingConfig, TrackingLoop,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "摄像头目标跟踪 / 条码识别演示", long_about = None)]
struct Args {
    /// 配置文件 (不存在时写入默认配置)
    #[arg(short, long, default_value = "objtrack.json")]
    config: String,

    /// 日志格式
    #[arg(long, value_enum, default_value_t = LogFormat::Compact)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Compact,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 在合成画面上跟踪移动方块
    Track {
        /// 总帧数
        #[arg(long, default_value_t = 150)]
        frames: u64,

        /// 帧率
        #[arg(long, default_value_t = 30.0)]
        fps: f64,

        /// 采集帧宽
        #[arg(long, default_value_t = 320)]
        width: u32,

        /// 采集帧高
        #[arg(long, default_value_t = 240)]
        height: u32,

        /// 点击位置X (图层坐标, 默认图层中心)
        #[arg(long)]
        tap_x: Option<f32>,

        /// 点击位置Y (图层坐标, 默认图层中心)
        #[arg(long)]
        tap_y: Option<f32>,

        /// 在第N帧长按清除目标
        #[arg(long)]
        clear_at: Option<u64>,

        /// 在第N帧旋转预览图层 (交换宽高)
        #[arg(long)]
        rotate_at: Option<u64>,

        /// 快捷跟踪 (更小的搜索窗口)
        #[arg(long)]
        fast: bool,

        /// 快照输出目录
        #[arg(long)]
        snapshots: Option<PathBuf>,

        /// 每N帧保存一张快照
        #[arg(long, default_value_t = 15)]
        every: u64,
    },

    /// 回放图片目录并显示条码内容
    Barcode {
        /// 图片目录
        dir: PathBuf,

        /// 条码清单 (默认 <dir>/payloads.json)
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// 帧率
        #[arg(long, default_value_t = 10.0)]
        fps: f64,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.log_format)?;

    let mut config = TrackingConfig::load(&args.config);

    match args.command {
        Command::Track {
            frames,
            fps,
            width,
            height,
            tap_x,
            tap_y,
            clear_at,
            rotate_at,
            fast,
            snapshots,
            every,
        } => {
            if fast {
                config.tracking_level = TrackingLevel::Fast;
            }
            config.frame_width = width;
            config.frame_height = height;
            config.print_summary();

            let camera = SyntheticConfig {
                width,
                height,
                fps,
                square: 24,
                jitter: 0.3,
                max_frames: Some(frames),
                seed: 7,
                ..Default::default()
            };
            let tap = Point::new(
                tap_x.unwrap_or(config.layer_width / 2.0),
                tap_y.unwrap_or(config.layer_height / 2.0),
            );
            run_track(
                &config,
                camera,
                tap,
                TrackEvents {
                    clear_at,
                    rotate_at,
                },
                snapshots,
                every.max(1),
            )
        }
        Command::Barcode { dir, manifest, fps } => run_barcode(dir, manifest, fps),
    }
}

fn init_tracing(format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty())
            .try_init(),
        LogFormat::Compact => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact())
            .try_init(),
    }
    .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

/// 在指定帧触发的界面事件
struct TrackEvents {
    clear_at: Option<u64>,
    rotate_at: Option<u64>,
}

/// 加载标签字体; 失败时叠加层只画底板
fn overlay_for(config: &TrackingConfig) -> ImageOverlay {
    match load_font(Path::new(&config.label_font)) {
        Ok(font) => ImageOverlay::new().with_font(font),
        Err(e) => {
            warn!("⚠️ 标签字体加载失败 ({}): {}", config.label_font, e);
            ImageOverlay::new()
        }
    }
}

fn run_track(
    config: &TrackingConfig,
    camera: SyntheticConfig,
    tap: Point,
    events: TrackEvents,
    snapshots: Option<PathBuf>,
    every: u64,
) -> Result<()> {
    info!("🚀 目标跟踪演示启动");

    let (ui_tx, ui_rx) = ui_queue();
    let tracker = TemplateTracker::new(config.max_match_error);
    let tracking = TrackingLoop::spawn(tracker, config, ui_tx).context("启动跟踪循环失败")?;
    let handle = tracking.handle();

    let snapshot_dir = match snapshots {
        Some(dir) => {
            let dir = dir.join(gen_time_string("-"));
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("创建快照目录失败: {}", dir.display()))?;
            info!("📁 快照目录: {}", dir.display());
            Some(dir)
        }
        None => None,
    };

    // ========== 采集: 预览槽位 + 跟踪循环 ==========
    let latest = Arc::new(LatestFrame::new());
    let sinks: Vec<Arc<dyn FrameSink>> = vec![
        latest.clone() as Arc<dyn FrameSink>,
        Arc::new(handle.clone()) as Arc<dyn FrameSink>,
    ];
    let mut session = CaptureSession::new(
        Box::new(SyntheticCamera::new(camera)),
        Arc::new(Tee::new(sinks)),
    );
    session.appear().context("采集启动失败")?;

    // ========== 主线程: UI队列 ==========
    let mut overlay = overlay_for(config);
    let mut tapped = false;
    let mut cleared = false;
    let mut rotated = false;
    let mut last_snapshot = 0u64;

    while session.is_running() {
        ui_rx.pump_timeout(&mut overlay, Duration::from_millis(10));
        ui_rx.drain(&mut overlay);

        let Some(frame) = latest.get() else {
            continue;
        };

        if !tapped {
            handle.set_target(tap)?;
            tapped = true;
        }
        if let Some(n) = events.clear_at {
            if !cleared && frame.frame_id >= n {
                handle.clear_target()?;
                cleared = true;
            }
        }
        if let Some(n) = events.rotate_at {
            if !rotated && frame.frame_id >= n {
                info!("🔄 图层旋转: {:.0}x{:.0}", config.layer_height, config.layer_width);
                handle.resize_layer(config.layer_height, config.layer_width)?;
                rotated = true;
            }
        }

        if let Some(dir) = &snapshot_dir {
            if frame.frame_id >= last_snapshot + every {
                let geometry = handle.snapshot()?.geometry;
                ui_rx.drain(&mut overlay);
                let canvas = overlay.render(&frame, &geometry)?;
                let path = dir.join(format!("frame_{:05}.png", frame.frame_id));
                canvas
                    .save(&path)
                    .with_context(|| format!("保存快照失败: {}", path.display()))?;
                last_snapshot = frame.frame_id;
            }
        }
    }

    session.disappear();
    let snapshot = handle.snapshot()?;
    ui_rx.drain(&mut overlay);
    tracking.shutdown();

    let stats = &snapshot.stats;
    info!("📊 跟踪结束: {:?} | 目标 {:?}", snapshot.phase, snapshot.target);
    info!(
        "   帧: 收到{} 提交{} | 丢弃: 无目标{} 忙{} 迟到{}",
        stats.frames_received,
        stats.submitted,
        stats.dropped_no_target,
        stats.dropped_busy,
        stats.dropped_late
    );
    info!(
        "   结果: 更新{} 未变{} 失败{} 过期{} | 锁定框 {:?}",
        stats.updated,
        stats.unchanged,
        stats.failed,
        stats.stale,
        overlay.lock_on()
    );
    Ok(())
}

fn run_barcode(dir: PathBuf, manifest: Option<PathBuf>, fps: f64) -> Result<()> {
    info!("🚀 条码识别演示启动: {}", dir.display());

    let source = ImageSequence::new(&dir, fps, false);
    let manifest = manifest.unwrap_or_else(|| dir.join("payloads.json"));
    let decoder = ManifestDecoder::load(&manifest, source.files())
        .with_context(|| format!("读取条码清单失败: {}", manifest.display()))?;

    let (ui_tx, ui_rx) = ui_queue();
    let barcode = Arc::new(BarcodeLoop::new(Arc::new(decoder), ui_tx));
    let mut session = CaptureSession::new(Box::new(source), barcode.clone());
    session.appear().context("采集启动失败")?;

    let mut overlay = ImageOverlay::new();
    let mut shown: Option<String> = None;
    while session.is_running() {
        if ui_rx.pump_timeout(&mut overlay, Duration::from_millis(20)) {
            ui_rx.drain(&mut overlay);
        }
        let label = overlay.label().map(str::to_string);
        if label != shown {
            match &label {
                Some(text) => info!("🏷️ 条码: {}", text),
                None => info!("🏷️ 标签隐藏"),
            }
            shown = label;
        }
    }
    session.disappear();

    let stats = barcode.stats();
    info!(
        "📊 条码识别结束: 帧{} 识别{} 无条码{} 失败{}",
        stats.frames, stats.decoded, stats.empty, stats.failed
    );
    Ok(())
}
