//! 图像叠加层 - 在预览快照上绘制锁定框和标签 (底板 + 文字)

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::info;

use super::Overlay;
use crate::input::Frame;
use crate::tracking::{LayerRect, PreviewGeometry};
use crate::{Error, Result};

const LOCK_ON_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const LOCK_ON_BORDER: u32 = 4;
const LABEL_COLOR: Rgba<u8> = Rgba([64, 64, 64, 128]);
const LABEL_SIZE: (u32, u32) = (300, 24);
const LABEL_TEXT_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);
const LABEL_FONT_SIZE: f32 = 20.0;

/// 加载标签字体 (TTF/OTF)
pub fn load_font(path: &Path) -> Result<FontArc> {
    let data = std::fs::read(path)?;
    let font = FontArc::try_from_vec(data)
        .map_err(|e| Error::Font(format!("{}: {}", path.display(), e)))?;
    info!("🔤 标签字体已加载: {}", path.display());
    Ok(font)
}

/// 保存叠加层状态, 并可渲染为图层尺寸的快照
///
/// 没有字体时标签只画底板.
#[derive(Clone, Debug)]
pub struct ImageOverlay {
    lock_on: LayerRect,
    label: String,
    label_hidden: bool,
    font: Option<FontArc>,
}

impl ImageOverlay {
    /// 初始: 无锁定框, 标签隐藏
    pub fn new() -> Self {
        Self {
            lock_on: LayerRect::ZERO,
            label: String::new(),
            label_hidden: true,
            font: None,
        }
    }

    pub fn with_font(mut self, font: FontArc) -> Self {
        self.font = Some(font);
        self
    }

    pub fn lock_on(&self) -> LayerRect {
        self.lock_on
    }

    /// 可见标签文本; 隐藏时为 None
    pub fn label(&self) -> Option<&str> {
        (!self.label_hidden).then_some(self.label.as_str())
    }

    pub fn label_text(&self) -> &str {
        &self.label
    }

    /// 渲染: 帧按缩放方式铺到图层画布, 再画锁定框和标签底板
    pub fn render(&self, frame: &Frame, geometry: &PreviewGeometry) -> Result<RgbaImage> {
        let (lw, lh) = geometry.layer_size();
        let mut canvas = RgbaImage::from_pixel(
            lw.round().max(1.0) as u32,
            lh.round().max(1.0) as u32,
            Rgba([0, 0, 0, 255]),
        );

        let content = geometry.content_rect();
        if !content.is_empty() {
            let rgba = frame.to_rgba_image()?;
            let resized = imageops::resize(
                &rgba,
                content.width.round().max(1.0) as u32,
                content.height.round().max(1.0) as u32,
                imageops::FilterType::Triangle,
            );
            imageops::overlay(
                &mut canvas,
                &resized,
                content.x.round() as i64,
                content.y.round() as i64,
            );
        }

        if !self.lock_on.is_empty() {
            let (x, y) = (self.lock_on.x.round() as i32, self.lock_on.y.round() as i32);
            let (w, h) = (
                self.lock_on.width.round() as u32,
                self.lock_on.height.round() as u32,
            );
            for i in 0..LOCK_ON_BORDER {
                if w <= 2 * i || h <= 2 * i {
                    break;
                }
                let rect = Rect::at(x + i as i32, y + i as i32).of_size(w - 2 * i, h - 2 * i);
                draw_hollow_rect_mut(&mut canvas, rect, LOCK_ON_COLOR);
            }
        }

        if !self.label_hidden {
            let (w, h) = LABEL_SIZE;
            let (px, py) = (
                (lw / 2.0).round() as i32 - (w / 2) as i32,
                (lh / 2.0).round() as i32 - (h / 2) as i32,
            );
            draw_filled_rect_mut(&mut canvas, Rect::at(px, py).of_size(w, h), LABEL_COLOR);

            if let Some(font) = &self.font {
                let scale = PxScale::from(LABEL_FONT_SIZE);
                let (tw, th) = text_size(scale, font, &self.label);
                // 文字在底板内居中, 超长时从底板左边开始
                let tx = px + (w.saturating_sub(tw) / 2) as i32;
                let ty = py + (h.saturating_sub(th) / 2) as i32;
                draw_text_mut(&mut canvas, LABEL_TEXT_COLOR, tx, ty, scale, font, &self.label);
            }
        }

        Ok(canvas)
    }
}

impl Default for ImageOverlay {
    fn default() -> Self {
        Self::new()
    }
}

impl Overlay for ImageOverlay {
    fn set_lock_on(&mut self, rect: LayerRect) {
        self.lock_on = rect;
    }

    fn set_label(&mut self, text: String) {
        self.label = text;
    }

    fn set_label_hidden(&mut self, hidden: bool) {
        self.label_hidden = hidden;
    }
}
