//! 模板匹配跟踪器 (Template matching tracker)
//!
//! 核心思想:
//! 1. 新锁定目标时 (请求代数变化), 从当前帧截取目标区域作为模板
//! 2. 之后每帧在上一次位置周围的搜索窗口内做平方差匹配
//! 3. 最佳匹配的平均误差超过阈值视为丢失 (返回无结果)

use image::{imageops, GrayImage};
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};
use tracing::{debug, trace};

use super::tracker::{ObjectTracker, TrackCompletion, TrackRequest};
use super::types::{NormalizedRect, TrackingLevel};
use crate::Error;

/// 模板最小边长 (像素)
const MIN_TEMPLATE_SIZE: f32 = 2.0;

struct Template {
    image: GrayImage,
    /// 截取模板时的请求代数; 请求代数不同即视为重新锁定
    generation: u64,
}

pub struct TemplateTracker {
    max_error: f32,
    template: Option<Template>,
}

impl TemplateTracker {
    /// `max_error`: 允许的最大平均误差 (0-1, 按像素平方差归一化)
    pub fn new(max_error: f32) -> Self {
        Self {
            max_error,
            template: None,
        }
    }

    /// 搜索窗口相对目标尺寸的外扩比例
    fn search_margin(level: TrackingLevel) -> f32 {
        match level {
            TrackingLevel::Accurate => 0.5,
            TrackingLevel::Fast => 0.25,
        }
    }

    fn run(&mut self, request: &TrackRequest) -> crate::Result<Option<NormalizedRect>> {
        let gray = request.frame.to_luma()?;
        let (fw, fh) = gray.dimensions();

        let reanchor = self
            .template
            .as_ref()
            .map_or(true, |t| t.generation != request.generation);
        if reanchor {
            let Some((x, y, w, h)) = pixel_rect(request.target, fw, fh) else {
                self.template = None;
                return Err(Error::Detector(format!(
                    "target {:?} outside {}x{} frame",
                    request.target, fw, fh
                )));
            };
            let image = imageops::crop_imm(&gray, x, y, w, h).to_image();
            debug!("🎯 模板重新锁定: {}x{} @ ({}, {})", w, h, x, y);
            self.template = Some(Template {
                image,
                generation: request.generation,
            });
            return Ok(Some(request.target));
        }

        let Some(template) = self.template.as_ref() else {
            return Ok(None);
        };
        let Some((x, y, w, h)) = pixel_rect(request.target, fw, fh) else {
            return Ok(None);
        };
        let (tw, th) = template.image.dimensions();

        // 搜索窗口 = 上一次位置向四周外扩
        let margin = Self::search_margin(request.level);
        let mx = (w as f32 * margin).round() as u32;
        let my = (h as f32 * margin).round() as u32;
        let wx0 = x.saturating_sub(mx);
        let wy0 = y.saturating_sub(my);
        let wx1 = (x + w + mx).min(fw);
        let wy1 = (y + h + my).min(fh);
        if wx1 - wx0 < tw || wy1 - wy0 < th {
            return Ok(None);
        }

        let window = imageops::crop_imm(&gray, wx0, wy0, wx1 - wx0, wy1 - wy0).to_image();
        let scores = match_template(
            &window,
            &template.image,
            MatchTemplateMethod::SumOfSquaredErrors,
        );
        let extremes = find_extremes(&scores);
        let error = extremes.min_value / (tw * th) as f32 / (255.0 * 255.0);
        trace!("模板匹配误差 {:.4} (阈值 {:.4})", error, self.max_error);
        if error > self.max_error {
            return Ok(None);
        }

        let (dx, dy) = extremes.min_value_location;
        Ok(Some(normalized_rect(wx0 + dx, wy0 + dy, tw, th, fw, fh)))
    }
}

impl ObjectTracker for TemplateTracker {
    fn track(&mut self, request: TrackRequest, done: TrackCompletion) {
        let result = self.run(&request);
        done.complete(result);
    }

    fn name(&self) -> &str {
        "template"
    }
}

/// 跟踪区域 → 帧像素矩形 (裁剪到帧内); 太小或完全在帧外时为 None
fn pixel_rect(rect: NormalizedRect, width: u32, height: u32) -> Option<(u32, u32, u32, u32)> {
    let m = rect.flip_y();
    let (fw, fh) = (width as f32, height as f32);
    let x0 = (m.x * fw).round().max(0.0);
    let y0 = (m.y * fh).round().max(0.0);
    let x1 = ((m.x + m.width) * fw).round().min(fw);
    let y1 = ((m.y + m.height) * fh).round().min(fh);
    if x1 - x0 < MIN_TEMPLATE_SIZE || y1 - y0 < MIN_TEMPLATE_SIZE {
        return None;
    }
    Some((x0 as u32, y0 as u32, (x1 - x0) as u32, (y1 - y0) as u32))
}

/// 帧像素矩形 → 跟踪区域
fn normalized_rect(x: u32, y: u32, w: u32, h: u32, width: u32, height: u32) -> NormalizedRect {
    let (fw, fh) = (width as f32, height as f32);
    NormalizedRect::new(x as f32 / fw, y as f32 / fh, w as f32 / fw, h as f32 / fh).flip_y()
}
