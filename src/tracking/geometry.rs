//! 预览图层几何换算 (normalized ↔ layer)
//!
//! 元数据坐标 (metadata): 相对采集帧的归一化坐标, 左上角原点.
//! 归一化坐标 (normalized): 跟踪区域使用的坐标, 元数据坐标翻转Y原点.
//! 图层坐标 (layer): 预览图层上的点坐标, 左上角原点.

use serde::{Deserialize, Serialize};

use super::types::{LayerRect, NormalizedRect, Point};

/// 视频在预览图层中的缩放方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoGravity {
    /// 拉伸填满图层
    Resize,
    /// 保持比例, 完整显示 (留黑边)
    ResizeAspect,
    /// 保持比例, 填满图层 (裁剪)
    #[default]
    ResizeAspectFill,
}

/// 预览图层几何: 图层尺寸 + 采集帧尺寸 + 缩放方式
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreviewGeometry {
    layer_width: f32,
    layer_height: f32,
    frame_width: u32,
    frame_height: u32,
    gravity: VideoGravity,
}

impl PreviewGeometry {
    pub fn new(
        layer_width: f32,
        layer_height: f32,
        frame_width: u32,
        frame_height: u32,
        gravity: VideoGravity,
    ) -> Self {
        Self {
            layer_width,
            layer_height,
            frame_width,
            frame_height,
            gravity,
        }
    }

    pub fn layer_size(&self) -> (f32, f32) {
        (self.layer_width, self.layer_height)
    }

    pub fn frame_size(&self) -> (u32, u32) {
        (self.frame_width, self.frame_height)
    }

    pub fn set_layer_size(&mut self, width: f32, height: f32) {
        self.layer_width = width;
        self.layer_height = height;
    }

    pub fn set_frame_size(&mut self, width: u32, height: u32) {
        self.frame_width = width;
        self.frame_height = height;
    }

    /// 采集帧在图层中的显示区域 (aspect fill 时可能超出图层)
    pub fn content_rect(&self) -> LayerRect {
        let (lw, lh) = (self.layer_width, self.layer_height);
        if self.frame_width == 0 || self.frame_height == 0 {
            return LayerRect::new(0.0, 0.0, lw, lh);
        }
        let fw = self.frame_width as f32;
        let fh = self.frame_height as f32;

        let scale = match self.gravity {
            VideoGravity::Resize => return LayerRect::new(0.0, 0.0, lw, lh),
            VideoGravity::ResizeAspect => (lw / fw).min(lh / fh),
            VideoGravity::ResizeAspectFill => (lw / fw).max(lh / fh),
        };
        let (dw, dh) = (fw * scale, fh * scale);
        LayerRect::new((lw - dw) / 2.0, (lh - dh) / 2.0, dw, dh)
    }

    /// 元数据矩形 → 图层矩形 (不翻转Y)
    pub fn layer_rect_from_metadata(&self, rect: NormalizedRect) -> LayerRect {
        let c = self.content_rect();
        LayerRect::new(
            c.x + rect.x * c.width,
            c.y + rect.y * c.height,
            rect.width * c.width,
            rect.height * c.height,
        )
    }

    /// 图层矩形 → 元数据矩形 (不翻转Y)
    pub fn metadata_rect_from_layer(&self, rect: LayerRect) -> NormalizedRect {
        let c = self.content_rect();
        if c.is_empty() {
            return NormalizedRect::default();
        }
        NormalizedRect::new(
            (rect.x - c.x) / c.width,
            (rect.y - c.y) / c.height,
            rect.width / c.width,
            rect.height / c.height,
        )
    }

    /// 图层矩形 → 跟踪区域 (翻转Y原点)
    pub fn normalized_from_layer(&self, rect: LayerRect) -> NormalizedRect {
        self.metadata_rect_from_layer(rect).flip_y()
    }

    /// 跟踪区域 → 图层矩形 (翻转Y原点)
    pub fn layer_from_normalized(&self, rect: NormalizedRect) -> LayerRect {
        self.layer_rect_from_metadata(rect.flip_y())
    }

    /// 点击位置 → 以该点为中心的默认尺寸跟踪区域
    pub fn target_at(&self, point: Point, width: f32, height: f32) -> (LayerRect, NormalizedRect) {
        let layer = LayerRect::centered(point, width, height);
        (layer, self.normalized_from_layer(layer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracking::types::EPSILON;

    fn fill_geometry() -> PreviewGeometry {
        // 竖屏图层 375x812, 4:3 横向帧
        PreviewGeometry::new(375.0, 812.0, 1440, 1080, VideoGravity::ResizeAspectFill)
    }

    #[test]
    fn test_content_rect_resize() {
        let g = PreviewGeometry::new(400.0, 300.0, 1920, 1080, VideoGravity::Resize);
        assert_eq!(g.content_rect(), LayerRect::new(0.0, 0.0, 400.0, 300.0));
    }

    #[test]
    fn test_content_rect_aspect_letterbox() {
        let g = PreviewGeometry::new(400.0, 400.0, 200, 100, VideoGravity::ResizeAspect);
        let c = g.content_rect();
        assert!(c.approx_eq(&LayerRect::new(0.0, 100.0, 400.0, 200.0), EPSILON));
    }

    #[test]
    fn test_content_rect_aspect_fill_crops() {
        let g = PreviewGeometry::new(400.0, 400.0, 200, 100, VideoGravity::ResizeAspectFill);
        let c = g.content_rect();
        assert!(c.approx_eq(&LayerRect::new(-200.0, 0.0, 800.0, 400.0), EPSILON));
    }

    #[test]
    fn test_zero_frame_falls_back_to_layer() {
        let g = PreviewGeometry::new(320.0, 240.0, 0, 0, VideoGravity::ResizeAspectFill);
        assert_eq!(g.content_rect(), LayerRect::new(0.0, 0.0, 320.0, 240.0));
    }

    #[test]
    fn test_layer_round_trip() {
        for gravity in [
            VideoGravity::Resize,
            VideoGravity::ResizeAspect,
            VideoGravity::ResizeAspectFill,
        ] {
            let mut g = fill_geometry();
            g.gravity = gravity;
            let rect = LayerRect::new(37.5, 420.25, 100.0, 80.0);
            let back = g.layer_from_normalized(g.normalized_from_layer(rect));
            assert!(back.approx_eq(&rect, 1e-3), "{:?}: {:?} != {:?}", gravity, back, rect);
        }
    }

    #[test]
    fn test_metadata_round_trip_without_flip() {
        let g = fill_geometry();
        let rect = LayerRect::new(10.0, 20.0, 30.0, 40.0);
        let back = g.layer_rect_from_metadata(g.metadata_rect_from_layer(rect));
        assert!(back.approx_eq(&rect, 1e-3));
    }

    #[test]
    fn test_normalized_flips_origin() {
        let g = PreviewGeometry::new(100.0, 100.0, 100, 100, VideoGravity::Resize);
        let layer = LayerRect::new(10.0, 20.0, 30.0, 40.0);
        let n = g.normalized_from_layer(layer);
        assert!(n.approx_eq(&NormalizedRect::new(0.1, 0.8, 0.3, 0.4), EPSILON));
    }

    #[test]
    fn test_target_at_centers_default_rect() {
        let g = PreviewGeometry::new(200.0, 200.0, 200, 200, VideoGravity::Resize);
        let (layer, n) = g.target_at(Point::new(100.0, 50.0), 100.0, 100.0);
        assert_eq!(layer, LayerRect::new(50.0, 0.0, 100.0, 100.0));
        // y_meta = 0 → y = 1
        assert!(n.approx_eq(&NormalizedRect::new(0.25, 1.0, 0.5, 0.5), EPSILON));
    }
}
