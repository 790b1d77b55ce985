//! 跟踪系统数据结构定义
//! Data structures for the tracking loop

use serde::{Deserialize, Serialize};

/// 浮点比较容差
pub const EPSILON: f32 = 1e-4;

/// 图层坐标中的点 (左上角为原点)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// 图层坐标矩形 (预览图层, 左上角为原点, 单位: 点)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LayerRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl LayerRect {
    pub const ZERO: LayerRect = LayerRect {
        x: 0.0,
        y: 0.0,
        width: 0.0,
        height: 0.0,
    };

    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 以 center 为中心的矩形
    pub fn centered(center: Point, width: f32, height: f32) -> Self {
        Self::new(center.x - width / 2.0, center.y - height / 2.0, width, height)
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    pub fn approx_eq(&self, other: &LayerRect, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// 归一化矩形, 坐标在 [0,1] 区间内
///
/// 跟踪区域 (TrackedRegion) 使用的坐标系: 相对图层坐标Y轴原点翻转,
/// 图层 ↔ 归一化 的每次转换都要做 `y' = 1 - y`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// 翻转Y原点: `y' = 1 - y` (自身的逆运算)
    pub fn flip_y(&self) -> Self {
        Self {
            y: 1.0 - self.y,
            ..*self
        }
    }

    pub fn approx_eq(&self, other: &NormalizedRect, tolerance: f32) -> bool {
        (self.x - other.x).abs() <= tolerance
            && (self.y - other.y).abs() <= tolerance
            && (self.width - other.width).abs() <= tolerance
            && (self.height - other.height).abs() <= tolerance
    }
}

/// 跟踪精度 (传给跟踪器)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingLevel {
    #[default]
    Accurate,
    Fast,
}
