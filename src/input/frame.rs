use std::sync::Arc;

use image::{GrayImage, RgbaImage};

use crate::{Error, Result};

/// RGBA 缓冲区字节数 (按 usize 计算, 大尺寸不会溢出)
pub fn rgba_len(width: u32, height: u32) -> usize {
    width as usize * height as usize * 4
}

/// 采集帧 (采集线程 → 跟踪循环 / 条码循环)
///
/// 不可变; 像素数据用Arc共享, 避免复制.
#[derive(Clone, Debug)]
pub struct Frame {
    pub frame_id: u64,
    pub width: u32,
    pub height: u32,
    pub rgba_data: Arc<Vec<u8>>,
}

impl Frame {
    pub fn new(frame_id: u64, width: u32, height: u32, rgba_data: Vec<u8>) -> Result<Self> {
        if rgba_data.len() != rgba_len(width, height) {
            return Err(Error::InvalidFrame { width, height });
        }
        Ok(Self {
            frame_id,
            width,
            height,
            rgba_data: Arc::new(rgba_data),
        })
    }

    pub fn from_image(frame_id: u64, image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            frame_id,
            width,
            height,
            rgba_data: Arc::new(image.into_raw()),
        }
    }

    /// RGBA → RgbaImage (复制像素)
    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.rgba_data.as_ref().clone()).ok_or(
            Error::InvalidFrame {
                width: self.width,
                height: self.height,
            },
        )
    }

    /// RGBA → 灰度 (模板匹配用)
    pub fn to_luma(&self) -> Result<GrayImage> {
        let rgba = self.to_rgba_image()?;
        Ok(image::imageops::grayscale(&rgba))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_short_buffer() {
        assert!(matches!(
            Frame::new(1, 4, 4, vec![0; 10]),
            Err(Error::InvalidFrame { width: 4, height: 4 })
        ));
    }

    #[cfg(target_pointer_width = "64")]
    #[test]
    fn test_rgba_len_large_frame() {
        // 40000x40000x4 超出 u32
        assert_eq!(rgba_len(40_000, 40_000), 6_400_000_000);
        assert_eq!(rgba_len(u32::MAX, 1), u32::MAX as usize * 4);
    }

    #[test]
    fn test_to_luma() {
        let frame = Frame::new(1, 2, 1, vec![255, 255, 255, 255, 0, 0, 0, 255]).unwrap();
        let gray = frame.to_luma().unwrap();
        assert_eq!(gray.get_pixel(0, 0).0[0], 255);
        assert_eq!(gray.get_pixel(1, 0).0[0], 0);
    }
}
