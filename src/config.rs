//! 跟踪配置 - 通过JSON文件调整参数

use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, warn};

use crate::tracking::{TrackingLevel, VideoGravity};
use crate::Result;

/// 跟踪循环参数配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    // === 点击锁定 ===
    pub target_width: f32,  // 点击时默认锁定框宽度 (图层坐标)
    pub target_height: f32, // 点击时默认锁定框高度 (图层坐标)

    // === 预览图层 ===
    pub layer_width: f32,
    pub layer_height: f32,
    pub video_gravity: VideoGravity,

    // === 采集帧 (收到第一帧前使用) ===
    pub frame_width: u32,
    pub frame_height: u32,

    // === 跟踪器 ===
    pub tracking_level: TrackingLevel,
    pub max_match_error: f32, // 模板匹配最大平均误差 (0-1)

    // === 叠加层 ===
    pub label_font: String, // 标签字体文件, 加载失败时只画底板

    // === 统计 ===
    pub stats_interval: u64, // 每N次完成打印一次统计
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            target_width: 100.0,
            target_height: 100.0,

            layer_width: 375.0,
            layer_height: 812.0,
            video_gravity: VideoGravity::ResizeAspectFill,

            // .photo 预设为 4:3
            frame_width: 1440,
            frame_height: 1080,

            tracking_level: TrackingLevel::Accurate,
            max_match_error: 0.1,

            label_font: "assets/font/DejaVuSans.ttf".to_string(),

            stats_interval: 60,
        }
    }
}

impl TrackingConfig {
    /// 从JSON文件加载配置
    pub fn load(path: &str) -> Self {
        match fs::read_to_string(path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => {
                    info!("✅ 配置已从 {} 加载", path);
                    config
                }
                Err(e) => {
                    warn!("⚠️  配置文件解析失败: {}, 使用默认值", e);
                    Self::default()
                }
            },
            Err(_) => {
                info!("📝 配置文件不存在,创建默认配置...");
                let config = Self::default();
                if let Err(e) = config.save(path) {
                    warn!("❌ 保存配置失败: {}", e);
                }
                config
            }
        }
    }

    /// 保存配置到JSON文件
    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        info!("💾 配置已保存到 {}", path);
        Ok(())
    }

    /// 打印当前配置
    pub fn print_summary(&self) {
        info!("🎛️  当前跟踪配置:");
        info!(
            "  默认锁定框: {:.0}x{:.0}",
            self.target_width, self.target_height
        );
        info!(
            "  预览图层: {:.0}x{:.0} ({:?})",
            self.layer_width, self.layer_height, self.video_gravity
        );
        info!("  跟踪精度: {:?}", self.tracking_level);
        info!("  匹配误差上限: {:.2}", self.max_match_error);
        info!("  标签字体: {}", self.label_font);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_target_size() {
        let config = TrackingConfig::default();
        assert_eq!(config.target_width, 100.0);
        assert_eq!(config.target_height, 100.0);
        assert_eq!(config.video_gravity, VideoGravity::ResizeAspectFill);
        assert_eq!(config.tracking_level, TrackingLevel::Accurate);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: TrackingConfig =
            serde_json::from_str(r#"{ "target_width": 64.0, "video_gravity": "resize" }"#)
                .unwrap();
        assert_eq!(config.target_width, 64.0);
        assert_eq!(config.target_height, 100.0);
        assert_eq!(config.video_gravity, VideoGravity::Resize);
    }

    #[test]
    fn test_save_then_load() {
        let path = std::env::temp_dir().join(format!("objtrack-config-{}.json", std::process::id()));
        let path = path.to_string_lossy().to_string();

        let mut config = TrackingConfig::default();
        config.tracking_level = TrackingLevel::Fast;
        config.layer_width = 640.0;
        config.save(&path).unwrap();

        let loaded = TrackingConfig::load(&path);
        assert_eq!(loaded.tracking_level, TrackingLevel::Fast);
        assert_eq!(loaded.layer_width, 640.0);
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_writes_default() {
        let path = std::env::temp_dir().join(format!("objtrack-missing-{}.json", std::process::id()));
        let _ = fs::remove_file(&path);
        let path = path.to_string_lossy().to_string();

        let config = TrackingConfig::load(&path);
        assert_eq!(config.target_width, 100.0);
        assert!(std::path::Path::new(&path).exists());
        let _ = fs::remove_file(&path);
    }
}
