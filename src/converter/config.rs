//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“可调策略”集中到 `ConverterConfig`，保证运行时行为可观测、可调整、可测试。
//! 默认值即线上行为：16 MiB 上限、白色底色、对象 URL 发布。
//! JPEG 质量固定为 [`JPEG_QUALITY`]，不开放配置。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用配置。
//! - 通过 `serde(default)` 支持 JSON 只写部分字段。
//! - `validate` 在构造转换器时统一校验取值范围。

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ConvertError;

/// 固定的 JPEG 编码质量。
pub const JPEG_QUALITY: f32 = 0.9;

/// 不透明背景色（RGB）。JPEG 没有 alpha 通道，透明像素会被压平到此颜色上。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const WHITE: Self = Self([255, 255, 255]);
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

/// 下载入口使用的地址形式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    /// 由 `ObjectUrlRegistry` 签发、可撤销的对象 URL。
    #[default]
    ObjectUrl,
    /// 内联的 base64 Data URL，无需撤销。
    DataUrl,
}

/// 转换器配置。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConverterConfig {
    /// 允许上传的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 绘制前填充的底色。
    pub background: Rgb,
    /// 是否在绘制前填充底色。
    pub flatten_alpha: bool,
    pub link_kind: LinkKind,
    /// 解码/编码单步等待上限（毫秒），`None` 表示一直等待。
    pub step_timeout_ms: Option<u64>,
    /// 解码后的像素上限（`width * height`），由原生解码器使用。
    pub max_decoded_pixels: u64,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            max_file_size: 16 * 1024 * 1024,
            background: Rgb::WHITE,
            flatten_alpha: true,
            link_kind: LinkKind::ObjectUrl,
            step_timeout_ms: None,
            max_decoded_pixels: 40_000_000,
        }
    }
}

impl ConverterConfig {
    pub fn validate(&self) -> Result<(), ConvertError> {
        if self.max_file_size == 0 {
            return Err(ConvertError::InvalidConfig("max_file_size 必须大于 0".to_string()));
        }
        if let Some(ms) = self.step_timeout_ms {
            if !(10..=600_000).contains(&ms) {
                return Err(ConvertError::InvalidConfig(
                    "step_timeout_ms 必须在 10~600000 毫秒之间".to_string(),
                ));
            }
        }
        if self.max_decoded_pixels == 0 {
            return Err(ConvertError::InvalidConfig("max_decoded_pixels 必须大于 0".to_string()));
        }
        Ok(())
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_ms.map(Duration::from_millis)
    }
}

/// 把 `(0, 1]` 的质量系数换算为编码器使用的 1~100 整数。
pub(crate) fn quality_percent(quality: f32) -> u8 {
    (quality * 100.0).round().clamp(1.0, 100.0) as u8
}
