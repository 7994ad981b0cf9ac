//! # 画布编码模块
//!
//! ## 设计思路
//!
//! 把“解码位图 → 画布 → JPEG 字节”拆成 `draw` 与 `encode` 两步，
//! 控制器可以在两步之间切换状态；`draw_and_encode` 是二者的组合。
//!
//! ## 实现思路
//!
//! 1. 画布尺寸设为图片自然尺寸（同时清空旧内容）
//! 2. 拿不到 2D 上下文立即失败，不产出任何结果
//! 3. 先铺不透明底色，再在 `(0, 0)` 绘制图片（JPEG 无 alpha 通道）
//! 4. 异步编码为 JPEG，空结果视为编码失败

use std::time::Duration;

use bytes::Bytes;

use super::config::{ConverterConfig, JPEG_QUALITY, Rgb};
use super::platform::Canvas;
use super::source::{DecodedImage, JPEG_MIME};
use super::ConvertError;

/// 绘制与编码参数。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncodeOptions {
    pub background: Rgb,
    pub flatten_alpha: bool,
    pub quality: f32,
    pub timeout: Option<Duration>,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            background: Rgb::WHITE,
            flatten_alpha: true,
            quality: JPEG_QUALITY,
            timeout: None,
        }
    }
}

impl From<&ConverterConfig> for EncodeOptions {
    fn from(config: &ConverterConfig) -> Self {
        Self {
            background: config.background,
            flatten_alpha: config.flatten_alpha,
            quality: JPEG_QUALITY,
            timeout: config.step_timeout(),
        }
    }
}

/// 把图片画到画布上，画布尺寸与图片自然尺寸一致。
pub fn draw<C: Canvas>(
    image: &DecodedImage,
    canvas: &mut C,
    options: &EncodeOptions,
) -> Result<(), ConvertError> {
    let (width, height) = (image.natural_width(), image.natural_height());
    canvas.set_size(width, height);

    let context = canvas
        .context_2d()
        .ok_or_else(|| ConvertError::Surface("无法获取画布 2D 上下文".to_string()))?;

    if options.flatten_alpha {
        context.fill_rect(options.background, 0, 0, width, height);
    }
    context.draw_image(image, 0, 0);

    log::debug!("🎨 已绘制到画布 - {}x{}", width, height);
    Ok(())
}

/// 把画布当前内容编码为 JPEG。
pub async fn encode<C: Canvas>(canvas: &C, options: &EncodeOptions) -> Result<Bytes, ConvertError> {
    let encoding = canvas.to_blob(JPEG_MIME, options.quality);
    let blob = match options.timeout {
        Some(limit) => tokio::time::timeout(limit, encoding).await.map_err(|_| {
            ConvertError::Timeout(format!("JPEG 编码超过 {}ms 未完成", limit.as_millis()))
        })?,
        None => encoding.await,
    };

    match blob {
        Some(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(ConvertError::Encode("JPEG 编码没有产出数据".to_string())),
    }
}

/// 绘制并编码，成功时返回 JPEG 字节。
pub async fn draw_and_encode<C: Canvas>(
    image: &DecodedImage,
    canvas: &mut C,
    options: &EncodeOptions,
) -> Result<Bytes, ConvertError> {
    draw(image, canvas, options)?;
    encode(canvas, options).await
}
