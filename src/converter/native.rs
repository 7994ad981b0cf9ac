//! # 原生平台实现
//!
//! ## 设计思路
//!
//! 用 `image` crate 在进程内实现 `platform` 的全部能力，
//! 让同一套编排逻辑脱离浏览器运行（CLI、测试）。
//!
//! ## 实现思路
//!
//! - `MemoryUrlRegistry`：`HashMap` 保存 URL → 字节，并统计签发/撤销次数。
//! - `RasterDecoder`：先读 header 尺寸按像素上限快速拒绝，再完整解码；
//!   解码在 `spawn_blocking` 中执行，不阻塞异步运行时。
//! - `RasterCanvas`：RGBA 缓冲 + source-over 合成；`to_blob` 同样放到阻塞线程编码。
//! - `LogNotifier`：提示走 `log`。

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, ImageReader, Rgba, RgbaImage};

use super::config::{quality_percent, ConverterConfig, Rgb};
use super::controller::ImageConverter;
use super::platform::{Canvas, ImageDecoder, Notifier, ObjectUrlRegistry, RenderContext};
use super::source::{DecodedImage, JPEG_MIME, ObjectUrl};
use super::ConvertError;

const URL_PREFIX: &str = "blob:png-jpeg-converter/";

/// 使用原生平台能力的转换器。
pub type NativeConverter = ImageConverter<RasterDecoder, RasterCanvas, MemoryUrlRegistry, LogNotifier>;

impl NativeConverter {
    /// 按配置组装原生转换器。
    ///
    /// # 示例
    /// ```rust,no_run
    /// use png_jpeg_converter::converter::{ConverterConfig, FileSelection, NativeConverter, SourceFile};
    ///
    /// # async fn demo() -> Result<(), png_jpeg_converter::converter::ConvertError> {
    /// let converter = NativeConverter::native(ConverterConfig::default())?;
    /// let file = SourceFile::from_path("photo.png")?;
    /// converter.on_file_change(FileSelection::single(file)).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn native(config: ConverterConfig) -> Result<Self, ConvertError> {
        let decoder = RasterDecoder::new(config.max_decoded_pixels);
        ImageConverter::new(
            config,
            decoder,
            RasterCanvas::new(),
            MemoryUrlRegistry::new(),
            LogNotifier,
        )
    }
}

/// 进程内对象 URL 注册表。
#[derive(Debug, Default)]
pub struct MemoryUrlRegistry {
    entries: Mutex<HashMap<ObjectUrl, Bytes>>,
    next_id: AtomicU64,
    created: AtomicUsize,
    revoked: AtomicUsize,
}

impl MemoryUrlRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 仍未撤销的 URL 数量。
    pub fn live_count(&self) -> usize {
        self.entries
            .lock()
            .map(|entries| entries.len())
            .unwrap_or_else(|poisoned| poisoned.into_inner().len())
    }

    pub fn created_count(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn revoked_count(&self) -> usize {
        self.revoked.load(Ordering::SeqCst)
    }
}

impl ObjectUrlRegistry for MemoryUrlRegistry {
    fn create(&self, bytes: Bytes, mime_type: &str) -> Result<ObjectUrl, ConvertError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let url = ObjectUrl::new(format!("{URL_PREFIX}{id}"));

        let mut entries = self
            .entries
            .lock()
            .map_err(|_| ConvertError::ObjectUrl("对象 URL 注册表锁已中毒".to_string()))?;
        entries.insert(url.clone(), bytes);
        self.created.fetch_add(1, Ordering::SeqCst);

        log::debug!("🔗 签发对象 URL: {} ({})", url, mime_type);
        Ok(url)
    }

    fn resolve(&self, url: &ObjectUrl) -> Option<Bytes> {
        self.entries.lock().ok()?.get(url).cloned()
    }

    fn revoke(&self, url: &ObjectUrl) {
        let removed = match self.entries.lock() {
            Ok(mut entries) => entries.remove(url).is_some(),
            Err(poisoned) => poisoned.into_inner().remove(url).is_some(),
        };

        if removed {
            self.revoked.fetch_add(1, Ordering::SeqCst);
        } else {
            log::warn!("⚠️ 撤销未知或已撤销的对象 URL: {}", url);
        }
    }
}

/// 基于 `image` 的解码器。
#[derive(Debug, Clone)]
pub struct RasterDecoder {
    max_decoded_pixels: u64,
}

impl RasterDecoder {
    pub fn new(max_decoded_pixels: u64) -> Self {
        Self { max_decoded_pixels }
    }

    fn decode_blocking(bytes: &[u8], max_decoded_pixels: u64) -> Result<DecodedImage, ConvertError> {
        let (width, height) = Self::inspect_dimensions(bytes)?;
        Self::validate_pixel_limits(width, height, max_decoded_pixels)?;

        let decoded = image::load_from_memory(bytes)
            .map_err(|e| ConvertError::Decode(format!("图片解码失败，文件可能已损坏：{}", e)))?;

        Ok(DecodedImage::new(decoded.to_rgba8()))
    }

    /// 仅通过图片头信息读取宽高，用于完整解码前的像素限制检查。
    fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), ConvertError> {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| ConvertError::Decode(format!("无法识别图片格式：{}", e)))?
            .into_dimensions()
            .map_err(|e| ConvertError::Decode(format!("无法读取图片尺寸，文件可能已损坏：{}", e)))
    }

    fn validate_pixel_limits(width: u32, height: u32, max_pixels: u64) -> Result<(), ConvertError> {
        let pixels = (width as u64)
            .checked_mul(height as u64)
            .ok_or_else(|| ConvertError::TooLarge("图片像素数溢出".to_string()))?;

        if pixels > max_pixels {
            return Err(ConvertError::TooLarge(format!(
                "图片像素过大：{} 像素（限制：{} 像素）",
                pixels, max_pixels
            )));
        }

        Ok(())
    }
}

impl ImageDecoder for RasterDecoder {
    async fn decode(
        &self,
        url: &ObjectUrl,
        urls: &dyn ObjectUrlRegistry,
    ) -> Result<DecodedImage, ConvertError> {
        let bytes = urls
            .resolve(url)
            .ok_or_else(|| ConvertError::Decode(format!("对象 URL 已失效：{}", url)))?;
        let max_pixels = self.max_decoded_pixels;

        let decoded = tokio::task::spawn_blocking(move || Self::decode_blocking(&bytes, max_pixels))
            .await
            .map_err(|e| ConvertError::Decode(format!("解码任务异常退出：{}", e)))??;

        log::debug!(
            "✅ 图片解码成功 - {}x{}",
            decoded.natural_width(),
            decoded.natural_height()
        );
        Ok(decoded)
    }
}

/// 内存中的 RGBA 画布。
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    pixels: RgbaImage,
}

impl Default for RasterCanvas {
    fn default() -> Self {
        Self::new()
    }
}

impl RasterCanvas {
    pub fn new() -> Self {
        Self {
            pixels: RgbaImage::new(0, 0),
        }
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    fn encode_jpeg(pixels: &RgbaImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
        let (width, height) = pixels.dimensions();
        let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
        for pixel in pixels.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
        }

        let mut buffer = Vec::new();
        JpegEncoder::new_with_quality(&mut buffer, quality).encode(
            &rgb,
            width,
            height,
            ExtendedColorType::Rgb8,
        )?;
        Ok(buffer)
    }
}

/// source-over 合成单个通道。
fn blend_channel(src: u8, dst: u8, src_alpha: u32) -> u8 {
    ((src as u32 * src_alpha + dst as u32 * (255 - src_alpha) + 127) / 255) as u8
}

impl RenderContext for RasterCanvas {
    fn fill_rect(&mut self, color: Rgb, x: u32, y: u32, width: u32, height: u32) {
        let [r, g, b] = color.0;
        let x_end = x.saturating_add(width).min(self.pixels.width());
        let y_end = y.saturating_add(height).min(self.pixels.height());

        for py in y..y_end {
            for px in x..x_end {
                self.pixels.put_pixel(px, py, Rgba([r, g, b, 255]));
            }
        }
    }

    fn draw_image(&mut self, image: &DecodedImage, x: u32, y: u32) {
        let src = image.pixels();
        let x_end = x.saturating_add(src.width()).min(self.pixels.width());
        let y_end = y.saturating_add(src.height()).min(self.pixels.height());

        for py in y..y_end {
            for px in x..x_end {
                let Rgba([sr, sg, sb, sa]) = *src.get_pixel(px - x, py - y);
                let dst = self.pixels.get_pixel_mut(px, py);
                let Rgba([dr, dg, db, da]) = *dst;
                let alpha = sa as u32;

                let out_alpha = alpha + (da as u32 * (255 - alpha) + 127) / 255;
                *dst = Rgba([
                    blend_channel(sr, dr, alpha),
                    blend_channel(sg, dg, alpha),
                    blend_channel(sb, db, alpha),
                    out_alpha.min(255) as u8,
                ]);
            }
        }
    }
}

impl Canvas for RasterCanvas {
    fn set_size(&mut self, width: u32, height: u32) {
        self.pixels = RgbaImage::new(width, height);
    }

    fn size(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    fn context_2d(&mut self) -> Option<&mut dyn RenderContext> {
        Some(self as &mut dyn RenderContext)
    }

    async fn to_blob(&self, mime_type: &str, quality: f32) -> Option<Bytes> {
        if !mime_type.eq_ignore_ascii_case(JPEG_MIME) {
            log::warn!("⚠️ 不支持的输出格式：{}", mime_type);
            return None;
        }
        if self.pixels.width() == 0 || self.pixels.height() == 0 {
            log::warn!("⚠️ 画布尺寸为 0，无法编码");
            return None;
        }

        let pixels = self.pixels.clone();
        let quality = quality_percent(quality);

        match tokio::task::spawn_blocking(move || Self::encode_jpeg(&pixels, quality)).await {
            Ok(Ok(buffer)) => Some(Bytes::from(buffer)),
            Ok(Err(err)) => {
                log::error!("❌ JPEG 编码失败：{}", err);
                None
            }
            Err(err) => {
                log::error!("❌ JPEG 编码任务异常退出：{}", err);
                None
            }
        }
    }
}

/// 把提示写入日志。
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn alert(&self, message: &str) {
        log::warn!("🔔 {}", message);
    }

    fn diagnostic(&self, message: &str) {
        log::error!("❌ {}", message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageFormat};

    fn create_png_bytes(width: u32, height: u32, alpha: u8) -> Vec<u8> {
        let img = RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 255) as u8, (y % 255) as u8, 40, alpha])
        });

        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    #[test]
    fn registry_tracks_lifecycle() {
        let urls = MemoryUrlRegistry::new();
        let first = urls.create(Bytes::from_static(b"a"), "image/png").expect("create");
        let second = urls.create(Bytes::from_static(b"b"), "image/png").expect("create");

        assert_ne!(first, second);
        assert!(first.as_str().starts_with("blob:"));
        assert_eq!(urls.resolve(&second), Some(Bytes::from_static(b"b")));

        urls.revoke(&first);
        urls.revoke(&first);

        assert_eq!(urls.resolve(&first), None);
        assert_eq!(urls.created_count(), 2);
        assert_eq!(urls.revoked_count(), 1);
        assert_eq!(urls.live_count(), 1);
    }

    #[tokio::test]
    async fn decoder_reads_natural_dimensions() {
        let urls = MemoryUrlRegistry::new();
        let url = urls
            .create(Bytes::from(create_png_bytes(64, 48, 255)), "image/png")
            .expect("create");

        let image = RasterDecoder::new(1_000_000)
            .decode(&url, &urls)
            .await
            .expect("decode should succeed");

        assert_eq!((image.natural_width(), image.natural_height()), (64, 48));
    }

    #[tokio::test]
    async fn decoder_rejects_corrupt_bytes() {
        let urls = MemoryUrlRegistry::new();
        let url = urls
            .create(Bytes::from_static(b"definitely not an image"), "image/png")
            .expect("create");

        let result = RasterDecoder::new(1_000_000).decode(&url, &urls).await;
        assert!(matches!(result, Err(ConvertError::Decode(_))));
    }

    #[tokio::test]
    async fn decoder_rejects_too_many_pixels() {
        let urls = MemoryUrlRegistry::new();
        let url = urls
            .create(Bytes::from(create_png_bytes(200, 200, 255)), "image/png")
            .expect("create");

        let result = RasterDecoder::new(10_000).decode(&url, &urls).await;
        assert!(matches!(result, Err(ConvertError::TooLarge(_))));
    }

    #[tokio::test]
    async fn decoder_fails_on_revoked_url() {
        let urls = MemoryUrlRegistry::new();
        let url = urls
            .create(Bytes::from(create_png_bytes(4, 4, 255)), "image/png")
            .expect("create");
        urls.revoke(&url);

        let result = RasterDecoder::new(1_000_000).decode(&url, &urls).await;
        assert!(matches!(result, Err(ConvertError::Decode(_))));
    }

    #[test]
    fn resize_clears_previous_content() {
        let mut canvas = RasterCanvas::new();
        canvas.set_size(2, 2);
        canvas.fill_rect(Rgb([9, 9, 9]), 0, 0, 2, 2);

        canvas.set_size(3, 1);
        assert_eq!(canvas.size(), (3, 1));
        assert!(canvas.pixels().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn transparent_pixels_flatten_onto_background() {
        let mut canvas = RasterCanvas::new();
        canvas.set_size(2, 1);
        canvas.fill_rect(Rgb::WHITE, 0, 0, 2, 1);

        let mut src = RgbaImage::new(2, 1);
        src.put_pixel(0, 0, Rgba([0, 0, 0, 0]));
        src.put_pixel(1, 0, Rgba([0, 0, 0, 255]));
        canvas.draw_image(&DecodedImage::new(src), 0, 0);

        assert_eq!(canvas.pixels().get_pixel(0, 0).0, [255, 255, 255, 255]);
        assert_eq!(canvas.pixels().get_pixel(1, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn drawing_is_clipped_to_canvas() {
        let mut canvas = RasterCanvas::new();
        canvas.set_size(2, 2);
        let src = RgbaImage::from_pixel(4, 4, Rgba([1, 2, 3, 255]));

        canvas.draw_image(&DecodedImage::new(src), 1, 1);

        assert_eq!(canvas.pixels().get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(canvas.pixels().get_pixel(1, 1).0, [1, 2, 3, 255]);
    }

    #[tokio::test]
    async fn to_blob_produces_decodable_jpeg() {
        let mut canvas = RasterCanvas::new();
        canvas.set_size(32, 16);
        canvas.fill_rect(Rgb([200, 10, 10]), 0, 0, 32, 16);

        let blob = canvas.to_blob("image/jpeg", 0.9).await.expect("blob expected");

        assert_eq!(image::guess_format(&blob).expect("format"), ImageFormat::Jpeg);
        let decoded = image::load_from_memory(&blob).expect("decode jpeg");
        assert_eq!((decoded.width(), decoded.height()), (32, 16));
    }

    #[tokio::test]
    async fn to_blob_yields_nothing_for_empty_canvas_or_other_mime() {
        let mut canvas = RasterCanvas::new();
        assert!(canvas.to_blob("image/jpeg", 0.9).await.is_none());

        canvas.set_size(4, 4);
        assert!(canvas.to_blob("image/webp", 0.9).await.is_none());
    }
}
