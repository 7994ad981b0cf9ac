// Scripted platform doubles shared by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use png_jpeg_converter::converter::{
    Canvas, ConvertError, ConverterConfig, DecodedImage, ImageConverter, ImageDecoder, Notifier,
    ObjectUrl, ObjectUrlRegistry, RenderContext, Rgb,
};
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlEvent {
    Create(ObjectUrl),
    Revoke(ObjectUrl),
}

/// 记录每一次签发与撤销的注册表。
#[derive(Default)]
pub struct RecordingRegistry {
    entries: Mutex<HashMap<ObjectUrl, Bytes>>,
    events: Mutex<Vec<UrlEvent>>,
    next_id: AtomicU64,
}

impl RecordingRegistry {
    pub fn events(&self) -> Vec<UrlEvent> {
        self.events.lock().expect("events lock").clone()
    }

    pub fn live(&self) -> usize {
        self.entries.lock().expect("entries lock").len()
    }

    pub fn revoke_count(&self, url: &ObjectUrl) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, UrlEvent::Revoke(u) if u == url))
            .count()
    }
}

impl ObjectUrlRegistry for RecordingRegistry {
    fn create(&self, bytes: Bytes, _mime_type: &str) -> Result<ObjectUrl, ConvertError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let url = ObjectUrl::new(format!("blob:test/{id}"));
        self.entries.lock().expect("entries lock").insert(url.clone(), bytes);
        self.events.lock().expect("events lock").push(UrlEvent::Create(url.clone()));
        Ok(url)
    }

    fn resolve(&self, url: &ObjectUrl) -> Option<Bytes> {
        self.entries.lock().expect("entries lock").get(url).cloned()
    }

    fn revoke(&self, url: &ObjectUrl) {
        self.entries.lock().expect("entries lock").remove(url);
        self.events.lock().expect("events lock").push(UrlEvent::Revoke(url.clone()));
    }
}

pub const SLOW: &[u8] = b"slow";
pub const BROKEN: &[u8] = b"broken";

/// 按文件内容决定行为的解码器：
/// `BROKEN` 解码失败，`SLOW` 等待 `release` 放行，其余返回固定尺寸的透明位图。
pub struct GatedDecoder {
    pub width: u32,
    pub height: u32,
    pub entered: Notify,
    pub release: Notify,
}

impl GatedDecoder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            entered: Notify::new(),
            release: Notify::new(),
        }
    }
}

impl ImageDecoder for GatedDecoder {
    async fn decode(
        &self,
        url: &ObjectUrl,
        urls: &dyn ObjectUrlRegistry,
    ) -> Result<DecodedImage, ConvertError> {
        let bytes = urls
            .resolve(url)
            .ok_or_else(|| ConvertError::Decode(format!("revoked: {url}")))?;

        if bytes.as_ref() == BROKEN {
            return Err(ConvertError::Decode("corrupt file".to_string()));
        }
        if bytes.as_ref() == SLOW {
            self.entered.notify_one();
            self.release.notified().await;
        }

        Ok(DecodedImage::new(RgbaImage::new(self.width, self.height)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CanvasCall {
    Fill(Rgb),
    Draw,
    ToBlob(String, f32),
}

pub struct ScriptedCanvas {
    pub size: (u32, u32),
    pub has_context: bool,
    pub blob: Option<Bytes>,
    pub calls: Mutex<Vec<CanvasCall>>,
}

impl ScriptedCanvas {
    pub fn producing(blob: &'static [u8]) -> Self {
        Self {
            size: (0, 0),
            has_context: true,
            blob: Some(Bytes::from_static(blob)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// 编码器不产出任何数据。
    pub fn producing_nothing() -> Self {
        Self {
            blob: None,
            ..Self::producing(b"")
        }
    }

    pub fn without_context() -> Self {
        Self {
            has_context: false,
            ..Self::producing(b"jpeg")
        }
    }
}

impl RenderContext for ScriptedCanvas {
    fn fill_rect(&mut self, color: Rgb, _x: u32, _y: u32, _width: u32, _height: u32) {
        self.calls.lock().expect("calls lock").push(CanvasCall::Fill(color));
    }

    fn draw_image(&mut self, _image: &DecodedImage, _x: u32, _y: u32) {
        self.calls.lock().expect("calls lock").push(CanvasCall::Draw);
    }
}

impl Canvas for ScriptedCanvas {
    fn set_size(&mut self, width: u32, height: u32) {
        self.size = (width, height);
    }

    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn context_2d(&mut self) -> Option<&mut dyn RenderContext> {
        if self.has_context {
            Some(self as &mut dyn RenderContext)
        } else {
            None
        }
    }

    async fn to_blob(&self, mime_type: &str, quality: f32) -> Option<Bytes> {
        self.calls
            .lock()
            .expect("calls lock")
            .push(CanvasCall::ToBlob(mime_type.to_string(), quality));
        self.blob.clone()
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub alerts: Mutex<Vec<String>>,
    pub diagnostics: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().expect("alerts lock").clone()
    }

    pub fn diagnostics(&self) -> Vec<String> {
        self.diagnostics.lock().expect("diagnostics lock").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().expect("alerts lock").push(message.to_string());
    }

    fn diagnostic(&self, message: &str) {
        self.diagnostics.lock().expect("diagnostics lock").push(message.to_string());
    }
}

pub type FakeConverter =
    ImageConverter<GatedDecoder, ScriptedCanvas, RecordingRegistry, RecordingNotifier>;

pub fn fake_converter(canvas: ScriptedCanvas) -> FakeConverter {
    ImageConverter::new(
        ConverterConfig::default(),
        GatedDecoder::new(100, 80),
        canvas,
        RecordingRegistry::default(),
        RecordingNotifier::default(),
    )
    .expect("converter init failed")
}

/// 用 `image` 生成单色 PNG 字节。
pub fn png_bytes(width: u32, height: u32, pixel: Rgba<u8>) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, pixel);
    let mut cursor = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut cursor, ImageFormat::Png)
        .expect("failed to encode test image");
    cursor.into_inner()
}
