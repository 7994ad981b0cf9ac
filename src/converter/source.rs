//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入”和“流水线中间结果”解耦：
//! - `SourceFile` / `FileSelection` 表示用户选择的原始文件
//! - `DecodedImage` 表示已解码、带自然尺寸的位图
//! - `OutputArtifact` 表示编码完成、可供下载的 JPEG
//! - `DownloadLink` 表示已经发布给用户的下载入口

use std::fmt;
use std::path::{Path, PathBuf};

use base64::{Engine as _, engine::general_purpose};
use bytes::Bytes;
use image::RgbaImage;

use super::ConvertError;
use super::classify::extension_of;

pub const PNG_MIME: &str = "image/png";
pub const JPEG_MIME: &str = "image/jpeg";
const FALLBACK_MIME: &str = "application/octet-stream";

/// 用户选择的单个文件，选择后不可变。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    name: String,
    mime_type: String,
    bytes: Bytes,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, mime_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            mime_type: mime_type.into(),
            bytes: bytes.into(),
        }
    }

    /// 从本地路径读取文件。
    ///
    /// 声明类型优先按内容嗅探，嗅探不到时按扩展名推断。
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ConvertError::Io(format!("无法识别文件名：{}", path.display())))?
            .to_string();

        let bytes = std::fs::read(path)
            .map_err(|e| ConvertError::Io(format!("无法读取文件 {}：{}", path.display(), e)))?;

        let mime_type = infer::get(&bytes)
            .map(|kind| kind.mime_type())
            .or_else(|| mime_for_extension(&name))
            .unwrap_or(FALLBACK_MIME);

        log::debug!("📁 读取本地文件 - {} ({}, {} 字节)", name, mime_type, bytes.len());

        Ok(Self::new(name, mime_type, bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// 声明的 MIME 类型，可能与真实内容不符。
    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

fn mime_for_extension(name: &str) -> Option<&'static str> {
    let ext = extension_of(name)?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some(PNG_MIME),
        "jpg" | "jpeg" => Some(JPEG_MIME),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "txt" => Some("text/plain"),
        "pdf" => Some("application/pdf"),
        _ => None,
    }
}

/// 一次文件选择事件携带的文件列表，只处理第一个。
#[derive(Debug, Clone, Default)]
pub struct FileSelection {
    files: Vec<SourceFile>,
}

impl FileSelection {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn single(file: SourceFile) -> Self {
        Self { files: vec![file] }
    }

    pub fn first(&self) -> Option<&SourceFile> {
        self.files.first()
    }
}

impl From<Vec<SourceFile>> for FileSelection {
    fn from(files: Vec<SourceFile>) -> Self {
        Self { files }
    }
}

/// 解码阶段输出：带自然尺寸的 RGBA 位图。
#[derive(Debug, Clone)]
pub struct DecodedImage {
    pixels: RgbaImage,
}

impl DecodedImage {
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn natural_width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn natural_height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }
}

/// 平台签发的对象 URL，可撤销。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 编码阶段输出：JPEG 字节与推导出的文件名。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    bytes: Bytes,
    file_name: String,
}

impl OutputArtifact {
    pub fn new(bytes: Bytes, file_name: impl Into<String>) -> Self {
        Self {
            bytes,
            file_name: file_name.into(),
        }
    }

    pub fn bytes(&self) -> &Bytes {
        &self.bytes
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn mime_type(&self) -> &'static str {
        JPEG_MIME
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// 生成 `data:image/jpeg;base64,...` 形式的 URL。
    pub fn to_data_url(&self) -> String {
        format!(
            "data:{};base64,{}",
            self.mime_type(),
            general_purpose::STANDARD.encode(&self.bytes)
        )
    }

    /// 写入目录，返回最终路径。
    pub fn save_to(&self, dir: impl AsRef<Path>) -> Result<PathBuf, ConvertError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)
            .map_err(|e| ConvertError::Io(format!("创建输出目录失败 {}：{}", dir.display(), e)))?;

        let path = dir.join(&self.file_name);
        std::fs::write(&path, &self.bytes)
            .map_err(|e| ConvertError::Io(format!("写入输出文件失败 {}：{}", path.display(), e)))?;

        Ok(path)
    }
}

/// 下载入口的地址：对象 URL 需要撤销，Data URL 不需要。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkHref {
    Object(ObjectUrl),
    Data(String),
}

impl LinkHref {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Object(url) => url.as_str(),
            Self::Data(url) => url,
        }
    }

    pub fn object_url(&self) -> Option<&ObjectUrl> {
        match self {
            Self::Object(url) => Some(url),
            Self::Data(_) => None,
        }
    }
}

/// 已发布给用户的下载入口（`href` + `download` 文件名）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadLink {
    pub href: LinkHref,
    pub file_name: String,
}
