//! # PNG → JPEG 转换模块（converter）
//!
//! ## 设计思路
//!
//! 该模块将“选择文件 → 校验 → 解码 → 绘制 → 编码 → 发布下载地址”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `classify`：扩展名识别与输出文件名推导
//! - `format`：文件体积格式化
//! - `loader`：临时对象 URL + 异步解码
//! - `encoder`：画布绘制与 JPEG 编码
//! - `controller`：编排整条处理流水线与上传状态机
//! - `platform`：解码器、画布、对象 URL、提示通道的能力接口
//! - `native`：基于 `image` 的平台实现
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! FileSelection
//!    ↓
//! controller.rs（校验 + 状态机 + 阶段耗时日志）
//!    ├─ loader.rs（签发临时 URL → ImageDecoder → 撤销）
//!    ├─ encoder.rs（Canvas 尺寸 → 底色 → 绘制 → to_blob）
//!    └─ 发布 DownloadLink（先撤销旧地址）
//!    ↓
//! UploadOutcome
//! ```
//!
//! ## 分层职责建议
//!
//! - 校验规则变更优先改 `controller.rs` 的 `validate`
//! - 配置与默认值变更优先改 `config.rs`
//! - 接入新的宿主（如 wasm）只需要实现 `platform.rs` 里的 trait

mod classify;
mod config;
mod controller;
mod encoder;
mod error;
mod format;
mod loader;
mod native;
mod platform;
mod source;

pub use classify::{extension_of, has_extension, is_image, jpeg_file_name, IMAGE_EXTENSIONS};
pub use config::{ConverterConfig, LinkKind, Rgb, JPEG_QUALITY};
pub use controller::{ConversionState, ImageConverter, UploadOutcome, CONVERSION_FAILED_MESSAGE};
pub use encoder::{draw, draw_and_encode, encode, EncodeOptions};
pub use error::ConvertError;
pub use format::format_size;
pub use loader::load_image;
pub use native::{LogNotifier, MemoryUrlRegistry, NativeConverter, RasterCanvas, RasterDecoder};
pub use platform::{Canvas, ImageDecoder, Notifier, ObjectUrlRegistry, RenderContext};
pub use source::{
    DecodedImage, DownloadLink, FileSelection, LinkHref, ObjectUrl, OutputArtifact, SourceFile,
    JPEG_MIME, PNG_MIME,
};
