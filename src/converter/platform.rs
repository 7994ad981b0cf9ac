//! # 平台能力接口
//!
//! ## 设计思路
//!
//! 转换链路依赖的四类宿主能力（图片解码、画布、对象 URL 注册表、用户提示）
//! 全部通过 trait 显式注入，编排逻辑不直接触碰任何全局对象。
//! 这样 `controller` 既可以跑在 `native` 实现上，也可以在测试里换成脚本化的替身。
//!
//! 异步方法统一返回 `impl Future + Send`，实现方可以直接写 `async fn`。

use std::future::Future;

use bytes::Bytes;

use super::config::Rgb;
use super::source::{DecodedImage, ObjectUrl};
use super::ConvertError;

/// 对象 URL 注册表：为内存中的字节签发可撤销的引用。
pub trait ObjectUrlRegistry: Send + Sync {
    fn create(&self, bytes: Bytes, mime_type: &str) -> Result<ObjectUrl, ConvertError>;

    /// 取回 URL 对应的字节；已撤销或不存在时返回 `None`。
    fn resolve(&self, url: &ObjectUrl) -> Option<Bytes>;

    fn revoke(&self, url: &ObjectUrl);
}

/// 图片解码器：读取对象 URL 指向的字节并解码为位图。
pub trait ImageDecoder: Send + Sync {
    fn decode(
        &self,
        url: &ObjectUrl,
        urls: &dyn ObjectUrlRegistry,
    ) -> impl Future<Output = Result<DecodedImage, ConvertError>> + Send;
}

/// 画布的 2D 绘图上下文。
pub trait RenderContext {
    fn fill_rect(&mut self, color: Rgb, x: u32, y: u32, width: u32, height: u32);

    /// 以 `(x, y)` 为左上角，按原始尺寸绘制图片。
    fn draw_image(&mut self, image: &DecodedImage, x: u32, y: u32);
}

/// 可绘制、可序列化的像素画布。
pub trait Canvas: Send + Sync {
    /// 调整尺寸，同时清空已有内容。
    fn set_size(&mut self, width: u32, height: u32);

    fn size(&self) -> (u32, u32);

    /// 获取 2D 上下文；画布不可用时返回 `None`。
    fn context_2d(&mut self) -> Option<&mut dyn RenderContext>;

    /// 把当前像素编码为指定格式；编码失败时返回 `None`。
    fn to_blob(&self, mime_type: &str, quality: f32) -> impl Future<Output = Option<Bytes>> + Send;
}

/// 面向用户的提示通道。
pub trait Notifier: Send + Sync {
    /// 同步提示（对应浏览器里的 alert）。
    fn alert(&self, message: &str);

    /// 诊断日志通道。
    fn diagnostic(&self, message: &str);
}
