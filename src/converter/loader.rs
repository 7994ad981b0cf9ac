//! # 加载模块
//!
//! ## 设计思路
//!
//! 为文件签发一个临时对象 URL，交给解码器异步解码。
//! 无论成功、失败、超时还是调用方中途放弃等待，临时 URL 都恰好撤销一次。
//!
//! ## 实现思路
//!
//! - `TempUrlGuard` 持有 URL，在 `Drop` 中撤销（RAII），不依赖调用方记得清理。
//! - 单次调用只产生一个结果：`async fn` 的返回值本身就是“只结算一次”的 promise。

use std::time::Duration;

use super::platform::{ImageDecoder, ObjectUrlRegistry};
use super::source::{DecodedImage, ObjectUrl, SourceFile};
use super::ConvertError;

/// 离开作用域时撤销对象 URL。
struct TempUrlGuard<'a, U: ObjectUrlRegistry> {
    urls: &'a U,
    url: ObjectUrl,
}

impl<U: ObjectUrlRegistry> Drop for TempUrlGuard<'_, U> {
    fn drop(&mut self) {
        self.urls.revoke(&self.url);
        log::debug!("🧹 已撤销临时对象 URL: {}", self.url);
    }
}

/// 解码用户选择的文件。
///
/// 失败时返回描述“文件损坏或无法读取”的 `ConvertError::Decode`；
/// 设置了 `timeout` 且超时则返回 `ConvertError::Timeout`。
pub async fn load_image<D, U>(
    file: &SourceFile,
    decoder: &D,
    urls: &U,
    timeout: Option<Duration>,
) -> Result<DecodedImage, ConvertError>
where
    D: ImageDecoder,
    U: ObjectUrlRegistry,
{
    let url = urls.create(file.bytes().clone(), file.mime_type())?;
    let guard = TempUrlGuard { urls, url };

    log::debug!("🖼️ 开始解码 - 文件: {} URL: {}", file.name(), guard.url);

    let decoding = decoder.decode(&guard.url, urls);
    let result = match timeout {
        Some(limit) => match tokio::time::timeout(limit, decoding).await {
            Ok(result) => result,
            Err(_) => Err(ConvertError::Timeout(format!(
                "图片解码超过 {}ms 未完成",
                limit.as_millis()
            ))),
        },
        None => decoding.await,
    };
    drop(guard);

    match result {
        Ok(image) => Ok(image),
        Err(err @ (ConvertError::Decode(_) | ConvertError::Timeout(_) | ConvertError::TooLarge(_))) => {
            Err(err)
        }
        Err(other) => Err(ConvertError::Decode(format!(
            "图片加载失败，文件可能已损坏：{}",
            other
        ))),
    }
}
