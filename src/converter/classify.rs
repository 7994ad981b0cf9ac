//! # 扩展名识别模块
//!
//! 仅依据文件名判断，不读取内容也不参考声明的 MIME 类型；
//! MIME 校验放在 `controller` 的校验阶段统一处理。

use once_cell::sync::Lazy;
use regex::Regex;

/// 允许作为图片处理的扩展名（小写）。
pub const IMAGE_EXTENSIONS: [&str; 4] = ["jpg", "gif", "bmp", "png"];

/// 输出文件统一使用的后缀。
pub const JPEG_SUFFIX: &str = ".jpeg";

static PNG_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.png$").unwrap());

/// 返回最后一个 `.` 之后的部分；文件名不含 `.` 时返回 `None`。
pub fn extension_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext)
}

/// 扩展名（忽略大小写）是否在图片白名单内。
pub fn is_image(name: &str) -> bool {
    extension_of(name)
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

pub fn has_extension(name: &str, expected: &str) -> bool {
    extension_of(name)
        .map(|ext| ext.eq_ignore_ascii_case(expected))
        .unwrap_or(false)
}

/// 推导下载文件名：把结尾的 `.png`（忽略大小写）替换为 `.jpeg`。
///
/// 文件名其余部分保持原样大小写；后缀本身总是小写。
/// 不以 `.png` 结尾时替换最后一个扩展名，没有扩展名则直接追加。
pub fn jpeg_file_name(name: &str) -> String {
    if PNG_SUFFIX.is_match(name) {
        return PNG_SUFFIX.replace(name, JPEG_SUFFIX).into_owned();
    }

    match name.rsplit_once('.') {
        Some((stem, _)) => format!("{stem}{JPEG_SUFFIX}"),
        None => format!("{name}{JPEG_SUFFIX}"),
    }
}
