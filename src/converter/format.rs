//! 文件体积格式化。

const KILO: f64 = 1024.0;
const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// 把字节数格式化为带单位的可读字符串，保留一位小数并去掉多余的 `.0`。
///
/// 超出 TB 的数值仍以 TB 表示。
///
/// # 示例
/// ```rust
/// use png_jpeg_converter::converter::format_size;
///
/// assert_eq!(format_size(0), "0 B");
/// assert_eq!(format_size(1536), "1.5 KB");
/// ```
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 B".to_string();
    }

    let value = bytes as f64;
    let index = ((value.ln() / KILO.ln()).floor() as usize).min(UNITS.len() - 1);
    let scaled = value / KILO.powi(index as i32);
    let rounded = (scaled * 10.0).round() / 10.0;

    format!("{} {}", trim_decimal(rounded), UNITS[index])
}

fn trim_decimal(value: f64) -> String {
    let text = format!("{value:.1}");
    match text.strip_suffix(".0") {
        Some(whole) => whole.to_string(),
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_literal() {
        assert_eq!(format_size(0), "0 B");
    }

    #[test]
    fn unit_boundaries() {
        assert_eq!(format_size(1), "1 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(16 * 1024 * 1024), "16 MB");
        assert_eq!(format_size(5 * 1024 * 1024 * 1024), "5 GB");
    }

    #[test]
    fn rounds_to_one_decimal() {
        // 1.25 KB -> 1.3 KB
        assert_eq!(format_size(1280), "1.3 KB");
        assert_eq!(format_size(17_000_000), "16.2 MB");
    }

    #[test]
    fn clamps_past_terabytes() {
        let pib = 1024u64.pow(5);
        assert_eq!(format_size(pib), "1024 TB");
    }
}
