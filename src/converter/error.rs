//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载转换链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! `code()` / `stage()` 给前端或 CLI 一个稳定的机器可读标识，
//! 文案变化不会影响调用侧的判断。

/// 转换链路统一错误类型。
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConvertError {
    #[error("校验失败：{0}")]
    Validation(String),

    #[error("文件过大：{0}")]
    TooLarge(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("画布错误：{0}")]
    Surface(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("超时错误：{0}")]
    Timeout(String),

    #[error("对象 URL 错误：{0}")]
    ObjectUrl(String),

    #[error("文件错误：{0}")]
    Io(String),

    #[error("配置错误：{0}")]
    InvalidConfig(String),
}

impl ConvertError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "E_VALIDATION",
            Self::TooLarge(_) => "E_TOO_LARGE",
            Self::Decode(_) => "E_DECODE",
            Self::Surface(_) => "E_SURFACE",
            Self::Encode(_) => "E_ENCODE",
            Self::Timeout(_) => "E_TIMEOUT",
            Self::ObjectUrl(_) => "E_OBJECT_URL",
            Self::Io(_) => "E_IO",
            Self::InvalidConfig(_) => "E_CONFIG",
        }
    }

    /// 错误发生的流水线阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::TooLarge(_) => "validate",
            Self::Decode(_) => "load",
            Self::Timeout(_) => "wait",
            Self::Surface(_) => "draw",
            Self::Encode(_) => "encode",
            Self::ObjectUrl(_) => "publish",
            Self::Io(_) => "io",
            Self::InvalidConfig(_) => "config",
        }
    }

    /// 用户主动重选文件即可恢复的错误。
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ObjectUrl(_) | Self::InvalidConfig(_))
    }
}

impl From<std::io::Error> for ConvertError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_and_code_follow_variant() {
        let err = ConvertError::Encode("空输出".to_string());
        assert_eq!(err.code(), "E_ENCODE");
        assert_eq!(err.stage(), "encode");
        assert!(err.is_recoverable());

        let err = ConvertError::ObjectUrl("注册表锁已中毒".to_string());
        assert_eq!(err.stage(), "publish");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn display_keeps_detail() {
        let err = ConvertError::Decode("文件可能已损坏".to_string());
        assert_eq!(err.to_string(), "解码错误：文件可能已损坏");
    }
}
