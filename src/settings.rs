//! 转换配置文件
//!
//! 配置以 JSON 保存；缺失的文件等价于默认配置，缺失的字段取默认值。

use std::fs;
use std::path::Path;

use crate::converter::ConverterConfig;
use crate::error::AppError;

/// 读取并校验配置。文件不存在时返回默认配置。
pub fn load_config(path: &Path) -> Result<ConverterConfig, AppError> {
    if !path.exists() {
        log::debug!("⚙️ 配置文件不存在，使用默认配置: {}", path.display());
        return Ok(ConverterConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config = serde_json::from_str::<ConverterConfig>(&content)
        .map_err(|e| AppError::Settings(format!("解析配置文件失败: {}", e)))?;
    config.validate()?;

    log::info!("⚙️ 已加载配置: {}", path.display());
    Ok(config)
}

pub fn save_config(path: &Path, config: &ConverterConfig) -> Result<(), AppError> {
    config.validate()?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(config)
        .map_err(|e| AppError::Settings(format!("序列化配置失败: {}", e)))?;

    fs::write(path, content)?;
    Ok(())
}
