//! # PNG → JPEG 转换工具 — 命令行入口
//!
//! 本文件仅负责日志初始化、参数解析与结果落盘。
//! 转换逻辑分布在 `converter` 模块中，详见 `lib.rs` 架构文档。

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use png_jpeg_converter::converter::{
    format_size, FileSelection, LinkKind, NativeConverter, SourceFile, UploadOutcome,
};
use png_jpeg_converter::error::AppError;
use png_jpeg_converter::settings;

/// 把 PNG 图片转换为 JPEG（透明区域铺白底）。
#[derive(Parser, Debug)]
#[command(name = "png-jpeg-converter", version, about)]
struct Args {
    /// JSON 配置文件路径，不存在时使用默认配置
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 输出目录，默认与输入文件同目录
    #[arg(short, long)]
    out_dir: Option<PathBuf>,

    /// 以 Data URL 形式生成下载地址
    #[arg(long)]
    data_url: bool,

    /// 待转换的 PNG 文件
    #[arg(required = true)]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args).await {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failed) => {
            log::warn!("⚠️ {} 个文件未能转换", failed);
            ExitCode::FAILURE
        }
        Err(err) => {
            log::error!("❌ {}", err);
            ExitCode::FAILURE
        }
    }
}

/// 逐个转换文件，返回失败数量。
async fn run(args: Args) -> Result<usize, AppError> {
    let mut config = match &args.config {
        Some(path) => settings::load_config(path)?,
        None => Default::default(),
    };
    if args.data_url {
        config.link_kind = LinkKind::DataUrl;
    }

    let converter = NativeConverter::native(config)?;
    let mut failed = 0;

    for path in &args.files {
        match convert_one(&converter, path, args.out_dir.as_deref()).await {
            Ok(true) => {}
            Ok(false) => failed += 1,
            Err(err) => {
                log::error!("❌ {}: {}", path.display(), err);
                failed += 1;
            }
        }
    }

    Ok(failed)
}

async fn convert_one(
    converter: &NativeConverter,
    path: &Path,
    out_dir: Option<&Path>,
) -> Result<bool, AppError> {
    let file = SourceFile::from_path(path)?;
    let source_size = file.size();

    let UploadOutcome::Converted(link) = converter.on_file_change(FileSelection::single(file)).await?
    else {
        return Ok(false);
    };
    let Some(artifact) = converter.artifact() else {
        return Ok(false);
    };

    let target_dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let written = artifact.save_to(&target_dir)?;

    println!(
        "{} ({}) -> {} ({})",
        path.display(),
        format_size(source_size),
        written.display(),
        format_size(artifact.size())
    );
    log::debug!("🔗 下载地址: {}", truncate_href(link.href.as_str()));

    Ok(true)
}

/// Data URL 可能很长，日志里只保留前缀。
fn truncate_href(href: &str) -> &str {
    match href.char_indices().nth(64) {
        Some((idx, _)) => &href[..idx],
        None => href,
    }
}
