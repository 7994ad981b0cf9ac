//! # PNG → JPEG 转换工具 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  CLI (main.rs, clap)                     │
//! │   参数解析 ── settings::load_config ── 逐个文件转换       │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            库 (Rust)                             │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ settings ─── JSON 配置文件读写                        │
//! │  │                                                       │
//! │  └─ converter ── 校验·解码·绘制·编码·发布下载地址          │
//! │      ├─ platform   解码器 / 画布 / 对象 URL / 提示 trait   │
//! │      └─ native     基于 image crate 的平台实现             │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，CLI 与配置读写的返回类型 |
//! | [`converter`] | PNG 校验、解码、画布绘制、JPEG 编码与下载地址管理 |
//! | [`settings`] | 转换配置的加载、校验与保存 |

pub mod error;
pub mod converter;
pub mod settings;
