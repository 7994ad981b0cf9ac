//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageConverter` 只负责流程编排与状态管理，平台能力全部由构造参数注入。
//! 处理链路固定为：
//! 1. 取选择中的第一个文件
//! 2. 校验（体积 → 扩展名白名单 → PNG 类型）
//! 3. 加载解码（临时对象 URL 恰好撤销一次）
//! 4. 绘制并编码为 JPEG
//! 5. 撤销旧下载地址，发布新下载地址
//!
//! ## 实现思路
//!
//! - 校验/解码/编码失败都在本层消化：提示用户并返回 `UploadOutcome`，
//!   不破坏已有的下载入口；`Err` 只留给注册表故障这类内部错误，
//!   返回 `Err` 前同样提示用户并进入 `Failed`。
//! - 并发上传采用“最新选择生效”：通过校验的上传领取一个代号，
//!   每个挂起点之后检查代号，过期的上传直接放弃，不发布任何结果。
//! - 画布放在 `tokio::sync::Mutex` 里，绘制与编码不会交错。
//! - 记录 `load/draw/encode/total` 阶段耗时，便于性能诊断。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use super::classify::{has_extension, is_image, jpeg_file_name};
use super::encoder::{self, EncodeOptions};
use super::format::format_size;
use super::loader::load_image;
use super::platform::{Canvas, ImageDecoder, Notifier, ObjectUrlRegistry};
use super::source::{
    DownloadLink, FileSelection, JPEG_MIME, LinkHref, OutputArtifact, PNG_MIME, SourceFile,
};
use super::{ConvertError, ConverterConfig, LinkKind};

/// 面向用户的失败提示。
pub const CONVERSION_FAILED_MESSAGE: &str = "转换失败，请重新选择图片";

/// 上传状态机。`Ready` 与 `Failed` 和 `Idle` 一样可以直接接受下一次选择。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionState {
    Idle,
    Validating,
    Loading,
    Drawing,
    Encoding,
    Ready,
    Failed,
}

/// 单次文件选择的处理结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    /// 选择为空，什么也不做。
    NoFile,
    /// 校验未通过，已提示用户。
    Rejected(ConvertError),
    /// 解码或编码失败，已提示用户。
    Failed(ConvertError),
    /// 处理途中出现了更新的选择，本次结果被丢弃。
    Superseded,
    Converted(DownloadLink),
}

struct Published {
    link: DownloadLink,
    artifact: OutputArtifact,
}

/// PNG → JPEG 转换器。
pub struct ImageConverter<D, C, U, N> {
    config: ConverterConfig,
    decoder: D,
    canvas: tokio::sync::Mutex<C>,
    urls: U,
    notifier: N,
    state: Mutex<ConversionState>,
    published: Mutex<Option<Published>>,
    generation: AtomicU64,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl<D, C, U, N> ImageConverter<D, C, U, N>
where
    D: ImageDecoder,
    C: Canvas,
    U: ObjectUrlRegistry,
    N: Notifier,
{
    /// 校验配置并组装转换器。
    pub fn new(
        config: ConverterConfig,
        decoder: D,
        canvas: C,
        urls: U,
        notifier: N,
    ) -> Result<Self, ConvertError> {
        config.validate()?;

        Ok(Self {
            config,
            decoder,
            canvas: tokio::sync::Mutex::new(canvas),
            urls,
            notifier,
            state: Mutex::new(ConversionState::Idle),
            published: Mutex::new(None),
            generation: AtomicU64::new(0),
        })
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn state(&self) -> ConversionState {
        *lock(&self.state)
    }

    /// 当前已发布的下载入口。
    pub fn download_link(&self) -> Option<DownloadLink> {
        lock(&self.published).as_ref().map(|p| p.link.clone())
    }

    /// 当前已发布的转换结果。
    pub fn artifact(&self) -> Option<OutputArtifact> {
        lock(&self.published).as_ref().map(|p| p.artifact.clone())
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn url_registry(&self) -> &U {
        &self.urls
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// 文件选择变化的处理入口。
    ///
    /// # 示例
    /// ```rust,ignore
    /// let outcome = converter.on_file_change(FileSelection::single(file)).await?;
    /// if let UploadOutcome::Converted(link) = outcome {
    ///     println!("{} -> {}", link.file_name, link.href.as_str());
    /// }
    /// ```
    pub async fn on_file_change(&self, selection: FileSelection) -> Result<UploadOutcome, ConvertError> {
        let Some(file) = selection.first() else {
            log::debug!("📭 未选择文件，忽略");
            return Ok(UploadOutcome::NoFile);
        };

        let total_start = Instant::now();

        // 校验失败的选择不领取代号，进行中的上传不受影响
        let validating = self.begin_validation();
        if let Err(err) = self.validate(file) {
            log::warn!("🚫 文件未通过校验 - {}: {}", file.name(), err);
            self.notifier.alert(&err.to_string());
            if validating {
                self.end_validation();
            }
            return Ok(UploadOutcome::Rejected(err));
        }

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.transition(generation, ConversionState::Loading);
        let load_start = Instant::now();
        let decoded = match load_image(file, &self.decoder, &self.urls, self.config.step_timeout()).await {
            Ok(decoded) => decoded,
            Err(err) => return Ok(self.fail(generation, file, err)),
        };
        let load_elapsed = load_start.elapsed();

        if self.is_superseded(generation) {
            return Ok(self.supersede(file));
        }

        let options = EncodeOptions::from(&self.config);
        let (bytes, draw_elapsed, encode_elapsed) = {
            let mut canvas = self.canvas.lock().await;
            if self.is_superseded(generation) {
                return Ok(self.supersede(file));
            }

            self.transition(generation, ConversionState::Drawing);
            let draw_start = Instant::now();
            if let Err(err) = encoder::draw(&decoded, &mut *canvas, &options) {
                return Ok(self.fail(generation, file, err));
            }
            let draw_elapsed = draw_start.elapsed();

            self.transition(generation, ConversionState::Encoding);
            let encode_start = Instant::now();
            let bytes = match encoder::encode(&*canvas, &options).await {
                Ok(bytes) => bytes,
                Err(err) => return Ok(self.fail(generation, file, err)),
            };
            (bytes, draw_elapsed, encode_start.elapsed())
        };

        let artifact = OutputArtifact::new(bytes, jpeg_file_name(file.name()));
        let output_size = artifact.size();
        let link = match self.publish(generation, artifact) {
            Ok(Some(link)) => link,
            Ok(None) => return Ok(self.supersede(file)),
            Err(err) => {
                self.fail(generation, file, err.clone());
                return Err(err);
            }
        };
        self.transition(generation, ConversionState::Ready);

        log::info!(
            "✅ 转换完成 - {} ({}) -> {} ({}) load={}ms draw={}ms encode={}ms total={}ms",
            file.name(),
            format_size(file.size()),
            link.file_name,
            format_size(output_size),
            load_elapsed.as_millis(),
            draw_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            total_start.elapsed().as_millis()
        );

        Ok(UploadOutcome::Converted(link))
    }

    /// 撤销当前下载入口并回到 `Idle`，同时让进行中的上传失效。
    pub fn reset(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);

        if let Some(previous) = lock(&self.published).take() {
            if let Some(url) = previous.link.href.object_url() {
                self.urls.revoke(url);
            }
            log::debug!("🧹 已清理下载入口: {}", previous.link.file_name);
        }
        *lock(&self.state) = ConversionState::Idle;
    }

    /// 校验顺序：体积上限 → 扩展名白名单 → PNG 扩展名与声明类型。
    fn validate(&self, file: &SourceFile) -> Result<(), ConvertError> {
        if file.size() > self.config.max_file_size {
            return Err(ConvertError::TooLarge(format!(
                "{} 超过上限 {}",
                format_size(file.size()),
                format_size(self.config.max_file_size)
            )));
        }

        if !is_image(file.name()) {
            return Err(ConvertError::Validation(format!(
                "不支持的文件类型：{}",
                file.name()
            )));
        }

        if !has_extension(file.name(), "png") || !file.mime_type().eq_ignore_ascii_case(PNG_MIME) {
            return Err(ConvertError::Validation("请选择有效的 PNG 图片".to_string()));
        }

        Ok(())
    }

    /// 没有进行中的上传时进入 `Validating`，返回是否切换了状态。
    fn begin_validation(&self) -> bool {
        let mut state = lock(&self.state);
        match *state {
            ConversionState::Idle | ConversionState::Ready | ConversionState::Failed => {
                *state = ConversionState::Validating;
                true
            }
            _ => false,
        }
    }

    fn end_validation(&self) {
        let mut state = lock(&self.state);
        if *state == ConversionState::Validating {
            *state = ConversionState::Idle;
        }
    }

    /// 撤销旧地址后发布新地址；上传已过期时返回 `None`。
    fn publish(
        &self,
        generation: u64,
        artifact: OutputArtifact,
    ) -> Result<Option<DownloadLink>, ConvertError> {
        let mut slot = lock(&self.published);
        if self.is_superseded(generation) {
            return Ok(None);
        }

        if let Some(previous) = slot.take() {
            if let Some(url) = previous.link.href.object_url() {
                self.urls.revoke(url);
                log::debug!("🔁 已撤销上一次的下载地址: {}", url);
            }
        }

        let href = match self.config.link_kind {
            LinkKind::ObjectUrl => LinkHref::Object(self.urls.create(artifact.bytes().clone(), JPEG_MIME)?),
            LinkKind::DataUrl => LinkHref::Data(artifact.to_data_url()),
        };
        let link = DownloadLink {
            href,
            file_name: artifact.file_name().to_string(),
        };

        *slot = Some(Published {
            link: link.clone(),
            artifact,
        });
        Ok(Some(link))
    }

    fn fail(&self, generation: u64, file: &SourceFile, err: ConvertError) -> UploadOutcome {
        if self.is_superseded(generation) {
            return self.supersede(file);
        }

        log::error!("❌ 转换失败 - {} [{}/{}]: {}", file.name(), err.stage(), err.code(), err);
        self.notifier
            .diagnostic(&format!("文件 {} 处理失败 [{}]：{}", file.name(), err.code(), err));
        self.notifier.alert(CONVERSION_FAILED_MESSAGE);
        self.transition(generation, ConversionState::Failed);

        UploadOutcome::Failed(err)
    }

    fn supersede(&self, file: &SourceFile) -> UploadOutcome {
        log::debug!("⏭️ 已有更新的选择，丢弃 {} 的处理结果", file.name());
        UploadOutcome::Superseded
    }

    fn is_superseded(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) != generation
    }

    /// 只有最新一次上传可以改写状态。
    fn transition(&self, generation: u64, next: ConversionState) {
        let mut state = lock(&self.state);
        if self.is_superseded(generation) {
            return;
        }
        log::debug!("🔄 状态切换：{:?} -> {:?}", *state, next);
        *state = next;
    }
}
