use super::bundle::{PreviewBundle, StageError};
use super::clip_encoder::generate_preview_clip;
use super::contact_sheet_merger::generate_contact_sheet;
use super::loop_encoder::generate_loop;
use super::schedule::{compute_offsets, thumbnail_specs};
use super::thumbnail_extractor::{create_thumbnail_tasks, extract_thumbnails_parallel};
use crate::config::{ArtifactStem, OutputLayout, PreviewOptions};
use crate::tools::{MediaEngine, ProbeError};
use anyhow::Result;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use uuid::Uuid;

/// 管線狀態
///
/// 只有 `Probing` 可以進入 `Failed`；探測成功後一定會走到 `Complete`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    Probing,
    Scheduling,
    GeneratingArtifacts,
    Assembling,
    Complete,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// 預覽產生器
///
/// 流程：
/// A. 探測影片資訊（唯一必要階段）
/// B. 計算取樣時間點
/// C. 平行產生縮圖 / 預覽片段 / 循環動畫
/// D. 縮圖完成後合併預覽圖（選用）
/// E. 組合結果
pub struct PreviewGenerator<E: MediaEngine> {
    engine: E,
    layout: OutputLayout,
    thumbnail_workers: usize,
    shutdown_signal: Arc<AtomicBool>,
}

impl<E: MediaEngine> PreviewGenerator<E> {
    /// 建立產生器並確保輸出目錄存在
    pub fn new(
        engine: E,
        layout: OutputLayout,
        thumbnail_workers: usize,
        shutdown_signal: Arc<AtomicBool>,
    ) -> Result<Self> {
        layout.ensure_directories()?;
        Ok(Self {
            engine,
            layout,
            thumbnail_workers,
            shutdown_signal,
        })
    }

    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    #[must_use]
    pub fn layout(&self) -> &OutputLayout {
        &self.layout
    }

    /// 產生預覽產物
    ///
    /// 只有探測失敗會回傳錯誤；其他階段失敗僅記錄，結果中省略該產物。
    pub fn generate_preview(
        &self,
        source_path: &Path,
        source_id: &str,
        options: &PreviewOptions,
    ) -> Result<PreviewBundle, ProbeError> {
        let options = options.resolved();
        let mut state = PipelineState::Idle;

        advance(&mut state, PipelineState::Probing, source_path);
        let metadata = match self.engine.probe(source_path) {
            Ok(metadata) => metadata,
            Err(e) => {
                advance(&mut state, PipelineState::Failed, source_path);
                error!("Probe failed for {}: {e}", source_path.display());
                return Err(e);
            }
        };
        info!(
            "Probed {}: {:.2}s, {}x{}, {} bytes",
            source_path.display(),
            metadata.duration_seconds,
            metadata.width,
            metadata.height,
            metadata.file_size_bytes
        );

        advance(&mut state, PipelineState::Scheduling, source_path);
        let created_at = Utc::now();
        let stem = ArtifactStem::new(source_id, created_at.timestamp_millis());
        let offsets = compute_offsets(metadata.duration_seconds, options.thumbnail_count);
        let specs = thumbnail_specs(&offsets, options.thumbnail_size);
        let tasks = create_thumbnail_tasks(source_path, &specs, &self.layout, &stem);

        advance(&mut state, PipelineState::GeneratingArtifacts, source_path);
        let engine: &dyn MediaEngine = &self.engine;
        let duration = metadata.duration_seconds;

        // 各階段彼此獨立，全部結束後才組合；預覽圖需等縮圖完成
        let ((thumbnails, contact_sheet_path), (preview_clip_path, loop_path)) = rayon::join(
            || {
                let thumbnails = extract_thumbnails_parallel(
                    engine,
                    &tasks,
                    self.thumbnail_workers,
                    &self.shutdown_signal,
                );
                let sheet = if options.generate_contact_sheet {
                    settle(
                        source_path,
                        generate_contact_sheet(
                            engine,
                            &thumbnails,
                            options.thumbnail_size,
                            &self.layout.contact_sheet_path(&stem),
                        ),
                    )
                } else {
                    None
                };
                (thumbnails, sheet)
            },
            || {
                rayon::join(
                    || {
                        settle(
                            source_path,
                            generate_preview_clip(
                                engine,
                                source_path,
                                duration,
                                options.clip_quality,
                                options.clip_duration_seconds,
                                &self.layout.clip_path(&stem, options.clip_quality),
                            ),
                        )
                    },
                    || {
                        if options.generate_loop {
                            settle(
                                source_path,
                                generate_loop(
                                    engine,
                                    source_path,
                                    duration,
                                    &self.layout.loop_path(&stem),
                                ),
                            )
                        } else {
                            None
                        }
                    },
                )
            },
        );

        advance(&mut state, PipelineState::Assembling, source_path);
        if thumbnails.len() < specs.len() {
            warn!(
                "Only {}/{} thumbnails produced for {}",
                thumbnails.len(),
                specs.len(),
                source_path.display()
            );
        }

        let bundle = PreviewBundle {
            id: Uuid::new_v4(),
            source_id: source_id.to_string(),
            source_path: source_path.to_path_buf(),
            thumbnails,
            preview_clip_path,
            loop_path,
            contact_sheet_path,
            metadata,
            created_at,
        };

        advance(&mut state, PipelineState::Complete, source_path);
        info!(
            "Preview {} complete for {}: {} thumbnails, clip={}, loop={}, sheet={}",
            bundle.id,
            source_path.display(),
            bundle.thumbnails.len(),
            bundle.preview_clip_path.is_some(),
            bundle.loop_path.is_some(),
            bundle.contact_sheet_path.is_some()
        );

        Ok(bundle)
    }
}

fn advance(state: &mut PipelineState, next: PipelineState, source_path: &Path) {
    debug!("{}: {state} -> {next}", source_path.display());
    *state = next;
}

/// 在階段邊界收斂結果：失敗只記錄，不向外傳遞
fn settle(source_path: &Path, result: Result<Option<PathBuf>, StageError>) -> Option<PathBuf> {
    match result {
        Ok(path) => path,
        Err(e) => {
            warn!("Optional stage dropped for {}: {e}", source_path.display());
            None
        }
    }
}
