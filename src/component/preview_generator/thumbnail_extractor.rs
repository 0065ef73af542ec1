use super::bundle::{Stage, StageError, ThumbnailArtifact, ThumbnailSpec};
use crate::config::{ArtifactStem, OutputLayout};
use crate::tools::{EngineError, MediaEngine, discard_output, ensure_output};
use log::{debug, warn};
use rayon::ThreadPoolBuilder;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// 縮圖擷取任務
#[derive(Debug, Clone)]
pub struct ThumbnailTask {
    pub source_path: PathBuf,
    pub spec: ThumbnailSpec,
    pub output_path: PathBuf,
}

/// 建立縮圖任務列表
#[must_use]
pub fn create_thumbnail_tasks(
    source_path: &Path,
    specs: &[ThumbnailSpec],
    layout: &OutputLayout,
    stem: &ArtifactStem,
) -> Vec<ThumbnailTask> {
    specs
        .iter()
        .map(|spec| ThumbnailTask {
            source_path: source_path.to_path_buf(),
            spec: *spec,
            output_path: layout.thumbnail_path(stem, spec.index),
        })
        .collect()
}

/// 擷取單一縮圖並讀取檔案大小
pub fn extract_thumbnail(
    engine: &dyn MediaEngine,
    task: &ThumbnailTask,
) -> Result<ThumbnailArtifact, StageError> {
    let spec = &task.spec;
    debug!(
        "Extracting thumbnail {} at {:.2}s -> {}",
        spec.index,
        spec.time_offset_seconds,
        task.output_path.display()
    );

    let result = engine
        .extract_frame(
            &task.source_path,
            spec.time_offset_seconds,
            spec.target_width,
            spec.target_height,
            &task.output_path,
        )
        .and_then(|()| ensure_output(&task.output_path))
        .and_then(|()| {
            std::fs::metadata(&task.output_path)
                .map(|meta| meta.len())
                .map_err(EngineError::from)
        });

    match result {
        Ok(file_size_bytes) => Ok(ThumbnailArtifact {
            file_path: task.output_path.clone(),
            time_offset_seconds: spec.time_offset_seconds,
            width: spec.target_width,
            height: spec.target_height,
            file_size_bytes,
        }),
        Err(e) => {
            discard_output(&task.output_path);
            Err(StageError::new(Stage::Thumbnail, e))
        }
    }
}

/// 以固定大小的工作池平行擷取縮圖
///
/// 單張失敗只記錄並略過，不影響其他縮圖；回傳依時間點排序的成功結果。
/// 收到中斷訊號後尚未開始的任務直接視為失敗。
pub fn extract_thumbnails_parallel(
    engine: &dyn MediaEngine,
    tasks: &[ThumbnailTask],
    workers: usize,
    shutdown_signal: &AtomicBool,
) -> Vec<ThumbnailArtifact> {
    if tasks.is_empty() {
        return Vec::new();
    }

    let run_one = |task: &ThumbnailTask| -> Option<ThumbnailArtifact> {
        if shutdown_signal.load(Ordering::SeqCst) {
            debug!("Skipping thumbnail {}: shutdown requested", task.spec.index);
            return None;
        }
        match extract_thumbnail(engine, task) {
            Ok(artifact) => Some(artifact),
            Err(e) => {
                warn!(
                    "Thumbnail {} at {:.2}s failed for {}: {e}",
                    task.spec.index,
                    task.spec.time_offset_seconds,
                    task.source_path.display()
                );
                None
            }
        }
    };

    let mut artifacts: Vec<ThumbnailArtifact> =
        match ThreadPoolBuilder::new().num_threads(workers.max(1)).build() {
            Ok(pool) => pool.install(|| tasks.par_iter().filter_map(run_one).collect()),
            Err(e) => {
                warn!("Cannot build thumbnail worker pool, extracting sequentially: {e}");
                tasks.iter().filter_map(run_one).collect()
            }
        };

    artifacts.sort_by(|a, b| a.time_offset_seconds.total_cmp(&b.time_offset_seconds));
    artifacts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThumbnailSize;
    use crate::component::preview_generator::schedule::thumbnail_specs;

    #[test]
    fn test_create_thumbnail_tasks() {
        let layout = OutputLayout::new(Path::new("/out"));
        let stem = ArtifactStem::with_run_tag("vid", 42, "deadbeef");
        let specs = thumbnail_specs(&[1.0, 2.0, 3.0], ThumbnailSize::default());

        let tasks = create_thumbnail_tasks(Path::new("/v/a.mp4"), &specs, &layout, &stem);

        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].spec.index, 0);
        assert_eq!(
            tasks[0].output_path,
            PathBuf::from("/out/thumbnails/vid_42_deadbeef_thumb_00.jpg")
        );
        assert_eq!(
            tasks[2].output_path,
            PathBuf::from("/out/thumbnails/vid_42_deadbeef_thumb_02.jpg")
        );
        assert!((tasks[2].spec.time_offset_seconds - 3.0).abs() < f64::EPSILON);
    }
}
