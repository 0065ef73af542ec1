use super::bundle::{Stage, StageError, ThumbnailArtifact};
use crate::config::ThumbnailSize;
use crate::tools::{MediaEngine, discard_output, ensure_output};
use log::debug;
use std::path::{Path, PathBuf};

/// 由縮圖數量推算網格：`cols = ceil(sqrt(n))`，`rows = ceil(n / cols)`
///
/// 沒有縮圖時回傳 `None`。
#[must_use]
pub fn grid_shape(count: usize) -> Option<(usize, usize)> {
    if count == 0 {
        return None;
    }
    let cols = (count as f64).sqrt().ceil() as usize;
    let rows = count.div_ceil(cols);
    Some((cols, rows))
}

/// 將已產生的縮圖合併為單張預覽圖
///
/// 沒有任何縮圖時略過，不會以空輸入呼叫引擎。
pub fn generate_contact_sheet(
    engine: &dyn MediaEngine,
    thumbnails: &[ThumbnailArtifact],
    tile_size: ThumbnailSize,
    output_path: &Path,
) -> Result<Option<PathBuf>, StageError> {
    let Some((cols, rows)) = grid_shape(thumbnails.len()) else {
        debug!("Skipping contact sheet: no thumbnails were produced");
        return Ok(None);
    };

    debug!(
        "Merging {} thumbnails into a {cols}x{rows} contact sheet",
        thumbnails.len()
    );

    let inputs: Vec<PathBuf> = thumbnails.iter().map(|t| t.file_path.clone()).collect();
    match engine
        .compose_grid(
            &inputs,
            cols,
            rows,
            tile_size.width,
            tile_size.height,
            output_path,
        )
        .and_then(|()| ensure_output(output_path))
    {
        Ok(()) => Ok(Some(output_path.to_path_buf())),
        Err(e) => {
            discard_output(output_path);
            Err(StageError::new(Stage::ContactSheet, e))
        }
    }
}
