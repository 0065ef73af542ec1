use super::bundle::{Stage, StageError};
use crate::tools::{ClipRequest, MediaEngine, discard_output, ensure_output};
use log::debug;
use std::path::{Path, PathBuf};

/// 循環動畫最長秒數
pub const LOOP_MAX_SECONDS: f64 = 5.0;
/// 循環動畫最多涵蓋來源長度的比例
pub const LOOP_SOURCE_SHARE: f64 = 0.2;
pub const LOOP_WIDTH: u32 = 320;
pub const LOOP_FPS: u32 = 10;

/// `min(5 秒, 來源長度 20%)`
#[must_use]
pub fn loop_duration(source_duration: f64) -> f64 {
    (source_duration.max(0.0) * LOOP_SOURCE_SHARE).min(LOOP_MAX_SECONDS)
}

#[must_use]
pub fn loop_request(source_duration: f64) -> ClipRequest {
    ClipRequest {
        duration_seconds: loop_duration(source_duration),
        width: LOOP_WIDTH,
        height: None,
        bitrate_kbps: None,
        fps: Some(LOOP_FPS),
        looping: true,
    }
}

/// 產生循環動畫，來源長度為 0 時沒有內容可編碼，直接略過
pub fn generate_loop(
    engine: &dyn MediaEngine,
    source_path: &Path,
    source_duration: f64,
    output_path: &Path,
) -> Result<Option<PathBuf>, StageError> {
    let request = loop_request(source_duration);
    if request.duration_seconds <= 0.0 {
        debug!("Skipping loop: source has no measurable duration");
        return Ok(None);
    }

    match engine
        .encode_clip(source_path, &request, output_path)
        .and_then(|()| ensure_output(output_path))
    {
        Ok(()) => Ok(Some(output_path.to_path_buf())),
        Err(e) => {
            discard_output(output_path);
            Err(StageError::new(Stage::Loop, e))
        }
    }
}
