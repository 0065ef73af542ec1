use super::bundle::{Stage, StageError};
use crate::config::ClipQuality;
use crate::tools::{ClipRequest, MediaEngine, discard_output, ensure_output};
use log::debug;
use std::path::{Path, PathBuf};

/// 來源長度必須超過要求的片段長度才需要產生預覽片段
#[must_use]
pub fn should_generate_clip(source_duration: f64, clip_duration_seconds: u32) -> bool {
    source_duration > f64::from(clip_duration_seconds)
}

#[must_use]
pub fn clip_request(quality: ClipQuality, clip_duration_seconds: u32) -> ClipRequest {
    let (width, height) = quality.resolution();
    ClipRequest {
        duration_seconds: f64::from(clip_duration_seconds),
        width,
        height: Some(height),
        bitrate_kbps: Some(quality.bitrate_kbps()),
        fps: None,
        looping: false,
    }
}

/// 產生預覽片段：從 0 秒開始，長度上限為 `clip_duration_seconds`
///
/// 來源不夠長時回傳 `Ok(None)`，完全不呼叫引擎。
pub fn generate_preview_clip(
    engine: &dyn MediaEngine,
    source_path: &Path,
    source_duration: f64,
    quality: ClipQuality,
    clip_duration_seconds: u32,
    output_path: &Path,
) -> Result<Option<PathBuf>, StageError> {
    if !should_generate_clip(source_duration, clip_duration_seconds) {
        debug!(
            "Skipping preview clip: source {source_duration:.2}s is not longer than {clip_duration_seconds}s"
        );
        return Ok(None);
    }

    let request = clip_request(quality, clip_duration_seconds);
    match engine
        .encode_clip(source_path, &request, output_path)
        .and_then(|()| ensure_output(output_path))
    {
        Ok(()) => Ok(Some(output_path.to_path_buf())),
        Err(e) => {
            discard_output(output_path);
            Err(StageError::new(Stage::Clip, e))
        }
    }
}
