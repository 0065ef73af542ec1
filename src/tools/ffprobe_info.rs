use crate::tools::ffmpeg_runner::{EngineError, run_with_timeout};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use std::time::Duration;
use thiserror::Error;

/// 影片基本資訊，每次執行只探測一次，之後唯讀
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoMetadata {
    pub duration_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub file_size_bytes: u64,
}

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("cannot read source {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("ffprobe failed for {path}: {source}")]
    Engine {
        path: String,
        #[source]
        source: EngineError,
    },

    #[error("cannot parse ffprobe output for {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no video stream found: {path}")]
    NoVideoStream { path: String },
}

#[derive(Deserialize)]
struct FfprobeOutput {
    format: Option<FormatInfo>,
    streams: Option<Vec<StreamInfo>>,
}

#[derive(Deserialize)]
struct FormatInfo {
    duration: Option<String>,
    size: Option<String>,
}

#[derive(Deserialize)]
struct StreamInfo {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// 建立 ffprobe 參數
#[must_use]
pub fn build_probe_args(path: &Path) -> Vec<String> {
    vec![
        "-v".to_string(),
        "quiet".to_string(),
        "-print_format".to_string(),
        "json".to_string(),
        "-show_format".to_string(),
        "-show_streams".to_string(),
        path.to_string_lossy().to_string(),
    ]
}

/// 使用 ffprobe 取得影片資訊
pub fn probe_video(
    ffprobe_path: &str,
    path: &Path,
    timeout: Duration,
) -> Result<VideoMetadata, ProbeError> {
    let display = path.display().to_string();
    let file_size_bytes = std::fs::metadata(path)
        .map_err(|source| ProbeError::Io {
            path: display.clone(),
            source,
        })?
        .len();

    let mut command = Command::new(ffprobe_path);
    command.args(build_probe_args(path));
    let output = run_with_timeout(command, timeout).map_err(|source| ProbeError::Engine {
        path: display,
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut metadata = parse_probe_output(&stdout, path)?;
    metadata.file_size_bytes = file_size_bytes;
    Ok(metadata)
}

/// 解析 ffprobe JSON 輸出
///
/// 找不到視訊串流即失敗，絕不回傳 0x0 解析度。
/// 長度優先取 format，其次取 stream；皆缺少時視為 0（退化排程）。
pub fn parse_probe_output(json: &str, path: &Path) -> Result<VideoMetadata, ProbeError> {
    let display = path.display().to_string();
    let probe: FfprobeOutput = serde_json::from_str(json).map_err(|source| ProbeError::Parse {
        path: display.clone(),
        source,
    })?;

    let video_stream = probe
        .streams
        .as_ref()
        .and_then(|streams| {
            streams
                .iter()
                .find(|s| s.codec_type.as_deref() == Some("video"))
        })
        .ok_or_else(|| ProbeError::NoVideoStream {
            path: display.clone(),
        })?;

    let (Some(width), Some(height)) = (video_stream.width, video_stream.height) else {
        return Err(ProbeError::NoVideoStream { path: display });
    };
    if width == 0 || height == 0 {
        return Err(ProbeError::NoVideoStream { path: display });
    }

    let duration_seconds = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .or(video_stream.duration.as_deref())
        .and_then(|d| d.parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .unwrap_or_else(|| {
            warn!("No usable duration reported for {display}, treating as 0");
            0.0
        })
        .max(0.0);

    let file_size_bytes = probe
        .format
        .as_ref()
        .and_then(|f| f.size.as_deref())
        .and_then(|s| s.parse::<u64>().ok())
        .unwrap_or(0);

    Ok(VideoMetadata {
        duration_seconds,
        width,
        height,
        file_size_bytes,
    })
}
