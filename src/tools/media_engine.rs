//! 外部媒體引擎介面
//!
//! 管線只負責提供正確參數並判讀成敗，實際解碼 / 編碼交給 ffmpeg。
//! 測試以自訂實作取代 `FfmpegEngine`，不需要真的 ffmpeg。

use crate::tools::ffmpeg_runner::{EngineError, ensure_output, run_with_timeout};
use crate::tools::ffprobe_info::{ProbeError, VideoMetadata, probe_video};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

/// 兩段式 seek 的前置緩衝時間（秒）
const SEEK_MARGIN: f64 = 2.0;

/// 片段編碼請求（預覽片段與循環動畫共用）
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    pub duration_seconds: f64,
    pub width: u32,
    /// `None` 表示依比例自動計算高度
    pub height: Option<u32>,
    pub bitrate_kbps: Option<u32>,
    pub fps: Option<u32>,
    /// 輸出為無限循環的動畫（GIF）
    pub looping: bool,
}

pub trait MediaEngine: Send + Sync {
    fn probe(&self, source: &Path) -> Result<VideoMetadata, ProbeError>;

    fn extract_frame(
        &self,
        source: &Path,
        offset_seconds: f64,
        width: u32,
        height: u32,
        output: &Path,
    ) -> Result<(), EngineError>;

    fn encode_clip(
        &self,
        source: &Path,
        request: &ClipRequest,
        output: &Path,
    ) -> Result<(), EngineError>;

    fn compose_grid(
        &self,
        inputs: &[PathBuf],
        cols: usize,
        rows: usize,
        tile_width: u32,
        tile_height: u32,
        output: &Path,
    ) -> Result<(), EngineError>;
}

/// 以 ffmpeg / ffprobe 命令列實作的媒體引擎
#[derive(Debug, Clone)]
pub struct FfmpegEngine {
    ffmpeg_path: String,
    ffprobe_path: String,
    timeout: Duration,
}

impl FfmpegEngine {
    #[must_use]
    pub fn new(ffmpeg_path: &str, ffprobe_path: &str, timeout: Duration) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.to_string(),
            ffprobe_path: ffprobe_path.to_string(),
            timeout,
        }
    }

    fn run(&self, args: Vec<String>, output: &Path) -> Result<(), EngineError> {
        let mut command = Command::new(&self.ffmpeg_path);
        command.args(&args);
        run_with_timeout(command, self.timeout)?;
        ensure_output(output)
    }
}

impl MediaEngine for FfmpegEngine {
    fn probe(&self, source: &Path) -> Result<VideoMetadata, ProbeError> {
        probe_video(&self.ffprobe_path, source, self.timeout)
    }

    fn extract_frame(
        &self,
        source: &Path,
        offset_seconds: f64,
        width: u32,
        height: u32,
        output: &Path,
    ) -> Result<(), EngineError> {
        self.run(
            build_frame_args(source, offset_seconds, width, height, output),
            output,
        )
    }

    fn encode_clip(
        &self,
        source: &Path,
        request: &ClipRequest,
        output: &Path,
    ) -> Result<(), EngineError> {
        let args = if request.looping {
            build_loop_args(source, request, output)
        } else {
            build_clip_args(source, request, output)
        };
        self.run(args, output)
    }

    fn compose_grid(
        &self,
        inputs: &[PathBuf],
        cols: usize,
        rows: usize,
        tile_width: u32,
        tile_height: u32,
        output: &Path,
    ) -> Result<(), EngineError> {
        self.run(
            build_grid_args(inputs, cols, rows, tile_width, tile_height, output),
            output,
        )
    }
}

fn base_args() -> Vec<String> {
    vec![
        "-hide_banner".to_string(),
        "-nostdin".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
    ]
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// 擷取單一畫格（兩段式 seek）
///
/// 1. `-ss` 在 `-i` 前：快速跳轉到最近的關鍵幀
/// 2. `-ss` 在 `-i` 後：精準解碼到目標時間點
#[must_use]
pub fn build_frame_args(
    source: &Path,
    offset_seconds: f64,
    width: u32,
    height: u32,
    output: &Path,
) -> Vec<String> {
    let t0 = (offset_seconds - SEEK_MARGIN).max(0.0);
    let delta = (offset_seconds - t0).max(0.0);

    // 保持比例縮放，不足部分填黑，確保輸出尺寸固定
    let filter = format!(
        "scale={width}:{height}:force_original_aspect_ratio=decrease,pad={width}:{height}:(ow-iw)/2:(oh-ih)/2:black"
    );

    let mut args = base_args();
    if t0 > 0.0 {
        args.push("-ss".to_string());
        args.push(format!("{t0:.3}"));
    }
    args.push("-i".to_string());
    args.push(path_arg(source));
    if delta > 0.0 {
        args.push("-ss".to_string());
        args.push(format!("{delta:.3}"));
    }
    args.extend([
        "-frames:v".to_string(),
        "1".to_string(),
        "-an".to_string(),
        "-sn".to_string(),
        "-dn".to_string(),
        "-threads".to_string(),
        "1".to_string(),
        "-vf".to_string(),
        filter,
        "-q:v".to_string(),
        "2".to_string(),
        "-y".to_string(),
        path_arg(output),
    ]);
    args
}

/// 預覽片段：從 0 秒開始、限制長度、降低位元率與解析度
#[must_use]
pub fn build_clip_args(source: &Path, request: &ClipRequest, output: &Path) -> Vec<String> {
    let height = request
        .height
        .map_or_else(|| "-2".to_string(), |h| h.to_string());
    let mut args = base_args();
    args.extend([
        "-i".to_string(),
        path_arg(source),
        "-ss".to_string(),
        "0".to_string(),
        "-t".to_string(),
        format!("{:.3}", request.duration_seconds),
        "-vf".to_string(),
        format!("scale={}:{height}", request.width),
        "-c:v".to_string(),
        "libx264".to_string(),
        "-preset".to_string(),
        "fast".to_string(),
    ]);
    if let Some(kbps) = request.bitrate_kbps {
        args.push("-b:v".to_string());
        args.push(format!("{kbps}k"));
    }
    if let Some(fps) = request.fps {
        args.push("-r".to_string());
        args.push(fps.to_string());
    }
    args.extend([
        "-c:a".to_string(),
        "aac".to_string(),
        "-b:a".to_string(),
        "128k".to_string(),
        "-movflags".to_string(),
        "+faststart".to_string(),
        "-y".to_string(),
        path_arg(output),
    ]);
    args
}

/// 循環動畫：降低幀率、縮小尺寸，使用調色盤產生 GIF 並無限循環
#[must_use]
pub fn build_loop_args(source: &Path, request: &ClipRequest, output: &Path) -> Vec<String> {
    let fps = request.fps.unwrap_or(10);
    let height = request
        .height
        .map_or_else(|| "-1".to_string(), |h| h.to_string());
    let filter = format!(
        "fps={fps},scale={}:{height}:flags=lanczos,split[a][b];[a]palettegen[p];[b][p]paletteuse",
        request.width
    );
    let mut args = base_args();
    args.extend([
        "-ss".to_string(),
        "0".to_string(),
        "-t".to_string(),
        format!("{:.3}", request.duration_seconds),
        "-i".to_string(),
        path_arg(source),
        "-filter_complex".to_string(),
        filter,
        "-loop".to_string(),
        "0".to_string(),
        "-an".to_string(),
        "-y".to_string(),
        path_arg(output),
    ]);
    args
}

/// 使用 xstack 濾鏡將縮圖拼接為網格
///
/// 單張縮圖時 xstack 無法使用（至少需要兩個輸入），直接輸出該畫格。
#[must_use]
pub fn build_grid_args(
    inputs: &[PathBuf],
    cols: usize,
    rows: usize,
    tile_width: u32,
    tile_height: u32,
    output: &Path,
) -> Vec<String> {
    let mut args = base_args();
    for input in inputs {
        args.push("-i".to_string());
        args.push(path_arg(input));
    }

    if inputs.len() > 1 {
        let layout = build_xstack_layout(inputs.len(), cols, tile_width, tile_height);
        let (sheet_width, sheet_height) = (cols as u32 * tile_width, rows as u32 * tile_height);
        // 先補滿整張畫布，最後一列不足時留黑
        let filter = format!(
            "xstack=inputs={}:layout={layout}:fill=black,pad={sheet_width}:{sheet_height}:0:0:black",
            inputs.len()
        );
        args.push("-filter_complex".to_string());
        args.push(filter);
    }

    args.extend([
        "-frames:v".to_string(),
        "1".to_string(),
        "-q:v".to_string(),
        "2".to_string(),
        "-y".to_string(),
        path_arg(output),
    ]);
    args
}

/// 建立 xstack 佈局字串
///
/// 每個位置格式為 `x_y`，使用 `|` 分隔，依列優先排列
#[must_use]
pub fn build_xstack_layout(count: usize, cols: usize, tile_width: u32, tile_height: u32) -> String {
    let cols = cols.max(1);
    (0..count)
        .map(|i| {
            let x = (i % cols) as u32 * tile_width;
            let y = (i / cols) as u32 * tile_height;
            format!("{x}_{y}")
        })
        .collect::<Vec<_>>()
        .join("|")
}
