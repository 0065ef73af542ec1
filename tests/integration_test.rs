//! 整合測試 - 以腳本化的媒體引擎驗證整條預覽管線
//!
//! 不需要 ffmpeg：引擎只寫入佔位檔案並記錄呼叫內容。

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use video_preview::component::PreviewGenerator;
use video_preview::component::preview_generator::find_preview_by_source_id;
use video_preview::component::retention_sweeper::sweep_old_artifacts;
use video_preview::config::{
    ClipQuality, OutputLayout, PreviewOptions, RetentionPolicy, ThumbnailSize,
};
use video_preview::tools::{ClipRequest, EngineError, MediaEngine, ProbeError, VideoMetadata};

#[derive(Debug, Clone, PartialEq)]
enum Call {
    Frame(f64),
    Clip(ClipRequest),
    Grid { inputs: usize, cols: usize, rows: usize },
}

/// 依設定回應的假引擎
#[derive(Default)]
struct ScriptedEngine {
    metadata: Option<VideoMetadata>,
    fail_frames: bool,
    fail_clips: bool,
    /// 回報成功但不寫出任何檔案
    skip_writes: bool,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedEngine {
    fn with_duration(duration_seconds: f64) -> Self {
        Self {
            metadata: Some(VideoMetadata {
                duration_seconds,
                width: 1920,
                height: 1080,
                file_size_bytes: 4096,
            }),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn failure() -> EngineError {
    EngineError::Failed {
        code: 1,
        stderr: "scripted failure".to_string(),
    }
}

impl MediaEngine for ScriptedEngine {
    fn probe(&self, source: &Path) -> Result<VideoMetadata, ProbeError> {
        self.metadata.clone().ok_or_else(|| ProbeError::NoVideoStream {
            path: source.display().to_string(),
        })
    }

    fn extract_frame(
        &self,
        _source: &Path,
        offset_seconds: f64,
        _width: u32,
        _height: u32,
        output: &Path,
    ) -> Result<(), EngineError> {
        self.record(Call::Frame(offset_seconds));
        let duration = self.metadata.as_ref().map_or(0.0, |m| m.duration_seconds);
        if self.fail_frames || offset_seconds >= duration {
            return Err(failure());
        }
        fs::write(output, b"jpeg")?;
        Ok(())
    }

    fn encode_clip(
        &self,
        _source: &Path,
        request: &ClipRequest,
        output: &Path,
    ) -> Result<(), EngineError> {
        self.record(Call::Clip(request.clone()));
        if self.fail_clips {
            return Err(failure());
        }
        if self.skip_writes {
            return Ok(());
        }
        fs::write(output, b"clip")?;
        Ok(())
    }

    fn compose_grid(
        &self,
        inputs: &[PathBuf],
        cols: usize,
        rows: usize,
        _tile_width: u32,
        _tile_height: u32,
        output: &Path,
    ) -> Result<(), EngineError> {
        self.record(Call::Grid {
            inputs: inputs.len(),
            cols,
            rows,
        });
        if self.skip_writes {
            return Ok(());
        }
        fs::write(output, b"sheet")?;
        Ok(())
    }
}

fn generator(engine: ScriptedEngine, root: &Path) -> PreviewGenerator<ScriptedEngine> {
    PreviewGenerator::new(
        engine,
        OutputLayout::new(root),
        4,
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap()
}

fn source_file(dir: &Path) -> PathBuf {
    let path = dir.join("movie.mp4");
    fs::write(&path, b"not really a video").unwrap();
    path
}

fn frame_calls(calls: &[Call]) -> usize {
    calls.iter().filter(|c| matches!(c, Call::Frame(_))).count()
}

fn clip_calls(calls: &[Call]) -> Vec<ClipRequest> {
    calls
        .iter()
        .filter_map(|c| match c {
            Call::Clip(request) => Some(request.clone()),
            _ => None,
        })
        .collect()
}

/// 測試 1: 60 秒影片、6 張縮圖的完整流程
#[test]
fn test_full_pipeline_for_one_minute_video() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let generator = generator(ScriptedEngine::with_duration(60.0), dir.path());

    let bundle = generator
        .generate_preview(&source, "movie-1", &PreviewOptions::default())
        .unwrap();

    let offsets: Vec<f64> = bundle
        .thumbnails
        .iter()
        .map(|t| t.time_offset_seconds)
        .collect();
    assert_eq!(offsets, vec![8.0, 16.0, 24.0, 32.0, 40.0, 48.0]);
    assert!(bundle.thumbnails.iter().all(|t| t.width == 320 && t.height == 240));
    assert!(bundle.thumbnails.iter().all(|t| t.file_size_bytes == 4));
    assert!(bundle.preview_clip_path.is_some());
    assert!(bundle.loop_path.is_some());
    assert!(bundle.contact_sheet_path.is_none());
    assert_eq!(bundle.source_id, "movie-1");
    assert!((bundle.metadata.duration_seconds - 60.0).abs() < f64::EPSILON);

    for path in bundle.artifact_paths() {
        assert!(path.is_file(), "{} should exist", path.display());
    }

    let clips = clip_calls(&generator_calls(&generator));
    let clip = clips.iter().find(|r| !r.looping).unwrap();
    assert_eq!(clip.bitrate_kbps, Some(ClipQuality::Medium.bitrate_kbps()));
    assert_eq!((clip.width, clip.height), (854, Some(480)));
    assert!((clip.duration_seconds - 10.0).abs() < f64::EPSILON);
    let looped = clips.iter().find(|r| r.looping).unwrap();
    assert!((looped.duration_seconds - 5.0).abs() < f64::EPSILON);
}

fn generator_calls(generator: &PreviewGenerator<ScriptedEngine>) -> Vec<Call> {
    generator.engine().calls()
}

/// 測試 2: 所有縮圖失敗時仍回傳結果
#[test]
fn test_thumbnail_failures_do_not_fail_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let engine = ScriptedEngine {
        fail_frames: true,
        ..ScriptedEngine::with_duration(60.0)
    };
    let generator = generator(engine, dir.path());
    let options = PreviewOptions {
        generate_contact_sheet: true,
        ..PreviewOptions::default()
    };

    let bundle = generator.generate_preview(&source, "movie", &options).unwrap();

    assert!(bundle.thumbnails.is_empty());
    assert!(bundle.preview_clip_path.is_some());
    assert!(bundle.loop_path.is_some());
    // 沒有縮圖就不會呼叫合併
    assert!(bundle.contact_sheet_path.is_none());
    let calls = generator_calls(&generator);
    assert_eq!(frame_calls(&calls), 6);
    assert!(!calls.iter().any(|c| matches!(c, Call::Grid { .. })));

    // 失敗的縮圖不會留下檔案
    let leftovers = fs::read_dir(&generator.layout().thumbnails).unwrap().count();
    assert_eq!(leftovers, 0);
}

/// 測試 3: 影片短於預覽片段長度時不產生片段
#[test]
fn test_short_video_skips_clip() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let generator = generator(ScriptedEngine::with_duration(8.0), dir.path());

    let bundle = generator
        .generate_preview(&source, "short", &PreviewOptions::default())
        .unwrap();

    assert!(bundle.preview_clip_path.is_none());
    let clips = clip_calls(&generator_calls(&generator));
    assert_eq!(clips.len(), 1);
    assert!(clips[0].looping);
    assert!((clips[0].duration_seconds - 1.6).abs() < 1e-9);
    assert!(bundle.loop_path.is_some());
}

/// 測試 4: 影片長度剛好等於片段長度也不產生片段
#[test]
fn test_duration_equal_to_clip_length_skips_clip() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let generator = generator(ScriptedEngine::with_duration(10.0), dir.path());

    let bundle = generator
        .generate_preview(&source, "edge", &PreviewOptions::default())
        .unwrap();

    assert!(bundle.preview_clip_path.is_none());
    assert!(clip_calls(&generator_calls(&generator)).iter().all(|r| r.looping));
}

/// 測試 5: 探測失敗是唯一會讓管線回傳錯誤的情況
#[test]
fn test_probe_failure_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let generator = generator(ScriptedEngine::default(), dir.path());

    let result = generator.generate_preview(&source, "broken", &PreviewOptions::default());

    assert!(matches!(result, Err(ProbeError::NoVideoStream { .. })));
    assert!(generator_calls(&generator).is_empty());
}

/// 測試 6: 片段與循環動畫失敗只會省略對應欄位
#[test]
fn test_clip_failures_are_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let engine = ScriptedEngine {
        fail_clips: true,
        ..ScriptedEngine::with_duration(120.0)
    };
    let generator = generator(engine, dir.path());

    let bundle = generator
        .generate_preview(&source, "movie", &PreviewOptions::default())
        .unwrap();

    assert_eq!(bundle.thumbnails.len(), 6);
    assert!(bundle.preview_clip_path.is_none());
    assert!(bundle.loop_path.is_none());
}

/// 測試 6b: 引擎回報成功但沒有產出檔案時，結果不引用該路徑
#[test]
fn test_stage_without_output_file_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let engine = ScriptedEngine {
        skip_writes: true,
        ..ScriptedEngine::with_duration(60.0)
    };
    let generator = generator(engine, dir.path());
    let options = PreviewOptions {
        generate_contact_sheet: true,
        ..PreviewOptions::default()
    };

    let bundle = generator.generate_preview(&source, "hollow", &options).unwrap();

    assert_eq!(bundle.thumbnails.len(), 6);
    assert!(bundle.preview_clip_path.is_none());
    assert!(bundle.loop_path.is_none());
    assert!(bundle.contact_sheet_path.is_none());
    for path in bundle.artifact_paths() {
        assert!(path.is_file(), "{} should exist", path.display());
    }

    // 引擎確實被呼叫過，只是沒有產出
    let calls = generator_calls(&generator);
    assert_eq!(clip_calls(&calls).len(), 2);
    assert!(calls.iter().any(|c| matches!(c, Call::Grid { .. })));
}

/// 測試 7: 預覽圖由成功的縮圖組成
#[test]
fn test_contact_sheet_uses_successful_thumbnails() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let generator = generator(ScriptedEngine::with_duration(100.0), dir.path());
    let options = PreviewOptions {
        thumbnail_count: 9,
        thumbnail_size: ThumbnailSize {
            width: 160,
            height: 90,
        },
        generate_contact_sheet: true,
        generate_loop: false,
        ..PreviewOptions::default()
    };

    let bundle = generator.generate_preview(&source, "grid", &options).unwrap();

    assert_eq!(bundle.thumbnails.len(), 9);
    assert!(bundle.loop_path.is_none());
    let sheet = bundle.contact_sheet_path.as_ref().unwrap();
    assert!(sheet.starts_with(&generator.layout().sprites));
    let calls = generator_calls(&generator);
    assert!(calls.contains(&Call::Grid {
        inputs: 9,
        cols: 3,
        rows: 3
    }));
    assert!(clip_calls(&calls).iter().all(|r| !r.looping));
}

/// 測試 8: 縮圖數量不超過要求，時間點嚴格遞增且落在影片範圍內
#[test]
fn test_thumbnail_offsets_are_ordered_and_in_range() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let generator = generator(ScriptedEngine::with_duration(37.5), dir.path());
    let options = PreviewOptions {
        thumbnail_count: 12,
        ..PreviewOptions::default()
    };

    let bundle = generator.generate_preview(&source, "odd", &options).unwrap();

    assert!(bundle.thumbnails.len() <= 12);
    assert!(!bundle.thumbnails.is_empty());
    for pair in bundle.thumbnails.windows(2) {
        assert!(pair[0].time_offset_seconds < pair[1].time_offset_seconds);
    }
    assert!(bundle
        .thumbnails
        .iter()
        .all(|t| t.time_offset_seconds >= 1.0 && t.time_offset_seconds < 37.5));

    let names: HashSet<_> = bundle.thumbnails.iter().map(|t| t.file_path.clone()).collect();
    assert_eq!(names.len(), bundle.thumbnails.len());
}

/// 測試 9: 極短影片的時間點超出範圍時個別失敗
#[test]
fn test_tiny_video_out_of_range_offsets_fail_individually() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let generator = generator(ScriptedEngine::with_duration(3.0), dir.path());

    let bundle = generator
        .generate_preview(&source, "tiny", &PreviewOptions::default())
        .unwrap();

    // 間隔為 max(1, floor(3/7)) = 1，時間點 1..=6，只有 1、2 在範圍內
    let offsets: Vec<f64> = bundle
        .thumbnails
        .iter()
        .map(|t| t.time_offset_seconds)
        .collect();
    assert_eq!(offsets, vec![1.0, 2.0]);
    assert_eq!(frame_calls(&generator_calls(&generator)), 6);
}

/// 測試 10: 不要求縮圖時不呼叫擷取
#[test]
fn test_zero_thumbnails_requested() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let generator = generator(ScriptedEngine::with_duration(60.0), dir.path());
    let options = PreviewOptions {
        thumbnail_count: 0,
        generate_contact_sheet: true,
        ..PreviewOptions::default()
    };

    let bundle = generator.generate_preview(&source, "none", &options).unwrap();

    assert!(bundle.thumbnails.is_empty());
    assert!(bundle.contact_sheet_path.is_none());
    assert_eq!(frame_calls(&generator_calls(&generator)), 0);
}

/// 測試 11: 收到中斷訊號後不再擷取縮圖
#[test]
fn test_shutdown_skips_thumbnails() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let generator = PreviewGenerator::new(
        ScriptedEngine::with_duration(60.0),
        OutputLayout::new(dir.path()),
        2,
        Arc::new(AtomicBool::new(true)),
    )
    .unwrap();

    let bundle = generator
        .generate_preview(&source, "stopped", &PreviewOptions::default())
        .unwrap();

    assert!(bundle.thumbnails.is_empty());
    assert_eq!(frame_calls(&generator_calls(&generator)), 0);
}

/// 測試 12: 產生後可依來源識別碼查回產物
#[test]
fn test_lookup_after_generation() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let generator = generator(ScriptedEngine::with_duration(60.0), dir.path());
    let options = PreviewOptions {
        generate_contact_sheet: true,
        ..PreviewOptions::default()
    };

    let bundle = generator.generate_preview(&source, "lookup me", &options).unwrap();
    let stored = find_preview_by_source_id(generator.layout(), "lookup me").unwrap();

    assert_eq!(stored.generated_at_millis, bundle.created_at.timestamp_millis());
    let expected: Vec<PathBuf> = bundle.thumbnails.iter().map(|t| t.file_path.clone()).collect();
    assert_eq!(stored.thumbnails, expected);
    assert_eq!(stored.preview_clip_path, bundle.preview_clip_path);
    assert_eq!(stored.loop_path, bundle.loop_path);
    assert_eq!(stored.contact_sheet_path, bundle.contact_sheet_path);
}

/// 測試 13: 保留期清理只刪除過期產物
#[test]
fn test_retention_sweep_after_generation() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let generator = generator(ScriptedEngine::with_duration(60.0), dir.path());
    let bundle = generator
        .generate_preview(&source, "keep", &PreviewOptions::default())
        .unwrap();

    let expired = generator.layout().gifs.join("ancient_1_loop.gif");
    fs::write(&expired, b"old").unwrap();
    let file = fs::File::options().write(true).open(&expired).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(30 * 24 * 60 * 60))
        .unwrap();

    let report = sweep_old_artifacts(generator.layout(), &RetentionPolicy::default());

    assert_eq!(report.deleted, 1);
    assert_eq!(report.errors, 0);
    assert!(!expired.exists());
    for path in bundle.artifact_paths() {
        assert!(path.exists(), "{} should survive", path.display());
    }
}

/// 測試 14: 結果可序列化為 camelCase JSON，缺少的產物不輸出
#[test]
fn test_bundle_serializes_without_missing_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let source = source_file(dir.path());
    let generator = generator(ScriptedEngine::with_duration(5.0), dir.path());
    let options = PreviewOptions {
        generate_loop: false,
        ..PreviewOptions::default()
    };

    let bundle = generator.generate_preview(&source, "json", &options).unwrap();
    let json: serde_json::Value = serde_json::to_value(&bundle).unwrap();

    assert_eq!(json["sourceId"], "json");
    assert!(json.get("previewClipPath").is_none());
    assert!(json.get("loopPath").is_none());
    assert!(json.get("contactSheetPath").is_none());
    assert_eq!(json["metadata"]["durationSeconds"], 5.0);
    assert!(json["thumbnails"].is_array());
}
