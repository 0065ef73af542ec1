//! 依來源識別碼查詢最近一次的預覽產物
//!
//! 沒有資料庫，只能從檔名反推，因此無法還原每張縮圖的時間點與大小。
//! 之後應改為持久化 `PreviewBundle` 紀錄。

use crate::config::{OutputLayout, RUN_TAG_LEN, sanitize_source_id};
use regex::Regex;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// 從檔案系統重建的部分預覽資料
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredPreview {
    pub source_id: String,
    pub generated_at_millis: i64,
    pub run_tag: String,
    pub thumbnails: Vec<PathBuf>,
    pub preview_clip_path: Option<PathBuf>,
    pub loop_path: Option<PathBuf>,
    pub contact_sheet_path: Option<PathBuf>,
}

#[derive(Debug)]
enum ArtifactKind {
    Thumbnail(usize),
    Clip,
    Loop,
    Sheet,
}

pub fn find_preview_by_source_id(layout: &OutputLayout, source_id: &str) -> Option<StoredPreview> {
    let safe_id = sanitize_source_id(source_id);
    let pattern = Regex::new(&format!(
        concat!(
            r"^{}_(\d+)_([0-9a-f]{{{}}})_",
            r"(?:thumb_(\d+)\.jpg|(preview)_(?:low|medium|high)\.mp4|(loop)\.gif|(sheet)\.jpg)$"
        ),
        regex::escape(&safe_id),
        RUN_TAG_LEN
    ))
    .ok()?;

    // 依產生時間與執行標記分組，取最新的一組
    let mut generations: BTreeMap<(i64, String), Vec<(ArtifactKind, PathBuf)>> = BTreeMap::new();
    for dir in layout.directories() {
        for (generation, kind, path) in scan_directory(&dir, &pattern) {
            generations.entry(generation).or_default().push((kind, path));
        }
    }

    let ((generated_at_millis, run_tag), artifacts) = generations.into_iter().next_back()?;

    let mut preview = StoredPreview {
        source_id: source_id.to_string(),
        generated_at_millis,
        run_tag,
        ..StoredPreview::default()
    };
    let mut thumbnails = Vec::new();
    for (kind, path) in artifacts {
        match kind {
            ArtifactKind::Thumbnail(index) => thumbnails.push((index, path)),
            ArtifactKind::Clip => preview.preview_clip_path = Some(path),
            ArtifactKind::Loop => preview.loop_path = Some(path),
            ArtifactKind::Sheet => preview.contact_sheet_path = Some(path),
        }
    }
    thumbnails.sort_by_key(|(index, _)| *index);
    preview.thumbnails = thumbnails.into_iter().map(|(_, p)| p).collect();

    Some(preview)
}

fn scan_directory(dir: &Path, pattern: &Regex) -> Vec<((i64, String), ArtifactKind, PathBuf)> {
    WalkDir::new(dir)
        .max_depth(1)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let name = entry.file_name().to_str()?.to_string();
            let caps = pattern.captures(&name)?;
            let millis = caps.get(1)?.as_str().parse::<i64>().ok()?;
            let run_tag = caps.get(2)?.as_str().to_string();
            let kind = if let Some(index) = caps.get(3) {
                ArtifactKind::Thumbnail(index.as_str().parse().ok()?)
            } else if caps.get(4).is_some() {
                ArtifactKind::Clip
            } else if caps.get(5).is_some() {
                ArtifactKind::Loop
            } else if caps.get(6).is_some() {
                ArtifactKind::Sheet
            } else {
                return None;
            };
            Some(((millis, run_tag), kind, entry.into_path()))
        })
        .collect()
}
