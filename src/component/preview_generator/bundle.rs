use crate::tools::{EngineError, VideoMetadata};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// 單一取樣點的縮圖規格
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThumbnailSpec {
    pub index: usize,
    pub time_offset_seconds: f64,
    pub target_width: u32,
    pub target_height: u32,
}

/// 成功產生的縮圖
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThumbnailArtifact {
    pub file_path: PathBuf,
    pub time_offset_seconds: f64,
    pub width: u32,
    pub height: u32,
    pub file_size_bytes: u64,
}

/// 一次管線執行的結果
///
/// 選用欄位只有在該階段被要求且成功時才會存在；
/// 回傳時所有路徑都指向已存在的檔案。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewBundle {
    pub id: Uuid,
    pub source_id: String,
    pub source_path: PathBuf,
    pub thumbnails: Vec<ThumbnailArtifact>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_clip_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loop_path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_sheet_path: Option<PathBuf>,
    pub metadata: VideoMetadata,
    pub created_at: DateTime<Utc>,
}

impl PreviewBundle {
    /// 所有已記錄的產物路徑
    #[must_use]
    pub fn artifact_paths(&self) -> Vec<&PathBuf> {
        self.thumbnails
            .iter()
            .map(|t| &t.file_path)
            .chain(self.preview_clip_path.iter())
            .chain(self.loop_path.iter())
            .chain(self.contact_sheet_path.iter())
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Thumbnail,
    Clip,
    Loop,
    ContactSheet,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Thumbnail => "thumbnail",
            Self::Clip => "preview clip",
            Self::Loop => "loop",
            Self::ContactSheet => "contact sheet",
        })
    }
}

/// 選用階段的失敗，只在階段邊界記錄，不會傳出管線
#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct StageError {
    pub stage: Stage,
    #[source]
    pub source: EngineError,
}

impl StageError {
    #[must_use]
    pub const fn new(stage: Stage, source: EngineError) -> Self {
        Self { stage, source }
    }
}
