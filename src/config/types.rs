use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

pub const MAX_RECENT_PATHS: usize = 10;

/// 單次執行最多擷取的縮圖數量
pub const MAX_THUMBNAIL_COUNT: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

impl Default for ThumbnailSize {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
        }
    }
}

/// 預覽片段品質預設：固定位元率與輸出解析度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl ClipQuality {
    #[must_use]
    pub const fn bitrate_kbps(self) -> u32 {
        match self {
            Self::Low => 500,
            Self::Medium => 1000,
            Self::High => 2500,
        }
    }

    #[must_use]
    pub const fn resolution(self) -> (u32, u32) {
        match self {
            Self::Low => (640, 360),
            Self::Medium => (854, 480),
            Self::High => (1280, 720),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ClipQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 單次預覽產生的選項
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewOptions {
    pub thumbnail_count: usize,
    pub thumbnail_size: ThumbnailSize,
    pub clip_duration_seconds: u32,
    pub clip_quality: ClipQuality,
    pub generate_loop: bool,
    pub generate_contact_sheet: bool,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            thumbnail_count: 6,
            thumbnail_size: ThumbnailSize::default(),
            clip_duration_seconds: 10,
            clip_quality: ClipQuality::Medium,
            generate_loop: true,
            generate_contact_sheet: false,
        }
    }
}

impl PreviewOptions {
    /// 在管線開始前套用上下限，之後不再修改
    #[must_use]
    pub fn resolved(&self) -> Self {
        Self {
            thumbnail_count: self.thumbnail_count.min(MAX_THUMBNAIL_COUNT),
            thumbnail_size: ThumbnailSize {
                width: self.thumbnail_size.width.max(1),
                height: self.thumbnail_size.height.max(1),
            },
            clip_duration_seconds: self.clip_duration_seconds.max(1),
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    /// 每次呼叫外部引擎的逾時秒數
    pub timeout_seconds: u64,
    /// 縮圖平行擷取的工作執行緒數
    pub thumbnail_workers: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            timeout_seconds: 30,
            thumbnail_workers: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionPolicy {
    pub max_age_days: u32,
    pub sweep_interval_minutes: u64,
    /// 小於此年齡的檔案一律保留，避免誤刪寫入中的產物
    pub min_age_seconds: u64,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_age_days: 7,
            sweep_interval_minutes: 60,
            min_age_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub output_root: PathBuf,
    pub preview: PreviewOptions,
    pub engine: EngineSettings,
    pub retention: RetentionPolicy,
    pub recent_paths: Vec<String>,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            output_root: PathBuf::from("."),
            preview: PreviewOptions::default(),
            engine: EngineSettings::default(),
            retention: RetentionPolicy::default(),
            recent_paths: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub settings: UserSettings,
}
