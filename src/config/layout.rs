use crate::config::types::ClipQuality;
use crate::tools::ensure_directory_exists;
use anyhow::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use uuid::Uuid;

/// 執行標記長度（uuid 的前 8 個十六進位字元）
pub const RUN_TAG_LEN: usize = 8;

static UNSAFE_ID_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9_-]").expect("static regex is valid")
});

/// 產物輸出目錄配置
///
/// ```text
/// <root>/thumbnails/
/// <root>/previews/videos/
/// <root>/previews/gifs/
/// <root>/previews/sprites/
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub thumbnails: PathBuf,
    pub videos: PathBuf,
    pub gifs: PathBuf,
    pub sprites: PathBuf,
}

impl OutputLayout {
    #[must_use]
    pub fn new(root: &Path) -> Self {
        let previews = root.join("previews");
        Self {
            thumbnails: root.join("thumbnails"),
            videos: previews.join("videos"),
            gifs: previews.join("gifs"),
            sprites: previews.join("sprites"),
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in self.directories() {
            ensure_directory_exists(&dir)?;
        }
        Ok(())
    }

    /// 保留期清理會掃描的所有目錄
    #[must_use]
    pub fn directories(&self) -> Vec<PathBuf> {
        vec![
            self.thumbnails.clone(),
            self.videos.clone(),
            self.gifs.clone(),
            self.sprites.clone(),
        ]
    }

    #[must_use]
    pub fn thumbnail_path(&self, stem: &ArtifactStem, index: usize) -> PathBuf {
        self.thumbnails
            .join(format!("{}_thumb_{index:02}.jpg", stem.prefix()))
    }

    #[must_use]
    pub fn clip_path(&self, stem: &ArtifactStem, quality: ClipQuality) -> PathBuf {
        self.videos
            .join(format!("{}_preview_{quality}.mp4", stem.prefix()))
    }

    #[must_use]
    pub fn loop_path(&self, stem: &ArtifactStem) -> PathBuf {
        self.gifs.join(format!("{}_loop.gif", stem.prefix()))
    }

    #[must_use]
    pub fn contact_sheet_path(&self, stem: &ArtifactStem) -> PathBuf {
        self.sprites.join(format!("{}_sheet.jpg", stem.prefix()))
    }
}

/// 檔名前綴：來源識別碼 + 產生時間（毫秒）+ 執行標記
///
/// 同一來源重複產生時檔名不會衝突，保留期清理也不會誤判為舊檔。
/// 同一毫秒內的兩次執行由 8 位十六進位的執行標記區分。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactStem {
    pub safe_id: String,
    pub generated_at_millis: i64,
    pub run_tag: String,
}

impl ArtifactStem {
    #[must_use]
    pub fn new(source_id: &str, generated_at_millis: i64) -> Self {
        let run_tag = Uuid::new_v4().simple().to_string()[..RUN_TAG_LEN].to_string();
        Self::with_run_tag(source_id, generated_at_millis, &run_tag)
    }

    #[must_use]
    pub fn with_run_tag(source_id: &str, generated_at_millis: i64, run_tag: &str) -> Self {
        Self {
            safe_id: sanitize_source_id(source_id),
            generated_at_millis,
            run_tag: run_tag.to_string(),
        }
    }

    #[must_use]
    pub fn prefix(&self) -> String {
        format!("{}_{}_{}", self.safe_id, self.generated_at_millis, self.run_tag)
    }
}

/// 將來源識別碼中檔名不安全的字元替換為 `_`
#[must_use]
pub fn sanitize_source_id(source_id: &str) -> String {
    let cleaned = UNSAFE_ID_CHARS.replace_all(source_id.trim(), "_");
    if cleaned.is_empty() {
        "source".to_string()
    } else {
        cleaned.into_owned()
    }
}
