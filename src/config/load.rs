use crate::config::types::{Config, UserSettings};
use anyhow::{Context, Result};
use log::warn;
use std::fs;
use std::path::Path;

pub const SETTINGS_FILE: &str = "settings.json";

impl Config {
    /// 從目前工作目錄的 settings.json 載入設定，檔案不存在時使用預設值
    pub fn new() -> Result<Self> {
        Self::load_from(Path::new(SETTINGS_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let settings = match Self::load_settings(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Using default settings: {e:#}");
                UserSettings::default()
            }
        };
        Ok(Self { settings })
    }

    fn load_settings(path: &Path) -> Result<UserSettings> {
        if !path.exists() {
            return Ok(UserSettings::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings from {}", path.display()))
    }
}
