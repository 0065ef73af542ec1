pub mod layout;
pub mod load;
pub mod save;
pub mod types;

pub use layout::{ArtifactStem, OutputLayout, RUN_TAG_LEN, sanitize_source_id};
pub use types::{
    ClipQuality, Config, EngineSettings, MAX_RECENT_PATHS, MAX_THUMBNAIL_COUNT, PreviewOptions,
    RetentionPolicy, ThumbnailSize, UserSettings,
};
