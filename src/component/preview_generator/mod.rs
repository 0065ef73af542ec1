//! 影片預覽產物生成元件
//!
//! 由單一影片產生縮圖、預覽片段、循環動畫與選用的預覽圖。
//! 只有影片探測是必要階段，其餘階段各自失敗不影響結果回傳。

mod bundle;
mod clip_encoder;
mod contact_sheet_merger;
mod loop_encoder;
mod main;
mod preview_lookup;
mod schedule;
mod thumbnail_extractor;

pub use bundle::{PreviewBundle, Stage, StageError, ThumbnailArtifact, ThumbnailSpec};
pub use clip_encoder::{clip_request, generate_preview_clip, should_generate_clip};
pub use contact_sheet_merger::{generate_contact_sheet, grid_shape};
pub use loop_encoder::{LOOP_FPS, LOOP_MAX_SECONDS, LOOP_WIDTH, generate_loop, loop_duration};
pub use main::{PipelineState, PreviewGenerator};
pub use preview_lookup::{StoredPreview, find_preview_by_source_id};
pub use schedule::{compute_offsets, thumbnail_specs};
pub use thumbnail_extractor::{
    ThumbnailTask, create_thumbnail_tasks, extract_thumbnail, extract_thumbnails_parallel,
};
