mod ffmpeg_runner;
mod ffprobe_info;
mod media_engine;
mod path_validator;

pub use ffmpeg_runner::{EngineError, discard_output, ensure_output, run_with_timeout};
pub use ffprobe_info::{
    ProbeError, VideoMetadata, build_probe_args, parse_probe_output, probe_video,
};
pub use media_engine::{
    ClipRequest, FfmpegEngine, MediaEngine, build_clip_args, build_frame_args, build_grid_args,
    build_loop_args, build_xstack_layout,
};
pub use path_validator::{ensure_directory_exists, validate_file_exists};
