//! 取樣時間點計算
//!
//! `interval = max(1, floor(duration / (count + 1)))`，
//! 取 `interval, 2*interval, ..., count*interval`。
//! `+1` 讓最後一個取樣點避開影片結尾；極短影片退回 1 秒間隔，
//! 超出長度的取樣點會在擷取時個別失敗並被略過。

use super::bundle::ThumbnailSpec;
use crate::config::ThumbnailSize;

#[must_use]
pub fn compute_offsets(duration_seconds: f64, count: usize) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }

    let interval = (duration_seconds / (count as f64 + 1.0)).floor().max(1.0);

    (1..=count).map(|i| i as f64 * interval).collect()
}

#[must_use]
pub fn thumbnail_specs(offsets: &[f64], size: ThumbnailSize) -> Vec<ThumbnailSpec> {
    offsets
        .iter()
        .enumerate()
        .map(|(index, &time_offset_seconds)| ThumbnailSpec {
            index,
            time_offset_seconds,
            target_width: size.width,
            target_height: size.height,
        })
        .collect()
}
