//! 保留期清理元件
//!
//! 獨立於預覽產生流程，定期刪除輸出目錄中過期的檔案。

mod main;

pub use main::{
    RetentionSweeper, SharedRetentionPolicy, SweepReport, sweep, sweep_old_artifacts,
};
