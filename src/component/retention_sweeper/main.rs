use crate::config::{OutputLayout, RetentionPolicy};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, SystemTime};
use walkdir::WalkDir;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// 等待下一輪清理時檢查中斷訊號的間隔
const SHUTDOWN_POLL: Duration = Duration::from_millis(500);

/// 清理結果
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub deleted: usize,
    pub errors: usize,
}

/// 刪除各目錄中最後修改時間早於 `now - max_age_days` 的檔案
///
/// 年齡小於 `min_age` 的檔案一律保留（可能仍在寫入中）。
/// 單一檔案或目錄的錯誤只記錄，不會中斷其餘清理。
pub fn sweep(directories: &[PathBuf], max_age_days: u32, min_age: Duration) -> SweepReport {
    let max_age = Duration::from_secs(u64::from(max_age_days) * SECONDS_PER_DAY).max(min_age);
    let now = SystemTime::now();
    let mut report = SweepReport::default();

    for dir in directories {
        if !dir.is_dir() {
            debug!("Skipping missing output directory {}", dir.display());
            continue;
        }
        sweep_directory(dir, now, max_age, &mut report);
    }

    info!(
        "Retention sweep finished: scanned {}, deleted {}, errors {}",
        report.scanned, report.deleted, report.errors
    );
    report
}

/// 依保留設定清理所有輸出目錄
pub fn sweep_old_artifacts(layout: &OutputLayout, policy: &RetentionPolicy) -> SweepReport {
    sweep(
        &layout.directories(),
        policy.max_age_days,
        Duration::from_secs(policy.min_age_seconds),
    )
}

fn sweep_directory(dir: &Path, now: SystemTime, max_age: Duration, report: &mut SweepReport) {
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Cannot read entry under {}: {e}", dir.display());
                report.errors += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        report.scanned += 1;

        let modified = match entry
            .metadata()
            .map_err(std::io::Error::from)
            .and_then(|m| m.modified())
        {
            Ok(modified) => modified,
            Err(e) => {
                warn!("Cannot stat {}: {e}", entry.path().display());
                report.errors += 1;
                continue;
            }
        };

        // 修改時間在未來時視為新檔
        let Ok(age) = now.duration_since(modified) else {
            continue;
        };
        if age <= max_age {
            continue;
        }

        match fs::remove_file(entry.path()) {
            Ok(()) => {
                info!("Deleted expired artifact {}", entry.path().display());
                report.deleted += 1;
            }
            Err(e) => {
                warn!("Failed to delete {}: {e}", entry.path().display());
                report.errors += 1;
            }
        }
    }
}

/// 背景清理與設定選單共用的保留設定
pub type SharedRetentionPolicy = Arc<RwLock<RetentionPolicy>>;

/// 背景定期清理
///
/// 每一輪都重新讀取共用設定，設定選單的修改不需重新啟動即可生效。
pub struct RetentionSweeper {
    directories: Vec<PathBuf>,
    policy: SharedRetentionPolicy,
    shutdown_signal: Arc<AtomicBool>,
}

impl RetentionSweeper {
    #[must_use]
    pub fn new(
        layout: &OutputLayout,
        policy: SharedRetentionPolicy,
        shutdown_signal: Arc<AtomicBool>,
    ) -> Self {
        Self {
            directories: layout.directories(),
            policy,
            shutdown_signal,
        }
    }

    fn current_policy(&self) -> RetentionPolicy {
        *self.policy.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn run_once(&self) -> SweepReport {
        let policy = self.current_policy();
        sweep(
            &self.directories,
            policy.max_age_days,
            Duration::from_secs(policy.min_age_seconds),
        )
    }

    /// 啟動背景執行緒：立即清理一次，之後每隔設定的分鐘數再清理，直到收到中斷訊號
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("retention-sweeper".to_string())
            .spawn(move || {
                while !self.shutdown_signal.load(Ordering::SeqCst) {
                    self.run_once();
                    let minutes = self.current_policy().sweep_interval_minutes.max(1);
                    if !self.wait(Duration::from_secs(minutes * 60)) {
                        break;
                    }
                }
                debug!("Retention sweeper stopped");
            })
    }

    /// 等待下一輪；收到中斷訊號時回傳 false
    fn wait(&self, interval: Duration) -> bool {
        let mut waited = Duration::ZERO;
        while waited < interval {
            if self.shutdown_signal.load(Ordering::SeqCst) {
                return false;
            }
            thread::sleep(SHUTDOWN_POLL);
            waited += SHUTDOWN_POLL;
        }
        !self.shutdown_signal.load(Ordering::SeqCst)
    }
}
