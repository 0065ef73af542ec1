use anyhow::{Context, Result};
use log::warn;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// 註冊 Ctrl-C 處理器，回傳共用的中斷旗標
///
/// 旗標設定後，尚未開始的縮圖擷取會被略過，背景清理執行緒也會停止。
pub fn setup_shutdown_signal() -> Result<Arc<AtomicBool>> {
    let shutdown_signal = Arc::new(AtomicBool::new(false));
    let signal_clone = Arc::clone(&shutdown_signal);

    ctrlc::set_handler(move || {
        signal_clone.store(true, Ordering::SeqCst);
        warn!("Interrupt received, finishing in-flight work and shutting down");
    })
    .context("Failed to install Ctrl-C handler")?;

    Ok(shutdown_signal)
}
