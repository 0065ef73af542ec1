use anyhow::Result;
use console::{Term, style};
use log::{info, warn};
use std::sync::{Arc, RwLock};
use video_preview::component::RetentionSweeper;
use video_preview::config::{Config, OutputLayout};
use video_preview::init;
use video_preview::menu::show_main_menu;
use video_preview::signal::setup_shutdown_signal;

fn main() -> Result<()> {
    init::init();
    let term = Term::stdout();
    let shutdown_signal = setup_shutdown_signal()?;

    let mut config = Config::new()?;

    // 啟動時建立輸出目錄，並讓保留期清理在背景獨立執行
    let layout = OutputLayout::new(&config.settings.output_root);
    layout.ensure_directories()?;
    let retention_policy = Arc::new(RwLock::new(config.settings.retention));
    let sweeper = RetentionSweeper::new(
        &layout,
        Arc::clone(&retention_policy),
        Arc::clone(&shutdown_signal),
    );
    let sweeper_handle = match sweeper.spawn() {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("Retention sweeper not started: {e}");
            None
        }
    };

    loop {
        match show_main_menu(&term, &shutdown_signal, &retention_policy, &mut config) {
            Ok(true) => {}
            Ok(false) => {
                term.clear_screen()?;
                println!("\n{}", style("Goodbye!").green().bold());
                info!("Program exited normally");
                break;
            }
            Err(e) => {
                warn!("Program error: {e}");
                eprintln!("{} {}", style("Error:").red().bold(), e);
                break;
            }
        }
    }

    shutdown_signal.store(true, std::sync::atomic::Ordering::SeqCst);
    if let Some(handle) = sweeper_handle {
        let _ = handle.join();
    }

    Ok(())
}
