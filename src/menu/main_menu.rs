use crate::component::retention_sweeper::SharedRetentionPolicy;
use crate::config::save::save_settings;
use crate::config::types::{ClipQuality, Config, MAX_THUMBNAIL_COUNT};
use crate::menu::handlers::{run_preview_generator, run_preview_lookup, run_retention_sweep};
use anyhow::Result;
use console::{Term, style};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};
use std::sync::{Arc, PoisonError};
use std::sync::atomic::AtomicBool;

pub fn show_main_menu(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    retention_policy: &SharedRetentionPolicy,
    config: &mut Config,
) -> Result<bool> {
    term.clear_screen()?;

    println!("{}", style("=== Video Preview Generator ===").cyan().bold());
    println!("{}", style("Press ESC to exit").dim());

    let options = [
        "Generate previews for a video",
        "Look up latest preview by id",
        "Sweep expired artifacts now",
        "Settings",
        "Exit",
    ];

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Choose an action")
        .items(&options)
        .default(0)
        .interact_on_opt(term)?;

    match selection {
        Some(0) => {
            run_preview_generator(term, shutdown_signal, config)?;
            Ok(true)
        }
        Some(1) => {
            run_preview_lookup(term, config)?;
            Ok(true)
        }
        Some(2) => {
            run_retention_sweep(term, config)?;
            Ok(true)
        }
        Some(3) => {
            show_settings_menu(term, retention_policy, config)?;
            Ok(true)
        }
        Some(4) | None => Ok(false),
        _ => unreachable!(),
    }
}

/// 設定選單
fn show_settings_menu(
    term: &Term,
    retention_policy: &SharedRetentionPolicy,
    config: &mut Config,
) -> Result<()> {
    loop {
        term.clear_screen()?;

        let preview = &config.settings.preview;
        println!("{}", style("=== Settings ===").cyan().bold());
        println!("{}", style("Press ESC to go back").dim());
        println!(
            "\n  thumbnails={} clip={}s/{} loop={} sheet={} retention={}d\n",
            preview.thumbnail_count,
            preview.clip_duration_seconds,
            preview.clip_quality,
            preview.generate_loop,
            preview.generate_contact_sheet,
            config.settings.retention.max_age_days
        );

        let options = [
            "Thumbnail count",
            "Clip quality",
            "Toggle loop generation",
            "Toggle contact sheet",
            "Retention days",
            "Back",
        ];

        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Choose a setting")
            .items(&options)
            .default(0)
            .interact_on_opt(term)?;

        let changed = match selection {
            Some(0) => edit_thumbnail_count(config)?,
            Some(1) => edit_clip_quality(term, config)?,
            Some(2) => {
                let preview = &mut config.settings.preview;
                preview.generate_loop = confirm("Generate loop?", preview.generate_loop)?;
                true
            }
            Some(3) => {
                let preview = &mut config.settings.preview;
                preview.generate_contact_sheet =
                    confirm("Generate contact sheet?", preview.generate_contact_sheet)?;
                true
            }
            Some(4) => edit_retention_days(config)?,
            Some(5) | None => break,
            _ => unreachable!(),
        };

        if changed {
            // 背景清理下一輪即採用新設定
            *retention_policy
                .write()
                .unwrap_or_else(PoisonError::into_inner) = config.settings.retention;
            save_settings(&config.settings)?;
            println!("\n{}", style("Settings saved").green());
            std::thread::sleep(std::time::Duration::from_secs(1));
        }
    }

    Ok(())
}

fn edit_thumbnail_count(config: &mut Config) -> Result<bool> {
    let current = config.settings.preview.thumbnail_count;
    let count: usize = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Thumbnail count (0-{MAX_THUMBNAIL_COUNT})"))
        .default(current)
        .validate_with(|value: &usize| {
            if *value <= MAX_THUMBNAIL_COUNT {
                Ok(())
            } else {
                Err(format!("must be at most {MAX_THUMBNAIL_COUNT}"))
            }
        })
        .interact_text()?;
    config.settings.preview.thumbnail_count = count;
    Ok(count != current)
}

/// 預覽片段品質選單
fn edit_clip_quality(term: &Term, config: &mut Config) -> Result<bool> {
    let qualities = [ClipQuality::Low, ClipQuality::Medium, ClipQuality::High];
    let items: Vec<String> = qualities
        .iter()
        .map(|q| {
            let (w, h) = q.resolution();
            format!("{q} ({}k, {w}x{h})", q.bitrate_kbps())
        })
        .collect();
    let default_index = qualities
        .iter()
        .position(|&q| q == config.settings.preview.clip_quality)
        .unwrap_or(1);

    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Clip quality")
        .items(&items)
        .default(default_index)
        .interact_on_opt(term)?;

    // ESC pressed - return without saving
    let Some(selection) = selection else {
        return Ok(false);
    };
    let selected = qualities[selection];
    let changed = selected != config.settings.preview.clip_quality;
    config.settings.preview.clip_quality = selected;
    Ok(changed)
}

fn edit_retention_days(config: &mut Config) -> Result<bool> {
    let current = config.settings.retention.max_age_days;
    let days: u32 = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Delete artifacts older than (days)")
        .default(current)
        .interact_text()?;
    config.settings.retention.max_age_days = days;
    Ok(days != current)
}

fn confirm(prompt: &str, current: bool) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(current)
        .interact()?)
}
