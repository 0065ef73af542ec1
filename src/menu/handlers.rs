use crate::component::preview_generator::{
    PreviewBundle, PreviewGenerator, find_preview_by_source_id,
};
use crate::component::retention_sweeper::sweep_old_artifacts;
use crate::config::save::{add_recent_path, save_settings};
use crate::config::{Config, OutputLayout};
use crate::pause;
use crate::tools::{FfmpegEngine, validate_file_exists};
use anyhow::Result;
use console::{Term, style};
use dialoguer::Input;
use dialoguer::theme::ColorfulTheme;
use indicatif::{ProgressBar, ProgressStyle};
use log::error;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

pub fn run_preview_generator(
    term: &Term,
    shutdown_signal: &Arc<AtomicBool>,
    config: &mut Config,
) -> Result<()> {
    if let Err(e) = generate_interactively(shutdown_signal, config) {
        error!("Preview generation failed: {e:#}");
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
    }

    pause(term)?;
    Ok(())
}

pub fn run_preview_lookup(term: &Term, config: &Config) -> Result<()> {
    let source_id: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Source id")
        .interact_text()?;

    let layout = OutputLayout::new(&config.settings.output_root);
    match find_preview_by_source_id(&layout, source_id.trim()) {
        Some(preview) => {
            println!(
                "\n{} generated at {} ms",
                style(&preview.source_id).bold(),
                preview.generated_at_millis
            );
            println!("  Thumbnails: {}", preview.thumbnails.len());
            for thumb in &preview.thumbnails {
                println!("    {}", thumb.display());
            }
            print_optional("Preview clip", preview.preview_clip_path.as_deref());
            print_optional("Loop", preview.loop_path.as_deref());
            print_optional("Contact sheet", preview.contact_sheet_path.as_deref());
        }
        None => println!("{}", style("No preview found for this id").yellow()),
    }

    pause(term)?;
    Ok(())
}

pub fn run_retention_sweep(term: &Term, config: &Config) -> Result<()> {
    let layout = OutputLayout::new(&config.settings.output_root);
    let policy = config.settings.retention;

    println!(
        "{}",
        style(format!(
            "Deleting artifacts older than {} days...",
            policy.max_age_days
        ))
        .dim()
    );
    let report = sweep_old_artifacts(&layout, &policy);

    println!("  Scanned: {}", report.scanned);
    println!("  Deleted: {}", style(report.deleted).green());
    if report.errors > 0 {
        println!("  Errors:  {}", style(report.errors).red());
    }

    pause(term)?;
    Ok(())
}

fn generate_interactively(shutdown_signal: &Arc<AtomicBool>, config: &mut Config) -> Result<()> {
    let theme = ColorfulTheme::default();
    let mut input = Input::<String>::with_theme(&theme).with_prompt("Source video path");
    if let Some(recent) = config.settings.recent_paths.first() {
        input = input.default(recent.clone());
    }
    let source_path = PathBuf::from(input.interact_text()?.trim());
    validate_file_exists(&source_path)?;

    let default_id = source_path
        .file_stem()
        .map_or_else(|| "source".to_string(), |s| s.to_string_lossy().to_string());
    let source_id: String = Input::with_theme(&theme)
        .with_prompt("Source id")
        .default(default_id)
        .interact_text()?;

    let settings = &config.settings;
    let engine = FfmpegEngine::new(
        &settings.engine.ffmpeg_path,
        &settings.engine.ffprobe_path,
        Duration::from_secs(settings.engine.timeout_seconds),
    );
    let generator = PreviewGenerator::new(
        engine,
        OutputLayout::new(&settings.output_root),
        settings.engine.thumbnail_workers,
        Arc::clone(shutdown_signal),
    )?;

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")?);
    spinner.set_message(format!("Generating previews for {}", source_path.display()));
    spinner.enable_steady_tick(Duration::from_millis(120));

    let result = generator.generate_preview(&source_path, source_id.trim(), &settings.preview);
    spinner.finish_and_clear();
    let bundle = result?;

    print_bundle(&bundle)?;

    add_recent_path(&mut config.settings, &source_path.to_string_lossy());
    save_settings(&config.settings)?;
    Ok(())
}

fn print_bundle(bundle: &PreviewBundle) -> Result<()> {
    println!("\n{}", style("=== Preview summary ===").cyan().bold());
    println!(
        "  Source:     {} ({:.1}s, {}x{})",
        bundle.source_path.display(),
        bundle.metadata.duration_seconds,
        bundle.metadata.width,
        bundle.metadata.height
    );
    println!("  Thumbnails: {}", style(bundle.thumbnails.len()).green());
    print_optional("Preview clip", bundle.preview_clip_path.as_deref());
    print_optional("Loop", bundle.loop_path.as_deref());
    print_optional("Contact sheet", bundle.contact_sheet_path.as_deref());
    println!("\n{}", serde_json::to_string_pretty(bundle)?);
    Ok(())
}

fn print_optional(label: &str, path: Option<&Path>) {
    match path {
        Some(p) => println!("  {label}: {}", p.display()),
        None => println!("  {label}: {}", style("-").dim()),
    }
}
