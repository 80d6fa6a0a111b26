//! NER pre-annotation command.

use std::path::PathBuf;
use std::sync::Arc;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use annie::config::Settings;
use annie::models::file_name;
use annie::services::{NerError, NerEvent, NerService};

use crate::cli::helpers::{load_workspace, save_workspace, truncate};

/// Pre-annotate the current file, one named file, or every file.
pub async fn cmd_ner(settings: &Settings, file: Option<&str>, all: bool) -> anyhow::Result<()> {
    let service = match NerService::from_config(&settings.ner) {
        Ok(service) => service,
        Err(NerError::NotConfigured) => {
            println!("{} NER is not configured", style("!").yellow());
            println!("  Set ner.command in your annie config file");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    if !service.is_available() {
        println!(
            "{} NER backend {} not available",
            style("✗").red(),
            service.backend_id()
        );
        println!("  {}", service.availability_hint());
        return Ok(());
    }

    let mut workspace = load_workspace(settings)?;
    let files: Vec<PathBuf> = if all {
        workspace.session().files.clone()
    } else {
        vec![workspace.resolve_file(file)?]
    };

    println!(
        "{} Running {} on {} documents",
        style("→").cyan(),
        service.backend_id(),
        files.len()
    );

    // Create event channel for progress tracking
    let (event_tx, mut event_rx) = mpsc::channel::<NerEvent>(100);

    // State for progress bar
    let pb = Arc::new(tokio::sync::Mutex::new(None::<ProgressBar>));
    let pb_clone = pb.clone();

    // Spawn event handler for UI
    let event_handler = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match event {
                NerEvent::Started { total_documents } => {
                    let progress = ProgressBar::new(total_documents as u64);
                    if let Ok(bar_style) = ProgressStyle::default_bar()
                        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
                    {
                        progress.set_style(bar_style.progress_chars("█▓░"));
                    }
                    progress.set_message("Annotating...");
                    *pb_clone.lock().await = Some(progress);
                }
                NerEvent::DocumentStarted { path } => {
                    if let Some(ref progress) = *pb_clone.lock().await {
                        progress.set_message(truncate(&file_name(&path), 40));
                    }
                }
                NerEvent::DocumentCompleted { .. } => {
                    if let Some(ref progress) = *pb_clone.lock().await {
                        progress.inc(1);
                    }
                }
                NerEvent::DocumentFailed { path, error } => {
                    if let Some(ref progress) = *pb_clone.lock().await {
                        progress.println(format!(
                            "{} {}: {}",
                            style("✗").red(),
                            file_name(&path),
                            error
                        ));
                        progress.inc(1);
                    }
                }
                NerEvent::Complete {
                    succeeded,
                    failed,
                    added,
                } => {
                    if let Some(ref progress) = *pb_clone.lock().await {
                        progress.finish_and_clear();
                    }
                    *pb_clone.lock().await = None;

                    println!(
                        "{} NER complete: {} succeeded, {} failed, {} entities added",
                        style("✓").green(),
                        succeeded,
                        failed,
                        added
                    );
                }
            }
        }
    });

    let result = service.run(&mut workspace, &files, event_tx).await;

    // Wait for event handler to finish
    let _ = event_handler.await;

    match result {
        Ok(report) => {
            if report.unknown_labels > 0 {
                println!(
                    "  {} {} predictions had labels outside the schema",
                    style("→").dim(),
                    report.unknown_labels
                );
            }
            if report.rejected > 0 {
                println!(
                    "  {} {} predictions were rejected (invalid span or overlap)",
                    style("→").dim(),
                    report.rejected
                );
            }
            if report.added > 0 {
                save_workspace(settings, &workspace)?;
            }
            Ok(())
        }
        Err(NerError::Unavailable { backend, hint }) => {
            println!("{} NER backend {} not available", style("✗").red(), backend);
            println!("  {}", hint);
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
