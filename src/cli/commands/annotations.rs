//! Annotation file commands.

use std::path::Path;

use console::style;

use annie::config::Settings;
use annie::repository::{default_export_path, load_annotations, save_annotations};

use crate::cli::helpers::{load_workspace, save_workspace};

pub fn cmd_save(settings: &Settings, path: Option<&Path>) -> anyhow::Result<()> {
    let workspace = load_workspace(settings)?;
    let session = workspace.session();
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_export_path(session));
    let documents = save_annotations(session, &path)?;
    println!(
        "{} Saved annotations of {} documents to {}",
        style("✓").green(),
        documents,
        path.display()
    );
    Ok(())
}

pub fn cmd_load(settings: &Settings, path: &Path) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let report = load_annotations(workspace.session_mut(), path)?;
    save_workspace(settings, &workspace)?;
    println!(
        "{} Loaded {} entities and {} relations into {} documents",
        style("✓").green(),
        report.entities,
        report.relations,
        report.documents
    );
    for key in &report.unmatched {
        println!("{} No session file for {}", style("!").yellow(), key);
    }
    Ok(())
}
