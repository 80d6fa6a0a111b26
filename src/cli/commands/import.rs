//! Import commands.

use std::path::Path;

use anyhow::{bail, Context};
use console::style;

use annie::config::Settings;
use annie::formats::{build_session, conll, jsonl, UnknownTagPolicy};
use annie::repository::SessionStore;

use super::export::Format;

/// Turn an annotated corpus into text files plus a new session.
pub fn cmd_import(
    settings: &Settings,
    format: Format,
    input: &Path,
    out_dir: &Path,
    policy: UnknownTagPolicy,
    force: bool,
) -> anyhow::Result<()> {
    let store = SessionStore::new(&settings.session_path);
    if store.exists() && !force {
        bail!(
            "Session {} already exists (use --force to replace it)",
            store.path().display()
        );
    }

    let parsed = match format {
        Format::Jsonl => jsonl::load(input)?,
        Format::Conll => conll::load(input)?,
    };
    if parsed.documents.is_empty() {
        println!(
            "{} No documents found in {}",
            style("!").yellow(),
            input.display()
        );
        return Ok(());
    }

    std::fs::create_dir_all(out_dir)
        .with_context(|| format!("Cannot create {}", out_dir.display()))?;
    let out_dir = std::fs::canonicalize(out_dir)?;
    let (session, report) = build_session(
        parsed,
        &out_dir,
        settings.schema.clone(),
        settings.flags,
        policy,
    )?;
    store.save(&session)?;

    println!(
        "{} Imported {} documents with {} entities from {}",
        style("✓").green(),
        report.documents,
        report.entities,
        format.name()
    );
    println!("  Text files written to {}", out_dir.display());
    println!("  Session saved to {}", store.path().display());
    if !report.tags_added.is_empty() {
        let added: Vec<&str> = report.tags_added.iter().map(String::as_str).collect();
        println!("  Added tags: {}", added.join(", "));
    }
    if report.malformed > 0 {
        println!(
            "{} Skipped {} malformed lines",
            style("!").yellow(),
            report.malformed
        );
    }
    if report.unknown_dropped > 0 {
        println!(
            "{} Dropped {} entities with unknown tags",
            style("!").yellow(),
            report.unknown_dropped
        );
    }
    if report.overlapping > 0 {
        println!(
            "{} {} entities overlap others; multi-label mode enabled",
            style("!").yellow(),
            report.overlapping
        );
    }
    if report.rejected > 0 {
        println!(
            "{} Rejected {} invalid or duplicate entities",
            style("!").yellow(),
            report.rejected
        );
    }
    Ok(())
}
