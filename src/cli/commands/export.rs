//! Export commands.

use std::io::Write;
use std::path::Path;

use anyhow::Context;
use console::style;

use annie::config::Settings;
use annie::formats::{conll, jsonl, ExportReport};
use annie::services::Workspace;

use crate::cli::helpers::load_workspace;

/// Interchange format of an export or import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Jsonl,
    Conll,
}

impl Format {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Jsonl => "JSONL",
            Self::Conll => "CoNLL",
        }
    }
}

/// Write the session's entities to a file, or to stdout without one.
pub fn cmd_export(settings: &Settings, format: Format, output: Option<&Path>) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;

    let report = match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Cannot create {}", path.display()))?;
            let mut out = std::io::BufWriter::new(file);
            write(format, &mut workspace, &mut out)?
        }
        None => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            write(format, &mut workspace, &mut out)?
        }
    };

    // stdout may carry the export itself
    for skipped in &report.skipped_files {
        eprintln!("{} Could not read {}", style("!").yellow(), skipped.display());
    }
    if report.dropped_overlaps > 0 {
        eprintln!(
            "{} Dropped {} overlapping entities",
            style("!").yellow(),
            report.dropped_overlaps
        );
    }
    eprintln!(
        "{} Exported {} documents with {} entities as {}",
        style("✓").green(),
        report.documents,
        report.entities,
        format.name()
    );
    if let Some(path) = output {
        eprintln!("  Written to {}", path.display());
    }
    Ok(())
}

fn write(
    format: Format,
    workspace: &mut Workspace,
    out: &mut impl Write,
) -> anyhow::Result<ExportReport> {
    let report = match format {
        Format::Jsonl => jsonl::export(workspace, out)?,
        Format::Conll => conll::export(workspace, out)?,
    };
    Ok(report)
}
