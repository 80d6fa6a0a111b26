//! Propagation commands.

use std::path::Path;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};

use annie::config::Settings;
use annie::models::{file_name, SchemaKind};
use annie::services::{
    Dictionary, PropagationOptions, PropagationReport, PropagationRules, Workspace,
};

use crate::cli::helpers::{load_workspace, resolve_entity, save_workspace, truncate};

/// Propagate the text and tag of one entity across the session.
pub fn cmd_propagate_span(
    settings: &Settings,
    file: Option<&str>,
    selector: &str,
    whole_word: bool,
) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let path = workspace.resolve_file(file)?;
    let document = workspace.document_mut(&path)?;
    let id = resolve_entity(document, selector)?;
    let rules = PropagationRules::from_entities(document.instances(&id).take(1));
    run(settings, workspace, &rules, whole_word)
}

/// Propagate every entity of one file across the session.
pub fn cmd_propagate_file(
    settings: &Settings,
    file: Option<&str>,
    whole_word: bool,
) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let path = workspace.resolve_file(file)?;
    let rules = match workspace.session().document(&path) {
        Some(document) => PropagationRules::from_entities(&document.entities),
        None => PropagationRules::default(),
    };
    if rules.is_empty() {
        println!(
            "{} {} has no entities to propagate",
            style("!").yellow(),
            file_name(&path)
        );
        return Ok(());
    }
    run(settings, workspace, &rules, whole_word)
}

pub fn cmd_propagate_dictionary(
    settings: &Settings,
    path: &Path,
    whole_word: bool,
    add_unknown_tags: bool,
) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let mut dictionary = Dictionary::load(path, &workspace.session().schema)?;

    println!(
        "{} Read {} entries from {}",
        style("→").cyan(),
        dictionary.entries.len() + dictionary.unknown_entries.len(),
        path.display()
    );
    if dictionary.malformed > 0 {
        println!(
            "{} Skipped {} malformed lines",
            style("!").yellow(),
            dictionary.malformed
        );
    }

    let unknown: Vec<String> = dictionary
        .unknown_tags()
        .into_iter()
        .map(str::to_string)
        .collect();
    if !unknown.is_empty() {
        if add_unknown_tags {
            let schema = &mut workspace.session_mut().schema;
            for tag in &unknown {
                if let Err(e) = schema.add(SchemaKind::EntityTag, tag) {
                    println!("{} {}", style("!").yellow(), e);
                }
            }
            dictionary.adopt_unknown();
            println!(
                "{} Added tags: {}",
                style("✓").green(),
                unknown.join(", ")
            );
        } else {
            println!(
                "{} Skipped {} entries with unknown tags: {}",
                style("!").yellow(),
                dictionary.unknown_entries.len(),
                unknown.join(", ")
            );
        }
    }

    let rules = dictionary.rules();
    if rules.is_empty() {
        println!("{} Nothing to propagate", style("!").yellow());
        if add_unknown_tags && !unknown.is_empty() {
            save_workspace(settings, &workspace)?;
        }
        return Ok(());
    }
    run(settings, workspace, &rules, whole_word)
}

fn run(
    settings: &Settings,
    mut workspace: Workspace,
    rules: &PropagationRules,
    whole_word: bool,
) -> anyhow::Result<()> {
    let options = Settings::propagation_options(workspace.session().flags, whole_word);
    let report = propagate_with_progress(&mut workspace, rules, options);
    save_workspace(settings, &workspace)?;

    for skipped in &report.files_skipped {
        println!(
            "{} Could not read {}",
            style("!").yellow(),
            skipped.display()
        );
    }
    println!(
        "{} Propagated {} rules: {} entities added in {} files",
        style("✓").green(),
        rules.len(),
        report.added,
        report.files_affected
    );
    Ok(())
}

fn propagate_with_progress(
    workspace: &mut Workspace,
    rules: &PropagationRules,
    options: PropagationOptions,
) -> PropagationReport {
    let progress = ProgressBar::new(workspace.session().files.len() as u64);
    if let Ok(bar_style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {wide_msg}")
    {
        progress.set_style(bar_style.progress_chars("█▓░"));
    }
    progress.set_message("Propagating...");
    let report = workspace.propagate(rules, options, |path| {
        progress.set_message(truncate(&file_name(path), 40));
        progress.inc(1);
    });
    progress.finish_and_clear();
    report
}
