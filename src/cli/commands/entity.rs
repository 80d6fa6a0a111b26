//! Entity commands: add, remove, merge, demerge and relabel.

use anyhow::bail;
use console::style;

use annie::config::Settings;
use annie::models::Span;

use crate::cli::helpers::{
    describe_entity, load_workspace, parse_instance, resolve_entity, resolve_instance,
    save_workspace, short_id,
};

pub fn cmd_add(
    settings: &Settings,
    file: Option<&str>,
    span: Option<Span>,
    text: Option<&str>,
    occurrence: usize,
    tag: &str,
) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let path = workspace.resolve_file(file)?;
    let entity = match (span, text) {
        (_, Some(text)) => workspace.add_entity_by_text(&path, text, occurrence, tag)?,
        (Some(span), None) => workspace.add_entity(&path, span, tag)?,
        (None, None) => bail!("Give a span or --text"),
    };
    save_workspace(settings, &workspace)?;
    println!("{} Added {}", style("✓").green(), describe_entity(&entity));
    Ok(())
}

pub fn cmd_remove(settings: &Settings, file: Option<&str>, selector: &str) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let path = workspace.resolve_file(file)?;
    let document = workspace.document_mut(&path)?;
    let removal = match parse_instance(selector) {
        Some(_) => {
            let index = resolve_instance(document, selector)?;
            document.remove_instance(index)?
        }
        None => {
            let id = resolve_entity(document, selector)?;
            document.remove_entity(&id)?
        }
    };
    save_workspace(settings, &workspace)?;
    println!(
        "{} Removed {} entity instances and {} relations",
        style("✓").green(),
        removal.entities,
        removal.relations
    );
    Ok(())
}

pub fn cmd_merge(settings: &Settings, file: Option<&str>, selectors: &[String]) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let path = workspace.resolve_file(file)?;
    let document = workspace.document_mut(&path)?;
    let ids = selectors
        .iter()
        .map(|s| resolve_entity(document, s))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let outcome = document.merge(&ids)?;
    save_workspace(settings, &workspace)?;

    println!(
        "{} Merged {} instances into {}",
        style("✓").green(),
        outcome.instances_rewritten,
        short_id(&outcome.canonical_id)
    );
    if outcome.relations_rewritten > 0 {
        println!(
            "  {} relations repointed, {} duplicates removed",
            outcome.relations_rewritten, outcome.duplicates_removed
        );
    }
    if outcome.self_loops > 0 {
        println!(
            "{} {} relations now point from the entity to itself",
            style("!").yellow(),
            outcome.self_loops
        );
    }
    Ok(())
}

pub fn cmd_demerge(settings: &Settings, file: Option<&str>, instance: &str) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let path = workspace.resolve_file(file)?;
    let document = workspace.document_mut(&path)?;
    let index = resolve_instance(document, instance)?;
    let id = document.demerge(index)?;
    save_workspace(settings, &workspace)?;
    println!(
        "{} Instance {} now has id {}",
        style("✓").green(),
        instance,
        short_id(&id)
    );
    Ok(())
}

pub fn cmd_relabel(
    settings: &Settings,
    file: Option<&str>,
    selectors: &[String],
    tag: &str,
) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let path = workspace.resolve_file(file)?;
    let (_, document, schema) = workspace.document_parts(&path)?;
    let ids = selectors
        .iter()
        .map(|s| resolve_entity(document, s))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let changed = document.relabel(&ids, tag, schema)?;
    save_workspace(settings, &workspace)?;
    println!(
        "{} Relabeled {} instances as {}",
        style("✓").green(),
        changed,
        tag
    );
    Ok(())
}
