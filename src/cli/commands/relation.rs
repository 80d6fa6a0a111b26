//! Relation commands.

use console::style;

use annie::config::Settings;

use crate::cli::helpers::{
    describe_relation, load_workspace, resolve_entity, resolve_relation, save_workspace, short_id,
};

pub fn cmd_add(
    settings: &Settings,
    file: Option<&str>,
    head: &str,
    tail: &str,
    relation_type: &str,
) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let path = workspace.resolve_file(file)?;
    let (_, document, schema) = workspace.document_parts(&path)?;
    let selection = vec![resolve_entity(document, head)?, resolve_entity(document, tail)?];
    let relation = document.add_relation(&selection, relation_type, schema)?.clone();
    let description = describe_relation(document, &relation);
    save_workspace(settings, &workspace)?;
    println!("{} Added {}", style("✓").green(), description);
    Ok(())
}

pub fn cmd_flip(settings: &Settings, file: Option<&str>, selector: &str) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let path = workspace.resolve_file(file)?;
    let document = workspace.document_mut(&path)?;
    let id = resolve_relation(document, selector)?;
    let relation = document.flip_relation(&id)?.clone();
    let description = describe_relation(document, &relation);
    save_workspace(settings, &workspace)?;
    println!("{} Flipped {}", style("✓").green(), description);
    Ok(())
}

pub fn cmd_remove(settings: &Settings, file: Option<&str>, selector: &str) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let path = workspace.resolve_file(file)?;
    let document = workspace.document_mut(&path)?;
    let id = resolve_relation(document, selector)?;
    let relation = document.remove_relation(&id)?;
    save_workspace(settings, &workspace)?;
    println!(
        "{} Removed {} relation {}",
        style("✓").green(),
        relation.relation_type,
        short_id(&relation.id)
    );
    Ok(())
}
