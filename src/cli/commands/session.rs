//! Session lifecycle and navigation commands.

use std::path::Path;

use anyhow::{bail, Context};
use console::style;

use annie::config::Settings;
use annie::models::{file_name, Session};
use annie::repository::SessionStore;

use crate::cli::helpers::{describe_entity, describe_relation, load_workspace, save_workspace};

/// Start a new session over a directory of text files.
pub fn cmd_open(settings: &Settings, dir: &Path, force: bool) -> anyhow::Result<()> {
    let store = SessionStore::new(&settings.session_path);
    if store.exists() && !force {
        bail!(
            "Session {} already exists (use --force to replace it)",
            store.path().display()
        );
    }

    let dir = std::fs::canonicalize(dir)
        .with_context(|| format!("Cannot open directory {}", dir.display()))?;
    let session = Session::open_directory(&dir, settings.schema.clone(), settings.flags)
        .with_context(|| format!("Failed to list {}", dir.display()))?;

    if session.files.is_empty() {
        println!(
            "{} No .txt files found in {}",
            style("!").yellow(),
            dir.display()
        );
        return Ok(());
    }

    store.save(&session)?;
    println!(
        "{} Opened {} files from {}",
        style("✓").green(),
        session.files.len(),
        dir.display()
    );
    println!("  Session saved to {}", store.path().display());
    Ok(())
}

pub fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    let workspace = load_workspace(settings)?;
    let session = workspace.session();

    println!("Session:   {}", settings.session_path.display());
    println!("Files:     {}", session.files.len());
    match (session.current_file_index, session.current_file()) {
        (Some(index), Some(path)) => {
            println!("Current:   {} ({})", file_name(path), index + 1)
        }
        _ => println!("Current:   -"),
    }
    println!("Entities:  {}", session.entity_count());
    println!("Relations: {}", session.relation_count());
    println!(
        "Tags:      {}",
        session.schema.entity_tags.join(", ")
    );
    println!(
        "Types:     {}",
        session.schema.relation_types.join(", ")
    );
    println!(
        "Flags:     extend_to_word={} allow_overlap={}",
        session.flags.extend_to_word, session.flags.allow_overlap
    );
    Ok(())
}

pub fn cmd_ls(settings: &Settings) -> anyhow::Result<()> {
    let workspace = load_workspace(settings)?;
    let session = workspace.session();
    for (index, path) in session.files.iter().enumerate() {
        let marker = if session.current_file_index == Some(index) {
            style("→").cyan().to_string()
        } else {
            " ".to_string()
        };
        let (entities, relations) = session
            .document(path)
            .map(|d| (d.entities.len(), d.relations.len()))
            .unwrap_or((0, 0));
        println!(
            "{} {:>4}  {:<40} {} entities, {} relations",
            marker,
            index + 1,
            file_name(path),
            entities,
            relations
        );
    }
    Ok(())
}

pub fn cmd_goto(settings: &Settings, query: &str) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let session = workspace.session_mut();
    let index = match query.parse::<usize>() {
        Ok(number) if number > 0 => number - 1,
        _ => match session.find_file(query) {
            Some(index) => index,
            None => bail!("No file matches {:?}", query),
        },
    };
    if !session.set_current(index) {
        bail!("No file {}; the session has {}", query, session.files.len());
    }
    let name = file_name(&session.files[index]);
    save_workspace(settings, &workspace)?;
    println!("{} {}", style("→").cyan(), name);
    Ok(())
}

/// Move the current file by `delta`, stopping at either end.
pub fn cmd_step(settings: &Settings, delta: isize) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let session = workspace.session_mut();
    let Some(current) = session.current_file_index else {
        bail!("The session has no files");
    };
    let target = current.checked_add_signed(delta).filter(|&i| i < session.files.len());
    let Some(target) = target else {
        println!(
            "{} Already at the {} file",
            style("!").yellow(),
            if delta > 0 { "last" } else { "first" }
        );
        return Ok(());
    };
    session.set_current(target);
    let name = file_name(&session.files[target]);
    save_workspace(settings, &workspace)?;
    println!("{} {} ({})", style("→").cyan(), name, target + 1);
    Ok(())
}

pub fn cmd_show(settings: &Settings, file: Option<&str>, with_text: bool) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let path = workspace.resolve_file(file)?;
    println!("{}", style(path.display()).bold());

    if with_text {
        let text = workspace.text(&path)?;
        for (number, line) in text.lines() {
            println!("{} {}", style(format!("{:>4}", number)).dim(), line);
        }
        println!();
    }

    let Some(document) = workspace.session().document(&path) else {
        println!("No annotations");
        return Ok(());
    };
    println!("Entities ({}):", document.entities.len());
    for (index, entity) in document.entities.iter().enumerate() {
        let mut flags = Vec::new();
        if document.is_merged(&entity.id) {
            flags.push("merged");
        }
        if entity.propagated {
            flags.push("propagated");
        }
        let suffix = if flags.is_empty() {
            String::new()
        } else {
            format!(" ({})", flags.join(", "))
        };
        println!("  #{:<3} {}{}", index + 1, describe_entity(entity), suffix);
    }
    println!("Relations ({}):", document.relations.len());
    for (index, relation) in document.relations.iter().enumerate() {
        println!("  #{:<3} {}", index + 1, describe_relation(document, relation));
    }
    Ok(())
}
