//! Tag schema and session flag commands.

use console::style;

use annie::config::Settings;
use annie::models::SchemaKind;

use super::SchemaCommands;
use crate::cli::helpers::{load_workspace, save_workspace};

pub fn cmd_schema(
    settings: &Settings,
    kind: SchemaKind,
    command: SchemaCommands,
) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    match command {
        SchemaCommands::List => {
            let schema = &mut workspace.session_mut().schema;
            let names = schema.list(kind).to_vec();
            for name in names {
                match kind {
                    SchemaKind::EntityTag => {
                        println!("{:<20} {}", name, schema.color_for(&name))
                    }
                    SchemaKind::RelationType => println!("{}", name),
                }
            }
            return Ok(());
        }
        SchemaCommands::Add { name } => {
            workspace.session_mut().schema.add(kind, &name)?;
            println!("{} Added {} {}", style("✓").green(), kind.label(), name.trim());
        }
        SchemaCommands::Remove { name } => {
            workspace.session_mut().schema.remove(kind, &name)?;
            println!("{} Removed {} {}", style("✓").green(), kind.label(), name);
            println!("  Existing annotations using it are kept");
        }
    }
    save_workspace(settings, &workspace)
}

pub fn cmd_flags(
    settings: &Settings,
    extend_to_word: Option<bool>,
    allow_overlap: Option<bool>,
) -> anyhow::Result<()> {
    let mut workspace = load_workspace(settings)?;
    let flags = &mut workspace.session_mut().flags;
    let changed = extend_to_word.is_some() || allow_overlap.is_some();
    if let Some(value) = extend_to_word {
        flags.extend_to_word = value;
    }
    if let Some(value) = allow_overlap {
        flags.allow_overlap = value;
    }
    let flags = *flags;

    println!("extend_to_word = {}", flags.extend_to_word);
    println!("allow_overlap  = {}", flags.allow_overlap);
    if changed {
        save_workspace(settings, &workspace)?;
        println!("{} Flags updated", style("✓").green());
    }
    Ok(())
}
