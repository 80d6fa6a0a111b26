//! Shared helper functions for CLI commands.

use anyhow::{anyhow, bail};
use console::style;

use annie::config::Settings;
use annie::models::{DocumentAnnotations, Entity, Relation};
use annie::repository::{SessionError, SessionStore};
use annie::services::Workspace;

/// Shorten a string for progress messages, on a character boundary.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Load the session named by the settings into a workspace.
pub fn load_workspace(settings: &Settings) -> anyhow::Result<Workspace> {
    let store = SessionStore::new(&settings.session_path);
    let loaded = match store.load() {
        Ok(loaded) => loaded,
        Err(SessionError::NotFound(path)) => bail!(
            "No session at {}; run `annie open <DIR>` first",
            path.display()
        ),
        Err(e) => return Err(e.into()),
    };
    for path in &loaded.missing_files {
        println!(
            "{} {} no longer exists; skipping it until it is restored",
            style("!").yellow(),
            path.display()
        );
    }
    Ok(Workspace::new(loaded.session))
}

pub fn save_workspace(settings: &Settings, workspace: &Workspace) -> anyhow::Result<()> {
    SessionStore::new(&settings.session_path).save(workspace.session())?;
    Ok(())
}

/// `#N` addresses the N-th instance (1-based) as listed by `show`.
pub fn parse_instance(selector: &str) -> Option<usize> {
    selector
        .strip_prefix('#')
        .and_then(|n| n.parse::<usize>().ok())
        .filter(|&n| n > 0)
        .map(|n| n - 1)
}

/// Instance index for a `#N` selector.
pub fn resolve_instance(document: &DocumentAnnotations, selector: &str) -> anyhow::Result<usize> {
    let index = parse_instance(selector)
        .ok_or_else(|| anyhow!("Expected an instance like #3, got {:?}", selector))?;
    if index >= document.entities.len() {
        bail!(
            "No instance {}; the document has {}",
            selector,
            document.entities.len()
        );
    }
    Ok(index)
}

/// Entity id for a `#N` selector or a unique id prefix.
pub fn resolve_entity(document: &DocumentAnnotations, selector: &str) -> anyhow::Result<String> {
    if selector.starts_with('#') {
        let index = resolve_instance(document, selector)?;
        return Ok(document.entities[index].id.clone());
    }
    let mut ids: Vec<&str> = document
        .entities
        .iter()
        .map(|e| e.id.as_str())
        .filter(|id| id.starts_with(selector))
        .collect();
    ids.sort_unstable();
    ids.dedup();
    match ids[..] {
        [id] => Ok(id.to_string()),
        [] => bail!("No entity matches {:?}", selector),
        _ => bail!("{:?} matches {} entities; use a longer id", selector, ids.len()),
    }
}

/// Relation id for a `#N` selector or a unique id prefix.
pub fn resolve_relation(document: &DocumentAnnotations, selector: &str) -> anyhow::Result<String> {
    if let Some(index) = parse_instance(selector) {
        return document
            .relations
            .get(index)
            .map(|r| r.id.clone())
            .ok_or_else(|| anyhow!("No relation {}", selector));
    }
    let ids: Vec<&str> = document
        .relations
        .iter()
        .map(|r| r.id.as_str())
        .filter(|id| id.starts_with(selector))
        .collect();
    match ids[..] {
        [id] => Ok(id.to_string()),
        [] => bail!("No relation matches {:?}", selector),
        _ => bail!("{:?} matches {} relations; use a longer id", selector, ids.len()),
    }
}

pub fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

pub fn describe_entity(entity: &Entity) -> String {
    format!(
        "{} {} [{}] {:?}",
        short_id(&entity.id),
        entity.span(),
        entity.tag,
        entity.text
    )
}

pub fn describe_relation(document: &DocumentAnnotations, relation: &Relation) -> String {
    let name = |id: &str| {
        document
            .resolve(id)
            .map(|e| format!("{:?}", e.text))
            .unwrap_or_else(|| format!("<{}>", short_id(id)))
    };
    format!(
        "{} {} {} → {}",
        short_id(&relation.id),
        relation.relation_type,
        name(&relation.head_id),
        name(&relation.tail_id)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use annie::models::Span;

    fn document() -> DocumentAnnotations {
        let mut document = DocumentAnnotations::default();
        let mut a = Entity::new(Span::on_line(1, 0, 5), "Alice", "Person");
        a.id = "aaaa1111".to_string();
        let mut b = Entity::new(Span::on_line(1, 10, 13), "Bob", "Person");
        b.id = "aaaa2222".to_string();
        document.insert_entity(a);
        document.insert_entity(b);
        document
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghijkl", 8), "abcde...");
        assert_eq!(truncate("ééééééé", 5), "éé...");
    }

    #[test]
    fn test_entity_selectors() {
        let doc = document();
        assert_eq!(parse_instance("#2"), Some(1));
        assert_eq!(parse_instance("#0"), None);
        assert_eq!(resolve_entity(&doc, "#1").unwrap(), "aaaa1111");
        assert_eq!(resolve_entity(&doc, "aaaa2").unwrap(), "aaaa2222");
        assert!(resolve_entity(&doc, "aaaa").is_err());
        assert!(resolve_entity(&doc, "zz").is_err());
        assert!(resolve_instance(&doc, "#3").is_err());
    }
}
