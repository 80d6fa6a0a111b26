//! Export a session, import it back and compare entities.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use annie::formats::{build_session, conll, jsonl, UnknownTagPolicy};
use annie::models::{Session, SessionFlags, Span, TagSchema};
use annie::services::Workspace;

type EntitySet = BTreeSet<(usize, usize, String)>;

fn entity_sets(workspace: &mut Workspace) -> Vec<EntitySet> {
    let files: Vec<PathBuf> = workspace.session().files.clone();
    let mut sets = Vec::new();
    for path in &files {
        let entities = match workspace.session().document(path) {
            Some(doc) if !doc.entities.is_empty() => doc.entities.clone(),
            _ => continue,
        };
        let text = workspace.text(path).unwrap().clone();
        sets.push(
            entities
                .iter()
                .map(|e| {
                    let (start, end) = text.offsets(&e.span()).unwrap();
                    (start, end, e.tag.clone())
                })
                .collect(),
        );
    }
    sets
}

fn annotated_corpus(dir: &Path) -> Workspace {
    let docs = dir.join("docs");
    std::fs::create_dir(&docs).unwrap();
    std::fs::write(
        docs.join("a.txt"),
        "Marie Curie worked in Paris.\nShe was born in Warsaw in 1867.",
    )
    .unwrap();
    std::fs::write(docs.join("b.txt"), "No entities in this one.").unwrap();
    std::fs::write(docs.join("c.txt"), "Émile Zola and Ünal met at Acme Corp.").unwrap();

    let session =
        Session::open_directory(&docs, TagSchema::default(), SessionFlags::default()).unwrap();
    let mut ws = Workspace::new(session);
    let a = docs.join("a.txt");
    let c = docs.join("c.txt");
    ws.add_entity(&a, Span::on_line(1, 0, 11), "Person").unwrap();
    ws.add_entity(&a, Span::on_line(1, 22, 27), "Location").unwrap();
    ws.add_entity(&a, Span::on_line(2, 16, 22), "Location").unwrap();
    ws.add_entity(&a, Span::on_line(2, 26, 30), "Date").unwrap();
    ws.add_entity(&c, Span::on_line(1, 0, 10), "Person").unwrap();
    ws.add_entity(&c, Span::on_line(1, 15, 19), "Person").unwrap();
    ws.add_entity(&c, Span::on_line(1, 27, 36), "Organization").unwrap();
    ws
}

#[test]
fn test_jsonl_export_import_preserves_entities() {
    let dir = tempfile::tempdir().unwrap();
    let mut original = annotated_corpus(dir.path());
    let expected = entity_sets(&mut original);
    assert_eq!(expected.len(), 2);

    let mut exported = Vec::new();
    let report = jsonl::export(&mut original, &mut exported).unwrap();
    assert_eq!(report.documents, 2);
    assert_eq!(report.entities, 7);

    let parsed = jsonl::parse(&String::from_utf8(exported).unwrap());
    assert_eq!(parsed.malformed, 0);
    let (session, import) = build_session(
        parsed,
        &dir.path().join("imported"),
        TagSchema::default(),
        SessionFlags::default(),
        UnknownTagPolicy::Skip,
    )
    .unwrap();
    assert_eq!(import.documents, 2);
    assert_eq!(import.entities, 7);
    assert_eq!(import.rejected, 0);

    let mut imported = Workspace::new(session);
    assert_eq!(entity_sets(&mut imported), expected);
}

#[test]
fn test_jsonl_round_trip_keeps_overlapping_entities() {
    let dir = tempfile::tempdir().unwrap();
    let docs = dir.path().join("docs");
    std::fs::create_dir(&docs).unwrap();
    std::fs::write(docs.join("a.txt"), "Acme Corp hired Alice.").unwrap();
    let flags = SessionFlags {
        allow_overlap: true,
        ..Default::default()
    };
    let session = Session::open_directory(&docs, TagSchema::default(), flags).unwrap();
    let mut original = Workspace::new(session);
    let a = docs.join("a.txt");
    original.add_entity(&a, Span::on_line(1, 0, 9), "Organization").unwrap();
    original.add_entity(&a, Span::on_line(1, 0, 4), "Other").unwrap();
    let expected = entity_sets(&mut original);

    let mut exported = Vec::new();
    let report = jsonl::export(&mut original, &mut exported).unwrap();
    assert_eq!(report.entities, 2);

    let parsed = jsonl::parse(&String::from_utf8(exported).unwrap());
    let (session, import) = build_session(
        parsed,
        &dir.path().join("imported"),
        TagSchema::default(),
        SessionFlags::default(),
        UnknownTagPolicy::Skip,
    )
    .unwrap();
    assert_eq!(import.entities, 2);
    assert_eq!(import.rejected, 0);
    assert_eq!(import.overlapping, 1);
    assert!(session.flags.allow_overlap);

    let mut imported = Workspace::new(session);
    assert_eq!(entity_sets(&mut imported), expected);
}

#[test]
fn test_conll_export_import_keeps_labels_and_tokens() {
    let dir = tempfile::tempdir().unwrap();
    let mut original = annotated_corpus(dir.path());

    let mut exported = Vec::new();
    let report = conll::export(&mut original, &mut exported).unwrap();
    assert_eq!(report.documents, 2);
    assert_eq!(report.dropped_overlaps, 0);
    let content = String::from_utf8(exported).unwrap();
    assert!(content.starts_with("-DOCSTART- O\n\nMarie B-Person\nCurie I-Person\n"));
    assert!(content.contains("Acme B-Organization\nCorp I-Organization\n. O\n"));

    let parsed = conll::parse(&content);
    assert_eq!(parsed.documents.len(), 2);
    let (session, import) = build_session(
        parsed,
        &dir.path().join("imported"),
        TagSchema::default(),
        SessionFlags::default(),
        UnknownTagPolicy::Add,
    )
    .unwrap();
    assert!(import.tags_added.is_empty());
    assert_eq!(import.entities, 7);

    let mut imported = Workspace::new(session);
    let first = imported.session().files[0].clone();
    let text = imported.text(&first).unwrap().as_str().to_string();
    assert_eq!(
        text,
        "Marie Curie worked in Paris .\nShe was born in Warsaw in 1867 ."
    );
    let tags: Vec<String> = imported
        .session()
        .document(&first)
        .unwrap()
        .entities
        .iter()
        .map(|e| format!("{}={}", e.text, e.tag))
        .collect();
    assert_eq!(
        tags,
        vec![
            "Marie Curie=Person",
            "Paris=Location",
            "Warsaw=Location",
            "1867=Date"
        ]
    );
}

#[test]
fn test_import_unknown_labels() {
    let content = r#"{"text": "Widget by Acme", "ents": [{"start": 0, "end": 6, "label": "Product"}, {"start": 10, "end": 14, "label": "Organization"}]}"#;
    let dir = tempfile::tempdir().unwrap();

    let (session, report) = build_session(
        jsonl::parse(content),
        &dir.path().join("add"),
        TagSchema::default(),
        SessionFlags::default(),
        UnknownTagPolicy::Add,
    )
    .unwrap();
    assert_eq!(report.entities, 2);
    assert!(session.schema.has_tag("Product"));
    assert!(session.schema.tag_colors.contains_key("Product"));

    let (session, report) = build_session(
        jsonl::parse(content),
        &dir.path().join("skip"),
        TagSchema::default(),
        SessionFlags::default(),
        UnknownTagPolicy::Skip,
    )
    .unwrap();
    assert_eq!(report.entities, 1);
    assert_eq!(report.unknown_dropped, 1);
    assert_eq!(session.entity_count(), 1);
}
