//! NER runs against a stub backend.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;

use annie::models::{Session, SessionFlags, TagSchema};
use annie::services::ner::Chunker;
use annie::services::{NerBackend, NerError, NerEvent, NerService, Prediction, Workspace};

/// Tags capitalized words from a fixed list; fails on texts containing "FAIL".
struct StubBackend {
    names: Vec<(&'static str, &'static str)>,
}

impl NerBackend for StubBackend {
    fn backend_id(&self) -> &str {
        "stub"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        String::new()
    }

    fn predict(&self, text: &str) -> Result<Vec<Prediction>, NerError> {
        if text.contains("FAIL") {
            return Err(NerError::CommandFailed("stub refused".to_string()));
        }
        let chars: Vec<char> = text.chars().collect();
        let mut predictions = Vec::new();
        for (name, label) in &self.names {
            let needle: Vec<char> = name.chars().collect();
            if needle.len() > chars.len() {
                continue;
            }
            for start in 0..=chars.len() - needle.len() {
                if chars[start..start + needle.len()] == needle[..] {
                    predictions.push(Prediction::new(start, start + needle.len(), *label));
                }
            }
        }
        Ok(predictions)
    }
}

fn corpus(dir: &Path) -> Workspace {
    std::fs::write(
        dir.join("a.txt"),
        "Ada Lovelace met Charles Babbage in London.\nLondon was foggy.",
    )
    .unwrap();
    std::fs::write(dir.join("b.txt"), "This one will FAIL.").unwrap();
    std::fs::write(dir.join("c.txt"), "Babbage built engines.").unwrap();
    let session =
        Session::open_directory(dir, TagSchema::default(), SessionFlags::default()).unwrap();
    Workspace::new(session)
}

fn service(window: usize, overlap: usize) -> NerService {
    let backend = StubBackend {
        names: vec![
            ("Ada Lovelace", "PER"),
            ("Charles Babbage", "PER"),
            ("Babbage", "PER"),
            ("London", "LOC"),
            ("engines", "MISC"),
        ],
    };
    let label_map = BTreeMap::from([
        ("PER".to_string(), "Person".to_string()),
        ("LOC".to_string(), "Location".to_string()),
    ]);
    NerService::new(
        Arc::new(backend),
        Chunker::new(window, overlap).unwrap(),
        label_map,
    )
}

async fn collect(mut rx: mpsc::Receiver<NerEvent>) -> Vec<NerEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_run_adds_propagated_entities_and_reports_failures() {
    let dir = tempfile::tempdir().unwrap();
    let mut ws = corpus(dir.path());
    let files: Vec<PathBuf> = ws.session().files.clone();
    let (tx, rx) = mpsc::channel(100);
    let collector = tokio::spawn(collect(rx));

    let report = service(2000, 200).run(&mut ws, &files, tx).await.unwrap();
    let events = collector.await.unwrap();

    assert_eq!(report.succeeded, 2);
    assert_eq!(report.failed, 1);
    // "Charles Babbage" wins over the "Babbage" inside it
    assert_eq!(report.added, 5);
    assert_eq!(report.unknown_labels, 1);
    assert_eq!(report.rejected, 1);

    let a = ws.session().document(&dir.path().join("a.txt")).unwrap();
    let texts: Vec<(&str, &str)> = a
        .entities
        .iter()
        .map(|e| (e.text.as_str(), e.tag.as_str()))
        .collect();
    assert_eq!(
        texts,
        vec![
            ("Ada Lovelace", "Person"),
            ("Charles Babbage", "Person"),
            ("London", "Location"),
            ("London", "Location"),
        ]
    );
    assert!(a.entities.iter().all(|e| e.propagated));
    assert_eq!(a.entities[3].start_line, 2);

    assert!(matches!(events.first(), Some(NerEvent::Started { total_documents: 3 })));
    assert!(events
        .iter()
        .any(|e| matches!(e, NerEvent::DocumentFailed { path, .. } if path.ends_with("b.txt"))));
    assert!(matches!(
        events.last(),
        Some(NerEvent::Complete {
            succeeded: 2,
            failed: 1,
            added: 5
        })
    ));
}

#[tokio::test]
async fn test_small_windows_match_whole_text_results() {
    let dir = tempfile::tempdir().unwrap();
    let mut whole = corpus(dir.path());
    let files = vec![dir.path().join("a.txt")];

    let (tx, _rx) = mpsc::channel(100);
    service(2000, 200).run(&mut whole, &files, tx).await.unwrap();

    let mut windowed = Workspace::new(whole.session().clone());
    windowed.session_mut().annotations.clear();
    let (tx, _rx) = mpsc::channel(100);
    service(24, 16).run(&mut windowed, &files, tx).await.unwrap();

    let spans = |ws: &Workspace| -> Vec<String> {
        ws.session()
            .document(&files[0])
            .unwrap()
            .entities
            .iter()
            .map(|e| format!("{} {}", e.span(), e.tag))
            .collect()
    };
    assert_eq!(spans(&windowed), spans(&whole));
}

#[test]
fn test_unconfigured_and_invalid_windows() {
    let config = annie::services::NerConfig::default();
    assert!(matches!(
        NerService::from_config(&config),
        Err(NerError::NotConfigured)
    ));
    assert!(matches!(
        Chunker::new(100, 100),
        Err(NerError::InvalidWindow { .. })
    ));
}
