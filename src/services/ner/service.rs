//! NER orchestration: blocking inference per document, applied by the owner.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::models::{DocumentAnnotations, DocumentText, Entity, TagSchema};
use crate::services::annotation::{AnnotationError, Workspace};

use super::backend::{CommandNerBackend, NerBackend, NerConfig, Prediction};
use super::chunker::{merge_predictions, Chunker};
use super::NerError;

/// Events emitted while a NER run progresses.
/// Used by the CLI to drive progress bars and status messages.
#[derive(Debug, Clone)]
pub enum NerEvent {
    Started {
        total_documents: usize,
    },
    DocumentStarted {
        path: PathBuf,
    },
    DocumentCompleted {
        path: PathBuf,
        outcome: DocumentOutcome,
    },
    DocumentFailed {
        path: PathBuf,
        error: String,
    },
    Complete {
        succeeded: usize,
        failed: usize,
        added: usize,
    },
}

/// What happened to the predictions of one document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentOutcome {
    pub added: usize,
    /// Labels that map to no tag of the schema.
    pub unknown_labels: usize,
    /// Predictions rejected by the overlap policy or out of range.
    pub rejected: usize,
}

/// Totals of a NER run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NerReport {
    pub succeeded: usize,
    pub failed: usize,
    pub added: usize,
    pub unknown_labels: usize,
    pub rejected: usize,
}

struct InferenceDone {
    path: PathBuf,
    result: Result<Vec<Prediction>, NerError>,
}

/// Runs a backend over session documents.
pub struct NerService {
    backend: Arc<dyn NerBackend>,
    chunker: Chunker,
    label_map: BTreeMap<String, String>,
}

impl NerService {
    pub fn new(
        backend: Arc<dyn NerBackend>,
        chunker: Chunker,
        label_map: BTreeMap<String, String>,
    ) -> Self {
        Self {
            backend,
            chunker,
            label_map,
        }
    }

    /// Service around the configured command backend.
    pub fn from_config(config: &NerConfig) -> Result<Self, NerError> {
        let backend = CommandNerBackend::from_config(config).ok_or(NerError::NotConfigured)?;
        let chunker = Chunker::new(config.window_chars, config.overlap_chars)?;
        Ok(Self::new(
            Arc::new(backend),
            chunker,
            config.label_map.clone(),
        ))
    }

    pub fn backend_id(&self) -> &str {
        self.backend.backend_id()
    }

    pub fn is_available(&self) -> bool {
        self.backend.is_available()
    }

    pub fn availability_hint(&self) -> String {
        self.backend.availability_hint()
    }

    /// Pre-annotate the given files.
    ///
    /// Inference for each document runs on a blocking worker which posts its
    /// result back over a channel; only this task touches the workspace.
    /// Files that cannot be read or whose inference fails are reported and
    /// skipped.
    pub async fn run(
        &self,
        workspace: &mut Workspace,
        files: &[PathBuf],
        event_tx: mpsc::Sender<NerEvent>,
    ) -> Result<NerReport, NerError> {
        if !self.backend.is_available() {
            let _ = event_tx
                .send(NerEvent::Complete {
                    succeeded: 0,
                    failed: 0,
                    added: 0,
                })
                .await;
            return Err(NerError::Unavailable {
                backend: self.backend.backend_id().to_string(),
                hint: self.backend.availability_hint(),
            });
        }

        let _ = event_tx
            .send(NerEvent::Started {
                total_documents: files.len(),
            })
            .await;

        let mut report = NerReport::default();

        for path in files {
            let _ = event_tx
                .send(NerEvent::DocumentStarted { path: path.clone() })
                .await;

            let text = match workspace.text(path) {
                Ok(text) => text.as_str().to_string(),
                Err(e) => {
                    warn!("Skipping {} for NER: {}", path.display(), e);
                    report.failed += 1;
                    let _ = event_tx
                        .send(NerEvent::DocumentFailed {
                            path: path.clone(),
                            error: e.to_string(),
                        })
                        .await;
                    continue;
                }
            };

            // A worker that dies without posting drops its sender and closes the channel.
            let (done_tx, mut done_rx) = mpsc::channel::<InferenceDone>(1);
            let backend = Arc::clone(&self.backend);
            let chunker = self.chunker;
            let worker_path = path.clone();
            tokio::task::spawn_blocking(move || {
                let result = infer(backend.as_ref(), &chunker, &text);
                let _ = done_tx.blocking_send(InferenceDone {
                    path: worker_path,
                    result,
                });
            });

            let done = done_rx.recv().await.unwrap_or_else(|| InferenceDone {
                path: path.clone(),
                result: Err(NerError::Worker("worker exited without a result".to_string())),
            });

            match done.result {
                Ok(predictions) => match self.apply(workspace, &done.path, &predictions) {
                    Ok(outcome) => {
                        debug!(
                            "NER added {} entities to {}",
                            outcome.added,
                            done.path.display()
                        );
                        report.succeeded += 1;
                        report.added += outcome.added;
                        report.unknown_labels += outcome.unknown_labels;
                        report.rejected += outcome.rejected;
                        let _ = event_tx
                            .send(NerEvent::DocumentCompleted {
                                path: done.path,
                                outcome,
                            })
                            .await;
                    }
                    Err(e) => {
                        report.failed += 1;
                        let _ = event_tx
                            .send(NerEvent::DocumentFailed {
                                path: done.path,
                                error: e.to_string(),
                            })
                            .await;
                    }
                },
                Err(e) => {
                    warn!("NER failed for {}: {}", done.path.display(), e);
                    report.failed += 1;
                    let _ = event_tx
                        .send(NerEvent::DocumentFailed {
                            path: done.path,
                            error: e.to_string(),
                        })
                        .await;
                }
            }
        }

        info!(
            "NER finished: {} documents, {} failed, {} entities added",
            report.succeeded, report.failed, report.added
        );
        let _ = event_tx
            .send(NerEvent::Complete {
                succeeded: report.succeeded,
                failed: report.failed,
                added: report.added,
            })
            .await;
        Ok(report)
    }

    fn apply(
        &self,
        workspace: &mut Workspace,
        path: &Path,
        predictions: &[Prediction],
    ) -> Result<DocumentOutcome, AnnotationError> {
        let allow_overlap = workspace.session().flags.allow_overlap;
        let (text, document, schema) = workspace.document_parts(path)?;
        Ok(apply_predictions(
            text,
            document,
            schema,
            predictions,
            &self.label_map,
            allow_overlap,
        ))
    }
}

/// Chunk a text, predict every window and merge the results.
pub fn infer(
    backend: &dyn NerBackend,
    chunker: &Chunker,
    text: &str,
) -> Result<Vec<Prediction>, NerError> {
    let mut windows = Vec::new();
    for chunk in chunker.chunks(text) {
        let predictions = backend.predict(&chunk.text)?;
        windows.push((chunk, predictions));
    }
    Ok(merge_predictions(&windows, chunker.overlap()))
}

fn apply_predictions(
    text: &DocumentText,
    document: &mut DocumentAnnotations,
    schema: &TagSchema,
    predictions: &[Prediction],
    label_map: &BTreeMap<String, String>,
    allow_overlap: bool,
) -> DocumentOutcome {
    let mut outcome = DocumentOutcome::default();
    for prediction in predictions {
        let tag = label_map
            .get(&prediction.label)
            .unwrap_or(&prediction.label);
        if !schema.has_tag(tag) {
            outcome.unknown_labels += 1;
            continue;
        }
        let Some(span) = text.span_from_offsets(prediction.start, prediction.end) else {
            outcome.rejected += 1;
            continue;
        };
        let Some(covered) = text.slice(&span) else {
            outcome.rejected += 1;
            continue;
        };
        if covered.trim().is_empty() || document.admit(&span, tag, allow_overlap).is_err() {
            outcome.rejected += 1;
            continue;
        }
        document.insert_entity(Entity::new(span, covered, tag.as_str()).propagated());
        outcome.added += 1;
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Session, SessionFlags, Span};

    /// Labels every occurrence of one word.
    struct WordBackend(&'static str, &'static str);

    impl NerBackend for WordBackend {
        fn backend_id(&self) -> &str {
            "word"
        }

        fn is_available(&self) -> bool {
            true
        }

        fn availability_hint(&self) -> String {
            String::new()
        }

        fn predict(&self, text: &str) -> Result<Vec<Prediction>, NerError> {
            Ok(DocumentText::new(text)
                .find_all(self.0)
                .into_iter()
                .map(|(start, end)| Prediction::new(start, end, self.1))
                .collect())
        }
    }

    #[test]
    fn test_apply_maps_labels_and_skips_unknown() {
        let text = DocumentText::new("Alice works at Acme.\nBob too.");
        let mut document = DocumentAnnotations::default();
        let label_map = BTreeMap::from([
            ("PER".to_string(), "Person".to_string()),
            ("ORG".to_string(), "Organization".to_string()),
        ]);
        let predictions = vec![
            Prediction::new(0, 5, "PER"),
            Prediction::new(15, 19, "ORG"),
            Prediction::new(21, 24, "PER"),
            Prediction::new(6, 11, "MISC"),
            Prediction::new(0, 3, "PER"),
            Prediction::new(40, 44, "PER"),
        ];
        let outcome = apply_predictions(
            &text,
            &mut document,
            &TagSchema::default(),
            &predictions,
            &label_map,
            false,
        );
        assert_eq!(outcome.added, 3);
        assert_eq!(outcome.unknown_labels, 1);
        assert_eq!(outcome.rejected, 2);
        assert!(document.entities.iter().all(|e| e.propagated));
        assert_eq!(document.entities[2].span(), Span::on_line(2, 0, 3));
        assert_eq!(document.entities[2].text, "Bob");
    }

    #[test]
    fn test_infer_translates_offsets() {
        let backend = WordBackend("Bob", "PER");
        let chunker = Chunker::new(6, 3).unwrap();
        // Windows: "Bob me", " met B", "t Bob"
        let merged = infer(&backend, &chunker, "Bob met Bob").unwrap();
        assert_eq!(
            merged,
            vec![Prediction::new(0, 3, "PER"), Prediction::new(8, 11, "PER")]
        );
    }

    #[tokio::test]
    async fn test_run_reports_unavailable_backend() {
        struct Offline;
        impl NerBackend for Offline {
            fn backend_id(&self) -> &str {
                "offline"
            }
            fn is_available(&self) -> bool {
                false
            }
            fn availability_hint(&self) -> String {
                "start it".to_string()
            }
            fn predict(&self, _text: &str) -> Result<Vec<Prediction>, NerError> {
                Ok(Vec::new())
            }
        }

        let service = NerService::new(
            Arc::new(Offline),
            Chunker::new(10, 2).unwrap(),
            BTreeMap::new(),
        );
        let mut workspace = Workspace::new(Session::new(
            Vec::new(),
            TagSchema::default(),
            SessionFlags::default(),
        ));
        let (tx, _rx) = mpsc::channel(10);
        let err = service.run(&mut workspace, &[], tx).await.unwrap_err();
        assert!(matches!(err, NerError::Unavailable { .. }));
    }
}
