//! Sliding character windows over long documents, and merging of the
//! predictions made on them.
//!
//! With `window = 5` and `overlap = 2` the text `ABCDEFGHIJ` becomes
//! `ABCDE`, `DEFGH`, `GHIJ`: the stride between windows is
//! `window - overlap`, so an entity near a cut appears whole in at least one
//! window as long as it is no longer than the overlap.

use std::collections::HashSet;

use super::backend::Prediction;
use super::NerError;

/// One window of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Character offset of the window in the document.
    pub offset: usize,
    pub text: String,
    /// Character length of `text`.
    pub len: usize,
    /// The window starts inside a word.
    pub split_start: bool,
    /// The window ends inside a word.
    pub split_end: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    window: usize,
    overlap: usize,
}

impl Chunker {
    /// Fails unless `0 < window` and `overlap < window`.
    pub fn new(window: usize, overlap: usize) -> Result<Self, NerError> {
        if window == 0 || overlap >= window {
            return Err(NerError::InvalidWindow { window, overlap });
        }
        Ok(Self { window, overlap })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into overlapping character windows.
    pub fn chunks(&self, text: &str) -> Vec<Chunk> {
        let chars: Vec<char> = text.chars().collect();
        if chars.is_empty() {
            return Vec::new();
        }

        let inside_word = |at: usize| {
            at > 0
                && at < chars.len()
                && chars[at - 1].is_alphanumeric()
                && chars[at].is_alphanumeric()
        };

        let stride = self.window - self.overlap;
        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.window).min(chars.len());
            chunks.push(Chunk {
                offset: start,
                text: chars[start..end].iter().collect(),
                len: end - start,
                split_start: inside_word(start),
                split_end: inside_word(end),
            });
            if end == chars.len() {
                break;
            }
            start += stride;
        }
        chunks
    }
}

/// Translate per-window predictions to document offsets and de-duplicate them.
///
/// Windows are visited in order and the first occurrence wins: a prediction
/// intersecting one accepted from an earlier window is dropped. When windows
/// overlap, predictions touching a cut that falls inside a word are dropped as
/// well; the neighbouring window sees that word whole. Out-of-range or empty
/// predictions are dropped.
pub fn merge_predictions(windows: &[(Chunk, Vec<Prediction>)], overlap: usize) -> Vec<Prediction> {
    let mut accepted: Vec<(usize, Prediction)> = Vec::new();
    let mut seen = HashSet::new();

    for (index, (chunk, predictions)) in windows.iter().enumerate() {
        let mut predictions = predictions.clone();
        predictions.sort_by_key(|p| (p.start, p.end));

        for prediction in predictions {
            if prediction.start >= prediction.end || prediction.end > chunk.len {
                continue;
            }
            if overlap > 0 {
                let cut_at_start = chunk.split_start && prediction.start == 0;
                let cut_at_end = chunk.split_end && prediction.end == chunk.len;
                if cut_at_start || cut_at_end {
                    continue;
                }
            }

            let absolute = Prediction::new(
                chunk.offset + prediction.start,
                chunk.offset + prediction.end,
                prediction.label,
            );
            if !seen.insert((absolute.start, absolute.end)) {
                continue;
            }
            let clashes = accepted
                .iter()
                .any(|(from, p)| *from < index && p.overlaps(&absolute));
            if clashes {
                continue;
            }
            accepted.push((index, absolute));
        }
    }

    let mut merged: Vec<Prediction> = accepted.into_iter().map(|(_, p)| p).collect();
    merged.sort_by_key(|p| (p.start, p.end));
    merged
}
