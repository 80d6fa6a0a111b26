//! annie - annotation engine for named-entity spans and relations.
//!
//! Tracks entity spans and directed relations over a directory of plain-text
//! documents, keeps entity identity stable under merge, demerge, relabel and
//! propagation, and reads and writes sessions, annotation exports, JSONL and
//! CoNLL corpora.

pub mod config;
pub mod formats;
pub mod models;
pub mod repository;
pub mod services;
