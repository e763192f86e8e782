//! # Edda Core
//!
//! Shared logic for Edda's scan pipeline: data models, the connector
//! and store abstractions, schema snapshots and fingerprints, profiling,
//! quality scoring, documentation generation, scan orchestration, read
//! accessors and the question matcher.
//!
//! This crate contains no database drivers, filesystem I/O or terminal
//! output. Engines and the SQLite store live in the `edda` crate.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`models`] | Data sources, scan runs, per-run catalog records |
//! | [`error`] | [`ScanError`](error::ScanError) taxonomy |
//! | [`connector`] | [`Connector`](connector::Connector) capability and raw catalog types |
//! | [`schema`] | Canonical snapshot and structural fingerprint |
//! | [`profile`] | Column/table statistics and the PII heuristic |
//! | [`quality`] | Rule-based 0–100 quality score |
//! | [`docs`] | Per-table document and markdown rendering |
//! | [`store`] | [`Store`](store::Store) trait and in-memory backend |
//! | [`scan`] | Run state machine |
//! | [`catalog`] | Read accessors and export |
//! | [`ask`] | Substring question matcher |
//! | [`progress`] | Scan progress events |

pub mod ask;
pub mod catalog;
pub mod connector;
pub mod docs;
pub mod error;
pub mod models;
pub mod profile;
pub mod progress;
pub mod quality;
pub mod scan;
pub mod schema;
pub mod store;

#[cfg(test)]
mod testing;
