//! # Edda
//!
//! Scan relational data sources into a profiled, quality-scored data
//! dictionary.
//!
//! Edda connects to a configured database, extracts its catalog, samples
//! every table, profiles the sampled columns, scores table quality and
//! generates per-table documentation. Everything is persisted per scan
//! run in a local SQLite store and read back by the CLI and a
//! deterministic question matcher.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────┐   ┌──────────┐
//! │ Connectors  │──▶│  Scan pipeline        │──▶│  SQLite   │
//! │ Postgres    │   │ Schema+Profile+Docs   │   │  store    │
//! └─────────────┘   └──────────────────────┘   └────┬─────┘
//!                                                   │
//!                                 ┌─────────────────┤
//!                                 ▼                 ▼
//!                            ┌──────────┐     ┌──────────┐
//!                            │ Catalog  │     │   Ask    │
//!                            │  reads   │     │ matcher  │
//!                            └──────────┘     └──────────┘
//! ```
//!
//! The pipeline itself lives in [`edda_core`]; this crate supplies the
//! SQLite store, the engine connectors and the CLI around it.
//!
//! ## Quick Start
//!
//! ```bash
//! edda init                         # create the metadata store
//! edda datasource test shop         # check connectivity
//! edda scan shop                    # run a scan
//! edda tables 1                     # list tables of run 1
//! edda ask 1 "how do I join orders to payments?"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`logging`] | Tracing subscriber setup |
//! | [`db`] | SQLite pool for the metadata store |
//! | [`migrate`] | Store schema |
//! | [`sqlite_store`] | SQLite implementation of the store |
//! | [`connector_postgres`] | PostgreSQL connector |
//! | [`connector_stub`] | Placeholder for engines without a connector |
//! | [`registry`] | Engine → connector factory |
//! | [`progress`] | Scan progress on stderr |
//! | [`datasources`] | Data source registration and checks |
//! | [`scan_cmd`] | `edda scan` |
//! | [`catalog_cmd`] | Read commands |
//! | [`export`] | Document export |
//! | [`ask_cmd`] | `edda ask` |

pub mod ask_cmd;
pub mod catalog_cmd;
pub mod config;
pub mod connector_postgres;
pub mod connector_stub;
pub mod datasources;
pub mod db;
pub mod export;
pub mod logging;
pub mod migrate;
pub mod progress;
pub mod registry;
pub mod scan_cmd;
pub mod sqlite_store;
