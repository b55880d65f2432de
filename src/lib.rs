//! # Corpus Sync
//!
//! A local-first corpus ingestion and retrieval engine.
//!
//! Corpus Sync pulls documentation out of heterogeneous sources (GitHub
//! repositories, design-tool projects, websites, file and API uploads),
//! keeps the indexed copy fresh with checksum-based incremental sync, and
//! answers full-text queries with keyword-in-context snippets grouped per
//! file.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌───────────┐
//! │   Adapters   │──▶│   Pipeline   │──▶│  SQLite   │
//! │ git/web/...  │   │ filter+diff  │   │   FTS5    │
//! └──────────────┘   └──────┬───────┘   └─────┬─────┘
//!                           │                 │
//!                    ┌──────▼──────┐   ┌──────▼──────┐
//!                    │ SyncContext │   │   Search    │
//!                    │ state+cancel│   │ group+KWIC  │
//!                    └─────────────┘   └─────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`adapter`] | Source adapter contract and dispatch |
//! | [`pipeline`] | Bounded-concurrency incremental sync |
//! | [`crawler`] | Website sitemap and link-discovery crawl |
//! | [`orchestrator`] | Multi-source sync runs |
//! | [`state`] | Training state, observation, cancellation |
//! | [`search`] | Full-text retrieval with grouping and snippets |
//! | [`sqlite_store`] | SQLite-backed store and local processor |

pub mod adapter;
pub mod adapter_design;
pub mod adapter_github;
pub mod adapter_upload;
pub mod checksum;
pub mod chunk;
pub mod config;
pub mod crawler;
pub mod db;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod migrate;
pub mod models;
pub mod orchestrator;
pub mod pipeline;
pub mod processor;
pub mod search;
pub mod snippet;
pub mod sqlite_store;
pub mod state;
pub mod store;
