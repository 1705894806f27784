//! # Docvault
//!
//! A command-line client for the docvault document service: file uploads,
//! metadata edits with version history, rollback, semantic/RAG search, and
//! bulk operations.
//!
//! The engine is a [`session::DocumentSession`]: it owns the client's view
//! of the remote library (the document cache, selection set, drafts, and
//! version view) and coordinates every mutation so the cache is reloaded
//! exactly once per logical operation. The remote service is reached
//! through the [`Store`](docvault_core::store::Store) contract — over HTTP
//! in production, in memory in tests.
//!
//! ## Quick Start
//!
//! ```bash
//! dv list                                  # the document library
//! dv upload report.pdf --tags work,q3      # create a document
//! dv edit 7 --description "Q3 numbers"     # metadata edit (new version)
//! dv versions 7                            # snapshot history
//! dv rollback 7 12                         # restore snapshot id 12
//! dv search "quarterly revenue"            # ranked per-document results
//! dv ask "what were Q3 revenues?"          # RAG answer with sources
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`session`] | Mutation coordination, versions, selection, cache |
//! | [`cache`] | Wholesale-replaced document list snapshot |
//! | [`http_store`] | HTTP implementation of the store contract |
//! | [`confirm`] | Async yes/no gate for destructive operations |
//! | [`error`] | Engine error taxonomy |
//! | [`stats`] | Library summary for `dv stats` |
//! | [`commands`] | CLI command runners and printers |

pub mod cache;
pub mod commands;
pub mod config;
pub mod confirm;
pub mod error;
pub mod http_store;
pub mod session;
pub mod stats;
