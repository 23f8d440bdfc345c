//! Shared data model for the quiver workspace.
//!
//! This crate holds everything the protocol adapters and the facade crate
//! have in common: the [`QueryRunner`] seam, the tabular [`DataTable`]
//! result, connection and credential types, and the [`QuiverError`] enum.
//! It deliberately depends on no protocol crate so that adapters can be
//! swapped or mocked without touching the core types.

pub mod auth;
pub mod error;
pub mod loader;
pub mod runner;
pub mod table;
pub mod types;

pub use auth::ArrowAuthenticator;
pub use error::{QuiverError, Result};
pub use loader::BulkLoader;
pub use runner::{CallKind, Params, ProcedureCall, QueryRunner};
pub use table::DataTable;
pub use types::{AuthPair, ConnectionInfo, Credentials, ResolvedTarget, split_host_port};
