//! Bulk loader that grafts RDF statements onto a typed graph store.
//!
//! Every RDF term becomes a node (`rdf-IRI`, `rdf-blank-node` or `rdf-literal`)
//! and every statement an `rdf-triple` relation between its subject, predicate
//! and object nodes. Inserts are batched into transactions of configurable size.
//!
//! ```no_run
//! use rdfgraft::config::ImportOptions;
//! use rdfgraft::importer::{Importer, NoProgress};
//! use rdfgraft::store::LocalStore;
//! use std::path::Path;
//!
//! let store = LocalStore::open(Path::new("graph")).unwrap();
//! let mut importer = Importer::new(store);
//! let report = importer
//!     .import_file(Path::new("data.ttl"), &ImportOptions::default(), &mut NoProgress)
//!     .unwrap();
//! println!("{} triples", report.triples);
//! ```

extern crate derive_builder;

pub mod batch;
pub mod cache;
pub mod classify;
pub mod config;
pub mod consts;
pub mod errors;
pub mod importer;
pub mod materialize;
pub mod options;
pub mod query;
pub mod reader;
pub mod store;

pub use config::ImportOptions;
pub use errors::{ImportError, StoreError};
pub use importer::{ImportReport, Importer, ProgressSink};
pub use options::{BatchSize, InputFormat};

/// Base IRI for relative IRIs when none is configured.
pub const DEFAULT_BASE_IRI: &str = "http://example.org/rdfgraft/#";

/// One parsed RDF statement.
pub type Statement = oxigraph::model::Triple;

/// Lets `RDFGRAFT_LOG` override `RUST_LOG`. The logger itself
/// (e.g. `env_logger::try_init()`) must be initialized afterwards.
pub fn init_logging() {
    if let Ok(log_level) = std::env::var("RDFGRAFT_LOG") {
        std::env::set_var("RUST_LOG", log_level);
    }
}
