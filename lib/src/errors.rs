//! Error types raised while reading RDF input and grafting it onto a graph store.

use oxigraph::io::RdfParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Failures reported by a [`crate::store::GraphStore`] implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to (de)serialize store journal: {0}")]
    Journal(#[from] serde_json::Error),
    #[error("could not acquire exclusive lock on {path:?}: {source}")]
    Locked {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("store has been closed")]
    Closed,
    #[error("transaction is no longer open")]
    TransactionClosed,
    #[error("schema violation: {0}")]
    Schema(String),
    #[error("store state lock was poisoned")]
    Poisoned,
}

/// Errors that abort the import of a single input file.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("cannot access input {path:?}: {source}")]
    InputAccess {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: RdfParseError,
    },
    #[error("{value} not inserted ({inserted} records created)")]
    Materialization { value: String, inserted: usize },
    #[error("{inserted} rdf-triple were inserted for ({subject}, {predicate}, {object})")]
    TripleInsertion {
        subject: String,
        predicate: String,
        object: String,
        inserted: usize,
    },
    #[error("invalid configuration: {0}")]
    Configuration(String),
    #[error("unsupported RDF term: {0}")]
    UnsupportedTerm(String),
    #[error("batch controller misuse: {0}")]
    InvalidState(&'static str),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ImportError {
    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        ImportError::Configuration(msg.into())
    }

    /// True for errors raised before any transaction was opened; the caller can
    /// skip the input and carry on with the next one.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            ImportError::InputAccess { .. } | ImportError::Parse { .. }
        )
    }
}
