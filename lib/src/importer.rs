//! Drives a whole import: reads statements, materializes them in batches and
//! reports progress.

use crate::batch::BatchController;
use crate::cache::DedupCache;
use crate::config::ImportOptions;
use crate::errors::{ImportError, StoreError};
use crate::materialize::TripleMaterializer;
use crate::options::BatchSize;
use crate::reader::read_statements;
use crate::store::GraphStore;
use log::{error, info, warn};
use oxigraph::model::Triple;
use std::path::{Path, PathBuf};

/// Receives the running count of imported statements.
///
/// Counts are monotonically increasing within one input: `checkpoint` is
/// called after every commit that happens mid-stream and `finished` exactly
/// once after the final commit. `failed` replaces `finished` for an input of a
/// multi-file run that could not be imported.
pub trait ProgressSink {
    fn started(&mut self, _source: &Path) {}
    fn checkpoint(&mut self, imported: usize);
    fn finished(&mut self, imported: usize);
    fn failed(&mut self, _source: &Path, _error: &ImportError) {}
}

/// Discards progress.
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn checkpoint(&mut self, _imported: usize) {}
    fn finished(&mut self, _imported: usize) {}
}

/// Summary of one successful import run.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct ImportReport {
    /// Statements imported, one `rdf-triple` relation each.
    pub triples: usize,
    /// Nodes inserted (cache misses).
    pub nodes: usize,
    pub cache_hits: usize,
    /// `rdfs:subPropertyOf rdfs:member` relations added for `rdf:_n`.
    pub derived_triples: usize,
    pub commits: usize,
}

/// Outcome of importing one file as part of a multi-file run.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    pub result: Result<ImportReport, ImportError>,
}

impl FileOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Imports RDF statements into a [`GraphStore`] it owns.
pub struct Importer<S: GraphStore> {
    store: S,
    cache: DedupCache,
}

impl<S: GraphStore> Importer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            cache: DedupCache::new(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Imports `statements` in order, committing every `batch_size` of them.
    ///
    /// The dedup cache starts empty, so nodes already in the store are
    /// re-inserted (idempotently) and relations are added again. On the first
    /// error the open transaction is rolled back and the error returned; batches
    /// committed before it stay in the store.
    pub fn import_statements(
        &mut self,
        statements: &[Triple],
        batch_size: BatchSize,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportReport, ImportError> {
        self.cache.reset();
        let mut batches = BatchController::new(&self.store, batch_size);
        let mut triples = TripleMaterializer::new(&mut self.cache);
        batches.open()?;

        let mut imported = 0;
        let streamed = stream(
            statements,
            &mut batches,
            &mut triples,
            &mut imported,
            progress,
        )
        .and_then(|_| batches.finish());
        if let Err(e) = streamed {
            error!("Import stopped after {} statements: {}", imported, e);
            if let Err(abort) = batches.abort() {
                warn!("Failed to roll back transaction: {}", abort);
            }
            return Err(e);
        }
        progress.finished(imported);

        let stats = triples.stats();
        Ok(ImportReport {
            triples: imported,
            nodes: stats.nodes,
            cache_hits: stats.cache_hits,
            derived_triples: stats.derived_triples,
            commits: batches.commits(),
        })
    }

    /// Reads `path` and imports its statements. Nothing is written when the
    /// file cannot be read or parsed.
    pub fn import_file(
        &mut self,
        path: &Path,
        options: &ImportOptions,
        progress: &mut dyn ProgressSink,
    ) -> Result<ImportReport, ImportError> {
        progress.started(path);
        let statements = read_statements(path, options.format, &options.base_iri)?;
        info!("Importing {} statements from {:?}", statements.len(), path);
        let report = self.import_statements(&statements, options.batch_size, progress)?;
        info!(
            "Imported {:?}: {} triples, {} nodes, {} commits",
            path, report.triples, report.nodes, report.commits
        );
        Ok(report)
    }

    /// Imports each path in turn. A failing file is logged and recorded; the
    /// remaining files are still imported.
    pub fn import_files<P: AsRef<Path>>(
        &mut self,
        paths: &[P],
        options: &ImportOptions,
        progress: &mut dyn ProgressSink,
    ) -> Vec<FileOutcome> {
        paths
            .iter()
            .map(|path| {
                let path = path.as_ref();
                let result = self.import_file(path, options, progress);
                if let Err(e) = &result {
                    warn!("Skipping {:?}: {}", path, e);
                    progress.failed(path, e);
                }
                FileOutcome {
                    path: path.to_path_buf(),
                    result,
                }
            })
            .collect()
    }

    /// Releases the store session.
    pub fn close(&mut self) -> Result<(), StoreError> {
        if self.store.is_open() {
            self.store.close()?;
        }
        Ok(())
    }
}

impl<S: GraphStore> Drop for Importer<S> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close graph store: {}", e);
        }
    }
}

fn stream<S: GraphStore>(
    statements: &[Triple],
    batches: &mut BatchController<'_, S>,
    triples: &mut TripleMaterializer<'_>,
    imported: &mut usize,
    progress: &mut dyn ProgressSink,
) -> Result<(), ImportError> {
    for statement in statements {
        triples.materialize(statement, batches.transaction()?)?;
        *imported += 1;
        if batches.record_insertion()? {
            info!("Checkpoint: {} statements committed", imported);
            progress.checkpoint(*imported);
        }
    }
    Ok(())
}
