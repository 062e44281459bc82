use crate::errors::ImportError;
use crate::options::BatchSize;
use crate::store::{GraphStore, Transaction};
use log::{debug, warn};

/// Commits a write transaction every `batch_size` insertions and opens a fresh
/// one, so a long import never holds an unbounded amount of staged writes.
///
/// The controller moves between *closed* (no transaction) and *open*. Checkpoints
/// only happen inside [`BatchController::record_insertion`], which callers invoke
/// between statements, so a statement is never split across two transactions.
pub struct BatchController<'s, S: GraphStore> {
    store: &'s S,
    batch_size: BatchSize,
    current: Option<S::Tx>,
    pending: usize,
    commits: usize,
}

impl<'s, S: GraphStore> BatchController<'s, S> {
    pub fn new(store: &'s S, batch_size: BatchSize) -> Self {
        Self {
            store,
            batch_size,
            current: None,
            pending: 0,
            commits: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.current.is_some()
    }

    /// Insertions recorded since the last commit.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Commits performed so far by this controller.
    pub fn commits(&self) -> usize {
        self.commits
    }

    pub fn open(&mut self) -> Result<(), ImportError> {
        if self.current.is_some() {
            return Err(ImportError::InvalidState("a transaction is already open"));
        }
        self.current = Some(self.store.transaction()?);
        self.pending = 0;
        Ok(())
    }

    /// The open transaction.
    pub fn transaction(&mut self) -> Result<&mut S::Tx, ImportError> {
        self.current
            .as_mut()
            .ok_or(ImportError::InvalidState("no transaction is open"))
    }

    fn commit_current(&mut self) -> Result<(), ImportError> {
        let mut tx = self
            .current
            .take()
            .ok_or(ImportError::InvalidState("no transaction is open"))?;
        let committed = tx.commit();
        let closed = tx.close();
        committed?;
        closed?;
        self.commits += 1;
        debug!("Committed transaction #{} ({} insertions)", self.commits, self.pending);
        self.pending = 0;
        Ok(())
    }

    /// Counts one insertion. Returns true when the batch threshold was reached
    /// and the transaction was committed and replaced.
    pub fn record_insertion(&mut self) -> Result<bool, ImportError> {
        if self.current.is_none() {
            return Err(ImportError::InvalidState("no transaction is open"));
        }
        self.pending += 1;
        if self.pending < self.batch_size.get() {
            return Ok(false);
        }
        self.commit_current()?;
        self.open()?;
        Ok(true)
    }

    /// Commits and closes the open transaction, whatever its counter.
    pub fn finish(&mut self) -> Result<(), ImportError> {
        self.commit_current()
    }

    /// Closes the open transaction, if any, without committing it.
    pub fn abort(&mut self) -> Result<(), ImportError> {
        if let Some(mut tx) = self.current.take() {
            warn!(
                "Rolling back transaction with {} uncommitted insertions",
                self.pending
            );
            tx.close()?;
        }
        self.pending = 0;
        Ok(())
    }
}

impl<S: GraphStore> Drop for BatchController<'_, S> {
    fn drop(&mut self) {
        if let Some(mut tx) = self.current.take() {
            if let Err(e) = tx.close() {
                warn!("Failed to close abandoned transaction: {}", e);
            }
        }
    }
}
