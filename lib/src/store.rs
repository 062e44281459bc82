//! Defines the transactional store abstraction the importer writes to, and
//! [`LocalStore`], an implementation holding the RDF graph schema either purely
//! in memory or backed by an append-only commit journal on disk.

use crate::classify::NodeKind;
use crate::consts::{RDF_OBJECT, RDF_PREDICATE, RDF_SUBJECT, RDF_TRIPLE};
use crate::errors::StoreError;
use crate::query::{Answer, Concept, NodePattern, Query, RelationPattern};
use chrono::prelude::*;
use fs2::FileExt;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const LOCK_FILE: &str = "store.lock";
const JOURNAL_FILE: &str = "journal.jsonl";

/// A unit of work against a [`GraphStore`].
///
/// Writes become visible to other transactions only after [`Transaction::commit`].
/// Closing a transaction that was not committed discards its writes.
pub trait Transaction {
    /// Runs `query` and returns one [`Answer`] per record it produced.
    fn execute(&mut self, query: &Query) -> Result<Vec<Answer>, StoreError>;

    /// Publishes the staged writes. The transaction cannot be used afterwards,
    /// except to be closed.
    fn commit(&mut self) -> Result<(), StoreError>;

    /// Releases the transaction; closing twice is a no-op.
    fn close(&mut self) -> Result<(), StoreError>;

    fn is_open(&self) -> bool;
}

/// A session against a graph store able to hand out transactions.
pub trait GraphStore {
    type Tx: Transaction;

    /// Opens a write transaction.
    fn transaction(&self) -> Result<Self::Tx, StoreError>;

    fn is_open(&self) -> bool;

    /// Releases the session. Closing twice is a no-op.
    fn close(&mut self) -> Result<(), StoreError>;
}

#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct StoreStats {
    pub num_nodes: usize,
    pub num_relations: usize,
    pub num_commits: usize,
}

/// A node of the graph with the attributes it owns.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub kind: NodeKind,
    pub value: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct RolePlayer {
    role: String,
    kind: NodeKind,
    value: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
struct RelationRecord {
    thing: String,
    players: Vec<RolePlayer>,
}

/// A committed `rdf-triple` relation, with its role players' values.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StoredTriple {
    pub subject: String,
    pub predicate: String,
    pub object: String,
}

type NodeKey = (NodeKind, String);

/// Writes staged by one transaction.
#[derive(Debug, Default)]
struct Delta {
    nodes: BTreeMap<NodeKey, BTreeMap<String, BTreeSet<String>>>,
    relations: Vec<RelationRecord>,
}

impl Delta {
    fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.relations.is_empty()
    }
}

/// One line of the on-disk journal.
#[derive(Debug, Serialize, Deserialize)]
struct CommitRecord {
    committed_at: DateTime<Utc>,
    nodes: Vec<NodeRecord>,
    relations: Vec<RelationRecord>,
}

impl CommitRecord {
    fn from_delta(delta: &Delta) -> Self {
        CommitRecord {
            committed_at: Utc::now(),
            nodes: delta
                .nodes
                .iter()
                .map(|((kind, value), attributes)| NodeRecord {
                    kind: *kind,
                    value: value.clone(),
                    attributes: attributes.clone(),
                })
                .collect(),
            relations: delta.relations.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct GraphState {
    nodes: BTreeMap<NodeKey, BTreeMap<String, BTreeSet<String>>>,
    relations: Vec<RelationRecord>,
    commits: usize,
}

impl GraphState {
    fn apply(&mut self, record: CommitRecord) {
        for node in record.nodes {
            let attributes = self.nodes.entry((node.kind, node.value)).or_default();
            for (attribute, values) in node.attributes {
                attributes.entry(attribute).or_default().extend(values);
            }
        }
        self.relations.extend(record.relations);
        self.commits += 1;
    }
}

#[derive(Debug)]
struct Shared {
    state: GraphState,
    journal: Option<File>,
    open: bool,
}

/// A graph store kept in memory, optionally persisted to a directory.
///
/// Node insertion is idempotent on (type, value) and attributes accumulate, so
/// the same IRI inserted twice yields one node. Relations are never
/// deduplicated.
pub struct LocalStore {
    shared: Arc<Mutex<Shared>>,
    location: Option<PathBuf>,
    // Keep the interprocess lock alive for the lifetime of this store
    lock_file: Option<File>,
}

fn lock(shared: &Mutex<Shared>) -> Result<MutexGuard<'_, Shared>, StoreError> {
    shared.lock().map_err(|_| StoreError::Poisoned)
}

impl LocalStore {
    /// A store that lives only as long as this value.
    pub fn in_memory() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                state: GraphState::default(),
                journal: None,
                open: true,
            })),
            location: None,
            lock_file: None,
        }
    }

    /// Opens (or creates) a store in `path`, taking an exclusive lock on it and
    /// replaying its commit journal.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path)?;
        let lock_path = path.join(LOCK_FILE);
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&lock_path)?;
        if let Err(e) = lock_file.try_lock_exclusive() {
            return Err(StoreError::Locked {
                path: lock_path,
                source: e,
            });
        }

        let journal_path = path.join(JOURNAL_FILE);
        let state = if journal_path.exists() {
            replay_journal(&journal_path)?
        } else {
            GraphState::default()
        };
        let journal = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&journal_path)?;
        info!(
            "Opened store at {:?}: {} nodes, {} relations, {} commits",
            path,
            state.nodes.len(),
            state.relations.len(),
            state.commits
        );

        Ok(Self {
            shared: Arc::new(Mutex::new(Shared {
                state,
                journal: Some(journal),
                open: true,
            })),
            location: Some(path.to_path_buf()),
            lock_file: Some(lock_file),
        })
    }

    /// Directory backing the store, if it is persistent.
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    pub fn stats(&self) -> Result<StoreStats, StoreError> {
        let shared = lock(&self.shared)?;
        Ok(StoreStats {
            num_nodes: shared.state.nodes.len(),
            num_relations: shared.state.relations.len(),
            num_commits: shared.state.commits,
        })
    }

    /// Returns the committed node of the given kind and value.
    pub fn node(&self, kind: NodeKind, value: &str) -> Result<Option<NodeRecord>, StoreError> {
        let shared = lock(&self.shared)?;
        Ok(shared
            .state
            .nodes
            .get(&(kind, value.to_string()))
            .map(|attributes| NodeRecord {
                kind,
                value: value.to_string(),
                attributes: attributes.clone(),
            }))
    }

    /// Returns every committed `rdf-triple`, in insertion order.
    pub fn triples(&self) -> Result<Vec<StoredTriple>, StoreError> {
        let shared = lock(&self.shared)?;
        let player = |relation: &RelationRecord, role: &str| {
            relation
                .players
                .iter()
                .find(|p| p.role == role)
                .map(|p| p.value.clone())
                .unwrap_or_default()
        };
        Ok(shared
            .state
            .relations
            .iter()
            .filter(|r| r.thing == RDF_TRIPLE)
            .map(|r| StoredTriple {
                subject: player(r, RDF_SUBJECT),
                predicate: player(r, RDF_PREDICATE),
                object: player(r, RDF_OBJECT),
            })
            .collect())
    }
}

fn replay_journal(path: &Path) -> Result<GraphState, StoreError> {
    let bytes = std::fs::read(path)?;
    let mut state = GraphState::default();
    let mut good_len = 0usize;
    let mut lines = bytes.split_inclusive(|b| *b == b'\n').peekable();
    while let Some(line) = lines.next() {
        let is_last = lines.peek().is_none();
        let complete = line.ends_with(b"\n");
        match serde_json::from_slice::<CommitRecord>(line) {
            Ok(record) if complete => {
                state.apply(record);
                good_len += line.len();
            }
            Err(e) if !is_last => return Err(StoreError::Journal(e)),
            _ => {
                // a crash while appending leaves a partial final entry behind
                warn!(
                    "Ignoring torn entry at the end of {:?} ({} bytes)",
                    path,
                    line.len()
                );
                let file = OpenOptions::new().write(true).open(path)?;
                file.set_len(good_len as u64)?;
                break;
            }
        }
    }
    debug!("Replayed {} commits from {:?}", state.commits, path);
    Ok(state)
}

impl GraphStore for LocalStore {
    type Tx = LocalTransaction;

    fn transaction(&self) -> Result<LocalTransaction, StoreError> {
        if !lock(&self.shared)?.open {
            return Err(StoreError::Closed);
        }
        Ok(LocalTransaction {
            shared: Arc::clone(&self.shared),
            delta: Delta::default(),
            open: true,
        })
    }

    fn is_open(&self) -> bool {
        lock(&self.shared).map(|s| s.open).unwrap_or(false)
    }

    fn close(&mut self) -> Result<(), StoreError> {
        {
            let mut shared = lock(&self.shared)?;
            if !shared.open {
                return Ok(());
            }
            shared.open = false;
            if let Some(journal) = shared.journal.as_mut() {
                journal.sync_all()?;
            }
            shared.journal = None;
        }
        if let Some(lock_file) = self.lock_file.take() {
            lock_file.unlock()?;
        }
        debug!("Closed store {:?}", self.location);
        Ok(())
    }
}

impl Drop for LocalStore {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to close store {:?}: {}", self.location, e);
        }
    }
}

pub struct LocalTransaction {
    shared: Arc<Mutex<Shared>>,
    delta: Delta,
    open: bool,
}

impl LocalTransaction {
    fn ensure_usable(&self) -> Result<(), StoreError> {
        if !self.open {
            return Err(StoreError::TransactionClosed);
        }
        Ok(())
    }

    fn insert_node(&mut self, node: &NodePattern) -> Result<Vec<Answer>, StoreError> {
        let kind = NodeKind::from_type_label(node.thing)
            .ok_or_else(|| StoreError::Schema(format!("cannot insert abstract type {}", node.thing)))?;
        let attributes = self
            .delta
            .nodes
            .entry((kind, node.value.clone()))
            .or_default();
        for (attribute, value) in &node.has {
            attributes
                .entry(attribute.to_string())
                .or_default()
                .insert(value.clone());
        }
        Ok(vec![Answer::new().bind(
            &node.var,
            Concept::Node {
                thing: kind.type_label(),
                value: node.value.clone(),
            },
        )])
    }

    /// Nodes visible to this transaction that satisfy `pattern`.
    fn candidates(&self, state: &GraphState, pattern: &NodePattern) -> Vec<NodeKey> {
        [NodeKind::BlankNode, NodeKind::Iri, NodeKind::Literal]
            .into_iter()
            .filter(|kind| kind.is_a(pattern.thing))
            .map(|kind| (kind, pattern.value.clone()))
            .filter(|key| {
                let committed = state.nodes.get(key);
                let staged = self.delta.nodes.get(key);
                if committed.is_none() && staged.is_none() {
                    return false;
                }
                pattern.has.iter().all(|(attribute, value)| {
                    [committed, staged].into_iter().flatten().any(|attrs| {
                        attrs
                            .get(*attribute)
                            .map_or(false, |values| values.contains(value))
                    })
                })
            })
            .collect()
    }

    fn match_insert(
        &mut self,
        matches: &[NodePattern],
        insert: &RelationPattern,
    ) -> Result<Vec<Answer>, StoreError> {
        if insert.thing != RDF_TRIPLE {
            return Err(StoreError::Schema(format!(
                "unknown relation type {}",
                insert.thing
            )));
        }
        for (role, _) in &insert.roles {
            if ![RDF_SUBJECT, RDF_PREDICATE, RDF_OBJECT].contains(role) {
                return Err(StoreError::Schema(format!(
                    "{} does not relate role {}",
                    RDF_TRIPLE, role
                )));
            }
        }

        // cartesian product of the candidates of every match variable
        let mut bindings: Vec<BTreeMap<String, NodeKey>> = vec![BTreeMap::new()];
        {
            let shared = lock(&self.shared)?;
            if !shared.open {
                return Err(StoreError::Closed);
            }
            for pattern in matches {
                let candidates = self.candidates(&shared.state, pattern);
                bindings = bindings
                    .into_iter()
                    .flat_map(|binding| {
                        candidates.iter().map(move |candidate| {
                            let mut binding = binding.clone();
                            binding.insert(pattern.var.clone(), candidate.clone());
                            binding
                        })
                    })
                    .collect();
            }
        }

        let mut answers = Vec::with_capacity(bindings.len());
        for binding in bindings {
            let mut players = Vec::with_capacity(insert.roles.len());
            for (role, var) in &insert.roles {
                let (kind, value) = binding.get(var).ok_or_else(|| {
                    StoreError::Schema(format!("variable ${} is not bound by the match", var))
                })?;
                players.push(RolePlayer {
                    role: role.to_string(),
                    kind: *kind,
                    value: value.clone(),
                });
            }
            self.delta.relations.push(RelationRecord {
                thing: insert.thing.to_string(),
                players,
            });
            let answer = binding.into_iter().fold(
                Answer::new().bind(&insert.var, Concept::Relation { thing: insert.thing }),
                |answer, (var, (kind, value))| {
                    answer.bind(
                        &var,
                        Concept::Node {
                            thing: kind.type_label(),
                            value,
                        },
                    )
                },
            );
            answers.push(answer);
        }
        Ok(answers)
    }
}

impl Transaction for LocalTransaction {
    fn execute(&mut self, query: &Query) -> Result<Vec<Answer>, StoreError> {
        self.ensure_usable()?;
        debug!("{}", query);
        match query {
            Query::InsertNode(node) => self.insert_node(node),
            Query::MatchInsert { matches, insert } => self.match_insert(matches, insert),
        }
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.ensure_usable()?;
        let mut shared = lock(&self.shared)?;
        if !shared.open {
            return Err(StoreError::Closed);
        }
        let delta = std::mem::take(&mut self.delta);
        let record = CommitRecord::from_delta(&delta);
        if let Some(journal) = shared.journal.as_mut() {
            let mut line = serde_json::to_vec(&record)?;
            line.push(b'\n');
            journal.write_all(&line)?;
            journal.flush()?;
        }
        shared.state.apply(record);
        self.open = false;
        Ok(())
    }

    fn close(&mut self) -> Result<(), StoreError> {
        if self.open && !self.delta.is_empty() {
            debug!(
                "Discarding {} staged nodes and {} staged relations",
                self.delta.nodes.len(),
                self.delta.relations.len()
            );
        }
        self.delta = Delta::default();
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;

    fn insert_iri(tx: &mut LocalTransaction, value: &str) -> Vec<Answer> {
        tx.execute(&Query::insert_node(NodePattern::new("x", value, RDF_IRI)))
            .unwrap()
    }

    fn triple_query(s: &str, p: &str, o: &str) -> Query {
        Query::match_insert(
            vec![
                NodePattern::new("s", s, RDF_NON_LITERAL),
                NodePattern::new("p", p, RDF_IRI),
                NodePattern::new("o", o, RDF_NODE),
            ],
            RelationPattern::new("t", RDF_TRIPLE)
                .rel(RDF_SUBJECT, "s")
                .rel(RDF_PREDICATE, "p")
                .rel(RDF_OBJECT, "o"),
        )
    }

    #[test]
    fn test_node_insert_is_idempotent() {
        let store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        assert_eq!(insert_iri(&mut tx, "http://example.org/a").len(), 1);
        assert_eq!(insert_iri(&mut tx, "http://example.org/a").len(), 1);
        tx.commit().unwrap();
        tx.close().unwrap();

        let mut tx = store.transaction().unwrap();
        assert_eq!(insert_iri(&mut tx, "http://example.org/a").len(), 1);
        tx.commit().unwrap();
        assert_eq!(store.stats().unwrap().num_nodes, 1);
        assert_eq!(store.stats().unwrap().num_commits, 2);
    }

    #[test]
    fn test_literal_attributes_accumulate() {
        let store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        for datatype in ["http://www.w3.org/2001/XMLSchema#string", "http://example.org/dt"] {
            tx.execute(&Query::insert_node(
                NodePattern::new("l", "1", RDF_LITERAL).has(RDF_DATATYPE, datatype),
            ))
            .unwrap();
        }
        tx.commit().unwrap();
        let node = store.node(NodeKind::Literal, "1").unwrap().unwrap();
        assert_eq!(node.attributes[RDF_DATATYPE].len(), 2);
    }

    #[test]
    fn test_uncommitted_writes_are_discarded() {
        let store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        insert_iri(&mut tx, "http://example.org/a");
        tx.close().unwrap();
        assert_eq!(store.stats().unwrap().num_nodes, 0);
        assert!(matches!(
            tx.execute(&triple_query("a", "b", "c")),
            Err(StoreError::TransactionClosed)
        ));
    }

    #[test]
    fn test_match_insert_sees_staged_and_committed_nodes() {
        let store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        insert_iri(&mut tx, "http://example.org/s");
        insert_iri(&mut tx, "http://example.org/p");
        tx.commit().unwrap();

        let mut tx = store.transaction().unwrap();
        insert_iri(&mut tx, "http://example.org/o");
        let answers = tx
            .execute(&triple_query(
                "http://example.org/s",
                "http://example.org/p",
                "http://example.org/o",
            ))
            .unwrap();
        assert_eq!(answers.len(), 1);
        assert_eq!(
            answers[0],
            Answer::new()
                .bind("t", Concept::Relation { thing: RDF_TRIPLE })
                .bind(
                    "s",
                    Concept::Node {
                        thing: RDF_IRI,
                        value: "http://example.org/s".to_string()
                    }
                )
                .bind(
                    "p",
                    Concept::Node {
                        thing: RDF_IRI,
                        value: "http://example.org/p".to_string()
                    }
                )
                .bind(
                    "o",
                    Concept::Node {
                        thing: RDF_IRI,
                        value: "http://example.org/o".to_string()
                    }
                )
        );
        tx.commit().unwrap();
        let triples = store.triples().unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(triples[0].object, "http://example.org/o");
    }

    #[test]
    fn test_match_insert_without_match_inserts_nothing() {
        let store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        insert_iri(&mut tx, "http://example.org/p");
        let answers = tx
            .execute(&triple_query("missing", "http://example.org/p", "missing"))
            .unwrap();
        assert!(answers.is_empty());
        tx.commit().unwrap();
        assert!(store.triples().unwrap().is_empty());
    }

    #[test]
    fn test_abstract_types_cannot_be_inserted() {
        let store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        let err = tx
            .execute(&Query::insert_node(NodePattern::new("x", "a", RDF_NODE)))
            .unwrap_err();
        assert!(matches!(err, StoreError::Schema(_)));
    }

    #[test]
    fn test_closed_store_refuses_transactions() {
        let mut store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        insert_iri(&mut tx, "http://example.org/a");
        store.close().unwrap();
        assert!(!store.is_open());
        assert!(matches!(tx.commit(), Err(StoreError::Closed)));
        assert!(matches!(
            store.transaction(),
            Err(StoreError::Closed)
        ));
        // closing twice is fine
        store.close().unwrap();
    }

    #[test]
    fn test_persistent_store_replays_journal() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalStore::open(dir.path()).unwrap();
            let mut tx = store.transaction().unwrap();
            insert_iri(&mut tx, "http://example.org/a");
            tx.commit().unwrap();
        }
        let store = LocalStore::open(dir.path()).unwrap();
        let stats = store.stats().unwrap();
        assert_eq!(stats.num_nodes, 1);
        assert_eq!(stats.num_commits, 1);
        assert!(store
            .node(NodeKind::Iri, "http://example.org/a")
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_persistent_store_is_locked() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = LocalStore::open(dir.path()).unwrap();
        assert!(matches!(
            LocalStore::open(dir.path()),
            Err(StoreError::Locked { .. })
        ));
        first.close().unwrap();
        assert!(LocalStore::open(dir.path()).is_ok());
    }

    #[test]
    fn test_torn_journal_tail_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalStore::open(dir.path()).unwrap();
            let mut tx = store.transaction().unwrap();
            insert_iri(&mut tx, "http://example.org/a");
            tx.commit().unwrap();
        }
        let journal = dir.path().join(JOURNAL_FILE);
        let mut file = OpenOptions::new().append(true).open(&journal).unwrap();
        file.write_all(b"{\"committed_at\":\"2024-").unwrap();
        drop(file);

        let store = LocalStore::open(dir.path()).unwrap();
        assert_eq!(store.stats().unwrap().num_commits, 1);
        let mut tx = store.transaction().unwrap();
        insert_iri(&mut tx, "http://example.org/b");
        tx.commit().unwrap();
        drop(tx);
        drop(store);

        let store = LocalStore::open(dir.path()).unwrap();
        assert_eq!(store.stats().unwrap().num_commits, 2);
        assert_eq!(store.stats().unwrap().num_nodes, 2);
    }
}
