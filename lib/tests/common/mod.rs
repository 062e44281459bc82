#![allow(dead_code)]

use oxigraph::model::{BlankNode, Literal, NamedNode, NamedOrBlankNode, Term, Triple};
use rdfgraft::consts::{MEMBER, RDF_TRIPLE, SUB_PROPERTY_OF};
use rdfgraft::errors::StoreError;
use rdfgraft::query::{Answer, NodePattern, Query};
use rdfgraft::store::{GraphStore, LocalStore, LocalTransaction, Transaction};
use std::sync::{Arc, Mutex};

/// Something the importer did to the store.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Open,
    Execute(Query),
    Commit,
    Close,
    CloseStore,
}

#[derive(Default)]
struct Journal {
    events: Vec<Event>,
    node_inserts: usize,
    relation_inserts: usize,
    derived_inserts: usize,
    // 1-based indices of the inserts to swallow
    fail_node_insert: Option<usize>,
    fail_relation_insert: Option<usize>,
    fail_derived_insert: Option<usize>,
}

impl Journal {
    /// Whether the query is counted as the failing insert of its kind.
    fn swallows(&mut self, query: &Query) -> bool {
        match query {
            Query::InsertNode(_) => {
                self.node_inserts += 1;
                self.fail_node_insert == Some(self.node_inserts)
            }
            Query::MatchInsert { matches, insert } if insert.thing == RDF_TRIPLE => {
                self.relation_inserts += 1;
                let mut swallowed = self.fail_relation_insert == Some(self.relation_inserts);
                if is_sub_property_of_member(matches) {
                    self.derived_inserts += 1;
                    swallowed |= self.fail_derived_insert == Some(self.derived_inserts);
                }
                swallowed
            }
            Query::MatchInsert { .. } => false,
        }
    }
}

fn is_sub_property_of_member(matches: &[NodePattern]) -> bool {
    matches.len() == 3
        && matches[1].value == SUB_PROPERTY_OF.as_str()
        && matches[2].value == MEMBER.as_str()
}

/// Wraps a [`LocalStore`], records every call made on it and can make one
/// node or relation insert come back without answers.
pub struct RecordingStore {
    inner: LocalStore,
    journal: Arc<Mutex<Journal>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self {
            inner: LocalStore::in_memory(),
            journal: Arc::new(Mutex::new(Journal::default())),
        }
    }

    /// The `n`-th (1-based) `rdf-triple` insert returns no answers.
    pub fn failing_relation_insert(n: usize) -> Self {
        let store = Self::new();
        store.journal.lock().unwrap().fail_relation_insert = Some(n);
        store
    }

    /// The `n`-th (1-based) node insert returns no answers.
    pub fn failing_node_insert(n: usize) -> Self {
        let store = Self::new();
        store.journal.lock().unwrap().fail_node_insert = Some(n);
        store
    }

    /// The `n`-th (1-based) `rdf:_n rdfs:subPropertyOf rdfs:member` insert
    /// returns no answers.
    pub fn failing_derived_insert(n: usize) -> Self {
        let store = Self::new();
        store.journal.lock().unwrap().fail_derived_insert = Some(n);
        store
    }

    pub fn inner(&self) -> &LocalStore {
        &self.inner
    }

    /// Handle on the event log that outlives moving the store into an importer.
    pub fn recorder(&self) -> Recorder {
        Recorder(self.journal.clone())
    }
}

pub struct Recorder(Arc<Mutex<Journal>>);

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().events.clone()
    }

    pub fn commits(&self) -> usize {
        self.events().iter().filter(|e| **e == Event::Commit).count()
    }

    pub fn node_inserts(&self) -> Vec<Query> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Execute(q @ Query::InsertNode(_)) => Some(q),
                _ => None,
            })
            .collect()
    }

    pub fn relation_inserts(&self) -> Vec<Query> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Execute(q @ Query::MatchInsert { .. }) => Some(q),
                _ => None,
            })
            .collect()
    }
}

pub struct RecordingTransaction {
    inner: LocalTransaction,
    journal: Arc<Mutex<Journal>>,
}

impl RecordingTransaction {
    fn record(&self, event: Event) {
        self.journal.lock().unwrap().events.push(event);
    }
}

impl Transaction for RecordingTransaction {
    fn execute(&mut self, query: &Query) -> Result<Vec<Answer>, StoreError> {
        self.record(Event::Execute(query.clone()));
        if self.journal.lock().unwrap().swallows(query) {
            return Ok(Vec::new());
        }
        self.inner.execute(query)
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        self.record(Event::Commit);
        self.inner.commit()
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.record(Event::Close);
        self.inner.close()
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }
}

impl GraphStore for RecordingStore {
    type Tx = RecordingTransaction;

    fn transaction(&self) -> Result<RecordingTransaction, StoreError> {
        let inner = self.inner.transaction()?;
        self.journal.lock().unwrap().events.push(Event::Open);
        Ok(RecordingTransaction {
            inner,
            journal: self.journal.clone(),
        })
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn close(&mut self) -> Result<(), StoreError> {
        self.journal.lock().unwrap().events.push(Event::CloseStore);
        self.inner.close()
    }
}

pub fn iri(s: &str) -> NamedNode {
    NamedNode::new(s).unwrap()
}

pub fn ex(local: &str) -> NamedNode {
    iri(&format!("http://example.org/{}", local))
}

pub fn statement(
    s: impl Into<NamedOrBlankNode>,
    p: NamedNode,
    o: impl Into<Term>,
) -> Triple {
    Triple::new(s, p, o)
}

pub fn literal(value: &str) -> Literal {
    Literal::new_simple_literal(value)
}

pub fn blank(id: &str) -> BlankNode {
    BlankNode::new(id).unwrap()
}
