//! Turns RDF terms and statements into insert queries and checks that every
//! insert produced exactly one record.

use crate::cache::DedupCache;
use crate::classify::{classify, RdfValue};
use crate::consts::{
    MEMBER, RDF_DATATYPE, RDF_IRI, RDF_LANGUAGE_TAG, RDF_NODE, RDF_NON_LITERAL, RDF_OBJECT,
    RDF_PREDICATE, RDF_SUBJECT, RDF_TRIPLE, SUB_PROPERTY_OF,
};
use crate::errors::ImportError;
use crate::query::{NodePattern, Query, RelationPattern};
use crate::store::Transaction;
use log::debug;
use oxigraph::model::{TermRef, Triple};

/// Counters describing what a materializer wrote.
#[derive(Debug, Clone, Copy, Default, Eq, PartialEq)]
pub struct MaterializeStats {
    pub nodes: usize,
    pub cache_hits: usize,
    pub derived_triples: usize,
}

/// Builds the `rdf-triple` match-insert binding three existing nodes.
fn triple_query(subject: NodePattern, predicate: NodePattern, object: NodePattern) -> Query {
    Query::match_insert(
        vec![subject, predicate, object],
        RelationPattern::new("t", RDF_TRIPLE)
            .rel(RDF_SUBJECT, "s")
            .rel(RDF_PREDICATE, "p")
            .rel(RDF_OBJECT, "o"),
    )
}

fn insert_query(value: &RdfValue) -> Query {
    match value {
        RdfValue::BlankNode { key } | RdfValue::Iri { key } => {
            Query::insert_node(NodePattern::new("x", key.as_str(), value.kind().type_label()))
        }
        RdfValue::Literal {
            key,
            datatype,
            language,
        } => {
            let mut node = NodePattern::new("l", key.as_str(), value.kind().type_label())
                .has(RDF_DATATYPE, datatype.as_str());
            if let Some(language) = language {
                node = node.has(RDF_LANGUAGE_TAG, language.as_str());
            }
            Query::insert_node(node)
        }
    }
}

/// Ensures a node exists for each value it is handed, once per import run.
pub struct NodeMaterializer<'c> {
    cache: &'c mut DedupCache,
    stats: MaterializeStats,
}

impl<'c> NodeMaterializer<'c> {
    pub fn new(cache: &'c mut DedupCache) -> Self {
        Self {
            cache,
            stats: MaterializeStats::default(),
        }
    }

    pub fn stats(&self) -> MaterializeStats {
        self.stats
    }

    /// Inserts `term` unless it was already inserted during this run. An
    /// `rdf:_n` IRI is additionally declared a sub-property of `rdfs:member`.
    pub fn materialize<T: Transaction>(
        &mut self,
        term: TermRef<'_>,
        tx: &mut T,
    ) -> Result<RdfValue, ImportError> {
        let value = classify(term)?;
        if self.cache.contains(&value) {
            self.stats.cache_hits += 1;
            return Ok(value);
        }
        let membership = value.container_membership_index();
        if membership.is_some() {
            // the derived triple matches both vocabulary terms as existing nodes
            self.materialize(SUB_PROPERTY_OF.into(), tx)?;
            self.materialize(MEMBER.into(), tx)?;
        }

        let inserted = tx.execute(&insert_query(&value))?.len();
        if inserted != 1 {
            return Err(ImportError::Materialization {
                value: value.to_string(),
                inserted,
            });
        }
        self.cache.add(&value);
        self.stats.nodes += 1;

        if let Some(index) = membership {
            debug!("{} is container membership property #{}", value, index);
            let query = triple_query(
                NodePattern::new("s", value.key(), RDF_IRI),
                NodePattern::new("p", SUB_PROPERTY_OF.as_str(), RDF_IRI),
                NodePattern::new("o", MEMBER.as_str(), RDF_IRI),
            );
            let inserted = tx.execute(&query)?.len();
            if inserted != 1 {
                return Err(ImportError::Materialization {
                    value: format!("{} rdfs:subPropertyOf rdfs:member", value),
                    inserted,
                });
            }
            self.stats.derived_triples += 1;
        }
        Ok(value)
    }
}

/// Asserts statements as `rdf-triple` relations between their materialized nodes.
pub struct TripleMaterializer<'c> {
    nodes: NodeMaterializer<'c>,
}

impl<'c> TripleMaterializer<'c> {
    pub fn new(cache: &'c mut DedupCache) -> Self {
        Self {
            nodes: NodeMaterializer::new(cache),
        }
    }

    pub fn stats(&self) -> MaterializeStats {
        self.nodes.stats()
    }

    /// Materializes subject, predicate and object (in that order), then inserts
    /// the relation. Exactly one relation must come out of the match.
    pub fn materialize<T: Transaction>(
        &mut self,
        statement: &Triple,
        tx: &mut T,
    ) -> Result<(), ImportError> {
        let subject = self
            .nodes
            .materialize(statement.subject.as_ref().into(), tx)?;
        let predicate = self
            .nodes
            .materialize(statement.predicate.as_ref().into(), tx)?;
        let object = self.nodes.materialize(statement.object.as_ref(), tx)?;

        let query = triple_query(
            NodePattern::new("s", subject.key(), RDF_NON_LITERAL),
            NodePattern::new("p", predicate.key(), RDF_IRI),
            NodePattern::new("o", object.key(), RDF_NODE),
        );
        let inserted = tx.execute(&query)?.len();
        if inserted != 1 {
            return Err(ImportError::TripleInsertion {
                subject: subject.to_string(),
                predicate: predicate.to_string(),
                object: object.to_string(),
                inserted,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::NodeKind;
    use crate::store::{GraphStore, LocalStore};
    use oxigraph::model::{BlankNode, Literal, NamedNode, Term};

    fn iri(s: &str) -> NamedNode {
        NamedNode::new(s).unwrap()
    }

    #[test]
    fn test_node_materialized_once_per_run() {
        let store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        let mut cache = DedupCache::new();
        let mut nodes = NodeMaterializer::new(&mut cache);
        let term = Term::from(iri("http://example.org/a"));
        nodes.materialize(term.as_ref(), &mut tx).unwrap();
        nodes.materialize(term.as_ref(), &mut tx).unwrap();
        assert_eq!(nodes.stats().nodes, 1);
        assert_eq!(nodes.stats().cache_hits, 1);
        tx.commit().unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(store.stats().unwrap().num_nodes, 1);
    }

    #[test]
    fn test_literal_gets_datatype_and_language() {
        let store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        let mut cache = DedupCache::new();
        let mut nodes = NodeMaterializer::new(&mut cache);
        let term = Term::from(Literal::new_language_tagged_literal("chat", "fr").unwrap());
        nodes.materialize(term.as_ref(), &mut tx).unwrap();
        tx.commit().unwrap();

        let node = store.node(NodeKind::Literal, "chat").unwrap().unwrap();
        assert!(node.attributes[RDF_LANGUAGE_TAG].contains("fr"));
        assert!(node.attributes[RDF_DATATYPE]
            .contains("http://www.w3.org/1999/02/22-rdf-syntax-ns#langString"));
    }

    #[test]
    fn test_blank_node_materialized_as_blank_node() {
        let store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        let mut cache = DedupCache::new();
        let term = Term::from(BlankNode::new("b7").unwrap());
        NodeMaterializer::new(&mut cache)
            .materialize(term.as_ref(), &mut tx)
            .unwrap();
        tx.commit().unwrap();
        assert!(store.node(NodeKind::BlankNode, "b7").unwrap().is_some());
        assert!(store.node(NodeKind::Iri, "b7").unwrap().is_none());
    }

    #[test]
    fn test_container_membership_property_is_a_member() {
        let store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        let mut cache = DedupCache::new();
        let mut nodes = NodeMaterializer::new(&mut cache);
        let term = Term::from(iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#_2"));
        nodes.materialize(term.as_ref(), &mut tx).unwrap();
        nodes.materialize(term.as_ref(), &mut tx).unwrap();
        assert_eq!(nodes.stats().derived_triples, 1);
        // rdf:_2, rdfs:subPropertyOf and rdfs:member
        assert_eq!(nodes.stats().nodes, 3);
        tx.commit().unwrap();

        let triples = store.triples().unwrap();
        assert_eq!(triples.len(), 1);
        assert_eq!(
            triples[0].subject,
            "http://www.w3.org/1999/02/22-rdf-syntax-ns#_2"
        );
        assert_eq!(triples[0].predicate, SUB_PROPERTY_OF.as_str());
        assert_eq!(triples[0].object, MEMBER.as_str());
    }

    #[test]
    fn test_non_numeric_membership_suffix_is_plain_iri() {
        let store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        let mut cache = DedupCache::new();
        let mut nodes = NodeMaterializer::new(&mut cache);
        let term = Term::from(iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#_abc"));
        nodes.materialize(term.as_ref(), &mut tx).unwrap();
        assert_eq!(nodes.stats().derived_triples, 0);
        assert_eq!(nodes.stats().nodes, 1);
        tx.commit().unwrap();
        assert!(store.triples().unwrap().is_empty());
    }

    #[test]
    fn test_literal_spelled_like_iri_reuses_the_node() {
        let store = LocalStore::in_memory();
        let mut tx = store.transaction().unwrap();
        let mut cache = DedupCache::new();
        let mut triples = TripleMaterializer::new(&mut cache);
        let shared = "http://example.org/x";
        triples
            .materialize(
                &Triple::new(iri("http://example.org/s"), iri("http://example.org/p"), iri(shared)),
                &mut tx,
            )
            .unwrap();
        triples
            .materialize(
                &Triple::new(
                    iri("http://example.org/s"),
                    iri("http://example.org/q"),
                    Literal::new_simple_literal(shared),
                ),
                &mut tx,
            )
            .unwrap();
        assert_eq!(triples.stats().nodes, 4);
        tx.commit().unwrap();

        // the literal hit the cache, so its relation points at the IRI node
        assert!(store.node(NodeKind::Iri, shared).unwrap().is_some());
        assert!(store.node(NodeKind::Literal, shared).unwrap().is_none());
        let stored = store.triples().unwrap();
        assert_eq!(stored.len(), 2);
        assert!(stored.iter().all(|t| t.object == shared));
    }
}
