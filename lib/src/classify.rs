//! Classification of RDF terms into the node kinds of the graph schema.

use crate::consts::{
    CONTAINER_MEMBERSHIP_PREFIX, RDF_BLANK_NODE, RDF_IRI, RDF_LITERAL, RDF_NODE, RDF_NON_LITERAL,
};
use crate::errors::ImportError;
use lazy_static::lazy_static;
use oxigraph::model::TermRef;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    static ref CONTAINER_MEMBERSHIP: Regex = Regex::new(&format!(
        "^{}([0-9]+)$",
        regex::escape(CONTAINER_MEMBERSHIP_PREFIX)
    ))
    .expect("container membership pattern is valid");
}

/// The three kinds of node an RDF term can become.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub enum NodeKind {
    BlankNode,
    Iri,
    Literal,
}

impl NodeKind {
    /// Label of the concrete node type in the graph schema.
    pub fn type_label(self) -> &'static str {
        match self {
            NodeKind::BlankNode => RDF_BLANK_NODE,
            NodeKind::Iri => RDF_IRI,
            NodeKind::Literal => RDF_LITERAL,
        }
    }

    pub fn from_type_label(label: &str) -> Option<Self> {
        match label {
            RDF_BLANK_NODE => Some(NodeKind::BlankNode),
            RDF_IRI => Some(NodeKind::Iri),
            RDF_LITERAL => Some(NodeKind::Literal),
            _ => None,
        }
    }

    /// Whether nodes of this kind are instances of the (possibly abstract) type `label`.
    pub fn is_a(self, label: &str) -> bool {
        match label {
            RDF_NODE => true,
            RDF_NON_LITERAL => self != NodeKind::Literal,
            _ => self.type_label() == label,
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.type_label())
    }
}

/// A classified RDF term together with its canonical key.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum RdfValue {
    BlankNode {
        key: String,
    },
    Iri {
        key: String,
    },
    Literal {
        key: String,
        datatype: String,
        language: Option<String>,
    },
}

impl RdfValue {
    pub fn kind(&self) -> NodeKind {
        match self {
            RdfValue::BlankNode { .. } => NodeKind::BlankNode,
            RdfValue::Iri { .. } => NodeKind::Iri,
            RdfValue::Literal { .. } => NodeKind::Literal,
        }
    }

    /// Escaped string form used for store matching and cache membership.
    pub fn key(&self) -> &str {
        match self {
            RdfValue::BlankNode { key } | RdfValue::Iri { key } | RdfValue::Literal { key, .. } => {
                key
            }
        }
    }

    /// Index `n` when this value is the container membership property `rdf:_n`.
    pub fn container_membership_index(&self) -> Option<u64> {
        match self {
            RdfValue::Iri { key } => container_membership_index(key),
            _ => None,
        }
    }
}

impl fmt::Display for RdfValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RdfValue::BlankNode { key } => write!(f, "_:{}", key),
            RdfValue::Iri { key } => write!(f, "<{}>", key),
            RdfValue::Literal {
                key,
                language: Some(language),
                ..
            } => write!(f, "\"{}\"@{}", key, language),
            RdfValue::Literal { key, datatype, .. } => write!(f, "\"{}\"^^<{}>", key, datatype),
        }
    }
}

/// Replaces every `"` with `'` so the value can sit inside a quoted query
/// literal. Lossy: `a"b` and `a'b` escape to the same string.
pub fn escape(s: &str) -> String {
    s.replace('"', "'")
}

/// Classifies a term and extracts its canonical key, datatype and language tag.
#[allow(unreachable_patterns)]
pub fn classify(term: TermRef<'_>) -> Result<RdfValue, ImportError> {
    match term {
        TermRef::BlankNode(node) => Ok(RdfValue::BlankNode {
            key: escape(node.as_str()),
        }),
        TermRef::NamedNode(node) => Ok(RdfValue::Iri {
            key: escape(node.as_str()),
        }),
        TermRef::Literal(literal) => Ok(RdfValue::Literal {
            key: escape(literal.value()),
            datatype: literal.datatype().as_str().to_string(),
            language: literal.language().map(str::to_string),
        }),
        // quoted triples (RDF 1.2) have no node shape in the graph schema
        other => Err(ImportError::UnsupportedTerm(other.to_string())),
    }
}

/// Returns `n` if `iri` is `rdf:_n` with a purely decimal suffix that fits a u64.
pub fn container_membership_index(iri: &str) -> Option<u64> {
    CONTAINER_MEMBERSHIP
        .captures(iri)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse().ok())
}
