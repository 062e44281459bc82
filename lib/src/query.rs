//! Typed "match-then-insert" queries issued against a graph store.
//!
//! Queries are built with a small fluent API and render as TypeQL-style text,
//! which is what shows up in debug logs:
//!
//! ```text
//! match $s "http://example.org/s" isa rdf-non-literal; $p "http://example.org/p" isa rdf-IRI;
//!   $o "hello" isa rdf-node;
//! insert $t (rdf-subject: $s, rdf-predicate: $p, rdf-object: $o) isa rdf-triple;
//! ```

use std::collections::BTreeMap;
use std::fmt;

/// A variable bound to a node of a given type whose value equals `value`.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct NodePattern {
    pub var: String,
    pub value: String,
    pub thing: &'static str,
    pub has: Vec<(&'static str, String)>,
}

impl NodePattern {
    pub fn new(var: &str, value: impl Into<String>, thing: &'static str) -> Self {
        Self {
            var: var.to_string(),
            value: value.into(),
            thing,
            has: Vec::new(),
        }
    }

    /// Attaches an attribute to the node.
    pub fn has(mut self, attribute: &'static str, value: impl Into<String>) -> Self {
        self.has.push((attribute, value.into()));
        self
    }
}

impl fmt::Display for NodePattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "${} \"{}\" isa {}", self.var, self.value, self.thing)?;
        for (attribute, value) in &self.has {
            write!(f, ", has {} \"{}\"", attribute, value)?;
        }
        f.write_str(";")
    }
}

/// A relation whose role players are variables bound in the match clause.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct RelationPattern {
    pub var: String,
    pub thing: &'static str,
    pub roles: Vec<(&'static str, String)>,
}

impl RelationPattern {
    pub fn new(var: &str, thing: &'static str) -> Self {
        Self {
            var: var.to_string(),
            thing,
            roles: Vec::new(),
        }
    }

    pub fn rel(mut self, role: &'static str, player: &str) -> Self {
        self.roles.push((role, player.to_string()));
        self
    }
}

impl fmt::Display for RelationPattern {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let roles: Vec<String> = self
            .roles
            .iter()
            .map(|(role, player)| format!("{}: ${}", role, player))
            .collect();
        write!(f, "${} ({}) isa {};", self.var, roles.join(", "), self.thing)
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Query {
    /// Inserts one node; stores treat node insertion as idempotent.
    InsertNode(NodePattern),
    /// Inserts one relation per answer of the match clause.
    MatchInsert {
        matches: Vec<NodePattern>,
        insert: RelationPattern,
    },
}

impl Query {
    pub fn insert_node(node: NodePattern) -> Self {
        Query::InsertNode(node)
    }

    pub fn match_insert(matches: Vec<NodePattern>, insert: RelationPattern) -> Self {
        Query::MatchInsert { matches, insert }
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Query::InsertNode(node) => write!(f, "insert {}", node),
            Query::MatchInsert { matches, insert } => {
                f.write_str("match")?;
                for node in matches {
                    write!(f, " {}", node)?;
                }
                write!(f, " insert {}", insert)
            }
        }
    }
}

/// A concept bound to a query variable.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Concept {
    Node { thing: &'static str, value: String },
    Relation { thing: &'static str },
}

/// One result record of an executed query.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Answer {
    bindings: BTreeMap<String, Concept>,
}

impl Answer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind(mut self, var: &str, concept: Concept) -> Self {
        self.bindings.insert(var.to_string(), concept);
        self
    }
}
