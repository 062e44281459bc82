//! Defines constant NamedNodeRefs for the RDF terms the importer reasons about,
//! and the type, attribute and role labels of the target graph schema.

use oxigraph::model::NamedNodeRef;

// rdf
pub const RDF_LANG_STRING: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/1999/02/22-rdf-syntax-ns#langString");
/// Prefix shared by the container membership properties rdf:_1, rdf:_2, ...
pub const CONTAINER_MEMBERSHIP_PREFIX: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#_";
// rdfs
pub const SUB_PROPERTY_OF: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#subPropertyOf");
pub const MEMBER: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2000/01/rdf-schema#member");
// xsd
pub const XSD_STRING: NamedNodeRef<'_> =
    NamedNodeRef::new_unchecked("http://www.w3.org/2001/XMLSchema#string");

// graph schema: node types
pub const RDF_NODE: &str = "rdf-node";
pub const RDF_NON_LITERAL: &str = "rdf-non-literal";
pub const RDF_IRI: &str = "rdf-IRI";
pub const RDF_BLANK_NODE: &str = "rdf-blank-node";
pub const RDF_LITERAL: &str = "rdf-literal";

// graph schema: attributes owned by rdf-literal
pub const RDF_DATATYPE: &str = "rdf-datatype";
pub const RDF_LANGUAGE_TAG: &str = "rdf-language-tag";

// graph schema: the triple relation and its roles
pub const RDF_TRIPLE: &str = "rdf-triple";
pub const RDF_SUBJECT: &str = "rdf-subject";
pub const RDF_PREDICATE: &str = "rdf-predicate";
pub const RDF_OBJECT: &str = "rdf-object";
