//! Reading RDF files into an in-memory sequence of statements.

use crate::errors::ImportError;
use crate::options::InputFormat;
use log::{debug, info};
use oxigraph::io::RdfParser;
use oxigraph::model::Triple;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Resolves the format of `path`: the explicit one if given, else its extension.
pub fn resolve_format(path: &Path, format: Option<InputFormat>) -> Result<InputFormat, ImportError> {
    match format {
        Some(format) => Ok(format),
        None => InputFormat::from_path(path).ok_or_else(|| {
            ImportError::configuration(format!(
                "cannot infer the RDF format of {:?}; pass a format selector",
                path
            ))
        }),
    }
}

/// Parses every statement of `path`, in document order. Relative IRIs are
/// resolved against `base_iri`. Graph names of quad formats are dropped and
/// blank node labels are made unique to this read.
pub fn read_statements(
    path: &Path,
    format: Option<InputFormat>,
    base_iri: &str,
) -> Result<Vec<Triple>, ImportError> {
    let file = File::open(path).map_err(|source| ImportError::InputAccess {
        path: path.to_path_buf(),
        source,
    })?;
    let format = resolve_format(path, format)?;
    debug!("Reading {:?} as {}", path, format.description());

    let parser = RdfParser::from_format(format.rdf_format())
        .with_base_iri(base_iri)
        .map_err(|e| ImportError::configuration(format!("invalid base IRI '{}': {}", base_iri, e)))?
        .rename_blank_nodes();

    let mut statements = Vec::new();
    for quad in parser.for_reader(BufReader::new(file)) {
        let quad = quad.map_err(|source| ImportError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        statements.push(Triple::new(quad.subject, quad.predicate, quad.object));
    }
    info!("Read {} statements from {:?}", statements.len(), path);
    Ok(statements)
}
