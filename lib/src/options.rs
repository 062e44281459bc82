//! Shared option types that replace raw integers and strings in the Rust API.

use crate::errors::ImportError;
use oxigraph::io::{JsonLdProfileSet, RdfFormat};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// How many triples are inserted before the current transaction is committed.
/// Always strictly positive.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct BatchSize(usize);

impl BatchSize {
    pub const DEFAULT: BatchSize = BatchSize(1500);

    pub fn new(size: usize) -> Result<Self, ImportError> {
        if size == 0 {
            return Err(ImportError::configuration("batch size must be positive"));
        }
        Ok(BatchSize(size))
    }

    pub fn get(self) -> usize {
        self.0
    }
}

impl Default for BatchSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<i64> for BatchSize {
    type Error = ImportError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value <= 0 {
            return Err(ImportError::configuration(format!(
                "batch size must be positive, got {}",
                value
            )));
        }
        let size = usize::try_from(value)
            .map_err(|_| ImportError::configuration(format!("batch size {} is too large", value)))?;
        BatchSize::new(size)
    }
}

impl From<BatchSize> for i64 {
    fn from(value: BatchSize) -> Self {
        i64::try_from(value.0).unwrap_or(i64::MAX)
    }
}

impl FromStr for BatchSize {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value: i64 = s
            .trim()
            .parse()
            .map_err(|_| ImportError::configuration(format!("invalid batch size '{}'", s)))?;
        BatchSize::try_from(value)
    }
}

impl fmt::Display for BatchSize {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serializations accepted as input, selected by the short names of the
/// command line (`TTL`, `NT`, ...).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum InputFormat {
    RdfXml,
    NTriples,
    Turtle,
    N3,
    TriG,
    NQuads,
    JsonLd,
}

/// Selectors known from other RDF toolkits for which no parser is available.
const UNSUPPORTED_SELECTORS: &[(&str, &str)] = &[
    ("TTLS", "Turtle-star"),
    ("TRIGS", "TriG-star"),
    ("TRIX", "TriX"),
    ("BRF", "binary RDF"),
    ("RJ", "RDF/JSON"),
    ("RDFA", "RDFa"),
    ("HDT", "HDT"),
];

impl InputFormat {
    pub const ALL: [InputFormat; 7] = [
        InputFormat::RdfXml,
        InputFormat::NTriples,
        InputFormat::Turtle,
        InputFormat::N3,
        InputFormat::TriG,
        InputFormat::NQuads,
        InputFormat::JsonLd,
    ];

    /// The selector accepted by [`InputFormat::from_str`].
    pub fn selector(self) -> &'static str {
        match self {
            InputFormat::RdfXml => "RDF",
            InputFormat::NTriples => "NT",
            InputFormat::Turtle => "TTL",
            InputFormat::N3 => "N3",
            InputFormat::TriG => "TRIG",
            InputFormat::NQuads => "NQ",
            InputFormat::JsonLd => "JSONLD",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            InputFormat::RdfXml => "RDF/XML",
            InputFormat::NTriples => "N-Triples file format (.nt)",
            InputFormat::Turtle => "Turtle file format (.ttl)",
            InputFormat::N3 => "N3/Notation3 file format (.n3)",
            InputFormat::TriG => "TriG file format (.trig)",
            InputFormat::NQuads => "N-Quads file format (.nq)",
            InputFormat::JsonLd => "JSON-LD file format (.jsonld)",
        }
    }

    /// Guesses the format from a file extension, if it is a known RDF one.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "rdf" | "xml" | "owl" => Some(InputFormat::RdfXml),
            "nt" => Some(InputFormat::NTriples),
            "ttl" => Some(InputFormat::Turtle),
            "n3" => Some(InputFormat::N3),
            "trig" => Some(InputFormat::TriG),
            "nq" => Some(InputFormat::NQuads),
            "jsonld" | "json" => Some(InputFormat::JsonLd),
            _ => None,
        }
    }

    pub fn rdf_format(self) -> RdfFormat {
        match self {
            InputFormat::RdfXml => RdfFormat::RdfXml,
            InputFormat::NTriples => RdfFormat::NTriples,
            InputFormat::Turtle => RdfFormat::Turtle,
            InputFormat::N3 => RdfFormat::N3,
            InputFormat::TriG => RdfFormat::TriG,
            InputFormat::NQuads => RdfFormat::NQuads,
            InputFormat::JsonLd => RdfFormat::JsonLd {
                profile: JsonLdProfileSet::default(),
            },
        }
    }
}

impl FromStr for InputFormat {
    type Err = ImportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        if let Some(format) = InputFormat::ALL
            .iter()
            .find(|f| f.selector() == upper.as_str())
        {
            return Ok(*format);
        }
        if let Some((_, name)) = UNSUPPORTED_SELECTORS.iter().find(|(sel, _)| *sel == upper) {
            return Err(ImportError::configuration(format!(
                "{} input ({}) is not supported",
                name, upper
            )));
        }
        Err(ImportError::configuration(format!(
            "unknown input format '{}'",
            s
        )))
    }
}

impl TryFrom<String> for InputFormat {
    type Error = ImportError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InputFormat> for String {
    fn from(value: InputFormat) -> Self {
        value.selector().to_string()
    }
}

impl fmt::Display for InputFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.selector())
    }
}
