//! Import settings, loadable from and savable to a JSON file.

use crate::errors::ImportError;
use crate::options::{BatchSize, InputFormat};
use crate::DEFAULT_BASE_IRI;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::io::{BufReader, Write};
use std::path::Path;

fn default_base_iri() -> String {
    DEFAULT_BASE_IRI.to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate", error = "ImportError"))]
pub struct ImportOptions {
    /// Base IRI used to resolve relative IRIs in the input.
    #[serde(default = "default_base_iri")]
    #[builder(default = "default_base_iri()")]
    pub base_iri: String,
    /// Statements per transaction.
    #[serde(default)]
    #[builder(default)]
    pub batch_size: BatchSize,
    /// Input serialization; inferred from the file extension when absent.
    #[serde(default)]
    #[builder(default, setter(strip_option))]
    pub format: Option<InputFormat>,
}

impl ImportOptionsBuilder {
    fn validate(&self) -> Result<(), String> {
        match &self.base_iri {
            Some(base) if base.trim().is_empty() => Err("base IRI must not be empty".to_string()),
            _ => Ok(()),
        }
    }
}

impl From<derive_builder::UninitializedFieldError> for ImportError {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        ImportError::configuration(e.to_string())
    }
}

impl From<String> for ImportError {
    fn from(msg: String) -> Self {
        ImportError::Configuration(msg)
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            base_iri: default_base_iri(),
            batch_size: BatchSize::DEFAULT,
            format: None,
        }
    }
}

impl ImportOptions {
    pub fn builder() -> ImportOptionsBuilder {
        ImportOptionsBuilder::default()
    }

    pub fn save_to_file(&self, file: &Path) -> Result<(), ImportError> {
        let options_str = serde_json::to_string_pretty(&self)
            .map_err(|e| ImportError::configuration(e.to_string()))?;
        let mut file = std::fs::File::create(file).map_err(|source| ImportError::InputAccess {
            path: file.to_path_buf(),
            source,
        })?;
        file.write_all(options_str.as_bytes())
            .map_err(|e| ImportError::configuration(e.to_string()))?;
        Ok(())
    }

    /// Loads options from JSON; missing fields take their defaults and a
    /// non-positive `batch_size` is rejected.
    pub fn from_file(file: &Path) -> Result<Self, ImportError> {
        let reader = std::fs::File::open(file)
            .map(BufReader::new)
            .map_err(|source| ImportError::InputAccess {
                path: file.to_path_buf(),
                source,
            })?;
        serde_json::from_reader(reader).map_err(|e| {
            ImportError::configuration(format!("invalid options file {:?}: {}", file, e))
        })
    }

    pub fn print(&self) {
        println!("Import options:");
        println!("  Base IRI: {}", self.base_iri);
        println!("  Batch size: {}", self.batch_size);
        match self.format {
            Some(format) => println!("  Format: {} ({})", format, format.description()),
            None => println!("  Format: from file extension"),
        }
    }
}
