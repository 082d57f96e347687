//! Manifest parsing from JSON and YAML documents

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::types::Manifest;
use crate::Result;

/// Errors raised while reading or parsing a manifest document
#[derive(Error, Debug)]
pub enum ManifestError {
    /// The manifest file could not be read
    #[error("failed to read manifest {}: {source}", .path.display())]
    Io {
        /// Manifest path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The document is not valid JSON for a manifest
    #[error("invalid JSON manifest: {0}")]
    Json(#[from] serde_json::Error),

    /// The document is not valid YAML for a manifest
    #[error("invalid YAML manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Document encodings accepted by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// JSON document
    Json,
    /// YAML document
    Yaml,
}

impl ManifestFormat {
    /// Pick a format from a file extension; anything but `.json` is read as YAML
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ManifestFormat::Json,
            _ => ManifestFormat::Yaml,
        }
    }
}

impl Manifest {
    /// Parse a JSON manifest. Defaults are not applied.
    pub fn from_json_str(input: &str) -> std::result::Result<Self, ManifestError> {
        Ok(serde_json::from_str(input)?)
    }

    /// Parse a YAML manifest. Defaults are not applied.
    pub fn from_yaml_str(input: &str) -> std::result::Result<Self, ManifestError> {
        Ok(serde_yaml::from_str(input)?)
    }

    /// Parse a manifest in the given format
    pub fn parse(input: &str, format: ManifestFormat) -> std::result::Result<Self, ManifestError> {
        match format {
            ManifestFormat::Json => Self::from_json_str(input),
            ManifestFormat::Yaml => Self::from_yaml_str(input),
        }
    }

    /// Read and parse a manifest file, choosing the format by extension
    pub fn from_path(path: impl AsRef<Path>) -> std::result::Result<Self, ManifestError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let format = ManifestFormat::from_path(path);
        debug!(path = %path.display(), ?format, "Parsing manifest");
        Self::parse(&contents, format)
    }

    /// Read, parse, default and validate a manifest file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut manifest = Self::from_path(path)?;
        manifest.prepare()?;
        Ok(manifest)
    }
}
