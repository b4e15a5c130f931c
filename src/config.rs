//! Configuration for ingestion and querying.
//!
//! Every field has a default, so an absent or partial JSON file is fine.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::query::SortSpec;

/// Rows from a section's nominal start to its first data row when the start
/// row carries values (a sub-header).
pub const HEADER_SKIP_ROWS: usize = 1;

/// Rows to skip when the start row is itself a college marker: the marker,
/// then the repeated column header under it.
pub const MARKER_SKIP_ROWS: usize = 2;

/// Summary rows (totals, blank spacer, notes) closing every section.
pub const FOOTER_ROWS: usize = 4;

/// The college of the rows preceding the first marker row.
pub const DEFAULT_COLLEGE: &str = "College of Agriculture & Life Sciences";

/// Positional layout of the vendor's report export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_college")]
    pub default_college: String,

    #[serde(default = "default_header_skip")]
    pub header_skip_rows: usize,

    #[serde(default = "default_marker_skip")]
    pub marker_skip_rows: usize,

    #[serde(default = "default_footer_rows")]
    pub footer_rows: usize,
}

fn default_college() -> String {
    DEFAULT_COLLEGE.to_string()
}

fn default_header_skip() -> usize {
    HEADER_SKIP_ROWS
}

fn default_marker_skip() -> usize {
    MARKER_SKIP_ROWS
}

fn default_footer_rows() -> usize {
    FOOTER_ROWS
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            default_college: default_college(),
            header_skip_rows: default_header_skip(),
            marker_skip_rows: default_marker_skip(),
            footer_rows: default_footer_rows(),
        }
    }
}

/// How a batch of raw reports is processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Normalize files on the rayon pool.
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
        }
    }
}

/// Defaults applied to dashboard queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Used when a query carries no sort keys.
    #[serde(default = "default_sort")]
    pub default_sort: Vec<SortSpec>,
}

fn default_page_size() -> usize {
    40
}

fn default_sort() -> Vec<SortSpec> {
    vec![SortSpec::asc("Major")]
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_sort: default_sort(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub query: QueryConfig,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Load from `path` when given, defaults otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_json_file(p),
            None => Ok(Self::default()),
        }
    }
}
