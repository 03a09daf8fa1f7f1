//! Error types for hydrogrid.
//!
//! Every fatal condition of a pipeline run maps to one variant here. Conditions
//! that the pipeline tolerates (a gap with no valid neighbour, a station code
//! missing from the parameter table) are not errors and never reach this enum.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for hydrogrid operations.
#[derive(Error, Debug)]
pub enum HydroGridError {
    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow table read/write errors
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow_schema::ArrowError),

    /// CSV decoding errors
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Malformed token in a raster file
    #[error("Parse error in {path:?} at line {line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    /// Raster file ends before its header does
    #[error("Truncated header in {path:?}: expected {expected} header lines, found {lines}")]
    TruncatedHeader {
        path: PathBuf,
        expected: usize,
        lines: usize,
    },

    /// Raster or index extent does not agree with the configured grid
    #[error("Geometry mismatch: {message}")]
    GeometryMismatch { message: String },

    /// Invalid reference spatial index table
    #[error("Reference table error: {message}")]
    ReferenceTable { message: String },

    /// Invalid station parameter table
    #[error("Parameter table error: {message}")]
    ParameterTable { message: String },
}

/// Convenience type alias for Results with HydroGridError
pub type Result<T> = std::result::Result<T, HydroGridError>;
