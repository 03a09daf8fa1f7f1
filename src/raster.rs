//! ASCII raster parsing.
//!
//! Raster files carry a fixed number of header lines followed by rows of
//! whitespace-separated tokens. Tokens use `,` as the decimal separator and a
//! sentinel token marks cells without data. Parsing produces the flat,
//! row-major value sequence over the full grid; gap filling is a separate step
//! (see [`crate::resolver`]).

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{HydroGridError, Result};
use crate::grid::Grid;

/// How raster files are laid out on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterLayout {
    /// Lines skipped before the data rows start
    pub header_lines: usize,
    /// Literal token denoting a missing cell
    pub sentinel: String,
}

impl Default for RasterLayout {
    fn default() -> Self {
        Self {
            header_lines: 6,
            sentinel: "-9999".to_string(),
        }
    }
}

/// A parsed raster: header entries plus one optional value per cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRaster {
    header: HashMap<String, String>,
    values: Vec<Option<f64>>,
}

impl RawRaster {
    /// Flat row-major values, `None` where the sentinel was found.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Header value for `key` (case-insensitive), if the header line had one.
    pub fn header_value(&self, key: &str) -> Option<&str> {
        self.header.get(&key.to_ascii_lowercase()).map(String::as_str)
    }

    /// Check the parsed length against the grid.
    ///
    /// A longer raster is always rejected. A shorter one is rejected unless
    /// `allow_short` is set, in which case the trailing cells read as missing.
    pub fn check_geometry(&self, grid: &Grid, allow_short: bool) -> Result<()> {
        let expected = grid.cell_count();
        let found = self.values.len();
        if found == expected {
            return Ok(());
        }
        if found < expected && allow_short {
            warn!(
                expected = expected,
                found = found,
                "Raster shorter than grid, trailing cells treated as missing"
            );
            return Ok(());
        }
        Err(HydroGridError::GeometryMismatch {
            message: format!(
                "Raster has {} cells but the {}x{} grid needs {}",
                found,
                grid.width(),
                grid.height(),
                expected
            ),
        })
    }

    /// Compare `ncols`/`nrows` header entries, when present, with the grid.
    pub fn check_header_geometry(&self, grid: &Grid) -> Result<()> {
        for (key, expected) in [("ncols", grid.width()), ("nrows", grid.height())] {
            let Some(raw) = self.header_value(key) else {
                continue;
            };
            let declared: usize = raw.parse().map_err(|_| HydroGridError::GeometryMismatch {
                message: format!("Header entry {} has non-integer value {:?}", key, raw),
            })?;
            if declared != expected {
                return Err(HydroGridError::GeometryMismatch {
                    message: format!(
                        "Header declares {} = {} but the grid expects {}",
                        key, declared, expected
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Read and parse a raster file.
pub fn read_raster_file(path: &Path, layout: &RasterLayout) -> Result<RawRaster> {
    if !path.exists() {
        return Err(HydroGridError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }

    let content = std::fs::read_to_string(path)?;
    let raster = parse_raster_str(&content, path, layout)?;

    debug!(
        path = %path.display(),
        cells = raster.len(),
        missing = raster.missing_count(),
        "Parsed raster file"
    );

    Ok(raster)
}

/// Parse raster text. `path` is only used for error messages.
pub fn parse_raster_str(content: &str, path: &Path, layout: &RasterLayout) -> Result<RawRaster> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.len() < layout.header_lines {
        return Err(HydroGridError::TruncatedHeader {
            path: path.to_path_buf(),
            expected: layout.header_lines,
            lines: lines.len(),
        });
    }

    let (header_lines, data_lines) = lines.split_at(layout.header_lines);
    let header = parse_header(header_lines);

    let mut values = Vec::new();
    for (offset, line) in data_lines.iter().enumerate() {
        let line_number = layout.header_lines + offset + 1;
        for token in line.split_whitespace() {
            values.push(parse_token(token, &layout.sentinel).map_err(|message| {
                HydroGridError::Parse {
                    path: path.to_path_buf(),
                    line: line_number,
                    message,
                }
            })?);
        }
    }

    Ok(RawRaster { header, values })
}

/// Collect `key value` pairs from the header, ignoring lines of any other shape.
fn parse_header(lines: &[&str]) -> HashMap<String, String> {
    lines
        .iter()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(key), Some(value), None) => {
                    Some((key.to_ascii_lowercase(), value.replace(',', ".")))
                }
                _ => None,
            }
        })
        .collect()
}

fn parse_token(token: &str, sentinel: &str) -> std::result::Result<Option<f64>, String> {
    if token == sentinel {
        return Ok(None);
    }
    let value: f64 = token
        .replace(',', ".")
        .parse()
        .map_err(|_| format!("Invalid numeric token {:?}", token))?;
    // NaN would be indistinguishable from a valid value downstream
    if value.is_nan() {
        return Ok(None);
    }
    Ok(Some(value))
}
