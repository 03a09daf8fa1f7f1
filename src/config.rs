//! Configuration management for hydrogrid.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use chrono::{NaiveDate, NaiveDateTime};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{HydroGridError, Result};
use crate::grid::Grid;
use crate::raster::RasterLayout;
use crate::series::SoilProperty;

/// Command-line arguments for hydrogrid
#[derive(Parser, Debug, Default)]
#[command(name = "hydrogrid")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to JSON configuration file
    #[arg(short, long, env = "HYDROGRID_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory holding the six property rasters
    #[arg(short, long, env = "HYDROGRID_INPUT_DIR")]
    pub input_dir: Option<PathBuf>,

    /// Reference spatial index (Arrow IPC file)
    #[arg(short, long, env = "HYDROGRID_REFERENCE")]
    pub reference: Option<PathBuf>,

    /// Station parameter table (CSV)
    #[arg(short, long, env = "HYDROGRID_PARAMETERS")]
    pub parameters: Option<PathBuf>,

    /// Root directory for output tables
    #[arg(short, long, env = "HYDROGRID_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long, env = "HYDROGRID_WORKERS")]
    pub workers: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "HYDROGRID_LOG_LEVEL")]
    pub log_level: Option<String>,
}

/// Raster geometry and file layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridConfig {
    /// Columns per raster row
    #[serde(default = "default_width")]
    pub width: usize,

    /// Rows per raster
    #[serde(default = "default_height")]
    pub height: usize,

    /// Header lines preceding the data rows
    #[serde(default = "default_header_lines")]
    pub header_lines: usize,

    /// Token marking a cell without data
    #[serde(default = "default_sentinel")]
    pub sentinel: String,

    /// Accept rasters with fewer cells than the grid, reading the tail as missing
    #[serde(default)]
    pub allow_short_rasters: bool,

    /// Validate `ncols`/`nrows` header entries against the grid
    #[serde(default)]
    pub check_header_geometry: bool,
}

/// Raster file names, relative to the raster directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterFiles {
    #[serde(default = "default_wilting_point")]
    pub wilting_point: PathBuf,
    #[serde(default = "default_field_capacity")]
    pub field_capacity: PathBuf,
    #[serde(default = "default_total_capacity")]
    pub total_capacity: PathBuf,
    #[serde(default = "default_dry_threshold")]
    pub dry_threshold: PathBuf,
    #[serde(default = "default_intermediate_threshold")]
    pub intermediate_threshold: PathBuf,
    #[serde(default = "default_wet_threshold")]
    pub wet_threshold: PathBuf,
}

/// Input locations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputConfig {
    /// Directory holding the property rasters
    #[serde(default = "default_raster_dir")]
    pub raster_dir: PathBuf,

    #[serde(default)]
    pub rasters: RasterFiles,

    /// Reference spatial index (Arrow IPC file)
    #[serde(default = "default_reference_table")]
    pub reference_table: PathBuf,

    /// Column of the reference table holding flat cell indices
    #[serde(default = "default_index_column")]
    pub index_column: String,

    /// Station parameter table (CSV)
    #[serde(default = "default_parameter_table")]
    pub parameter_table: PathBuf,

    /// Column of the parameter table holding station codes
    #[serde(default = "default_station_column")]
    pub station_column: String,
}

/// Output locations and snapshot labelling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Root output directory
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    /// Date of the soil-moisture snapshot
    #[serde(default = "default_snapshot_date")]
    pub snapshot_date: NaiveDate,

    /// Hour of the soil-moisture snapshot (0-23)
    #[serde(default = "default_snapshot_hour")]
    pub snapshot_hour: u32,
}

/// Complete configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub grid: GridConfig,

    #[serde(default)]
    pub inputs: InputConfig,

    #[serde(default)]
    pub output: OutputConfig,

    /// Number of worker threads (None = number of CPU cores)
    #[serde(default)]
    pub workers: Option<usize>,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<Self> {
        Self::from_args(Args::parse())
    }

    /// Build a configuration from already-parsed arguments
    pub fn from_args(args: Args) -> Result<Self> {
        // Start with defaults, replaced wholesale by a JSON file if provided
        let mut config = match &args.config {
            Some(config_path) => Self::load_from_file(config_path)?,
            None => Config::default(),
        };

        // Override with command-line arguments
        if let Some(input_dir) = args.input_dir {
            config.inputs.raster_dir = input_dir;
        }
        if let Some(reference) = args.reference {
            config.inputs.reference_table = reference;
        }
        if let Some(parameters) = args.parameters {
            config.inputs.parameter_table = parameters;
        }
        if let Some(output_dir) = args.output_dir {
            config.output.dir = output_dir;
        }
        if args.workers.is_some() {
            config.workers = args.workers;
        }
        if let Some(log_level) = args.log_level {
            config.log_level = log_level;
        }

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.grid.width == 0 || self.grid.height == 0 {
            return Err(HydroGridError::Config {
                message: format!(
                    "Grid dimensions must be positive, got {}x{}",
                    self.grid.width, self.grid.height
                ),
            });
        }

        if self.grid.sentinel.trim().is_empty() {
            return Err(HydroGridError::Config {
                message: "Sentinel token cannot be empty".to_string(),
            });
        }

        if self.inputs.index_column.is_empty() || self.inputs.station_column.is_empty() {
            return Err(HydroGridError::Config {
                message: "Index and station column names cannot be empty".to_string(),
            });
        }

        if self.output.snapshot_hour > 23 {
            return Err(HydroGridError::Config {
                message: format!(
                    "Invalid snapshot hour: {}. Must be between 0 and 23",
                    self.output.snapshot_hour
                ),
            });
        }

        if self.workers == Some(0) {
            return Err(HydroGridError::Config {
                message: "Worker count cannot be 0".to_string(),
            });
        }

        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(HydroGridError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        Ok(())
    }

    /// Raster geometry
    pub fn grid(&self) -> Result<Grid> {
        Grid::new(self.grid.width, self.grid.height)
    }

    /// Raster file layout
    pub fn raster_layout(&self) -> RasterLayout {
        RasterLayout {
            header_lines: self.grid.header_lines,
            sentinel: self.grid.sentinel.clone(),
        }
    }

    /// Full path of the raster for `property`
    pub fn raster_path(&self, property: SoilProperty) -> PathBuf {
        let files = &self.inputs.rasters;
        let name = match property {
            SoilProperty::WiltingPoint => &files.wilting_point,
            SoilProperty::FieldCapacity => &files.field_capacity,
            SoilProperty::TotalCapacity => &files.total_capacity,
            SoilProperty::DryThreshold => &files.dry_threshold,
            SoilProperty::IntermediateThreshold => &files.intermediate_threshold,
            SoilProperty::WetThreshold => &files.wet_threshold,
        };
        self.inputs.raster_dir.join(name)
    }

    /// Timestamp labelling the soil-moisture snapshot
    pub fn snapshot_timestamp(&self) -> Result<NaiveDateTime> {
        self.output
            .snapshot_date
            .and_hms_opt(self.output.snapshot_hour, 0, 0)
            .ok_or_else(|| HydroGridError::Config {
                message: format!("Invalid snapshot hour: {}", self.output.snapshot_hour),
            })
    }

    pub fn hydraulic_properties_path(&self) -> PathBuf {
        self.output
            .dir
            .join("static")
            .join("propiedades_hidricas_downsampled.arrow")
    }

    pub fn drying_rates_path(&self) -> PathBuf {
        self.output
            .dir
            .join("static")
            .join("tasas_secado_downsampled.arrow")
    }

    /// `dynamic/soil_moisture/<MM-YYYY>/<DD-MM-YYYY>/<HH>.arrow` under the output root
    pub fn snapshot_path(&self) -> PathBuf {
        let date = self.output.snapshot_date;
        self.output
            .dir
            .join("dynamic")
            .join("soil_moisture")
            .join(date.format("%m-%Y").to_string())
            .join(date.format("%d-%m-%Y").to_string())
            .join(format!("{:02}.arrow", self.output.snapshot_hour))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            inputs: InputConfig::default(),
            output: OutputConfig::default(),
            workers: None,
            log_level: default_log_level(),
        }
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: default_width(),
            height: default_height(),
            header_lines: default_header_lines(),
            sentinel: default_sentinel(),
            allow_short_rasters: false,
            check_header_geometry: false,
        }
    }
}

impl Default for RasterFiles {
    fn default() -> Self {
        Self {
            wilting_point: default_wilting_point(),
            field_capacity: default_field_capacity(),
            total_capacity: default_total_capacity(),
            dry_threshold: default_dry_threshold(),
            intermediate_threshold: default_intermediate_threshold(),
            wet_threshold: default_wet_threshold(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            raster_dir: default_raster_dir(),
            rasters: RasterFiles::default(),
            reference_table: default_reference_table(),
            index_column: default_index_column(),
            parameter_table: default_parameter_table(),
            station_column: default_station_column(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            snapshot_date: default_snapshot_date(),
            snapshot_hour: default_snapshot_hour(),
        }
    }
}

// Default value functions for serde
fn default_width() -> usize {
    13901
}

fn default_height() -> usize {
    6715
}

fn default_header_lines() -> usize {
    6
}

fn default_sentinel() -> String {
    "-9999".to_string()
}

fn default_wilting_point() -> PathBuf {
    SoilProperty::WiltingPoint.default_file_name().into()
}

fn default_field_capacity() -> PathBuf {
    SoilProperty::FieldCapacity.default_file_name().into()
}

fn default_total_capacity() -> PathBuf {
    SoilProperty::TotalCapacity.default_file_name().into()
}

fn default_dry_threshold() -> PathBuf {
    SoilProperty::DryThreshold.default_file_name().into()
}

fn default_intermediate_threshold() -> PathBuf {
    SoilProperty::IntermediateThreshold.default_file_name().into()
}

fn default_wet_threshold() -> PathBuf {
    SoilProperty::WetThreshold.default_file_name().into()
}

fn default_raster_dir() -> PathBuf {
    PathBuf::from("input")
}

fn default_reference_table() -> PathBuf {
    PathBuf::from("referencia/idw_referencia.arrow")
}

fn default_index_column() -> String {
    "index".to_string()
}

fn default_parameter_table() -> PathBuf {
    PathBuf::from("input/parametros_moises.csv")
}

fn default_station_column() -> String {
    "Cod".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("output")
}

fn default_snapshot_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 4, 30).unwrap_or_default()
}

fn default_snapshot_hour() -> u32 {
    23
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.grid.width, 13901);
        assert_eq!(config.grid.height, 6715);
        assert_eq!(config.grid.header_lines, 6);
        assert_eq!(config.grid.sentinel, "-9999");
        assert_eq!(config.inputs.station_column, "Cod");
        assert_eq!(config.output.snapshot_hour, 23);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_raster_paths() {
        let config = Config::default();
        assert_eq!(
            config.raster_path(SoilProperty::WiltingPoint),
            PathBuf::from("input/punto_marchitez.txt")
        );
        assert_eq!(
            config.raster_path(SoilProperty::TotalCapacity),
            PathBuf::from("input/capacidad_total.txt")
        );
    }

    #[test]
    fn test_output_paths() {
        let config = Config::default();
        assert_eq!(
            config.hydraulic_properties_path(),
            PathBuf::from("output/static/propiedades_hidricas_downsampled.arrow")
        );
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("output/dynamic/soil_moisture/04-2023/30-04-2023/23.arrow")
        );
        assert_eq!(
            config.snapshot_timestamp().unwrap().to_string(),
            "2023-04-30 23:00:00"
        );
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"grid": {{"width": 2, "height": 3}}, "output": {{"snapshot_date": "2024-01-05", "snapshot_hour": 6}}}}"#
        )
        .unwrap();

        let config = Config::load_from_file(file.path()).unwrap();
        assert_eq!(config.grid.width, 2);
        assert_eq!(config.grid.height, 3);
        assert_eq!(config.grid.header_lines, 6);
        assert_eq!(
            config.snapshot_path(),
            PathBuf::from("output/dynamic/soil_moisture/01-2024/05-01-2024/06.arrow")
        );
    }

    #[test]
    fn test_args_override_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"workers": 2, "log_level": "debug"}}"#).unwrap();

        let args = Args {
            config: Some(file.path().to_path_buf()),
            output_dir: Some(PathBuf::from("/tmp/out")),
            workers: Some(8),
            ..Default::default()
        };
        let config = Config::from_args(args).unwrap();

        assert_eq!(config.workers, Some(8));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.output.dir, PathBuf::from("/tmp/out"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        config.grid.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.snapshot_hour = 24;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.workers = Some(0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.grid.sentinel = " ".to_string();
        assert!(config.validate().is_err());
    }
}
