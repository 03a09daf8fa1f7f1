//! # hydrogrid
//!
//! Gap-filling and station-weighted interpolation of gridded soil-property
//! rasters.
//!
//! The crate turns fixed-geometry ASCII rasters and a per-station parameter
//! table into dense tables keyed by a reference spatial index.
//!
//! ## Stages
//!
//! - **Parsing**: [`raster`] reads a raster into a flat, row-major series
//! - **Gap filling**: [`resolver`] replaces missing cells by expanding-square search
//! - **Interpolation**: [`stations`] derives drying rates from up to three weighted stations
//! - **Assembly**: [`pipeline`] runs the stages and [`tables`] writes Arrow IPC files

pub mod config;
pub mod data_loader;
pub mod error;
pub mod grid;
pub mod logging;
pub mod pipeline;
pub mod raster;
pub mod resolver;
pub mod series;
pub mod stations;
pub mod tables;

pub use config::Config;
pub use error::{HydroGridError, Result};
pub use grid::Grid;
pub use logging::{
    generate_run_id, init_tracing, log_error, log_operation_end, log_operation_start,
    log_series_stats, log_timed_operation,
};
pub use pipeline::{run, PipelineReport};
pub use series::{ReferenceIndex, SoilProperty, ValueSeries};
pub use stations::{ParameterColumn, ParameterTable, StationAssignment, StationId};
