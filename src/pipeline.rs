//! End-to-end preprocessing run.
//!
//! A run parses the six property rasters, fills their gaps, interpolates the
//! station drying rates and assembles the output tables. Every table is built
//! in memory before the first file is written, so a fatal error leaves the
//! output directory untouched.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::config::Config;
use crate::data_loader::{load_parameter_table, load_reference_table, ReferenceTable};
use crate::error::Result;
use crate::grid::Grid;
use crate::logging::{log_operation_end, log_operation_start, log_series_stats};
use crate::raster::read_raster_file;
use crate::resolver::{resolve_missing, ResolveStats};
use crate::series::{SoilProperty, ValueSeries};
use crate::stations::{interpolate_column, ParameterColumn, ParameterTable};
use crate::tables::{
    drying_rates_table, hydraulic_properties_table, soil_moisture_snapshot, IndexedTable,
};

/// Parse and gap-fill outcome of one property raster.
#[derive(Debug, Clone, Serialize)]
pub struct PropertyReport {
    pub property: SoilProperty,
    pub path: PathBuf,
    /// Cells read from the raster file
    pub raw_cells: usize,
    pub stats: ResolveStats,
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    /// Rows of every output table
    pub rows: usize,
    pub stations: usize,
    pub properties: Vec<PropertyReport>,
    /// Null cells left in the hydraulic-properties table
    pub hydraulic_nulls: usize,
    /// Null cells left in the drying-rates table
    pub drying_nulls: usize,
    pub written: Vec<PathBuf>,
}

/// The three output tables of a run.
#[derive(Debug, Clone)]
pub struct PipelineOutputs {
    pub hydraulic_properties: IndexedTable,
    pub drying_rates: IndexedTable,
    pub soil_moisture: IndexedTable,
}

/// Parse one property raster and re-express it over the reference index.
///
/// The returned series still contains gaps; see [`resolve_series`].
pub fn parse_property(
    config: &Config,
    grid: &Grid,
    reference: &ReferenceTable,
    property: SoilProperty,
) -> Result<(ValueSeries, usize)> {
    let path = config.raster_path(property);
    let raster = read_raster_file(&path, &config.raster_layout())?;
    if config.grid.check_header_geometry {
        raster.check_header_geometry(grid)?;
    }
    raster.check_geometry(grid, config.grid.allow_short_rasters)?;

    let series = ValueSeries::reindex(property.column_name(), raster.values(), &reference.index);
    Ok((series, raster.len()))
}

/// Fill the gaps of a parsed series in place.
pub fn resolve_series(
    series: &mut ValueSeries,
    grid: &Grid,
    reference: &ReferenceTable,
) -> ResolveStats {
    let stats = resolve_missing(series, grid, &reference.index);
    log_series_stats(series.name(), series.len(), &stats);
    stats
}

/// Interpolate every drying-rate parameter for every reference row.
pub fn interpolate_rates(
    reference: &ReferenceTable,
    parameters: &ParameterTable,
) -> Vec<(ParameterColumn, Vec<f64>)> {
    ParameterColumn::ALL
        .iter()
        .map(|&column| {
            let values = interpolate_column(&reference.assignments, parameters, column);
            (column, values)
        })
        .collect()
}

/// Assemble the output tables from resolved series and interpolated rates.
pub fn assemble_outputs(
    config: &Config,
    grid: &Grid,
    reference: &ReferenceTable,
    series: &[ValueSeries],
    rates: &[(ParameterColumn, Vec<f64>)],
) -> Result<PipelineOutputs> {
    let hydraulic_properties = hydraulic_properties_table(&reference.index, grid, series)?;
    let drying_rates = drying_rates_table(&reference.index, grid, rates, series)?;

    let soil_moisture =
        soil_moisture_snapshot(&reference.index, grid, series, config.snapshot_timestamp()?)?;

    Ok(PipelineOutputs {
        hydraulic_properties,
        drying_rates,
        soil_moisture,
    })
}

/// Load inputs and compute all output tables without touching the output directory.
pub fn build_outputs(config: &Config) -> Result<(PipelineOutputs, PipelineReport)> {
    let grid = config.grid()?;
    let reference = load_reference_table(
        &config.inputs.reference_table,
        &config.inputs.index_column,
        &grid,
    )?;

    let mut report = PipelineReport {
        rows: reference.len(),
        ..Default::default()
    };

    let mut series = Vec::with_capacity(SoilProperty::ALL.len());
    for property in SoilProperty::ALL {
        let start = Instant::now();
        log_operation_start("parse_raster", Some(property.column_name()));

        let (mut parsed, raw_cells) = parse_property(config, &grid, &reference, property)?;
        let stats = resolve_series(&mut parsed, &grid, &reference);

        log_operation_end("parse_raster", start, stats.unresolved == 0);
        report.properties.push(PropertyReport {
            property,
            path: config.raster_path(property),
            raw_cells,
            stats,
        });
        series.push(parsed);
    }

    let parameters = load_parameter_table(
        &config.inputs.parameter_table,
        &config.inputs.station_column,
    )?;
    report.stations = parameters.len();

    let rates = interpolate_rates(&reference, &parameters);
    let outputs = assemble_outputs(config, &grid, &reference, &series, &rates)?;

    report.hydraulic_nulls = outputs.hydraulic_properties.null_count();
    report.drying_nulls = outputs.drying_rates.null_count();

    Ok((outputs, report))
}

/// Run the whole pipeline and write the three output tables.
pub fn run(config: &Config) -> Result<PipelineReport> {
    let start = Instant::now();
    log_operation_start("pipeline", None);

    let (outputs, mut report) = build_outputs(config)?;

    let targets = [
        (&outputs.hydraulic_properties, config.hydraulic_properties_path()),
        (&outputs.drying_rates, config.drying_rates_path()),
        (&outputs.soil_moisture, config.snapshot_path()),
    ];
    for (table, path) in targets {
        table.write_ipc(&path)?;
        report.written.push(path);
    }

    info!(
        rows = report.rows,
        stations = report.stations,
        hydraulic_nulls = report.hydraulic_nulls,
        drying_nulls = report.drying_nulls,
        "Pipeline finished"
    );
    log_operation_end(
        "pipeline",
        start,
        report.hydraulic_nulls == 0 && report.drying_nulls == 0,
    );

    Ok(report)
}
