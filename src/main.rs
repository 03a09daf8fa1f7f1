//! hydrogrid - soil-property raster preprocessing
//!
//! Parses the property rasters, fills their gaps, interpolates station drying
//! rates and writes the output tables.

use tracing::{error, info};

use hydrogrid::{init_tracing, log_error, log_timed_operation, Config, HydroGridError, Result};

fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;
    init_tracing(&config.log_level);

    info!("Starting hydrogrid v{}", env!("CARGO_PKG_VERSION"));

    // Validate configuration
    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    if let Some(workers) = config.workers {
        rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .build_global()
            .map_err(|e| HydroGridError::Config {
                message: format!("Failed to configure worker pool: {}", e),
            })?;
    }

    info!(
        width = config.grid.width,
        height = config.grid.height,
        reference = %config.inputs.reference_table.display(),
        "Processing rasters"
    );

    let report = log_timed_operation("pipeline", || hydrogrid::run(&config)).map_err(|e| {
        log_error(&e, "pipeline run");
        e
    })?;

    for property in &report.properties {
        info!(
            property = property.property.column_name(),
            raw_cells = property.raw_cells,
            filled = property.stats.filled,
            unresolved = property.stats.unresolved,
            "Property summary"
        );
    }
    for path in &report.written {
        info!("Wrote {}", path.display());
    }

    Ok(())
}
