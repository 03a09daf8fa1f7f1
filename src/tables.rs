//! Output tables and their Arrow IPC encoding.
//!
//! Every table is keyed by the reference index: an `index` column (UInt64)
//! followed by nullable Float64 value columns. Cells that could not be filled
//! are written as nulls rather than a default value.

use arrow::array::{ArrayRef, Float64Array, UInt64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow_ipc::writer::FileWriter;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{HydroGridError, Result};
use crate::grid::Grid;
use crate::series::{ReferenceIndex, SoilProperty, ValueSeries};
use crate::stations::ParameterColumn;

/// Name of the key column shared by all output tables.
pub const INDEX_COLUMN: &str = "index";

/// Value column of the soil-moisture snapshot.
pub const SOIL_MOISTURE_COLUMN: &str = "soil_moisture";

/// Column order of the hydraulic-properties table.
pub const HYDRAULIC_PROPERTIES: [SoilProperty; 4] = [
    SoilProperty::DryThreshold,
    SoilProperty::IntermediateThreshold,
    SoilProperty::WetThreshold,
    SoilProperty::TotalCapacity,
];

/// Raster-derived columns appended to the drying-rates table.
pub const DRYING_RATE_PROPERTIES: [SoilProperty; 3] = [
    SoilProperty::WiltingPoint,
    SoilProperty::FieldCapacity,
    SoilProperty::TotalCapacity,
];

/// A named column of optional values.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Column holding a fully populated derived quantity.
    pub fn dense(name: impl Into<String>, values: Vec<f64>) -> Self {
        Self::new(name, values.into_iter().map(Some).collect())
    }

    pub fn from_series(series: &ValueSeries) -> Self {
        Self::new(series.name(), series.values().to_vec())
    }

    pub fn null_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// A table keyed by the reference index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedTable {
    index: Vec<usize>,
    columns: Vec<Column>,
    metadata: HashMap<String, String>,
}

impl IndexedTable {
    /// Assemble a table, checking that every column matches the index length.
    pub fn new(reference: &ReferenceIndex, columns: Vec<Column>) -> Result<Self> {
        for column in &columns {
            if column.values.len() != reference.len() {
                return Err(HydroGridError::GeometryMismatch {
                    message: format!(
                        "Column {} has {} values but the reference index has {} rows",
                        column.name,
                        column.values.len(),
                        reference.len()
                    ),
                });
            }
        }
        Ok(Self {
            index: reference.indices().to_vec(),
            columns,
            metadata: HashMap::new(),
        })
    }

    /// Attach a schema-level metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn num_rows(&self) -> usize {
        self.index.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|column| column.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }

    /// Total number of null cells across all value columns.
    pub fn null_count(&self) -> usize {
        self.columns.iter().map(Column::null_count).sum()
    }

    /// Encode as a single Arrow record batch.
    pub fn to_record_batch(&self) -> Result<RecordBatch> {
        let mut fields = vec![Field::new(INDEX_COLUMN, DataType::UInt64, false)];
        fields.extend(
            self.columns
                .iter()
                .map(|column| Field::new(&column.name, DataType::Float64, true)),
        );
        let schema = Arc::new(Schema::new(fields).with_metadata(self.metadata.clone()));

        let mut arrays: Vec<ArrayRef> = Vec::with_capacity(self.columns.len() + 1);
        arrays.push(Arc::new(UInt64Array::from_iter_values(
            self.index.iter().map(|&index| index as u64),
        )));
        for column in &self.columns {
            arrays.push(Arc::new(Float64Array::from(column.values.clone())));
        }

        debug!(
            rows = self.num_rows(),
            columns = self.columns.len(),
            "Creating Arrow record batch"
        );

        Ok(RecordBatch::try_new(schema, arrays)?)
    }

    /// Write the table as an Arrow IPC file, creating parent directories.
    pub fn write_ipc(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let batch = self.to_record_batch()?;
        let mut writer = FileWriter::try_new(File::create(path)?, &batch.schema())?;
        writer.write(&batch)?;
        writer.finish()?;

        info!(
            path = %path.display(),
            rows = self.num_rows(),
            columns = %self.column_names().join(", "),
            nulls = self.null_count(),
            "Wrote table"
        );

        Ok(())
    }
}

fn grid_metadata(table: IndexedTable, grid: &Grid) -> IndexedTable {
    table
        .with_metadata("grid_width", grid.width().to_string())
        .with_metadata("grid_height", grid.height().to_string())
}

fn series_for<'a>(series: &'a [ValueSeries], property: SoilProperty) -> Result<&'a ValueSeries> {
    series
        .iter()
        .find(|s| s.name() == property.column_name())
        .ok_or_else(|| HydroGridError::GeometryMismatch {
            message: format!("No series for {}", property.column_name()),
        })
}

/// Dry, intermediate and wet thresholds plus total capacity.
pub fn hydraulic_properties_table(
    reference: &ReferenceIndex,
    grid: &Grid,
    series: &[ValueSeries],
) -> Result<IndexedTable> {
    let columns = HYDRAULIC_PROPERTIES
        .iter()
        .map(|&property| series_for(series, property).map(Column::from_series))
        .collect::<Result<Vec<_>>>()?;
    Ok(grid_metadata(IndexedTable::new(reference, columns)?, grid))
}

/// Interpolated drying rates followed by wilting point, field capacity and
/// total capacity.
pub fn drying_rates_table(
    reference: &ReferenceIndex,
    grid: &Grid,
    rates: &[(ParameterColumn, Vec<f64>)],
    series: &[ValueSeries],
) -> Result<IndexedTable> {
    let mut columns: Vec<Column> = rates
        .iter()
        .map(|(parameter, values)| Column::dense(parameter.output_name(), values.clone()))
        .collect();
    for property in DRYING_RATE_PROPERTIES {
        columns.push(Column::from_series(series_for(series, property)?));
    }
    Ok(grid_metadata(IndexedTable::new(reference, columns)?, grid))
}

/// Initial soil moisture (the wilting point) labelled with its timestamp.
pub fn soil_moisture_snapshot(
    reference: &ReferenceIndex,
    grid: &Grid,
    series: &[ValueSeries],
    timestamp: NaiveDateTime,
) -> Result<IndexedTable> {
    let wilting_point = series_for(series, SoilProperty::WiltingPoint)?;
    let column = Column::new(SOIL_MOISTURE_COLUMN, wilting_point.values().to_vec());
    let table = IndexedTable::new(reference, vec![column])?
        .with_metadata("timestamp", timestamp.format("%Y-%m-%dT%H:%M:%S").to_string());
    Ok(grid_metadata(table, grid))
}
