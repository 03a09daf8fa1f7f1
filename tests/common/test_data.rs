//! Test data generation utilities.
//!
//! This module writes raster, reference and parameter fixtures into a
//! directory and reads output tables back for assertions.

use arrow::array::{Array, ArrayRef, AsArray, Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Float64Type, Schema, UInt64Type};
use arrow::record_batch::RecordBatch;
use arrow_ipc::reader::FileReader;
use arrow_ipc::writer::FileWriter;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use hydrogrid::{Config, SoilProperty};

/// One row of the reference table: flat index, station codes, weights.
pub type ReferenceRow = (i64, [Option<f64>; 3], [Option<f64>; 3]);

/// Write an ESRI-style ASCII raster with a six-line header.
pub fn write_raster(path: &Path, width: usize, height: usize, rows: &[&str]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "ncols {}", width)?;
    writeln!(file, "nrows {}", height)?;
    writeln!(file, "xllcorner 0")?;
    writeln!(file, "yllcorner 0")?;
    writeln!(file, "cellsize 1000")?;
    writeln!(file, "NODATA_value -9999")?;
    for row in rows {
        writeln!(file, "{}", row)?;
    }
    Ok(())
}

/// Write the reference table as an Arrow IPC file, station codes stored as floats.
pub fn write_reference(path: &Path, rows: &[ReferenceRow]) -> arrow::error::Result<()> {
    let mut fields = vec![Field::new("index", DataType::Int64, false)];
    let mut columns: Vec<ArrayRef> = vec![Arc::new(Int64Array::from_iter_values(
        rows.iter().map(|row| row.0),
    ))];
    for slot in 0..3 {
        fields.push(Field::new(format!("est_{}", slot + 1), DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(
            rows.iter().map(|row| row.1[slot]).collect::<Vec<_>>(),
        )));
        fields.push(Field::new(format!("peso_{}", slot + 1), DataType::Float64, true));
        columns.push(Arc::new(Float64Array::from(
            rows.iter().map(|row| row.2[slot]).collect::<Vec<_>>(),
        )));
    }

    let schema = Arc::new(Schema::new(fields));
    let batch = RecordBatch::try_new(schema.clone(), columns)?;
    let file = File::create(path).map_err(|e| arrow::error::ArrowError::IoError(e.to_string(), e))?;
    let mut writer = FileWriter::try_new(file, &schema)?;
    writer.write(&batch)?;
    writer.finish()?;
    Ok(())
}

/// Write the station parameter table as CSV.
pub fn write_parameters(path: &Path, rows: &[(&str, &str, f64, f64, f64)]) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    writeln!(file, "Cod,Nombre,Hasta CC,Tras CC,Por debajo PtoM")?;
    for (code, name, until_fc, after_fc, below_wp) in rows {
        writeln!(file, "{},{},{},{},{}", code, name, until_fc, after_fc, below_wp)?;
    }
    Ok(())
}

/// Configuration pointing every input and output into `root`.
pub fn config_for(root: &Path, width: usize, height: usize) -> Config {
    let mut config = Config::default();
    config.grid.width = width;
    config.grid.height = height;
    config.inputs.raster_dir = root.join("input");
    config.inputs.reference_table = root.join("referencia").join("idw_referencia.arrow");
    config.inputs.parameter_table = root.join("input").join("parametros.csv");
    config.output.dir = root.join("output");
    config
}

/// Create the input directories used by [`config_for`].
pub fn create_input_dirs(root: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(root.join("input"))?;
    std::fs::create_dir_all(root.join("referencia"))?;
    Ok(())
}

/// Path of the raster for `property` under `config`.
pub fn raster_path(config: &Config, property: SoilProperty) -> PathBuf {
    config.raster_path(property)
}

/// An output table read back from disk.
pub struct TableContents {
    pub index: Vec<u64>,
    pub columns: Vec<String>,
    pub values: HashMap<String, Vec<Option<f64>>>,
    pub metadata: HashMap<String, String>,
}

/// Read an Arrow IPC output table.
pub fn read_table(path: &Path) -> arrow::error::Result<TableContents> {
    let file = File::open(path).map_err(|e| arrow::error::ArrowError::IoError(e.to_string(), e))?;
    let reader = FileReader::try_new(file, None)?;
    let schema = reader.schema();

    let mut contents = TableContents {
        index: Vec::new(),
        columns: schema.fields().iter().skip(1).map(|f| f.name().clone()).collect(),
        values: HashMap::new(),
        metadata: schema.metadata().clone(),
    };

    for batch in reader {
        let batch = batch?;
        contents
            .index
            .extend(batch.column(0).as_primitive::<UInt64Type>().values().iter());
        for (i, field) in schema.fields().iter().enumerate().skip(1) {
            let column = batch.column(i).as_primitive::<Float64Type>();
            let values = contents.values.entry(field.name().clone()).or_default();
            values.extend((0..column.len()).map(|row| {
                if column.is_null(row) {
                    None
                } else {
                    Some(column.value(row))
                }
            }));
        }
    }

    Ok(contents)
}
