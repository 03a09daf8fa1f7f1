//! Loading of the reference spatial index and the station parameter table.
//!
//! The reference table is an Arrow IPC file with one row per reference cell:
//! the flat cell index, three station codes (`est_1..est_3`) and three weights
//! (`peso_1..peso_3`). The parameter table is a CSV file with one row per
//! station.

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{DataType, Float64Type, Int64Type, UInt64Type};
use arrow::record_batch::RecordBatch;
use arrow_ipc::reader::FileReader;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

use crate::error::{HydroGridError, Result};
use crate::grid::Grid;
use crate::series::ReferenceIndex;
use crate::stations::{
    ParameterColumn, ParameterTable, StationAssignment, StationId, StationParameters,
};

/// Station code columns of the reference table.
pub const STATION_COLUMNS: [&str; 3] = ["est_1", "est_2", "est_3"];

/// Weight columns of the reference table.
pub const WEIGHT_COLUMNS: [&str; 3] = ["peso_1", "peso_2", "peso_3"];

/// The reference index plus the station assignment of every reference cell.
#[derive(Debug, Clone)]
pub struct ReferenceTable {
    pub index: ReferenceIndex,
    /// One assignment per reference row, in index order
    pub assignments: Vec<StationAssignment>,
}

impl ReferenceTable {
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

fn ensure_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(HydroGridError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("File not found: {}", path.display()),
        )));
    }
    Ok(())
}

/// Load the reference table from an Arrow IPC file.
pub fn load_reference_table(path: &Path, index_column: &str, grid: &Grid) -> Result<ReferenceTable> {
    ensure_exists(path)?;

    let reader = FileReader::try_new(File::open(path)?, None)?;
    debug!(
        path = %path.display(),
        fields = reader.schema().fields().len(),
        batches = reader.num_batches(),
        "Opened reference table"
    );

    let mut indices = Vec::new();
    let mut assignments = Vec::new();
    for batch in reader {
        let batch = batch?;
        let (batch_indices, batch_assignments) = read_reference_batch(&batch, index_column)?;
        indices.extend(batch_indices);
        assignments.extend(batch_assignments);
    }

    let index = ReferenceIndex::new(indices, grid)?;

    info!(
        path = %path.display(),
        rows = index.len(),
        "Loaded reference table"
    );

    Ok(ReferenceTable { index, assignments })
}

/// Decode the index and station assignments of one record batch.
pub fn read_reference_batch(
    batch: &RecordBatch,
    index_column: &str,
) -> Result<(Vec<usize>, Vec<StationAssignment>)> {
    let indices = index_values(required_column(batch, index_column)?, index_column)?;

    let mut stations = Vec::with_capacity(3);
    for name in STATION_COLUMNS {
        stations.push(station_values(required_column(batch, name)?, name)?);
    }
    let mut weights = Vec::with_capacity(3);
    for name in WEIGHT_COLUMNS {
        weights.push(weight_values(required_column(batch, name)?, name)?);
    }

    let assignments = (0..batch.num_rows())
        .map(|row| {
            StationAssignment::new(
                [
                    stations[0][row].clone(),
                    stations[1][row].clone(),
                    stations[2][row].clone(),
                ],
                [weights[0][row], weights[1][row], weights[2][row]],
            )
        })
        .collect();

    Ok((indices, assignments))
}

fn required_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a ArrayRef> {
    batch
        .column_by_name(name)
        .ok_or_else(|| HydroGridError::ReferenceTable {
            message: format!("Missing column {}", name),
        })
}

fn index_values(array: &ArrayRef, name: &str) -> Result<Vec<usize>> {
    // Negative values become nulls under the safe cast
    let converted = cast(array, &DataType::UInt64)?;
    let converted = converted.as_primitive::<UInt64Type>();
    if converted.null_count() > 0 {
        return Err(HydroGridError::ReferenceTable {
            message: format!("Column {} contains null or negative indices", name),
        });
    }
    converted
        .values()
        .iter()
        .map(|&value| {
            usize::try_from(value).map_err(|_| HydroGridError::ReferenceTable {
                message: format!("Index {} in column {} does not fit in usize", value, name),
            })
        })
        .collect()
}

fn station_values(array: &ArrayRef, name: &str) -> Result<Vec<Option<StationId>>> {
    match array.data_type() {
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => {
            let converted = cast(array, &DataType::Utf8)?;
            Ok(converted
                .as_string::<i32>()
                .iter()
                .map(|code| code.and_then(StationId::parse))
                .collect())
        }
        DataType::Float16 | DataType::Float32 | DataType::Float64 => {
            let converted = cast(array, &DataType::Float64)?;
            Ok(converted
                .as_primitive::<Float64Type>()
                .iter()
                .map(|code| code.and_then(StationId::from_f64))
                .collect())
        }
        data_type if data_type.is_integer() => {
            let converted = cast(array, &DataType::Int64)?;
            Ok(converted
                .as_primitive::<Int64Type>()
                .iter()
                .map(|code| code.map(StationId::from_i64))
                .collect())
        }
        other => Err(HydroGridError::ReferenceTable {
            message: format!("Column {} has unsupported station type {:?}", name, other),
        }),
    }
}

fn weight_values(array: &ArrayRef, name: &str) -> Result<Vec<f64>> {
    if !array.data_type().is_numeric() {
        return Err(HydroGridError::ReferenceTable {
            message: format!(
                "Column {} has non-numeric weight type {:?}",
                name,
                array.data_type()
            ),
        });
    }
    let converted = cast(array, &DataType::Float64)?;
    Ok(converted
        .as_primitive::<Float64Type>()
        .iter()
        .map(|weight| weight.filter(|w| !w.is_nan()).unwrap_or(0.0))
        .collect())
}

/// Load the station parameter table from CSV.
///
/// `station_column` names the key column; the three parameter columns are
/// looked up by their headers and every other column is ignored.
pub fn load_parameter_table(path: &Path, station_column: &str) -> Result<ParameterTable> {
    ensure_exists(path)?;

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers = reader.headers()?.clone();

    let position = |name: &str| {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| HydroGridError::ParameterTable {
                message: format!("Missing column {:?} in {}", name, path.display()),
            })
    };
    let key = position(station_column)?;
    let columns = [
        position(ParameterColumn::UntilFieldCapacity.source_name())?,
        position(ParameterColumn::AfterFieldCapacity.source_name())?,
        position(ParameterColumn::BelowWiltingPoint.source_name())?,
    ];

    let mut table = ParameterTable::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        // Header is line 1
        let line = row + 2;

        let station = record
            .get(key)
            .and_then(StationId::parse)
            .ok_or_else(|| HydroGridError::ParameterTable {
                message: format!("Empty station code on line {}", line),
            })?;

        let mut values = [0.0; 3];
        for (value, (&column, parameter)) in values
            .iter_mut()
            .zip(columns.iter().zip(ParameterColumn::ALL))
        {
            let raw = record.get(column).unwrap_or("");
            *value = parse_parameter(raw).ok_or_else(|| HydroGridError::ParameterTable {
                message: format!(
                    "Invalid {:?} value {:?} for station {} on line {}",
                    parameter.source_name(),
                    raw,
                    station,
                    line
                ),
            })?;
        }

        table.insert(
            station,
            StationParameters {
                until_field_capacity: values[0],
                after_field_capacity: values[1],
                below_wilting_point: values[2],
            },
        )?;
    }

    info!(
        path = %path.display(),
        stations = table.len(),
        "Loaded parameter table"
    );

    Ok(table)
}

/// Parse a parameter cell, accepting `,` as the decimal separator.
fn parse_parameter(raw: &str) -> Option<f64> {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{Float64Array, Int32Array, Int64Array, StringArray};
    use arrow::datatypes::{Field, Schema};
    use arrow_ipc::writer::FileWriter;
    use pretty_assertions::assert_eq;
    use std::io::Write;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn write_batch(path: &Path, batch: &RecordBatch) {
        let file = File::create(path).unwrap();
        let mut writer = FileWriter::try_new(file, &batch.schema()).unwrap();
        writer.write(batch).unwrap();
        writer.finish().unwrap();
    }

    fn reference_batch(est_1: ArrayRef) -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("index", DataType::Int64, false),
            Field::new("est_1", est_1.data_type().clone(), true),
            Field::new("peso_1", DataType::Float64, true),
            Field::new("est_2", DataType::Int32, true),
            Field::new("peso_2", DataType::Float64, true),
            Field::new("est_3", DataType::Int32, true),
            Field::new("peso_3", DataType::Float64, true),
        ]);
        RecordBatch::try_new(
            Arc::new(schema),
            vec![
                Arc::new(Int64Array::from(vec![3, 0])),
                est_1,
                Arc::new(Float64Array::from(vec![Some(0.7), Some(1.0)])),
                Arc::new(Int32Array::from(vec![Some(2), None])),
                Arc::new(Float64Array::from(vec![Some(0.3), None])),
                Arc::new(Int32Array::from(vec![None, None])),
                Arc::new(Float64Array::from(vec![None, Some(f64::NAN)])),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_file_not_found() {
        let grid = Grid::new(2, 2).unwrap();
        let result = load_reference_table(Path::new("/nonexistent/ref.arrow"), "index", &grid);
        match result.unwrap_err() {
            HydroGridError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("Expected IO error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_reference_table() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ref.arrow");
        let est_1: ArrayRef = Arc::new(Float64Array::from(vec![Some(1.0), None]));
        write_batch(&path, &reference_batch(est_1));

        let grid = Grid::new(2, 2).unwrap();
        let table = load_reference_table(&path, "index", &grid).unwrap();

        assert_eq!(table.index.indices(), &[3, 0]);
        assert_eq!(
            table.assignments[0],
            StationAssignment::new(
                [Some(StationId::from_i64(1)), Some(StationId::from_i64(2)), None],
                [0.7, 0.3, 0.0],
            )
        );
        assert_eq!(
            table.assignments[1],
            StationAssignment::new([None, None, None], [1.0, 0.0, 0.0])
        );
    }

    #[test]
    fn test_string_station_codes() {
        let est_1: ArrayRef = Arc::new(StringArray::from(vec![Some(" 1 "), Some("")]));
        let (_, assignments) = read_reference_batch(&reference_batch(est_1), "index").unwrap();
        assert_eq!(assignments[0].stations[0], Some(StationId::from_i64(1)));
        assert_eq!(assignments[1].stations[0], None);
    }

    #[test]
    fn test_missing_reference_column() {
        let est_1: ArrayRef = Arc::new(Float64Array::from(vec![Some(1.0), None]));
        let result = read_reference_batch(&reference_batch(est_1), "cell");
        assert!(matches!(result, Err(HydroGridError::ReferenceTable { .. })));
    }

    #[test]
    fn test_reference_outside_grid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ref.arrow");
        let est_1: ArrayRef = Arc::new(Float64Array::from(vec![Some(1.0), None]));
        write_batch(&path, &reference_batch(est_1));

        let grid = Grid::new(1, 2).unwrap();
        let result = load_reference_table(&path, "index", &grid);
        assert!(matches!(result, Err(HydroGridError::ReferenceTable { .. })));
    }

    fn write_csv(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("parametros.csv");
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        (dir, path)
    }

    #[test]
    fn test_load_parameter_table() {
        let (_dir, path) = write_csv(
            "Cod,Nombre,Hasta CC,Tras CC,Por debajo PtoM\n\
             1,Norte,1.5,0.5,0.1\n\
             2.0,Sur,\"2,5\",1,0\n",
        );
        let table = load_parameter_table(&path, "Cod").unwrap();

        assert_eq!(table.len(), 2);
        let north = table.get(&StationId::from_i64(1)).unwrap();
        assert_eq!(north.until_field_capacity, 1.5);
        assert_eq!(north.after_field_capacity, 0.5);
        assert_eq!(north.below_wilting_point, 0.1);
        let south = table.get(&StationId::from_i64(2)).unwrap();
        assert_eq!(south.until_field_capacity, 2.5);
    }

    #[test]
    fn test_parameter_table_missing_column() {
        let (_dir, path) = write_csv("Cod,Hasta CC,Tras CC\n1,1,1\n");
        let result = load_parameter_table(&path, "Cod");
        assert!(matches!(result, Err(HydroGridError::ParameterTable { .. })));
    }

    #[test]
    fn test_parameter_table_invalid_value() {
        let (_dir, path) = write_csv("Cod,Hasta CC,Tras CC,Por debajo PtoM\n1,1,abc,1\n");
        let err = load_parameter_table(&path, "Cod").unwrap_err();
        match err {
            HydroGridError::ParameterTable { message } => assert!(message.contains("line 2")),
            other => panic!("Expected parameter table error, got {:?}", other),
        }
    }

    #[test]
    fn test_parameter_table_duplicate_station() {
        let (_dir, path) =
            write_csv("Cod,Hasta CC,Tras CC,Por debajo PtoM\n1,1,1,1\n1.0,2,2,2\n");
        let result = load_parameter_table(&path, "Cod");
        assert!(matches!(result, Err(HydroGridError::ParameterTable { .. })));
    }
}
