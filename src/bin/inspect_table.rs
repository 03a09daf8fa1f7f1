use arrow::array::{Array, AsArray};
use arrow::datatypes::{DataType, Float64Type, UInt64Type};
use arrow_ipc::reader::FileReader;
use clap::Parser;
use std::error::Error;
use std::fs::File;
use std::path::PathBuf;

/// Print the contents of a hydrogrid output table
#[derive(Parser, Debug)]
#[command(name = "inspect_table")]
struct Args {
    /// Arrow IPC file written by hydrogrid
    path: PathBuf,

    /// Number of rows to print
    #[arg(short, long, default_value = "10")]
    rows: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    println!("Inspecting table: {}", args.path.display());

    let reader = FileReader::try_new(File::open(&args.path)?, None)?;
    let schema = reader.schema();

    println!("\n=== SCHEMA ===");
    for field in schema.fields() {
        println!(
            "  {} ({:?}){}",
            field.name(),
            field.data_type(),
            if field.is_nullable() { " nullable" } else { "" }
        );
    }

    if !schema.metadata().is_empty() {
        println!("\nMetadata:");
        let mut entries: Vec<_> = schema.metadata().iter().collect();
        entries.sort();
        for (key, value) in entries {
            println!("  {}: {}", key, value);
        }
    }

    let batches = reader.collect::<Result<Vec<_>, _>>()?;
    let total_rows: usize = batches.iter().map(|batch| batch.num_rows()).sum();
    println!("\nRows: {}", total_rows);

    println!("\nNull counts:");
    for (i, field) in schema.fields().iter().enumerate() {
        let nulls: usize = batches.iter().map(|batch| batch.column(i).null_count()).sum();
        println!("  {}: {}", field.name(), nulls);
    }

    println!("\nFirst {} rows:", args.rows.min(total_rows));
    let header: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    println!("  {}", header.join("\t"));

    let mut printed = 0;
    'batches: for batch in &batches {
        for row in 0..batch.num_rows() {
            if printed == args.rows {
                break 'batches;
            }
            let cells: Vec<String> = batch
                .columns()
                .iter()
                .map(|column| {
                    if column.is_null(row) {
                        return "null".to_string();
                    }
                    match column.data_type() {
                        DataType::UInt64 => column.as_primitive::<UInt64Type>().value(row).to_string(),
                        DataType::Float64 => {
                            format!("{:.4}", column.as_primitive::<Float64Type>().value(row))
                        }
                        other => format!("<{:?}>", other),
                    }
                })
                .collect();
            println!("  {}", cells.join("\t"));
            printed += 1;
        }
    }

    Ok(())
}
