//! Flattening of exported JSON into delimiter-separated rows
//!
//! The download-link mode can already return CSV, but nested fields are lost
//! there. This module turns a JSON export (an array of records or a single
//! record) into a table whose columns are the dotted paths of every nested
//! field, e.g. `state.severity` or `asset_labels`.

use serde_json::{Map, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use tracing::info;

use crate::error::{QueryError, Result};

/// Separator used when none is given
pub const DEFAULT_SEPARATOR: char = '¬';

/// Default input file name
pub const DEFAULT_INPUT: &str = "alerts.json";

/// Default output file name
pub const DEFAULT_OUTPUT: &str = "alerts.csv";

/// A flattened table: ordered column names and one row per record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Flattens a JSON document into a table
///
/// Nested objects become dotted column names. Columns appear in the order they
/// are first seen across all records; a record without a column gets an empty
/// cell. Empty nested objects contribute no column. Top-level array elements
/// must be objects.
///
/// # Arguments
/// * `document` - An array of records or a single record
///
/// # Returns
/// * `Result<FlatTable>` - Column names plus one row per record, or
///   [`QueryError::Flatten`] if the document has another shape
///
/// ```
/// use orca_query::flatten::flatten_records;
/// use serde_json::json;
///
/// let table = flatten_records(&json!([
///     {"id": 1, "state": {"severity": "high"}},
///     {"id": 2, "tags": ["a", "b"]}
/// ])).unwrap();
///
/// assert_eq!(table.columns, vec!["id", "state.severity", "tags"]);
/// assert_eq!(table.rows[1], vec!["2", "", r#"["a","b"]"#]);
/// ```
pub fn flatten_records(document: &Value) -> Result<FlatTable> {
    let records: Vec<&Map<String, Value>> = match document {
        Value::Object(record) => vec![record],
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                item.as_object()
                    .ok_or_else(|| QueryError::Flatten(format!("record {} is not a JSON object", i)))
            })
            .collect::<Result<_>>()?,
        _ => {
            return Err(QueryError::Flatten(
                "expected a JSON array of objects or a single object".to_string(),
            ))
        }
    };

    // Column name -> position, so each cell finds its slot without scanning
    let mut column_index: HashMap<String, usize> = HashMap::new();
    let mut columns: Vec<String> = Vec::new();
    let mut indexed_records: Vec<Vec<(usize, &Value)>> = Vec::with_capacity(records.len());

    for record in records {
        let mut cells = Vec::new();
        flatten_object(None, record, &mut cells);

        let indexed = cells
            .into_iter()
            .map(|(name, value)| {
                let index = match column_index.get(&name) {
                    Some(&index) => index,
                    None => {
                        let index = columns.len();
                        columns.push(name.clone());
                        column_index.insert(name, index);
                        index
                    }
                };
                (index, value)
            })
            .collect();
        indexed_records.push(indexed);
    }

    // Rows are sized once all columns are known; missing cells stay empty
    let rows = indexed_records
        .into_iter()
        .map(|cells| {
            let mut row = vec![String::new(); columns.len()];
            for (index, value) in cells {
                row[index] = render_cell(value);
            }
            row
        })
        .collect();

    Ok(FlatTable { columns, rows })
}

fn flatten_object<'a>(prefix: Option<&str>, object: &'a Map<String, Value>, out: &mut Vec<(String, &'a Value)>) {
    for (key, value) in object {
        let name = match prefix {
            Some(prefix) => format!("{}.{}", prefix, key),
            None => key.clone(),
        };
        match value {
            // An empty object has no leaves, so it yields no column
            Value::Object(nested) => flatten_object(Some(&name), nested, out),
            _ => out.push((name, value)),
        }
    }
}

/// Renders a leaf value the way pandas writes it: booleans as `True`/`False`,
/// null as an empty cell, arrays as compact JSON
fn render_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "True".to_string(),
        Value::Bool(false) => "False".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Writes a table with the given separator
///
/// ASCII separators go through the `csv` writer. Other separators use the
/// same minimal quoting: a field is quoted when it contains the separator, a
/// quote, or a line break, and inner quotes are doubled.
///
/// # Arguments
/// * `table` - Flattened records to write
/// * `separator` - Field separator, e.g. `¬` or `,`
/// * `writer` - Destination; flushed before returning
///
/// # Returns
/// * `Result<()>` - Error if the destination could not be written
pub fn write_table<W: Write>(table: &FlatTable, separator: char, writer: W) -> Result<()> {
    if separator.is_ascii() {
        // Header first, then one record per row
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(separator as u8)
            .from_writer(writer);
        csv_writer.write_record(&table.columns)?;
        for row in &table.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer.flush().map_err(csv::Error::from)?;
        return Ok(());
    }

    // The csv crate only takes single-byte delimiters
    let mut writer = writer;
    let mut write_line = |fields: &[String]| -> std::io::Result<()> {
        let line = fields
            .iter()
            .map(|field| quote_field(field, separator))
            .collect::<Vec<_>>()
            .join(&separator.to_string());
        writeln!(writer, "{}", line)
    };

    write_line(&table.columns).map_err(csv::Error::from)?;
    for row in &table.rows {
        write_line(row).map_err(csv::Error::from)?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

fn quote_field(field: &str, separator: char) -> String {
    if field.contains(separator) || field.contains(['"', '\r', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Reads a JSON export, flattens it and writes the delimited file
///
/// # Arguments
/// * `input` - JSON file written by `orca-query --output-file`
/// * `output` - Delimited file to create or overwrite
/// * `separator` - Field separator
///
/// # Returns
/// * `Result<FlatTable>` - The table that was written
pub fn convert_file(input: &Path, output: &Path, separator: char) -> Result<FlatTable> {
    // Parse and flatten before touching the output file
    let raw = std::fs::read_to_string(input).map_err(|e| QueryError::io(input, e))?;
    let document: Value = serde_json::from_str(&raw)?;
    let table = flatten_records(&document)?;

    info!("Columns: {:?}", table.columns);

    let file = std::fs::File::create(output).map_err(|e| QueryError::io(output, e))?;
    write_table(&table, separator, std::io::BufWriter::new(file))?;

    info!(
        "Wrote {} rows with {} columns to {}",
        table.rows.len(),
        table.columns.len(),
        output.display()
    );
    Ok(table)
}
