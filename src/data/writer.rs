use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::model::{CellValue, Column, SalaryDataset, SalaryRecord};

/// Persist the canonical dataset; the format follows the extension
/// (`.csv`, `.json`, `.parquet`/`.pq`).
pub fn write_dataset(path: &Path, dataset: &SalaryDataset) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => write_csv(path, dataset),
        "json" => write_json(path, dataset),
        "parquet" | "pq" => write_parquet(path, dataset),
        other => bail!("Unsupported output extension: .{other}"),
    }?;
    log::info!("wrote {} records to {}", dataset.len(), path.display());
    Ok(())
}

fn write_csv(path: &Path, dataset: &SalaryDataset) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV")?;
    if dataset.is_empty() {
        // serialize() emits the header with the first row only
        writer
            .write_record(Column::ALL.iter().map(|c| c.name()))
            .context("writing CSV header")?;
    }
    for (i, record) in dataset.records.iter().enumerate() {
        writer
            .serialize(record)
            .with_context(|| format!("writing CSV row {i}"))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_json(path: &Path, dataset: &SalaryDataset) -> Result<()> {
    let file = File::create(path).context("creating JSON file")?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &dataset.records).context("writing JSON records")?;
    writer.flush().context("flushing JSON")?;
    Ok(())
}

/// Arrow schema of the canonical dataset, in [`Column::ALL`] order.
pub fn arrow_schema() -> Schema {
    let fields: Vec<Field> = Column::ALL
        .iter()
        .map(|&col| {
            let dtype = match col {
                Column::NumSalariesReported => DataType::Int64,
                c if c.is_numeric() => DataType::Float64,
                _ => DataType::Utf8,
            };
            Field::new(col.name(), dtype, false)
        })
        .collect();
    Schema::new(fields)
}

fn column_array(records: &[SalaryRecord], col: Column) -> ArrayRef {
    match col {
        Column::NumSalariesReported => Arc::new(Int64Array::from_iter_values(
            records.iter().map(|r| r.num_salaries_reported),
        )),
        c if c.is_numeric() => Arc::new(Float64Array::from_iter_values(records.iter().map(
            |r| match r.value(c) {
                CellValue::Number(v) => v,
                CellValue::Text(_) => f64::NAN,
            },
        ))),
        c => Arc::new(StringArray::from_iter_values(
            records.iter().map(|r| r.value(c).to_string()),
        )),
    }
}

fn write_parquet(path: &Path, dataset: &SalaryDataset) -> Result<()> {
    let schema = Arc::new(arrow_schema());
    let columns: Vec<ArrayRef> = Column::ALL
        .iter()
        .map(|&col| column_array(&dataset.records, col))
        .collect();
    let batch = RecordBatch::try_new(schema.clone(), columns).context("building record batch")?;

    let file = File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_csv_still_has_header() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("empty.csv");
        write_dataset(&path, &SalaryDataset::default()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text.trim_end(),
            "Major,Degree,NumSalariesReported,Avg,Max,Min,StDev,25th,Median,75th,Year,Semester,College,YearSemesterMajor"
        );
    }

    #[test]
    fn test_json_is_complete_past_buffer_size() {
        let records: Vec<SalaryRecord> = (0..200)
            .map(|i| {
                let mut r = SalaryRecord {
                    major: format!("Major {i}"),
                    degree: "Bachelor".into(),
                    num_salaries_reported: i,
                    avg: 50_000.0,
                    max: 90_000.0,
                    min: 30_000.0,
                    st_dev: String::new(),
                    p25: 45_000.0,
                    median: 50_000.0,
                    p75: 55_000.0,
                    year: "2020".into(),
                    semester: "Spring".into(),
                    college: "College of Science".into(),
                    year_semester_major: String::new(),
                };
                r.refresh_key();
                r
            })
            .collect();
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("merged.json");
        write_dataset(&path, &SalaryDataset::from_records(records)).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.len() > 8 * 1024);
        assert!(text.trim_end().ends_with(']'));
        let back: Vec<SalaryRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(back.len(), 200);
        assert_eq!(back[199].major, "Major 199");
    }

    #[test]
    fn test_schema_types() {
        let schema = arrow_schema();
        assert_eq!(schema.fields().len(), Column::ALL.len());
        assert_eq!(schema.field_with_name("Median").unwrap().data_type(), &DataType::Float64);
        assert_eq!(
            schema.field_with_name("NumSalariesReported").unwrap().data_type(),
            &DataType::Int64
        );
        assert_eq!(schema.field_with_name("Year").unwrap().data_type(), &DataType::Utf8);
    }

    #[test]
    fn test_unknown_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        assert!(write_dataset(&dir.path().join("out.xlsx"), &SalaryDataset::default()).is_err());
    }
}
