use std::path::Path;

use anyhow::{bail, Context, Result};
use arrow::array::{Array, Float64Array, Int64Array, StringArray};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{Column, SalaryDataset, SalaryRecord};

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a canonical dataset written by [`super::writer::write_dataset`].
/// Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – one row per record, header of canonical column names
/// * `.json`    – `[{ "Major": ..., "Median": 65000.0, ... }, ...]`
/// * `.parquet` – flat Utf8 / Int64 / Float64 columns
pub fn load_dataset(path: &Path) -> Result<SalaryDataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let records = match ext.as_str() {
        "csv" => load_csv(path)?,
        "json" => load_json(path)?,
        "parquet" | "pq" => load_parquet(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    let dataset = finish(records)?;
    log::info!("loaded {} records from {}", dataset.len(), path.display());
    Ok(dataset)
}

/// Recompute missing grouping keys and re-check the row invariants.
fn finish(mut records: Vec<SalaryRecord>) -> Result<SalaryDataset> {
    for (i, r) in records.iter_mut().enumerate() {
        if r.college.is_empty() {
            bail!("Row {i}: empty College");
        }
        for col in Column::CURRENCY {
            if !r.value(col).as_f64().is_some_and(f64::is_finite) {
                bail!("Row {i}: {col} is not a finite number");
            }
        }
        if r.year_semester_major.is_empty() {
            r.refresh_key();
        }
    }
    Ok(SalaryDataset::from_records(records))
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Columns are matched by header name, so extra columns (such as a leading
/// `idx` row index) are ignored and `YearSemesterMajor` may be absent.
fn load_csv(path: &Path) -> Result<Vec<SalaryRecord>> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let mut records = Vec::new();
    for (row_no, result) in reader.deserialize().enumerate() {
        let record: SalaryRecord = result.with_context(|| format!("CSV row {row_no}"))?;
        records.push(record);
    }
    Ok(records)
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path) -> Result<Vec<SalaryRecord>> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    serde_json::from_str(&text).context("parsing JSON records")
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

fn load_parquet(path: &Path) -> Result<Vec<SalaryRecord>> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();
    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        let major = text_column(&batch, Column::Major)?;
        let degree = text_column(&batch, Column::Degree)?;
        let count = int_column(&batch, Column::NumSalariesReported)?;
        let avg = float_column(&batch, Column::Avg)?;
        let max = float_column(&batch, Column::Max)?;
        let min = float_column(&batch, Column::Min)?;
        let st_dev = text_column(&batch, Column::StDev)?;
        let p25 = float_column(&batch, Column::P25)?;
        let median = float_column(&batch, Column::Median)?;
        let p75 = float_column(&batch, Column::P75)?;
        let year = text_column(&batch, Column::Year)?;
        let semester = text_column(&batch, Column::Semester)?;
        let college = text_column(&batch, Column::College)?;
        let key = text_column(&batch, Column::YearSemesterMajor).ok();

        for row in 0..batch.num_rows() {
            records.push(SalaryRecord {
                major: major.value(row).to_string(),
                degree: degree.value(row).to_string(),
                num_salaries_reported: count.value(row),
                avg: avg.value(row),
                max: max.value(row),
                min: min.value(row),
                st_dev: st_dev.value(row).to_string(),
                p25: p25.value(row),
                median: median.value(row),
                p75: p75.value(row),
                year: year.value(row).to_string(),
                semester: semester.value(row).to_string(),
                college: college.value(row).to_string(),
                year_semester_major: key.map(|k| k.value(row).to_string()).unwrap_or_default(),
            });
        }
    }
    Ok(records)
}

// -- Arrow helpers --

fn column<'b, A: Array + 'static>(batch: &'b RecordBatch, col: Column, kind: &str) -> Result<&'b A> {
    let array = batch
        .column_by_name(col.name())
        .with_context(|| format!("Parquet file missing '{col}' column"))?;
    if array.null_count() > 0 {
        bail!("Column '{col}' contains nulls");
    }
    array
        .as_any()
        .downcast_ref::<A>()
        .with_context(|| format!("Column '{col}' is {:?}, expected {kind}", array.data_type()))
}

fn text_column(batch: &RecordBatch, col: Column) -> Result<&StringArray> {
    column(batch, col, "Utf8")
}

fn int_column(batch: &RecordBatch, col: Column) -> Result<&Int64Array> {
    column(batch, col, "Int64")
}

fn float_column(batch: &RecordBatch, col: Column) -> Result<&Float64Array> {
    column(batch, col, "Float64")
}
