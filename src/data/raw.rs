use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::error::NormalizeError;

/// Column positions of the vendor export, in file order.
pub const RAW_COLUMNS: [&str; 10] = [
    "Major",
    "Degree",
    "NumSalariesReported",
    "Avg",
    "Max",
    "Min",
    "StDev",
    "25th",
    "Median",
    "75th",
];

pub const MAJOR: usize = 0;
pub const DEGREE: usize = 1;
pub const NUM_SALARIES: usize = 2;
pub const AVG: usize = 3;
pub const MAX: usize = 4;
pub const MIN: usize = 5;
pub const STDEV: usize = 6;
pub const P25: usize = 7;
pub const MEDIAN: usize = 8;
pub const P75: usize = 9;

/// Cell texts read as missing values, the same set a pandas `read_csv` with
/// default settings turns into NaN.
pub const NA_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN", "<NA>",
    "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(cell: &str) -> bool {
    cell.is_empty() || NA_TOKENS.contains(&cell)
}

// ---------------------------------------------------------------------------
// ReportTerm – Year/Semester carried by the file name
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTerm {
    pub year: String,
    pub semester: String,
}

impl ReportTerm {
    /// `2019_Fall.csv` → `{ year: "2019", semester: "Fall" }`.  Fields after
    /// the second `_` are ignored.
    pub fn from_path(path: &Path) -> Result<Self, NormalizeError> {
        let bad_name = || NormalizeError::FileName(path.to_path_buf());
        let stem = path.file_stem().and_then(|s| s.to_str()).ok_or_else(bad_name)?;

        let mut parts = stem.split('_');
        let year = parts.next().unwrap_or_default().trim();
        let semester = parts.next().unwrap_or_default().trim();

        if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) || semester.is_empty() {
            return Err(bad_name());
        }

        Ok(ReportTerm {
            year: year.to_string(),
            semester: semester.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// RawReport – the ten fixed columns, cells left as text
// ---------------------------------------------------------------------------

/// One row of a raw report.  Blank and NA cells are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawRow {
    pub cells: [Option<String>; 10],
    /// 1-based line of the row in the source file.
    pub line: u64,
}

impl RawRow {
    pub fn get(&self, idx: usize) -> Option<&str> {
        self.cells.get(idx).and_then(|c| c.as_deref())
    }

    /// A row with no `Max` (blank or an NA token) marks a college boundary.
    pub fn is_boundary(&self) -> bool {
        self.get(MAX).is_none()
    }
}

/// A raw report file with its header row consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawReport {
    pub rows: Vec<RawRow>,
}

impl RawReport {
    pub fn from_path(path: &Path) -> Result<Self, NormalizeError> {
        let file = File::open(path).map_err(|source| NormalizeError::Io {
            path: PathBuf::from(path),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Parse CSV text.  Rows may be shorter than the header (markers usually
    /// carry only the college name); missing cells are absent.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, NormalizeError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(reader);

        let width = reader.headers()?.len();
        if width < RAW_COLUMNS.len() {
            return Err(NormalizeError::StructuralMismatch(format!(
                "header has {width} columns, expected {}",
                RAW_COLUMNS.len()
            )));
        }

        let mut rows = Vec::new();
        for result in reader.records() {
            let record = result?;
            let mut row = RawRow {
                line: record.position().map_or(0, |p| p.line()),
                ..RawRow::default()
            };
            for (slot, value) in row.cells.iter_mut().zip(record.iter()) {
                let value = value.trim();
                if !is_missing(value) {
                    *slot = Some(value.to_string());
                }
            }
            rows.push(row);
        }

        Ok(RawReport { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Indices of boundary rows, ascending.
    pub fn boundaries(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, row)| row.is_boundary())
            .map(|(i, _)| i)
            .collect()
    }
}
