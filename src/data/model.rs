use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::QueryError;

// ---------------------------------------------------------------------------
// Column – the closed set of canonical columns
// ---------------------------------------------------------------------------

/// One column of the canonical dataset, named as the dashboard names it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Column {
    Major,
    Degree,
    NumSalariesReported,
    Avg,
    Max,
    Min,
    StDev,
    P25,
    Median,
    P75,
    Year,
    Semester,
    College,
    YearSemesterMajor,
}

impl Column {
    /// Canonical order, matching the persisted CSV header.
    pub const ALL: [Column; 14] = [
        Column::Major,
        Column::Degree,
        Column::NumSalariesReported,
        Column::Avg,
        Column::Max,
        Column::Min,
        Column::StDev,
        Column::P25,
        Column::Median,
        Column::P75,
        Column::Year,
        Column::Semester,
        Column::College,
        Column::YearSemesterMajor,
    ];

    /// The six currency columns cleaned into `f64`.
    pub const CURRENCY: [Column; 6] = [
        Column::Avg,
        Column::Max,
        Column::Min,
        Column::P25,
        Column::Median,
        Column::P75,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Column::Major => "Major",
            Column::Degree => "Degree",
            Column::NumSalariesReported => "NumSalariesReported",
            Column::Avg => "Avg",
            Column::Max => "Max",
            Column::Min => "Min",
            Column::StDev => "StDev",
            Column::P25 => "25th",
            Column::Median => "Median",
            Column::P75 => "75th",
            Column::Year => "Year",
            Column::Semester => "Semester",
            Column::College => "College",
            Column::YearSemesterMajor => "YearSemesterMajor",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, Column::NumSalariesReported) || Column::CURRENCY.contains(&self)
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Column {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Column::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| QueryError::UnknownColumn(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// CellValue – a single cell, borrowed from a record
// ---------------------------------------------------------------------------

/// The value of one column for one record.
///
/// Ordered so it can key a sort: numbers before text, floats by
/// `total_cmp`, text lexicographically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CellValue<'a> {
    Number(f64),
    Text(&'a str),
}

impl Eq for CellValue<'_> {}

impl PartialOrd for CellValue<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (CellValue::Number(a), CellValue::Number(b)) => a.total_cmp(b),
            (CellValue::Text(a), CellValue::Text(b)) => a.cmp(b),
            (CellValue::Number(_), CellValue::Text(_)) => Ordering::Less,
            (CellValue::Text(_), CellValue::Number(_)) => Ordering::Greater,
        }
    }
}

impl fmt::Display for CellValue<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(v) => write!(f, "{v}"),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl CellValue<'_> {
    /// Interpret the cell as a number; text is parsed if it looks numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(v) => Some(*v),
            CellValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

// ---------------------------------------------------------------------------
// SalaryRecord – one row of the canonical dataset
// ---------------------------------------------------------------------------

/// A cleaned salary row.  Field names serialize to the dashboard's column ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalaryRecord {
    #[serde(rename = "Major")]
    pub major: String,
    #[serde(rename = "Degree")]
    pub degree: String,
    #[serde(rename = "NumSalariesReported")]
    pub num_salaries_reported: i64,
    #[serde(rename = "Avg")]
    pub avg: f64,
    #[serde(rename = "Max")]
    pub max: f64,
    #[serde(rename = "Min")]
    pub min: f64,
    /// Kept verbatim; the reports put markers such as `N/A` here.
    #[serde(rename = "StDev")]
    pub st_dev: String,
    #[serde(rename = "25th")]
    pub p25: f64,
    #[serde(rename = "Median")]
    pub median: f64,
    #[serde(rename = "75th")]
    pub p75: f64,
    #[serde(rename = "Year")]
    pub year: String,
    #[serde(rename = "Semester")]
    pub semester: String,
    #[serde(rename = "College")]
    pub college: String,
    /// Chart grouping key, see [`year_semester_major`].
    #[serde(rename = "YearSemesterMajor", default)]
    pub year_semester_major: String,
}

impl SalaryRecord {
    pub fn value(&self, column: Column) -> CellValue<'_> {
        match column {
            Column::Major => CellValue::Text(&self.major),
            Column::Degree => CellValue::Text(&self.degree),
            Column::NumSalariesReported => CellValue::Number(self.num_salaries_reported as f64),
            Column::Avg => CellValue::Number(self.avg),
            Column::Max => CellValue::Number(self.max),
            Column::Min => CellValue::Number(self.min),
            Column::StDev => CellValue::Text(&self.st_dev),
            Column::P25 => CellValue::Number(self.p25),
            Column::Median => CellValue::Number(self.median),
            Column::P75 => CellValue::Number(self.p75),
            Column::Year => CellValue::Text(&self.year),
            Column::Semester => CellValue::Text(&self.semester),
            Column::College => CellValue::Text(&self.college),
            Column::YearSemesterMajor => CellValue::Text(&self.year_semester_major),
        }
    }

    /// Fill in the derived grouping key from the other fields.
    pub fn refresh_key(&mut self) {
        self.year_semester_major =
            year_semester_major(&self.year, &self.semester, &self.major, &self.degree);
    }
}

/// `<yy>_<Sem>_<compacted major>_<D>`, e.g. `19_Fal_Cmuecec_B` for a
/// Bachelor in "Computer Science" from Fall 2019.  The major is compacted by
/// keeping every other character and dropping spaces.
pub fn year_semester_major(year: &str, semester: &str, major: &str, degree: &str) -> String {
    let yy: String = year.chars().skip(2).collect();
    let sem: String = semester.chars().take(3).collect();
    let compact: String = major.chars().step_by(2).filter(|c| *c != ' ').collect();
    let d: String = degree.chars().take(1).collect();
    format!("{yy}_{sem}_{compact}_{d}")
}

// ---------------------------------------------------------------------------
// SalaryDataset – the canonical dataset
// ---------------------------------------------------------------------------

/// All normalized rows, in file-then-section order.  Read-only once built.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalaryDataset {
    pub records: Vec<SalaryRecord>,
}

impl SalaryDataset {
    pub fn from_records(records: Vec<SalaryRecord>) -> Self {
        SalaryDataset { records }
    }

    /// Fold per-file batches into one dataset, preserving batch order.
    pub fn concat<I>(batches: I) -> Self
    where
        I: IntoIterator<Item = Vec<SalaryRecord>>,
    {
        let records = batches.into_iter().flatten().collect();
        SalaryDataset { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
