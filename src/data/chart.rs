//! Chart-ready views of a page of records.
//!
//! The dashboard draws three charts from whatever page the table shows.
//! These helpers only reshape rows; plotting stays with the dashboard.

use std::cmp::Ordering;

use serde::Serialize;

use super::model::SalaryRecord;

pub const DEGREE_ORDER: [&str; 3] = ["Bachelor", "Master", "Doctorate"];
pub const SEMESTER_ORDER: [&str; 3] = ["Spring", "Summer", "Fall"];

/// The salary figures shown on hover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SalarySpread {
    pub min: f64,
    pub p25: f64,
    pub median: f64,
    pub p75: f64,
    pub max: f64,
    pub avg: f64,
}

impl From<&SalaryRecord> for SalarySpread {
    fn from(r: &SalaryRecord) -> Self {
        SalarySpread {
            min: r.min,
            p25: r.p25,
            median: r.median,
            p75: r.p75,
            max: r.max,
            avg: r.avg,
        }
    }
}

/// Median vs Max, sized by Avg, coloured by Degree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScatterPoint {
    pub label: String,
    pub group: String,
    pub x: f64,
    pub y: f64,
    pub size: f64,
    pub spread: SalarySpread,
}

pub fn scatter_points(rows: &[&SalaryRecord]) -> Vec<ScatterPoint> {
    rows.iter()
        .map(|r| ScatterPoint {
            label: r.major.clone(),
            group: r.degree.clone(),
            x: r.median,
            y: r.max,
            size: r.avg,
            spread: SalarySpread::from(*r),
        })
        .collect()
}

/// Median per `YearSemesterMajor`, coloured by Major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MedianBar {
    pub key: String,
    pub major: String,
    pub median: f64,
    pub spread: SalarySpread,
}

/// Bars ordered by Median, highest first.  Ties keep page order.
pub fn median_bars(rows: &[&SalaryRecord]) -> Vec<MedianBar> {
    let mut bars: Vec<MedianBar> = rows
        .iter()
        .map(|r| MedianBar {
            key: r.year_semester_major.clone(),
            major: r.major.clone(),
            median: r.median,
            spread: SalarySpread::from(*r),
        })
        .collect();
    bars.sort_by(|a, b| b.median.partial_cmp(&a.median).unwrap_or(Ordering::Equal));
    bars
}

/// One bar of the Degree × Semester facet grid, grouped by Year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedBar {
    pub major: String,
    pub year: String,
    pub median: f64,
    /// `"<Major> - <NumSalariesReported>"`.
    pub text: String,
    pub spread: SalarySpread,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Facet {
    pub degree: String,
    pub semester: String,
    pub bars: Vec<GroupedBar>,
}

/// Facets in [`DEGREE_ORDER`] × [`SEMESTER_ORDER`], skipping empty cells.
/// Values outside those orders follow, in first-seen order.
pub fn grouped_bars(rows: &[&SalaryRecord]) -> Vec<Facet> {
    let mut facets: Vec<Facet> = Vec::new();
    for r in rows {
        let bar = GroupedBar {
            major: r.major.clone(),
            year: r.year.clone(),
            median: r.median,
            text: format!("{} - {}", r.major, r.num_salaries_reported),
            spread: SalarySpread::from(*r),
        };
        match facets
            .iter_mut()
            .find(|f| f.degree == r.degree && f.semester == r.semester)
        {
            Some(f) => f.bars.push(bar),
            None => facets.push(Facet {
                degree: r.degree.clone(),
                semester: r.semester.clone(),
                bars: vec![bar],
            }),
        }
    }

    let rank = |value: &str, order: &[&str]| {
        order.iter().position(|o| *o == value).unwrap_or(order.len())
    };
    facets.sort_by_key(|f| {
        (
            rank(&f.degree, &DEGREE_ORDER),
            rank(&f.semester, &SEMESTER_ORDER),
        )
    });
    facets
}
