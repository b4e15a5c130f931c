use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::model::{SalaryDataset, SalaryRecord};
use super::raw::{self, RawReport, RawRow, ReportTerm};
use crate::config::{Config, LayoutConfig};
use crate::error::NormalizeError;

// ---------------------------------------------------------------------------
// Section planning
// ---------------------------------------------------------------------------

/// The data rows `[start, end)` of one college section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionPlan {
    pub college: String,
    pub start: usize,
    pub end: usize,
}

impl SectionPlan {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end == self.start
    }
}

/// Split a report into college sections.
///
/// Boundary rows (no `Max`) open a new section named by their `Major` cell.
/// Rows before the first boundary belong to `layout.default_college`; a file
/// without boundaries is one such section.  Each section skips its marker and
/// sub-header rows and drops the footer in front of the next boundary.
pub fn plan_sections(
    report: &RawReport,
    layout: &LayoutConfig,
) -> Result<Vec<SectionPlan>, NormalizeError> {
    let n = report.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let boundaries = report.boundaries();
    let mut openings: Vec<(usize, String)> = Vec::with_capacity(boundaries.len() + 1);
    if boundaries.first() != Some(&0) {
        openings.push((0, layout.default_college.clone()));
    }
    for &b in &boundaries {
        let college = report.rows[b].get(raw::MAJOR).ok_or_else(|| {
            NormalizeError::StructuralMismatch(format!("boundary row {b} names no college"))
        })?;
        openings.push((b, college.to_string()));
    }

    let mut plans = Vec::with_capacity(openings.len());
    for (i, (opening, college)) in openings.iter().enumerate() {
        let next = openings.get(i + 1).map_or(n, |(idx, _)| *idx);
        let skip = if report.rows[*opening].is_boundary() {
            layout.marker_skip_rows
        } else {
            layout.header_skip_rows
        };
        let start = opening + skip;
        let end = next.checked_sub(layout.footer_rows).ok_or_else(|| {
            NormalizeError::StructuralMismatch(format!(
                "section {college:?} ends at row {next}, before its {}-row footer",
                layout.footer_rows
            ))
        })?;
        if end < start {
            return Err(NormalizeError::StructuralMismatch(format!(
                "section {college:?} has negative length (rows {start}..{end})"
            )));
        }
        if end == start {
            log::warn!("section {college:?} at row {opening} has no data rows");
        }
        plans.push(SectionPlan {
            college: college.clone(),
            start,
            end,
        });
    }

    Ok(plans)
}

// ---------------------------------------------------------------------------
// Cell cleaning
// ---------------------------------------------------------------------------

/// `"$65,000 +/-"` → `65000.0`.  `None` when the cleaned text is not a
/// finite number.
pub fn parse_currency(text: &str) -> Option<f64> {
    let cleaned = text
        .trim()
        .trim_start_matches('$')
        .replace(',', "")
        .replace("+/-", "");
    let value: f64 = cleaned.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Salary counts, tolerating thousands separators and integral floats.
pub fn parse_count(text: &str) -> Option<i64> {
    let cleaned = text.trim().replace(',', "");
    if let Ok(n) = cleaned.parse::<i64>() {
        return Some(n);
    }
    let f: f64 = cleaned.parse().ok()?;
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}

fn currency_cell(row: &RawRow, idx: usize) -> Result<f64, NormalizeError> {
    let text = row.get(idx).unwrap_or_default();
    parse_currency(text).ok_or_else(|| NormalizeError::Parse {
        column: raw::RAW_COLUMNS[idx],
        line: row.line,
        text: text.to_string(),
    })
}

fn text_cell(row: &RawRow, idx: usize) -> Result<&str, NormalizeError> {
    row.get(idx).ok_or_else(|| {
        NormalizeError::StructuralMismatch(format!(
            "line {} has no {}",
            row.line,
            raw::RAW_COLUMNS[idx]
        ))
    })
}

fn to_record(row: &RawRow, college: &str, term: &ReportTerm) -> Result<SalaryRecord, NormalizeError> {
    let count_text = row.get(raw::NUM_SALARIES).unwrap_or_default();
    let num_salaries_reported = parse_count(count_text).ok_or_else(|| NormalizeError::Parse {
        column: raw::RAW_COLUMNS[raw::NUM_SALARIES],
        line: row.line,
        text: count_text.to_string(),
    })?;

    let mut record = SalaryRecord {
        major: text_cell(row, raw::MAJOR)?.to_string(),
        degree: text_cell(row, raw::DEGREE)?.to_string(),
        num_salaries_reported,
        avg: currency_cell(row, raw::AVG)?,
        max: currency_cell(row, raw::MAX)?,
        min: currency_cell(row, raw::MIN)?,
        st_dev: row.get(raw::STDEV).unwrap_or_default().to_string(),
        p25: currency_cell(row, raw::P25)?,
        median: currency_cell(row, raw::MEDIAN)?,
        p75: currency_cell(row, raw::P75)?,
        year: term.year.clone(),
        semester: term.semester.clone(),
        college: college.to_string(),
        year_semester_major: String::new(),
    };
    record.refresh_key();
    Ok(record)
}

// ---------------------------------------------------------------------------
// Per-file normalization
// ---------------------------------------------------------------------------

/// Turn one parsed report into canonical rows, in file order.
pub fn normalize_report(
    report: &RawReport,
    term: &ReportTerm,
    layout: &LayoutConfig,
) -> Result<Vec<SalaryRecord>, NormalizeError> {
    let plans = plan_sections(report, layout)?;
    let mut records = Vec::with_capacity(plans.iter().map(SectionPlan::len).sum());

    for plan in &plans {
        log::debug!(
            "{} {}: {:?} rows {}..{}",
            term.year,
            term.semester,
            plan.college,
            plan.start,
            plan.end
        );
        for row in &report.rows[plan.start..plan.end] {
            records.push(to_record(row, &plan.college, term)?);
        }
    }

    Ok(records)
}

/// Read and normalize one `<year>_<semester>.csv` file.
pub fn normalize_file(path: &Path, layout: &LayoutConfig) -> Result<Vec<SalaryRecord>, NormalizeError> {
    let term = ReportTerm::from_path(path)?;
    let report = RawReport::from_path(path)?;
    normalize_report(&report, &term, layout)
}

// ---------------------------------------------------------------------------
// Batch ingestion
// ---------------------------------------------------------------------------

/// `.csv` files directly under `dir`, sorted by file name.
pub fn discover_reports(dir: &Path) -> Result<Vec<PathBuf>, NormalizeError> {
    let io_err = |source| NormalizeError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// What happened to one input file.
#[derive(Debug)]
pub struct FileOutcome {
    pub path: PathBuf,
    /// Rows contributed, or why the file was skipped.
    pub result: Result<usize, NormalizeError>,
}

/// The canonical dataset plus a per-file account of the batch.
#[derive(Debug)]
pub struct IngestReport {
    pub dataset: SalaryDataset,
    pub outcomes: Vec<FileOutcome>,
}

impl IngestReport {
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &NormalizeError)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().err().map(|e| (o.path.as_path(), e)))
    }

    pub fn log_summary(&self) {
        let failed = self.failures().count();
        log::info!(
            "ingested {} rows from {} of {} files",
            self.dataset.len(),
            self.outcomes.len() - failed,
            self.outcomes.len()
        );
        for (path, err) in self.failures() {
            log::error!("skipped {}: {err}", path.display());
        }
    }
}

/// Normalize every report in `dir` and fold the results into one dataset.
///
/// A file that fails is skipped and recorded; the rest of the batch still
/// runs.  Only an unreadable `dir` is an error.
pub fn normalize_dir(dir: &Path, config: &Config) -> Result<IngestReport, NormalizeError> {
    let files = discover_reports(dir)?;
    log::info!("found {} report files in {}", files.len(), dir.display());

    let layout = &config.layout;
    let results: Vec<Result<Vec<SalaryRecord>, NormalizeError>> = if config.ingest.parallel {
        files.par_iter().map(|p| normalize_file(p, layout)).collect()
    } else {
        files.iter().map(|p| normalize_file(p, layout)).collect()
    };

    let mut batches = Vec::with_capacity(files.len());
    let mut outcomes = Vec::with_capacity(files.len());
    for (path, result) in files.into_iter().zip(results) {
        let result = match result {
            Ok(records) => {
                log::info!("{}: {} rows", path.display(), records.len());
                let n = records.len();
                batches.push(records);
                Ok(n)
            }
            Err(e) => {
                log::error!("{}: {e}", path.display());
                Err(e)
            }
        };
        outcomes.push(FileOutcome { path, result });
    }

    let report = IngestReport {
        dataset: SalaryDataset::concat(batches),
        outcomes,
    };
    report.log_summary();
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "Major,Degree,NumSalariesReported,Avg,Max,Min,StDev,25th,Median,75th";

    fn data_line(major: &str, degree: &str, median: u32) -> String {
        format!(
            "{major},{degree},5,\"${avg},000\",\"${max},000 +/-\",\"${min},000\",\"$4,500\",\"${p25},000\",\"${median},000\",\"${p75},000\"",
            avg = median + 1,
            max = median + 20,
            min = median - 20,
            p25 = median - 5,
            p75 = median + 5,
        )
    }

    fn footer_lines() -> Vec<String> {
        vec![
            "Response Rate,,,,84%,,,,,".into(),
            "Total,,15,\"$60,000\",\"$90,000\",\"$40,000\",,\"$55,000\",\"$60,000\",\"$65,000\"".into(),
            "Placement Rate,,,,91%,,,,,".into(),
            "Notes,,,,-,,,,,".into(),
        ]
    }

    /// A report in the vendor layout: the leading default-college section,
    /// then one marked section per entry of `sections`.
    fn report_text(
        leading: &[(&str, &str, u32)],
        sections: &[(&str, Vec<(&str, &str, u32)>)],
    ) -> String {
        let mut lines = vec![HEADER.to_string(), HEADER.to_string()];
        lines.extend(leading.iter().map(|(m, d, med)| data_line(m, d, *med)));
        lines.extend(footer_lines());
        for (college, rows) in sections {
            lines.push(format!("{college},,,,,,,,,"));
            lines.push(HEADER.to_string());
            lines.extend(rows.iter().map(|(m, d, med)| data_line(m, d, *med)));
            lines.extend(footer_lines());
        }
        lines.join("\n") + "\n"
    }

    fn term() -> ReportTerm {
        ReportTerm {
            year: "2019".into(),
            semester: "Fall".into(),
        }
    }

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("$65,000"), Some(65000.0));
        assert_eq!(parse_currency(" $1,234,567.50 "), Some(1234567.5));
        assert_eq!(parse_currency("$70,000 +/-"), Some(70000.0));
        assert_eq!(parse_currency("52000"), Some(52000.0));
        assert_eq!(parse_currency("Max"), None);
        assert_eq!(parse_currency(""), None);
        assert_eq!(parse_currency("inf"), None);
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("12"), Some(12));
        assert_eq!(parse_count("1,204"), Some(1204));
        assert_eq!(parse_count("7.0"), Some(7));
        assert_eq!(parse_count("7.5"), None);
        assert_eq!(parse_count("N/A"), None);
    }

    #[test]
    fn test_colleges_follow_boundaries() {
        let text = report_text(
            &[("Agronomy", "Bachelor", 50), ("Biology", "Master", 55)],
            &[
                ("College of Engineering", vec![("Computer Science", "Bachelor", 80)]),
                (
                    "College of Science",
                    vec![("Mathematics", "Bachelor", 60), ("Physics", "Doctorate", 90)],
                ),
            ],
        );
        let report = RawReport::from_reader(text.as_bytes()).unwrap();
        let records = normalize_report(&report, &term(), &LayoutConfig::default()).unwrap();

        let got: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.major.as_str(), r.college.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("Agronomy", "College of Agriculture & Life Sciences"),
                ("Biology", "College of Agriculture & Life Sciences"),
                ("Computer Science", "College of Engineering"),
                ("Mathematics", "College of Science"),
                ("Physics", "College of Science"),
            ]
        );
    }

    #[test]
    fn test_currency_fields_are_clean_numbers() {
        let text = report_text(&[("Agronomy", "Bachelor", 50)], &[]);
        let report = RawReport::from_reader(text.as_bytes()).unwrap();
        let records = normalize_report(&report, &term(), &LayoutConfig::default()).unwrap();

        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.avg, 51000.0);
        assert_eq!(r.max, 70000.0);
        assert_eq!(r.min, 30000.0);
        assert_eq!(r.p25, 45000.0);
        assert_eq!(r.median, 50000.0);
        assert_eq!(r.p75, 55000.0);
        assert_eq!(r.st_dev, "$4,500");
        assert_eq!(r.num_salaries_reported, 5);
        assert_eq!((r.year.as_str(), r.semester.as_str()), ("2019", "Fall"));
        assert_eq!(r.year_semester_major, "19_Fal_Arnm_B");
    }

    #[test]
    fn test_no_boundary_is_single_default_section() {
        let text = report_text(&[("Agronomy", "Bachelor", 50), ("Botany", "Master", 45)], &[]);
        let report = RawReport::from_reader(text.as_bytes()).unwrap();
        assert!(report.boundaries().is_empty());

        let plans = plan_sections(&report, &LayoutConfig::default()).unwrap();
        assert_eq!(
            plans,
            vec![SectionPlan {
                college: DEFAULT.into(),
                start: 1,
                end: 3,
            }]
        );
    }

    const DEFAULT: &str = crate::config::DEFAULT_COLLEGE;

    #[test]
    fn test_leading_marker_skips_default_section() {
        let text = format!(
            "{HEADER}\nCollege of Engineering,,,,,,,,,\n{HEADER}\n{}\n{}\n",
            data_line("Civil Engineering", "Bachelor", 70),
            footer_lines().join("\n")
        );
        let report = RawReport::from_reader(text.as_bytes()).unwrap();
        let records = normalize_report(&report, &term(), &LayoutConfig::default()).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].college, "College of Engineering");
    }

    #[test]
    fn test_truncated_footer_is_structural_mismatch() {
        let text = format!("{HEADER}\n{HEADER}\n{}\n", data_line("Agronomy", "Bachelor", 50));
        let report = RawReport::from_reader(text.as_bytes()).unwrap();

        let err = plan_sections(&report, &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, NormalizeError::StructuralMismatch(_)));
    }

    #[test]
    fn test_misaligned_slice_is_parse_error() {
        // One footer row too few: the last footer row would be read as data.
        let layout = LayoutConfig {
            footer_rows: 3,
            ..LayoutConfig::default()
        };
        let text = report_text(&[("Agronomy", "Bachelor", 50)], &[]);
        let report = RawReport::from_reader(text.as_bytes()).unwrap();

        let err = normalize_report(&report, &term(), &layout).unwrap_err();
        // header, header, data, then "Response Rate" on line 4
        assert!(
            matches!(
                err,
                NormalizeError::Parse {
                    column: "NumSalariesReported",
                    line: 4,
                    ..
                }
            ),
            "{err}"
        );
    }

    #[test]
    fn test_na_marker_opens_section() {
        let text = format!(
            "{HEADER}\n{HEADER}\n{}\n{}\nCollege of Science,,,,N/A,,,,,\n{HEADER}\n{}\n{}\n",
            data_line("Agronomy", "Bachelor", 50),
            footer_lines().join("\n"),
            data_line("Physics", "Doctorate", 90),
            footer_lines().join("\n"),
        );
        let report = RawReport::from_reader(text.as_bytes()).unwrap();
        let records = normalize_report(&report, &term(), &LayoutConfig::default()).unwrap();

        let got: Vec<(&str, &str)> = records
            .iter()
            .map(|r| (r.major.as_str(), r.college.as_str()))
            .collect();
        assert_eq!(got, vec![("Agronomy", DEFAULT), ("Physics", "College of Science")]);
    }

    #[test]
    fn test_unnamed_boundary_is_structural_mismatch() {
        let text = report_text(&[("Agronomy", "Bachelor", 50)], &[("", vec![("Physics", "Doctorate", 90)])]);
        let report = RawReport::from_reader(text.as_bytes()).unwrap();

        let err = plan_sections(&report, &LayoutConfig::default()).unwrap_err();
        assert!(matches!(err, NormalizeError::StructuralMismatch(_)), "{err}");
    }

    #[test]
    fn test_empty_section_is_accepted() {
        let text = report_text(
            &[("Agronomy", "Bachelor", 50)],
            &[
                ("College of Science", vec![]),
                ("College of Engineering", vec![("Civil Engineering", "Bachelor", 70)]),
            ],
        );
        let report = RawReport::from_reader(text.as_bytes()).unwrap();

        let plans = plan_sections(&report, &LayoutConfig::default()).unwrap();
        assert_eq!(plans.len(), 3);
        assert!(plans[1].is_empty());
        assert_eq!(plans[1].college, "College of Science");

        let records = normalize_report(&report, &term(), &LayoutConfig::default()).unwrap();
        let majors: Vec<&str> = records.iter().map(|r| r.major.as_str()).collect();
        assert_eq!(majors, vec!["Agronomy", "Civil Engineering"]);
    }

    #[test]
    fn test_normalize_dir_is_sorted_and_best_effort() {
        let dir = tempfile::TempDir::new().unwrap();
        let fall = report_text(&[("Agronomy", "Bachelor", 50)], &[]);
        let spring = report_text(&[("Botany", "Master", 45)], &[]);
        std::fs::write(dir.path().join("2020_Spring.csv"), spring).unwrap();
        std::fs::write(dir.path().join("2019_Fall.csv"), fall).unwrap();
        std::fs::write(dir.path().join("badname.csv"), "x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        for parallel in [true, false] {
            let mut config = Config::default();
            config.ingest.parallel = parallel;
            let report = normalize_dir(dir.path(), &config).unwrap();

            let majors: Vec<&str> = report.dataset.records.iter().map(|r| r.major.as_str()).collect();
            assert_eq!(majors, vec!["Agronomy", "Botany"]);
            assert_eq!(report.outcomes.len(), 3);
            let failed: Vec<_> = report.failures().collect();
            assert_eq!(failed.len(), 1);
            assert!(matches!(failed[0].1, NormalizeError::FileName(_)));
        }
    }
}
