use std::cmp::Ordering;
use std::ops::Range;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::filter::FilterExpr;
use super::model::{Column, SalaryDataset, SalaryRecord};
use crate::error::QueryError;

// ---------------------------------------------------------------------------
// Sort keys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// One sort key as the dashboard table sends it:
/// `{"column_id": "Median", "direction": "desc"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub column_id: String,
    #[serde(default)]
    pub direction: Direction,
}

impl SortSpec {
    pub fn asc(column_id: &str) -> Self {
        SortSpec {
            column_id: column_id.to_string(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(column_id: &str) -> Self {
        SortSpec {
            column_id: column_id.to_string(),
            direction: Direction::Desc,
        }
    }

    fn resolve(&self) -> Result<(Column, Direction), QueryError> {
        Ok((self.column_id.parse()?, self.direction))
    }
}

/// `"Median:desc"`, `"Major:asc"` or just `"Major"`.
impl FromStr for SortSpec {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (column_id, direction) = match s.rsplit_once(':') {
            Some((col, "asc")) => (col, Direction::Asc),
            Some((col, "desc")) => (col, Direction::Desc),
            Some((_, other)) => return Err(format!("unknown sort direction {other:?}")),
            None => (s, Direction::Asc),
        };
        Ok(SortSpec {
            column_id: column_id.to_string(),
            direction,
        })
    }
}

/// Stable multi-key sort of row indices; the first key is primary.
pub fn sort_indices(dataset: &SalaryDataset, indices: &mut [usize], keys: &[(Column, Direction)]) {
    indices.sort_by(|&a, &b| {
        let (ra, rb) = (&dataset.records[a], &dataset.records[b]);
        keys.iter()
            .map(|&(col, dir)| {
                let ord = ra.value(col).cmp(&rb.value(col));
                match dir {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    });
}

// ---------------------------------------------------------------------------
// Paging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub index: usize,
    pub size: usize,
}

impl Page {
    /// `[index*size, (index+1)*size)` clipped to `total`; past the end is empty.
    pub fn range(&self, total: usize) -> Range<usize> {
        let start = self.index.saturating_mul(self.size).min(total);
        let end = start.saturating_add(self.size).min(total);
        start..end
    }
}

// ---------------------------------------------------------------------------
// Query – the three inputs of one table interaction
// ---------------------------------------------------------------------------

/// A query as received from the dashboard, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub filter_query: String,
    #[serde(default)]
    pub sort_by: Vec<SortSpec>,
    #[serde(default)]
    pub page_current: usize,
    pub page_size: usize,
}

impl QueryRequest {
    pub fn new(page_size: usize) -> Self {
        QueryRequest {
            filter_query: String::new(),
            sort_by: Vec::new(),
            page_current: 0,
            page_size,
        }
    }
}

/// A validated query.  Compiling it is where unknown columns and malformed
/// clauses surface.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub filter: FilterExpr,
    pub sort: Vec<(Column, Direction)>,
    pub page: Page,
}

impl Query {
    /// `default_sort` applies when the request has no sort keys.
    pub fn compile(request: &QueryRequest, default_sort: &[SortSpec]) -> Result<Self, QueryError> {
        let filter = FilterExpr::parse(&request.filter_query)?;
        let specs = if request.sort_by.is_empty() {
            default_sort
        } else {
            request.sort_by.as_slice()
        };
        let sort = specs.iter().map(SortSpec::resolve).collect::<Result<Vec<_>, _>>()?;

        Ok(Query {
            filter,
            sort,
            page: Page {
                index: request.page_current,
                size: request.page_size,
            },
        })
    }

    /// Indices of all matching rows in sorted order.
    pub fn ordered_indices(&self, dataset: &SalaryDataset) -> Vec<usize> {
        let mut indices: Vec<usize> = dataset
            .records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.filter.matches(r))
            .map(|(i, _)| i)
            .collect();
        sort_indices(dataset, &mut indices, &self.sort);
        indices
    }

    pub fn run<'a>(&self, dataset: &'a SalaryDataset) -> QueryResult<'a> {
        let indices = self.ordered_indices(dataset);
        QueryResult::from_indices(dataset, &indices, self.page)
    }
}

/// One page of matching rows plus the total for the pager.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult<'a> {
    pub total: usize,
    pub rows: Vec<&'a SalaryRecord>,
}

impl<'a> QueryResult<'a> {
    pub fn from_indices(dataset: &'a SalaryDataset, indices: &[usize], page: Page) -> Self {
        let rows = indices[page.range(indices.len())]
            .iter()
            .map(|&i| &dataset.records[i])
            .collect();
        QueryResult {
            total: indices.len(),
            rows,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(major: &str, degree: &str, year: &str, median: f64) -> SalaryRecord {
        let mut r = SalaryRecord {
            major: major.into(),
            degree: degree.into(),
            num_salaries_reported: 4,
            avg: median,
            max: median,
            min: median,
            st_dev: String::new(),
            p25: median,
            median,
            p75: median,
            year: year.into(),
            semester: "Spring".into(),
            college: "College of Science".into(),
            year_semester_major: String::new(),
        };
        r.refresh_key();
        r
    }

    /// 60 Bachelor rows followed by 40 Master rows.
    fn hundred_rows() -> SalaryDataset {
        let records = (0..100)
            .map(|i| {
                let degree = if i < 60 { "Bachelor" } else { "Master" };
                let major = if i % 2 == 0 { "Computer Science" } else { "Biology" };
                let year = if i % 4 < 2 { "2018" } else { "2020" };
                record(major, degree, year, 40_000.0 + (i % 7) as f64 * 1_000.0)
            })
            .collect();
        SalaryDataset::from_records(records)
    }

    fn request(filter: &str, sort_by: Vec<SortSpec>, page_current: usize, page_size: usize) -> QueryRequest {
        QueryRequest {
            filter_query: filter.into(),
            sort_by,
            page_current,
            page_size,
        }
    }

    fn default_sort() -> Vec<SortSpec> {
        vec![SortSpec::asc("Major")]
    }

    #[test]
    fn test_equality_filter_counts() {
        let ds = hundred_rows();
        let q = Query::compile(&request("{Degree} = \"Bachelor\"", vec![], 0, 100), &default_sort()).unwrap();
        let result = q.run(&ds);
        assert_eq!(result.total, 60);
        assert_eq!(result.rows.len(), 60);
        assert!(result.rows.iter().all(|r| r.degree == "Bachelor"));
    }

    #[test]
    fn test_conjunction_is_and() {
        let ds = hundred_rows();
        let q = Query::compile(
            &request("{Year} >= 2019 && {Major} contains \"Computer\"", vec![], 0, 100),
            &default_sort(),
        )
        .unwrap();
        let result = q.run(&ds);
        assert_eq!(result.total, 25);
        assert!(result
            .rows
            .iter()
            .all(|r| r.year == "2020" && r.major.contains("Computer")));
    }

    #[test]
    fn test_paging_clips() {
        let ds = hundred_rows();
        let page2 = Query::compile(&request("", vec![], 2, 40), &default_sort()).unwrap().run(&ds);
        assert_eq!(page2.total, 100);
        assert_eq!(page2.rows.len(), 20);

        let page5 = Query::compile(&request("", vec![], 5, 40), &default_sort()).unwrap().run(&ds);
        assert_eq!(page5.total, 100);
        assert!(page5.rows.is_empty());

        assert_eq!(Page { index: 2, size: 40 }.range(100), 80..100);
        assert_eq!(Page { index: 0, size: 0 }.range(100), 0..0);
        assert_eq!(Page { index: usize::MAX, size: 40 }.range(100), 100..100);
    }

    #[test]
    fn test_multi_key_sort_is_stable() {
        let ds = SalaryDataset::from_records(vec![
            record("A", "Master", "2019", 50.0),
            record("B", "Bachelor", "2019", 70.0),
            record("C", "Bachelor", "2019", 90.0),
            record("D", "Master", "2019", 80.0),
            record("E", "Bachelor", "2019", 70.0),
        ]);
        let sort = vec![SortSpec::asc("Degree"), SortSpec::desc("Median")];
        let result = Query::compile(&request("", sort, 0, 10), &default_sort()).unwrap().run(&ds);

        let majors: Vec<&str> = result.rows.iter().map(|r| r.major.as_str()).collect();
        assert_eq!(majors, vec!["C", "B", "E", "D", "A"]);
    }

    #[test]
    fn test_default_sort_is_major() {
        let ds = SalaryDataset::from_records(vec![
            record("Zoology", "Bachelor", "2019", 1.0),
            record("Accounting", "Bachelor", "2019", 1.0),
        ]);
        let result = Query::compile(&request("", vec![], 0, 10), &default_sort()).unwrap().run(&ds);
        assert_eq!(result.rows[0].major, "Accounting");
    }

    #[test]
    fn test_errors_surface_at_compile() {
        let sort = vec![SortSpec::asc("Salary")];
        assert_eq!(
            Query::compile(&request("", sort, 0, 10), &default_sort()),
            Err(QueryError::UnknownColumn("Salary".into()))
        );
        assert!(matches!(
            Query::compile(&request("{Degree} Bachelor", vec![], 0, 10), &default_sort()),
            Err(QueryError::MalformedFilter(_))
        ));
    }

    #[test]
    fn test_sort_spec_from_str_and_json() {
        assert_eq!("Median:desc".parse::<SortSpec>().unwrap(), SortSpec::desc("Median"));
        assert_eq!("Major".parse::<SortSpec>().unwrap(), SortSpec::asc("Major"));
        assert!("Major:up".parse::<SortSpec>().is_err());

        let req: QueryRequest = serde_json::from_str(
            r#"{"filter_query": "{Year} = 2019", "sort_by": [{"column_id": "Median", "direction": "desc"}], "page_current": 1, "page_size": 40}"#,
        )
        .unwrap();
        assert_eq!(req.sort_by, vec![SortSpec::desc("Median")]);
        assert_eq!(req.page_current, 1);
    }
}
