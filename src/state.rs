use crate::config::QueryConfig;
use crate::data::model::{SalaryDataset, SalaryRecord};
use crate::data::query::{Page, Query, QueryRequest, QueryResult};
use crate::error::QueryError;

// ---------------------------------------------------------------------------
// Dashboard state
// ---------------------------------------------------------------------------

/// What the dashboard table currently shows, independent of rendering.
pub struct DashboardState {
    /// The canonical dataset.  Never mutated after construction.
    dataset: SalaryDataset,

    /// Query defaults (page size, default sort).
    pub config: QueryConfig,

    /// Last query that compiled.
    pub request: QueryRequest,

    /// Indices of rows matching `request`, in sorted order (cached).
    pub visible_indices: Vec<usize>,

    /// Error from the most recent rejected query, shown next to the table.
    pub status_message: Option<String>,
}

impl DashboardState {
    /// Start with the empty filter, the default sort and the first page.
    pub fn new(dataset: SalaryDataset, config: QueryConfig) -> Result<Self, QueryError> {
        let request = QueryRequest::new(config.page_size);
        let visible_indices = Query::compile(&request, &config.default_sort)?.ordered_indices(&dataset);
        Ok(Self {
            dataset,
            config,
            request,
            visible_indices,
            status_message: None,
        })
    }

    pub fn dataset(&self) -> &SalaryDataset {
        &self.dataset
    }

    /// Apply a new table query.  A rejected query leaves the previous request
    /// and its rows in place and records the error in `status_message`.
    pub fn apply(&mut self, request: QueryRequest) -> Result<(), QueryError> {
        match Query::compile(&request, &self.config.default_sort) {
            Ok(query) => {
                self.visible_indices = query.ordered_indices(&self.dataset);
                self.request = request;
                self.status_message = None;
                Ok(())
            }
            Err(e) => {
                log::warn!("rejected query {:?}: {e}", request.filter_query);
                self.status_message = Some(format!("Error: {e}"));
                Err(e)
            }
        }
    }

    /// Move to another page of the current result without re-filtering.
    pub fn set_page(&mut self, page_current: usize) {
        self.request.page_current = page_current;
    }

    /// The rows of the current page plus the total match count.
    pub fn current_page(&self) -> QueryResult<'_> {
        let page = Page {
            index: self.request.page_current,
            size: self.request.page_size,
        };
        QueryResult::from_indices(&self.dataset, &self.visible_indices, page)
    }

    pub fn current_rows(&self) -> Vec<&SalaryRecord> {
        self.current_page().rows
    }
}
