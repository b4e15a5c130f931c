/// Data layer: raw report parsing, normalization, storage and querying.
///
/// Architecture:
/// ```text
///  raw/<year>_<semester>.csv
///        │
///        ▼
///   ┌────────────┐
///   │ raw        │  ten fixed columns, cells as text
///   └────────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ normalize  │  split sections → clean currency → SalaryRecord
///   └────────────┘
///        │
///        ▼
///   ┌──────────────┐
///   │ SalaryDataset │  canonical rows  ⇄  writer / loader (.csv .json .parquet)
///   └──────────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ filter     │  `{col} op value && …`
///   │ query      │  sort → page → QueryResult
///   └────────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ chart      │  page → chart-ready series
///   └────────────┘
/// ```

pub mod chart;
pub mod filter;
pub mod loader;
pub mod model;
pub mod normalize;
pub mod query;
pub mod raw;
pub mod writer;
