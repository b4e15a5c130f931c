//! Semester salary reports → one canonical dataset → dashboard queries.
//!
//! * [`data::normalize`] splits each raw `<year>_<semester>.csv` report into
//!   college sections and cleans it into [`SalaryRecord`]s.
//! * [`data::writer`] / [`data::loader`] persist the canonical dataset.
//! * [`data::query`] answers the table's filter / sort / page requests and
//!   [`state::DashboardState`] keeps the last good answer around.
//!
//! ```no_run
//! use salary_board::{data, Config};
//!
//! let config = Config::default();
//! let ingest = data::normalize::normalize_dir("raw".as_ref(), &config).unwrap();
//! data::writer::write_dataset("merged.csv".as_ref(), &ingest.dataset).unwrap();
//! ```

pub mod config;
pub mod data;
pub mod error;
pub mod state;

pub use config::Config;
pub use data::model::{Column, SalaryDataset, SalaryRecord};
pub use error::{NormalizeError, QueryError};
