use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;

use salary_board::data::query::{QueryRequest, SortSpec};
use salary_board::data::{chart, loader, normalize, writer};
use salary_board::state::DashboardState;
use salary_board::Config;

#[derive(Parser)]
#[command(name = "salary-board")]
#[command(about = "Normalize semester salary reports and query the result", version)]
struct Cli {
    /// Path to a JSON config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge every <year>_<semester>.csv report into one dataset
    Normalize {
        /// Directory of raw reports
        raw_dir: PathBuf,
        /// Output file (.csv, .json or .parquet)
        output: PathBuf,
        /// Process files one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// Run one table query and print the page as JSON
    Query {
        /// Canonical dataset (.csv, .json or .parquet)
        dataset: PathBuf,
        /// Filter expression, e.g. '{Degree} = "Bachelor" && {Year} >= 2019'
        #[arg(short, long, default_value = "")]
        filter: String,
        /// Sort key as column[:asc|desc]; repeat for secondary keys
        #[arg(short, long)]
        sort: Vec<SortSpec>,
        /// Zero-based page index
        #[arg(short, long, default_value_t = 0)]
        page: usize,
        /// Rows per page (defaults to the configured page size)
        #[arg(long)]
        page_size: Option<usize>,
        /// Also emit chart series for the page
        #[arg(long)]
        charts: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Normalize {
            raw_dir,
            output,
            sequential,
        } => {
            if sequential {
                config.ingest.parallel = false;
            }
            let report = normalize::normalize_dir(&raw_dir, &config)
                .with_context(|| format!("normalizing {}", raw_dir.display()))?;
            writer::write_dataset(&output, &report.dataset)?;

            let skipped = report.failures().count();
            if skipped > 0 {
                bail!("{skipped} report file(s) skipped, see log");
            }
        }
        Commands::Query {
            dataset,
            filter,
            sort,
            page,
            page_size,
            charts,
        } => {
            let data = loader::load_dataset(&dataset)?;
            let mut state = DashboardState::new(data, config.query.clone())?;
            let request = QueryRequest {
                filter_query: filter,
                sort_by: sort,
                page_current: page,
                page_size: page_size.unwrap_or(config.query.page_size),
            };
            state.apply(request)?;

            let result = state.current_page();
            let mut out = json!({ "total": result.total, "rows": result.rows });
            if charts {
                out["charts"] = json!({
                    "scatter": chart::scatter_points(&result.rows),
                    "median_bars": chart::median_bars(&result.rows),
                    "grouped_bars": chart::grouped_bars(&result.rows),
                });
            }
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}
