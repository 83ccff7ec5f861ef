use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use log::{error, info};
use std::path::PathBuf;

use milk_weights::{parse_month, DateRange, FarmStore, Filter, LoaderConfig, Report};

#[derive(Parser)]
#[command(name = "milk-weights")]
#[command(about = "Load dairy-farm milk weights from CSV and report on them")]
#[command(version)]
struct Cli {
    /// chrono format of the date column (default %Y-%m-%d)
    #[arg(long, global = true)]
    date_format: Option<String>,

    /// Strip whitespace around every field before parsing
    #[arg(long, global = true)]
    trim: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load files and print what was read
    Load {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List farms with their entry counts and totals
    Farms {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print the (filtered) entries as CSV, dates in --date-format
    Table {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print statistics for the (filtered) entries
    Report {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
        /// Emit JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Only this farm id
    #[arg(long, conflicts_with_all = ["year", "from"])]
    farm: Option<String>,

    /// Only this year
    #[arg(long, conflicts_with = "from")]
    year: Option<i32>,

    /// Only this month of --year (number or name)
    #[arg(long, requires = "year")]
    month: Option<String>,

    /// Range start (inclusive)
    #[arg(long, requires = "to")]
    from: Option<String>,

    /// Range end (inclusive)
    #[arg(long, requires = "from")]
    to: Option<String>,
}

impl FilterArgs {
    fn to_filter(&self, config: &LoaderConfig) -> Result<Filter> {
        if let Some(farm) = &self.farm {
            return Ok(Filter::Farm(farm.clone()));
        }

        if let (Some(from), Some(to)) = (&self.from, &self.to) {
            let parse = |s: &str| {
                NaiveDate::parse_from_str(s, &config.date_format)
                    .with_context(|| format!("Invalid date '{}' (expected {})", s, config.date_format))
            };
            return Ok(Filter::Range(DateRange::new(parse(from)?, parse(to)?)));
        }

        match (self.year, &self.month) {
            (Some(year), Some(month)) => {
                let month = parse_month(month).ok_or_else(|| anyhow!("Unknown month '{}'", month))?;
                Ok(Filter::Month { year, month })
            }
            (Some(year), None) => Ok(Filter::Year(year)),
            _ => Ok(Filter::All),
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let mut config = LoaderConfig::default();
    if let Some(format) = cli.date_format {
        config = config.with_date_format(format);
    }
    config = config.with_trim(cli.trim);

    match cli.command {
        Commands::Load { files } => {
            let (store, failures) = load_files(&files, &config);
            println!("Farms:   {}", store.farm_count());
            println!("Entries: {}", store.entry_count());
            let years = store.years();
            if let (Some(first), Some(last)) = (years.first(), years.last()) {
                println!("Years:   {} - {}", first, last);
            }
            finish(failures)
        }
        Commands::Farms { files } => {
            let (store, failures) = load_files(&files, &config);
            for id in store.farm_ids() {
                if let Some(farm) = store.farm(&id) {
                    println!("{:<12} {:>6} entries  {:>12} total", id, farm.len(), farm.total());
                }
            }
            finish(failures)
        }
        Commands::Table { files, filter } => {
            let filter = filter.to_filter(&config)?;
            let (store, failures) = load_files(&files, &config);
            println!("date,farm,weight");
            for entry in store.query(&filter) {
                println!("{}", entry.to_csv_row(&config.date_format));
            }
            finish(failures)
        }
        Commands::Report { files, filter, json } => {
            let filter = filter.to_filter(&config)?;
            let (store, failures) = load_files(&files, &config);
            let report = Report::build(&filter, store.query(&filter));

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print!("{}", report.summary());
            }
            finish(failures)
        }
    }
}

/// Load every file in order; a failed file is logged and the rest still load
fn load_files(files: &[PathBuf], config: &LoaderConfig) -> (FarmStore, usize) {
    let mut store = FarmStore::with_config(config.clone());
    let mut failures = 0;

    for path in files {
        if let Err(e) = store.load_data(path) {
            error!("Error reading {}: {}", path.display(), e);
            failures += 1;
        }
    }

    info!(
        "Store holds {} entries across {} farms",
        store.entry_count(),
        store.farm_count()
    );
    (store, failures)
}

fn finish(failures: usize) -> Result<()> {
    if failures > 0 {
        bail!("{} file(s) failed to load", failures);
    }
    Ok(())
}
