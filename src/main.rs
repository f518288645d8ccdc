use anyhow::Context;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use fit::{
    ColumnStore, Config, Dataset, DatasetFile, Function, Grouping, Precision, Query, Resolver,
    RocksStore, Series,
};

#[derive(Parser, Debug)]
#[command(name = "fit")]
#[command(about = "Store numeric datasets and query them with windowed aggregations", long_about = None)]
struct Args {
    /// Column store directory (overrides config and FIT_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Configuration file (defaults to ./fit.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List stored datasets
    Ls,

    /// Delete a dataset
    Rm {
        /// Dataset name
        name: String,
    },

    /// Import a JSON dataset file: {"name": .., "columns": [..], "rows": [[..], ..]}
    Write {
        /// Path to the JSON file
        file: PathBuf,
    },

    /// Resolve a query and optionally reduce it over duration windows
    Show {
        /// Selector such as `name,col1,col2` or `name,*` (repeatable)
        #[arg(short = 'q', long = "query", required = true)]
        queries: Vec<String>,

        /// Number of rows to print
        #[arg(short = 'n', long)]
        lines: Option<usize>,

        /// Duration grouping such as `Duration,0,1m`
        #[arg(long)]
        group: Option<Grouping>,

        /// Reducer applied to each window (sum, min, max, avg)
        #[arg(long = "fn")]
        function: Option<Function>,
    },

    /// Resolve a query and roll it up by calendar precision
    Rollup {
        /// Selector such as `name,col1,col2` or `name,*` (repeatable)
        #[arg(short = 'q', long = "query", required = true)]
        queries: Vec<String>,

        /// Column holding Unix seconds
        #[arg(long)]
        time: String,

        /// day, month, year or none
        #[arg(long, default_value = "none")]
        precision: Precision,

        /// Reduce each bucket with this function instead of summing it
        #[arg(long = "fn")]
        function: Option<Function>,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(db) = &args.db {
        config.db_path = db.clone();
    }

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let store = RocksStore::with_compression(&config.db_path, config.compression)
        .with_context(|| format!("Failed to open store at {}", config.db_path.display()))?;

    match args.command {
        Command::Ls => list(&store, args.json),
        Command::Rm { name } => {
            store.delete(&name)?;
            println!("{} Deleted: {}", "✓".green(), name);
            Ok(())
        }
        Command::Write { file } => {
            let content = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let dataset = DatasetFile::from_json(&content)?.into_dataset()?;
            store.put(&dataset)?;
            store.flush()?;
            println!(
                "{} Wrote {} ({} rows x {} columns)",
                "✓".green(),
                dataset.name,
                dataset.len(),
                dataset.columns().len()
            );
            Ok(())
        }
        Command::Show {
            queries,
            lines,
            group,
            function,
        } => {
            let mut query = Query::new(queries.as_slice(), None, None)?;
            query.function = function;
            query.grouping = group.map(|g| g.with_seed(config.seed));

            let result = Resolver::new(&store).execute(&query)?;
            if args.json {
                print_json(&dataset_json(&result))
            } else {
                print_dataset(&result, lines.unwrap_or(config.lines));
                Ok(())
            }
        }
        Command::Rollup {
            queries,
            time,
            precision,
            function,
        } => {
            let query = Query::new(queries.as_slice(), None, None)?;
            let resolved = Resolver::new(&store).resolve(&query)?;
            let series = Series::from_dataset(&resolved, &time)?;
            let rolled = match function {
                Some(function) => series.aggregate(precision, function),
                None => series.rollup(precision),
            };

            if args.json {
                print_json(&serde_json::to_value(&rolled)?)
            } else {
                print_series(&rolled);
                Ok(())
            }
        }
    }
}

fn list(store: &RocksStore, json: bool) -> anyhow::Result<()> {
    let datasets = store.list()?;
    if json {
        return print_json(&serde_json::to_value(&datasets)?);
    }
    if datasets.is_empty() {
        println!("{} No datasets stored in {}", "!".yellow(), store.path().display());
        return Ok(());
    }

    println!(
        "{:<24} {:>8} {:>8}  {}",
        "NAME".bold(),
        "ROWS".bold(),
        "COLS".bold(),
        "COLUMNS".bold()
    );
    for meta in datasets {
        println!(
            "{:<24} {:>8} {:>8}  {}",
            meta.name,
            meta.stats.rows,
            meta.stats.columns,
            meta.columns.join(",").dimmed()
        );
    }
    Ok(())
}

fn dataset_json(dataset: &Dataset) -> serde_json::Value {
    serde_json::json!({
        "name": dataset.name,
        "columns": dataset.columns(),
        "rows": dataset.matrix().rows_iter().collect::<Vec<_>>(),
    })
}

fn print_json(value: &serde_json::Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_dataset(dataset: &Dataset, lines: usize) {
    let header: Vec<String> = dataset
        .columns()
        .iter()
        .map(|c| format!("{:>12}", c))
        .collect();
    println!("{}", header.join(" ").bold());

    for row in dataset.matrix().rows_iter().take(lines) {
        let cells: Vec<String> = row.iter().map(|v| format!("{:>12.4}", v)).collect();
        println!("{}", cells.join(" "));
    }

    if dataset.len() > lines {
        println!(
            "{}",
            format!("... {} more rows", dataset.len() - lines).dimmed()
        );
    }
}

fn print_series(series: &Series) {
    let mut header = vec![format!("{:<25}", "TIME")];
    header.extend(series.keys().iter().map(|k| format!("{:>12}", k)));
    println!("{}", header.join(" ").bold());

    for row in series.rows() {
        let mut cells = vec![format!("{:<25}", row.time.to_rfc3339())];
        cells.extend(row.values.iter().map(|v| format!("{:>12.4}", v)));
        println!("{}", cells.join(" "));
    }
}
