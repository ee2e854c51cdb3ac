use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use statscan::{cache, Language, StatCan};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

/// Download and inspect Statistics Canada data tables
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// Cache directory (defaults to $STATSCAN_CACHE_DIR, then ~/.statscan_cache)
    #[arg(long, global = true)]
    cache_dir: Option<PathBuf>,

    /// Table language, `eng` or `fra`
    #[arg(short, long, global = true, default_value = "eng")]
    lang: Language,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the download URL of a table
    Url { table_id: String },

    /// Download a table if needed and print its cached CSV path
    Fetch { table_id: String },

    /// Print a table's shape and first rows
    Show {
        table_id: String,

        #[arg(short = 'n', long, default_value = "10")]
        rows: usize,
    },

    /// Save a table as Parquet
    Export { table_id: String, out: PathBuf },

    /// List cached tables
    List,
}

fn main() -> Result<()> {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let statcan = StatCan::from_env().context("reading configuration")?;
    let cache_dir = args.cache_dir.as_deref();

    match args.command {
        Command::Url { table_id } => {
            println!("{}", statcan.build_url(&table_id, args.lang)?);
        }
        Command::Fetch { table_id } => {
            let path = statcan.fetch_table_file(&table_id, cache_dir, args.lang)?;
            println!("{}", path.display());
        }
        Command::Show { table_id, rows } => {
            let table = statcan.get_table(&table_id, cache_dir, args.lang)?;
            let (n_rows, n_cols) = table.shape();
            println!("{table_id} ({}): {n_rows} rows x {n_cols} columns", args.lang);
            println!("{}", table.head(rows));
        }
        Command::Export { table_id, out } => {
            let table = statcan.get_table(&table_id, cache_dir, args.lang)?;
            let bytes = table
                .write_parquet(&out)
                .with_context(|| format!("exporting {table_id}"))?;
            info!(path = %out.display(), bytes, rows = table.num_rows(), "exported");
        }
        Command::List => {
            let root = statcan.resolve_cache_dir(cache_dir)?;
            let entries = cache::list_entries(&root)?;
            if entries.is_empty() {
                info!(root = %root.display(), "cache is empty");
            }
            for entry in entries {
                let fetched = entry
                    .manifest
                    .map(|m| m.fetched_at.to_rfc3339())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{}", entry.key, entry.size_bytes, fetched);
            }
        }
    }

    Ok(())
}
