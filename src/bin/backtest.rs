use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ncaab_model::cache::SnapshotCache;
use ncaab_model::config::{EfficiencySource, RunConfig};
use ncaab_model::eval::Backtester;
use ncaab_model::model::EfficiencyModel;
use ncaab_model::scrapers::WebDataSource;
use ncaab_model::teams::TeamDirectory;

/// Backtest the NCAA basketball score model over a historical date range,
/// scoring it against sportsbook lines.
#[derive(Parser, Debug)]
#[command(name = "backtest")]
struct Args {
    /// First game date, YYYY-MM-DD
    #[arg(long)]
    start_date: String,

    /// Last game date (inclusive), YYYY-MM-DD
    #[arg(long)]
    end_date: String,

    /// Data directory root (defaults to $NCAAB_DATA_DIR, then ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Restrict the backtest to games involving these teams (repeatable)
    #[arg(long = "team")]
    teams: Vec<String>,

    /// Name used for the results file
    #[arg(long, default_value = "backtest_all")]
    test_name: String,

    /// Blend season efficiency with recent form instead of season-only
    #[arg(long)]
    blend: bool,

    /// Re-fetch every snapshot even if the cache is complete
    #[arg(long)]
    force: bool,

    /// Suppress progress output and the summary table
    #[arg(long)]
    quiet: bool,

    /// Skip the summary table (results are still written)
    #[arg(long)]
    no_summary: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let data_dir = args
        .data_dir
        .or_else(|| std::env::var("NCAAB_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"));

    let mut config = RunConfig::new(data_dir);
    config.quiet = args.quiet;
    config.print_summary = !args.no_summary;
    config.teams = args.teams;
    if args.blend {
        config.efficiency_source = EfficiencySource::blended();
    }

    let directory = TeamDirectory::load(&config.teams_dir())
        .context("Failed to load team name maps")?;
    let cache = SnapshotCache::new(config.cache_dir());
    let model = EfficiencyModel::new(&cache, &directory, &config);

    let backtester = Backtester::new(
        &config,
        &directory,
        &model,
        &args.start_date,
        &args.end_date,
    )?;

    let source = WebDataSource::new();
    backtester
        .prepare(&source, args.force)
        .await
        .context("Failed to prepare snapshot data")?;

    backtester.run(&args.test_name)?;

    Ok(())
}
