use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ncaab_model::cache::SnapshotCache;
use ncaab_model::config::{EfficiencySource, RunConfig};
use ncaab_model::errors::ModelError;
use ncaab_model::eval::{ForwardWindow, Forwardtester};
use ncaab_model::model::EfficiencyModel;
use ncaab_model::scrapers::WebDataSource;
use ncaab_model::teams::TeamDirectory;

/// Predict the upcoming slate of NCAA basketball games. There are no
/// settled outcomes to score against, so this prints projections grouped by
/// tip-off time instead of a backtest summary.
#[derive(Parser, Debug)]
#[command(name = "fwdtest")]
struct Args {
    /// Predict today's games
    #[arg(long)]
    today: bool,

    /// Predict tomorrow's games
    #[arg(long)]
    tomorrow: bool,

    /// Data directory root (defaults to $NCAAB_DATA_DIR, then ./data)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Restrict predictions to games involving these teams (repeatable)
    #[arg(long = "team")]
    teams: Vec<String>,

    /// Name used for the results file
    #[arg(long, default_value = "fwdtest")]
    test_name: String,

    /// Blend season efficiency with recent form instead of season-only
    #[arg(long)]
    blend: bool,

    /// Re-fetch every snapshot even if the cache is complete
    #[arg(long)]
    force: bool,

    /// Suppress progress output and the slate printout
    #[arg(long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let window = match (args.today, args.tomorrow) {
        (true, true) => ForwardWindow::Both,
        (true, false) => ForwardWindow::Today,
        (false, true) => ForwardWindow::Tomorrow,
        (false, false) => {
            return Err(ModelError::Configuration {
                reason: "pass --today and/or --tomorrow".to_string(),
            }
            .into());
        }
    };

    let data_dir = args
        .data_dir
        .or_else(|| std::env::var("NCAAB_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("data"));

    let mut config = RunConfig::new(data_dir);
    config.quiet = args.quiet;
    config.teams = args.teams;
    if args.blend {
        config.efficiency_source = EfficiencySource::blended();
    }

    let directory = TeamDirectory::load(&config.teams_dir())
        .context("Failed to load team name maps")?;
    let cache = SnapshotCache::new(config.cache_dir());
    let model = EfficiencyModel::new(&cache, &directory, &config);

    let tester = Forwardtester::new(&config, &directory, &model, window)?;

    let source = WebDataSource::new();
    tester
        .prepare(&source, args.force)
        .await
        .context("Failed to prepare snapshot data")?;

    tester.run(&args.test_name)?;

    Ok(())
}
