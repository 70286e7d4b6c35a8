use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use roster_solver::config::{ConfigOverrides, RosterConfig};
use roster_solver::data::RosterInput;
use roster_solver::engine::HighsEngine;
use roster_solver::{server, solver};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(
    name = "roster_solver",
    about = "Fair shift rostering on top of a MILP solver"
)]
struct Cli {
    #[command(flatten)]
    config: ConfigArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, clap::Args, Clone, Default)]
struct ConfigArgs {
    #[arg(long = "max-hours")]
    max_hours: Option<f64>,
    #[arg(long = "sunday-quota")]
    sunday_quota: Option<f64>,
    #[arg(long = "time-limit")]
    time_limit_secs: Option<f64>,
}

impl From<ConfigArgs> for ConfigOverrides {
    fn from(value: ConfigArgs) -> Self {
        Self {
            max_hours: value.max_hours,
            sunday_quota: value.sunday_quota,
            time_limit_secs: value.time_limit_secs,
        }
    }
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Serve POST /v1/roster/solve
    Serve {
        #[arg(long, default_value = "127.0.0.1:8080")]
        bind: SocketAddr,
    },
    /// Solve a JSON roster request from disk
    Solve {
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let defaults = RosterConfig::default().with_overrides(cli.config.into());
    defaults.validate()?;

    match cli.command {
        Commands::Serve { bind } => server::run_server(bind, defaults).await,
        Commands::Solve { input, output } => {
            let raw = fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let request: RosterInput = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", input.display()))?;
            let result = tokio::task::spawn_blocking(move || {
                solver::solve(&request, &defaults, &HighsEngine::default())
            })
            .await??;
            let rendered = serde_json::to_string_pretty(&result)?;
            match output {
                Some(path) => fs::write(&path, rendered)
                    .with_context(|| format!("writing {}", path.display()))?,
                None => println!("{rendered}"),
            }
            Ok(())
        }
    }
}
