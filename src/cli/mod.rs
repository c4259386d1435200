pub mod process;

use std::{env, path::PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use process::{kill_previous_servers, restart_server};
use tracing::level_filters::LevelFilter;

use crate::{
    analyze::{gemini::GeminiAnalyzer, Analyzer},
    config::Config,
    report::{Presenter, TerminalPresenter},
    tracker::{start_tracker, TrackerPaths},
    utils::{
        dir::{create_application_default_path, ensure_dir},
        logging::{enable_logging, CLI_PREFIX, TRACKER_PREFIX},
    },
};

#[derive(Parser, Debug)]
#[command(name = "focustrack", version, long_about = None)]
#[command(about = "Tracks focused windows, keeps you in focus sessions and summarizes your day")]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(
        long,
        global = true,
        help = "Application directory. By default $XDG_STATE_HOME/focustrack, $HOME/.local/state/focustrack or %APPDATA%\\focustrack"
    )]
    dir: Option<PathBuf>,
    #[arg(long = "log-console", global = true, help = "Mirror logs to stdout")]
    log_console: bool,
    #[arg(long = "log-filter", global = true, help = "Log level, overrides RUST_LOG")]
    log_filter: Option<LevelFilter>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Run the tracker in the current console")]
    Serve {
        #[arg(long, help = "Start from an empty activity log")]
        fresh: bool,
    },
    #[command(about = "Stop previous trackers and start a detached one")]
    Start {
        #[arg(long, help = "Start from an empty activity log")]
        fresh: bool,
    },
    #[command(about = "Stop running trackers")]
    Stop {},
    #[command(about = "Summarize the activity log now")]
    Analyze {
        #[arg(long, help = "Display the summary afterwards")]
        show: bool,
    },
    #[command(about = "Display the latest summary")]
    Dashboard {},
    #[command(about = "Print the configuration in use")]
    Config {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let app_dir = match args.dir {
        Some(dir) => ensure_dir(dir)?,
        None => create_application_default_path()?,
    };
    let prefix = match args.commands {
        Commands::Serve { .. } => TRACKER_PREFIX,
        _ => CLI_PREFIX,
    };
    enable_logging(prefix, &app_dir, args.log_filter, args.log_console)?;

    let paths = TrackerPaths::in_dir(&app_dir);
    match args.commands {
        Commands::Serve { fresh } => start_tracker(app_dir, fresh).await,
        Commands::Start { fresh } => restart_server(&app_dir, fresh),
        Commands::Stop {} => {
            let killed = kill_previous_servers(&env::current_exe()?)?;
            println!("Stopped {killed} tracker(s)");
            Ok(())
        }
        Commands::Analyze { show } => {
            GeminiAnalyzer::from_env()?
                .analyze(&paths.log, &paths.summary)
                .await?;
            // Merges the learned keywords right away.
            Config::load(&paths.config, &paths.summary).await?;
            println!("Summary saved to {}", paths.summary.display());
            if show {
                TerminalPresenter::new(true).display(&paths.summary).await?;
            }
            Ok(())
        }
        Commands::Dashboard {} => TerminalPresenter::new(true).display(&paths.summary).await,
        Commands::Config {} => {
            let config = Config::load(&paths.config, &paths.summary).await?;
            println!("{}", paths.config.display());
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
    }
}
