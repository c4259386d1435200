//! The tracker: polls the focused window, classifies it, feeds the focus session state machine and
//! carries out what the machine asks for.

pub mod classifier;
pub mod poll;
pub mod session;
pub mod shutdown;
pub mod storage;

use std::path::{Path, PathBuf};

use anyhow::Result;
use poll::{Collaborators, FocusTracker};
use storage::activity_log::JsonActivityLogStore;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::{
    analyze::gemini::GeminiAnalyzer,
    config::Config,
    notify::DesktopNotifier,
    report::TerminalPresenter,
    utils::clock::DefaultClock,
    window_api::GenericWindowInspector,
};

/// Locations of the files the tracker works with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerPaths {
    pub config: PathBuf,
    pub log: PathBuf,
    pub summary: PathBuf,
}

impl TrackerPaths {
    pub fn in_dir(dir: &Path) -> Self {
        let data = dir.join("data");
        Self {
            config: dir.join("config.json"),
            log: data.join("app_data.json"),
            summary: data.join("user_data.json"),
        }
    }
}

/// Runs the tracker until an interrupt arrives. `fresh` starts from an empty activity log.
pub async fn start_tracker(dir: PathBuf, fresh: bool) -> Result<()> {
    let paths = TrackerPaths::in_dir(&dir);
    let config = Config::load(&paths.config, &paths.summary).await?;

    let store = JsonActivityLogStore::new(paths.log.clone())?;
    if fresh {
        info!("Starting from an empty activity log");
        store.reset().await?;
    }

    let collaborators = Collaborators {
        inspector: Box::new(GenericWindowInspector::new()?),
        notifier: Box::new(DesktopNotifier::new()),
        analyzer: Box::new(GeminiAnalyzer::from_env()?),
        presenter: Box::new(TerminalPresenter::new(true)),
    };

    let shutdown_token = CancellationToken::new();
    let mut tracker = FocusTracker::new(
        collaborators,
        store,
        paths,
        config,
        shutdown_token.clone(),
        Box::new(DefaultClock),
    );

    let (_, result) = tokio::join!(shutdown::detect_shutdown(shutdown_token.clone()), async {
        let result = tracker.run().await;
        shutdown_token.cancel();
        result
    });

    result.inspect_err(|e| error!("Tracker stopped with an error {e:?}"))
}
