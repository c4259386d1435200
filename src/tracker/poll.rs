use std::time::Duration;

use anyhow::{anyhow, Result};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use crate::{
    analyze::Analyzer,
    config::Config,
    notify::Notifier,
    report::Presenter,
    utils::clock::Clock,
    window_api::WindowInspector,
};

use super::{
    classifier::Classifier,
    session::{
        intent::{Intent, Notice},
        machine::{FocusStateMachine, Thresholds},
        state::{SessionState, WindowObservation},
    },
    storage::activity_log::ActivityLogStore,
    TrackerPaths,
};

/// Upper bound for one analysis, so a stalled model endpoint can't hold up the loop forever.
pub const ANALYSIS_TIMEOUT: Duration = Duration::from_secs(90);

/// Everything the tracker talks to outside of its own state.
pub struct Collaborators {
    pub inspector: Box<dyn WindowInspector>,
    pub notifier: Box<dyn Notifier>,
    pub analyzer: Box<dyn Analyzer>,
    pub presenter: Box<dyn Presenter>,
}

/// Drives the focus session state machine: one observation per tick, intents executed in order
/// before the next tick.
pub struct FocusTracker<S: ActivityLogStore> {
    collaborators: Collaborators,
    store: S,
    paths: TrackerPaths,
    config: Config,
    classifier: Classifier,
    machine: FocusStateMachine,
    state: SessionState,
    shutdown: CancellationToken,
    clock: Box<dyn Clock>,
}

impl<S: ActivityLogStore> FocusTracker<S> {
    pub fn new(
        collaborators: Collaborators,
        store: S,
        paths: TrackerPaths,
        config: Config,
        shutdown: CancellationToken,
        clock: Box<dyn Clock>,
    ) -> Self {
        let state = SessionState::new(clock.time());
        Self {
            collaborators,
            store,
            paths,
            classifier: Classifier::from_config(&config),
            machine: FocusStateMachine::new(Thresholds::from(&config)),
            config,
            state,
            shutdown,
            clock,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Failing to read the window is never fatal, the tick goes on with a blank window.
    fn observe(&mut self) -> WindowObservation {
        let now = self.clock.time();
        match self.collaborators.inspector.active_window() {
            Ok(Some(window)) => WindowObservation {
                title: window.title,
                app_name: window.app_name,
                observed_at: now,
            },
            Ok(None) => WindowObservation::blank(now),
            Err(e) => {
                error!("Encountered an error while reading the active window {e:?}");
                WindowObservation::blank(now)
            }
        }
    }

    /// Performs one tick.
    pub async fn step(&mut self) {
        let observation = self.observe();
        let category = self.classifier.classify(&observation.title);
        let intents = self.machine.tick(&mut self.state, &observation, category);
        self.execute(intents).await;
    }

    async fn execute(&mut self, intents: Vec<Intent>) {
        for intent in intents {
            match intent {
                Intent::RecordDwell {
                    window,
                    started_at,
                    ended_at,
                } => {
                    let recorded = self
                        .store
                        .record_dwell(window.record_name(), started_at, ended_at)
                        .await;
                    match recorded {
                        Ok(Some(record)) => debug!(
                            "Recorded {:?}, total {}s",
                            record.name, record.total_time_spent
                        ),
                        Ok(None) => debug!("Skipped short dwell on {window}"),
                        Err(e) => error!("Failed to record dwell on {window} {e:?}"),
                    }
                }
                Intent::Notify(notice) => self.notify(&notice),
                Intent::Analyze { present } => self.analyze(present).await,
            }
        }
    }

    fn notify(&mut self, notice: &Notice) {
        info!("Notifying: {}", notice.title());
        self.collaborators
            .notifier
            .notify(notice.title(), &notice.message(), notice.timeout_seconds())
            .inspect_err(|e| error!("Failed to show notification {e:?}"))
            .ok();
    }

    /// Runs the analyzer. On success the configuration is reloaded, so learned keywords are used
    /// from the next tick on. The previous summary stays in place when the analysis fails.
    ///
    /// The analysis is bounded by [ANALYSIS_TIMEOUT]. While the tracker is running it is also
    /// abandoned as soon as shutdown is requested, so the final dwell still gets recorded.
    #[instrument(skip(self))]
    async fn analyze(&mut self, present: bool) {
        let running = !self.shutdown.is_cancelled();
        let analysis = tokio::time::timeout(
            ANALYSIS_TIMEOUT,
            self.collaborators
                .analyzer
                .analyze(&self.paths.log, &self.paths.summary),
        );
        let analyzed = tokio::select! {
            result = analysis => match result {
                Ok(result) => result,
                Err(_) => Err(anyhow!("Analysis timed out after {}s", ANALYSIS_TIMEOUT.as_secs())),
            },
            _ = self.shutdown.cancelled(), if running => {
                Err(anyhow!("Analysis interrupted by shutdown"))
            }
        };
        if let Err(e) = analyzed {
            error!("Analysis failed, keeping the previous summary {e:?}");
            return;
        }

        match Config::load(&self.paths.config, &self.paths.summary).await {
            Ok(config) => self.apply_config(config),
            Err(e) => warn!("Failed to reload configuration {e:?}"),
        }

        if present {
            self.collaborators
                .presenter
                .display(&self.paths.summary)
                .await
                .inspect_err(|e| error!("Failed to present the summary {e:?}"))
                .ok();
        }
    }

    fn apply_config(&mut self, config: Config) {
        self.classifier = Classifier::from_config(&config);
        self.machine = FocusStateMachine::new(Thresholds::from(&config));
        self.config = config;
    }

    /// Executes the tracker loop until the shutdown token is cancelled, then flushes the current
    /// dwell.
    pub async fn run(&mut self) -> Result<()> {
        info!("Tracker started");
        let mut tick_point = self.clock.instant();
        loop {
            tick_point += self.config.check_interval();

            self.step().await;

            // A slow tick (e.g. an analysis) shouldn't be followed by a burst of catch-up ticks.
            let now = self.clock.instant();
            if tick_point < now {
                tick_point = now;
            }

            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = self.clock.sleep_until(tick_point) => ()
            }
        }
        self.finish().await;
        info!("Tracker stopped");
        Ok(())
    }

    /// Records the dwell that is still open and, when configured, analyzes and presents the log
    /// one last time.
    pub async fn finish(&mut self) {
        let intents = self.machine.shutdown(&mut self.state, self.clock.time());
        self.execute(intents).await;
        if self.config.analyze_on_exit {
            self.analyze(true).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{
        path::Path,
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
        time::Duration as StdDuration,
    };

    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
    use serde_json::{json, Value};
    use tempfile::{tempdir, TempDir};
    use tokio::time::Instant;
    use tokio_util::sync::CancellationToken;

    use crate::{
        analyze::Analyzer,
        config::Config,
        fs::operations::{read_json, write_json_atomically},
        notify::MockNotifier,
        report::Presenter,
        tracker::{
            classifier::Category,
            session::state::FocusPhase,
            storage::activity_log::{
                memory::MemoryActivityLogStore, ActivityLogStore, JsonActivityLogStore,
            },
            TrackerPaths,
        },
        utils::{
            clock::test_clock::{ManualClock, TokioClock},
            logging::TEST_LOGGING,
        },
        window_api::{ActiveWindow, MockWindowInspector},
    };

    use super::{Collaborators, FocusTracker};

    const TEST_START_DATE: NaiveDateTime =
        NaiveDateTime::new(NaiveDate::from_ymd_opt(2018, 7, 4).unwrap(), NaiveTime::MIN);

    fn at(t: f64) -> DateTime<Utc> {
        Utc.from_utc_datetime(&TEST_START_DATE) + Duration::milliseconds((t * 1000.) as i64)
    }

    fn window(title: &str, app_name: &str) -> ActiveWindow {
        ActiveWindow {
            title: title.into(),
            app_name: app_name.into(),
        }
    }

    fn scenario_config() -> Config {
        Config {
            productive_keywords: vec!["code".into()],
            unproductive_keywords: vec!["youtube".into()],
            start_focus_session_in: 5.,
            nudge_cooldown: 5.,
            max_unproductive_session_time: 10.,
            check_interval: 0.5,
            analyze_interval: None,
            analyze_on_exit: false,
        }
    }

    /// Inspector that reports whatever window the test put into `current`.
    fn scripted_inspector(current: Arc<Mutex<Option<ActiveWindow>>>) -> MockWindowInspector {
        let mut inspector = MockWindowInspector::new();
        inspector
            .expect_active_window()
            .returning(move || Ok(current.lock().unwrap().clone()));
        inspector
    }

    fn recording_notifier(titles: Arc<Mutex<Vec<String>>>) -> MockNotifier {
        let mut notifier = MockNotifier::new();
        notifier
            .expect_notify()
            .returning(move |title, _, _| {
                titles.lock().unwrap().push(title.to_string());
                Ok(())
            });
        notifier
    }

    /// Writes a fixed summary, or fails when `reply` is [None].
    struct FakeAnalyzer {
        reply: Option<Value>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Analyzer for FakeAnalyzer {
        async fn analyze(&self, _log_path: &Path, summary_path: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Some(reply) => write_json_atomically(summary_path, reply).await,
                None => Err(anyhow!("model unavailable")),
            }
        }
    }

    struct CountingPresenter {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Presenter for CountingPresenter {
        async fn display(&self, _summary_path: &Path) -> Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Fixture {
        _dir: TempDir,
        paths: TrackerPaths,
        current: Arc<Mutex<Option<ActiveWindow>>>,
        notices: Arc<Mutex<Vec<String>>>,
        analyses: Arc<AtomicUsize>,
        presentations: Arc<AtomicUsize>,
    }

    impl Fixture {
        async fn new(config: &Config) -> Result<Self> {
            let dir = tempdir()?;
            let paths = TrackerPaths::in_dir(dir.path());
            write_json_atomically(&paths.config, config).await?;
            Ok(Self {
                _dir: dir,
                paths,
                current: Arc::new(Mutex::new(None)),
                notices: Arc::new(Mutex::new(vec![])),
                analyses: Arc::new(AtomicUsize::new(0)),
                presentations: Arc::new(AtomicUsize::new(0)),
            })
        }

        fn collaborators(&self, reply: Option<Value>) -> Collaborators {
            Collaborators {
                inspector: Box::new(scripted_inspector(self.current.clone())),
                notifier: Box::new(recording_notifier(self.notices.clone())),
                analyzer: Box::new(FakeAnalyzer {
                    reply,
                    calls: self.analyses.clone(),
                }),
                presenter: Box::new(CountingPresenter {
                    calls: self.presentations.clone(),
                }),
            }
        }

        fn show(&self, window: ActiveWindow) {
            *self.current.lock().unwrap() = Some(window);
        }

        fn notices(&self) -> Vec<String> {
            self.notices.lock().unwrap().clone()
        }
    }

    /// Ticks every half second from `from` (inclusive) to `to` (exclusive).
    async fn hold<S: ActivityLogStore>(
        tracker: &mut FocusTracker<S>,
        clock: &ManualClock,
        from: f64,
        to: f64,
    ) {
        let mut t = from;
        while t < to {
            clock.set(at(t));
            tracker.step().await;
            t += 0.5;
        }
    }

    #[tokio::test]
    async fn test_focus_then_distraction_scenario() -> Result<()> {
        *TEST_LOGGING;
        let config = scenario_config();
        let fixture = Fixture::new(&config).await?;
        let clock = ManualClock::new(at(0.));
        let store = JsonActivityLogStore::new(fixture.paths.log.clone())?;

        let mut tracker = FocusTracker::new(
            fixture.collaborators(None),
            store,
            fixture.paths.clone(),
            config,
            CancellationToken::new(),
            Box::new(clock.clone()),
        );

        fixture.show(window("code - editor", "code"));
        hold(&mut tracker, &clock, 0., 6.).await;
        assert_eq!(tracker.state().phase(), FocusPhase::InFocusSession);
        assert_eq!(fixture.notices(), vec!["Focus session started"]);

        fixture.show(window("youtube - video", "firefox"));
        hold(&mut tracker, &clock, 6., 18.).await;
        assert_eq!(tracker.state().current_category, Category::Unproductive);

        clock.set(at(18.));
        tracker.finish().await;

        assert_eq!(
            fixture.notices(),
            vec![
                "Focus session started",
                "Stay focused!",
                "Stay focused!",
                "Stay focused!"
            ]
        );

        let log = JsonActivityLogStore::new(fixture.paths.log.clone())?
            .load_all()
            .await?;
        assert_eq!(log.apps.len(), 2);
        let editor = log.find("code - editor").unwrap();
        assert_eq!(editor.total_time_spent, 6.);
        assert_eq!(editor.longest_session, 6.);
        assert_eq!(log.find("youtube - video").unwrap().total_time_spent, 12.);
        assert_eq!(fixture.analyses.load(Ordering::SeqCst), 0);
        Ok(())
    }

    #[tokio::test]
    async fn test_failed_analysis_keeps_summary() -> Result<()> {
        *TEST_LOGGING;
        let config = Config {
            analyze_interval: Some(1.),
            ..scenario_config()
        };
        let fixture = Fixture::new(&config).await?;
        write_json_atomically(&fixture.paths.summary, &json!({ "insights": ["previous"] })).await?;

        let clock = ManualClock::new(at(0.));
        let mut tracker = FocusTracker::new(
            fixture.collaborators(None),
            JsonActivityLogStore::new(fixture.paths.log.clone())?,
            fixture.paths.clone(),
            config,
            CancellationToken::new(),
            Box::new(clock.clone()),
        );

        fixture.show(window("notes", "editor"));
        hold(&mut tracker, &clock, 0., 2.).await;
        assert_eq!(fixture.analyses.load(Ordering::SeqCst), 1);

        // The loop keeps going after the failure.
        fixture.show(window("downloads", "files"));
        hold(&mut tracker, &clock, 2., 2.5).await;

        let summary = read_json::<Value>(&fixture.paths.summary)
            .await?
            .into_option()
            .unwrap();
        assert_eq!(summary["insights"][0], "previous");
        assert_eq!(fixture.presentations.load(Ordering::SeqCst), 0);

        let log = JsonActivityLogStore::new(fixture.paths.log.clone())?
            .load_all()
            .await?;
        assert_eq!(log.find("notes").unwrap().total_time_spent, 2.);
        Ok(())
    }

    #[tokio::test]
    async fn test_analysis_teaches_keywords() -> Result<()> {
        *TEST_LOGGING;
        let config = Config {
            analyze_on_exit: true,
            ..scenario_config()
        };
        let fixture = Fixture::new(&config).await?;
        let clock = ManualClock::new(at(0.));
        let reply = json!({
            "summary": { "total_time": 1.0 },
            "productive_keywords": ["lecture"],
            "unproductive_keywords": ["memes"]
        });
        let mut tracker = FocusTracker::new(
            fixture.collaborators(Some(reply)),
            MemoryActivityLogStore::default(),
            fixture.paths.clone(),
            config,
            CancellationToken::new(),
            Box::new(clock.clone()),
        );

        fixture.show(window("Rust lecture", "browser"));
        hold(&mut tracker, &clock, 0., 1.).await;
        assert_eq!(tracker.state().current_category, Category::Neutral);

        tracker.finish().await;
        assert_eq!(fixture.analyses.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.presentations.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.config.productive_keywords, vec!["code", "lecture"]);

        hold(&mut tracker, &clock, 1., 1.5).await;
        assert_eq!(tracker.state().current_category, Category::Productive);

        let stored = read_json::<Config>(&fixture.paths.config)
            .await?
            .into_option()
            .unwrap();
        assert_eq!(stored.unproductive_keywords, vec!["youtube", "memes"]);
        Ok(())
    }

    #[tokio::test]
    async fn test_inspector_errors_are_blank_windows() -> Result<()> {
        *TEST_LOGGING;
        let config = scenario_config();
        let fixture = Fixture::new(&config).await?;
        let clock = ManualClock::new(at(0.));

        let mut inspector = MockWindowInspector::new();
        inspector
            .expect_active_window()
            .returning(|| Err(anyhow!("display went away")));
        let mut collaborators = fixture.collaborators(None);
        collaborators.inspector = Box::new(inspector);

        let mut tracker = FocusTracker::new(
            collaborators,
            MemoryActivityLogStore::default(),
            fixture.paths.clone(),
            config,
            CancellationToken::new(),
            Box::new(clock.clone()),
        );
        hold(&mut tracker, &clock, 0., 3.).await;
        assert_eq!(tracker.state().phase(), FocusPhase::Idle);
        assert!(fixture.notices().is_empty());
        Ok(())
    }

    /// Analyzer that never answers, like a stalled endpoint.
    struct StalledAnalyzer;

    #[async_trait]
    impl Analyzer for StalledAnalyzer {
        async fn analyze(&self, _log_path: &Path, _summary_path: &Path) -> Result<()> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_analysis_does_not_block_shutdown() -> Result<()> {
        *TEST_LOGGING;
        let config = Config {
            analyze_interval: Some(1.),
            analyze_on_exit: true,
            ..scenario_config()
        };
        let fixture = Fixture::new(&config).await?;
        fixture.show(window("notes", "editor"));
        let mut collaborators = fixture.collaborators(None);
        collaborators.analyzer = Box::new(StalledAnalyzer);

        let shutdown_token = CancellationToken::new();
        let mut tracker = FocusTracker::new(
            collaborators,
            MemoryActivityLogStore::default(),
            fixture.paths.clone(),
            config,
            shutdown_token.clone(),
            Box::new(TokioClock {
                start_time: at(0.),
                reference: Instant::now(),
            }),
        );

        let (_, result) = tokio::join!(
            async {
                tokio::time::sleep(StdDuration::from_secs(3)).await;
                shutdown_token.cancel()
            },
            tokio::time::timeout(StdDuration::from_secs(3600), tracker.run()),
        );
        result??;

        let log = tracker.store.log.borrow().clone();
        assert_eq!(log.find("notes").unwrap().total_time_spent, 3.);
        assert_eq!(fixture.presentations.load(Ordering::SeqCst), 0);
        Ok(())
    }

    /// Smoke test of the real loop with paused time: windows alternate every second, the loop is
    /// cancelled at 5.5 seconds.
    #[tokio::test(start_paused = true)]
    async fn smoke_test_tracker_loop() -> Result<()> {
        *TEST_LOGGING;
        let config = Config {
            productive_keywords: vec![],
            unproductive_keywords: vec![],
            ..scenario_config()
        };
        let dir = tempdir()?;

        let mut inspector = MockWindowInspector::new();
        let mut items = [
            window("a", "app"),
            window("a", "app"),
            window("b", "app"),
            window("b", "app"),
        ]
        .into_iter()
        .cycle();
        inspector
            .expect_active_window()
            .returning(move || Ok(items.next()))
            .times(..14);

        let mut notifier = MockNotifier::new();
        notifier.expect_notify().never();

        let collaborators = Collaborators {
            inspector: Box::new(inspector),
            notifier: Box::new(notifier),
            analyzer: Box::new(FakeAnalyzer {
                reply: None,
                calls: Arc::new(AtomicUsize::new(0)),
            }),
            presenter: Box::new(CountingPresenter {
                calls: Arc::new(AtomicUsize::new(0)),
            }),
        };

        let shutdown_token = CancellationToken::new();
        let clock = TokioClock {
            start_time: at(0.),
            reference: Instant::now(),
        };
        let mut tracker = FocusTracker::new(
            collaborators,
            MemoryActivityLogStore::default(),
            TrackerPaths::in_dir(dir.path()),
            config,
            shutdown_token.clone(),
            Box::new(clock),
        );

        let (_, result) = tokio::join!(
            async {
                tokio::time::sleep(StdDuration::from_millis(5500)).await;
                shutdown_token.cancel()
            },
            tracker.run(),
        );
        result?;

        let log = tracker.store.log.borrow().clone();
        assert_eq!(log.find("a").unwrap().total_time_spent, 3.);
        assert_eq!(log.find("b").unwrap().total_time_spent, 2.);
        assert_eq!(log.total_time(), 5.);
        Ok(())
    }
}
