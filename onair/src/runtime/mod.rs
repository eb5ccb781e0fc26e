//! Runtime assembly.
//!
//! [`RuntimeBuilder`] is the factory that produces a fresh core graph from
//! a frozen [`Settings`] record plus injected collaborators (platform
//! adapters, stream detector, scene control, speech providers). There is no
//! module-level mutable state: tests build their own instance and throw it
//! away.
//!
//! The running graph is a handful of tasks: the dispatch loop (router +
//! suppression store), the display queue daemon, the TTS worker, and one
//! connection supervisor per enabled platform. Shutdown propagates through
//! one cancellation token; supervisors get a grace period to clean up.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::adapter::{EventHandlers, PlatformAdapter};
use crate::bus::EventBus;
use crate::config::Settings;
use crate::diagnostics::DiagnosticEvent;
use crate::display::{DisplayConfig, DisplayQueue};
use crate::effector::noop::NoopSceneControl;
use crate::effector::obs::{ObsConfig, ObsSceneControl};
use crate::effector::SceneControl;
use crate::envelope::EventRecord;
use crate::lifecycle::{
    BackoffConfig, ConnectionSupervisor, LifecycleConfig, LifecycleError, StreamDetector,
};
use crate::notify::{NotificationManager, VfxCatalog};
use crate::router::EventRouter;
use crate::suppression::{SuppressionConfig, SuppressionStore};
use crate::tts::{CommandProvider, SpeechProvider, TtsConfig, TtsService};

/// Fatal runtime failures.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// A platform exhausted its detection retries.
    #[error("fatal connection error: {0}")]
    FatalConnection(#[from] LifecycleError),
}

/// Factory for a fresh core graph.
pub struct RuntimeBuilder {
    settings: Settings,
    adapters: Vec<(Arc<dyn PlatformAdapter>, Arc<dyn StreamDetector>)>,
    scene: Option<Arc<dyn SceneControl>>,
    tts_primary: Option<Arc<dyn SpeechProvider>>,
    tts_fallback: Option<Arc<dyn SpeechProvider>>,
    vfx: Option<VfxCatalog>,
}

impl RuntimeBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            adapters: Vec::new(),
            scene: None,
            tts_primary: None,
            tts_fallback: None,
            vfx: None,
        }
    }

    /// Register a platform adapter with its stream detector.
    ///
    /// Only adapters whose platform section is enabled are supervised.
    pub fn with_adapter(
        mut self,
        adapter: Arc<dyn PlatformAdapter>,
        detector: Arc<dyn StreamDetector>,
    ) -> Self {
        self.adapters.push((adapter, detector));
        self
    }

    /// Override the scene-control effector (defaults to the OBS client, or
    /// a no-op when `[obs]` is disabled).
    pub fn with_scene_control(mut self, scene: Arc<dyn SceneControl>) -> Self {
        self.scene = Some(scene);
        self
    }

    /// Override the speech providers (default from `[tts]` commands).
    pub fn with_speech_providers(
        mut self,
        primary: Arc<dyn SpeechProvider>,
        fallback: Option<Arc<dyn SpeechProvider>>,
    ) -> Self {
        self.tts_primary = Some(primary);
        self.tts_fallback = fallback;
        self
    }

    /// Override the VFX catalog (defaults to the built-in rules).
    pub fn with_vfx(mut self, vfx: VfxCatalog) -> Self {
        self.vfx = Some(vfx);
        self
    }

    /// Wire the graph. Nothing runs until [`Runtime::run`].
    pub fn build(self) -> Runtime {
        let settings = Arc::new(self.settings);
        let bus = EventBus::new();

        let scene: Arc<dyn SceneControl> = match self.scene {
            Some(scene) => scene,
            None if settings.obs.enabled => Arc::new(ObsSceneControl::new(ObsConfig {
                address: settings.obs.address.clone(),
                connection_timeout: Duration::from_millis(settings.obs.connection_timeout_ms),
                backoff: BackoffConfig::default(),
            })),
            None => Arc::new(NoopSceneControl::new()),
        };

        let (display, display_daemon) =
            DisplayQueue::new(DisplayConfig::from_settings(&settings), Arc::clone(&scene));

        let tts_primary = self
            .tts_primary
            .unwrap_or_else(|| Arc::new(CommandProvider::new(settings.tts.provider.clone())));
        let tts_fallback = self.tts_fallback.or_else(|| {
            Some(Arc::new(CommandProvider::new(
                settings.tts.fallback_provider.clone(),
            )) as Arc<dyn SpeechProvider>)
        });
        let (tts, tts_worker) = TtsService::new(
            TtsConfig {
                enabled: settings.general.tts_enabled,
                only_for_gifts: settings.tts.only_for_gifts,
                deduplication_enabled: settings.tts.deduplication_enabled,
                dedup_window: Duration::from_millis(crate::config::DEFAULT_TTS_DEDUP_WINDOW_MS),
            },
            tts_primary,
            tts_fallback,
        );

        let manager = Arc::new(NotificationManager::new(
            Arc::clone(&settings),
            display.clone(),
            tts.clone(),
            self.vfx.unwrap_or_else(VfxCatalog::built_in),
        ));

        let store = SuppressionStore::new(suppression_config(&settings));
        let router = EventRouter::new(
            Arc::clone(&settings),
            store,
            Arc::clone(&manager),
            bus.clone(),
        );

        let (record_tx, record_rx) = mpsc::unbounded_channel();

        let lifecycle_config = lifecycle_config(&settings);
        let handlers = {
            let record_tx = record_tx.clone();
            EventHandlers::forward_all(move |record| {
                let _ = record_tx.send(record);
            })
        };

        let mut supervisors = Vec::new();
        for (adapter, detector) in self.adapters {
            let platform = adapter.platform();
            let platform_settings = settings.platform(platform);
            if !platform_settings.enabled {
                debug!(platform = %platform, "platform disabled; adapter not supervised");
                continue;
            }
            supervisors.push(Arc::new(ConnectionSupervisor::new(
                platform,
                platform_settings.username.clone(),
                adapter,
                detector,
                handlers.clone(),
                lifecycle_config.clone(),
            )));
        }

        Runtime {
            settings,
            bus,
            manager,
            display,
            tts,
            scene,
            record_tx,
            pending: Some(PendingTasks {
                display_daemon,
                tts_worker,
                router,
                record_rx,
            }),
            supervisors,
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        }
    }
}

struct PendingTasks {
    display_daemon: crate::display::DisplayDaemon,
    tts_worker: crate::tts::TtsWorker,
    router: EventRouter,
    record_rx: mpsc::UnboundedReceiver<EventRecord>,
}

/// The assembled core graph.
pub struct Runtime {
    settings: Arc<Settings>,
    bus: EventBus,
    manager: Arc<NotificationManager>,
    display: DisplayQueue,
    tts: TtsService,
    scene: Arc<dyn SceneControl>,
    record_tx: mpsc::UnboundedSender<EventRecord>,
    pending: Option<PendingTasks>,
    supervisors: Vec<Arc<ConnectionSupervisor>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

impl Runtime {
    /// The shared bus (subscribe before calling [`run`](Self::run)).
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// The notification manager (goal snapshots, command notifications).
    pub fn manager(&self) -> &Arc<NotificationManager> {
        &self.manager
    }

    /// The display queue handle.
    pub fn display(&self) -> &DisplayQueue {
        &self.display
    }

    /// The TTS service handle.
    pub fn tts(&self) -> &TtsService {
        &self.tts
    }

    /// Sender feeding raw records into the dispatch loop.
    ///
    /// Adapters normally deliver through their supervisors; this is the
    /// injection point for embedders and tests.
    pub fn record_sender(&self) -> mpsc::UnboundedSender<EventRecord> {
        self.record_tx.clone()
    }

    /// Token that stops the runtime when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until shutdown is signaled or a platform fails terminally.
    pub async fn run(mut self) -> Result<(), RuntimeError> {
        let pending = self.pending.take().expect("runtime already ran");

        if self.settings.obs.enabled {
            if let Err(error) = self.scene.connect().await {
                warn!(%error, "scene-control connect failed; overlay degraded");
            }
        }

        self.tracker
            .spawn(pending.display_daemon.run(self.shutdown.clone()));
        self.tracker
            .spawn(pending.tts_worker.run(self.shutdown.clone()));
        self.tracker.spawn(dispatch_loop(
            pending.router,
            pending.record_rx,
            sweep_period(&self.settings),
            self.bus.clone(),
            self.shutdown.clone(),
        ));

        let mut supervisors: JoinSet<Result<(), LifecycleError>> = JoinSet::new();
        for supervisor in &self.supervisors {
            supervisors.spawn(Arc::clone(supervisor).run(self.shutdown.clone()));
        }
        info!(
            platforms = self.supervisors.len(),
            "runtime started"
        );

        let result = loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break Ok(()),

                joined = supervisors.join_next(), if !supervisors.is_empty() => {
                    match joined {
                        Some(Ok(Ok(()))) => continue,
                        Some(Ok(Err(error))) => break Err(RuntimeError::FatalConnection(error)),
                        Some(Err(join_error)) => {
                            warn!(%join_error, "supervisor task panicked");
                            continue;
                        }
                        None => continue,
                    }
                }
            }
        };

        // Wind down: cancel everything, give supervisors their cleanup
        // grace, then wait for the daemons.
        self.shutdown.cancel();
        while supervisors.join_next().await.is_some() {}
        self.scene.disconnect().await;
        self.tracker.close();
        self.tracker.wait().await;
        info!("runtime stopped");

        result
    }
}

/// Dispatch loop: the single mutation path for router and store.
async fn dispatch_loop(
    mut router: EventRouter,
    mut record_rx: mpsc::UnboundedReceiver<EventRecord>,
    sweep_period: Duration,
    bus: EventBus,
    shutdown: CancellationToken,
) {
    let mut sweep = tokio::time::interval(sweep_period);
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;

            _ = shutdown.cancelled() => break,

            record = record_rx.recv() => {
                let Some(record) = record else { break };
                match router.route_record(&record, Instant::now()) {
                    Ok(outcome) => {
                        tracing::trace!(?outcome, "record routed");
                    }
                    Err(error) => {
                        warn!(%error, platform = %record.platform, "event rejected");
                        bus.emit_diagnostic(DiagnosticEvent::warning(
                            "router",
                            error.to_string(),
                        ));
                    }
                }
            }

            _ = sweep.tick() => {
                router.sweep(Instant::now());
            }
        }
    }

    // Open combo groups settle on shutdown so streaks are not lost.
    let flushed = router.sweep(Instant::now() + Duration::from_secs(3600));
    if flushed > 0 {
        debug!(flushed, "settled open combo groups on shutdown");
    }
}

fn suppression_config(settings: &Settings) -> SuppressionConfig {
    let general = &settings.general;
    SuppressionConfig {
        dedup_ttl: Duration::from_millis(general.dedup_ttl_ms),
        suppression_enabled: general.suppression_enabled,
        max_notifications_per_user: general.max_notifications_per_user,
        suppression_window: Duration::from_millis(general.suppression_window_ms),
        suppression_duration: Duration::from_millis(general.suppression_duration_ms),
        combo_timeout: Duration::from_millis(general.combo_timeout_ms),
        max_entries: general.store_max_entries,
    }
}

fn lifecycle_config(settings: &Settings) -> LifecycleConfig {
    let general = &settings.general;
    LifecycleConfig {
        detection_enabled: general.stream_detection_enabled,
        retry_interval: Duration::from_secs(general.stream_retry_interval),
        max_retries: general.stream_max_retries,
        monitor_interval: Duration::from_secs(general.continuous_monitoring_interval),
        backoff: BackoffConfig::default(),
        stale_connecting_timeout: Duration::from_secs(30),
        cleanup_timeout: Duration::from_secs(5),
    }
}

/// Combo settlement needs finer granularity than the cleanup interval.
fn sweep_period(settings: &Settings) -> Duration {
    let upper = settings.general.suppression_cleanup_interval_ms.max(50);
    let combo = settings.general.combo_timeout_ms / 2;
    Duration::from_millis(combo.clamp(50, upper))
}
