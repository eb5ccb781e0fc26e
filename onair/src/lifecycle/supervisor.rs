//! Per-platform connection supervisor.
//!
//! The supervisor owns one platform's [`ConnectionState`] and runs the full
//! lifecycle as a single task: stream detection with bounded retries, then
//! connect / wait-for-disconnect / backoff cycles until shutdown. Concurrent
//! `connect()` calls collapse onto the in-flight attempt, and a `CONNECTING`
//! state left behind by a dead attempt is force-reset after a staleness
//! threshold before a new attempt starts.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{mpsc, watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backoff::{Backoff, BackoffConfig};
use super::detector::StreamDetector;
use super::state::ConnectionState;
use crate::adapter::{AdapterError, AdapterTelemetry, EventHandlers, PlatformAdapter};
use crate::envelope::{EventKind, EventRecord, Platform, RecordData};
use crate::timer::SafeTimers;

/// Lifecycle tuning for one platform.
#[derive(Debug, Clone)]
pub struct LifecycleConfig {
    /// Probe for a live stream before connecting.
    pub detection_enabled: bool,
    /// Wait between detection attempts.
    pub retry_interval: Duration,
    /// Detection attempts before giving up; negative retries forever.
    pub max_retries: i32,
    /// Probe liveness at this interval while connected; zero disables.
    pub monitor_interval: Duration,
    /// Reconnect backoff schedule.
    pub backoff: BackoffConfig,
    /// Force-reset a CONNECTING state older than this before a new attempt.
    pub stale_connecting_timeout: Duration,
    /// Hard limit on adapter cleanup during stop.
    pub cleanup_timeout: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            detection_enabled: true,
            retry_interval: Duration::from_secs(30),
            max_retries: 20,
            monitor_interval: Duration::from_secs(60),
            backoff: BackoffConfig::default(),
            stale_connecting_timeout: Duration::from_secs(30),
            cleanup_timeout: Duration::from_secs(5),
        }
    }
}

/// Terminal lifecycle failures.
#[derive(Debug, Clone, Error)]
pub enum LifecycleError {
    #[error("stream detection for {platform} exhausted after {attempts} attempts")]
    RetriesExhausted { platform: Platform, attempts: u32 },
}

enum DetectOutcome {
    Live,
    ShutDown,
}

/// Supervises one platform connection.
pub struct ConnectionSupervisor {
    platform: Platform,
    username: String,
    adapter: Arc<dyn PlatformAdapter>,
    detector: Arc<dyn StreamDetector>,
    config: LifecycleConfig,
    handlers: EventHandlers,
    state_tx: watch::Sender<ConnectionState>,
    connecting_since: std::sync::Mutex<Option<Instant>>,
    /// Collapses concurrent connect() calls onto the in-flight attempt.
    connect_guard: Mutex<()>,
}

impl ConnectionSupervisor {
    pub fn new(
        platform: Platform,
        username: impl Into<String>,
        adapter: Arc<dyn PlatformAdapter>,
        detector: Arc<dyn StreamDetector>,
        handlers: EventHandlers,
        config: LifecycleConfig,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            platform,
            username: username.into(),
            adapter,
            detector,
            config,
            handlers,
            state_tx,
            connecting_since: std::sync::Mutex::new(None),
            connect_guard: Mutex::new(()),
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Watch channel for state transitions.
    pub fn state_watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = *self.state_tx.borrow();
        if previous == next {
            return;
        }

        {
            let mut connecting = self.connecting_since.lock().expect("state lock poisoned");
            *connecting = if next == ConnectionState::Connecting {
                Some(Instant::now())
            } else {
                None
            };
        }

        debug!(
            platform = %self.platform,
            from = %previous,
            to = %next,
            "connection state changed"
        );
        let _ = self.state_tx.send(next);
    }

    /// Run the lifecycle until shutdown.
    ///
    /// Returns an error only for terminal failures (detection retries
    /// exhausted); a requested shutdown resolves `Ok`.
    pub async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<(), LifecycleError> {
        // Telemetry funnel: adapter callbacks land on this channel so the
        // supervisor loop is the only writer of connection state.
        let (telemetry_tx, mut telemetry_rx) = mpsc::unbounded_channel();
        self.adapter.on_telemetry(Arc::new(move |telemetry| {
            let _ = telemetry_tx.send(telemetry);
        }));

        // All waits go through the shutdown-aware timer wrapper so stop()
        // releases every pending delay.
        let timers = SafeTimers::with_token(shutdown.clone());

        match self.detect_stream(&shutdown, &timers).await? {
            DetectOutcome::ShutDown => {
                self.finish(false).await;
                return Ok(());
            }
            DetectOutcome::Live => {}
        }

        let mut backoff = Backoff::new(self.config.backoff.clone());

        'reconnect: loop {
            if shutdown.is_cancelled() {
                break;
            }

            match self.connect().await {
                Ok(()) => {
                    backoff.reset();
                    info!(platform = %self.platform, "platform connected");
                    self.emit_stream_status(true);

                    // Connected: wait for a disconnect, a failed liveness
                    // probe, or shutdown.
                    loop {
                        tokio::select! {
                            _ = shutdown.cancelled() => break 'reconnect,

                            _ = monitor_tick(self.config.monitor_interval) => {
                                match self
                                    .detector
                                    .is_live(self.platform, &self.username)
                                    .await
                                {
                                    Ok(false) => {
                                        info!(
                                            platform = %self.platform,
                                            "stream went offline; scheduling reconnect"
                                        );
                                        self.emit_stream_status(false);
                                        self.set_state(ConnectionState::Retrying);
                                        break;
                                    }
                                    Ok(true) => {}
                                    Err(error) => {
                                        debug!(platform = %self.platform, %error, "liveness probe failed");
                                    }
                                }
                            }

                            telemetry = telemetry_rx.recv() => match telemetry {
                                Some(AdapterTelemetry::Disconnected { reason }) => {
                                    warn!(
                                        platform = %self.platform,
                                        reason = %reason,
                                        "platform disconnected; scheduling reconnect"
                                    );
                                    self.emit_stream_status(false);
                                    self.set_state(ConnectionState::Retrying);
                                    break;
                                }
                                Some(AdapterTelemetry::Error { message }) => {
                                    warn!(platform = %self.platform, %message, "adapter error");
                                }
                                Some(AdapterTelemetry::Connected) => {}
                                None => break 'reconnect,
                            }
                        }
                    }
                }
                Err(error) => {
                    warn!(platform = %self.platform, %error, "connect attempt failed");
                    self.set_state(ConnectionState::Retrying);
                }
            }

            let delay = backoff.next_delay();
            debug!(
                platform = %self.platform,
                delay_ms = delay.as_millis() as u64,
                attempt = backoff.attempt(),
                "reconnect backoff"
            );
            if !timers.delay(delay).await.elapsed() {
                break;
            }
        }

        self.finish(self.state() == ConnectionState::Connected)
            .await;
        Ok(())
    }

    /// Detection phase: probe until live, retries exhaust, or shutdown.
    async fn detect_stream(
        &self,
        shutdown: &CancellationToken,
        timers: &SafeTimers,
    ) -> Result<DetectOutcome, LifecycleError> {
        if !self.config.detection_enabled {
            return Ok(DetectOutcome::Live);
        }

        self.set_state(ConnectionState::Detecting);
        let mut attempts: u32 = 0;

        loop {
            if shutdown.is_cancelled() {
                return Ok(DetectOutcome::ShutDown);
            }

            match self
                .detector
                .is_live(self.platform, &self.username)
                .await
            {
                Ok(true) => {
                    info!(platform = %self.platform, username = %self.username, "stream detected");
                    return Ok(DetectOutcome::Live);
                }
                Ok(false) => {
                    debug!(
                        platform = %self.platform,
                        username = %self.username,
                        attempt = attempts + 1,
                        "stream not live"
                    );
                }
                Err(error) => {
                    warn!(platform = %self.platform, %error, "stream detection error");
                }
            }

            attempts += 1;
            if self.config.max_retries >= 0 && attempts >= self.config.max_retries as u32 {
                self.set_state(ConnectionState::Stopped);
                self.emit_stream_status(false);
                return Err(LifecycleError::RetriesExhausted {
                    platform: self.platform,
                    attempts,
                });
            }

            if !timers.delay(self.config.retry_interval).await.elapsed() {
                return Ok(DetectOutcome::ShutDown);
            }
        }
    }

    /// One connect attempt.
    ///
    /// Concurrent callers block on the guard; once the in-flight attempt
    /// resolves they observe `Connected` and return without a second
    /// initialize. A stale `Connecting` left behind by an aborted attempt
    /// is force-reset before proceeding.
    pub async fn connect(&self) -> Result<(), AdapterError> {
        let _guard = self.connect_guard.lock().await;

        match self.state() {
            ConnectionState::Connected => return Ok(()),
            ConnectionState::Connecting => {
                let stale = self
                    .connecting_since
                    .lock()
                    .expect("state lock poisoned")
                    .map(|since| since.elapsed() >= self.config.stale_connecting_timeout)
                    .unwrap_or(true);
                if stale {
                    warn!(
                        platform = %self.platform,
                        "stale connecting state; force-resetting before new attempt"
                    );
                    self.set_state(ConnectionState::Disconnected);
                } else {
                    return Err(AdapterError::InitializeFailed(
                        "connect already in flight".to_string(),
                    ));
                }
            }
            _ => {}
        }

        self.set_state(ConnectionState::Connecting);
        match self.adapter.initialize(self.handlers.clone()).await {
            Ok(()) => {
                self.set_state(ConnectionState::Connected);
                Ok(())
            }
            Err(error) => Err(error),
        }
    }

    /// Emit a stream-status record through the normal handler funnel.
    fn emit_stream_status(&self, live: bool) {
        let record = EventRecord {
            platform: self.platform.as_str().to_string(),
            kind: EventKind::StreamStatus.as_str().to_string(),
            id: None,
            timestamp: Some(chrono::Utc::now()),
            username: None,
            user_id: None,
            data: RecordData {
                live: Some(live),
                ..RecordData::default()
            },
            correlation_id: None,
        };
        self.handlers.invoke(EventKind::StreamStatus, record);
    }

    /// Cleanup with a hard timeout, then mark STOPPED.
    async fn finish(&self, was_connected: bool) {
        if was_connected {
            self.emit_stream_status(false);
        }

        match tokio::time::timeout(self.config.cleanup_timeout, self.adapter.cleanup()).await {
            Ok(Ok(())) => debug!(platform = %self.platform, "adapter cleanup complete"),
            Ok(Err(error)) => {
                warn!(platform = %self.platform, %error, "adapter cleanup failed")
            }
            Err(_) => warn!(
                platform = %self.platform,
                timeout_ms = self.config.cleanup_timeout.as_millis() as u64,
                "adapter cleanup timed out; resources abandoned"
            ),
        }

        self.set_state(ConnectionState::Stopped);
    }
}

/// Sleep for the monitoring interval; pends forever when disabled (zero).
async fn monitor_tick(interval: Duration) {
    if interval.is_zero() {
        std::future::pending().await
    } else {
        tokio::time::sleep(interval).await
    }
}

impl std::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("platform", &self.platform)
            .field("username", &self.username)
            .field("state", &self.state())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::TelemetryCallback;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex as StdMutex;

    struct MockAdapter {
        platform: Platform,
        initialize_calls: AtomicUsize,
        fail_first_attempts: AtomicUsize,
        cleanup_calls: AtomicUsize,
        slow_cleanup: AtomicBool,
        telemetry: StdMutex<Option<TelemetryCallback>>,
    }

    impl MockAdapter {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                platform: Platform::Tiktok,
                initialize_calls: AtomicUsize::new(0),
                fail_first_attempts: AtomicUsize::new(0),
                cleanup_calls: AtomicUsize::new(0),
                slow_cleanup: AtomicBool::new(false),
                telemetry: StdMutex::new(None),
            })
        }

        fn report(&self, telemetry: AdapterTelemetry) {
            let callback = self.telemetry.lock().unwrap().clone();
            if let Some(callback) = callback {
                callback(telemetry);
            }
        }
    }

    #[async_trait]
    impl PlatformAdapter for MockAdapter {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn initialize(&self, _handlers: EventHandlers) -> Result<(), AdapterError> {
            let call = self.initialize_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first_attempts.load(Ordering::SeqCst) {
                return Err(AdapterError::InitializeFailed("scripted failure".into()));
            }
            Ok(())
        }

        async fn cleanup(&self) -> Result<(), AdapterError> {
            self.cleanup_calls.fetch_add(1, Ordering::SeqCst);
            if self.slow_cleanup.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok(())
        }

        fn on_telemetry(&self, callback: TelemetryCallback) {
            *self.telemetry.lock().unwrap() = Some(callback);
        }
    }

    struct MockDetector {
        live_after: usize,
        calls: AtomicUsize,
    }

    impl MockDetector {
        fn live_after(calls: usize) -> Arc<Self> {
            Arc::new(Self {
                live_after: calls,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl StreamDetector for MockDetector {
        async fn is_live(&self, _platform: Platform, _username: &str) -> Result<bool, DetectError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(call >= self.live_after)
        }
    }

    use super::super::detector::DetectError;

    fn test_config() -> LifecycleConfig {
        LifecycleConfig {
            detection_enabled: true,
            retry_interval: Duration::from_millis(5),
            max_retries: 3,
            monitor_interval: Duration::ZERO,
            backoff: BackoffConfig {
                base: Duration::from_millis(5),
                multiplier: 2.0,
                cap: Duration::from_millis(40),
                jitter: 0.0,
            },
            stale_connecting_timeout: Duration::from_millis(50),
            cleanup_timeout: Duration::from_millis(50),
        }
    }

    fn supervisor(
        adapter: Arc<MockAdapter>,
        detector: Arc<MockDetector>,
        handlers: EventHandlers,
    ) -> Arc<ConnectionSupervisor> {
        Arc::new(ConnectionSupervisor::new(
            Platform::Tiktok,
            "creator",
            adapter,
            detector,
            handlers,
            test_config(),
        ))
    }

    async fn wait_for_state(
        rx: &mut watch::Receiver<ConnectionState>,
        wanted: ConnectionState,
    ) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if *rx.borrow() == wanted {
                    return;
                }
                rx.changed().await.expect("state channel closed");
            }
        })
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {wanted}"));
    }

    #[tokio::test]
    async fn test_detects_then_connects() {
        let adapter = MockAdapter::new();
        let detector = MockDetector::live_after(2);
        let sup = supervisor(adapter.clone(), detector, EventHandlers::new());
        let mut states = sup.state_watch();
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(Arc::clone(&sup).run(shutdown.clone()));
        wait_for_state(&mut states, ConnectionState::Connected).await;
        assert_eq!(adapter.initialize_calls.load(Ordering::SeqCst), 1);

        shutdown.cancel();
        task.await.unwrap().unwrap();
        assert_eq!(sup.state(), ConnectionState::Stopped);
        assert_eq!(adapter.cleanup_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_detection_retries_exhausted_is_terminal() {
        let adapter = MockAdapter::new();
        let detector = MockDetector::live_after(100);
        let sup = supervisor(adapter.clone(), detector, EventHandlers::new());
        let shutdown = CancellationToken::new();

        let result = Arc::clone(&sup).run(shutdown).await;
        match result {
            Err(LifecycleError::RetriesExhausted { attempts, .. }) => assert_eq!(attempts, 3),
            other => panic!("expected RetriesExhausted, got {other:?}"),
        }
        assert_eq!(sup.state(), ConnectionState::Stopped);
        assert_eq!(adapter.initialize_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_reconnects_after_disconnect_telemetry() {
        let adapter = MockAdapter::new();
        let detector = MockDetector::live_after(0);
        let sup = supervisor(adapter.clone(), detector, EventHandlers::new());
        let mut states = sup.state_watch();
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(Arc::clone(&sup).run(shutdown.clone()));
        wait_for_state(&mut states, ConnectionState::Connected).await;

        adapter.report(AdapterTelemetry::Disconnected {
            reason: "socket closed".to_string(),
        });

        wait_for_state(&mut states, ConnectionState::Retrying).await;
        wait_for_state(&mut states, ConnectionState::Connected).await;
        assert_eq!(adapter.initialize_calls.load(Ordering::SeqCst), 2);

        shutdown.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_connect_failure_backs_off_then_succeeds() {
        let adapter = MockAdapter::new();
        adapter.fail_first_attempts.store(2, Ordering::SeqCst);
        let detector = MockDetector::live_after(0);
        let sup = supervisor(adapter.clone(), detector, EventHandlers::new());
        let mut states = sup.state_watch();
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(Arc::clone(&sup).run(shutdown.clone()));
        wait_for_state(&mut states, ConnectionState::Connected).await;
        assert_eq!(adapter.initialize_calls.load(Ordering::SeqCst), 3);

        shutdown.cancel();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_connect_collapses() {
        let adapter = MockAdapter::new();
        let detector = MockDetector::live_after(0);
        let sup = supervisor(adapter.clone(), detector, EventHandlers::new());

        let (first, second) = tokio::join!(sup.connect(), sup.connect());
        first.unwrap();
        second.unwrap();

        // Second caller observed Connected and returned without a second
        // adapter initialize.
        assert_eq!(adapter.initialize_calls.load(Ordering::SeqCst), 1);
        assert_eq!(sup.state(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_cleanup_timeout_abandons_resources() {
        let adapter = MockAdapter::new();
        adapter.slow_cleanup.store(true, Ordering::SeqCst);
        let detector = MockDetector::live_after(0);
        let sup = supervisor(adapter.clone(), detector, EventHandlers::new());
        let mut states = sup.state_watch();
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(Arc::clone(&sup).run(shutdown.clone()));
        wait_for_state(&mut states, ConnectionState::Connected).await;

        shutdown.cancel();
        // The run resolves despite cleanup hanging.
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("run should resolve after cleanup timeout")
            .unwrap()
            .unwrap();
        assert_eq!(sup.state(), ConnectionState::Stopped);
    }

    #[tokio::test]
    async fn test_stream_status_emitted_on_connect() {
        let seen = Arc::new(StdMutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        let handlers = EventHandlers::forward_all(move |record| {
            seen_clone.lock().unwrap().push(record);
        });

        let adapter = MockAdapter::new();
        let detector = MockDetector::live_after(0);
        let sup = supervisor(adapter, detector, handlers);
        let mut states = sup.state_watch();
        let shutdown = CancellationToken::new();

        let task = tokio::spawn(Arc::clone(&sup).run(shutdown.clone()));
        wait_for_state(&mut states, ConnectionState::Connected).await;

        {
            let records = seen.lock().unwrap();
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].kind, "stream-status");
            assert_eq!(records[0].data.live, Some(true));
        }

        shutdown.cancel();
        task.await.unwrap().unwrap();

        // Offline status emitted during shutdown of a connected platform.
        let records = seen.lock().unwrap();
        assert_eq!(records.last().unwrap().data.live, Some(false));
    }
}
