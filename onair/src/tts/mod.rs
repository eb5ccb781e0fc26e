//! Text-to-speech service.
//!
//! A FIFO queue of speak requests drained by one worker task, so utterances
//! never overlap. The worker uses the primary provider and retries once on
//! the fallback after a failure, counting provider switches. Request-side
//! policy lives in [`TtsService::speak`]: disabled service, text that
//! cleans to empty, gifts-only mode and the consecutive-duplicate window
//! all reject the request before it queues.

mod clean;
mod provider;

pub use clean::{clean_for_speech, FILTERED_TOKEN};
pub use provider::{CommandProvider, SpeakError, SpeechProvider};

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Service tuning, derived from `[tts]` settings.
#[derive(Debug, Clone)]
pub struct TtsConfig {
    pub enabled: bool,
    /// Drop non-monetization requests.
    pub only_for_gifts: bool,
    /// Drop identical consecutive texts inside the window.
    pub deduplication_enabled: bool,
    pub dedup_window: Duration,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            only_for_gifts: false,
            deduplication_enabled: true,
            dedup_window: Duration::from_millis(crate::config::DEFAULT_TTS_DEDUP_WINDOW_MS),
        }
    }
}

/// Options for one speak request.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpeakOptions {
    /// True when the request announces money (exempt from gifts-only drop).
    pub monetized: bool,
}

struct SpeakRequest {
    id: u64,
    text: String,
}

/// Handle for submitting speech requests.
///
/// Cheap to clone; all clones feed the same worker queue.
#[derive(Clone)]
pub struct TtsService {
    config: TtsConfig,
    tx: Option<mpsc::UnboundedSender<SpeakRequest>>,
    next_id: Arc<AtomicU64>,
    pending: Arc<AtomicU64>,
    provider_switches: Arc<AtomicU64>,
    last_queued: Arc<Mutex<Option<(String, Instant)>>>,
}

/// Worker draining the FIFO queue; run it as a task.
pub struct TtsWorker {
    rx: mpsc::UnboundedReceiver<SpeakRequest>,
    primary: Arc<dyn SpeechProvider>,
    fallback: Option<Arc<dyn SpeechProvider>>,
    pending: Arc<AtomicU64>,
    provider_switches: Arc<AtomicU64>,
}

impl TtsService {
    /// Build a service and its worker.
    ///
    /// The worker must be spawned for requests to drain.
    pub fn new(
        config: TtsConfig,
        primary: Arc<dyn SpeechProvider>,
        fallback: Option<Arc<dyn SpeechProvider>>,
    ) -> (Self, TtsWorker) {
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = Arc::new(AtomicU64::new(0));
        let provider_switches = Arc::new(AtomicU64::new(0));

        let service = Self {
            config,
            tx: Some(tx),
            next_id: Arc::new(AtomicU64::new(1)),
            pending: Arc::clone(&pending),
            provider_switches: Arc::clone(&provider_switches),
            last_queued: Arc::new(Mutex::new(None)),
        };
        let worker = TtsWorker {
            rx,
            primary,
            fallback,
            pending,
            provider_switches,
        };
        (service, worker)
    }

    /// A service with no provider configured; every request is rejected.
    pub fn unconfigured() -> Self {
        Self {
            config: TtsConfig::default(),
            tx: None,
            next_id: Arc::new(AtomicU64::new(1)),
            pending: Arc::new(AtomicU64::new(0)),
            provider_switches: Arc::new(AtomicU64::new(0)),
            last_queued: Arc::new(Mutex::new(None)),
        }
    }

    /// Queue `text` for speech.
    ///
    /// Returns the request id, or `None` when the request is rejected:
    /// service disabled or unconfigured, text cleans to empty, gifts-only
    /// mode for a non-monetized request, or a duplicate of the previous
    /// text inside the dedup window.
    pub fn speak(&self, text: &str, options: SpeakOptions) -> Option<u64> {
        let Some(tx) = &self.tx else {
            return None;
        };
        if !self.config.enabled {
            return None;
        }
        if self.config.only_for_gifts && !options.monetized {
            debug!("tts request dropped: gifts-only mode");
            return None;
        }

        let cleaned = clean_for_speech(text);
        // A text that is empty, or nothing but filtered tokens, is not
        // worth speaking.
        if cleaned.is_empty() || cleaned == FILTERED_TOKEN {
            return None;
        }

        if self.config.deduplication_enabled {
            let mut last = self.last_queued.lock().expect("tts lock poisoned");
            if let Some((previous, at)) = last.as_ref() {
                if *previous == cleaned && at.elapsed() < self.config.dedup_window {
                    debug!("tts request dropped: duplicate within window");
                    return None;
                }
            }
            *last = Some((cleaned.clone(), Instant::now()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.pending.fetch_add(1, Ordering::SeqCst);
        if tx.send(SpeakRequest { id, text: cleaned }).is_err() {
            self.pending.fetch_sub(1, Ordering::SeqCst);
            return None;
        }
        Some(id)
    }

    /// Requests queued but not yet spoken.
    pub fn pending(&self) -> u64 {
        self.pending.load(Ordering::SeqCst)
    }

    /// Times the worker fell back to the secondary provider.
    pub fn provider_switches(&self) -> u64 {
        self.provider_switches.load(Ordering::SeqCst)
    }
}

impl TtsWorker {
    /// Drain the queue until shutdown.
    pub async fn run(mut self, shutdown: CancellationToken) {
        debug!(provider = self.primary.name(), "tts worker starting");

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,

                request = self.rx.recv() => {
                    let Some(request) = request else { break };
                    self.speak_one(request).await;
                }
            }
        }

        debug!("tts worker stopped");
    }

    async fn speak_one(&self, request: SpeakRequest) {
        let result = self.primary.speak(&request.text).await;

        if let Err(error) = result {
            warn!(%error, request_id = request.id, "primary tts provider failed");

            if let Some(fallback) = &self.fallback {
                self.provider_switches.fetch_add(1, Ordering::SeqCst);
                if let Err(error) = fallback.speak(&request.text).await {
                    warn!(%error, request_id = request.id, "fallback tts provider failed");
                }
            }
        }

        self.pending.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::provider::tests::MockProvider;
    use super::*;

    fn enabled_config() -> TtsConfig {
        TtsConfig {
            enabled: true,
            only_for_gifts: false,
            deduplication_enabled: true,
            dedup_window: Duration::from_secs(5),
        }
    }

    async fn drain(service: &TtsService) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while service.pending() > 0 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("queue never drained");
    }

    #[tokio::test]
    async fn test_requests_speak_in_fifo_order() {
        let primary = Arc::new(MockProvider::new("primary"));
        let (service, worker) = TtsService::new(enabled_config(), primary.clone(), None);
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(worker.run(shutdown.clone()));

        assert!(service.speak("first", SpeakOptions::default()).is_some());
        assert!(service.speak("second", SpeakOptions::default()).is_some());
        assert!(service.speak("third", SpeakOptions::default()).is_some());

        drain(&service).await;
        assert_eq!(
            *primary.spoken.lock().unwrap(),
            vec!["first", "second", "third"]
        );

        shutdown.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_fallback_after_primary_failure() {
        let primary = Arc::new(MockProvider::new("primary"));
        primary.fail_first.store(1, Ordering::SeqCst);
        let fallback = Arc::new(MockProvider::new("fallback"));

        let (service, worker) =
            TtsService::new(enabled_config(), primary.clone(), Some(fallback.clone()));
        let shutdown = CancellationToken::new();
        let task = tokio::spawn(worker.run(shutdown.clone()));

        service.speak("hello", SpeakOptions::default());
        drain(&service).await;

        assert_eq!(*fallback.spoken.lock().unwrap(), vec!["hello"]);
        assert_eq!(service.provider_switches(), 1);

        shutdown.cancel();
        task.await.unwrap();
    }

    #[test]
    fn test_disabled_returns_none() {
        let primary = Arc::new(MockProvider::new("primary"));
        let (service, _worker) = TtsService::new(TtsConfig::default(), primary, None);
        assert!(service.speak("hello", SpeakOptions::default()).is_none());
    }

    #[test]
    fn test_unconfigured_returns_none() {
        let service = TtsService::unconfigured();
        assert!(service.speak("hello", SpeakOptions::default()).is_none());
    }

    #[test]
    fn test_empty_after_cleaning_returns_none() {
        let primary = Arc::new(MockProvider::new("primary"));
        let (service, _worker) = TtsService::new(enabled_config(), primary, None);
        // Pure emoji cleans to a lone filtered token, which is rejected.
        assert!(service.speak("🎉", SpeakOptions::default()).is_none());
        assert!(service.speak("   ", SpeakOptions::default()).is_none());
    }

    #[test]
    fn test_gifts_only_drops_plain_requests() {
        let primary = Arc::new(MockProvider::new("primary"));
        let (service, _worker) = TtsService::new(
            TtsConfig {
                only_for_gifts: true,
                ..enabled_config()
            },
            primary,
            None,
        );

        assert!(service.speak("plain chat", SpeakOptions::default()).is_none());
        assert!(service
            .speak("gift!", SpeakOptions { monetized: true })
            .is_some());
    }

    #[test]
    fn test_consecutive_duplicates_dropped_within_window() {
        let primary = Arc::new(MockProvider::new("primary"));
        let (service, _worker) = TtsService::new(enabled_config(), primary, None);

        assert!(service.speak("same text", SpeakOptions::default()).is_some());
        assert!(service.speak("same text", SpeakOptions::default()).is_none());
        assert!(service.speak("other text", SpeakOptions::default()).is_some());
    }
}
