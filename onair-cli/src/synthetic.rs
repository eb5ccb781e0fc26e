//! Synthetic event source.
//!
//! A stand-in platform adapter that emits a scripted mix of chat, follow
//! and gift records on a timer. Used by `onair run --synthetic` to
//! exercise the full pipeline (overlay and TTS included) without any
//! platform credentials.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use onair::adapter::{AdapterError, EventHandlers, PlatformAdapter, TelemetryCallback};
use onair::envelope::{EventKind, EventRecord, Platform, RecordData};
use onair::lifecycle::{DetectError, StreamDetector};

/// Emission period for synthetic events.
const EMIT_PERIOD: Duration = Duration::from_secs(3);

/// Detector that always reports the synthetic stream live.
pub struct SyntheticDetector;

#[async_trait]
impl StreamDetector for SyntheticDetector {
    async fn is_live(&self, _platform: Platform, _username: &str) -> Result<bool, DetectError> {
        Ok(true)
    }
}

/// Adapter producing a repeating script of canonical records.
pub struct SyntheticAdapter {
    platform: Platform,
    stop: Mutex<Option<CancellationToken>>,
}

impl SyntheticAdapter {
    pub fn new(platform: Platform) -> Arc<Self> {
        Arc::new(Self {
            platform,
            stop: Mutex::new(None),
        })
    }

    fn record(&self, step: u64) -> (EventKind, EventRecord) {
        let user = 1000 + (step % 5);
        let mut record = EventRecord {
            platform: self.platform.as_str().to_string(),
            kind: String::new(),
            id: None,
            timestamp: Some(chrono::Utc::now()),
            username: Some(format!("viewer_{user}")),
            user_id: Some(serde_json::json!(user)),
            data: RecordData::default(),
            correlation_id: None,
        };

        let kind = match step % 4 {
            0 | 1 => {
                record.data.text = Some(format!("synthetic chat line {step}"));
                EventKind::Chat
            }
            2 => EventKind::Follow,
            _ => {
                record.id = Some(format!("synthetic-gift-{step}"));
                record.data.gift_type = Some("Rose".to_string());
                record.data.gift_count = Some(1 + (step % 3) as i64);
                record.data.amount = Some(0.1 * (1 + step % 3) as f64);
                record.data.currency = Some("USD".to_string());
                EventKind::Gift
            }
        };
        record.kind = kind.as_str().to_string();
        (kind, record)
    }
}

#[async_trait]
impl PlatformAdapter for SyntheticAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn initialize(&self, handlers: EventHandlers) -> Result<(), AdapterError> {
        let token = CancellationToken::new();
        *self.stop.lock().expect("synthetic lock poisoned") = Some(token.clone());

        let platform = self.platform;
        let adapter = SyntheticAdapter {
            platform,
            stop: Mutex::new(None),
        };

        tokio::spawn(async move {
            let mut step: u64 = 0;
            let mut ticker = tokio::time::interval(EMIT_PERIOD);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let (kind, record) = adapter.record(step);
                        handlers.invoke(kind, record);
                        step += 1;
                    }
                }
            }
        });

        Ok(())
    }

    async fn cleanup(&self) -> Result<(), AdapterError> {
        if let Some(token) = self.stop.lock().expect("synthetic lock poisoned").take() {
            token.cancel();
        }
        Ok(())
    }

    fn on_telemetry(&self, _callback: TelemetryCallback) {}
}
