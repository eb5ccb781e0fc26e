//! End-to-end pipeline tests.
//!
//! Drives the assembled runtime with injected records and observes the
//! effectors through recording fakes: the scene control captures every
//! call, the speech provider captures every utterance.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;

use onair::config::Settings;
use onair::effector::{ConnectionEvent, SceneControl, SceneError, SceneRequest};
use onair::envelope::{EventRecord, RecordData};
use onair::runtime::RuntimeBuilder;
use onair::tts::{SpeakError, SpeechProvider};

struct RecordingScene {
    identified: AtomicBool,
    calls: Mutex<Vec<SceneRequest>>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl RecordingScene {
    fn new(identified: bool) -> Arc<Self> {
        let (events, _) = broadcast::channel(32);
        Arc::new(Self {
            identified: AtomicBool::new(identified),
            calls: Mutex::new(Vec::new()),
            events,
        })
    }

    fn identify(&self) {
        self.identified.store(true, Ordering::SeqCst);
        let _ = self.events.send(ConnectionEvent::Identified);
    }

    /// Non-empty texts set on the notification source, in order.
    fn notification_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| {
                call.request_type == "SetInputSettings"
                    && call.request_data["inputName"] == "NotificationText"
            })
            .filter_map(|call| {
                let text = call.request_data["inputSettings"]["text"].as_str()?;
                if text.is_empty() {
                    None
                } else {
                    Some(text.to_string())
                }
            })
            .collect()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl SceneControl for RecordingScene {
    async fn connect(&self) -> Result<(), SceneError> {
        Ok(())
    }

    async fn disconnect(&self) {}

    async fn call(&self, request: SceneRequest) -> Result<serde_json::Value, SceneError> {
        if !self.is_connected() {
            return Err(SceneError::NotConnected);
        }
        self.calls.lock().unwrap().push(request);
        Ok(serde_json::Value::Null)
    }

    fn is_connected(&self) -> bool {
        self.identified.load(Ordering::SeqCst)
    }

    fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }
}

struct RecordingSpeech {
    spoken: Mutex<Vec<String>>,
}

impl RecordingSpeech {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            spoken: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl SpeechProvider for RecordingSpeech {
    fn name(&self) -> &str {
        "recording"
    }

    async fn speak(&self, text: &str) -> Result<(), SpeakError> {
        self.spoken.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

fn pipeline_settings() -> Settings {
    let mut settings = Settings::default();
    settings.tiktok.enabled = true;
    settings.tiktok.username = "creator".to_string();
    settings.twitch.enabled = true;
    settings.twitch.username = "creator".to_string();
    settings.general.tts_enabled = true;
    settings.tts.enabled_raw = "true".to_string();
    settings.general.combo_timeout_ms = 200;
    settings.timing.notification_duration = 50;
    settings.timing.notification_clear_delay = 10;
    settings
}

fn tiktok_gift(id: &str, group: Option<&str>, count: i64, repeat_end: bool) -> EventRecord {
    EventRecord {
        platform: "tiktok".to_string(),
        kind: "gift".to_string(),
        id: Some(id.to_string()),
        timestamp: Some(chrono::Utc::now()),
        username: Some("fan".to_string()),
        user_id: Some(serde_json::json!("42")),
        data: RecordData {
            gift_type: Some("Rose".to_string()),
            gift_count: Some(count),
            amount: Some(0.1 * count as f64),
            currency: Some("USD".to_string()),
            group_id: group.map(str::to_string),
            repeat_end: Some(repeat_end),
            monotonic: Some(true),
            ..RecordData::default()
        },
        correlation_id: None,
    }
}

async fn wait_until<F: Fn() -> bool>(condition: F, what: &str) {
    tokio::time::timeout(Duration::from_secs(3), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {what}"));
}

#[tokio::test]
async fn gift_combo_aggregates_to_one_artifact_and_one_tts() {
    let scene = RecordingScene::new(true);
    let speech = RecordingSpeech::new();

    let runtime = RuntimeBuilder::new(pipeline_settings())
        .with_scene_control(scene.clone())
        .with_speech_providers(speech.clone(), None)
        .build();
    let records = runtime.record_sender();
    let shutdown = runtime.shutdown_token();
    let run = tokio::spawn(runtime.run());

    // Three gift events in one combo group, 100 ms apart, running counts.
    for (i, (count, repeat_end)) in [(1, false), (2, false), (3, true)].iter().enumerate() {
        records
            .send(tiktok_gift(&format!("g-{i}"), Some("g1"), *count, *repeat_end))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    wait_until(
        || !scene.notification_texts().is_empty(),
        "aggregated gift on screen",
    )
    .await;
    // Settle: give any spurious duplicates time to appear.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let texts = scene.notification_texts();
    assert_eq!(texts.len(), 1, "exactly one enqueue for the combo: {texts:?}");
    assert!(texts[0].contains("3x Rose"), "max count wins: {}", texts[0]);

    let spoken = speech.spoken.lock().unwrap().clone();
    assert_eq!(spoken.len(), 1, "exactly one TTS emission: {spoken:?}");
    assert!(spoken[0].contains("3 Rose"));

    shutdown.cancel();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn envelope_without_currency_is_rejected_with_zero_enqueues() {
    let scene = RecordingScene::new(true);
    let runtime = RuntimeBuilder::new(pipeline_settings())
        .with_scene_control(scene.clone())
        .build();
    let records = runtime.record_sender();
    let shutdown = runtime.shutdown_token();

    // Rejections surface on the diagnostics topic.
    let diagnostics = Arc::new(Mutex::new(Vec::new()));
    let diagnostics_clone = Arc::clone(&diagnostics);
    let _subscription = runtime.bus().subscribe("diagnostics", move |message| {
        if let onair::bus::BusMessage::Diagnostic(event) = message {
            diagnostics_clone.lock().unwrap().push(event.message.clone());
        }
        Ok(())
    });

    let run = tokio::spawn(runtime.run());

    let mut record = tiktok_gift("e1", None, 1, true);
    record.kind = "envelope".to_string();
    record.data.gift_type = Some("Treasure Chest".to_string());
    record.data.amount = Some(500.0);
    record.data.currency = Some("".to_string());
    records.send(record).unwrap();

    wait_until(
        || !diagnostics.lock().unwrap().is_empty(),
        "rejection diagnostic",
    )
    .await;

    assert_eq!(scene.notification_texts().len(), 0);
    let messages = diagnostics.lock().unwrap();
    assert!(messages[0].contains("currency"), "got: {messages:?}");

    shutdown.cancel();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn disabled_follow_gate_drops_event_without_error() {
    let mut settings = pipeline_settings();
    settings.general.follows_enabled = false;

    let scene = RecordingScene::new(true);
    let runtime = RuntimeBuilder::new(settings)
        .with_scene_control(scene.clone())
        .build();
    let records = runtime.record_sender();
    let shutdown = runtime.shutdown_token();

    let diagnostics = Arc::new(Mutex::new(0usize));
    let diagnostics_clone = Arc::clone(&diagnostics);
    let _subscription = runtime.bus().subscribe("diagnostics", move |_| {
        *diagnostics_clone.lock().unwrap() += 1;
        Ok(())
    });

    let run = tokio::spawn(runtime.run());

    let follow = EventRecord {
        platform: "twitch".to_string(),
        kind: "follow".to_string(),
        id: None,
        timestamp: Some(chrono::Utc::now()),
        username: Some("new_follower".to_string()),
        user_id: Some(serde_json::json!("55")),
        data: RecordData::default(),
        correlation_id: None,
    };
    records.send(follow).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Silently dropped: no enqueue, no diagnostic.
    assert_eq!(scene.notification_texts().len(), 0);
    assert_eq!(*diagnostics.lock().unwrap(), 0);

    shutdown.cancel();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn scene_calls_buffer_until_identified() {
    let scene = RecordingScene::new(false);
    let runtime = RuntimeBuilder::new(pipeline_settings())
        .with_scene_control(scene.clone())
        .build();
    let records = runtime.record_sender();
    let shutdown = runtime.shutdown_token();
    let run = tokio::spawn(runtime.run());

    records.send(tiktok_gift("g-hold", None, 1, true)).unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    // Readiness: nothing issued before Identified.
    assert_eq!(scene.call_count(), 0);

    scene.identify();
    wait_until(|| scene.call_count() > 0, "buffered call after identify").await;
    assert!(scene
        .notification_texts()
        .iter()
        .any(|t| t.contains("Rose")));

    shutdown.cancel();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn duplicate_gift_id_enqueues_once() {
    let scene = RecordingScene::new(true);
    let runtime = RuntimeBuilder::new(pipeline_settings())
        .with_scene_control(scene.clone())
        .build();
    let records = runtime.record_sender();
    let shutdown = runtime.shutdown_token();
    let run = tokio::spawn(runtime.run());

    records.send(tiktok_gift("dup-1", None, 1, true)).unwrap();
    records.send(tiktok_gift("dup-1", None, 1, true)).unwrap();

    wait_until(
        || !scene.notification_texts().is_empty(),
        "first gift on screen",
    )
    .await;
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert_eq!(scene.notification_texts().len(), 1);

    shutdown.cancel();
    run.await.unwrap().unwrap();
}

#[tokio::test]
async fn paid_alias_is_rejected_and_reported() {
    let runtime = RuntimeBuilder::new(pipeline_settings()).build();
    let records = runtime.record_sender();
    let shutdown = runtime.shutdown_token();

    let diagnostics = Arc::new(Mutex::new(Vec::new()));
    let diagnostics_clone = Arc::clone(&diagnostics);
    let _subscription = runtime.bus().subscribe("diagnostics", move |message| {
        if let onair::bus::BusMessage::Diagnostic(event) = message {
            diagnostics_clone.lock().unwrap().push(event.message.clone());
        }
        Ok(())
    });

    let run = tokio::spawn(runtime.run());

    let mut record = tiktok_gift("s-1", None, 1, true);
    record.kind = "subscription".to_string();
    records.send(record).unwrap();

    wait_until(
        || !diagnostics.lock().unwrap().is_empty(),
        "alias rejection diagnostic",
    )
    .await;

    let messages = diagnostics.lock().unwrap();
    assert!(
        messages[0].contains("Unsupported paid alias event type: subscription"),
        "got: {messages:?}"
    );

    shutdown.cancel();
    run.await.unwrap().unwrap();
}
