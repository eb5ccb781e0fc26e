//! The display queue daemon.
//!
//! One task owns all overlay state: the priority heap for the notification
//! slot, the active item and its deadline, the rolling chat line, and the
//! readiness buffer toward the scene-control effector. Commands arrive on a
//! channel; connection events arrive on the effector's broadcast stream.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, VecDeque};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{strict_bool, DisplayConfig};
use crate::effector::{ConnectionEvent, SceneControl, SceneRequest};
use crate::notify::{NotificationArtifact, Slot};

enum QueueCommand {
    Add(Box<NotificationArtifact>),
    Clear(Slot),
}

/// Handle for feeding the display queue.
///
/// Cheap to clone; all clones feed the same daemon.
#[derive(Clone)]
pub struct DisplayQueue {
    tx: mpsc::UnboundedSender<QueueCommand>,
    tts_enabled: bool,
}

impl DisplayQueue {
    /// Build a handle and its daemon. The daemon must be spawned.
    pub fn new(config: DisplayConfig, scene: Arc<dyn SceneControl>) -> (Self, DisplayDaemon) {
        let (tx, rx) = mpsc::unbounded_channel();
        let tts_enabled = strict_bool(&config.tts_enabled_raw);

        let handle = Self { tx, tts_enabled };
        let daemon = DisplayDaemon {
            config,
            scene,
            rx,
            heap: BinaryHeap::new(),
            active: None,
            chat_deadline: None,
            ready: false,
            hold_buffer: VecDeque::new(),
            next_seq: 0,
        };
        (handle, daemon)
    }

    /// Enqueue an artifact onto its slot.
    pub fn add_item(&self, artifact: NotificationArtifact) {
        let _ = self.tx.send(QueueCommand::Add(Box::new(artifact)));
    }

    /// Empty a slot's overlay sources.
    pub fn clear(&self, slot: Slot) {
        let _ = self.tx.send(QueueCommand::Clear(slot));
    }

    /// Strict TTS coupling flag (see [`strict_bool`]).
    pub fn is_tts_enabled(&self) -> bool {
        self.tts_enabled
    }
}

struct QueueEntry {
    priority: u8,
    seq: u64,
    artifact: Box<NotificationArtifact>,
}

impl PartialEq for QueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.seq == other.seq
    }
}
impl Eq for QueueEntry {}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        // Max-heap on priority; FIFO (smaller seq first) within a priority.
        self.priority
            .cmp(&other.priority)
            .then(other.seq.cmp(&self.seq))
    }
}
impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

struct ActiveItem {
    artifact: Box<NotificationArtifact>,
    deadline: Instant,
}

/// The daemon; run it as a task.
pub struct DisplayDaemon {
    config: DisplayConfig,
    scene: Arc<dyn SceneControl>,
    rx: mpsc::UnboundedReceiver<QueueCommand>,
    heap: BinaryHeap<QueueEntry>,
    active: Option<ActiveItem>,
    chat_deadline: Option<Instant>,
    ready: bool,
    /// Most-recent scene calls held until the effector identifies.
    hold_buffer: VecDeque<SceneRequest>,
    next_seq: u64,
}

impl DisplayDaemon {
    /// Run until shutdown. Drains the active item, drops pending.
    pub async fn run(mut self, shutdown: CancellationToken) {
        let mut events = self.scene.subscribe_events();
        self.ready = self.scene.is_connected();
        debug!(ready = self.ready, "display queue starting");

        loop {
            let notification_deadline = self.active.as_ref().map(|a| a.deadline);
            let chat_deadline = self.chat_deadline;

            tokio::select! {
                _ = shutdown.cancelled() => break,

                command = self.rx.recv() => {
                    match command {
                        Some(QueueCommand::Add(artifact)) => self.on_add(artifact).await,
                        Some(QueueCommand::Clear(slot)) => self.on_clear(slot).await,
                        None => break,
                    }
                }

                event = events.recv() => {
                    match event {
                        Ok(ConnectionEvent::Identified) => {
                            debug!("effector identified; flushing held scene calls");
                            self.ready = true;
                            self.flush_held().await;
                            if self.active.is_none() {
                                self.activate_next().await;
                            }
                        }
                        Ok(ConnectionEvent::ConnectionClosed { .. }) => {
                            self.ready = false;
                        }
                        Ok(ConnectionEvent::ConnectionOpened) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "display queue lagged on effector events");
                            self.ready = self.scene.is_connected();
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                }

                _ = sleep_until_opt(notification_deadline), if notification_deadline.is_some() => {
                    self.expire_active().await;
                }

                _ = sleep_until_opt(chat_deadline), if chat_deadline.is_some() => {
                    self.chat_deadline = None;
                    self.clear_chat().await;
                }
            }
        }

        // Shutdown: clear the active item, drop everything pending.
        if self.active.take().is_some() {
            self.clear_notification_sources().await;
        }
        self.heap.clear();
        debug!("display queue stopped");
    }

    async fn on_add(&mut self, artifact: Box<NotificationArtifact>) {
        match artifact.slot() {
            Slot::Chat => {
                // Rolling: the newest chat line always wins.
                self.show_chat(&artifact).await;
                self.chat_deadline =
                    Some(Instant::now() + self.config.chat_message_duration);
            }
            Slot::Notification => {
                let seq = self.next_seq;
                self.next_seq += 1;
                let priority = artifact.priority;
                self.heap.push(QueueEntry {
                    priority,
                    seq,
                    artifact,
                });

                let active_priority = self.active.as_ref().map(|a| a.artifact.priority);
                match active_priority {
                    None => self.activate_next().await,
                    Some(current) if self.config.preemption && priority > current => {
                        debug!(priority, "preempting active notification");
                        self.expire_active().await;
                    }
                    Some(_) => {} // Waits its turn.
                }
            }
        }
    }

    async fn on_clear(&mut self, slot: Slot) {
        match slot {
            Slot::Chat => {
                self.chat_deadline = None;
                self.clear_chat().await;
            }
            Slot::Notification => {
                self.active = None;
                self.clear_notification_sources().await;
            }
        }
    }

    /// Activate the highest-priority pending item, if any.
    async fn activate_next(&mut self) {
        let Some(entry) = self.heap.pop() else {
            return;
        };
        let artifact = entry.artifact;

        self.issue(SceneRequest::set_input_text(
            &self.config.notification_text_source,
            &artifact.display_message,
        ))
        .await;
        self.issue(SceneRequest::set_scene_item_enabled(
            &self.config.notification_group,
            self.config.notification_logo(artifact.platform),
            true,
        ))
        .await;

        let deadline = Instant::now() + std::time::Duration::from_millis(artifact.duration_ms);
        debug!(
            id = %artifact.id,
            kind = %artifact.kind,
            priority = artifact.priority,
            "notification active"
        );
        self.active = Some(ActiveItem { artifact, deadline });
    }

    /// Clear the expired active item, honor the inter-item delay, then
    /// activate the next.
    async fn expire_active(&mut self) {
        if self.active.take().is_none() {
            return;
        }
        self.clear_notification_sources().await;
        tokio::time::sleep(self.config.notification_clear_delay).await;
        self.activate_next().await;
    }

    async fn show_chat(&mut self, artifact: &NotificationArtifact) {
        self.issue(SceneRequest::set_input_text(
            &self.config.chat_text_source,
            &artifact.display_message,
        ))
        .await;
        self.issue(SceneRequest::set_scene_item_enabled(
            &self.config.chat_group,
            self.config.chat_logo(artifact.platform),
            true,
        ))
        .await;
    }

    async fn clear_chat(&mut self) {
        self.issue(SceneRequest::set_input_text(
            &self.config.chat_text_source,
            "",
        ))
        .await;
        for (_, logo) in self.config.chat_platform_logos.clone() {
            self.issue(SceneRequest::set_scene_item_enabled(
                &self.config.chat_group,
                &logo,
                false,
            ))
            .await;
        }
    }

    /// Empty the notification text source and reset logo visibility.
    async fn clear_notification_sources(&mut self) {
        self.issue(SceneRequest::set_input_text(
            &self.config.notification_text_source,
            "",
        ))
        .await;
        for (_, logo) in self.config.notification_platform_logos.clone() {
            self.issue(SceneRequest::set_scene_item_enabled(
                &self.config.notification_group,
                &logo,
                false,
            ))
            .await;
        }
    }

    /// Send a scene call, or hold it while the effector is not ready.
    async fn issue(&mut self, request: SceneRequest) {
        if !self.ready || !self.scene.is_connected() {
            if self.hold_buffer.len() >= self.config.readiness_buffer_size {
                self.hold_buffer.pop_front();
            }
            self.hold_buffer.push_back(request);
            return;
        }

        if let Err(error) = self.scene.call(request).await {
            // Transient: the effector reconnects on its own and the next
            // Identified re-syncs state.
            warn!(%error, "scene call failed");
        }
    }

    async fn flush_held(&mut self) {
        while let Some(request) = self.hold_buffer.pop_front() {
            if let Err(error) = self.scene.call(request).await {
                warn!(%error, "held scene call failed");
            }
        }
    }
}


/// Sleep until `deadline`; pends forever when `None` (arm is disabled by
/// its `if` guard, this keeps the future type simple).
async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
