//! Relay coordinator: the single task that owns the correlation queue.
//!
//! Socket tasks turn frames into [`RelayCommand`]s and push them through a
//! [`RelayHandle`]. The coordinator handles each command without awaiting, so
//! queue mutations are serialized and never interleave with I/O. Generation
//! and archiving run in their own tasks; a finished generation comes back to
//! the coordinator as an internal message and is attached by [`EntryId`].
//!
//! ```text
//! producer ──newMessage──▶ enqueue ──spawn──▶ draft ──▶ attach ──▶ reviewers: candidatesReady
//!                                                                  producer:  ack
//! reviewer ──selectionSubmitted──▶ lookup ──▶ archive (spawned)
//!                                          ──▶ producers: sendSelectedResponse
//!                                          ──▶ reviewer:  selectionAck
//!                                          ──▶ remove entry
//! producer ──conversationChanged──▶ clear ──▶ reviewers: conversationChanged
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use ghostwriter_chat::{ChatError, ResponseGenerator};
use ghostwriter_core::events::{
    NewMessage, ProducerEvent, ProducerOutbound, ReviewerEvent, ReviewerOutbound,
    SelectionSubmitted,
};
use ghostwriter_core::{CandidateList, GhostwriterConfig, InboundMessage, QaPair, Timestamp};

use crate::archive::QaArchive;
use crate::error::RelayError;
use crate::queue::{CorrelationEntry, CorrelationQueue, EntryId};

/// The only failure text a producer ever sees for a failed generation.
pub const GENERIC_FAILURE: &str = "An error occurred while processing the message.";

/// Drafts candidate replies for an inbound message.
#[async_trait]
pub trait ReplyDrafter: Send + Sync {
    async fn draft(&self, message: &InboundMessage) -> Result<CandidateList, ChatError>;
}

#[async_trait]
impl ReplyDrafter for ResponseGenerator {
    async fn draft(&self, message: &InboundMessage) -> Result<CandidateList, ChatError> {
        self.generate(message).await
    }
}

/// Per-connection return path for direct replies (acks, errors).
pub type ProducerReply = mpsc::UnboundedSender<ProducerOutbound>;
pub type ReviewerReply = mpsc::UnboundedSender<ReviewerOutbound>;

pub enum RelayCommand {
    Producer {
        event: ProducerEvent,
        reply: ProducerReply,
    },
    Reviewer {
        event: ReviewerEvent,
        reply: ReviewerReply,
    },
    Snapshot {
        respond: oneshot::Sender<Vec<CorrelationEntry>>,
    },
}

struct GenerationFinished {
    entry_id: EntryId,
    reply: ProducerReply,
    outcome: Result<CandidateList, ChatError>,
}

#[derive(Debug, Clone)]
pub struct RelaySettings {
    /// Table selected replies are archived into.
    pub message_table: String,
    pub default_user_id: String,
    pub default_sender_key: String,
    pub channel_capacity: usize,
}

impl RelaySettings {
    pub fn from_config(config: &GhostwriterConfig) -> Self {
        Self {
            message_table: config.store.message_table.clone(),
            default_user_id: config.relay.default_user_id.clone(),
            default_sender_key: config.relay.default_sender_key.clone(),
            channel_capacity: config.relay.channel_capacity,
        }
    }
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self::from_config(&GhostwriterConfig::default())
    }
}

/// Cloneable entry point to a running coordinator.
#[derive(Clone)]
pub struct RelayHandle {
    commands: mpsc::Sender<RelayCommand>,
    producers: broadcast::Sender<ProducerOutbound>,
    reviewers: broadcast::Sender<ReviewerOutbound>,
}

impl RelayHandle {
    pub async fn send(&self, command: RelayCommand) -> Result<(), RelayError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RelayError::CoordinatorClosed)
    }

    pub async fn producer_event(
        &self,
        event: ProducerEvent,
        reply: ProducerReply,
    ) -> Result<(), RelayError> {
        self.send(RelayCommand::Producer { event, reply }).await
    }

    pub async fn reviewer_event(
        &self,
        event: ReviewerEvent,
        reply: ReviewerReply,
    ) -> Result<(), RelayError> {
        self.send(RelayCommand::Reviewer { event, reply }).await
    }

    /// Pending entries, oldest first.
    pub async fn snapshot(&self) -> Result<Vec<CorrelationEntry>, RelayError> {
        let (respond, rx) = oneshot::channel();
        self.send(RelayCommand::Snapshot { respond }).await?;
        rx.await.map_err(|_| RelayError::CoordinatorClosed)
    }

    /// Events broadcast to every producer connection.
    pub fn subscribe_producer(&self) -> broadcast::Receiver<ProducerOutbound> {
        self.producers.subscribe()
    }

    /// Events broadcast to every reviewer connection.
    pub fn subscribe_reviewer(&self) -> broadcast::Receiver<ReviewerOutbound> {
        self.reviewers.subscribe()
    }
}

pub struct RelayCoordinator {
    queue: CorrelationQueue,
    drafter: Arc<dyn ReplyDrafter>,
    archive: Arc<QaArchive>,
    settings: RelaySettings,
    producers: broadcast::Sender<ProducerOutbound>,
    reviewers: broadcast::Sender<ReviewerOutbound>,
    finished_tx: mpsc::UnboundedSender<GenerationFinished>,
}

impl RelayCoordinator {
    /// Start the coordinator task. It stops once every handle is dropped.
    pub fn spawn(
        drafter: Arc<dyn ReplyDrafter>,
        archive: Arc<QaArchive>,
        settings: RelaySettings,
    ) -> (RelayHandle, JoinHandle<()>) {
        let capacity = settings.channel_capacity.max(1);
        let (commands_tx, commands_rx) = mpsc::channel(capacity);
        let (producers, _) = broadcast::channel(capacity);
        let (reviewers, _) = broadcast::channel(capacity);
        let (finished_tx, finished_rx) = mpsc::unbounded_channel();

        let handle = RelayHandle {
            commands: commands_tx,
            producers: producers.clone(),
            reviewers: reviewers.clone(),
        };
        let coordinator = Self {
            queue: CorrelationQueue::new(),
            drafter,
            archive,
            settings,
            producers,
            reviewers,
            finished_tx,
        };
        let task = tokio::spawn(coordinator.run(commands_rx, finished_rx));
        (handle, task)
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<RelayCommand>,
        mut finished: mpsc::UnboundedReceiver<GenerationFinished>,
    ) {
        info!("Relay coordinator started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => break,
                },
                Some(done) = finished.recv() => self.on_generation_finished(done),
            }
        }
        info!(pending = self.queue.len(), "Relay coordinator stopped");
    }

    fn handle_command(&mut self, command: RelayCommand) {
        match command {
            RelayCommand::Producer { event, reply } => self.on_producer_event(event, reply),
            RelayCommand::Reviewer { event, reply } => self.on_reviewer_event(event, reply),
            RelayCommand::Snapshot { respond } => {
                let _ = respond.send(self.queue.snapshot());
            }
        }
    }

    fn on_producer_event(&mut self, event: ProducerEvent, reply: ProducerReply) {
        debug!(event = event.event_name(), "Producer event");
        match event {
            ProducerEvent::NewMessage(message) => self.on_new_message(message, reply),
            ProducerEvent::ConversationChanged {
                new_conversation_id,
            } => {
                let dropped = self.queue.clear();
                info!(%new_conversation_id, dropped, "Conversation changed; queue cleared");
                self.to_reviewers(ReviewerOutbound::ConversationChanged {
                    new_conversation_id,
                });
                notify(
                    &reply,
                    ProducerOutbound::Ack {
                        message: "Conversation change processed".to_string(),
                    },
                );
            }
            ProducerEvent::WorkspaceUpdate(data) => {
                self.to_reviewers(ReviewerOutbound::WorkspaceUpdate(data))
            }
            ProducerEvent::SelectConversation(data) => {
                self.to_reviewers(ReviewerOutbound::SelectConversation(data))
            }
            ProducerEvent::MessageSent(data) => {
                self.to_reviewers(ReviewerOutbound::MessageSent(data))
            }
            other => warn!(event = other.event_name(), "Unhandled producer event"),
        }
    }

    fn on_reviewer_event(&mut self, event: ReviewerEvent, reply: ReviewerReply) {
        debug!(event = event.event_name(), "Reviewer event");
        match event {
            ReviewerEvent::SelectionSubmitted(selection) => self.on_selection(selection, reply),
            ReviewerEvent::SelectConversation(data) => {
                self.to_producers(ProducerOutbound::SelectConversation(data))
            }
            ReviewerEvent::Ack(data) => debug!(%data, "Reviewer ack"),
            other => warn!(event = other.event_name(), "Unhandled reviewer event"),
        }
    }

    fn on_new_message(&mut self, message: NewMessage, reply: ProducerReply) {
        let message = match validate_new_message(message) {
            Ok(message) => message,
            Err(err) => {
                warn!(error = %err, "Rejected inbound message");
                notify(&reply, ProducerOutbound::error(err.to_string()));
                return;
            }
        };

        let entry_id = self.queue.enqueue(message.clone(), Vec::new());
        info!(
            %entry_id,
            sender_key = %message.sender_key,
            timestamp = message.timestamp.0,
            pending = self.queue.len(),
            "Inbound message queued"
        );

        let drafter = self.drafter.clone();
        let finished = self.finished_tx.clone();
        tokio::spawn(async move {
            let outcome = drafter.draft(&message).await;
            let _ = finished.send(GenerationFinished {
                entry_id,
                reply,
                outcome,
            });
        });
    }

    fn on_generation_finished(&mut self, done: GenerationFinished) {
        let GenerationFinished {
            entry_id,
            reply,
            outcome,
        } = done;

        let candidates = match outcome {
            Ok(candidates) => candidates,
            Err(err) => {
                error!(%entry_id, error = %err, "Generation failed");
                self.queue.remove(entry_id);
                notify(&reply, ProducerOutbound::error(GENERIC_FAILURE));
                return;
            }
        };

        if !self.queue.attach_candidates(entry_id, candidates.clone()) {
            debug!(%entry_id, "Entry gone before generation finished; discarding candidates");
            return;
        }
        let Some(entry) = self.queue.get(entry_id) else {
            return;
        };

        self.to_reviewers(ReviewerOutbound::CandidatesReady {
            content: entry.message.content.clone(),
            timestamp: entry.message.timestamp,
            candidates,
            sender_key: entry.message.sender_key.clone(),
        });
        notify(
            &reply,
            ProducerOutbound::Ack {
                message: "Message processed".to_string(),
            },
        );
    }

    fn on_selection(&mut self, selection: SelectionSubmitted, reply: ReviewerReply) {
        let chosen = match selection.selected_reply.filter(|r| !r.trim().is_empty()) {
            Some(chosen) => chosen,
            None => {
                notify(&reply, ReviewerOutbound::error("Missing \"selected_reply\"."));
                return;
            }
        };

        let table = &self.settings.message_table;
        let (pair, matched) = match selection.original_timestamp {
            Some(timestamp) => {
                let entry = match selection.sender_key.as_deref() {
                    Some(sender_key) => self.queue.find_by_key(timestamp, sender_key),
                    None => self.queue.find_by_timestamp(timestamp),
                };
                match entry {
                    Some(entry) => (
                        Some(QaPair::for_reply(&entry.message, &chosen, table)),
                        Some((entry.id, entry.message.content.clone())),
                    ),
                    None => {
                        warn!(timestamp = timestamp.0, "No pending message for selection; not archived");
                        (None, None)
                    }
                }
            }
            None => (
                Some(QaPair::conversation_start(
                    &chosen,
                    &self.settings.default_user_id,
                    &self.settings.default_sender_key,
                    table,
                    Timestamp::now(),
                )),
                None,
            ),
        };

        if let Some(pair) = pair {
            let archive = self.archive.clone();
            tokio::spawn(async move {
                if let Err(err) = archive.record(&pair).await {
                    error!(error = %err, sender_key = %pair.sender_key, "Failed to archive Q/A pair");
                }
            });
        }

        let original_content = selection
            .original_content
            .or_else(|| matched.as_ref().map(|(_, content)| content.clone()));
        self.to_producers(ProducerOutbound::SendSelectedResponse {
            selected_reply: chosen,
            original_content,
            original_timestamp: selection.original_timestamp,
        });
        notify(
            &reply,
            ReviewerOutbound::SelectionAck {
                message: "Selected response submitted successfully.".to_string(),
            },
        );

        if let Some((entry_id, _)) = matched {
            self.queue.remove(entry_id);
        }
    }

    fn to_reviewers(&self, event: ReviewerOutbound) {
        let name = event.event_name();
        if self.reviewers.send(event).is_err() {
            debug!(event = name, "No reviewer connected");
        }
    }

    fn to_producers(&self, event: ProducerOutbound) {
        let name = event.event_name();
        if self.producers.send(event).is_err() {
            debug!(event = name, "No producer connected");
        }
    }
}

fn notify<T>(reply: &mpsc::UnboundedSender<T>, event: T) {
    if reply.send(event).is_err() {
        debug!("Sender disconnected before reply");
    }
}

/// Check that an inbound message carries every required field.
pub fn validate_new_message(message: NewMessage) -> Result<InboundMessage, RelayError> {
    let content = non_blank(message.content);
    let user_id = non_blank(message.user_id);
    let sender_key = non_blank(message.sender_key);

    match (content, message.timestamp, user_id, sender_key) {
        (Some(content), Some(timestamp), Some(user_id), Some(sender_key)) => Ok(InboundMessage {
            content,
            timestamp,
            sender_key,
            user_id,
        }),
        (content, timestamp, user_id, sender_key) => {
            let missing: Vec<&str> = [
                ("content", content.is_none()),
                ("timestamp", timestamp.is_none()),
                ("user_id", user_id.is_none()),
                ("sender_key", sender_key.is_none()),
            ]
            .into_iter()
            .filter_map(|(name, absent)| absent.then_some(name))
            .collect();
            Err(RelayError::Validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
