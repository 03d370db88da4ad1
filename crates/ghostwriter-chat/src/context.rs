//! Prompt assembly: gathers four bounded context blocks and renders them
//! into one grounded system prompt.
//!
//! Blocks, in prompt order:
//! 1. current conversation: the sender's messages in the trailing window
//!    that ends at their latest message
//! 2. sender history: the sender's most recent messages, newest first
//! 3. similar: legacy and archived matches above the strict threshold
//! 4. style: legacy and archived matches above the loose threshold
//!
//! Window and history reads degrade to an empty block on any store error.
//! Similarity reads degrade only on "no rows"; an unavailable store fails
//! the assembly, as does an embedding error.

use std::sync::Arc;

use tracing::{debug, warn};

use ghostwriter_core::config::ContextConfig;
use ghostwriter_core::{ContextWindow, InboundMessage};
use ghostwriter_models::EmbeddingProvider;
use ghostwriter_storage::{ContextGateway, StoreError};

use crate::error::ChatError;

/// One retrieved slice of history, or nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContextBlock {
    Filled(Vec<String>),
    Empty,
}

impl ContextBlock {
    pub fn is_empty(&self) -> bool {
        matches!(self, ContextBlock::Empty)
    }

    pub fn items(&self) -> &[String] {
        match self {
            ContextBlock::Filled(items) => items,
            ContextBlock::Empty => &[],
        }
    }

    /// Absorb any store error into an empty block.
    fn or_empty(result: Result<Vec<String>, StoreError>, block: &'static str) -> Self {
        match result {
            Ok(items) => ContextBlock::from(items),
            Err(StoreError::NotFound(_)) => {
                debug!(block, "No rows; block left empty");
                ContextBlock::Empty
            }
            Err(err) => {
                warn!(block, error = %err, "Store read failed; block left empty");
                ContextBlock::Empty
            }
        }
    }

    /// Absorb "no rows" only; I/O failures propagate.
    fn or_empty_if_missing(
        result: Result<Vec<String>, StoreError>,
        block: &'static str,
    ) -> Result<Self, ChatError> {
        match result {
            Ok(items) => Ok(ContextBlock::from(items)),
            Err(StoreError::NotFound(_)) => {
                debug!(block, "No matches; block left empty");
                Ok(ContextBlock::Empty)
            }
            Err(err) => Err(err.into()),
        }
    }

    fn render(&self) -> String {
        match self {
            ContextBlock::Filled(items) => items
                .iter()
                .map(|item| format!("- {}", item))
                .collect::<Vec<_>>()
                .join("\n"),
            ContextBlock::Empty => "(none)".to_string(),
        }
    }
}

impl From<Vec<String>> for ContextBlock {
    fn from(items: Vec<String>) -> Self {
        if items.is_empty() {
            ContextBlock::Empty
        } else {
            ContextBlock::Filled(items)
        }
    }
}

/// The rendered prompt together with the blocks it was built from.
#[derive(Debug, Clone)]
pub struct AssembledPrompt {
    pub system_prompt: String,
    pub conversation: ContextBlock,
    pub sender_history: ContextBlock,
    pub similar: ContextBlock,
    pub style: ContextBlock,
}

impl AssembledPrompt {
    /// True when no block carries any history.
    pub fn is_ungrounded(&self) -> bool {
        self.conversation.is_empty()
            && self.sender_history.is_empty()
            && self.similar.is_empty()
            && self.style.is_empty()
    }
}

pub struct PromptAssembler {
    gateway: ContextGateway,
    embedder: Arc<dyn EmbeddingProvider>,
    config: ContextConfig,
}

impl PromptAssembler {
    pub fn new(
        gateway: ContextGateway,
        embedder: Arc<dyn EmbeddingProvider>,
        config: ContextConfig,
    ) -> Self {
        Self {
            gateway,
            embedder,
            config,
        }
    }

    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.embedder
    }

    pub async fn assemble(&self, message: &InboundMessage) -> Result<AssembledPrompt, ChatError> {
        let (conversation, sender_history, embedding) = tokio::join!(
            self.conversation_block(&message.sender_key),
            self.history_block(&message.sender_key),
            self.embedder.embed(&message.content),
        );
        let embedding = embedding?;

        let similar = ContextBlock::or_empty_if_missing(
            self.gateway
                .similarity_search(
                    &embedding,
                    &message.user_id,
                    self.config.similar_top_k,
                    self.config.similar_threshold,
                )
                .await,
            "similar",
        )?;
        let style = ContextBlock::or_empty_if_missing(
            self.gateway
                .similarity_search(
                    &embedding,
                    &message.user_id,
                    self.config.style_top_k,
                    self.config.style_threshold,
                )
                .await,
            "style",
        )?;

        debug!(
            sender_key = %message.sender_key,
            conversation = conversation.items().len(),
            history = sender_history.items().len(),
            similar = similar.items().len(),
            style = style.items().len(),
            "Assembled context blocks"
        );

        let system_prompt = render_prompt(
            &message.user_id,
            &message.content,
            &conversation,
            &sender_history,
            &similar,
            &style,
        );

        Ok(AssembledPrompt {
            system_prompt,
            conversation,
            sender_history,
            similar,
            style,
        })
    }

    /// The sender's messages within `window_ms` of their latest message.
    async fn conversation_block(&self, sender_key: &str) -> ContextBlock {
        let latest = match self.gateway.latest_timestamp(Some(sender_key)).await {
            Ok(ts) => ts,
            Err(err) => return ContextBlock::or_empty(Err(err), "conversation"),
        };
        let window =
            ContextWindow::trailing(latest, self.config.window_ms, Some(sender_key.to_string()));
        ContextBlock::or_empty(self.gateway.messages_in_window(&window).await, "conversation")
    }

    async fn history_block(&self, sender_key: &str) -> ContextBlock {
        ContextBlock::or_empty(
            self.gateway
                .recent_by_sender(sender_key, self.config.sender_history_limit)
                .await,
            "sender_history",
        )
    }
}

fn render_prompt(
    user_id: &str,
    content: &str,
    conversation: &ContextBlock,
    sender_history: &ContextBlock,
    similar: &ContextBlock,
    style: &ContextBlock,
) -> String {
    format!(
        "You are drafting replies on behalf of {user}. Write exactly as {user} would \
text: same voice, phrasing, length and punctuation.\n\
\n\
Everything you know about {user} comes from the samples below. Infer their tone, \
values and background only from these samples. Do not state any fact, plan, name \
or opinion that the samples do not support.\n\
\n\
Current conversation (oldest first):\n{conversation}\n\
\n\
Recent messages from this sender (newest first):\n{history}\n\
\n\
Past messages on a similar topic:\n{similar}\n\
\n\
Past messages showing how {user} writes:\n{style}\n\
\n\
Message to reply to:\n{content}\n\
\n\
Reply with exactly three alternative responses as a numbered list (\"1. \", \"2. \", \
\"3. \"), one per line, and nothing else. If the samples do not give you enough \
to answer, write three different ways {user} would say they don't know, in \
their own style, instead of making something up.",
        user = user_id,
        conversation = conversation.render(),
        history = sender_history.render(),
        similar = similar.render(),
        style = style.render(),
        content = content,
    )
}
