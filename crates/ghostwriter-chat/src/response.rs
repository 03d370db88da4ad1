//! Reply generation: prompt assembly, completion, then list parsing.
//!
//! A generation walks `Idle -> Assembling -> Completing -> Parsing -> Done`.
//! `Failed` is terminal and reachable from every non-idle state before `Done`.
//! Parsing never fails: an empty parse falls back to the whole completion
//! text as one candidate.

use std::sync::Arc;

use tracing::{debug, info, warn};

use ghostwriter_core::{CandidateList, InboundMessage};
use ghostwriter_models::CompletionProvider;

use crate::context::PromptAssembler;
use crate::error::ChatError;
use crate::parser;

/// Where a generation currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationState {
    Idle,
    Assembling,
    Completing,
    Parsing,
    Done,
    Failed,
}

impl std::fmt::Display for GenerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GenerationState::Idle => "idle",
            GenerationState::Assembling => "assembling",
            GenerationState::Completing => "completing",
            GenerationState::Parsing => "parsing",
            GenerationState::Done => "done",
            GenerationState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Validate that a state transition is allowed.
///
/// Valid transitions:
/// - Idle -> Assembling
/// - Assembling -> Completing
/// - Completing -> Parsing
/// - Parsing -> Done
/// - Assembling / Completing / Parsing -> Failed
pub fn validate_transition(from: GenerationState, to: GenerationState) -> Result<(), ChatError> {
    use GenerationState::*;

    let valid = matches!(
        (from, to),
        (Idle, Assembling)
            | (Assembling, Completing)
            | (Completing, Parsing)
            | (Parsing, Done)
            | (Assembling, Failed)
            | (Completing, Failed)
            | (Parsing, Failed)
    );

    if valid {
        Ok(())
    } else {
        Err(ChatError::InvalidTransition { from, to })
    }
}

/// Tracks one generation's state and wraps errors with the state they hit.
#[derive(Debug)]
struct Generation {
    state: GenerationState,
}

impl Generation {
    fn new() -> Self {
        Self {
            state: GenerationState::Idle,
        }
    }

    fn advance(&mut self, to: GenerationState) -> Result<(), ChatError> {
        validate_transition(self.state, to)?;
        self.state = to;
        Ok(())
    }

    fn fail(&mut self, cause: ChatError) -> ChatError {
        let state = self.state;
        if validate_transition(state, GenerationState::Failed).is_ok() {
            self.state = GenerationState::Failed;
        }
        ChatError::Failed {
            state,
            source: Box::new(cause),
        }
    }
}

/// Candidate list parsed from completion text, plus whether the parse degraded.
pub fn candidates_from_text(text: &str) -> (CandidateList, bool) {
    match CandidateList::new(parser::parse(text)) {
        Some(list) => (list, false),
        None => (CandidateList::single(text.trim()), true),
    }
}

pub struct ResponseGenerator {
    assembler: PromptAssembler,
    completion: Arc<dyn CompletionProvider>,
}

impl ResponseGenerator {
    pub fn new(assembler: PromptAssembler, completion: Arc<dyn CompletionProvider>) -> Self {
        Self {
            assembler,
            completion,
        }
    }

    pub fn assembler(&self) -> &PromptAssembler {
        &self.assembler
    }

    /// Draft candidate replies for one inbound message.
    ///
    /// No retries happen here; provider adapters own their I/O timeouts.
    pub async fn generate(&self, message: &InboundMessage) -> Result<CandidateList, ChatError> {
        let mut generation = Generation::new();

        generation.advance(GenerationState::Assembling)?;
        let prompt = match self.assembler.assemble(message).await {
            Ok(prompt) => prompt,
            Err(err) => return Err(generation.fail(err)),
        };
        if prompt.is_ungrounded() {
            debug!(sender_key = %message.sender_key, "No grounding context available");
        }

        generation.advance(GenerationState::Completing)?;
        let raw = match self
            .completion
            .complete(&prompt.system_prompt, &message.content)
            .await
        {
            Ok(raw) => raw,
            Err(err) => return Err(generation.fail(err.into())),
        };

        generation.advance(GenerationState::Parsing)?;
        let (candidates, degraded) = candidates_from_text(&raw);
        if degraded {
            warn!(
                sender_key = %message.sender_key,
                timestamp = message.timestamp.0,
                "Completion had no numbered items; using whole text as one candidate"
            );
        }

        generation.advance(GenerationState::Done)?;
        info!(
            sender_key = %message.sender_key,
            timestamp = message.timestamp.0,
            provider = self.completion.name(),
            candidates = candidates.len(),
            "Generated candidates"
        );
        Ok(candidates)
    }
}
