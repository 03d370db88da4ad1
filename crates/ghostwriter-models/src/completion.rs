//! Completion provider trait and a scripted fake for tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::ModelError;

/// Given a system prompt and a user query, returns free-form text.
///
/// The system prompt is passed through untruncated.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, system_prompt: &str, query: &str) -> Result<String, ModelError>;

    /// Registry tag of this provider, for logging.
    fn name(&self) -> &str;
}

/// A completion provider that replays canned replies in order.
///
/// Once the script runs out the last reply repeats. Every call records the
/// system prompt it received so tests can inspect the assembled context.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, String>>>,
    last: Mutex<Option<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// A provider that always answers `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self::new().then_reply(reply)
    }

    /// A provider whose every call fails with an API error.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new().then_fail(message)
    }

    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()))
    }

    pub fn then_fail(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()))
    }

    fn push(self, step: Result<String, String>) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(step);
        }
        self
    }

    /// System prompts received so far, oldest first.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_step(&self) -> Option<Result<String, String>> {
        let mut replies = self.replies.lock().ok()?;
        let mut last = self.last.lock().ok()?;
        if let Some(step) = replies.pop_front() {
            *last = Some(step);
        }
        last.clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn complete(&self, system_prompt: &str, _query: &str) -> Result<String, ModelError> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(system_prompt.to_string());
        }
        match self.next_step() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(ModelError::Api {
                provider: "scripted",
                status: 500,
                body: message,
            }),
            None => Ok(String::new()),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
