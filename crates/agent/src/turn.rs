//! The per-turn completion cycle.
//!
//! One user submission runs `AwaitingInput → Processing → AwaitingInput`:
//!
//! 1. **Append** the user text to the session (empty input ends the turn here)
//! 2. **Assemble** the request from the session
//! 3. **Complete** via the configured provider
//! 4. **Append** exactly one assistant message: the reply, or the error text
//!
//! Provider failures never escape a turn. They become the assistant's reply,
//! prefixed with [`ERROR_REPLY_PREFIX`], so the transcript always grows by
//! one user and one assistant message.

use std::sync::Arc;

use filechat_config::AppConfig;
use filechat_core::error::ProviderError;
use filechat_core::provider::{Provider, ProviderRequest, Usage};
use filechat_core::session::SessionState;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::context::{PromptAssembler, SystemInstruction};
use crate::stream_event::TurnEvent;

/// Prefix of the assistant message stored when the completion call fails.
pub const ERROR_REPLY_PREFIX: &str = "Error: ";

/// How a turn ended.
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The user text was empty; nothing was stored and no call was made.
    Skipped,

    /// The model replied and the reply was stored.
    Replied { reply: String, usage: Option<Usage> },

    /// The call failed and the error text was stored as the reply.
    Failed { reply: String, error: ProviderError },
}

impl TurnOutcome {
    /// The assistant text stored by this turn, if any.
    pub fn reply(&self) -> Option<&str> {
        match self {
            TurnOutcome::Skipped => None,
            TurnOutcome::Replied { reply, .. } | TurnOutcome::Failed { reply, .. } => Some(reply),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TurnOutcome::Failed { .. })
    }
}

/// The assistant message text for a failed completion.
pub fn error_reply(error: &ProviderError) -> String {
    format!("{ERROR_REPLY_PREFIX}{error}")
}

/// Runs chat turns against one provider with fixed request parameters.
pub struct TurnRunner {
    /// The completion provider
    provider: Arc<dyn Provider>,

    /// Builds the request messages
    assembler: PromptAssembler,

    /// The model to use
    model: String,

    /// Output token bound per reply
    max_tokens: u32,

    /// Optional sampling temperature
    temperature: Option<f32>,
}

impl TurnRunner {
    /// Create a runner with the default instruction and a 1000-token bound.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            assembler: PromptAssembler::default(),
            model: model.into(),
            max_tokens: 1000,
            temperature: None,
        }
    }

    /// Create a runner from application configuration.
    pub fn from_config(provider: Arc<dyn Provider>, config: &AppConfig) -> Self {
        let mut runner = Self::new(provider, &config.model)
            .with_assembler(PromptAssembler::new(SystemInstruction::from_config(
                &config.assistant,
            )))
            .with_max_tokens(config.max_tokens);
        runner.temperature = config.temperature;
        runner
    }

    pub fn with_assembler(mut self, assembler: PromptAssembler) -> Self {
        self.assembler = assembler;
        self
    }

    pub fn with_max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = max;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// The request that would be sent for the session as it stands.
    pub fn request_for(&self, session: &SessionState) -> ProviderRequest {
        ProviderRequest {
            model: self.model.clone(),
            messages: self.assembler.build_request(session),
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }

    /// Run one turn and wait for the whole reply.
    pub async fn run_turn(&self, session: &mut SessionState, user_text: &str) -> TurnOutcome {
        if !session.append_user_message(user_text) {
            debug!(session = %session.id, "Ignoring empty user input");
            return TurnOutcome::Skipped;
        }

        let request = self.request_for(session);
        info!(
            session = %session.id,
            model = %self.model,
            messages = request.messages.len(),
            attachments = session.attachments.len(),
            "Running chat turn"
        );

        match self.provider.complete(request).await {
            Ok(response) => {
                let reply = response.message.text();
                session.append_assistant_message(reply.clone());
                TurnOutcome::Replied {
                    reply,
                    usage: response.usage,
                }
            }
            Err(error) => self.store_failure(session, error),
        }
    }

    /// Run one turn, forwarding reply text to `events` as it arrives.
    ///
    /// The session is only appended to once the stream has ended, so a
    /// failure part-way through stores the error text rather than a partial
    /// reply. A `done` event is always sent last unless the turn is skipped.
    pub async fn run_turn_stream(
        &self,
        session: &mut SessionState,
        user_text: &str,
        events: mpsc::Sender<TurnEvent>,
    ) -> TurnOutcome {
        if !session.append_user_message(user_text) {
            debug!(session = %session.id, "Ignoring empty user input");
            return TurnOutcome::Skipped;
        }

        let request = self.request_for(session);
        info!(
            session = %session.id,
            model = %self.model,
            messages = request.messages.len(),
            "Running streaming chat turn"
        );

        let outcome = match self.collect_stream(request, &events).await {
            Ok((reply, usage)) => {
                session.append_assistant_message(reply.clone());
                TurnOutcome::Replied { reply, usage }
            }
            Err(error) => {
                let outcome = self.store_failure(session, error);
                if let Some(reply) = outcome.reply() {
                    let _ = events
                        .send(TurnEvent::Error {
                            message: reply.to_string(),
                        })
                        .await;
                }
                outcome
            }
        };

        let usage = match &outcome {
            TurnOutcome::Replied { usage, .. } => usage.clone(),
            _ => None,
        };
        let _ = events
            .send(TurnEvent::Done {
                session_id: session.id.to_string(),
                reply: outcome.reply().unwrap_or_default().to_string(),
                usage,
            })
            .await;

        outcome
    }

    /// Drain the provider stream into a full reply.
    ///
    /// Chunks keep flowing to the provider even if the event receiver has
    /// gone away; the turn still completes and is stored.
    async fn collect_stream(
        &self,
        request: ProviderRequest,
        events: &mpsc::Sender<TurnEvent>,
    ) -> Result<(String, Option<Usage>), ProviderError> {
        let mut rx = self.provider.stream(request).await?;
        let mut reply = String::new();
        let mut usage = None;

        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(content) = chunk.content.filter(|c| !c.is_empty()) {
                reply.push_str(&content);
                let _ = events.send(TurnEvent::Chunk { content }).await;
            }
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
            if chunk.done {
                break;
            }
        }

        Ok((reply, usage))
    }

    fn store_failure(&self, session: &mut SessionState, error: ProviderError) -> TurnOutcome {
        warn!(
            session = %session.id,
            provider = %self.provider.name(),
            error = %error,
            "Completion failed, storing error as reply"
        );
        let reply = error_reply(&error);
        session.append_assistant_message(reply.clone());
        TurnOutcome::Failed { reply, error }
    }
}
