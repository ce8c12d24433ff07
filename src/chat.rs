//! Conversation manager
//!
//! One chat session: the History sent to the model, the rendered transcript
//! the reader sees, and the send control that admits one exchange at a time.

mod history;
mod send_control;

#[cfg(test)]
mod proptests;
#[cfg(test)]
pub mod testing;

pub use history::HistoryError;

use history::History;
use send_control::{SendControl, SendPermit};

use crate::llm::{LlmError, LlmRequest, LlmResponse, LlmService, SystemContent};
use crate::render::format_message;
use crate::transcript::{Author, NodeId, Transcript};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Shown in place of a reply when an exchange fails
pub const APOLOGY: &str = "Oops! Kuch gadbad ho gayi. Kripya thodi der baad try karein.";

/// Shown at the top of every new or cleared session
pub const GREETING: &str = "Hello! Main aapka AI-DSA Assistant hoon. Mujhse koi bhi DSA-related sawal poochein, jaise Binary Search ya Merge Sort.";

/// Fixed parameters of every exchange
#[derive(Debug, Clone)]
pub struct ExchangeSettings {
    pub system_prompt: String,
    pub max_output_tokens: u32,
    pub timeout: Duration,
}

/// What happened to a submitted message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Blank input, nothing recorded
    Ignored,
    /// Another exchange is in flight, nothing recorded
    Busy,
    /// The model's reply text
    Replied(String),
}

/// Why an exchange produced no reply
#[derive(Debug, Error)]
pub enum ExchangeError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("no reply within {0:?}")]
    Timeout(Duration),
    #[error("exchange cancelled")]
    Cancelled,
    #[error(transparent)]
    History(#[from] HistoryError),
}

impl ExchangeError {
    pub fn kind(&self) -> &'static str {
        match self {
            ExchangeError::Llm(e) => e.kind.as_str(),
            ExchangeError::Timeout(_) => "timeout",
            ExchangeError::Cancelled => "cancelled",
            ExchangeError::History(_) => "history",
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            ExchangeError::Llm(e) => e.kind.is_retryable(),
            ExchangeError::Timeout(_) => true,
            ExchangeError::Cancelled | ExchangeError::History(_) => false,
        }
    }
}

struct SessionState {
    session_id: Uuid,
    history: History,
    /// Bumped by every clear; exchanges from an older epoch must not touch state
    epoch: u64,
    cancel: CancellationToken,
}

impl SessionState {
    fn fresh(epoch: u64) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            history: History::new(),
            epoch,
            cancel: CancellationToken::new(),
        }
    }
}

pub struct ChatSession {
    llm: Arc<dyn LlmService>,
    settings: ExchangeSettings,
    state: Mutex<SessionState>,
    transcript: Arc<Transcript>,
    send_control: SendControl,
}

/// Cleans up an exchange on every exit path, including a dropped future
struct InFlight<'a> {
    session: &'a ChatSession,
    typing: Option<NodeId>,
    epoch: u64,
    settled: bool,
    _permit: SendPermit<'a>,
}

impl InFlight<'_> {
    fn remove_typing(&mut self) {
        if let Some(id) = self.typing.take() {
            self.session.transcript.remove(id);
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.remove_typing();
        if self.settled {
            return;
        }
        // Never panic while possibly unwinding
        if let Ok(mut state) = self.session.state.lock() {
            if state.epoch == self.epoch {
                let _ = state.history.mark_unanswered();
            }
        }
    }
}

impl ChatSession {
    pub fn new(llm: Arc<dyn LlmService>, settings: ExchangeSettings) -> Self {
        let transcript = Arc::new(Transcript::new());
        let send_control = SendControl::new(transcript.event_sender());
        let session = Self {
            llm,
            settings,
            state: Mutex::new(SessionState::fresh(0)),
            transcript,
            send_control,
        };
        session.greet();
        session
    }

    fn greet(&self) {
        self.transcript.append(Author::Bot, format_message(GREETING));
    }

    pub fn transcript(&self) -> &Arc<Transcript> {
        &self.transcript
    }

    pub fn session_id(&self) -> Uuid {
        self.state.lock().unwrap().session_id
    }

    pub fn send_enabled(&self) -> bool {
        self.send_control.is_enabled()
    }

    pub fn model_id(&self) -> &str {
        self.llm.model_id()
    }

    /// Snapshot of the recorded turns
    #[cfg(test)]
    pub fn history(&self) -> Vec<history::Turn> {
        self.state.lock().unwrap().history.turns().cloned().collect()
    }

    fn build_request(&self, history: &History) -> LlmRequest {
        LlmRequest {
            system: vec![SystemContent::new(self.settings.system_prompt.clone())],
            messages: history.request_messages(),
            max_tokens: Some(self.settings.max_output_tokens),
        }
    }

    /// Send one user message and render the outcome
    ///
    /// A failed exchange still renders the apology; the error is returned
    /// for the caller's status only.
    pub async fn submit_turn(&self, user_text: &str) -> Result<Submission, ExchangeError> {
        let text = user_text.trim();
        if text.is_empty() {
            return Ok(Submission::Ignored);
        }
        let Some(permit) = self.send_control.try_acquire() else {
            tracing::debug!("Submission while an exchange is in flight");
            return Ok(Submission::Busy);
        };

        let (request, epoch, cancel, session_id) = {
            let mut state = self.state.lock().unwrap();
            state.history.push_user(text)?;
            self.transcript.append(Author::User, format_message(text));
            (
                self.build_request(&state.history),
                state.epoch,
                state.cancel.clone(),
                state.session_id,
            )
        };

        let mut in_flight = InFlight {
            session: self,
            typing: Some(self.transcript.insert_typing()),
            epoch,
            settled: false,
            _permit: permit,
        };

        tracing::info!(
            session_id = %session_id,
            turns = request.messages.len(),
            "Starting exchange"
        );
        let outcome = self.exchange(&request, &cancel).await;

        let mut state = self.state.lock().unwrap();
        in_flight.settled = true;
        in_flight.remove_typing();

        if state.epoch != epoch {
            tracing::info!(session_id = %session_id, "Exchange outlived a cleared session");
            return Err(ExchangeError::Cancelled);
        }

        match outcome {
            Ok(response) => {
                state.history.push_model(response.text.clone())?;
                self.transcript
                    .append(Author::Bot, format_message(&response.text));
                if response.truncated() {
                    tracing::warn!(
                        session_id = %session_id,
                        max_output_tokens = self.settings.max_output_tokens,
                        "Reply cut off at the output token bound"
                    );
                }
                Ok(Submission::Replied(response.text))
            }
            Err(e) => {
                state.history.mark_unanswered()?;
                self.transcript.append(Author::Bot, format_message(APOLOGY));
                tracing::error!(
                    session_id = %session_id,
                    kind = e.kind(),
                    retryable = e.is_retryable(),
                    error = %e,
                    "Exchange failed"
                );
                Err(e)
            }
        }
    }

    async fn exchange(
        &self,
        request: &LlmRequest,
        cancel: &CancellationToken,
    ) -> Result<LlmResponse, ExchangeError> {
        let timeout = self.settings.timeout;
        tokio::select! {
            () = cancel.cancelled() => Err(ExchangeError::Cancelled),
            result = tokio::time::timeout(timeout, self.llm.complete(request)) => match result {
                Ok(reply) => Ok(reply?),
                Err(_) => Err(ExchangeError::Timeout(timeout)),
            },
        }
    }

    /// Start over: empty History, empty transcript, fresh greeting
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        state.cancel.cancel();
        let epoch = state.epoch + 1;
        *state = SessionState::fresh(epoch);
        self.transcript.clear();
        self.greet();
        tracing::info!(session_id = %state.session_id, "Chat cleared");
    }

    /// Cancel any in-flight exchange
    pub fn shutdown(&self) {
        self.state.lock().unwrap().cancel.cancel();
    }
}
