//! Append-only conversation log
//!
//! Turns strictly alternate starting with a user turn. A user turn whose
//! exchange failed stays in the log but is marked unanswered and never sent
//! to the model again, so every request alternates user/model and ends on
//! the user turn being asked.

use crate::llm::LlmMessage;
use thiserror::Error;

/// Who produced a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Model,
}

/// One exchanged message. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    role: Role,
    text: String,
}

impl Turn {
    #[cfg(test)]
    pub fn role(&self) -> Role {
        self.role
    }

    #[cfg(test)]
    pub fn text(&self) -> &str {
        &self.text
    }

    fn to_message(&self) -> LlmMessage {
        match self.role {
            Role::User => LlmMessage::user(self.text.clone()),
            Role::Model => LlmMessage::model(self.text.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Status {
    Answered,
    /// User turn waiting on the model
    Pending,
    /// User turn whose exchange failed
    Unanswered,
}

#[derive(Debug, Clone)]
struct Entry {
    turn: Turn,
    status: Status,
}

/// Ordering violations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HistoryError {
    #[error("a user turn is already waiting for a reply")]
    ReplyPending,
    #[error("no user turn is waiting for a reply")]
    NothingPending,
}

#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<Entry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> Option<&Entry> {
        self.entries.last().filter(|e| e.status == Status::Pending)
    }

    /// Record a user turn; it stays pending until answered or abandoned
    pub fn push_user(&mut self, text: impl Into<String>) -> Result<(), HistoryError> {
        if self.pending().is_some() {
            return Err(HistoryError::ReplyPending);
        }
        self.entries.push(Entry {
            turn: Turn {
                role: Role::User,
                text: text.into(),
            },
            status: Status::Pending,
        });
        Ok(())
    }

    /// Record the model's reply to the pending user turn
    pub fn push_model(&mut self, text: impl Into<String>) -> Result<(), HistoryError> {
        let last = self
            .entries
            .last_mut()
            .filter(|e| e.status == Status::Pending)
            .ok_or(HistoryError::NothingPending)?;
        last.status = Status::Answered;
        self.entries.push(Entry {
            turn: Turn {
                role: Role::Model,
                text: text.into(),
            },
            status: Status::Answered,
        });
        Ok(())
    }

    /// Abandon the pending user turn after a failed exchange
    pub fn mark_unanswered(&mut self) -> Result<(), HistoryError> {
        let last = self
            .entries
            .last_mut()
            .filter(|e| e.status == Status::Pending)
            .ok_or(HistoryError::NothingPending)?;
        last.status = Status::Unanswered;
        Ok(())
    }

    /// Every recorded turn, in order, unanswered ones included
    #[cfg(test)]
    pub fn turns(&self) -> impl Iterator<Item = &Turn> {
        self.entries.iter().map(|e| &e.turn)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn unanswered_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == Status::Unanswered)
            .count()
    }

    /// Turns to send with the next request
    pub fn request_messages(&self) -> Vec<LlmMessage> {
        self.entries
            .iter()
            .filter(|e| e.status != Status::Unanswered)
            .map(|e| e.turn.to_message())
            .collect()
    }
}
