//! Chat controller: submit a line, render the reply.
//!
//! At most one message is in flight. The submit control is disabled from
//! [`ChatController::submit`] until the matching
//! [`ChatController::handle_reply`], which re-enables it whether the request
//! succeeded or not.

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::transcript::{Origin, TranscriptView};
use crate::wire::ChatMessage;

/// Handle for one submitted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTicket {
    pub generation: u64,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatOutcome {
    Replied,
    /// The ticket was already handled; nothing changed.
    Stale,
}

pub struct ChatController<T> {
    transcript: T,
    submit_enabled: bool,
    generation: u64,
    error_tx: Option<mpsc::UnboundedSender<ClientError>>,
}

impl<T: TranscriptView> ChatController<T> {
    pub fn new(transcript: T) -> Self {
        Self {
            transcript,
            submit_enabled: true,
            generation: 0,
            error_tx: None,
        }
    }

    /// Report every request failure on `tx` as well as returning it.
    pub fn with_error_channel(mut self, tx: mpsc::UnboundedSender<ClientError>) -> Self {
        self.error_tx = Some(tx);
        self
    }

    pub fn is_submit_enabled(&self) -> bool {
        self.submit_enabled
    }

    pub fn transcript(&self) -> &T {
        &self.transcript
    }

    /// Show `text` as a user entry right away and disable submitting until
    /// the reply is handled.
    pub fn submit(&mut self, text: &str) -> ClientResult<ChatTicket> {
        if !self.submit_enabled {
            return Err(ClientError::SubmitDisabled);
        }
        self.transcript.append_entry(text, Origin::User);
        self.submit_enabled = false;
        self.generation += 1;
        debug!(generation = self.generation, "submitting chat message");
        Ok(ChatTicket {
            generation: self.generation,
            message: text.to_string(),
        })
    }

    /// Apply the outcome of `ticket`'s request. The submit control is enabled
    /// again on every path except a stale ticket.
    pub fn handle_reply(
        &mut self,
        ticket: &ChatTicket,
        result: ClientResult<ChatMessage>,
    ) -> ClientResult<ChatOutcome> {
        if ticket.generation != self.generation || self.submit_enabled {
            debug!(
                ticket = ticket.generation,
                current = self.generation,
                "discarding stale chat reply"
            );
            return Ok(ChatOutcome::Stale);
        }
        self.submit_enabled = true;

        match result {
            Ok(reply) => {
                self.transcript.append_entry(&reply.message, Origin::System);
                Ok(ChatOutcome::Replied)
            }
            Err(e) => {
                warn!(error = %e, "chat request failed");
                if let Some(tx) = &self.error_tx {
                    let _ = tx.send(e.clone());
                }
                Err(e)
            }
        }
    }
}
