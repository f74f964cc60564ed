pub mod chat;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod narration;
pub mod session;
pub mod session_id;
pub mod transcript;
pub mod wire;

pub use chat::{ChatController, ChatOutcome, ChatTicket};
pub use client::{AdventureClient, AdventureClientBuilder, ClientConfig};
pub use config::Config;
pub use error::{ClientError, ClientResult, ConfigError};
pub use narration::{
    NarrationController, NarrationOutcome, NarrationRequest, NarrationState, NarrationTicket,
};
pub use session::{ChatSession, NarrationSession};
pub use session_id::SessionId;
pub use transcript::{
    ChoiceView, MemoryChoices, MemoryTranscript, Origin, TerminalChoices, TerminalTranscript,
    TranscriptEntry, TranscriptView, ENDING_MESSAGE,
};
pub use wire::{ChatMessage, ChoiceBody, NarrationResponse};
