use serde::{Deserialize, Serialize};

// -- Narration endpoint -----------------------------------------------------

/// Body of `POST /api/narrate/{session}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceBody {
    pub choice: String,
}

/// Response of both narration requests.
///
/// `choices` may be absent, `null` or empty; all three mean the story is over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrationResponse {
    pub plot: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<String>>,
}

impl NarrationResponse {
    /// The offered choices, empty when the story has ended.
    pub fn choice_set(&self) -> &[String] {
        self.choices.as_deref().unwrap_or_default()
    }

    pub fn is_ending(&self) -> bool {
        self.choice_set().is_empty()
    }
}

// -- Chat endpoint ----------------------------------------------------------

/// Body of `POST /send`, and the shape of its reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub message: String,
}
