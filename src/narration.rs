//! Narration controller: the client half of a branching story.
//!
//! ```text
//!  Idle --start--> AwaitingResponse --choices--> PresentingChoices
//!                    ^      |  \                        |
//!                    |      |   `--no choices--> Ended  |
//!                    |      `--failure (stays; retry())  |
//!                    `-----------select_choice-----------'
//! ```
//!
//! The controller never performs I/O. Every request-issuing operation returns
//! a [`NarrationTicket`]; the caller executes the ticket's request and hands
//! the outcome back to [`NarrationController::handle_response`]. Tickets carry
//! a generation number so a response to anything but the latest request is
//! discarded instead of desyncing the views from the server's story.

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::{ClientError, ClientResult};
use crate::session_id::SessionId;
use crate::transcript::{ChoiceView, Origin, TranscriptView, ENDING_MESSAGE};
use crate::wire::NarrationResponse;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationState {
    Idle,
    AwaitingResponse,
    PresentingChoices,
    Ended,
}

impl fmt::Display for NarrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NarrationState::Idle => write!(f, "idle"),
            NarrationState::AwaitingResponse => write!(f, "awaiting a response"),
            NarrationState::PresentingChoices => write!(f, "presenting choices"),
            NarrationState::Ended => write!(f, "ended"),
        }
    }
}

/// What the caller must send to the narration endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NarrationRequest {
    /// `GET /api/narrate/{session}`
    Begin,
    /// `POST /api/narrate/{session}` with `{"choice": ...}`
    Choose { choice: String },
}

/// Handle for one issued request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationTicket {
    pub generation: u64,
    pub request: NarrationRequest,
}

/// Result of applying a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationOutcome {
    /// Choices were rendered; carries how many.
    Choices(usize),
    /// The terminal message was rendered.
    Ended,
    /// The response belonged to a superseded request and was ignored.
    Stale,
}

pub struct NarrationController<T, C> {
    session: SessionId,
    state: NarrationState,
    transcript: T,
    choices: C,
    offered: Vec<String>,
    generation: u64,
    failed: Option<NarrationRequest>,
    error_tx: Option<mpsc::UnboundedSender<ClientError>>,
}

impl<T: TranscriptView, C: ChoiceView> NarrationController<T, C> {
    /// Create a controller with a freshly generated session identifier.
    pub fn new(transcript: T, choices: C) -> Self {
        Self::with_session(SessionId::generate(), transcript, choices)
    }

    /// Create a controller bound to an existing session, e.g. to resume a
    /// story the server still holds.
    pub fn with_session(session: SessionId, transcript: T, choices: C) -> Self {
        Self {
            session,
            state: NarrationState::Idle,
            transcript,
            choices,
            offered: Vec::new(),
            generation: 0,
            failed: None,
            error_tx: None,
        }
    }

    /// Report every request failure on `tx` as well as returning it.
    pub fn with_error_channel(mut self, tx: mpsc::UnboundedSender<ClientError>) -> Self {
        self.error_tx = Some(tx);
        self
    }

    pub fn session_id(&self) -> &SessionId {
        &self.session
    }

    pub fn state(&self) -> NarrationState {
        self.state
    }

    /// The current choice set; empty unless presenting choices.
    pub fn offered(&self) -> &[String] {
        &self.offered
    }

    /// True when the last request failed and [`retry`](Self::retry) is allowed.
    pub fn can_retry(&self) -> bool {
        self.state == NarrationState::AwaitingResponse && self.failed.is_some()
    }

    pub fn transcript(&self) -> &T {
        &self.transcript
    }

    pub fn choices(&self) -> &C {
        &self.choices
    }

    /// Begin the story. Only valid from `Idle`.
    ///
    /// Clears the transcript and the start affordance before issuing the
    /// session-scoped `GET`.
    pub fn start(&mut self) -> ClientResult<NarrationTicket> {
        self.expect_state("start", NarrationState::Idle)?;
        self.transcript.clear();
        self.choices.clear_choices();
        Ok(self.issue(NarrationRequest::Begin))
    }

    /// Pick one of the offered choices. Only valid from `PresentingChoices`.
    pub fn select_choice(&mut self, choice: &str) -> ClientResult<NarrationTicket> {
        self.expect_state("select a choice", NarrationState::PresentingChoices)?;
        if !self.offered.iter().any(|c| c == choice) {
            return Err(ClientError::UnknownChoice(choice.to_string()));
        }
        self.transcript.append_entry(choice, Origin::User);
        self.choices.clear_choices();
        self.offered.clear();
        Ok(self.issue(NarrationRequest::Choose {
            choice: choice.to_string(),
        }))
    }

    /// Pick the choice at `index` (0-based) of the current choice set.
    pub fn select_index(&mut self, index: usize) -> ClientResult<NarrationTicket> {
        self.expect_state("select a choice", NarrationState::PresentingChoices)?;
        let choice = self
            .offered
            .get(index)
            .cloned()
            .ok_or_else(|| {
                ClientError::UnknownChoice(format!("#{}", index.saturating_add(1)))
            })?;
        self.select_choice(&choice)
    }

    /// Re-issue the request that last failed, under a new generation.
    pub fn retry(&mut self) -> ClientResult<NarrationTicket> {
        if !self.can_retry() {
            return Err(ClientError::InvalidTransition {
                operation: "retry",
                state: self.state,
            });
        }
        let request = self.failed.take().unwrap_or(NarrationRequest::Begin);
        Ok(self.issue(request))
    }

    /// Return to `Idle` so the story can be started again.
    ///
    /// Not allowed while a request is genuinely outstanding. The transcript is
    /// left alone here; the next `start` clears it.
    pub fn reset(&mut self) -> ClientResult<()> {
        if self.state == NarrationState::AwaitingResponse && self.failed.is_none() {
            return Err(ClientError::InvalidTransition {
                operation: "reset",
                state: self.state,
            });
        }
        // Invalidate anything still in flight.
        self.generation += 1;
        self.failed = None;
        self.offered.clear();
        self.transition(NarrationState::Idle);
        Ok(())
    }

    /// Apply the outcome of the request described by `ticket`.
    ///
    /// On failure the state stays `AwaitingResponse`, the error is logged,
    /// sent on the error channel if one is bound, and returned.
    pub fn handle_response(
        &mut self,
        ticket: &NarrationTicket,
        result: ClientResult<NarrationResponse>,
    ) -> ClientResult<NarrationOutcome> {
        if ticket.generation != self.generation
            || self.state != NarrationState::AwaitingResponse
            || self.failed.is_some()
        {
            debug!(
                session = %self.session,
                ticket = ticket.generation,
                current = self.generation,
                state = %self.state,
                "discarding stale narration response"
            );
            return Ok(NarrationOutcome::Stale);
        }

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                warn!(session = %self.session, error = %e, "narration request failed");
                self.failed = Some(ticket.request.clone());
                if let Some(tx) = &self.error_tx {
                    let _ = tx.send(e.clone());
                }
                return Err(e);
            }
        };

        self.transcript.append_entry(&response.plot, Origin::System);

        let choices = response.choices.unwrap_or_default();
        if choices.is_empty() {
            self.choices.render_ending(ENDING_MESSAGE);
            self.transition(NarrationState::Ended);
            Ok(NarrationOutcome::Ended)
        } else {
            self.choices.render_choices(&choices);
            let count = choices.len();
            self.offered = choices;
            self.transition(NarrationState::PresentingChoices);
            Ok(NarrationOutcome::Choices(count))
        }
    }

    fn issue(&mut self, request: NarrationRequest) -> NarrationTicket {
        self.generation += 1;
        self.failed = None;
        self.transition(NarrationState::AwaitingResponse);
        debug!(
            session = %self.session,
            generation = self.generation,
            request = ?request,
            "issuing narration request"
        );
        NarrationTicket {
            generation: self.generation,
            request,
        }
    }

    fn expect_state(&self, operation: &'static str, expected: NarrationState) -> ClientResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(ClientError::InvalidTransition {
                operation,
                state: self.state,
            })
        }
    }

    fn transition(&mut self, next: NarrationState) {
        if self.state != next {
            debug!(session = %self.session, from = %self.state, to = %next, "narration transition");
            self.state = next;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{MemoryChoices, MemoryTranscript};

    type Controller = NarrationController<MemoryTranscript, MemoryChoices>;

    fn make_controller() -> Controller {
        NarrationController::with_session(
            SessionId::from("abc1234"),
            MemoryTranscript::new(),
            MemoryChoices::new(),
        )
    }

    fn story(plot: &str, choices: &[&str]) -> NarrationResponse {
        NarrationResponse {
            plot: plot.to_string(),
            choices: Some(choices.iter().map(|c| c.to_string()).collect()),
        }
    }

    fn ending(plot: &str) -> NarrationResponse {
        NarrationResponse {
            plot: plot.to_string(),
            choices: None,
        }
    }

    fn http_500() -> ClientError {
        ClientError::Request {
            status: 500,
            url: "http://localhost/api/narrate/abc1234".to_string(),
        }
    }

    fn presenting(choices: &[&str]) -> Controller {
        let mut c = make_controller();
        let ticket = c.start().unwrap();
        c.handle_response(&ticket, Ok(story("You wake in a forest.", choices)))
            .unwrap();
        c
    }

    // -------------------------------------------------------------------
    // start
    // -------------------------------------------------------------------

    #[test]
    fn test_new_controller_is_idle() {
        let c = make_controller();
        assert_eq!(c.state(), NarrationState::Idle);
        assert!(c.offered().is_empty());
    }

    #[test]
    fn test_new_generates_session_id() {
        let c = NarrationController::new(MemoryTranscript::new(), MemoryChoices::new());
        assert_eq!(c.session_id().as_str().len(), 7);
    }

    #[test]
    fn test_start_issues_begin_and_awaits() {
        let mut c = make_controller();
        let ticket = c.start().unwrap();
        assert_eq!(ticket.request, NarrationRequest::Begin);
        assert_eq!(c.state(), NarrationState::AwaitingResponse);
    }

    #[test]
    fn test_start_clears_transcript_and_controls() {
        let mut c = make_controller();
        c.start().unwrap();
        assert_eq!(c.transcript().clear_count(), 1);
        assert!(c.choices().controls().is_empty());
    }

    #[test]
    fn test_double_start_is_rejected() {
        let mut c = make_controller();
        let first = c.start().unwrap();
        let err = c.start().unwrap_err();
        assert_eq!(
            err,
            ClientError::InvalidTransition {
                operation: "start",
                state: NarrationState::AwaitingResponse,
            }
        );
        // The original request is still the live one.
        let outcome = c.handle_response(&first, Ok(story("p", &["a"]))).unwrap();
        assert_eq!(outcome, NarrationOutcome::Choices(1));
    }

    // -------------------------------------------------------------------
    // Response handling
    // -------------------------------------------------------------------

    #[test]
    fn test_forest_scenario_renders_plot_and_two_controls() {
        let c = presenting(&["Go north", "Go south"]);
        assert_eq!(c.transcript().texts(), vec!["You wake in a forest."]);
        assert_eq!(c.transcript().entries()[0].origin, Origin::System);
        assert_eq!(c.choices().controls(), ["Go north", "Go south"]);
        assert_eq!(c.state(), NarrationState::PresentingChoices);
    }

    #[test]
    fn test_absent_choices_ends_story() {
        let mut c = make_controller();
        let ticket = c.start().unwrap();
        let outcome = c.handle_response(&ticket, Ok(ending("Fin."))).unwrap();
        assert_eq!(outcome, NarrationOutcome::Ended);
        assert_eq!(c.state(), NarrationState::Ended);
        assert_eq!(c.choices().ending(), Some(ENDING_MESSAGE));
        assert_eq!(c.choices().endings_rendered(), 1);
        assert!(c.choices().controls().is_empty());
    }

    #[test]
    fn test_empty_choices_ends_story() {
        let mut c = make_controller();
        let ticket = c.start().unwrap();
        let outcome = c.handle_response(&ticket, Ok(story("Fin.", &[]))).unwrap();
        assert_eq!(outcome, NarrationOutcome::Ended);
    }

    #[test]
    fn test_empty_plot_is_still_rendered() {
        let mut c = make_controller();
        let ticket = c.start().unwrap();
        c.handle_response(&ticket, Ok(story("", &["a"]))).unwrap();
        assert_eq!(c.transcript().texts(), vec![""]);
    }

    #[test]
    fn test_duplicate_choices_render_as_distinct_controls() {
        let c = presenting(&["Wait", "Wait", "Run"]);
        assert_eq!(c.choices().controls(), ["Wait", "Wait", "Run"]);
    }

    // -------------------------------------------------------------------
    // select_choice
    // -------------------------------------------------------------------

    #[test]
    fn test_select_choice_appends_user_entry_and_clears_controls() {
        let mut c = presenting(&["Go north", "Go south"]);
        let ticket = c.select_choice("Go north").unwrap();
        assert_eq!(
            ticket.request,
            NarrationRequest::Choose {
                choice: "Go north".to_string()
            }
        );
        assert_eq!(c.transcript().texts(), vec!["You wake in a forest.", "Go north"]);
        assert_eq!(c.transcript().entries()[1].origin, Origin::User);
        assert!(c.choices().controls().is_empty());
        assert!(c.offered().is_empty());
        assert_eq!(c.state(), NarrationState::AwaitingResponse);
    }

    #[test]
    fn test_lake_scenario_ends_after_choice() {
        let mut c = presenting(&["Go north", "Go south"]);
        let ticket = c.select_choice("Go north").unwrap();
        c.handle_response(&ticket, Ok(ending("You arrive at a lake.")))
            .unwrap();
        assert_eq!(
            c.transcript().texts(),
            vec!["You wake in a forest.", "Go north", "You arrive at a lake."]
        );
        assert_eq!(c.choices().ending(), Some("The end."));
        assert!(c.choices().controls().is_empty());
        assert!(c.select_choice("Go north").is_err());
        assert!(c.start().is_err());
    }

    #[test]
    fn test_select_choice_from_idle_is_rejected() {
        let mut c = make_controller();
        let err = c.select_choice("Go north").unwrap_err();
        assert!(matches!(err, ClientError::InvalidTransition { state: NarrationState::Idle, .. }));
        assert!(c.transcript().entries().is_empty());
    }

    #[test]
    fn test_select_unknown_choice_has_no_side_effects() {
        let mut c = presenting(&["Go north"]);
        let err = c.select_choice("Go west").unwrap_err();
        assert_eq!(err, ClientError::UnknownChoice("Go west".to_string()));
        assert_eq!(c.state(), NarrationState::PresentingChoices);
        assert_eq!(c.choices().controls(), ["Go north"]);
        assert_eq!(c.transcript().entries().len(), 1);
    }

    #[test]
    fn test_select_index() {
        let mut c = presenting(&["Go north", "Go south"]);
        let ticket = c.select_index(1).unwrap();
        assert_eq!(
            ticket.request,
            NarrationRequest::Choose {
                choice: "Go south".to_string()
            }
        );
    }

    #[test]
    fn test_select_index_out_of_range() {
        let mut c = presenting(&["Go north"]);
        assert_eq!(
            c.select_index(3).unwrap_err(),
            ClientError::UnknownChoice("#4".to_string())
        );
        assert_eq!(
            c.select_index(usize::MAX).unwrap_err(),
            ClientError::UnknownChoice(format!("#{}", usize::MAX))
        );
        assert_eq!(c.state(), NarrationState::PresentingChoices);
        assert_eq!(c.offered(), ["Go north"]);
    }

    // -------------------------------------------------------------------
    // Failure, stale responses, retry
    // -------------------------------------------------------------------

    #[test]
    fn test_failure_leaves_awaiting_and_reports() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut c = make_controller().with_error_channel(tx);
        let ticket = c.start().unwrap();
        let err = c.handle_response(&ticket, Err(http_500())).unwrap_err();
        assert_eq!(err, http_500());
        assert_eq!(c.state(), NarrationState::AwaitingResponse);
        assert!(c.transcript().entries().is_empty());
        assert!(c.choices().controls().is_empty());
        assert_eq!(rx.try_recv().unwrap(), http_500());
    }

    #[test]
    fn test_retry_reissues_failed_choice() {
        let mut c = presenting(&["Go north"]);
        let ticket = c.select_choice("Go north").unwrap();
        let _ = c.handle_response(&ticket, Err(http_500()));
        assert!(c.can_retry());
        let retry = c.retry().unwrap();
        assert!(retry.generation > ticket.generation);
        assert_eq!(retry.request, ticket.request);
        assert!(!c.can_retry());
        let outcome = c.handle_response(&retry, Ok(ending("Fin."))).unwrap();
        assert_eq!(outcome, NarrationOutcome::Ended);
        // The choice was recorded once, not per attempt.
        assert_eq!(c.transcript().texts(), vec!["You wake in a forest.", "Go north", "Fin."]);
    }

    #[test]
    fn test_retry_without_failure_is_rejected() {
        let mut c = make_controller();
        c.start().unwrap();
        assert!(matches!(
            c.retry().unwrap_err(),
            ClientError::InvalidTransition { operation: "retry", .. }
        ));
    }

    #[test]
    fn test_response_for_superseded_ticket_is_discarded() {
        let mut c = make_controller();
        let first = c.start().unwrap();
        let _ = c.handle_response(&first, Err(http_500()));
        let second = c.retry().unwrap();
        let outcome = c.handle_response(&first, Ok(story("late", &["x"]))).unwrap();
        assert_eq!(outcome, NarrationOutcome::Stale);
        assert!(c.transcript().entries().is_empty());
        let outcome = c.handle_response(&second, Ok(story("fresh", &["y"]))).unwrap();
        assert_eq!(outcome, NarrationOutcome::Choices(1));
        assert_eq!(c.transcript().texts(), vec!["fresh"]);
    }

    #[test]
    fn test_duplicate_delivery_is_discarded() {
        let mut c = make_controller();
        let ticket = c.start().unwrap();
        c.handle_response(&ticket, Ok(story("p", &["a"]))).unwrap();
        let outcome = c.handle_response(&ticket, Ok(story("p", &["a"]))).unwrap();
        assert_eq!(outcome, NarrationOutcome::Stale);
        assert_eq!(c.choices().controls(), ["a"]);
    }

    #[test]
    fn test_late_response_after_failure_is_discarded() {
        let mut c = make_controller();
        let ticket = c.start().unwrap();
        let _ = c.handle_response(&ticket, Err(http_500()));
        let outcome = c.handle_response(&ticket, Ok(story("p", &["a"]))).unwrap();
        assert_eq!(outcome, NarrationOutcome::Stale);
    }

    // -------------------------------------------------------------------
    // reset
    // -------------------------------------------------------------------

    #[test]
    fn test_reset_after_end_allows_restart() {
        let mut c = make_controller();
        let ticket = c.start().unwrap();
        c.handle_response(&ticket, Ok(ending("Fin."))).unwrap();
        c.reset().unwrap();
        assert_eq!(c.state(), NarrationState::Idle);
        let session = c.session_id().clone();
        c.start().unwrap();
        assert_eq!(c.session_id(), &session);
        assert!(c.transcript().entries().is_empty());
        assert!(c.choices().ending().is_none());
    }

    #[test]
    fn test_reset_while_in_flight_is_rejected() {
        let mut c = make_controller();
        c.start().unwrap();
        assert!(c.reset().is_err());
        assert_eq!(c.state(), NarrationState::AwaitingResponse);
    }

    #[test]
    fn test_reset_after_failure_discards_old_ticket() {
        let mut c = make_controller();
        let ticket = c.start().unwrap();
        let _ = c.handle_response(&ticket, Err(http_500()));
        c.reset().unwrap();
        let fresh = c.start().unwrap();
        assert_eq!(
            c.handle_response(&ticket, Ok(story("old", &["a"]))).unwrap(),
            NarrationOutcome::Stale
        );
        assert_eq!(
            c.handle_response(&fresh, Ok(story("new", &["a"]))).unwrap(),
            NarrationOutcome::Choices(1)
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(NarrationState::Idle.to_string(), "idle");
        assert_eq!(NarrationState::PresentingChoices.to_string(), "presenting choices");
    }
}
