//! Async drivers: issue a controller's ticket over HTTP and feed the result
//! back. One request per call, so a single session never has two requests in
//! flight.

use crate::chat::{ChatController, ChatOutcome};
use crate::client::AdventureClient;
use crate::error::ClientResult;
use crate::narration::{NarrationController, NarrationOutcome, NarrationTicket};
use crate::transcript::{ChoiceView, TranscriptView};

pub struct NarrationSession<T, C> {
    client: AdventureClient,
    controller: NarrationController<T, C>,
}

impl<T: TranscriptView, C: ChoiceView> NarrationSession<T, C> {
    pub fn new(client: AdventureClient, controller: NarrationController<T, C>) -> Self {
        Self { client, controller }
    }

    pub fn controller(&self) -> &NarrationController<T, C> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut NarrationController<T, C> {
        &mut self.controller
    }

    pub async fn start(&mut self) -> ClientResult<NarrationOutcome> {
        let ticket = self.controller.start()?;
        self.execute(ticket).await
    }

    pub async fn select_choice(&mut self, choice: &str) -> ClientResult<NarrationOutcome> {
        let ticket = self.controller.select_choice(choice)?;
        self.execute(ticket).await
    }

    pub async fn select_index(&mut self, index: usize) -> ClientResult<NarrationOutcome> {
        let ticket = self.controller.select_index(index)?;
        self.execute(ticket).await
    }

    pub async fn retry(&mut self) -> ClientResult<NarrationOutcome> {
        let ticket = self.controller.retry()?;
        self.execute(ticket).await
    }

    async fn execute(&mut self, ticket: NarrationTicket) -> ClientResult<NarrationOutcome> {
        let result = self
            .client
            .narrate(self.controller.session_id(), &ticket.request)
            .await;
        self.controller.handle_response(&ticket, result)
    }
}

pub struct ChatSession<T> {
    client: AdventureClient,
    controller: ChatController<T>,
}

impl<T: TranscriptView> ChatSession<T> {
    pub fn new(client: AdventureClient, controller: ChatController<T>) -> Self {
        Self { client, controller }
    }

    pub fn controller(&self) -> &ChatController<T> {
        &self.controller
    }

    pub async fn submit(&mut self, text: &str) -> ClientResult<ChatOutcome> {
        let ticket = self.controller.submit(text)?;
        let result = self.client.send_message(&ticket.message).await;
        self.controller.handle_reply(&ticket, result)
    }
}
