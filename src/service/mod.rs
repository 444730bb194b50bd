use crate::{
    dto::{CreateNoteRequest, CreateNoteResponse, NoteResponse},
    repository::{NoteGateway, PersistenceError},
};

use std::sync::Arc;

#[derive(Clone)]
pub struct NoteService {
    gateway: Arc<dyn NoteGateway>,
}

impl NoteService {
    pub fn new(gateway: Arc<dyn NoteGateway>) -> Self {
        Self { gateway }
    }

    pub async fn create_note(
        &self,
        request: CreateNoteRequest,
    ) -> Result<CreateNoteResponse, PersistenceError> {
        self.gateway
            .insert(request.into())
            .await
            .map(CreateNoteResponse::from)
    }

    pub async fn list_notes(&self) -> Result<Vec<NoteResponse>, PersistenceError> {
        self.gateway
            .list_all()
            .await
            .map(|notes| notes.into_iter().map(NoteResponse::from).collect())
    }
}
