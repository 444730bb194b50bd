use async_trait::async_trait;
use chrono::Utc;
use deadpool_postgres::PoolError;
use tokio::sync::Mutex;

use std::sync::atomic::{AtomicBool, Ordering};

use super::{NoteGateway, PersistenceError};
use crate::models::{NewNote, Note};

/// Table kept in process memory, with a switch that makes every call fail
/// the way a closed pool does.
#[derive(Default)]
pub struct InMemoryGateway {
    notes: Mutex<Vec<Note>>,
    unavailable: AtomicBool,
}

impl InMemoryGateway {
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub async fn len(&self) -> usize {
        self.notes.lock().await.len()
    }

    fn check(&self) -> Result<(), PersistenceError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PersistenceError::Pool(PoolError::Closed));
        }
        Ok(())
    }
}

#[async_trait]
impl NoteGateway for InMemoryGateway {
    async fn insert(&self, note: NewNote) -> Result<NewNote, PersistenceError> {
        self.check()?;

        let mut notes = self.notes.lock().await;
        let now = Utc::now();
        let id = notes.last().map_or(1, |last| last.id + 1);
        notes.push(Note {
            id,
            title: note.title.clone(),
            description: note.description.clone(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        });

        Ok(note)
    }

    async fn list_all(&self) -> Result<Vec<Note>, PersistenceError> {
        self.check()?;

        Ok(self.notes.lock().await.clone())
    }
}
